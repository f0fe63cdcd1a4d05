pub mod assemble;
pub mod config;
pub mod emit;
pub mod error;
pub mod node;
pub mod ordered;
pub mod output;
pub mod schema;
pub mod smithy;
pub mod swagger;
pub mod transform;

pub use assemble::{assemble_ast, assemble_model};
pub use config::GeneratorConfig;
pub use error::{AssembleError, GeneratorError, ModelError, OutputError, ParseError};
pub use schema::Schema;

/// A generated file with path and content.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

/// Trait for generators that produce files from a schema.
pub trait CodeGenerator {
    /// The name used to select this generator (`-g <id>`).
    fn id(&self) -> &'static str;

    fn generate(
        &self,
        schema: &Schema,
        config: &GeneratorConfig,
    ) -> Result<Vec<GeneratedFile>, GeneratorError>;
}
