pub mod context;
pub mod generator;

pub use generator::MarkdownGenerator;
