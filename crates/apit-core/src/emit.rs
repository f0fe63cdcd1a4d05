//! Built-in generators: Smithy IDL, Smithy JSON AST and the schema as JSON.

use log::debug;

use crate::config::GeneratorConfig;
use crate::error::GeneratorError;
use crate::schema::Schema;
use crate::smithy::{self, Ast};
use crate::transform::export;
use crate::{CodeGenerator, GeneratedFile};

/// Ids of the generators this crate provides.
pub const BUILTIN_GENERATORS: &[&str] = &["smithy", "smithy-ast", "json"];

/// Look up a built-in generator by id.
pub fn builtin(id: &str) -> Option<Box<dyn CodeGenerator>> {
    match id {
        "smithy" => Some(Box::new(SmithyGenerator)),
        "smithy-ast" => Some(Box::new(SmithyAstGenerator)),
        "json" => Some(Box::new(JsonGenerator)),
        _ => None,
    }
}

/// Base file name for single-file outputs: the service name, else the
/// namespace, else `model`.
pub fn output_name(schema: &Schema) -> String {
    schema
        .service_name()
        .or(schema.service_namespace())
        .unwrap_or("model")
        .to_string()
}

fn exported(schema: &Schema, config: &GeneratorConfig) -> Ast {
    let mut ast = export(schema);
    if config.sort {
        let mut shapes: Vec<_> = ast.shapes.into_iter().collect();
        shapes.sort_by(|(a, _), (b, _)| a.cmp(b));
        ast.shapes = shapes.into_iter().collect();
    }
    ast
}

/// Emits one `<namespace>.smithy` IDL file per namespace.
pub struct SmithyGenerator;

impl CodeGenerator for SmithyGenerator {
    fn id(&self) -> &'static str {
        "smithy"
    }

    fn generate(
        &self,
        schema: &Schema,
        config: &GeneratorConfig,
    ) -> Result<Vec<GeneratedFile>, GeneratorError> {
        let ast = exported(schema, config);
        let files: Vec<GeneratedFile> = ast
            .namespaces()
            .into_iter()
            .map(|ns| GeneratedFile {
                content: smithy::unparse(&ast, &ns),
                path: format!("{ns}.smithy"),
            })
            .collect();
        debug!("smithy: {} files", files.len());
        Ok(files)
    }
}

/// Emits the Smithy JSON AST as `model.json`.
pub struct SmithyAstGenerator;

impl CodeGenerator for SmithyAstGenerator {
    fn id(&self) -> &'static str {
        "smithy-ast"
    }

    fn generate(
        &self,
        schema: &Schema,
        config: &GeneratorConfig,
    ) -> Result<Vec<GeneratedFile>, GeneratorError> {
        let mut content = exported(schema, config).to_json()?;
        content.push('\n');
        Ok(vec![GeneratedFile {
            path: "model.json".to_string(),
            content,
        }])
    }
}

/// Emits the schema itself as pretty-printed JSON.
pub struct JsonGenerator;

impl CodeGenerator for JsonGenerator {
    fn id(&self) -> &'static str {
        "json"
    }

    fn generate(
        &self,
        schema: &Schema,
        config: &GeneratorConfig,
    ) -> Result<Vec<GeneratedFile>, GeneratorError> {
        let mut content = if config.sort {
            let mut sorted = schema.clone();
            sorted.sort();
            serde_json::to_string_pretty(&sorted)?
        } else {
            serde_json::to_string_pretty(schema)?
        };
        content.push('\n');
        Ok(vec![GeneratedFile {
            path: format!("{}.json", output_name(schema)),
            content,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::import;

    const MODEL: &str = r#"$version: "2"
namespace example.weather

service Weather {
    version: "2024-01-01"
    operations: [GetCity]
}

@readonly
@http(method: "GET", uri: "/cities/{cityId}")
operation GetCity {
    input := {
        @required
        @httpLabel
        cityId: String
    }
    output := {
        @httpPayload
        city: City
    }
}

structure Zone { name: String }

structure City {
    @required
    name: String
    zone: Zone
}
"#;

    fn schema() -> Schema {
        import(&smithy::parse("weather.smithy", MODEL).unwrap()).unwrap()
    }

    #[test]
    fn test_builtin_lookup() {
        for id in BUILTIN_GENERATORS {
            assert_eq!(builtin(id).unwrap().id(), *id);
        }
        assert!(builtin("markdown").is_none());
    }

    #[test]
    fn test_smithy_output_reparses() {
        let schema = schema();
        let files = SmithyGenerator
            .generate(&schema, &GeneratorConfig::default())
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "example.weather.smithy");
        assert!(files[0].content.contains("namespace example.weather"));
        assert!(files[0].content.contains("service Weather"));

        let reparsed = smithy::parse(&files[0].path, &files[0].content).unwrap();
        assert_eq!(import(&reparsed).unwrap(), schema);
    }

    #[test]
    fn test_sorted_ast_output() {
        let config = GeneratorConfig {
            sort: true,
            ..Default::default()
        };
        let files = SmithyAstGenerator.generate(&schema(), &config).unwrap();
        assert_eq!(files[0].path, "model.json");
        let ast = Ast::from_json(&files[0].content).unwrap();
        let ids = ast.shape_ids();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert!(ast.get_shape("example.weather#Weather").is_some());
    }

    #[test]
    fn test_json_output() {
        let schema = schema();
        let files = JsonGenerator
            .generate(&schema, &GeneratorConfig { sort: true, ..Default::default() })
            .unwrap();
        assert_eq!(files[0].path, "Weather.json");
        let value: serde_json::Value = serde_json::from_str(&files[0].content).unwrap();
        assert_eq!(value["id"], "example.weather#Weather");
        assert_eq!(value["types"][0]["id"], "example.weather#City");

        let back: Schema = serde_json::from_str(&files[0].content).unwrap();
        assert_eq!(back, schema);
    }
}
