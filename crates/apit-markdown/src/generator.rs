use apit_core::config::GeneratorConfig;
use apit_core::emit::output_name;
use apit_core::schema::Schema;
use apit_core::{CodeGenerator, GeneratedFile, GeneratorError};
use log::debug;
use minijinja::{Environment, context};

use crate::context as view;

/// Markdown API reference generator.
///
/// Parameters: `title=<text>` overrides the heading, `toc` adds a table of
/// contents.
pub struct MarkdownGenerator;

impl CodeGenerator for MarkdownGenerator {
    fn id(&self) -> &'static str {
        "markdown"
    }

    fn generate(
        &self,
        schema: &Schema,
        config: &GeneratorConfig,
    ) -> Result<Vec<GeneratedFile>, GeneratorError> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.add_template("api.md.j2", include_str!("../templates/api.md.j2"))
            .expect("template should be valid");
        let tmpl = env
            .get_template("api.md.j2")
            .map_err(|e| GeneratorError::Template(e.to_string()))?;

        let title = config
            .param("title")
            .map(str::to_string)
            .or_else(|| schema.service_name().map(str::to_string))
            .or_else(|| schema.service_namespace().map(str::to_string))
            .unwrap_or_else(|| "API".to_string());

        let operations = view::operations(schema, config.sort);
        let types = view::types(schema, config.sort);
        let exceptions = view::exceptions(schema, config.sort);
        let resources = view::resources(schema, config.sort);
        debug!(
            "markdown: {} operations, {} types, {} exceptions",
            operations.len(),
            types.len(),
            exceptions.len()
        );

        let content = tmpl
            .render(context! {
                title => title,
                version => schema.version(),
                comment => schema.comment(),
                base => schema.base(),
                toc => config.flag("toc"),
                operations => operations,
                types => types,
                exceptions => exceptions,
                resources => resources,
            })
            .map_err(|e| GeneratorError::Template(e.to_string()))?;

        Ok(vec![GeneratedFile {
            path: format!("{}.md", output_name(schema)),
            content,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apit_core::smithy;
    use apit_core::transform::import;

    const MODEL: &str = r#"$version: "2"
namespace example.weather

/// Provides weather forecasts.
service Weather {
    version: "2024-01-01"
    resources: [City]
    errors: [ServiceFault]
}

resource City {
    identifiers: { cityId: CityId }
    read: GetCity
}

@pattern("^[a-z]+$")
string CityId

/// Look up a city.
@readonly
@http(method: "GET", uri: "/cities/{cityId}")
@tags(["public"])
operation GetCity {
    input := {
        @required
        @httpLabel
        cityId: CityId
    }
    output := {
        @httpPayload
        city: City
    }
    errors: [NoSuchCity]
}

@error("client")
@httpError(404)
structure NoSuchCity {
    message: String
}

@error("server")
@httpError(503)
structure ServiceFault {}

structure City {
    /// Display name.
    @required
    name: String
    sky: Sky
}

enum Sky {
    CLEAR = "clear"
    CLOUDY = "cloudy"
}
"#;

    fn schema() -> Schema {
        import(&smithy::parse("weather.smithy", MODEL).unwrap()).unwrap()
    }

    fn render(config: &GeneratorConfig) -> String {
        let files = MarkdownGenerator.generate(&schema(), config).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "Weather.md");
        files[0].content.clone()
    }

    #[test]
    fn test_document_sections() {
        let md = render(&GeneratorConfig::default());
        assert!(md.starts_with("# Weather\n"));
        assert!(md.contains("Version: `2024-01-01`"));
        assert!(md.contains("Provides weather forecasts."));
        assert!(md.contains("### GetCity"));
        assert!(md.contains("`GET /cities/{cityId}` returns `200`"));
        assert!(md.contains("Look up a city."));
        assert!(md.contains("| `cityId` | [CityId](#cityid) | path | yes |  |"));
        assert!(md.contains("| `city` | [City](#city) | payload |  |"));
        assert!(md.contains("| 404 | [NoSuchCity](#nosuchcity) |"));
        assert!(md.contains("| 503 | [ServiceFault](#servicefault) |"));
        assert!(md.contains("| `name` | String | yes | Display name. |"));
        assert!(md.contains("| `CLEAR` | `\"clear\"` |  |"));
        assert!(md.contains("| [GetCity](#getcity) | read |"));
        assert!(md.contains("HTTP `404` (client fault)"));
        assert!(!md.contains("GetCityInput"));
        assert!(!md.contains("## Contents"));
    }

    #[test]
    fn test_params_and_sort() {
        let mut config = GeneratorConfig {
            sort: true,
            ..Default::default()
        };
        config.set_param("title=Weather Service");
        config.set_param("toc");
        let md = render(&config);
        assert!(md.starts_with("# Weather Service\n"));
        assert!(md.contains("## Contents"));
        let city = md.find("\n### City\n").unwrap();
        let city_id = md.find("\n### CityId\n").unwrap();
        let sky = md.find("\n### Sky\n").unwrap();
        assert!(city < city_id && city_id < sky);
    }
}
