use apit_core::smithy::{self, Ast};
use apit_core::transform::{export, import};

const WEATHER: &str = include_str!("fixtures/weather/weather.smithy");
const TAGS: &str = include_str!("fixtures/tags.smithy");
const STATIONS: &str = include_str!("fixtures/weather/stations.json");

fn parse(src: &str) -> Ast {
    smithy::parse("weather.smithy", src).unwrap()
}

#[test]
fn idl_survives_unparse_and_reparse() {
    for src in [WEATHER, TAGS] {
        let ast = parse(src);
        let ns = ast.namespace().unwrap().to_string();
        let text = smithy::unparse(&ast, &ns);
        let again = smithy::parse("unparsed.smithy", &text).unwrap();
        assert_eq!(again, ast);
        assert_eq!(smithy::unparse(&again, &ns), text);
    }
}

#[test]
fn ast_json_survives_serialization() {
    let ast = parse(WEATHER);
    let back = Ast::from_json(&ast.to_json().unwrap()).unwrap();
    assert_eq!(back, ast);

    let stations = Ast::from_json(STATIONS).unwrap();
    let text = smithy::unparse(&stations, "example.weather");
    assert!(text.contains("/// A measuring station.\nstructure Station {"));
    assert_eq!(smithy::parse("stations.smithy", &text).unwrap(), stations);
}

#[test]
fn schema_survives_export_and_import() {
    let schema = import(&parse(WEATHER)).unwrap();
    schema.validate().unwrap();
    let exported = export(&schema);
    let again = import(&exported).unwrap();
    assert_eq!(again, schema);

    // the exported model is itself valid IDL
    let text = smithy::unparse(&exported, "example.weather");
    let reparsed = smithy::parse("exported.smithy", &text).unwrap();
    assert_eq!(import(&reparsed).unwrap(), schema);
}

#[test]
fn lowering_keeps_declaration_order() {
    let first = serde_json::to_string(&import(&parse(WEATHER)).unwrap()).unwrap();
    let second = serde_json::to_string(&import(&parse(WEATHER)).unwrap()).unwrap();
    assert_eq!(first, second);

    let schema = import(&parse(WEATHER)).unwrap();
    let summary = schema.get_type_def("example.weather#CitySummary").unwrap();
    let names: Vec<&str> = summary.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["cityId", "name"]);
    let severity = schema.get_type_def("example.weather#Severity").unwrap();
    let symbols: Vec<&str> = severity.elements.iter().map(|e| e.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["LOW", "HIGH"]);
}
