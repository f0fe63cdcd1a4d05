use std::collections::BTreeSet;
use std::path::PathBuf;

use apit_core::error::{AssembleError, ModelError};
use apit_core::schema::{BaseType, HttpMethod, Schema};
use apit_core::{assemble_ast, assemble_model};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn weather() -> Schema {
    assemble_model(&[fixture("weather")], &[], None).unwrap()
}

fn ids<'a>(ids: impl Iterator<Item = &'a String>) -> BTreeSet<&'a str> {
    ids.map(String::as_str).collect()
}

#[test]
fn directory_of_idl_and_ast_files() {
    let schema = weather();
    assert_eq!(schema.id(), Some("example.weather#Weather"));
    assert_eq!(schema.version(), Some("2024-06-01"));
    assert_eq!(schema.comment(), Some("Provides weather forecasts for cities."));

    let station = schema.get_type_def("example.weather#Station").unwrap();
    assert_eq!(station.comment.as_deref(), Some("A measuring station."));
    assert!(station.fields[0].required);
    let station_id = schema.get_type_def("example.weather#StationId").unwrap();
    assert_eq!(station_id.base, BaseType::String);
    assert_eq!(station_id.constraints.min_size, Some(3));
    assert_eq!(station_id.constraints.max_size, Some(8));

    let city = schema.get_resource_def("example.weather#City").unwrap();
    assert_eq!(city.read.as_deref(), Some("example.weather#GetCity"));
    assert_eq!(city.resources, vec!["example.weather#Forecast"]);
}

#[test]
fn service_errors_reach_every_operation() {
    let schema = weather();
    assert_eq!(schema.operations().len(), 4);
    for op in schema.operations() {
        assert!(
            op.exceptions.iter().any(|e| e == "example.weather#ServiceUnavailable"),
            "{} is missing the service error",
            op.id
        );
    }
    let fault = schema.get_exception_def("example.weather#ServiceUnavailable").unwrap();
    assert_eq!(fault.http_status, 503);
    assert_eq!(fault.fault.as_deref(), Some("server"));
    assert!(fault.traits.has("smithy.api#retryable"));
}

#[test]
fn bindings_and_statuses_are_coherent() {
    let schema = weather();
    for op in schema.operations() {
        let payloads = op
            .input
            .iter()
            .flat_map(|i| &i.fields)
            .filter(|f| f.binding == apit_core::schema::InputBinding::Payload)
            .count();
        assert!(payloads <= 1, "{} has {payloads} input payloads", op.id);
        if op.http_method.expects_payload() {
            assert_eq!(payloads, 1, "{} needs a payload", op.id);
        }
        if matches!(op.output.http_status, 204 | 304) {
            assert!(op.output.payload_field().is_none());
        }
    }

    let report = schema.get_operation_def("example.weather#ReportStorm").unwrap();
    assert_eq!(report.http_method, HttpMethod::Post);
    assert_eq!(report.output.http_status, 201);
    let payload = report.input.as_ref().unwrap().payload_field().unwrap();
    assert_eq!(payload.field_type, "example.weather#ReportStormInputContent");
    let content = schema.get_type_def(&payload.field_type).unwrap();
    let names: Vec<&str> = content.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["severity", "observedAt"]);
}

#[test]
fn duplicate_shapes_across_files_conflict() {
    let err = assemble_model(&[fixture("duplicate")], &[], None).unwrap_err();
    assert!(matches!(
        err,
        AssembleError::Model(ModelError::MergeConflict(_))
    ));
}

#[test]
fn mixin_cycle_is_a_reference_error() {
    let err = assemble_model(&[fixture("mixin_cycle.smithy")], &[], None).unwrap_err();
    assert!(matches!(
        err,
        AssembleError::Model(ModelError::Reference(_))
    ));
}

#[test]
fn tag_filter_keeps_referenced_shapes() {
    let schema = assemble_model(&[fixture("tags.smithy")], &["public".to_string()], None).unwrap();
    assert_eq!(
        ids(schema.types().iter().map(|t| &t.id)),
        BTreeSet::from(["example.tags#A", "example.tags#B"])
    );
}

#[test]
fn tag_filter_prunes_service_bindings() {
    let schema = assemble_model(&[fixture("weather")], &["public".to_string()], None).unwrap();
    assert_eq!(
        ids(schema.operations().iter().map(|o| &o.id)),
        BTreeSet::from(["example.weather#GetCity"])
    );
    assert!(schema.resources().is_empty());
    assert_eq!(
        ids(schema.exceptions().iter().map(|e| &e.id)),
        BTreeSet::from([
            "example.weather#NoSuchResource",
            "example.weather#ServiceUnavailable"
        ])
    );
    let types = ids(schema.types().iter().map(|t| &t.id));
    assert!(types.contains("example.weather#CityId"));
    assert!(types.contains("example.weather#CityCoordinates"));
    assert!(!types.contains("example.weather#Severity"));
    assert!(!types.contains("example.weather#ForecastReport"));
    assert!(!types.contains("example.weather#Station"));
}

#[test]
fn list_reports_merged_shape_ids() {
    let ast = assemble_ast(&[fixture("weather")], &[], None).unwrap();
    let shapes = ast.shape_ids();
    // stations.json sorts before weather.smithy
    assert_eq!(shapes[0], "example.weather#StationId");
    assert!(shapes.iter().any(|id| id == "example.weather#Weather"));
}

#[test]
fn swagger_document() {
    let schema = assemble_model(&[fixture("inventory.json")], &[], None).unwrap();
    assert_eq!(schema.id(), Some("inventory#Inventory"));
    assert_eq!(schema.base(), Some("/api"));

    let get = schema.get_operation_def("inventory#GetItem").unwrap();
    assert_eq!(get.http_method, HttpMethod::Get);
    assert_eq!(get.output.http_status, 200);
    assert_eq!(get.exceptions, vec!["inventory#NotFoundException"]);
    assert_eq!(get.tags, vec!["public"]);
    let missing = schema.get_exception_def("inventory#NotFoundException").unwrap();
    assert_eq!(missing.http_status, 404);
    assert_eq!(missing.fault.as_deref(), Some("client"));

    let list = schema.get_operation_def("inventory#ListItems").unwrap();
    let limit = &list.input.as_ref().unwrap().fields[0];
    assert_eq!(limit.name, "limit");
    assert_eq!(limit.field_type, "base#Int32");
    assert_eq!(limit.constraints.max_value.as_ref().map(ToString::to_string), Some("50".to_string()));

    let create = schema.get_operation_def("inventory#CreateItem").unwrap();
    assert_eq!(create.output.http_status, 201);
    assert_eq!(create.exceptions, vec!["inventory#BadRequestException"]);

    let item = schema.get_type_def("inventory#X").unwrap();
    assert!(item.field("sku").unwrap().required);
    assert_eq!(item.field("count").unwrap().field_type, "base#Int64");
    assert_eq!(item.field("price").unwrap().field_type, "base#Float64");
}

#[test]
fn swagger_namespace_override() {
    let schema = assemble_model(&[fixture("inventory.json")], &[], Some("acme.stock")).unwrap();
    assert_eq!(schema.id(), Some("acme.stock#Inventory"));
}

#[test]
fn assembly_is_stable() {
    let a = serde_json::to_string(&weather()).unwrap();
    let b = serde_json::to_string(&weather()).unwrap();
    assert_eq!(a, b);
}
