use std::io::Write;

use restform_core::{read_spec_file, Catalog, LoadError, MapOptions, SecurityScheme, SpecFormat};
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("tempfile");
    f.write_all(contents.as_bytes()).expect("write");
    f
}

const ORDERS: &str = r##"{
  "openapi": "3.1.0",
  "servers": [{"url": "https://shop.example.com/api"}],
  "security": [{"token": []}],
  "components": {
    "securitySchemes": {
      "token": {"type": "http", "scheme": "bearer"},
      "key": {"type": "apiKey", "in": "query", "name": "api_key"},
      "mtls": {"type": "mutualTLS"}
    },
    "schemas": {
      "Order": {
        "type": "object",
        "properties": {
          "id": {"type": "integer", "readOnly": true},
          "item": {"type": "string"},
          "parent": {"$ref": "#/components/schemas/Order"}
        }
      }
    }
  },
  "paths": {
    "/orders": {
      "post": {
        "requestBody": {"content": {"application/json": {"schema": {"$ref": "#/components/schemas/Order"}}}},
        "responses": {"201": {"description": "ok", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Order"}}}}}
      }
    },
    "/orders/{order_id}": {
      "get": {
        "responses": {"200": {"description": "ok", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Order"}}}}}
      }
    }
  }
}"##;

#[test]
fn json_document_from_disk() {
    let f = write_temp(ORDERS);
    let doc = read_spec_file(f.path()).unwrap();
    assert_eq!(doc.format, SpecFormat::Json);
    assert_eq!(doc.openapi_version, "3.1.0");
    assert_eq!(doc.default_server().as_deref(), Some("https://shop.example.com/api"));
    assert_eq!(doc.global_security(), vec!["token".to_string()]);

    let schemes = doc.security_schemes();
    assert_eq!(schemes.get("token"), Some(&SecurityScheme::Bearer));
    assert_eq!(
        schemes.get("key"),
        Some(&SecurityScheme::ApiKeyQuery {
            name: "api_key".to_string()
        })
    );
    assert!(!schemes.contains_key("mtls"));
}

#[test]
fn recursive_optional_property_is_dropped_with_a_warning() {
    let f = write_temp(ORDERS);
    let doc = read_spec_file(f.path()).unwrap();

    let catalog = Catalog::build(&doc, MapOptions::default()).unwrap();
    let order = catalog.get("order").unwrap();
    assert_eq!(order.schema.identifier.as_deref(), Some("id"));
    assert!(order.schema.field("parent").is_none());
    assert_eq!(catalog.warnings().len(), 1);
    assert_eq!(catalog.warnings()[0].field, "parent");
    assert_eq!(catalog.default_base_url(), Some("https://shop.example.com/api"));

    let strict = Catalog::build(&doc, MapOptions { strict: true });
    assert!(matches!(strict, Err(LoadError::UnsupportedSchema(_))));
}

#[test]
fn unreadable_file_is_an_io_error() {
    let err = read_spec_file(std::path::Path::new("/nonexistent/openapi.yaml")).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn dangling_reference_is_fatal() {
    let f = write_temp(
        r##"
openapi: 3.0.0
paths:
  /things:
    post:
      requestBody:
        content:
          application/json:
            schema: { $ref: "#/components/schemas/Missing" }
      responses:
        "201": { description: ok }
"##,
    );
    let err = read_spec_file(f.path()).unwrap_err();
    assert!(matches!(err, LoadError::UnresolvedReference { .. }), "{err}");
}
