use assert_cmd::Command;
use tempfile::NamedTempFile;

const SPEC: &str = r##"
openapi: 3.0.3
info: { title: Widgets, version: "1.0" }
servers:
  - url: https://api.example.com
components:
  securitySchemes:
    key: { type: apiKey, in: header, name: X-Api-Key }
  schemas:
    Widget:
      type: object
      required: [name]
      properties:
        id: { type: string, readOnly: true }
        name: { type: string }
        secret: { type: string, x-restform-sensitive: true }
security:
  - key: []
paths:
  /widgets:
    post:
      requestBody:
        content:
          application/json:
            schema: { $ref: "#/components/schemas/Widget" }
      responses:
        "201":
          description: created
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Widget" }
  /widgets/{id}:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Widget" }
"##;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("tempfile");
    std::io::Write::write_all(&mut f, contents.as_bytes()).expect("write");
    f
}

fn restform() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("restform"))
}

#[test]
fn validate_returns_0_for_mappable_document() {
    let f = write_temp(SPEC);
    let out = restform()
        .args(["validate", f.path().to_string_lossy().as_ref(), "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["valid"], true);
    assert_eq!(v["resources"], serde_json::json!(["widget"]));
}

#[test]
fn validate_returns_2_for_malformed_document() {
    let f = write_temp("openapi: 2.0\npaths: {}\n");
    restform()
        .args(["validate", f.path().to_string_lossy().as_ref()])
        .assert()
        .code(2);
}

#[test]
fn validate_returns_4_for_missing_file() {
    restform()
        .args(["validate", "/no/such/spec.yaml"])
        .assert()
        .code(4);
}

#[test]
fn resources_shows_field_flags() {
    let f = write_temp(SPEC);
    let out = restform()
        .args(["resources", f.path().to_string_lossy().as_ref(), "widget"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("- id: string (computed)"), "{text}");
    assert!(text.contains("- name: string (required)"), "{text}");
    assert!(text.contains("- secret: string (sensitive)"), "{text}");
}

#[test]
fn resources_rejects_unknown_name() {
    let f = write_temp(SPEC);
    restform()
        .args(["resources", f.path().to_string_lossy().as_ref(), "gizmo"])
        .assert()
        .code(2);
}

#[test]
fn plan_redacts_credentials_and_sensitive_fields() {
    let spec = write_temp(SPEC);
    let config = write_temp("credentials:\n  key: literal-key-value\n");
    let out = restform()
        .args([
            "plan",
            spec.path().to_string_lossy().as_ref(),
            "widget",
            "create",
            "--config",
            config.path().to_string_lossy().as_ref(),
            "--set",
            "name=foo",
            "--set",
            "secret=hunter2",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).unwrap();
    assert!(!text.contains("literal-key-value"), "{text}");
    assert!(!text.contains("hunter2"), "{text}");

    let v: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(v["method"], "POST");
    assert_eq!(v["url"], "https://api.example.com/widgets");
    assert_eq!(v["body"]["name"], "foo");
}

#[test]
fn plan_without_identifier_fails_validation() {
    let spec = write_temp(SPEC);
    restform()
        .args(["plan", spec.path().to_string_lossy().as_ref(), "widget", "read"])
        .assert()
        .code(2);
}
