use restform_exec::secrets::{
    CompositeProvider, EnvSecretsProvider, FileSecretsProvider, SecretError, SecretRef,
    SecretsProvider, StaticSecretsProvider,
};
use tempfile::TempDir;

#[tokio::test]
async fn env_provider_reads_prefixed_variables() {
    std::env::set_var("RESTFORM_TEST_TOKEN", "from-env");
    let provider = EnvSecretsProvider {
        scheme: "secrets".to_string(),
        env_prefix: Some("RESTFORM_TEST_".to_string()),
    };
    let value = provider.get(&SecretRef::new("secrets", "TOKEN")).await.unwrap();
    assert_eq!(value.expose_str(), Some("from-env"));
    std::env::remove_var("RESTFORM_TEST_TOKEN");
}

#[tokio::test]
async fn env_provider_ignores_other_schemes() {
    let provider = EnvSecretsProvider::default();
    let err = provider
        .get(&SecretRef::new("vault", "anything"))
        .await
        .unwrap_err();
    assert!(matches!(err, SecretError::NotFound(_)));
}

#[tokio::test]
async fn file_provider_reads_and_trims() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("team")).unwrap();
    std::fs::write(dir.path().join("team/key"), "s3cret\n").unwrap();

    let provider = FileSecretsProvider {
        scheme: "file-secrets".to_string(),
        base_dir: dir.path().to_path_buf(),
    };
    let value = provider
        .get(&SecretRef::new("file-secrets", "team/key"))
        .await
        .unwrap();
    assert_eq!(value.expose_str(), Some("s3cret"));
    assert_eq!(value.expose_bytes(), b"s3cret\n");
}

#[tokio::test]
async fn file_provider_refuses_to_leave_its_directory() {
    let dir = TempDir::new().unwrap();
    let provider = FileSecretsProvider {
        scheme: "file-secrets".to_string(),
        base_dir: dir.path().to_path_buf(),
    };
    let err = provider
        .get(&SecretRef::new("file-secrets", "../etc/passwd"))
        .await
        .unwrap_err();
    assert!(matches!(err, SecretError::Provider { .. }));
}

#[tokio::test]
async fn composite_falls_through_to_the_next_provider() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("db"), "pw").unwrap();
    let composite = CompositeProvider::new(vec![
        Box::new(StaticSecretsProvider::default().with(SecretRef::new("secrets", "A"), "a")),
        Box::new(CompositeProvider::standard(dir.path())),
    ]);

    let a = composite.get(&SecretRef::new("secrets", "A")).await.unwrap();
    assert_eq!(a.expose_str(), Some("a"));
    let db = composite.get(&SecretRef::new("file-secrets", "db")).await.unwrap();
    assert_eq!(db.expose_str(), Some("pw"));

    let missing = SecretRef::new("secrets", "RESTFORM_DEFINITELY_UNSET");
    assert!(matches!(
        composite.get(&missing).await,
        Err(SecretError::NotFound(r)) if r == missing
    ));
}

#[test]
fn secret_values_are_not_printed() {
    let v = restform_exec::secrets::SecretValue::from_string("hunter2".to_string());
    assert!(!format!("{v:?}").contains("hunter2"));
}
