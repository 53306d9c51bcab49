//! SQLite repositories behind the application services
//!
//! Runs the real services over a database file so encryption, foreign keys
//! and cascades are exercised together.

use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use sercha_core::{
    AppSettingsService, ApplicationServices, ApplicationServicesBuilder, CredentialSecret,
    EventBus, ProviderType, ProvisionRequest, ProvisionSecret,
};
use sercha_oauth::FlowSettings;
use sercha_storage::{
    generate_master_key, Database, FieldEncryptor, SqliteAppSettingsRepository,
    SqliteAuthProviderRepository, SqliteCredentialsRepository, SqliteSourceRepository,
    KEY_SIZE,
};
use tests::db::TestDatabase;
use tests::fixtures::{oauth_provider, oauth_tokens};

fn services(db: Arc<Mutex<Database>>, key: &[u8; KEY_SIZE]) -> ApplicationServices {
    let encryptor = Arc::new(FieldEncryptor::new(key).unwrap());
    ApplicationServicesBuilder::new()
        .with_event_bus(Arc::new(EventBus::new()))
        .with_source_repo(Arc::new(SqliteSourceRepository::new(db.clone())))
        .with_auth_provider_repo(Arc::new(SqliteAuthProviderRepository::new(
            db.clone(),
            encryptor.clone(),
        )))
        .with_credentials_repo(Arc::new(SqliteCredentialsRepository::new(db, encryptor)))
        .build()
        .unwrap()
}

fn oauth_request(auth_provider_id: &str) -> ProvisionRequest {
    ProvisionRequest {
        connector_id: "gmail".to_string(),
        connector_name: "Gmail".to_string(),
        config: HashMap::from([("label_ids".to_string(), "INBOX".to_string())]),
        auth_provider_id: auth_provider_id.to_string(),
        secret: ProvisionSecret::OAuth {
            tokens: oauth_tokens("ya29.secret-access", Some("1//secret-refresh")),
            account_identifier: "me@example.com".to_string(),
        },
    }
}

#[tokio::test]
async fn test_provisioned_source_survives_reopen() {
    let key = generate_master_key().unwrap();
    let test_db = TestDatabase::new();
    let path = test_db.db_path().to_path_buf();
    let (db, _dir) = test_db.into_parts();
    let db = Arc::new(Mutex::new(db));

    let first = services(db.clone(), &key);
    let provider = oauth_provider("Google", ProviderType::Google, "https://oauth2.googleapis.com/token");
    first.auth_providers.save(&provider).await.unwrap();
    let outcome = first
        .provisioner
        .provision(oauth_request(&provider.id))
        .await
        .unwrap();
    drop(first);
    drop(db);

    let reopened = services(Arc::new(Mutex::new(Database::open(&path).unwrap())), &key);
    let source = reopened.sources.get(&outcome.source.id).await.unwrap();
    assert_eq!(source.name, "Gmail (me@example.com)");
    assert_eq!(source.auth_provider_id, provider.id);
    assert_eq!(source.config.get("label_ids").map(String::as_str), Some("INBOX"));

    let credentials = reopened
        .credentials
        .get_for_source(&source.id)
        .await
        .unwrap()
        .expect("credentials stored");
    assert_eq!(source.credentials_id, credentials.id);
    let CredentialSecret::OAuth(tokens) = &credentials.secret else {
        panic!("expected oauth secret");
    };
    assert_eq!(tokens.access_token, "ya29.secret-access");
    assert_eq!(tokens.refresh_token.as_deref(), Some("1//secret-refresh"));

    let stored_provider = reopened.auth_providers.get(&provider.id).await.unwrap();
    assert_eq!(stored_provider.oauth, provider.oauth);
}

#[tokio::test]
async fn test_secrets_are_not_stored_in_plaintext() {
    let key = generate_master_key().unwrap();
    let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
    let services = services(db.clone(), &key);

    let provider = oauth_provider("Google", ProviderType::Google, "");
    services.auth_providers.save(&provider).await.unwrap();
    services
        .provisioner
        .provision(oauth_request(&provider.id))
        .await
        .unwrap();

    let db = db.lock().await;
    let conn = db.connection();
    let (access, refresh): (String, String) = conn
        .query_row(
            "SELECT secret_value, refresh_token FROM credentials",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    let client_secret: String = conn
        .query_row("SELECT client_secret FROM auth_providers", [], |row| row.get(0))
        .unwrap();

    assert!(!access.contains("secret-access"));
    assert!(!refresh.contains("secret-refresh"));
    assert_ne!(client_secret, "test-secret");
}

#[tokio::test]
async fn test_wrong_key_cannot_read_credentials() {
    let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
    let writer = services(db.clone(), &generate_master_key().unwrap());
    let outcome = writer
        .provisioner
        .provision(ProvisionRequest {
            connector_id: "github".to_string(),
            connector_name: "GitHub".to_string(),
            config: HashMap::new(),
            auth_provider_id: String::new(),
            secret: ProvisionSecret::Pat {
                token: "ghp_secret".to_string(),
            },
        })
        .await
        .unwrap();

    let reader = services(db, &generate_master_key().unwrap());
    assert!(reader
        .credentials
        .get_for_source(&outcome.source.id)
        .await
        .is_err());
}

#[tokio::test]
async fn test_removing_source_removes_credentials() {
    let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
    let services = services(db, &generate_master_key().unwrap());
    let outcome = services
        .provisioner
        .provision(ProvisionRequest {
            connector_id: "github".to_string(),
            connector_name: "GitHub".to_string(),
            config: HashMap::new(),
            auth_provider_id: String::new(),
            secret: ProvisionSecret::Pat {
                token: "ghp_secret".to_string(),
            },
        })
        .await
        .unwrap();
    let credentials_id = outcome.credentials.unwrap().id;

    services.sources.remove(&outcome.source.id).await.unwrap();

    assert!(services.credentials.get(&credentials_id).await.is_err());
    assert!(services.sources.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_provider_in_use_survives_delete() {
    let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
    let services = services(db, &generate_master_key().unwrap());
    let provider = oauth_provider("Google", ProviderType::Google, "");
    services.auth_providers.save(&provider).await.unwrap();
    let outcome = services
        .provisioner
        .provision(oauth_request(&provider.id))
        .await
        .unwrap();

    assert!(services.auth_providers.delete(&provider.id).await.is_err());

    services.sources.remove(&outcome.source.id).await.unwrap();
    services.auth_providers.delete(&provider.id).await.unwrap();
    assert!(services
        .auth_providers
        .list_by_provider(ProviderType::Google)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_settings_persist_flow_configuration() {
    let test_db = TestDatabase::new();
    let path = test_db.db_path().to_path_buf();
    let (db, _dir) = test_db.into_parts();

    let settings = AppSettingsService::new(Arc::new(SqliteAppSettingsRepository::new(Arc::new(
        Mutex::new(db),
    ))));
    settings.set_oauth_callback_port(18085).await.unwrap();
    settings.set_oauth_callback_timeout_secs(120).await.unwrap();
    drop(settings);

    let reopened = AppSettingsService::new(Arc::new(SqliteAppSettingsRepository::new(Arc::new(
        Mutex::new(Database::open(&path).unwrap()),
    ))));
    let flow = FlowSettings::load(&reopened).await;
    assert_eq!(flow.callback_port, 18085);
    assert_eq!(flow.callback_port_range_end, 18099);
    assert_eq!(flow.callback_timeout, Duration::from_secs(120));
}
