//! Tests for the domain services
//!
//! Validates sources, OAuth app registrations, credentials and settings
//! rules, and the events each change emits.

use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sercha_core::{AppSettingsService, CoreError, Credentials, DomainEvent, ProviderType, Source};
use sercha_oauth::FlowSettings;
use tests::events::drain;
use tests::fixtures::oauth_provider;
use tests::mocks::{MockAppSettingsRepository, MockRepositories};
use tests::services::mock_services;

fn source(source_type: &str, name: &str) -> Source {
    Source::new(source_type, name, HashMap::new())
}

// ============================================================================
// SourceService
// ============================================================================

#[tokio::test]
async fn test_add_source_emits_source_added() {
    let mocks = MockRepositories::new();
    let services = mock_services(&mocks);
    let mut rx = services.event_bus.subscribe();

    let src = source("github", "custodia/sercha");
    services.sources.add(&src).await.unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![DomainEvent::SourceAdded {
            source_id: src.id.clone(),
            source_type: "github".to_string(),
            name: "custodia/sercha".to_string(),
        }]
    );
    assert_eq!(services.sources.get(&src.id).await.unwrap(), src);
}

#[tokio::test]
async fn test_add_duplicate_source_rejected() {
    let mocks = MockRepositories::new();
    let services = mock_services(&mocks);
    let src = source("filesystem", "/srv");
    services.sources.add(&src).await.unwrap();

    let err = services.sources.add(&src).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyExists(_)));
    assert_eq!(mocks.sources.count(), 1);
}

#[tokio::test]
async fn test_add_source_requires_id() {
    let mocks = MockRepositories::new();
    let services = mock_services(&mocks);
    let mut src = source("filesystem", "/srv");
    src.id.clear();

    let err = services.sources.add(&src).await.unwrap_err();
    assert!(err.is_user_error());
}

#[tokio::test]
async fn test_update_keeps_created_at() {
    let mocks = MockRepositories::new();
    let services = mock_services(&mocks);
    let src = source("github", "old");
    services.sources.add(&src).await.unwrap();
    let mut rx = services.event_bus.subscribe();

    let mut renamed = src.clone();
    renamed.name = "new".to_string();
    renamed.created_at = chrono::Utc::now() + chrono::Duration::days(1);
    services.sources.update(&renamed).await.unwrap();

    let stored = services.sources.get(&src.id).await.unwrap();
    assert_eq!(stored.name, "new");
    assert_eq!(stored.created_at, src.created_at);
    assert_eq!(
        drain(&mut rx),
        vec![DomainEvent::SourceUpdated {
            source_id: src.id.clone()
        }]
    );
}

#[tokio::test]
async fn test_update_unknown_source_not_found() {
    let mocks = MockRepositories::new();
    let services = mock_services(&mocks);
    let err = services.sources.update(&source("github", "x")).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn test_remove_source_emits_source_removed() {
    let mocks = MockRepositories::new();
    let services = mock_services(&mocks);
    let src = source("github", "x");
    services.sources.add(&src).await.unwrap();
    let mut rx = services.event_bus.subscribe();

    services.sources.remove(&src.id).await.unwrap();

    assert_eq!(mocks.sources.count(), 0);
    let event = rx.try_recv().unwrap();
    assert_eq!(event.source_id(), Some(src.id.as_str()));
    assert_eq!(event.type_name(), "source_removed");
}

#[tokio::test]
async fn test_validate_config_uses_connector() {
    let mocks = MockRepositories::new();
    let services = mock_services(&mocks);

    let err = services
        .sources
        .validate_config("filesystem", &HashMap::new())
        .unwrap_err();
    assert_eq!(err.to_string(), "missing required config keys: path");
    assert!(matches!(
        services.sources.validate_config("dropbox", &HashMap::new()),
        Err(CoreError::UnknownConnector(_))
    ));
}

// ============================================================================
// AuthProviderService
// ============================================================================

#[tokio::test]
async fn test_save_provider_emits_created_once() {
    let mocks = MockRepositories::new();
    let services = mock_services(&mocks);
    let mut rx = services.event_bus.subscribe();

    let mut provider = oauth_provider("Work Google", ProviderType::Google, "");
    services.auth_providers.save(&provider).await.unwrap();
    provider.name = "Work Google (renamed)".to_string();
    services.auth_providers.save(&provider).await.unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![DomainEvent::AuthProviderCreated {
            auth_provider_id: provider.id.clone(),
            provider_type: ProviderType::Google,
            name: "Work Google".to_string(),
        }]
    );
    let stored = services.auth_providers.get(&provider.id).await.unwrap();
    assert_eq!(stored.name, "Work Google (renamed)");
}

#[tokio::test]
async fn test_list_by_provider_filters_type() {
    let google = oauth_provider("Google", ProviderType::Google, "");
    let github = oauth_provider("GitHub", ProviderType::GitHub, "");
    let mocks = MockRepositories::with_auth_providers([google.clone(), github]);
    let services = mock_services(&mocks);

    let found = services
        .auth_providers
        .list_by_provider(ProviderType::Google)
        .await
        .unwrap();
    assert_eq!(found, vec![google]);
    assert_eq!(services.auth_providers.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_provider_in_use_rejected() {
    let provider = oauth_provider("Google", ProviderType::Google, "");
    let mocks = MockRepositories::with_auth_providers([provider.clone()]);
    let services = mock_services(&mocks);
    let src = source("gmail", "Gmail").with_auth_provider(&provider.id);
    services.sources.add(&src).await.unwrap();

    let err = services.auth_providers.delete(&provider.id).await.unwrap_err();
    assert!(matches!(err, CoreError::AuthProviderInUse));
    assert_eq!(mocks.auth_providers.count(), 1);

    services.sources.remove(&src.id).await.unwrap();
    let mut rx = services.event_bus.subscribe();
    services.auth_providers.delete(&provider.id).await.unwrap();
    assert_eq!(mocks.auth_providers.count(), 0);
    assert_eq!(
        drain(&mut rx),
        vec![DomainEvent::AuthProviderDeleted {
            auth_provider_id: provider.id.clone()
        }]
    );
}

#[tokio::test]
async fn test_get_unknown_provider_not_found() {
    let mocks = MockRepositories::new();
    let services = mock_services(&mocks);
    assert!(matches!(
        services.auth_providers.get("missing").await,
        Err(CoreError::NotFound(_))
    ));
}

// ============================================================================
// CredentialsService
// ============================================================================

#[tokio::test]
async fn test_credentials_require_source() {
    let mocks = MockRepositories::new();
    let services = mock_services(&mocks);

    let err = services
        .credentials
        .save(&Credentials::pat("", "ghp_x"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_)));
    assert_eq!(mocks.credentials.count(), 0);
}

#[tokio::test]
async fn test_credentials_roundtrip_and_events() {
    let mocks = MockRepositories::new();
    let services = mock_services(&mocks);
    let mut rx = services.event_bus.subscribe();

    let creds = Credentials::pat("src-1", "ghp_x");
    services.credentials.save(&creds).await.unwrap();
    assert_eq!(services.credentials.get(&creds.id).await.unwrap(), creds);
    assert_eq!(
        services.credentials.get_for_source("src-1").await.unwrap(),
        Some(creds.clone())
    );

    services.credentials.delete(&creds.id).await.unwrap();
    assert!(matches!(
        services.credentials.get(&creds.id).await,
        Err(CoreError::NotFound(_))
    ));

    let types: Vec<&str> = drain(&mut rx).iter().map(|e| e.type_name()).collect();
    assert_eq!(types, vec!["credentials_saved", "credentials_deleted"]);
}

// ============================================================================
// Settings
// ============================================================================

#[tokio::test]
async fn test_flow_settings_read_oauth_keys() {
    let settings = AppSettingsService::new(Arc::new(MockAppSettingsRepository::new()));

    let defaults = FlowSettings::load(&settings).await;
    assert_eq!(defaults, FlowSettings::default());
    assert_eq!(defaults.callback_port, 18080);
    assert_eq!(defaults.callback_port_range_end, 18099);

    settings.set_oauth_callback_port(19000).await.unwrap();
    settings.set_oauth_callback_port_range_end(19010).await.unwrap();
    settings.set_oauth_callback_timeout_secs(45).await.unwrap();
    settings.set_oauth_token_timeout_secs(5).await.unwrap();

    let loaded = FlowSettings::load(&settings).await;
    assert_eq!(
        loaded,
        FlowSettings {
            callback_port: 19000,
            callback_port_range_end: 19010,
            callback_timeout: Duration::from_secs(45),
            token_timeout: Duration::from_secs(5),
        }
    );
    assert_eq!(
        settings.list_by_prefix("oauth.").await.unwrap().len(),
        4
    );
}
