//! Tests for CredentialProvisioner
//!
//! Validates the source-then-credentials ordering, rollback and the
//! orphaned-source path.

use pretty_assertions::assert_eq;
use std::collections::HashMap;

use sercha_core::{
    CredentialSecret, DomainEvent, ProvisionError, ProvisionRequest, ProvisionSecret,
    ProvisionWarning,
};
use tests::events::drain;
use tests::fixtures::oauth_tokens;
use tests::mocks::MockRepositories;
use tests::services::mock_services;

fn request(connector_id: &str, config: &[(&str, &str)], secret: ProvisionSecret) -> ProvisionRequest {
    ProvisionRequest {
        connector_id: connector_id.to_string(),
        connector_name: "GitHub".to_string(),
        config: config
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
        auth_provider_id: String::new(),
        secret,
    }
}

fn pat(token: &str) -> ProvisionSecret {
    ProvisionSecret::Pat {
        token: token.to_string(),
    }
}

#[tokio::test]
async fn test_provision_pat_links_credentials() {
    let mocks = MockRepositories::new();
    let services = mock_services(&mocks);

    let outcome = services
        .provisioner
        .provision(request("github", &[("owner", "custodia"), ("repo", "sercha")], pat(" ghp_x ")))
        .await
        .unwrap();

    assert_eq!(outcome.source.name, "custodia/sercha");
    assert!(outcome.warnings.is_empty());
    let credentials = outcome.credentials.expect("credentials");
    assert_eq!(credentials.source_id, outcome.source.id);
    assert_eq!(credentials.access_token(), Some("ghp_x"));

    // The stored source points at its credentials
    let stored = services.sources.get(&outcome.source.id).await.unwrap();
    assert_eq!(stored.credentials_id, credentials.id);
    assert_eq!(mocks.credentials.count(), 1);
}

#[tokio::test]
async fn test_provision_without_auth_creates_source_only() {
    let mocks = MockRepositories::new();
    let services = mock_services(&mocks);

    let outcome = services
        .provisioner
        .provision(request("filesystem", &[("path", "/srv/docs")], ProvisionSecret::None))
        .await
        .unwrap();

    assert!(outcome.credentials.is_none());
    assert!(!outcome.source.has_credentials());
    assert_eq!(mocks.sources.count(), 1);
    assert_eq!(mocks.credentials.count(), 0);
}

#[tokio::test]
async fn test_provision_oauth_names_account() {
    let mocks = MockRepositories::new();
    let services = mock_services(&mocks);
    let mut req = request(
        "gmail",
        &[],
        ProvisionSecret::OAuth {
            tokens: oauth_tokens("ya29", Some("1//rt")),
            account_identifier: "me@example.com".to_string(),
        },
    );
    req.connector_name = "Gmail".to_string();
    req.auth_provider_id = "ap-1".to_string();

    let outcome = services.provisioner.provision(req).await.unwrap();

    assert_eq!(outcome.source.name, "Gmail (me@example.com)");
    assert_eq!(outcome.source.auth_provider_id, "ap-1");
    let credentials = outcome.credentials.unwrap();
    assert_eq!(credentials.account_identifier, "me@example.com");
    assert!(matches!(credentials.secret, CredentialSecret::OAuth(_)));
}

#[tokio::test]
async fn test_source_failure_saves_nothing() {
    let mocks = MockRepositories::new();
    mocks.sources.fail_inserts(true);
    let services = mock_services(&mocks);

    let err = services
        .provisioner
        .provision(request("github", &[], pat("ghp_x")))
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::SourceCreate(_)));
    assert_eq!(mocks.sources.count(), 0);
    assert_eq!(mocks.credentials.count(), 0);
}

#[tokio::test]
async fn test_credentials_failure_rolls_back_source() {
    let mocks = MockRepositories::new();
    mocks.credentials.fail_saves(true);
    let services = mock_services(&mocks);
    let mut rx = services.event_bus.subscribe();

    let err = services
        .provisioner
        .provision(request("github", &[], pat("ghp_x")))
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::CredentialsSave(_)));
    assert!(!err.needs_manual_cleanup());
    assert_eq!(mocks.sources.count(), 0);

    let types: Vec<&str> = drain(&mut rx).iter().map(|e| e.type_name()).collect();
    assert_eq!(types, vec!["source_added", "source_removed"]);
}

#[tokio::test]
async fn test_failed_rollback_reports_orphan() {
    let mocks = MockRepositories::new();
    mocks.credentials.fail_saves(true);
    mocks.sources.fail_deletes(true);
    let services = mock_services(&mocks);
    let mut rx = services.event_bus.subscribe();

    let err = services
        .provisioner
        .provision(request("github", &[], pat("ghp_x")))
        .await
        .unwrap_err();

    let ProvisionError::RollbackFailed { source_id, .. } = &err else {
        panic!("expected RollbackFailed, got {:?}", err);
    };
    assert!(err.needs_manual_cleanup());
    assert_eq!(mocks.sources.count(), 1);
    assert_eq!(mocks.sources.all()[0].id, *source_id);

    let orphaned = drain(&mut rx)
        .into_iter()
        .find(|e| matches!(e, DomainEvent::SourceOrphaned { .. }));
    assert_eq!(
        orphaned,
        Some(DomainEvent::SourceOrphaned {
            source_id: source_id.clone(),
            reason: "injected source delete failure".to_string(),
        })
    );
}

#[tokio::test]
async fn test_link_failure_is_a_warning() {
    let mocks = MockRepositories::new();
    mocks.sources.fail_updates(true);
    let services = mock_services(&mocks);

    let outcome = services
        .provisioner
        .provision(request("github", &[], pat("ghp_x")))
        .await
        .unwrap();

    assert_eq!(
        outcome.warnings,
        vec![ProvisionWarning::CredentialsLinkFailed {
            source_id: outcome.source.id.clone(),
            error: "injected source update failure".to_string(),
        }]
    );
    // Credentials stay; the stored source just lacks the back-reference
    assert_eq!(mocks.credentials.count(), 1);
    let stored = services.sources.get(&outcome.source.id).await.unwrap();
    assert!(stored.credentials_id.is_empty());
}
