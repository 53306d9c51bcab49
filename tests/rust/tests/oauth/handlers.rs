//! Provider handlers against a mock token endpoint

use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sercha_core::{Credentials, ProviderType};
use sercha_oauth::{compute_expiry, OAuthError, OAuthHandler, TokenExchanger};
use tests::fixtures::{oauth_provider, oauth_tokens, token_body};
use tests::services::handlers_for;

#[test]
fn test_expiry_computation() {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
    assert_eq!(compute_expiry(now, Some(3600)), Some(now + Duration::seconds(3600)));
    assert_eq!(compute_expiry(now, Some(0)), None);
    assert_eq!(compute_expiry(now, Some(-5)), None);
    assert_eq!(compute_expiry(now, None), None);
}

#[tokio::test]
async fn test_github_code_exchange_sends_verifier() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("accept", "application/json"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .and(body_string_contains("code_verifier=the-verifier"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("gho_at", None, None)))
        .expect(1)
        .mount(&server)
        .await;

    let handlers = handlers_for(&server.uri(), TokenExchanger::default());
    let provider = oauth_provider("GitHub", ProviderType::GitHub, &format!("{}/token", server.uri()));
    let handler = handlers.get(ProviderType::GitHub).unwrap();

    let tokens = handler
        .exchange_code(&provider, "the-code", "http://localhost:18080/callback", "the-verifier")
        .await
        .unwrap();
    assert_eq!(tokens.access_token, "gho_at");
    assert_eq!(tokens.expiry, None);
}

#[tokio::test]
async fn test_exchange_sets_expiry_from_expires_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body("ya29", Some("1//rt"), Some(3600))),
        )
        .mount(&server)
        .await;

    let handlers = handlers_for(&server.uri(), TokenExchanger::default());
    let provider = oauth_provider("Google", ProviderType::Google, &format!("{}/token", server.uri()));
    let before = Utc::now();
    let tokens = handlers
        .get(ProviderType::Google)
        .unwrap()
        .exchange_code(&provider, "code", "http://localhost:18080/callback", "v")
        .await
        .unwrap();

    let expiry = tokens.expiry.expect("expiry set");
    assert!(expiry >= before + Duration::seconds(3600));
    assert!(expiry <= Utc::now() + Duration::seconds(3600));
    assert_eq!(tokens.refresh_token.as_deref(), Some("1//rt"));
}

#[tokio::test]
async fn test_github_error_with_ok_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        })))
        .mount(&server)
        .await;

    let handlers = handlers_for(&server.uri(), TokenExchanger::default());
    let provider = oauth_provider("GitHub", ProviderType::GitHub, &format!("{}/token", server.uri()));
    let err = handlers
        .get(ProviderType::GitHub)
        .unwrap()
        .exchange_code(&provider, "stale", "http://localhost:18080/callback", "v")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        OAuthError::TokenEndpoint {
            error: "bad_verification_code".to_string(),
            description: "The code passed is incorrect or expired.".to_string(),
        }
    );
}

#[tokio::test]
async fn test_non_json_error_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let handlers = handlers_for(&server.uri(), TokenExchanger::default());
    let provider = oauth_provider("Google", ProviderType::Google, &format!("{}/token", server.uri()));
    let err = handlers
        .get(ProviderType::Google)
        .unwrap()
        .exchange_code(&provider, "code", "http://localhost:18080/callback", "v")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "token request failed with status 502");
}

#[tokio::test]
async fn test_refresh_if_needed_renews_expired_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-new", None, Some(3600))))
        .expect(1)
        .mount(&server)
        .await;

    let handlers = handlers_for(&server.uri(), TokenExchanger::default());
    let provider = oauth_provider("Gmail", ProviderType::Google, &format!("{}/token", server.uri()));
    let mut tokens = oauth_tokens("at-old", Some("rt-old"));
    tokens.expiry = Some(Utc::now() - Duration::minutes(5));
    let mut credentials = Credentials::oauth("src-1", "me@example.com", tokens);

    let refreshed = handlers
        .refresh_if_needed(&provider, &mut credentials, Utc::now())
        .await
        .unwrap();

    assert!(refreshed);
    assert_eq!(credentials.access_token(), Some("at-new"));
    // Not rotated, so the old refresh token stays
    assert_eq!(
        credentials.oauth_tokens().and_then(|o| o.refresh_token.as_deref()),
        Some("rt-old")
    );
    assert!(!credentials.is_expired_at(Utc::now()));
}

#[tokio::test]
async fn test_refresh_if_needed_skips_valid_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let handlers = handlers_for(&server.uri(), TokenExchanger::default());
    let provider = oauth_provider("Gmail", ProviderType::Google, &format!("{}/token", server.uri()));
    let mut tokens = oauth_tokens("at", Some("rt"));
    tokens.expiry = Some(Utc::now() + Duration::hours(1));
    let mut credentials = Credentials::oauth("src-1", "", tokens);

    let refreshed = handlers
        .refresh_if_needed(&provider, &mut credentials, Utc::now())
        .await
        .unwrap();
    assert!(!refreshed);
    assert_eq!(credentials.access_token(), Some("at"));
}

#[tokio::test]
async fn test_refresh_invalid_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    let handlers = handlers_for(&server.uri(), TokenExchanger::default());
    let provider = oauth_provider("Gmail", ProviderType::Google, &format!("{}/token", server.uri()));
    let err = handlers
        .get(ProviderType::Google)
        .unwrap()
        .refresh_token(&provider, "revoked")
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "token error: invalid_grant - Token has been expired or revoked."
    );
}

#[test]
fn test_unsupported_provider() {
    let handlers = handlers_for("http://127.0.0.1:9", TokenExchanger::default());
    assert!(matches!(
        handlers.get(ProviderType::Slack),
        Err(OAuthError::UnsupportedProvider(ProviderType::Slack))
    ));
}
