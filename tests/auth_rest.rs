//! Identity Toolkit REST client against a mock server

use firebase_auth_bridge::{AppOptions, Auth, AuthBridge, AuthError, AuthEvent, Credential, FirebaseError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SIGN_UP: &str = "/identitytoolkit.googleapis.com/v1/accounts:signUp";
const SIGN_IN_WITH_IDP: &str = "/identitytoolkit.googleapis.com/v1/accounts:signInWithIdp";

fn auth_for(server: &MockServer) -> Auth {
    let options = AppOptions::new("test-api-key", "test-project")
        .with_auth_emulator_host(server.address().to_string());
    Auth::new(&options).unwrap()
}

fn anonymous_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "kind": "identitytoolkit#SignupNewUserResponse",
        "localId": "anon-uid",
        "idToken": "anon-id-token",
        "refreshToken": "anon-refresh-token",
        "expiresIn": "3600"
    }))
}

fn error_response(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "error": { "code": 400, "message": message, "errors": [] }
    }))
}

fn idp_response(local_id: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "federatedId": "https://accounts.google.com/1234",
        "providerId": "google.com",
        "localId": local_id,
        "email": "player@gmail.com",
        "emailVerified": true,
        "displayName": "Player One",
        "photoUrl": "https://lh3.googleusercontent.com/p.png",
        "idToken": "google-session-id-token",
        "refreshToken": "google-session-refresh",
        "expiresIn": "3600",
        "rawUserInfo": "{\"sub\":\"1234\",\"name\":\"Player One\"}"
    }))
}

async fn mount_anonymous(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path(SIGN_UP))
        .and(query_param("key", "test-api-key"))
        .and(body_partial_json(json!({ "returnSecureToken": true })))
        .respond_with(anonymous_response())
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sign_in_anonymously_creates_anonymous_user() {
    let server = MockServer::start().await;
    mount_anonymous(&server, 1).await;
    let auth = auth_for(&server);

    let result = auth.sign_in_anonymously().await.unwrap();

    assert_eq!(result.user.uid, "anon-uid");
    assert!(result.user.is_anonymous);
    assert_eq!(result.user.id_token(), Some("anon-id-token"));
    assert!(result.additional_user_info.unwrap().is_new_user);
    assert_eq!(auth.current_user().unwrap().uid, "anon-uid");
}

#[tokio::test]
async fn test_error_codes_are_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SIGN_UP))
        .respond_with(error_response("TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account has been temporarily disabled"))
        .mount(&server)
        .await;
    let auth = auth_for(&server);

    let err = auth.sign_in_anonymously().await.unwrap_err();
    assert!(matches!(err, FirebaseError::Auth(AuthError::TooManyRequests)));
    assert!(err.is_retryable());
    assert!(auth.current_user().is_none());
}

#[tokio::test]
async fn test_unknown_error_code_kept_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SIGN_UP))
        .respond_with(error_response("PROJECT_DISABLED"))
        .mount(&server)
        .await;

    let err = auth_for(&server).sign_in_anonymously().await.unwrap_err();
    assert_eq!(err.to_event_message(), "PROJECT_DISABLED");
}

#[tokio::test]
async fn test_sign_in_with_google_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SIGN_IN_WITH_IDP))
        .and(body_partial_json(json!({
            "postBody": "providerId=google.com&id_token=gid&access_token=gat",
            "requestUri": "http://localhost",
            "returnSecureToken": true
        })))
        .respond_with(idp_response("google-uid"))
        .expect(1)
        .mount(&server)
        .await;
    let auth = auth_for(&server);

    let result = auth.sign_in_with_credential(Credential::google("gid", "gat")).await.unwrap();

    let user = &result.user;
    assert_eq!(user.uid, "google-uid");
    assert!(!user.is_anonymous);
    assert!(user.email_verified);
    assert_eq!(user.photo_url.as_deref(), Some("https://lh3.googleusercontent.com/p.png"));
    assert!(user.is_linked_with("google.com"));

    let info = result.additional_user_info.unwrap();
    assert_eq!(info.provider_id, "google.com");
    assert_eq!(info.profile.unwrap()["sub"], "1234");
}

#[tokio::test]
async fn test_link_anonymous_user_then_already_linked() {
    let server = MockServer::start().await;
    mount_anonymous(&server, 1).await;
    Mock::given(method("POST"))
        .and(path(SIGN_IN_WITH_IDP))
        .and(body_partial_json(json!({ "idToken": "anon-id-token" })))
        .respond_with(idp_response("anon-uid"))
        .expect(1)
        .mount(&server)
        .await;
    let auth = auth_for(&server);

    auth.sign_in_anonymously().await.unwrap();
    let linked = auth.link_with_credential(Credential::google("gid", "gat")).await.unwrap();

    assert_eq!(linked.user.uid, "anon-uid");
    assert!(!linked.user.is_anonymous);
    assert_eq!(linked.user.display_name.as_deref(), Some("Player One"));

    // Second link is refused locally; the mock expects exactly one call
    let err = auth.link_with_credential(Credential::google("gid", "gat")).await.unwrap_err();
    assert!(matches!(err, FirebaseError::Auth(AuthError::ProviderAlreadyLinked)));
}

#[tokio::test]
async fn test_link_credential_owned_by_other_account() {
    let server = MockServer::start().await;
    mount_anonymous(&server, 1).await;
    Mock::given(method("POST"))
        .and(path(SIGN_IN_WITH_IDP))
        .respond_with(error_response("FEDERATED_USER_ID_ALREADY_LINKED"))
        .mount(&server)
        .await;
    let auth = auth_for(&server);

    auth.sign_in_anonymously().await.unwrap();
    let err = auth.link_with_credential(Credential::google("gid", "gat")).await.unwrap_err();

    assert!(matches!(err, FirebaseError::Auth(AuthError::CredentialAlreadyInUse)));
    assert!(auth.current_user().unwrap().is_anonymous);
}

#[tokio::test]
async fn test_bridge_over_rest_reuses_session() {
    let server = MockServer::start().await;
    mount_anonymous(&server, 1).await;

    let config = json!({
        "API_KEY": "test-api-key",
        "PROJECT_ID": "test-project",
        "AUTH_EMULATOR_HOST": server.address().to_string()
    });
    let (bridge, mut pump) = AuthBridge::builder()
        .config_json(config.to_string())
        .http_timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    bridge.initialize();
    assert_eq!(pump.next_event().await, Some(AuthEvent::Initialized));

    bridge.sign_in_anonymously();
    let first = tokio::time::timeout(Duration::from_secs(5), pump.next_event())
        .await
        .unwrap()
        .unwrap();
    assert!(first.user().unwrap().is_anonymous);

    bridge.sign_in_anonymously();
    let second = pump.next_event().await.unwrap();
    assert_eq!(first, second);

    bridge.sign_out();
    assert_eq!(pump.next_event().await, Some(AuthEvent::SignOutSuccess(true)));
    assert!(bridge.get_current_user_data().is_empty());
}
