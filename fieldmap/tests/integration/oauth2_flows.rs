use fieldmap::{AuthFlowState, CallbackParams, OAuth2Error};

use crate::common::mock_server::{
    MOCK_REFRESH_TOKEN, MOCK_USER_EMAIL, REJECTED_CODE, SHORT_LIVED_CODE,
};
use crate::common::{
    MockServer, TEST_BASE_URL, TEST_CLIENT_ID, coordinator, init_test_environment, query_param,
};

fn callback(code: &str, state: &str) -> CallbackParams {
    CallbackParams {
        code: Some(code.to_string()),
        state: Some(state.to_string()),
        error: None,
    }
}

#[tokio::test]
async fn test_authorization_url_targets_provider() {
    init_test_environment();
    let server = MockServer::start().await;
    let mut auth = coordinator(&server);

    let url = auth.build_auth_url().expect("auth url");
    assert!(url.starts_with(&format!("{}/auth?", server.base_url)));
    assert_eq!(query_param(&url, "client_id").as_deref(), Some(TEST_CLIENT_ID));
    assert_eq!(query_param(&url, "redirect_uri").as_deref(), Some(TEST_BASE_URL));
    assert_eq!(query_param(&url, "response_type").as_deref(), Some("code"));
    assert_eq!(query_param(&url, "access_type").as_deref(), Some("offline"));
    assert_eq!(query_param(&url, "prompt").as_deref(), Some("consent"));
    assert!(
        query_param(&url, "scope")
            .unwrap()
            .contains("https://www.googleapis.com/auth/drive.file")
    );
    assert!(auth.state().is_pending());
}

/// The user comes back from the consent page to a process that has never
/// seen the flow start.
#[tokio::test]
async fn test_callback_completes_after_state_loss() {
    init_test_environment();
    let server = MockServer::start().await;

    let url = coordinator(&server).build_auth_url().unwrap();
    let state = query_param(&url, "state").unwrap();

    let mut fresh = coordinator(&server);
    assert_eq!(fresh.state(), &AuthFlowState::Idle);
    fresh
        .handle_callback(&callback("lab-code-1", &state))
        .await
        .expect("callback succeeds");

    assert_eq!(fresh.state(), &AuthFlowState::Authenticated);
    assert!(fresh.is_authenticated().await);

    let token = fresh.tokens().token().unwrap();
    assert!(token.access_token.starts_with("mock-access"));
    assert_eq!(token.refresh_token.as_deref(), Some(MOCK_REFRESH_TOKEN));
    assert_eq!(token.token_uri, format!("{}/token", server.base_url));

    let form = server.state().last_token_form.clone().unwrap();
    assert_eq!(form["grant_type"], "authorization_code");
    assert_eq!(form["code"], "lab-code-1");
    assert_eq!(form["redirect_uri"], TEST_BASE_URL);

    assert_eq!(
        fresh.tokens_mut().get_user_identity().await.as_deref(),
        Some(MOCK_USER_EMAIL)
    );
}

#[tokio::test]
async fn test_expired_access_token_refreshed_against_provider() {
    init_test_environment();
    let server = MockServer::start().await;
    let mut auth = coordinator(&server);

    let url = auth.build_auth_url().unwrap();
    let state = query_param(&url, "state").unwrap();
    auth.handle_callback(&callback(SHORT_LIVED_CODE, &state))
        .await
        .unwrap();
    assert!(auth.tokens().token().unwrap().is_expired());

    assert!(auth.is_authenticated().await);
    assert_eq!(server.state().refresh_requests, 1);

    let token = auth.tokens().token().unwrap();
    assert!(token.access_token.starts_with("refreshed-access"));
    assert_eq!(token.refresh_token.as_deref(), Some(MOCK_REFRESH_TOKEN));
    assert!(!token.is_expired());

    let form = server.state().last_token_form.clone().unwrap();
    assert_eq!(form["grant_type"], "refresh_token");
    assert_eq!(form["client_id"], TEST_CLIENT_ID);
}

#[tokio::test]
async fn test_revoked_refresh_token_drops_sign_in() {
    init_test_environment();
    let server = MockServer::start().await;
    let mut auth = coordinator(&server);

    let url = auth.build_auth_url().unwrap();
    let state = query_param(&url, "state").unwrap();
    auth.handle_callback(&callback(SHORT_LIVED_CODE, &state))
        .await
        .unwrap();

    server.state().refresh_revoked = true;

    assert!(!auth.is_authenticated().await);
    assert_eq!(auth.state(), &AuthFlowState::Idle);
    assert!(matches!(
        auth.tokens_mut().access_token().await,
        Err(OAuth2Error::NotAuthenticated)
    ));
}

#[tokio::test]
async fn test_reused_code_fails_and_keeps_pending_flow() {
    init_test_environment();
    let server = MockServer::start().await;

    let mut first = coordinator(&server);
    let url = first.build_auth_url().unwrap();
    let state = query_param(&url, "state").unwrap();
    first
        .handle_callback(&callback("single-use", &state))
        .await
        .unwrap();

    let mut second = coordinator(&server);
    let url = second.build_auth_url().unwrap();
    let state = query_param(&url, "state").unwrap();
    let err = second
        .handle_callback(&callback("single-use", &state))
        .await
        .unwrap_err();

    assert!(matches!(err, OAuth2Error::ExchangeFailed(_)));
    assert!(second.state().is_pending());
    assert!(second.tokens().token().is_none());
}

#[tokio::test]
async fn test_rejected_code() {
    init_test_environment();
    let server = MockServer::start().await;
    let mut auth = coordinator(&server);

    let url = auth.build_auth_url().unwrap();
    let state = query_param(&url, "state").unwrap();
    let err = auth
        .handle_callback(&callback(REJECTED_CODE, &state))
        .await
        .unwrap_err();

    assert!(matches!(err, OAuth2Error::ExchangeFailed(_)));
    assert!(!auth.is_authenticated().await);
}

#[tokio::test]
async fn test_tampered_state_never_reaches_token_endpoint() {
    init_test_environment();
    let server = MockServer::start().await;
    let mut auth = coordinator(&server);

    let url = auth.build_auth_url().unwrap();
    let mut state = query_param(&url, "state").unwrap();
    let last = state.pop().unwrap();
    state.push(if last == 'A' { 'B' } else { 'A' });

    let err = auth
        .handle_callback(&callback("lab-code", &state))
        .await
        .unwrap_err();

    assert!(matches!(err, OAuth2Error::InvalidState(_)));
    assert_eq!(err.user_message(), fieldmap::SESSION_EXPIRED_MESSAGE);
    assert_eq!(auth.state(), &AuthFlowState::Idle);
    assert_eq!(server.state().token_requests, 0);
}

#[tokio::test]
async fn test_provider_denial_resets_flow() {
    init_test_environment();
    let server = MockServer::start().await;
    let mut auth = coordinator(&server);
    auth.build_auth_url().unwrap();

    let params = CallbackParams {
        error: Some("access_denied".to_string()),
        ..Default::default()
    };
    let err = auth.handle_callback(&params).await.unwrap_err();

    assert!(matches!(err, OAuth2Error::ProviderDenied(ref e) if e == "access_denied"));
    assert_eq!(auth.state(), &AuthFlowState::Idle);
    assert_eq!(server.state().token_requests, 0);
}

#[tokio::test]
async fn test_sign_out_then_sign_in_again() {
    init_test_environment();
    let server = MockServer::start().await;
    let mut auth = coordinator(&server);

    let url = auth.build_auth_url().unwrap();
    let state = query_param(&url, "state").unwrap();
    auth.handle_callback(&callback("first", &state)).await.unwrap();

    auth.sign_out();
    assert!(!auth.is_authenticated().await);
    assert!(auth.tokens().token().is_none());

    let url = auth.build_auth_url().unwrap();
    let state = query_param(&url, "state").unwrap();
    auth.handle_callback(&callback("second", &state)).await.unwrap();
    assert!(auth.is_authenticated().await);
    assert_eq!(server.state().token_requests, 2);
}
