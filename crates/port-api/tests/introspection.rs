//! IntrospectionValidator against a real identity-server router.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use identity_server::{Issuer, IssuerConfig, PasswordGrant};
use port_api::auth::ValidationError;
use port_api::{ApiConfig, IntrospectionValidator, TokenValidator};

/// Serve the issuer on a random port
async fn spawn_issuer() -> (Arc<identity_server::AppState>, SocketAddr) {
    spawn_issuer_with(IssuerConfig::default()).await
}

async fn spawn_issuer_with(config: IssuerConfig) -> (Arc<identity_server::AppState>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("http://{}", addr);

    let issuer = Issuer::from_config(&config, &url).unwrap();
    let state = Arc::new(identity_server::AppState {
        issuer,
        public_url: url,
    });
    let app = identity_server::router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (state, addr)
}

fn login(state: &identity_server::AppState) -> String {
    state
        .issuer
        .issue_token(&PasswordGrant {
            client_id: "console-client".to_string(),
            client_secret: "console-client-secret".to_string(),
            username: "alice".to_string(),
            password: "pw123".to_string(),
            scope: Some("api.read".to_string()),
        })
        .unwrap()
        .value
}

fn validator(addr: SocketAddr, secret: &str) -> IntrospectionValidator {
    let config = ApiConfig::new(&format!("http://{}", addr), "port-api", secret, "api.read").unwrap();
    IntrospectionValidator::new(&config).unwrap()
}

#[tokio::test]
async fn active_token_yields_claims() {
    let (state, addr) = spawn_issuer().await;
    let token = login(&state);

    let claims = validator(addr, "port-api-secret")
        .validate(&token)
        .await
        .unwrap();
    assert_eq!(claims.sub, "1");
    assert_eq!(claims.client_id, "console-client");
    assert!(claims.has_scope("api.read"));
    assert_eq!(claims.extra["given_name"], "Alice");
}

#[tokio::test]
async fn revoked_and_unknown_tokens_look_the_same() {
    let (state, addr) = spawn_issuer().await;
    let token = login(&state);
    state.issuer.revoke_token(&token);

    let validator = validator(addr, "port-api-secret");
    let revoked = validator.validate(&token).await.unwrap_err();
    let unknown = validator.validate("garbage").await.unwrap_err();

    assert!(matches!(revoked, ValidationError::Inactive));
    assert!(matches!(unknown, ValidationError::Inactive));
}

#[tokio::test]
async fn expired_token_is_inactive() {
    let mut config = IssuerConfig::default();
    config.tokens.access_token_lifetime_secs = 0;
    let (state, addr) = spawn_issuer_with(config).await;
    let token = login(&state);

    let err = validator(addr, "port-api-secret")
        .validate(&token)
        .await
        .unwrap_err();
    assert!(matches!(err, ValidationError::Inactive));
}

#[tokio::test]
async fn wrong_api_secret_is_an_infrastructure_failure() {
    let (state, addr) = spawn_issuer().await;
    let token = login(&state);

    let err = validator(addr, "wrong").validate(&token).await.unwrap_err();
    assert!(matches!(err, ValidationError::Unavailable(_)));
}

#[tokio::test]
async fn unreachable_issuer_is_unavailable() {
    // Bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = validator(addr, "port-api-secret")
        .validate("anything")
        .await
        .unwrap_err();
    assert!(matches!(err, ValidationError::Unavailable(_)));
}

#[tokio::test]
async fn stalled_issuer_hits_the_timeout() {
    // Accepts connections but never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let mut config =
        ApiConfig::new(&format!("http://{}", addr), "port-api", "port-api-secret", "api.read")
            .unwrap();
    config.timeout = Duration::from_millis(200);
    let validator = IntrospectionValidator::new(&config).unwrap();

    let err = tokio::time::timeout(Duration::from_secs(5), validator.validate("anything"))
        .await
        .expect("configured timeout was not applied")
        .unwrap_err();
    assert!(matches!(err, ValidationError::Unavailable(_)));
}
