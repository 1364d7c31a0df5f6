//! Router fixtures for endpoint tests

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::auth::authenticate;
use crate::config::{BootstrapUser, Config};
use crate::models::Role;
use crate::routes;
use crate::state::AppState;

/// Tokens of the three bootstrap accounts
pub struct Tokens {
    pub admin: String,
    pub staff: String,
    pub plain: String,
}

fn account(username: &str, role: Role) -> BootstrapUser {
    BootstrapUser {
        username: username.into(),
        email: format!("{username}@example.com"),
        password: format!("{username}-password"),
        role,
    }
}

/// Config with cheap password hashing and one account per role
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.memory_cost_kib = 1024;
    config.auth.time_cost = 1;
    config.auth.parallelism = 1;
    config.bootstrap.users = vec![
        account("admin", Role::Admin),
        account("staff", Role::Staff),
        account("plain", Role::Plain),
    ];
    config
}

pub async fn test_app() -> (Router, AppState, Tokens) {
    let state = AppState::builder().config(test_config()).build().unwrap();
    state.bootstrap().await.unwrap();

    let mut tokens = Vec::new();
    for username in ["admin", "staff", "plain"] {
        let login = authenticate(&state, username, &format!("{username}-password"))
            .await
            .unwrap();
        tokens.push(login.token);
    }
    let [admin, staff, plain] = <[String; 3]>::try_from(tokens).unwrap();

    (
        routes::router(state.clone()),
        state,
        Tokens { admin, staff, plain },
    )
}

/// Send one request; returns the status and the decoded JSON body (`Null` when empty)
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Token {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
