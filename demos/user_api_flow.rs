//! Walks through the HTTP surface: seed an admin, log in, create a user,
//! let that user edit themselves, and watch the policy refuse the rest.
//!
//! Run with: `RUST_LOG=info cargo run --example user_api_flow`

use accounts_core::web::{AccountsApi, ApiResponse, RequestAdapter};
use accounts_core::{Config, Secret};
use http::Method;
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn show(label: &str, response: &ApiResponse) {
    let body = response
        .body
        .as_ref()
        .map(|b| b.to_string())
        .unwrap_or_else(|| "<empty>".to_string());
    println!("{:<38} {} {}", label, response.status.as_u16(), body);
}

fn token(response: &ApiResponse) -> String {
    response
        .body
        .as_ref()
        .and_then(|b| b["token"].as_str())
        .unwrap_or_default()
        .to_string()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let api = AccountsApi::new(Config::for_testing())?;
    api.users()
        .create_superuser("jerry", Secret::new("cheese".to_string()))?;

    println!("=== Accounts API walkthrough ===\n");

    let login = api.handle(
        &RequestAdapter::new(Method::POST, "/api-token-auth/")
            .with_json(&json!({"username": "jerry", "password": "cheese"})),
    );
    show("POST /api-token-auth/ (jerry)", &login);
    let admin = token(&login);

    let created = api.handle(
        &RequestAdapter::new(Method::POST, "/api/v1/users/")
            .with_token(&admin)
            .with_json(&json!({"username": "tom", "password": "A12345a!", "is_active": true})),
    );
    show("POST /api/v1/users/ (admin)", &created);

    let tom = token(&api.handle(
        &RequestAdapter::new(Method::POST, "/api-token-auth/")
            .with_json(&json!({"username": "tom", "password": "A12345a!"})),
    ));

    show(
        "GET /api/v1/users/ (anonymous)",
        &api.handle(&RequestAdapter::new(Method::GET, "/api/v1/users/")),
    );
    show(
        "PATCH /api/v1/users/2/ (tom, self)",
        &api.handle(
            &RequestAdapter::new(Method::PATCH, "/api/v1/users/2/")
                .with_token(&tom)
                .with_json(&json!({"last_name": "Cat"})),
        ),
    );
    show(
        "PATCH /api/v1/users/1/ (tom, other)",
        &api.handle(
            &RequestAdapter::new(Method::PATCH, "/api/v1/users/1/")
                .with_token(&tom)
                .with_json(&json!({"last_name": "Mouse"})),
        ),
    );
    show(
        "POST /api/v1/users/ (tom)",
        &api.handle(
            &RequestAdapter::new(Method::POST, "/api/v1/users/")
                .with_token(&tom)
                .with_json(&json!({"username": "spike", "password": "bone", "is_active": true})),
        ),
    );
    show(
        "DELETE /api/v1/users/2/ (anonymous)",
        &api.handle(&RequestAdapter::new(Method::DELETE, "/api/v1/users/2/")),
    );
    show(
        "POST /api-token-auth/ (bad password)",
        &api.handle(
            &RequestAdapter::new(Method::POST, "/api-token-auth/")
                .with_json(&json!({"username": "tom", "password": "nope"})),
        ),
    );
    show(
        "DELETE /api/v1/users/2/ (tom, self)",
        &api.handle(&RequestAdapter::new(Method::DELETE, "/api/v1/users/2/").with_token(&tom)),
    );

    println!("\n=== Audit trail ===\n");
    for event in api.audit().trail().events() {
        println!("{}", event);
    }
    Ok(())
}
