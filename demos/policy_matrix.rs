//! Prints the authorization decision for every method against every kind
//! of principal, for a target owned by `tom`.
//!
//! Run with: `cargo run --example policy_matrix`

use accounts_core::policy::evaluate;
use accounts_core::{Decision, DenyReason, PasswordHash, Principal, User, UserId};
use chrono::Utc;
use http::Method;

fn cell(decision: Decision) -> &'static str {
    match decision {
        Decision::Allow => "allow",
        Decision::Deny(DenyReason::Unauthenticated) => "401",
        Decision::Deny(DenyReason::Forbidden) => "403",
    }
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let target = User {
        id: UserId(2),
        username: "tom".to_string(),
        first_name: String::new(),
        last_name: String::new(),
        email: String::new(),
        password_hash: PasswordHash::from_phc("$argon2id$v=19$demo"),
        is_active: true,
        is_superuser: false,
        last_login: None,
        date_joined: Utc::now(),
    };

    let principals: [(&str, Option<Principal>); 4] = [
        ("anonymous", None),
        (
            "tom (self)",
            Some(Principal {
                id: UserId(2),
                username: "tom".into(),
                is_superuser: false,
            }),
        ),
        (
            "spike (other)",
            Some(Principal {
                id: UserId(3),
                username: "spike".into(),
                is_superuser: false,
            }),
        ),
        (
            "jerry (admin)",
            Some(Principal {
                id: UserId(1),
                username: "jerry".into(),
                is_superuser: true,
            }),
        ),
    ];

    println!("{:<16} {:>8} {:>8} {:>8} {:>8} {:>8}", "", "list", "create", "get", "patch", "delete");
    for (label, principal) in &principals {
        let p = principal.as_ref();
        println!(
            "{:<16} {:>8} {:>8} {:>8} {:>8} {:>8}",
            label,
            cell(evaluate(&Method::GET, p, None)),
            cell(evaluate(&Method::POST, p, None)),
            cell(evaluate(&Method::GET, p, Some(&target))),
            cell(evaluate(&Method::PATCH, p, Some(&target))),
            cell(evaluate(&Method::DELETE, p, Some(&target))),
        );
    }
    tracing::info!("policy matrix printed");
}
