#![allow(dead_code)]

use actix_web::web;
use quill_server::{AppState, Settings};
use serde_json::{json, Value};

pub fn test_state() -> web::Data<AppState> {
    let config = Settings::new_for_test().expect("Failed to load test config");
    web::Data::new(AppState::in_memory(config).expect("Failed to build app state"))
}

pub fn registration(username: &str, password: &str) -> Value {
    json!({
        "username": username,
        "password": password,
        "email": format!("{}@example.com", username),
        "full_name": "Test User"
    })
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
