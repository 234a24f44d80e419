#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use serde_json::{json, Value};
use sessionkeeper::auth::{AuthService, CredentialHasher};
use sessionkeeper::configuration::JwtSettings;
use sessionkeeper::startup::run;
use sessionkeeper::store::{AccountStore, InMemoryAccountStore};

pub fn jwt_settings() -> JwtSettings {
    JwtSettings {
        access_secret: "integration-access-secret-0123456789abcdef".to_string(),
        refresh_secret: "integration-refresh-secret-0123456789abcdef".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
        issuer: "sessionkeeper-test".to_string(),
    }
}

/// Service over a fresh in-memory store, with the cheapest bcrypt cost
pub fn auth_service() -> (Arc<InMemoryAccountStore>, AuthService) {
    let store = Arc::new(InMemoryAccountStore::new());
    let service = auth_service_over(store.clone());
    (store, service)
}

pub fn auth_service_over(store: Arc<dyn AccountStore>) -> AuthService {
    AuthService::new(store, jwt_settings(), CredentialHasher::new(4))
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json("/auth/register", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json("/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.post_json("/auth/refresh", &json!({ "refresh_token": refresh_token }))
            .await
    }

    pub async fn get_me(&self, access_token: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}/users/me", self.address))
            .bearer_auth(access_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn logout(&self, access_token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/auth/logout", self.address))
            .bearer_auth(access_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

pub async fn spawn_app() -> TestApp {
    let (_, auth) = auth_service();
    spawn_app_with(auth).await
}

pub async fn spawn_app_with(auth: AuthService) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server = run(listener, auth, true).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

pub fn token(body: &Value, field: &str) -> String {
    body[field]
        .as_str()
        .unwrap_or_else(|| panic!("No {} in response: {}", field, body))
        .to_string()
}
