#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use reqwest::{Client, Response};
use serde_json::{json, Value};
use token_gate::configuration::{
    ApplicationSettings, DatabaseSettings, JwtSettings, PasswordSettings, Settings, StorageBackend,
};
use token_gate::startup::{run, AppState};
use token_gate::store::{InMemoryCredentialStore, InMemoryRevocationStore};

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-chars";
pub const TEST_ISSUER: &str = "token_gate_test";

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub credentials: Arc<InMemoryCredentialStore>,
}

pub fn test_settings() -> Settings {
    Settings {
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseSettings {
            backend: StorageBackend::Memory,
            username: String::new(),
            password: String::new(),
            port: 5432,
            host: "localhost".to_string(),
            database_name: String::new(),
            max_connections: 1,
        },
        jwt: JwtSettings {
            secret: TEST_SECRET.to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 3600,
            issuer: TEST_ISSUER.to_string(),
            leeway: 0,
            employees: vec!["user1".to_string()],
        },
        // Minimum bcrypt cost keeps the suite fast
        password: PasswordSettings { bcrypt_cost: 4 },
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_settings()).await
}

pub async fn spawn_app_with(settings: Settings) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let credentials = Arc::new(InMemoryCredentialStore::new());
    let state = AppState::new(
        &settings,
        credentials.clone(),
        Arc::new(InMemoryRevocationStore::new()),
    );
    let server = run(listener, state).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        client: Client::new(),
        credentials,
    }
}

impl TestApp {
    pub async fn post_register(&self, body: &Value) -> Response {
        self.client
            .post(&format!("{}/auth/register", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_login(&self, body: &Value) -> Response {
        self.client
            .post(&format!("{}/auth/login", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_with_token(&self, path: &str, token: Option<&str>) -> Response {
        let mut request = self.client.get(&format!("{}{}", &self.address, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    /// Register a user and return the new id
    pub async fn register(&self, username: &str, password: &str) -> String {
        let response = self
            .post_register(&json!({
                "username": username,
                "email": format!("{}@x.com", username),
                "password": password,
            }))
            .await;
        assert_eq!(201, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response");
        body["user_id"].as_str().expect("user_id missing").to_string()
    }

    /// Log in and return (access_token, refresh_token)
    pub async fn login(&self, username: &str, password: &str) -> (String, String) {
        let response = self
            .post_login(&json!({ "username": username, "password": password }))
            .await;
        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response");
        (
            body["access_token"].as_str().unwrap().to_string(),
            body["refresh_token"].as_str().unwrap().to_string(),
        )
    }
}

/// Assert status and error code of a failed response
pub async fn assert_error(response: Response, status: u16, code: &str) {
    assert_eq!(status, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse error body");
    assert_eq!(body["code"], code, "unexpected error body: {}", body);
}

/// Decode a token's payload with the test secret
pub fn payload(token: &str) -> Value {
    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.set_issuer(&[TEST_ISSUER]);
    jsonwebtoken::decode::<Value>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(TEST_SECRET.as_bytes()),
        &validation,
    )
    .expect("Failed to decode token")
    .claims
}
