//! In-process server for the HTTP suites. Each server gets its own temp
//! data directory and listens on an ephemeral port.

#![allow(dead_code)]

use quill::client::ApiClient;
use quill::config::{AdminSeed, Config};
use quill::routes;
use quill::state::AppState;
use tempfile::TempDir;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub struct TestServer {
    pub addr: std::net::SocketAddr,
    _data: TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(tweak: impl FnOnce(&mut Config)) -> Self {
        let data = TempDir::new().unwrap();
        let mut config = Config::default();
        config.database.path = Some(data.path().join("quill.db"));
        config.storage.path = Some(data.path().join("uploads"));
        config.auth.jwt_secret = Some("integration-test-secret".to_string());
        config.auth.bcrypt_cost = 4;
        config.admin = Some(AdminSeed {
            username: "admin".to_string(),
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        });
        tweak(&mut config);

        let state = AppState::from_config(config).expect("Failed to build app state");
        let app = routes::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, _data: data }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn api(&self) -> ApiClient {
        ApiClient::new(self.url("/api")).unwrap()
    }

    /// Registered and signed in as an ordinary user.
    pub async fn user(&self, name: &str) -> ApiClient {
        let api = self.api();
        api.register(name, &format!("{name}@example.com"), "password123")
            .await
            .expect("register failed");
        api
    }

    pub async fn admin(&self) -> ApiClient {
        let api = self.api();
        api.login(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("admin login failed");
        api
    }
}
