#![allow(dead_code)]

use std::net::TcpListener;
use std::path::PathBuf;

use request_shield::configuration::Settings;
use request_shield::startup::run;

pub const SESSION: &str = "test-session-0123456789abcdef";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub upload_dir: PathBuf,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn csrf_token(&self, client: &reqwest::Client, session: &str) -> String {
        let response = client
            .get(self.url("/csrf-token"))
            .header("Cookie", format!("session_id={}", session))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(200, response.status().as_u16());

        let body: serde_json::Value = response.json().await.expect("Failed to parse response");
        body["csrfToken"]
            .as_str()
            .expect("csrfToken missing")
            .to_string()
    }
}

/// Default settings with a fresh upload directory
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    let upload_dir = std::env::temp_dir().join(format!("request_shield_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&upload_dir).expect("Failed to create upload directory");
    settings.uploads.directory = upload_dir.to_string_lossy().to_string();
    settings
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(test_settings())
}

pub fn spawn_app_with(settings: Settings) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let upload_dir = PathBuf::from(&settings.uploads.directory);

    let server = run(listener, settings).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        port,
        upload_dir,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build client")
}
