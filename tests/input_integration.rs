mod common;

use common::{client, spawn_app, spawn_app_with, test_settings, TestApp, SESSION};
use serde_json::{json, Value};

async fn post_json(app: &TestApp, path: &str, body: Value) -> reqwest::Response {
    let client = client();
    let token = app.csrf_token(&client, SESSION).await;

    client
        .post(app.url(path))
        .header("Cookie", format!("session_id={}", SESSION))
        .header("X-CSRF-Token", token)
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.")
}

// --- Posts ---

#[tokio::test]
async fn post_content_is_html_escaped() {
    let app = spawn_app();

    let response = post_json(
        &app,
        "/api/posts",
        json!({ "content": "<script>alert(1)</script> & more" }),
    )
    .await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["content"],
        "&lt;script&gt;alert(1)&lt;&#x2F;script&gt; &amp; more"
    );
    assert!(body["id"].as_str().is_some());
}

#[tokio::test]
async fn post_with_valid_wallet_is_accepted() {
    let app = spawn_app();
    let wallet = "0x52908400098527886E0F7030069857D2E4169EE7";

    let response = post_json(
        &app,
        "/api/posts",
        json!({ "content": "gm", "wallet_address": wallet }),
    )
    .await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["wallet_address"], wallet);
}

#[tokio::test]
async fn post_returns_400_for_invalid_data() {
    let app = spawn_app();
    let test_cases = vec![
        (json!({ "content": "   " }), "blank content"),
        (json!({ "content": "a".repeat(5001) }), "content too long"),
        (json!({ "content": "ok", "wallet_address": "0x123" }), "short wallet"),
        (json!({ "wallet_address": "0x123" }), "missing content"),
    ];

    for (body, description) in test_cases {
        let response = post_json(&app, "/api/posts", body).await;
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload had {}.",
            description
        );
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let mut settings = test_settings();
    settings.application.max_body_bytes = 1024;
    let app = spawn_app_with(settings);

    let response = post_json(&app, "/api/posts", json!({ "content": "a".repeat(4096) })).await;

    assert_eq!(413, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
}

// --- Render ---

#[tokio::test]
async fn render_strips_script_vectors() {
    let app = spawn_app();

    let response = post_json(
        &app,
        "/api/render",
        json!({
            "html": "<p onclick=\"steal()\">hi</p><script>alert(1)</script><a href=\"javascript:alert(1)\">x</a>",
            "link": "https://ipfs.io/ipfs/abc"
        }),
    )
    .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let html = body["html"].as_str().unwrap().to_lowercase();
    assert!(!html.contains("<script"));
    assert!(!html.contains("onclick"));
    assert!(!html.contains("javascript:"));
    assert!(html.contains("hi"));
    assert!(!body["text"].as_str().unwrap().contains('<'));
    assert_eq!(body["link"], "https://ipfs.io/ipfs/abc");
}

#[tokio::test]
async fn render_rejects_internal_links() {
    let app = spawn_app();

    for link in ["http://127.0.0.1/admin", "javascript:alert(1)", "ftp://example.com/x"] {
        let response = post_json(&app, "/api/render", json!({ "html": "x", "link": link })).await;

        assert_eq!(400, response.status().as_u16(), "link {} was accepted", link);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "INVALID_URL");
    }
}

// --- Outbound URLs ---

#[tokio::test]
async fn link_preview_accepts_allowlisted_domain() {
    let app = spawn_app();

    let response = post_json(
        &app,
        "/api/link-preview",
        json!({ "url": "https://gateway.pinata.cloud/ipfs/Qm123" }),
    )
    .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["host"], "gateway.pinata.cloud");
}

#[tokio::test]
async fn link_preview_blocks_ssrf_targets() {
    let app = spawn_app();
    let test_cases = vec![
        "http://169.254.169.254/latest/meta-data/",
        "http://localhost:8080/",
        "http://10.0.0.5/",
        "http://[::1]/",
        "https://evil.example.com/",
        "https://notpinata.cloud/",
        "file:///etc/passwd",
        "not a url",
    ];

    for url in test_cases {
        let response = post_json(&app, "/api/link-preview", json!({ "url": url })).await;

        assert_eq!(400, response.status().as_u16(), "{} was not blocked", url);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "SSRF_BLOCKED");
    }
}

// --- Uploads ---

#[tokio::test]
async fn upload_inside_base_is_served() {
    let app = spawn_app();
    std::fs::create_dir_all(app.upload_dir.join("img")).unwrap();
    std::fs::write(app.upload_dir.join("img/cat.txt"), "meow").unwrap();

    let response = client()
        .get(app.url("/uploads"))
        .query(&[("path", "img/cat.txt")])
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    assert_eq!(response.text().await.unwrap(), "meow");
}

#[tokio::test]
async fn traversal_attempts_are_rejected() {
    let app = spawn_app();
    let test_cases = vec![
        "../../etc/passwd",
        "img/../../secret",
        "/etc/passwd",
        "..\\..\\windows\\win.ini",
        ".",
    ];

    for path in test_cases {
        let response = client()
            .get(app.url("/uploads"))
            .query(&[("path", path)])
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(400, response.status().as_u16(), "{} was not rejected", path);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "PATH_TRAVERSAL_DETECTED");
    }
}

#[tokio::test]
async fn missing_upload_is_404() {
    let app = spawn_app();

    let response = client()
        .get(app.url("/uploads"))
        .query(&[("path", "nope.txt")])
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(404, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn missing_path_parameter_is_validation_error() {
    let app = spawn_app();

    let response = client()
        .get(app.url("/uploads"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
