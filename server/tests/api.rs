//! Router-level tests: session gate, order endpoints and prefill.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use ordarchive::extraction::DisabledExtractor;
use ordarchive::intake::{IntakeService, IntakeSettings};
use ordarchive::storage::FilesystemStore;
use ordarchive::{Database, OrderEventBroadcaster, SessionGate, TokenCipher};
use ordarchive_server::state::ServedFiles;
use ordarchive_server::{router, AppState};

const PASSWORD: &str = "hr-secret";
const BOUNDARY: &str = "ordarchive-test-boundary";
const PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n";

struct TestApp {
    _dir: TempDir,
    app: Router,
}

impl TestApp {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("scans");
        let db = Database::open_in_memory().unwrap();
        let blobs = Arc::new(FilesystemStore::new(&root, "/files"));
        let settings = IntakeSettings {
            max_upload_bytes: 1024 * 1024,
            upload_timeout: Duration::from_secs(5),
            prefill_timeout: Duration::from_secs(5),
            ..IntakeSettings::default()
        };
        let intake = IntakeService::new(
            db,
            blobs,
            Arc::new(DisabledExtractor),
            OrderEventBroadcaster::new(16),
            settings,
        );
        let gate = SessionGate::new(
            PASSWORD.into(),
            TokenCipher::generate().unwrap(),
            Duration::from_secs(7 * 24 * 60 * 60),
        );
        let state = AppState::new(intake, gate).with_served_files(Some(ServedFiles {
            mount: "/files".to_string(),
            root: root.to_string_lossy().into_owned(),
        }));
        Self {
            app: router(state, &[]),
            _dir: dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Logs in and returns the `name=value` cookie pair.
    async fn login(&self) -> String {
        let response = self
            .send(
                Request::post("/login")
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(format!("password={}", PASSWORD)))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn create(&self, cookie: &str, fields: &[(&str, &str)]) -> Response {
        let (content_type, body) = multipart(fields, Some(("pdfFile", "prikaz.pdf", PDF)));
        self.send(
            Request::post("/api/orders")
                .header(COOKIE, cookie)
                .header(CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    async fn get(&self, cookie: &str, uri: &str) -> Response {
        self.send(
            Request::get(uri)
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

fn multipart(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((name, file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
                BOUNDARY, name, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

async fn json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn order_fields(number: &str) -> Vec<(&str, &str)> {
    vec![
        ("orderNumber", number),
        ("orderDate", "2026-02-15"),
        ("type", "Отпуск"),
        ("employeeName", "Иванов И.И."),
    ]
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let response = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_requests_without_session_redirect_to_login() {
    let app = TestApp::new();
    for uri in ["/", "/api/orders", "/api/taxonomy"] {
        let response = app
            .send(Request::get(uri).body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(response.headers()[LOCATION], "/login");
    }

    let forged = app.get("hr-auth-token=deadbeef", "/api/orders").await;
    assert_eq!(forged.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::post("/login")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("password=nope"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(SET_COOKIE).is_none());
    assert_eq!(json(response).await["error"], "Неверный пароль");
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let app = TestApp::new();
    let cookie = app.login().await;
    assert!(cookie.starts_with("hr-auth-token="));

    let login_page = app.get(&cookie, "/login").await;
    assert_eq!(login_page.status(), StatusCode::SEE_OTHER);
    assert_eq!(login_page.headers()[LOCATION], "/");

    let listing = app.get(&cookie, "/api/orders").await;
    assert_eq!(listing.status(), StatusCode::OK);
    assert_eq!(json(listing).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new();
    let cookie = app.login().await;
    let response = app
        .send(
            Request::post("/logout")
                .header(COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/login");
    let cleared = response.headers()[SET_COOKIE].to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_create_list_and_fetch_scan() {
    let app = TestApp::new();
    let cookie = app.login().await;

    let response = app.create(&cookie, &order_fields("45-K")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let record = json(response).await;
    assert_eq!(record["orderNumber"], "45-K");
    assert_eq!(record["orderDate"], "2026-02-15");
    assert_eq!(record["type"], "Отпуск");
    let pdf_url = record["pdfUrl"].as_str().unwrap().to_string();
    assert!(pdf_url.starts_with("/files/"));

    let listing = json(app.get(&cookie, "/api/orders").await).await;
    assert_eq!(listing.as_array().unwrap().len(), 1);
    assert_eq!(listing[0]["id"], record["id"]);

    let scan = app.get(&cookie, &pdf_url).await;
    assert_eq!(scan.status(), StatusCode::OK);
    let bytes = scan.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], PDF);
}

#[tokio::test]
async fn test_create_with_missing_fields_is_422() {
    let app = TestApp::new();
    let cookie = app.login().await;

    let response = app
        .create(&cookie, &[("orderNumber", ""), ("type", "Отпуск")])
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json(response).await;
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["orderNumber", "orderDate"]);

    let listing = json(app.get(&cookie, "/api/orders").await).await;
    assert!(listing.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_query() {
    let app = TestApp::new();
    let cookie = app.login().await;
    app.create(&cookie, &order_fields("45-K")).await;
    app.create(
        &cookie,
        &[
            ("orderNumber", "12-Ө"),
            ("orderDate", "15.02.2026"),
            ("type", "Основная деятельность"),
        ],
    )
    .await;

    let hits = json(app.get(&cookie, "/api/orders?q=%D0%B8%D0%B2%D0%B0%D0%BD%D0%BE%D0%B2").await).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["orderNumber"], "45-K");

    let all = json(app.get(&cookie, "/api/orders?q=").await).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_keeps_pdf_url() {
    let app = TestApp::new();
    let cookie = app.login().await;
    let record = json(app.create(&cookie, &order_fields("45-K")).await).await;
    let id = record["id"].as_str().unwrap();

    let response = app
        .send(
            Request::put(format!("/api/orders/{}", id))
                .header(COOKIE, &cookie)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(
                    "orderNumber=46-K&orderDate=2026-03-01&type=%D0%9E%D1%82%D0%BF%D1%83%D1%81%D0%BA&pdfUrl=https%3A%2F%2Fevil.example.com%2Fx.pdf",
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = json(response).await;
    assert_eq!(updated["orderNumber"], "46-K");
    assert_eq!(updated["orderDate"], "2026-03-01");
    assert_eq!(updated["pdfUrl"], record["pdfUrl"]);
}

#[tokio::test]
async fn test_update_unknown_is_404() {
    let app = TestApp::new();
    let cookie = app.login().await;
    let (content_type, body) = multipart(&order_fields("1-K"), None);
    let response = app
        .send(
            Request::put("/api/orders/missing")
                .header(COOKIE, &cookie)
                .header(CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_twice() {
    let app = TestApp::new();
    let cookie = app.login().await;
    let record = json(app.create(&cookie, &order_fields("45-K")).await).await;
    let uri = format!("/api/orders/{}", record["id"].as_str().unwrap());

    let delete = || {
        Request::delete(uri.as_str())
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap()
    };

    let first = app.send(delete()).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(json(first).await["blobRemoved"], true);

    let second = app.send(delete()).await;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);

    let scan = app.get(&cookie, record["pdfUrl"].as_str().unwrap()).await;
    assert_eq!(scan.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_parse_pdf_without_file_is_400() {
    let app = TestApp::new();
    let cookie = app.login().await;
    let (content_type, body) = multipart(&[("other", "x")], None);
    let response = app
        .send(
            Request::post("/api/parse-pdf")
                .header(COOKIE, &cookie)
                .header(CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "Файл не найден");
}

#[tokio::test]
async fn test_parse_pdf_failure_is_advisory_500() {
    let app = TestApp::new();
    let cookie = app.login().await;
    let (content_type, body) = multipart(&[], Some(("file", "scan.pdf", PDF)));
    let response = app
        .send(
            Request::post("/api/parse-pdf")
                .header(COOKIE, &cookie)
                .header(CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(response).await["error"], "Не удалось распознать документ");
}

#[tokio::test]
async fn test_taxonomy_lists_types() {
    let app = TestApp::new();
    let cookie = app.login().await;
    let catalog = json(app.get(&cookie, "/api/taxonomy").await).await;
    let labels: Vec<&str> = catalog
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["label"].as_str().unwrap())
        .collect();
    assert!(labels.contains(&"Отпуск"));
    assert!(labels.contains(&"ЖҚ - Личный состав"));
}

#[tokio::test]
async fn test_state_from_config_serves_filesystem_scans() {
    let dir = TempDir::new().unwrap();
    let config_json = serde_json::json!({
        "version": "1.0",
        "database": { "path": dir.path().join("db/archive.db").to_string_lossy() },
        "auth": { "password": { "value": PASSWORD } },
        "storage": {
            "backend": "filesystem",
            "root": dir.path().join("scans").to_string_lossy(),
            "public_base_url": "/files/"
        },
        "extraction": { "enabled": false }
    });
    let config = ordarchive::config::load_config_from_str(&config_json.to_string()).unwrap();

    let state = AppState::from_config(&config).unwrap();
    let files = state.files.clone().unwrap();
    assert_eq!(files.mount, "/files");
    assert!(dir.path().join("db/archive.db").exists());

    let report = state.intake.reconcile_orphans().await.unwrap();
    assert_eq!(report.attempted, 0);
}
