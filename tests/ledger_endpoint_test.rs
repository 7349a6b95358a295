use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use growfolio::api;
use growfolio::config::Config;
use growfolio::db::init_db;
use growfolio::{Repository, Services};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    _temp: TempDir,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let services = Services::new(repo);

    let config = Config {
        port: 0,
        database_path: db_path,
        billing_webhook_secret: Some("whsec_integration".to_string()),
        demo_user_ttl: chrono::Duration::hours(24),
        demo_cleanup_interval_secs: 3600,
    };

    let app = api::create_router(api::AppState::new(services, config));

    TestApp {
        app,
        _temp: temp_dir,
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> TestResponse {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Request as `user`, registering them on first use.
    async fn request(
        &self,
        method: &str,
        uri: &str,
        user: &str,
        body: Option<serde_json::Value>,
    ) -> TestResponse {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-user-id", user)
            .header("x-user-email", format!("{}@example.com", user));

        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    async fn get(&self, uri: &str, user: &str) -> TestResponse {
        self.request("GET", uri, user, None).await
    }

    async fn post(&self, uri: &str, user: &str, body: serde_json::Value) -> TestResponse {
        self.request("POST", uri, user, Some(body)).await
    }

    async fn delete(&self, uri: &str, user: &str) -> TestResponse {
        self.request("DELETE", uri, user, None).await
    }

    async fn post_csv(&self, uri: &str, user: &str, csv: &str) -> TestResponse {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("x-user-id", user)
            .header("x-user-email", format!("{}@example.com", user))
            .header("content-type", "text/csv")
            .body(Body::from(csv.to_string()))
            .unwrap();
        self.send(req).await
    }

    /// Create an investment and return its id.
    async fn create_investment(&self, user: &str, name: &str) -> String {
        let resp = self
            .post(
                "/v1/investments",
                user,
                serde_json::json!({"type": "stock", "name": name}),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
        resp.json()["id"].as_str().unwrap().to_string()
    }

    async fn add_update(
        &self,
        user: &str,
        investment_id: &str,
        body: serde_json::Value,
    ) -> TestResponse {
        self.post(
            &format!("/v1/investments/{}/updates", investment_id),
            user,
            body,
        )
        .await
    }
}

#[tokio::test]
async fn test_query_synthesizes_window_start() {
    let app = setup_test_app().await;
    let a = app.create_investment("alice", "A").await;
    let b = app.create_investment("alice", "B").await;

    app.add_update("alice", &a, json!({"date": "2023-01-01", "deposit": 100, "value": 100}))
        .await;
    app.add_update("alice", &a, json!({"date": "2023-03-01", "value": 120}))
        .await;
    app.add_update("alice", &b, json!({"date": "2023-02-10", "deposit": 50, "value": 50}))
        .await;

    let resp = app
        .get("/v1/investment-updates?dateFrom=2023-02-01", "alice")
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let rows = resp.json();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);

    assert_eq!(rows[0]["investmentId"], a.as_str());
    assert_eq!(rows[0]["date"], "2023-02-01");
    assert_eq!(rows[0]["cost"], 100);
    assert_eq!(rows[0]["value"], 100);
    assert!(rows[0].get("deposit").is_none());

    assert_eq!(rows[1]["investmentId"], b.as_str());
    assert_eq!(rows[1]["date"], "2023-02-10");

    assert_eq!(rows[2]["investmentId"], a.as_str());
    assert_eq!(rows[2]["date"], "2023-03-01");
    assert_eq!(rows[2]["cost"], 100);
    assert_eq!(rows[2]["value"], 120);
}

#[tokio::test]
async fn test_query_without_date_returns_full_history() {
    let app = setup_test_app().await;
    let a = app.create_investment("alice", "A").await;
    app.add_update("alice", &a, json!({"date": "2023-02-01", "withdrawal": 10, "value": 80}))
        .await;
    app.add_update("alice", &a, json!({"date": "2023-01-01", "deposit": 100, "value": 100}))
        .await;

    let resp = app.get("/v1/investment-updates", "alice").await;
    let rows = resp.json();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["date"], "2023-01-01");
    assert_eq!(rows[0]["cost"], 100);
    assert_eq!(rows[1]["date"], "2023-02-01");
    assert_eq!(rows[1]["cost"], 90);
}

#[tokio::test]
async fn test_query_drops_ids_owned_by_others() {
    let app = setup_test_app().await;
    let mine = app.create_investment("alice", "Mine").await;
    let theirs = app.create_investment("bob", "Theirs").await;
    app.add_update("alice", &mine, json!({"date": "2023-01-01", "value": 1}))
        .await;
    app.add_update("bob", &theirs, json!({"date": "2023-01-01", "value": 2}))
        .await;

    let resp = app
        .get(
            &format!("/v1/investment-updates?investmentId={},{}", mine, theirs),
            "alice",
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let rows = resp.json();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["investmentId"], mine.as_str());

    let resp = app
        .get(&format!("/v1/investment-updates?investmentId={}", theirs), "alice")
        .await;
    assert_eq!(resp.json().as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_query_rejects_bad_date() {
    let app = setup_test_app().await;
    let resp = app
        .get("/v1/investment-updates?dateFrom=yesterday", "alice")
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_update_recomputes_costs() {
    let app = setup_test_app().await;
    let a = app.create_investment("alice", "A").await;
    let first = app
        .add_update("alice", &a, json!({"date": "2023-01-01", "deposit": 100, "value": 100}))
        .await;
    app.add_update("alice", &a, json!({"date": "2023-02-01", "deposit": 50, "value": 160}))
        .await;
    let first_id = first.json()["id"].as_str().unwrap().to_string();

    let resp = app
        .delete(&format!("/v1/investment-updates/{}", first_id), "bob")
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .delete(&format!("/v1/investment-updates/{}", first_id), "alice")
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.get("/v1/investment-updates", "alice").await;
    let rows = resp.json();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["cost"], 50);
}

#[tokio::test]
async fn test_csv_import_and_export() {
    let app = setup_test_app().await;
    let a = app.create_investment("alice", "World Fund").await;

    let csv = "Date,Deposit,Withdrawal,Value\n2023-01-01,1000,,1000\n2023-02-01,,200,850\n";
    let resp = app
        .post_csv(&format!("/v1/investments/{}/updates/import", a), "alice", csv)
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    assert_eq!(resp.json()["imported"], 2);

    let resp = app
        .get(&format!("/v1/investments/{}/updates/export", a), "alice")
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.headers["content-type"], "text/csv");

    let disposition = resp.headers["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"World_Fund_updates_export_"));
    assert!(disposition.ends_with(".csv\""));

    let body = resp.text();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Date,Deposit,Withdrawal,Value",
            "2023-02-01,,200,850",
            "2023-01-01,1000,,1000",
        ]
    );
}

#[tokio::test]
async fn test_csv_import_rejects_bad_row() {
    let app = setup_test_app().await;
    let a = app.create_investment("alice", "A").await;

    let csv = "Date,Deposit,Withdrawal,Value\n2023-01-01,1000,,1000\nnot-a-date,,,5\n";
    let resp = app
        .post_csv(&format!("/v1/investments/{}/updates/import", a), "alice", csv)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app.get("/v1/investment-updates", "alice").await;
    assert_eq!(resp.json().as_array().unwrap().len(), 0);
}
