use dentstock_api::config::ApiConfig;
use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    user: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = dentstock_api::app::build_app(&ApiConfig::default()).expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            user: Uuid::now_v7().to_string(),
            handle,
        }
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("x-user-id", &self.user)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("x-user-id", &self.user)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn create(&self, path: &str, body: Value) -> String {
        let (status, body) = self.post(path, body).await;
        assert_eq!(status, StatusCode::CREATED, "{path}: {body}");
        body["id"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_is_public_and_domain_routes_need_a_user() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .get(format!("{}/low-stock", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = srv.get("/whoami").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"].as_str().unwrap(), srv.user);
}

#[tokio::test]
async fn assign_then_consume_and_reject_overdraw() {
    let srv = TestServer::spawn().await;
    let supply = srv.create("/supplies", json!({ "name": "Gloves" })).await;
    let op_a = srv.create("/operatories", json!({ "name": "Op A" })).await;
    let op_b = srv.create("/operatories", json!({ "name": "Op B" })).await;

    let (status, _) = srv
        .post(
            "/check-in",
            json!({
                "destination": { "kind": "unassigned" },
                "items": [{ "supply_id": supply, "quantity": 10 }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = srv
        .post(
            "/assign",
            json!({
                "items": [{ "supply_id": supply, "quantity": 3 }],
                "operatory_ids": [op_a, op_b]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, view) = srv.get(&format!("/supplies/{supply}")).await;
    assert_eq!(view["unassigned_quantity"], 4);
    assert_eq!(view["total_assigned"], 6);

    let (status, body) = srv
        .post(
            "/consume",
            json!({ "operatory_id": op_a, "items": [{ "supply_id": supply, "quantity": 5 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["detail"]["available"], 3);
    assert_eq!(body["detail"]["requested"], 5);

    let (status, body) = srv
        .post(
            "/consume",
            json!({ "operatory_id": op_a, "items": [{ "supply_id": supply, "quantity": 2 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["quantity"], 2);

    let (status, log) = srv.get("/usage-log").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(log.as_array().unwrap().len(), 1);
    assert_eq!(log[0]["user_id"].as_str().unwrap(), srv.user);
}

#[tokio::test]
async fn transfer_and_validation_errors() {
    let srv = TestServer::spawn().await;
    let supply = srv.create("/supplies", json!({ "name": "Bibs" })).await;
    let l1 = srv.create("/locations", json!({ "name": "Front" })).await;
    let l2 = srv.create("/locations", json!({ "name": "Back" })).await;

    srv.post(
        "/check-in",
        json!({
            "destination": { "kind": "location", "id": l1 },
            "items": [{ "supply_id": supply, "quantity": 10 }]
        }),
    )
    .await;

    let (status, body) = srv
        .post(
            "/transfer",
            json!({
                "supply_id": supply,
                "source_location_id": l1,
                "destination_location_id": l2,
                "quantity": 10
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source_quantity"], 0);
    assert_eq!(body["destination_quantity"], 10);

    let (status, body) = srv
        .post(
            "/transfer",
            json!({
                "supply_id": supply,
                "source_location_id": l2,
                "destination_location_id": l2,
                "quantity": 1
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "same_location");

    let (status, body) = srv
        .post(
            "/transfer",
            json!({
                "supply_id": supply,
                "source_location_id": l2,
                "destination_location_id": l1,
                "quantity": -3
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn barcode_lookup_create_and_low_stock() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/barcodes/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found_in_inventory");

    let supplier = srv
        .create("/suppliers", json!({ "name": "Acme Dental" }))
        .await;
    let supply = srv
        .create(
            "/barcodes/create",
            json!({
                "name": "Gauze",
                "unit": "box",
                "barcode": "999",
                "supplier_id": supplier,
                "low_stock_threshold": 5
            }),
        )
        .await;

    let (status, body) = srv.get("/barcodes/999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"].as_str().unwrap(), supply);

    let op = srv.create("/operatories", json!({ "name": "Op 1" })).await;
    srv.post(
        "/check-in",
        json!({
            "destination": { "kind": "operatory", "id": op },
            "items": [{ "supply_id": supply, "quantity": 2 }]
        }),
    )
    .await;

    let (status, groups) = srv.get("/low-stock").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(groups[0]["supplier_name"], "Acme Dental");
    assert_eq!(groups[0]["alerts"][0]["quantity"], 2);
    assert_eq!(groups[0]["alerts"][0]["threshold"], 5);
    assert_eq!(groups[0]["alerts"][0]["pool"], "operatory");
}
