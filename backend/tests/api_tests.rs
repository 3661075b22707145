//! HTTP API tests
//!
//! Drives the full router against the in-memory store with signed JWTs.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use carestock_backend::config::{
    Config, DatabaseConfig, FacilityConfig, JobsConfig, JwtConfig, ServerConfig,
};
use carestock_backend::middleware::Claims;
use carestock_backend::store::{MemoryStore, Store};
use carestock_backend::{create_app, AppState};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "api-test-secret";

fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: SECRET.to_string(),
        },
        facility: FacilityConfig {
            utc_offset_minutes: -360,
        },
        jobs: JobsConfig::default(),
    }
}

fn app() -> Router {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    create_app(AppState {
        store,
        config: Arc::new(test_config()),
    })
}

fn token(permissions: &[&str]) -> String {
    let claims = Claims {
        sub: "cuidadora-7".to_string(),
        name: "Marta Gil".to_string(),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_patient(app: &Router, token: &str) -> String {
    let (status, patient) = send(
        app,
        Method::POST,
        "/api/v1/patients",
        Some(token),
        Some(json!({ "name": "Elena Vidal" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    patient["id"].as_str().unwrap().to_string()
}

async fn create_item(app: &Router, token: &str, patient_id: &str, body: Value) -> String {
    let (status, item) = send(
        app,
        Method::POST,
        &format!("/api/v1/patients/{}/inventory", patient_id),
        Some(token),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", item);
    item["id"].as_str().unwrap().to_string()
}

// ============================================================================
// Authentication
// ============================================================================

#[cfg(test)]
mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_is_public() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/api/v1/patients", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert!(body["error"]["message_es"].is_string());
    }

    #[tokio::test]
    async fn test_token_with_wrong_secret_is_rejected() {
        let app = app();
        let forged = encode(
            &Header::default(),
            &Claims {
                sub: "intruso".to_string(),
                name: "X".to_string(),
                permissions: vec!["jobs:run".to_string()],
                exp: chrono::Utc::now().timestamp() + 3600,
            },
            &EncodingKey::from_secret(b"other-secret"),
        )
        .unwrap();
        let (status, _) = send(&app, Method::GET, "/api/v1/patients", Some(&forged), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

// ============================================================================
// Inventory
// ============================================================================

#[cfg(test)]
mod inventory_api_tests {
    use super::*;

    fn gauze() -> Value {
        json!({
            "name": "Gasas",
            "category": "consumible",
            "unit": "pzas",
            "master_qty": "10",
            "operational_qty": "3",
            "min_master": "2",
            "min_operational": "1"
        })
    }

    #[tokio::test]
    async fn test_movement_flow_and_ledger() {
        let app = app();
        let token = token(&[]);
        let patient_id = create_patient(&app, &token).await;
        let item_id = create_item(&app, &token, &patient_id, gauze()).await;
        let movements_uri = format!(
            "/api/v1/patients/{}/inventory/{}/movements",
            patient_id, item_id
        );

        let (status, result) = send(
            &app,
            Method::POST,
            &movements_uri,
            Some(&token),
            Some(json!({
                "type": "transferencia",
                "origin": "maestro",
                "destination": "operativo",
                "quantity": "4"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", result);
        assert_eq!(result["item"]["master_qty"], "6");
        assert_eq!(result["item"]["operational_qty"], "7");
        assert_eq!(result["item"]["status"]["transit"], "not_applicable");
        assert_eq!(result["movement"]["user_name"], "Marta Gil");

        let (status, ledger) = send(&app, Method::GET, &movements_uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ledger.as_array().unwrap().len(), 1);
        assert_eq!(ledger[0]["movement_type"], "transferencia");
    }

    /// Scenario: salida beyond stock is rejected with pools unchanged
    #[tokio::test]
    async fn test_insufficient_stock_is_unprocessable() {
        let app = app();
        let token = token(&[]);
        let patient_id = create_patient(&app, &token).await;
        let item_id = create_item(&app, &token, &patient_id, gauze()).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/patients/{}/inventory/{}/movements", patient_id, item_id),
            Some(&token),
            Some(json!({ "type": "salida", "quantity": "5" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");

        let (_, item) = send(
            &app,
            Method::GET,
            &format!("/api/v1/patients/{}/inventory/{}", patient_id, item_id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(item["operational_qty"], "3");

        let (_, ledger) = send(
            &app,
            Method::GET,
            &format!("/api/v1/patients/{}/movements", patient_id),
            Some(&token),
            None,
        )
        .await;
        assert!(ledger.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ajuste_requires_permission() {
        let app = app();
        let caregiver = token(&[]);
        let supervisor = token(&["inventory:adjust"]);
        let patient_id = create_patient(&app, &caregiver).await;
        let item_id = create_item(&app, &caregiver, &patient_id, gauze()).await;
        let uri = format!("/api/v1/patients/{}/inventory/{}/movements", patient_id, item_id);
        let body = json!({ "type": "ajuste", "quantity": "1", "reason": "Conteo semanal" });

        let (status, _) = send(&app, Method::POST, &uri, Some(&caregiver), Some(body.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, result) = send(&app, Method::POST, &uri, Some(&supervisor), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["item"]["operational_qty"], "1");
        assert_eq!(result["movement"]["reason"], "Conteo semanal");
    }

    #[tokio::test]
    async fn test_alerts_and_unknown_item() {
        let app = app();
        let token = token(&[]);
        let patient_id = create_patient(&app, &token).await;
        create_item(
            &app,
            &token,
            &patient_id,
            json!({ "name": "Pañales", "category": "material", "master_qty": "1", "min_master": "4" }),
        )
        .await;

        let (status, alerts) = send(
            &app,
            Method::GET,
            &format!("/api/v1/patients/{}/inventory-alerts", patient_id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(alerts.as_array().unwrap().len(), 1);
        assert_eq!(alerts[0]["status"]["master"], "low");

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/patients/{}/inventory/{}", patient_id, uuid::Uuid::new_v4()),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}

// ============================================================================
// Activities and jobs
// ============================================================================

#[cfg(test)]
mod job_api_tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_job_requires_permission() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/jobs/decay/run?date=2024-06-01",
            Some(&token(&[])),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");
    }

    #[tokio::test]
    async fn test_manual_run_for_future_date_is_rejected() {
        let app = app();
        let token = token(&["jobs:run"]);
        // Two days ahead is in the future for any facility offset
        let future = (chrono::Utc::now() + chrono::Duration::days(2)).date_naive();

        for job in ["decay", "doses"] {
            let (status, body) = send(
                &app,
                Method::POST,
                &format!("/api/v1/jobs/{}/run?date={}", job, future),
                Some(&token),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
            assert_eq!(body["error"]["field"], "date");
        }

        let (_, runs) = send(&app, Method::GET, "/api/v1/jobs/runs", Some(&token), None).await;
        assert!(runs.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dose_generation_and_instance_status() {
        let app = app();
        let token = token(&["jobs:run"]);
        let patient_id = create_patient(&app, &token).await;

        let (status, schedule) = send(
            &app,
            Method::POST,
            &format!("/api/v1/patients/{}/schedules", patient_id),
            Some(&token),
            Some(json!({
                "name": "Omeprazol",
                "days_of_week": [6],
                "shift": "mañana",
                "preferred_time": "07:30",
                "modality": "defined_activity",
                "defined_activity": { "type": "medicacion", "name": "Omeprazol 20mg" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", schedule);
        let schedule_id = schedule["id"].as_str().unwrap().to_string();

        for _ in 0..2 {
            let (status, run) = send(
                &app,
                Method::POST,
                "/api/v1/jobs/doses/run?date=2024-06-01",
                Some(&token),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{}", run);
            assert_eq!(run["status"], "succeeded");
        }

        let (status, instances) = send(
            &app,
            Method::GET,
            &format!("/api/v1/patients/{}/instances?date=2024-06-01", patient_id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let instances = instances.as_array().unwrap().clone();
        assert_eq!(instances.len(), 1);
        let instance_id = format!("{}_2024-06-01", schedule_id);
        assert_eq!(instances[0]["id"], instance_id.as_str());
        assert_eq!(instances[0]["status"], "pendiente");
        assert_eq!(instances[0]["type"], "medicacion");

        let (status, closed) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/patients/{}/instances/{}/status", patient_id, instance_id),
            Some(&token),
            Some(json!({ "status": "completada", "notes": "Sin novedad" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(closed["status"], "completada");

        let (status, runs) = send(&app, Method::GET, "/api/v1/jobs/runs", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let runs = runs.as_array().unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0]["job"], "doses");
        assert_eq!(runs[0]["report"]["skipped"], 1);
        assert_eq!(runs[1]["report"]["written"], 1);
    }

    #[tokio::test]
    async fn test_decay_run_through_api() {
        let app = app();
        let token = token(&["jobs:run"]);
        let patient_id = create_patient(&app, &token).await;
        let item_id = create_item(
            &app,
            &token,
            &patient_id,
            json!({
                "name": "Jarabe",
                "category": "medicamento",
                "operational_qty": "60",
                "has_shelf_life": true,
                "shelf_life_days": 50
            }),
        )
        .await;

        let (status, run) = send(
            &app,
            Method::POST,
            "/api/v1/jobs/decay/run?date=2024-06-01",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(run["report"]["written"], 1);

        let (_, item) = send(
            &app,
            Method::GET,
            &format!("/api/v1/patients/{}/inventory/{}", patient_id, item_id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(item["operational_qty"], "58.8");
        assert_eq!(item["last_decay_on"], "2024-06-01");
    }
}
