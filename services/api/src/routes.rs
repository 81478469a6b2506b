use crate::infra::{parse_category, parse_gender, parse_scope, AppState, CutoffState};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use cutoff_finder::admissions::{AdmissionYear, DatasetSummary, Query, QueryError, QueryReport};
use cutoff_finder::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct EligibilityRequest {
    pub(crate) rank: u32,
    pub(crate) category: String,
    #[serde(default)]
    pub(crate) pwd: bool,
    #[serde(default = "default_gender")]
    pub(crate) gender: String,
    pub(crate) year: u16,
    #[serde(default = "default_scope")]
    pub(crate) scope: String,
}

fn default_gender() -> String {
    "Gender-Neutral".to_string()
}

fn default_scope() -> String {
    "iit".to_string()
}

impl EligibilityRequest {
    pub(crate) fn into_query(self) -> Result<Query, QueryError> {
        Ok(Query {
            rank: self.rank,
            category: parse_category(&self.category).map_err(QueryError::InvalidQuery)?,
            pwd: self.pwd,
            gender_pool: parse_gender(&self.gender).map_err(QueryError::InvalidQuery)?,
            year: AdmissionYear(self.year),
            institute_scope: parse_scope(&self.scope).map_err(QueryError::InvalidQuery)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EligibilityResponse {
    pub(crate) scope_label: String,
    #[serde(flatten)]
    pub(crate) report: QueryReport,
    pub(crate) notes: Vec<String>,
}

impl From<QueryReport> for EligibilityResponse {
    fn from(report: QueryReport) -> Self {
        let mut notes = Vec::new();
        if let Some(note) = report.skipped_note() {
            notes.push(note);
        }
        if !report.missing_tiers.is_empty() {
            let labels = report
                .missing_tiers
                .iter()
                .map(|tier| tier.label())
                .collect::<Vec<_>>()
                .join(", ");
            notes.push(format!(
                "no {} data for {}; results cover the remaining tiers",
                report.query.year, labels
            ));
        }
        for view in report.views.iter().filter(|view| view.is_empty()) {
            notes.push(format!("{}: no programs matched", view.label));
        }

        Self {
            scope_label: report.query.institute_scope.label(),
            report,
            notes,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DatasetsResponse {
    pub(crate) datasets: Vec<DatasetSummary>,
}

/// Eligibility and dataset endpoints over the shared cutoff state.
pub(crate) fn eligibility_router(state: CutoffState) -> Router {
    Router::new()
        .route("/api/v1/eligibility/query", post(eligibility_endpoint))
        .route("/api/v1/datasets", get(datasets_endpoint))
        .route("/api/v1/datasets/reload", post(reload_endpoint))
        .with_state(state)
}

pub(crate) fn with_service_routes(state: CutoffState) -> Router {
    eligibility_router(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn eligibility_endpoint(
    State(state): State<CutoffState>,
    payload: Result<Json<EligibilityRequest>, JsonRejection>,
) -> Result<Json<EligibilityResponse>, AppError> {
    let Json(payload) =
        payload.map_err(|rejection| QueryError::InvalidQuery(rejection.body_text()))?;
    let query = payload.into_query()?;
    let store = state.snapshot();
    let report = state.engine().evaluate(store.as_ref(), &query)?;
    Ok(Json(EligibilityResponse::from(report)))
}

pub(crate) async fn datasets_endpoint(State(state): State<CutoffState>) -> Json<DatasetsResponse> {
    Json(DatasetsResponse {
        datasets: state.snapshot().datasets(),
    })
}

pub(crate) async fn reload_endpoint(
    State(state): State<CutoffState>,
) -> Result<Json<DatasetsResponse>, AppError> {
    let store = state.reload()?;
    Ok(Json(DatasetsResponse {
        datasets: store.datasets(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use cutoff_finder::admissions::{
        AdmissionRecord, BaseCategory, CutoffRank, EligibilityEngine, GenderPool, InstituteTier,
        Quota, RecordStore, RecordTable, SeatCategory, ViewCatalog,
    };
    use cutoff_finder::config::DataConfig;
    use serde_json::Value;
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn nit_record(institute: &str, program: &str, opening: u32, closing: u32) -> AdmissionRecord {
        AdmissionRecord {
            institute: institute.to_string(),
            institute_tier: InstituteTier::TierB,
            program: program.to_string(),
            seat_category: SeatCategory::new(BaseCategory::Open, false),
            gender_pool: GenderPool::GenderNeutral,
            opening_rank: CutoffRank::Numeric(opening),
            closing_rank: CutoffRank::Numeric(closing),
            quota: Some(Quota::OtherState),
            year: AdmissionYear(2024),
        }
    }

    fn state() -> CutoffState {
        let mut store = RecordStore::new();
        store.insert_table(RecordTable::new(
            InstituteTier::TierB,
            AdmissionYear(2024),
            vec![
                nit_record("NIT Trichy", "Computer Science and Engineering", 400, 1100),
                nit_record("NIT Warangal", "Civil Engineering", 1300, 2600),
            ],
            2,
        ));
        let years = vec![AdmissionYear(2024)];
        CutoffState::new(
            store,
            EligibilityEngine::new(ViewCatalog::standard(), years.clone()),
            DataConfig {
                dir: PathBuf::from("does-not-exist"),
                years,
            },
        )
    }

    async fn post_query(router: Router, body: Value) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/eligibility/query")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&body).expect("serialize")))
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn query_endpoint_returns_ordered_views() {
        let (status, payload) = post_query(
            eligibility_router(state()),
            json!({ "rank": 1000, "category": "OPEN", "year": 2024, "scope": "all-except-iit" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["scope_label"], "NIT + IIIT + GFTI");
        assert_eq!(payload["skipped_records"], 2);
        assert_eq!(payload["missing_tiers"], json!(["tier_c", "tier_d"]));

        let views = payload["views"].as_array().expect("views array");
        assert_eq!(views.len(), 2);
        assert_eq!(views[0]["kind"], "all_recommended");
        assert_eq!(views[0]["count"], 2);
        assert_eq!(views[0]["results"][0]["status"], "fitting");
        assert_eq!(views[0]["results"][1]["status"], "opening_down");
        assert_eq!(views[0]["results"][0]["record"]["quota"], "other_state");

        let notes = payload["notes"].as_array().expect("notes array");
        assert!(notes
            .iter()
            .any(|note| note.as_str().is_some_and(|text| text.contains("2 records skipped"))));
    }

    #[tokio::test]
    async fn query_endpoint_maps_missing_data_to_not_found() {
        let (status, payload) = post_query(
            eligibility_router(state()),
            json!({ "rank": 1000, "category": "OPEN", "year": 2024, "scope": "iit" }),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(payload["kind"], "data_unavailable");
    }

    #[tokio::test]
    async fn query_endpoint_rejects_unknown_category() {
        let (status, payload) = post_query(
            eligibility_router(state()),
            json!({ "rank": 1000, "category": "XYZ", "year": 2024, "scope": "nit" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["kind"], "invalid_query");
    }

    #[tokio::test]
    async fn query_endpoint_reports_malformed_bodies_as_json_errors() {
        let (status, payload) = post_query(
            eligibility_router(state()),
            json!({ "rank": -5, "category": "OPEN", "year": 2024 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["kind"], "invalid_query");

        let (status, payload) = post_query(
            eligibility_router(state()),
            json!({ "category": "OPEN", "year": 2024 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["kind"], "invalid_query");
        assert!(payload["error"]
            .as_str()
            .is_some_and(|text| text.contains("rank")));
    }

    #[tokio::test]
    async fn datasets_endpoint_lists_loaded_tables() {
        let response = eligibility_router(state())
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/datasets")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let payload: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(payload["datasets"][0]["tier_label"], "NIT");
        assert_eq!(payload["datasets"][0]["records"], 2);
        assert_eq!(payload["datasets"][0]["state"], "loaded");
    }

    async fn post_reload(router: Router) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/datasets/reload")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    fn state_reading(dir: PathBuf) -> CutoffState {
        let years = vec![AdmissionYear(2024)];
        CutoffState::new(
            RecordStore::new(),
            EligibilityEngine::new(ViewCatalog::standard(), years.clone()),
            DataConfig { dir, years },
        )
    }

    #[tokio::test]
    async fn failed_reload_keeps_the_current_tables() {
        let state = state();
        let (status, payload) = post_reload(eligibility_router(state.clone())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(payload["kind"], "data_load_failed");
        let datasets = state.snapshot().datasets();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].records, 2);
    }

    #[tokio::test]
    async fn reload_loads_readable_tables_and_flags_corrupt_ones() {
        let dir = std::env::temp_dir().join(format!("cutoff-api-reload-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("nit")).expect("nit dir");
        std::fs::create_dir_all(dir.join("iiit")).expect("iiit dir");
        std::fs::write(
            dir.join("nit").join("2024.csv"),
            "Institute,Program,Seat Type,Gender,OR,CR\nNIT Trichy,Computer Science and Engineering,OPEN,Gender-Neutral,400,1100\n",
        )
        .expect("nit fixture");
        std::fs::write(
            dir.join("iiit").join("2024.csv"),
            b"Institute,\xffProgram,Seat Type,Gender,OR,CR\n".to_vec(),
        )
        .expect("iiit fixture");

        let state = state_reading(dir.clone());
        let (status, payload) = post_reload(eligibility_router(state.clone())).await;
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["datasets"][0]["tier_label"], "NIT");
        assert_eq!(payload["datasets"][0]["state"], "loaded");
        assert_eq!(payload["datasets"][1]["tier_label"], "IIIT");
        assert_eq!(payload["datasets"][1]["state"], "unreadable");
        assert!(payload["datasets"][1]["error"].is_string());

        let (status, payload) = post_query(
            eligibility_router(state.clone()),
            json!({ "rank": 1000, "category": "OPEN", "year": 2024, "scope": "nit" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["views"][0]["count"], 1);

        let (status, payload) = post_query(
            eligibility_router(state),
            json!({ "rank": 1000, "category": "OPEN", "year": 2024, "scope": "iiit" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(payload["kind"], "table_unreadable");
    }
}
