//! API Module
//!
//! HTTP surface of the orchestrator. One router carries both the
//! caller-facing control endpoints and the callback endpoints the
//! in-environment task runners report to.

pub mod callback;
pub mod error;
pub mod health;
pub mod job;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::service::Orchestrator;

/// Create the main API router with all endpoints
pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Control surface
        .route("/jobs", post(job::submit_job))
        .route("/jobs", get(job::list_jobs))
        .route("/jobs/{id}/status", get(job::get_job_status))
        .route("/jobs/{id}/result", get(job::get_job_result))
        .route("/jobs/{id}/cancel", post(job::cancel_job))
        // Callback ingestion
        .route("/callback/{id}/complete", post(callback::complete))
        .route("/callback/{id}/status", post(callback::report_status))
        .route("/callback/{id}/heartbeat", post(callback::heartbeat))
        // Add state and middleware
        .with_state(orchestrator)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    use bosun_core::domain::job::JobStatus;
    use bosun_core::domain::manifest::ManifestDefaults;

    use crate::provision::Provisioner;
    use crate::provision::testing::MockProvisioner;
    use crate::store::JobStore;

    fn test_router() -> (Router, Arc<JobStore>) {
        let store = Arc::new(JobStore::new());
        let provisioner = Arc::new(MockProvisioner::new());
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&store),
            provisioner as Arc<dyn Provisioner>,
            ManifestDefaults {
                vm_template: "agent-template".to_string(),
                timeout_seconds: 3600,
                cpu: 2,
                memory: "2G".to_string(),
                disk: "10G".to_string(),
            },
        ));
        (create_router(orchestrator), store)
    }

    fn post_json(uri: String, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn submitted_job(router: &Router, store: &JobStore) -> Uuid {
        let resp = router
            .clone()
            .oneshot(post_json(
                "/jobs".to_string(),
                r#"{"task": "run the suite", "agentType": "script"}"#.to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = json_body(resp).await;
        let id: Uuid = body["job_id"].as_str().unwrap().parse().unwrap();

        // Wait for the spawned provisioning continuation to finish
        for _ in 0..50 {
            if store.get(id).await.unwrap().status == JobStatus::Running {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Running);
        id
    }

    fn completion_body(id: Uuid) -> String {
        format!(
            r#"{{"job_id": "{}", "status": "success", "exit_code": 0,
                 "output": "done", "duration_seconds": 3.5}}"#,
            id
        )
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _) = test_router();

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_submit_and_run() {
        let (router, store) = test_router();
        let id = submitted_job(&router, &store).await;

        // Result is not available while the job runs
        let resp = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/jobs/{}/result", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        // But the status snapshot is
        let resp = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/jobs/{}/status", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    async fn test_submit_invalid_manifest() {
        let (router, store) = test_router();

        let resp = router
            .oneshot(post_json(
                "/jobs".to_string(),
                r#"{"task": "  ", "agentType": "script"}"#.to_string(),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(store.list(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_submit_malformed_body() {
        let (router, store) = test_router();

        let resp = router
            .oneshot(post_json("/jobs".to_string(), "{not json".to_string()))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(store.list(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_completion_round_trip() {
        let (router, store) = test_router();
        let id = submitted_job(&router, &store).await;

        let resp = router
            .clone()
            .oneshot(post_json(
                format!("/callback/{}/complete", id),
                completion_body(id),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = router
            .oneshot(
                Request::builder()
                    .uri(format!("/jobs/{}/result", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["output"], "done");
        assert_eq!(body["exit_code"], 0);
    }

    #[tokio::test]
    async fn test_completion_unknown_id() {
        let (router, store) = test_router();
        let id = Uuid::new_v4();

        let resp = router
            .oneshot(post_json(
                format!("/callback/{}/complete", id),
                completion_body(id),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(store.list(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_completion_invalid_body() {
        let (router, store) = test_router();
        let id = submitted_job(&router, &store).await;

        // Missing exit_code/output/duration_seconds
        let resp = router
            .oneshot(post_json(
                format!("/callback/{}/complete", id),
                format!(r#"{{"job_id": "{}", "status": "success"}}"#, id),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn test_completion_mismatched_job_id() {
        let (router, store) = test_router();
        let id = submitted_job(&router, &store).await;

        let resp = router
            .oneshot(post_json(
                format!("/callback/{}/complete", id),
                completion_body(Uuid::new_v4()),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn test_progress_and_heartbeat() {
        let (router, store) = test_router();
        let id = submitted_job(&router, &store).await;

        let resp = router
            .clone()
            .oneshot(post_json(
                format!("/callback/{}/status", id),
                format!(r#"{{"job_id": "{}", "progress": "halfway"}}"#, id),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            store.get(id).await.unwrap().progress.as_deref(),
            Some("halfway")
        );

        let resp = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/callback/{}/heartbeat", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_heartbeat_unknown_id() {
        let (router, _) = test_router();

        let resp = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/callback/{}/heartbeat", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_paths() {
        let (router, store) = test_router();

        let resp = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/jobs/{}/cancel", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let id = submitted_job(&router, &store).await;
        let resp = router
            .clone()
            .oneshot(post_json(
                format!("/callback/{}/complete", id),
                completion_body(id),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        // Cancelling a finished job is a state conflict
        let resp = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/jobs/{}/cancel", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_list_with_filter() {
        let (router, store) = test_router();
        let id = submitted_job(&router, &store).await;

        let resp = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/jobs?status=running")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["job_id"], id.to_string());

        let resp = router
            .oneshot(
                Request::builder()
                    .uri("/jobs?status=pending")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = json_body(resp).await;
        assert!(body.as_array().unwrap().is_empty());
    }
}
