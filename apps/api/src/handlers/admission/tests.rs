use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Json;
use axum::extract::State;
use chrono::{Duration, Utc};
use jitgate_application::{
    ConfigSnapshotStore, NamespaceDirectory, PolicyValidator, SystemClock, TicketGateway,
};
use jitgate_core::{AppError, AppResult};
use jitgate_domain::{ConfigDocument, TicketDraft};
use serde_json::{Value, json};

use super::validate_request_handler;
use crate::dto::AdmissionReviewRequest;
use crate::error::ApiError;
use crate::handlers::health::health_handler;
use crate::state::AppState;

struct FakeNamespaceDirectory {
    labelled: BTreeSet<String>,
}

#[async_trait]
impl NamespaceDirectory for FakeNamespaceDirectory {
    async fn list_namespaces_by_labels(
        &self,
        _labels: &BTreeMap<String, String>,
    ) -> AppResult<BTreeSet<String>> {
        Ok(self.labelled.clone())
    }
}

struct FakeDirectory {
    accounts: BTreeMap<String, String>,
    unavailable: bool,
}

#[async_trait]
impl TicketGateway for FakeDirectory {
    async fn create_ticket(&self, _draft: &TicketDraft) -> AppResult<String> {
        Err(AppError::Internal("not used by admission".to_owned()))
    }

    async fn add_comment(&self, _ticket_key: &str, _body: &str) -> AppResult<()> {
        Ok(())
    }

    async fn transition(&self, _ticket_key: &str, _transition_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn ticket_status(&self, _ticket_key: &str) -> AppResult<String> {
        Ok("To Do".to_owned())
    }

    async fn resolve_account(&self, handle: &str) -> AppResult<String> {
        if self.unavailable {
            return Err(AppError::ExternalService {
                status: Some(503),
                message: "directory offline".to_owned(),
            });
        }

        self.accounts
            .get(handle)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("user '{handle}'")))
    }
}

fn directory(unavailable: bool) -> Arc<FakeDirectory> {
    Arc::new(FakeDirectory {
        accounts: BTreeMap::from([
            ("dev@example.com".to_owned(), "dev".to_owned()),
            ("lead".to_owned(), "lead".to_owned()),
            ("owner".to_owned(), "owner".to_owned()),
            ("dev".to_owned(), "dev".to_owned()),
        ]),
        unavailable,
    })
}

async fn test_state(loaded: bool, unavailable: bool) -> AppState {
    let config_snapshots = ConfigSnapshotStore::new();
    if loaded {
        let replaced = config_snapshots
            .replace(ConfigDocument::builtin_default())
            .await;
        assert!(replaced.is_ok());
    }

    let namespaces = Arc::new(FakeNamespaceDirectory {
        labelled: BTreeSet::from(["team-a".to_owned()]),
    });

    AppState {
        policy_validator: PolicyValidator::new(namespaces)
            .with_identity_resolution(directory(unavailable), false),
        config_snapshots,
        clock: Arc::new(SystemClock),
    }
}

fn request_object(cluster_role: &str, approver: &str) -> Value {
    let start = Utc::now() + Duration::hours(1);
    json!({
        "apiVersion": "jitgate.dev/v1",
        "kind": "JitRequest",
        "metadata": { "name": "jit-1" },
        "spec": {
            "reporter": "dev@example.com",
            "clusterRole": cluster_role,
            "namespaces": ["team-a"],
            "startTime": start.to_rfc3339(),
            "endTime": (start + Duration::hours(2)).to_rfc3339(),
            "jiraFields": {
                "Approver": approver,
                "ProductOwner": "owner",
                "Justification": "incident"
            }
        }
    })
}

fn review(operation: &str, object: Option<Value>) -> AdmissionReviewRequest {
    let mut request = json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": { "uid": "review-1", "operation": operation }
    });
    if let (Some(object), Some(inner)) = (object, request.get_mut("request")) {
        inner["object"] = object;
    }

    match serde_json::from_value(request) {
        Ok(review) => review,
        Err(error) => panic!("invalid test review: {error}"),
    }
}

async fn run(state: AppState, review: AdmissionReviewRequest) -> Value {
    let response = validate_request_handler(State(state), Json(review)).await;
    let Ok(Json(response)) = response else {
        panic!("admission handler returned an error");
    };

    match serde_json::to_value(response) {
        Ok(value) => value,
        Err(error) => panic!("unserializable response: {error}"),
    }
}

#[tokio::test]
async fn valid_request_is_allowed() {
    let state = test_state(true, false).await;

    let response = run(state, review("CREATE", Some(request_object("edit", "lead")))).await;

    assert_eq!(response["apiVersion"], "admission.k8s.io/v1");
    assert_eq!(response["kind"], "AdmissionReview");
    assert_eq!(response["response"]["uid"], "review-1");
    assert_eq!(response["response"]["allowed"], true);
    assert!(response["response"].get("status").is_none());
}

#[tokio::test]
async fn disallowed_role_is_forbidden_with_field_path() {
    let state = test_state(true, false).await;

    let response = run(state, review("UPDATE", Some(request_object("admin", "lead")))).await;

    assert_eq!(response["response"]["allowed"], false);
    assert_eq!(response["response"]["status"]["code"], 403);
    assert_eq!(
        response["response"]["status"]["message"],
        "spec.clusterRole: Invalid value: clusterRole must be one of 'edit'"
    );
}

#[tokio::test]
async fn self_approval_is_forbidden() {
    let state = test_state(true, false).await;

    let response = run(state, review("CREATE", Some(request_object("edit", "dev")))).await;

    assert_eq!(response["response"]["status"]["code"], 403);
    assert_eq!(
        response["response"]["status"]["message"],
        "spec.jiraFields.Approver: Invalid value: Reporter 'dev@example.com' cannot be the same as user field 'Approver'"
    );
}

#[tokio::test]
async fn delete_is_always_allowed() {
    let state = test_state(false, true).await;

    let response = run(state, review("DELETE", None)).await;

    assert_eq!(response["response"]["allowed"], true);
}

#[tokio::test]
async fn remote_failure_is_internal_error() {
    let state = test_state(true, true).await;

    let response = run(state, review("CREATE", Some(request_object("edit", "lead")))).await;

    assert_eq!(response["response"]["allowed"], false);
    assert_eq!(response["response"]["status"]["code"], 500);
}

#[tokio::test]
async fn missing_configuration_is_internal_error() {
    let state = test_state(false, false).await;

    let response = run(state, review("CREATE", Some(request_object("edit", "lead")))).await;

    assert_eq!(response["response"]["status"]["code"], 500);
}

#[tokio::test]
async fn undecodable_object_is_bad_request() {
    let state = test_state(true, false).await;

    let response = run(
        state,
        review("CREATE", Some(json!({ "spec": { "clusterRole": 7 } }))),
    )
    .await;

    assert_eq!(response["response"]["status"]["code"], 400);
}

#[tokio::test]
async fn review_without_request_is_rejected() {
    let state = test_state(true, false).await;
    let review = match serde_json::from_value::<AdmissionReviewRequest>(json!({})) {
        Ok(review) => review,
        Err(error) => panic!("invalid test review: {error}"),
    };

    let result = validate_request_handler(State(state), Json(review)).await;

    assert!(matches!(result, Err(ApiError(AppError::Validation(_)))));
}

#[tokio::test]
async fn health_reports_loaded_configuration_version() {
    let (status, Json(body)) = health_handler(State(test_state(true, false).await)).await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert!(body.ready);
    assert_eq!(body.config_version, Some(1));

    let (status, Json(body)) = health_handler(State(test_state(false, false).await)).await;
    assert_eq!(status, axum::http::StatusCode::SERVICE_UNAVAILABLE);
    assert!(!body.ready);
}
