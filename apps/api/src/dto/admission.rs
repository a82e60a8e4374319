use jitgate_domain::JitRequestSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// API version of the admission review envelope.
pub const ADMISSION_API_VERSION: &str = "admission.k8s.io/v1";

const ADMISSION_KIND: &str = "AdmissionReview";

/// Incoming admission review envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReviewRequest {
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub request: Option<AdmissionRequest>,
}

/// One admission request for a request object.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    pub uid: String,
    pub operation: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub object: Option<Value>,
}

impl AdmissionRequest {
    pub fn is_delete(&self) -> bool {
        self.operation.eq_ignore_ascii_case("DELETE")
    }
}

/// Subset of a submitted request object needed for validation.
#[derive(Debug, Deserialize)]
pub struct AdmissionObject {
    #[serde(default)]
    pub metadata: AdmissionObjectMeta,
    pub spec: JitRequestSpec,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdmissionObjectMeta {
    #[serde(default)]
    pub name: Option<String>,
}

/// Outgoing admission review envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReviewResponse {
    pub api_version: String,
    pub kind: &'static str,
    pub response: AdmissionResponse,
}

impl AdmissionReviewResponse {
    /// Wraps a verdict, echoing the caller's envelope version when given.
    pub fn new(api_version: Option<String>, response: AdmissionResponse) -> Self {
        Self {
            api_version: api_version.unwrap_or_else(|| ADMISSION_API_VERSION.to_owned()),
            kind: ADMISSION_KIND,
            response,
        }
    }
}

/// Admission verdict.
#[derive(Debug, Serialize)]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AdmissionStatus>,
}

impl AdmissionResponse {
    pub fn allowed(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            status: None,
        }
    }

    pub fn denied(uid: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: false,
            status: Some(AdmissionStatus {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Denial detail shown to the submitter.
#[derive(Debug, Serialize)]
pub struct AdmissionStatus {
    pub code: u16,
    pub message: String,
}
