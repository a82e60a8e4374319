mod admission;
mod health;

pub use admission::{
    ADMISSION_API_VERSION, AdmissionObject, AdmissionRequest, AdmissionResponse,
    AdmissionReviewRequest, AdmissionReviewResponse, AdmissionStatus,
};
pub use health::HealthResponse;
