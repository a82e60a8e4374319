use std::collections::BTreeMap;

use chrono::DateTime;
use jitgate_core::{AppError, AppResult};
use jitgate_domain::{
    ConfigDocument, GRANT_EXPIRY_ANNOTATION, JitRequest, JitRequestSpec, JitRequestStatus,
    OwnerReference, RoleGrant,
};
use serde::{Deserialize, Serialize};

pub(super) const REQUEST_API_VERSION: &str = "jitgate.dev/v1";
pub(super) const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";
const RBAC_API_VERSION: &str = "rbac.authorization.k8s.io/v1";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ObjectMeta {
    pub(super) name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(super) annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(super) owner_references: Vec<OwnerReferenceWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OwnerReferenceWire {
    pub(super) api_version: String,
    pub(super) kind: String,
    pub(super) name: String,
    pub(super) uid: String,
    #[serde(default)]
    pub(super) controller: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct ObjectList<T> {
    #[serde(default = "Vec::new")]
    pub(super) items: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct JitRequestObject {
    #[serde(default = "request_api_version")]
    pub(super) api_version: String,
    #[serde(default = "request_kind")]
    pub(super) kind: String,
    pub(super) metadata: ObjectMeta,
    pub(super) spec: JitRequestSpec,
    #[serde(default)]
    pub(super) status: JitRequestStatus,
}

fn request_api_version() -> String {
    REQUEST_API_VERSION.to_owned()
}

fn request_kind() -> String {
    "JitRequest".to_owned()
}

impl JitRequestObject {
    pub(super) fn into_domain(self) -> JitRequest {
        JitRequest {
            name: self.metadata.name,
            uid: self.metadata.uid.unwrap_or_default(),
            resource_version: self.metadata.resource_version,
            spec: self.spec,
            status: self.status,
        }
    }

    pub(super) fn from_domain(request: &JitRequest, namespace: &str) -> Self {
        Self {
            api_version: request_api_version(),
            kind: request_kind(),
            metadata: ObjectMeta {
                name: request.name.clone(),
                namespace: Some(namespace.to_owned()),
                uid: Some(request.uid.clone()).filter(|uid| !uid.is_empty()),
                resource_version: request.resource_version.clone(),
                ..ObjectMeta::default()
            },
            spec: request.spec.clone(),
            status: request.status.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Subject {
    pub(super) kind: String,
    pub(super) name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) api_group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RoleRef {
    pub(super) api_group: String,
    pub(super) kind: String,
    pub(super) name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RoleBindingObject {
    #[serde(default = "rbac_api_version")]
    pub(super) api_version: String,
    #[serde(default = "role_binding_kind")]
    pub(super) kind: String,
    pub(super) metadata: ObjectMeta,
    #[serde(default)]
    pub(super) subjects: Vec<Subject>,
    pub(super) role_ref: RoleRef,
}

fn rbac_api_version() -> String {
    RBAC_API_VERSION.to_owned()
}

fn role_binding_kind() -> String {
    "RoleBinding".to_owned()
}

impl RoleBindingObject {
    pub(super) fn from_domain(grant: &RoleGrant) -> Self {
        let annotations = grant
            .expires_at
            .map(|expires_at| {
                BTreeMap::from([(GRANT_EXPIRY_ANNOTATION.to_owned(), expires_at.to_rfc3339())])
            })
            .unwrap_or_default();
        let owner_references = grant
            .owner
            .iter()
            .map(|owner| OwnerReferenceWire {
                api_version: REQUEST_API_VERSION.to_owned(),
                kind: owner.kind.clone(),
                name: owner.name.clone(),
                uid: owner.uid.clone(),
                controller: true,
            })
            .collect();

        Self {
            api_version: rbac_api_version(),
            kind: role_binding_kind(),
            metadata: ObjectMeta {
                name: grant.name.clone(),
                namespace: Some(grant.namespace.clone()),
                annotations,
                owner_references,
                ..ObjectMeta::default()
            },
            subjects: grant
                .subjects
                .iter()
                .map(|subject| Subject {
                    kind: "User".to_owned(),
                    name: subject.clone(),
                    api_group: Some(RBAC_API_GROUP.to_owned()),
                })
                .collect(),
            role_ref: RoleRef {
                api_group: RBAC_API_GROUP.to_owned(),
                kind: "ClusterRole".to_owned(),
                name: grant.cluster_role.clone(),
            },
        }
    }

    pub(super) fn into_domain(self, namespace: &str) -> RoleGrant {
        let expires_at = self
            .metadata
            .annotations
            .get(GRANT_EXPIRY_ANNOTATION)
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|value| value.to_utc());
        let owner = self
            .metadata
            .owner_references
            .iter()
            .find(|reference| reference.controller)
            .or_else(|| self.metadata.owner_references.first())
            .map(|reference| OwnerReference {
                kind: reference.kind.clone(),
                name: reference.name.clone(),
                uid: reference.uid.clone(),
            });

        RoleGrant {
            name: self.metadata.name,
            namespace: self
                .metadata
                .namespace
                .unwrap_or_else(|| namespace.to_owned()),
            subjects: self
                .subjects
                .into_iter()
                .map(|subject| subject.name)
                .collect(),
            cluster_role: self.role_ref.name,
            expires_at,
            owner,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct NamespaceObject {
    pub(super) metadata: ObjectMeta,
}

#[derive(Debug, Deserialize)]
pub(super) struct ConfigObject {
    pub(super) spec: serde_json::Value,
}

impl ConfigObject {
    pub(super) fn into_document(self) -> AppResult<ConfigDocument> {
        serde_json::from_value(self.spec).map_err(|error| {
            AppError::Configuration(format!("failed to parse configuration object: {error}"))
        })
    }
}
