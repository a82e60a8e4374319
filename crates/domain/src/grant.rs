use chrono::{DateTime, Utc};

use crate::request::JitRequest;

/// Owner kind stamped on grants created for access requests.
pub const GRANT_OWNER_KIND: &str = "JitRequest";

/// Annotation carrying the grant expiry instant.
pub const GRANT_EXPIRY_ANNOTATION: &str = "jitgate.dev/expiry";

/// Back-reference from a grant to the request that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerReference {
    /// Owner resource kind.
    pub kind: String,
    /// Owner name.
    pub name: String,
    /// Owner unique identifier.
    pub uid: String,
}

/// Scope-bound access grant provisioned for an approved request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrant {
    /// Grant name, unique within its scope.
    pub name: String,
    /// Scope (namespace) holding the grant.
    pub namespace: String,
    /// Identities receiving the role.
    pub subjects: Vec<String>,
    /// Granted cluster role.
    pub cluster_role: String,
    /// Expiry marker, when present.
    pub expires_at: Option<DateTime<Utc>>,
    /// Owning request, when present.
    pub owner: Option<OwnerReference>,
}

impl RoleGrant {
    /// Builds one grant per target namespace of a request.
    #[must_use]
    pub fn for_request(request: &JitRequest) -> Vec<Self> {
        let subjects = request.spec.subjects();
        request
            .spec
            .namespaces
            .iter()
            .map(|namespace| Self {
                name: grant_name(request.name.as_str()),
                namespace: namespace.clone(),
                subjects: subjects.clone(),
                cluster_role: request.spec.cluster_role.clone(),
                expires_at: Some(request.window_end()),
                owner: Some(OwnerReference {
                    kind: GRANT_OWNER_KIND.to_owned(),
                    name: request.name.clone(),
                    uid: request.uid.clone(),
                }),
            })
            .collect()
    }

    /// Returns whether the grant is owned by the named request.
    #[must_use]
    pub fn is_owned_by(&self, request_name: &str) -> bool {
        self.owner
            .as_ref()
            .is_some_and(|owner| owner.kind == GRANT_OWNER_KIND && owner.name == request_name)
    }
}

/// Returns the grant name derived from a request name.
#[must_use]
pub fn grant_name(request_name: &str) -> String {
    format!("{request_name}-jit")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::request::{JitRequestSpec, JitRequestStatus};

    #[test]
    fn one_grant_per_namespace_owned_by_request() {
        let start = Utc::now();
        let request = JitRequest {
            name: "jit-7".to_owned(),
            uid: "uid-7".to_owned(),
            resource_version: None,
            spec: JitRequestSpec {
                reporter: "dev@example.com".to_owned(),
                additional_user_emails: vec!["ops@example.com".to_owned()],
                cluster_role: "edit".to_owned(),
                namespaces: vec!["a".to_owned(), "b".to_owned()],
                namespace_labels: BTreeMap::new(),
                start_time: start,
                end_time: start + Duration::minutes(5),
                jira_fields: BTreeMap::new(),
            },
            status: JitRequestStatus::default(),
        };

        let grants = RoleGrant::for_request(&request);

        assert_eq!(grants.len(), 2);
        assert!(grants.iter().all(|grant| grant.name == "jit-7-jit"));
        assert!(grants.iter().all(|grant| grant.is_owned_by("jit-7")));
        assert!(!grants[0].is_owned_by("jit-8"));
        assert_eq!(grants[1].subjects.len(), 2);
        assert_eq!(grants[0].expires_at, Some(request.spec.end_time));
    }

    #[test]
    fn foreign_owner_kind_is_not_owned() {
        let grant = RoleGrant {
            name: "x-jit".to_owned(),
            namespace: "a".to_owned(),
            subjects: Vec::new(),
            cluster_role: "edit".to_owned(),
            expires_at: None,
            owner: Some(OwnerReference {
                kind: "Deployment".to_owned(),
                name: "x".to_owned(),
                uid: "u".to_owned(),
            }),
        };

        assert!(!grant.is_owned_by("x"));
    }
}
