use std::collections::BTreeMap;

use jitgate_core::{AppError, AppResult, NonEmptyString};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Encoding kind of one ticket field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Date or timestamp rendered as text.
    Date,
    /// Single-select option.
    Select,
    /// Reference to an issue-tracker account.
    User,
}

impl FieldKind {
    /// Returns stable configuration value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Date => "date",
            Self::Select => "select",
            Self::User => "user",
        }
    }
}

/// Mapping from a logical field to an issue-tracker field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldSettings {
    /// Encoding kind.
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// External field identifier.
    pub jira_custom_field: String,
}

impl CustomFieldSettings {
    /// Creates one field mapping.
    #[must_use]
    pub fn new(kind: FieldKind, jira_custom_field: impl Into<String>) -> Self {
        Self {
            kind,
            jira_custom_field: jira_custom_field.into(),
        }
    }
}

/// Field mappings the engine always fills in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredFields {
    /// Field receiving the requested role.
    #[serde(rename = "ClusterRole")]
    pub cluster_role: CustomFieldSettings,
    /// Field receiving the start instant.
    #[serde(rename = "StartTime")]
    pub start_time: CustomFieldSettings,
    /// Field receiving the end instant.
    #[serde(rename = "EndTime")]
    pub end_time: CustomFieldSettings,
}

/// Cluster and environment names stamped on tickets as labels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetEnvironment {
    /// Environment name.
    #[serde(default)]
    pub environment: String,
    /// Cluster name.
    #[serde(default)]
    pub cluster: String,
}

/// Declarative operator configuration as authored by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    /// Roles that may be requested.
    pub allowed_cluster_roles: Vec<String>,
    /// Workflow status name meaning "approved".
    pub jira_workflow_approve_status: String,
    /// Transition used to reject tickets.
    #[serde(rename = "rejectedTransitionID")]
    pub rejected_transition_id: String,
    /// Transition used to complete tickets.
    #[serde(rename = "completedTransitionID")]
    pub completed_transition_id: String,
    /// Issue-tracker project key.
    pub jira_project: String,
    /// Issue type name.
    pub jira_issue_type: String,
    /// Mappings for role and window fields.
    pub required_fields: RequiredFields,
    /// Mandatory request-supplied fields.
    #[serde(default)]
    pub custom_fields: BTreeMap<String, CustomFieldSettings>,
    /// Labels added to every ticket.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Target cluster and environment.
    #[serde(default)]
    pub environment: TargetEnvironment,
    /// Free text appended to pre-approval comments.
    #[serde(default)]
    pub additional_comment_text: String,
    /// Optional pattern every namespace must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_allowed_regex: Option<String>,
    /// Allows requesters to appear in identity fields of their own request.
    #[serde(default)]
    pub self_approval_enabled: bool,
}

impl ConfigDocument {
    /// Returns the configuration used when no configuration object exists.
    #[must_use]
    pub fn builtin_default() -> Self {
        let custom_fields = BTreeMap::from([
            (
                "Approver".to_owned(),
                CustomFieldSettings::new(FieldKind::User, "customfield_10114"),
            ),
            (
                "ProductOwner".to_owned(),
                CustomFieldSettings::new(FieldKind::User, "customfield_10115"),
            ),
            (
                "Justification".to_owned(),
                CustomFieldSettings::new(FieldKind::Text, "customfield_10116"),
            ),
        ]);

        Self {
            allowed_cluster_roles: vec!["edit".to_owned()],
            jira_workflow_approve_status: "Approved".to_owned(),
            rejected_transition_id: "21".to_owned(),
            completed_transition_id: "41".to_owned(),
            jira_project: "IAM".to_owned(),
            jira_issue_type: "Access Request".to_owned(),
            required_fields: RequiredFields {
                cluster_role: CustomFieldSettings::new(FieldKind::Text, "customfield_10117"),
                start_time: CustomFieldSettings::new(FieldKind::Date, "customfield_10118"),
                end_time: CustomFieldSettings::new(FieldKind::Date, "customfield_10119"),
            },
            custom_fields,
            labels: vec!["default-config".to_owned()],
            environment: TargetEnvironment {
                environment: "dev-test".to_owned(),
                cluster: "minikube".to_owned(),
            },
            additional_comment_text: "config: default".to_owned(),
            namespace_allowed_regex: Some(".*".to_owned()),
            self_approval_enabled: false,
        }
    }

    /// Parses one JSON configuration document.
    pub fn from_json(bytes: &[u8]) -> AppResult<Self> {
        serde_json::from_slice(bytes).map_err(|error| {
            AppError::Configuration(format!("failed to parse configuration document: {error}"))
        })
    }

    /// Serializes the document as pretty JSON.
    pub fn to_json(&self) -> AppResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|error| {
            AppError::Configuration(format!("failed to serialize configuration document: {error}"))
        })
    }
}

/// Immutable, validated, versioned view of the operator configuration.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    version: u64,
    document: ConfigDocument,
    namespace_regex: Option<Regex>,
}

impl ConfigSnapshot {
    /// Validates a document into a snapshot.
    pub fn new(document: ConfigDocument, version: u64) -> AppResult<Self> {
        for (name, value) in [
            ("jiraProject", document.jira_project.as_str()),
            ("jiraIssueType", document.jira_issue_type.as_str()),
            (
                "jiraWorkflowApproveStatus",
                document.jira_workflow_approve_status.as_str(),
            ),
            ("rejectedTransitionID", document.rejected_transition_id.as_str()),
            (
                "completedTransitionID",
                document.completed_transition_id.as_str(),
            ),
        ] {
            NonEmptyString::new(value).map_err(|_| {
                AppError::Configuration(format!("configuration field '{name}' must not be empty"))
            })?;
        }

        let namespace_regex = document
            .namespace_allowed_regex
            .as_deref()
            .filter(|pattern| !pattern.trim().is_empty())
            .map(|pattern| {
                Regex::new(pattern).map_err(|error| {
                    AppError::Configuration(format!(
                        "invalid namespaceAllowedRegex '{pattern}': {error}"
                    ))
                })
            })
            .transpose()?;

        Ok(Self {
            version,
            document,
            namespace_regex,
        })
    }

    /// Returns the monotonic snapshot version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the source document.
    #[must_use]
    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    /// Returns whether the role may be requested.
    #[must_use]
    pub fn is_role_allowed(&self, role: &str) -> bool {
        self.document
            .allowed_cluster_roles
            .iter()
            .any(|allowed| allowed == role)
    }

    /// Returns the compiled namespace pattern.
    #[must_use]
    pub fn namespace_regex(&self) -> Option<&Regex> {
        self.namespace_regex.as_ref()
    }

    /// Returns the mandatory request-supplied field mappings.
    #[must_use]
    pub fn custom_fields(&self) -> &BTreeMap<String, CustomFieldSettings> {
        &self.document.custom_fields
    }

    /// Returns the workflow status name meaning "approved".
    #[must_use]
    pub fn approve_status(&self) -> &str {
        self.document.jira_workflow_approve_status.as_str()
    }

    /// Returns the reject transition identifier.
    #[must_use]
    pub fn rejected_transition_id(&self) -> &str {
        self.document.rejected_transition_id.as_str()
    }

    /// Returns the complete transition identifier.
    #[must_use]
    pub fn completed_transition_id(&self) -> &str {
        self.document.completed_transition_id.as_str()
    }

    /// Returns the free-text addendum for pre-approval comments.
    #[must_use]
    pub fn additional_comment_text(&self) -> &str {
        self.document.additional_comment_text.as_str()
    }

    /// Returns whether requesters may approve their own request.
    #[must_use]
    pub fn self_approval_enabled(&self) -> bool {
        self.document.self_approval_enabled
    }
}
