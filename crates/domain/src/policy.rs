use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};

use crate::config::ConfigSnapshot;
use crate::request::JitRequestSpec;

/// Single structured admission-policy violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyViolation {
    /// Dotted path of the offending request field.
    pub field_path: String,
    /// Human-readable reason.
    pub message: String,
    /// Namespaces that failed a scope check, in request order.
    pub offending_scopes: Vec<String>,
}

impl PolicyViolation {
    /// Creates a violation without offending scopes.
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            message: message.into(),
            offending_scopes: Vec::new(),
        }
    }

    /// Attaches the namespaces that failed a scope check.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.offending_scopes = scopes;
        self
    }
}

impl Display for PolicyViolation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}: Invalid value: {}",
            self.field_path, self.message
        )
    }
}

/// Checks that the role is allowed by the snapshot.
pub fn check_cluster_role(
    spec: &JitRequestSpec,
    config: &ConfigSnapshot,
) -> Result<(), PolicyViolation> {
    if config.is_role_allowed(spec.cluster_role.as_str()) {
        return Ok(());
    }

    Err(PolicyViolation::new(
        "spec.clusterRole",
        format!(
            "clusterRole must be one of '{}'",
            config.document().allowed_cluster_roles.join(", ")
        ),
    ))
}

/// Checks that the window starts strictly after `now`.
pub fn check_start_in_future(
    spec: &JitRequestSpec,
    now: DateTime<Utc>,
) -> Result<(), PolicyViolation> {
    if spec.start_time > now {
        return Ok(());
    }

    Err(PolicyViolation::new(
        "spec.startTime",
        "start time must be after current time",
    ))
}

/// Checks that the window ends strictly after it starts.
pub fn check_end_after_start(spec: &JitRequestSpec) -> Result<(), PolicyViolation> {
    if spec.has_valid_window() {
        return Ok(());
    }

    Err(PolicyViolation::new(
        "spec.endTime",
        format!(
            "end time must be after startTime '{}'",
            spec.start_time.to_rfc3339()
        ),
    ))
}

/// Checks every namespace against the configured allow pattern.
pub fn check_namespace_pattern(
    spec: &JitRequestSpec,
    config: &ConfigSnapshot,
) -> Result<(), PolicyViolation> {
    let Some(pattern) = config.namespace_regex() else {
        return Ok(());
    };

    match spec
        .namespaces
        .iter()
        .find(|namespace| !pattern.is_match(namespace))
    {
        None => Ok(()),
        Some(namespace) => Err(PolicyViolation::new(
            "spec.namespaces",
            format!(
                "namespace does not match the allowed pattern: {}",
                pattern.as_str()
            ),
        )
        .with_scopes(vec![namespace.clone()])),
    }
}

/// Checks that every namespace is among those carrying the requested labels.
///
/// `matching` is the set of namespaces the directory returned for the
/// request's label selector. Requests without label constraints always pass.
pub fn check_namespace_labels(
    spec: &JitRequestSpec,
    matching: &BTreeSet<String>,
) -> Result<(), PolicyViolation> {
    if spec.namespace_labels.is_empty() {
        return Ok(());
    }

    let invalid: Vec<String> = spec
        .namespaces
        .iter()
        .filter(|namespace| !matching.contains(namespace.as_str()))
        .cloned()
        .collect();
    if invalid.is_empty() {
        return Ok(());
    }

    let labels = spec
        .namespace_labels
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ");

    Err(PolicyViolation::new(
        "spec.namespaces",
        format!(
            "the following namespaces do not match the specified labels ({labels}): [{}]",
            invalid.join(" ")
        ),
    )
    .with_scopes(invalid))
}

/// Returns the first configured custom field missing from the request.
#[must_use]
pub fn missing_custom_field<'a>(
    spec: &JitRequestSpec,
    config: &'a ConfigSnapshot,
) -> Option<&'a str> {
    config
        .custom_fields()
        .keys()
        .find(|name| !spec.jira_fields.contains_key(name.as_str()))
        .map(String::as_str)
}

/// Checks that every configured custom field is present.
pub fn check_custom_fields(
    spec: &JitRequestSpec,
    config: &ConfigSnapshot,
) -> Result<(), PolicyViolation> {
    match missing_custom_field(spec, config) {
        None => Ok(()),
        Some(name) => Err(PolicyViolation::new(
            "spec.jiraFields",
            format!("missing custom field: {name}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Duration;

    use super::*;
    use crate::config::ConfigDocument;

    fn snapshot(regex: Option<&str>) -> ConfigSnapshot {
        let mut document = ConfigDocument::builtin_default();
        document.namespace_allowed_regex = regex.map(str::to_owned);
        match ConfigSnapshot::new(document, 1) {
            Ok(snapshot) => snapshot,
            Err(error) => panic!("invalid test snapshot: {error}"),
        }
    }

    fn spec(now: DateTime<Utc>) -> JitRequestSpec {
        JitRequestSpec {
            reporter: "dev@example.com".to_owned(),
            additional_user_emails: Vec::new(),
            cluster_role: "edit".to_owned(),
            namespaces: vec!["team-a".to_owned(), "sandbox".to_owned()],
            namespace_labels: BTreeMap::new(),
            start_time: now + Duration::seconds(10),
            end_time: now + Duration::seconds(20),
            jira_fields: BTreeMap::from([
                ("Approver".to_owned(), "lead".to_owned()),
                ("ProductOwner".to_owned(), "owner".to_owned()),
                ("Justification".to_owned(), "incident".to_owned()),
            ]),
        }
    }

    #[test]
    fn disallowed_role_lists_allowed_set() {
        let now = Utc::now();
        let mut spec = spec(now);
        spec.cluster_role = "admin".to_owned();

        let violation = check_cluster_role(&spec, &snapshot(None)).err();

        assert_eq!(
            violation.map(|violation| violation.to_string()),
            Some("spec.clusterRole: Invalid value: clusterRole must be one of 'edit'".to_owned())
        );
    }

    #[test]
    fn start_equal_to_now_is_rejected() {
        let now = Utc::now();
        let mut spec = spec(now);
        spec.start_time = now;

        assert!(check_start_in_future(&spec, now).is_err());
    }

    #[test]
    fn end_equal_to_start_is_rejected() {
        let now = Utc::now();
        let mut spec = spec(now);
        spec.end_time = spec.start_time;

        let violation = check_end_after_start(&spec).err();
        assert_eq!(
            violation.map(|violation| violation.field_path),
            Some("spec.endTime".to_owned())
        );
    }

    #[test]
    fn pattern_reports_first_offending_namespace() {
        let spec = spec(Utc::now());

        let violation = check_namespace_pattern(&spec, &snapshot(Some("^team-")));

        assert!(matches!(
            violation,
            Err(ref violation) if violation.offending_scopes == vec!["sandbox".to_owned()]
                && violation.message == "namespace does not match the allowed pattern: ^team-"
        ));
        assert!(check_namespace_pattern(&spec, &snapshot(None)).is_ok());
    }

    #[test]
    fn labels_collect_all_non_matching_namespaces() {
        let mut spec = spec(Utc::now());
        spec.namespace_labels = BTreeMap::from([("tier".to_owned(), "dev".to_owned())]);
        let matching = BTreeSet::from(["team-a".to_owned()]);

        let violation = check_namespace_labels(&spec, &matching).err();

        assert_eq!(
            violation.map(|violation| violation.message),
            Some(
                "the following namespaces do not match the specified labels (tier=dev): [sandbox]"
                    .to_owned()
            )
        );
    }

    #[test]
    fn labels_are_skipped_without_constraints() {
        let spec = spec(Utc::now());
        assert!(check_namespace_labels(&spec, &BTreeSet::new()).is_ok());
    }

    #[test]
    fn missing_field_is_reported_by_name() {
        let mut spec = spec(Utc::now());
        spec.jira_fields.remove("Approver");

        assert_eq!(missing_custom_field(&spec, &snapshot(None)), Some("Approver"));
        assert!(matches!(
            check_custom_fields(&spec, &snapshot(None)),
            Err(violation) if violation.message == "missing custom field: Approver"
        ));
    }
}
