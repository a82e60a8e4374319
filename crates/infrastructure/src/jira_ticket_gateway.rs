use std::time::Duration;

use async_trait::async_trait;
use jitgate_application::TicketGateway;
use jitgate_core::{AppError, AppResult};
use jitgate_domain::TicketDraft;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;
use url::Url;

use crate::http_support::{
    check_response, decode_json, join, join_segments, normalize_base_url, transport_error,
};


/// Ticket gateway over a Jira-compatible REST API (v2).
pub struct JiraTicketGateway {
    http_client: reqwest::Client,
    base_url: Url,
    username: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

#[derive(Debug, Deserialize)]
struct IssueStatusEnvelope {
    fields: IssueStatusFields,
}

#[derive(Debug, Deserialize)]
struct IssueStatusFields {
    status: NamedValue,
}

#[derive(Debug, Deserialize)]
struct NamedValue {
    name: String,
}

impl JiraTicketGateway {
    /// Creates a gateway with basic authentication.
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                AppError::Internal(format!("failed to build Jira HTTP client: {error}"))
            })?;

        Ok(Self {
            http_client,
            base_url: normalize_base_url(base_url, "JIRA_BASE_URL")?,
            username: username.into(),
            api_token: api_token.into(),
        })
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, url)
            .basic_auth(self.username.as_str(), Some(self.api_token.as_str()))
            .header("Accept", "application/json")
    }

    fn issue_payload(draft: &TicketDraft) -> Value {
        let mut fields = Map::new();
        fields.insert("project".to_owned(), json!({ "key": draft.project }));
        fields.insert("issuetype".to_owned(), json!({ "name": draft.issue_type }));
        fields.insert("summary".to_owned(), json!(draft.summary));
        fields.insert("reporter".to_owned(), json!({ "name": draft.reporter_account }));
        fields.insert("labels".to_owned(), json!(draft.labels));
        for field in &draft.fields {
            fields.insert(field.field_id.clone(), field.encode());
        }

        json!({ "fields": fields })
    }
}

#[async_trait]
impl TicketGateway for JiraTicketGateway {
    async fn create_ticket(&self, draft: &TicketDraft) -> AppResult<String> {
        let context = "Jira issue create failed";
        let url = join(&self.base_url, "rest/api/2/issue")?;
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&Self::issue_payload(draft))
            .send()
            .await
            .map_err(|error| transport_error(context, error))?;
        let response = check_response(response, context).await?;
        let created: CreatedIssue = decode_json(response, context).await?;

        debug!(ticket = %created.key, project = %draft.project, "Jira issue created");
        Ok(created.key)
    }

    async fn add_comment(&self, ticket_key: &str, body: &str) -> AppResult<()> {
        let context = format!("Jira comment on '{ticket_key}' failed");
        let url = join_segments(
            &self.base_url,
            &["rest", "api", "2", "issue", ticket_key, "comment"],
        )?;
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&json!({ "body": body }))
            .send()
            .await
            .map_err(|error| transport_error(context.as_str(), error))?;
        check_response(response, context.as_str()).await?;
        Ok(())
    }

    async fn transition(&self, ticket_key: &str, transition_id: &str) -> AppResult<()> {
        let context = format!("Jira transition '{transition_id}' on '{ticket_key}' failed");
        let url = join_segments(
            &self.base_url,
            &["rest", "api", "2", "issue", ticket_key, "transitions"],
        )?;
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&json!({ "transition": { "id": transition_id } }))
            .send()
            .await
            .map_err(|error| transport_error(context.as_str(), error))?;
        check_response(response, context.as_str()).await?;

        debug!(ticket = %ticket_key, transition = %transition_id, "Jira issue transitioned");
        Ok(())
    }

    async fn ticket_status(&self, ticket_key: &str) -> AppResult<String> {
        let context = format!("Jira issue '{ticket_key}' lookup failed");
        let mut url = join_segments(&self.base_url, &["rest", "api", "2", "issue", ticket_key])?;
        url.query_pairs_mut().append_pair("fields", "status");
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|error| transport_error(context.as_str(), error))?;
        let response = check_response(response, context.as_str()).await?;
        let envelope: IssueStatusEnvelope = decode_json(response, context.as_str()).await?;

        Ok(envelope.fields.status.name)
    }

    async fn resolve_account(&self, handle: &str) -> AppResult<String> {
        let context = format!("Jira user search for '{handle}' failed");
        let mut url = join(&self.base_url, "rest/api/2/user/search")?;
        url.query_pairs_mut().append_pair("username", handle);
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|error| transport_error(context.as_str(), error))?;
        let response = check_response(response, context.as_str()).await?;
        let users: Vec<NamedValue> = decode_json(response, context.as_str()).await?;

        users
            .into_iter()
            .next()
            .map(|user| user.name)
            .ok_or_else(|| AppError::NotFound(format!("no Jira user matches '{handle}'")))
    }
}
