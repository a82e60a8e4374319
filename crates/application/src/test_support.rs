use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use jitgate_core::{AppError, AppResult};
use jitgate_domain::{
    ConfigDocument, JitRequest, JitRequestSpec, JitRequestStatus, LifecycleEvent, RoleGrant,
    TicketDraft,
};
use tokio::sync::Mutex;

use crate::{
    Clock, ConfigSnapshotStore, EventSink, GrantManager, GrantStore, LifecycleDependencies,
    LifecycleEngine, NamespaceDirectory, PolicyValidator, RequestStore, RetryPolicy, StatusStore,
    TicketGateway,
};

pub(crate) fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 15, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

pub(crate) fn sample_request(name: &str, now: DateTime<Utc>) -> JitRequest {
    JitRequest {
        name: name.to_owned(),
        uid: format!("uid-{name}"),
        resource_version: Some("1".to_owned()),
        spec: JitRequestSpec {
            reporter: "dev@example.com".to_owned(),
            additional_user_emails: Vec::new(),
            cluster_role: "edit".to_owned(),
            namespaces: vec!["team-a".to_owned(), "team-b".to_owned()],
            namespace_labels: BTreeMap::new(),
            start_time: now + TimeDelta::seconds(10),
            end_time: now + TimeDelta::seconds(20),
            jira_fields: BTreeMap::from([
                ("Approver".to_owned(), "lead@example.com".to_owned()),
                ("ProductOwner".to_owned(), "owner@example.com".to_owned()),
                ("Justification".to_owned(), "incident 42".to_owned()),
            ]),
        },
        status: JitRequestStatus::default(),
    }
}

#[derive(Default)]
pub(crate) struct FakeRequestStore {
    pub(crate) requests: Mutex<BTreeMap<String, JitRequest>>,
    pub(crate) injected_conflicts: Mutex<u32>,
    pub(crate) status_writes: Mutex<u32>,
    pub(crate) fail_get: Mutex<bool>,
}

impl FakeRequestStore {
    pub(crate) async fn insert(&self, request: JitRequest) {
        self.requests
            .lock()
            .await
            .insert(request.name.clone(), request);
    }

    pub(crate) async fn get(&self, name: &str) -> Option<JitRequest> {
        self.requests.lock().await.get(name).cloned()
    }
}

fn bump(version: Option<&String>) -> Option<String> {
    let next = version
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or_default()
        + 1;
    Some(next.to_string())
}

#[async_trait]
impl RequestStore for FakeRequestStore {
    async fn list_requests(&self) -> AppResult<Vec<JitRequest>> {
        Ok(self.requests.lock().await.values().cloned().collect())
    }

    async fn get_request(&self, name: &str) -> AppResult<JitRequest> {
        if *self.fail_get.lock().await {
            return Err(AppError::ExternalService {
                status: Some(500),
                message: "store unavailable".to_owned(),
            });
        }

        self.get(name)
            .await
            .ok_or_else(|| AppError::NotFound(format!("request '{name}' not found")))
    }

    async fn replace_status(&self, request: &JitRequest) -> AppResult<JitRequest> {
        let mut requests = self.requests.lock().await;
        let Some(stored) = requests.get_mut(request.name.as_str()) else {
            return Err(AppError::NotFound(format!(
                "request '{}' not found",
                request.name
            )));
        };

        let mut injected = self.injected_conflicts.lock().await;
        if *injected > 0 {
            *injected -= 1;
            stored.resource_version = bump(stored.resource_version.as_ref());
            return Err(AppError::Conflict("object has been modified".to_owned()));
        }

        if stored.resource_version != request.resource_version {
            return Err(AppError::Conflict("stale resource version".to_owned()));
        }

        stored.status = request.status.clone();
        stored.resource_version = bump(stored.resource_version.as_ref());
        *self.status_writes.lock().await += 1;
        Ok(stored.clone())
    }

    async fn delete_request(&self, name: &str) -> AppResult<()> {
        self.requests
            .lock()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("request '{name}' not found")))
    }
}

#[derive(Default)]
pub(crate) struct FakeGrantStore {
    pub(crate) grants: Mutex<BTreeMap<(String, String), RoleGrant>>,
    pub(crate) fail_create: Mutex<bool>,
}

impl FakeGrantStore {
    pub(crate) async fn namespaces(&self) -> Vec<String> {
        self.grants
            .lock()
            .await
            .keys()
            .map(|(namespace, _)| namespace.clone())
            .collect()
    }
}

#[async_trait]
impl GrantStore for FakeGrantStore {
    async fn create_grant(&self, grant: &RoleGrant) -> AppResult<()> {
        if *self.fail_create.lock().await {
            return Err(AppError::ExternalService {
                status: Some(403),
                message: "forbidden".to_owned(),
            });
        }

        let key = (grant.namespace.clone(), grant.name.clone());
        let mut grants = self.grants.lock().await;
        if grants.contains_key(&key) {
            return Err(AppError::AlreadyExists(format!(
                "grant '{}' already exists",
                grant.name
            )));
        }
        grants.insert(key, grant.clone());
        Ok(())
    }

    async fn list_grants(&self, namespace: &str) -> AppResult<Vec<RoleGrant>> {
        Ok(self
            .grants
            .lock()
            .await
            .iter()
            .filter(|((stored_namespace, _), _)| stored_namespace == namespace)
            .map(|(_, grant)| grant.clone())
            .collect())
    }

    async fn delete_grant(&self, namespace: &str, name: &str) -> AppResult<()> {
        self.grants
            .lock()
            .await
            .remove(&(namespace.to_owned(), name.to_owned()))
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("grant '{name}' not found")))
    }
}

#[derive(Default)]
pub(crate) struct FakeNamespaceDirectory {
    pub(crate) namespaces: BTreeMap<String, BTreeMap<String, String>>,
}

#[async_trait]
impl NamespaceDirectory for FakeNamespaceDirectory {
    async fn list_namespaces_by_labels(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> AppResult<BTreeSet<String>> {
        Ok(self
            .namespaces
            .iter()
            .filter(|(_, namespace_labels)| {
                labels
                    .iter()
                    .all(|(key, value)| namespace_labels.get(key) == Some(value))
            })
            .map(|(name, _)| name.clone())
            .collect())
    }
}

pub(crate) struct FakeTicketGateway {
    pub(crate) accounts: Mutex<BTreeMap<String, String>>,
    pub(crate) created: Mutex<Vec<TicketDraft>>,
    pub(crate) comments: Mutex<Vec<(String, String)>>,
    pub(crate) transitions: Mutex<Vec<(String, String)>>,
    pub(crate) status: Mutex<String>,
    pub(crate) fail_transition: Mutex<bool>,
    pub(crate) ticket_missing: Mutex<bool>,
}

impl FakeTicketGateway {
    async fn ensure_present(&self, ticket_key: &str) -> AppResult<()> {
        if *self.ticket_missing.lock().await {
            return Err(AppError::NotFound(format!("issue {ticket_key}")));
        }
        Ok(())
    }
}

impl Default for FakeTicketGateway {
    fn default() -> Self {
        let accounts = [
            ("dev@example.com", "dev"),
            ("lead@example.com", "lead"),
            ("owner@example.com", "owner"),
        ]
        .into_iter()
        .map(|(handle, account)| (handle.to_owned(), account.to_owned()))
        .collect();

        Self {
            accounts: Mutex::new(accounts),
            created: Mutex::new(Vec::new()),
            comments: Mutex::new(Vec::new()),
            transitions: Mutex::new(Vec::new()),
            status: Mutex::new("To Do".to_owned()),
            fail_transition: Mutex::new(false),
            ticket_missing: Mutex::new(false),
        }
    }
}

#[async_trait]
impl TicketGateway for FakeTicketGateway {
    async fn create_ticket(&self, draft: &TicketDraft) -> AppResult<String> {
        let mut created = self.created.lock().await;
        created.push(draft.clone());
        Ok(format!("IAM-{}", created.len()))
    }

    async fn add_comment(&self, ticket_key: &str, body: &str) -> AppResult<()> {
        self.ensure_present(ticket_key).await?;
        self.comments
            .lock()
            .await
            .push((ticket_key.to_owned(), body.to_owned()));
        Ok(())
    }

    async fn transition(&self, ticket_key: &str, transition_id: &str) -> AppResult<()> {
        self.ensure_present(ticket_key).await?;
        if *self.fail_transition.lock().await {
            return Err(AppError::ExternalService {
                status: Some(502),
                message: "tracker unavailable".to_owned(),
            });
        }

        self.transitions
            .lock()
            .await
            .push((ticket_key.to_owned(), transition_id.to_owned()));
        Ok(())
    }

    async fn ticket_status(&self, ticket_key: &str) -> AppResult<String> {
        self.ensure_present(ticket_key).await?;
        Ok(self.status.lock().await.clone())
    }

    async fn resolve_account(&self, handle: &str) -> AppResult<String> {
        self.accounts
            .lock()
            .await
            .get(handle)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("user '{handle}' not found")))
    }
}

#[derive(Default)]
pub(crate) struct FakeEventSink {
    pub(crate) events: Mutex<Vec<LifecycleEvent>>,
}

#[async_trait]
impl EventSink for FakeEventSink {
    async fn record(&self, event: LifecycleEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

pub(crate) struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(now.timestamp_millis()),
        }
    }

    pub(crate) fn advance(&self, seconds: i64) {
        self.millis.fetch_add(seconds * 1000, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis.load(Ordering::SeqCst))
            .single()
            .unwrap_or_default()
    }
}

pub(crate) struct Harness {
    pub(crate) requests: Arc<FakeRequestStore>,
    pub(crate) grants: Arc<FakeGrantStore>,
    pub(crate) tickets: Arc<FakeTicketGateway>,
    pub(crate) events: Arc<FakeEventSink>,
    pub(crate) namespaces: Arc<FakeNamespaceDirectory>,
    pub(crate) clock: Arc<FixedClock>,
    pub(crate) config: ConfigSnapshotStore,
}

impl Harness {
    pub(crate) async fn new(now: DateTime<Utc>) -> Self {
        Self::with_document(now, ConfigDocument::builtin_default()).await
    }

    pub(crate) async fn with_document(now: DateTime<Utc>, document: ConfigDocument) -> Self {
        let config = ConfigSnapshotStore::new();
        if let Err(error) = config.replace(document).await {
            panic!("invalid test configuration: {error}");
        }

        Self {
            requests: Arc::new(FakeRequestStore::default()),
            grants: Arc::new(FakeGrantStore::default()),
            tickets: Arc::new(FakeTicketGateway::default()),
            events: Arc::new(FakeEventSink::default()),
            namespaces: Arc::new(FakeNamespaceDirectory::default()),
            clock: Arc::new(FixedClock::new(now)),
            config,
        }
    }

    pub(crate) fn status_store(&self) -> StatusStore {
        StatusStore::new(self.requests.clone(), RetryPolicy::new(3, std::time::Duration::ZERO))
    }

    pub(crate) fn engine(&self) -> LifecycleEngine {
        LifecycleEngine::new(LifecycleDependencies {
            requests: self.requests.clone(),
            status_store: self.status_store(),
            grant_manager: GrantManager::new(self.grants.clone()),
            validator: PolicyValidator::new(self.namespaces.clone()),
            tickets: self.tickets.clone(),
            events: self.events.clone(),
            config: self.config.clone(),
            clock: self.clock.clone(),
        })
    }
}
