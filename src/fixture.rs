// src/fixture.rs
//! In-memory collaborators backed by a JSON fixture.
//!
//! Used by the `call-detail` binary to run a session without a device, and by
//! tests to script collaborator answers.

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

use crate::collaborators::{Accounts, BlockList, CollabResult, ContactInfo, PluginRegistry, RecordFetcher};
use crate::error::{CollaboratorError, ConfigError};
use crate::models::{AccountHandle, CallDetailRecord, CallLogUri, CallMethodId, PluginInfo};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureRow {
    pub id: i64,
    #[serde(flatten)]
    pub record: CallDetailRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureAccount {
    pub handle: AccountHandle,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub voicemail_number: Option<String>,
}

/// Collaborator calls that should fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Failures {
    pub fetch: bool,
    pub delete: bool,
    pub block: bool,
    pub plugins: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub rows: Vec<FixtureRow>,
    pub voicemails: Vec<String>,
    pub plugins: Vec<PluginInfo>,
    pub accounts: Vec<FixtureAccount>,
    pub reportable_source_types: Vec<i32>,
    pub business_source_types: Vec<i32>,
    pub blocked: Vec<String>,
    /// Numbers the block action is never offered for.
    pub unblockable: Vec<String>,
    pub latency_ms: u64,
    pub failures: Failures,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Default)]
struct State {
    rows: BTreeMap<i64, CallDetailRecord>,
    voicemails: Vec<String>,
    plugins: BTreeMap<CallMethodId, PluginInfo>,
    blocked: Vec<String>,
    failures: Failures,
    block_calls: Vec<(String, bool, bool)>,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    accounts: Vec<FixtureAccount>,
    reportable_source_types: Vec<i32>,
    business_source_types: Vec<i32>,
    unblockable: Vec<String>,
    latency: Duration,
    leases: AtomicIsize,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct FixtureBackend {
    inner: Arc<Inner>,
}

impl FixtureBackend {
    pub fn new(fixture: Fixture) -> Self {
        let state = State {
            rows: fixture.rows.into_iter().map(|row| (row.id, row.record)).collect(),
            voicemails: fixture.voicemails,
            plugins: fixture.plugins.into_iter().map(|p| (p.id.clone(), p)).collect(),
            blocked: fixture.blocked,
            failures: fixture.failures,
            block_calls: Vec::new(),
        };
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                accounts: fixture.accounts,
                reportable_source_types: fixture.reportable_source_types,
                business_source_types: fixture.business_source_types,
                unblockable: fixture.unblockable,
                latency: Duration::from_millis(fixture.latency_ms),
                leases: AtomicIsize::new(0),
            }),
        }
    }

    pub fn set_failures(&self, failures: Failures) {
        self.inner.lock().failures = failures;
    }

    pub fn remove_plugin(&self, id: &CallMethodId) {
        self.inner.lock().plugins.remove(id);
    }

    pub fn row_ids(&self) -> Vec<i64> {
        self.inner.lock().rows.keys().copied().collect()
    }

    pub fn voicemails(&self) -> Vec<String> {
        self.inner.lock().voicemails.clone()
    }

    /// Every `set_blocked` call so far: (number, blocked, notify_provider).
    pub fn block_calls(&self) -> Vec<(String, bool, bool)> {
        self.inner.lock().block_calls.clone()
    }

    /// Registry and contact-info leases currently held.
    pub fn active_leases(&self) -> isize {
        self.inner.leases.load(Ordering::SeqCst)
    }

    fn account(&self, handle: Option<&AccountHandle>) -> Option<&FixtureAccount> {
        let handle = handle?;
        self.inner.accounts.iter().find(|a| &a.handle == handle)
    }
}

impl RecordFetcher for FixtureBackend {
    fn fetch_details(&self, references: Vec<CallLogUri>) -> BoxFuture<'static, CollabResult<Vec<CallDetailRecord>>> {
        let inner = self.inner.clone();
        async move {
            inner.delay().await;
            let state = inner.lock();
            if state.failures.fetch {
                return Err(CollaboratorError::Unavailable("call log".into()));
            }
            let records: Vec<CallDetailRecord> = references
                .iter()
                .filter_map(|uri| uri.id().and_then(|id| state.rows.get(&id)).cloned())
                .collect();
            debug!(requested = references.len(), found = records.len(), "fixture fetch");
            Ok(records)
        }
        .boxed()
    }

    fn delete_records(&self, ids: Vec<i64>) -> BoxFuture<'static, CollabResult<()>> {
        let inner = self.inner.clone();
        async move {
            inner.delay().await;
            let mut state = inner.lock();
            if state.failures.delete {
                return Err(CollaboratorError::Rejected("call log is read-only".into()));
            }
            for id in ids {
                state.rows.remove(&id);
            }
            Ok(())
        }
        .boxed()
    }

    fn delete_voicemail(&self, voicemail: String) -> BoxFuture<'static, CollabResult<()>> {
        let inner = self.inner.clone();
        async move {
            inner.delay().await;
            let mut state = inner.lock();
            if state.failures.delete {
                return Err(CollaboratorError::Rejected("voicemail store is read-only".into()));
            }
            let before = state.voicemails.len();
            state.voicemails.retain(|v| v != &voicemail);
            if state.voicemails.len() == before {
                return Err(CollaboratorError::NotFound(voicemail));
            }
            Ok(())
        }
        .boxed()
    }
}

impl PluginRegistry for FixtureBackend {
    fn lookup(&self, id: CallMethodId) -> BoxFuture<'static, CollabResult<Option<PluginInfo>>> {
        let inner = self.inner.clone();
        async move {
            inner.delay().await;
            let state = inner.lock();
            if state.failures.plugins {
                return Err(CollaboratorError::Unavailable("plugin registry".into()));
            }
            Ok(state.plugins.get(&id).cloned())
        }
        .boxed()
    }

    fn acquire(&self) {
        self.inner.leases.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.inner.leases.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Accounts for FixtureBackend {
    fn account_label(&self, handle: Option<&AccountHandle>) -> Option<String> {
        self.account(handle).and_then(|a| a.label.clone())
    }

    fn is_voicemail_number(&self, handle: Option<&AccountHandle>, number: Option<&str>) -> bool {
        match (self.account(handle), number) {
            (Some(account), Some(number)) => account.voicemail_number.as_deref() == Some(number),
            _ => false,
        }
    }
}

impl ContactInfo for FixtureBackend {
    fn can_report_as_invalid(&self, source_type: i32, object_id: Option<&str>) -> bool {
        object_id.is_some_and(|id| !id.is_empty()) && self.inner.reportable_source_types.contains(&source_type)
    }

    fn is_business(&self, source_type: i32) -> bool {
        self.inner.business_source_types.contains(&source_type)
    }

    fn acquire(&self) {
        self.inner.leases.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.inner.leases.fetch_sub(1, Ordering::SeqCst);
    }
}

impl BlockList for FixtureBackend {
    fn is_block_eligible(&self, number: &str) -> bool {
        !number.is_empty() && !self.inner.unblockable.iter().any(|n| n == number)
    }

    fn is_blocked(&self, number: &str) -> bool {
        self.inner.lock().blocked.iter().any(|n| n == number)
    }

    fn set_blocked(&self, number: String, blocked: bool, notify_provider: bool) -> BoxFuture<'static, CollabResult<()>> {
        let inner = self.inner.clone();
        async move {
            inner.delay().await;
            let mut state = inner.lock();
            state.block_calls.push((number.clone(), blocked, notify_provider));
            if state.failures.block {
                return Err(CollaboratorError::Rejected("block list unavailable".into()));
            }
            state.blocked.retain(|n| n != &number);
            if blocked {
                state.blocked.push(number);
            }
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NumberPresentation;
    use futures::executor::block_on;
    use std::io::Write;

    const JSON: &str = r#"{
        "rows": [
            {"id": 1, "number": "4085551212", "display_number": "(408) 555-1212", "geocode": "San Jose, CA"},
            {"id": 2, "number": "4085551212", "display_number": "(408) 555-1212", "presentation": 2}
        ],
        "plugins": [{"id": "com.acme/.Calls", "name": "Acme Calls"}],
        "accounts": [{"handle": {"component": "tel", "id": "1"}, "label": "SIM 1", "voicemail_number": "*86"}],
        "blocked": ["4085551212"],
        "unblockable": ["911"]
    }"#;

    #[test]
    fn loads_json_fixture_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(JSON.as_bytes()).unwrap();
        let fixture = Fixture::load(file.path()).unwrap();
        assert_eq!(fixture.rows.len(), 2);
        assert_eq!(fixture.rows[0].record.geocode.as_deref(), Some("San Jose, CA"));
        assert_eq!(fixture.rows[1].record.presentation, NumberPresentation::Restricted);
        assert_eq!(fixture.latency_ms, 0);
    }

    #[test]
    fn bad_json_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ nope").unwrap();
        assert!(matches!(Fixture::load(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn fetch_keeps_reference_order_and_skips_missing_rows() {
        let backend = FixtureBackend::new(serde_json::from_str(JSON).unwrap());
        let refs = vec![
            CallLogUri("content://call_log/calls/2".into()),
            CallLogUri("content://call_log/calls/9".into()),
            CallLogUri("content://call_log/calls/1".into()),
        ];
        let records = block_on(backend.fetch_details(refs)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].geocode, None);
        assert_eq!(records[1].geocode.as_deref(), Some("San Jose, CA"));
    }

    #[test]
    fn block_and_account_answers() {
        let backend = FixtureBackend::new(serde_json::from_str(JSON).unwrap());
        assert!(backend.is_blocked("4085551212"));
        assert!(!backend.is_block_eligible("911"));
        block_on(backend.set_blocked("4085551212".into(), false, true)).unwrap();
        assert!(!backend.is_blocked("4085551212"));
        assert_eq!(backend.block_calls(), vec![("4085551212".to_string(), false, true)]);

        let handle = AccountHandle {
            component: "tel".into(),
            id: "1".into(),
        };
        assert_eq!(backend.account_label(Some(&handle)).as_deref(), Some("SIM 1"));
        assert!(backend.is_voicemail_number(Some(&handle), Some("*86")));
        assert!(!backend.is_voicemail_number(None, Some("*86")));
    }
}
