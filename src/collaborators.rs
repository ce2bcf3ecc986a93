// src/collaborators.rs
//! Boundary traits for everything the session talks to.
//!
//! Implementations are injected when a session is created; nothing here is a
//! process-wide singleton. Async operations return boxed futures so the traits
//! stay object safe and the reducer can hand the futures to the runtime.

use futures::future::BoxFuture;
use std::sync::Arc;

use crate::error::CollaboratorError;
use crate::models::{AccountHandle, CallDetailRecord, CallLogUri, CallMethodId, PluginInfo};

pub type CollabResult<T> = Result<T, CollaboratorError>;

/// Reads and deletes call-log rows.
pub trait RecordFetcher: Send + Sync {
    /// Records for the given references, most recent first.
    fn fetch_details(&self, references: Vec<CallLogUri>) -> BoxFuture<'static, CollabResult<Vec<CallDetailRecord>>>;

    fn delete_records(&self, ids: Vec<i64>) -> BoxFuture<'static, CollabResult<()>>;

    fn delete_voicemail(&self, voicemail: String) -> BoxFuture<'static, CollabResult<()>>;
}

/// Calling-plugin registry. Contents may change between lookups.
pub trait PluginRegistry: Send + Sync {
    fn lookup(&self, id: CallMethodId) -> BoxFuture<'static, CollabResult<Option<PluginInfo>>>;

    /// Called once when a session starts using the registry.
    fn acquire(&self) {}

    /// Called once when that session ends.
    fn release(&self) {}
}

pub trait Accounts: Send + Sync {
    fn account_label(&self, handle: Option<&AccountHandle>) -> Option<String>;

    fn is_voicemail_number(&self, handle: Option<&AccountHandle>, number: Option<&str>) -> bool;
}

/// Contact directory and the lookup provider behind it.
pub trait ContactInfo: Send + Sync {
    fn can_report_as_invalid(&self, source_type: i32, object_id: Option<&str>) -> bool;

    fn is_business(&self, source_type: i32) -> bool;

    fn acquire(&self) {}

    fn release(&self) {}
}

pub trait BlockList: Send + Sync {
    fn is_block_eligible(&self, number: &str) -> bool;

    fn is_blocked(&self, number: &str) -> bool;

    fn set_blocked(&self, number: String, blocked: bool, notify_provider: bool) -> BoxFuture<'static, CollabResult<()>>;
}

/// The set of collaborators one session is created with.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn RecordFetcher>,
    pub plugins: Arc<dyn PluginRegistry>,
    pub accounts: Arc<dyn Accounts>,
    pub contacts: Arc<dyn ContactInfo>,
    pub block_list: Arc<dyn BlockList>,
}

impl Collaborators {
    /// Uses one value for every role.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: RecordFetcher + PluginRegistry + Accounts + ContactInfo + BlockList + 'static,
    {
        Self {
            fetcher: backend.clone(),
            plugins: backend.clone(),
            accounts: backend.clone(),
            contacts: backend.clone(),
            block_list: backend,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
