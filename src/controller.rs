// src/controller.rs
//! Call detail session reducer.
//!
//! `DetailController::update` is the only place session state changes. User
//! commands and async results both arrive as [`DetailMessage`]s; background
//! work leaves as a [`Task`] for the runtime to spawn. Renderer-facing output
//! is queued as [`SessionEvent`]s and drained with `take_events`.
//!
//! Staleness rules:
//! - fetch and attribution results carry the fetch generation and are
//!   dropped unless it is still current;
//! - block toggles resolve last-issued-wins (see [`BlockTracker`]);
//! - nothing is applied once the session is `Closed`.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::aggregator::DetailAggregator;
use crate::attribution::AttributionResolver;
use crate::block::{BlockOperation, BlockTracker, ContactBlockState, ToggleOutcome};
use crate::collaborators::{CollabResult, Collaborators};
use crate::config::DetailConfig;
use crate::error::{DetailError, Notice};
use crate::menu::MenuState;
use crate::messages::DetailMessage;
use crate::models::{
    Attribution, CallDetailRecord, CallLogUri, CallMethodId, PresentationState, SessionPhase, ViewModel,
};
use crate::reference::{resolve_references, row_ids, SessionInput};
use crate::task::Task;

/// Something the renderer or host has to carry out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Launch {
    CloseSystemDialogs,
    /// Call back; `via` names the plugin when the call is attributed.
    PlaceCall {
        number: String,
        via: Option<CallMethodId>,
    },
    EditBeforeCall { number: String },
    ConfirmBlock {
        operation: BlockOperation,
        notify_provider: bool,
    },
    ReportInvalid {
        source_type: i32,
        object_id: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    NoReferences,
    FetchFailed,
    CallsDeleted,
    VoicemailDeleted,
    Dismissed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    View(ViewModel),
    Notice(Notice),
    Launch(Launch),
    Closed(CloseReason),
}

pub struct DetailController {
    config: Arc<DetailConfig>,
    deps: Collaborators,
    resolver: AttributionResolver,
    input: SessionInput,
    references: Vec<CallLogUri>,
    phase: SessionPhase,
    generation: u64,
    /// Records of the current generation waiting for attribution.
    pending: Option<Arc<[CallDetailRecord]>>,
    presentation: Option<Arc<PresentationState>>,
    attribution: Attribution,
    block: BlockTracker,
    menu: MenuState,
    released: bool,
    events: Vec<SessionEvent>,
}

impl DetailController {
    /// Creates the session and acquires the session-scoped collaborators.
    pub fn new(config: Arc<DetailConfig>, deps: Collaborators, input: SessionInput) -> Self {
        deps.plugins.acquire();
        deps.contacts.acquire();

        let references = resolve_references(&input, &config.call_log_uri);
        let menu = MenuState::compute(None, input.has_voicemail(), false, ContactBlockState::Unknown);
        Self {
            resolver: AttributionResolver::new(deps.plugins.clone()),
            config,
            deps,
            input,
            references,
            phase: SessionPhase::Idle,
            generation: 0,
            pending: None,
            presentation: None,
            attribution: Attribution::Unattributed,
            block: BlockTracker::default(),
            menu,
            released: false,
            events: Vec::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn references(&self) -> &[CallLogUri] {
        &self.references
    }

    pub fn presentation(&self) -> Option<&Arc<PresentationState>> {
        self.presentation.as_ref()
    }

    pub fn menu(&self) -> &MenuState {
        &self.menu
    }

    pub fn block_state(&self) -> ContactBlockState {
        self.block.state()
    }

    pub fn view_model(&self) -> ViewModel {
        ViewModel {
            phase: self.phase,
            presentation: self.presentation.clone(),
            attribution: self.attribution.clone(),
            block_state: self.block.state(),
            menu: self.menu.clone(),
        }
    }

    /// Output queued since the last call.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn update(&mut self, message: DetailMessage) -> Task<DetailMessage> {
        if self.is_closed() {
            debug!(?message, "session closed, dropping message");
            return Task::none();
        }

        match message {
            DetailMessage::Start => return self.start(),
            DetailMessage::Refresh => return self.fetch(),
            DetailMessage::Close => self.close(CloseReason::Dismissed),

            DetailMessage::CallBack => self.call_back(),
            DetailMessage::EditNumberBeforeCall => self.edit_before_call(),
            DetailMessage::RemoveFromLog => return self.remove_from_log(),
            DetailMessage::DeleteVoicemail => return self.delete_voicemail(),
            DetailMessage::ReportAsInvalid => self.report_as_invalid(),
            DetailMessage::RequestBlockToggle => self.request_block_toggle(),
            DetailMessage::BlockSelected { notify_provider } => {
                return self.toggle_block(BlockOperation::Block, notify_provider);
            }
            DetailMessage::UnblockSelected { notify_provider } => {
                return self.toggle_block(BlockOperation::Unblock, notify_provider);
            }

            DetailMessage::DetailsLoaded { generation, result } => {
                return self.on_details_loaded(generation, result);
            }
            DetailMessage::AttributionResolved { generation, attribution } => {
                self.on_attribution_resolved(generation, attribution);
            }
            DetailMessage::BlockToggled { ticket, result } => {
                let before = self.block.state();
                match self.block.complete(&ticket, result) {
                    ToggleOutcome::Applied(state) => {
                        info!(?state, "block state changed");
                        self.publish();
                    }
                    ToggleOutcome::Superseded => {}
                    ToggleOutcome::Failed(e) => {
                        self.report(e);
                        if self.block.state() != before {
                            self.publish();
                        }
                    }
                }
            }
            DetailMessage::CallsDeleted(result) => self.on_deleted(result, CloseReason::CallsDeleted),
            DetailMessage::VoicemailDeleted(result) => self.on_deleted(result, CloseReason::VoicemailDeleted),
        }
        Task::none()
    }

    fn start(&mut self) -> Task<DetailMessage> {
        if self.phase != SessionPhase::Idle {
            debug!(phase = ?self.phase, "session already started");
            return Task::none();
        }
        if self.input.from_notification {
            self.events.push(SessionEvent::Launch(Launch::CloseSystemDialogs));
        }
        if self.references.is_empty() {
            self.fail(DetailError::NoReferences);
            return Task::none();
        }
        self.fetch()
    }

    /// Starts a fetch that supersedes any fetch still in flight.
    fn fetch(&mut self) -> Task<DetailMessage> {
        if self.references.is_empty() {
            return Task::none();
        }
        self.generation += 1;
        self.pending = None;
        self.phase = SessionPhase::Fetching;

        let generation = self.generation;
        debug!(generation, references = self.references.len(), "fetching call details");
        Task::perform(
            self.deps.fetcher.fetch_details(self.references.clone()),
            move |result| DetailMessage::DetailsLoaded { generation, result },
        )
    }

    fn on_details_loaded(
        &mut self,
        generation: u64,
        result: CollabResult<Vec<CallDetailRecord>>,
    ) -> Task<DetailMessage> {
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding stale fetch result");
            return Task::none();
        }

        let records = match result {
            Ok(records) if !records.is_empty() => records,
            Ok(_) => {
                self.fail(DetailError::FetchFailure("fetch returned no records".into()));
                return Task::none();
            }
            Err(e) => {
                self.fail(DetailError::FetchFailure(e.to_string()));
                return Task::none();
            }
        };

        self.phase = SessionPhase::Ready;
        let records: Arc<[CallDetailRecord]> = records.into();
        let Some(call_method) = records[0].call_method.clone() else {
            self.apply(records, Attribution::Unattributed);
            return Task::none();
        };

        self.pending = Some(records);
        Task::perform(self.resolver.resolve(Some(call_method)), move |attribution| {
            DetailMessage::AttributionResolved { generation, attribution }
        })
    }

    fn on_attribution_resolved(&mut self, generation: u64, attribution: Attribution) {
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding stale attribution");
            return;
        }
        match self.pending.take() {
            Some(records) => self.apply(records, attribution),
            None => debug!(generation, "attribution arrived with no pending records"),
        }
    }

    /// Replaces the snapshot with one derived from `records`.
    fn apply(&mut self, records: Arc<[CallDetailRecord]>, attribution: Attribution) {
        let result = DetailAggregator::new(self.deps.accounts.as_ref(), self.deps.contacts.as_ref())
            .aggregate(records, &attribution);
        let state = match result {
            Ok(state) => state,
            Err(e) => return self.fail(e),
        };

        let number = state.number.as_deref();
        let (eligible, blocked) = match number {
            Some(n) => (self.deps.block_list.is_block_eligible(n), Some(self.deps.block_list.is_blocked(n))),
            None => (false, None),
        };
        self.block.observe(number, eligible, blocked);

        debug!(
            generation = self.generation,
            records = state.history.len(),
            callable = state.is_callable,
            attributed = state.attribution.plugin().is_some(),
            "call details ready"
        );
        self.attribution = state.attribution.clone();
        self.presentation = Some(Arc::new(state));
        self.publish();
    }

    /// Recomputes the menu and emits the view model.
    fn publish(&mut self) {
        self.menu = MenuState::compute(
            self.presentation.as_deref(),
            self.input.has_voicemail(),
            self.block.is_eligible(),
            self.block.state(),
        );
        self.events.push(SessionEvent::View(self.view_model()));
    }

    fn call_back(&mut self) {
        let Some(p) = self.presentation.as_deref() else {
            return self.refuse(DetailError::NotReady);
        };
        let (true, Some(number)) = (p.is_callable, p.number.clone()) else {
            return self.refuse(DetailError::NotEligible("number is not callable"));
        };
        let via = p.attribution.plugin().map(|info| info.id.clone());
        self.events.push(SessionEvent::Launch(Launch::PlaceCall { number, via }));
    }

    fn edit_before_call(&mut self) {
        let Some(p) = self.presentation.as_deref() else {
            return self.refuse(DetailError::NotReady);
        };
        let (true, Some(number)) = (p.can_edit_number_before_call, p.number.clone()) else {
            return self.refuse(DetailError::NotEligible("edit before call"));
        };
        self.events.push(SessionEvent::Launch(Launch::EditBeforeCall { number }));
    }

    fn report_as_invalid(&mut self) {
        let Some(p) = self.presentation.as_deref() else {
            return self.refuse(DetailError::NotReady);
        };
        if !p.can_report_as_invalid {
            return self.refuse(DetailError::NotEligible("report as invalid"));
        }
        let launch = Launch::ReportInvalid {
            source_type: p.source_type,
            object_id: p.object_id.clone(),
        };
        self.events.push(SessionEvent::Launch(launch));
    }

    fn remove_from_log(&mut self) -> Task<DetailMessage> {
        if !self.menu.remove_from_log {
            self.refuse(DetailError::NotEligible("remove from call log"));
            return Task::none();
        }
        let ids = row_ids(&self.references);
        if ids.is_empty() {
            self.report(DetailError::DeleteFailure("no row ids in references".into()));
            return Task::none();
        }
        info!(count = ids.len(), "removing calls from log");
        Task::perform(self.deps.fetcher.delete_records(ids), DetailMessage::CallsDeleted)
    }

    fn delete_voicemail(&mut self) -> Task<DetailMessage> {
        let Some(voicemail) = self.input.voicemail.clone() else {
            self.refuse(DetailError::NotEligible("no voicemail in this session"));
            return Task::none();
        };
        info!("deleting voicemail");
        Task::perform(self.deps.fetcher.delete_voicemail(voicemail), DetailMessage::VoicemailDeleted)
    }

    fn on_deleted(&mut self, result: CollabResult<()>, reason: CloseReason) {
        match result {
            Ok(()) => self.close(reason),
            Err(e) => self.report(DetailError::DeleteFailure(e.to_string())),
        }
    }

    fn request_block_toggle(&mut self) {
        if !self.block.is_eligible() {
            return self.refuse(DetailError::NotEligible("number cannot be blocked"));
        }
        self.events.push(SessionEvent::Launch(Launch::ConfirmBlock {
            operation: self.block.state().offered_operation(),
            notify_provider: self.config.notify_lookup_provider,
        }));
    }

    fn toggle_block(&mut self, operation: BlockOperation, notify_provider: bool) -> Task<DetailMessage> {
        let ticket = match self.block.begin(operation) {
            Ok(ticket) => ticket,
            Err(e) => {
                self.refuse(e);
                return Task::none();
            }
        };
        info!(%operation, seq = ticket.seq, notify_provider, "toggling block state");
        let blocked = operation == BlockOperation::Block;
        Task::perform(
            self.deps
                .block_list
                .set_blocked(ticket.number.clone(), blocked, notify_provider),
            move |result| DetailMessage::BlockToggled { ticket, result },
        )
    }

    /// Non-fatal error: log and show its notice, if any. Terminal errors
    /// close the session instead.
    fn report(&mut self, err: DetailError) {
        if err.is_terminal() {
            return self.fail(err);
        }
        warn!(error = %err, "action failed");
        if let Some(notice) = err.notice() {
            self.events.push(SessionEvent::Notice(notice));
        }
    }

    /// Command that is not available right now.
    fn refuse(&mut self, err: DetailError) {
        debug!(error = %err, "ignoring command");
    }

    /// Terminal failure: signal the error, then close.
    fn fail(&mut self, err: DetailError) {
        warn!(error = %err, "call detail session failed");
        self.phase = SessionPhase::Failed;
        self.pending = None;
        if let Some(notice) = err.notice() {
            self.events.push(SessionEvent::Notice(notice));
        }
        let reason = match err {
            DetailError::NoReferences => CloseReason::NoReferences,
            _ => CloseReason::FetchFailed,
        };
        self.close(reason);
    }

    fn close(&mut self, reason: CloseReason) {
        info!(?reason, "closing call detail session");
        self.phase = SessionPhase::Closed;
        self.pending = None;
        self.events.push(SessionEvent::Closed(reason));
        self.release();
    }

    /// Releases session-scoped collaborators. Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.deps.plugins.release();
        self.deps.contacts.release();
    }
}

impl Drop for DetailController {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for DetailController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailController")
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("references", &self.references.len())
            .field("block_state", &self.block.state())
            .finish_non_exhaustive()
    }
}
