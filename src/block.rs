// src/block.rs
//! Block state of the active number and bookkeeping for in-flight toggles.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CollaboratorError, DetailError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactBlockState {
    #[default]
    Unknown,
    Blocked,
    Unblocked,
}

impl ContactBlockState {
    pub fn from_blocked(blocked: bool) -> Self {
        if blocked {
            ContactBlockState::Blocked
        } else {
            ContactBlockState::Unblocked
        }
    }

    /// Operation the block menu item offers in this state.
    pub fn offered_operation(self) -> BlockOperation {
        match self {
            ContactBlockState::Blocked => BlockOperation::Unblock,
            ContactBlockState::Unknown | ContactBlockState::Unblocked => BlockOperation::Block,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockOperation {
    Block,
    Unblock,
}

impl BlockOperation {
    pub fn target(self) -> ContactBlockState {
        match self {
            BlockOperation::Block => ContactBlockState::Blocked,
            BlockOperation::Unblock => ContactBlockState::Unblocked,
        }
    }
}

impl std::fmt::Display for BlockOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockOperation::Block => write!(f, "block"),
            BlockOperation::Unblock => write!(f, "unblock"),
        }
    }
}

/// Issued toggle, carried through the async call and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleTicket {
    pub seq: u64,
    pub number: String,
    pub operation: BlockOperation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Applied(ContactBlockState),
    /// A newer toggle was issued after this one; its result decides.
    Superseded,
    Failed(DetailError),
}

/// Tracks the block state for the number currently on screen.
///
/// Toggles resolve last-issued-wins: only the completion of the most
/// recently issued toggle flips the shown state, and never before it
/// arrives. Successful older completions still move the confirmed state,
/// which is what a failed newest toggle falls back to.
#[derive(Debug, Clone, Default)]
pub struct BlockTracker {
    number: Option<String>,
    eligible: bool,
    state: ContactBlockState,
    /// Last state the block list confirmed for `number`.
    confirmed: ContactBlockState,
    issued: u64,
    /// `issued` when `number` was observed; older tickets are orphans.
    epoch: u64,
    /// Highest ticket whose success is reflected in `confirmed`.
    settled: u64,
    outstanding: usize,
}

impl BlockTracker {
    pub fn state(&self) -> ContactBlockState {
        self.state
    }

    pub fn is_eligible(&self) -> bool {
        self.eligible && self.number.is_some()
    }

    /// Points the tracker at the number from a new fetch. `blocked` is the
    /// block list's current answer. A different number drops the old state
    /// and orphans any toggles still in flight. The same number only
    /// refreshes when nothing is in flight.
    pub fn observe(&mut self, number: Option<&str>, eligible: bool, blocked: Option<bool>) {
        let known = blocked.map_or(ContactBlockState::Unknown, ContactBlockState::from_blocked);
        if self.number.as_deref() != number {
            self.number = number.map(str::to_string);
            self.epoch = self.issued;
            self.settled = self.issued;
            self.outstanding = 0;
            self.state = known;
            self.confirmed = known;
        } else if self.outstanding == 0 {
            self.state = known;
            self.confirmed = known;
        }
        self.eligible = eligible;
    }

    /// Issues a toggle for the current number.
    pub fn begin(&mut self, operation: BlockOperation) -> Result<ToggleTicket, DetailError> {
        let Some(number) = self.number.clone() else {
            return Err(DetailError::NotReady);
        };
        if !self.eligible {
            return Err(DetailError::NotEligible("number cannot be blocked"));
        }
        self.issued += 1;
        self.outstanding += 1;
        Ok(ToggleTicket {
            seq: self.issued,
            number,
            operation,
        })
    }

    /// Applies the completion of a previously issued toggle.
    pub fn complete(&mut self, ticket: &ToggleTicket, result: Result<(), CollaboratorError>) -> ToggleOutcome {
        if ticket.seq <= self.epoch {
            debug!(seq = ticket.seq, epoch = self.epoch, "discarding toggle for a previous number");
            return ToggleOutcome::Superseded;
        }
        self.outstanding = self.outstanding.saturating_sub(1);
        if result.is_ok() && ticket.seq > self.settled {
            self.settled = ticket.seq;
            self.confirmed = ticket.operation.target();
        }

        if ticket.seq != self.issued {
            // Once nothing is in flight the block list holds whatever
            // succeeded last.
            if self.outstanding == 0 && self.state != self.confirmed {
                self.state = self.confirmed;
                return ToggleOutcome::Applied(self.state);
            }
            debug!(seq = ticket.seq, latest = self.issued, "discarding superseded block toggle");
            return ToggleOutcome::Superseded;
        }

        self.state = self.confirmed;
        match result {
            Ok(()) => ToggleOutcome::Applied(self.state),
            Err(e) => ToggleOutcome::Failed(DetailError::ToggleFailure {
                operation: ticket.operation,
                reason: e.to_string(),
            }),
        }
    }
}
