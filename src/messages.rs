// src/messages.rs
//! Everything the call detail reducer can receive.

use crate::block::{BlockOperation, ToggleTicket};
use crate::collaborators::CollabResult;
use crate::models::{Attribution, CallDetailRecord};

#[derive(Debug, Clone)]
pub enum DetailMessage {
    // Lifecycle
    Start,
    /// Session resumed; fetch again.
    Refresh,
    Close,

    // User actions
    CallBack,
    EditNumberBeforeCall,
    RemoveFromLog,
    DeleteVoicemail,
    ReportAsInvalid,
    /// Block menu item tapped; asks for confirmation first.
    RequestBlockToggle,
    BlockSelected { notify_provider: bool },
    UnblockSelected { notify_provider: bool },

    // Async results
    DetailsLoaded {
        generation: u64,
        result: CollabResult<Vec<CallDetailRecord>>,
    },
    AttributionResolved {
        generation: u64,
        attribution: Attribution,
    },
    BlockToggled {
        ticket: ToggleTicket,
        result: CollabResult<()>,
    },
    CallsDeleted(CollabResult<()>),
    VoicemailDeleted(CollabResult<()>),
}

impl DetailMessage {
    pub fn select(operation: BlockOperation, notify_provider: bool) -> Self {
        match operation {
            BlockOperation::Block => DetailMessage::BlockSelected { notify_provider },
            BlockOperation::Unblock => DetailMessage::UnblockSelected { notify_provider },
        }
    }
}
