// src/menu.rs
//! Options menu visibility, derived from the presentation and block state.

use serde::Serialize;

use crate::block::{BlockOperation, ContactBlockState};
use crate::models::PresentationState;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MenuState {
    pub remove_from_log: bool,
    pub edit_number_before_call: bool,
    pub delete_voicemail: bool,
    pub report_as_invalid: bool,
    /// None hides the item; otherwise the operation its label offers.
    pub block_contact: Option<BlockOperation>,
}

impl MenuState {
    /// Pure derivation; call again whenever any input changes.
    pub fn compute(
        presentation: Option<&PresentationState>,
        has_voicemail: bool,
        block_eligible: bool,
        block_state: ContactBlockState,
    ) -> Self {
        MenuState {
            // Voicemails are removed with delete-voicemail instead.
            remove_from_log: !has_voicemail,
            edit_number_before_call: presentation.is_some_and(|p| p.can_edit_number_before_call),
            delete_voicemail: has_voicemail,
            report_as_invalid: presentation.is_some_and(|p| p.can_report_as_invalid),
            block_contact: block_eligible.then(|| block_state.offered_operation()),
        }
    }
}
