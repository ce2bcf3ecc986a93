// src/reference.rs
//! Turns the session input into the list of call-log rows to fetch.

use serde::{Deserialize, Serialize};

use crate::models::CallLogUri;
use crate::phone::call_log_uri;

/// What the view was opened with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInput {
    /// A single row reference. Takes precedence over `ids`.
    pub direct: Option<CallLogUri>,
    /// A group of row ids sharing one number.
    pub ids: Vec<i64>,
    /// Set when the session shows a voicemail.
    pub voicemail: Option<String>,
    pub from_notification: bool,
}

impl SessionInput {
    pub fn direct(uri: impl Into<String>) -> Self {
        Self {
            direct: Some(CallLogUri(uri.into())),
            ..Self::default()
        }
    }

    pub fn ids(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_voicemail(mut self, voicemail: impl Into<String>) -> Self {
        self.voicemail = Some(voicemail.into());
        self
    }

    pub fn has_voicemail(&self) -> bool {
        self.voicemail.is_some()
    }
}

/// Returns the references to fetch. A direct reference always wins over the
/// id list; an empty result means there is nothing to show.
pub fn resolve_references(input: &SessionInput, call_log_base: &str) -> Vec<CallLogUri> {
    if let Some(direct) = &input.direct {
        return vec![direct.clone()];
    }
    input
        .ids
        .iter()
        .map(|id| call_log_uri(call_log_base, *id))
        .collect()
}

/// Row ids to delete for a resolved reference set. References without a
/// numeric id are skipped.
pub fn row_ids(references: &[CallLogUri]) -> Vec<i64> {
    references.iter().filter_map(CallLogUri::id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BASE: &str = "content://call_log/calls";

    #[test]
    fn ids_become_call_log_uris() {
        let refs = resolve_references(&SessionInput::ids([3, 5]), BASE);
        assert_eq!(
            refs,
            vec![
                CallLogUri("content://call_log/calls/3".into()),
                CallLogUri("content://call_log/calls/5".into()),
            ]
        );
        assert_eq!(row_ids(&refs), vec![3, 5]);
    }

    #[test]
    fn nothing_supplied_resolves_empty() {
        assert!(resolve_references(&SessionInput::default(), BASE).is_empty());
    }

    #[test]
    fn row_ids_skip_opaque_references() {
        let refs = vec![CallLogUri("content://voicemail/abc".into())];
        assert!(row_ids(&refs).is_empty());
    }

    proptest! {
        #[test]
        fn direct_reference_wins(ids in proptest::collection::vec(any::<i64>(), 1..8), tail in 0i64..1000) {
            let direct = format!("content://call_log/calls/{tail}");
            let input = SessionInput { ids, ..SessionInput::direct(direct.clone()) };
            prop_assert_eq!(resolve_references(&input, BASE), vec![CallLogUri(direct)]);
        }
    }
}
