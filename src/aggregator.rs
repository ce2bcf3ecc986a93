// src/aggregator.rs
//! Reduces a fetched group of call records into one presentation snapshot.
//!
//! Every record in a group shares the same number and contact, so the first
//! (most recent) record is the only source for scalar fields. The full list
//! is kept for the history view.

use std::sync::Arc;

use crate::collaborators::{Accounts, ContactInfo};
use crate::error::DetailError;
use crate::models::{
    Attribution, CallDetailRecord, ContactType, DefaultImageRequest, PhotoRequest, PhotoSource,
    PresentationState,
};
use crate::phone;

/// Separates the label from the formatted number on the secondary line.
pub const SECONDARY_LINE_SEPARATOR: &str = "  ";

pub struct DetailAggregator<'a> {
    accounts: &'a dyn Accounts,
    contacts: &'a dyn ContactInfo,
}

impl<'a> DetailAggregator<'a> {
    pub fn new(accounts: &'a dyn Accounts, contacts: &'a dyn ContactInfo) -> Self {
        Self { accounts, contacts }
    }

    /// Derives the snapshot. `attribution` must be the resolution of the
    /// first record's call-method identifier.
    pub fn aggregate(
        &self,
        records: Arc<[CallDetailRecord]>,
        attribution: &Attribution,
    ) -> Result<PresentationState, DetailError> {
        let Some(first) = records.first() else {
            return Err(DetailError::FetchFailure("fetch returned no records".into()));
        };

        let number = Some(first.number.as_str()).filter(|n| !n.is_empty());
        let account = first.account.as_ref();

        let is_callable = phone::can_place_calls_to(number, first.presentation);
        let is_voicemail = self.accounts.is_voicemail_number(account, number);
        let is_sip = phone::is_sip_number(number);

        let attribution = match first.call_method {
            Some(_) => attribution.clone(),
            None => Attribution::Unattributed,
        };
        let location_or_type = location_or_type(first, &attribution);

        let (caller_name, caller_number) = match first.contact_name() {
            Some(name) => {
                let secondary = match &location_or_type {
                    Some(label) => format!("{label}{SECONDARY_LINE_SEPARATOR}{}", first.display_number),
                    None => first.display_number.clone(),
                };
                (name.to_string(), Some(secondary))
            }
            None => (first.display_number.clone(), location_or_type),
        };

        let account_label = self
            .accounts
            .account_label(account)
            .filter(|label| !label.is_empty());

        let can_edit_number_before_call =
            is_callable && !is_sip && !is_voicemail && first.call_method.is_none();
        let can_report_as_invalid = self
            .contacts
            .can_report_as_invalid(first.source_type, first.object_id.as_deref());

        let contact_type = if is_voicemail {
            ContactType::Voicemail
        } else if self.contacts.is_business(first.source_type) {
            ContactType::Business
        } else {
            ContactType::Default
        };

        let photo = PhotoRequest {
            contact_uri: first.contact_uri.clone(),
            source: photo_source(first),
            default_image: DefaultImageRequest {
                display_name: first
                    .contact_name()
                    .map_or_else(|| first.display_number.clone(), str::to_string),
                lookup_key: first.contact_uri.as_deref().and_then(phone::lookup_key_from_uri),
                contact_type,
                circular: true,
            },
            badge: attribution.badge().map(str::to_string),
        };

        Ok(PresentationState {
            number: number.map(str::to_string),
            is_callable,
            is_voicemail,
            is_sip,
            caller_name,
            caller_number,
            account_label,
            call_method: first.call_method.clone(),
            attribution,
            photo,
            can_edit_number_before_call,
            can_report_as_invalid,
            source_type: first.source_type,
            object_id: first.object_id.clone(),
            history: records.clone(),
        })
    }
}

/// Label shown next to the number: attribution name, then telephony type
/// label for known contacts; geocode otherwise.
pub fn location_or_type(record: &CallDetailRecord, attribution: &Attribution) -> Option<String> {
    let label = if record.contact_name().is_some() {
        attribution
            .name()
            .filter(|_| record.call_method.is_some())
            .map(str::to_string)
            .or_else(|| phone::type_label(record.number_type, record.number_label.as_deref()))
    } else {
        record.geocode.clone()
    };
    label.filter(|l| !l.is_empty())
}

/// Uri-based load only when there is no photo id but a photo uri exists.
pub fn photo_source(record: &CallDetailRecord) -> PhotoSource {
    match &record.photo_uri {
        Some(uri) if record.photo_id == 0 => PhotoSource::Uri(uri.clone()),
        _ => PhotoSource::Id(record.photo_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountHandle, CallMethodId, NumberPresentation, PluginInfo};
    use proptest::prelude::*;

    struct Stub {
        voicemail: Option<&'static str>,
        business_source: i32,
    }

    impl Accounts for Stub {
        fn account_label(&self, handle: Option<&AccountHandle>) -> Option<String> {
            handle.map(|h| h.id.clone())
        }

        fn is_voicemail_number(&self, _handle: Option<&AccountHandle>, number: Option<&str>) -> bool {
            number.is_some() && number == self.voicemail
        }
    }

    impl ContactInfo for Stub {
        fn can_report_as_invalid(&self, source_type: i32, object_id: Option<&str>) -> bool {
            source_type == 2 && object_id.is_some()
        }

        fn is_business(&self, source_type: i32) -> bool {
            source_type == self.business_source
        }
    }

    const STUB: Stub = Stub {
        voicemail: Some("*86"),
        business_source: 3,
    };

    fn aggregate(records: Vec<CallDetailRecord>, attribution: &Attribution) -> PresentationState {
        DetailAggregator::new(&STUB, &STUB)
            .aggregate(records.into(), attribution)
            .unwrap()
    }

    fn record(number: &str) -> CallDetailRecord {
        CallDetailRecord {
            number: number.into(),
            display_number: number.into(),
            ..CallDetailRecord::default()
        }
    }

    fn acme() -> Attribution {
        Attribution::Plugin(PluginInfo {
            id: CallMethodId("com.acme/.Calls".into()),
            name: "Acme Calls".into(),
            badge: Some("acme-badge".into()),
        })
    }

    #[test]
    fn unnamed_caller_shows_number_over_geocode() {
        let state = aggregate(
            vec![CallDetailRecord {
                geocode: Some("San Jose, CA".into()),
                ..record("4085551212")
            }],
            &Attribution::Unattributed,
        );
        assert_eq!(state.caller_name, "4085551212");
        assert_eq!(state.caller_number.as_deref(), Some("San Jose, CA"));
        assert!(state.is_callable);
        assert!(state.can_edit_number_before_call);
    }

    #[test]
    fn unnamed_caller_without_geocode_hides_secondary_line() {
        let state = aggregate(vec![record("4085551212")], &Attribution::Unattributed);
        assert_eq!(state.caller_number, None);
    }

    #[test]
    fn plugin_name_beats_telephony_label() {
        let state = aggregate(
            vec![CallDetailRecord {
                name: Some("Jane Doe".into()),
                number_type: Some(2),
                call_method: Some(CallMethodId("com.acme/.Calls".into())),
                ..record("4085551212")
            }],
            &acme(),
        );
        assert_eq!(state.caller_name, "Jane Doe");
        assert_eq!(state.caller_number.as_deref(), Some("Acme Calls  4085551212"));
        assert_eq!(state.photo.badge.as_deref(), Some("acme-badge"));
        assert!(!state.can_edit_number_before_call);
    }

    #[test]
    fn unresolved_plugin_falls_back_to_telephony_label() {
        let state = aggregate(
            vec![CallDetailRecord {
                name: Some("Jane Doe".into()),
                number_type: Some(2),
                call_method: Some(CallMethodId("gone".into())),
                ..record("4085551212")
            }],
            &Attribution::Unattributed,
        );
        assert_eq!(state.caller_number.as_deref(), Some("Mobile  4085551212"));
        assert_eq!(state.photo.badge, None);
        assert!(!state.can_edit_number_before_call);
    }

    #[test]
    fn named_caller_ignores_geocode() {
        let state = aggregate(
            vec![CallDetailRecord {
                name: Some("Jane Doe".into()),
                geocode: Some("San Jose, CA".into()),
                ..record("4085551212")
            }],
            &Attribution::Unattributed,
        );
        assert_eq!(state.caller_number.as_deref(), Some("4085551212"));
    }

    #[test]
    fn voicemail_wins_contact_type_and_blocks_edit() {
        let state = aggregate(
            vec![CallDetailRecord {
                source_type: 3,
                ..record("*86")
            }],
            &Attribution::Unattributed,
        );
        assert!(state.is_voicemail);
        assert!(!state.can_edit_number_before_call);
        assert_eq!(state.photo.default_image.contact_type, ContactType::Voicemail);

        let business = aggregate(
            vec![CallDetailRecord {
                source_type: 3,
                ..record("4085551212")
            }],
            &Attribution::Unattributed,
        );
        assert_eq!(business.photo.default_image.contact_type, ContactType::Business);
    }

    #[test]
    fn sip_and_restricted_numbers_cannot_be_edited() {
        let sip = aggregate(vec![record("jane@example.com")], &Attribution::Unattributed);
        assert!(sip.is_sip);
        assert!(sip.is_callable);
        assert!(!sip.can_edit_number_before_call);

        let private = aggregate(
            vec![CallDetailRecord {
                presentation: NumberPresentation::Restricted,
                ..record("")
            }],
            &Attribution::Unattributed,
        );
        assert_eq!(private.number, None);
        assert!(!private.is_callable);
        assert!(!private.can_edit_number_before_call);
    }

    #[test]
    fn photo_selection() {
        let by_uri = CallDetailRecord {
            photo_uri: Some("content://photo/1".into()),
            ..record("1")
        };
        assert_eq!(photo_source(&by_uri), PhotoSource::Uri("content://photo/1".into()));

        let by_id = CallDetailRecord { photo_id: 12, ..by_uri };
        assert_eq!(photo_source(&by_id), PhotoSource::Id(12));
        assert_eq!(photo_source(&record("1")), PhotoSource::Id(0));
    }

    #[test]
    fn default_image_and_account_label() {
        let state = aggregate(
            vec![CallDetailRecord {
                contact_uri: Some("content://com.android.contacts/contacts/lookup/abc/9".into()),
                account: Some(AccountHandle {
                    component: "telephony".into(),
                    id: "SIM 1".into(),
                }),
                source_type: 2,
                object_id: Some("obj".into()),
                ..record("4085551212")
            }],
            &Attribution::Unattributed,
        );
        assert_eq!(state.photo.default_image.display_name, "4085551212");
        assert_eq!(state.photo.default_image.lookup_key.as_deref(), Some("abc"));
        assert!(state.photo.default_image.circular);
        assert_eq!(state.account_label.as_deref(), Some("SIM 1"));
        assert!(state.can_report_as_invalid);
    }

    #[test]
    fn empty_group_is_a_fetch_failure() {
        let result = DetailAggregator::new(&STUB, &STUB).aggregate(Vec::<CallDetailRecord>::new().into(), &Attribution::Unattributed);
        assert!(matches!(result, Err(DetailError::FetchFailure(_))));
    }

    fn arb_record() -> impl Strategy<Value = CallDetailRecord> {
        (
            "[0-9]{0,10}",
            proptest::option::of("[A-Za-z ]{0,12}"),
            proptest::option::of("[A-Za-z, ]{0,12}"),
            proptest::option::of(0i32..21),
            0i64..3,
            proptest::option::of("[a-z.]{1,8}"),
            0i32..4,
        )
            .prop_map(|(number, name, geocode, number_type, photo_id, call_method, source_type)| {
                CallDetailRecord {
                    display_number: number.clone(),
                    number,
                    name,
                    geocode,
                    number_type,
                    photo_id,
                    call_method: call_method.map(CallMethodId),
                    source_type,
                    ..CallDetailRecord::default()
                }
            })
    }

    proptest! {
        #[test]
        fn scalars_come_from_first_record_only(records in proptest::collection::vec(arb_record(), 1..6)) {
            let whole = aggregate(records.clone(), &acme());
            let alone = aggregate(vec![records[0].clone()], &acme());
            prop_assert_eq!(whole.history.len(), records.len());
            prop_assert_eq!(PresentationState { history: alone.history.clone(), ..whole }, alone);
        }

        #[test]
        fn attributed_calls_never_edit_before_call(mut first in arb_record(), id in "[a-z]{1,6}") {
            first.call_method = Some(CallMethodId(id));
            let state = aggregate(vec![first], &Attribution::Unattributed);
            prop_assert!(!state.can_edit_number_before_call);
        }
    }
}
