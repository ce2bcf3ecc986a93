// src/models.rs
//! Data models for the call detail view.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::block::ContactBlockState;
use crate::menu::MenuState;

/// Reference to one call-log row, e.g. `content://call_log/calls/42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallLogUri(pub String);

impl CallLogUri {
    /// Row id parsed from the last path segment, if it is numeric.
    pub fn id(&self) -> Option<i64> {
        crate::phone::parse_call_log_id(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallLogUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the caller's number may be shown and dialed. Deserializes from
/// either the name or the call-log column code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "PresentationRepr")]
pub enum NumberPresentation {
    #[default]
    Allowed,
    Restricted,
    Unknown,
    Payphone,
}

impl NumberPresentation {
    /// Maps the call-log presentation column (1 = allowed, 2 = restricted,
    /// 3 = unknown, 4 = payphone). Anything else is treated as unknown.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => NumberPresentation::Allowed,
            2 => NumberPresentation::Restricted,
            4 => NumberPresentation::Payphone,
            _ => NumberPresentation::Unknown,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PresentationRepr {
    Code(i32),
    Name(String),
}

impl TryFrom<PresentationRepr> for NumberPresentation {
    type Error = String;

    fn try_from(repr: PresentationRepr) -> Result<Self, Self::Error> {
        match repr {
            PresentationRepr::Code(code) => Ok(Self::from_code(code)),
            PresentationRepr::Name(name) => match name.as_str() {
                "allowed" => Ok(NumberPresentation::Allowed),
                "restricted" => Ok(NumberPresentation::Restricted),
                "unknown" => Ok(NumberPresentation::Unknown),
                "payphone" => Ok(NumberPresentation::Payphone),
                other => Err(format!("unknown number presentation `{other}`")),
            },
        }
    }
}

/// Telephony account that placed or received the call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountHandle {
    pub component: String,
    pub id: String,
}

/// Identifies a third-party calling plugin a call is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallMethodId(pub String);

impl std::fmt::Display for CallMethodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Plugin metadata returned by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub id: CallMethodId,
    pub name: String,
    /// Reference to the badge image overlaid on the contact photo.
    #[serde(default)]
    pub badge: Option<String>,
}

/// One fetched call-log row. Never mutated after the fetch that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallDetailRecord {
    pub number: String,
    pub presentation: NumberPresentation,
    pub name: Option<String>,
    pub display_number: String,
    pub geocode: Option<String>,
    pub number_type: Option<i32>,
    pub number_label: Option<String>,
    pub contact_uri: Option<String>,
    /// 0 means no photo id.
    pub photo_id: i64,
    pub photo_uri: Option<String>,
    pub account: Option<AccountHandle>,
    pub call_method: Option<CallMethodId>,
    pub source_type: i32,
    pub object_id: Option<String>,
    pub date: i64,
    pub duration_secs: i64,
    pub call_type: i32,
}

impl CallDetailRecord {
    /// Name, if non-empty.
    pub fn contact_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}

/// Default-image classification, in priority order voicemail > business > default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    Voicemail,
    Business,
    #[default]
    Default,
}

/// Which photo load the renderer should perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PhotoSource {
    /// Directory photo by uri.
    Uri(String),
    /// Thumbnail by id; 0 asks for the default image.
    Id(i64),
}

/// Request for the generated letter-tile image used when no photo loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultImageRequest {
    pub display_name: String,
    pub lookup_key: Option<String>,
    pub contact_type: ContactType,
    pub circular: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRequest {
    pub contact_uri: Option<String>,
    pub source: PhotoSource,
    pub default_image: DefaultImageRequest,
    /// Attribution badge overlay, when the call is attributed to a known plugin.
    pub badge: Option<String>,
}

/// Result of resolving a call-method identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "plugin", rename_all = "snake_case")]
pub enum Attribution {
    #[default]
    Unattributed,
    Plugin(PluginInfo),
}

impl Attribution {
    pub fn plugin(&self) -> Option<&PluginInfo> {
        match self {
            Attribution::Unattributed => None,
            Attribution::Plugin(info) => Some(info),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.plugin().map(|p| p.name.as_str())
    }

    pub fn badge(&self) -> Option<&str> {
        self.plugin().and_then(|p| p.badge.as_deref())
    }
}

/// Display snapshot derived from one fetch. Every scalar comes from the
/// first record; `history` keeps all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentationState {
    /// None when the first record's number is empty.
    pub number: Option<String>,
    pub is_callable: bool,
    pub is_voicemail: bool,
    pub is_sip: bool,
    /// Primary line: the name, or the formatted number.
    pub caller_name: String,
    /// Secondary line; None means hidden.
    pub caller_number: Option<String>,
    pub account_label: Option<String>,
    pub call_method: Option<CallMethodId>,
    pub attribution: Attribution,
    pub photo: PhotoRequest,
    pub can_edit_number_before_call: bool,
    pub can_report_as_invalid: bool,
    pub source_type: i32,
    pub object_id: Option<String>,
    pub history: Arc<[CallDetailRecord]>,
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Fetching,
    Ready,
    Failed,
    Closed,
}

/// Everything the renderer needs, re-emitted on every recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    pub phase: SessionPhase,
    pub presentation: Option<Arc<PresentationState>>,
    pub attribution: Attribution,
    pub block_state: ContactBlockState,
    pub menu: MenuState,
}
