// src/lib.rs
//! Call detail sessions: resolve a group of call-log entries into one
//! presentation snapshot and handle the actions offered on it (call back,
//! delete, block/unblock, report).
//!
//! Rendering, photo loading and storage live outside this crate and are
//! reached through the traits in [`collaborators`].

pub mod aggregator;
pub mod attribution;
pub mod block;
pub mod collaborators;
pub mod config;
pub mod controller;
pub mod error;
pub mod fixture;
pub mod logging;
pub mod menu;
pub mod messages;
pub mod models;
pub mod phone;
pub mod reference;
pub mod session;
pub mod task;

pub use block::{BlockOperation, ContactBlockState};
pub use collaborators::Collaborators;
pub use config::DetailConfig;
pub use controller::{CloseReason, DetailController, Launch, SessionEvent};
pub use error::{CollaboratorError, DetailError, Notice};
pub use menu::MenuState;
pub use messages::DetailMessage;
pub use models::{CallDetailRecord, PresentationState, SessionPhase, ViewModel};
pub use reference::SessionInput;
