// src/main.rs
//! Runs one call detail session against a JSON fixture and prints every
//! session event to stdout as a JSON line.

use clap::{Parser, ValueEnum};
use futures::StreamExt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use call_detail::config::{ConfigSource, LogFormat};
use call_detail::fixture::{Fixture, FixtureBackend};
use call_detail::logging::init_logging;
use call_detail::session;
use call_detail::{
    BlockOperation, Collaborators, DetailConfig, DetailController, DetailMessage, SessionEvent, SessionInput,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    Remove,
    DeleteVoicemail,
    Block,
    Unblock,
    CallBack,
    EditBeforeCall,
    Report,
}

impl Action {
    fn message(self, notify_provider: bool) -> DetailMessage {
        match self {
            Action::Remove => DetailMessage::RemoveFromLog,
            Action::DeleteVoicemail => DetailMessage::DeleteVoicemail,
            Action::Block => DetailMessage::select(BlockOperation::Block, notify_provider),
            Action::Unblock => DetailMessage::select(BlockOperation::Unblock, notify_provider),
            Action::CallBack => DetailMessage::CallBack,
            Action::EditBeforeCall => DetailMessage::EditNumberBeforeCall,
            Action::Report => DetailMessage::ReportAsInvalid,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "call-detail", version, about = "Show call details for a group of call-log entries")]
struct Args {
    /// JSON fixture standing in for the call log, plugins and block list
    #[arg(long)]
    fixture: PathBuf,

    /// Single call-log reference; wins over --ids
    #[arg(long, conflicts_with = "ids")]
    uri: Option<String>,

    /// Comma-separated call-log row ids
    #[arg(long, value_delimiter = ',')]
    ids: Vec<i64>,

    /// Voicemail shown by this session
    #[arg(long)]
    voicemail: Option<String>,

    /// The view was opened from a missed-call notification
    #[arg(long)]
    from_notification: bool,

    /// Command sent once the first view is published
    #[arg(long, value_enum)]
    action: Option<Action>,

    /// Configuration file (JSON)
    #[arg(long, env = "CALL_DETAIL_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides the configured log format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Args {
    fn session_input(&self) -> SessionInput {
        let input = match &self.uri {
            Some(uri) => SessionInput::direct(uri.clone()),
            None => SessionInput::ids(self.ids.iter().copied()),
        };
        let input = SessionInput {
            from_notification: self.from_notification,
            ..input
        };
        match &self.voicemail {
            Some(voicemail) => input.with_voicemail(voicemail.clone()),
            None => input,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let (mut config, source) = match DetailConfig::resolve(args.config.as_deref()) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("call-detail: {e}");
            return ExitCode::from(2);
        }
    };
    if let Some(format) = args.log_format {
        config.log.format = format;
    }
    init_logging(&config.log);
    match &source {
        ConfigSource::BuiltinDefault => debug!("using built-in configuration"),
        ConfigSource::CliArgument(path) | ConfigSource::Environment(path) => {
            info!(path = %path.display(), "loaded configuration")
        }
    }

    let fixture = match Fixture::load(&args.fixture) {
        Ok(fixture) => fixture,
        Err(e) => {
            error!(error = %e, "cannot load fixture");
            return ExitCode::from(2);
        }
    };

    let backend = Arc::new(FixtureBackend::new(fixture));
    let config = Arc::new(config);
    let controller = DetailController::new(
        config.clone(),
        Collaborators::from_backend(backend),
        args.session_input(),
    );

    let (handle, events) = session::spawn(controller).split();

    let interrupt = handle.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if !interrupt.send(DetailMessage::Close) {
            debug!("interrupt after session end");
        }
    }) {
        warn!(error = %e, "cannot install Ctrl-C handler");
    }

    let mut pending_action = args.action;
    let mut events = Box::pin(events);
    let mut closed = None;
    while let Some(event) = events.next().await {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => error!(error = %e, "cannot serialize session event"),
        }
        match &event {
            SessionEvent::View(_) => {
                if let Some(action) = pending_action.take() {
                    info!(?action, "sending action");
                    handle.send(action.message(config.notify_lookup_provider));
                }
            }
            SessionEvent::Closed(reason) => closed = Some(*reason),
            SessionEvent::Notice(_) | SessionEvent::Launch(_) => {}
        }
    }

    info!(reason = ?closed, "session ended");
    ExitCode::SUCCESS
}
