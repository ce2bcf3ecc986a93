// src/session.rs
//! Runs one call detail session on tokio.
//!
//! The control loop is the only owner of the [`DetailController`]. Futures
//! from returned tasks are spawned onto the runtime and report back through
//! a single inbox, so results are applied in arrival order on one task and
//! never from the background.

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, Instrument};

use crate::controller::{DetailController, SessionEvent};
use crate::messages::DetailMessage;
use crate::task::Task;

/// Sends commands into a running session. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inbox: mpsc::UnboundedSender<DetailMessage>,
}

impl SessionHandle {
    /// Returns false once the session has ended.
    pub fn send(&self, message: DetailMessage) -> bool {
        self.inbox.send(message).is_ok()
    }
}

pub struct Session {
    pub handle: SessionHandle,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    pub join: JoinHandle<()>,
}

impl Session {
    /// Event stream; ends after the `Closed` event. The stream keeps the
    /// session alive while it is held.
    pub fn events(self) -> impl Stream<Item = SessionEvent> {
        let mut events = self.events;
        let handle = self.handle;
        async_stream::stream! {
            let _handle = handle;
            while let Some(event) = events.recv().await {
                let closed = matches!(event, SessionEvent::Closed(_));
                yield event;
                if closed {
                    break;
                }
            }
        }
    }

    /// Splits into the command handle and the event stream.
    pub fn split(self) -> (SessionHandle, impl Stream<Item = SessionEvent>) {
        let handle = self.handle.clone();
        (handle, self.events())
    }
}

/// Starts the session: spawns the control loop and sends `Start`.
pub fn spawn(controller: DetailController) -> Session {
    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let _ = inbox_tx.send(DetailMessage::Start);
    // The loop only keeps a weak sender: once every handle and the event
    // stream are dropped and no task is in flight, the inbox closes and the
    // session ends.
    let weak = inbox_tx.downgrade();
    let handle = SessionHandle { inbox: inbox_tx };
    let span = tracing::info_span!("call_detail_session", references = controller.references().len());
    let join = tokio::spawn(run(controller, weak, inbox_rx, events_tx).instrument(span));

    Session {
        handle,
        events: events_rx,
        join,
    }
}

async fn run(
    mut controller: DetailController,
    inbox_tx: mpsc::WeakUnboundedSender<DetailMessage>,
    inbox_rx: mpsc::UnboundedReceiver<DetailMessage>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let mut inbox = UnboundedReceiverStream::new(inbox_rx);

    while let Some(message) = inbox.next().await {
        let task = controller.update(message);
        for event in controller.take_events() {
            // Nobody listening is fine; state still has to advance.
            let _ = events.send(event);
        }
        if controller.is_closed() {
            break;
        }
        dispatch(task, &inbox_tx);
    }

    debug!("session loop finished");
    controller.release();
}

fn dispatch(task: Task<DetailMessage>, inbox: &mpsc::WeakUnboundedSender<DetailMessage>) {
    if task.is_none() {
        return;
    }
    debug!(futures = task.len(), "spawning session work");
    for future in task.into_futures() {
        let Some(inbox) = inbox.upgrade() else {
            debug!("session inbox closed, dropping task");
            return;
        };
        tokio::spawn(
            async move {
                let message = future.await;
                if inbox.send(message).is_err() {
                    debug!("session ended before result arrived");
                }
            }
            .in_current_span(),
        );
    }
}
