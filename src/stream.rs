//! Streaming view of execution events.
//!
//! [`crate::Wizard::events`] hands out an [`EventStream`] that yields an
//! [`ExecutionEvent`] for each record change, the same sequence an
//! [`crate::ExecutionObserver`] sees. Streams are fed from a bounded
//! broadcast channel: a consumer that falls behind loses the oldest events
//! instead of slowing execution down. The state store stays authoritative,
//! so a lagging consumer can always resynchronise from a snapshot.

use crate::registry::StepId;
use futures::future;
use futures::stream::StreamExt;
use serde::Serialize;
use std::pin::Pin;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

/// One change to an execution record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
    Started { step: StepId, first_line: String },
    Log { step: StepId, line: String },
    Succeeded { step: StepId, message: String },
    Failed { step: StepId, error: String },
}

impl ExecutionEvent {
    pub fn step(&self) -> StepId {
        match self {
            ExecutionEvent::Started { step, .. }
            | ExecutionEvent::Log { step, .. }
            | ExecutionEvent::Succeeded { step, .. }
            | ExecutionEvent::Failed { step, .. } => *step,
        }
    }
}

/// A boxed stream of execution events.
pub type EventStream = Pin<Box<dyn Stream<Item = ExecutionEvent> + Send>>;

/// Fan-out of execution events to any number of streams.
#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    tx: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to current subscribers. Having none is not an error.
    pub(crate) fn publish(&self, event: ExecutionEvent) {
        let _ = self.tx.send(event);
    }

    /// Events published from now on.
    pub(crate) fn subscribe(&self) -> EventStream {
        let s = BroadcastStream::new(self.tx.subscribe()).filter_map(|item| {
            future::ready(match item {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(n)) => {
                    debug!("Event stream lagged; {} events dropped", n);
                    None
                }
            })
        });
        Box::pin(s)
    }
}
