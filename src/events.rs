//! Outbound events and main-context marshaling
//!
//! Provider callbacks complete on arbitrary runtime threads, but callers
//! observe events on one designated context. [`channel`] returns the two
//! halves of that arrangement:
//!
//! - [`MainContext`]: a cloneable, `Send` handle used from any thread to
//!   queue events or closures for the designated context.
//! - [`EventPump`]: owned by the designated context. It runs queued
//!   closures and delivers events to connected listeners, either when
//!   polled as a [`Stream`] or when drained with
//!   [`EventPump::dispatch_pending`] from a frame loop.
//!
//! # Example
//! ```no_run
//! use firebase_auth_bridge::events::{channel, AuthEvent};
//!
//! let (main, mut pump) = channel();
//! pump.connect("auth_success", |event| {
//!     if let AuthEvent::AuthSuccess(user) = event {
//!         println!("signed in as {}", user.uid);
//!     }
//! })
//! .unwrap();
//!
//! main.emit(AuthEvent::SignOutSuccess(true));
//! // once per frame:
//! pump.dispatch_pending();
//! ```

use crate::auth::types::UserRecord;
use crate::error::FirebaseError;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};

/// Names of every event the bridge emits
pub const EVENT_NAMES: [&str; 7] = [
    "initialized",
    "initialization_failed",
    "auth_success",
    "auth_failure",
    "sign_out_success",
    "link_success",
    "link_failure",
];

/// An event delivered to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// Providers configured
    Initialized,
    /// Configuration could not be loaded
    InitializationFailed(String),
    /// Sign-in finished
    AuthSuccess(UserRecord),
    /// Sign-in or sign-out failed
    AuthFailure(String),
    /// Signed out of both providers
    SignOutSuccess(bool),
    /// Anonymous account linked
    LinkSuccess(UserRecord),
    /// Link failed
    LinkFailure(String),
}

impl AuthEvent {
    /// Event name as seen by scripting hosts
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::Initialized => "initialized",
            AuthEvent::InitializationFailed(_) => "initialization_failed",
            AuthEvent::AuthSuccess(_) => "auth_success",
            AuthEvent::AuthFailure(_) => "auth_failure",
            AuthEvent::SignOutSuccess(_) => "sign_out_success",
            AuthEvent::LinkSuccess(_) => "link_success",
            AuthEvent::LinkFailure(_) => "link_failure",
        }
    }

    /// User payload, for success events
    pub fn user(&self) -> Option<&UserRecord> {
        match self {
            AuthEvent::AuthSuccess(user) | AuthEvent::LinkSuccess(user) => Some(user),
            _ => None,
        }
    }

    /// Message payload, for failure events
    pub fn message(&self) -> Option<&str> {
        match self {
            AuthEvent::InitializationFailed(message)
            | AuthEvent::AuthFailure(message)
            | AuthEvent::LinkFailure(message) => Some(message),
            _ => None,
        }
    }

    /// Whether this is a failure event
    pub fn is_failure(&self) -> bool {
        self.message().is_some()
    }
}

type MainTask = Box<dyn FnOnce() + Send>;

enum Work {
    Event(AuthEvent),
    Call(MainTask),
}

/// Create a connected [`MainContext`] / [`EventPump`] pair
pub fn channel() -> (MainContext, EventPump) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        MainContext { tx },
        EventPump {
            rx,
            listeners: HashMap::new(),
            catch_all: Vec::new(),
        },
    )
}

/// Handle for marshaling work onto the designated context
#[derive(Clone)]
pub struct MainContext {
    tx: mpsc::UnboundedSender<Work>,
}

impl MainContext {
    /// Queue an event for delivery
    ///
    /// Returns false if the pump has been dropped.
    pub fn emit(&self, event: AuthEvent) -> bool {
        tracing::trace!(event = event.name(), "queueing event");
        if self.tx.send(Work::Event(event)).is_err() {
            tracing::debug!("event pump dropped, event discarded");
            return false;
        }
        true
    }

    /// Run `f` on the designated context and receive its result
    ///
    /// The receiver errors if the pump is dropped before running `f`.
    pub fn run_on_main<F, R>(&self, f: F) -> oneshot::Receiver<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let task: MainTask = Box::new(move || {
            // Ignore error if the requester stopped waiting
            let _ = result_tx.send(f());
        });
        if self.tx.send(Work::Call(task)).is_err() {
            tracing::debug!("event pump dropped, main-context call discarded");
        }
        result_rx
    }

    /// Whether the pump has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl std::fmt::Debug for MainContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainContext")
            .field("closed", &self.is_closed())
            .finish()
    }
}

type Listener = Box<dyn FnMut(&AuthEvent)>;

/// The designated context's end of the channel
///
/// Not `Send`: listeners run where the pump lives.
pub struct EventPump {
    rx: mpsc::UnboundedReceiver<Work>,
    listeners: HashMap<&'static str, Vec<Listener>>,
    catch_all: Vec<Listener>,
}

impl EventPump {
    /// Connect a listener to one named event
    pub fn connect<F>(&mut self, name: &str, listener: F) -> Result<(), FirebaseError>
    where
        F: FnMut(&AuthEvent) + 'static,
    {
        // Error-first: unknown event name
        let Some(name) = EVENT_NAMES.iter().copied().find(|known| *known == name) else {
            return Err(FirebaseError::internal(format!("Unknown event: {}", name)));
        };
        self.listeners.entry(name).or_default().push(Box::new(listener));
        Ok(())
    }

    /// Connect a listener to every event
    pub fn connect_all<F>(&mut self, listener: F)
    where
        F: FnMut(&AuthEvent) + 'static,
    {
        self.catch_all.push(Box::new(listener));
    }

    /// Run queued work without waiting; returns the number of events delivered
    pub fn dispatch_pending(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.try_next_event() {
            tracing::trace!(event = event.name(), "delivered event");
            delivered += 1;
        }
        delivered
    }

    /// Next already-queued event, running queued closures on the way
    pub fn try_next_event(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(Work::Call(task)) => task(),
                Ok(Work::Event(event)) => {
                    self.deliver(&event);
                    return Some(event);
                }
                Err(_) => return None,
            }
        }
    }

    /// Wait for the next event, running queued closures while waiting
    ///
    /// Returns None once every [`MainContext`] has been dropped.
    pub async fn next_event(&mut self) -> Option<AuthEvent> {
        futures::StreamExt::next(self).await
    }

    fn deliver(&mut self, event: &AuthEvent) {
        if let Some(listeners) = self.listeners.get_mut(event.name()) {
            for listener in listeners.iter_mut() {
                listener(event);
            }
        }
        for listener in self.catch_all.iter_mut() {
            listener(event);
        }
    }
}

impl Stream for EventPump {
    type Item = AuthEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match self.rx.poll_recv(cx) {
                Poll::Ready(Some(Work::Call(task))) => task(),
                Poll::Ready(Some(Work::Event(event))) => {
                    self.deliver(&event);
                    return Poll::Ready(Some(event));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl std::fmt::Debug for EventPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPump")
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .field("catch_all", &self.catch_all.len())
            .finish()
    }
}
