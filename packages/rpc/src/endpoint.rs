//! # Endpoint
//!
//! One side of an RPC conversation.
//!
//! - `call` posts a `Message::Call` immediately and returns a future for the
//!   answer. After `terminate` it fails synchronously.
//! - `expose` registers (or, with `None`, removes) named handlers.
//! - `replace` swaps the transport. Exposed handlers survive the swap;
//!   calls still waiting on the old transport fail with `Disconnected`.
//!
//! Incoming calls are answered one at a time, in arrival order.

use crate::{Message, RpcError, Transport};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Future resolving with the peer's answer to a call
pub type CallFuture = BoxFuture<'static, Result<Value, RpcError>>;

/// An exposed method. Errors are reported to the caller as strings.
pub type Handler =
    Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, String>> + Send + Sync>;

/// Box an async closure into a [`Handler`]
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, String>> + Send + 'static,
{
    Arc::new(move |args| f(args).boxed())
}

struct PendingCall {
    method: String,
    reply: oneshot::Sender<Result<Value, RpcError>>,
}

struct EndpointState {
    outgoing: Option<UnboundedSender<Message>>,
    listener: Option<JoinHandle<()>>,
    exposed: HashMap<String, Handler>,
    pending: HashMap<u64, PendingCall>,
    next_id: u64,
    /// Bumped on every transport swap so a stale listener can tell it was replaced
    generation: u64,
    terminated: bool,
}

#[derive(Clone)]
pub struct Endpoint {
    shared: Arc<Mutex<EndpointState>>,
}

fn lock(shared: &Mutex<EndpointState>) -> MutexGuard<'_, EndpointState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Endpoint {
    /// Wrap a transport. Must be called from within a Tokio runtime.
    pub fn new(transport: Transport) -> Self {
        let endpoint = Self {
            shared: Arc::new(Mutex::new(EndpointState {
                outgoing: None,
                listener: None,
                exposed: HashMap::new(),
                pending: HashMap::new(),
                next_id: 0,
                generation: 0,
                terminated: false,
            })),
        };
        endpoint.attach(transport);
        endpoint
    }

    /// Invoke `method` on the peer.
    ///
    /// The call is posted before this returns; the future only observes the
    /// answer.
    pub fn call(&self, method: &str, args: Vec<Value>) -> Result<CallFuture, RpcError> {
        let (id, outgoing, rx) = {
            let mut state = lock(&self.shared);
            if state.terminated {
                return Err(RpcError::Terminated);
            }
            let outgoing = state.outgoing.clone().ok_or_else(|| RpcError::Disconnected {
                method: method.to_string(),
            })?;

            let id = state.next_id;
            state.next_id += 1;

            let (tx, rx) = oneshot::channel();
            state.pending.insert(
                id,
                PendingCall {
                    method: method.to_string(),
                    reply: tx,
                },
            );
            (id, outgoing, rx)
        };

        debug!(id, method, "posting call");

        let message = Message::Call {
            id,
            method: method.to_string(),
            args,
        };
        if outgoing.send(message).is_err() {
            lock(&self.shared).pending.remove(&id);
            return Err(RpcError::Disconnected {
                method: method.to_string(),
            });
        }

        let method = method.to_string();
        Ok(async move {
            rx.await
                .unwrap_or_else(|_| Err(RpcError::Disconnected { method }))
        }
        .boxed())
    }

    /// Add handlers, or remove them by passing `None`
    pub fn expose<I, S>(&self, api: I)
    where
        I: IntoIterator<Item = (S, Option<Handler>)>,
        S: Into<String>,
    {
        let mut state = lock(&self.shared);
        for (name, entry) in api {
            let name = name.into();
            match entry {
                Some(handler) => {
                    debug!(method = %name, "exposing method");
                    state.exposed.insert(name, handler);
                }
                None => {
                    debug!(method = %name, "withdrawing method");
                    state.exposed.remove(&name);
                }
            }
        }
    }

    /// Names of the currently exposed methods, sorted
    pub fn exposed_methods(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.shared).exposed.keys().cloned().collect();
        names.sort();
        names
    }

    /// Release the transport. Every later `call` fails synchronously and
    /// every unanswered call resolves with [`RpcError::Terminated`].
    pub fn terminate(&self) {
        let pending = {
            let mut state = lock(&self.shared);
            state.terminated = true;
            state.outgoing = None;
            if let Some(listener) = state.listener.take() {
                listener.abort();
            }
            std::mem::take(&mut state.pending)
        };

        debug!(unanswered = pending.len(), "endpoint terminated");

        for (_, call) in pending {
            let _ = call.reply.send(Err(RpcError::Terminated));
        }
    }

    pub fn is_terminated(&self) -> bool {
        lock(&self.shared).terminated
    }

    /// Swap the underlying transport, keeping exposed handlers. Calls
    /// made over the old transport can no longer be answered and fail.
    pub fn replace(&self, transport: Transport) -> Result<(), RpcError> {
        if self.is_terminated() {
            return Err(RpcError::Terminated);
        }
        self.attach(transport);
        Ok(())
    }

    fn attach(&self, transport: Transport) {
        let Transport { outgoing, incoming } = transport;

        let stale = {
            let mut state = lock(&self.shared);
            if let Some(previous) = state.listener.take() {
                previous.abort();
            }
            state.generation += 1;
            state.outgoing = Some(outgoing);

            let generation = state.generation;
            let weak = Arc::downgrade(&self.shared);
            state.listener = Some(tokio::spawn(listen(weak, incoming, generation)));

            std::mem::take(&mut state.pending)
        };

        if !stale.is_empty() {
            debug!(calls = stale.len(), "transport replaced with calls outstanding");
        }
        disconnect(stale);
    }
}

async fn listen(
    shared: Weak<Mutex<EndpointState>>,
    mut incoming: UnboundedReceiver<Message>,
    generation: u64,
) {
    while let Some(message) = incoming.recv().await {
        let Some(shared) = shared.upgrade() else {
            return;
        };

        match message {
            Message::Call { id, method, args } => {
                let handler = lock(&shared).exposed.get(&method).cloned();

                let answer = match handler {
                    Some(handler) => match handler(args).await {
                        Ok(value) => Message::Reply { id, value },
                        Err(error) => Message::Failure { id, error },
                    },
                    None => Message::Failure {
                        id,
                        error: format!("method `{}` is not exposed", method),
                    },
                };

                let outgoing = lock(&shared).outgoing.clone();
                match outgoing {
                    Some(outgoing) if outgoing.send(answer).is_ok() => {}
                    _ => warn!(id, method = %method, "dropping answer, transport is gone"),
                }
            }
            Message::Reply { id, value } => settle(&shared, id, Ok(value)),
            Message::Failure { id, error } => settle(&shared, id, Err(error)),
        }
    }

    // Peer hung up. Only the current listener may fail the pending calls.
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let pending = {
        let mut state = lock(&shared);
        if state.generation != generation {
            return;
        }
        state.outgoing = None;
        std::mem::take(&mut state.pending)
    };
    disconnect(pending);
}

fn disconnect(pending: HashMap<u64, PendingCall>) {
    for (_, call) in pending {
        let method = call.method;
        let _ = call.reply.send(Err(RpcError::Disconnected { method }));
    }
}

fn settle(shared: &Mutex<EndpointState>, id: u64, outcome: Result<Value, String>) {
    let Some(call) = lock(shared).pending.remove(&id) else {
        warn!(id, "answer for unknown call");
        return;
    };

    let result = outcome.map_err(|message| RpcError::Remote {
        method: call.method,
        message,
    });
    let _ = call.reply.send(result);
}
