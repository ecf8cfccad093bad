//! Routing of incoming calls to the code that serves them.
//!
//! A [`Handler`] turns one request [`Message`] into reply payload bytes.  The
//! [`ServiceRegistry`] is itself a handler: it looks up the handler
//! registered for the request's `(service, method)` pair and forwards to it.
//!
//! Handlers see the whole request, so they can read metadata and decode the
//! payload with whichever codec the header announces.  The reply is sent
//! with the request's serialize kind; a handler that answers in a different
//! format must encode accordingly.

use std::collections::HashMap;
use std::sync::Arc;

use lrpc_core::body::CodecError;
use lrpc_core::protocol::Message;
use thiserror::Error;

/// A failure reported back to the caller as an `Error` frame.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("unknown method {service}.{method}")]
    UnknownMethod { service: String, method: String },

    /// The request payload could not be decoded or encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other application-level failure.
    #[error("{0}")]
    Failed(String),
}

/// Serves calls for one or more methods.
///
/// Implementations run on the connection's thread and must be shareable
/// across connections.
#[cfg_attr(test, mockall::automock)]
pub trait Handler: Send + Sync {
    /// Produces the reply payload for `call`.
    fn handle(&self, call: &Message) -> Result<Vec<u8>, HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(&Message) -> Result<Vec<u8>, HandlerError> + Send + Sync,
{
    fn handle(&self, call: &Message) -> Result<Vec<u8>, HandlerError> {
        self(call)
    }
}

/// Table of handlers keyed by service and method name.
#[derive(Default)]
pub struct ServiceRegistry {
    methods: HashMap<(String, String), Arc<dyn Handler>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `service.method`, replacing any previous one.
    pub fn register<H>(&mut self, service: &str, method: &str, handler: H) -> &mut Self
    where
        H: Handler + 'static,
    {
        self.methods
            .insert((service.to_string(), method.to_string()), Arc::new(handler));
        self
    }

    pub fn contains(&self, service: &str, method: &str) -> bool {
        self.methods
            .contains_key(&(service.to_string(), method.to_string()))
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl Handler for ServiceRegistry {
    fn handle(&self, call: &Message) -> Result<Vec<u8>, HandlerError> {
        let key = (
            call.service_name().to_string(),
            call.service_method().to_string(),
        );
        match self.methods.get(&key) {
            Some(handler) => handler.handle(call),
            None => Err(HandlerError::UnknownMethod {
                service: key.0,
                method: key.1,
            }),
        }
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self
            .methods
            .keys()
            .map(|(service, method)| format!("{service}.{method}"))
            .collect();
        names.sort();
        f.debug_struct("ServiceRegistry")
            .field("methods", &names)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
