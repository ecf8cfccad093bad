//! The built-in `echo` service.
//!
//! Useful for smoke-testing a deployment with the bundled client:
//!
//! - `echo.Echo` returns the request payload unchanged.
//! - `echo.Reverse` returns the payload bytes in reverse order.

use lrpc_core::protocol::Message;

use crate::application::dispatch::{HandlerError, ServiceRegistry};

pub const SERVICE_NAME: &str = "echo";

pub fn echo(call: &Message) -> Result<Vec<u8>, HandlerError> {
    Ok(call.data().to_vec())
}

pub fn reverse(call: &Message) -> Result<Vec<u8>, HandlerError> {
    let mut data = call.data().to_vec();
    data.reverse();
    Ok(data)
}

/// Adds the echo methods to `registry`.
pub fn register(registry: &mut ServiceRegistry) {
    registry
        .register(SERVICE_NAME, "Echo", echo)
        .register(SERVICE_NAME, "Reverse", reverse);
}
