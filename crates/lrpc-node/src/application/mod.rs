//! Application layer: what a node does with a call once it has been decoded.
//!
//! Nothing here touches sockets.  The network layer hands each request to a
//! [`dispatch::Handler`] and frames whatever comes back.
//!
//! - **`dispatch`** – the `Handler` seam and the `ServiceRegistry` that routes
//!   `service.method` names to handlers.
//!
//! - **`echo`** – the built-in service the `lrpc-node` binary serves.

pub mod dispatch;
pub mod echo;
