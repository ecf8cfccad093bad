//! lrpc-node library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.

pub mod application;
pub mod infrastructure;

pub use application::dispatch::{Handler, HandlerError, ServiceRegistry};
pub use infrastructure::network::client::{Client, ClientError, Reply};
pub use infrastructure::network::connection::Connection;
pub use infrastructure::network::server::{Server, ServerError};
pub use infrastructure::storage::config::{load_config, save_config, ConfigError, NodeConfig};
