//! Infrastructure layer for an lrpc node.
//!
//! Contains OS-facing adapters: TCP sockets and file-system storage.
//!
//! **Dependency rule**: this layer may depend on `application` and `lrpc_core`,
//! but MUST NOT be imported by the `application` layer.

pub mod network;
pub mod storage;
