//! JSON-RPC API Layer
//!
//! Exposes the queue engine as JSON-RPC 2.0 methods over HTTP and WebSocket,
//! plus a per-queue event subscription.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
