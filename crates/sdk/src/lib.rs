//! Waitline SDK - Rust Client Library
//!
//! Typed access to the Waitline queue daemon.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use waitline_sdk::{CreateQueueRequest, ParticipantSession, WaitlineClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(WaitlineClient::connect("http://127.0.0.1:9640").await?);
//!
//!     // Host opens a queue
//!     let created = client.create_queue(CreateQueueRequest::named("Barber")).await?;
//!
//!     // Participant joins it
//!     let mut session = ParticipantSession::new(client.clone());
//!     let joined = session.join(&created.queue.id, "Alice", None).await?;
//!     println!("Alice is number {}", joined.position);
//!
//!     // Host serves the head of the line
//!     let next = client
//!         .call_next(&created.queue.id, Some(created.host_token.as_str()))
//!         .await?;
//!     println!("Serving {:?}", next.person().map(|p| &p.name));
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod session;
mod types;

pub use client::{QueueWatcher, WaitlineClient};
pub use error::{code, Result, SdkError};
pub use session::{Membership, ParticipantSession};
pub use types::{
    CallNextOutcome, CreateQueueRequest, CreateQueueResponse, EndQueueResponse, JoinQueueRequest,
    JoinQueueResponse, Person, QueueEvent, QueueEventKind, QueueSnapshot, RemovalReason,
    RemovalResponse, WaitingPerson,
};
