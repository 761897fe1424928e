//! Simple SDK Example
//!
//! Walks one queue from opening to closing.
//!
//! # Usage
//!
//! 1. Start the daemon:
//!    ```bash
//!    WAITLINE_STORE=memory cargo run --package waitline-daemon
//!    ```
//!
//! 2. Run this example:
//!    ```bash
//!    cargo run --example simple
//!    ```

use std::sync::Arc;
use waitline_sdk::{CallNextOutcome, CreateQueueRequest, ParticipantSession, WaitlineClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Waitline SDK - Simple Example");
    println!("=============================\n");

    // 1. Connect to daemon
    let client = Arc::new(WaitlineClient::connect("http://127.0.0.1:9640").await?);

    // 2. Open a queue
    let created = client
        .create_queue(CreateQueueRequest {
            time_per_person: Some(15),
            location: Some("Main St 12".to_string()),
            ..CreateQueueRequest::named("Barber")
        })
        .await?;
    let queue_id = created.queue.id.clone();
    let host_token = created.host_token.clone();
    println!("Opened queue {}\n", queue_id);

    // 3. Two participants join
    let mut alice = ParticipantSession::new(client.clone());
    let mut bob = ParticipantSession::new(client.clone());
    println!("Alice -> #{}", alice.join(&queue_id, "Alice", None).await?.position);
    println!("Bob   -> #{}", bob.join(&queue_id, "Bob", None).await?.position);

    // 4. Host calls the next person
    if let CallNextOutcome::Called { person } =
        client.call_next(&queue_id, Some(host_token.as_str())).await?
    {
        println!("\nNow serving {}", person.name);
    }
    println!("Bob is now #{:?}", bob.position().await?);

    // 5. Bob gives up, host closes
    bob.leave().await?;
    let closed = client.end_queue(&queue_id, Some(host_token.as_str())).await?;
    println!("\nQueue closed with {} waiting", closed.people.len());

    // Mutations on an ended queue are refused with a distinct error
    if let Err(e) = alice.leave().await {
        println!("Alice leave after close: {} (queue closed: {})", e, e.is_queue_closed());
    }

    Ok(())
}
