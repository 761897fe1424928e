//! Waitline Client Implementation

use crate::error::{Result, SdkError};
use crate::types::{
    CallNextOutcome, CreateQueueRequest, CreateQueueResponse, EndQueueResponse, JoinQueueRequest,
    JoinQueueResponse, QueueEvent, QueueSnapshot, RemovalResponse,
};
use jsonrpsee::core::client::{ClientT, Subscription, SubscriptionClientT};
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use serde_json::json;
use std::time::Duration;

/// Waitline Client
///
/// Stateless request/response access to every queue method. Host-only
/// calls take the token returned by [`WaitlineClient::create_queue`].
///
/// # Example
///
/// ```no_run
/// use waitline_sdk::{CreateQueueRequest, WaitlineClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = WaitlineClient::connect("http://127.0.0.1:9640").await?;
/// let created = client.create_queue(CreateQueueRequest::named("Barber")).await?;
/// println!("Queue {} opened", created.queue.id);
/// # Ok(())
/// # }
/// ```
pub struct WaitlineClient {
    client: HttpClient,
}

impl WaitlineClient {
    /// Connect to the Waitline daemon
    ///
    /// # Arguments
    ///
    /// * `url` - RPC endpoint URL (e.g., `http://127.0.0.1:9640`)
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();

        let client = HttpClientBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .build(url)
            .map_err(|e| SdkError::Connection(format!("Failed to create client: {}", e)))?;

        Ok(Self { client })
    }

    /// Open a queue
    pub async fn create_queue(&self, request: CreateQueueRequest) -> Result<CreateQueueResponse> {
        let params = rpc_params![request];
        let response: CreateQueueResponse =
            self.client.request("queue.create.v1", params).await?;

        Ok(response)
    }

    /// Join a queue
    ///
    /// Retrying with the same `join_key` returns the original entry instead
    /// of adding a second one.
    pub async fn join_queue(&self, request: JoinQueueRequest) -> Result<JoinQueueResponse> {
        let params = rpc_params![request];
        let response: JoinQueueResponse = self.client.request("queue.join.v1", params).await?;

        Ok(response)
    }

    /// Fetch a queue snapshot with positions
    pub async fn get_queue(&self, queue_id: impl Into<String>) -> Result<QueueSnapshot> {
        let params = rpc_params![json!({ "queue_id": queue_id.into() })];
        let response: QueueSnapshot = self.client.request("queue.get.v1", params).await?;

        Ok(response)
    }

    /// Call the next person; `Empty` when nobody waits
    pub async fn call_next(
        &self,
        queue_id: impl Into<String>,
        host_token: Option<&str>,
    ) -> Result<CallNextOutcome> {
        let params = rpc_params![json!({
            "queue_id": queue_id.into(),
            "host_token": host_token,
        })];
        let response: CallNextOutcome = self.client.request("queue.call_next.v1", params).await?;

        Ok(response)
    }

    /// Remove a person as host; `false` if they were already gone
    pub async fn remove_person(
        &self,
        queue_id: impl Into<String>,
        person_id: impl Into<String>,
        host_token: Option<&str>,
    ) -> Result<bool> {
        let params = rpc_params![json!({
            "queue_id": queue_id.into(),
            "person_id": person_id.into(),
            "host_token": host_token,
        })];
        let response: RemovalResponse =
            self.client.request("queue.remove_person.v1", params).await?;

        Ok(response.removed)
    }

    /// Leave a queue as participant; `false` if already out
    pub async fn leave_queue(
        &self,
        queue_id: impl Into<String>,
        person_id: impl Into<String>,
    ) -> Result<bool> {
        let params = rpc_params![json!({
            "queue_id": queue_id.into(),
            "person_id": person_id.into(),
        })];
        let response: RemovalResponse = self.client.request("queue.leave.v1", params).await?;

        Ok(response.removed)
    }

    /// End a queue; ending twice is not an error
    pub async fn end_queue(
        &self,
        queue_id: impl Into<String>,
        host_token: Option<&str>,
    ) -> Result<QueueSnapshot> {
        let params = rpc_params![json!({
            "queue_id": queue_id.into(),
            "host_token": host_token,
        })];
        let response: EndQueueResponse = self.client.request("queue.end.v1", params).await?;

        Ok(response.queue)
    }
}

/// WebSocket connection for queue event streams
pub struct QueueWatcher {
    client: WsClient,
}

impl QueueWatcher {
    /// # Arguments
    ///
    /// * `url` - WebSocket endpoint (e.g., `ws://127.0.0.1:9640`)
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();

        let client = WsClientBuilder::default()
            .build(url)
            .await
            .map_err(|e| SdkError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        Ok(Self { client })
    }

    /// Stream events for one queue; the stream stops after `closed`
    pub async fn watch(&self, queue_id: impl Into<String>) -> Result<Subscription<QueueEvent>> {
        let params = rpc_params![json!({ "queue_id": queue_id.into() })];
        let subscription = self
            .client
            .subscribe("queue.subscribe.v1", params, "queue.unsubscribe.v1")
            .await?;

        Ok(subscription)
    }
}
