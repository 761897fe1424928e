//! JSON-RPC Server
//!
//! Serves the queue methods over HTTP and WebSocket on one TCP port.
//! Subscriptions need a WebSocket connection.

use crate::handler::RpcHandler;
use crate::types::{
    CallNextRequest, CreateQueueRequest, EndQueueRequest, GetQueueRequest, JoinQueueRequest,
    LeaveQueueRequest, RemovePersonRequest, SubscribeRequest,
};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::{ErrorObjectOwned, Params};
use jsonrpsee::core::SubscriptionResult;
use jsonrpsee::{PendingSubscriptionSink, RpcModule, SubscriptionMessage};
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};
use waitline_core::application::{QueueEngine, QueueEventHub};
use waitline_core::domain::QueueEventKind;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9640;

pub const SUBSCRIBE_METHOD: &str = "queue.subscribe.v1";
pub const UNSUBSCRIBE_METHOD: &str = "queue.unsubscribe.v1";
pub const EVENT_NOTIFICATION: &str = "queue.event";

/// Parse the single request object
///
/// Accepts it bare (`"params": {..}`) or as the only positional entry
/// (`"params": [{..}]`).
fn parse_params<T: DeserializeOwned>(params: &Params<'_>) -> Result<T, ErrorObjectOwned> {
    if params.is_object() {
        params.parse()
    } else {
        params.one()
    }
}

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
    /// Host-only methods demand the token issued by queue.create.v1
    pub require_host_token: bool,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
            require_host_token: true,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
    events: Arc<QueueEventHub>,
}

impl RpcServer {
    pub fn new(
        config: RpcServerConfig,
        engine: Arc<QueueEngine>,
        events: Arc<QueueEventHub>,
    ) -> Self {
        let handler = Arc::new(RpcHandler::new(engine, config.require_host_token));
        Self {
            config,
            handler,
            events,
        }
    }

    /// Start the JSON-RPC server
    ///
    /// Returns the bound address too, so port 0 can be used in tests.
    pub async fn start(self) -> Result<(ServerHandle, SocketAddr), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            require_host_token = self.config.require_host_token,
            "Starting JSON-RPC server"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let module = self.build_module()?;

        info!(addr = %local_addr, "JSON-RPC server started successfully");

        let handle = server.start(module);
        Ok((handle, local_addr))
    }

    /// Register every queue method on a fresh module
    pub fn build_module(&self) -> Result<RpcModule<()>, String> {
        let mut module = RpcModule::new(());

        let handler = self.handler.clone();
        module
            .register_async_method("queue.create.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: CreateQueueRequest = parse_params(&params)?;
                    handler.create_queue(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.join.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: JoinQueueRequest = parse_params(&params)?;
                    handler.join_queue(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.get.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: GetQueueRequest = parse_params(&params)?;
                    handler.get_queue(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.call_next.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: CallNextRequest = parse_params(&params)?;
                    handler.call_next(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.remove_person.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: RemovePersonRequest = parse_params(&params)?;
                    handler.remove_person(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.leave.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: LeaveQueueRequest = parse_params(&params)?;
                    handler.leave_queue(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.end.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: EndQueueRequest = parse_params(&params)?;
                    handler.end_queue(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        // Event stream, ends after the queue's `closed` event
        let handler = self.handler.clone();
        let events = self.events.clone();
        module
            .register_subscription(
                SUBSCRIBE_METHOD,
                EVENT_NOTIFICATION,
                UNSUBSCRIBE_METHOD,
                move |params, pending, _, _| {
                    stream_queue_events(handler.clone(), events.clone(), params, pending)
                },
            )
            .map_err(|e| e.to_string())?;

        Ok(module)
    }
}

/// Forward one queue's events to a subscriber
async fn stream_queue_events(
    handler: Arc<RpcHandler>,
    events: Arc<QueueEventHub>,
    params: Params<'static>,
    pending: PendingSubscriptionSink,
) -> SubscriptionResult {
    let req: SubscribeRequest = match parse_params(&params) {
        Ok(req) => req,
        Err(e) => {
            pending.reject(e).await;
            return Ok(());
        }
    };

    // Subscribe before reading so no event slips between the two
    let mut subscription = events.subscribe(req.queue_id.clone());
    let snapshot = match handler
        .get_queue(GetQueueRequest {
            queue_id: req.queue_id.clone(),
        })
        .await
    {
        Ok(snapshot) => snapshot,
        Err(e) => {
            pending.reject(e).await;
            return Ok(());
        }
    };

    let sink = pending.accept().await?;
    debug!(queue_id = %req.queue_id, "Queue subscriber attached");
    if !snapshot.is_active {
        return Ok(());
    }

    loop {
        tokio::select! {
            _ = sink.closed() => break,
            event = subscription.recv() => {
                let Some(event) = event else { break };
                let closed = matches!(event.kind, QueueEventKind::Closed);
                let message = SubscriptionMessage::from_json(&event)?;
                sink.send(message).await?;
                if closed {
                    break;
                }
            }
        }
    }

    debug!(queue_id = %req.queue_id, "Queue subscriber detached");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallNextResponse, CreateQueueResponse, JoinQueueResponse};
    use jsonrpsee::core::client::{ClientT, SubscriptionClientT};
    use jsonrpsee::rpc_params;
    use jsonrpsee::ws_client::WsClientBuilder;
    use std::time::Duration;
    use waitline_core::domain::QueueEvent;
    use waitline_core::port::id_provider::mocks::SequentialIdProvider;
    use waitline_core::port::time_provider::mocks::ManualClock;
    use waitline_infra_memory::InMemoryQueueStore;

    fn server(require_host_token: bool) -> RpcServer {
        let events = Arc::new(QueueEventHub::default());
        let engine = QueueEngine::new(
            Arc::new(InMemoryQueueStore::new(Duration::from_secs(2))),
            Arc::new(SequentialIdProvider::new()),
            Arc::new(ManualClock::ticking(1_000, 10)),
            events.clone(),
        );
        let config = RpcServerConfig {
            port: 0,
            require_host_token,
            ..Default::default()
        };
        RpcServer::new(config, Arc::new(engine), events)
    }

    #[tokio::test]
    async fn test_module_registers_all_methods() {
        let module = server(true).build_module().unwrap();
        let names: Vec<&str> = module.method_names().collect();

        for method in [
            "queue.create.v1",
            "queue.join.v1",
            "queue.get.v1",
            "queue.call_next.v1",
            "queue.remove_person.v1",
            "queue.leave.v1",
            "queue.end.v1",
            SUBSCRIBE_METHOD,
            UNSUBSCRIBE_METHOD,
        ] {
            assert!(names.contains(&method), "missing {}", method);
        }
    }

    #[tokio::test]
    async fn test_in_process_call() {
        let module = server(false).build_module().unwrap();

        let created: serde_json::Value = module
            .call("queue.create.v1", [serde_json::json!({"name": "Barber"})])
            .await
            .unwrap();
        let queue_id = created["queue"]["id"].as_str().unwrap().to_string();

        let next: serde_json::Value = module
            .call(
                "queue.call_next.v1",
                [serde_json::json!({"queue_id": queue_id})],
            )
            .await
            .unwrap();
        assert_eq!(next["status"], "empty");
    }

    #[tokio::test]
    async fn test_subscription_streams_until_closed() {
        let (handle, addr) = server(true).start().await.unwrap();
        let client = WsClientBuilder::default()
            .build(format!("ws://{}", addr))
            .await
            .unwrap();

        let created: CreateQueueResponse = client
            .request("queue.create.v1", rpc_params![serde_json::json!({"name": "Barber"})])
            .await
            .unwrap();
        let queue_id = created.queue.id.clone();

        let mut subscription = client
            .subscribe::<QueueEvent, _>(
                SUBSCRIBE_METHOD,
                rpc_params![serde_json::json!({"queue_id": queue_id})],
                UNSUBSCRIBE_METHOD,
            )
            .await
            .unwrap();

        let joined: JoinQueueResponse = client
            .request(
                "queue.join.v1",
                rpc_params![serde_json::json!({"queue_id": queue_id, "name": "Alice"})],
            )
            .await
            .unwrap();
        assert_eq!(joined.position, 1);

        let next: CallNextResponse = client
            .request(
                "queue.call_next.v1",
                rpc_params![serde_json::json!({
                    "queue_id": queue_id,
                    "host_token": created.host_token,
                })],
            )
            .await
            .unwrap();
        assert!(matches!(next, CallNextResponse::Called { .. }));

        client
            .request::<serde_json::Value, _>(
                "queue.end.v1",
                rpc_params![serde_json::json!({
                    "queue_id": queue_id,
                    "host_token": created.host_token,
                })],
            )
            .await
            .unwrap();

        let mut kinds = Vec::new();
        for _ in 0..3 {
            let event = tokio::time::timeout(Duration::from_secs(5), subscription.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            kinds.push(event.kind);
        }
        assert!(matches!(kinds[0], QueueEventKind::PersonJoined { position: 1, .. }));
        assert!(matches!(kinds[1], QueueEventKind::PersonCalled { .. }));
        assert_eq!(kinds[2], QueueEventKind::Closed);

        handle.stop().unwrap();
    }
}
