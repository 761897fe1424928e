//! RPC Method Handlers
//!
//! Translates JSON-RPC requests into engine calls and engine results back
//! into wire responses. Host-only methods check the host token first.

use crate::error::to_rpc_error;
use crate::types::{
    CallNextRequest, CallNextResponse, CreateQueueRequest, CreateQueueResponse, EndQueueRequest,
    EndQueueResponse, GetQueueRequest, JoinQueueRequest, JoinQueueResponse, LeaveQueueRequest,
    RemovalResponse, RemovePersonRequest,
};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use tracing::warn;
use waitline_core::application::{CallNextOutcome, JoinRequest, QueueEngine};
use waitline_core::domain::{NewQueue, QueueSnapshot};
use waitline_core::error::AppError;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    engine: Arc<QueueEngine>,
    require_host_token: bool,
}

impl RpcHandler {
    pub fn new(engine: Arc<QueueEngine>, require_host_token: bool) -> Self {
        Self {
            engine,
            require_host_token,
        }
    }

    /// queue.create.v1
    pub async fn create_queue(
        &self,
        params: CreateQueueRequest,
    ) -> Result<CreateQueueResponse, ErrorObjectOwned> {
        let fields = NewQueue {
            name: params.name,
            description: params.description.unwrap_or_default(),
            location: params.location.unwrap_or_default(),
            time_per_person: params.time_per_person,
        };

        let queue = self
            .engine
            .create_queue(fields)
            .await
            .map_err(to_rpc_error)?;

        Ok(CreateQueueResponse {
            queue: queue.snapshot(),
            host_token: queue.host_token,
        })
    }

    /// queue.join.v1
    pub async fn join_queue(
        &self,
        params: JoinQueueRequest,
    ) -> Result<JoinQueueResponse, ErrorObjectOwned> {
        let req = JoinRequest {
            queue_id: params.queue_id,
            name: params.name,
            contact_info: params.contact_info,
            join_key: params.join_key,
        };

        let outcome = self.engine.join_queue(req).await.map_err(to_rpc_error)?;

        Ok(JoinQueueResponse {
            success: true,
            person: outcome.person,
            position: outcome.position,
        })
    }

    /// queue.get.v1
    pub async fn get_queue(
        &self,
        params: GetQueueRequest,
    ) -> Result<QueueSnapshot, ErrorObjectOwned> {
        self.engine
            .get_queue(&params.queue_id)
            .await
            .map_err(to_rpc_error)
    }

    /// queue.call_next.v1
    pub async fn call_next(
        &self,
        params: CallNextRequest,
    ) -> Result<CallNextResponse, ErrorObjectOwned> {
        self.authorize_host(&params.queue_id, params.host_token.as_deref())
            .await?;

        let outcome = self
            .engine
            .call_next(&params.queue_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(match outcome {
            CallNextOutcome::Called(person) => CallNextResponse::Called { person },
            CallNextOutcome::Empty => CallNextResponse::Empty,
        })
    }

    /// queue.remove_person.v1
    pub async fn remove_person(
        &self,
        params: RemovePersonRequest,
    ) -> Result<RemovalResponse, ErrorObjectOwned> {
        self.authorize_host(&params.queue_id, params.host_token.as_deref())
            .await?;

        let removed = self
            .engine
            .remove_person(&params.queue_id, &params.person_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(RemovalResponse {
            removed: removed.is_some(),
        })
    }

    /// queue.leave.v1
    pub async fn leave_queue(
        &self,
        params: LeaveQueueRequest,
    ) -> Result<RemovalResponse, ErrorObjectOwned> {
        let removed = self
            .engine
            .leave_queue(&params.queue_id, &params.person_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(RemovalResponse {
            removed: removed.is_some(),
        })
    }

    /// queue.end.v1
    pub async fn end_queue(
        &self,
        params: EndQueueRequest,
    ) -> Result<EndQueueResponse, ErrorObjectOwned> {
        self.authorize_host(&params.queue_id, params.host_token.as_deref())
            .await?;

        let outcome = self
            .engine
            .end_queue(&params.queue_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(EndQueueResponse {
            ended: true,
            queue: outcome.queue.snapshot(),
        })
    }

    /// Reject host-only calls that lack the queue's host token
    ///
    /// The token never changes after creation, so reading it outside the
    /// queue lock is safe.
    async fn authorize_host(
        &self,
        queue_id: &str,
        host_token: Option<&str>,
    ) -> Result<(), ErrorObjectOwned> {
        if !self.require_host_token {
            return Ok(());
        }

        let queue = self.engine.load(queue_id).await.map_err(to_rpc_error)?;
        match host_token {
            Some(token) if queue.verify_host(token) => Ok(()),
            Some(_) => {
                warn!(queue_id = %queue_id, "Rejected host call with wrong token");
                Err(to_rpc_error(AppError::Unauthorized(format!(
                    "Invalid host token for queue {}",
                    queue_id
                ))))
            }
            None => Err(to_rpc_error(AppError::Unauthorized(format!(
                "Host token required for queue {}",
                queue_id
            )))),
        }
    }
}
