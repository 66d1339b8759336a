//! RPC Method Handlers
//!
//! Thin adapters from JSON-RPC params to the queue service.

use crate::error::{throttled, to_rpc_error};
use crate::rate_limiter::RateLimiter;
use crate::types::*;
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use waitline_core::application::queue_service::{CreateQueueRequest, JoinRequest};
use waitline_core::application::{Broadcaster, QueueService};
use waitline_core::domain::QueueEdit;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    service: Arc<QueueService>,
    broadcaster: Arc<Broadcaster>,
    rate_limiter: RateLimiter,
}

impl RpcHandler {
    pub fn new(service: Arc<QueueService>, broadcaster: Arc<Broadcaster>) -> Self {
        // Default: 200 burst, 100 req/sec (configurable via env)
        let max_burst: u32 = std::env::var("WAITLINE_RATE_LIMIT_BURST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(200);

        let rate_per_sec: u32 = std::env::var("WAITLINE_RATE_LIMIT_RATE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        Self {
            service,
            broadcaster,
            rate_limiter: RateLimiter::new(max_burst, rate_per_sec),
        }
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    fn check_rate(&self) -> Result<(), ErrorObjectOwned> {
        if self.rate_limiter.try_acquire() {
            Ok(())
        } else {
            Err(throttled())
        }
    }

    /// queue.create.v1
    pub async fn create(
        &self,
        params: CreateQueueRpcRequest,
    ) -> Result<CreateQueueResponse, ErrorObjectOwned> {
        self.check_rate()?;

        let queue = self
            .service
            .create_queue(CreateQueueRequest {
                owner_id: params.owner_id,
                name: params.name,
                description: params.description,
                max_capacity: params.max_capacity,
                max_party_size: params.max_party_size,
                est_service_minutes: params.est_service_minutes,
            })
            .await
            .map_err(to_rpc_error)?;

        Ok(CreateQueueResponse {
            queue_id: queue.id,
            join_code: queue.join_code,
        })
    }

    /// queue.lookup.v1
    pub async fn lookup(&self, params: LookupRequest) -> Result<LookupResponse, ErrorObjectOwned> {
        let summary = self
            .service
            .lookup(&params.code)
            .await
            .map_err(to_rpc_error)?;

        Ok(LookupResponse {
            queue: summary.queue.into(),
            estimated_wait_minutes: summary.estimated_wait_minutes,
        })
    }

    /// queue.join.v1
    pub async fn join(&self, params: JoinRpcRequest) -> Result<JoinResponse, ErrorObjectOwned> {
        self.check_rate()?;

        let entry = self
            .service
            .join(JoinRequest {
                queue_id: params.queue_id,
                party_size: params.party_size,
                notification_preference: params.notification_preference,
                joiner: params.joiner,
            })
            .await
            .map_err(to_rpc_error)?;

        Ok(entry.into())
    }

    /// queue.position.v1
    pub async fn position(
        &self,
        params: PositionRequest,
    ) -> Result<PositionResponse, ErrorObjectOwned> {
        let view = self
            .service
            .position(&params.entry_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(PositionResponse {
            entry_id: view.entry.id.clone(),
            status: view.entry.status.to_string(),
            current_rank: view.current_rank,
            people_ahead: view.people_ahead,
            estimated_wait_minutes: view.estimated_wait_minutes,
        })
    }

    /// queue.call_next.v1
    pub async fn call_next(
        &self,
        params: CallNextRequest,
    ) -> Result<CallNextResponse, ErrorObjectOwned> {
        self.check_rate()?;

        let entry = self
            .service
            .call_next(&params.queue_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(CallNextResponse {
            entry_id: entry.id,
            person_id: entry.person_id,
            position_number: entry.position_number,
        })
    }

    /// queue.serve.v1
    pub async fn serve(&self, params: EntryActionRequest) -> Result<AckResponse, ErrorObjectOwned> {
        self.check_rate()?;
        self.service
            .mark_served(&params.queue_id, &params.entry_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(AckResponse::ok())
    }

    /// queue.no_show.v1
    pub async fn no_show(
        &self,
        params: EntryActionRequest,
    ) -> Result<AckResponse, ErrorObjectOwned> {
        self.check_rate()?;
        self.service
            .mark_no_show(&params.queue_id, &params.entry_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(AckResponse::ok())
    }

    /// queue.arrived.v1
    pub async fn arrived(
        &self,
        params: EntryActionRequest,
    ) -> Result<AckResponse, ErrorObjectOwned> {
        self.check_rate()?;
        self.service
            .mark_arrived(&params.queue_id, &params.entry_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(AckResponse::ok())
    }

    /// queue.leave.v1
    pub async fn leave(&self, params: LeaveRequest) -> Result<AckResponse, ErrorObjectOwned> {
        self.check_rate()?;
        self.service
            .leave(&params.entry_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(AckResponse::ok())
    }

    /// queue.edit.v1
    pub async fn edit(&self, params: EditRpcRequest) -> Result<AckResponse, ErrorObjectOwned> {
        self.check_rate()?;
        self.service
            .edit(
                &params.queue_id,
                QueueEdit {
                    name: params.name,
                    description: params.description,
                    status: params.status,
                    max_capacity: params.max_capacity,
                    max_party_size: params.max_party_size,
                    est_service_minutes: params.est_service_minutes,
                },
            )
            .await
            .map_err(to_rpc_error)?;
        Ok(AckResponse::ok())
    }

    /// queue.close.v1
    pub async fn close(&self, params: CloseRequest) -> Result<AckResponse, ErrorObjectOwned> {
        self.check_rate()?;
        self.service
            .close(&params.queue_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(AckResponse::ok())
    }

    /// queue.list.v1
    pub async fn list(&self) -> Result<QueueListResponse, ErrorObjectOwned> {
        let queues = self.service.list_open().await.map_err(to_rpc_error)?;
        Ok(QueueListResponse {
            queues: queues.into_iter().map(Into::into).collect(),
        })
    }

    /// queue.search.v1
    pub async fn search(&self, params: SearchRequest) -> Result<QueueListResponse, ErrorObjectOwned> {
        let queues = self
            .service
            .search(&params.term)
            .await
            .map_err(to_rpc_error)?;
        Ok(QueueListResponse {
            queues: queues.into_iter().map(Into::into).collect(),
        })
    }

    /// queue.by_owner.v1
    pub async fn by_owner(
        &self,
        params: OwnerQueuesRequest,
    ) -> Result<QueueListResponse, ErrorObjectOwned> {
        let queues = self
            .service
            .queues_by_owner(&params.owner_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(QueueListResponse {
            queues: queues.into_iter().map(Into::into).collect(),
        })
    }
}
