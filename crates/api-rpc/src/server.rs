//! JSON-RPC Server
//!
//! Serves the queue methods over TCP on localhost, plus live
//! queue-changed subscriptions fed by the broadcaster.

use crate::handler::RpcHandler;
use crate::types::{
    CallNextRequest, CloseRequest, CreateQueueRpcRequest, EditRpcRequest, EntryActionRequest,
    JoinRpcRequest, LeaveRequest, LookupRequest, OwnerQueuesRequest, PositionRequest,
    SearchRequest, SubscribeRequest,
};
use jsonrpsee::core::StringError;
use jsonrpsee::server::{Server, ServerHandle, SubscriptionMessage};
use jsonrpsee::RpcModule;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9630;

/// RPC Server Configuration
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: RpcHandler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    /// Start the JSON-RPC server.
    ///
    /// Security: only binds to localhost, no external access.
    pub async fn start(self) -> Result<ServerHandle, String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server on TCP (localhost only)"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;

        let mut module = RpcModule::new(());

        // Reads
        let handler = self.handler.clone();
        module
            .register_async_method("queue.lookup.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: LookupRequest = params.parse()?;
                    handler.lookup(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.position.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: PositionRequest = params.parse()?;
                    handler.position(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.list.v1", move |_params, _, _| {
                let handler = handler.clone();
                async move { handler.list().await }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.search.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: SearchRequest = params.parse()?;
                    handler.search(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.by_owner.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: OwnerQueuesRequest = params.parse()?;
                    handler.by_owner(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        // Mutations
        let handler = self.handler.clone();
        module
            .register_async_method("queue.create.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: CreateQueueRpcRequest = params.parse()?;
                    handler.create(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.join.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: JoinRpcRequest = params.parse()?;
                    handler.join(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.leave.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: LeaveRequest = params.parse()?;
                    handler.leave(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.call_next.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: CallNextRequest = params.parse()?;
                    handler.call_next(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.serve.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: EntryActionRequest = params.parse()?;
                    handler.serve(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.no_show.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: EntryActionRequest = params.parse()?;
                    handler.no_show(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.arrived.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: EntryActionRequest = params.parse()?;
                    handler.arrived(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.edit.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: EditRpcRequest = params.parse()?;
                    handler.edit(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.close.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: CloseRequest = params.parse()?;
                    handler.close(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        // Subscriptions: per-queue when queue_id is given, global otherwise.
        // Subscribers only receive the queue id and re-fetch state.
        let handler = self.handler.clone();
        module
            .register_subscription(
                "queue.subscribe.v1",
                "queue.changed.v1",
                "queue.unsubscribe.v1",
                move |params, pending, _, _| {
                    let handler = handler.clone();
                    async move {
                        let req: SubscribeRequest = params.parse().unwrap_or_default();
                        let mut rx = match &req.queue_id {
                            Some(queue_id) => handler.broadcaster().subscribe_queue(queue_id),
                            None => handler.broadcaster().subscribe_global(),
                        };

                        let sink = pending.accept().await?;
                        loop {
                            match rx.recv().await {
                                Ok(event) => {
                                    let msg = SubscriptionMessage::from_json(&event)?;
                                    if sink.send(msg).await.is_err() {
                                        break; // subscriber went away
                                    }
                                }
                                // Skipped events are fine; subscribers
                                // re-fetch state anyway
                                Err(RecvError::Lagged(_)) => continue,
                                Err(RecvError::Closed) => break,
                            }
                        }
                        Ok::<(), StringError>(())
                    }
                },
            )
            .map_err(|e| e.to_string())?;

        info!("JSON-RPC server started successfully");

        let handle = server.start(module);
        Ok(handle)
    }
}
