// Application Layer - Use Cases and Business Logic

pub mod broadcaster;
pub mod estimator;
pub mod guest_sweep;
pub mod notify;
pub mod queue_service;
pub mod router;

// Re-exports
pub use broadcaster::{Broadcaster, QueueChanged};
pub use estimator::WaitEstimator;
pub use guest_sweep::GuestSweeper;
pub use notify::NotificationService;
pub use queue_service::QueueService;
pub use router::QueueRouter;
