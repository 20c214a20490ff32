//! 실시간 레지스트리 모듈

pub mod broadcast;
pub mod connections;
pub mod presence;

pub use broadcast::BroadcastRouter;
pub use connections::ConnectionRegistry;
pub use presence::PresenceTracker;
