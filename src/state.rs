//! 애플리케이션 상태 관리

use crate::config::Config;
use crate::meeting::{KeyedLocks, ParticipantManager, RecordingManager, RoomManager, SessionManager};
use crate::registry::{BroadcastRouter, ConnectionRegistry, PresenceTracker};
use crate::store::Stores;
use std::sync::Arc;

/// 전역 애플리케이션 상태. 프로세스 시작 시 한 번 구성된다
pub struct AppState {
    pub config: Arc<Config>,
    pub stores: Arc<Stores>,
    pub connections: Arc<ConnectionRegistry>,
    pub presence: Arc<PresenceTracker>,
    pub broadcast: Arc<BroadcastRouter>,
    pub rooms: Arc<RoomManager>,
    pub sessions: Arc<SessionManager>,
    pub participants: Arc<ParticipantManager>,
    pub recordings: Arc<RecordingManager>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let stores = Arc::new(Stores::default());

        let connections = Arc::new(ConnectionRegistry::default());
        let presence = Arc::new(PresenceTracker::new(stores.clone()));
        let broadcast = Arc::new(BroadcastRouter::new(
            connections.clone(),
            presence.clone(),
            stores.clone(),
        ));

        let session_locks = Arc::new(KeyedLocks::default());
        let room_locks = Arc::new(KeyedLocks::default());
        let space_locks = Arc::new(KeyedLocks::default());

        let participants = Arc::new(ParticipantManager::new(
            stores.clone(),
            broadcast.clone(),
            session_locks.clone(),
        ));
        let recordings = Arc::new(RecordingManager::new(
            stores.clone(),
            broadcast.clone(),
            session_locks.clone(),
        ));
        let sessions = Arc::new(SessionManager::new(
            stores.clone(),
            broadcast.clone(),
            session_locks,
            room_locks,
            participants.clone(),
            recordings.clone(),
        ));
        let rooms = Arc::new(RoomManager::new(stores.clone(), space_locks));

        Self {
            config,
            stores,
            connections,
            presence,
            broadcast,
            rooms,
            sessions,
            participants,
            recordings,
        }
    }
}
