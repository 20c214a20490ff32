//! 이벤트 브로드캐스트 라우터

use crate::model::{ParticipantStatus, SessionId, SpaceId, UserId};
use crate::protocol::ServerMessage;
use crate::registry::{ConnectionRegistry, PresenceTracker};
use crate::store::Stores;
use std::sync::Arc;

/// 상태 전이 이벤트를 대상 청중의 라이브 연결로 전달한다.
/// 전달은 best-effort, 연결당 최대 1회, 재시도 없음
pub struct BroadcastRouter {
    connections: Arc<ConnectionRegistry>,
    presence: Arc<PresenceTracker>,
    stores: Arc<Stores>,
}

impl BroadcastRouter {
    pub fn new(
        connections: Arc<ConnectionRegistry>,
        presence: Arc<PresenceTracker>,
        stores: Arc<Stores>,
    ) -> Self {
        Self {
            connections,
            presence,
            stores,
        }
    }

    /// 사용자의 모든 라이브 연결로 전달. 오프라인이면 조용히 무시
    pub fn to_user(&self, user_id: UserId, message: &ServerMessage) {
        for sender in self.connections.senders_of(user_id) {
            let _ = sender.send(message.clone());
        }
    }

    /// 공간 멤버 전체에 전달
    pub fn to_space(&self, space_id: SpaceId, message: &ServerMessage) {
        for user_id in self.presence.members_of_space(space_id) {
            self.to_user(user_id, message);
        }
    }

    /// 세션 청중(joined 참가자)에게 전달
    pub fn to_session_audience(&self, session_id: SessionId, message: &ServerMessage) {
        for participant in self.stores.participants.find_by_session(session_id) {
            if participant.status == ParticipantStatus::Joined {
                self.to_user(participant.user_id, message);
            }
        }
    }

    /// 라이프사이클 이벤트용: 종결되지 않은 참가자 행 전체에 전달
    pub fn to_session_lifecycle(&self, session_id: SessionId, message: &ServerMessage) {
        for participant in self.stores.participants.find_by_session(session_id) {
            if participant.status != ParticipantStatus::Left {
                self.to_user(participant.user_id, message);
            }
        }
    }

    /// 미리 떠 둔 사용자 스냅샷에 전달 (캐스케이드 이후의 라이프사이클 통지용)
    pub fn to_users(&self, users: &[UserId], message: &ServerMessage) {
        for user_id in users {
            self.to_user(*user_id, message);
        }
    }
}
