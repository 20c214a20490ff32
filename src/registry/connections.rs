//! 연결 레지스트리

use crate::model::{ConnectionId, UserId};
use crate::protocol::ServerMessage;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use tokio::sync::mpsc::UnboundedSender;

/// 라이브 연결 정보
pub struct Connection {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub sender: UnboundedSender<ServerMessage>,
    pub connected_at: DateTime<Utc>,
}

/// 사용자 ↔ 라이브 연결 양방향 레지스트리
#[derive(Default)]
pub struct ConnectionRegistry {
    /// connection_id -> Connection
    connections: DashMap<ConnectionId, Connection>,
    /// user_id -> 연결 집합
    user_connections: DashMap<UserId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    /// 연결 등록 (멱등)
    pub fn register(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        sender: UnboundedSender<ServerMessage>,
    ) {
        let prev = self.connections.insert(
            connection_id,
            Connection {
                id: connection_id,
                user_id,
                sender,
                connected_at: Utc::now(),
            },
        );

        // 다른 사용자에 묶여 있던 연결이면 이전 매핑을 정리
        if let Some(prev) = prev {
            if prev.user_id != user_id {
                if let Some(mut set) = self.user_connections.get_mut(&prev.user_id) {
                    set.remove(&connection_id);
                }
            }
        }

        self.user_connections
            .entry(user_id)
            .or_default()
            .insert(connection_id);
    }

    /// 연결 제거. 사용자의 마지막 연결이었다면 해당 사용자를 반환한다
    /// (호출자가 프레즌스 캐스케이드를 수행한다)
    pub fn remove(&self, connection_id: ConnectionId) -> Option<UserId> {
        let (_, conn) = self.connections.remove(&connection_id)?;

        let went_offline = match self.user_connections.get_mut(&conn.user_id) {
            Some(mut set) => {
                set.remove(&connection_id);
                set.is_empty()
            }
            None => false,
        };

        if went_offline {
            self.user_connections.remove(&conn.user_id);
            Some(conn.user_id)
        } else {
            None
        }
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.user_connections
            .get(&user_id)
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    }

    /// 연결의 소유 사용자 조회
    pub fn user_of(&self, connection_id: ConnectionId) -> Option<UserId> {
        self.connections.get(&connection_id).map(|c| c.user_id)
    }

    pub fn connections_of(&self, user_id: UserId) -> HashSet<ConnectionId> {
        self.user_connections
            .get(&user_id)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// 사용자의 모든 라이브 송신 채널
    pub fn senders_of(&self, user_id: UserId) -> Vec<UnboundedSender<ServerMessage>> {
        self.connections_of(user_id)
            .into_iter()
            .filter_map(|id| self.connections.get(&id).map(|c| c.sender.clone()))
            .collect()
    }
}
