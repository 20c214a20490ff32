//! 연결 핸들러

use crate::error::{CoreError, CoreResult};
use crate::model::{ConnectionId, UserId};
use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// 새 연결 처리. 연결 식별자를 발급하고 핸드셰이크 응답을 보낸다
pub fn handle_connection(sender: &UnboundedSender<ServerMessage>) -> ConnectionId {
    let connection_id = Uuid::new_v4();

    let _ = sender.send(ServerMessage::Connected { connection_id });

    tracing::info!(connection_id = %connection_id, "New connection established");
    connection_id
}

/// connect 이벤트: 연결을 사용자에 바인딩한다 (멱등)
pub fn handle_connect(
    state: &Arc<AppState>,
    connection_id: ConnectionId,
    user_id: UserId,
    sender: &UnboundedSender<ServerMessage>,
) -> CoreResult<()> {
    state
        .stores
        .users
        .find_by_id(user_id)
        .ok_or(CoreError::NotFound("user"))?;

    state
        .connections
        .register(user_id, connection_id, sender.clone());
    state.broadcast.to_user(
        user_id,
        &ServerMessage::UserConnected {
            user_id,
            connection_id,
        },
    );

    tracing::info!(connection_id = %connection_id, user_id = %user_id, "Connection bound to user");
    Ok(())
}

/// 연결 해제 처리. 마지막 연결이었다면 프레즌스를 정리하고
/// 사용자가 있던 각 공간에 이탈을 알린다
pub fn handle_disconnect(state: &Arc<AppState>, connection_id: ConnectionId) {
    if let Some(user_id) = state.connections.remove(connection_id) {
        let left_spaces = state.presence.remove_user(user_id);
        for space_id in left_spaces {
            state
                .broadcast
                .to_space(space_id, &ServerMessage::SpaceLeft { space_id, user_id });
        }
        tracing::info!(user_id = %user_id, "User went offline");
    }
    tracing::info!(connection_id = %connection_id, "Connection closed");
}

/// Heartbeat 처리
pub fn handle_heartbeat(sender: &UnboundedSender<ServerMessage>) {
    let _ = sender.send(ServerMessage::HeartbeatAck);
}
