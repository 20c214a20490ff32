//! 공간 프레즌스 핸들러

use crate::error::CoreResult;
use crate::model::{SpaceId, UserId, ZoneId};
use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;

/// 공간 참여 처리. 참여자 본인도 통지를 받는다
pub fn handle_space_join(state: &Arc<AppState>, user_id: UserId, space_id: SpaceId) {
    state.presence.join_space(user_id, space_id);
    state
        .broadcast
        .to_space(space_id, &ServerMessage::SpaceJoined { space_id, user_id });

    tracing::info!(user_id = %user_id, space_id = %space_id, "User joined space");
}

/// 공간 이탈 처리
pub fn handle_space_leave(state: &Arc<AppState>, user_id: UserId, space_id: SpaceId) {
    state.presence.leave_space(user_id, space_id);
    state
        .broadcast
        .to_space(space_id, &ServerMessage::SpaceLeft { space_id, user_id });

    tracing::info!(user_id = %user_id, space_id = %space_id, "User left space");
}

/// 위치 갱신 처리 (last-write-wins)
pub fn handle_position_update(
    state: &Arc<AppState>,
    user_id: UserId,
    space_id: SpaceId,
    zone_id: Option<ZoneId>,
    x: i32,
    y: i32,
) -> CoreResult<()> {
    let record = state
        .presence
        .update_position(user_id, space_id, zone_id, x, y)?;
    state
        .broadcast
        .to_space(space_id, &ServerMessage::PositionUpdated { presence: record });
    Ok(())
}
