//! 회의 세션 핸들러

use crate::error::{CoreError, CoreResult};
use crate::meeting::JoinRequest;
use crate::model::{ParticipantRole, ParticipantStatus, SessionId, UserId};
use crate::protocol::HostActionKind;
use crate::state::AppState;
use std::sync::Arc;

/// 세션 참가 처리
pub async fn handle_session_join(
    state: &Arc<AppState>,
    user_id: UserId,
    session_id: SessionId,
    display_name: Option<String>,
    role: Option<ParticipantRole>,
    audio_on: bool,
    video_on: bool,
) -> CoreResult<()> {
    state
        .participants
        .join(
            session_id,
            JoinRequest {
                user_id,
                display_name,
                role,
                audio_on,
                video_on,
            },
        )
        .await?;
    Ok(())
}

/// 세션 퇴장 처리
pub async fn handle_session_leave(
    state: &Arc<AppState>,
    user_id: UserId,
    session_id: SessionId,
) -> CoreResult<()> {
    state.participants.remove(session_id, user_id).await?;
    Ok(())
}

/// 미디어 상태 변경 처리
pub async fn handle_participant_status(
    state: &Arc<AppState>,
    user_id: UserId,
    session_id: SessionId,
    audio_on: bool,
    video_on: bool,
) -> CoreResult<()> {
    let participant = state
        .stores
        .participants
        .find_by_session_and_user(session_id, user_id)
        .filter(|p| p.status == ParticipantStatus::Joined)
        .ok_or(CoreError::NotFound("participant"))?;
    state
        .participants
        .update_status(participant.id, audio_on, video_on)
        .await?;
    Ok(())
}

/// 주최자 동작 처리
pub async fn handle_host_action(
    state: &Arc<AppState>,
    user_id: UserId,
    session_id: SessionId,
    action: HostActionKind,
    target_user_id: Option<UserId>,
) -> CoreResult<()> {
    state
        .participants
        .host_action(session_id, user_id, action, target_user_id)
        .await
}

/// 채팅 메시지 처리
pub async fn handle_chat(
    state: &Arc<AppState>,
    user_id: UserId,
    session_id: SessionId,
    text: String,
) -> CoreResult<()> {
    state.participants.relay_chat(session_id, user_id, text).await
}

/// 손들기 처리
pub async fn handle_hand_raise(
    state: &Arc<AppState>,
    user_id: UserId,
    session_id: SessionId,
    is_raised: bool,
) -> CoreResult<()> {
    state
        .participants
        .set_hand_raised(session_id, user_id, is_raised)
        .await?;
    Ok(())
}
