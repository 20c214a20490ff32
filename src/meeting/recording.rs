//! 회의 녹화 관리

use crate::error::{CoreError, CoreResult};
use crate::meeting::KeyedLocks;
use crate::model::{
    ParticipantRole, ParticipantStatus, Recording, RecordingId, RecordingStatus, SessionId,
    SessionStatus, UserId,
};
use crate::protocol::ServerMessage;
use crate::registry::BroadcastRouter;
use crate::store::Stores;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// 녹화 수명주기 관리. 세션이 active일 때만 동작한다
pub struct RecordingManager {
    stores: Arc<Stores>,
    broadcast: Arc<BroadcastRouter>,
    session_locks: Arc<KeyedLocks>,
}

impl RecordingManager {
    pub fn new(
        stores: Arc<Stores>,
        broadcast: Arc<BroadcastRouter>,
        session_locks: Arc<KeyedLocks>,
    ) -> Self {
        Self {
            stores,
            broadcast,
            session_locks,
        }
    }

    /// 녹화 시작. 주최자/공동 주최자만 가능하며 세션당 1개만 허용된다
    pub async fn start(&self, session_id: SessionId, user_id: UserId) -> CoreResult<Recording> {
        let _guard = self.session_locks.acquire(session_id).await;

        let session = self
            .stores
            .sessions
            .find_by_id(session_id)
            .ok_or(CoreError::NotFound("session"))?;
        if session.status != SessionStatus::Active {
            return Err(CoreError::InvalidState(
                "cannot start recording for a non-active session".to_string(),
            ));
        }

        self.stores
            .users
            .find_by_id(user_id)
            .ok_or(CoreError::NotFound("user"))?;

        self.stores
            .participants
            .find_by_session_and_user(session_id, user_id)
            .filter(|p| {
                p.status == ParticipantStatus::Joined
                    && matches!(p.role, ParticipantRole::Host | ParticipantRole::CoHost)
            })
            .ok_or_else(|| {
                CoreError::PermissionDenied(
                    "user does not have permission to start recording".to_string(),
                )
            })?;

        if !self
            .stores
            .recordings
            .find_active_by_session(session_id)
            .is_empty()
        {
            return Err(CoreError::Conflict(
                "a recording is already in progress for this session".to_string(),
            ));
        }

        let started_at = Utc::now();
        let recording = Recording {
            id: Uuid::new_v4(),
            session_id,
            room_id: session.room_id,
            recorded_by: user_id,
            status: RecordingStatus::Recording,
            started_at,
            ended_at: None,
            duration_secs: 0,
            file_name: format!(
                "meeting_recording_{}_{}.mp4",
                session_id,
                started_at.timestamp_millis()
            ),
            // 기본 포맷
            format: "mp4".to_string(),
            is_public: false,
        };
        let recording = self.stores.recordings.save(recording);
        tracing::info!(
            recording_id = %recording.id,
            session_id = %session_id,
            user_id = %user_id,
            "Recording started"
        );
        Ok(recording)
    }

    /// 녹화 종료. 길이를 초 단위로 계산하고 RECORDING_STOPPED를 전파한다
    pub async fn stop(&self, recording_id: RecordingId) -> CoreResult<Recording> {
        let recording = self
            .stores
            .recordings
            .find_by_id(recording_id)
            .ok_or(CoreError::NotFound("recording"))?;
        let _guard = self.session_locks.acquire(recording.session_id).await;

        let mut recording = self
            .stores
            .recordings
            .find_by_id(recording_id)
            .ok_or(CoreError::NotFound("recording"))?;
        if recording.status != RecordingStatus::Recording {
            return Err(CoreError::InvalidState(
                "recording is not in progress".to_string(),
            ));
        }

        let ended_at = Utc::now();
        recording.status = RecordingStatus::Completed;
        recording.ended_at = Some(ended_at);
        recording.duration_secs = (ended_at - recording.started_at).num_seconds();
        let recording = self.stores.recordings.save(recording);

        self.broadcast.to_session_audience(
            recording.session_id,
            &ServerMessage::RecordingStopped {
                recording: recording.clone(),
            },
        );
        tracing::info!(
            recording_id = %recording.id,
            duration_secs = recording.duration_secs,
            "Recording stopped"
        );
        Ok(recording)
    }

    /// 공개 여부 변경. 상태 기계 제약 없음
    pub fn share(&self, recording_id: RecordingId, is_public: bool) -> CoreResult<Recording> {
        let mut recording = self
            .stores
            .recordings
            .find_by_id(recording_id)
            .ok_or(CoreError::NotFound("recording"))?;
        recording.is_public = is_public;
        Ok(self.stores.recordings.save(recording))
    }

    /// 세션 종료 캐스케이드: 진행 중 녹화를 세션 종료 시각으로 완료 처리한다.
    /// 호출자가 세션 락을 보유해야 하며 실패하지 않는다
    pub(crate) fn complete_all_for_session(&self, session_id: SessionId, ended_at: DateTime<Utc>) {
        for mut recording in self.stores.recordings.find_active_by_session(session_id) {
            recording.status = RecordingStatus::Completed;
            recording.ended_at = Some(ended_at);
            recording.duration_secs = (ended_at - recording.started_at).num_seconds();
            let recording = self.stores.recordings.save(recording);
            tracing::info!(
                recording_id = %recording.id,
                session_id = %session_id,
                "Recording force-completed on session end"
            );
        }
    }
}
