//! 회의 세션 수명주기 관리
//!
//! scheduled → active → ended, scheduled → cancelled.
//! ended/cancelled에서 나가는 전이는 없다

use crate::error::{CoreError, CoreResult};
use crate::meeting::{KeyedLocks, ParticipantManager, RecordingManager};
use crate::model::{
    MeetingSession, ParticipantStatus, RoomId, SessionId, SessionStatus, UserId,
};
use crate::protocol::ServerMessage;
use crate::registry::BroadcastRouter;
use crate::store::Stores;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// 세션 생성 파라미터
#[derive(Debug, Clone, Deserialize)]
pub struct NewSession {
    pub room_id: RoomId,
    pub host_id: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub recording_enabled: bool,
    #[serde(default = "default_true")]
    pub screen_sharing_enabled: bool,
    #[serde(default = "default_true")]
    pub chat_enabled: bool,
}

fn default_true() -> bool {
    true
}

/// 세션 상태 전이의 단일 소유자.
/// 같은 세션의 전이는 세션 키 락으로, 예약 겹침 검사는 회의실 키 락으로 직렬화된다
pub struct SessionManager {
    stores: Arc<Stores>,
    broadcast: Arc<BroadcastRouter>,
    session_locks: Arc<KeyedLocks>,
    room_locks: Arc<KeyedLocks>,
    participants: Arc<ParticipantManager>,
    recordings: Arc<RecordingManager>,
}

impl SessionManager {
    pub fn new(
        stores: Arc<Stores>,
        broadcast: Arc<BroadcastRouter>,
        session_locks: Arc<KeyedLocks>,
        room_locks: Arc<KeyedLocks>,
        participants: Arc<ParticipantManager>,
        recordings: Arc<RecordingManager>,
    ) -> Self {
        Self {
            stores,
            broadcast,
            session_locks,
            room_locks,
            participants,
            recordings,
        }
    }

    /// 세션 생성. 같은 회의실의 scheduled/active 세션과 [start, end) 창이
    /// 겹치면 Conflict. 경계 시각만 같은 경우는 허용된다
    pub async fn create(&self, req: NewSession) -> CoreResult<MeetingSession> {
        self.stores
            .users
            .find_by_id(req.host_id)
            .ok_or(CoreError::NotFound("user"))?;
        self.stores
            .rooms
            .find_by_id(req.room_id)
            .ok_or(CoreError::NotFound("meeting room"))?;
        if req.end_time <= req.start_time {
            return Err(CoreError::InvalidState(
                "session end time must be after start time".to_string(),
            ));
        }

        let _guard = self.room_locks.acquire(req.room_id).await;
        if !self
            .stores
            .sessions
            .find_overlapping(req.room_id, req.start_time, req.end_time)
            .is_empty()
        {
            return Err(CoreError::Conflict("time slot already booked".to_string()));
        }

        let session = MeetingSession {
            id: Uuid::new_v4(),
            room_id: req.room_id,
            host_id: req.host_id,
            start_time: req.start_time,
            end_time: req.end_time,
            status: SessionStatus::Scheduled,
            recording_enabled: req.recording_enabled,
            screen_sharing_enabled: req.screen_sharing_enabled,
            chat_enabled: req.chat_enabled,
            created_at: Utc::now(),
        };
        let session = self.stores.sessions.save(session);
        tracing::info!(
            session_id = %session.id,
            room_id = %session.room_id,
            "Meeting session scheduled"
        );
        Ok(session)
    }

    /// 세션 시작. scheduled에서만 허용되며 실제 시작 시각을 기록한다
    pub async fn start(&self, session_id: SessionId) -> CoreResult<MeetingSession> {
        let _guard = self.session_locks.acquire(session_id).await;

        let mut session = self
            .stores
            .sessions
            .find_by_id(session_id)
            .ok_or(CoreError::NotFound("session"))?;
        if session.status != SessionStatus::Scheduled {
            return Err(CoreError::InvalidState(
                "only scheduled sessions can be started".to_string(),
            ));
        }

        session.status = SessionStatus::Active;
        session.start_time = Utc::now();
        let session = self.stores.sessions.save(session);

        self.broadcast.to_session_lifecycle(
            session_id,
            &ServerMessage::SessionStarted {
                session: session.clone(),
            },
        );
        tracing::info!(session_id = %session_id, "Meeting session started");
        Ok(session)
    }

    /// 세션 종료. 전이 커밋 후 진행 중 녹화를 강제 완료하고
    /// joined 참가자 전원을 퇴장 처리한 뒤 SESSION_ENDED를 전파한다.
    /// 청중 스냅샷은 퇴장 캐스케이드 전에 떠야 한다
    pub async fn end(&self, session_id: SessionId) -> CoreResult<MeetingSession> {
        let _guard = self.session_locks.acquire(session_id).await;

        let mut session = self
            .stores
            .sessions
            .find_by_id(session_id)
            .ok_or(CoreError::NotFound("session"))?;
        if session.status != SessionStatus::Active {
            return Err(CoreError::InvalidState(
                "only active sessions can be ended".to_string(),
            ));
        }

        let ended_at = Utc::now();
        session.status = SessionStatus::Ended;
        session.end_time = ended_at;
        let session = self.stores.sessions.save(session);

        let audience: Vec<UserId> = self
            .stores
            .participants
            .find_by_session(session_id)
            .into_iter()
            .filter(|p| p.status != ParticipantStatus::Left)
            .map(|p| p.user_id)
            .collect();

        // 캐스케이드는 전이 커밋 후 무조건 수행되며 실패하지 않는다
        self.recordings.complete_all_for_session(session_id, ended_at);
        self.participants.force_leave_all(session_id, ended_at);

        self.broadcast.to_users(
            &audience,
            &ServerMessage::SessionEnded {
                session: session.clone(),
            },
        );
        tracing::info!(session_id = %session_id, "Meeting session ended");
        Ok(session)
    }

    /// 세션 취소. scheduled에서만 허용된다.
    /// active 이전에는 참가자가 있을 수 없으므로 통지할 청중이 없다
    pub async fn cancel(&self, session_id: SessionId) -> CoreResult<MeetingSession> {
        let _guard = self.session_locks.acquire(session_id).await;

        let mut session = self
            .stores
            .sessions
            .find_by_id(session_id)
            .ok_or(CoreError::NotFound("session"))?;
        if session.status != SessionStatus::Scheduled {
            return Err(CoreError::InvalidState(
                "only scheduled sessions can be cancelled".to_string(),
            ));
        }

        session.status = SessionStatus::Cancelled;
        let session = self.stores.sessions.save(session);
        tracing::info!(session_id = %session_id, "Meeting session cancelled");
        Ok(session)
    }

    pub fn get(&self, session_id: SessionId) -> CoreResult<MeetingSession> {
        self.stores
            .sessions
            .find_by_id(session_id)
            .ok_or(CoreError::NotFound("session"))
    }
}
