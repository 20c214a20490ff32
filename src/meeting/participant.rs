//! 회의 참가자 관리

use crate::error::{CoreError, CoreResult};
use crate::meeting::KeyedLocks;
use crate::model::{
    Participant, ParticipantId, ParticipantRole, ParticipantStatus, SessionId, SessionStatus,
    UserId,
};
use crate::protocol::{HostActionKind, ServerMessage};
use crate::registry::BroadcastRouter;
use crate::store::Stores;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// 세션 참가 요청
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub role: Option<ParticipantRole>,
    pub audio_on: bool,
    pub video_on: bool,
}

/// 참가자 집합과 역할을 관리한다.
/// 같은 세션의 변경은 세션 키 락으로 직렬화된다
pub struct ParticipantManager {
    stores: Arc<Stores>,
    broadcast: Arc<BroadcastRouter>,
    session_locks: Arc<KeyedLocks>,
}

impl ParticipantManager {
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

    /// 세션 참가. 기존 행이 있으면 재활성화하고, 없으면 정원 확인 후 생성.
    /// 첫 joined 참가자는 주최자가 된다
    pub async fn join(&self, session_id: SessionId, req: JoinRequest) -> CoreResult<Participant> {
        let _guard = self.session_locks.acquire(session_id).await;

        let session = self
            .stores
            .sessions
            .find_by_id(session_id)
            .ok_or(CoreError::NotFound("session"))?;
        if session.status != SessionStatus::Active {
            return Err(CoreError::InvalidState(
                "cannot join a non-active session".to_string(),
            ));
        }

        let user = self
            .stores
            .users
            .find_by_id(req.user_id)
            .ok_or(CoreError::NotFound("user"))?;

        // (세션, 사용자) 행이 이미 있으면 같은 행을 재사용한다
        if let Some(mut existing) = self
            .stores
            .participants
            .find_by_session_and_user(session_id, req.user_id)
        {
            existing.status = ParticipantStatus::Joined;
            existing.left_at = None;
            existing.audio_on = req.audio_on;
            existing.video_on = req.video_on;
            let participant = self.stores.participants.save(existing);
            self.broadcast.to_session_audience(
                session_id,
                &ServerMessage::UserJoined {
                    participant: participant.clone(),
                },
            );
            tracing::info!(
                session_id = %session_id,
                user_id = %req.user_id,
                "Participant rejoined session"
            );
            return Ok(participant);
        }

        let room = self
            .stores
            .rooms
            .find_by_id(session.room_id)
            .ok_or(CoreError::NotFound("meeting room"))?;
        let joined_count = self.stores.participants.count_joined(session_id);
        if joined_count >= room.capacity {
            return Err(CoreError::Conflict(
                "meeting room capacity reached".to_string(),
            ));
        }

        let mut participant = Participant {
            id: Uuid::new_v4(),
            session_id,
            room_id: session.room_id,
            user_id: req.user_id,
            display_name: req.display_name.unwrap_or(user.username),
            role: req.role.unwrap_or(ParticipantRole::Participant),
            audio_on: req.audio_on,
            video_on: req.video_on,
            screen_sharing: false,
            hand_raised: false,
            status: ParticipantStatus::Joined,
            joined_at: Utc::now(),
            left_at: None,
        };

        // 첫 참가자는 주최자가 된다
        if joined_count == 0 {
            participant.role = ParticipantRole::Host;
        }

        let participant = self.stores.participants.save(participant);
        self.broadcast.to_session_audience(
            session_id,
            &ServerMessage::UserJoined {
                participant: participant.clone(),
            },
        );
        tracing::info!(
            session_id = %session_id,
            user_id = %req.user_id,
            role = ?participant.role,
            "Participant joined session"
        );
        Ok(participant)
    }

    /// 세션 퇴장. 미디어 플래그를 내리고 퇴장 시각을 기록한다.
    /// 주최자가 떠나도 자동 재배정은 하지 않는다
    pub async fn leave(&self, participant_id: ParticipantId) -> CoreResult<Participant> {
        let participant = self
            .stores
            .participants
            .find_by_id(participant_id)
            .ok_or(CoreError::NotFound("participant"))?;
        let _guard = self.session_locks.acquire(participant.session_id).await;
        self.leave_locked(participant_id)
    }

    /// 미디어 상태 갱신
    pub async fn update_status(
        &self,
        participant_id: ParticipantId,
        audio_on: bool,
        video_on: bool,
    ) -> CoreResult<Participant> {
        let participant = self
            .stores
            .participants
            .find_by_id(participant_id)
            .ok_or(CoreError::NotFound("participant"))?;
        let _guard = self.session_locks.acquire(participant.session_id).await;
        self.update_status_locked(participant_id, audio_on, video_on)
    }

    /// 주최자 교체. joined 주최자 전원을 강등한 뒤 대상을 승격한다
    pub async fn make_host(&self, participant_id: ParticipantId) -> CoreResult<Participant> {
        let participant = self
            .stores
            .participants
            .find_by_id(participant_id)
            .ok_or(CoreError::NotFound("participant"))?;
        let _guard = self.session_locks.acquire(participant.session_id).await;
        self.make_host_locked(participant_id)
    }

    /// (세션, 사용자)로 joined 참가자를 찾아 퇴장 처리
    pub async fn remove(&self, session_id: SessionId, user_id: UserId) -> CoreResult<Participant> {
        let _guard = self.session_locks.acquire(session_id).await;
        self.remove_locked(session_id, user_id)
    }

    /// 손들기 플래그 갱신
    pub async fn set_hand_raised(
        &self,
        session_id: SessionId,
        user_id: UserId,
        is_raised: bool,
    ) -> CoreResult<Participant> {
        let _guard = self.session_locks.acquire(session_id).await;

        let mut participant = self
            .joined_row(session_id, user_id)
            .ok_or(CoreError::NotFound("participant"))?;
        participant.hand_raised = is_raised;
        let participant = self.stores.participants.save(participant);
        self.broadcast.to_session_audience(
            session_id,
            &ServerMessage::HandRaise {
                session_id,
                user_id,
                is_raised,
            },
        );
        Ok(participant)
    }

    /// 채팅 중계. 메시지는 저장하지 않는다
    pub async fn relay_chat(
        &self,
        session_id: SessionId,
        user_id: UserId,
        text: String,
    ) -> CoreResult<()> {
        let session = self
            .stores
            .sessions
            .find_by_id(session_id)
            .ok_or(CoreError::NotFound("session"))?;
        if !session.chat_enabled {
            return Err(CoreError::InvalidState(
                "chat is disabled for this session".to_string(),
            ));
        }
        self.joined_row(session_id, user_id)
            .ok_or_else(|| CoreError::PermissionDenied(
                "only joined participants can chat".to_string(),
            ))?;

        self.broadcast.to_session_audience(
            session_id,
            &ServerMessage::ChatMessage {
                session_id,
                user_id,
                text,
                timestamp: Utc::now(),
            },
        );
        Ok(())
    }

    /// 주최자 권한 동작 디스패치.
    /// 호출자가 현재 joined 상태의 주최자가 아니면 PermissionDenied
    pub async fn host_action(
        &self,
        session_id: SessionId,
        caller_user_id: UserId,
        action: HostActionKind,
        target_user_id: Option<UserId>,
    ) -> CoreResult<()> {
        let _guard = self.session_locks.acquire(session_id).await;

        let session = self
            .stores
            .sessions
            .find_by_id(session_id)
            .ok_or(CoreError::NotFound("session"))?;
        if session.status != SessionStatus::Active {
            return Err(CoreError::InvalidState(
                "host actions require an active session".to_string(),
            ));
        }

        self.joined_row(session_id, caller_user_id)
            .filter(|p| p.role == ParticipantRole::Host)
            .ok_or_else(|| CoreError::PermissionDenied(
                "only the host can perform this action".to_string(),
            ))?;

        let target = target_user_id.ok_or_else(|| {
            CoreError::InvalidState("host action requires a target user".to_string())
        })?;

        match action {
            HostActionKind::Mute => {
                let row = self
                    .joined_row(session_id, target)
                    .ok_or(CoreError::NotFound("participant"))?;
                self.update_status_locked(row.id, false, row.video_on)?;
            }
            HostActionKind::VideoOff => {
                let row = self
                    .joined_row(session_id, target)
                    .ok_or(CoreError::NotFound("participant"))?;
                self.update_status_locked(row.id, row.audio_on, false)?;
            }
            HostActionKind::Remove => {
                self.remove_locked(session_id, target)?;
            }
            HostActionKind::MakeHost => {
                let row = self
                    .joined_row(session_id, target)
                    .ok_or(CoreError::NotFound("participant"))?;
                self.make_host_locked(row.id)?;
            }
        }

        self.broadcast.to_session_audience(
            session_id,
            &ServerMessage::HostAction {
                session_id,
                action,
                host_user_id: caller_user_id,
                target_user_id,
            },
        );
        Ok(())
    }

    /// 세션 종료 캐스케이드: joined 전원을 퇴장 처리한다.
    /// 호출자가 세션 락을 보유해야 하며 실패하지 않는다
    pub(crate) fn force_leave_all(&self, session_id: SessionId, at: DateTime<Utc>) {
        for mut participant in self.stores.participants.find_joined_by_session(session_id) {
            participant.status = ParticipantStatus::Left;
            participant.left_at = Some(at);
            participant.audio_on = false;
            participant.video_on = false;
            participant.screen_sharing = false;
            participant.hand_raised = false;
            self.stores.participants.save(participant);
        }
    }

    fn leave_locked(&self, participant_id: ParticipantId) -> CoreResult<Participant> {
        let mut participant = self
            .stores
            .participants
            .find_by_id(participant_id)
            .ok_or(CoreError::NotFound("participant"))?;

        participant.status = ParticipantStatus::Left;
        participant.left_at = Some(Utc::now());
        participant.audio_on = false;
        participant.video_on = false;
        participant.screen_sharing = false;
        participant.hand_raised = false;
        let participant = self.stores.participants.save(participant);

        self.broadcast.to_session_audience(
            participant.session_id,
            &ServerMessage::UserLeft {
                participant: participant.clone(),
            },
        );
        tracing::info!(
            session_id = %participant.session_id,
            user_id = %participant.user_id,
            "Participant left session"
        );
        Ok(participant)
    }

    fn update_status_locked(
        &self,
        participant_id: ParticipantId,
        audio_on: bool,
        video_on: bool,
    ) -> CoreResult<Participant> {
        let mut participant = self
            .stores
            .participants
            .find_by_id(participant_id)
            .ok_or(CoreError::NotFound("participant"))?;

        participant.audio_on = audio_on;
        participant.video_on = video_on;
        let participant = self.stores.participants.save(participant);

        self.broadcast.to_session_audience(
            participant.session_id,
            &ServerMessage::ParticipantStatusChanged {
                participant: participant.clone(),
            },
        );
        Ok(participant)
    }

    fn make_host_locked(&self, participant_id: ParticipantId) -> CoreResult<Participant> {
        let target = self
            .stores
            .participants
            .find_by_id(participant_id)
            .ok_or(CoreError::NotFound("participant"))?;

        let session = self
            .stores
            .sessions
            .find_by_id(target.session_id)
            .ok_or(CoreError::NotFound("session"))?;
        if session.status != SessionStatus::Active {
            return Err(CoreError::InvalidState(
                "host can only be assigned in an active session".to_string(),
            ));
        }
        if target.status != ParticipantStatus::Joined {
            return Err(CoreError::InvalidState(
                "only joined participants can become host".to_string(),
            ));
        }

        // 기존 주최자 전원 강등
        for mut current in self
            .stores
            .participants
            .find_joined_by_session(target.session_id)
        {
            if current.role == ParticipantRole::Host && current.id != target.id {
                current.role = ParticipantRole::Participant;
                self.stores.participants.save(current);
            }
        }

        let mut target = target;
        target.role = ParticipantRole::Host;
        let target = self.stores.participants.save(target);

        self.broadcast.to_session_audience(
            target.session_id,
            &ServerMessage::HostChanged {
                participant: target.clone(),
            },
        );
        tracing::info!(
            session_id = %target.session_id,
            user_id = %target.user_id,
            "Host changed"
        );
        Ok(target)
    }

    fn remove_locked(&self, session_id: SessionId, user_id: UserId) -> CoreResult<Participant> {
        let participant = self
            .joined_row(session_id, user_id)
            .ok_or(CoreError::NotFound("participant"))?;
        self.leave_locked(participant.id)
    }

    fn joined_row(&self, session_id: SessionId, user_id: UserId) -> Option<Participant> {
        self.stores
            .participants
            .find_by_session_and_user(session_id, user_id)
            .filter(|p| p.status == ParticipantStatus::Joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MeetingRoom, MeetingSession, User, VirtualSpace};
    use crate::registry::{ConnectionRegistry, PresenceTracker};
    use chrono::Duration;

    struct Fixture {
        stores: Arc<Stores>,
        participants: ParticipantManager,
        session_id: SessionId,
    }

    fn fixture(capacity: usize, status: SessionStatus) -> Fixture {
        let stores = Arc::new(Stores::default());
        let connections = Arc::new(ConnectionRegistry::default());
        let presence = Arc::new(PresenceTracker::new(stores.clone()));
        let broadcast = Arc::new(BroadcastRouter::new(connections, presence, stores.clone()));
        let locks = Arc::new(KeyedLocks::default());

        let host = seed_user(&stores, "host");
        let space = stores.spaces.save(VirtualSpace {
            id: Uuid::new_v4(),
            name: "hq".to_string(),
            width: 100,
            height: 100,
            is_public: true,
            creator_id: host,
        });
        let room = stores.rooms.save(MeetingRoom {
            id: Uuid::new_v4(),
            space_id: space.id,
            name: "war room".to_string(),
            capacity,
            is_active: true,
            created_at: Utc::now(),
        });
        let session = stores.sessions.save(MeetingSession {
            id: Uuid::new_v4(),
            room_id: room.id,
            host_id: host,
            start_time: Utc::now(),
            end_time: Utc::now() + Duration::hours(1),
            status,
            recording_enabled: false,
            screen_sharing_enabled: true,
            chat_enabled: true,
            created_at: Utc::now(),
        });

        Fixture {
            stores: stores.clone(),
            participants: ParticipantManager::new(stores, broadcast, locks),
            session_id: session.id,
        }
    }

    fn seed_user(stores: &Stores, name: &str) -> UserId {
        stores
            .users
            .save(User {
                id: Uuid::new_v4(),
                username: name.to_string(),
            })
            .id
    }

    fn join_req(user_id: UserId) -> JoinRequest {
        JoinRequest {
            user_id,
            display_name: None,
            role: None,
            audio_on: true,
            video_on: false,
        }
    }

    #[tokio::test]
    async fn first_joiner_becomes_host() {
        let fx = fixture(4, SessionStatus::Active);
        let a = seed_user(&fx.stores, "a");
        let b = seed_user(&fx.stores, "b");

        let pa = fx.participants.join(fx.session_id, join_req(a)).await.unwrap();
        let pb = fx.participants.join(fx.session_id, join_req(b)).await.unwrap();

        assert_eq!(pa.role, ParticipantRole::Host);
        assert_eq!(pb.role, ParticipantRole::Participant);
    }

    #[tokio::test]
    async fn capacity_is_enforced_on_join() {
        let fx = fixture(2, SessionStatus::Active);
        let a = seed_user(&fx.stores, "a");
        let b = seed_user(&fx.stores, "b");
        let c = seed_user(&fx.stores, "c");

        fx.participants.join(fx.session_id, join_req(a)).await.unwrap();
        fx.participants.join(fx.session_id, join_req(b)).await.unwrap();

        let err = fx
            .participants
            .join(fx.session_id, join_req(c))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(fx.stores.participants.count_joined(fx.session_id), 2);
    }

    #[tokio::test]
    async fn join_requires_active_session() {
        let fx = fixture(4, SessionStatus::Scheduled);
        let a = seed_user(&fx.stores, "a");

        let err = fx
            .participants
            .join(fx.session_id, join_req(a))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[tokio::test]
    async fn rejoin_reuses_participant_row() {
        let fx = fixture(4, SessionStatus::Active);
        let a = seed_user(&fx.stores, "a");

        let first = fx.participants.join(fx.session_id, join_req(a)).await.unwrap();
        fx.participants.leave(first.id).await.unwrap();

        let second = fx.participants.join(fx.session_id, join_req(a)).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.status, ParticipantStatus::Joined);
        assert!(second.left_at.is_none());
    }

    #[tokio::test]
    async fn leave_clears_media_flags_without_host_reassignment() {
        let fx = fixture(4, SessionStatus::Active);
        let a = seed_user(&fx.stores, "a");
        let b = seed_user(&fx.stores, "b");

        let host = fx.participants.join(fx.session_id, join_req(a)).await.unwrap();
        fx.participants.join(fx.session_id, join_req(b)).await.unwrap();

        let left = fx.participants.leave(host.id).await.unwrap();
        assert_eq!(left.status, ParticipantStatus::Left);
        assert!(!left.audio_on && !left.video_on);
        assert!(left.left_at.is_some());

        // 남은 참가자는 자동 승격되지 않는다
        let remaining = fx.stores.participants.find_joined_by_session(fx.session_id);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].role, ParticipantRole::Participant);
    }

    #[tokio::test]
    async fn make_host_keeps_single_host_invariant() {
        let fx = fixture(4, SessionStatus::Active);
        let a = seed_user(&fx.stores, "a");
        let b = seed_user(&fx.stores, "b");

        fx.participants.join(fx.session_id, join_req(a)).await.unwrap();
        let pb = fx.participants.join(fx.session_id, join_req(b)).await.unwrap();

        fx.participants.make_host(pb.id).await.unwrap();

        let joined = fx.stores.participants.find_joined_by_session(fx.session_id);
        let hosts: Vec<_> = joined
            .iter()
            .filter(|p| p.role == ParticipantRole::Host)
            .collect();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].user_id, b);
    }

    #[tokio::test]
    async fn host_action_requires_host_role() {
        let fx = fixture(4, SessionStatus::Active);
        let a = seed_user(&fx.stores, "a");
        let b = seed_user(&fx.stores, "b");

        fx.participants.join(fx.session_id, join_req(a)).await.unwrap();
        fx.participants.join(fx.session_id, join_req(b)).await.unwrap();

        let err = fx
            .participants
            .host_action(fx.session_id, b, HostActionKind::Mute, Some(a))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn host_action_mute_drops_audio_only() {
        let fx = fixture(4, SessionStatus::Active);
        let a = seed_user(&fx.stores, "a");
        let b = seed_user(&fx.stores, "b");

        fx.participants.join(fx.session_id, join_req(a)).await.unwrap();
        let pb = fx
            .participants
            .join(
                fx.session_id,
                JoinRequest {
                    user_id: b,
                    display_name: None,
                    role: None,
                    audio_on: true,
                    video_on: true,
                },
            )
            .await
            .unwrap();

        fx.participants
            .host_action(fx.session_id, a, HostActionKind::Mute, Some(b))
            .await
            .unwrap();

        let muted = fx.stores.participants.find_by_id(pb.id).unwrap();
        assert!(!muted.audio_on);
        assert!(muted.video_on);
    }

    #[tokio::test]
    async fn host_action_on_scheduled_session_is_invalid_state() {
        let fx = fixture(4, SessionStatus::Scheduled);
        let a = seed_user(&fx.stores, "a");

        let err = fx
            .participants
            .host_action(fx.session_id, a, HostActionKind::MakeHost, Some(a))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[tokio::test]
    async fn chat_respects_session_flag_and_membership() {
        let fx = fixture(4, SessionStatus::Active);
        let a = seed_user(&fx.stores, "a");
        let outsider = seed_user(&fx.stores, "outsider");

        fx.participants.join(fx.session_id, join_req(a)).await.unwrap();

        fx.participants
            .relay_chat(fx.session_id, a, "hello".to_string())
            .await
            .unwrap();

        let err = fx
            .participants
            .relay_chat(fx.session_id, outsider, "hi".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied(_)));

        // chat_enabled 플래그를 끄면 거부된다
        let mut session = fx.stores.sessions.find_by_id(fx.session_id).unwrap();
        session.chat_enabled = false;
        fx.stores.sessions.save(session);

        let err = fx
            .participants
            .relay_chat(fx.session_id, a, "quiet".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }
}
