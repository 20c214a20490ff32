//! 영속 계층 대체 인메모리 스토어
//!
//! 내구 필드의 신뢰 원천. 모든 조회/저장은 동기식이며
//! 호출자는 키 단위 락 아래에서 읽기-수정-저장을 수행한다.

use crate::model::{
    MeetingRoom, MeetingSession, Participant, ParticipantId, ParticipantStatus, Recording,
    RecordingId, RecordingStatus, RoomId, SessionId, SessionStatus, SpaceId, User, UserId,
    VirtualSpace, Zone, ZoneId,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// 사용자 스토어
#[derive(Default)]
pub struct UserStore {
    users: DashMap<UserId, User>,
}

impl UserStore {
    pub fn find_by_id(&self, id: UserId) -> Option<User> {
        self.users.get(&id).map(|u| u.clone())
    }

    pub fn save(&self, user: User) -> User {
        self.users.insert(user.id, user.clone());
        user
    }
}

/// 가상 공간 스토어
#[derive(Default)]
pub struct SpaceStore {
    spaces: DashMap<SpaceId, VirtualSpace>,
}

impl SpaceStore {
    pub fn find_by_id(&self, id: SpaceId) -> Option<VirtualSpace> {
        self.spaces.get(&id).map(|s| s.clone())
    }

    pub fn save(&self, space: VirtualSpace) -> VirtualSpace {
        self.spaces.insert(space.id, space.clone());
        space
    }
}

/// 구역 스토어
#[derive(Default)]
pub struct ZoneStore {
    zones: DashMap<ZoneId, Zone>,
}

impl ZoneStore {
    pub fn find_by_id(&self, id: ZoneId) -> Option<Zone> {
        self.zones.get(&id).map(|z| z.clone())
    }

    pub fn find_by_space(&self, space_id: SpaceId) -> Vec<Zone> {
        self.zones
            .iter()
            .filter(|z| z.space_id == space_id)
            .map(|z| z.clone())
            .collect()
    }

    pub fn save(&self, zone: Zone) -> Zone {
        self.zones.insert(zone.id, zone.clone());
        zone
    }
}

/// 회의실 스토어
#[derive(Default)]
pub struct RoomStore {
    rooms: DashMap<RoomId, MeetingRoom>,
}

impl RoomStore {
    pub fn find_by_id(&self, id: RoomId) -> Option<MeetingRoom> {
        self.rooms.get(&id).map(|r| r.clone())
    }

    pub fn find_by_space(&self, space_id: SpaceId) -> Vec<MeetingRoom> {
        self.rooms
            .iter()
            .filter(|r| r.space_id == space_id)
            .map(|r| r.clone())
            .collect()
    }

    /// 같은 공간에 같은 이름의 회의실이 있는지 확인
    pub fn exists_by_name_and_space(&self, name: &str, space_id: SpaceId) -> bool {
        self.rooms
            .iter()
            .any(|r| r.space_id == space_id && r.name == name)
    }

    pub fn save(&self, room: MeetingRoom) -> MeetingRoom {
        self.rooms.insert(room.id, room.clone());
        room
    }

    pub fn delete(&self, id: RoomId) {
        self.rooms.remove(&id);
    }
}

/// 회의 세션 스토어
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, MeetingSession>,
}

impl SessionStore {
    pub fn find_by_id(&self, id: SessionId) -> Option<MeetingSession> {
        self.sessions.get(&id).map(|s| s.clone())
    }

    /// 같은 회의실에서 [start, end) 창이 겹치는 scheduled/active 세션 조회.
    /// 경계 시각이 같기만 한 경우는 겹침이 아니다
    pub fn find_overlapping(
        &self,
        room_id: RoomId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<MeetingSession> {
        self.sessions
            .iter()
            .filter(|s| {
                s.room_id == room_id
                    && matches!(s.status, SessionStatus::Scheduled | SessionStatus::Active)
                    && s.start_time < end
                    && start < s.end_time
            })
            .map(|s| s.clone())
            .collect()
    }

    pub fn find_by_room_and_status(&self, room_id: RoomId, status: SessionStatus) -> Vec<MeetingSession> {
        self.sessions
            .iter()
            .filter(|s| s.room_id == room_id && s.status == status)
            .map(|s| s.clone())
            .collect()
    }

    pub fn save(&self, session: MeetingSession) -> MeetingSession {
        self.sessions.insert(session.id, session.clone());
        session
    }
}

/// 참가자 스토어
#[derive(Default)]
pub struct ParticipantStore {
    participants: DashMap<ParticipantId, Participant>,
}

impl ParticipantStore {
    pub fn find_by_id(&self, id: ParticipantId) -> Option<Participant> {
        self.participants.get(&id).map(|p| p.clone())
    }

    pub fn find_by_session(&self, session_id: SessionId) -> Vec<Participant> {
        self.participants
            .iter()
            .filter(|p| p.session_id == session_id)
            .map(|p| p.clone())
            .collect()
    }

    pub fn find_by_session_and_user(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Option<Participant> {
        self.participants
            .iter()
            .find(|p| p.session_id == session_id && p.user_id == user_id)
            .map(|p| p.clone())
    }

    pub fn find_joined_by_session(&self, session_id: SessionId) -> Vec<Participant> {
        self.participants
            .iter()
            .filter(|p| p.session_id == session_id && p.status == ParticipantStatus::Joined)
            .map(|p| p.clone())
            .collect()
    }

    /// 정원 판정에 쓰이는 joined 참가자 수
    pub fn count_joined(&self, session_id: SessionId) -> usize {
        self.participants
            .iter()
            .filter(|p| p.session_id == session_id && p.status == ParticipantStatus::Joined)
            .count()
    }

    pub fn save(&self, participant: Participant) -> Participant {
        self.participants.insert(participant.id, participant.clone());
        participant
    }
}

/// 녹화 스토어
#[derive(Default)]
pub struct RecordingStore {
    recordings: DashMap<RecordingId, Recording>,
}

impl RecordingStore {
    pub fn find_by_id(&self, id: RecordingId) -> Option<Recording> {
        self.recordings.get(&id).map(|r| r.clone())
    }

    pub fn find_by_session(&self, session_id: SessionId) -> Vec<Recording> {
        self.recordings
            .iter()
            .filter(|r| r.session_id == session_id)
            .map(|r| r.clone())
            .collect()
    }

    /// recording 상태인 녹화 조회 (세션당 최대 1개 유지)
    pub fn find_active_by_session(&self, session_id: SessionId) -> Vec<Recording> {
        self.recordings
            .iter()
            .filter(|r| r.session_id == session_id && r.status == RecordingStatus::Recording)
            .map(|r| r.clone())
            .collect()
    }

    pub fn save(&self, recording: Recording) -> Recording {
        self.recordings.insert(recording.id, recording.clone());
        recording
    }
}

/// 스토어 묶음. 프로세스 시작 시 한 번 생성된다
#[derive(Default)]
pub struct Stores {
    pub users: UserStore,
    pub spaces: SpaceStore,
    pub zones: ZoneStore,
    pub rooms: RoomStore,
    pub sessions: SessionStore,
    pub participants: ParticipantStore,
    pub recordings: RecordingStore,
}
