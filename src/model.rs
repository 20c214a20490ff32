//! 도메인 모델 정의

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;
pub type SpaceId = Uuid;
pub type ZoneId = Uuid;
pub type RoomId = Uuid;
pub type SessionId = Uuid;
pub type ParticipantId = Uuid;
pub type RecordingId = Uuid;
pub type ConnectionId = Uuid;

/// 사용자
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// 가상 공간
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualSpace {
    pub id: SpaceId,
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub is_public: bool,
    pub creator_id: UserId,
}

/// 공간 내 구역
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub space_id: SpaceId,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// 프레즌스 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Away,
    Busy,
    Offline,
}

/// 사용자 위치/상태 스냅샷. 사용자당 최대 1개
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub user_id: UserId,
    pub space_id: SpaceId,
    pub zone_id: Option<ZoneId>,
    pub x: i32,
    pub y: i32,
    pub status: PresenceStatus,
    pub last_active: DateTime<Utc>,
}

/// 회의실
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRoom {
    pub id: RoomId,
    pub space_id: SpaceId,
    /// 같은 공간 안에서 유일해야 한다
    pub name: String,
    pub capacity: usize,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// 회의 세션 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Scheduled,
    Active,
    Ended,
    Cancelled,
}

/// 회의 세션
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingSession {
    pub id: SessionId,
    pub room_id: RoomId,
    pub host_id: UserId,
    /// 예약 시각. start()에서 실제 시작 시각으로 덮어쓴다
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SessionStatus,
    pub recording_enabled: bool,
    pub screen_sharing_enabled: bool,
    pub chat_enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// 참가자 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParticipantRole {
    Host,
    CoHost,
    Participant,
    Viewer,
}

/// 참가자 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Joined,
    Left,
    Waiting,
}

/// 회의 참가자. (세션, 사용자) 쌍당 행 1개를 재사용한다
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub session_id: SessionId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub display_name: String,
    pub role: ParticipantRole,
    pub audio_on: bool,
    pub video_on: bool,
    pub screen_sharing: bool,
    pub hand_raised: bool,
    pub status: ParticipantStatus,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

/// 녹화 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    Recording,
    Processing,
    Completed,
    Failed,
}

/// 회의 녹화
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub id: RecordingId,
    pub session_id: SessionId,
    pub room_id: RoomId,
    pub recorded_by: UserId,
    pub status: RecordingStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// 초 단위 길이. 종료 시 계산된다
    pub duration_secs: i64,
    pub file_name: String,
    pub format: String,
    pub is_public: bool,
}
