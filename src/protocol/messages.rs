//! 클라이언트-서버 메시지 프로토콜 정의

use crate::model::{
    ConnectionId, MeetingSession, Participant, ParticipantRole, PresenceRecord, Recording,
    SessionId, SpaceId, UserId, ZoneId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 주최자 권한 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostActionKind {
    Mute,
    VideoOff,
    Remove,
    MakeHost,
}

/// 클라이언트 → 서버 메시지
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ClientMessage {
    // Connection
    Heartbeat,
    Connect {
        user_id: UserId,
    },

    // Presence
    PositionUpdate {
        space_id: SpaceId,
        zone_id: Option<ZoneId>,
        x: i32,
        y: i32,
    },
    SpaceJoin {
        space_id: SpaceId,
    },
    SpaceLeave {
        space_id: SpaceId,
    },

    // Meeting
    SessionJoin {
        session_id: SessionId,
        display_name: Option<String>,
        role: Option<ParticipantRole>,
        audio_on: bool,
        video_on: bool,
    },
    SessionLeave {
        session_id: SessionId,
    },
    ParticipantStatus {
        session_id: SessionId,
        audio_on: bool,
        video_on: bool,
    },
    HostAction {
        session_id: SessionId,
        action: HostActionKind,
        target_user_id: Option<UserId>,
    },
    ChatMessage {
        session_id: SessionId,
        text: String,
    },
    HandRaise {
        session_id: SessionId,
        is_raised: bool,
    },
}

/// 서버 → 클라이언트 메시지
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    // Connection
    Connected {
        connection_id: ConnectionId,
    },
    HeartbeatAck,
    Error {
        code: String,
        message: String,
    },
    UserConnected {
        user_id: UserId,
        connection_id: ConnectionId,
    },

    // Presence
    SpaceJoined {
        space_id: SpaceId,
        user_id: UserId,
    },
    SpaceLeft {
        space_id: SpaceId,
        user_id: UserId,
    },
    PositionUpdated {
        presence: PresenceRecord,
    },

    // Meeting
    UserJoined {
        participant: Participant,
    },
    UserLeft {
        participant: Participant,
    },
    ParticipantStatusChanged {
        participant: Participant,
    },
    HostChanged {
        participant: Participant,
    },
    SessionStarted {
        session: MeetingSession,
    },
    SessionEnded {
        session: MeetingSession,
    },
    RecordingStopped {
        recording: Recording,
    },
    ChatMessage {
        session_id: SessionId,
        user_id: UserId,
        text: String,
        timestamp: DateTime<Utc>,
    },
    HandRaise {
        session_id: SessionId,
        user_id: UserId,
        is_raised: bool,
    },
    HostAction {
        session_id: SessionId,
        action: HostActionKind,
        host_user_id: UserId,
        target_user_id: Option<UserId>,
    },
}
