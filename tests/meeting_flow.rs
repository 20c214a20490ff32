//! 전체 회의 흐름 통합 테스트

use chrono::{Duration, Utc};
use cloudoffice_realtime_rs::config::Config;
use cloudoffice_realtime_rs::error::CoreError;
use cloudoffice_realtime_rs::handlers;
use cloudoffice_realtime_rs::meeting::{JoinRequest, NewSession};
use cloudoffice_realtime_rs::model::{
    ConnectionId, MeetingRoom, ParticipantRole, ParticipantStatus, RecordingStatus, RoomId,
    SessionId, SessionStatus, SpaceId, User, UserId, VirtualSpace, Zone,
};
use cloudoffice_realtime_rs::protocol::{HostActionKind, ServerMessage};
use cloudoffice_realtime_rs::state::AppState;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use uuid::Uuid;

fn test_state() -> Arc<AppState> {
    Arc::new(AppState::new(Config::from_env()))
}

fn seed_user(state: &AppState, name: &str) -> UserId {
    state
        .stores
        .users
        .save(User {
            id: Uuid::new_v4(),
            username: name.to_string(),
        })
        .id
}

fn seed_space(state: &AppState, creator_id: UserId) -> SpaceId {
    state
        .stores
        .spaces
        .save(VirtualSpace {
            id: Uuid::new_v4(),
            name: "hq".to_string(),
            width: 100,
            height: 100,
            is_public: true,
            creator_id,
        })
        .id
}

fn seed_room(state: &AppState, space_id: SpaceId, capacity: usize) -> RoomId {
    state
        .stores
        .rooms
        .save(MeetingRoom {
            id: Uuid::new_v4(),
            space_id,
            name: "war room".to_string(),
            capacity,
            is_active: true,
            created_at: Utc::now(),
        })
        .id
}

/// 가짜 라이브 연결을 만들어 사용자에 바인딩한다
fn connect(
    state: &Arc<AppState>,
    user_id: UserId,
) -> (ConnectionId, UnboundedReceiver<ServerMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let connection_id = Uuid::new_v4();
    handlers::handle_connect(state, connection_id, user_id, &tx).unwrap();
    (connection_id, rx)
}

async fn active_session(state: &Arc<AppState>, room_id: RoomId, host_id: UserId) -> SessionId {
    let start = Utc::now();
    let session = state
        .sessions
        .create(NewSession {
            room_id,
            host_id,
            start_time: start,
            end_time: start + Duration::hours(1),
            recording_enabled: true,
            screen_sharing_enabled: true,
            chat_enabled: true,
        })
        .await
        .unwrap();
    state.sessions.start(session.id).await.unwrap();
    session.id
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

fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn capacity_scenario_with_ordered_events() {
    let state = test_state();
    let a = seed_user(&state, "a");
    let b = seed_user(&state, "b");
    let c = seed_user(&state, "c");
    let space = seed_space(&state, a);
    let room = seed_room(&state, space, 2);
    let session_id = active_session(&state, room, a).await;

    let (_, mut rx_a) = connect(&state, a);

    let pa = state.participants.join(session_id, join_req(a)).await.unwrap();
    let pb = state.participants.join(session_id, join_req(b)).await.unwrap();
    assert_eq!(pa.role, ParticipantRole::Host);
    assert_eq!(pb.role, ParticipantRole::Participant);

    // 정원 2를 넘는 세 번째 참가는 Conflict
    let err = state
        .participants
        .join(session_id, join_req(c))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    // A는 참가 이벤트를 커밋 순서대로 관측한다
    let joined_users: Vec<UserId> = drain(&mut rx_a)
        .into_iter()
        .filter_map(|event| match event {
            ServerMessage::UserJoined { participant } => Some(participant.user_id),
            _ => None,
        })
        .collect();
    assert_eq!(joined_users, vec![a, b]);
}

#[tokio::test]
async fn recording_conflict_and_session_end_cascade() {
    let state = test_state();
    let host = seed_user(&state, "host");
    let space = seed_space(&state, host);
    let room = seed_room(&state, space, 4);
    let session_id = active_session(&state, room, host).await;

    let (_, mut rx_host) = connect(&state, host);
    state
        .participants
        .join(session_id, join_req(host))
        .await
        .unwrap();

    let r1 = state.recordings.start(session_id, host).await.unwrap();
    assert_eq!(r1.status, RecordingStatus::Recording);

    // R1이 진행 중인 동안 R2는 시작할 수 없다
    let err = state.recordings.start(session_id, host).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    let ended = state.sessions.end(session_id).await.unwrap();
    assert_eq!(ended.status, SessionStatus::Ended);

    // 녹화는 세션 종료 시각으로 강제 완료된다
    let completed = state.stores.recordings.find_by_id(r1.id).unwrap();
    assert_eq!(completed.status, RecordingStatus::Completed);
    assert_eq!(completed.ended_at, Some(ended.end_time));

    // joined 참가자는 전원 퇴장 처리된다
    assert_eq!(state.stores.participants.count_joined(session_id), 0);

    // 강제 퇴장된 참가자도 SESSION_ENDED는 받는다
    let events = drain(&mut rx_host);
    assert!(events.iter().any(|event| matches!(
        event,
        ServerMessage::SessionEnded { session } if session.id == session_id
    )));
}

#[tokio::test]
async fn host_action_flow_emits_both_events() {
    let state = test_state();
    let host = seed_user(&state, "host");
    let guest = seed_user(&state, "guest");
    let space = seed_space(&state, host);
    let room = seed_room(&state, space, 4);
    let session_id = active_session(&state, room, host).await;

    let (_, mut rx_guest) = connect(&state, guest);
    state
        .participants
        .join(session_id, join_req(host))
        .await
        .unwrap();
    state
        .participants
        .join(
            session_id,
            JoinRequest {
                user_id: guest,
                display_name: None,
                role: None,
                audio_on: true,
                video_on: true,
            },
        )
        .await
        .unwrap();

    state
        .participants
        .host_action(session_id, host, HostActionKind::Mute, Some(guest))
        .await
        .unwrap();

    let events = drain(&mut rx_guest);
    let status_changed = events.iter().any(|event| matches!(
        event,
        ServerMessage::ParticipantStatusChanged { participant }
            if participant.user_id == guest && !participant.audio_on
    ));
    let host_action = events.iter().any(|event| matches!(
        event,
        ServerMessage::HostAction { action: HostActionKind::Mute, .. }
    ));
    assert!(status_changed);
    assert!(host_action);
}

#[tokio::test]
async fn disconnect_cascade_clears_presence_and_notifies_space() {
    let state = test_state();
    let walker = seed_user(&state, "walker");
    let watcher = seed_user(&state, "watcher");
    let space = seed_space(&state, watcher);
    let zone = state.stores.zones.save(Zone {
        id: Uuid::new_v4(),
        space_id: space,
        name: "lounge".to_string(),
        x: 0,
        y: 0,
        width: 10,
        height: 10,
    });

    let (walker_conn, _walker_rx) = connect(&state, walker);
    let (_, mut watcher_rx) = connect(&state, watcher);

    handlers::handle_space_join(&state, watcher, space);
    handlers::handle_space_join(&state, walker, space);
    handlers::handle_position_update(&state, walker, space, Some(zone.id), 3, 4).unwrap();

    assert!(state.presence.members_of_space(space).contains(&walker));
    assert!(state.presence.members_of_zone(zone.id).contains(&walker));

    // 마지막 연결이 끊기면 프레즌스가 모두 정리된다
    handlers::handle_disconnect(&state, walker_conn);

    assert!(!state.connections.is_online(walker));
    assert!(!state.presence.members_of_space(space).contains(&walker));
    assert!(state.presence.members_of_zone(zone.id).is_empty());
    assert!(state.presence.presence_of(walker).is_none());

    // 공간에 남은 사용자는 이탈 통지를 받는다
    let events = drain(&mut watcher_rx);
    assert!(events.iter().any(|event| matches!(
        event,
        ServerMessage::SpaceLeft { user_id, .. } if *user_id == walker
    )));
}

#[tokio::test]
async fn rejoin_after_leave_reuses_participant_identity() {
    let state = test_state();
    let user = seed_user(&state, "boomerang");
    let space = seed_space(&state, user);
    let room = seed_room(&state, space, 4);
    let session_id = active_session(&state, room, user).await;

    let first = state.participants.join(session_id, join_req(user)).await.unwrap();
    state
        .participants
        .remove(session_id, user)
        .await
        .unwrap();

    let row = state.stores.participants.find_by_id(first.id).unwrap();
    assert_eq!(row.status, ParticipantStatus::Left);

    let second = state.participants.join(session_id, join_req(user)).await.unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.status, ParticipantStatus::Joined);
}
