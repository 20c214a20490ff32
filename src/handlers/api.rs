//! HTTP 제어 API 핸들러
//!
//! CRUD 본 표면은 외부 협력자의 몫이고, 여기서는 코어 연산을
//! 구동하는 데 필요한 최소 경로만 노출한다

use crate::error::{CoreError, CoreResult};
use crate::meeting::NewSession;
use crate::model::{
    MeetingRoom, MeetingSession, Participant, Recording, RecordingId, RoomId, SessionId, SpaceId,
    User, UserId, VirtualSpace, Zone,
};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// 사용자 생성 요청
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUser>,
) -> Json<User> {
    let user = state.stores.users.save(User {
        id: Uuid::new_v4(),
        username: req.username,
    });
    Json(user)
}

/// 가상 공간 생성 요청
#[derive(Debug, Deserialize)]
pub struct CreateSpace {
    pub name: String,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub is_public: bool,
    pub creator_id: UserId,
}

pub async fn create_space(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSpace>,
) -> CoreResult<Json<VirtualSpace>> {
    state
        .stores
        .users
        .find_by_id(req.creator_id)
        .ok_or(CoreError::NotFound("user"))?;
    let space = state.stores.spaces.save(VirtualSpace {
        id: Uuid::new_v4(),
        name: req.name,
        width: req.width,
        height: req.height,
        is_public: req.is_public,
        creator_id: req.creator_id,
    });
    Ok(Json(space))
}

/// 구역 생성 요청
#[derive(Debug, Deserialize)]
pub struct CreateZone {
    pub space_id: SpaceId,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

pub async fn create_zone(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateZone>,
) -> CoreResult<Json<Zone>> {
    state
        .stores
        .spaces
        .find_by_id(req.space_id)
        .ok_or(CoreError::NotFound("space"))?;
    let zone = state.stores.zones.save(Zone {
        id: Uuid::new_v4(),
        space_id: req.space_id,
        name: req.name,
        x: req.x,
        y: req.y,
        width: req.width,
        height: req.height,
    });
    Ok(Json(zone))
}

pub async fn list_space_zones(
    State(state): State<Arc<AppState>>,
    Path(space_id): Path<SpaceId>,
) -> CoreResult<Json<Vec<Zone>>> {
    state
        .stores
        .spaces
        .find_by_id(space_id)
        .ok_or(CoreError::NotFound("space"))?;
    Ok(Json(state.stores.zones.find_by_space(space_id)))
}

pub async fn list_space_rooms(
    State(state): State<Arc<AppState>>,
    Path(space_id): Path<SpaceId>,
) -> CoreResult<Json<Vec<MeetingRoom>>> {
    state
        .stores
        .spaces
        .find_by_id(space_id)
        .ok_or(CoreError::NotFound("space"))?;
    Ok(Json(state.stores.rooms.find_by_space(space_id)))
}

/// 회의실 생성 요청
#[derive(Debug, Deserialize)]
pub struct CreateRoom {
    pub space_id: SpaceId,
    pub name: String,
    pub capacity: Option<usize>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub creator_id: UserId,
}

/// 회의실 수정 요청
#[derive(Debug, Deserialize)]
pub struct UpdateRoom {
    pub name: String,
    pub capacity: usize,
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoom>,
) -> CoreResult<Json<MeetingRoom>> {
    let capacity = req
        .capacity
        .unwrap_or(state.config.meeting.default_room_capacity);
    let room = state
        .rooms
        .create(req.space_id, &req.name, capacity, req.is_active, req.creator_id)
        .await?;
    Ok(Json(room))
}

pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<RoomId>,
) -> CoreResult<Json<MeetingRoom>> {
    state.rooms.get(room_id).map(Json)
}

pub async fn update_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<RoomId>,
    Json(req): Json<UpdateRoom>,
) -> CoreResult<Json<MeetingRoom>> {
    let room = state
        .rooms
        .update(room_id, &req.name, req.capacity, req.is_active)
        .await?;
    Ok(Json(room))
}

pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<RoomId>,
) -> CoreResult<StatusCode> {
    state.rooms.delete(room_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewSession>,
) -> CoreResult<Json<MeetingSession>> {
    state.sessions.create(req).await.map(Json)
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> CoreResult<Json<MeetingSession>> {
    state.sessions.get(session_id).map(Json)
}

pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> CoreResult<Json<MeetingSession>> {
    state.sessions.start(session_id).await.map(Json)
}

pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> CoreResult<Json<MeetingSession>> {
    state.sessions.end(session_id).await.map(Json)
}

pub async fn cancel_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> CoreResult<Json<MeetingSession>> {
    state.sessions.cancel(session_id).await.map(Json)
}

pub async fn list_participants(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> CoreResult<Json<Vec<Participant>>> {
    state.sessions.get(session_id)?;
    Ok(Json(state.stores.participants.find_by_session(session_id)))
}

/// 녹화 시작 요청
#[derive(Debug, Deserialize)]
pub struct StartRecording {
    pub user_id: UserId,
}

pub async fn start_recording(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
    Json(req): Json<StartRecording>,
) -> CoreResult<Json<Recording>> {
    state.recordings.start(session_id, req.user_id).await.map(Json)
}

pub async fn list_recordings(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> CoreResult<Json<Vec<Recording>>> {
    state.sessions.get(session_id)?;
    Ok(Json(state.stores.recordings.find_by_session(session_id)))
}

pub async fn stop_recording(
    State(state): State<Arc<AppState>>,
    Path(recording_id): Path<RecordingId>,
) -> CoreResult<Json<Recording>> {
    state.recordings.stop(recording_id).await.map(Json)
}

/// 녹화 공개 설정 요청
#[derive(Debug, Deserialize)]
pub struct ShareRecording {
    pub is_public: bool,
}

pub async fn share_recording(
    State(state): State<Arc<AppState>>,
    Path(recording_id): Path<RecordingId>,
    Json(req): Json<ShareRecording>,
) -> CoreResult<Json<Recording>> {
    state.recordings.share(recording_id, req.is_public).map(Json)
}
