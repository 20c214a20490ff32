//! 회의실 관리

use crate::error::{CoreError, CoreResult};
use crate::meeting::KeyedLocks;
use crate::model::{MeetingRoom, RoomId, SessionStatus, SpaceId, UserId};
use crate::store::Stores;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// 회의실 생성/수정/삭제. 이름 유일성 검사는 공간 키 락 아래에서 수행한다
pub struct RoomManager {
    stores: Arc<Stores>,
    space_locks: Arc<KeyedLocks>,
}

impl RoomManager {
    pub fn new(stores: Arc<Stores>, space_locks: Arc<KeyedLocks>) -> Self {
        Self {
            stores,
            space_locks,
        }
    }

    /// 회의실 생성. 같은 공간에 같은 이름이 있으면 Conflict
    pub async fn create(
        &self,
        space_id: SpaceId,
        name: &str,
        capacity: usize,
        is_active: bool,
        creator_id: UserId,
    ) -> CoreResult<MeetingRoom> {
        self.stores
            .users
            .find_by_id(creator_id)
            .ok_or(CoreError::NotFound("user"))?;
        self.stores
            .spaces
            .find_by_id(space_id)
            .ok_or(CoreError::NotFound("space"))?;

        let _guard = self.space_locks.acquire(space_id).await;
        if self.stores.rooms.exists_by_name_and_space(name, space_id) {
            return Err(CoreError::Conflict(
                "meeting room with this name already exists in the space".to_string(),
            ));
        }

        let room = MeetingRoom {
            id: Uuid::new_v4(),
            space_id,
            name: name.to_string(),
            capacity,
            is_active,
            created_at: Utc::now(),
        };
        let room = self.stores.rooms.save(room);
        tracing::info!(room_id = %room.id, space_id = %space_id, name = %room.name, "Meeting room created");
        Ok(room)
    }

    /// 회의실 수정. 이름 변경 시 충돌 검사
    pub async fn update(
        &self,
        room_id: RoomId,
        name: &str,
        capacity: usize,
        is_active: bool,
    ) -> CoreResult<MeetingRoom> {
        let room = self
            .stores
            .rooms
            .find_by_id(room_id)
            .ok_or(CoreError::NotFound("meeting room"))?;

        let _guard = self.space_locks.acquire(room.space_id).await;
        let mut room = self
            .stores
            .rooms
            .find_by_id(room_id)
            .ok_or(CoreError::NotFound("meeting room"))?;

        if room.name != name && self.stores.rooms.exists_by_name_and_space(name, room.space_id) {
            return Err(CoreError::Conflict(
                "meeting room with this name already exists in the space".to_string(),
            ));
        }

        room.name = name.to_string();
        room.capacity = capacity;
        room.is_active = is_active;
        Ok(self.stores.rooms.save(room))
    }

    /// 회의실 삭제. 진행 중 세션이 있으면 Conflict
    pub async fn delete(&self, room_id: RoomId) -> CoreResult<()> {
        let room = self
            .stores
            .rooms
            .find_by_id(room_id)
            .ok_or(CoreError::NotFound("meeting room"))?;

        let _guard = self.space_locks.acquire(room.space_id).await;
        let active = self
            .stores
            .sessions
            .find_by_room_and_status(room_id, SessionStatus::Active);
        if !active.is_empty() {
            return Err(CoreError::Conflict(
                "cannot delete room with active sessions".to_string(),
            ));
        }

        self.stores.rooms.delete(room_id);
        tracing::info!(room_id = %room_id, "Meeting room deleted");
        Ok(())
    }

    pub fn get(&self, room_id: RoomId) -> CoreResult<MeetingRoom> {
        self.stores
            .rooms
            .find_by_id(room_id)
            .ok_or(CoreError::NotFound("meeting room"))
    }
}
