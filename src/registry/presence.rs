//! 공간 프레즌스 트래커

use crate::error::{CoreError, CoreResult};
use crate::model::{PresenceRecord, PresenceStatus, SpaceId, UserId, ZoneId};
use crate::store::Stores;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// 사용자의 공간/구역 점유와 위치를 추적한다. 회의 로직과 독립적이다
pub struct PresenceTracker {
    stores: Arc<Stores>,
    /// space_id -> 멤버 집합
    space_members: DashMap<SpaceId, HashSet<UserId>>,
    /// zone_id -> 멤버 집합
    zone_members: DashMap<ZoneId, HashSet<UserId>>,
    /// user_id -> 현재 프레즌스 레코드 (사용자당 최대 1개)
    records: DashMap<UserId, PresenceRecord>,
}

impl PresenceTracker {
    pub fn new(stores: Arc<Stores>) -> Self {
        Self {
            stores,
            space_members: DashMap::new(),
            zone_members: DashMap::new(),
            records: DashMap::new(),
        }
    }

    /// 공간 참여 (멱등)
    pub fn join_space(&self, user_id: UserId, space_id: SpaceId) {
        self.space_members
            .entry(space_id)
            .or_default()
            .insert(user_id);
    }

    /// 공간 이탈. 멤버가 아니면 무시
    pub fn leave_space(&self, user_id: UserId, space_id: SpaceId) {
        if let Some(mut set) = self.space_members.get_mut(&space_id) {
            set.remove(&user_id);
        }
        self.space_members.retain(|_, s| !s.is_empty());

        // 해당 공간의 레코드였다면 함께 삭제
        let stale = self
            .records
            .get(&user_id)
            .map(|r| r.space_id == space_id)
            .unwrap_or(false);
        if stale {
            if let Some((_, record)) = self.records.remove(&user_id) {
                if let Some(zone_id) = record.zone_id {
                    self.drop_zone_member(zone_id, user_id);
                }
            }
        }
    }

    /// 위치 갱신 (last-write-wins, 전송 순서 보정 없음).
    /// 구역이 주어지면 공간 소속 여부를 검증한다
    pub fn update_position(
        &self,
        user_id: UserId,
        space_id: SpaceId,
        zone_id: Option<ZoneId>,
        x: i32,
        y: i32,
    ) -> CoreResult<PresenceRecord> {
        self.stores
            .spaces
            .find_by_id(space_id)
            .ok_or(CoreError::NotFound("space"))?;

        if let Some(zid) = zone_id {
            let zone = self
                .stores
                .zones
                .find_by_id(zid)
                .ok_or(CoreError::NotFound("zone"))?;
            if zone.space_id != space_id {
                return Err(CoreError::InvalidZone {
                    zone_id: zid,
                    space_id,
                });
            }
        }

        // 구역 이동 시 이전 구역 집합에서 제거
        let prev_zone = self.records.get(&user_id).and_then(|r| r.zone_id);
        if let Some(old) = prev_zone {
            if zone_id != Some(old) {
                self.drop_zone_member(old, user_id);
            }
        }
        if let Some(zid) = zone_id {
            self.zone_members.entry(zid).or_default().insert(user_id);
        }

        let record = PresenceRecord {
            user_id,
            space_id,
            zone_id,
            x,
            y,
            status: PresenceStatus::Online,
            last_active: Utc::now(),
        };
        self.records.insert(user_id, record.clone());
        Ok(record)
    }

    pub fn members_of_space(&self, space_id: SpaceId) -> HashSet<UserId> {
        self.space_members
            .get(&space_id)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn members_of_zone(&self, zone_id: ZoneId) -> HashSet<UserId> {
        self.zone_members
            .get(&zone_id)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn presence_of(&self, user_id: UserId) -> Option<PresenceRecord> {
        self.records.get(&user_id).map(|r| r.clone())
    }

    /// 모든 공간/구역에서 사용자 제거. 마지막 연결 종료 캐스케이드에서 호출된다.
    /// 사용자가 속해 있던 공간 목록을 반환한다
    pub fn remove_user(&self, user_id: UserId) -> Vec<SpaceId> {
        let mut left_spaces = Vec::new();
        for mut entry in self.space_members.iter_mut() {
            if entry.value_mut().remove(&user_id) {
                left_spaces.push(*entry.key());
            }
        }
        self.space_members.retain(|_, s| !s.is_empty());

        for mut entry in self.zone_members.iter_mut() {
            entry.value_mut().remove(&user_id);
        }
        self.zone_members.retain(|_, s| !s.is_empty());

        self.records.remove(&user_id);
        left_spaces
    }

    /// 유휴 사용자를 away로 전환. 전환된 수를 반환한다
    pub fn sweep_idle(&self, away_after: Duration) -> usize {
        let cutoff = Utc::now() - away_after;
        let mut swept = 0;
        for mut record in self.records.iter_mut() {
            if record.status == PresenceStatus::Online && record.last_active < cutoff {
                record.status = PresenceStatus::Away;
                swept += 1;
            }
        }
        swept
    }

    fn drop_zone_member(&self, zone_id: ZoneId, user_id: UserId) {
        if let Some(mut set) = self.zone_members.get_mut(&zone_id) {
            set.remove(&user_id);
        }
        self.zone_members.retain(|_, s| !s.is_empty());
    }
}
