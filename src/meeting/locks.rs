//! 키 단위 직렬화 락

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// 엔티티 키별 비동기 뮤텍스.
/// 같은 키의 변경은 상호 배제되고 다른 키는 완전히 병렬로 진행된다
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    /// 키에 해당하는 락 획득. 임계 구역 동안만 보유한다
    pub async fn acquire(&self, key: Uuid) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(key).or_default().clone();
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_key_is_mutually_exclusive() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let locks = Arc::new(KeyedLocks::default());
        let key = Uuid::new_v4();
        let in_section = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let in_section = in_section.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(key).await;
                // 임계 구역 안에서는 다른 태스크가 끼어들 수 없다
                assert!(!in_section.swap(true, Ordering::SeqCst));
                tokio::task::yield_now().await;
                in_section.store(false, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = KeyedLocks::default();
        let _a = locks.acquire(Uuid::new_v4()).await;
        // 다른 키는 즉시 획득된다
        let _b = locks.acquire(Uuid::new_v4()).await;
    }
}
