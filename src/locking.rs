//! 内存文件锁：串行化同一排行榜文件的读取-合并-写回。

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time;

type LockMap = HashMap<String, Arc<Mutex<()>>>;

/// Manages asynchronous mutexes keyed by upload filename.
///
/// Entries live only while a guard or a waiter holds them, so the map never
/// grows past the number of files being written concurrently.
#[derive(Debug, Default)]
pub struct LockManager {
    locks: Arc<StdMutex<LockMap>>,
}

#[derive(Debug)]
pub struct LockTimeout;

/// Held across load-merge-save; releasing it prunes the idle map entry.
#[derive(Debug)]
pub struct FileLockGuard {
    key: String,
    locks: Arc<StdMutex<LockMap>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        prune_idle(&self.locks, &self.key);
    }
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在给定超时时间内获取文件锁，超时返回 Err。
    pub async fn lock_file_with_timeout(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<FileLockGuard, LockTimeout> {
        let key = name.to_string();
        let lock = lock_map(&self.locks)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let acquired = time::timeout(timeout, lock.lock_owned()).await;
        match acquired {
            Ok(guard) => Ok(FileLockGuard {
                key,
                locks: self.locks.clone(),
                guard: Some(guard),
            }),
            Err(_) => {
                prune_idle(&self.locks, &key);
                Err(LockTimeout)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        lock_map(&self.locks).len()
    }
}

fn lock_map(locks: &StdMutex<LockMap>) -> StdMutexGuard<'_, LockMap> {
    locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The map's own reference is the last one once no guard or waiter is left.
fn prune_idle(locks: &StdMutex<LockMap>, key: &str) {
    let mut map = lock_map(locks);
    if map.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
        map.remove(key);
    }
}
