use std::sync::Mutex;
use std::sync::MutexGuard;

use tracing::warn;

pub fn mutex_lock_or_recover<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        warn!("Recovering from poisoned mutex");
        poisoned.into_inner()
    })
}
