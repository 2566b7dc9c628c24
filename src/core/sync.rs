//! Lock-poisoning helpers
//!
//! The queue hot path guards its shared state with std mutexes and rwlocks.
//! A panic while a lock is held poisons it; these helpers convert that into
//! a domain error instead of propagating the panic to unrelated callers.

use std::sync::{LockResult, MutexGuard, RwLockReadGuard, RwLockWriteGuard};

/// Convert a poisoned mutex into an application error.
pub fn lock_mutex<T, E>(
    result: LockResult<MutexGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<MutexGuard<T>, E> {
    result.map_err(|poison| {
        error_constructor(format!(
            "mutex poisoned by a panic while the lock was held: {:?}",
            poison
        ))
    })
}

/// Convert a poisoned rwlock read into an application error.
pub fn read_rwlock<T, E>(
    result: LockResult<RwLockReadGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockReadGuard<T>, E> {
    result.map_err(|poison| {
        error_constructor(format!(
            "rwlock poisoned by a panic while a write lock was held: {:?}",
            poison
        ))
    })
}

/// Convert a poisoned rwlock write into an application error.
pub fn write_rwlock<T, E>(
    result: LockResult<RwLockWriteGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<T>, E> {
    result.map_err(|poison| {
        error_constructor(format!(
            "rwlock poisoned by a panic while the lock was held: {:?}",
            poison
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex, RwLock};
    use std::thread;

    #[derive(Debug, PartialEq)]
    struct TestError(String);

    #[test]
    fn lock_mutex_passes_through_healthy_lock() {
        let mutex = Mutex::new(7);
        let guard = lock_mutex(mutex.lock(), TestError).unwrap();
        assert_eq!(*guard, 7);
    }

    #[test]
    fn lock_mutex_surfaces_poisoning() {
        let mutex = Arc::new(Mutex::new(7));
        let clone = Arc::clone(&mutex);
        let _ = thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        let err = lock_mutex(mutex.lock(), TestError).unwrap_err();
        assert!(err.0.contains("poisoned"));
    }

    #[test]
    fn rwlock_helpers_pass_through_healthy_lock() {
        let rwlock = RwLock::new(1);
        assert_eq!(*read_rwlock(rwlock.read(), TestError).unwrap(), 1);
        let mut guard = write_rwlock(rwlock.write(), TestError).unwrap();
        *guard = 2;
        drop(guard);
        assert_eq!(*read_rwlock(rwlock.read(), TestError).unwrap(), 2);
    }

    #[test]
    fn rwlock_read_surfaces_poisoning() {
        let rwlock = Arc::new(RwLock::new(1));
        let clone = Arc::clone(&rwlock);
        let _ = thread::spawn(move || {
            let _guard = clone.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(read_rwlock(rwlock.read(), TestError).is_err());
        assert!(write_rwlock(rwlock.write(), TestError).is_err());
    }
}
