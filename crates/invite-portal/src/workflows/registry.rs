use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::Mutex as AsyncMutex;

use crate::workflows::intake::domain::SessionId;

pub type Handle<T> = Arc<AsyncMutex<T>>;

struct Entry<T> {
    handle: Handle<T>,
    last_seen: DateTime<Local>,
}

/// Live sessions keyed by id. Every lookup refreshes the entry's last-seen
/// instant; entries idle for longer than the ttl are dropped by `evict_idle`.
pub struct SessionRegistry<T> {
    entries: Mutex<HashMap<SessionId, Entry<T>>>,
    ttl: Duration,
}

impl<T> SessionRegistry<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn insert(&self, id: SessionId, session: T, now: DateTime<Local>) -> Handle<T> {
        let handle = Arc::new(AsyncMutex::new(session));
        self.lock().insert(
            id,
            Entry {
                handle: Arc::clone(&handle),
                last_seen: now,
            },
        );
        handle
    }

    pub fn get(&self, id: &SessionId, now: DateTime<Local>) -> Option<Handle<T>> {
        let mut entries = self.lock();
        let entry = entries.get_mut(id)?;
        entry.last_seen = now;
        Some(Arc::clone(&entry.handle))
    }

    /// Looks `id` up, or registers whatever `restore` rebuilds for it.
    pub fn get_or_restore<E, F>(
        &self,
        id: &SessionId,
        now: DateTime<Local>,
        restore: F,
    ) -> Result<Option<Handle<T>>, E>
    where
        F: FnOnce() -> Result<Option<T>, E>,
    {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(id) {
            entry.last_seen = now;
            return Ok(Some(Arc::clone(&entry.handle)));
        }
        let Some(session) = restore()? else {
            return Ok(None);
        };
        let handle = Arc::new(AsyncMutex::new(session));
        entries.insert(
            id.clone(),
            Entry {
                handle: Arc::clone(&handle),
                last_seen: now,
            },
        );
        Ok(Some(handle))
    }

    pub fn remove(&self, id: &SessionId) -> Option<Handle<T>> {
        self.lock().remove(id).map(|entry| entry.handle)
    }

    /// Drops every entry not seen within the ttl and returns their ids.
    pub fn evict_idle(&self, now: DateTime<Local>) -> Vec<SessionId> {
        let mut entries = self.lock();
        let idle: Vec<SessionId> = entries
            .iter()
            .filter(|(_, entry)| {
                (now - entry.last_seen)
                    .to_std()
                    .is_ok_and(|elapsed| elapsed >= self.ttl)
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in &idle {
            entries.remove(id);
        }
        idle
    }

    pub fn handles(&self) -> Vec<Handle<T>> {
        self.lock()
            .values()
            .map(|entry| Arc::clone(&entry.handle))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Entry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn noon() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 14, 12, 0, 0)
            .earliest()
            .expect("fixture is representable")
    }

    fn id(raw: &str) -> SessionId {
        SessionId(raw.to_string())
    }

    #[test]
    fn idle_entries_are_evicted_and_touched_ones_kept() {
        let registry = SessionRegistry::new(Duration::from_secs(600));
        let start = noon();
        registry.insert(id("idle"), 1u8, start);
        registry.insert(id("busy"), 2u8, start);

        let later = start + ChronoDuration::minutes(8);
        assert!(registry.get(&id("busy"), later).is_some());

        let evicted = registry.evict_idle(start + ChronoDuration::minutes(12));
        assert_eq!(evicted, vec![id("idle")]);
        assert!(registry.get(&id("idle"), start).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn restore_only_registers_when_something_is_rebuilt() {
        let registry: SessionRegistry<u8> = SessionRegistry::new(Duration::from_secs(60));
        let missing: Result<_, ()> = registry.get_or_restore(&id("gone"), noon(), || Ok(None));
        assert!(matches!(missing, Ok(None)));
        assert!(registry.is_empty());

        let restored: Result<_, ()> = registry.get_or_restore(&id("draft"), noon(), || Ok(Some(7)));
        assert!(matches!(restored, Ok(Some(_))));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&id("draft")).is_some());
        assert!(registry.is_empty());
    }
}
