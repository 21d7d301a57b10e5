//! Session storage for chat transcripts.
//!
//! The orchestrator owns a [`SessionStore`]; the in-memory implementation
//! is bounded by an idle TTL and a least-recently-used capacity limit.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use swachtrack_core::config::SessionConfig;
use swachtrack_core::types::{Message, Session};

use crate::error::ChatError;

/// Keyed storage of chat transcripts.
pub trait SessionStore: Send + Sync {
    /// Fetch a session, or a fresh one holding only the system message if the
    /// id is unseen. The flag is `true` for a fresh session.
    ///
    /// Fresh sessions are not stored until the first [`put`](Self::put), so a
    /// turn that fails before writing leaves the id unseen.
    fn load(&self, id: &str) -> Result<(Session, bool), ChatError>;

    /// Replace the stored transcript for `id`, creating the entry if needed.
    fn put(&self, id: &str, messages: Vec<Message>) -> Result<(), ChatError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Entry {
    messages: Vec<Message>,
    last_access: Instant,
}

/// Process-local session store with TTL and LRU eviction.
///
/// Reads and writes are individually locked, but a load followed by a put is
/// not atomic: concurrent turns on one session id race and the last put wins.
pub struct InMemorySessionStore {
    system_prompt: String,
    max_sessions: usize,
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemorySessionStore {
    pub fn new(system_prompt: impl Into<String>, max_sessions: usize, ttl: Duration) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            max_sessions: max_sessions.max(1),
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(system_prompt: impl Into<String>, config: &SessionConfig) -> Self {
        Self::new(
            system_prompt,
            config.max_sessions,
            Duration::from_secs(u64::from(config.ttl_minutes) * 60),
        )
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock()
            .map(|entries| {
                entries
                    .get(id)
                    .is_some_and(|e| e.last_access.elapsed() <= self.ttl)
            })
            .unwrap_or(false)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, ChatError> {
        self.entries
            .lock()
            .map_err(|e| ChatError::Session(format!("session lock poisoned: {}", e)))
    }

    fn purge_expired(&self, entries: &mut HashMap<String, Entry>) {
        let before = entries.len();
        entries.retain(|_, e| e.last_access.elapsed() <= self.ttl);
        let expired = before - entries.len();
        if expired > 0 {
            tracing::debug!(expired, "Expired idle chat sessions");
        }
    }

    /// Make room for one more session.
    fn evict_for_insert(&self, entries: &mut HashMap<String, Entry>) {
        while entries.len() >= self.max_sessions {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    entries.remove(&id);
                    tracing::debug!(session_id = %id, "Evicted least recently used session");
                }
                None => break,
            }
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, id: &str) -> Result<(Session, bool), ChatError> {
        let mut entries = self.lock()?;
        self.purge_expired(&mut entries);

        if let Some(entry) = entries.get_mut(id) {
            entry.last_access = Instant::now();
            return Ok((
                Session {
                    id: id.to_string(),
                    messages: entry.messages.clone(),
                },
                false,
            ));
        }

        Ok((
            Session {
                id: id.to_string(),
                messages: vec![Message::system(self.system_prompt.clone())],
            },
            true,
        ))
    }

    fn put(&self, id: &str, messages: Vec<Message>) -> Result<(), ChatError> {
        let mut entries = self.lock()?;
        self.purge_expired(&mut entries);
        if !entries.contains_key(id) {
            self.evict_for_insert(&mut entries);
            tracing::debug!(session_id = %id, "Created chat session");
        }
        entries.insert(
            id.to_string(),
            Entry {
                messages,
                last_access: Instant::now(),
            },
        );
        Ok(())
    }

    fn len(&self) -> usize {
        self.lock().map(|e| e.len()).unwrap_or(0)
    }
}
