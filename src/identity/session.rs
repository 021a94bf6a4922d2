use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::navigation::SessionState;
use crate::tprintln;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no live session for '{identity}'")]
    NotFound { identity: String },
    #[error("random source unavailable: {0}")]
    Rng(getrandom::Error),
}

/// 256-bit random id, base64url without padding.
pub(crate) fn gen_id() -> Result<String, SessionError> {
    encode_id(getrandom::getrandom)
}

fn encode_id(fill: impl FnOnce(&mut [u8]) -> Result<(), getrandom::Error>) -> Result<String, SessionError> {
    let mut buf = [0u8; 32];
    fill(&mut buf).map_err(SessionError::Rng)?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

#[derive(Debug)]
struct SessionEntry {
    session_id: String,
    state: Arc<Mutex<SessionState>>,
}

/// Shared handle on one identity's browsing state.
///
/// All access goes through the entry's own mutex, so two requests for the same
/// identity are serialized while other identities proceed independently.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    identity: String,
    session_id: String,
    state: Arc<Mutex<SessionState>>,
}

impl SessionHandle {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run `f` with exclusive access to the state. Keep `f` free of I/O.
    pub fn with<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut guard = self.state.lock();
        f(&mut guard)
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.lock().clone()
    }
}

/// Process-wide table of logged-in identities and their browsing state.
///
/// The outer `RwLock` is only held for the map lookup/insert/remove; mutation of
/// a state happens under that entry's `Mutex` after the outer lock is released.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: RwLock<HashMap<String, Arc<SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live entry for `identity`, creating an empty one if absent.
    /// Fails only when a fresh session id cannot be drawn.
    pub fn login(&self, identity: &str) -> Result<SessionHandle, SessionError> {
        if let Some(ent) = self.entries.read().get(identity) {
            return Ok(handle(identity, ent));
        }
        let session_id = gen_id()?;
        let mut map = self.entries.write();
        // another request may have inserted it between the two locks
        let ent = map.entry(identity.to_string()).or_insert_with(|| {
            tprintln!("session.login user={} sid={}", identity, session_id);
            Arc::new(SessionEntry { session_id, state: Arc::new(Mutex::new(SessionState::new())) })
        });
        Ok(handle(identity, ent))
    }

    pub fn get(&self, identity: &str) -> Result<SessionHandle, SessionError> {
        self.entries
            .read()
            .get(identity)
            .map(|ent| handle(identity, ent))
            .ok_or_else(|| SessionError::NotFound { identity: identity.to_string() })
    }

    /// Like `get`, but also requires the entry to be the one `session_id` was issued for.
    pub fn resolve(&self, identity: &str, session_id: &str) -> Result<SessionHandle, SessionError> {
        let h = self.get(identity)?;
        if h.session_id != session_id {
            tprintln!("session.resolve stale sid for user={}", identity);
            return Err(SessionError::NotFound { identity: identity.to_string() });
        }
        Ok(h)
    }

    /// Drop the entry. Returns false if there was nothing to drop.
    pub fn logout(&self, identity: &str) -> bool {
        let removed = self.entries.write().remove(identity).is_some();
        tprintln!("session.logout user={} removed={}", identity, removed);
        removed
    }

    pub fn live_count(&self) -> usize {
        self.entries.read().len()
    }
}

fn handle(identity: &str, ent: &Arc<SessionEntry>) -> SessionHandle {
    SessionHandle {
        identity: identity.to_string(),
        session_id: ent.session_id.clone(),
        state: ent.state.clone(),
    }
}
