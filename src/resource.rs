//! ResourceArc Wrappers
//!
//! Persistent per-document state handed to the BEAM. Each session sits
//! behind a mutex, so calls from different processes on the same document
//! run one at a time.

use crate::session::{DocumentSession, SessionOptions};
use rustler::ResourceArc;
use std::sync::Mutex;

/// Wrapper for DocumentSession that can be stored in a ResourceArc
pub struct SessionResource {
    pub inner: Mutex<DocumentSession>,
}

impl SessionResource {
    pub fn new(text: &str) -> Self {
        Self::from_session(DocumentSession::new(text, SessionOptions::default()))
    }

    pub fn from_session(session: DocumentSession) -> Self {
        SessionResource {
            inner: Mutex::new(session),
        }
    }

    /// Run `f` with exclusive access to the session.
    ///
    /// # Errors
    ///
    /// Returns `"mutex_poisoned"` if an earlier call panicked while holding
    /// the lock.
    pub fn with_session<F, R>(&self, f: F) -> Result<R, &'static str>
    where
        F: FnOnce(&mut DocumentSession) -> R,
    {
        let mut guard = self.inner.lock().map_err(|_| "mutex_poisoned")?;
        Ok(f(&mut guard))
    }
}

#[rustler::resource_impl]
impl rustler::Resource for SessionResource {}

/// Type alias for the ResourceArc
pub type SessionRef = ResourceArc<SessionResource>;
