//! In-memory thread lookup for testing.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{ThreadLookup, ThreadLookupError};

#[derive(Debug, Default)]
struct LookupState {
    threads: HashMap<String, Option<String>>,
    force_error: bool,
    lookups: usize,
}

/// Thread id → application id map.
#[derive(Debug, Default)]
pub struct InMemoryThreadLookup {
    state: Mutex<LookupState>,
}

impl InMemoryThreadLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a thread belonging to `application_id`.
    pub fn with_thread(self, thread_id: impl Into<String>, application_id: impl Into<String>) -> Self {
        self.set_thread(thread_id, application_id);
        self
    }

    /// Adds or moves a thread at runtime.
    pub fn set_thread(&self, thread_id: impl Into<String>, application_id: impl Into<String>) {
        self.lock()
            .threads
            .insert(thread_id.into(), Some(application_id.into()));
    }

    /// Adds a thread that has no application id.
    pub fn with_unassigned_thread(self, thread_id: impl Into<String>) -> Self {
        self.lock().threads.insert(thread_id.into(), None);
        self
    }

    /// Makes every lookup fail with a datastore error.
    pub fn set_error(&self, force_error: bool) {
        self.lock().force_error = force_error;
    }

    /// Number of lookups performed.
    pub fn lookup_count(&self) -> usize {
        self.lock().lookups
    }

    fn lock(&self) -> MutexGuard<'_, LookupState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ThreadLookup for InMemoryThreadLookup {
    async fn application_id(&self, thread_id: &str) -> Result<Option<String>, ThreadLookupError> {
        let mut state = self.lock();
        state.lookups += 1;
        if state.force_error {
            return Err(ThreadLookupError::Database("lookup failed".to_string()));
        }
        match state.threads.get(thread_id) {
            None => Ok(None),
            Some(Some(application_id)) => Ok(Some(application_id.clone())),
            Some(None) => Err(ThreadLookupError::MissingApplicationId(thread_id.to_string())),
        }
    }
}
