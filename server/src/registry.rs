//! Directory of authenticated sessions for the chat relay
//!
//! This module tracks which clients are currently reachable by broadcast:
//! - Registration of sessions once they authenticate
//! - Removal when a session terminates, tolerant of repeated removal
//! - Point-in-time snapshots used to fan out messages
//! - Capacity management for the number of concurrent chatters
//!
//! The registry is the only mutable state shared between connection tasks.
//! Its lock is held for the duration of a map operation or a snapshot copy
//! and never across network I/O.

use crate::session::SessionHandle;
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Reasons a session could not be registered
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("identity {0} is already in use")]
    IdentityTaken(String),
    #[error("server full ({0} clients)")]
    Full(usize),
}

/// Concurrent mapping from identity to the session reachable under it
///
/// All operations take `&self`, so a single registry can be shared between
/// every connection task behind an `Arc`.
pub struct Registry {
    /// Registered sessions keyed by identity
    entries: Mutex<HashMap<String, Arc<SessionHandle>>>,
    /// Maximum number of concurrent registered sessions
    max_clients: usize,
}

impl Registry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_clients,
        }
    }

    /// Inserts or overwrites the entry for `identity`
    ///
    /// Returns the session previously registered under that identity. It is
    /// not closed; it simply stops receiving broadcasts.
    pub async fn add(
        &self,
        identity: &str,
        session: Arc<SessionHandle>,
    ) -> Option<Arc<SessionHandle>> {
        let previous = self
            .entries
            .lock()
            .await
            .insert(identity.to_string(), session);
        info!("Registered {}", identity);
        previous
    }

    /// Registers `identity` only if it is free and capacity allows
    ///
    /// This is the variant used during authentication: it keeps the
    /// one-identity-one-session invariant instead of silently orphaning an
    /// earlier session.
    pub async fn try_add(
        &self,
        identity: &str,
        session: Arc<SessionHandle>,
    ) -> Result<(), RegistryError> {
        let mut entries = self.entries.lock().await;

        if entries.contains_key(identity) {
            return Err(RegistryError::IdentityTaken(identity.to_string()));
        }
        if entries.len() >= self.max_clients {
            return Err(RegistryError::Full(self.max_clients));
        }

        entries.insert(identity.to_string(), session);
        info!("Registered {} ({} online)", identity, entries.len());
        Ok(())
    }

    /// Removes the entry for `identity`
    ///
    /// Returns true if an entry was removed. Removing an absent identity is
    /// a no-op, so two failure paths racing to clean up are harmless.
    pub async fn remove(&self, identity: &str) -> bool {
        let removed = self.entries.lock().await.remove(identity).is_some();
        if removed {
            info!("Unregistered {}", identity);
        }
        removed
    }

    /// Copies out every registered session
    ///
    /// The copy is taken under the lock and returned after releasing it, so
    /// callers can perform slow sends without blocking registration.
    pub async fn snapshot(&self) -> Vec<(String, Arc<SessionHandle>)> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|(identity, session)| (identity.clone(), Arc::clone(session)))
            .collect()
    }

    pub async fn contains(&self, identity: &str) -> bool {
        self.entries.lock().await.contains_key(identity)
    }

    pub async fn identities(&self) -> Vec<String> {
        self.entries.lock().await.keys().cloned().collect()
    }

    /// Returns the number of registered sessions
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }
}
