//! Registry of destination sessions.
//!
//! [`SessionRegistry`] maps destination strings to live
//! [`DestinationSession`]s, creating a session (and spawning its handler
//! task) on first subscription and tearing it down once its last
//! subscription is removed or its handler returns.
//!
//! Lock discipline: one synchronous mutex guards registry membership, and
//! each session guards its own subscription list. The registry lock may be
//! taken around a session-lock operation (insert during
//! [`SessionRegistry::add_subscription`]) but neither lock is ever held
//! across an `.await`; teardown cancels and awaits handler tasks only
//! after releasing the lock.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    connection::StompConnection,
    error::ProtocolError,
    metrics,
    session::DestinationSession,
    subscription::Subscription,
};

/// The per-destination routine driven by a session's handler task.
///
/// One handler instance serves every destination; it receives the session
/// it runs for and typically loops over [`DestinationSession::recv`],
/// fanning replies out with [`DestinationSession::send_all`]. Returning
/// ends the session: the registry detaches and closes it.
#[async_trait]
pub trait SessionHandler: Send + Sync + 'static {
    /// Runs the destination's message loop until the session closes.
    async fn run(&self, session: Arc<DestinationSession>);
}

struct SessionEntry {
    session: Arc<DestinationSession>,
    task: JoinHandle<()>,
}

/// Process-wide map of destination string to live session.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    handler: Arc<dyn SessionHandler>,
}

impl SessionRegistry {
    /// Creates a registry whose sessions run `handler`.
    #[must_use]
    pub fn new(handler: Arc<dyn SessionHandler>) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(HashMap::new()),
            handler,
        })
    }

    /// Registers `subscription` on its destination, creating the
    /// destination session (and spawning its handler task) if none exists.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::DuplicateSubscription`] when the owning
    /// connection already holds a subscription with the same id on that
    /// destination.
    pub fn add_subscription(self: &Arc<Self>, subscription: Subscription) -> Result<(), ProtocolError> {
        let destination = subscription.destination().to_owned();
        let mut sessions = self.sessions.lock().expect("registry lock poisoned");
        let entry = sessions
            .entry(destination)
            .or_insert_with_key(|destination| self.spawn_session(destination));
        entry.session.insert(subscription)
    }

    /// Removes every subscription matching the connection and id pair.
    ///
    /// Subscription ids are only unique within a session, so removal is
    /// broadcast across all sessions. Sessions left without subscribers
    /// are detached, closed, and their handler tasks awaited before this
    /// returns.
    pub async fn remove_subscription(&self, connection: &StompConnection, subscription_id: &str) {
        let detached: Vec<SessionEntry> = {
            let mut sessions = self.sessions.lock().expect("registry lock poisoned");
            for entry in sessions.values() {
                entry.session.remove_matching(connection, subscription_id);
            }
            let empty: Vec<String> = sessions
                .iter()
                .filter(|(_, entry)| entry.session.subscription_count() == 0)
                .map(|(destination, _)| destination.clone())
                .collect();
            empty
                .iter()
                .filter_map(|destination| sessions.remove(destination))
                .collect()
        };

        for entry in detached {
            debug!(destination = %entry.session.destination(), "tearing down empty session");
            teardown(entry).await;
        }
    }

    /// Looks up the live session for `destination`, if any.
    #[must_use]
    pub fn session(&self, destination: &str) -> Option<Arc<DestinationSession>> {
        self.sessions
            .lock()
            .expect("registry lock poisoned")
            .get(destination)
            .map(|entry| Arc::clone(&entry.session))
    }

    /// Shuts down every session and clears the registry.
    pub async fn close(&self) {
        let entries: Vec<SessionEntry> = {
            let mut sessions = self.sessions.lock().expect("registry lock poisoned");
            sessions.drain().map(|(_, entry)| entry).collect()
        };
        for entry in entries {
            teardown(entry).await;
        }
    }

    /// Spawns a new session and its handler task. Called with the registry
    /// lock held; spawning never blocks.
    fn spawn_session(self: &Arc<Self>, destination: &str) -> SessionEntry {
        debug!(destination, "starting destination session");
        metrics::inc_sessions();
        let session = Arc::new(DestinationSession::new(destination));
        let task = tokio::spawn({
            let handler = Arc::clone(&self.handler);
            let session = Arc::clone(&session);
            let registry = Arc::downgrade(self);
            async move {
                let cancel = session.cancel_token();
                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = handler.run(Arc::clone(&session)) => {
                        // The handler finished of its own accord; detach
                        // the session so lookups stop resolving it.
                        debug!(
                            destination = %session.destination(),
                            "session handler completed"
                        );
                        if let Some(registry) = registry.upgrade() {
                            registry.detach(&session);
                        }
                        session.close();
                    }
                }
                metrics::dec_sessions();
            }
        });
        SessionEntry { session, task }
    }

    /// Removes `session` from the map, matched by identity: a concurrent
    /// removal and re-subscribe may already have replaced the entry under
    /// the same destination, and the replacement must survive.
    fn detach(&self, session: &Arc<DestinationSession>) {
        let mut sessions = self.sessions.lock().expect("registry lock poisoned");
        if sessions
            .get(session.destination())
            .is_some_and(|entry| Arc::ptr_eq(&entry.session, session))
        {
            sessions.remove(session.destination());
        }
    }
}

/// Closes a detached session and awaits its handler task, suppressing join
/// errors: teardown is unconditional.
async fn teardown(entry: SessionEntry) {
    entry.session.close();
    if let Err(err) = entry.task.await {
        warn!(
            destination = %entry.session.destination(),
            error = %err,
            "session handler task did not shut down cleanly"
        );
    }
}
