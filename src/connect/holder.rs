//! Exclusive ownership of one leased connection

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};

use super::{ConnectionManager, ManagedConnection, UserToken};

/// Holds the connection leased for one exchange and guarantees it goes
/// back to its pool, or is discarded, exactly once.
pub struct ConnectionHolder {
    manager: Arc<dyn ConnectionManager>,
    conn: Option<Box<dyn ManagedConnection>>,
    reusable: bool,
    valid_for: Option<Duration>,
    state: Option<UserToken>,
}

impl ConnectionHolder {
    pub fn new(manager: Arc<dyn ConnectionManager>, conn: Box<dyn ManagedConnection>) -> Self {
        Self {
            manager,
            conn: Some(conn),
            reusable: false,
            valid_for: None,
            state: None,
        }
    }

    /// The held connection, if not yet released.
    pub fn connection(&mut self) -> Result<&mut dyn ManagedConnection> {
        match self.conn.as_mut() {
            Some(conn) => Ok(conn.as_mut()),
            None => Err(Error::ConnectionShutdown),
        }
    }

    pub fn mark_reusable(&mut self) {
        self.reusable = true;
    }

    pub fn mark_non_reusable(&mut self) {
        self.reusable = false;
    }

    pub fn is_reusable(&self) -> bool {
        self.reusable
    }

    /// Validity window applied when the connection goes back to the pool.
    pub fn set_valid_for(&mut self, duration: Option<Duration>) {
        self.valid_for = duration;
    }

    /// Affinity token stored with the pooled connection.
    pub fn set_state(&mut self, state: UserToken) {
        self.state = Some(state);
    }

    /// Hand the connection back to the pool, honoring the reuse flag.
    pub fn release_connection(&mut self) {
        if let Some(conn) = self.conn.take() {
            debug!(target: "courier::connect", reusable = self.reusable, "releasing connection");
            let valid_for = if self.reusable { self.valid_for } else { None };
            self.manager
                .release(conn, self.state.clone(), valid_for, self.reusable);
        }
    }

    /// Close and discard the connection.
    pub fn abort_connection(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            debug!(target: "courier::connect", "aborting connection");
            let _ = conn.close();
            self.manager.release(conn, None, None, false);
        }
    }
}
