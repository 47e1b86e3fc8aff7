//! Scoped ownership of a warehouse session.

use tracing::{debug, warn};

use agentgate_core::warehouse::WarehouseConnection;

/// Owns a warehouse connection for the length of one chat turn.
///
/// The connection is closed exactly once: by [`release`](Self::release) on a
/// normal terminal transition, or from `Drop` when the turn is abandoned
/// (client disconnect, cancelled task).
pub struct ConnectionGuard<C: WarehouseConnection> {
    conn: Option<C>,
}

impl<C: WarehouseConnection> ConnectionGuard<C> {
    pub const fn new(conn: C) -> Self {
        Self { conn: Some(conn) }
    }

    /// Close the connection and wait for it.
    ///
    /// The close runs as its own task, so it completes even if the caller is
    /// cancelled while waiting.
    pub async fn release(mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if let Err(e) = tokio::spawn(conn.close()).await {
            warn!(error = %e, "Warehouse session close task failed");
        }
    }
}

impl<C: WarehouseConnection> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Turn abandoned, closing warehouse session in background");
                handle.spawn(conn.close());
            }
            Err(_) => warn!("No runtime available, warehouse session left to expire"),
        }
    }
}
