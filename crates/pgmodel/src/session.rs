//! Scoped database sessions.

use crate::Result;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};

/// One physical connection, open for the duration of a database's
/// resolution.
///
/// The connection task is spawned on open and aborted when the session is
/// dropped, so the socket is released on every exit path, errors included.
pub struct Session {
    client: Client,
    connection: JoinHandle<()>,
}

impl Session {
    /// Open a connection from a libpq-style connection string or URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls).await?;
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!("connection error: {}", e);
            }
        });
        tracing::debug!("database session opened");
        Ok(Self { client, connection })
    }

    /// The client for this session.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.connection.abort();
        tracing::debug!("database session closed");
    }
}
