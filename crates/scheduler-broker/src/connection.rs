//! Connection bootstrap. Grounded on
//! `examples/original_source/src/amqp.py`'s `open_connection`.

use crate::error::{Error, Result};
use lapin::{Connection, ConnectionProperties};

pub async fn connect(url: &str) -> Result<Connection> {
    Connection::connect(url, ConnectionProperties::default())
        .await
        .map_err(|e| Error::connection("failed to connect to broker", e))
}

/// Connectivity check for `scheduler-health`: open a connection, open a
/// channel, close both.
pub async fn ping(url: &str) -> Result<()> {
    let conn = connect(url).await?;
    let channel = conn
        .create_channel()
        .await
        .map_err(|e| Error::connection("failed to open channel", e))?;
    channel
        .close(200, "health check")
        .await
        .map_err(|e| Error::connection("failed to close channel", e))?;
    conn.close(200, "health check")
        .await
        .map_err(|e| Error::connection("failed to close connection", e))?;
    Ok(())
}
