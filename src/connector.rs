//! Connector trait for receiver transports

use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tracing::debug;

use crate::types::Station;
use crate::{ExporterError, Result};

/// Opens the byte stream for a station.
///
/// The supervisor bounds every call with its connect timeout, so implementations do not need
/// their own. Each call returns a fresh connection; dropping it closes the connection.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Byte stream handed to the frame scanner
    type Conn: AsyncRead + Unpin + Send + 'static;

    /// Open a new connection to `station`.
    async fn connect(&self, station: &Station) -> Result<Self::Conn>;
}

/// Plain TCP transport to the receiver's data port.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait::async_trait]
impl Connector for TcpConnector {
    type Conn = TcpStream;

    async fn connect(&self, station: &Station) -> Result<TcpStream> {
        let address = station.address();
        debug!("Dialing {}", address);

        let stream = TcpStream::connect(&address).await.map_err(|e| {
            ExporterError::connection_failed_with_source(address.clone(), Box::new(e))
        })?;

        // Frames are small and latency matters more than throughput here
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle on {}: {}", address, e);
        }

        Ok(stream)
    }
}
