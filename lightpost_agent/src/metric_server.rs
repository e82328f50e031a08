//! Framed metric endpoint: one connection, one frame, then close.

use crate::collect::Collector;
use anyhow::Result;
use lightpost_proto::frame;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

/// Accept loop. Each connection is handled in its own task; a failed
/// collection or write aborts that connection only.
pub async fn serve(listener: TcpListener, collector: Collector) -> Result<()> {
    info!(addr = %listener.local_addr()?, "metric endpoint listening");
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                error!(%err, "accept failed");
                continue;
            }
        };
        let collector = collector.clone();
        tokio::spawn(async move {
            if let Err(err) = handle(stream, &collector).await {
                error!(%peer, %err, "metric connection failed");
            }
        });
    }
}

/// Read and discard the request line, then answer with a single frame.
async fn handle(mut stream: TcpStream, collector: &Collector) -> Result<()> {
    let mut request = [0u8; 256];
    let n = stream.read(&mut request).await?;
    debug!(bytes = n, "request discarded");

    let payload = collector.payload().await;
    let framed = frame::encode(&payload)?;
    stream.write_all(&framed).await?;
    stream.shutdown().await?;
    Ok(())
}
