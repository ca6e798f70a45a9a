//! Stream-based transport.
//!
//! Exchanges newline-delimited frames over an async byte stream. This is
//! useful for TCP connections to the backend or to a bridge in front of it.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{frame, ChannelEvent, Transport};
use crate::error::TransportError;

/// A transport over an async reader/writer pair.
///
/// Background tasks read inbound frames and write outbound ones; the
/// transport itself only moves them across channels, so `poll` and `send`
/// never block.
///
/// # Example with an in-memory stream
///
/// ```
/// use std::io::Cursor;
/// use statwatch::source::StreamTransport;
///
/// # tokio_test::block_on(async {
/// let frames = br#"{"chuckt": {"event": "stats-web-ep", "args": [{"cpu": 1.0}, []]}}
/// "#;
/// let transport = StreamTransport::spawn(Cursor::new(frames.to_vec()), tokio::io::sink(), "example");
/// # });
/// ```
#[derive(Debug)]
pub struct StreamTransport {
    receiver: mpsc::Receiver<ChannelEvent>,
    outbound: mpsc::UnboundedSender<String>,
    description: String,
    last_error: Arc<Mutex<Option<String>>>,
}

impl StreamTransport {
    /// Spawn the reader and writer tasks for an already connected stream.
    ///
    /// The connection is reported open immediately; end of input reports it
    /// closed.
    pub fn spawn<R, W>(reader: R, writer: W, description: &str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(256);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let last_error = Arc::new(Mutex::new(None));

        tokio::spawn(read_frames(reader, tx, last_error.clone()));
        tokio::spawn(write_frames(writer, out_rx, last_error.clone()));

        Self {
            receiver: rx,
            outbound: out_tx,
            description: format!("stream: {}", description),
            last_error,
        }
    }

    /// Connect to `addr` over TCP.
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self::spawn(reader, writer, addr))
    }

    /// Build a transport from a channel of text frames.
    ///
    /// This is useful when frames come from another client (a websocket
    /// library, a message bus) rather than an `AsyncRead`. Outbound frames
    /// are delivered on the returned receiver.
    pub fn from_text_channel(
        mut frames: mpsc::Receiver<String>,
        description: &str,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::channel(256);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let last_error = Arc::new(Mutex::new(None));
        let error_handle = last_error.clone();

        tokio::spawn(async move {
            if tx.send(ChannelEvent::Open).await.is_err() {
                return;
            }
            while let Some(text) = frames.recv().await {
                if let Some(event) = decode_line(&text, &error_handle) {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
            let _ = tx.send(ChannelEvent::Closed(Some("Channel closed".to_string()))).await;
        });

        let transport = Self {
            receiver: rx,
            outbound: out_tx,
            description: format!("stream: {}", description),
            last_error,
        };
        (transport, out_rx)
    }

    /// Get the last error message, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

/// Decode one line, recording parse failures. Blank lines are skipped.
fn decode_line(line: &str, last_error: &Mutex<Option<String>>) -> Option<ChannelEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match frame::decode(line) {
        Ok(event) => Some(ChannelEvent::Message(event)),
        Err(e) => {
            warn!("Dropping undecodable frame: {}", e);
            *last_error.lock() = Some(format!("Parse error: {}", e));
            None
        }
    }
}

async fn read_frames<R>(
    reader: R,
    tx: mpsc::Sender<ChannelEvent>,
    last_error: Arc<Mutex<Option<String>>>,
) where
    R: AsyncRead + Unpin,
{
    if tx.send(ChannelEvent::Open).await.is_err() {
        return;
    }

    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                // EOF
                let reason = "Connection closed".to_string();
                *last_error.lock() = Some(reason.clone());
                let _ = tx.send(ChannelEvent::Closed(Some(reason))).await;
                break;
            }
            Ok(_) => {
                if let Some(event) = decode_line(&line, &last_error) {
                    if tx.send(event).await.is_err() {
                        // Receiver dropped
                        break;
                    }
                }
            }
            Err(e) => {
                let reason = format!("Read error: {}", e);
                *last_error.lock() = Some(reason.clone());
                let _ = tx.send(ChannelEvent::Closed(Some(reason))).await;
                break;
            }
        }
    }
}

async fn write_frames<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<String>,
    last_error: Arc<Mutex<Option<String>>>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(text) = rx.recv().await {
        let result = async {
            writer.write_all(text.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = result {
            *last_error.lock() = Some(format!("Write error: {}", e));
            break;
        }
        debug!(bytes = text.len(), "Sent frame");
    }
}

impl Transport for StreamTransport {
    fn poll(&mut self) -> Option<ChannelEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => None,
        }
    }

    fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.outbound.send(text).map_err(|_| TransportError::Closed)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.last_error()
    }
}
