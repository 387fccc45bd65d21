//! Async STOMP client: session setup, delivery stream, acknowledgements.
//!
//! The socket write half is owned by a background task so heartbeats keep
//! flowing while the consumer blocks on delivery. The read half stays with
//! the client; frames are parsed incrementally out of a byte buffer.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::frame::{self, Frame};
use crate::{Result, StompError};

/// Connection parameters, fixed for the whole session.
#[derive(Debug, Clone)]
pub struct StompConfig {
    pub host: String,
    pub port: u16,
    pub login: String,
    pub passcode: String,
    /// Set for durable sessions; sent as the CONNECT `client-id` header,
    /// which must be unique to the account.
    pub client_id: Option<String>,
    /// Heartbeat interval in milliseconds, offered in both directions.
    /// Zero disables heartbeating.
    pub heartbeat_ms: u64,
}

/// One MESSAGE frame, reduced to what the dispatch loop needs.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub destination: String,
    /// Ack token, present when the subscription requires explicit acks.
    pub ack_id: Option<String>,
    pub subscription: Option<String>,
    pub body: String,
}

/// A connected STOMP session.
#[derive(Debug)]
pub struct StompClient {
    read_half: OwnedReadHalf,
    outgoing: mpsc::Sender<Vec<u8>>,
    buf: Vec<u8>,
}

impl StompClient {
    /// Establish the session: TCP connect, CONNECT frame, await CONNECTED.
    /// Authentication failure surfaces as the broker's ERROR frame.
    pub async fn connect(config: &StompConfig) -> Result<Self> {
        let stream = TcpStream::connect((config.host.as_str(), config.port)).await?;
        let (read_half, write_half) = stream.into_split();
        let (outgoing, rx) = mpsc::channel(64);
        tokio::spawn(writer_task(write_half, rx, config.heartbeat_ms));

        let mut connect = Frame::new("CONNECT")
            .header("accept-version", "1.2")
            .header("host", config.host.clone())
            .header("login", config.login.clone())
            .header("passcode", config.passcode.clone())
            .header("heart-beat", format!("{0},{0}", config.heartbeat_ms));
        if let Some(client_id) = &config.client_id {
            connect = connect.header("client-id", client_id.clone());
        }

        let mut client = StompClient {
            read_half,
            outgoing,
            buf: Vec::new(),
        };
        client.send(connect).await?;

        match client.read_frame().await? {
            Some(frame) if frame.command == "CONNECTED" => {
                log::debug!(
                    "connected: version {}, heart-beat {}",
                    frame.get_header("version").unwrap_or("?"),
                    frame.get_header("heart-beat").unwrap_or("none"),
                );
                Ok(client)
            }
            Some(frame) if frame.command == "ERROR" => Err(StompError::Server(error_text(&frame))),
            Some(frame) => Err(StompError::Protocol(format!(
                "expected CONNECTED, got {}",
                frame.command
            ))),
            None => Err(StompError::Closed),
        }
    }

    /// Subscribe to one topic. `ack` is the STOMP ack header value;
    /// `subscription_name` is set for durable ActiveMQ subscriptions.
    pub async fn subscribe(
        &self,
        destination: &str,
        id: &str,
        ack: &str,
        subscription_name: Option<&str>,
    ) -> Result<()> {
        let mut frame = Frame::new("SUBSCRIBE")
            .header("destination", destination)
            .header("id", id)
            .header("ack", ack);
        if let Some(name) = subscription_name {
            frame = frame.header("activemq.subscriptionName", name);
        }
        self.send(frame).await
    }

    /// Acknowledge one delivered frame by its ack token.
    pub async fn ack(&self, ack_id: &str) -> Result<()> {
        self.send(Frame::new("ACK").header("id", ack_id)).await
    }

    /// Announce a clean shutdown. The socket drops with the client.
    pub async fn disconnect(&self) -> Result<()> {
        self.send(Frame::new("DISCONNECT")).await
    }

    /// Next MESSAGE delivery, in arrival order. `None` means the broker
    /// closed the connection. Broker ERROR frames surface as errors.
    pub async fn next(&mut self) -> Result<Option<Delivery>> {
        loop {
            let frame = match self.read_frame().await? {
                Some(frame) => frame,
                None => return Ok(None),
            };
            match frame.command.as_str() {
                "MESSAGE" => {
                    return Ok(Some(Delivery {
                        destination: frame
                            .get_header("destination")
                            .unwrap_or_default()
                            .to_string(),
                        ack_id: frame.get_header("ack").map(str::to_string),
                        subscription: frame.get_header("subscription").map(str::to_string),
                        body: frame.body_text(),
                    }))
                }
                "ERROR" => return Err(StompError::Server(error_text(&frame))),
                other => log::debug!("ignoring {other} frame"),
            }
        }
    }

    async fn send(&self, frame: Frame) -> Result<()> {
        self.outgoing
            .send(frame.to_bytes())
            .await
            .map_err(|_| StompError::Closed)
    }

    /// Read one frame of any command, draining heartbeat EOLs between
    /// frames. `None` on EOF.
    async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            let skip = frame::leading_eol_len(&self.buf);
            if skip > 0 {
                self.buf.drain(..skip);
            }
            if let Some((frame, consumed)) = frame::parse_frame(&self.buf)? {
                self.buf.drain(..consumed);
                return Ok(Some(frame));
            }
            let mut chunk = [0u8; 8192];
            let n = self.read_half.read(&mut chunk).await?;
            if n == 0 {
                return Ok(None);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

fn error_text(frame: &Frame) -> String {
    let message = frame.get_header("message").unwrap_or("broker error");
    let body = frame.body_text();
    if body.is_empty() {
        message.to_string()
    } else {
        format!("{message}: {}", body.trim_end())
    }
}

/// Owns the write half: forwards queued frames and emits LF heartbeats when
/// the line has been idle for the negotiated interval. Exits when the client
/// is dropped or the socket errors.
async fn writer_task(
    mut write_half: OwnedWriteHalf,
    mut outgoing: mpsc::Receiver<Vec<u8>>,
    heartbeat_ms: u64,
) {
    if heartbeat_ms == 0 {
        while let Some(bytes) = outgoing.recv().await {
            if write_half.write_all(&bytes).await.is_err() {
                return;
            }
        }
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_millis(heartbeat_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            bytes = outgoing.recv() => match bytes {
                Some(bytes) => {
                    if write_half.write_all(&bytes).await.is_err() {
                        return;
                    }
                    interval.reset();
                }
                None => return,
            },
            _ = interval.tick() => {
                if write_half.write_all(b"\n").await.is_err() {
                    log::warn!("heartbeat write failed, stopping writer");
                    return;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn config(port: u16) -> StompConfig {
        StompConfig {
            host: "127.0.0.1".to_string(),
            port,
            login: "user@example.com".to_string(),
            passcode: "hunter2".to_string(),
            client_id: None,
            heartbeat_ms: 0,
        }
    }

    /// Read one NUL-terminated frame from the stub broker's socket,
    /// skipping heartbeat newlines.
    async fn read_raw_frame(sock: &mut TcpStream, residue: &mut Vec<u8>) -> String {
        loop {
            if let Some(pos) = residue.iter().position(|&b| b == 0) {
                let raw: Vec<u8> = residue.drain(..=pos).collect();
                let text = String::from_utf8(raw[..raw.len() - 1].to_vec()).unwrap();
                return text.trim_start_matches(['\r', '\n']).to_string();
            }
            let mut chunk = [0u8; 1024];
            let n = sock.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending a frame");
            residue.extend_from_slice(&chunk[..n]);
        }
    }

    #[tokio::test]
    async fn test_connect_subscribe_deliver_ack() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let broker = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut residue = Vec::new();

            let connect = read_raw_frame(&mut sock, &mut residue).await;
            assert!(connect.starts_with("CONNECT\n"), "got: {connect}");
            assert!(connect.contains("login:user@example.com"));
            assert!(connect.contains("passcode:hunter2"));
            sock.write_all(b"CONNECTED\nversion:1.2\n\n\0").await.unwrap();

            let subscribe = read_raw_frame(&mut sock, &mut residue).await;
            assert!(subscribe.starts_with("SUBSCRIBE\n"));
            assert!(subscribe.contains("destination:/topic/TD_ALL_SIG_AREA"));
            assert!(subscribe.contains("ack:client-individual"));
            assert!(subscribe.contains("activemq.subscriptionName:sub-name"));

            sock.write_all(
                b"MESSAGE\ndestination:/topic/TD_ALL_SIG_AREA\n\
                  message-id:m1\nack:a1\nsubscription:1\n\n[]\0",
            )
            .await
            .unwrap();

            let ack = read_raw_frame(&mut sock, &mut residue).await;
            assert!(ack.starts_with("ACK\n"));
            assert!(ack.contains("id:a1"));
        });

        let mut client = StompClient::connect(&config(port)).await.unwrap();
        client
            .subscribe(
                "/topic/TD_ALL_SIG_AREA",
                "1",
                "client-individual",
                Some("sub-name"),
            )
            .await
            .unwrap();

        let delivery = client.next().await.unwrap().expect("one delivery");
        assert_eq!(delivery.destination, "/topic/TD_ALL_SIG_AREA");
        assert_eq!(delivery.ack_id.as_deref(), Some("a1"));
        assert_eq!(delivery.subscription.as_deref(), Some("1"));
        assert_eq!(delivery.body, "[]");

        client.ack("a1").await.unwrap();
        broker.await.unwrap();

        // Broker task finished and dropped its socket: stream ends
        assert!(client.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connect_rejected_with_error_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut residue = Vec::new();
            read_raw_frame(&mut sock, &mut residue).await;
            sock.write_all(b"ERROR\nmessage:bad credentials\n\n\0")
                .await
                .unwrap();
        });

        let err = StompClient::connect(&config(port)).await.unwrap_err();
        match err {
            StompError::Server(text) => assert!(text.contains("bad credentials")),
            other => panic!("expected Server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_receipt_frames_skipped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut residue = Vec::new();
            read_raw_frame(&mut sock, &mut residue).await;
            // Heartbeat newlines and a RECEIPT before the actual message
            sock.write_all(
                b"CONNECTED\nversion:1.2\n\n\0\n\nRECEIPT\nreceipt-id:7\n\n\0\
                  MESSAGE\ndestination:TD_ALL_SIG_AREA\nmessage-id:m1\n\nbody\0",
            )
            .await
            .unwrap();
        });

        let mut client = StompClient::connect(&config(port)).await.unwrap();
        let delivery = client.next().await.unwrap().expect("one delivery");
        assert_eq!(delivery.destination, "TD_ALL_SIG_AREA");
        assert_eq!(delivery.ack_id, None);
        assert_eq!(delivery.body, "body");
        assert!(client.next().await.unwrap().is_none());
    }
}
