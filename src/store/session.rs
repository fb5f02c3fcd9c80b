//! Store Session Module
//!
//! One long-lived connection to a Redis-compatible server, shared by every
//! request. A driver task owns the socket; callers hand it commands over a
//! channel and wait on a oneshot for the reply. Commands are written as soon
//! as they arrive and replies are matched to callers in FIFO order, so many
//! concurrent calls are pipelined over the single connection.
//!
//! The driver does not reconnect. When the transport fails it logs the error,
//! fails every in-flight call and exits; later calls fail with
//! `StoreError::Closed`.

use std::collections::VecDeque;
use std::io;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, error, warn};

use super::{Expiry, KvStore, RedisEndpoint, ScanCursor, ScanPage};
use crate::error::{StoreError, StoreResult};
use crate::protocol::{Frame, RespCodec};

/// Commands that may be queued for the driver before callers wait for room.
const REQUEST_QUEUE: usize = 1024;

struct Request {
    frame: Frame,
    reply: oneshot::Sender<StoreResult<Frame>>,
}

// == Store Session ==
/// Pipelined RESP connection implementing the store contract.
pub struct StoreSession {
    requests: mpsc::Sender<Request>,
    driver: Mutex<Option<JoinHandle<StoreResult<()>>>>,
}

impl StoreSession {
    // == Connect ==
    /// Opens a TCP connection to `endpoint` and authenticates.
    pub async fn connect(endpoint: &RedisEndpoint) -> StoreResult<Self> {
        let stream = TcpStream::connect(endpoint.address()).await?;
        stream.set_nodelay(true).ok();
        Self::establish(stream, endpoint).await
    }

    /// Starts a session over an already-open stream and runs the handshake
    /// (AUTH when credentials are present, SELECT when `db` is not 0).
    pub async fn establish<S>(stream: S, endpoint: &RedisEndpoint) -> StoreResult<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let session = Self::from_stream(stream);

        match (&endpoint.username, &endpoint.password) {
            (Some(user), Some(pass)) => {
                session
                    .expect_status("AUTH", Frame::command(["AUTH", user.as_str(), pass.as_str()]))
                    .await?;
            }
            (None, Some(pass)) => {
                session
                    .expect_status("AUTH", Frame::command(["AUTH", pass.as_str()]))
                    .await?;
            }
            _ => {}
        }

        if endpoint.db != 0 {
            let db = endpoint.db.to_string();
            session
                .expect_status("SELECT", Frame::command(["SELECT", db.as_str()]))
                .await?;
        }

        Ok(session)
    }

    /// Starts a session over `stream` without any handshake.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (requests, inbox) = mpsc::channel(REQUEST_QUEUE);
        let driver = tokio::spawn(drive(Framed::new(stream, RespCodec::new()), inbox));
        Self {
            requests,
            driver: Mutex::new(Some(driver)),
        }
    }

    // == Execute ==
    /// Sends one command and waits for its reply.
    ///
    /// An error reply from the store becomes `StoreError::Server`.
    pub async fn execute(&self, frame: Frame) -> StoreResult<Frame> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request { frame, reply })
            .await
            .map_err(|_| StoreError::Closed)?;

        match response.await.map_err(|_| StoreError::Closed)?? {
            Frame::Error(message) => Err(StoreError::Server(message)),
            frame => Ok(frame),
        }
    }

    async fn expect_status(&self, command: &'static str, frame: Frame) -> StoreResult<String> {
        match self.execute(frame).await? {
            Frame::Simple(status) => Ok(status),
            other => Err(unexpected(command, &other)),
        }
    }
}

#[async_trait]
impl KvStore for StoreSession {
    async fn set_ex(&self, key: &str, value: &str, ttl: Expiry) -> StoreResult<String> {
        let secs = ttl.as_secs().to_string();
        self.expect_status("SETEX", Frame::command(["SETEX", key, secs.as_str(), value]))
            .await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self.execute(Frame::command(["GET", key])).await? {
            Frame::Null => Ok(None),
            Frame::Bulk(data) => Ok(Some(String::from_utf8_lossy(&data).into_owned())),
            other => Err(unexpected("GET", &other)),
        }
    }

    async fn scan(&self, cursor: ScanCursor, pattern: &str, count: usize) -> StoreResult<ScanPage> {
        let cursor = cursor.raw().to_string();
        let count = count.max(1).to_string();
        let reply = self
            .execute(Frame::command([
                "SCAN",
                cursor.as_str(),
                "MATCH",
                pattern,
                "COUNT",
                count.as_str(),
            ]))
            .await?;

        let mut parts = match reply {
            Frame::Array(parts) => parts,
            other => return Err(unexpected("SCAN", &other)),
        };
        if parts.len() != 2 {
            return Err(StoreError::UnexpectedReply {
                command: "SCAN",
                reply: format!("array of {} elements", parts.len()),
            });
        }

        let keys = match parts.pop() {
            Some(Frame::Array(items)) => items
                .iter()
                .map(|item| item.as_text().ok_or_else(|| unexpected("SCAN", item)))
                .collect::<StoreResult<Vec<_>>>()?,
            Some(other) => return Err(unexpected("SCAN", &other)),
            None => Vec::new(),
        };

        let next = parts
            .pop()
            .as_ref()
            .and_then(Frame::as_text)
            .and_then(|text| text.parse::<u64>().ok())
            .ok_or_else(|| StoreError::UnexpectedReply {
                command: "SCAN",
                reply: "cursor is not an unsigned integer".to_string(),
            })?;

        Ok(ScanPage {
            cursor: ScanCursor::new(next),
            keys,
        })
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let command =
            Frame::command(std::iter::once("DEL").chain(keys.iter().map(String::as_str)));
        match self.execute(command).await? {
            Frame::Integer(n) => Ok(n.max(0) as u64),
            other => Err(unexpected("DEL", &other)),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        match self.expect_status("PING", Frame::command(["PING"])).await?.as_str() {
            "PONG" => Ok(()),
            other => Err(StoreError::UnexpectedReply {
                command: "PING",
                reply: other.to_string(),
            }),
        }
    }

    async fn disconnect(&self) {
        if let Err(e) = self.execute(Frame::command(["QUIT"])).await {
            debug!("QUIT not acknowledged: {}", e);
        }
        if let Some(driver) = self.driver.lock().await.take() {
            driver.abort();
        }
    }
}

fn unexpected(command: &'static str, reply: &Frame) -> StoreError {
    StoreError::UnexpectedReply {
        command,
        reply: reply.kind().to_string(),
    }
}

// == Driver ==
/// Owns the connection: writes queued commands and routes replies back.
///
/// Returns `Ok` when the session is dropped or the store closes the socket
/// after `QUIT`, and the transport error otherwise.
async fn drive<S>(
    mut framed: Framed<S, RespCodec>,
    mut inbox: mpsc::Receiver<Request>,
) -> StoreResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut in_flight: VecDeque<oneshot::Sender<StoreResult<Frame>>> = VecDeque::new();
    let mut quitting = false;

    let failure: StoreError = loop {
        tokio::select! {
            request = inbox.recv() => {
                let Some(Request { frame, reply }) = request else {
                    debug!("Store session dropped, closing connection");
                    return Ok(());
                };
                quitting |= is_quit(&frame);
                if let Err(e) = framed.send(frame).await {
                    let _ = reply.send(Err(StoreError::Closed));
                    break e.into();
                }
                in_flight.push_back(reply);
            }
            incoming = framed.next() => match incoming {
                Some(Ok(frame)) => match in_flight.pop_front() {
                    Some(waiter) => {
                        let _ = waiter.send(Ok(frame));
                    }
                    None => warn!("Ignoring unsolicited {} from store", frame.kind()),
                },
                Some(Err(e)) => break e.into(),
                None => break StoreError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by store",
                )),
            }
        }
    };

    for waiter in in_flight.drain(..) {
        let _ = waiter.send(Err(StoreError::Closed));
    }
    if quitting {
        debug!("Store connection closed after QUIT: {}", failure);
        return Ok(());
    }
    error!("Store connection lost: {}", failure);
    Err(failure)
}

fn is_quit(frame: &Frame) -> bool {
    match frame {
        Frame::Array(parts) => matches!(
            parts.first(),
            Some(Frame::Bulk(name)) if name.eq_ignore_ascii_case(b"QUIT")
        ),
        _ => false,
    }
}
