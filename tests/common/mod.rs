//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{body::Body, Router};
use cache_gateway::cache::SweepPolicy;
use cache_gateway::error::{StoreError, StoreResult};
use cache_gateway::protocol::{Frame, RespCodec};
use cache_gateway::store::{Expiry, KvStore, MemoryStore, ScanCursor, ScanPage};
use cache_gateway::{api::create_router, AppState};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

// == Fault Injection ==
/// A `MemoryStore` that fails selected calls on demand.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    /// Keys whose writes always fail
    pub failing_writes: HashSet<String>,
    /// 1-based scan call that fails, if any
    pub failing_scan: Option<u64>,
    /// When set, every read fails
    pub failing_reads: AtomicBool,
    scans: AtomicU64,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_writes(mut self, keys: &[&str]) -> Self {
        self.failing_writes = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn failing_scan(mut self, call: u64) -> Self {
        self.failing_scan = Some(call);
        self
    }
}

fn injected() -> StoreError {
    StoreError::Server("ERR injected failure".to_string())
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Expiry) -> StoreResult<String> {
        if self.failing_writes.contains(key) {
            return Err(injected());
        }
        self.inner.set_ex(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.get(key).await
    }

    async fn scan(&self, cursor: ScanCursor, pattern: &str, count: usize) -> StoreResult<ScanPage> {
        let call = self.scans.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_scan == Some(call) {
            return Err(injected());
        }
        self.inner.scan(cursor, pattern, count).await
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        self.inner.del(keys).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

// == App Helpers ==
pub fn ttl() -> Expiry {
    Expiry::from_secs(120).unwrap()
}

pub fn app_with(store: Arc<dyn KvStore>) -> Router {
    create_router(AppState::new(store, ttl(), SweepPolicy::default()))
}

pub async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX).await.unwrap().to_vec()
}

pub async fn body_to_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}

// == Fake RESP Server ==
/// Serves the RESP commands the gateway uses, backed by a `MemoryStore`.
///
/// When `password` is set, every command before a successful AUTH is refused.
pub async fn spawn_resp_server(password: Option<&'static str>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store = Arc::new(MemoryStore::new());

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve_connection(socket, store.clone(), password));
        }
    });
    addr
}

async fn serve_connection(socket: TcpStream, store: Arc<MemoryStore>, password: Option<&str>) {
    let mut framed = Framed::new(socket, RespCodec::new());
    let mut authed = password.is_none();

    while let Some(Ok(frame)) = framed.next().await {
        let args = match frame {
            Frame::Array(items) => items
                .iter()
                .map(|item| item.as_text().unwrap_or_default())
                .collect::<Vec<_>>(),
            _ => break,
        };
        let command = args[0].to_ascii_uppercase();

        if !authed && command != "AUTH" {
            framed
                .send(Frame::Error("NOAUTH Authentication required.".into()))
                .await
                .ok();
            continue;
        }

        let reply = match command.as_str() {
            "AUTH" => {
                let given = args.last().map(String::as_str);
                if given == password {
                    authed = true;
                    Frame::Simple("OK".into())
                } else {
                    Frame::Error("WRONGPASS invalid username-password pair".into())
                }
            }
            "PING" => Frame::Simple("PONG".into()),
            "SELECT" => Frame::Simple("OK".into()),
            "SETEX" => {
                let secs: u64 = args[2].parse().unwrap();
                match Expiry::from_secs(secs) {
                    Ok(ttl) => {
                        store.set_ex(&args[1], &args[3], ttl).await.unwrap();
                        Frame::Simple("OK".into())
                    }
                    Err(_) => Frame::Error("ERR invalid expire time in 'setex' command".into()),
                }
            }
            "GET" => match store.get(&args[1]).await.unwrap() {
                Some(value) => Frame::Bulk(value.into()),
                None => Frame::Null,
            },
            "SCAN" => {
                let cursor = ScanCursor::new(args[1].parse().unwrap());
                let page = store
                    .scan(cursor, &args[3], args[5].parse().unwrap())
                    .await
                    .unwrap();
                Frame::Array(vec![
                    Frame::Bulk(page.cursor.raw().to_string().into()),
                    Frame::Array(page.keys.into_iter().map(|k| Frame::Bulk(k.into())).collect()),
                ])
            }
            "DEL" => Frame::Integer(store.del(&args[1..]).await.unwrap() as i64),
            "QUIT" => {
                framed.send(Frame::Simple("OK".into())).await.ok();
                break;
            }
            other => Frame::Error(format!("ERR unknown command '{}'", other)),
        };

        if framed.send(reply).await.is_err() {
            break;
        }
    }
}
