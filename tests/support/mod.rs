//! In-process RESP server for the connection tests.
//!
//! It understands just enough commands to exercise the client: strings,
//! lists, database selection, AUTH, MULTI/EXEC, and a blocking BRPOP that
//! never answers. A few `x-*` verbs misbehave on purpose.

#![allow(dead_code)]

use bytes::{Bytes, BytesMut};
use flashkv_client::connection::ParametersBuilder;
use flashkv_client::protocol::{RespParser, Response};
use flashkv_client::ConnectionParameters;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

pub const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

/// Installs a test-writer subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone)]
enum Value {
    Str(Bytes),
    List(Vec<Bytes>),
}

#[derive(Debug, Default)]
struct State {
    databases: HashMap<u32, HashMap<Bytes, Value>>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    /// Every request received, in arrival order, as upper-cased verb + args
    log: Mutex<Vec<Vec<String>>>,
    password: Option<String>,
    accepted: Mutex<usize>,
}

enum Listener {
    Tcp { port: u16 },
    #[cfg(unix)]
    Unix { _dir: TempDir, path: std::path::PathBuf },
}

/// A running test server. Dropping it leaves the task running until the
/// test runtime shuts down.
pub struct TestServer {
    listener: Listener,
    shared: Arc<Shared>,
}

impl TestServer {
    pub async fn tcp() -> TestServer {
        Self::tcp_with_password(None).await
    }

    pub async fn tcp_with_password(password: Option<&str>) -> TestServer {
        init_tracing();
        let shared = Arc::new(Shared {
            password: password.map(str::to_string),
            ..Shared::default()
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let accept_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                *accept_shared.accepted.lock().unwrap() += 1;
                tokio::spawn(serve(socket, Arc::clone(&accept_shared)));
            }
        });

        TestServer {
            listener: Listener::Tcp { port },
            shared,
        }
    }

    #[cfg(unix)]
    pub async fn unix() -> TestServer {
        init_tracing();
        let shared = Arc::new(Shared::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resp.sock");
        let listener = tokio::net::UnixListener::bind(&path).unwrap();

        let accept_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                *accept_shared.accepted.lock().unwrap() += 1;
                tokio::spawn(serve(socket, Arc::clone(&accept_shared)));
            }
        });

        TestServer {
            listener: Listener::Unix { _dir: dir, path },
            shared,
        }
    }

    /// A parameters builder already pointed at this server.
    pub fn builder(&self) -> ParametersBuilder {
        let builder = ConnectionParameters::builder().read_write_timeout(2.0);
        match &self.listener {
            Listener::Tcp { port } => builder.host("127.0.0.1").port(*port),
            #[cfg(unix)]
            Listener::Unix { path, .. } => builder
                .scheme(flashkv_client::connection::Scheme::Unix)
                .path(path.clone()),
        }
    }

    pub fn parameters(&self) -> ConnectionParameters {
        self.builder().build().unwrap()
    }

    /// Requests received so far, e.g. `["ECHO", "ECHOED"]`.
    pub fn log(&self) -> Vec<Vec<String>> {
        self.shared.log.lock().unwrap().clone()
    }

    pub fn verbs(&self) -> Vec<String> {
        self.log().into_iter().map(|entry| entry[0].clone()).collect()
    }

    pub fn accepted(&self) -> usize {
        *self.shared.accepted.lock().unwrap()
    }
}

async fn serve<S>(mut socket: S, shared: Arc<Shared>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = BytesMut::with_capacity(4096);
    let mut parser = RespParser::new();
    let mut session = Session::default();

    loop {
        while let Ok(Some((request, consumed))) = parser.parse(&buffer) {
            let _ = buffer.split_to(consumed);
            let args: Vec<Bytes> = match request.into_array() {
                Some(items) => items
                    .into_iter()
                    .filter_map(|item| item.as_bytes().map(Bytes::copy_from_slice))
                    .collect(),
                None => return,
            };
            if args.is_empty() {
                return;
            }

            let verb = String::from_utf8_lossy(&args[0]).to_uppercase();
            shared.log.lock().unwrap().push(
                std::iter::once(verb.clone())
                    .chain(args[1..].iter().map(|a| String::from_utf8_lossy(a).into_owned()))
                    .collect(),
            );

            match verb.as_str() {
                "X-GARBAGE" => {
                    let _ = socket.write_all(b"@not resp\r\n").await;
                    continue;
                }
                "X-CLOSE" => return,
                "X-SPLIT" => {
                    let wire = Response::bulk("ECHOED").serialize();
                    for chunk in wire.chunks(3) {
                        if socket.write_all(chunk).await.is_err() {
                            return;
                        }
                        let _ = socket.flush().await;
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                    continue;
                }
                _ => {}
            }

            let reply = match session.handle(&verb, &args[1..], &shared) {
                Some(reply) => reply,
                // Blocking command with nothing to pop: never answer.
                None => std::future::pending().await,
            };
            if socket.write_all(&reply.serialize()).await.is_err() {
                return;
            }
        }

        match socket.read_buf(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

#[derive(Default)]
struct Session {
    db: u32,
    authenticated: bool,
    queued: Option<Vec<(String, Vec<Bytes>)>>,
}

impl Session {
    fn handle(&mut self, verb: &str, args: &[Bytes], shared: &Shared) -> Option<Response> {
        if shared.password.is_some() && !self.authenticated && verb != "AUTH" {
            return Some(Response::error("NOAUTH Authentication required."));
        }

        if let Some(queue) = self.queued.as_mut() {
            match verb {
                "EXEC" => {
                    let queue = self.queued.take().unwrap_or_default();
                    let replies = queue
                        .into_iter()
                        .map(|(verb, args)| {
                            self.execute(&verb, &args, shared)
                                .unwrap_or_else(Response::null_bulk)
                        })
                        .collect();
                    return Some(Response::multi_bulk(replies));
                }
                "DISCARD" => {
                    self.queued = None;
                    return Some(Response::status("OK"));
                }
                _ => {
                    queue.push((verb.to_string(), args.to_vec()));
                    return Some(Response::status("QUEUED"));
                }
            }
        }

        self.execute(verb, args, shared)
    }

    fn execute(&mut self, verb: &str, args: &[Bytes], shared: &Shared) -> Option<Response> {
        let mut state = shared.state.lock().unwrap();
        let db = state.databases.entry(self.db).or_default();

        let reply = match (verb, args) {
            ("PING", []) => Response::status("PONG"),
            ("PING", [msg]) => Response::bulk(msg.clone()),
            ("ECHO", [msg]) => Response::bulk(msg.clone()),
            ("AUTH", [password]) => {
                if shared.password.as_deref().map(str::as_bytes) == Some(&password[..]) {
                    self.authenticated = true;
                    Response::status("OK")
                } else {
                    Response::error("WRONGPASS invalid username-password pair")
                }
            }
            ("SELECT", [index]) => match std::str::from_utf8(index).ok().and_then(|s| s.parse().ok()) {
                Some(index) if index < 16 => {
                    self.db = index;
                    Response::status("OK")
                }
                _ => Response::error("ERR DB index is out of range"),
            },
            ("FLUSHDB", []) => {
                db.clear();
                Response::status("OK")
            }
            ("MULTI", []) => {
                self.queued = Some(Vec::new());
                Response::status("OK")
            }
            ("SET", [key, value]) => {
                db.insert(key.clone(), Value::Str(value.clone()));
                Response::status("OK")
            }
            ("GET", [key]) => match db.get(key) {
                Some(Value::Str(value)) => Response::bulk(value.clone()),
                Some(Value::List(_)) => Response::error(WRONGTYPE),
                None => Response::null_bulk(),
            },
            ("DEL", keys) if !keys.is_empty() => {
                let removed = keys.iter().filter(|k| db.remove(*k).is_some()).count();
                Response::integer(removed as i64)
            }
            ("RPUSH", [key, values @ ..]) if !values.is_empty() => {
                match db.entry(key.clone()).or_insert_with(|| Value::List(Vec::new())) {
                    Value::List(list) => {
                        list.extend(values.iter().cloned());
                        Response::integer(list.len() as i64)
                    }
                    Value::Str(_) => Response::error(WRONGTYPE),
                }
            }
            ("LLEN", [key]) => match db.get(key) {
                Some(Value::List(list)) => Response::integer(list.len() as i64),
                Some(Value::Str(_)) => Response::error(WRONGTYPE),
                None => Response::integer(0),
            },
            ("LRANGE", [key, start, stop]) => match db.get(key) {
                Some(Value::List(list)) => {
                    let len = list.len() as i64;
                    let index = |raw: &Bytes| -> i64 {
                        let n: i64 = std::str::from_utf8(raw)
                            .ok()
                            .and_then(|s| s.parse().ok())
                            .unwrap_or(0);
                        if n < 0 {
                            (len + n).max(0)
                        } else {
                            n
                        }
                    };
                    let (start, stop) = (index(start), index(stop).min(len - 1));
                    let items = if start > stop {
                        Vec::new()
                    } else {
                        list[start as usize..=stop as usize]
                            .iter()
                            .cloned()
                            .map(Response::bulk)
                            .collect()
                    };
                    Response::multi_bulk(items)
                }
                Some(Value::Str(_)) => Response::error(WRONGTYPE),
                None => Response::multi_bulk(Vec::new()),
            },
            ("BRPOP", [keys @ .., _timeout]) => {
                for key in keys {
                    if let Some(Value::List(list)) = db.get_mut(key) {
                        if let Some(item) = list.pop() {
                            return Some(Response::multi_bulk(vec![
                                Response::bulk(key.clone()),
                                Response::bulk(item),
                            ]));
                        }
                    }
                }
                return None;
            }
            _ => Response::error(format!("ERR unknown command '{}'", verb.to_lowercase())),
        };
        Some(reply)
    }
}
