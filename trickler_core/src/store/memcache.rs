//! Minimal memcached text-protocol client (`get` / `set` only).

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Mutex;
use std::time::Duration;

use super::StateStore;
use crate::error::{Result, TricklerError};

const MAX_KEY_LEN: usize = 250;
/// memcached's default item size limit.
const MAX_VALUE_LEN: usize = 1024 * 1024;

struct Conn {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

/// Blocking memcached client. One request at a time; a broken connection is
/// dropped and re-established on the next request.
pub struct MemcacheStore {
    server: String,
    connect_timeout: Duration,
    timeout: Duration,
    conn: Mutex<Option<Conn>>,
}

impl std::fmt::Debug for MemcacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcacheStore")
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}

fn store_err(msg: impl Into<String>) -> eyre::Report {
    TricklerError::Store(msg.into()).into()
}

fn io_err(e: std::io::Error) -> eyre::Report {
    store_err(format!("memcache i/o: {e}"))
}

impl MemcacheStore {
    /// Connect to `server` (`host:port`). Fails if the server is unreachable.
    pub fn connect(server: &str, connect_timeout: Duration, timeout: Duration) -> Result<Self> {
        let store = Self {
            server: server.to_owned(),
            connect_timeout,
            timeout,
            conn: Mutex::new(None),
        };
        let conn = store.open()?;
        *store
            .conn
            .lock()
            .map_err(|_| store_err("memcache connection poisoned"))? = Some(conn);
        tracing::debug!(server, "connected to memcached");
        Ok(store)
    }

    fn open(&self) -> Result<Conn> {
        let mut last_err = None;
        let addrs = self
            .server
            .to_socket_addrs()
            .map_err(|e| store_err(format!("resolve {}: {e}", self.server)))?;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.timeout)).map_err(io_err)?;
                    stream.set_write_timeout(Some(self.timeout)).map_err(io_err)?;
                    stream.set_nodelay(true).map_err(io_err)?;
                    let writer = stream.try_clone().map_err(io_err)?;
                    return Ok(Conn {
                        reader: BufReader::new(stream),
                        writer,
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(store_err(match last_err {
            Some(e) => format!("connect {}: {e}", self.server),
            None => format!("connect {}: no addresses", self.server),
        }))
    }

    fn with_conn<T>(&self, op: impl FnOnce(&mut Conn) -> Result<T>) -> Result<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| store_err("memcache connection poisoned"))?;
        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(store_err("memcache connection unavailable"));
        };
        let res = op(conn);
        if res.is_err() {
            // Stream state is unknown after a failed exchange.
            *guard = None;
        }
        res
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty()
        || key.len() > MAX_KEY_LEN
        || key.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control())
    {
        return Err(store_err(format!("invalid memcache key {key:?}")));
    }
    Ok(())
}

fn read_reply_line(conn: &mut Conn) -> Result<String> {
    let mut line = String::new();
    let n = conn.reader.read_line(&mut line).map_err(io_err)?;
    if n == 0 {
        return Err(store_err("memcached closed the connection"));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

fn get_exchange(conn: &mut Conn, key: &str) -> Result<Option<String>> {
    conn.writer.write_all(format!("get {key}\r\n").as_bytes()).map_err(io_err)?;
    let header = read_reply_line(conn)?;
    if header == "END" {
        return Ok(None);
    }
    // VALUE <key> <flags> <bytes>
    let mut parts = header.split(' ');
    let (Some("VALUE"), Some(k), Some(_flags), Some(len)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(store_err(format!("unexpected memcached reply {header:?}")));
    };
    if k != key {
        return Err(store_err(format!("memcached answered for key {k:?}")));
    }
    let len: usize = len
        .parse()
        .map_err(|_| store_err(format!("bad value length in {header:?}")))?;
    let framed = len
        .checked_add(2)
        .filter(|_| len <= MAX_VALUE_LEN)
        .ok_or_else(|| store_err(format!("value for {key} is {len} bytes, over the item limit")))?;
    let mut data = vec![0u8; framed];
    conn.reader.read_exact(&mut data).map_err(io_err)?;
    data.truncate(len);
    let end = read_reply_line(conn)?;
    if end != "END" {
        return Err(store_err(format!("expected END, got {end:?}")));
    }
    String::from_utf8(data)
        .map(Some)
        .map_err(|_| store_err(format!("value for {key} is not UTF-8")))
}

fn set_exchange(conn: &mut Conn, key: &str, value: &str) -> Result<()> {
    let mut req = format!("set {key} 0 0 {}\r\n", value.len()).into_bytes();
    req.extend_from_slice(value.as_bytes());
    req.extend_from_slice(b"\r\n");
    conn.writer.write_all(&req).map_err(io_err)?;
    let reply = read_reply_line(conn)?;
    if reply == "STORED" {
        Ok(())
    } else {
        Err(store_err(format!("memcached refused set {key}: {reply}")))
    }
}

impl StateStore for MemcacheStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        check_key(key)?;
        self.with_conn(|c| get_exchange(c, key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        check_key(key)?;
        self.with_conn(|c| set_exchange(c, key, value))
    }
}
