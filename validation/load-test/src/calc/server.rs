//! TCP server answering arithmetic requests, one request per connection.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{evaluate, formula, ServerReq, ServerResp, DELIM};

/// Arithmetic server running in the background until closed or dropped.
pub struct TcpServer {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    active: AtomicBool,
}

impl TcpServer {
    /// Bind `addr` and start accepting connections.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();

        tokio::spawn(accept_loop(listener, shutdown.clone()));
        info!(%local_addr, "Arithmetic server listening");

        Ok(Self {
            local_addr,
            shutdown,
            active: AtomicBool::new(true),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stop accepting connections. Returns false if already closed.
    pub fn close(&self) -> bool {
        if self
            .active
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.shutdown.cancel();
        info!(local_addr = %self.local_addr, "Arithmetic server closed");
        true
    }
}

impl Drop for TcpServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_loop(listener: TcpListener, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "Accepted connection");
                    tokio::spawn(handle_connection(stream));
                }
                Err(e) => warn!(error = %e, "Request acceptation error"),
            },
        }
    }
}

async fn handle_connection(stream: TcpStream) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    let resp = match reader.read_until(DELIM, &mut line).await {
        // Peer hung up without sending anything
        Ok(0) => return,
        Ok(_) => respond(&line),
        Err(e) => ServerResp {
            id: 0,
            formula: String::new(),
            result: 0,
            err: Some(format!("Server: request read error: {e}")),
        },
    };

    let mut bytes = match serde_json::to_vec(&resp) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "Server: response marshal error");
            return;
        }
    };
    bytes.push(DELIM);
    if let Err(e) = writer.write_all(&bytes).await {
        error!(error = %e, "Server: response write error");
    }
}

/// Answer one framed request.
pub fn respond(line: &[u8]) -> ServerResp {
    let line = line.strip_suffix(&[DELIM]).unwrap_or(line);
    let req: ServerReq = match serde_json::from_slice(line) {
        Ok(req) => req,
        Err(e) => {
            return ServerResp {
                id: 0,
                formula: String::new(),
                result: 0,
                err: Some(format!("Server: request unmarshal error: {e}")),
            }
        }
    };

    match evaluate(&req.operands, &req.operator) {
        Some(result) => ServerResp {
            id: req.id,
            formula: formula(&req.operands, &req.operator, result, true),
            result,
            err: None,
        },
        None => ServerResp {
            id: req.id,
            formula: String::new(),
            result: 0,
            err: Some(format!(
                "Server: can not evaluate {:?} with '{}'",
                req.operands, req.operator
            )),
        },
    }
}
