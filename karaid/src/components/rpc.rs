//!
//! JSON-over-HTTP status service.
//!

use super::chain::ChainStatus;
use crate::{
    config::RpcConfig,
    errors::RpcError,
    node::api::{P2pEndpoint, RpcApi},
    version::version,
};
use karai_core::{debug, trace, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    runtime::Handle,
    select,
    task::JoinHandle,
};
use triggered::{Listener, Trigger};

const MAX_REQUEST_HEAD: usize = 8 * 1024;
const STATUS_OK: &str = "OK";

#[derive(Debug, Serialize)]
struct FeeInfo {
    address: String,
    amount: u64,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct NodeInfo {
    height: u32,
    top_block_hash: String,
    incoming_connections_count: usize,
    outgoing_connections_count: usize,
    white_peerlist_size: usize,
    version: &'static str,
    block_explorer: bool,
    status: &'static str,
}

/// What a request handler needs, detached from the server lifetime
struct RpcContext {
    status: Arc<ChainStatus>,
    endpoint: Arc<dyn P2pEndpoint>,
    block_explorer: bool,
    fee_address: String,
    fee_amount: u64,
    cors_origins: Vec<String>,
}

impl RpcContext {
    fn respond(&self, path: &str) -> Result<String, serde_json::Error> {
        match path {
            "/feeinfo" => serde_json::to_string(&FeeInfo { address: self.fee_address.clone(), amount: self.fee_amount, status: STATUS_OK }),
            _ => {
                let tip = self.status.tip();
                let counts = self.endpoint.connection_counts();
                serde_json::to_string(&NodeInfo {
                    height: tip.height,
                    top_block_hash: tip.hash.to_string(),
                    incoming_connections_count: counts.incoming,
                    outgoing_connections_count: counts.outgoing,
                    white_peerlist_size: self.endpoint.peer_list_size(),
                    version: version(),
                    block_explorer: self.block_explorer,
                    status: STATUS_OK,
                })
            }
        }
    }

    fn http_response(&self, status_line: &str, body: &str) -> String {
        let mut response = format!("HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n", body.len());
        for origin in self.cors_origins.iter() {
            response.push_str(&format!("Access-Control-Allow-Origin: {origin}\r\n"));
        }
        response.push_str("Connection: close\r\n\r\n");
        response.push_str(body);
        response
    }
}

/// Extracts the request path from the request line, dropping any query string
fn request_path(head: &str) -> Option<&str> {
    let mut parts = head.lines().next()?.split_whitespace();
    let _method = parts.next()?;
    let target = parts.next()?;
    Some(target.split('?').next().unwrap_or(target))
}

async fn handle_request(mut stream: TcpStream, peer: SocketAddr, context: Arc<RpcContext>) {
    let mut head = Vec::with_capacity(1024);
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") && head.len() < MAX_REQUEST_HEAD {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
            Err(err) => {
                debug!("RPC read from {} failed: {}", peer, err);
                return;
            }
        }
    }

    let head = String::from_utf8_lossy(&head);
    let response = match request_path(&head) {
        Some(path) => {
            trace!("RPC {} from {}", path, peer);
            match context.respond(path) {
                Ok(body) => context.http_response("200 OK", &body),
                Err(err) => context.http_response("500 Internal Server Error", &format!("{{\"status\":\"{err}\"}}")),
            }
        }
        None => context.http_response("400 Bad Request", "{\"status\":\"Bad request\"}"),
    };
    if let Err(err) = stream.write_all(response.as_bytes()).await {
        debug!("RPC write to {} failed: {}", peer, err);
    }
    if let Err(err) = stream.shutdown().await {
        trace!("RPC shutdown of the connection with {} failed: {}", peer, err);
    }
}

async fn serve(listener: TcpListener, context: Arc<RpcContext>, shutdown: Listener) {
    loop {
        select! {
            biased;
            _ = shutdown.clone() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(handle_request(stream, peer, context.clone()));
                }
                Err(err) => warn!("Failed accepting an RPC connection: {}", err),
            },
        }
    }
}

pub struct RpcServer {
    runtime: Handle,
    status: Arc<ChainStatus>,
    endpoint: Arc<dyn P2pEndpoint>,
    block_explorer: bool,
    shutdown_trigger: Trigger,
    shutdown_listener: Listener,
    task: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl RpcServer {
    pub fn new(runtime: Handle, status: Arc<ChainStatus>, endpoint: Arc<dyn P2pEndpoint>, block_explorer: bool) -> Self {
        let (shutdown_trigger, shutdown_listener) = triggered::trigger();
        Self {
            runtime,
            status,
            endpoint,
            block_explorer,
            shutdown_trigger,
            shutdown_listener,
            task: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }
}

impl RpcApi for RpcServer {
    fn start(&self, config: &RpcConfig) -> Result<(), RpcError> {
        let listener =
            self.runtime.block_on(TcpListener::bind(config.bind)).map_err(|source| RpcError::Bind { addr: config.bind, source })?;
        let local_addr = listener.local_addr().map_err(|source| RpcError::Bind { addr: config.bind, source })?;
        *self.local_addr.lock() = Some(local_addr);

        let context = Arc::new(RpcContext {
            status: self.status.clone(),
            endpoint: self.endpoint.clone(),
            block_explorer: self.block_explorer,
            fee_address: config.fee_address.map(|address| address.to_string()).unwrap_or_default(),
            fee_amount: config.fee_amount,
            cors_origins: config.cors_origins.clone(),
        });
        if !context.fee_address.is_empty() {
            debug!("Charging a fee of {} to {}", context.fee_amount, context.fee_address);
        }
        for origin in context.cors_origins.iter() {
            debug!("Enabling CORS for {}", origin);
        }

        *self.task.lock() = Some(self.runtime.spawn(serve(listener, context, self.shutdown_listener.clone())));
        Ok(())
    }

    fn stop(&self) {
        self.shutdown_trigger.trigger();
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}
