use std::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};

use color_eyre::Result;
use eyre::eyre;
use futures::future::BoxFuture;
use hyper::Uri;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocols::http::{mk_post_request, HyperHttpClient};

/// Request/response transport to a single device.
pub trait RpcHandler: Send + Sync {
    /// Whether the device is currently reachable.
    fn connected(&self) -> bool;

    fn set_connected(&self, connected: bool);

    fn request<'a>(&'a self, method: &'a str, params: Value) -> BoxFuture<'a, Result<Value>>;
}

#[derive(Serialize, Debug, Clone)]
struct RpcRequest<'a> {
    id: u64,
    src: &'a str,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Deserialize, Debug, Clone)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// JSON-RPC over the device's local `/rpc` HTTP endpoint.
pub struct HttpRpcHandler {
    uri: Uri,
    src: String,
    client: HyperHttpClient,
    timeout: Duration,
    next_id: AtomicU64,
    connected: AtomicBool,
}

impl HttpRpcHandler {
    pub fn new(addr: &str, src: &str, client: HyperHttpClient, timeout: Duration) -> Result<Self> {
        let uri = format!("http://{}/rpc", addr).parse::<Uri>().map_err(|e| {
            eyre!(
                "Failed to build RPC URI for given address. Check your shelly device addr config. {:?}",
                e
            )
        })?;

        Ok(HttpRpcHandler {
            uri,
            src: src.to_string(),
            client,
            timeout,
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(false),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = RpcRequest {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            src: &self.src,
            method,
            params,
        };

        let response = tokio::time::timeout(
            self.timeout,
            mk_post_request::<_, RpcResponse>(&self.client, &self.uri, &request),
        )
        .await
        .map_err(|_| eyre!("{} timed out after {:?}", method, self.timeout))?;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                let unreachable = e
                    .downcast_ref::<hyper::Error>()
                    .map(hyper::Error::is_connect)
                    .unwrap_or(false);

                if unreachable {
                    self.set_connected(false);
                }

                return Err(e);
            }
        };

        self.set_connected(true);

        match response {
            RpcResponse {
                error: Some(error), ..
            } => Err(eyre!(
                "{} failed with code {}: {}",
                method,
                error.code,
                error.message
            )),
            RpcResponse { result, .. } => Ok(result.unwrap_or(Value::Null)),
        }
    }
}

impl RpcHandler for HttpRpcHandler {
    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn request<'a>(&'a self, method: &'a str, params: Value) -> BoxFuture<'a, Result<Value>> {
        Box::pin(self.call(method, params))
    }
}
