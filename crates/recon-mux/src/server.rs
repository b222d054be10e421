//! Line-delimited JSON-RPC server
//!
//! Reads one request per line and writes one response per line. Any
//! [`ProviderServer`] can be served; in production that is the
//! [`MuxServer`](crate::MuxServer).

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use recon_client::CallContext;

use crate::backend::ProviderServer;
use crate::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, InitializeResult, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND,
    PARSE_ERROR, ServerInfo,
};
use crate::{Error, Result};

pub const PROTOCOL_VERSION: &str = "1";

/// Serves a [`ProviderServer`] over a byte stream.
pub struct ProtocolServer<S> {
    server: S,
    ctx: CallContext,
}

impl<S: ProviderServer> ProtocolServer<S> {
    pub fn new(server: S) -> Self {
        Self {
            server,
            ctx: CallContext::new(),
        }
    }

    /// Cancelling `ctx` cancels every in-flight and future remote call.
    pub fn with_context(mut self, ctx: CallContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn inner(&self) -> &S {
        &self.server
    }

    /// Serve requests on stdin, responding on stdout.
    pub async fn run_stdio(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve until `reader` reaches end of input.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(server = self.server.name(), "Protocol server ready");
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            tracing::debug!(request = %line, "Received message");

            if let Some(response) = self.handle_message(&line).await {
                let mut text = serde_json::to_string(&response)?;
                text.push('\n');
                writer.write_all(text.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        tracing::info!("Input closed, protocol server stopping");
        Ok(())
    }

    /// Handle one raw message. Notifications produce no response.
    pub async fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable message");
                return Some(JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}")));
            }
        };
        if request.jsonrpc != "2.0" {
            tracing::warn!(version = %request.jsonrpc, "Unexpected JSON-RPC version");
        }

        let id = request.id;
        let params = request.params;
        let result = match request.method.as_str() {
            "initialized" | "notifications/initialized" => return None,
            "initialize" => to_value(self.initialize()),
            "schema/get" => to_value(self.server.get_schema().await),
            "provider/configure" => match parse(params) {
                Ok(req) => self.server.configure(req).await.and_then(to_value),
                Err(response) => return Some(response.with_id(id)),
            },
            "resource/validate" => match parse(params) {
                Ok(req) => self.server.validate(req).await.and_then(to_value),
                Err(response) => return Some(response.with_id(id)),
            },
            "resource/plan" => match parse(params) {
                Ok(req) => self.server.plan(req).await.and_then(to_value),
                Err(response) => return Some(response.with_id(id)),
            },
            "resource/apply" => match parse(params) {
                Ok(req) => self.server.apply(req, &self.ctx.child()).await.and_then(to_value),
                Err(response) => return Some(response.with_id(id)),
            },
            "resource/import" => match parse(params) {
                Ok(req) => self.server.import(req, &self.ctx.child()).await.and_then(to_value),
                Err(response) => return Some(response.with_id(id)),
            },
            "resource/read" => match parse(params) {
                Ok(req) => self.server.read(req, &self.ctx.child()).await.and_then(to_value),
                Err(response) => return Some(response.with_id(id)),
            },
            method => {
                return Some(JsonRpcResponse::error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {method}"),
                ));
            }
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                tracing::error!(error = %e, "Request failed");
                JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Internal error: {e}"))
            }
        })
    }

    fn initialize(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            server_info: ServerInfo {
                name: self.server.name().to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

/// Parse request params, or the `-32602` response to send instead.
fn parse<T: DeserializeOwned>(params: Value) -> std::result::Result<T, JsonRpcResponse> {
    serde_json::from_value(params)
        .map_err(|e| JsonRpcResponse::error(None, INVALID_PARAMS, format!("Invalid params: {e}")))
}

fn to_value<T: Serialize>(response: T) -> Result<Value> {
    serde_json::to_value(response).map_err(Error::from)
}

impl JsonRpcResponse {
    fn with_id(mut self, id: Option<Value>) -> Self {
        self.id = id;
        self
    }
}
