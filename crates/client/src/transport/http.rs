//! HTTP transport backed by `reqwest`.

use super::{JsonRpcRequest, JsonRpcResponse, Transport};
use crate::EngineClientResult;
use async_trait::async_trait;
use reqwest::{Client, header::CONTENT_TYPE};
use url::Url;

/// Sends JSON-RPC requests over HTTP to a single URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: Url,
}

impl HttpTransport {
    /// Creates a transport for `url`.
    pub fn new(url: Url) -> EngineClientResult<Self> {
        Ok(Self { client: Client::builder().build()?, url })
    }

    /// Returns the endpoint URL.
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &JsonRpcRequest,
        bearer: Option<&str>,
    ) -> EngineClientResult<JsonRpcResponse> {
        let mut builder = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(request);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?.error_for_status()?;
        // Buffer the whole body so the result can be decoded more than once.
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineClientError;
    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    /// Serves exactly one HTTP request with `status` and `body`, returning the raw request text.
    async fn serve_once(status: &'static str, body: String) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let content_length = text[..split]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= split + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf).to_string()
        });

        (url, handle)
    }

    #[tokio::test]
    async fn test_sends_bearer_token() {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "result": "0x1" }).to_string();
        let (url, server) = serve_once("200 OK", body).await;

        let transport = HttpTransport::new(url).unwrap();
        let request = JsonRpcRequest::new("engine_getPayloadV1", json!(["0x0000000000000001"]));
        let response = transport.send(&request, Some("abc.def.ghi")).await.unwrap();

        assert_eq!(response.into_result().unwrap().unwrap().get(), r#""0x1""#);
        let raw_request = server.await.unwrap().to_lowercase();
        assert!(raw_request.contains("authorization: bearer abc.def.ghi"));
        assert!(raw_request.contains("engine_getpayloadv1"));
    }

    #[tokio::test]
    async fn test_no_bearer_without_token() {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "result": null }).to_string();
        let (url, server) = serve_once("200 OK", body).await;

        let transport = HttpTransport::new(url).unwrap();
        let request = JsonRpcRequest::new("eth_getBlockByNumber", json!(["latest", false]));
        let response = transport.send(&request, None).await.unwrap();

        assert!(response.into_result().unwrap().is_none());
        assert!(!server.await.unwrap().to_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let (url, server) = serve_once("401 Unauthorized", String::new()).await;

        let transport = HttpTransport::new(url).unwrap();
        let request = JsonRpcRequest::new("engine_forkchoiceUpdatedV1", json!([]));
        let err = transport.send(&request, Some("bad")).await.unwrap_err();

        assert!(matches!(err, EngineClientError::Transport(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        drop(listener);

        let transport = HttpTransport::new(url).unwrap();
        let request = JsonRpcRequest::new("eth_getBlockByNumber", json!(["latest", false]));
        let err = transport.send(&request, None).await.unwrap_err();
        assert!(err.is_transport());
    }
}
