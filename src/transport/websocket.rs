//! WebSocket transport built on tokio-tungstenite.
//!
//! Each link runs two tasks: a writer draining the outbound channel into the
//! socket and a reader forwarding parsed frames (and the final close) to the
//! inbound channel.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as WsError;
use url::Url;

use crate::events::WireFrame;

use super::{CloseReason, HandshakeRequest, Transport, TransportError, TransportEvent, TransportLink};

#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, request: &HandshakeRequest) -> Result<TransportLink, TransportError> {
        let url = handshake_url(request)?;
        let mut ws_request = url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Connect(format!("Invalid endpoint '{}': {}", request.endpoint, e)))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", request.token))
            .map_err(|_| TransportError::Unauthorized("token is not a valid header value".to_string()))?;
        ws_request.headers_mut().insert(AUTHORIZATION, bearer);

        let (stream, _response) = match tokio_tungstenite::connect_async(ws_request).await {
            Ok(connected) => connected,
            Err(WsError::Http(response)) => {
                let status = response.status().as_u16();
                return Err(match status {
                    401 | 403 => TransportError::Unauthorized(format!("endpoint answered {}", status)),
                    _ => TransportError::Connect(format!("WebSocket HTTP error: {}", status)),
                });
            }
            Err(e) => return Err(TransportError::Connect(e.to_string())),
        };

        tracing::debug!(endpoint = %request.endpoint, "WebSocket opened");

        let (mut sink, mut source) = stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WireFrame>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<TransportEvent>();

        // Writer: ends when every outbound sender is dropped
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(event = %frame.event, error = %e, "Failed to serialize frame");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    tracing::debug!(error = %e, "WebSocket send failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Reader: ends on close, error, or when nobody listens any more
        tokio::spawn(async move {
            let reason = loop {
                match source.next().await {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<WireFrame>(&text) {
                        Ok(frame) => {
                            if in_tx.send(TransportEvent::Frame(frame)).is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Ignoring malformed frame");
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        break CloseReason::ServerClosed {
                            code: frame.as_ref().map(|f| u16::from(f.code)),
                            reason: frame.map(|f| f.reason.to_string()).unwrap_or_default(),
                        };
                    }
                    // Ping/pong frames are answered by tungstenite itself
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break CloseReason::NetworkError(e.to_string()),
                    None => break CloseReason::NetworkError("stream ended".to_string()),
                }
            };
            let _ = in_tx.send(TransportEvent::Closed(reason));
        });

        Ok(TransportLink {
            outbound: out_tx,
            inbound: in_rx,
        })
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

/// Endpoint with `token` and `platform` added to its query string.
fn handshake_url(request: &HandshakeRequest) -> Result<Url, TransportError> {
    let mut url = Url::parse(&request.endpoint)
        .map_err(|e| TransportError::Connect(format!("Invalid endpoint '{}': {}", request.endpoint, e)))?;
    url.query_pairs_mut()
        .append_pair("token", &request.token)
        .append_pair("platform", &request.platform);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(endpoint: &str, token: &str) -> HandshakeRequest {
        HandshakeRequest {
            endpoint: endpoint.to_string(),
            token: token.to_string(),
            platform: "web".to_string(),
        }
    }

    fn url_for(endpoint: &str, token: &str) -> String {
        handshake_url(&request(endpoint, token)).unwrap().to_string()
    }

    #[test]
    fn test_handshake_url_appends_query() {
        assert_eq!(
            url_for("ws://localhost:3001/realtime", "abc"),
            "ws://localhost:3001/realtime?token=abc&platform=web"
        );
        assert_eq!(
            url_for("ws://localhost/rt?v=2", "abc"),
            "ws://localhost/rt?v=2&token=abc&platform=web"
        );
    }

    #[test]
    fn test_query_goes_before_fragment() {
        let url = handshake_url(&request("wss://h/rt#live", "t")).unwrap();
        assert_eq!(url.as_str(), "wss://h/rt?token=t&platform=web#live");
        assert_eq!(url.query(), Some("token=t&platform=web"));
        assert_eq!(url.fragment(), Some("live"));
    }

    #[test]
    fn test_token_is_encoded() {
        let url = handshake_url(&request("ws://localhost/rt", "a b+c/=&x")).unwrap();
        let token = url
            .query_pairs()
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned());
        assert_eq!(token.as_deref(), Some("a b+c/=&x"));
        assert!(!url.as_str().contains("a b"));
    }

    #[test]
    fn test_unparseable_endpoint_rejected() {
        assert!(matches!(
            handshake_url(&request("not a url", "t")),
            Err(TransportError::Connect(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connect_error() {
        let transport = WebSocketTransport::new();
        // Port 9 (discard) on localhost is almost never listening
        let result = transport.open(&request("ws://127.0.0.1:9/realtime", "t")).await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_connect_error() {
        let transport = WebSocketTransport::new();
        let result = transport.open(&request("not a url", "t")).await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }
}
