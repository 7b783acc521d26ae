//! Token supply and per-link bookkeeping

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::events::WireFrame;

/// Source of the bearer token, asked on every connect attempt.
///
/// Returning `None` or an empty string fails the attempt with an
/// authentication error.
pub trait TokenSupplier: Send + Sync {
    fn token(&self) -> Option<String>;
}

impl<F> TokenSupplier for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// A fixed token
#[derive(Debug, Clone)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl TokenSupplier for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// The open link owned by the connection manager.
///
/// Dropping it aborts the reader and ping tasks and releases the outbound
/// sender, which closes the transport.
pub(crate) struct ActiveLink {
    pub id: Uuid,
    pub outbound: mpsc::UnboundedSender<WireFrame>,
    pub reader: Option<JoinHandle<()>>,
    pub pinger: JoinHandle<()>,
}

impl ActiveLink {
    pub fn new(outbound: mpsc::UnboundedSender<WireFrame>, pinger: JoinHandle<()>) -> Self {
        Self {
            id: Uuid::new_v4(),
            outbound,
            reader: None,
            pinger,
        }
    }

    pub fn send(&self, frame: WireFrame) -> bool {
        self.outbound.send(frame).is_ok()
    }
}

impl Drop for ActiveLink {
    fn drop(&mut self) {
        self.pinger.abort();
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_supplier() {
        let supplier = || Some("abc".to_string());
        assert_eq!(supplier.token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_static_token() {
        assert_eq!(StaticToken::new("t").token().as_deref(), Some("t"));
        assert!(StaticToken::none().token().is_none());
    }
}
