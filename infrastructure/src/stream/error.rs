//! Error types for the stream adapter

use horo_application::TransportError;
use thiserror::Error;

/// Result type alias for stream operations
pub type Result<T> = std::result::Result<T, StreamError>;

/// Errors that can occur on the streaming connection
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Invalid stream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StreamError> for TransportError {
    fn from(error: StreamError) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match error {
            StreamError::InvalidUrl(e) => TransportError::InvalidEndpoint(e.to_string()),
            StreamError::UnsupportedScheme(s) => TransportError::InvalidEndpoint(s),
            StreamError::WebSocket(WsError::Http(response)) => {
                TransportError::HandshakeRejected(response.status().as_u16())
            }
            StreamError::WebSocket(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                TransportError::Closed
            }
            StreamError::WebSocket(e) => TransportError::ConnectionError(e.to_string()),
            StreamError::Serialization(e) => TransportError::Encode(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_error_maps_to_invalid_endpoint() {
        let error = StreamError::from(url::Url::parse("not a url").unwrap_err());
        assert!(matches!(
            TransportError::from(error),
            TransportError::InvalidEndpoint(_)
        ));
    }

    #[test]
    fn test_closed_maps_to_closed() {
        let error = StreamError::WebSocket(tokio_tungstenite::tungstenite::Error::ConnectionClosed);
        assert_eq!(TransportError::from(error), TransportError::Closed);
    }
}
