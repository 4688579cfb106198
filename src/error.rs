//! Error types for the firehose driver

use ethers::providers::{ProviderError, RpcError};
use thiserror::Error;

/// Main error type for submission paths.
///
/// The retry protocol only distinguishes two classes: `Rejected` (the node
/// answered and refused the value) is recovered by raising the gas-price
/// floor; every other variant is recovered by resynchronizing the nonce.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("rejected by node (code {code}): {message}")]
    Rejected {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("signing error: {0}")]
    Signing(String),
}

impl SubmitError {
    /// Check if this is the rejection class, recovered by a floor raise.
    ///
    /// Classification is by error type only, never by message content.
    pub fn is_rejection(&self) -> bool {
        matches!(self, SubmitError::Rejected { .. })
    }
}

impl From<ProviderError> for SubmitError {
    fn from(err: ProviderError) -> Self {
        // A JSON-RPC error response means the node received the submission
        // and refused it; anything else never reached a decision.
        match err.as_error_response() {
            Some(rpc_err) => SubmitError::Rejected {
                code: rpc_err.code,
                message: rpc_err.message.clone(),
                data: rpc_err.data.clone(),
            },
            None => SubmitError::Transport(err.to_string()),
        }
    }
}

/// Result type for submission operations
pub type SubmitResult<T> = Result<T, SubmitError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::{HttpClientError, JsonRpcError};

    fn rpc_error_response(code: i64, message: &str) -> ProviderError {
        ProviderError::JsonRpcClientError(Box::new(HttpClientError::JsonRpcError(
            JsonRpcError {
                code,
                message: message.to_string(),
                data: None,
            },
        )))
    }

    #[test]
    fn error_response_classifies_as_rejection() {
        let err: SubmitError = rpc_error_response(-32000, "transaction underpriced").into();
        assert!(err.is_rejection());
        match err {
            SubmitError::Rejected { code, message, .. } => {
                assert_eq!(code, -32000);
                assert_eq!(message, "transaction underpriced");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn connection_failure_classifies_as_transport() {
        let err: SubmitError =
            ProviderError::CustomError("connection refused".to_string()).into();
        assert!(!err.is_rejection());
        assert!(matches!(err, SubmitError::Transport(_)));
    }
}
