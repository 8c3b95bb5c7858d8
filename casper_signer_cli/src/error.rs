use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use casper_signer_core::SignerError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error("Unknown account: {0}")]
    UnknownAccount(String),
    #[error("Missing or invalid approval token")]
    Unauthorized,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UnknownAccount(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Signer(err) => match err {
                SignerError::NotFound(_) => StatusCode::NOT_FOUND,
                SignerError::AlreadySettled(_) | SignerError::AlreadyRegistered(_) => {
                    StatusCode::CONFLICT
                }
                SignerError::NoActiveAccount
                | SignerError::NoAccount
                | SignerError::NotConnected
                | SignerError::MissingPayload => StatusCode::PRECONDITION_FAILED,
                SignerError::ParseFailure(_)
                | SignerError::Json(_)
                | SignerError::InvalidKey(_)
                | SignerError::UnsupportedKeyAlgorithm(_)
                | SignerError::Validation(_) => StatusCode::BAD_REQUEST,
                SignerError::KeyChangedDuringSigning
                | SignerError::Cancelled
                | SignerError::NullPayload => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            Json(json!({
                "status": "error",
                "message": self.to_string()
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casper_signer_core::RequestId;

    #[test]
    fn maps_signer_errors_to_status_codes() {
        let cases = [
            (SignerError::NotFound(RequestId(1)), StatusCode::NOT_FOUND),
            (SignerError::AlreadySettled(RequestId(1)), StatusCode::CONFLICT),
            (SignerError::NoActiveAccount, StatusCode::PRECONDITION_FAILED),
            (SignerError::NotConnected, StatusCode::PRECONDITION_FAILED),
            (SignerError::ParseFailure("x".to_string()), StatusCode::BAD_REQUEST),
            (SignerError::KeyChangedDuringSigning, StatusCode::FORBIDDEN),
            (SignerError::Cancelled, StatusCode::FORBIDDEN),
            (SignerError::SigningFailed("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
        assert_eq!(
            ApiError::UnknownAccount("ghost".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn message_is_the_signer_text() {
        let err = ApiError::from(SignerError::Cancelled);
        assert_eq!(err.to_string(), "User Cancelled Signing");
    }
}
