use crate::server::telemetry::increment_stream_errors;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gather::Error;

/// HTTP view of an engine [`Error`].
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match &self.0 {
            Error::ServiceShutdown => StatusCode::SERVICE_UNAVAILABLE,
            Error::InvalidConfig { .. } => StatusCode::BAD_REQUEST,
            Error::Fetch { .. } | Error::Decode { .. } => StatusCode::BAD_GATEWAY,
            Error::RequestCancelled
            | Error::ChannelError { .. }
            | Error::Serialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        increment_stream_errors();
        let status = self.status();
        match &self.0 {
            Error::ServiceShutdown | Error::InvalidConfig { .. } => {
                tracing::warn!("Request rejected: {}", self.0);
            }
            _ => tracing::error!("Request failed: {}", self.0),
        }
        (status, self.0.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_is_unavailable() {
        assert_eq!(
            ApiError(Error::ServiceShutdown).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn serialization_is_internal() {
        let err = ApiError(Error::Serialization {
            context: "bad".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
