use fieldmap::{CoordinationError, OAuth2Error, PhotoError};
use http::{Result as HttpResponse, StatusCode};

/// Helper trait for converting errors to a standard response error format
pub(super) trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

/// Map CoordinationError variants to status codes. OAuth failures carry the
/// user-facing message rather than the internal one.
impl<T> IntoResponseError<T> for Result<T, CoordinationError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| {
            let status = match &e {
                CoordinationError::Unauthorized => StatusCode::UNAUTHORIZED,
                CoordinationError::Conflict(_) => StatusCode::CONFLICT,
                CoordinationError::BadRequest(_) => StatusCode::BAD_REQUEST,
                CoordinationError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
                CoordinationError::OAuth2Error(OAuth2Error::ConfigurationMissing(_)) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                CoordinationError::OAuth2Error(_) => StatusCode::BAD_REQUEST,
                CoordinationError::PhotoError(PhotoError::Image(_)) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, e.user_message())
        })
    }
}

/// Implementation for http::Error (used by Response::builder())
impl<T> IntoResponseError<T> for HttpResponse<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }
}
