use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use landing_kit_deployer::{PublishError, PublishStep};
use landing_kit_generator::GenerationError;
use serde::Serialize;

/// Every way a request can fail, mapped onto one status code and the
/// `{ error, details?, step? }` body.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed body or missing/invalid fields.
    Validation {
        message: String,
        details: Option<String>,
    },
    PayloadTooLarge(String),
    /// The server lacks credentials for the requested capability.
    Configuration(String),
    /// The generation service or a hosting provider failed.
    Upstream {
        message: String,
        details: String,
        step: Option<PublishStep>,
    },
    Forbidden(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<&'static str>,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation { message, details } => ErrorBody {
                error: message,
                details: details.as_deref(),
                step: None,
            },
            ApiError::PayloadTooLarge(message)
            | ApiError::Configuration(message)
            | ApiError::Forbidden(message) => ErrorBody {
                error: message,
                details: None,
                step: None,
            },
            ApiError::Upstream {
                message,
                details,
                step,
            } => ErrorBody {
                error: message,
                details: Some(details),
                step: step.map(|s| s.as_str()),
            },
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = body.error, details = ?body.details, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = body.error, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge(rejection.body_text());
        }
        ApiError::Validation {
            message: "Malformed JSON request body".to_string(),
            details: Some(rejection.body_text()),
        }
    }
}

impl From<landing_kit_core::Error> for ApiError {
    fn from(err: landing_kit_core::Error) -> Self {
        use landing_kit_core::Error;
        match err {
            Error::MissingField(_) | Error::InvalidData(_) => ApiError::validation(err.to_string()),
            Error::ConfigParse(_) | Error::IoError(_) => ApiError::Configuration(err.to_string()),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::NotConfigured(_) => ApiError::Configuration(err.to_string()),
            _ => ApiError::Upstream {
                message: "Content generation failed".to_string(),
                details: err.to_string(),
                step: None,
            },
        }
    }
}

impl From<PublishError> for ApiError {
    fn from(err: PublishError) -> Self {
        match &err {
            PublishError::NotConfigured { .. } => ApiError::Configuration(err.to_string()),
            PublishError::InvalidTarget { .. } => ApiError::validation(err.to_string()),
            PublishError::Failed { provider, step, .. }
            | PublishError::Partial { provider, step, .. } => ApiError::Upstream {
                message: format!("{} deploy failed", provider),
                step: Some(*step),
                details: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landing_kit_deployer::{Compensation, Provider, ProviderError};

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(landing_kit_core::Error::MissingField("siteId".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(GenerationError::NotConfigured("no key".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(GenerationError::Empty).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(PublishError::InvalidTarget {
                provider: Provider::Firebase,
                reason: "bad".into(),
            })
            .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_partial_publish_carries_step() {
        let err = ApiError::from(PublishError::Partial {
            provider: Provider::Netlify,
            step: PublishStep::Deploy,
            resource: "site s-1".into(),
            compensation: Compensation::DeleteAttempted,
            cause: ProviderError::Status {
                status: 422,
                message: "bad archive".into(),
            },
        });

        match err {
            ApiError::Upstream {
                message,
                details,
                step,
            } => {
                assert_eq!(message, "Netlify deploy failed");
                assert_eq!(step, Some(PublishStep::Deploy));
                assert!(details.contains("bad archive"));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }
}
