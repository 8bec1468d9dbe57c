use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Hosting provider a publish goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Netlify,
    Firebase,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Netlify => write!(f, "Netlify"),
            Provider::Firebase => write!(f, "Firebase"),
        }
    }
}

/// One external call in a publish sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    Authenticate,
    CreateSite,
    Deploy,
    CreateVersion,
    UploadContent,
    FinalizeVersion,
    ReleaseVersion,
}

impl PublishStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStep::Authenticate => "authenticate",
            PublishStep::CreateSite => "create-site",
            PublishStep::Deploy => "deploy",
            PublishStep::CreateVersion => "create-version",
            PublishStep::UploadContent => "upload-content",
            PublishStep::FinalizeVersion => "finalize-version",
            PublishStep::ReleaseVersion => "release-version",
        }
    }
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What was done about resources left behind by a failed publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// A best-effort delete was issued; its own outcome is only logged.
    DeleteAttempted,
    /// Nothing was cleaned up; the resource must be reconciled by hand.
    None,
}

/// Failure of a single provider API call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("failed to build deploy archive: {0}")]
    Archive(String),
}

impl ProviderError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{provider} publishing is not configured: {reason}")]
    NotConfigured { provider: Provider, reason: String },

    #[error("Invalid {provider} target: {reason}")]
    InvalidTarget { provider: Provider, reason: String },

    #[error("{provider} publish failed at step '{step}': {cause}")]
    Failed {
        provider: Provider,
        step: PublishStep,
        #[source]
        cause: ProviderError,
    },

    /// The sequence broke after `resource` was created on the provider.
    #[error("{provider} publish failed at step '{step}' after creating {resource}: {cause}")]
    Partial {
        provider: Provider,
        step: PublishStep,
        resource: String,
        compensation: Compensation,
        #[source]
        cause: ProviderError,
    },
}

impl PublishError {
    pub fn provider(&self) -> Provider {
        match self {
            PublishError::NotConfigured { provider, .. }
            | PublishError::InvalidTarget { provider, .. }
            | PublishError::Failed { provider, .. }
            | PublishError::Partial { provider, .. } => *provider,
        }
    }

    pub fn step(&self) -> Option<PublishStep> {
        match self {
            PublishError::Failed { step, .. } | PublishError::Partial { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub fn cause(&self) -> Option<&ProviderError> {
        match self {
            PublishError::Failed { cause, .. } | PublishError::Partial { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Pass a successful response through; turn anything else into
/// [`ProviderError::Status`] carrying the provider's own message.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        message: provider_message(&body),
    })
}

/// Best-effort extraction of a human-readable message from a provider
/// error body. Handles `{"message"}` (Netlify), `{"error":{"message"}}`
/// (Google) and `{"error","error_description"}` (OAuth); anything else is
/// returned trimmed.
pub fn provider_message(body: &str) -> String {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorBody {
        Google { error: NestedError },
        OAuth {
            error: String,
            error_description: Option<String>,
        },
        Plain { message: String },
    }

    #[derive(Deserialize)]
    struct NestedError {
        message: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody::Google { error }) => error.message,
        Ok(ErrorBody::OAuth {
            error,
            error_description,
        }) => match error_description {
            Some(description) => format!("{}: {}", error, description),
            None => error,
        },
        Ok(ErrorBody::Plain { message }) => message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
