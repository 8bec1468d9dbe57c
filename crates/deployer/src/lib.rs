// Publish targets: take one HTML document live on a static host

pub mod error;
pub mod firebase;
pub mod netlify;

#[cfg(test)]
mod test_server;

use async_trait::async_trait;

pub use error::{Compensation, Provider, ProviderError, PublishError, PublishStep};
pub use firebase::FirebaseTarget;
pub use netlify::NetlifyTarget;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentResult {
    pub provider: Provider,
    /// Public URL the document is served from.
    pub url: String,
}

/// Publish a single HTML document and report where it is served.
///
/// Success is only returned once every step of the provider's sequence
/// has been acknowledged.
#[async_trait]
pub trait Deployer {
    async fn deploy(&self, html: &str) -> Result<DeploymentResult, PublishError>;
}

pub enum PublishTarget {
    Netlify(NetlifyTarget),
    Firebase(FirebaseTarget),
}

impl PublishTarget {
    pub fn provider(&self) -> Provider {
        match self {
            PublishTarget::Netlify(_) => Provider::Netlify,
            PublishTarget::Firebase(_) => Provider::Firebase,
        }
    }
}

#[async_trait]
impl Deployer for PublishTarget {
    async fn deploy(&self, html: &str) -> Result<DeploymentResult, PublishError> {
        match self {
            PublishTarget::Netlify(target) => target.deploy(html).await,
            PublishTarget::Firebase(target) => target.deploy(html).await,
        }
    }
}
