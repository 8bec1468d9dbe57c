// Firebase Hosting REST client and five-step publish workflow

pub mod auth;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::error::{Compensation, Provider, ProviderError, PublishError, PublishStep, check_status};
use crate::{DeploymentResult, Deployer};

pub use auth::{AuthError, AuthState, FirebaseAuth, ServiceAccount, TokenSource};

/// Path the single document is served from.
pub const INDEX_PATH: &str = "/index.html";

/// Hosting site resource, as returned by `sites.create`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostingSite {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub default_url: Option<String>,
}

/// A created version and where its files go.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostingVersion {
    /// Full resource name, e.g. `sites/{site}/versions/{id}`.
    pub name: String,
    /// Absent when the upload URL must be fetched with `populateFiles`.
    #[serde(default)]
    pub upload_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostingRelease {
    #[serde(default)]
    pub name: Option<String>,
}

/// The five Firebase Hosting calls a publish needs.
#[async_trait]
pub trait HostingApi: Send + Sync {
    async fn create_site(
        &self,
        token: &str,
        project_id: &str,
        site_id: &str,
    ) -> Result<HostingSite, ProviderError>;

    /// Create a version declaring [`INDEX_PATH`] with `file_hash`.
    async fn create_version(
        &self,
        token: &str,
        project_id: &str,
        site_id: &str,
        file_hash: &str,
    ) -> Result<HostingVersion, ProviderError>;

    /// Declare the file again on an existing version and return the
    /// upload URL.
    async fn populate_files(
        &self,
        token: &str,
        version_name: &str,
        file_hash: &str,
    ) -> Result<String, ProviderError>;

    async fn upload_file(
        &self,
        token: &str,
        upload_url: &str,
        file_hash: &str,
        content: &[u8],
    ) -> Result<(), ProviderError>;

    async fn finalize_version(&self, token: &str, version_name: &str) -> Result<(), ProviderError>;

    async fn release_version(
        &self,
        token: &str,
        project_id: &str,
        site_id: &str,
        version_name: &str,
    ) -> Result<HostingRelease, ProviderError>;
}

/// Firebase Hosting REST API client
pub struct FirebaseHostingClient {
    client: reqwest::Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PopulateFilesResponse {
    upload_url: String,
}

impl FirebaseHostingClient {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl HostingApi for FirebaseHostingClient {
    async fn create_site(
        &self,
        token: &str,
        project_id: &str,
        site_id: &str,
    ) -> Result<HostingSite, ProviderError> {
        let url = format!("{}/projects/{}/sites", self.api_base, project_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .query(&[("siteId", site_id)])
            .json(&json!({}))
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn create_version(
        &self,
        token: &str,
        project_id: &str,
        site_id: &str,
        file_hash: &str,
    ) -> Result<HostingVersion, ProviderError> {
        let url = format!(
            "{}/projects/{}/sites/{}/versions",
            self.api_base, project_id, site_id
        );
        let body = json!({
            "config": {
                "files": {
                    INDEX_PATH: { "hash": file_hash, "status": "ACTIVE" }
                }
            }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn populate_files(
        &self,
        token: &str,
        version_name: &str,
        file_hash: &str,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/{}:populateFiles", self.api_base, version_name);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "files": { INDEX_PATH: file_hash } }))
            .send()
            .await?;
        let populated: PopulateFilesResponse = check_status(response).await?.json().await?;
        Ok(populated.upload_url)
    }

    async fn upload_file(
        &self,
        token: &str,
        upload_url: &str,
        file_hash: &str,
        content: &[u8],
    ) -> Result<(), ProviderError> {
        let url = format!("{}/{}", upload_url.trim_end_matches('/'), file_hash);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, content.len())
            .body(content.to_vec())
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn finalize_version(&self, token: &str, version_name: &str) -> Result<(), ProviderError> {
        let url = format!("{}/{}", self.api_base, version_name);
        let response = self
            .client
            .patch(&url)
            .bearer_auth(token)
            .query(&[("update_mask", "status")])
            .json(&json!({ "status": "FINALIZED" }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn release_version(
        &self,
        token: &str,
        project_id: &str,
        site_id: &str,
        version_name: &str,
    ) -> Result<HostingRelease, ProviderError> {
        let url = format!(
            "{}/projects/{}/sites/{}/releases",
            self.api_base, project_id, site_id
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .query(&[("versionName", version_name)])
            .json(&json!({}))
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }
}

/// Lowercase hex SHA-256 of the document bytes.
pub fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

// Step receipts. Each step consumes the previous receipt, so the sequence
// can only run in order and a `Released` value implies every step succeeded.

#[derive(Debug)]
pub struct SiteEnsured {
    site_id: String,
    url: String,
    already_existed: bool,
}

impl SiteEnsured {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn already_existed(&self) -> bool {
        self.already_existed
    }
}

#[derive(Debug)]
pub struct VersionCreated {
    site: SiteEnsured,
    version_name: String,
    upload_url: String,
    file_hash: String,
}

impl VersionCreated {
    pub fn version_name(&self) -> &str {
        &self.version_name
    }

    pub fn file_hash(&self) -> &str {
        &self.file_hash
    }
}

#[derive(Debug)]
pub struct ContentUploaded {
    version: VersionCreated,
}

#[derive(Debug)]
pub struct Finalized {
    version: VersionCreated,
}

#[derive(Debug)]
pub struct Released {
    pub url: String,
    pub version_name: String,
}

/// Publishes to a caller-named Firebase Hosting site.
pub struct FirebaseTarget {
    api: Arc<dyn HostingApi>,
    auth: FirebaseAuth,
    project_id: Option<String>,
    site_id: String,
}

impl FirebaseTarget {
    pub fn new(
        api: Arc<dyn HostingApi>,
        auth: FirebaseAuth,
        project_id: Option<String>,
        site_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            auth,
            project_id,
            site_id: site_id.into(),
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    /// Everything that can be checked without touching the network.
    fn preflight(&self) -> Result<&str, PublishError> {
        if !landing_kit_validator::is_valid_site_id(&self.site_id) {
            return Err(PublishError::InvalidTarget {
                provider: Provider::Firebase,
                reason: format!(
                    "site id \"{}\" must match {}",
                    self.site_id,
                    landing_kit_validator::SITE_ID_PATTERN
                ),
            });
        }

        match self.auth.state() {
            AuthState::Ready(_) => {}
            AuthState::Uninitialized => {
                return Err(PublishError::NotConfigured {
                    provider: Provider::Firebase,
                    reason: "service account credentials are not initialized".to_string(),
                });
            }
            AuthState::Failed(reason) => {
                return Err(PublishError::NotConfigured {
                    provider: Provider::Firebase,
                    reason: format!("service account credentials unusable: {}", reason),
                });
            }
        }

        self.project_id
            .as_deref()
            .ok_or_else(|| PublishError::NotConfigured {
                provider: Provider::Firebase,
                reason: "no Firebase project id configured".to_string(),
            })
    }

    async fn access_token(&self) -> Result<String, PublishError> {
        let AuthState::Ready(source) = self.auth.state() else {
            return Err(PublishError::NotConfigured {
                provider: Provider::Firebase,
                reason: "service account credentials are not initialized".to_string(),
            });
        };
        source
            .access_token()
            .await
            .map_err(|e| PublishError::Failed {
                provider: Provider::Firebase,
                step: PublishStep::Authenticate,
                cause: ProviderError::Auth(e.to_string()),
            })
    }

    fn failed(&self, step: PublishStep, cause: ProviderError, created: Option<String>) -> PublishError {
        tracing::error!(site_id = %self.site_id, %step, error = %cause, "Firebase publish failed");
        match created {
            Some(resource) => PublishError::Partial {
                provider: Provider::Firebase,
                step,
                resource,
                compensation: Compensation::None,
                cause,
            },
            None => PublishError::Failed {
                provider: Provider::Firebase,
                step,
                cause,
            },
        }
    }

    /// Step 1: create the site; an existing site (HTTP 409) is reused.
    pub async fn ensure_site(&self, token: &str, project_id: &str) -> Result<SiteEnsured, PublishError> {
        tracing::info!(site_id = %self.site_id, "step 1/5: creating site");
        let (site, already_existed) = match self.api.create_site(token, project_id, &self.site_id).await {
            Ok(site) => (site, false),
            Err(cause) if cause.status() == Some(409) => {
                tracing::info!(site_id = %self.site_id, "site already exists, deploying to it");
                (HostingSite::default(), true)
            }
            Err(cause) => return Err(self.failed(PublishStep::CreateSite, cause, None)),
        };

        let url = site
            .default_url
            .unwrap_or_else(|| format!("https://{}.web.app", self.site_id));
        Ok(SiteEnsured {
            site_id: self.site_id.clone(),
            url,
            already_existed,
        })
    }

    /// Step 2: declare `/index.html` with the document's hash.
    pub async fn create_version(
        &self,
        token: &str,
        project_id: &str,
        site: SiteEnsured,
        html: &str,
    ) -> Result<VersionCreated, PublishError> {
        let file_hash = content_hash(html.as_bytes());
        tracing::info!(site_id = %site.site_id, %file_hash, "step 2/5: creating version");

        let created = (!site.already_existed).then(|| format!("site {}", site.site_id));
        let version = self
            .api
            .create_version(token, project_id, &site.site_id, &file_hash)
            .await
            .map_err(|cause| self.failed(PublishStep::CreateVersion, cause, created))?;

        // Some API revisions only hand out the upload URL from populateFiles.
        let upload_url = match version.upload_url {
            Some(upload_url) => upload_url,
            None => self
                .api
                .populate_files(token, &version.name, &file_hash)
                .await
                .map_err(|cause| {
                    self.failed(
                        PublishStep::CreateVersion,
                        cause,
                        Some(format!("version {}", version.name)),
                    )
                })?,
        };

        Ok(VersionCreated {
            site,
            version_name: version.name,
            upload_url,
            file_hash,
        })
    }

    /// Step 3: upload the raw bytes under the hash declared in step 2.
    pub async fn upload_content(
        &self,
        token: &str,
        version: VersionCreated,
        html: &str,
    ) -> Result<ContentUploaded, PublishError> {
        let content = html.as_bytes();
        tracing::info!(version = %version.version_name, bytes = content.len(), "step 3/5: uploading index.html");

        self.api
            .upload_file(token, &version.upload_url, &version.file_hash, content)
            .await
            .map_err(|cause| {
                self.failed(
                    PublishStep::UploadContent,
                    cause,
                    Some(format!("version {}", version.version_name)),
                )
            })?;

        Ok(ContentUploaded { version })
    }

    /// Step 4: mark the version FINALIZED.
    pub async fn finalize(&self, token: &str, uploaded: ContentUploaded) -> Result<Finalized, PublishError> {
        let version = uploaded.version;
        tracing::info!(version = %version.version_name, "step 4/5: finalizing version");

        self.api
            .finalize_version(token, &version.version_name)
            .await
            .map_err(|cause| {
                self.failed(
                    PublishStep::FinalizeVersion,
                    cause,
                    Some(format!("version {}", version.version_name)),
                )
            })?;

        Ok(Finalized { version })
    }

    /// Step 5: release the finalized version, making it live.
    pub async fn release(
        &self,
        token: &str,
        project_id: &str,
        finalized: Finalized,
    ) -> Result<Released, PublishError> {
        let version = finalized.version;
        tracing::info!(version = %version.version_name, url = %version.site.url, "step 5/5: releasing version");

        self.api
            .release_version(token, project_id, &version.site.site_id, &version.version_name)
            .await
            .map_err(|cause| {
                self.failed(
                    PublishStep::ReleaseVersion,
                    cause,
                    Some(format!("finalized version {}", version.version_name)),
                )
            })?;

        Ok(Released {
            url: version.site.url,
            version_name: version.version_name,
        })
    }
}

#[async_trait]
impl Deployer for FirebaseTarget {
    async fn deploy(&self, html: &str) -> Result<DeploymentResult, PublishError> {
        let project_id = self.preflight()?;
        let token = self.access_token().await?;

        let site = self.ensure_site(&token, project_id).await?;
        let version = self.create_version(&token, project_id, site, html).await?;
        let uploaded = self.upload_content(&token, version, html).await?;
        let finalized = self.finalize(&token, uploaded).await?;
        let released = self.release(&token, project_id, finalized).await?;

        tracing::info!(site_id = %self.site_id, url = %released.url, "Firebase deploy live");
        Ok(DeploymentResult {
            provider: Provider::Firebase,
            url: released.url,
        })
    }
}
