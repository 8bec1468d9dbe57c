// Netlify API client and two-step publish workflow

use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{Compensation, Provider, ProviderError, PublishError, PublishStep, check_status};
use crate::{DeploymentResult, Deployer};

/// Site record returned by `POST /sites`.
#[derive(Debug, Clone, Deserialize)]
pub struct NetlifySite {
    pub site_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
    #[serde(default)]
    pub ssl_url: Option<String>,
}

impl NetlifySite {
    pub fn default_url(&self) -> &str {
        self.ssl_url.as_deref().unwrap_or(&self.url)
    }
}

/// Deploy record returned by `POST /sites/{id}/deploys`.
#[derive(Debug, Clone, Deserialize)]
pub struct NetlifyDeploy {
    pub id: String,
    #[serde(default)]
    pub deploy_ssl_url: Option<String>,
}

/// The three Netlify calls a publish needs.
#[async_trait]
pub trait NetlifyApi: Send + Sync {
    async fn create_site(&self) -> Result<NetlifySite, ProviderError>;

    /// Deploy `html` as the site's only file, `index.html`.
    async fn deploy_site(&self, site_id: &str, html: &str) -> Result<NetlifyDeploy, ProviderError>;

    async fn delete_site(&self, site_id: &str) -> Result<(), ProviderError>;
}

/// Netlify REST API client
pub struct NetlifyClient {
    client: reqwest::Client,
    api_base: String,
    account_slug: Option<String>,
}

impl NetlifyClient {
    pub fn new(
        access_token: &str,
        account_slug: Option<String>,
        api_base: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", access_token))
            .map_err(|e| ProviderError::Auth(format!("invalid access token: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            account_slug,
        })
    }
}

#[async_trait]
impl NetlifyApi for NetlifyClient {
    async fn create_site(&self) -> Result<NetlifySite, ProviderError> {
        #[derive(Serialize)]
        struct CreateSiteRequest<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            account_slug: Option<&'a str>,
        }

        let url = format!("{}/sites", self.api_base);
        let request = CreateSiteRequest {
            account_slug: self.account_slug.as_deref(),
        };

        let response = self.client.post(&url).json(&request).send().await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn deploy_site(&self, site_id: &str, html: &str) -> Result<NetlifyDeploy, ProviderError> {
        let url = format!("{}/sites/{}/deploys", self.api_base, site_id);
        let archive = single_page_archive(html)?;

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/zip")
            .body(archive)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn delete_site(&self, site_id: &str) -> Result<(), ProviderError> {
        let url = format!("{}/sites/{}", self.api_base, site_id);
        let response = self.client.delete(&url).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Zip archive holding `html` as `index.html`, built in memory.
pub fn single_page_archive(html: &str) -> Result<Vec<u8>, ProviderError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("index.html", options).map_err(archive_error)?;
    zip.write_all(html.as_bytes()).map_err(archive_error)?;
    let cursor = zip.finish().map_err(archive_error)?;

    Ok(cursor.into_inner())
}

fn archive_error(e: impl std::fmt::Display) -> ProviderError {
    ProviderError::Archive(e.to_string())
}

/// Publishes to a brand-new Netlify site on every call.
pub struct NetlifyTarget {
    api: Arc<dyn NetlifyApi>,
}

impl NetlifyTarget {
    pub fn new(api: Arc<dyn NetlifyApi>) -> Self {
        Self { api }
    }

    /// Delete a site left behind by a failed deploy. Never fails: the
    /// caller reports the deploy error either way.
    async fn discard_site(&self, site_id: &str) {
        tracing::info!(site_id, "deleting Netlify site after failed deploy");
        match self.api.delete_site(site_id).await {
            Ok(()) => tracing::info!(site_id, "Netlify site deleted"),
            Err(e) => tracing::warn!(site_id, error = %e, "failed to delete Netlify site"),
        }
    }
}

#[async_trait]
impl Deployer for NetlifyTarget {
    async fn deploy(&self, html: &str) -> Result<DeploymentResult, PublishError> {
        tracing::info!(provider = "netlify", "step 1/2: creating site");
        let site = self
            .api
            .create_site()
            .await
            .map_err(|cause| PublishError::Failed {
                provider: Provider::Netlify,
                step: PublishStep::CreateSite,
                cause,
            })?;
        tracing::info!(site_id = %site.site_id, url = %site.default_url(), "site created");

        tracing::info!(site_id = %site.site_id, "step 2/2: deploying index.html");
        let deploy = match self.api.deploy_site(&site.site_id, html).await {
            Ok(deploy) => deploy,
            Err(cause) => {
                tracing::error!(site_id = %site.site_id, error = %cause, "Netlify deploy failed");
                self.discard_site(&site.site_id).await;
                return Err(PublishError::Partial {
                    provider: Provider::Netlify,
                    step: PublishStep::Deploy,
                    resource: format!("site {}", site.site_id),
                    compensation: Compensation::DeleteAttempted,
                    cause,
                });
            }
        };

        // The deploy URL resolves immediately; the site alias may lag behind.
        let url = deploy
            .deploy_ssl_url
            .clone()
            .unwrap_or_else(|| site.default_url().to_string());
        tracing::info!(site_id = %site.site_id, deploy_id = %deploy.id, %url, "Netlify deploy live");

        Ok(DeploymentResult {
            provider: Provider::Netlify,
            url,
        })
    }
}
