//! Minimal GitHub releases client.

use std::{fs::File, path::Path};

use anyhow::Context;
use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    header::{self, HeaderMap, HeaderValue},
};
use serde::Deserialize;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const LATEST_TAG: &str = "latest";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub id: u64,
    pub tag_name: String,
    pub upload_url: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub id: u64,
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub url: String,
    /// e.g. `sha256:...`; only present on assets uploaded after GitHub began
    /// recording digests.
    #[serde(default)]
    pub digest: Option<String>,
}

#[derive(Debug)]
pub struct GitHub {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHub {
    pub fn new(api_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(GitHub {
            client,
            api_url: api_url.trim_end_matches('/').to_owned(),
            token,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Looks up a release by tag, or the latest release for [`LATEST_TAG`].
    pub fn release(&self, owner: &str, repo: &str, tag: &str) -> anyhow::Result<Release> {
        let url = if tag == LATEST_TAG {
            tracing::info!("Finding the latest release");
            format!("{}/repos/{owner}/{repo}/releases/latest", self.api_url)
        } else {
            tracing::info!(tag, "Finding the release with tag");
            format!("{}/repos/{owner}/{repo}/releases/tags/{tag}", self.api_url)
        };

        let response = self.send(self.client.get(&url))?;
        let release = response
            .json::<Release>()
            .context("Failed to parse release")?;
        tracing::debug!(
            id = release.id,
            tag = %release.tag_name,
            assets = release.assets.len(),
            "Found release",
        );

        Ok(release)
    }

    pub fn delete_asset(&self, owner: &str, repo: &str, asset: &Asset) -> anyhow::Result<()> {
        let url = format!(
            "{}/repos/{owner}/{repo}/releases/assets/{}",
            self.api_url, asset.id,
        );
        let response = self.send(self.client.delete(&url))?;
        tracing::info!("Deleted pre-existing asset with same name");
        tracing::debug!(
            id = asset.id,
            name = %asset.name,
            url = %asset.url,
            status = %response.status(),
            "Deleted asset",
        );

        Ok(())
    }

    /// Uploads `path` to the release under its file name.
    pub fn upload_asset(&self, release: &Release, path: &Path) -> anyhow::Result<Asset> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .context("Asset path has no utf8 file name")?;
        let file = File::open(path)
            .with_context(|| format!("Failed to open asset {}", path.display()))?;

        let request = self
            .client
            .post(upload_url(&release.upload_url))
            .query(&[("name", name)])
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(file);
        let response = self.send(request).context("Could not upload asset")?;
        let asset = response
            .json::<Asset>()
            .context("Failed to parse uploaded asset")?;
        tracing::debug!(
            id = asset.id,
            name = %asset.name,
            url = %asset.url,
            "Successfully uploaded asset",
        );

        Ok(asset)
    }

    /// Sends an authenticated request, failing on any non-2xx status.
    pub fn send(&self, request: RequestBuilder) -> anyhow::Result<Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send()?;
        anyhow::ensure!(
            response.status().is_success(),
            "GitHub request to {} failed. Response code was: {}",
            response.url(),
            response.status(),
        );
        Ok(response)
    }
}

/// Strips the RFC 6570 template suffix GitHub appends to `upload_url`.
fn upload_url(template: &str) -> &str {
    template
        .split_once('{')
        .map_or(template, |(url, _)| url)
}
