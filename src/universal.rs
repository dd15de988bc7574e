//! Release pipeline: find the release, fetch both architectures, combine
//! them, and publish the universal binary back to the release.

use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::Context;
use thiserror::Error;

use crate::{
    assets,
    fat::{self, TracingReporter},
    fetch::{self, FetchOptions},
    github::{GitHub, Release},
    package,
};

#[derive(Debug, Error)]
#[error("GITHUB_TOKEN environment variable is empty")]
pub struct MissingToken;

#[derive(Debug, Clone)]
pub struct Configuration {
    pub owner: String,
    pub repository: String,
    pub tag: String,
    pub amd64_substring: String,
    pub arm64_substring: String,
    pub fetch: FetchOptions,
    pub overwrite: bool,
    pub universal_identifier: String,
    pub api_url: String,
    pub token: Option<String>,
    /// Where to keep the universal asset; a temporary directory otherwise.
    pub output_dir: Option<PathBuf>,
    pub dry_run: bool,
}

/// Runs the whole pipeline and returns where the universal asset was left,
/// if it outlives the run.
pub fn create_universal_binary(cfg: &Configuration) -> anyhow::Result<Option<PathBuf>> {
    let token = cfg.token.clone().filter(|token| !token.is_empty());
    if token.is_none() && !cfg.dry_run {
        return Err(MissingToken.into());
    }

    tracing::info!("Starting process...");
    tracing::debug!(
        owner = %cfg.owner,
        repository = %cfg.repository,
        tag = %cfg.tag,
        amd64 = %cfg.amd64_substring,
        arm64 = %cfg.arm64_substring,
        compressed = cfg.fetch.compressed,
        binary = ?cfg.fetch.binary,
        "Configuration",
    );

    let github = GitHub::new(&cfg.api_url, token)?;
    let release = github.release(&cfg.owner, &cfg.repository, &cfg.tag)?;

    tracing::info!("Finding relevant GitHub release assets");
    let (amd64_asset, arm64_asset) =
        assets::select(&release.assets, &cfg.amd64_substring, &cfg.arm64_substring)?;
    let universal_name = assets::universal_name(&amd64_asset.name, &cfg.universal_identifier);
    // Publishing with --overwrite would otherwise delete the amd64 source.
    anyhow::ensure!(
        universal_name != amd64_asset.name && universal_name != arm64_asset.name,
        "Universal asset name {universal_name:?} is the same as a source asset",
    );

    let work_dir = tempfile::Builder::new().prefix("amalgam").tempdir()?;
    let (amd64_path, arm64_path) = rayon::join(
        || fetch::fetch(&github, amd64_asset, work_dir.path(), &cfg.fetch),
        || fetch::fetch(&github, arm64_asset, work_dir.path(), &cfg.fetch),
    );
    let amd64_path = amd64_path?;
    let arm64_path = arm64_path?;
    tracing::info!("Successfully downloaded release assets");
    tracing::debug!(path = %amd64_path.display(), "amd64 binary");
    tracing::debug!(path = %arm64_path.display(), "arm64 binary");

    let entry_name = amd64_path
        .file_name()
        .and_then(|name| name.to_str())
        .context("amd64 binary has no utf8 file name")?
        .to_owned();
    let fat_path = work_dir.path().join("fat").join(&entry_name);
    std::fs::create_dir_all(work_dir.path().join("fat"))?;
    fat::make_universal(&amd64_path, &arm64_path, &fat_path, &TracingReporter)?;
    tracing::info!("Combined assets into universal binary");

    let out_dir = match &cfg.output_dir {
        Some(dir) => dir.clone(),
        // A dry run is pointless if the result is thrown away
        None if cfg.dry_run => env::current_dir()?,
        None => work_dir.path().to_owned(),
    };
    let asset_path = package::package(
        &fat_path,
        &entry_name,
        &universal_name,
        cfg.fetch.compressed,
        &out_dir,
    )?;
    tracing::debug!(path = %asset_path.display(), "Universal asset");

    if cfg.dry_run {
        tracing::info!(path = %asset_path.display(), "Dry run, not uploading");
        return Ok(Some(asset_path));
    }

    publish(&github, cfg, &release, &asset_path)?;
    tracing::info!("Uploaded universal binary to GitHub");

    Ok(cfg.output_dir.is_some().then_some(asset_path))
}

fn publish(
    github: &GitHub,
    cfg: &Configuration,
    release: &Release,
    asset_path: &Path,
) -> anyhow::Result<()> {
    let name = asset_path
        .file_name()
        .and_then(|name| name.to_str())
        .context("Universal asset has no utf8 file name")?;

    if let Some(existing) = release.assets.iter().find(|asset| asset.name == name) {
        anyhow::ensure!(
            cfg.overwrite,
            "Found existing asset with same name: {name:?}",
        );
        github.delete_asset(&cfg.owner, &cfg.repository, existing)?;
    }

    let asset = github.upload_asset(release, asset_path)?;
    tracing::info!(id = asset.id, url = %asset.browser_download_url, "Published asset");

    Ok(())
}
