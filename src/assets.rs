use crate::github::Asset;

const AMD64_IDENTIFIER: &str = "amd64";
const X64_IDENTIFIER: &str = "x64";
const X86_64_IDENTIFIER: &str = "x86_64";

/// Picks the amd64 and arm64 assets by substring. When several assets match,
/// the last one listed wins.
pub fn select<'a>(
    assets: &'a [Asset],
    amd64: &str,
    arm64: &str,
) -> anyhow::Result<(&'a Asset, &'a Asset)> {
    tracing::debug!("Filtering artifacts");

    let amd64_asset = last_match(assets, amd64);
    let arm64_asset = last_match(assets, arm64);
    match (amd64_asset, arm64_asset) {
        (Some(amd64_asset), Some(arm64_asset)) => Ok((amd64_asset, arm64_asset)),
        (amd64_asset, _) => anyhow::bail!(
            "Could not find needed artifacts from GitHub release: no asset matches {:?}",
            if amd64_asset.is_none() { amd64 } else { arm64 },
        ),
    }
}

fn last_match<'a>(assets: &'a [Asset], substring: &str) -> Option<&'a Asset> {
    let mut found: Option<&Asset> = None;
    for asset in assets.iter().filter(|a| a.name.contains(substring)) {
        if let Some(previous) = found {
            tracing::debug!(
                skipped = %previous.name,
                chosen = %asset.name,
                substring,
                "Several assets match",
            );
        }
        found = Some(asset);
    }
    found
}

/// Derives the universal asset name from the amd64 one by swapping its
/// architecture token for `identifier`. `x86_64` is assumed when neither
/// `amd64` nor `x64` appears.
pub fn universal_name(amd64_name: &str, identifier: &str) -> String {
    let architecture = if amd64_name.contains(AMD64_IDENTIFIER) {
        AMD64_IDENTIFIER
    } else if amd64_name.contains(X64_IDENTIFIER) {
        X64_IDENTIFIER
    } else {
        X86_64_IDENTIFIER
    };

    amd64_name.replace(architecture, identifier)
}
