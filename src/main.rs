use std::{io, path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use amalgam::{
    fat::{self, FatError, TracingReporter},
    fetch::FetchOptions,
    github::{DEFAULT_API_URL, LATEST_TAG},
    universal::{self, Configuration, MissingToken},
};

/// Create macOS universal binaries from GitHub releases.
#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine the macOS assets of a release and upload the result to it.
    Release(ReleaseArgs),
    /// Combine two local thin Mach-O binaries.
    Combine {
        /// The x86_64 binary.
        #[arg(long)]
        amd64: PathBuf,
        /// The arm64 binary.
        #[arg(long)]
        arm64: PathBuf,
        /// Where to write the universal binary.
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct ReleaseArgs {
    /// GitHub repo owner username.
    #[arg(long)]
    owner: String,
    /// GitHub repository name.
    #[arg(long)]
    repo: String,
    /// Release tag.
    #[arg(long, default_value = LATEST_TAG)]
    tag: String,
    /// Substring identifying the amd64 asset.
    #[arg(long)]
    amd64: String,
    /// Substring identifying the arm64 asset.
    #[arg(long)]
    arm64: String,
    /// The release assets are compressed archives.
    #[arg(long)]
    compressed: bool,
    /// Path of the executable inside each archive.
    #[arg(long, requires = "compressed")]
    binary: Option<PathBuf>,
    /// Replace an existing universal asset.
    #[arg(long)]
    overwrite: bool,
    /// Replaces the architecture in the amd64 asset name.
    #[arg(long, default_value = "all")]
    identifier: String,
    /// GitHub API base URL.
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,
    /// Keep the universal asset in this directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Build the universal asset without uploading it.
    #[arg(long)]
    dry_run: bool,
    /// GitHub token; required unless --dry-run is given.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

impl From<ReleaseArgs> for Configuration {
    fn from(args: ReleaseArgs) -> Self {
        Configuration {
            owner: args.owner,
            repository: args.repo,
            tag: args.tag,
            amd64_substring: args.amd64,
            arm64_substring: args.arm64,
            fetch: FetchOptions {
                compressed: args.compressed,
                binary: args.binary,
            },
            overwrite: args.overwrite,
            universal_identifier: args.identifier,
            api_url: args.api_url,
            token: args.token,
            output_dir: args.output_dir,
            dry_run: args.dry_run,
        }
    }
}

fn main() -> ExitCode {
    setup_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => {
            tracing::info!("Complete.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("Exiting. Encountered error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Release(args) => {
            if let Some(path) = universal::create_universal_binary(&args.into())? {
                tracing::info!(path = %path.display(), "Universal asset kept");
            }
        }
        Commands::Combine {
            amd64,
            arm64,
            output,
        } => {
            fat::make_universal(&amd64, &arm64, &output, &TracingReporter)?;
        }
    }

    Ok(())
}

/// Verbosity comes from `LOG_LEVEL`, e.g. `debug` or `amalgam=trace`.
fn setup_logging() {
    let filter = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stdout)
        .init();
}

fn exit_code(err: &anyhow::Error) -> u8 {
    if err.is::<MissingToken>() {
        return 2;
    }
    err.chain()
        .find_map(|cause| cause.downcast_ref::<FatError>())
        .map_or(1, FatError::exit_code)
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn test_exit_code_through_context() {
        let err = Err::<(), _>(FatError::UnsupportedSize {
            offset: 1 << 32,
            size: 16,
        })
        .context("Failed to combine assets")
        .unwrap_err();
        assert_eq!(exit_code(&err), 5);

        let err = anyhow::Error::from(FatError::TooSmallInput {
            path: PathBuf::from("short"),
            len: 4,
        });
        assert_eq!(exit_code(&err), 3);
    }

    #[test]
    fn test_exit_code_for_other_failures() {
        assert_eq!(exit_code(&MissingToken.into()), 2);
        assert_eq!(exit_code(&anyhow::anyhow!("GitHub request failed")), 1);
    }
}
