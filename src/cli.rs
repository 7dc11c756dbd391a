//! CLI argument parsing module for shipmod

use crate::channel::DEFAULT_API_URL;
use crate::config::Config;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Package PowerShell modules and release them from pull requests
#[derive(Parser, Debug, Clone)]
#[command(
    name = "shipmod",
    version,
    about = "Package PowerShell modules and release them from pull requests"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (default: <path>/shipmod.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log external changes instead of making them
    #[arg(long = "what-if", global = true)]
    pub what_if: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build the module into the output directory
    Build(BuildArgs),
    /// Compute the next release version without changing anything
    Resolve(ReleaseArgs),
    /// Resolve, publish to the registry and create the release
    Publish(PublishArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Project directory (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Do not install required modules
    #[arg(long)]
    pub no_install: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReleaseArgs {
    /// Project directory (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Pull-request event payload
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    pub event: PathBuf,

    /// Repository holding the releases (`owner/name`)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// Token for the GitHub API
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API root
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Override the release tag prefix
    #[arg(long)]
    pub version_prefix: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PublishArgs {
    #[command(flatten)]
    pub release: ReleaseArgs,

    /// Registry API key
    #[arg(long, env = "PSGALLERY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl CliArgs {
    /// Project directory of the selected command
    pub fn path(&self) -> &PathBuf {
        match &self.command {
            Command::Build(args) => &args.path,
            Command::Resolve(args) => &args.path,
            Command::Publish(args) => &args.release.path,
        }
    }

    /// Load the configuration and apply command-line overrides
    pub fn load_config(&self) -> Result<Config, crate::error::ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load(self.path())?,
        };
        if self.what_if {
            config.release.what_if = true;
        }
        match &self.command {
            Command::Build(args) if args.no_install => config.module.install_dependencies = false,
            Command::Resolve(args) => apply_release_overrides(&mut config, args),
            Command::Publish(args) => apply_release_overrides(&mut config, &args.release),
            Command::Build(_) => {}
        }
        Ok(config)
    }
}

fn apply_release_overrides(config: &mut Config, args: &ReleaseArgs) {
    if let Some(prefix) = &args.version_prefix {
        config.release.version_prefix = prefix.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_build_defaults() {
        let args = CliArgs::parse_from(["shipmod", "build"]);
        match &args.command {
            Command::Build(build) => {
                assert_eq!(build.path, PathBuf::from("."));
                assert!(!build.no_install);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(!args.verbose);
        assert!(!args.quiet);
        assert!(!args.json);
        assert!(!args.what_if);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::parse_from(["shipmod", "build", "/work", "-q", "--json", "--what-if"]);
        assert!(args.quiet);
        assert!(args.json);
        assert!(args.what_if);
        assert_eq!(args.path(), &PathBuf::from("/work"));
    }

    #[test]
    fn test_resolve_args() {
        let args = CliArgs::parse_from([
            "shipmod",
            "resolve",
            "proj",
            "--event",
            "/tmp/event.json",
            "--repository",
            "octo/sample",
            "--api-url",
            "http://127.0.0.1:9",
        ]);
        match &args.command {
            Command::Resolve(release) => {
                assert_eq!(release.event, PathBuf::from("/tmp/event.json"));
                assert_eq!(release.repository.as_deref(), Some("octo/sample"));
                assert_eq!(release.api_url, "http://127.0.0.1:9");
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(args.path(), &PathBuf::from("proj"));
    }

    #[test]
    fn test_publish_args() {
        let args = CliArgs::parse_from([
            "shipmod",
            "publish",
            "--event",
            "e.json",
            "--api-key",
            "secret",
            "--version-prefix",
            "release-",
        ]);
        match &args.command {
            Command::Publish(publish) => {
                assert_eq!(publish.api_key.as_deref(), Some("secret"));
                assert_eq!(publish.release.version_prefix.as_deref(), Some("release-"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("shipmod.toml"),
            "[release]\nversion_prefix = \"x\"\n",
        )
        .unwrap();
        let path = dir.path().to_str().unwrap();

        let args = CliArgs::parse_from([
            "shipmod",
            "resolve",
            path,
            "--event",
            "e.json",
            "--version-prefix",
            "v",
            "--what-if",
        ]);
        let config = args.load_config().unwrap();
        assert_eq!(config.release.version_prefix, "v");
        assert!(config.release.what_if);

        let args = CliArgs::parse_from(["shipmod", "build", path, "--no-install"]);
        let config = args.load_config().unwrap();
        assert_eq!(config.release.version_prefix, "x");
        assert!(!config.module.install_dependencies);
    }

    #[test]
    fn test_explicit_config_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("custom.toml");
        fs::write(&file, "[retry]\nattempts = 2\n").unwrap();

        let args = CliArgs::parse_from([
            "shipmod",
            "build",
            "--config",
            file.to_str().unwrap(),
        ]);
        assert_eq!(args.load_config().unwrap().retry.attempts, 2);
    }
}
