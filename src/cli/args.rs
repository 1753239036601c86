//! Command-line argument parsing

use crate::config::{DesiredFile, PublishConfig, TransportKind};
use crate::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "release-asset-pusher")]
#[command(about = "Publish locally built installer packages as assets of a tagged release")]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(long = "config", short = 'c', help = "Path to the JSON publish configuration")]
    pub config: Option<PathBuf>,

    #[arg(long = "owner", help = "Repository owner (overrides the config file)")]
    pub owner: Option<String>,

    #[arg(long = "repository", short = 'r', help = "Repository name (overrides the config file)")]
    pub repository: Option<String>,

    #[arg(long = "tag", short = 't', help = "Release tag to publish to")]
    pub tag: Option<String>,

    /// Extra assets as NAME=PATH, or a bare PATH named after its file
    #[arg(long = "asset", short = 'a', value_name = "NAME=PATH")]
    pub assets: Vec<String>,

    #[arg(long = "release-dir", help = "Directory relative asset paths resolve against")]
    pub release_dir: Option<PathBuf>,

    #[arg(long = "transport", value_enum, help = "How requests reach the release service")]
    pub transport: Option<TransportKind>,

    #[arg(long = "api-url", help = "Release service API base URL")]
    pub api_url: Option<String>,

    #[arg(long = "gh-program", help = "Path to the gh executable for --transport gh")]
    pub gh_program: Option<PathBuf>,

    /// Timeout in seconds for each request
    #[arg(long = "timeout", help = "Per-request timeout in seconds (idle limit while an upload streams)")]
    pub timeout: Option<u64>,

    #[arg(long = "upload-timeout", help = "Total seconds allowed for one upload (default: no limit while data flows)")]
    pub upload_timeout: Option<u64>,

    #[arg(long = "concurrency", short = 'j', help = "Number of files uploaded at once")]
    pub concurrency: Option<usize>,

    /// Dry run mode (validate without deleting or uploading)
    #[arg(long = "dry-run", short = 'n')]
    pub dry_run: bool,

    #[arg(long = "output", short = 'o', value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    #[arg(long = "verbose", short = 'v', conflicts_with = "quiet")]
    pub verbose: bool,

    #[arg(long = "quiet", short = 'q')]
    pub quiet: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Build the effective configuration: file, then environment, then flags
    pub fn to_config(&self) -> Result<PublishConfig> {
        let config = match &self.config {
            Some(path) => PublishConfig::from_file(path)?,
            None => PublishConfig::default(),
        };
        let config = config.apply_env()?;
        self.apply_overrides(config)
    }

    pub fn apply_overrides(&self, mut config: PublishConfig) -> Result<PublishConfig> {
        if let Some(owner) = &self.owner {
            config.owner = owner.clone();
        }
        if let Some(repository) = &self.repository {
            config.repository = repository.clone();
        }
        if let Some(tag) = &self.tag {
            config.tag = tag.clone();
        }
        if let Some(dir) = &self.release_dir {
            config.release_dir = Some(dir.clone());
        }
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.clone();
        }
        if let Some(program) = &self.gh_program {
            config.gh_program = program.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(upload_timeout) = self.upload_timeout {
            config.upload_timeout_secs = Some(upload_timeout);
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        for spec in &self.assets {
            config.assets.push(DesiredFile::parse_pair(spec)?);
        }
        Ok(config)
    }
}
