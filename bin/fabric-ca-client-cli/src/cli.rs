//! Command-line arguments

use anyhow::anyhow;
use clap::Parser;
use fabric_ca_client::Config;
use std::{path::PathBuf, time::Duration};

use crate::command::Command;

#[derive(Debug, Parser)]
pub struct Cli {
    /// Location of client config file.
    /// If this arg is not provided, the `url` arg must be provided.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// CA server URL, e.g. `https://localhost:7054`.
    #[clap(long, conflicts_with = "config")]
    pub url: Option<String>,
    /// Name of the CA on a server hosting several.
    #[clap(long, conflicts_with = "config")]
    pub ca_name: Option<String>,
    /// PEM file with the TLS certificate chain of the server.
    #[clap(long = "tls-pem", conflicts_with = "config")]
    pub tls_pem_files: Vec<PathBuf>,
    /// Request timeout in seconds.
    #[clap(long, conflicts_with = "config")]
    pub timeout: Option<u64>,

    /// Membership service provider recorded on loaded identities.
    #[clap(long, default_value = "")]
    pub msp_id: String,
    /// Directory where enrollment keys and certificates are kept.
    #[clap(long, default_value = "dev/ca_client_cli_data")]
    pub enrollment_dir: PathBuf,

    #[clap(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn client_config(&self) -> anyhow::Result<Config> {
        if let Some(config) = &self.config {
            return Ok(Config::from_file(config)?);
        }

        let url = self.url.as_ref().ok_or(anyhow!(
            "If `config` argument is not provided, `url` must be provided"
        ))?;

        let mut config = Config::new(url, self.ca_name.clone())?;
        config.tls.pem_files = self.tls_pem_files.clone();
        config.request_timeout = self.timeout.map(Duration::from_secs);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_and_ca_name_build_a_config() {
        let cli = Cli::parse_from([
            "fabric-ca-client-cli",
            "--url",
            "http://localhost:7054",
            "--ca-name",
            "ca-org1",
            "--timeout",
            "5",
            "cainfo",
        ]);
        assert!(matches!(cli.command, Command::Cainfo));

        let config = cli.client_config().unwrap();
        assert_eq!(config.base_url(), "http://localhost:7054");
        assert_eq!(config.ca_name.as_deref(), Some("ca-org1"));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
        assert!(!config.is_tls());
    }

    #[test]
    fn url_is_required_without_config() {
        let cli = Cli::parse_from(["fabric-ca-client-cli", "cainfo"]);
        assert!(cli.client_config().is_err());
    }

    #[test]
    fn config_conflicts_with_url() {
        let result = Cli::try_parse_from([
            "fabric-ca-client-cli",
            "--config",
            "ca.toml",
            "--url",
            "http://localhost:7054",
            "cainfo",
        ]);
        assert!(result.is_err());
    }
}
