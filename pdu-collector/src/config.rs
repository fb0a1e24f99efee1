use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context};
use pdu_client::device::status_client::status_url;

pub const USAGE: &str = "usage: pdu-collector <output_csv_path> <pdu_base_url> <frequency_seconds>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// CSV file to create; truncated if it exists.
    pub output_path: PathBuf,
    /// Device root, e.g. `http://pdu.local`, without trailing slash.
    pub base_url: String,
    /// Pause between the end of one tick and the start of the next.
    pub frequency: Duration,
}

impl AppConfig {
    /// Build the configuration from the positional arguments (program name excluded).
    pub fn from_args<I, S>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let [output_path, base_url, frequency] = args.as_slice() else {
            bail!("expected 3 arguments, got {}\n{USAGE}", args.len());
        };

        if output_path.trim().is_empty() {
            bail!("output path must not be empty\n{USAGE}");
        }

        let base_url = base_url.trim_end_matches('/').to_string();
        status_url(&base_url).with_context(|| format!("invalid pdu_base_url\n{USAGE}"))?;

        let frequency: u64 = frequency
            .trim()
            .parse()
            .with_context(|| format!("invalid frequency_seconds '{frequency}'\n{USAGE}"))?;

        Ok(Self {
            output_path: PathBuf::from(output_path),
            base_url,
            frequency: Duration::from_secs(frequency),
        })
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::from_args(std::env::args().skip(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_positional_arguments() {
        let cfg = AppConfig::from_args(["power.csv", "http://pdu.local/", "5"]).unwrap();
        assert_eq!(
            cfg,
            AppConfig {
                output_path: PathBuf::from("power.csv"),
                base_url: "http://pdu.local".to_string(),
                frequency: Duration::from_secs(5),
            }
        );
    }

    #[test]
    fn zero_frequency_is_allowed() {
        let cfg = AppConfig::from_args(["out.csv", "http://10.0.0.2", "0"]).unwrap();
        assert_eq!(cfg.frequency, Duration::ZERO);
    }

    #[test]
    fn wrong_argument_count_is_rejected() {
        let err = AppConfig::from_args(["out.csv", "http://pdu.local"]).unwrap_err();
        assert!(err.to_string().contains("expected 3 arguments"));
        assert!(AppConfig::from_args(["a", "http://b", "1", "extra"]).is_err());
    }

    #[test]
    fn bad_frequency_is_rejected() {
        assert!(AppConfig::from_args(["out.csv", "http://pdu.local", "-1"]).is_err());
        assert!(AppConfig::from_args(["out.csv", "http://pdu.local", "1.5"]).is_err());
    }

    #[test]
    fn bad_base_url_is_rejected() {
        assert!(AppConfig::from_args(["out.csv", "pdu.local", "5"]).is_err());
        assert!(AppConfig::from_args(["out.csv", "https://pdu.local", "5"]).is_err());
        assert!(AppConfig::from_args(["", "http://pdu.local", "5"]).is_err());
    }
}
