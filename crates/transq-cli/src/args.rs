use crate::error::CliError;
use clap::Parser;
use core::time::Duration;
use std::path::PathBuf;
use transq::Language;
use transq_tonic_core::types::DEFAULT_DAEMON_URL;

#[derive(Parser, Debug)]
#[command(name = "transq", version, about = "Translate a file through the transq daemon")]
pub struct CliArgs {
    /// Text file to translate, one line per translation.
    #[arg(short = 'f', long)]
    pub file: PathBuf,

    /// Target language code (en, it or de).
    #[arg(short = 'l', long)]
    pub language: String,

    /// Daemon endpoint.
    #[arg(long, env = "TRANSQ_DAEMON_ADDR", default_value = DEFAULT_DAEMON_URL)]
    pub daemon_addr: String,

    /// Seconds to wait for the connection to the daemon.
    #[arg(long, env = "TRANSQ_CONNECT_TIMEOUT", default_value_t = 3)]
    pub connect_timeout: u64,

    /// Seconds to wait for every submitted line to come back.
    #[arg(long, env = "TRANSQ_WAIT_TIMEOUT", default_value_t = 120)]
    pub wait_timeout: u64,

    /// Milliseconds between result-count polls.
    #[arg(long, env = "TRANSQ_POLL_INTERVAL", default_value_t = 100)]
    pub poll_interval: u64,
}

/// Validated client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub file: PathBuf,
    pub language: Language,
    pub daemon_addr: String,
    pub connect_timeout: Duration,
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
}

impl TryFrom<CliArgs> for ClientConfig {
    type Error = CliError;

    /// Checks the language and that the input file exists. Nothing here
    /// touches the network.
    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let language =
            args.language
                .parse::<Language>()
                .map_err(|_| CliError::UnsupportedLanguage {
                    code: args.language.clone(),
                    supported: Language::supported_codes().join(", "),
                })?;

        if !args.file.is_file() {
            return Err(CliError::FileNotFound { path: args.file });
        }

        Ok(Self {
            file: args.file,
            language,
            daemon_addr: args.daemon_addr,
            connect_timeout: Duration::from_secs(args.connect_timeout),
            wait_timeout: Duration::from_secs(args.wait_timeout),
            poll_interval: Duration::from_millis(args.poll_interval.max(1)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> CliArgs {
        let argv = ["transq"].iter().chain(extra).copied();
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&["-f", "in.txt", "-l", "it"]);
        assert_eq!(args.file, PathBuf::from("in.txt"));
        assert_eq!(args.daemon_addr, DEFAULT_DAEMON_URL);
        assert_eq!(args.connect_timeout, 3);
        assert_eq!(args.wait_timeout, 120);
        assert_eq!(args.poll_interval, 100);
    }

    #[test]
    fn file_and_language_are_required() {
        assert!(CliArgs::try_parse_from(["transq", "-l", "en"]).is_err());
        assert!(CliArgs::try_parse_from(["transq", "-f", "in.txt"]).is_err());
    }

    #[test]
    fn unsupported_language_is_rejected_first() {
        let err = ClientConfig::try_from(parse(&["-f", "/definitely/missing.txt", "-l", "fr"]))
            .unwrap_err();
        match err {
            CliError::UnsupportedLanguage { code, supported } => {
                assert_eq!(code, "fr");
                assert_eq!(supported, "en, it, de");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_rejected() {
        let err = ClientConfig::try_from(parse(&["-f", "/definitely/missing.txt", "-l", "de"]))
            .unwrap_err();
        assert!(matches!(err, CliError::FileNotFound { .. }));
    }

    #[test]
    fn directory_is_not_an_input_file() {
        let dir = std::env::temp_dir();
        let err = ClientConfig::try_from(parse(&["-f", dir.to_str().unwrap(), "-l", "en"]))
            .unwrap_err();
        assert!(matches!(err, CliError::FileNotFound { .. }));
    }
}
