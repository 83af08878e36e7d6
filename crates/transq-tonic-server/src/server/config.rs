use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use core::{fmt, num::NonZeroU32, time::Duration};
use std::net::SocketAddr;
use transq_tonic_core::types::DEFAULT_SERVER_ADDR;

/// Default Google Cloud Translation API (v2) endpoint.
pub const DEFAULT_GOOGLE_ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";

/// Runtime configuration for the `transq-daemon` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first when present). The throttle ceiling and the
/// idle timeout have no defaults: a daemon started without them refuses to
/// serve.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "transq-daemon",
    version,
    about = "A gRPC daemon that queues and throttles batch translation jobs"
)]
pub struct CliArgs {
    /// Maximum number of translation calls issued per one-second window.
    ///
    /// Environment variable: `QUERIES_PER_SEC`
    #[arg(long, env = "QUERIES_PER_SEC")]
    pub queries_per_sec: u32,

    /// Minutes without a submitted job after which the daemon shuts itself
    /// down.
    ///
    /// Environment variable: `DAEMON_TIMEOUT_MINUTES`
    #[arg(long, env = "DAEMON_TIMEOUT_MINUTES")]
    pub daemon_timeout_minutes: u64,

    /// Number of worker tasks issuing translation calls concurrently.
    ///
    /// This bounds how many lines of a batch are in flight at once; the rate
    /// limiter still caps how many calls start per second.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = 8)]
    pub num_workers: usize,

    /// Address the gRPC server binds to.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from(DEFAULT_SERVER_ADDR))]
    pub server_addr: String,

    /// Seconds to wait for the in-flight batch, and then for each worker's
    /// acknowledgement, during shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,

    /// Translation backend.
    ///
    /// Environment variable: `TRANSLATE_BACKEND`
    #[arg(long, env = "TRANSLATE_BACKEND", value_enum, default_value_t = BackendKind::Google)]
    pub backend: BackendKind,

    /// API key for the Google Cloud Translation API. Required by the `google`
    /// backend.
    ///
    /// Environment variable: `GOOGLE_TRANSLATE_API_KEY`
    #[arg(long, env = "GOOGLE_TRANSLATE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    /// Google Cloud Translation API (v2) endpoint.
    ///
    /// Environment variable: `GOOGLE_TRANSLATE_ENDPOINT`
    #[arg(long, env = "GOOGLE_TRANSLATE_ENDPOINT", default_value_t = String::from(DEFAULT_GOOGLE_ENDPOINT))]
    pub google_endpoint: String,

    /// Per-call timeout for translation requests, in seconds.
    ///
    /// Environment variable: `TRANSLATE_REQUEST_TIMEOUT`
    #[arg(long, env = "TRANSLATE_REQUEST_TIMEOUT", default_value_t = 10)]
    pub request_timeout: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Google Cloud Translation API v2.
    Google,
    /// Returns every line unchanged.
    Echo,
}

#[derive(Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Google {
        api_key: String,
        endpoint: String,
        request_timeout: Duration,
    },
    Echo,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Google {
                endpoint,
                request_timeout,
                ..
            } => f
                .debug_struct("Google")
                .field("api_key", &"<redacted>")
                .field("endpoint", endpoint)
                .field("request_timeout", request_timeout)
                .finish(),
            Self::Echo => f.write_str("Echo"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub queries_per_sec: NonZeroU32,
    pub idle_timeout: Duration,
    pub num_workers: usize,
    pub server_addr: SocketAddr,
    pub shutdown_timeout: Duration,
    pub backend: BackendConfig,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let Some(queries_per_sec) = NonZeroU32::new(args.queries_per_sec) else {
            bail!("QUERIES_PER_SEC must be greater than 0");
        };

        if args.daemon_timeout_minutes == 0 {
            bail!("DAEMON_TIMEOUT_MINUTES must be greater than 0");
        }

        let idle_timeout = args
            .daemon_timeout_minutes
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| anyhow::anyhow!("Overflow in DAEMON_TIMEOUT_MINUTES"))?;

        if args.num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        let server_addr = args
            .server_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("SERVER_ADDR {:?} is not a socket address", args.server_addr))?;

        let backend = match args.backend {
            BackendKind::Echo => BackendConfig::Echo,
            BackendKind::Google => {
                let api_key = args
                    .google_api_key
                    .filter(|key| !key.trim().is_empty())
                    .context("GOOGLE_TRANSLATE_API_KEY is required by the google backend")?;
                if args.request_timeout == 0 {
                    bail!("TRANSLATE_REQUEST_TIMEOUT must be greater than 0");
                }
                BackendConfig::Google {
                    api_key,
                    endpoint: args.google_endpoint,
                    request_timeout: Duration::from_secs(args.request_timeout),
                }
            }
        };

        Ok(Self {
            queries_per_sec,
            idle_timeout,
            num_workers: args.num_workers,
            server_addr,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            backend,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> anyhow::Result<ServerConfig> {
        let args = CliArgs::try_parse_from(
            ["transq-daemon", "--queries-per-sec", "2", "--daemon-timeout-minutes", "5"]
                .iter()
                .chain(extra),
        )?;
        ServerConfig::try_from(args)
    }

    #[test]
    fn builds_config_with_defaults() {
        let config = parse(&["--backend", "echo"]).unwrap();
        assert_eq!(config.queries_per_sec.get(), 2);
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.num_workers, 8);
        assert_eq!(config.server_addr, DEFAULT_SERVER_ADDR.parse().unwrap());
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
        assert_eq!(config.backend, BackendConfig::Echo);
    }

    #[test]
    fn rejects_zero_values() {
        let args = CliArgs::try_parse_from([
            "transq-daemon",
            "--queries-per-sec",
            "0",
            "--daemon-timeout-minutes",
            "5",
            "--backend",
            "echo",
        ])
        .unwrap();
        assert!(ServerConfig::try_from(args).is_err());

        assert!(parse(&["--backend", "echo", "--num-workers", "0"]).is_err());
    }

    #[test]
    fn rejects_bad_server_addr() {
        let err = parse(&["--backend", "echo", "--server-addr", "not-an-addr"]).unwrap_err();
        assert!(err.to_string().contains("SERVER_ADDR"));
    }

    #[test]
    fn google_backend_requires_api_key() {
        assert!(parse(&["--backend", "google", "--google-api-key", "  "]).is_err());

        let config = parse(&["--backend", "google", "--google-api-key", "secret"]).unwrap();
        match &config.backend {
            BackendConfig::Google {
                api_key, endpoint, ..
            } => {
                assert_eq!(api_key, "secret");
                assert_eq!(endpoint, DEFAULT_GOOGLE_ENDPOINT);
            }
            BackendConfig::Echo => panic!("expected google backend"),
        }
        assert!(!format!("{config:?}").contains("secret"));
    }
}
