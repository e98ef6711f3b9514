//! Command-line arguments for the `httpecho` binary

use crate::http::HttpConfig;
use crate::http::duration::parse_duration;
use crate::network::ListenAddr;
use clap::Parser;
use std::time::Duration;

/// HTTP request echo server
#[derive(Parser, Debug, Clone)]
#[command(name = "httpecho", version, about)]
pub struct Args {
    /// Address to listen on, `host:port` or `:port`
    #[arg(short = 'p', long, value_name = "PORT", env = "HTTPECHO_SERVICE_PORT", default_value = ":8080")]
    pub service_port: ListenAddr,

    /// Address to serve metrics on (accepted, not served)
    #[arg(short = 'm', long, value_name = "PORT", env = "HTTPECHO_METRICS_PORT", default_value = ":8081")]
    pub metrics_port: ListenAddr,

    /// Include the process environment in every response
    #[arg(short = 'e', long, env = "HTTPECHO_ENV")]
    pub env: bool,

    /// How long an idle keep-alive connection is kept open
    #[arg(long, value_name = "DURATION", default_value = "30s", value_parser = parse_duration)]
    pub read_timeout: Duration,

    /// Timeout for writing one response
    #[arg(long, value_name = "DURATION", default_value = "30s", value_parser = parse_duration)]
    pub write_timeout: Duration,
}

impl Args {
    pub fn into_config(self) -> HttpConfig {
        HttpConfig::default()
            .with_listen_addr(self.service_port)
            .with_metrics_addr(Some(self.metrics_port))
            .with_include_env(self.env)
            .with_read_timeout(self.read_timeout)
            .with_write_timeout(self.write_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["httpecho"]).unwrap();
        let config = args.into_config();

        assert_eq!(config.listen_addr.to_string(), ":8080");
        assert_eq!(config.metrics_addr.unwrap().to_string(), ":8081");
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert!(!config.include_env);
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "httpecho",
            "-p",
            "127.0.0.1:9000",
            "--metrics-port",
            ":9001",
            "-e",
            "--read-timeout",
            "1m30s",
        ])
        .unwrap();
        let config = args.into_config();

        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.metrics_addr.unwrap().port(), 9001);
        assert!(config.include_env);
        assert_eq!(config.read_timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_invalid_values() {
        assert!(Args::try_parse_from(["httpecho", "-p", "8080"]).is_err());
        assert!(Args::try_parse_from(["httpecho", "--write-timeout", "soon"]).is_err());
    }
}
