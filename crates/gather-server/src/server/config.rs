use anyhow::bail;
use clap::{Parser, ValueEnum};
use core::time::Duration;
use gather::ProducerSettings;
use std::path::PathBuf;

/// Runtime configuration for the `gather-server` binary.
///
/// These settings control which sources are aggregated, how producers
/// generate their items and how much buffering sits between producers and the
/// HTTP response. All values are parsed from CLI arguments or environment
/// variables (a `.env` file is loaded first), with defaults matching a single
/// self-delegating instance on port 8080.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "gather-server",
    version,
    about = "An HTTP service streaming items aggregated from concurrent producers"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,

    /// Sources aggregated by `/agg`, comma separated.
    ///
    /// Each source gets its own producer task per request.
    ///
    /// Environment variable: `SOURCES`
    #[arg(
        long,
        env = "SOURCES",
        value_delimiter = ',',
        default_value = "sourceA,sourceB,sourceC"
    )]
    pub sources: Vec<String>,

    /// Producer used by `/agg`.
    ///
    /// `remote` fetches each source from `PEER_URL/task/{source}`; `local`
    /// generates items in-process.
    ///
    /// Environment variable: `PRODUCER`
    #[arg(long, env = "PRODUCER", value_enum, default_value_t = ProducerKind::Remote)]
    pub producer: ProducerKind,

    /// Base URL of the peer serving `/task/{source}` for remote producers.
    ///
    /// Environment variable: `PEER_URL`
    #[arg(long, env = "PEER_URL", default_value_t = String::from("http://127.0.0.1:8080"))]
    pub peer_url: String,

    /// Timeout in milliseconds for a single remote fetch.
    ///
    /// Environment variable: `FETCH_TIMEOUT_MS`
    #[arg(long, env = "FETCH_TIMEOUT_MS", default_value_t = 30_000)]
    pub fetch_timeout_ms: u64,

    /// Inclusive lower bound of items generated per source.
    ///
    /// Environment variable: `MIN_ITEMS`
    #[arg(long, env = "MIN_ITEMS", default_value_t = 50)]
    pub min_items: usize,

    /// Exclusive upper bound of items generated per source. Equal to
    /// `MIN_ITEMS` pins the count.
    ///
    /// Environment variable: `MAX_ITEMS`
    #[arg(long, env = "MAX_ITEMS", default_value_t = 100)]
    pub max_items: usize,

    /// Inclusive lower bound of the per-item delay in milliseconds.
    ///
    /// Environment variable: `MIN_DELAY_MS`
    #[arg(long, env = "MIN_DELAY_MS", default_value_t = 10)]
    pub min_delay_ms: u64,

    /// Exclusive upper bound of the per-item delay in milliseconds. Equal to
    /// `MIN_DELAY_MS` pins the delay.
    ///
    /// Environment variable: `MAX_DELAY_MS`
    #[arg(long, env = "MAX_DELAY_MS", default_value_t = 20)]
    pub max_delay_ms: u64,

    /// Capacity of the channel shared by all producers of one request.
    ///
    /// A full channel makes producers wait for the client; items are never
    /// dropped.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 64)]
    pub stream_buffer_size: usize,

    /// Append log records to this file in addition to stderr.
    ///
    /// Environment variable: `LOG_FILE`
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Seconds to wait for in-flight streams to drain on shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,
}

/// Which producer backs the aggregating endpoint.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerKind {
    Local,
    Remote,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub sources: Vec<String>,
    pub producer: ProducerKind,
    pub peer_url: String,
    pub fetch_timeout: Duration,
    pub producer_settings: ProducerSettings,
    pub stream_buffer_size: usize,
    pub log_file: Option<PathBuf>,
    pub shutdown_timeout: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let sources: Vec<String> = args
            .sources
            .into_iter()
            .map(|source| source.trim().to_string())
            .collect();

        if sources.is_empty() {
            bail!("SOURCES must name at least one source");
        }

        if let Some(bad) = sources
            .iter()
            .find(|s| s.is_empty() || s.contains(['/', '?', '#']) || s.contains(char::is_whitespace))
        {
            bail!("SOURCES contains an invalid source name: {bad:?}");
        }

        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        if args.fetch_timeout_ms == 0 {
            bail!("FETCH_TIMEOUT_MS must be greater than 0");
        }

        let producer_settings = ProducerSettings::new(
            args.min_items..args.max_items,
            Duration::from_millis(args.min_delay_ms)..Duration::from_millis(args.max_delay_ms),
        )?;

        Ok(Self {
            server_addr: args.server_addr,
            sources,
            producer: args.producer,
            peer_url: args.peer_url,
            fetch_timeout: Duration::from_millis(args.fetch_timeout_ms),
            producer_settings,
            stream_buffer_size: args.stream_buffer_size,
            log_file: args.log_file,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let mut argv = vec!["gather-server"];
        argv.extend_from_slice(args);
        ServerConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn sources_are_split_and_trimmed() {
        let config = parse(&["--sources", "a, b ,c"]).unwrap();
        assert_eq!(config.sources, ["a", "b", "c"]);
    }

    #[test]
    fn explicit_values_build_pinned_settings() {
        let config = parse(&[
            "--producer",
            "local",
            "--min-items",
            "2",
            "--max-items",
            "2",
            "--min-delay-ms",
            "0",
            "--max-delay-ms",
            "0",
            "--stream-buffer-size",
            "1",
        ])
        .unwrap();

        assert_eq!(config.producer, ProducerKind::Local);
        assert_eq!(config.producer_settings, ProducerSettings::fixed(2, Duration::ZERO));
        assert_eq!(config.stream_buffer_size, 1);
    }

    #[test]
    fn empty_source_is_rejected() {
        assert!(parse(&["--sources", "a,,b"]).is_err());
    }

    #[test]
    fn source_with_path_separator_is_rejected() {
        assert!(parse(&["--sources", "a/b"]).is_err());
    }

    #[test]
    fn inverted_item_range_is_rejected() {
        assert!(parse(&["--min-items", "10", "--max-items", "5"]).is_err());
    }

    #[test]
    fn inverted_delay_range_is_rejected() {
        assert!(parse(&["--min-delay-ms", "30", "--max-delay-ms", "20"]).is_err());
    }

    #[test]
    fn zero_buffer_is_rejected() {
        assert!(parse(&["--stream-buffer-size", "0"]).is_err());
    }
}
