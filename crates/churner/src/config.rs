//! Churner configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `CHURN_*` environment variables, then command-line flags.

use anyhow::{Context, Result};
use churn_lib::{Ratio, SamplingMode};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

/// Periodically clones and removes containers running one image
#[derive(Debug, Parser)]
#[command(name = "container-churner")]
#[command(author, version, about = "Churn containers of one image on a fixed interval", long_about = None)]
pub struct Cli {
    /// Containers based on this image are cloned and removed
    #[arg(long, short = 'i')]
    pub image: Option<String>,

    /// Time between churn steps (e.g. 30s, 1m30s, 2h)
    #[arg(long, short = 'f', value_parser = parse_duration)]
    pub freq: Option<Duration>,

    /// Clones created : containers removed per step, e.g. 1:2, 2:1, 1:1
    #[arg(long, short = 'r')]
    pub ratio: Option<Ratio>,

    /// TOML configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Seed for the random source (reproducible runs)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Never pick the same container twice in one step
    #[arg(long)]
    pub without_replacement: bool,

    /// Graceful stop timeout passed to the runtime
    #[arg(long, value_parser = parse_duration)]
    pub stop_timeout: Option<Duration>,

    /// Give up waiting for a stopped container to exit after this long
    #[arg(long, value_parser = parse_duration)]
    pub drain_timeout: Option<Duration>,

    /// Docker daemon address (unix:///var/run/docker.sock, tcp://host:2375)
    #[arg(long)]
    pub docker_host: Option<String>,

    /// Serve /healthz, /readyz and /metrics on this port
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Log output format
    #[arg(long, value_enum, default_value = "json", env = "CHURN_LOG_FORMAT")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Resolved churner configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChurnerConfig {
    /// Image whose containers are churned
    #[serde(default)]
    pub image: String,

    /// Time between churn steps
    #[serde(default = "default_freq", deserialize_with = "de_duration")]
    pub freq: Duration,

    /// Up:down ratio; a zero side means 1:1
    #[serde(default)]
    pub ratio: Ratio,

    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub sampling: SamplingMode,

    #[serde(default, deserialize_with = "de_opt_duration")]
    pub stop_timeout: Option<Duration>,

    #[serde(default, deserialize_with = "de_opt_duration")]
    pub drain_timeout: Option<Duration>,

    #[serde(default)]
    pub docker_host: Option<String>,

    #[serde(default)]
    pub api_port: Option<u16>,
}

fn default_freq() -> Duration {
    Duration::from_secs(60)
}

impl ChurnerConfig {
    /// Load configuration from file and environment, then apply flags
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = &cli.config {
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        }
        let source = builder
            .add_source(config::Environment::with_prefix("CHURN"))
            .build()
            .context("Failed to read configuration")?;

        let mut config: ChurnerConfig = source
            .try_deserialize()
            .context("Invalid configuration")?;
        config.apply_cli(cli);
        config.validate()?;
        config.ratio = config.ratio.resolve();

        Ok(config)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(image) = &cli.image {
            self.image = image.clone();
        }
        if let Some(freq) = cli.freq {
            self.freq = freq;
        }
        if let Some(ratio) = cli.ratio {
            self.ratio = ratio;
        }
        if cli.seed.is_some() {
            self.seed = cli.seed;
        }
        if cli.without_replacement {
            self.sampling = SamplingMode::WithoutReplacement;
        }
        if cli.stop_timeout.is_some() {
            self.stop_timeout = cli.stop_timeout;
        }
        if cli.drain_timeout.is_some() {
            self.drain_timeout = cli.drain_timeout;
        }
        if cli.docker_host.is_some() {
            self.docker_host = cli.docker_host.clone();
        }
        if cli.api_port.is_some() {
            self.api_port = cli.api_port;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.freq.is_zero() {
            anyhow::bail!("frequency must be greater than zero");
        }
        Ok(())
    }

    /// True when no image was given anywhere
    pub fn missing_image(&self) -> bool {
        self.image.trim().is_empty()
    }
}

fn de_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

fn de_opt_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Duration>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => parse_duration(&s).map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Parse a duration such as `90`, `500ms`, `1m30s` or `1.5h`
///
/// A bare integer is a number of seconds. Units: ns, us, ms, s, m, h.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let input = s.trim();
    if input.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut nanos = 0f64;
    let mut rest = input;

    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        if number_end == 0 || number_end == rest.len() {
            return Err(format!("invalid duration {:?}", input));
        }
        let value: f64 = rest[..number_end]
            .parse()
            .map_err(|_| format!("invalid number in duration {:?}", input))?;
        rest = &rest[number_end..];

        let unit_end = rest.find(is_number).unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            unit => return Err(format!("unknown unit {:?} in duration {:?}", unit, input)),
        };
        nanos += value * scale;
        rest = &rest[unit_end..];
    }

    Ok(Duration::from_nanos(nanos.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["container-churner"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("1.5h"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("10"), Ok(Duration::from_secs(10)));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        for input in ["", "s", "10x", "1m30", "m1", "1..5s"] {
            assert!(parse_duration(input).is_err(), "accepted {:?}", input);
        }
    }

    #[test]
    fn test_cli_flags() {
        let cli = cli(&["-i", "app:v1", "-f", "30s", "-r", "2:1", "--without-replacement"]);
        assert_eq!(cli.image.as_deref(), Some("app:v1"));
        assert_eq!(cli.freq, Some(Duration::from_secs(30)));
        assert_eq!(cli.ratio, Some(Ratio::new(2, 1)));
        assert!(cli.without_replacement);
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_cli_rejects_malformed_ratio() {
        let result = Cli::try_parse_from(["container-churner", "-i", "app", "-r", "2-1"]);
        assert!(result.is_err());
        let result = Cli::try_parse_from(["container-churner", "-i", "app", "-r", "300:1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_defaults_and_flags() {
        let config = ChurnerConfig::load(&cli(&["--image", "app:v1"])).unwrap();

        assert_eq!(config.image, "app:v1");
        assert_eq!(config.freq, Duration::from_secs(60));
        assert_eq!(config.ratio, Ratio::new(1, 1));
        assert_eq!(config.sampling, SamplingMode::WithReplacement);
        assert!(config.api_port.is_none());
    }

    #[test]
    fn test_load_resolves_zero_ratio() {
        let config = ChurnerConfig::load(&cli(&["-i", "app:v1", "-r", "0:3"])).unwrap();
        assert_eq!(config.ratio, Ratio::new(1, 1));
    }

    #[test]
    fn test_load_missing_image() {
        let config = ChurnerConfig::load(&cli(&[])).unwrap();
        assert!(config.missing_image());
    }

    #[test]
    fn test_load_rejects_zero_frequency() {
        assert!(ChurnerConfig::load(&cli(&["-i", "app:v1", "-f", "0s"])).is_err());
    }

    #[test]
    fn test_load_config_file_with_flag_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
image = "app:v1"
freq = "1m30s"
ratio = "3:2"
sampling = "without_replacement"
drain_timeout = "45s"
api_port = 9100
"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = ChurnerConfig::load(&cli(&["-c", &path, "-r", "4:1"])).unwrap();

        assert_eq!(config.image, "app:v1");
        assert_eq!(config.freq, Duration::from_secs(90));
        assert_eq!(config.ratio, Ratio::new(4, 1));
        assert_eq!(config.sampling, SamplingMode::WithoutReplacement);
        assert_eq!(config.drain_timeout, Some(Duration::from_secs(45)));
        assert_eq!(config.api_port, Some(9100));
    }

    #[test]
    fn test_load_config_file_bad_ratio() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "image = \"app:v1\"\nratio = \"two:one\"").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        assert!(ChurnerConfig::load(&cli(&["-c", &path])).is_err());
    }
}
