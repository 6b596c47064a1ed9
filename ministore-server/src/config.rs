//! Configuration for the ministore server.
//!
//! Configuration can be loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Command line flags (see [`Overrides`])
//! 2. Environment variables (prefixed with `MINISTORE__`)
//! 3. YAML configuration file (specified via the `--config` flag)
//! 4. Defaults
//!
//! See [`Config`] for a description of all configuration fields and their defaults.
//!
//! # Environment Variables
//!
//! Environment variables use `MINISTORE__` as a prefix and double underscores (`__`) to denote
//! nested configuration structures. For example:
//!
//! - `MINISTORE__API_ADDRESS=:8080` sets the storage API address
//! - `MINISTORE__DRIVER_TYPE=memory` selects the in-memory driver
//! - `MINISTORE__LOGGING__FORMAT=json` switches to JSON logs
//!
//! # YAML Configuration File
//!
//! The above configuration in YAML format would look like this:
//!
//! ```yaml
//! api_address: ":8080"
//! driver_type: memory
//!
//! logging:
//!   format: json
//! ```

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Yaml};
use secrecy::{CloneableSecret, SecretBox, SerializableSecret, zeroize::Zeroize};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::driver::DEFAULT_DRIVER_TYPE;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "MINISTORE__";

/// Newtype around `String` that may protect against accidental
/// logging of secrets in our configuration struct. Use with
/// [`secrecy::SecretBox`].
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigSecret(#[serde(deserialize_with = "scalar_string::deserialize")] String);

impl ConfigSecret {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ConfigSecret {
    fn from(str: &str) -> Self {
        ConfigSecret(str.to_string())
    }
}

impl std::ops::Deref for ConfigSecret {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for ConfigSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "[redacted]")
    }
}

impl CloneableSecret for ConfigSecret {}
impl SerializableSecret for ConfigSecret {}
impl Zeroize for ConfigSecret {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Runtime configuration for the Tokio async runtime.
///
/// Used in: [`Config::runtime`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Runtime {
    /// Number of worker threads for the server runtime.
    ///
    /// Both listeners share this pool. Set this in accordance with the resources available to the
    /// server, especially in Kubernetes environments.
    ///
    /// # Default
    ///
    /// Defaults to the number of CPU cores on the host machine.
    ///
    /// # Environment Variable
    ///
    /// `MINISTORE__RUNTIME__WORKER_THREADS`
    pub worker_threads: usize,

    /// Time granted to open connections to finish after shutdown was requested.
    ///
    /// # Default
    ///
    /// `10s`
    ///
    /// # Environment Variable
    ///
    /// `MINISTORE__RUNTIME__SHUTDOWN_TIMEOUT`
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

/// [Sentry](https://sentry.io/) error reporting configuration.
///
/// Sentry is disabled by default and only enabled when a DSN is provided.
///
/// Used in: [`Config::sentry`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Sentry {
    /// Sentry DSN (Data Source Name).
    ///
    /// The value is redacted when the configuration is logged.
    ///
    /// # Environment Variable
    ///
    /// `MINISTORE__SENTRY__DSN`
    pub dsn: Option<SecretBox<ConfigSecret>>,

    /// Environment name for this deployment, such as `"production"`.
    ///
    /// # Environment Variable
    ///
    /// `MINISTORE__SENTRY__ENVIRONMENT`
    pub environment: Option<Cow<'static, str>>,

    /// Sample rate for error events, between `0.0` and `1.0`.
    ///
    /// # Default
    ///
    /// `1.0`
    pub sample_rate: f32,

    /// Sample rate for performance traces, between `0.0` and `1.0`.
    ///
    /// # Default
    ///
    /// `0.01`
    pub traces_sample_rate: f32,
}

impl Sentry {
    /// Returns whether Sentry integration is enabled.
    pub fn is_enabled(&self) -> bool {
        self.dsn.is_some()
    }
}

impl Default for Sentry {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.01,
        }
    }
}

/// Log output format.
///
/// Used in: [`Logging::format`]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty output on a terminal, simplified output otherwise.
    Auto,
    /// Multi-line, human readable output with colors.
    Pretty,
    /// Compact single-line output without colors.
    Simplified,
    /// Newline delimited JSON objects.
    Json,
}

/// Error returned when parsing an unknown [`LogFormat`].
#[derive(Clone, Debug)]
pub struct FormatParseError(String);

impl fmt::Display for FormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"error parsing "{}" as format: expected one of "auto", "pretty", "simplified", "json""#,
            self.0
        )
    }
}

impl std::str::FromStr for LogFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let result = match s {
            "" => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("auto") => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            s if s.eq_ignore_ascii_case("simplified") => LogFormat::Simplified,
            s if s.eq_ignore_ascii_case("json") => LogFormat::Json,
            s => return Err(FormatParseError(s.into())),
        };

        Ok(result)
    }
}

impl std::error::Error for FormatParseError {}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Auto => "auto",
            LogFormat::Pretty => "pretty",
            LogFormat::Simplified => "simplified",
            LogFormat::Json => "json",
        })
    }
}

/// Deserializes any scalar into its textual form.
///
/// Environment variables are parsed into typed values, so `MINISTORE__DRIVER_TYPE=1` arrives as a
/// number. Free-form string settings accept these and keep the text.
mod scalar_string {
    use std::fmt;

    use serde::de::{self, Visitor};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(ScalarVisitor)
    }

    struct ScalarVisitor;

    impl Visitor<'_> for ScalarVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, number or boolean")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_owned())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_char<E: de::Error>(self, v: char) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i128<E: de::Error>(self, v: i128) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }
}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration.
///
/// Used in: [`Config::logging`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level, such as `info` or `debug`.
    ///
    /// The `RUST_LOG` environment variable takes precedence if set.
    ///
    /// # Default
    ///
    /// `info`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format.
    ///
    /// # Default
    ///
    /// `auto`
    #[serde(with = "display_fromstr")]
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// Main configuration struct for the ministore server.
///
/// The startup parameters (`domain` through `driver_type`) are kept as given. They are validated
/// and resolved into a [`ServerConfigSet`](crate::topology::ServerConfigSet) by
/// [`bootstrap::plan`](crate::bootstrap::plan).
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Domain used for routing incoming API requests.
    ///
    /// # Default
    ///
    /// `""`
    #[serde(deserialize_with = "scalar_string::deserialize")]
    pub domain: String,

    /// Address for incoming storage API requests.
    ///
    /// Either `host:port`, or `:port` to listen on all interfaces.
    ///
    /// # Default
    ///
    /// `":9000"`
    #[serde(deserialize_with = "scalar_string::deserialize")]
    pub api_address: String,

    /// Address for incoming management UI requests.
    ///
    /// # Default
    ///
    /// `":9001"`
    #[serde(deserialize_with = "scalar_string::deserialize")]
    pub web_address: String,

    /// Path to the PEM certificate chain for the storage API.
    ///
    /// Must be set together with [`key`](Self::key).
    #[serde(deserialize_with = "scalar_string::deserialize")]
    pub cert: String,

    /// Path to the PEM private key for the storage API.
    ///
    /// Must be set together with [`cert`](Self::cert).
    #[serde(deserialize_with = "scalar_string::deserialize")]
    pub key: String,

    /// Storage driver: one of `file`, `memory`, or `donut`.
    ///
    /// Unrecognized values fall back to `file` with a warning.
    ///
    /// # Default
    ///
    /// `"donut"`
    #[serde(deserialize_with = "scalar_string::deserialize")]
    pub driver_type: String,

    /// Configuration of the internal task runtime.
    pub runtime: Runtime,

    /// Logging configuration.
    pub logging: Logging,

    /// Configuration for Sentry error reporting.
    pub sentry: Sentry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: String::new(),
            api_address: ":9000".to_owned(),
            web_address: ":9001".to_owned(),
            cert: String::new(),
            key: String::new(),
            driver_type: DEFAULT_DRIVER_TYPE.to_owned(),

            runtime: Runtime::default(),
            logging: Logging::default(),
            sentry: Sentry::default(),
        }
    }
}

/// Startup parameters given on the command line.
///
/// Only parameters that were actually passed override the other configuration sources.
#[derive(Debug, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_type: Option<String>,
}

impl Config {
    /// Loads configuration from the provided arguments.
    ///
    /// Configuration is merged in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. YAML configuration file (if provided in `path`)
    /// 3. Environment variables (prefixed with `MINISTORE__`)
    /// 4. Command line flags in `overrides`
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML configuration file cannot be read or parsed, or if the
    /// environment variables cannot be parsed.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
            .extract()?;

        Ok(config)
    }
}
