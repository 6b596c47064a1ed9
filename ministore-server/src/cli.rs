use std::path::{Path, PathBuf};

use anyhow::Result;
use argh::FromArgs;

use crate::config::{Config, Overrides};
use crate::web::HttpLauncher;
use crate::{bootstrap, healthcheck, observability};

/// Minimalist object storage.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option)]
    pub config: Option<PathBuf>,

    /// domain used for routing incoming API requests
    #[argh(option, short = 'd')]
    pub domain: Option<String>,

    /// address for incoming API requests (default ":9000")
    #[argh(option, short = 'a')]
    pub api_address: Option<String>,

    /// address for incoming management UI requests (default ":9001")
    #[argh(option, short = 'w')]
    pub web_address: Option<String>,

    /// cert.pem
    #[argh(option, short = 'c', hidden_help)]
    pub cert: Option<String>,

    /// key.pem
    #[argh(option, short = 'k', hidden_help)]
    pub key: Option<String>,

    /// valid entries: file, memory, donut (default "donut")
    #[argh(option, short = 't')]
    pub driver_type: Option<String>,

    #[argh(subcommand)]
    pub command: Option<Command>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            domain: self.domain.clone(),
            api_address: self.api_address.clone(),
            web_address: self.web_address.clone(),
            cert: self.cert.clone(),
            key: self.key.clone(),
            driver_type: self.driver_type.clone(),
        }
    }
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Run(RunCommand),
    Healthcheck(HealthcheckCommand),
    Version(VersionCommand),
}

/// run the storage API and management UI servers (default)
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCommand {}

/// perform a healthcheck against the running servers
///
/// This command checks if both the storage API and the management UI respond on their configured
/// addresses. This is used for Docker healthchecks.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "healthcheck")]
struct HealthcheckCommand {}

/// print the server version
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

/// Splits `--name=value` and `-n=value` tokens into separate name and value tokens.
///
/// Tokens after a bare `--` are positional and kept as they are.
fn normalize_args<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    let mut normalized = Vec::with_capacity(args.len());
    let mut positional = false;

    for arg in args {
        let arg = arg.as_ref();
        if positional || arg == "--" {
            positional = true;
            normalized.push(arg.to_owned());
            continue;
        }

        let is_long = arg.starts_with("--");
        let is_short = !is_long && arg.starts_with('-') && arg.get(2..3) == Some("=");
        match arg.split_once('=') {
            Some((name, value)) if is_long || is_short => {
                normalized.push(name.to_owned());
                normalized.push(value.to_owned());
            }
            _ => normalized.push(arg.to_owned()),
        }
    }

    normalized
}

/// Parses the process arguments, exiting on `--help` or usage errors.
fn parse_env() -> Args {
    let strings: Vec<String> = std::env::args().collect();
    let cmd = strings
        .first()
        .and_then(|arg0| Path::new(arg0).file_name())
        .and_then(|name| name.to_str())
        .unwrap_or("ministore");

    let args = normalize_args(strings.get(1..).unwrap_or_default());
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    Args::from_args(&[cmd], &args).unwrap_or_else(|early_exit| {
        std::process::exit(match early_exit.status {
            Ok(()) => {
                println!("{}", early_exit.output);
                0
            }
            Err(()) => {
                eprintln!(
                    "{}\nRun {cmd} --help for more information.",
                    early_exit.output
                );
                1
            }
        })
    })
}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args = parse_env();

    // Special switch to just print the version and exit.
    if let Some(Command::Version(_)) = args.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::load(args.config.as_deref(), &args.overrides())?;

    // Ensure a rustls crypto provider is installed, required on distroless.
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    // Sentry should be initialized before creating the async runtime.
    let _sentry_guard = observability::init_sentry(&config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("main-rt")
        .enable_all()
        .worker_threads(config.runtime.worker_threads)
        .build()?;
    let _runtime_guard = runtime.enter();

    observability::init_tracing(&config);
    tracing::debug!(?config);

    runtime.block_on(async move {
        match args.command {
            None | Some(Command::Run(RunCommand {})) => {
                let launcher = HttpLauncher::new(config.runtime.shutdown_timeout);
                bootstrap::dispatch(&config, launcher).await
            }
            Some(Command::Healthcheck(HealthcheckCommand {})) => {
                let configs = bootstrap::plan(&config)?;
                healthcheck::healthcheck(&configs).await
            }
            Some(Command::Version(VersionCommand {})) => unreachable!(),
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::driver::DriverKind;
    use crate::error::ConfigError;
    use crate::topology::{ApiRole, ServerConfigSet};

    use super::*;

    fn parse(args: &[&str]) -> Args {
        let args = normalize_args(args);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        Args::from_args(&["ministore"], &args).unwrap()
    }

    fn plan_from(args: &[&str]) -> Result<ServerConfigSet, ConfigError> {
        let args = parse(args);
        let mut result = None;
        figment::Jail::expect_with(|_jail| {
            let config = Config::load(None, &args.overrides()).unwrap();
            result = Some(bootstrap::plan(&config));
            Ok(())
        });
        result.unwrap()
    }

    #[test]
    fn no_flags_override_nothing() {
        let args = parse(&[]);
        let overrides = args.overrides();

        assert!(args.command.is_none());
        assert!(overrides.domain.is_none());
        assert!(overrides.api_address.is_none());
        assert!(overrides.web_address.is_none());
        assert!(overrides.cert.is_none());
        assert!(overrides.key.is_none());
        assert!(overrides.driver_type.is_none());
    }

    #[test]
    fn parses_long_and_short_flags() {
        let long = parse(&[
            "--domain",
            "example.com",
            "--api-address",
            ":8000",
            "--web-address",
            ":8001",
            "--cert",
            "cert.pem",
            "--key",
            "key.pem",
            "--driver-type",
            "file",
        ]);
        let short = parse(&[
            "-d",
            "example.com",
            "-a",
            ":8000",
            "-w",
            ":8001",
            "-c",
            "cert.pem",
            "-k",
            "key.pem",
            "-t",
            "file",
        ]);

        for args in [long, short] {
            assert_eq!(args.domain.as_deref(), Some("example.com"));
            assert_eq!(args.api_address.as_deref(), Some(":8000"));
            assert_eq!(args.web_address.as_deref(), Some(":8001"));
            assert_eq!(args.cert.as_deref(), Some("cert.pem"));
            assert_eq!(args.key.as_deref(), Some("key.pem"));
            assert_eq!(args.driver_type.as_deref(), Some("file"));
        }
    }

    #[test]
    fn parses_subcommands() {
        assert!(matches!(
            parse(&["run"]).command,
            Some(Command::Run(RunCommand {}))
        ));
        assert!(matches!(
            parse(&["-t", "memory", "healthcheck"]).command,
            Some(Command::Healthcheck(HealthcheckCommand {}))
        ));
        assert!(matches!(
            parse(&["version"]).command,
            Some(Command::Version(VersionCommand {}))
        ));
    }

    #[test]
    fn tls_flags_are_hidden_from_help() {
        let help = Args::from_args(&["ministore"], &["--help"]).unwrap_err();
        assert!(help.output.contains("--driver-type"));
        assert!(help.output.contains("--api-address"));
        assert!(!help.output.contains("--cert"));
        assert!(!help.output.contains("--key"));
    }

    #[test]
    fn splits_flags_with_equals_sign() {
        assert_eq!(
            normalize_args(&["--driver-type=memory", "-a=:8080", "--cert", "a=b.pem"]),
            ["--driver-type", "memory", "-a", ":8080", "--cert", "a=b.pem"]
        );
        assert_eq!(normalize_args(&["--domain="]), ["--domain", ""]);
        assert_eq!(
            normalize_args(&["run", "--", "--key=x"]),
            ["run", "--", "--key=x"]
        );
    }

    #[test]
    fn equals_form_matches_separate_form() {
        let joined = parse(&["--driver-type=memory", "--api-address=:8080", "-d=example.com"]);
        assert_eq!(joined.driver_type.as_deref(), Some("memory"));
        assert_eq!(joined.api_address.as_deref(), Some(":8080"));
        assert_eq!(joined.domain.as_deref(), Some("example.com"));
    }

    #[test]
    fn memory_driver_on_custom_api_address_with_equals() {
        let configs = plan_from(&["--driver-type=memory", "--api-address=:8080"]).unwrap();

        let api = configs.by_role("api").unwrap();
        assert_eq!(api.address, ":8080");
        assert_eq!(
            api.role,
            ApiRole::Storage {
                driver: DriverKind::Memory
            }
        );
        assert!(!api.tls_enabled());

        let web = configs.by_role("web").unwrap();
        assert_eq!(web.address, ":9001");
        assert!(!web.tls_enabled());
    }

    #[test]
    fn cert_without_key_is_fatal_with_equals() {
        let error = plan_from(&["--cert=a.pem"]).unwrap_err();
        assert_eq!(
            error,
            ConfigError::PartialTlsPair {
                cert: "a.pem".into(),
                key: "".into(),
            }
        );
    }

    #[test]
    fn bogus_driver_falls_back_to_file_with_equals() {
        let (configs, lines) =
            ministore_test::tracing::capture(|| plan_from(&["--driver-type=bogus"]));

        let configs = configs.unwrap();
        assert_eq!(
            configs.by_role("api").unwrap().role,
            ApiRole::Storage {
                driver: DriverKind::File
            }
        );
        assert_eq!(lines.len(), 2, "{lines:?}");
        assert!(lines[0].contains("unknown driver type: bogus"));
    }

    #[test]
    fn memory_driver_on_custom_api_address() {
        let configs = plan_from(&["--driver-type", "memory", "--api-address", ":8080"]).unwrap();

        let api = configs.by_role("api").unwrap();
        assert_eq!(api.address, ":8080");
        assert_eq!(
            api.role,
            ApiRole::Storage {
                driver: DriverKind::Memory
            }
        );
        assert!(!api.tls_enabled());

        let web = configs.by_role("web").unwrap();
        assert_eq!(web.address, ":9001");
        assert!(!web.tls_enabled());
    }

    #[test]
    fn cert_without_key_is_fatal() {
        let error = plan_from(&["--cert", "a.pem"]).unwrap_err();
        assert_eq!(
            error,
            ConfigError::PartialTlsPair {
                cert: "a.pem".into(),
                key: "".into(),
            }
        );
    }

    #[test]
    fn bogus_driver_falls_back_to_file() {
        let (configs, lines) = ministore_test::tracing::capture(|| plan_from(&["-t", "bogus"]));

        let api = configs.unwrap();
        let api = api.by_role("api").unwrap();
        assert_eq!(
            api.role,
            ApiRole::Storage {
                driver: DriverKind::File
            }
        );

        assert_eq!(lines.len(), 2, "{lines:?}");
        assert!(lines[0].contains("unknown driver type: bogus"));
        assert!(lines[1].contains("choosing default driver type as 'file'"));
    }
}
