use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Instant;

use clap::Parser;
use log::{error, info, LevelFilter};
use url::Url;

use domainexporter::config::{Config, ConfigError, Resolver, Settings, ENV_CONFIG, ENV_LOG_LEVEL};
use domainexporter::logging::init_logger;
use domainexporter::report::{self, ReportFormat};
use domainexporter::soap::SoapClient;
use domainexporter::{Exporter, RequestTemplates};

/// Exports domain and SSL certificate data from the reseller SOAP API as a
/// Prometheus metrics file.
///
/// Every option can also be set through its EXPORT_* environment variable
/// (a .env file is honoured) or a TOML config file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Seconds between polls [env: EXPORT_INTERVAL] [default: 300]
    #[arg(long)]
    interval: Option<u64>,

    /// Metrics file to write [env: EXPORT_OUTPUT] [default: metrics/ext_domain_metrics.prom]
    #[arg(long)]
    output: Option<PathBuf>,

    /// SOAP API user [env: EXPORT_USER]
    #[arg(long)]
    username: Option<String>,

    /// SOAP API password [env: EXPORT_PASS]
    #[arg(long)]
    password: Option<String>,

    /// SOAP endpoint URL [env: EXPORT_ENDPOINT]
    #[arg(long)]
    endpoint: Option<Url>,

    /// Request timeout in seconds [env: EXPORT_TIMEOUT] [default: 30]
    #[arg(long)]
    timeout: Option<u64>,

    /// File replacing the built-in domain listing request [env: EXPORT_DOMAIN_REQUEST]
    #[arg(long)]
    domain_request: Option<PathBuf>,

    /// File replacing the built-in SSL listing request [env: EXPORT_SSL_REQUEST]
    #[arg(long)]
    ssl_request: Option<PathBuf>,

    /// TOML configuration file [env: EXPORT_CONFIG]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace [env: EXPORT_LOG_LEVEL]
    #[arg(long, value_parser = parse_level)]
    log_level: Option<LevelFilter>,

    /// What to print after each cycle: quiet, summary, json
    #[arg(long, default_value = "quiet")]
    report: ReportFormat,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    example_config: bool,
}

impl Cli {
    /// The command-line layer of the configuration.
    fn layer(&self) -> Config {
        Config {
            interval: self.interval,
            output: self.output.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            endpoint: self.endpoint.clone(),
            timeout: self.timeout,
            domain_request: self.domain_request.clone(),
            ssl_request: self.ssl_request.clone(),
        }
    }
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    s.parse().map_err(|e: log::ParseLevelError| e.to_string())
}

fn load_settings<F>(resolver: &Resolver<F>, cli: &Cli) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let file = match resolver.resolve(ENV_CONFIG, cli.config.clone(), None)? {
        Some(path) => {
            info!(
                "Loading configuration from {} (source: {})",
                path.value.display(),
                path.source
            );
            Config::from_file(&path.value)?
        }
        None => Config::default(),
    };
    Settings::resolve(resolver, cli.layer(), file)
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.example_config {
        print!("{}", Config::example_toml());
        return ExitCode::SUCCESS;
    }

    let resolver = Resolver::from_env();
    let level = match resolver.resolve(ENV_LOG_LEVEL, cli.log_level, None) {
        Ok(level) => level.map(|l| l.value),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logger(level) {
        eprintln!("Failed to initialize logger: {}", e);
        return ExitCode::FAILURE;
    }
    info!("Metrics exporter started.");

    let settings = match load_settings(&resolver, &cli) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    settings.log_summary();

    let templates = match RequestTemplates::load(
        settings.domain_request.as_ref().map(|r| r.value.as_path()),
        settings.ssl_request.as_ref().map(|r| r.value.as_path()),
    ) {
        Ok(templates) => templates,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match SoapClient::new(
        settings.endpoint.value.clone(),
        settings.username.value.clone(),
        settings.password.value.clone(),
        settings.timeout(),
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let exporter = Exporter::new(client, templates, settings.output.value.clone());
    loop {
        let started = Instant::now();
        let written = match exporter.run_cycle() {
            Ok(cycle) => {
                if let Some(text) = report::render(&cycle, cli.report) {
                    println!("{}", text);
                }
                true
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        };

        if cli.once {
            return if written {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
        // the next cycle starts one interval after this one started
        thread::sleep(settings.interval().saturating_sub(started.elapsed()));
    }
}
