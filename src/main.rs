use clap::Parser;
use memofib::cli::commands::load_config;
use memofib::cli::{Cli, Commands};
use memofib::types::config::Config;
use memofib::MemoFibResult;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> MemoFibResult<()> {
    let cli = Cli::parse();

    // Load configuration first (no logging yet)
    let loaded = load_config(&cli.config);
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default_config(),
    };

    // Determine log level: CLI flags take precedence over config
    let log_level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        format!("memofib={}", log_level)
            .parse()
            .unwrap_or_else(|_| "memofib=info".parse().expect("fallback directive is valid")),
    );

    // Logs go to stderr so stdout stays clean for reports
    if config.general.log_format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    match &loaded {
        Ok(_) => tracing::debug!("Configuration loaded from: {}", cli.config.display()),
        Err(e) => tracing::warn!(
            "Ignoring configuration at {}: {}",
            cli.config.display(),
            e
        ),
    }

    match cli.command {
        Commands::Init { path } => {
            memofib::cli::commands::init(path).await?;
        }
        Commands::Range { max_n, run } => {
            memofib::cli::commands::range(max_n, &run, &config).await?;
        }
        Commands::Eval { inputs, run } => {
            memofib::cli::commands::eval(&inputs, &run, &config).await?;
        }
        Commands::Version => {
            memofib::cli::commands::version();
        }
    }

    Ok(())
}
