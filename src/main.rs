use clap::Parser;
use tracing_subscriber::EnvFilter;
use harvester::cli::{self, Commands};
use harvester::config;
use harvester::errors::HarvesterError;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Lookup(args) => cli::lookup::handle_lookup(args, config_path, cli.quiet).await,
        Commands::Load(args) => cli::lookup::handle_load(args, config_path, cli.quiet).await,
        Commands::Identify(args) => cli::identify::handle_identify(args, config_path).await,
        Commands::Providers(args) => cli::providers::handle_providers(args, config_path).await,
        Commands::Presets(args) => cli::providers::handle_presets(args, config_path).await,
        Commands::Selection(args) => cli::providers::handle_selection(args, config_path).await,
        Commands::Indicators(args) => cli::indicators::handle_indicators(args, config_path).await,
        Commands::Settings(args) => cli::indicators::handle_settings(args, config_path).await,
        Commands::Watch(args) => cli::watch::handle_watch(args, config_path, cli.quiet).await,
        Commands::Validate(args) => handle_validate(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn handle_validate(args: cli::commands::ValidateArgs) -> Result<(), HarvesterError> {
    let path = std::path::PathBuf::from(&args.config);
    let _config = config::parse_config(&path).await?;
    println!("Configuration is valid: {}", args.config);
    Ok(())
}
