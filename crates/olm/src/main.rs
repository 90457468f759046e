mod cli;
mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use olm_config::{AppConfig, SettingsStore, open_secret_store};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

fn main() {
    let cli = Cli::parse();

    // Config loading can fail; fall back to defaults long enough to log.
    let app_config = load_app_config(&cli.global);
    let log_defaults = app_config
        .as_ref()
        .map(|c| c.log.clone())
        .unwrap_or_default();
    init_tracing(
        cli.global.verbose,
        &log_defaults.filter,
        cli.global.log_json || log_defaults.json,
    );

    if let Err(err) = app_config.and_then(|config| run(cli, &config)) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, default_filter: &str, json: bool) {
    let filter = match verbosity {
        0 => default_filter,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_app_config(global: &GlobalOpts) -> Result<AppConfig, CliError> {
    let config = match &global.config {
        Some(path) => olm_config::load_app_config_from(path)?,
        None => olm_config::load_app_config()?,
    };
    Ok(config)
}

fn run(cli: Cli, config: &AppConfig) -> Result<(), CliError> {
    let open_store = || {
        let file = cli
            .global
            .settings_file
            .as_deref()
            .or(config.settings_file.as_deref());
        let store = SettingsStore::open(open_secret_store(file, &config.keyring_service));
        tracing::debug!(backend = store.backend_name(), "settings store opened");
        store
    };

    match cli.command {
        Command::Settings(args) => commands::settings::handle(args, &open_store()),
        Command::RenderConfig(args) => commands::render::handle(&args, &open_store()),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "olm", &mut std::io::stdout());
            Ok(())
        }
    }
}
