//! Clap derive structures for the `olm` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// olm -- settings and connection config for the olm mesh VPN client
#[derive(Debug, Parser)]
#[command(
    name = "olm",
    version,
    about = "Manage olm client settings from the command line",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Application config file (defaults to the platform config dir)
    #[arg(long, env = "OLM_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Store settings in this plaintext file instead of the OS keyring
    #[arg(long, env = "OLM_SETTINGS_FILE", global = true)]
    pub settings_file: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect and edit stored settings
    #[command(alias = "s")]
    Settings(SettingsArgs),

    /// Print the connection config the engine would receive
    RenderConfig(RenderArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show the stored settings as JSON
    Show {
        /// Print secrets in clear
        #[arg(long)]
        reveal: bool,
    },

    /// Set one field
    Set {
        field: SettingField,
        value: String,
    },

    /// Set a secret field, prompting when no value is given
    SetSecret {
        field: SecretField,

        /// Read the value from this argument instead of prompting
        #[arg(long, env = "OLM_SECRET_VALUE", hide_env_values = true)]
        value: Option<String>,
    },

    /// Remove every stored setting
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SettingField {
    Endpoint,
    Id,
    OrgId,
    Mtu,
    Dns,
    /// Comma-separated list of host:port
    UpstreamDns,
    Holepunch,
    TunnelDns,
    OverrideDns,
    PingInterval,
    PingTimeout,
    LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SecretField {
    Secret,
    UserToken,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Print secrets in clear
    #[arg(long)]
    pub reveal: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    pub shell: clap_complete::Shell,
}
