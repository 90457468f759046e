//! `render-config`: run the stored settings through the config exchange.

use olm_config::SettingsStore;

use crate::cli::RenderArgs;
use crate::error::CliError;

pub fn handle(args: &RenderArgs, store: &SettingsStore) -> Result<(), CliError> {
    let settings = store.settings();
    let validated = settings.to_connection_config()?.validate()?;
    tracing::debug!(org_id = validated.org_id(), "connection config is valid");

    let value = serde_json::from_str(validated.as_json())?;
    super::print_json(value, args.reveal)
}
