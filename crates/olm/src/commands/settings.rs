//! `settings` subcommand handlers.

use olm_core::{FieldError, LogLevel, Settings, ValidationError};
use olm_config::SettingsStore;

use crate::cli::{SecretField, SettingField, SettingsArgs, SettingsCommand};
use crate::error::CliError;

pub fn handle(args: SettingsArgs, store: &SettingsStore) -> Result<(), CliError> {
    match args.command {
        SettingsCommand::Show { reveal } => {
            let value = serde_json::to_value(store.get_settings())?;
            super::print_json(value, reveal)
        }

        SettingsCommand::Set { field, value } => {
            store.update(|s| apply(s, field, &value))?;
            eprintln!("{} updated", wire_name(field));
            Ok(())
        }

        SettingsCommand::SetSecret { field, value } => {
            let value = match value {
                Some(v) => v,
                None => prompt_secret(field)?,
            };
            store.update(|s| {
                match field {
                    SecretField::Secret => s.secret = value,
                    SecretField::UserToken => s.user_token = value,
                }
                Ok(())
            })?;
            eprintln!("{} updated", secret_name(field));
            Ok(())
        }

        SettingsCommand::Clear => {
            store.clear()?;
            eprintln!("settings cleared ({})", store.backend_name());
            Ok(())
        }
    }
}

fn prompt_secret(field: SecretField) -> Result<String, CliError> {
    let what = secret_name(field);
    let value =
        rpassword::prompt_password(format!("{what}: ")).map_err(|e| CliError::Prompt {
            what,
            reason: e.to_string(),
        })?;
    if value.trim().is_empty() {
        return Err(CliError::Validation {
            field: what.into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(value)
}

/// Apply one edit to a draft. The draft is discarded on error.
fn apply(settings: &mut Settings, field: SettingField, raw: &str) -> Result<(), ValidationError> {
    let name = wire_name(field);
    let value = raw.trim();
    match field {
        SettingField::Endpoint => settings.endpoint = value.to_owned(),
        SettingField::Id => settings.id = value.to_owned(),
        SettingField::OrgId => settings.org_id = value.to_owned(),
        SettingField::Dns => settings.dns = value.to_owned(),
        SettingField::Mtu => {
            let mtu = value
                .parse::<u32>()
                .map_err(|_| FieldError::new(name, format!("'{value}' is not a number")))?;
            settings.set_mtu(mtu)?;
        }
        SettingField::UpstreamDns => settings.set_upstream_dns(value.split(',')),
        SettingField::Holepunch => settings.holepunch = parse_bool(name, value)?,
        SettingField::TunnelDns => settings.tunnel_dns = parse_bool(name, value)?,
        SettingField::OverrideDns => settings.override_dns = parse_bool(name, value)?,
        SettingField::PingInterval | SettingField::PingTimeout => {
            if field == SettingField::PingInterval {
                settings.ping_interval = value.to_owned();
            } else {
                settings.ping_timeout = value.to_owned();
            }
            // Reject unparsable durations now rather than at connect time.
            settings.to_connection_config()?;
        }
        SettingField::LogLevel => {
            let level = value.parse::<LogLevel>().map_err(|_| {
                FieldError::new(name, format!("'{value}' is not one of DEBUG, INFO, WARN, ERROR"))
            })?;
            settings.set_log_level(level);
        }
    }
    Ok(())
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, FieldError> {
    value
        .parse()
        .map_err(|_| FieldError::new(field, format!("'{value}' is not true or false")))
}

fn wire_name(field: SettingField) -> &'static str {
    match field {
        SettingField::Endpoint => "endpoint",
        SettingField::Id => "id",
        SettingField::OrgId => "orgId",
        SettingField::Mtu => "mtu",
        SettingField::Dns => "dns",
        SettingField::UpstreamDns => "upstreamDNS",
        SettingField::Holepunch => "holepunch",
        SettingField::TunnelDns => "tunnelDNS",
        SettingField::OverrideDns => "overrideDNS",
        SettingField::PingInterval => "pingInterval",
        SettingField::PingTimeout => "pingTimeout",
        SettingField::LogLevel => "logLevel",
    }
}

fn secret_name(field: SecretField) -> &'static str {
    match field {
        SecretField::Secret => "secret",
        SecretField::UserToken => "userToken",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejected_mtu_leaves_draft_untouched() {
        let mut settings = Settings::default();
        let err = apply(&mut settings, SettingField::Mtu, "9000").unwrap_err();
        assert!(err.mentions("mtu"));
        assert_eq!(settings.mtu, Settings::default().mtu);
    }

    #[test]
    fn upstream_dns_splits_on_commas() {
        let mut settings = Settings::default();
        apply(&mut settings, SettingField::UpstreamDns, "1.1.1.1:53, ,8.8.4.4:53").unwrap();
        assert_eq!(settings.upstream_dns, vec!["1.1.1.1:53", "8.8.4.4:53"]);
    }

    #[test]
    fn bad_values_name_their_field() {
        let mut settings = Settings::default();
        let err = apply(&mut settings, SettingField::TunnelDns, "maybe").unwrap_err();
        assert!(err.mentions("tunnelDNS"));
        let err = apply(&mut settings, SettingField::PingTimeout, "soon").unwrap_err();
        assert!(err.mentions("pingTimeout"));
        let err = apply(&mut settings, SettingField::LogLevel, "loud").unwrap_err();
        assert!(err.mentions("logLevel"));
    }

    #[test]
    fn log_level_is_normalized() {
        let mut settings = Settings::default();
        apply(&mut settings, SettingField::LogLevel, "debug").unwrap();
        assert_eq!(settings.log_level, "DEBUG");
    }
}
