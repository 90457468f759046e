//! Command handlers and shared output helpers.

pub mod render;
pub mod settings;

use serde_json::Value;

use crate::error::CliError;

/// Wire names of the fields that never print unless revealed.
const SECRET_KEYS: [&str; 2] = ["secret", "userToken"];

/// Replace non-empty secret values in a JSON object with `****`.
fn redact_secrets(value: &mut Value) {
    let Some(object) = value.as_object_mut() else {
        return;
    };
    for key in SECRET_KEYS {
        if let Some(field) = object.get_mut(key) {
            if field.as_str().is_some_and(|s| !s.is_empty()) {
                *field = Value::from("****");
            }
        }
    }
}

fn print_json(mut value: Value, reveal: bool) -> Result<(), CliError> {
    if !reveal {
        redact_secrets(&mut value);
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn redacts_only_populated_secrets() {
        let mut value = json!({"secret": "s3cret", "userToken": "", "id": "olm_1"});
        redact_secrets(&mut value);
        assert_eq!(value, json!({"secret": "****", "userToken": "", "id": "olm_1"}));
    }
}
