use serde::Serialize;
use serde_json::Value;

use crate::command::Action;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Structural check of a candidate command. Collects every violation; never touches the store.
#[must_use]
pub fn validate_command(candidate: &Value) -> ValidationReport {
    let Value::Object(fields) = candidate else {
        return ValidationReport::from_errors(vec!["Command must be a valid object".to_string()]);
    };

    let mut errors = Vec::new();
    let action_value = fields.get("action");
    if !is_present(action_value) {
        errors.push("Missing required field: action".to_string());
    }

    let action = match action_value {
        Some(Value::String(name)) => Action::parse(name),
        _ => None,
    };
    if is_present(action_value) && action.is_none() {
        let shown = action_value.map(display_value).unwrap_or_default();
        errors.push(format!(
            "Invalid action: {shown}. Valid actions: {}",
            Action::names()
        ));
    }

    let data = fields.get("data");
    let field = |name: &str| data.and_then(|data| data.get(name));

    match action {
        Some(Action::CreatePayment) => {
            if is_present(data) {
                let amount = field("amount");
                if !is_present(field("vendor")) {
                    errors.push("Missing required field: data.vendor".to_string());
                }
                if !is_present(amount) {
                    errors.push("Missing required field: data.amount".to_string());
                } else if !amount.and_then(Value::as_f64).is_some_and(|amount| amount > 0.0) {
                    errors.push("Amount must be a positive number".to_string());
                }
            } else {
                errors.push("Missing required field: data".to_string());
            }
        }
        Some(action @ (Action::ExportReport | Action::SetReminder | Action::AddClient)) => {
            for required in action.required_fields() {
                if !is_present(field(required)) {
                    errors.push(format!("Missing required field: data.{required}"));
                }
            }
        }
        Some(Action::ShowPendingPayments | Action::CheckBalanceReminders) | None => {}
    }

    ValidationReport::from_errors(errors)
}

/// Null, absent, `false`, zero and the empty string all count as missing.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|number| number != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
