use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CommandError;

/// The closed set of operations a command can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreatePayment,
    ShowPendingPayments,
    ExportReport,
    SetReminder,
    AddClient,
    CheckBalanceReminders,
}

impl Action {
    pub const ALL: [Self; 6] = [
        Self::CreatePayment,
        Self::ShowPendingPayments,
        Self::ExportReport,
        Self::SetReminder,
        Self::AddClient,
        Self::CheckBalanceReminders,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatePayment => "create_payment",
            Self::ShowPendingPayments => "show_pending_payments",
            Self::ExportReport => "export_report",
            Self::SetReminder => "set_reminder",
            Self::AddClient => "add_client",
            Self::CheckBalanceReminders => "check_balance_reminders",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == name)
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::CreatePayment => "Create a new payment entry",
            Self::ShowPendingPayments => "Show pending payments",
            Self::ExportReport => "Export transaction report",
            Self::SetReminder => "Set a payment reminder",
            Self::AddClient => "Add a new client/vendor",
            Self::CheckBalanceReminders => {
                "Check upcoming payments against the current balance and raise low balance alerts"
            }
        }
    }

    /// Fields the validator insists on before dispatch.
    #[must_use]
    pub const fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::CreatePayment => &["vendor", "amount"],
            Self::ShowPendingPayments | Self::CheckBalanceReminders => &[],
            Self::ExportReport => &["period"],
            Self::SetReminder => &["message", "date"],
            Self::AddClient => &["name"],
        }
    }

    /// Comma separated list of every action name.
    #[must_use]
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(|action| action.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = CommandError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| CommandError::UnknownAction(value.to_string()))
    }
}

/// A structured request naming one action plus its parameter map.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub action: Action,
    pub data: Map<String, Value>,
}

impl Command {
    #[must_use]
    pub const fn new(action: Action, data: Map<String, Value>) -> Self {
        Self { action, data }
    }

    /// Reads `{action, data}` from an untyped candidate.
    ///
    /// A missing or null `data` becomes an empty map.
    pub fn from_value(candidate: &Value) -> Result<Self, CommandError> {
        let action = match candidate.get("action") {
            Some(Value::String(name)) => name.parse::<Action>()?,
            Some(other) => return Err(CommandError::UnknownAction(other.to_string())),
            None => return Err(CommandError::UnknownAction(String::new())),
        };
        let data = match candidate.get("data") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(data)) => data.clone(),
            Some(_) => {
                return Err(CommandError::InvalidParameters {
                    action: action.as_str(),
                    message: "data must be a JSON object".to_string(),
                });
            }
        };
        Ok(Self { action, data })
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "action": self.action.as_str(),
            "data": Value::Object(self.data.clone()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub required_fields: &'static [&'static str],
}

/// One descriptor per action, in canonical order.
#[must_use]
pub fn action_catalog() -> Vec<ActionDescriptor> {
    Action::ALL
        .into_iter()
        .map(|action| ActionDescriptor {
            name: action.as_str(),
            description: action.description(),
            required_fields: action.required_fields(),
        })
        .collect()
}
