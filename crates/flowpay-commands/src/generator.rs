use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::llm::{CompletionClient, CompletionError, CompletionRequest, DEFAULT_LLM_TIMEOUT};

const COMMAND_INSTRUCTIONS: &str = r#"You are the FlowPay assistant. Convert the user's request into exactly one JSON command.

Available actions:
1. create_payment - create a payment to a vendor. data: vendor (string, required), amount (number, required), currency (ISO code, default "INR"), due_date ("YYYY-MM-DD"), description (string)
2. show_pending_payments - list pending payments. data: filter ("all" | "overdue" | "upcoming"), vendor (string)
3. export_report - export a payment report. data: period (string, required, e.g. "November"), format ("csv" | "pdf")
4. set_reminder - set a reminder. data: message (string, required), date ("YYYY-MM-DD", required), time ("HH:MM")
5. add_client - add a client or vendor. data: name (string, required), email, wallet_address, phone
6. check_balance_reminders - check upcoming payments against a balance. data: balance (number), walletAddress (string)

Rules:
- Reply with JSON only. No markdown, no code fences, no commentary.
- Use the action names exactly as listed.
- Resolve relative dates (tomorrow, Monday, next week) against today's date and write them as YYYY-MM-DD.
- Amounts are plain numbers: "₹12,000" becomes 12000 with currency "INR", "$250" becomes 250 with currency "USD".
- Leave out fields the user did not mention instead of guessing.

Response format:
{"action": "<action name>", "data": { ... }}

Examples:
Input: Create a payment for ₹12,000 to Ditre Italia due 2025-12-01
Output: {"action":"create_payment","data":{"vendor":"Ditre Italia","amount":12000,"currency":"INR","due_date":"2025-12-01","description":"Payment to Ditre Italia"}}

Input: Show me all pending payments
Output: {"action":"show_pending_payments","data":{"filter":"all"}}

Input: Add Acme Corp as a client, email sales@acmecorp.com
Output: {"action":"add_client","data":{"name":"Acme Corp","email":"sales@acmecorp.com"}}

Input: Check if my balance of 5000 covers tomorrow's payments
Output: {"action":"check_balance_reminders","data":{"balance":5000}}"#;

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("Invalid JSON response from AI: {message}")]
    Parse { message: String, raw: String },
}

impl GeneratorError {
    /// Model reply that could not be turned into a command, when there was one.
    #[must_use]
    pub fn raw_reply(&self) -> Option<&str> {
        match self {
            Self::Parse { raw, .. } => Some(raw),
            Self::Completion(_) => None,
        }
    }
}

/// System instruction for one request, dated so relative dates resolve.
#[must_use]
pub fn system_prompt(today: NaiveDate) -> String {
    format!("Today's date is {today}.\n\n{COMMAND_INSTRUCTIONS}")
}

/// Drops code fences and keeps the span from the first `{` to the last `}`.
#[must_use]
pub fn clean_model_reply(text: &str) -> String {
    let unfenced = strip_fence(&strip_fence(text, "```json"), "```");
    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => unfenced[start..=end].to_string(),
        _ => unfenced,
    }
}

fn strip_fence(text: &str, fence: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(index) = rest.find(fence) {
        out.push_str(&rest[..index]);
        rest = rest[index + fence.len()..].trim_start();
    }
    out.push_str(rest);
    out
}

/// Turns model reply text into a candidate command object with a truthy `action`.
///
/// A legacy `parameters` key is moved to `data`.
pub fn parse_command_reply(text: &str) -> Result<Value, GeneratorError> {
    let parse_error = |message: String| GeneratorError::Parse {
        message,
        raw: text.to_string(),
    };

    let cleaned = clean_model_reply(text);
    let parsed: Value =
        serde_json::from_str(&cleaned).map_err(|error| parse_error(error.to_string()))?;
    let Value::Object(mut command) = parsed else {
        return Err(parse_error("expected a JSON object".to_string()));
    };

    let has_action = match command.get("action") {
        None | Some(Value::Null | Value::Bool(false)) => false,
        Some(Value::String(action)) => !action.is_empty(),
        Some(_) => true,
    };
    if !has_action {
        return Err(parse_error("Missing 'action' field in JSON".to_string()));
    }

    if !command.contains_key("data") {
        if let Some(parameters) = command.remove("parameters") {
            command.insert("data".to_string(), parameters);
        }
    }
    Ok(Value::Object(command))
}

/// Asks the language model for a command and parses its reply.
#[derive(Clone)]
pub struct CommandGenerator {
    client: Arc<dyn CompletionClient>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl CommandGenerator {
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            clock,
            timeout: DEFAULT_LLM_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn generate(&self, prompt: &str) -> Result<Value, GeneratorError> {
        let request = CompletionRequest {
            system: system_prompt(self.clock.today()),
            user: prompt.to_string(),
        };
        info!(model = self.client.model_name(), "requesting command from language model");

        let reply = tokio::time::timeout(self.timeout, self.client.complete(&request))
            .await
            .map_err(|_| CompletionError::Timeout(self.timeout))??;
        debug!(reply = %reply, "language model reply");

        parse_command_reply(&reply).inspect_err(|error| {
            warn!(%error, raw = %reply, "language model reply is not a usable command");
        })
    }
}
