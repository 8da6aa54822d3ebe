use serde_json::Value;

use crate::command::{Action, Command};
use crate::error::CommandError;
use crate::store::RecordStore;

/// Semantic checks that need the store. Runs after structural validation and
/// before the handler.
pub async fn check_preconditions(store: &RecordStore, command: &Command) -> Result<(), CommandError> {
    match command.action {
        Action::AddClient => {
            let Some(name) = command.data.get("name").and_then(Value::as_str) else {
                return Ok(());
            };
            if store.client_by_name(name).await.is_some() {
                return Err(CommandError::DuplicateClient {
                    name: name.to_string(),
                });
            }
            Ok(())
        }
        Action::CreatePayment
        | Action::ShowPendingPayments
        | Action::ExportReport
        | Action::SetReminder
        | Action::CheckBalanceReminders => Ok(()),
    }
}
