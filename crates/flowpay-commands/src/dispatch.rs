use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::command::{Action, Command};
use crate::error::CommandError;
use crate::handlers::{
    self, AddClientOutput, BalanceCheckOutput, CreatePaymentOutput, ExportReportOutput,
    HandlerContext, PendingPaymentsOutput, SetReminderOutput,
};
use crate::preconditions::check_preconditions;
use crate::store::RecordStore;

/// Result of one handler, serialized as the handler's own payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionOutput {
    PaymentCreated(CreatePaymentOutput),
    PendingPayments(PendingPaymentsOutput),
    ReportExported(ExportReportOutput),
    ReminderSet(SetReminderOutput),
    ClientAdded(AddClientOutput),
    BalanceChecked(BalanceCheckOutput),
}

impl ActionOutput {
    #[must_use]
    pub const fn action(&self) -> Action {
        match self {
            Self::PaymentCreated(_) => Action::CreatePayment,
            Self::PendingPayments(_) => Action::ShowPendingPayments,
            Self::ReportExported(_) => Action::ExportReport,
            Self::ReminderSet(_) => Action::SetReminder,
            Self::ClientAdded(_) => Action::AddClient,
            Self::BalanceChecked(_) => Action::CheckBalanceReminders,
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Routes a [`Command`] to its handler against one injected store and clock.
#[derive(Clone)]
pub struct ActionDispatcher {
    store: RecordStore,
    clock: Arc<dyn Clock>,
}

impl ActionDispatcher {
    #[must_use]
    pub fn new(store: RecordStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    #[must_use]
    pub fn with_system_clock(store: RecordStore) -> Self {
        Self::new(store, Arc::new(SystemClock))
    }

    #[must_use]
    pub const fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Parses a raw candidate first; unknown action names fail here with 400.
    pub async fn execute_value(&self, candidate: &Value) -> Result<ActionOutput, CommandError> {
        let command = Command::from_value(candidate)?;
        self.execute(&command).await
    }

    pub async fn execute(&self, command: &Command) -> Result<ActionOutput, CommandError> {
        info!(action = %command.action, "executing command");
        let result = self.run(command).await;
        if let Err(error) = &result {
            warn!(action = %command.action, status = error.status_code(), %error, "command failed");
        }
        result
    }

    async fn run(&self, command: &Command) -> Result<ActionOutput, CommandError> {
        check_preconditions(&self.store, command).await?;

        let ctx = HandlerContext {
            store: &self.store,
            clock: self.clock.as_ref(),
        };
        let output = match command.action {
            Action::CreatePayment => {
                ActionOutput::PaymentCreated(handlers::create_payment(&ctx, params(command)?).await?)
            }
            Action::ShowPendingPayments => ActionOutput::PendingPayments(
                handlers::show_pending_payments(&ctx, params(command)?).await?,
            ),
            Action::ExportReport => {
                ActionOutput::ReportExported(handlers::export_report(&ctx, params(command)?).await?)
            }
            Action::SetReminder => {
                ActionOutput::ReminderSet(handlers::set_reminder(&ctx, params(command)?).await?)
            }
            Action::AddClient => {
                ActionOutput::ClientAdded(handlers::add_client(&ctx, params(command)?).await?)
            }
            Action::CheckBalanceReminders => ActionOutput::BalanceChecked(
                handlers::check_balance_reminders(&ctx, params(command)?).await?,
            ),
        };
        Ok(output)
    }
}

fn params<T: DeserializeOwned>(command: &Command) -> Result<T, CommandError> {
    serde_json::from_value(Value::Object(command.data.clone())).map_err(|error| {
        CommandError::InvalidParameters {
            action: command.action.as_str(),
            message: error.to_string(),
        }
    })
}
