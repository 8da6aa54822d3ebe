use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{HandlerContext, currency_symbol, format_amount, new_record_id, parse_due_date, provided};
use crate::error::CommandError;
use crate::records::{LOW_BALANCE_KIND, PaymentStatus, ReminderRecord, ReminderStatus};

const DEFAULT_REMINDER_TIME: &str = "09:00";
const UNKNOWN_WALLET: &str = "unknown";

#[derive(Debug, Clone, Deserialize)]
pub struct SetReminderParams {
    pub message: String,
    pub date: String,
    pub time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetReminderOutput {
    pub id: String,
    pub message: String,
    pub date: String,
    pub time: String,
    pub status: ReminderStatus,
}

pub async fn set_reminder(
    ctx: &HandlerContext<'_>,
    params: SetReminderParams,
) -> Result<SetReminderOutput, CommandError> {
    let reminder = ctx
        .store
        .add_reminder(ReminderRecord {
            id: new_record_id("rem"),
            message: params.message,
            date: params.date,
            time: provided(params.time).unwrap_or_else(|| DEFAULT_REMINDER_TIME.to_string()),
            status: ReminderStatus::Active,
            created_at: ctx.clock.now(),
            kind: None,
            payment_id: None,
        })
        .await;
    info!(reminder_id = %reminder.id, date = %reminder.date, "reminder set");

    Ok(SetReminderOutput {
        id: reminder.id,
        message: reminder.message,
        date: reminder.date,
        time: reminder.time,
        status: reminder.status,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BalanceCheckParams {
    pub balance: Option<f64>,
    #[serde(rename = "walletAddress", alias = "wallet_address")]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowBalancePayment {
    pub payment_id: String,
    pub vendor: String,
    pub amount: f64,
    pub currency: String,
    pub due_date: Option<String>,
    pub shortfall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceCheckOutput {
    pub current_balance: f64,
    pub wallet_address: String,
    pub total_pending_payments: usize,
    pub low_balance_count: usize,
    pub low_balance_payments: Vec<LowBalancePayment>,
    pub reminders_created: usize,
    pub reminders: Vec<ReminderRecord>,
    pub message: String,
}

/// Flags pending payments due the day after tomorrow that the balance cannot cover,
/// and records a `low_balance` reminder for tomorrow against each one.
///
/// Running the check twice on the same day records the reminders twice.
pub async fn check_balance_reminders(
    ctx: &HandlerContext<'_>,
    params: BalanceCheckParams,
) -> Result<BalanceCheckOutput, CommandError> {
    let balance = params.balance.unwrap_or(0.0);
    let wallet_address =
        provided(params.wallet_address).unwrap_or_else(|| UNKNOWN_WALLET.to_string());
    let now = ctx.clock.now();
    let tomorrow = ctx.clock.today().succ_opt();

    let pending: Vec<_> = ctx
        .store
        .list_payments()
        .await
        .into_iter()
        .filter(|payment| payment.status == PaymentStatus::Pending)
        .collect();

    let mut flagged = Vec::new();
    let mut reminders = Vec::new();
    for payment in &pending {
        let Some(day_before) = payment
            .due_date
            .as_deref()
            .and_then(parse_due_date)
            .and_then(|due| due.pred_opt())
        else {
            continue;
        };
        if Some(day_before) != tomorrow || balance >= payment.amount {
            continue;
        }

        let shortfall = payment.amount - balance;
        let symbol = currency_symbol(&payment.currency);
        let message = format!(
            "⚠️ Low Balance Alert: Payment of {symbol}{} to {} is due on {}. Current balance: {symbol}{}. Shortfall: {symbol}{}",
            format_amount(payment.amount),
            payment.vendor,
            payment.due_date.as_deref().unwrap_or_default(),
            format_amount(balance),
            format_amount(shortfall),
        );
        warn!(payment_id = %payment.id, vendor = %payment.vendor, shortfall, "low balance for upcoming payment");

        flagged.push(LowBalancePayment {
            payment_id: payment.id.clone(),
            vendor: payment.vendor.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            due_date: payment.due_date.clone(),
            shortfall,
        });
        reminders.push(ReminderRecord {
            id: new_record_id("rem"),
            message,
            date: day_before.to_string(),
            time: DEFAULT_REMINDER_TIME.to_string(),
            status: ReminderStatus::Active,
            created_at: now,
            kind: Some(LOW_BALANCE_KIND.to_string()),
            payment_id: Some(payment.id.clone()),
        });
    }

    let reminders = if reminders.is_empty() {
        reminders
    } else {
        ctx.store.add_reminders(reminders).await
    };

    let message = if flagged.is_empty() {
        "✅ All good! You have sufficient balance for upcoming payments.".to_string()
    } else {
        format!(
            "⚠️ Low balance detected! You have {} upcoming payment(s) with insufficient balance.",
            flagged.len()
        )
    };

    Ok(BalanceCheckOutput {
        current_balance: balance,
        wallet_address,
        total_pending_payments: pending.len(),
        low_balance_count: flagged.len(),
        low_balance_payments: flagged,
        reminders_created: reminders.len(),
        reminders,
        message,
    })
}
