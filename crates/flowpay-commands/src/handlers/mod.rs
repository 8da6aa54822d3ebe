//! One async handler per [`crate::Action`]. Each takes typed parameters and the
//! shared [`HandlerContext`], and returns a serializable output.

mod clients;
mod payments;
mod reminders;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::clock::Clock;
use crate::store::RecordStore;

pub use clients::{AddClientOutput, AddClientParams, add_client};
pub use payments::{
    CreatePaymentOutput, CreatePaymentParams, ExportReportOutput, ExportReportParams,
    PaymentSummary, PendingFilter, PendingPaymentsOutput, PendingPaymentsParams, create_payment,
    export_report, show_pending_payments,
};
pub use reminders::{
    BalanceCheckOutput, BalanceCheckParams, LowBalancePayment, SetReminderOutput,
    SetReminderParams, check_balance_reminders, set_reminder,
};

pub struct HandlerContext<'a> {
    pub store: &'a RecordStore,
    pub clock: &'a dyn Clock,
}

pub(crate) fn new_record_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps, and naive `YYYY-MM-DDTHH:MM:SS`.
pub(crate) fn parse_due_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.naive_utc().date());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|timestamp| timestamp.date())
}

/// Blank strings count as "not provided".
pub(crate) fn provided(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// en-US style grouping with at most three fraction digits: `12000` -> `12,000`,
/// `1234.5` -> `1,234.5`.
pub(crate) fn format_amount(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    let text = format!("{:.3}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3 + 5);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if !fraction.is_empty() {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

pub(crate) fn currency_symbol(currency: &str) -> &'static str {
    if currency == "INR" { "₹" } else { "$" }
}
