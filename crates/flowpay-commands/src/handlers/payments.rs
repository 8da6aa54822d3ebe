use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{HandlerContext, new_record_id, parse_due_date, provided};
use crate::error::CommandError;
use crate::records::{PaymentRecord, PaymentStatus};

const DEFAULT_CURRENCY: &str = "INR";
const DEFAULT_REPORT_FORMAT: &str = "csv";
const DOWNLOAD_ROUTE_PREFIX: &str = "/api/agent/download";

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentParams {
    pub vendor: String,
    pub amount: f64,
    pub currency: Option<String>,
    pub due_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePaymentOutput {
    pub id: String,
    pub vendor: String,
    pub amount: f64,
    pub currency: String,
    pub due_date: Option<String>,
    pub status: PaymentStatus,
    pub message: String,
}

pub async fn create_payment(
    ctx: &HandlerContext<'_>,
    params: CreatePaymentParams,
) -> Result<CreatePaymentOutput, CommandError> {
    if params.vendor.trim().is_empty() {
        return Err(CommandError::InvalidParameters {
            action: "create_payment",
            message: "vendor must not be blank".to_string(),
        });
    }
    if params.amount <= 0.0 {
        return Err(CommandError::InvalidParameters {
            action: "create_payment",
            message: "amount must be greater than zero".to_string(),
        });
    }

    if ctx.store.client_by_name(&params.vendor).await.is_none() {
        warn!(vendor = %params.vendor, "vendor is not a known client; creating payment anyway");
    }

    let payment = ctx
        .store
        .add_payment(PaymentRecord {
            id: new_record_id("pay"),
            vendor: params.vendor,
            amount: params.amount,
            currency: provided(params.currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            due_date: provided(params.due_date),
            description: params.description.unwrap_or_default(),
            status: PaymentStatus::Pending,
            created_at: ctx.clock.now(),
        })
        .await;
    info!(payment_id = %payment.id, vendor = %payment.vendor, amount = payment.amount, "payment created");

    Ok(CreatePaymentOutput {
        message: format!("Payment created successfully for {}", payment.vendor),
        id: payment.id,
        vendor: payment.vendor,
        amount: payment.amount,
        currency: payment.currency,
        due_date: payment.due_date,
        status: payment.status,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingFilter {
    #[default]
    All,
    Overdue,
    Upcoming,
}

impl PendingFilter {
    /// Exact, case-sensitive names. Anything else applies no date filter.
    #[must_use]
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("overdue") => Self::Overdue,
            Some("upcoming") => Self::Upcoming,
            _ => Self::All,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PendingPaymentsParams {
    pub filter: Option<String>,
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentSummary {
    pub id: String,
    pub vendor: String,
    pub amount: f64,
    pub currency: String,
    pub due_date: Option<String>,
    pub status: PaymentStatus,
}

impl From<PaymentRecord> for PaymentSummary {
    fn from(payment: PaymentRecord) -> Self {
        Self {
            id: payment.id,
            vendor: payment.vendor,
            amount: payment.amount,
            currency: payment.currency,
            due_date: payment.due_date,
            status: payment.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingPaymentsOutput {
    pub payments: Vec<PaymentSummary>,
    pub count: usize,
    pub total_amount: f64,
    /// The caller's filter as given, `all` when absent.
    pub filter: String,
}

pub async fn show_pending_payments(
    ctx: &HandlerContext<'_>,
    params: PendingPaymentsParams,
) -> Result<PendingPaymentsOutput, CommandError> {
    let requested = provided(params.filter).unwrap_or_else(|| "all".to_string());
    let filter = PendingFilter::from_name(Some(requested.as_str()));
    let vendor = provided(params.vendor).map(|vendor| vendor.to_lowercase());
    let today = ctx.clock.today();

    let payments: Vec<PaymentSummary> = ctx
        .store
        .list_payments()
        .await
        .into_iter()
        .filter(|payment| payment.status == PaymentStatus::Pending)
        .filter(|payment| {
            vendor
                .as_deref()
                .is_none_or(|needle| payment.vendor.to_lowercase().contains(needle))
        })
        .filter(|payment| {
            let due = payment.due_date.as_deref();
            match filter {
                PendingFilter::All => true,
                PendingFilter::Overdue => due
                    .and_then(parse_due_date)
                    .is_some_and(|due| due < today),
                PendingFilter::Upcoming => match due {
                    None => true,
                    Some(raw) => parse_due_date(raw).is_some_and(|due| due >= today),
                },
            }
        })
        .map(PaymentSummary::from)
        .collect();

    Ok(PendingPaymentsOutput {
        count: payments.len(),
        total_amount: payments.iter().map(|payment| payment.amount).sum(),
        payments,
        filter: requested,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportReportParams {
    pub period: String,
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReportOutput {
    pub filename: String,
    pub format: String,
    pub period: String,
    pub records: usize,
    pub total_amount: f64,
    pub clients: usize,
    pub generated_at: DateTime<Utc>,
    pub download_url: String,
    pub message: String,
}

pub async fn export_report(
    ctx: &HandlerContext<'_>,
    params: ExportReportParams,
) -> Result<ExportReportOutput, CommandError> {
    let now = ctx.clock.now();
    let format = provided(params.format).unwrap_or_else(|| DEFAULT_REPORT_FORMAT.to_string());
    let november_only = params.period.to_lowercase().contains("november");

    let payments: Vec<PaymentRecord> = ctx
        .store
        .list_payments()
        .await
        .into_iter()
        .filter(|payment| {
            !november_only
                || (payment.created_at.month() == 11 && payment.created_at.year() == now.year())
        })
        .collect();
    let clients = ctx.store.list_clients().await.len();

    let filename = format!(
        "flowpay_report_{}_{}.{format}",
        underscore_whitespace(&params.period.to_lowercase()),
        now.timestamp_millis()
    );
    let records = payments.len();
    info!(%filename, records, "report exported");

    Ok(ExportReportOutput {
        download_url: format!("{DOWNLOAD_ROUTE_PREFIX}/{filename}"),
        message: format!("Report exported successfully: {records} records"),
        total_amount: payments.iter().map(|payment| payment.amount).sum(),
        filename,
        format,
        period: params.period,
        records,
        clients,
        generated_at: now,
    })
}

/// Collapses each run of whitespace into one underscore.
fn underscore_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_run = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !in_run {
                out.push('_');
            }
            in_run = true;
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::{
        CreatePaymentParams, ExportReportParams, PendingPaymentsParams,
        create_payment, export_report, show_pending_payments, underscore_whitespace,
    };
    use crate::clock::FixedClock;
    use crate::handlers::HandlerContext;
    use crate::records::PaymentStatus;
    use crate::store::RecordStore;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn payment(vendor: &str, amount: f64, due_date: Option<&str>) -> CreatePaymentParams {
        CreatePaymentParams {
            vendor: vendor.to_string(),
            amount,
            currency: None,
            due_date: due_date.map(str::to_string),
            description: None,
        }
    }

    fn ids(output: &super::PendingPaymentsOutput) -> Vec<&str> {
        output.payments.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn create_payment_applies_defaults_and_is_listed_as_pending() {
        let store = RecordStore::new();
        let clock = FixedClock::new(at(2025, 11, 28));
        let ctx = HandlerContext {
            store: &store,
            clock: &clock,
        };

        let created = create_payment(&ctx, payment("Test Vendor", 5000.0, None))
            .await
            .expect("payment created");
        assert_eq!(created.currency, "INR");
        assert_eq!(created.due_date, None);
        assert_eq!(created.status, PaymentStatus::Pending);
        assert_eq!(created.message, "Payment created successfully for Test Vendor");

        let stored = store.payment_by_id(&created.id).await.expect("stored");
        assert_eq!(stored.description, "");
        assert_eq!(stored.created_at, at(2025, 11, 28));

        let pending = show_pending_payments(&ctx, PendingPaymentsParams::default())
            .await
            .expect("listing works");
        assert_eq!(ids(&pending), vec![created.id.as_str()]);
        assert_eq!(pending.filter, "all");
    }

    #[tokio::test]
    async fn create_payment_rejects_non_positive_amount() {
        let store = RecordStore::new();
        let clock = FixedClock::new(at(2025, 11, 28));
        let ctx = HandlerContext {
            store: &store,
            clock: &clock,
        };
        let error = create_payment(&ctx, payment("Gamma", 0.0, None))
            .await
            .expect_err("zero amount rejected");
        assert_eq!(error.status_code(), 400);
        assert!(store.list_payments().await.is_empty());
    }

    #[tokio::test]
    async fn overdue_and_upcoming_split_on_today() {
        let store = RecordStore::new();
        let clock = FixedClock::new(at(2025, 11, 28));
        let ctx = HandlerContext {
            store: &store,
            clock: &clock,
        };
        let past = create_payment(&ctx, payment("Ditre Italia", 100.0, Some("2025-11-27")))
            .await
            .expect("created");
        let today = create_payment(&ctx, payment("Gamma", 200.0, Some("2025-11-28")))
            .await
            .expect("created");
        let undated = create_payment(&ctx, payment("Acme Corp", 300.0, None))
            .await
            .expect("created");
        let garbled = create_payment(&ctx, payment("Acme Corp", 400.0, Some("soon")))
            .await
            .expect("created");

        let overdue = show_pending_payments(
            &ctx,
            PendingPaymentsParams {
                filter: Some("overdue".to_string()),
                vendor: None,
            },
        )
        .await
        .expect("listing works");
        assert_eq!(ids(&overdue), vec![past.id.as_str()]);
        assert!((overdue.total_amount - 100.0).abs() < f64::EPSILON);

        let upcoming = show_pending_payments(
            &ctx,
            PendingPaymentsParams {
                filter: Some("upcoming".to_string()),
                vendor: None,
            },
        )
        .await
        .expect("listing works");
        assert_eq!(ids(&upcoming), vec![today.id.as_str(), undated.id.as_str()]);
        assert_eq!(upcoming.filter, "upcoming");

        let capitalised = show_pending_payments(
            &ctx,
            PendingPaymentsParams {
                filter: Some("Upcoming".to_string()),
                vendor: None,
            },
        )
        .await
        .expect("listing works");
        assert_eq!(capitalised.filter, "Upcoming");
        assert_eq!(capitalised.count, 4);

        let all = show_pending_payments(&ctx, PendingPaymentsParams::default())
            .await
            .expect("listing works");
        assert_eq!(all.count, 4);
        assert!(ids(&all).contains(&garbled.id.as_str()));
    }

    #[tokio::test]
    async fn vendor_filter_is_case_insensitive_substring_and_skips_paid() {
        let store = RecordStore::with_sample_data();
        let clock = FixedClock::new(at(2025, 11, 28));
        let ctx = HandlerContext {
            store: &store,
            clock: &clock,
        };
        let output = show_pending_payments(
            &ctx,
            PendingPaymentsParams {
                filter: None,
                vendor: Some("GAM".to_string()),
            },
        )
        .await
        .expect("listing works");
        assert_eq!(ids(&output), vec!["p2"]);

        store
            .update_payment("p2", &serde_json::json!({"status": "paid"}))
            .await
            .expect("merge succeeds");
        let output = show_pending_payments(
            &ctx,
            PendingPaymentsParams {
                filter: Some("nonsense".to_string()),
                vendor: Some("gamma".to_string()),
            },
        )
        .await
        .expect("listing works");
        assert_eq!(output.count, 0);
        assert_eq!(output.filter, "nonsense");
    }

    #[tokio::test]
    async fn november_report_covers_current_year_only() {
        let store = RecordStore::with_sample_data();
        let clock = FixedClock::new(at(2025, 12, 2));
        let ctx = HandlerContext {
            store: &store,
            clock: &clock,
        };
        create_payment(&ctx, payment("Gamma", 50.0, None))
            .await
            .expect("december payment");

        let output = export_report(
            &ctx,
            ExportReportParams {
                period: "November".to_string(),
                format: Some("csv".to_string()),
            },
        )
        .await
        .expect("report exported");
        assert_eq!(output.records, 2);
        assert!((output.total_amount - 17_000.0).abs() < f64::EPSILON);
        assert_eq!(output.clients, 3);
        let millis = at(2025, 12, 2).timestamp_millis();
        assert_eq!(output.filename, format!("flowpay_report_november_{millis}.csv"));
        assert_eq!(
            output.download_url,
            format!("/api/agent/download/flowpay_report_november_{millis}.csv")
        );
        assert_eq!(output.message, "Report exported successfully: 2 records");

        let later = FixedClock::new(at(2026, 11, 2));
        let ctx = HandlerContext {
            store: &store,
            clock: &later,
        };
        let output = export_report(
            &ctx,
            ExportReportParams {
                period: "November".to_string(),
                format: None,
            },
        )
        .await
        .expect("report exported");
        assert_eq!(output.records, 0);
        assert_eq!(output.format, "csv");
    }

    #[tokio::test]
    async fn other_periods_export_everything() {
        let store = RecordStore::with_sample_data();
        let clock = FixedClock::new(at(2026, 3, 1));
        let ctx = HandlerContext {
            store: &store,
            clock: &clock,
        };
        let output = export_report(
            &ctx,
            ExportReportParams {
                period: "Last  Quarter".to_string(),
                format: Some("pdf".to_string()),
            },
        )
        .await
        .expect("report exported");
        assert_eq!(output.records, 2);
        assert!(output.filename.starts_with("flowpay_report_last_quarter_"));
        assert!(output.filename.ends_with(".pdf"));
    }

    #[test]
    fn whitespace_runs_collapse_to_one_underscore() {
        assert_eq!(underscore_whitespace("q4 \t 2025"), "q4_2025");
        assert_eq!(underscore_whitespace(" november"), "_november");
    }
}
