use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Anything kept in a [`crate::RecordStore`] table.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: &'static str;

    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cancelled,
}

impl PaymentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Active,
    Dismissed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub vendor: String,
    pub amount: f64,
    pub currency: String,
    pub due_date: Option<String>,
    pub description: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Record for PaymentRecord {
    const KIND: &'static str = "payment";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub wallet_address: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for ClientRecord {
    const KIND: &'static str = "client";

    fn id(&self) -> &str {
        &self.id
    }
}

impl ClientRecord {
    /// Client names are unique ignoring case, Unicode-aware.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name == name || self.name.to_lowercase() == name.to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRecord {
    pub id: String,
    pub message: String,
    pub date: String,
    pub time: String,
    pub status: ReminderStatus,
    pub created_at: DateTime<Utc>,
    /// `low_balance` for reminders raised by the balance check.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
}

impl Record for ReminderRecord {
    const KIND: &'static str = "reminder";

    fn id(&self) -> &str {
        &self.id
    }
}

pub const LOW_BALANCE_KIND: &str = "low_balance";

fn seeded_at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

pub(crate) fn sample_clients() -> Vec<ClientRecord> {
    vec![
        ClientRecord {
            id: "1".to_string(),
            name: "Ditre Italia".to_string(),
            email: Some("contact@ditreitalia.com".to_string()),
            wallet_address: Some("0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb".to_string()),
            phone: Some("+91 9876543210".to_string()),
            created_at: seeded_at(2025, 11, 1, 10, 0),
        },
        ClientRecord {
            id: "2".to_string(),
            name: "Gamma".to_string(),
            email: Some("info@gamma.com".to_string()),
            wallet_address: Some("0x8Ba1f109551bD432803012645Ac136ddd64DBA72".to_string()),
            phone: Some("+91 9876543211".to_string()),
            created_at: seeded_at(2025, 11, 5, 14, 30),
        },
        ClientRecord {
            id: "3".to_string(),
            name: "Acme Corp".to_string(),
            email: Some("sales@acmecorp.com".to_string()),
            wallet_address: None,
            phone: Some("+91 9876543212".to_string()),
            created_at: seeded_at(2025, 11, 10, 9, 15),
        },
    ]
}

pub(crate) fn sample_payments() -> Vec<PaymentRecord> {
    vec![
        PaymentRecord {
            id: "p1".to_string(),
            vendor: "Ditre Italia".to_string(),
            amount: 5000.0,
            currency: "INR".to_string(),
            due_date: Some("2025-12-05".to_string()),
            description: "Monthly service fee".to_string(),
            status: PaymentStatus::Pending,
            created_at: seeded_at(2025, 11, 15, 10, 0),
        },
        PaymentRecord {
            id: "p2".to_string(),
            vendor: "Gamma".to_string(),
            amount: 12000.0,
            currency: "INR".to_string(),
            due_date: Some("2025-11-30".to_string()),
            description: "Project milestone payment".to_string(),
            status: PaymentStatus::Pending,
            created_at: seeded_at(2025, 11, 20, 14, 30),
        },
    ]
}

pub(crate) fn sample_reminders() -> Vec<ReminderRecord> {
    vec![ReminderRecord {
        id: "r1".to_string(),
        message: "Review monthly expenses".to_string(),
        date: "2025-12-01".to_string(),
        time: "10:00".to_string(),
        status: ReminderStatus::Active,
        created_at: seeded_at(2025, 11, 25, 12, 0),
        kind: None,
        payment_id: None,
    }]
}
