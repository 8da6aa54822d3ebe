use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::records::{
    ClientRecord, PaymentRecord, PaymentStatus, Record, ReminderRecord, sample_clients,
    sample_payments, sample_reminders,
};

#[derive(Debug, thiserror::Error)]
pub enum RecordStoreError {
    #[error("{kind} update must be a JSON object")]
    InvalidPatch { kind: &'static str },
    #[error("{kind} {id}: {message}")]
    InvalidUpdate {
        kind: &'static str,
        id: String,
        message: String,
    },
    #[error("Client already exists: {name}")]
    DuplicateClient { name: String },
}

/// Ordered collection of one record kind. Insertion order is list order.
#[derive(Debug, Clone)]
struct Table<E> {
    rows: Vec<E>,
}

impl<E> Default for Table<E> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<E: Record> Table<E> {
    fn from_rows(rows: Vec<E>) -> Self {
        Self { rows }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.id() == id)
    }

    fn get(&self, id: &str) -> Option<E> {
        self.rows.iter().find(|row| row.id() == id).cloned()
    }

    fn push(&mut self, row: E) -> E {
        self.rows.push(row.clone());
        row
    }

    fn update(&mut self, id: &str, patch: &Value) -> Result<Option<E>, RecordStoreError> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };
        let merged = merge_record(&self.rows[index], patch)?;
        self.rows[index] = merged.clone();
        Ok(Some(merged))
    }

    fn remove(&mut self, id: &str) -> Option<E> {
        let index = self.position(id)?;
        Some(self.rows.remove(index))
    }
}

/// Shallow merge: top-level keys in `patch` replace the record's fields. `id` never changes.
fn merge_record<E: Record>(record: &E, patch: &Value) -> Result<E, RecordStoreError> {
    let Value::Object(patch) = patch else {
        return Err(RecordStoreError::InvalidPatch { kind: E::KIND });
    };
    let invalid = |error: serde_json::Error| RecordStoreError::InvalidUpdate {
        kind: E::KIND,
        id: record.id().to_string(),
        message: error.to_string(),
    };

    let mut fields = match serde_json::to_value(record).map_err(invalid)? {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    for (key, value) in patch {
        if key == "id" {
            continue;
        }
        fields.insert(key.clone(), value.clone());
    }
    serde_json::from_value(Value::Object(fields)).map_err(invalid)
}

#[derive(Debug, Clone, Default)]
struct RecordStoreState {
    payments: Table<PaymentRecord>,
    clients: Table<ClientRecord>,
    reminders: Table<ReminderRecord>,
}

impl RecordStoreState {
    fn seeded() -> Self {
        Self {
            payments: Table::from_rows(sample_payments()),
            clients: Table::from_rows(sample_clients()),
            reminders: Table::from_rows(sample_reminders()),
        }
    }

    fn client_name_taken(&self, name: &str, except_id: Option<&str>) -> bool {
        self.clients
            .rows
            .iter()
            .any(|client| client.has_name(name) && Some(client.id.as_str()) != except_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub payments: usize,
    pub pending_payments: usize,
    pub clients: usize,
    pub reminders: usize,
}

/// In-process record store shared by every request handler.
///
/// Reads hand back owned copies, so callers can never mutate stored rows in place.
#[derive(Clone, Default)]
pub struct RecordStore {
    state: Arc<RwLock<RecordStoreState>>,
    seeded: bool,
}

impl RecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the demo clients, payments and reminder.
    #[must_use]
    pub fn with_sample_data() -> Self {
        Self {
            state: Arc::new(RwLock::new(RecordStoreState::seeded())),
            seeded: true,
        }
    }

    pub async fn list_payments(&self) -> Vec<PaymentRecord> {
        self.state.read().await.payments.rows.clone()
    }

    pub async fn payment_by_id(&self, id: &str) -> Option<PaymentRecord> {
        self.state.read().await.payments.get(id)
    }

    pub async fn add_payment(&self, payment: PaymentRecord) -> PaymentRecord {
        self.state.write().await.payments.push(payment)
    }

    pub async fn update_payment(
        &self,
        id: &str,
        patch: &Value,
    ) -> Result<Option<PaymentRecord>, RecordStoreError> {
        self.mutate(|state| state.payments.update(id, patch)).await
    }

    pub async fn delete_payment(&self, id: &str) -> Option<PaymentRecord> {
        self.state.write().await.payments.remove(id)
    }

    pub async fn list_clients(&self) -> Vec<ClientRecord> {
        self.state.read().await.clients.rows.clone()
    }

    pub async fn client_by_id(&self, id: &str) -> Option<ClientRecord> {
        self.state.read().await.clients.get(id)
    }

    pub async fn client_by_name(&self, name: &str) -> Option<ClientRecord> {
        self.state
            .read()
            .await
            .clients
            .rows
            .iter()
            .find(|client| client.has_name(name))
            .cloned()
    }

    /// Inserts a client unless another client already uses the name.
    pub async fn add_client(&self, client: ClientRecord) -> Result<ClientRecord, RecordStoreError> {
        self.mutate(|state| {
            if state.client_name_taken(&client.name, None) {
                return Err(RecordStoreError::DuplicateClient {
                    name: client.name.clone(),
                });
            }
            Ok(state.clients.push(client))
        })
        .await
    }

    pub async fn update_client(
        &self,
        id: &str,
        patch: &Value,
    ) -> Result<Option<ClientRecord>, RecordStoreError> {
        self.mutate(|state| {
            let renamed = patch.get("name").and_then(Value::as_str);
            if let Some(name) = renamed {
                if state.client_name_taken(name, Some(id)) {
                    return Err(RecordStoreError::DuplicateClient {
                        name: name.to_string(),
                    });
                }
            }
            state.clients.update(id, patch)
        })
        .await
    }

    pub async fn delete_client(&self, id: &str) -> Option<ClientRecord> {
        self.state.write().await.clients.remove(id)
    }

    pub async fn list_reminders(&self) -> Vec<ReminderRecord> {
        self.state.read().await.reminders.rows.clone()
    }

    pub async fn reminder_by_id(&self, id: &str) -> Option<ReminderRecord> {
        self.state.read().await.reminders.get(id)
    }

    pub async fn add_reminder(&self, reminder: ReminderRecord) -> ReminderRecord {
        self.state.write().await.reminders.push(reminder)
    }

    /// Appends a batch under a single write lock.
    pub async fn add_reminders(&self, reminders: Vec<ReminderRecord>) -> Vec<ReminderRecord> {
        let mut state = self.state.write().await;
        reminders
            .into_iter()
            .map(|reminder| state.reminders.push(reminder))
            .collect()
    }

    pub async fn update_reminder(
        &self,
        id: &str,
        patch: &Value,
    ) -> Result<Option<ReminderRecord>, RecordStoreError> {
        self.mutate(|state| state.reminders.update(id, patch)).await
    }

    pub async fn delete_reminder(&self, id: &str) -> Option<ReminderRecord> {
        self.state.write().await.reminders.remove(id)
    }

    /// Puts every table back to how the store started: the sample rows for a
    /// seeded store, nothing otherwise.
    pub async fn reset(&self) {
        let initial = if self.seeded {
            RecordStoreState::seeded()
        } else {
            RecordStoreState::default()
        };
        *self.state.write().await = initial;
    }

    pub async fn stats(&self) -> StoreStats {
        let state = self.state.read().await;
        StoreStats {
            payments: state.payments.rows.len(),
            pending_payments: state
                .payments
                .rows
                .iter()
                .filter(|payment| payment.status == PaymentStatus::Pending)
                .count(),
            clients: state.clients.rows.len(),
            reminders: state.reminders.rows.len(),
        }
    }

    async fn mutate<T, F>(&self, operation: F) -> Result<T, RecordStoreError>
    where
        F: FnOnce(&mut RecordStoreState) -> Result<T, RecordStoreError>,
    {
        let mut state = self.state.write().await;
        operation(&mut state)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::{RecordStore, RecordStoreError, StoreStats};
    use crate::records::{ClientRecord, PaymentStatus};

    fn client(id: &str, name: &str) -> ClientRecord {
        ClientRecord {
            id: id.to_string(),
            name: name.to_string(),
            email: None,
            wallet_address: None,
            phone: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn sample_data_is_seeded_in_order() {
        let store = RecordStore::with_sample_data();
        let ids: Vec<String> = store
            .list_payments()
            .await
            .into_iter()
            .map(|payment| payment.id)
            .collect();
        assert_eq!(ids, vec!["p1".to_string(), "p2".to_string()]);
        assert_eq!(
            store.stats().await,
            StoreStats {
                payments: 2,
                pending_payments: 2,
                clients: 3,
                reminders: 1,
            }
        );
    }

    #[tokio::test]
    async fn listed_rows_are_copies() {
        let store = RecordStore::with_sample_data();
        let mut payments = store.list_payments().await;
        payments[0].amount = 1.0;
        payments.clear();

        let stored = store.payment_by_id("p1").await.expect("p1 exists");
        assert!((stored.amount - 5000.0).abs() < f64::EPSILON);
        assert_eq!(store.list_payments().await.len(), 2);
    }

    #[tokio::test]
    async fn update_merges_top_level_fields_and_keeps_id() {
        let store = RecordStore::with_sample_data();
        let updated = store
            .update_payment("p2", &json!({"status": "paid", "id": "hijacked"}))
            .await
            .expect("merge succeeds")
            .expect("p2 exists");
        assert_eq!(updated.id, "p2");
        assert_eq!(updated.status, PaymentStatus::Paid);
        assert_eq!(updated.vendor, "Gamma");
        assert!(store.payment_by_id("hijacked").await.is_none());
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_absent_not_error() {
        let store = RecordStore::new();
        let result = store
            .update_reminder("missing", &json!({"status": "dismissed"}))
            .await
            .expect("no error for unknown id");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_rejects_patch_that_breaks_record_shape() {
        let store = RecordStore::with_sample_data();
        let error = store
            .update_payment("p1", &json!({"amount": "lots"}))
            .await
            .expect_err("amount must stay numeric");
        assert!(matches!(error, RecordStoreError::InvalidUpdate { .. }));
        let error = store
            .update_payment("p1", &json!(["status"]))
            .await
            .expect_err("patch must be object");
        assert!(matches!(error, RecordStoreError::InvalidPatch { kind: "payment" }));
    }

    #[tokio::test]
    async fn delete_returns_removed_row_once() {
        let store = RecordStore::with_sample_data();
        let removed = store.delete_client("2").await.expect("client 2 exists");
        assert_eq!(removed.name, "Gamma");
        assert!(store.delete_client("2").await.is_none());
        assert_eq!(store.list_clients().await.len(), 2);
    }

    #[tokio::test]
    async fn client_names_are_unique_ignoring_case() {
        let store = RecordStore::with_sample_data();
        assert_eq!(
            store.client_by_name("acme corp").await.map(|c| c.id),
            Some("3".to_string())
        );

        let error = store
            .add_client(client("c9", "GAMMA"))
            .await
            .expect_err("duplicate name rejected");
        assert_eq!(error.to_string(), "Client already exists: GAMMA");

        let error = store
            .update_client("3", &json!({"name": "ditre italia"}))
            .await
            .expect_err("rename onto existing name rejected");
        assert!(matches!(error, RecordStoreError::DuplicateClient { .. }));

        store
            .update_client("3", &json!({"name": "ACME CORP"}))
            .await
            .expect("renaming to own name is fine");
    }

    #[tokio::test]
    async fn client_name_matching_folds_non_ascii_case() {
        let store = RecordStore::new();
        store
            .add_client(client("c1", "Émile Café"))
            .await
            .expect("first client added");

        let found = store.client_by_name("ÉMILE CAFÉ").await;
        assert_eq!(found.map(|c| c.id), Some("c1".to_string()));

        let error = store
            .add_client(client("c2", "émile café"))
            .await
            .expect_err("same name in another case rejected");
        assert!(matches!(error, RecordStoreError::DuplicateClient { .. }));
        assert_eq!(store.list_clients().await.len(), 1);
    }

    #[tokio::test]
    async fn update_client_patches_wallet_address() {
        let store = RecordStore::with_sample_data();
        let updated = store
            .update_client("3", &json!({"wallet_address": "0xNEW"}))
            .await
            .expect("merge succeeds")
            .expect("client 3 exists");
        assert_eq!(updated.wallet_address.as_deref(), Some("0xNEW"));

        let stored = store.client_by_id("3").await.expect("client 3 exists");
        assert_eq!(stored.wallet_address.as_deref(), Some("0xNEW"));
        assert_eq!(stored.name, "Acme Corp");
    }

    #[tokio::test]
    async fn reset_restores_initial_rows() {
        let store = RecordStore::with_sample_data();
        store
            .update_payment("p1", &json!({"status": "paid"}))
            .await
            .expect("merge succeeds");
        store.delete_client("1").await;
        store.reset().await;
        assert_eq!(
            store.stats().await,
            StoreStats {
                payments: 2,
                pending_payments: 2,
                clients: 3,
                reminders: 1,
            }
        );

        let empty = RecordStore::new();
        empty.add_client(client("c1", "Solo")).await.expect("insert");
        empty.reset().await;
        assert!(empty.list_clients().await.is_empty());
    }
}
