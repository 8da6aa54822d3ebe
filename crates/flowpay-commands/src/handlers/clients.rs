use serde::{Deserialize, Serialize};
use tracing::info;

use super::{HandlerContext, new_record_id, provided};
use crate::error::CommandError;
use crate::records::ClientRecord;

#[derive(Debug, Clone, Deserialize)]
pub struct AddClientParams {
    pub name: String,
    pub email: Option<String>,
    #[serde(alias = "walletAddress")]
    pub wallet_address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddClientOutput {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub message: String,
}

pub async fn add_client(
    ctx: &HandlerContext<'_>,
    params: AddClientParams,
) -> Result<AddClientOutput, CommandError> {
    let client = ctx
        .store
        .add_client(ClientRecord {
            id: new_record_id("cli"),
            name: params.name,
            email: provided(params.email),
            wallet_address: provided(params.wallet_address),
            phone: provided(params.phone),
            created_at: ctx.clock.now(),
        })
        .await?;
    info!(client_id = %client.id, name = %client.name, "client added");

    Ok(AddClientOutput {
        message: format!("Client {} added successfully", client.name),
        id: client.id,
        name: client.name,
        email: client.email,
    })
}

#[cfg(test)]
mod tests {
    use super::{AddClientParams, add_client};
    use crate::clock::SystemClock;
    use crate::error::CommandError;
    use crate::handlers::HandlerContext;
    use crate::store::RecordStore;

    fn params(name: &str) -> AddClientParams {
        AddClientParams {
            name: name.to_string(),
            email: Some("test@testclient.com".to_string()),
            wallet_address: None,
            phone: Some(String::new()),
        }
    }

    #[tokio::test]
    async fn adds_client_once_per_name() {
        let store = RecordStore::new();
        let ctx = HandlerContext {
            store: &store,
            clock: &SystemClock,
        };

        let added = add_client(&ctx, params("Test Client Inc"))
            .await
            .expect("client added");
        assert_eq!(added.message, "Client Test Client Inc added successfully");
        assert_eq!(added.email.as_deref(), Some("test@testclient.com"));

        let stored = store.client_by_id(&added.id).await.expect("stored");
        assert_eq!(stored.phone, None);

        let error = add_client(&ctx, params("test client inc"))
            .await
            .expect_err("duplicate rejected");
        assert!(matches!(error, CommandError::DuplicateClient { .. }));
        assert_eq!(error.status_code(), 400);
        assert_eq!(store.list_clients().await.len(), 1);
    }
}
