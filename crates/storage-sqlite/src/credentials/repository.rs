use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use uuid::Uuid;

use keyrelay_core::credentials::{
    Credential, CredentialEvent, CredentialRepositoryTrait, EventOutcome, NewCredential,
};
use keyrelay_core::errors::{Error, Result};

use super::model::CredentialDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::credentials;
use crate::schema::credentials::dsl::*;

pub struct CredentialRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl CredentialRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        CredentialRepository { pool, writer }
    }

    /// Looks a credential up by its unique (provider, name) pair.
    pub fn find_by_name(&self, provider_name: &str, key_name: &str) -> Result<Option<Credential>> {
        let mut conn = get_connection(&self.pool)?;
        credentials
            .filter(provider.eq(provider_name))
            .filter(name.eq(key_name))
            .select(CredentialDB::as_select())
            .first::<CredentialDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(Credential::try_from)
            .transpose()
    }
}

fn load_for_update(conn: &mut SqliteConnection, credential_id: &str) -> Result<CredentialDB> {
    credentials
        .find(credential_id)
        .select(CredentialDB::as_select())
        .first::<CredentialDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .ok_or_else(|| Error::CredentialNotFound(credential_id.to_string()))
}

#[async_trait]
impl CredentialRepositoryTrait for CredentialRepository {
    fn list_for_provider(&self, provider_name: &str) -> Result<Vec<Credential>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = credentials
            .filter(provider.eq(provider_name))
            .order((priority.asc(), created_at.asc(), id.asc()))
            .select(CredentialDB::as_select())
            .load::<CredentialDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(Credential::try_from).collect()
    }

    fn get_credential(&self, credential_id: &str) -> Result<Credential> {
        let mut conn = get_connection(&self.pool)?;
        credentials
            .find(credential_id)
            .select(CredentialDB::as_select())
            .first::<CredentialDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .ok_or_else(|| Error::CredentialNotFound(credential_id.to_string()))
            .and_then(Credential::try_from)
    }

    fn list_providers(&self) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(credentials
            .select(provider)
            .distinct()
            .order(provider.asc())
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?)
    }

    async fn create_credential(&self, new_credential: NewCredential) -> Result<Credential> {
        new_credential.validate()?;
        let credential_id = new_credential
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let credential_db: CredentialDB = new_credential
            .into_credential(credential_id, Utc::now())
            .into();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Credential> {
                let result_db = diesel::insert_into(credentials::table)
                    .values(&credential_db)
                    .returning(CredentialDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Credential::try_from(result_db)
            })
            .await
    }

    async fn apply_event(
        &self,
        credential_id: &str,
        event: CredentialEvent,
        at: DateTime<Utc>,
    ) -> Result<EventOutcome> {
        let credential_id = credential_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<EventOutcome> {
                let mut credential = Credential::try_from(load_for_update(conn, &credential_id)?)?;
                let previous_status = credential.apply(event, at);

                let credential_db = CredentialDB::from(credential.clone());
                diesel::update(credentials.find(&credential_id))
                    .set(&credential_db)
                    .execute(conn)
                    .map_err(StorageError::from)?;

                Ok(EventOutcome {
                    credential,
                    previous_status,
                })
            })
            .await
    }
}
