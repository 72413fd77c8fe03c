//! # Ad Account Repository

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use super::AdAccountStore;
use crate::error::RepositoryError;
use crate::models::ad_account::{
    AccountStatus, ActiveModel as AdAccountActiveModel, Column, Entity as AdAccount,
    Model as AdAccountModel,
};

#[derive(Debug, Clone)]
pub struct AdAccountRepository {
    db: Arc<DatabaseConnection>,
}

impl AdAccountRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        account: AdAccountActiveModel,
    ) -> Result<AdAccountModel, RepositoryError> {
        account
            .insert(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find(&self, id: &str) -> Result<Option<AdAccountModel>, RepositoryError> {
        AdAccount::find_by_id(id.to_string())
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

#[async_trait]
impl AdAccountStore for AdAccountRepository {
    async fn list_active(&self) -> Result<Vec<AdAccountModel>, RepositoryError> {
        AdAccount::find()
            .filter(Column::Status.eq(AccountStatus::Active))
            .order_by_asc(Column::Id)
            .all(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}
