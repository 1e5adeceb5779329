//! PostgreSQL implementation of the storage port
//! Maps SQL rows through the models_fields::db row types into domain models

mod contexts;
mod definitions;
mod history;
mod options;
mod values;


use std::collections::HashMap;

use models_fields::db::DbConversionError;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::{
    ChangeLogEntry, ContextWithDefinition, FieldContext, FieldDefinition, FieldOption, FieldWrite,
    StoredFieldValue,
};
use crate::domain::ports::FieldStorage;

/// PostgreSQL storage implementation for the field engine
#[derive(Debug, Clone)]
pub struct FieldsPgStorage {
    pool: PgPool,
}

/// Error type for field storage operations
#[derive(Debug, Error)]
pub enum FieldsStorageError {
    /// Database error
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    /// A row could not be converted into its domain form
    #[error(transparent)]
    Conversion(#[from] DbConversionError),
}

impl FieldsPgStorage {
    /// Create a new PostgreSQL field storage
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl FieldStorage for FieldsPgStorage {
    type Error = FieldsStorageError;

    // Field definition operations
    async fn create_field_definition(
        &self,
        definition: FieldDefinition,
    ) -> Result<FieldDefinition, Self::Error> {
        definitions::create_field_definition(&self.pool, definition).await
    }

    async fn get_field_definition(&self, id: Uuid) -> Result<Option<FieldDefinition>, Self::Error> {
        definitions::get_field_definition(&self.pool, id).await
    }

    async fn get_field_definition_by_key(
        &self,
        key: &str,
    ) -> Result<Option<FieldDefinition>, Self::Error> {
        definitions::get_field_definition_by_key(&self.pool, key).await
    }

    async fn get_field_definitions_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<FieldDefinition>, Self::Error> {
        definitions::get_field_definitions_by_ids(&self.pool, ids).await
    }

    async fn list_field_definitions(&self) -> Result<Vec<FieldDefinition>, Self::Error> {
        definitions::list_field_definitions(&self.pool).await
    }

    async fn update_field_definition(
        &self,
        definition: FieldDefinition,
    ) -> Result<FieldDefinition, Self::Error> {
        definitions::update_field_definition(&self.pool, definition).await
    }

    async fn delete_field_definition(&self, id: Uuid) -> Result<bool, Self::Error> {
        definitions::delete_field_definition(&self.pool, id).await
    }

    async fn count_field_values(&self, field_definition_id: Uuid) -> Result<u64, Self::Error> {
        definitions::count_field_values(&self.pool, field_definition_id).await
    }

    async fn count_field_contexts(&self, field_definition_id: Uuid) -> Result<u64, Self::Error> {
        definitions::count_field_contexts(&self.pool, field_definition_id).await
    }

    // Field option operations
    async fn create_field_option(&self, option: FieldOption) -> Result<FieldOption, Self::Error> {
        options::create_field_option(&self.pool, option).await
    }

    async fn get_field_option(&self, id: Uuid) -> Result<Option<FieldOption>, Self::Error> {
        options::get_field_option(&self.pool, id).await
    }

    async fn get_field_options(
        &self,
        field_definition_id: Uuid,
    ) -> Result<Vec<FieldOption>, Self::Error> {
        options::get_field_options(&self.pool, field_definition_id).await
    }

    async fn get_field_options_for_definitions(
        &self,
        field_definition_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<FieldOption>>, Self::Error> {
        options::get_field_options_for_definitions(&self.pool, field_definition_ids).await
    }

    async fn get_field_options_by_ids(&self, ids: &[Uuid]) -> Result<Vec<FieldOption>, Self::Error> {
        options::get_field_options_by_ids(&self.pool, ids).await
    }

    async fn update_field_option(&self, option: FieldOption) -> Result<FieldOption, Self::Error> {
        options::update_field_option(&self.pool, option).await
    }

    async fn delete_field_option(&self, id: Uuid) -> Result<bool, Self::Error> {
        options::delete_field_option(&self.pool, id).await
    }

    async fn count_option_references(&self, option_id: Uuid) -> Result<u64, Self::Error> {
        options::count_option_references(&self.pool, option_id).await
    }

    // Field context operations
    async fn create_field_context(&self, context: FieldContext) -> Result<FieldContext, Self::Error> {
        contexts::create_field_context(&self.pool, context).await
    }

    async fn get_field_context(&self, id: Uuid) -> Result<Option<FieldContext>, Self::Error> {
        contexts::get_field_context(&self.pool, id).await
    }

    async fn list_field_contexts(
        &self,
        field_definition_id: Uuid,
    ) -> Result<Vec<FieldContext>, Self::Error> {
        contexts::list_field_contexts(&self.pool, field_definition_id).await
    }

    async fn update_field_context(&self, context: FieldContext) -> Result<FieldContext, Self::Error> {
        contexts::update_field_context(&self.pool, context).await
    }

    async fn delete_field_context(&self, id: Uuid) -> Result<bool, Self::Error> {
        contexts::delete_field_context(&self.pool, id).await
    }

    async fn find_applicable_contexts(
        &self,
        project_id: Uuid,
        issue_type_id: Uuid,
    ) -> Result<Vec<ContextWithDefinition>, Self::Error> {
        contexts::find_applicable_contexts(&self.pool, project_id, issue_type_id).await
    }

    // Field value operations
    async fn get_issue_field_values(
        &self,
        issue_id: Uuid,
    ) -> Result<Vec<StoredFieldValue>, Self::Error> {
        values::get_issue_field_values(&self.pool, issue_id).await
    }

    async fn apply_field_writes(
        &self,
        issue_id: Uuid,
        writes: Vec<FieldWrite>,
        change_log: Option<ChangeLogEntry>,
    ) -> Result<(), Self::Error> {
        values::apply_field_writes(&self.pool, issue_id, writes, change_log).await
    }

    async fn list_change_log(&self, issue_id: Uuid) -> Result<Vec<ChangeLogEntry>, Self::Error> {
        history::list_change_log(&self.pool, issue_id).await
    }
}
