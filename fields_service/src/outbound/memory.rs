//! In-memory implementation of [FieldStorage].
//!
//! Mirrors the uniqueness and foreign key rules of the Postgres schema. Every
//! mutation happens under one write lock, so a batch of writes is observed either
//! completely or not at all.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::models::{
    ChangeLogEntry, ContextWithDefinition, DataType, FieldContext, FieldDefinition, FieldOption,
    FieldValue, FieldWrite, StoredFieldValue, extensions::sort_options,
};
use crate::domain::ports::FieldStorage;

#[derive(Debug, Error)]
pub enum MemoryStorageError {
    #[error("{kind} {id} does not exist")]
    Missing { kind: &'static str, id: Uuid },
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("value of type {actual} written to {expected} field {field_definition_id}")]
    TypeMismatch {
        field_definition_id: Uuid,
        expected: DataType,
        actual: DataType,
    },
}

type Result<T> = std::result::Result<T, MemoryStorageError>;

#[derive(Debug, Default)]
struct State {
    definitions: HashMap<Uuid, FieldDefinition>,
    options: HashMap<Uuid, FieldOption>,
    contexts: HashMap<Uuid, FieldContext>,
    /// Keyed by (issue id, field definition id)
    values: HashMap<(Uuid, Uuid), StoredFieldValue>,
    /// Append order is chronological
    change_log: Vec<ChangeLogEntry>,
}

impl State {
    fn option_references(&self, option_id: Uuid) -> u64 {
        let defaults = self
            .contexts
            .values()
            .filter(|c| c.constraints.default_option_id == Some(option_id))
            .count();
        let values = self
            .values
            .values()
            .filter_map(|v| v.value.as_ref())
            .filter(|v| v.option_ids().contains(&option_id))
            .count();
        (defaults + values) as u64
    }

    fn check_write(&self, write: &FieldWrite) -> Result<()> {
        let definition = self
            .definitions
            .get(&write.field_definition_id)
            .ok_or_else(|| {
                MemoryStorageError::ForeignKeyViolation(format!(
                    "field definition {} does not exist",
                    write.field_definition_id
                ))
            })?;
        let Some(value) = &write.value else {
            return Ok(());
        };
        if value.data_type() != definition.data_type {
            return Err(MemoryStorageError::TypeMismatch {
                field_definition_id: definition.id,
                expected: definition.data_type,
                actual: value.data_type(),
            });
        }
        for option_id in value.option_ids() {
            if !self.options.contains_key(&option_id) {
                return Err(MemoryStorageError::ForeignKeyViolation(format!(
                    "option {option_id} does not exist"
                )));
            }
        }
        Ok(())
    }
}

/// Field storage kept in process memory
#[derive(Debug, Clone, Default)]
pub struct FieldMemoryStorage {
    state: Arc<RwLock<State>>,
}

impl FieldMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value row as-is, skipping every reference check.
    /// Lets tests reproduce rows that point at options which no longer exist.
    #[cfg(test)]
    pub(crate) async fn insert_raw_value(&self, value: StoredFieldValue) {
        let mut state = self.state.write().await;
        state
            .values
            .insert((value.issue_id, value.field_definition_id), value);
    }

    /// Remove an option without the reference check
    #[cfg(test)]
    pub(crate) async fn force_delete_option(&self, option_id: Uuid) {
        self.state.write().await.options.remove(&option_id);
    }
}

impl FieldStorage for FieldMemoryStorage {
    type Error = MemoryStorageError;

    async fn create_field_definition(&self, definition: FieldDefinition) -> Result<FieldDefinition> {
        let mut state = self.state.write().await;
        if state.definitions.values().any(|d| d.key == definition.key) {
            return Err(MemoryStorageError::UniqueViolation(format!(
                "field key '{}'",
                definition.key
            )));
        }
        state.definitions.insert(definition.id, definition.clone());
        Ok(definition)
    }

    async fn get_field_definition(&self, id: Uuid) -> Result<Option<FieldDefinition>> {
        Ok(self.state.read().await.definitions.get(&id).cloned())
    }

    async fn get_field_definition_by_key(&self, key: &str) -> Result<Option<FieldDefinition>> {
        Ok(self
            .state
            .read()
            .await
            .definitions
            .values()
            .find(|d| d.key == key)
            .cloned())
    }

    async fn get_field_definitions_by_ids(&self, ids: &[Uuid]) -> Result<Vec<FieldDefinition>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.definitions.get(id).cloned())
            .collect())
    }

    async fn list_field_definitions(&self) -> Result<Vec<FieldDefinition>> {
        let mut definitions: Vec<_> = self
            .state
            .read()
            .await
            .definitions
            .values()
            .cloned()
            .collect();
        definitions.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(definitions)
    }

    async fn update_field_definition(&self, definition: FieldDefinition) -> Result<FieldDefinition> {
        let mut state = self.state.write().await;
        if !state.definitions.contains_key(&definition.id) {
            return Err(MemoryStorageError::Missing {
                kind: "field definition",
                id: definition.id,
            });
        }
        if state
            .definitions
            .values()
            .any(|d| d.key == definition.key && d.id != definition.id)
        {
            return Err(MemoryStorageError::UniqueViolation(format!(
                "field key '{}'",
                definition.key
            )));
        }
        state.definitions.insert(definition.id, definition.clone());
        Ok(definition)
    }

    async fn delete_field_definition(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.contexts.values().any(|c| c.field_definition_id == id)
            || state.values.keys().any(|(_, def_id)| *def_id == id)
        {
            return Err(MemoryStorageError::ForeignKeyViolation(format!(
                "field definition {id} is still referenced"
            )));
        }
        state.options.retain(|_, o| o.field_definition_id != id);
        Ok(state.definitions.remove(&id).is_some())
    }

    async fn count_field_values(&self, field_definition_id: Uuid) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .values
            .keys()
            .filter(|(_, def_id)| *def_id == field_definition_id)
            .count() as u64)
    }

    async fn count_field_contexts(&self, field_definition_id: Uuid) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .contexts
            .values()
            .filter(|c| c.field_definition_id == field_definition_id)
            .count() as u64)
    }

    async fn create_field_option(&self, option: FieldOption) -> Result<FieldOption> {
        let mut state = self.state.write().await;
        if !state.definitions.contains_key(&option.field_definition_id) {
            return Err(MemoryStorageError::ForeignKeyViolation(format!(
                "field definition {} does not exist",
                option.field_definition_id
            )));
        }
        state.options.insert(option.id, option.clone());
        Ok(option)
    }

    async fn get_field_option(&self, id: Uuid) -> Result<Option<FieldOption>> {
        Ok(self.state.read().await.options.get(&id).cloned())
    }

    async fn get_field_options(&self, field_definition_id: Uuid) -> Result<Vec<FieldOption>> {
        let mut options: Vec<_> = self
            .state
            .read()
            .await
            .options
            .values()
            .filter(|o| o.field_definition_id == field_definition_id)
            .cloned()
            .collect();
        sort_options(&mut options);
        Ok(options)
    }

    async fn get_field_options_for_definitions(
        &self,
        field_definition_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<FieldOption>>> {
        let state = self.state.read().await;
        let mut catalogs: HashMap<Uuid, Vec<FieldOption>> = HashMap::new();
        for option in state.options.values() {
            if field_definition_ids.contains(&option.field_definition_id) {
                catalogs
                    .entry(option.field_definition_id)
                    .or_default()
                    .push(option.clone());
            }
        }
        for options in catalogs.values_mut() {
            sort_options(options);
        }
        Ok(catalogs)
    }

    async fn get_field_options_by_ids(&self, ids: &[Uuid]) -> Result<Vec<FieldOption>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.options.get(id).cloned())
            .collect())
    }

    async fn update_field_option(&self, option: FieldOption) -> Result<FieldOption> {
        let mut state = self.state.write().await;
        if !state.options.contains_key(&option.id) {
            return Err(MemoryStorageError::Missing {
                kind: "field option",
                id: option.id,
            });
        }
        state.options.insert(option.id, option.clone());
        Ok(option)
    }

    async fn delete_field_option(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.option_references(id) > 0 {
            return Err(MemoryStorageError::ForeignKeyViolation(format!(
                "option {id} is still referenced"
            )));
        }
        Ok(state.options.remove(&id).is_some())
    }

    async fn count_option_references(&self, option_id: Uuid) -> Result<u64> {
        Ok(self.state.read().await.option_references(option_id))
    }

    async fn create_field_context(&self, context: FieldContext) -> Result<FieldContext> {
        let mut state = self.state.write().await;
        if !state.definitions.contains_key(&context.field_definition_id) {
            return Err(MemoryStorageError::ForeignKeyViolation(format!(
                "field definition {} does not exist",
                context.field_definition_id
            )));
        }
        if state.contexts.values().any(|c| {
            c.field_definition_id == context.field_definition_id && c.scope == context.scope
        }) {
            return Err(MemoryStorageError::UniqueViolation(format!(
                "context scope of field definition {}",
                context.field_definition_id
            )));
        }
        state.contexts.insert(context.id, context.clone());
        Ok(context)
    }

    async fn get_field_context(&self, id: Uuid) -> Result<Option<FieldContext>> {
        Ok(self.state.read().await.contexts.get(&id).cloned())
    }

    async fn list_field_contexts(&self, field_definition_id: Uuid) -> Result<Vec<FieldContext>> {
        let mut contexts: Vec<_> = self
            .state
            .read()
            .await
            .contexts
            .values()
            .filter(|c| c.field_definition_id == field_definition_id)
            .cloned()
            .collect();
        contexts.sort_by_key(|c| c.id);
        Ok(contexts)
    }

    async fn update_field_context(&self, context: FieldContext) -> Result<FieldContext> {
        let mut state = self.state.write().await;
        if !state.contexts.contains_key(&context.id) {
            return Err(MemoryStorageError::Missing {
                kind: "field context",
                id: context.id,
            });
        }
        state.contexts.insert(context.id, context.clone());
        Ok(context)
    }

    async fn delete_field_context(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.contexts.remove(&id).is_some())
    }

    async fn find_applicable_contexts(
        &self,
        project_id: Uuid,
        issue_type_id: Uuid,
    ) -> Result<Vec<ContextWithDefinition>> {
        let state = self.state.read().await;
        let mut applicable: Vec<ContextWithDefinition> = state
            .contexts
            .values()
            .filter(|c| c.scope.matches(project_id, issue_type_id))
            .filter_map(|c| {
                state
                    .definitions
                    .get(&c.field_definition_id)
                    .map(|d| ContextWithDefinition {
                        context: c.clone(),
                        definition: d.clone(),
                    })
            })
            .collect();
        applicable.sort_by(|a, b| {
            a.definition
                .key
                .cmp(&b.definition.key)
                .then_with(|| a.context.id.cmp(&b.context.id))
        });
        Ok(applicable)
    }

    async fn get_issue_field_values(&self, issue_id: Uuid) -> Result<Vec<StoredFieldValue>> {
        let state = self.state.read().await;
        Ok(state
            .values
            .values()
            .filter(|v| v.issue_id == issue_id)
            .cloned()
            .collect())
    }

    async fn apply_field_writes(
        &self,
        issue_id: Uuid,
        writes: Vec<FieldWrite>,
        change_log: Option<ChangeLogEntry>,
    ) -> Result<()> {
        let mut state = self.state.write().await;

        // Check everything before the first mutation so a failure leaves no trace
        for write in &writes {
            state.check_write(write)?;
        }

        let now = Utc::now();
        for write in writes {
            let key = (issue_id, write.field_definition_id);
            let value = match write.value {
                None if write.data_type == DataType::MultiOption => {
                    Some(FieldValue::MultiOption(Vec::new()))
                }
                value => value,
            };
            let row = state.values.entry(key).or_insert_with(|| StoredFieldValue {
                id: Uuid::now_v7(),
                issue_id,
                field_definition_id: write.field_definition_id,
                value: None,
                updated_at: now,
            });
            row.value = value;
            row.updated_at = now;
        }

        if let Some(entry) = change_log {
            state.change_log.push(entry);
        }
        Ok(())
    }

    async fn list_change_log(&self, issue_id: Uuid) -> Result<Vec<ChangeLogEntry>> {
        let state = self.state.read().await;
        Ok(state
            .change_log
            .iter()
            .rev()
            .filter(|e| e.issue_id == issue_id)
            .cloned()
            .collect())
    }
}
