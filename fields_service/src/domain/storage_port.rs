//! Storage port - defines the interface for field engine persistence operations

use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::models::{
    ChangeLogEntry, ContextWithDefinition, FieldContext, FieldDefinition, FieldOption, FieldWrite,
    StoredFieldValue,
};

/// Storage port for all field-related persistence operations
pub trait FieldStorage: Send + Sync + 'static {
    /// Error type for storage operations
    type Error: Send + Sync + std::error::Error;

    // Field Definition Operations
    fn create_field_definition(
        &self,
        definition: FieldDefinition,
    ) -> impl Future<Output = Result<FieldDefinition, Self::Error>> + Send;

    fn get_field_definition(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<FieldDefinition>, Self::Error>> + Send;

    fn get_field_definition_by_key(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<FieldDefinition>, Self::Error>> + Send;

    /// Definitions for the given ids; unknown ids are absent from the result
    fn get_field_definitions_by_ids(
        &self,
        ids: &[Uuid],
    ) -> impl Future<Output = Result<Vec<FieldDefinition>, Self::Error>> + Send;

    /// All definitions ordered by key
    fn list_field_definitions(
        &self,
    ) -> impl Future<Output = Result<Vec<FieldDefinition>, Self::Error>> + Send;

    fn update_field_definition(
        &self,
        definition: FieldDefinition,
    ) -> impl Future<Output = Result<FieldDefinition, Self::Error>> + Send;

    /// Removes the definition and its options
    fn delete_field_definition(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    fn count_field_values(
        &self,
        field_definition_id: Uuid,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    fn count_field_contexts(
        &self,
        field_definition_id: Uuid,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    // Field Option Operations
    fn create_field_option(
        &self,
        option: FieldOption,
    ) -> impl Future<Output = Result<FieldOption, Self::Error>> + Send;

    fn get_field_option(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<FieldOption>, Self::Error>> + Send;

    /// Options of one definition ordered by display order, then id
    fn get_field_options(
        &self,
        field_definition_id: Uuid,
    ) -> impl Future<Output = Result<Vec<FieldOption>, Self::Error>> + Send;

    /// Option catalogs of several definitions in one round trip, each ordered like [FieldStorage::get_field_options]
    fn get_field_options_for_definitions(
        &self,
        field_definition_ids: &[Uuid],
    ) -> impl Future<Output = Result<HashMap<Uuid, Vec<FieldOption>>, Self::Error>> + Send;

    fn get_field_options_by_ids(
        &self,
        ids: &[Uuid],
    ) -> impl Future<Output = Result<Vec<FieldOption>, Self::Error>> + Send;

    fn update_field_option(
        &self,
        option: FieldOption,
    ) -> impl Future<Output = Result<FieldOption, Self::Error>> + Send;

    fn delete_field_option(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Number of context defaults, stored OPTION values and MULTI_OPTION rows pointing at the option
    fn count_option_references(
        &self,
        option_id: Uuid,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    // Field Context Operations
    fn create_field_context(
        &self,
        context: FieldContext,
    ) -> impl Future<Output = Result<FieldContext, Self::Error>> + Send;

    fn get_field_context(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<FieldContext>, Self::Error>> + Send;

    fn list_field_contexts(
        &self,
        field_definition_id: Uuid,
    ) -> impl Future<Output = Result<Vec<FieldContext>, Self::Error>> + Send;

    fn update_field_context(
        &self,
        context: FieldContext,
    ) -> impl Future<Output = Result<FieldContext, Self::Error>> + Send;

    fn delete_field_context(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Every context whose scope matches, with its definition, ordered by definition key.
    /// No collapsing of several contexts for one field happens here.
    fn find_applicable_contexts(
        &self,
        project_id: Uuid,
        issue_type_id: Uuid,
    ) -> impl Future<Output = Result<Vec<ContextWithDefinition>, Self::Error>> + Send;

    // Field Value Operations
    /// Every stored value of the issue, MULTI_OPTION selections included, in one pass
    fn get_issue_field_values(
        &self,
        issue_id: Uuid,
    ) -> impl Future<Output = Result<Vec<StoredFieldValue>, Self::Error>> + Send;

    /// Applies every write and the optional change log entry as one atomic unit.
    /// Readers observe either none or all of it.
    fn apply_field_writes(
        &self,
        issue_id: Uuid,
        writes: Vec<FieldWrite>,
        change_log: Option<ChangeLogEntry>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Change log of the issue, newest first
    fn list_change_log(
        &self,
        issue_id: Uuid,
    ) -> impl Future<Output = Result<Vec<ChangeLogEntry>, Self::Error>> + Send;
}
