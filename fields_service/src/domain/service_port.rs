//! Service port - defines the interface for field engine business logic

use uuid::Uuid;

use crate::domain::error::Result;
use crate::domain::models::{
    ChangeLogEntry, ContextWithDefinition, CreateContextRequest, CreateFieldRequest,
    CreateOptionRequest, DisplayEntry, EffectiveField, FieldContext, FieldDefinition, FieldOption,
    IssueCore, UpdateContextRequest, UpdateFieldRequest, UpdateOptionRequest, UpsertFieldsRequest,
    UpsertFieldsResponse,
};

/// Port for reading the core attributes of an issue
pub trait IssueDirectory: Send + Sync + 'static {
    fn get_core(
        &self,
        issue_id: Uuid,
    ) -> impl std::future::Future<Output = anyhow::Result<Option<IssueCore>>> + Send;
}

/// Port for resolving user display names
pub trait UserDirectory: Send + Sync + 'static {
    fn get_display_name(
        &self,
        user_id: Uuid,
    ) -> impl std::future::Future<Output = anyhow::Result<Option<String>>> + Send;
}

/// Port for resolving priority names
pub trait PriorityDirectory: Send + Sync + 'static {
    fn get_name(
        &self,
        priority_id: &str,
    ) -> impl std::future::Future<Output = anyhow::Result<Option<String>>> + Send;
}

/// The service level interface for the custom field engine
/// Handles field definitions, options, contexts, issue values and history
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait FieldService: Send + Sync + 'static {
    // Field Definition Operations
    fn create_field(
        &self,
        request: CreateFieldRequest,
    ) -> impl std::future::Future<Output = Result<FieldDefinition>> + Send;

    fn get_field(
        &self,
        field_definition_id: Uuid,
    ) -> impl std::future::Future<Output = Result<FieldDefinition>> + Send;

    fn list_fields(&self) -> impl std::future::Future<Output = Result<Vec<FieldDefinition>>> + Send;

    fn update_field(
        &self,
        field_definition_id: Uuid,
        request: UpdateFieldRequest,
    ) -> impl std::future::Future<Output = Result<FieldDefinition>> + Send;

    fn delete_field(
        &self,
        field_definition_id: Uuid,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    // Field Option Operations
    fn create_option(
        &self,
        request: CreateOptionRequest,
    ) -> impl std::future::Future<Output = Result<FieldOption>> + Send;

    fn get_option(
        &self,
        option_id: Uuid,
    ) -> impl std::future::Future<Output = Result<FieldOption>> + Send;

    fn list_options(
        &self,
        field_definition_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<FieldOption>>> + Send;

    fn update_option(
        &self,
        option_id: Uuid,
        request: UpdateOptionRequest,
    ) -> impl std::future::Future<Output = Result<FieldOption>> + Send;

    fn delete_option(&self, option_id: Uuid)
    -> impl std::future::Future<Output = Result<()>> + Send;

    // Field Context Operations
    fn create_context(
        &self,
        request: CreateContextRequest,
    ) -> impl std::future::Future<Output = Result<FieldContext>> + Send;

    fn get_context(
        &self,
        context_id: Uuid,
    ) -> impl std::future::Future<Output = Result<FieldContext>> + Send;

    fn list_contexts(
        &self,
        field_definition_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<FieldContext>>> + Send;

    fn update_context(
        &self,
        context_id: Uuid,
        request: UpdateContextRequest,
    ) -> impl std::future::Future<Output = Result<FieldContext>> + Send;

    fn delete_context(
        &self,
        context_id: Uuid,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Every context applicable to the scope, ordered by definition key, not collapsed
    fn find_applicable_contexts(
        &self,
        project_id: Uuid,
        issue_type_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ContextWithDefinition>>> + Send;

    // Issue Field Operations
    /// The effective fields of an issue, ordered by context display order
    fn resolve_issue_fields(
        &self,
        issue_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<EffectiveField>>> + Send;

    /// Normalize, validate and atomically write a batch of raw values
    fn upsert_fields(
        &self,
        request: UpsertFieldsRequest,
    ) -> impl std::future::Future<Output = Result<UpsertFieldsResponse>> + Send;

    // History Operations
    /// Resolve a raw change log entry into display labels
    fn normalize_change(
        &self,
        entry: ChangeLogEntry,
        definitions: &[FieldDefinition],
    ) -> impl std::future::Future<Output = Result<DisplayEntry>> + Send;

    /// Display-ready change history of an issue, newest first
    fn get_issue_history(
        &self,
        issue_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<DisplayEntry>>> + Send;
}
