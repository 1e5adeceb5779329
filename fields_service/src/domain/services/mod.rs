//! Domain services - concrete implementation of the field service port

mod contexts;
mod definitions;
mod history;
mod options;
mod resolution;
mod upsert;

#[cfg(test)]
mod test;

use uuid::Uuid;

use crate::domain::{
    error::{FieldError, Result},
    models::{
        ChangeLogEntry, ContextWithDefinition, CreateContextRequest, CreateFieldRequest,
        CreateOptionRequest, DisplayEntry, EffectiveField, FieldContext, FieldDefinition,
        FieldOption, IssueCore, UpdateContextRequest, UpdateFieldRequest, UpdateOptionRequest,
        UpsertFieldsRequest, UpsertFieldsResponse,
    },
    ports::{FieldService, FieldStorage, IssueDirectory, PriorityDirectory, UserDirectory},
};

/// Concrete implementation of FieldService
pub struct FieldServiceImpl<S, I, U, P> {
    storage: S,
    issues: I,
    users: U,
    priorities: P,
}

impl<S, I, U, P> FieldServiceImpl<S, I, U, P>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
{
    /// Create a new field service implementation
    pub fn new(storage: S, issues: I, users: U, priorities: P) -> Self {
        Self {
            storage,
            issues,
            users,
            priorities,
        }
    }

    /// Load the core of an issue, NotFound when the directory does not know it
    async fn issue_core(&self, issue_id: Uuid) -> Result<IssueCore> {
        self.issues
            .get_core(issue_id)
            .await
            .map_err(FieldError::Internal)?
            .ok_or_else(|| FieldError::NotFound(format!("Issue {issue_id} not found")))
    }
}

impl<S, I, U, P> FieldService for FieldServiceImpl<S, I, U, P>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    // ===== Field Definition Operations =====

    async fn create_field(&self, request: CreateFieldRequest) -> Result<FieldDefinition> {
        definitions::create_field(self, request).await
    }

    async fn get_field(&self, field_definition_id: Uuid) -> Result<FieldDefinition> {
        definitions::get_field(self, field_definition_id).await
    }

    async fn list_fields(&self) -> Result<Vec<FieldDefinition>> {
        definitions::list_fields(self).await
    }

    async fn update_field(
        &self,
        field_definition_id: Uuid,
        request: UpdateFieldRequest,
    ) -> Result<FieldDefinition> {
        definitions::update_field(self, field_definition_id, request).await
    }

    async fn delete_field(&self, field_definition_id: Uuid) -> Result<()> {
        definitions::delete_field(self, field_definition_id).await
    }

    // ===== Field Option Operations =====

    async fn create_option(&self, request: CreateOptionRequest) -> Result<FieldOption> {
        options::create_option(self, request).await
    }

    async fn get_option(&self, option_id: Uuid) -> Result<FieldOption> {
        options::get_option(self, option_id).await
    }

    async fn list_options(&self, field_definition_id: Uuid) -> Result<Vec<FieldOption>> {
        options::list_options(self, field_definition_id).await
    }

    async fn update_option(
        &self,
        option_id: Uuid,
        request: UpdateOptionRequest,
    ) -> Result<FieldOption> {
        options::update_option(self, option_id, request).await
    }

    async fn delete_option(&self, option_id: Uuid) -> Result<()> {
        options::delete_option(self, option_id).await
    }

    // ===== Field Context Operations =====

    async fn create_context(&self, request: CreateContextRequest) -> Result<FieldContext> {
        contexts::create_context(self, request).await
    }

    async fn get_context(&self, context_id: Uuid) -> Result<FieldContext> {
        contexts::get_context(self, context_id).await
    }

    async fn list_contexts(&self, field_definition_id: Uuid) -> Result<Vec<FieldContext>> {
        contexts::list_contexts(self, field_definition_id).await
    }

    async fn update_context(
        &self,
        context_id: Uuid,
        request: UpdateContextRequest,
    ) -> Result<FieldContext> {
        contexts::update_context(self, context_id, request).await
    }

    async fn delete_context(&self, context_id: Uuid) -> Result<()> {
        contexts::delete_context(self, context_id).await
    }

    async fn find_applicable_contexts(
        &self,
        project_id: Uuid,
        issue_type_id: Uuid,
    ) -> Result<Vec<ContextWithDefinition>> {
        contexts::find_applicable_contexts(self, project_id, issue_type_id).await
    }

    // ===== Issue Field Operations =====

    async fn resolve_issue_fields(&self, issue_id: Uuid) -> Result<Vec<EffectiveField>> {
        resolution::resolve_issue_fields(self, issue_id).await
    }

    async fn upsert_fields(&self, request: UpsertFieldsRequest) -> Result<UpsertFieldsResponse> {
        upsert::upsert_fields(self, request).await
    }

    // ===== History Operations =====

    async fn normalize_change(
        &self,
        entry: ChangeLogEntry,
        definitions: &[FieldDefinition],
    ) -> Result<DisplayEntry> {
        history::normalize_change(self, entry, definitions).await
    }

    async fn get_issue_history(&self, issue_id: Uuid) -> Result<Vec<DisplayEntry>> {
        history::get_issue_history(self, issue_id).await
    }
}
