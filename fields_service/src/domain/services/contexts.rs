//! Field context service operations

use chrono::Utc;
use uuid::Uuid;

use super::FieldServiceImpl;
use super::definitions::require_definition;
use crate::domain::{
    error::{FieldError, Result},
    models::{
        ContextScope, ContextWithDefinition, CreateContextRequest, FieldDefinition, FieldOption,
        FieldContext, UpdateContextRequest,
        extensions::{apply_context_patch, new_field_context, validate_constraints},
    },
    ports::{FieldStorage, IssueDirectory, PriorityDirectory, UserDirectory},
};

async fn require_context<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    context_id: Uuid,
) -> Result<FieldContext>
where
    S: FieldStorage,
    anyhow::Error: From<S::Error>,
{
    service
        .storage
        .get_field_context(context_id)
        .await
        .map_err(FieldError::internal)?
        .ok_or_else(|| FieldError::NotFound(format!("Field context {context_id} not found")))
}

/// Option catalog used to validate `default_option_id`; empty for scalar types
async fn catalog_for<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    definition: &FieldDefinition,
) -> Result<Vec<FieldOption>>
where
    S: FieldStorage,
    anyhow::Error: From<S::Error>,
{
    if !definition.data_type.is_option_type() {
        return Ok(Vec::new());
    }
    service
        .storage
        .get_field_options(definition.id)
        .await
        .map_err(FieldError::internal)
}

/// Reject a scope that duplicates an existing one, or that shares issues with one of
/// the same specificity (neither would win deterministically by scope alone).
fn check_scope_against(
    definition: &FieldDefinition,
    scope: &ContextScope,
    existing: &[FieldContext],
) -> Result<()> {
    if existing.iter().any(|other| other.scope == *scope) {
        return Err(FieldError::Conflict(format!(
            "Field '{}' already has a context for this project and issue type",
            definition.key
        )));
    }
    for other in existing {
        if other.scope.specificity() == scope.specificity() && other.scope.overlaps(scope) {
            return Err(FieldError::ValidationError(format!(
                "Context would overlap context {} of field '{}' at the same specificity",
                other.id, definition.key
            )));
        }
    }
    Ok(())
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn create_context<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    request: CreateContextRequest,
) -> Result<FieldContext>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    let definition = require_definition(service, request.field_definition_id).await?;
    let scope = ContextScope::new(request.project_id, request.issue_type_id);

    let existing = service
        .storage
        .list_field_contexts(definition.id)
        .await
        .map_err(FieldError::internal)?;
    check_scope_against(&definition, &scope, &existing)?;

    let context = new_field_context(definition.id, scope, request.constraints);
    let options = catalog_for(service, &definition).await?;
    validate_constraints(&definition, &context.constraints, &options)
        .map_err(FieldError::ValidationError)?;

    let created = service
        .storage
        .create_field_context(context)
        .await
        .map_err(FieldError::internal)?;

    tracing::info!(
        context_id = %created.id,
        field_definition_id = %definition.id,
        specificity = created.scope.specificity(),
        "created field context"
    );
    Ok(created)
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn get_context<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    context_id: Uuid,
) -> Result<FieldContext>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    require_context(service, context_id).await
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn list_contexts<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    field_definition_id: Uuid,
) -> Result<Vec<FieldContext>>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    require_definition(service, field_definition_id).await?;
    service
        .storage
        .list_field_contexts(field_definition_id)
        .await
        .map_err(FieldError::internal)
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn update_context<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    context_id: Uuid,
    request: UpdateContextRequest,
) -> Result<FieldContext>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    let mut context = require_context(service, context_id).await?;
    let definition = require_definition(service, context.field_definition_id).await?;

    let constraints = apply_context_patch(&context.constraints, request);
    let options = catalog_for(service, &definition).await?;
    validate_constraints(&definition, &constraints, &options)
        .map_err(FieldError::ValidationError)?;

    context.constraints = constraints;
    context.updated_at = Utc::now();

    service
        .storage
        .update_field_context(context)
        .await
        .map_err(FieldError::internal)
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn delete_context<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    context_id: Uuid,
) -> Result<()>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    let deleted = service
        .storage
        .delete_field_context(context_id)
        .await
        .map_err(FieldError::internal)?;
    if !deleted {
        return Err(FieldError::NotFound(format!(
            "Field context {context_id} not found"
        )));
    }
    tracing::info!(context_id = %context_id, "deleted field context");
    Ok(())
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn find_applicable_contexts<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    project_id: Uuid,
    issue_type_id: Uuid,
) -> Result<Vec<ContextWithDefinition>>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    service
        .storage
        .find_applicable_contexts(project_id, issue_type_id)
        .await
        .map_err(FieldError::internal)
}
