//! Field option service operations

use chrono::Utc;
use uuid::Uuid;

use super::FieldServiceImpl;
use super::definitions::require_definition;
use crate::domain::{
    error::{FieldError, Result},
    models::{
        CreateOptionRequest, FieldOption, UpdateOptionRequest,
        extensions::{new_field_option, sort_options, validate_field_option},
    },
    ports::{FieldStorage, IssueDirectory, PriorityDirectory, UserDirectory},
};

async fn require_option<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    option_id: Uuid,
) -> Result<FieldOption>
where
    S: FieldStorage,
    anyhow::Error: From<S::Error>,
{
    service
        .storage
        .get_field_option(option_id)
        .await
        .map_err(FieldError::internal)?
        .ok_or_else(|| FieldError::NotFound(format!("Field option {option_id} not found")))
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn create_option<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    request: CreateOptionRequest,
) -> Result<FieldOption>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    let definition = require_definition(service, request.field_definition_id).await?;
    if !definition.data_type.is_option_type() {
        return Err(FieldError::ValidationError(format!(
            "Field '{}' has data type {} and cannot have options",
            definition.key, definition.data_type
        )));
    }

    let option = new_field_option(
        definition.id,
        request.key,
        request.value,
        request.display_order,
    );
    validate_field_option(&option).map_err(FieldError::ValidationError)?;

    let created = service
        .storage
        .create_field_option(option)
        .await
        .map_err(FieldError::internal)?;

    tracing::info!(option_id = %created.id, field_definition_id = %definition.id, "created field option");
    Ok(created)
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn get_option<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    option_id: Uuid,
) -> Result<FieldOption>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    require_option(service, option_id).await
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn list_options<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    field_definition_id: Uuid,
) -> Result<Vec<FieldOption>>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    require_definition(service, field_definition_id).await?;

    let mut options = service
        .storage
        .get_field_options(field_definition_id)
        .await
        .map_err(FieldError::internal)?;
    sort_options(&mut options);
    Ok(options)
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn update_option<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    option_id: Uuid,
    request: UpdateOptionRequest,
) -> Result<FieldOption>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    let mut option = require_option(service, option_id).await?;

    if let Some(key) = request.key {
        option.key = key.trim().to_string();
    }
    if let Some(value) = request.value {
        option.value = value.trim().to_string();
    }
    if let Some(display_order) = request.display_order {
        option.display_order = display_order;
    }
    validate_field_option(&option).map_err(FieldError::ValidationError)?;
    option.updated_at = Utc::now();

    service
        .storage
        .update_field_option(option)
        .await
        .map_err(FieldError::internal)
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn delete_option<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    option_id: Uuid,
) -> Result<()>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    let option = require_option(service, option_id).await?;

    let references = service
        .storage
        .count_option_references(option_id)
        .await
        .map_err(FieldError::internal)?;
    if references > 0 {
        return Err(FieldError::Conflict(format!(
            "Option '{}' is still referenced {references} times",
            option.key
        )));
    }

    let deleted = service
        .storage
        .delete_field_option(option_id)
        .await
        .map_err(FieldError::internal)?;
    if !deleted {
        return Err(FieldError::NotFound(format!(
            "Field option {option_id} not found"
        )));
    }

    tracing::info!(option_id = %option_id, "deleted field option");
    Ok(())
}
