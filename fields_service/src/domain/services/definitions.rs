//! Field definition service operations

use chrono::Utc;
use uuid::Uuid;

use super::FieldServiceImpl;
use crate::domain::{
    error::{FieldError, Result},
    models::{
        CreateFieldRequest, FieldDefinition, UpdateFieldRequest,
        extensions::{
            new_field_definition, normalize_description, validate_constraints,
            validate_field_definition,
        },
    },
    ports::{FieldStorage, IssueDirectory, PriorityDirectory, UserDirectory},
};

/// Load a definition, NotFound when it does not exist
pub(super) async fn require_definition<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    field_definition_id: Uuid,
) -> Result<FieldDefinition>
where
    S: FieldStorage,
    anyhow::Error: From<S::Error>,
{
    service
        .storage
        .get_field_definition(field_definition_id)
        .await
        .map_err(FieldError::internal)?
        .ok_or_else(|| {
            FieldError::NotFound(format!("Field definition {field_definition_id} not found"))
        })
}

/// ValidationError when another definition already uses the key
async fn ensure_key_available<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    key: &str,
    own_id: Option<Uuid>,
) -> Result<()>
where
    S: FieldStorage,
    anyhow::Error: From<S::Error>,
{
    let existing = service
        .storage
        .get_field_definition_by_key(key)
        .await
        .map_err(FieldError::internal)?;
    match existing {
        Some(other) if Some(other.id) != own_id => Err(FieldError::ValidationError(format!(
            "Field key '{key}' is already in use"
        ))),
        _ => Ok(()),
    }
}

/// ValidationError when an existing context's constraints do not hold for the definition's
/// (new) data type, e.g. min/max left on a TEXT field or a non-numeric default on NUMBER
async fn ensure_contexts_fit<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    definition: &FieldDefinition,
) -> Result<()>
where
    S: FieldStorage,
    anyhow::Error: From<S::Error>,
{
    let contexts = service
        .storage
        .list_field_contexts(definition.id)
        .await
        .map_err(FieldError::internal)?;
    if contexts.is_empty() {
        return Ok(());
    }

    let options = if definition.data_type.is_option_type() {
        service
            .storage
            .get_field_options(definition.id)
            .await
            .map_err(FieldError::internal)?
    } else {
        Vec::new()
    };

    for context in &contexts {
        validate_constraints(definition, &context.constraints, &options).map_err(|e| {
            FieldError::ValidationError(format!(
                "Cannot change data type of '{}' to {}, context {}: {e}",
                definition.key, definition.data_type, context.id
            ))
        })?;
    }
    Ok(())
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn create_field<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    request: CreateFieldRequest,
) -> Result<FieldDefinition>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    let definition = new_field_definition(
        request.name,
        request.data_type,
        request.description,
        request.key,
    );

    validate_field_definition(&definition).map_err(FieldError::ValidationError)?;
    ensure_key_available(service, &definition.key, None).await?;

    let created = service
        .storage
        .create_field_definition(definition)
        .await
        .map_err(FieldError::internal)?;

    tracing::info!(
        field_definition_id = %created.id,
        key = %created.key,
        data_type = %created.data_type,
        "created field definition"
    );
    Ok(created)
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn get_field<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    field_definition_id: Uuid,
) -> Result<FieldDefinition>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    require_definition(service, field_definition_id).await
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn list_fields<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
) -> Result<Vec<FieldDefinition>>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    service
        .storage
        .list_field_definitions()
        .await
        .map_err(FieldError::internal)
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn update_field<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    field_definition_id: Uuid,
    request: UpdateFieldRequest,
) -> Result<FieldDefinition>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    let current = require_definition(service, field_definition_id).await?;
    let mut updated = current.clone();

    if let Some(name) = request.name {
        updated.name = name.trim().to_string();
    }
    if let Some(key) = request.key {
        updated.key = key.trim().to_string();
    }
    if let Some(description) = request.description {
        updated.description = normalize_description(Some(description));
    }

    if let Some(data_type) = request.data_type
        && data_type != current.data_type
    {
        let stored_values = service
            .storage
            .count_field_values(field_definition_id)
            .await
            .map_err(FieldError::internal)?;
        if stored_values > 0 {
            return Err(FieldError::ValidationError(format!(
                "Cannot change data type of '{}' from {} to {}: {stored_values} values are stored",
                current.key, current.data_type, data_type
            )));
        }

        if current.data_type.is_option_type() && !data_type.is_option_type() {
            let options = service
                .storage
                .get_field_options(field_definition_id)
                .await
                .map_err(FieldError::internal)?;
            if !options.is_empty() {
                return Err(FieldError::ValidationError(format!(
                    "Cannot change data type of '{}' to {data_type} while it has {} options",
                    current.key,
                    options.len()
                )));
            }
        }
        updated.data_type = data_type;
        ensure_contexts_fit(service, &updated).await?;
    }

    validate_field_definition(&updated).map_err(FieldError::ValidationError)?;
    if updated.key != current.key {
        ensure_key_available(service, &updated.key, Some(current.id)).await?;
    }

    if updated == current {
        return Ok(current);
    }
    updated.updated_at = Utc::now();

    service
        .storage
        .update_field_definition(updated)
        .await
        .map_err(FieldError::internal)
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn delete_field<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    field_definition_id: Uuid,
) -> Result<()>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    let definition = require_definition(service, field_definition_id).await?;

    let contexts = service
        .storage
        .count_field_contexts(field_definition_id)
        .await
        .map_err(FieldError::internal)?;
    let values = service
        .storage
        .count_field_values(field_definition_id)
        .await
        .map_err(FieldError::internal)?;
    if contexts > 0 || values > 0 {
        return Err(FieldError::Conflict(format!(
            "Field '{}' is still referenced by {contexts} contexts and {values} values",
            definition.key
        )));
    }

    let deleted = service
        .storage
        .delete_field_definition(field_definition_id)
        .await
        .map_err(FieldError::internal)?;
    if !deleted {
        return Err(FieldError::NotFound(format!(
            "Field definition {field_definition_id} not found"
        )));
    }

    tracing::info!(field_definition_id = %field_definition_id, key = %definition.key, "deleted field definition");
    Ok(())
}
