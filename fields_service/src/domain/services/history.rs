//! Change history normalization into display labels

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use super::FieldServiceImpl;
use crate::domain::{
    error::{FieldError, Result},
    models::{
        ChangeLogEntry, DataType, DisplayEntry, DisplayItem, FieldDefinition,
        codec::{HistoryRef, codec_for},
    },
    ports::{FieldStorage, IssueDirectory, PriorityDirectory, UserDirectory},
};

const EMPTY_LABEL: &str = "Empty";
const UNASSIGNED_LABEL: &str = "Unassigned";
const NONE_LABEL: &str = "None";
const UNKNOWN_ACTOR_LABEL: &str = "Unknown user";

/// How the payloads of one change item are interpreted
#[derive(Debug, Clone, Copy, PartialEq)]
enum ItemKind {
    /// A custom field, decoded through its codec
    Custom(DataType),
    /// A built-in user field (assignee, reporter)
    Person,
    Priority,
    /// Shown verbatim
    Plain,
}

/// Built-in issue fields that may appear in the change log alongside custom fields
fn system_field(key: &str) -> Option<(ItemKind, &'static str)> {
    Some(match key {
        "assignee" => (ItemKind::Person, "Assignee"),
        "reporter" => (ItemKind::Person, "Reporter"),
        "priority" => (ItemKind::Priority, "Priority"),
        "status" => (ItemKind::Plain, "Status"),
        "summary" => (ItemKind::Plain, "Summary"),
        "description" => (ItemKind::Plain, "Description"),
        "issue_type" => (ItemKind::Plain, "Issue Type"),
        "due_date" => (ItemKind::Plain, "Due Date"),
        _ => return None,
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Side {
    Missing,
    Ref(HistoryRef),
    Priority(String),
}

fn decode_side(kind: ItemKind, payload: Option<&str>) -> Side {
    let Some(payload) = payload else {
        return Side::Missing;
    };
    match kind {
        ItemKind::Custom(data_type) => Side::Ref(codec_for(data_type).decode_history(payload)),
        ItemKind::Person => Side::Ref(codec_for(DataType::User).decode_history(payload)),
        ItemKind::Priority => Side::Priority(payload.to_string()),
        ItemKind::Plain => Side::Ref(HistoryRef::Verbatim(payload.to_string())),
    }
}

/// Results of the batched lookups for one entry
#[derive(Debug, Default)]
struct Labels {
    options: HashMap<Uuid, String>,
    users: HashMap<Uuid, String>,
    priorities: HashMap<String, String>,
}

struct PendingItem {
    field_key: String,
    field_name: String,
    kind: ItemKind,
    before: Side,
    after: Side,
}

fn render(kind: ItemKind, side: &Side, labels: &Labels) -> String {
    match side {
        Side::Missing => match kind {
            ItemKind::Custom(DataType::MultiOption) => EMPTY_LABEL.to_string(),
            ItemKind::Custom(DataType::User) | ItemKind::Person => UNASSIGNED_LABEL.to_string(),
            _ => NONE_LABEL.to_string(),
        },
        Side::Priority(raw) => labels
            .priorities
            .get(raw)
            .cloned()
            .unwrap_or_else(|| raw.clone()),
        Side::Ref(HistoryRef::Verbatim(raw)) | Side::Ref(HistoryRef::Undecodable(raw)) => {
            raw.clone()
        }
        Side::Ref(HistoryRef::Option { id, raw }) => labels
            .options
            .get(id)
            .cloned()
            .unwrap_or_else(|| raw.clone()),
        Side::Ref(HistoryRef::Options(ids)) if ids.is_empty() => EMPTY_LABEL.to_string(),
        Side::Ref(HistoryRef::Options(ids)) => ids
            .iter()
            .map(|id| {
                labels
                    .options
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| id.to_string())
            })
            .collect::<Vec<_>>()
            .join(", "),
        Side::Ref(HistoryRef::User(id)) => labels
            .users
            .get(id)
            .cloned()
            .unwrap_or_else(|| UNASSIGNED_LABEL.to_string()),
    }
}

#[tracing::instrument(err, skip(service, entry, definitions), fields(change_log_id = %entry.id))]
pub(super) async fn normalize_change<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    entry: ChangeLogEntry,
    definitions: &[FieldDefinition],
) -> Result<DisplayEntry>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    let by_key: HashMap<&str, &FieldDefinition> =
        definitions.iter().map(|d| (d.key.as_str(), d)).collect();

    let pending: Vec<PendingItem> = entry
        .items
        .into_iter()
        .map(|item| {
            let (kind, field_name) = match by_key.get(item.field_key.as_str()) {
                Some(definition) => (ItemKind::Custom(definition.data_type), definition.name.clone()),
                None => match system_field(&item.field_key) {
                    Some((kind, label)) => (kind, label.to_string()),
                    None => (ItemKind::Plain, item.field_key.clone()),
                },
            };
            PendingItem {
                before: decode_side(kind, item.before.as_deref()),
                after: decode_side(kind, item.after.as_deref()),
                field_key: item.field_key,
                field_name,
                kind,
            }
        })
        .collect();

    // Gather every id this entry needs, then resolve each distinct id once
    let mut option_ids: Vec<Uuid> = Vec::new();
    let mut user_ids: Vec<Uuid> = vec![entry.actor_id];
    let mut priority_ids: Vec<String> = Vec::new();
    for side in pending.iter().flat_map(|p| [&p.before, &p.after]) {
        match side {
            Side::Ref(HistoryRef::Option { id, .. }) => option_ids.push(*id),
            Side::Ref(HistoryRef::Options(ids)) => option_ids.extend(ids.iter().copied()),
            Side::Ref(HistoryRef::User(id)) => user_ids.push(*id),
            Side::Priority(raw) => priority_ids.push(raw.clone()),
            _ => {}
        }
    }

    let mut labels = Labels::default();

    let option_ids: Vec<Uuid> = option_ids
        .into_iter()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    if !option_ids.is_empty() {
        labels.options = service
            .storage
            .get_field_options_by_ids(&option_ids)
            .await
            .map_err(FieldError::internal)?
            .into_iter()
            .map(|o| (o.id, o.value))
            .collect();
    }

    for user_id in user_ids.into_iter().collect::<HashSet<_>>() {
        if let Some(name) = service
            .users
            .get_display_name(user_id)
            .await
            .map_err(FieldError::Internal)?
        {
            labels.users.insert(user_id, name);
        }
    }

    for priority_id in priority_ids.into_iter().collect::<HashSet<_>>() {
        if let Some(name) = service
            .priorities
            .get_name(&priority_id)
            .await
            .map_err(FieldError::Internal)?
        {
            labels.priorities.insert(priority_id, name);
        }
    }

    let items = pending
        .iter()
        .map(|p| DisplayItem {
            field_key: p.field_key.clone(),
            field_name: p.field_name.clone(),
            from: render(p.kind, &p.before, &labels),
            to: render(p.kind, &p.after, &labels),
        })
        .collect();

    Ok(DisplayEntry {
        id: entry.id,
        actor_id: entry.actor_id,
        actor: labels
            .users
            .get(&entry.actor_id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_ACTOR_LABEL.to_string()),
        created_at: entry.created_at,
        items,
    })
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn get_issue_history<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    issue_id: Uuid,
) -> Result<Vec<DisplayEntry>>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    service.issue_core(issue_id).await?;

    let entries = service
        .storage
        .list_change_log(issue_id)
        .await
        .map_err(FieldError::internal)?;
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let definitions = service
        .storage
        .list_field_definitions()
        .await
        .map_err(FieldError::internal)?;

    let mut display = Vec::with_capacity(entries.len());
    for entry in entries {
        display.push(normalize_change(service, entry, &definitions).await?);
    }
    Ok(display)
}
