//! Tests for the field service against the in-memory storage
use super::*;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use crate::domain::models::{
    ChangeItem, ContextScope, DataType, FieldConstraints, FieldUpdate, FieldValue,
    StoredFieldValue, UNKNOWN_OPTION_LABEL,
};
use crate::outbound::FieldMemoryStorage;

#[derive(Debug, Clone, Default)]
struct MockIssueDirectory {
    issues: HashMap<Uuid, IssueCore>,
}

impl IssueDirectory for MockIssueDirectory {
    async fn get_core(&self, issue_id: Uuid) -> anyhow::Result<Option<IssueCore>> {
        Ok(self.issues.get(&issue_id).cloned())
    }
}

#[derive(Debug, Clone, Default)]
struct MockUserDirectory {
    names: HashMap<Uuid, String>,
}

impl UserDirectory for MockUserDirectory {
    async fn get_display_name(&self, user_id: Uuid) -> anyhow::Result<Option<String>> {
        Ok(self.names.get(&user_id).cloned())
    }
}

#[derive(Debug, Clone, Default)]
struct MockPriorityDirectory {
    names: HashMap<String, String>,
}

impl PriorityDirectory for MockPriorityDirectory {
    async fn get_name(&self, priority_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self.names.get(priority_id).cloned())
    }
}

type TestService =
    FieldServiceImpl<FieldMemoryStorage, MockIssueDirectory, MockUserDirectory, MockPriorityDirectory>;

struct Harness {
    service: TestService,
    storage: FieldMemoryStorage,
    issue: IssueCore,
    /// Same project as `issue`, different issue type
    other_issue: IssueCore,
    actor: Uuid,
    assignee: Uuid,
}

fn issue_core(key: &str, project_id: Uuid, issue_type_id: Uuid) -> IssueCore {
    let now = Utc::now();
    IssueCore {
        id: Uuid::now_v7(),
        key: key.to_string(),
        summary: format!("{key} summary"),
        project_id,
        issue_type_id,
        status: "open".to_string(),
        reporter_id: None,
        created_at: now,
        updated_at: now,
    }
}

fn harness() -> Harness {
    let project = Uuid::now_v7();
    let issue = issue_core("PRJ-1", project, Uuid::now_v7());
    let other_issue = issue_core("PRJ-2", project, Uuid::now_v7());
    let actor = Uuid::now_v7();
    let assignee = Uuid::now_v7();

    let issues = MockIssueDirectory {
        issues: HashMap::from([(issue.id, issue.clone()), (other_issue.id, other_issue.clone())]),
    };
    let users = MockUserDirectory {
        names: HashMap::from([
            (actor, "Ada Lovelace".to_string()),
            (assignee, "Grace Hopper".to_string()),
        ]),
    };
    let priorities = MockPriorityDirectory {
        names: HashMap::from([("p1".to_string(), "High".to_string())]),
    };

    let storage = FieldMemoryStorage::new();
    Harness {
        service: FieldServiceImpl::new(storage.clone(), issues, users, priorities),
        storage,
        issue,
        other_issue,
        actor,
        assignee,
    }
}

impl Harness {
    async fn field(&self, name: &str, data_type: DataType) -> anyhow::Result<FieldDefinition> {
        Ok(self
            .service
            .create_field(CreateFieldRequest {
                name: name.to_string(),
                data_type,
                description: None,
                key: None,
            })
            .await?)
    }

    async fn option(&self, field: &FieldDefinition, key: &str, order: i32) -> anyhow::Result<FieldOption> {
        Ok(self
            .service
            .create_option(CreateOptionRequest {
                field_definition_id: field.id,
                key: key.to_lowercase(),
                value: key.to_string(),
                display_order: order,
            })
            .await?)
    }

    async fn context(
        &self,
        field: &FieldDefinition,
        scope: ContextScope,
        constraints: FieldConstraints,
    ) -> crate::domain::error::Result<FieldContext> {
        self.service
            .create_context(CreateContextRequest {
                field_definition_id: field.id,
                project_id: scope.project_id,
                issue_type_id: scope.issue_type_id,
                constraints,
            })
            .await
    }

    async fn global_context(&self, field: &FieldDefinition) -> anyhow::Result<FieldContext> {
        Ok(self
            .context(field, ContextScope::default(), FieldConstraints::default())
            .await?)
    }

    async fn upsert(
        &self,
        issue_id: Uuid,
        updates: Vec<(Uuid, serde_json::Value)>,
    ) -> crate::domain::error::Result<UpsertFieldsResponse> {
        self.service
            .upsert_fields(UpsertFieldsRequest {
                issue_id,
                actor_id: self.actor,
                updates: updates
                    .into_iter()
                    .map(|(field_definition_id, raw_value)| FieldUpdate {
                        field_definition_id,
                        raw_value,
                    })
                    .collect(),
            })
            .await
    }

    async fn resolved(&self, issue_id: Uuid, key: &str) -> anyhow::Result<EffectiveField> {
        self.service
            .resolve_issue_fields(issue_id)
            .await?
            .into_iter()
            .find(|f| f.key == key)
            .with_context(|| format!("field {key} was not resolved"))
    }
}

#[tokio::test]
async fn test_story_points_scenario() -> anyhow::Result<()> {
    let h = harness();
    let points = h.field("Story Points", DataType::Number).await?;
    assert_eq!(points.key, "story_points");
    h.context(
        &points,
        ContextScope::default(),
        FieldConstraints {
            min: Some(Decimal::from(0)),
            max: Some(Decimal::from(100)),
            ..FieldConstraints::default()
        },
    )
    .await?;

    h.upsert(h.issue.id, vec![(points.id, json!(13))]).await?;
    let field = h.resolved(h.issue.id, "story_points").await?;
    assert_eq!(field.value, Some(FieldValue::Number(Decimal::from(13))));
    assert_eq!(field.min, Some(Decimal::from(0)));

    let result = h.upsert(h.issue.id, vec![(points.id, json!("abc"))]).await;
    assert!(matches!(result, Err(FieldError::ValidationError(_))));

    let result = h.upsert(h.issue.id, vec![(points.id, json!(101))]).await;
    assert!(matches!(result, Err(FieldError::ValidationError(_))));

    let field = h.resolved(h.issue.id, "story_points").await?;
    assert_eq!(field.value, Some(FieldValue::Number(Decimal::from(13))));

    Ok(())
}

#[tokio::test]
async fn test_labels_scenario() -> anyhow::Result<()> {
    let h = harness();
    let labels = h.field("Labels", DataType::MultiOption).await?;
    let l1 = h.option(&labels, "L1", 0).await?;
    let l2 = h.option(&labels, "L2", 1).await?;
    let l3 = h.option(&labels, "L3", 2).await?;
    h.global_context(&labels).await?;

    h.upsert(h.issue.id, vec![(labels.id, json!([l1.id, l2.id]))])
        .await?;
    let field = h.resolved(h.issue.id, "labels").await?;
    assert_eq!(field.value, Some(FieldValue::MultiOption(vec![l1.id, l2.id])));

    h.upsert(h.issue.id, vec![(labels.id, json!([l3.id]))]).await?;
    let field = h.resolved(h.issue.id, "labels").await?;
    assert_eq!(field.value, Some(FieldValue::MultiOption(vec![l3.id])));

    let catalog: Vec<_> = field
        .options
        .context("option catalog missing")?
        .into_iter()
        .map(|o| o.value)
        .collect();
    assert_eq!(catalog, vec!["L1", "L2", "L3"]);

    // at most one value row per (issue, field)
    assert_eq!(h.storage.get_issue_field_values(h.issue.id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_stale_option_shows_placeholder() -> anyhow::Result<()> {
    let h = harness();
    let labels = h.field("Labels", DataType::MultiOption).await?;
    let l1 = h.option(&labels, "L1", 0).await?;
    let l2 = h.option(&labels, "L2", 1).await?;
    h.global_context(&labels).await?;

    h.upsert(h.issue.id, vec![(labels.id, json!([l1.id, l2.id]))])
        .await?;
    h.storage.force_delete_option(l2.id).await;

    let field = h.resolved(h.issue.id, "labels").await?;
    assert_eq!(field.value, Some(FieldValue::MultiOption(vec![l1.id, l2.id])));

    let options = field.options.context("option catalog missing")?;
    assert_eq!(options.len(), 2);
    assert_eq!(options[0].id, l1.id);
    assert!(!options[0].unknown);
    assert_eq!(options[1].id, l2.id);
    assert_eq!(options[1].value, UNKNOWN_OPTION_LABEL);
    assert!(options[1].unknown);

    Ok(())
}

#[tokio::test]
async fn test_stale_single_option_row() -> anyhow::Result<()> {
    let h = harness();
    let severity = h.field("Severity", DataType::SingleOption).await?;
    h.option(&severity, "Minor", 0).await?;
    h.global_context(&severity).await?;

    let missing = Uuid::now_v7();
    h.storage
        .insert_raw_value(StoredFieldValue {
            id: Uuid::now_v7(),
            issue_id: h.issue.id,
            field_definition_id: severity.id,
            value: Some(FieldValue::SingleOption(missing)),
            updated_at: Utc::now(),
        })
        .await;

    let field = h.resolved(h.issue.id, "severity").await?;
    assert_eq!(field.value, Some(FieldValue::SingleOption(missing)));
    let options = field.options.context("option catalog missing")?;
    assert!(options.iter().any(|o| o.id == missing && o.unknown));

    Ok(())
}

#[tokio::test]
async fn test_context_precedence() -> anyhow::Result<()> {
    let h = harness();
    let points = h.field("Story Points", DataType::Number).await?;

    h.global_context(&points).await?;
    h.context(
        &points,
        ContextScope::new(Some(h.issue.project_id), Some(h.issue.issue_type_id)),
        FieldConstraints {
            required: true,
            ..FieldConstraints::default()
        },
    )
    .await?;

    assert!(h.resolved(h.issue.id, "story_points").await?.required);
    assert!(!h.resolved(h.other_issue.id, "story_points").await?.required);

    // only one effective field per definition
    let fields = h.service.resolve_issue_fields(h.issue.id).await?;
    assert_eq!(fields.len(), 1);

    // the specific context's constraints govern the write
    let result = h.upsert(h.issue.id, vec![(points.id, json!(null))]).await;
    assert!(matches!(result, Err(FieldError::ValidationError(_))));
    h.upsert(h.other_issue.id, vec![(points.id, json!(null))])
        .await?;

    Ok(())
}

#[tokio::test]
async fn test_fields_ordered_by_context_order() -> anyhow::Result<()> {
    let h = harness();
    let alpha = h.field("Alpha", DataType::Text).await?;
    let beta = h.field("Beta", DataType::Text).await?;
    let gamma = h.field("Gamma", DataType::Text).await?;

    for (field, order) in [(&alpha, 5), (&beta, 1), (&gamma, 5)] {
        h.context(
            field,
            ContextScope::default(),
            FieldConstraints {
                display_order: order,
                ..FieldConstraints::default()
            },
        )
        .await?;
    }

    let keys: Vec<_> = h
        .service
        .resolve_issue_fields(h.issue.id)
        .await?
        .into_iter()
        .map(|f| f.key)
        .collect();
    assert_eq!(keys, vec!["beta", "alpha", "gamma"]);

    Ok(())
}

#[tokio::test]
async fn test_upsert_is_idempotent() -> anyhow::Result<()> {
    let h = harness();
    let points = h.field("Story Points", DataType::Number).await?;
    let labels = h.field("Labels", DataType::MultiOption).await?;
    let bug = h.option(&labels, "Bug", 0).await?;
    h.global_context(&points).await?;
    h.global_context(&labels).await?;

    let payload = vec![(points.id, json!("8")), (labels.id, json!([bug.id]))];

    let first = h.upsert(h.issue.id, payload.clone()).await?;
    assert_eq!(first.written, 2);
    assert!(first.change_log_id.is_some());
    let resolved_first = h.service.resolve_issue_fields(h.issue.id).await?;

    let second = h.upsert(h.issue.id, payload).await?;
    assert_eq!(second.written, 0);
    assert_eq!(second.change_log_id, None);
    let resolved_second = h.service.resolve_issue_fields(h.issue.id).await?;

    assert_eq!(resolved_first, resolved_second);
    assert_eq!(h.storage.get_issue_field_values(h.issue.id).await?.len(), 2);
    assert_eq!(h.storage.list_change_log(h.issue.id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_round_trip_every_data_type() -> anyhow::Result<()> {
    let h = harness();
    let user = Uuid::now_v7();

    let text = h.field("Notes", DataType::Text).await?;
    let number = h.field("Estimate", DataType::Number).await?;
    let flag = h.field("Blocked", DataType::Bool).await?;
    let date = h.field("Due", DataType::Date).await?;
    let datetime = h.field("Started At", DataType::Datetime).await?;
    let person = h.field("Reviewer", DataType::User).await?;
    let single = h.field("Severity", DataType::SingleOption).await?;
    let multi = h.field("Components", DataType::MultiOption).await?;

    let minor = h.option(&single, "Minor", 0).await?;
    let api = h.option(&multi, "Api", 0).await?;
    let web = h.option(&multi, "Web", 1).await?;

    for field in [&text, &number, &flag, &date, &datetime, &person, &single, &multi] {
        h.global_context(field).await?;
    }

    let response = h
        .upsert(
            h.issue.id,
            vec![
                (text.id, json!("hello")),
                (number.id, json!(3.14)),
                (flag.id, json!("TRUE")),
                (date.id, json!("2024-01-15")),
                (datetime.id, json!("2024-01-15T10:30:00Z")),
                (person.id, json!(user.to_string())),
                (single.id, json!(minor.id.to_string())),
                (multi.id, json!([web.id, api.id, web.id])),
            ],
        )
        .await?;
    assert_eq!(response.written, 8);

    let expected = [
        ("notes", FieldValue::Text("hello".to_string())),
        ("estimate", FieldValue::Number(Decimal::from_str("3.14")?)),
        ("blocked", FieldValue::Bool(true)),
        (
            "due",
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 15).context("date")?),
        ),
        (
            "started_at",
            FieldValue::Datetime(
                Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0)
                    .single()
                    .context("datetime")?,
            ),
        ),
        ("reviewer", FieldValue::User(user)),
        ("severity", FieldValue::SingleOption(minor.id)),
        ("components", FieldValue::MultiOption(vec![web.id, api.id])),
    ];
    for (key, value) in expected {
        assert_eq!(h.resolved(h.issue.id, key).await?.value, Some(value), "{key}");
    }

    Ok(())
}

#[tokio::test]
async fn test_rejected_batch_writes_nothing() -> anyhow::Result<()> {
    let h = harness();
    let notes = h.field("Notes", DataType::Text).await?;
    let points = h.field("Story Points", DataType::Number).await?;
    h.global_context(&notes).await?;
    h.global_context(&points).await?;

    h.upsert(h.issue.id, vec![(points.id, json!(5))]).await?;

    let result = h
        .upsert(
            h.issue.id,
            vec![(notes.id, json!("written?")), (points.id, json!("many"))],
        )
        .await;
    assert!(matches!(result, Err(FieldError::ValidationError(_))));

    assert_eq!(h.resolved(h.issue.id, "notes").await?.value, None);
    assert_eq!(
        h.resolved(h.issue.id, "story_points").await?.value,
        Some(FieldValue::Number(Decimal::from(5)))
    );
    assert_eq!(h.storage.list_change_log(h.issue.id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_unknown_fields_are_skipped() -> anyhow::Result<()> {
    let h = harness();
    let notes = h.field("Notes", DataType::Text).await?;
    h.global_context(&notes).await?;

    let unknown = Uuid::now_v7();
    let response = h
        .upsert(
            h.issue.id,
            vec![(unknown, json!("ignored")), (notes.id, json!("kept"))],
        )
        .await?;

    assert_eq!(response.written, 1);
    assert_eq!(response.skipped, vec![unknown]);
    assert_eq!(
        h.resolved(h.issue.id, "notes").await?.value,
        Some(FieldValue::Text("kept".to_string()))
    );

    Ok(())
}

#[tokio::test]
async fn test_option_must_belong_to_field() -> anyhow::Result<()> {
    let h = harness();
    let severity = h.field("Severity", DataType::SingleOption).await?;
    let labels = h.field("Labels", DataType::MultiOption).await?;
    h.option(&severity, "Minor", 0).await?;
    let bug = h.option(&labels, "Bug", 0).await?;
    h.global_context(&severity).await?;

    let result = h
        .upsert(h.issue.id, vec![(severity.id, json!(bug.id.to_string()))])
        .await;
    assert!(matches!(result, Err(FieldError::ValidationError(_))));

    let result = h
        .upsert(h.issue.id, vec![(severity.id, json!("not-a-uuid"))])
        .await;
    assert!(matches!(result, Err(FieldError::ValidationError(_))));

    Ok(())
}

#[tokio::test]
async fn test_context_constraints_enforced_on_write() -> anyhow::Result<()> {
    let h = harness();
    let code = h.field("Code", DataType::Text).await?;
    let locked = h.field("Locked", DataType::Text).await?;
    let labels = h.field("Labels", DataType::MultiOption).await?;
    h.option(&labels, "Bug", 0).await?;

    h.context(
        &code,
        ContextScope::default(),
        FieldConstraints {
            regex: Some("^[A-Z]{3}-\\d+$".to_string()),
            ..FieldConstraints::default()
        },
    )
    .await?;
    h.context(
        &locked,
        ContextScope::default(),
        FieldConstraints {
            editable: false,
            ..FieldConstraints::default()
        },
    )
    .await?;
    h.context(
        &labels,
        ContextScope::default(),
        FieldConstraints {
            required: true,
            ..FieldConstraints::default()
        },
    )
    .await?;

    h.upsert(h.issue.id, vec![(code.id, json!("ABC-12"))]).await?;
    for (field, raw) in [
        (code.id, json!("abc")),
        (locked.id, json!("anything")),
        (labels.id, json!([])),
    ] {
        let result = h.upsert(h.issue.id, vec![(field, raw)]).await;
        assert!(matches!(result, Err(FieldError::ValidationError(_))));
    }

    Ok(())
}

#[tokio::test]
async fn test_default_fallback() -> anyhow::Result<()> {
    let h = harness();
    let severity = h.field("Severity", DataType::SingleOption).await?;
    let minor = h.option(&severity, "Minor", 0).await?;
    let major = h.option(&severity, "Major", 1).await?;
    let labels = h.field("Labels", DataType::MultiOption).await?;
    let bug = h.option(&labels, "Bug", 0).await?;
    let points = h.field("Story Points", DataType::Number).await?;

    h.context(
        &severity,
        ContextScope::default(),
        FieldConstraints {
            default_option_id: Some(minor.id),
            ..FieldConstraints::default()
        },
    )
    .await?;
    h.context(
        &labels,
        ContextScope::default(),
        FieldConstraints {
            default_option_id: Some(bug.id),
            ..FieldConstraints::default()
        },
    )
    .await?;
    h.context(
        &points,
        ContextScope::default(),
        FieldConstraints {
            default_value: Some("3".to_string()),
            ..FieldConstraints::default()
        },
    )
    .await?;

    assert_eq!(
        h.resolved(h.issue.id, "severity").await?.value,
        Some(FieldValue::SingleOption(minor.id))
    );
    assert_eq!(
        h.resolved(h.issue.id, "labels").await?.value,
        Some(FieldValue::MultiOption(vec![bug.id]))
    );
    assert_eq!(
        h.resolved(h.issue.id, "story_points").await?.value,
        Some(FieldValue::Number(Decimal::from(3)))
    );

    h.upsert(
        h.issue.id,
        vec![(severity.id, json!(major.id.to_string())), (labels.id, json!([]))],
    )
    .await?;
    assert_eq!(
        h.resolved(h.issue.id, "severity").await?.value,
        Some(FieldValue::SingleOption(major.id))
    );
    // a stored empty selection does not fall back to the default
    assert_eq!(
        h.resolved(h.issue.id, "labels").await?.value,
        Some(FieldValue::MultiOption(Vec::new()))
    );

    Ok(())
}

#[tokio::test]
async fn test_history_is_recorded_and_resolved() -> anyhow::Result<()> {
    let h = harness();
    let points = h.field("Story Points", DataType::Number).await?;
    let labels = h.field("Labels", DataType::MultiOption).await?;
    let bug = h.option(&labels, "Bug", 0).await?;
    let ui = h.option(&labels, "UI", 1).await?;
    h.global_context(&points).await?;
    h.global_context(&labels).await?;

    h.upsert(
        h.issue.id,
        vec![(points.id, json!(13)), (labels.id, json!([bug.id, ui.id]))],
    )
    .await?;
    h.upsert(h.issue.id, vec![(labels.id, json!([]))]).await?;
    // no-op records nothing
    h.upsert(h.issue.id, vec![(labels.id, json!([]))]).await?;

    let history = h.service.get_issue_history(h.issue.id).await?;
    assert_eq!(history.len(), 2);

    let newest = &history[0];
    assert_eq!(newest.actor, "Ada Lovelace");
    assert_eq!(newest.items.len(), 1);
    assert_eq!(newest.items[0].field_name, "Labels");
    assert_eq!(newest.items[0].from, "Bug, UI");
    assert_eq!(newest.items[0].to, "Empty");

    let oldest = &history[1];
    assert_eq!(oldest.items.len(), 2);
    assert_eq!(oldest.items[0].field_key, "story_points");
    assert_eq!(oldest.items[0].from, "None");
    assert_eq!(oldest.items[0].to, "13");
    assert_eq!(oldest.items[1].from, "Empty");
    assert_eq!(oldest.items[1].to, "Bug, UI");

    Ok(())
}

#[tokio::test]
async fn test_normalize_change_system_and_unknown_fields() -> anyhow::Result<()> {
    let h = harness();
    let reviewer = h.field("Reviewer", DataType::User).await?;
    let severity = h.field("Severity", DataType::SingleOption).await?;
    let major = h.option(&severity, "Major", 0).await?;
    let definitions = h.service.list_fields().await?;

    let gone = Uuid::now_v7();
    let entry = ChangeLogEntry::new(
        h.issue.id,
        h.actor,
        vec![
            ChangeItem {
                field_key: "assignee".to_string(),
                before: None,
                after: Some(json!({ "userId": h.assignee }).to_string()),
            },
            ChangeItem {
                field_key: "priority".to_string(),
                before: Some("p9".to_string()),
                after: Some("p1".to_string()),
            },
            ChangeItem {
                field_key: "status".to_string(),
                before: Some("open".to_string()),
                after: Some("done".to_string()),
            },
            ChangeItem {
                field_key: reviewer.key.clone(),
                before: Some(h.assignee.to_string()),
                after: Some(json!({ "userId": Uuid::now_v7() }).to_string()),
            },
            ChangeItem {
                field_key: severity.key.clone(),
                before: Some(json!({ "optionId": major.id }).to_string()),
                after: Some(json!({ "optionId": gone }).to_string()),
            },
            ChangeItem {
                field_key: "legacy_flag".to_string(),
                before: Some("a".to_string()),
                after: None,
            },
        ],
    );

    let display = h.service.normalize_change(entry, &definitions).await?;
    let rendered: Vec<_> = display
        .items
        .iter()
        .map(|i| (i.field_name.as_str(), i.from.as_str(), i.to.as_str()))
        .collect();

    let gone_payload = json!({ "optionId": gone }).to_string();
    assert_eq!(
        rendered,
        vec![
            ("Assignee", "Unassigned", "Grace Hopper"),
            ("Priority", "p9", "High"),
            ("Status", "open", "done"),
            ("Reviewer", "Grace Hopper", "Unassigned"),
            ("Severity", "Major", gone_payload.as_str()),
            ("legacy_flag", "a", "None"),
        ]
    );
    assert_eq!(display.actor, "Ada Lovelace");

    Ok(())
}

#[tokio::test]
async fn test_option_deletion_blocked_while_referenced() -> anyhow::Result<()> {
    let h = harness();
    let labels = h.field("Labels", DataType::MultiOption).await?;
    let bug = h.option(&labels, "Bug", 0).await?;
    let ui = h.option(&labels, "UI", 1).await?;
    let spare = h.option(&labels, "Spare", 2).await?;
    h.context(
        &labels,
        ContextScope::default(),
        FieldConstraints {
            default_option_id: Some(ui.id),
            ..FieldConstraints::default()
        },
    )
    .await?;
    h.upsert(h.issue.id, vec![(labels.id, json!([bug.id]))]).await?;

    for referenced in [bug.id, ui.id] {
        let result = h.service.delete_option(referenced).await;
        assert!(matches!(result, Err(FieldError::Conflict(_))));
    }

    h.service.delete_option(spare.id).await?;
    let remaining: Vec<_> = h
        .service
        .list_options(labels.id)
        .await?
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(remaining, vec![bug.id, ui.id]);

    let result = h.service.delete_option(spare.id).await;
    assert!(matches!(result, Err(FieldError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_ambiguous_context_overlap_rejected() -> anyhow::Result<()> {
    let h = harness();
    let points = h.field("Story Points", DataType::Number).await?;
    let project = Some(h.issue.project_id);
    let issue_type = Some(h.issue.issue_type_id);

    h.context(&points, ContextScope::new(project, None), FieldConstraints::default())
        .await?;

    let result = h
        .context(&points, ContextScope::new(None, issue_type), FieldConstraints::default())
        .await;
    assert!(matches!(result, Err(FieldError::ValidationError(_))));

    let result = h
        .context(&points, ContextScope::new(project, None), FieldConstraints::default())
        .await;
    assert!(matches!(result, Err(FieldError::Conflict(_))));

    // different specificity is resolved by precedence
    h.context(&points, ContextScope::new(project, issue_type), FieldConstraints::default())
        .await?;
    h.global_context(&points).await?;
    // a different project does not overlap
    h.context(
        &points,
        ContextScope::new(Some(Uuid::now_v7()), None),
        FieldConstraints::default(),
    )
    .await?;

    assert_eq!(h.service.list_contexts(points.id).await?.len(), 4);

    Ok(())
}

#[tokio::test]
async fn test_context_constraint_validation() -> anyhow::Result<()> {
    let h = harness();
    let points = h.field("Story Points", DataType::Number).await?;
    let severity = h.field("Severity", DataType::SingleOption).await?;
    let labels = h.field("Labels", DataType::MultiOption).await?;
    let bug = h.option(&labels, "Bug", 0).await?;

    let regex_on_number = h
        .context(
            &points,
            ContextScope::default(),
            FieldConstraints {
                regex: Some("^\\d+$".to_string()),
                ..FieldConstraints::default()
            },
        )
        .await;
    assert!(matches!(regex_on_number, Err(FieldError::ValidationError(_))));

    let foreign_default = h
        .context(
            &severity,
            ContextScope::default(),
            FieldConstraints {
                default_option_id: Some(bug.id),
                ..FieldConstraints::default()
            },
        )
        .await;
    assert!(matches!(foreign_default, Err(FieldError::ValidationError(_))));

    let context = h.global_context(&points).await?;
    let patched = h
        .service
        .update_context(
            context.id,
            UpdateContextRequest {
                min: Some(Some(Decimal::from(10))),
                max: Some(Some(Decimal::from(1))),
                ..UpdateContextRequest::default()
            },
        )
        .await;
    assert!(matches!(patched, Err(FieldError::ValidationError(_))));

    let patched = h
        .service
        .update_context(
            context.id,
            UpdateContextRequest {
                required: Some(true),
                display_order: Some(4),
                ..UpdateContextRequest::default()
            },
        )
        .await?;
    assert!(patched.constraints.required);
    assert_eq!(patched.constraints.display_order, 4);
    assert_eq!(patched.scope, ContextScope::default());

    let result = h
        .context(
            &FieldDefinition {
                id: Uuid::now_v7(),
                ..points.clone()
            },
            ContextScope::default(),
            FieldConstraints::default(),
        )
        .await;
    assert!(matches!(result, Err(FieldError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_data_type_change_rejected_once_values_exist() -> anyhow::Result<()> {
    let h = harness();
    let notes = h.field("Notes", DataType::Text).await?;

    let changed = h
        .service
        .update_field(
            notes.id,
            UpdateFieldRequest {
                data_type: Some(DataType::Number),
                ..UpdateFieldRequest::default()
            },
        )
        .await?;
    assert_eq!(changed.data_type, DataType::Number);

    h.global_context(&notes).await?;
    h.upsert(h.issue.id, vec![(notes.id, json!(42))]).await?;

    let result = h
        .service
        .update_field(
            notes.id,
            UpdateFieldRequest {
                data_type: Some(DataType::Text),
                ..UpdateFieldRequest::default()
            },
        )
        .await;
    assert!(matches!(result, Err(FieldError::ValidationError(_))));

    let severity = h.field("Severity", DataType::SingleOption).await?;
    h.option(&severity, "Minor", 0).await?;
    let result = h
        .service
        .update_field(
            severity.id,
            UpdateFieldRequest {
                data_type: Some(DataType::Text),
                ..UpdateFieldRequest::default()
            },
        )
        .await;
    assert!(matches!(result, Err(FieldError::ValidationError(_))));

    // switching between option types keeps the catalog usable
    let switched = h
        .service
        .update_field(
            severity.id,
            UpdateFieldRequest {
                data_type: Some(DataType::MultiOption),
                ..UpdateFieldRequest::default()
            },
        )
        .await?;
    assert_eq!(switched.data_type, DataType::MultiOption);

    Ok(())
}

#[tokio::test]
async fn test_definition_lifecycle() -> anyhow::Result<()> {
    let h = harness();
    let points = h.field("Story Points", DataType::Number).await?;

    let duplicate = h.field("Story  Points!", DataType::Number).await;
    assert!(duplicate.is_err());

    let renamed = h
        .service
        .update_field(
            points.id,
            UpdateFieldRequest {
                name: Some("Points".to_string()),
                description: Some("Effort estimate".to_string()),
                ..UpdateFieldRequest::default()
            },
        )
        .await?;
    assert_eq!(renamed.name, "Points");
    assert_eq!(renamed.key, "story_points");
    assert_eq!(renamed.description.as_deref(), Some("Effort estimate"));

    let bad_key = h
        .service
        .update_field(
            points.id,
            UpdateFieldRequest {
                key: Some("Not A Key".to_string()),
                ..UpdateFieldRequest::default()
            },
        )
        .await;
    assert!(matches!(bad_key, Err(FieldError::ValidationError(_))));

    let context = h.global_context(&points).await?;
    let result = h.service.delete_field(points.id).await;
    assert!(matches!(result, Err(FieldError::Conflict(_))));

    h.service.delete_context(context.id).await?;
    h.service.delete_field(points.id).await?;

    let result = h.service.get_field(points.id).await;
    assert!(matches!(result, Err(FieldError::NotFound(_))));
    assert!(h.service.list_fields().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_options_require_option_type() -> anyhow::Result<()> {
    let h = harness();
    let notes = h.field("Notes", DataType::Text).await?;
    let result = h.option(&notes, "Nope", 0).await;
    assert!(result.is_err());

    let severity = h.field("Severity", DataType::SingleOption).await?;
    let result = h
        .service
        .create_option(CreateOptionRequest {
            field_definition_id: severity.id,
            key: "neg".to_string(),
            value: "Negative".to_string(),
            display_order: -1,
        })
        .await;
    assert!(matches!(result, Err(FieldError::ValidationError(_))));

    let minor = h.option(&severity, "Minor", 0).await?;
    let updated = h
        .service
        .update_option(
            minor.id,
            UpdateOptionRequest {
                value: Some("Trivial".to_string()),
                ..UpdateOptionRequest::default()
            },
        )
        .await?;
    assert_eq!(updated.value, "Trivial");
    assert_eq!(h.service.get_option(minor.id).await?.value, "Trivial");

    Ok(())
}

#[tokio::test]
async fn test_unknown_issue_is_not_found() -> anyhow::Result<()> {
    let h = harness();
    let missing = Uuid::now_v7();

    let result = h.service.resolve_issue_fields(missing).await;
    assert!(matches!(result, Err(FieldError::NotFound(_))));

    let result = h.upsert(missing, Vec::new()).await;
    assert!(matches!(result, Err(FieldError::NotFound(_))));

    let result = h.service.get_issue_history(missing).await;
    assert!(matches!(result, Err(FieldError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_find_applicable_contexts_does_not_collapse() -> anyhow::Result<()> {
    let h = harness();
    let points = h.field("Story Points", DataType::Number).await?;
    h.global_context(&points).await?;
    h.context(
        &points,
        ContextScope::new(Some(h.issue.project_id), None),
        FieldConstraints::default(),
    )
    .await?;

    let applicable = h
        .service
        .find_applicable_contexts(h.issue.project_id, h.issue.issue_type_id)
        .await?;
    assert_eq!(applicable.len(), 2);
    assert!(applicable.iter().all(|c| c.definition.id == points.id));

    Ok(())
}

#[tokio::test]
async fn test_clearing_a_defaulted_field() -> anyhow::Result<()> {
    let h = harness();
    let labels = h.field("Labels", DataType::MultiOption).await?;
    let bug = h.option(&labels, "Bug", 0).await?;
    let points = h.field("Story Points", DataType::Number).await?;
    h.context(
        &labels,
        ContextScope::default(),
        FieldConstraints {
            default_option_id: Some(bug.id),
            ..FieldConstraints::default()
        },
    )
    .await?;
    h.context(
        &points,
        ContextScope::default(),
        FieldConstraints {
            default_value: Some("3".to_string()),
            ..FieldConstraints::default()
        },
    )
    .await?;

    let response = h.upsert(h.issue.id, vec![(labels.id, json!([]))]).await?;
    assert_eq!(response.written, 1);
    assert!(response.change_log_id.is_some());
    assert_eq!(
        h.resolved(h.issue.id, "labels").await?.value,
        Some(FieldValue::MultiOption(Vec::new()))
    );

    h.upsert(h.issue.id, vec![(points.id, json!(8))]).await?;
    h.upsert(h.issue.id, vec![(points.id, json!(null))]).await?;
    assert_eq!(h.resolved(h.issue.id, "story_points").await?.value, None);

    // once cleared, the same null is a no-op
    let response = h.upsert(h.issue.id, vec![(points.id, json!(null))]).await?;
    assert_eq!(response.written, 0);

    let history = h.service.get_issue_history(h.issue.id).await?;
    let changes: Vec<_> = history
        .iter()
        .flat_map(|entry| entry.items.iter())
        .map(|i| (i.field_key.as_str(), i.from.as_str(), i.to.as_str()))
        .collect();
    assert_eq!(
        changes,
        vec![
            ("story_points", "8", "None"),
            ("story_points", "3", "8"),
            ("labels", "Bug", "Empty"),
        ]
    );

    // writing the default explicitly stores it without a visible change
    let response = h
        .upsert(h.other_issue.id, vec![(points.id, json!("3"))])
        .await?;
    assert_eq!(response.written, 1);
    assert_eq!(response.change_log_id, None);
    assert_eq!(h.storage.get_issue_field_values(h.other_issue.id).await?.len(), 1);

    // a blank write over a blank field stays a no-op
    let response = h
        .upsert(h.other_issue.id, vec![(labels.id, json!(null))])
        .await?;
    assert_eq!(response.written, 1);
    let response = h
        .upsert(h.other_issue.id, vec![(labels.id, json!([]))])
        .await?;
    assert_eq!(response.written, 0);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_readers_never_see_a_partial_selection() -> anyhow::Result<()> {
    let h = Arc::new(harness());
    let labels = h.field("Labels", DataType::MultiOption).await?;
    let a = h.option(&labels, "A", 0).await?;
    let b = h.option(&labels, "B", 1).await?;
    let c = h.option(&labels, "C", 2).await?;
    h.global_context(&labels).await?;

    let first = vec![a.id, b.id];
    let second = vec![c.id];
    h.upsert(h.issue.id, vec![(labels.id, json!(first))]).await?;

    let writer = {
        let h = Arc::clone(&h);
        let labels_id = labels.id;
        let (first, second) = (first.clone(), second.clone());
        tokio::spawn(async move {
            for round in 0..200 {
                let ids = if round % 2 == 0 { &second } else { &first };
                h.upsert(h.issue.id, vec![(labels_id, json!(ids))]).await?;
            }
            anyhow::Ok(())
        })
    };

    loop {
        let finished = writer.is_finished();
        match h.resolved(h.issue.id, "labels").await?.value {
            Some(FieldValue::MultiOption(ids)) => {
                assert!(ids == first || ids == second, "partial selection {ids:?}")
            }
            other => panic!("unexpected labels value {other:?}"),
        }
        if finished {
            break;
        }
    }
    writer.await??;

    Ok(())
}

#[tokio::test]
async fn test_data_type_change_rechecks_contexts() -> anyhow::Result<()> {
    let h = harness();

    let points = h.field("Story Points", DataType::Number).await?;
    h.context(
        &points,
        ContextScope::default(),
        FieldConstraints {
            min: Some(Decimal::from(0)),
            max: Some(Decimal::from(100)),
            ..FieldConstraints::default()
        },
    )
    .await?;
    let result = h
        .service
        .update_field(
            points.id,
            UpdateFieldRequest {
                data_type: Some(DataType::Text),
                ..UpdateFieldRequest::default()
            },
        )
        .await;
    assert!(matches!(result, Err(FieldError::ValidationError(_))));
    assert_eq!(h.service.get_field(points.id).await?.data_type, DataType::Number);

    let code = h.field("Code", DataType::Text).await?;
    h.context(
        &code,
        ContextScope::default(),
        FieldConstraints {
            regex: Some("^[a-z]+$".to_string()),
            default_value: Some("abc".to_string()),
            ..FieldConstraints::default()
        },
    )
    .await?;
    let result = h
        .service
        .update_field(
            code.id,
            UpdateFieldRequest {
                data_type: Some(DataType::Number),
                ..UpdateFieldRequest::default()
            },
        )
        .await;
    assert!(matches!(result, Err(FieldError::ValidationError(_))));

    // a context without type-specific constraints fits any type
    let notes = h.field("Notes", DataType::Text).await?;
    h.context(
        &notes,
        ContextScope::default(),
        FieldConstraints {
            required: true,
            ..FieldConstraints::default()
        },
    )
    .await?;
    let changed = h
        .service
        .update_field(
            notes.id,
            UpdateFieldRequest {
                data_type: Some(DataType::Number),
                ..UpdateFieldRequest::default()
            },
        )
        .await?;
    assert_eq!(changed.data_type, DataType::Number);

    Ok(())
}
