//! Project / issue-type scope of a field context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which (project, issue type) combinations a context applies to.
/// `None` on either side is a wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextScope {
    pub project_id: Option<Uuid>,
    pub issue_type_id: Option<Uuid>,
}

impl ContextScope {
    pub fn new(project_id: Option<Uuid>, issue_type_id: Option<Uuid>) -> Self {
        Self {
            project_id,
            issue_type_id,
        }
    }

    /// Number of non-wildcard sides: 2 for (P, T), 1 for (P, *) or (*, T), 0 for (*, *).
    pub fn specificity(&self) -> u8 {
        u8::from(self.project_id.is_some()) + u8::from(self.issue_type_id.is_some())
    }

    /// Whether an issue in `(project_id, issue_type_id)` falls under this scope
    pub fn matches(&self, project_id: Uuid, issue_type_id: Uuid) -> bool {
        self.project_id.is_none_or(|p| p == project_id)
            && self.issue_type_id.is_none_or(|t| t == issue_type_id)
    }

    /// Whether some concrete (project, issue type) pair is matched by both scopes
    pub fn overlaps(&self, other: &ContextScope) -> bool {
        fn side(a: Option<Uuid>, b: Option<Uuid>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
        }
        side(self.project_id, other.project_id) && side(self.issue_type_id, other.issue_type_id)
    }
}
