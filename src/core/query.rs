//! Stateless filtering over a snapshot of records.

use crate::core::error::SheetError;
use crate::core::record::Project;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Search filters. Set fields combine with AND; an empty set matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Criteria {
    /// Exact, case-sensitive.
    #[serde(default)]
    pub status: Option<String>,
    /// Case-insensitive substring. An empty value only matches ownerless records.
    #[serde(default)]
    pub owner: Option<String>,
}

impl Criteria {
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Parses tool-call arguments. `null` means no filters; unknown keys and
    /// non-string values are rejected.
    pub fn from_json(value: &JsonValue) -> Result<Self, SheetError> {
        if value.is_null() {
            return Ok(Criteria::default());
        }
        if !value.is_object() {
            return Err(SheetError::ValidationError(
                "search criteria must be an object".into(),
            ));
        }
        Criteria::deserialize(value)
            .map_err(|e| SheetError::ValidationError(format!("invalid search criteria: {e}")))
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.owner.is_none()
    }

    pub fn matches(&self, project: &Project) -> bool {
        if let Some(status) = &self.status {
            if project.status != status.trim() {
                return false;
            }
        }
        if let Some(owner) = &self.owner {
            let needle = owner.trim().to_lowercase();
            let matched = if needle.is_empty() {
                project.owner.is_empty()
            } else {
                project.owner.to_lowercase().contains(&needle)
            };
            if !matched {
                return false;
            }
        }
        true
    }
}

/// Records from `snapshot` that satisfy `criteria`, in snapshot order.
pub fn search(snapshot: &[Project], criteria: &Criteria) -> Vec<Project> {
    snapshot
        .iter()
        .filter(|p| criteria.matches(p))
        .cloned()
        .collect()
}
