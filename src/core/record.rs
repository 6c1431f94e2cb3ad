//! The project record and the validated inputs that create or change it.

use crate::core::error::SheetError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status given to a project added without one.
pub const DEFAULT_STATUS: &str = "Not Started";

/// Status values observed in use. Status stays free text; this list only feeds tool descriptions.
pub const KNOWN_STATUSES: &[&str] = &["Not Started", "In Progress", "Completed", "Cancelled"];

/// Longest text a workbook cell accepts, in characters.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Store-assigned project identity. Positive, never reused, and at most
/// [`ProjectId::MAX`] so every id survives the sheet's floating-point cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(u64);

impl ProjectId {
    pub const FIRST: ProjectId = ProjectId(1);
    /// 2^53 - 1, the largest id whose successor is still exact as an `f64`.
    pub const MAX: ProjectId = ProjectId((1 << 53) - 1);

    pub fn new(raw: u64) -> Self {
        ProjectId(raw)
    }

    /// `Some` when `raw` is within `1..=MAX`.
    pub fn checked(raw: u64) -> Option<Self> {
        (1..=Self::MAX.0).contains(&raw).then_some(ProjectId(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        ProjectId(self.0.saturating_add(1))
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectId {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.parse::<u64>() {
            Ok(raw) if raw > 0 => ProjectId::checked(raw).ok_or_else(|| {
                SheetError::ValidationError(format!(
                    "project id {raw} is out of range (max {})",
                    ProjectId::MAX
                ))
            }),
            _ => Err(SheetError::ValidationError(format!(
                "project id must be a positive integer, got '{trimmed}'"
            ))),
        }
    }
}

/// One project row as stored and returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub status: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Fields accepted when adding a project. Everything except `name` is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewProject {
    pub fn new(name: impl Into<String>) -> Self {
        NewProject {
            name: name.into(),
            ..NewProject::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Builds the stored record. Fails when the name is blank or a field
    /// does not fit in a sheet cell.
    pub fn into_project(
        self,
        id: ProjectId,
        now: DateTime<Utc>,
    ) -> Result<Project, SheetError> {
        let status = match self.status.as_deref() {
            Some(status) => cell_text("status", status)?,
            None => DEFAULT_STATUS.to_string(),
        };
        Ok(Project {
            id,
            name: required_name(&self.name)?,
            status,
            owner: self
                .owner
                .as_deref()
                .map(|owner| cell_text("owner", owner))
                .transpose()?
                .unwrap_or_default(),
            created_at: now,
            updated_at: now,
            notes: self.notes.as_deref().map(clean_notes).transpose()?.flatten(),
        })
    }
}

/// A partial update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    /// An empty string clears the notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl ProjectPatch {
    pub fn status(status: impl Into<String>) -> Self {
        ProjectPatch {
            status: Some(status.into()),
            ..ProjectPatch::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.status.is_none() && self.owner.is_none() && self.notes.is_none()
    }

    /// Checks the patch on its own, without a target record.
    pub fn validate(&self) -> Result<(), SheetError> {
        self.resolve().map(|_| ())
    }

    /// Applies the supplied fields and stamps `updated_at`, never moving it backwards.
    /// On error the project is left untouched.
    pub fn apply(&self, project: &mut Project, now: DateTime<Utc>) -> Result<(), SheetError> {
        let resolved = self.resolve()?;
        if let Some(name) = resolved.name {
            project.name = name;
        }
        if let Some(status) = resolved.status {
            project.status = status;
        }
        if let Some(owner) = resolved.owner {
            project.owner = owner;
        }
        if let Some(notes) = resolved.notes {
            project.notes = notes;
        }
        project.updated_at = now.max(project.updated_at).max(project.created_at);
        Ok(())
    }

    fn resolve(&self) -> Result<ResolvedPatch, SheetError> {
        if self.is_empty() {
            return Err(SheetError::ValidationError(
                "update requires at least one of name, status, owner, notes".into(),
            ));
        }
        Ok(ResolvedPatch {
            name: self.name.as_deref().map(required_name).transpose()?,
            status: self
                .status
                .as_deref()
                .map(|status| cell_text("status", status))
                .transpose()?,
            owner: self
                .owner
                .as_deref()
                .map(|owner| cell_text("owner", owner))
                .transpose()?,
            notes: self.notes.as_deref().map(clean_notes).transpose()?,
        })
    }
}

/// Trimmed, length-checked patch values.
struct ResolvedPatch {
    name: Option<String>,
    status: Option<String>,
    owner: Option<String>,
    notes: Option<Option<String>>,
}

/// Trims `raw` and checks it fits in one sheet cell.
fn cell_text(field: &str, raw: &str) -> Result<String, SheetError> {
    let text = raw.trim();
    let len = text.chars().count();
    if len > MAX_CELL_CHARS {
        return Err(SheetError::ValidationError(format!(
            "{field} is {len} characters long; a sheet cell holds at most {MAX_CELL_CHARS}"
        )));
    }
    Ok(text.to_string())
}

fn required_name(raw: &str) -> Result<String, SheetError> {
    let name = cell_text("name", raw)?;
    if name.is_empty() {
        return Err(SheetError::ValidationError(
            "project name must not be empty".into(),
        ));
    }
    Ok(name)
}

fn clean_notes(raw: &str) -> Result<Option<String>, SheetError> {
    let notes = cell_text("notes", raw)?;
    Ok((!notes.is_empty()).then_some(notes))
}
