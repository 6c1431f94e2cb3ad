//! Project tools: the six operations offered to the assistant host.
//!
//! Each tool has its own argument struct with a closed field set, so a misspelt
//! argument is reported instead of silently ignored.

use crate::core::error::SheetError;
use crate::core::query::Criteria;
use crate::core::record::{KNOWN_STATUSES, NewProject, ProjectId, ProjectPatch};
use crate::core::store::RecordStore;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};

pub const GET_PROJECTS: &str = "get_projects";
pub const GET_PROJECT: &str = "get_project";
pub const ADD_PROJECT: &str = "add_project";
pub const UPDATE_PROJECT: &str = "update_project";
pub const DELETE_PROJECT: &str = "delete_project";
pub const SEARCH_PROJECTS: &str = "search_projects";

pub const TOOL_NAMES: [&str; 6] = [
    GET_PROJECTS,
    GET_PROJECT,
    ADD_PROJECT,
    UPDATE_PROJECT,
    DELETE_PROJECT,
    SEARCH_PROJECTS,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    GetProjects,
    GetProject(ProjectId),
    AddProject(NewProject),
    UpdateProject(ProjectId, ProjectPatch),
    DeleteProject(ProjectId),
    SearchProjects(Criteria),
}

/// Hosts send ids as numbers, and sometimes as quoted numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdArg {
    Number(u64),
    Text(String),
}

impl IdArg {
    fn into_id(self) -> Result<ProjectId, SheetError> {
        match self {
            IdArg::Number(raw) => raw.to_string().parse(),
            IdArg::Text(raw) => raw.parse(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdArgs {
    id: IdArg,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateArgs {
    id: IdArg,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

impl ToolCall {
    /// Validates `arguments` for the named tool. Missing arguments count as `{}`.
    pub fn parse(name: &str, arguments: JsonValue) -> Result<Self, SheetError> {
        let arguments = if arguments.is_null() {
            json!({})
        } else {
            arguments
        };
        match name {
            GET_PROJECTS => {
                parse_args::<NoArgs>(name, arguments)?;
                Ok(ToolCall::GetProjects)
            }
            GET_PROJECT => Ok(ToolCall::GetProject(
                parse_args::<IdArgs>(name, arguments)?.id.into_id()?,
            )),
            ADD_PROJECT => Ok(ToolCall::AddProject(parse_args(name, arguments)?)),
            UPDATE_PROJECT => {
                let args: UpdateArgs = parse_args(name, arguments)?;
                let patch = ProjectPatch {
                    name: args.name,
                    status: args.status,
                    owner: args.owner,
                    notes: args.notes,
                };
                Ok(ToolCall::UpdateProject(args.id.into_id()?, patch))
            }
            DELETE_PROJECT => Ok(ToolCall::DeleteProject(
                parse_args::<IdArgs>(name, arguments)?.id.into_id()?,
            )),
            SEARCH_PROJECTS => Ok(ToolCall::SearchProjects(Criteria::from_json(&arguments)?)),
            other => Err(SheetError::ValidationError(format!("unknown tool '{other}'"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::GetProjects => GET_PROJECTS,
            ToolCall::GetProject(_) => GET_PROJECT,
            ToolCall::AddProject(_) => ADD_PROJECT,
            ToolCall::UpdateProject(..) => UPDATE_PROJECT,
            ToolCall::DeleteProject(_) => DELETE_PROJECT,
            ToolCall::SearchProjects(_) => SEARCH_PROJECTS,
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: JsonValue) -> Result<T, SheetError> {
    if !arguments.is_object() {
        return Err(SheetError::ValidationError(format!(
            "arguments for {tool} must be an object"
        )));
    }
    serde_json::from_value(arguments)
        .map_err(|e| SheetError::ValidationError(format!("invalid arguments for {tool}: {e}")))
}

/// Runs one tool call against the store and returns its JSON payload.
pub fn execute(store: &mut RecordStore, call: ToolCall) -> Result<JsonValue, SheetError> {
    let value = match call {
        ToolCall::GetProjects => serde_json::to_value(store.list_all()?),
        ToolCall::GetProject(id) => serde_json::to_value(store.get(id)?),
        ToolCall::AddProject(new) => serde_json::to_value(store.add(new)?),
        ToolCall::UpdateProject(id, patch) => serde_json::to_value(store.update(id, patch)?),
        ToolCall::DeleteProject(id) => {
            let deleted = store.delete(id)?;
            Ok(json!({ "id": id, "deleted": deleted }))
        }
        ToolCall::SearchProjects(criteria) => serde_json::to_value(store.search(&criteria)?),
    };
    value.map_err(|e| SheetError::StorageError(format!("failed to encode result: {e}")))
}

fn id_property() -> JsonValue {
    json!({
        "type": ["integer", "string"],
        "description": "Project id assigned by the store"
    })
}

fn status_description(prefix: &str) -> String {
    format!("{prefix} (commonly: {})", KNOWN_STATUSES.join(", "))
}

/// Tool definitions in the shape `tools/list` returns.
pub fn tool_definitions() -> Vec<JsonValue> {
    vec![
        json!({
            "name": GET_PROJECTS,
            "description": "List every project in sheet order",
            "inputSchema": {
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }
        }),
        json!({
            "name": GET_PROJECT,
            "description": "Get one project by id",
            "inputSchema": {
                "type": "object",
                "properties": { "id": id_property() },
                "required": ["id"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": ADD_PROJECT,
            "description": "Add a project; the store assigns its id and timestamps",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Project title (required, non-empty)" },
                    "status": {
                        "type": "string",
                        "description": status_description("Progress state, defaults to 'Not Started'")
                    },
                    "owner": { "type": "string", "description": "Responsible person" },
                    "notes": { "type": "string", "description": "Free-text notes" }
                },
                "required": ["name"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": UPDATE_PROJECT,
            "description": "Change some fields of a project; omitted fields are left as they are",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "id": id_property(),
                    "name": { "type": "string", "description": "New title (non-empty)" },
                    "status": { "type": "string", "description": status_description("New progress state") },
                    "owner": { "type": "string", "description": "New responsible person" },
                    "notes": { "type": "string", "description": "New notes; empty string clears them" }
                },
                "required": ["id"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": DELETE_PROJECT,
            "description": "Delete a project; returns deleted=false when the id does not exist",
            "inputSchema": {
                "type": "object",
                "properties": { "id": id_property() },
                "required": ["id"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": SEARCH_PROJECTS,
            "description": "Find projects by exact status and/or owner (case-insensitive substring); no criteria lists all",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "status": { "type": "string", "description": status_description("Exact status") },
                    "owner": { "type": "string", "description": "Owner name or part of it" }
                },
                "additionalProperties": false
            }
        }),
    ]
}

pub fn schema() -> JsonValue {
    json!({
        "name": "projects",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Project records kept in a single spreadsheet",
        "tools": tool_definitions(),
        "storage": {
            "columns": crate::core::sheet::COLUMNS,
            "record_sheet": crate::core::sheet::RECORD_SHEET,
            "meta_sheet": crate::core::sheet::META_SHEET
        }
    })
}
