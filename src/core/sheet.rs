//! Workbook codec: the on-disk layout of the project sheet.
//!
//! The first worksheet holds one record per row under a fixed header. A second
//! worksheet, `_meta`, keeps the id high-water mark so ids survive deletion of the
//! highest record. Decoding is strict about the header and per-row invariants and
//! reports the spreadsheet row number (1-based, header is row 1) on failure.

use crate::core::error::SheetError;
use crate::core::record::{Project, ProjectId};
use crate::core::time::{format_timestamp, parse_timestamp};
use calamine::{Data, Range, Reader, Xlsx};
use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::io::Cursor;

pub const RECORD_SHEET: &str = "Projects";
pub const META_SHEET: &str = "_meta";
pub const NEXT_ID_KEY: &str = "next_id";

pub const COLUMNS: [&str; 7] = [
    "id",
    "name",
    "status",
    "owner",
    "created_at",
    "updated_at",
    "notes",
];

const COL_ID: u16 = 0;
const COL_NAME: u16 = 1;
const COL_STATUS: u16 = 2;
const COL_OWNER: u16 = 3;
const COL_CREATED: u16 = 4;
const COL_UPDATED: u16 = 5;
const COL_NOTES: u16 = 6;

/// SHA-256 of the raw file bytes, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        Fingerprint(format!("{:x}", Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 12 hex chars is plenty to tell two versions apart in a log line.
        f.write_str(&self.0[..self.0.len().min(12)])
    }
}

/// Decoded contents of the workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub projects: Vec<Project>,
    /// Lowest id that has never been handed out.
    pub next_id: ProjectId,
}

impl Default for Table {
    fn default() -> Self {
        Table {
            projects: Vec::new(),
            next_id: ProjectId::FIRST,
        }
    }
}

impl Table {
    /// Reserves a fresh id: above both the high-water mark and every live id.
    pub fn allocate_id(&mut self) -> Result<ProjectId, SheetError> {
        let id = self.next_id.max(self.max_id().map_or(ProjectId::FIRST, ProjectId::next));
        if id > ProjectId::MAX {
            return Err(SheetError::StorageError(format!(
                "project ids are exhausted (max {})",
                ProjectId::MAX
            )));
        }
        self.next_id = id.next();
        Ok(id)
    }

    pub fn position(&self, id: ProjectId) -> Option<usize> {
        self.projects.iter().position(|p| p.id == id)
    }

    fn max_id(&self) -> Option<ProjectId> {
        self.projects.iter().map(|p| p.id).max()
    }
}

pub fn encode(table: &Table) -> Result<Vec<u8>, SheetError> {
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name(RECORD_SHEET).map_err(write_error)?;
    for (col, header) in COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).map_err(write_error)?;
    }
    sheet.set_column_width(COL_NAME, 32).map_err(write_error)?;
    sheet.set_column_width(COL_CREATED, 26).map_err(write_error)?;
    sheet.set_column_width(COL_UPDATED, 26).map_err(write_error)?;
    sheet.set_column_width(COL_NOTES, 48).map_err(write_error)?;
    for (idx, project) in table.projects.iter().enumerate() {
        write_project(sheet, idx as u32 + 1, project).map_err(write_error)?;
    }

    let meta = workbook.add_worksheet();
    meta.set_name(META_SHEET).map_err(write_error)?;
    meta.write_string(0, 0, "key").map_err(write_error)?;
    meta.write_string(0, 1, "value").map_err(write_error)?;
    meta.write_string(1, 0, NEXT_ID_KEY).map_err(write_error)?;
    meta.write_number(1, 1, table.next_id.get() as f64)
        .map_err(write_error)?;

    workbook.save_to_buffer().map_err(write_error)
}

fn write_project(sheet: &mut Worksheet, row: u32, project: &Project) -> Result<(), XlsxError> {
    sheet.write_number(row, COL_ID, project.id.get() as f64)?;
    write_text(sheet, row, COL_NAME, &project.name)?;
    write_text(sheet, row, COL_STATUS, &project.status)?;
    write_text(sheet, row, COL_OWNER, &project.owner)?;
    sheet.write_string(row, COL_CREATED, format_timestamp(&project.created_at))?;
    sheet.write_string(row, COL_UPDATED, format_timestamp(&project.updated_at))?;
    if let Some(notes) = &project.notes {
        write_text(sheet, row, COL_NOTES, notes)?;
    }
    Ok(())
}

// Empty text stays an empty cell.
fn write_text(sheet: &mut Worksheet, row: u32, col: u16, text: &str) -> Result<(), XlsxError> {
    if !text.is_empty() {
        sheet.write_string(row, col, text)?;
    }
    Ok(())
}

fn write_error(err: XlsxError) -> SheetError {
    SheetError::StorageError(format!("failed to write workbook: {err}"))
}

pub fn decode(bytes: &[u8]) -> Result<Table, SheetError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| SheetError::StorageError(format!("failed to read workbook: {e}")))?;

    let records = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SheetError::SchemaError("workbook has no worksheets".into()))?
        .map_err(|e| SheetError::StorageError(format!("failed to read record sheet: {e}")))?;
    let projects = decode_records(&records)?;

    let meta_index = workbook
        .sheet_names()
        .iter()
        .position(|name| name == META_SHEET);
    let stored_next = match meta_index {
        Some(idx) if idx > 0 => match workbook.worksheet_range_at(idx) {
            Some(Ok(range)) => decode_next_id(&range)?,
            Some(Err(e)) => {
                return Err(SheetError::StorageError(format!(
                    "failed to read {META_SHEET} sheet: {e}"
                )));
            }
            None => None,
        },
        _ => None,
    };

    let mut table = Table {
        projects,
        next_id: stored_next.unwrap_or(ProjectId::FIRST),
    };
    if let Some(max) = table.max_id() {
        table.next_id = table.next_id.max(max.next());
    }
    Ok(table)
}

fn decode_records(range: &Range<Data>) -> Result<Vec<Project>, SheetError> {
    let Some((last_row, last_col)) = range.end() else {
        return Err(SheetError::SchemaError(
            "record sheet is empty; expected a header row".into(),
        ));
    };
    check_header(range, last_col)?;

    let mut projects = Vec::new();
    let mut seen = HashSet::new();
    for row in 1..=last_row {
        if is_blank_row(range, row, last_col) {
            continue;
        }
        let project = decode_row(range, row)?;
        if !seen.insert(project.id) {
            return Err(SheetError::SchemaError(format!(
                "row {}: duplicate id {}",
                row + 1,
                project.id
            )));
        }
        projects.push(project);
    }
    Ok(projects)
}

fn check_header(range: &Range<Data>, last_col: u32) -> Result<(), SheetError> {
    for (col, expected) in COLUMNS.iter().enumerate() {
        let found = text_at(range, 0, col as u16);
        if found.trim() != *expected {
            let found = if found.trim().is_empty() {
                "nothing".to_string()
            } else {
                format!("'{}'", found.trim())
            };
            return Err(SheetError::SchemaError(format!(
                "column {} must be '{expected}', found {found}",
                col + 1
            )));
        }
    }
    for col in COLUMNS.len() as u32..=last_col {
        let extra = text_at(range, 0, col as u16);
        if !extra.trim().is_empty() {
            return Err(SheetError::SchemaError(format!(
                "unexpected column '{}' at position {}",
                extra.trim(),
                col + 1
            )));
        }
    }
    Ok(())
}

fn is_blank_row(range: &Range<Data>, row: u32, last_col: u32) -> bool {
    (0..=last_col).all(|col| match range.get_value((row, col)) {
        None | Some(Data::Empty) => true,
        Some(Data::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    })
}

fn decode_row(range: &Range<Data>, row: u32) -> Result<Project, SheetError> {
    let line = row + 1;
    let schema = |msg: String| SheetError::SchemaError(format!("row {line}: {msg}"));

    let raw = integer_at(range, row, COL_ID)
        .ok_or_else(|| schema("id must be a positive integer".into()))?;
    let id = ProjectId::checked(raw)
        .ok_or_else(|| schema(format!("id {raw} out of range (max {})", ProjectId::MAX)))?;
    let name = text_at(range, row, COL_NAME).trim().to_string();
    if name.is_empty() {
        return Err(schema("name must not be empty".into()));
    }
    let created_at = timestamp_at(range, row, COL_CREATED)
        .ok_or_else(|| schema("created_at is not a timestamp".into()))?;
    let updated_at = timestamp_at(range, row, COL_UPDATED)
        .ok_or_else(|| schema("updated_at is not a timestamp".into()))?;
    if updated_at < created_at {
        return Err(schema("updated_at precedes created_at".into()));
    }
    let notes = text_at(range, row, COL_NOTES).trim().to_string();

    Ok(Project {
        id,
        name,
        status: text_at(range, row, COL_STATUS).trim().to_string(),
        owner: text_at(range, row, COL_OWNER).trim().to_string(),
        created_at,
        updated_at,
        notes: (!notes.is_empty()).then_some(notes),
    })
}

fn decode_next_id(range: &Range<Data>) -> Result<Option<ProjectId>, SheetError> {
    let Some((last_row, _)) = range.end() else {
        return Ok(None);
    };
    for row in 1..=last_row {
        if text_at(range, row, 0).trim() == NEXT_ID_KEY {
            // The mark may sit one past the largest id.
            return integer_at(range, row, 1)
                .filter(|raw| *raw <= ProjectId::MAX.get() + 1)
                .map(|raw| Some(ProjectId::new(raw)))
                .ok_or_else(|| {
                    SheetError::SchemaError(format!(
                        "{META_SHEET} row {}: {NEXT_ID_KEY} must be an integer in 1..={}",
                        row + 1,
                        ProjectId::MAX.get() + 1
                    ))
                });
        }
    }
    Ok(None)
}

fn text_at(range: &Range<Data>, row: u32, col: u16) -> String {
    match range.get_value((row, col as u32)) {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(s)) => s.clone(),
        Some(Data::Float(f)) if f.fract() == 0.0 => format!("{}", *f as i64),
        Some(other) => other.to_string(),
    }
}

/// A positive integer cell. Range checks are left to the caller.
fn integer_at(range: &Range<Data>, row: u32, col: u16) -> Option<u64> {
    match range.get_value((row, col as u32))? {
        Data::Int(i) if *i > 0 => Some(*i as u64),
        // Beyond 2^64 the cast saturates, which still lands out of range.
        Data::Float(f) if *f >= 1.0 && f.fract() == 0.0 => Some(*f as u64),
        Data::String(s) => s.trim().parse().ok().filter(|raw| *raw > 0),
        _ => None,
    }
}

/// Text timestamps, plus date cells that spreadsheet software converted on save.
/// Values without an offset are taken as UTC.
fn timestamp_at(range: &Range<Data>, row: u32, col: u16) -> Option<DateTime<Utc>> {
    match range.get_value((row, col as u32))? {
        Data::String(s) | Data::DateTimeIso(s) => parse_timestamp(s),
        Data::DateTime(serial) => serial.as_datetime().map(|naive| naive.and_utc()),
        _ => None,
    }
}
