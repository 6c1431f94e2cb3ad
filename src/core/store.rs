//! Record store: the single owner of the backing spreadsheet.
//!
//! Every operation goes back to the file. Reads decode the current bytes;
//! mutations run a whole-file read-modify-write:
//!
//! 1. read the bytes and fingerprint them
//! 2. decode, apply one change in memory, encode the full workbook
//! 3. re-fingerprint the file and refuse to write if it moved
//! 4. write a temp file beside the target, fsync, rename over it
//!
//! A crash before the rename leaves the previous file intact. The store assumes a
//! single writer per process and provides no locking of its own; callers serialize
//! operations (mutations take `&mut self`).

use crate::core::error::SheetError;
use crate::core::query::{self, Criteria};
use crate::core::record::{NewProject, Project, ProjectId, ProjectPatch};
use crate::core::sheet::{self, Fingerprint, Table};
use crate::core::time::now_utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    /// Fingerprint of the file as of this store's last successful write (or open).
    last_seen: Option<Fingerprint>,
}

/// A decoded table together with the fingerprint of the bytes it came from.
#[derive(Debug)]
pub(crate) struct Snapshot {
    pub(crate) table: Table,
    pub(crate) fingerprint: Fingerprint,
}

impl RecordStore {
    /// Binds the store to `path`, creating an empty sheet (and parent directories)
    /// when the file does not exist yet. An existing file must decode cleanly.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SheetError> {
        let path = path.into();
        let mut store = RecordStore {
            path,
            last_seen: None,
        };

        if store.path.exists() {
            let snapshot = store.load()?;
            info!(
                path = %store.path.display(),
                records = snapshot.table.projects.len(),
                "opened project sheet"
            );
            store.last_seen = Some(snapshot.fingerprint);
        } else {
            if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let bytes = sheet::encode(&Table::default())?;
            write_atomic(&store.path, &bytes)?;
            info!(path = %store.path.display(), "created empty project sheet");
            store.last_seen = Some(Fingerprint::of(&bytes));
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records in file (insertion) order.
    pub fn list_all(&self) -> Result<Vec<Project>, SheetError> {
        Ok(self.load()?.table.projects)
    }

    pub fn get(&self, id: ProjectId) -> Result<Project, SheetError> {
        self.load()?
            .table
            .projects
            .into_iter()
            .find(|p| p.id == id)
            .ok_or(SheetError::NotFound(id))
    }

    pub fn search(&self, criteria: &Criteria) -> Result<Vec<Project>, SheetError> {
        let snapshot = self.list_all()?;
        Ok(query::search(&snapshot, criteria))
    }

    pub fn add(&mut self, new: NewProject) -> Result<Project, SheetError> {
        self.mutate("add", |table| {
            let id = table.allocate_id()?;
            let project = new.into_project(id, now_utc())?;
            table.projects.push(project.clone());
            Ok((project, true))
        })
        .inspect(|project| info!(id = %project.id, "project added"))
    }

    /// Applies `patch` to one record. An invalid patch is rejected before the file is read.
    pub fn update(&mut self, id: ProjectId, patch: ProjectPatch) -> Result<Project, SheetError> {
        patch.validate()?;
        self.mutate("update", |table| {
            let idx = table.position(id).ok_or(SheetError::NotFound(id))?;
            let project = &mut table.projects[idx];
            patch.apply(project, now_utc())?;
            Ok((project.clone(), true))
        })
        .inspect(|project| info!(id = %project.id, "project updated"))
    }

    /// Removes the record. A missing id returns `false` and leaves the file untouched.
    pub fn delete(&mut self, id: ProjectId) -> Result<bool, SheetError> {
        let removed = self.mutate("delete", |table| match table.position(id) {
            Some(idx) => {
                table.projects.remove(idx);
                Ok((true, true))
            }
            None => Ok((false, false)),
        })?;
        if removed {
            info!(id = %id, "project deleted");
        } else {
            debug!(id = %id, "delete of unknown project is a no-op");
        }
        Ok(removed)
    }

    /// Runs one read-modify-write cycle. The closure returns its result plus whether
    /// the table changed; unchanged tables are not written back.
    fn mutate<F, R>(&mut self, op: &str, f: F) -> Result<R, SheetError>
    where
        F: FnOnce(&mut Table) -> Result<(R, bool), SheetError>,
    {
        let mut snapshot = self.load()?;
        if self
            .last_seen
            .as_ref()
            .is_some_and(|seen| *seen != snapshot.fingerprint)
        {
            warn!(
                op,
                path = %self.path.display(),
                "project sheet was changed outside this process; continuing from the file contents"
            );
        }

        let (result, changed) = f(&mut snapshot.table)?;
        if changed {
            self.commit(&snapshot.fingerprint, &snapshot.table)?;
        } else {
            self.last_seen = Some(snapshot.fingerprint);
        }
        Ok(result)
    }

    pub(crate) fn load(&self) -> Result<Snapshot, SheetError> {
        let bytes = fs::read(&self.path)?;
        let fingerprint = Fingerprint::of(&bytes);
        let table = sheet::decode(&bytes)?;
        debug!(
            path = %self.path.display(),
            records = table.projects.len(),
            fingerprint = %fingerprint,
            "loaded project sheet"
        );
        Ok(Snapshot { table, fingerprint })
    }

    /// Writes `table` if and only if the file still has the `base` fingerprint.
    pub(crate) fn commit(&mut self, base: &Fingerprint, table: &Table) -> Result<(), SheetError> {
        let bytes = sheet::encode(table)?;

        let current = Fingerprint::of(&fs::read(&self.path)?);
        if current != *base {
            warn!(
                path = %self.path.display(),
                expected = %base,
                actual = %current,
                "refusing to overwrite concurrent edit"
            );
            return Err(SheetError::ConcurrentModification {
                expected: base.to_string(),
                actual: current.to_string(),
            });
        }

        write_atomic(&self.path, &bytes)?;
        self.last_seen = Some(Fingerprint::of(&bytes));
        debug!(
            path = %self.path.display(),
            records = table.projects.len(),
            "persisted project sheet"
        );
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SheetError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| SheetError::IoError(e.error))?;
    Ok(())
}
