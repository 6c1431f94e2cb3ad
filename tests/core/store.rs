use project_sheet::core::error::SheetError;
use project_sheet::core::query::Criteria;
use project_sheet::core::record::{MAX_CELL_CHARS, NewProject, ProjectId, ProjectPatch};
use project_sheet::core::sheet::COLUMNS;
use project_sheet::core::store::RecordStore;
use rust_xlsxwriter::Workbook;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn sheet_path(dir: &Path) -> PathBuf {
    dir.join("projects.xlsx")
}

#[test]
fn test_project_lifecycle() {
    let tmp = tempdir().unwrap();
    let mut store = RecordStore::open(sheet_path(tmp.path())).unwrap();

    // 1. Add
    let added = store
        .add(NewProject::new("Website Renewal").with_owner("Tanaka"))
        .unwrap();
    assert_eq!(added.id, ProjectId::new(1));
    assert_eq!(added.name, "Website Renewal");
    assert_eq!(added.owner, "Tanaka");
    assert_eq!(added.status, "Not Started");
    assert_eq!(added.created_at, added.updated_at);

    // 2. Update status
    let updated = store
        .update(added.id, ProjectPatch::status("In Progress"))
        .unwrap();
    assert_eq!(store.get(added.id).unwrap().status, "In Progress");
    assert_eq!(updated, store.get(added.id).unwrap());

    // 3. Search
    let found = store
        .search(&Criteria::default().with_status("In Progress"))
        .unwrap();
    assert_eq!(found, vec![updated]);

    // 4. Delete
    assert!(store.delete(added.id).unwrap());
    assert!(matches!(
        store.get(added.id),
        Err(SheetError::NotFound(id)) if id == added.id
    ));
}

#[test]
fn test_add_then_get_returns_identical_record() {
    let tmp = tempdir().unwrap();
    let mut store = RecordStore::open(sheet_path(tmp.path())).unwrap();
    let added = store
        .add(
            NewProject::new("Intranet")
                .with_status("In Progress")
                .with_owner("Sato")
                .with_notes("phase two starts in May"),
        )
        .unwrap();
    assert_eq!(store.get(added.id).unwrap(), added);
}

#[test]
fn test_ids_strictly_increase() {
    let tmp = tempdir().unwrap();
    let mut store = RecordStore::open(sheet_path(tmp.path())).unwrap();
    let mut last = 0;
    for i in 0..5 {
        let project = store.add(NewProject::new(format!("Project {i}"))).unwrap();
        assert!(project.id.get() > last);
        last = project.id.get();
    }
    assert_eq!(last, 5);
}

#[test]
fn test_ids_are_never_reused_after_delete() {
    let tmp = tempdir().unwrap();
    let path = sheet_path(tmp.path());
    let mut store = RecordStore::open(&path).unwrap();
    store.add(NewProject::new("A")).unwrap();
    let b = store.add(NewProject::new("B")).unwrap();
    assert!(store.delete(b.id).unwrap());

    let c = store.add(NewProject::new("C")).unwrap();
    assert_eq!(c.id, ProjectId::new(3));

    assert!(store.delete(c.id).unwrap());
    drop(store);

    let mut reopened = RecordStore::open(&path).unwrap();
    let d = reopened.add(NewProject::new("D")).unwrap();
    assert_eq!(d.id, ProjectId::new(4));
}

#[test]
fn test_update_leaves_other_fields_alone() {
    let tmp = tempdir().unwrap();
    let mut store = RecordStore::open(sheet_path(tmp.path())).unwrap();
    let before = store
        .add(
            NewProject::new("Data Migration")
                .with_owner("Suzuki")
                .with_notes("legacy ERP"),
        )
        .unwrap();

    let after = store
        .update(before.id, ProjectPatch::status("Completed"))
        .unwrap();
    assert_eq!(after.status, "Completed");
    assert_eq!(after.id, before.id);
    assert_eq!(after.name, before.name);
    assert_eq!(after.owner, before.owner);
    assert_eq!(after.notes, before.notes);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at >= before.updated_at);
}

#[test]
fn test_update_rejects_blank_name_and_unknown_id() {
    let tmp = tempdir().unwrap();
    let mut store = RecordStore::open(sheet_path(tmp.path())).unwrap();
    let project = store.add(NewProject::new("Keep me")).unwrap();

    let blank = ProjectPatch {
        name: Some("   ".into()),
        ..ProjectPatch::default()
    };
    assert!(matches!(
        store.update(project.id, blank),
        Err(SheetError::ValidationError(_))
    ));
    assert_eq!(store.get(project.id).unwrap(), project);

    assert!(matches!(
        store.update(ProjectId::new(99), ProjectPatch::status("Completed")),
        Err(SheetError::NotFound(_))
    ));
}

#[test]
fn test_add_requires_name() {
    let tmp = tempdir().unwrap();
    let mut store = RecordStore::open(sheet_path(tmp.path())).unwrap();
    assert!(matches!(
        store.add(NewProject::new("")),
        Err(SheetError::ValidationError(_))
    ));
    assert!(store.list_all().unwrap().is_empty());
}

#[test]
fn test_delete_missing_is_idempotent() {
    let tmp = tempdir().unwrap();
    let mut store = RecordStore::open(sheet_path(tmp.path())).unwrap();
    let project = store.add(NewProject::new("Once")).unwrap();
    assert!(store.delete(project.id).unwrap());
    assert!(!store.delete(project.id).unwrap());
    assert!(!store.delete(ProjectId::new(1234)).unwrap());
}

#[test]
fn test_reload_round_trip_preserves_order_and_fields() {
    let tmp = tempdir().unwrap();
    let path = sheet_path(tmp.path());
    let mut store = RecordStore::open(&path).unwrap();
    store
        .add(NewProject::new("Website Renewal").with_owner("Tanaka"))
        .unwrap();
    store
        .add(
            NewProject::new("Intranet")
                .with_status("In Progress")
                .with_notes("needs SSO"),
        )
        .unwrap();
    store
        .add(NewProject::new("Office Move").with_status("Completed"))
        .unwrap();
    store
        .update(ProjectId::new(1), ProjectPatch::status("Cancelled"))
        .unwrap();
    let written = store.list_all().unwrap();
    drop(store);

    let reopened = RecordStore::open(&path).unwrap();
    assert_eq!(reopened.list_all().unwrap(), written);
    let names: Vec<_> = written.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Website Renewal", "Intranet", "Office Move"]);
}

#[test]
fn test_open_creates_missing_file_with_header() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("nested/dir/projects.xlsx");
    let store = RecordStore::open(&path).unwrap();
    assert!(path.exists());
    assert!(store.list_all().unwrap().is_empty());

    // The header must be readable by a fresh store.
    let reopened = RecordStore::open(&path).unwrap();
    assert!(reopened.list_all().unwrap().is_empty());
}

#[test]
fn test_wrong_header_is_schema_error_and_file_is_untouched() {
    let tmp = tempdir().unwrap();
    let path = sheet_path(tmp.path());
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in ["プロジェクト", "進行状況", "期限", "担当者", "備考"]
        .iter()
        .enumerate()
    {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    sheet.write_string(1, 0, "Website Renewal").unwrap();
    workbook.save(&path).unwrap();
    let before = fs::read(&path).unwrap();

    let err = RecordStore::open(&path).unwrap_err();
    assert!(matches!(err, SheetError::SchemaError(_)), "{err}");
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_schema_break_after_open_blocks_writes() {
    let tmp = tempdir().unwrap();
    let path = sheet_path(tmp.path());
    let mut store = RecordStore::open(&path).unwrap();
    store.add(NewProject::new("A")).unwrap();

    // Someone deletes the notes column by hand.
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in COLUMNS[..6].iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    workbook.save(&path).unwrap();
    let broken = fs::read(&path).unwrap();

    assert!(matches!(
        store.add(NewProject::new("B")),
        Err(SheetError::SchemaError(_))
    ));
    assert!(matches!(store.list_all(), Err(SheetError::SchemaError(_))));
    assert_eq!(fs::read(&path).unwrap(), broken);
}

#[test]
fn test_corrupt_file_is_storage_error() {
    let tmp = tempdir().unwrap();
    let path = sheet_path(tmp.path());
    fs::write(&path, b"PK\x03\x04 truncated").unwrap();
    let err = RecordStore::open(&path).unwrap_err();
    assert!(matches!(err, SheetError::StorageError(_)), "{err}");
}

#[test]
fn test_hand_prepared_sheet_is_adopted() {
    let tmp = tempdir().unwrap();
    let path = sheet_path(tmp.path());
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    sheet.write_number(1, 0, 7).unwrap();
    sheet.write_string(1, 1, "Imported").unwrap();
    sheet.write_string(1, 2, "In Progress").unwrap();
    sheet.write_string(1, 4, "2026-01-05T09:00:00.000Z").unwrap();
    sheet.write_string(1, 5, "2026-01-06T09:00:00.000Z").unwrap();
    workbook.save(&path).unwrap();

    let mut store = RecordStore::open(&path).unwrap();
    let imported = store.get(ProjectId::new(7)).unwrap();
    assert_eq!(imported.name, "Imported");
    assert_eq!(imported.owner, "");
    assert_eq!(imported.notes, None);

    let next = store.add(NewProject::new("Next")).unwrap();
    assert_eq!(next.id, ProjectId::new(8));
}

#[test]
fn test_missing_file_after_open_is_storage_error() {
    let tmp = tempdir().unwrap();
    let path = sheet_path(tmp.path());
    let mut store = RecordStore::open(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let err = store.add(NewProject::new("A")).unwrap_err();
    assert!(matches!(err, SheetError::IoError(_)));
    assert_eq!(err.kind().code(), "storage_error");
    assert!(!path.exists());
}

#[test]
fn test_oversized_text_is_rejected_before_writing() {
    let tmp = tempdir().unwrap();
    let path = sheet_path(tmp.path());
    let mut store = RecordStore::open(&path).unwrap();
    let project = store.add(NewProject::new("Website Renewal")).unwrap();
    let before = fs::read(&path).unwrap();
    let long = "x".repeat(MAX_CELL_CHARS + 1);

    // 1. Add
    let err = store
        .add(NewProject::new("A").with_notes(long.clone()))
        .unwrap_err();
    assert_eq!(err.kind().code(), "validation_error", "{err}");

    // 2. Update
    let patch = ProjectPatch {
        owner: Some(long),
        ..ProjectPatch::default()
    };
    let err = store.update(project.id, patch).unwrap_err();
    assert_eq!(err.kind().code(), "validation_error", "{err}");

    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(store.list_all().unwrap(), vec![project]);
}

#[test]
fn test_out_of_range_id_in_sheet_is_schema_error() {
    let tmp = tempdir().unwrap();
    let path = sheet_path(tmp.path());
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    sheet.write_string(1, 0, "18446744073709551615").unwrap();
    sheet.write_string(1, 1, "Hand typed").unwrap();
    sheet.write_string(1, 4, "2026-01-05T09:00:00.000Z").unwrap();
    sheet.write_string(1, 5, "2026-01-05T09:00:00.000Z").unwrap();
    workbook.save(&path).unwrap();

    let err = RecordStore::open(&path).unwrap_err();
    assert!(matches!(err, SheetError::SchemaError(ref m) if m.contains("out of range")), "{err}");
}
