use project_sheet::core::error::SheetError;
use project_sheet::core::query::{Criteria, search};
use project_sheet::core::record::NewProject;
use project_sheet::core::store::RecordStore;
use serde_json::json;
use tempfile::tempdir;

fn seeded_store(dir: &std::path::Path) -> RecordStore {
    let mut store = RecordStore::open(dir.join("projects.xlsx")).unwrap();
    for (name, status, owner) in [
        ("Website Renewal", "In Progress", "Tanaka Ichiro"),
        ("Intranet", "Not Started", "Sato"),
        ("Office Move", "In Progress", "tanaka hanako"),
        ("Data Migration", "Completed", ""),
        ("Security Audit", "in progress", "Suzuki"),
    ] {
        store
            .add(
                NewProject::new(name)
                    .with_status(status)
                    .with_owner(owner),
            )
            .unwrap();
    }
    store
}

fn names(projects: &[project_sheet::core::record::Project]) -> Vec<&str> {
    projects.iter().map(|p| p.name.as_str()).collect()
}

#[test]
fn test_status_filter_is_exact_and_case_sensitive() {
    let tmp = tempdir().unwrap();
    let store = seeded_store(tmp.path());

    let found = store
        .search(&Criteria::default().with_status("In Progress"))
        .unwrap();
    assert_eq!(names(&found), ["Website Renewal", "Office Move"]);

    let partial = store
        .search(&Criteria::default().with_status("Progress"))
        .unwrap();
    assert!(partial.is_empty());
}

#[test]
fn test_owner_filter_is_case_insensitive_substring() {
    let tmp = tempdir().unwrap();
    let store = seeded_store(tmp.path());

    let found = store
        .search(&Criteria::default().with_owner("TANAKA"))
        .unwrap();
    assert_eq!(names(&found), ["Website Renewal", "Office Move"]);

    let ownerless = store.search(&Criteria::default().with_owner("")).unwrap();
    assert_eq!(names(&ownerless), ["Data Migration"]);
}

#[test]
fn test_filters_combine_with_and() {
    let tmp = tempdir().unwrap();
    let store = seeded_store(tmp.path());

    let found = store
        .search(
            &Criteria::default()
                .with_status("In Progress")
                .with_owner("hanako"),
        )
        .unwrap();
    assert_eq!(names(&found), ["Office Move"]);

    let none = store
        .search(
            &Criteria::default()
                .with_status("Completed")
                .with_owner("Sato"),
        )
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_empty_criteria_returns_everything_in_order() {
    let tmp = tempdir().unwrap();
    let store = seeded_store(tmp.path());
    let all = store.list_all().unwrap();
    assert_eq!(store.search(&Criteria::default()).unwrap(), all);
    assert_eq!(search(&all, &Criteria::default()), all);
}

#[test]
fn test_search_is_stateless_over_a_snapshot() {
    let tmp = tempdir().unwrap();
    let store = seeded_store(tmp.path());
    let snapshot = store.list_all().unwrap();
    let criteria = Criteria::default().with_status("In Progress");

    let first = search(&snapshot, &criteria);
    let second = search(&snapshot, &criteria);
    assert_eq!(first, second);
    assert_eq!(snapshot, store.list_all().unwrap());
}

#[test]
fn test_criteria_from_json_rejects_unknown_keys() {
    let err = Criteria::from_json(&json!({ "state": "Completed" })).unwrap_err();
    assert!(matches!(err, SheetError::ValidationError(ref m) if m.contains("state")));

    assert!(matches!(
        Criteria::from_json(&json!({ "status": 3 })),
        Err(SheetError::ValidationError(_))
    ));
    assert!(matches!(
        Criteria::from_json(&json!(["status"])),
        Err(SheetError::ValidationError(_))
    ));
    assert_eq!(Criteria::from_json(&json!(null)).unwrap(), Criteria::default());
    assert_eq!(
        Criteria::from_json(&json!({ "owner": "sato" })).unwrap(),
        Criteria::default().with_owner("sato")
    );
}
