use serde_json::Value;
use wikidesk_core::service::backup_service::BackupServiceError;
use wikidesk_core::{
    CtfDifficulty, FolderDeleteMode, NewCtf, NewMedia, NewPage, PagePatch, SearchQuery,
    ValidationError, Wiki, WikiError, WikiSettings,
};

/// Store with one of everything, returning the page id.
fn seeded_wiki() -> (Wiki, uuid::Uuid) {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let folder = wiki.create_folder(None, "Handbook", None).unwrap();
    let category = wiki.create_category("Policies", None, None).unwrap();
    let page = wiki
        .create_page(NewPage {
            folder_id: Some(folder.id),
            tags: vec!["hr".to_string()],
            category_ids: vec![category.id],
            ..NewPage::new("Leave policy", "<p>thirty days</p>")
        })
        .unwrap();
    wiki.update_page(
        page.id,
        PagePatch {
            content: Some("<p>twenty five days</p>".to_string()),
            ..PagePatch::default()
        },
    )
    .unwrap();
    wiki.add_media(NewMedia {
        name: "org.png".to_string(),
        url: "/uploads/org.png".to_string(),
        folder_id: Some(folder.id),
        ..NewMedia::default()
    })
    .unwrap();
    wiki.create_ctf(NewCtf {
        writeup_page_id: Some(page.id),
        ..NewCtf::new("Warmup", CtfDifficulty::Easy, 50)
    })
    .unwrap();
    wiki.update_settings(WikiSettings {
        site_name: "Handbook Wiki".to_string(),
        ..WikiSettings::default()
    })
    .unwrap();
    (wiki, page.id)
}

#[test]
fn create_backup_records_counts() {
    let (mut wiki, _) = seeded_wiki();
    let summary = wiki.create_backup("nightly").unwrap();

    assert_eq!(summary.name, "nightly");
    assert_eq!(summary.format_version, 1);
    assert_eq!(summary.counts.pages, 1);
    assert_eq!(summary.counts.folders, 1);
    assert_eq!(summary.counts.media, 1);
    assert_eq!(summary.counts.ctfs, 1);
    assert_eq!(summary.counts.categories, 1);

    let listed = wiki.list_backups().unwrap();
    assert_eq!(listed, vec![summary.clone()]);
    let stored = wiki.get_backup(summary.id).unwrap();
    assert_eq!(stored.document.snapshot.page_versions.len(), 1);
}

#[test]
fn blank_backup_name_is_rejected() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    assert!(matches!(
        wiki.create_backup("  ").unwrap_err(),
        WikiError::Backup(BackupServiceError::InvalidName)
    ));
}

#[test]
fn restore_replaces_live_data_exactly() {
    let (mut wiki, page_id) = seeded_wiki();
    let before = wiki.get_page(page_id).unwrap();
    let summary = wiki.create_backup("before changes").unwrap();

    wiki.delete_folder(
        before.folder_id.unwrap(),
        FolderDeleteMode::Cascade,
    )
    .unwrap();
    wiki.create_page(NewPage::new("Added later", "<p>noise</p>"))
        .unwrap();
    wiki.reset_settings().unwrap();

    let counts = wiki.restore_backup(summary.id).unwrap();
    assert_eq!(counts, summary.counts);

    let restored = wiki.get_page(page_id).unwrap();
    assert_eq!(restored, before);
    assert_eq!(wiki.list_page_versions(page_id).unwrap().len(), 1);
    assert_eq!(wiki.get_settings().unwrap().site_name, "Handbook Wiki");
    assert!(wiki.get_page_by_slug("added-later").is_err());

    let stats = wiki.stats().unwrap();
    assert_eq!(stats.pages, 1);
    assert_eq!(stats.folders, 1);
    assert_eq!(stats.media, 1);
    assert_eq!(stats.ctfs, 1);
    assert_eq!(stats.backups, 1);

    let hits = wiki.search_pages(&SearchQuery::new("twenty")).unwrap();
    assert_eq!(hits.len(), 1);
    assert!(wiki
        .search_pages(&SearchQuery::new("noise"))
        .unwrap()
        .is_empty());
}

#[test]
fn export_then_import_into_another_store() {
    let (mut source, page_id) = seeded_wiki();
    let summary = source.create_backup("transfer").unwrap();
    let json = source.export_backup(summary.id).unwrap();

    let mut target = Wiki::open_in_memory().unwrap();
    let imported = target.import_backup(&json).unwrap();
    assert_eq!(imported.name, "transfer");
    assert_eq!(imported.counts, summary.counts);
    assert_eq!(target.stats().unwrap().pages, 0);

    target.restore_backup(imported.id).unwrap();
    assert_eq!(
        target.get_page(page_id).unwrap(),
        source.get_page(page_id).unwrap()
    );
}

#[test]
fn export_current_does_not_store_anything() {
    let (wiki, _) = seeded_wiki();
    let json = wiki.export_current("adhoc").unwrap();

    let document: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(document["name"], "adhoc");
    assert_eq!(document["format_version"], 1);
    assert_eq!(document["snapshot"]["pages"].as_array().unwrap().len(), 1);
    assert!(wiki.list_backups().unwrap().is_empty());
}

#[test]
fn malformed_and_foreign_documents_are_rejected() {
    let (mut wiki, _) = seeded_wiki();

    assert!(matches!(
        wiki.import_backup("{ not json").unwrap_err(),
        WikiError::Backup(BackupServiceError::InvalidDocument(_))
    ));

    let mut document: Value = serde_json::from_str(&wiki.export_current("v").unwrap()).unwrap();
    document["format_version"] = Value::from(99);
    assert!(matches!(
        wiki.import_backup(&document.to_string()).unwrap_err(),
        WikiError::Backup(BackupServiceError::UnsupportedFormat {
            found: 99,
            supported: 1,
        })
    ));
    assert!(wiki.list_backups().unwrap().is_empty());
}

#[test]
fn failed_restore_leaves_live_data_untouched() {
    let (mut wiki, page_id) = seeded_wiki();
    let mut document: Value = serde_json::from_str(&wiki.export_current("broken").unwrap()).unwrap();
    document["snapshot"]["pages"][0]["folder_id"] = Value::from(uuid::Uuid::new_v4().to_string());
    let imported = wiki.import_backup(&document.to_string()).unwrap();

    let before = wiki.stats().unwrap();
    assert!(wiki.restore_backup(imported.id).is_err());

    assert_eq!(wiki.stats().unwrap(), before);
    assert!(wiki.get_page(page_id).is_ok());
}

#[test]
fn retention_keeps_newest_backups() {
    let (wiki, _) = seeded_wiki();
    let mut wiki = wiki.with_max_backups(2);
    for name in ["first", "second", "third"] {
        wiki.create_backup(name).unwrap();
    }

    let names: Vec<String> = wiki
        .list_backups()
        .unwrap()
        .into_iter()
        .map(|summary| summary.name)
        .collect();
    assert_eq!(names, vec!["third".to_string(), "second".to_string()]);
}

#[test]
fn zero_retention_keeps_everything() {
    let mut wiki = Wiki::open_in_memory().unwrap().with_max_backups(0);
    for index in 0..25 {
        wiki.create_backup(&format!("backup {index}")).unwrap();
    }
    assert_eq!(wiki.list_backups().unwrap().len(), 25);
}

#[test]
fn delete_backup_and_missing_ids() {
    let (mut wiki, _) = seeded_wiki();
    let summary = wiki.create_backup("temp").unwrap();

    wiki.delete_backup(summary.id).unwrap();
    assert!(matches!(
        wiki.delete_backup(summary.id).unwrap_err(),
        WikiError::Backup(BackupServiceError::BackupNotFound(_))
    ));
    assert!(matches!(
        wiki.restore_backup(summary.id).unwrap_err(),
        WikiError::Backup(BackupServiceError::BackupNotFound(_))
    ));
}

#[test]
fn import_rejects_settings_that_would_not_decode() {
    let (mut wiki, _) = seeded_wiki();
    let mut document: Value = serde_json::from_str(&wiki.export_current("bad").unwrap()).unwrap();
    document["snapshot"]["settings"]["items_per_page"] = Value::from("\"lots\"");

    assert!(matches!(
        wiki.import_backup(&document.to_string()).unwrap_err(),
        WikiError::Backup(BackupServiceError::InvalidSettings(_))
    ));
    assert!(wiki.list_backups().unwrap().is_empty());

    document["snapshot"]["settings"]["items_per_page"] = Value::from("0");
    assert!(matches!(
        wiki.import_backup(&document.to_string()).unwrap_err(),
        WikiError::Backup(BackupServiceError::Validation(_))
    ));

    wiki.create_page(NewPage::new("Still writable", "")).unwrap();
    assert_eq!(wiki.get_settings().unwrap().site_name, "Handbook Wiki");
}

#[test]
fn import_rejects_folder_cycles_and_broken_trees() {
    let (mut wiki, _) = seeded_wiki();
    let handbook = wiki.list_folders().unwrap()[0].id;
    let nested = wiki
        .create_folder(Some(handbook), "Nested", None)
        .unwrap();
    let exported: Value = serde_json::from_str(&wiki.export_current("tree").unwrap()).unwrap();
    let index_of = |id: uuid::Uuid| {
        exported["snapshot"]["folders"]
            .as_array()
            .unwrap()
            .iter()
            .position(|folder| folder["id"] == id.to_string())
            .unwrap()
    };
    let (top, child) = (index_of(handbook), index_of(nested));

    let mut cyclic = exported.clone();
    cyclic["snapshot"]["folders"][top]["parent_id"] = Value::from(nested.to_string());
    assert!(matches!(
        wiki.import_backup(&cyclic.to_string()).unwrap_err(),
        WikiError::Backup(BackupServiceError::Validation(ValidationError::FolderCycle(_)))
    ));

    let mut orphaned = exported.clone();
    orphaned["snapshot"]["folders"][child]["parent_id"] =
        Value::from(uuid::Uuid::new_v4().to_string());
    assert!(matches!(
        wiki.import_backup(&orphaned.to_string()).unwrap_err(),
        WikiError::Backup(BackupServiceError::Validation(ValidationError::MissingParent { .. }))
    ));

    let mut clashing = exported;
    clashing["snapshot"]["folders"][child]["parent_id"] = Value::Null;
    clashing["snapshot"]["folders"][child]["name"] = Value::from("HANDBOOK");
    assert!(matches!(
        wiki.import_backup(&clashing.to_string()).unwrap_err(),
        WikiError::Backup(BackupServiceError::Validation(
            ValidationError::DuplicateSiblingName(_)
        ))
    ));

    assert!(wiki.list_backups().unwrap().is_empty());
}
