use std::cell::RefCell;
use std::rc::Rc;
use wikidesk_core::repo::page_repo::PageListQuery;
use wikidesk_core::{
    ChangeAction, ChangeEvent, EntityKind, FolderDeleteMode, NewPage, Wiki, WikiConfig,
    WikiSettings,
};

fn recording_wiki() -> (Wiki, Rc<RefCell<Vec<ChangeEvent>>>) {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    wiki.subscribe(move |_, event| sink.borrow_mut().push(*event));
    (wiki, events)
}

#[test]
fn each_mutation_emits_one_event() {
    let (mut wiki, events) = recording_wiki();

    let page = wiki.create_page(NewPage::new("Evented", "")).unwrap();
    wiki.publish_page(page.id).unwrap();
    wiki.delete_page(page.id).unwrap();

    assert_eq!(
        *events.borrow(),
        vec![
            ChangeEvent {
                entity: EntityKind::Page,
                action: ChangeAction::Created,
                id: Some(page.id),
            },
            ChangeEvent {
                entity: EntityKind::Page,
                action: ChangeAction::Updated,
                id: Some(page.id),
            },
            ChangeEvent {
                entity: EntityKind::Page,
                action: ChangeAction::Deleted,
                id: Some(page.id),
            },
        ]
    );
}

#[test]
fn reads_and_failures_emit_nothing() {
    let (mut wiki, events) = recording_wiki();

    wiki.list_folders().unwrap();
    wiki.get_settings().unwrap();
    wiki.stats().unwrap();
    assert!(wiki.create_page(NewPage::new(" ", "")).is_err());
    assert!(wiki.delete_page(uuid::Uuid::new_v4()).is_err());

    assert!(events.borrow().is_empty());
}

#[test]
fn cascade_delete_is_a_single_folder_event() {
    let (mut wiki, events) = recording_wiki();
    let folder = wiki.create_folder(None, "Tree", None).unwrap();
    wiki.create_page(NewPage {
        folder_id: Some(folder.id),
        ..NewPage::new("Leaf", "")
    })
    .unwrap();
    events.borrow_mut().clear();

    wiki.delete_folder(folder.id, FolderDeleteMode::Cascade)
        .unwrap();

    assert_eq!(
        *events.borrow(),
        vec![ChangeEvent {
            entity: EntityKind::Folder,
            action: ChangeAction::Deleted,
            id: Some(folder.id),
        }]
    );
}

#[test]
fn settings_backup_and_restore_events() {
    let (mut wiki, events) = recording_wiki();

    wiki.update_settings(WikiSettings::default()).unwrap();
    let backup = wiki.create_backup("snap").unwrap();
    wiki.restore_backup(backup.id).unwrap();

    let recorded: Vec<(EntityKind, ChangeAction, Option<uuid::Uuid>)> = events
        .borrow()
        .iter()
        .map(|event| (event.entity, event.action, event.id))
        .collect();
    assert_eq!(
        recorded,
        vec![
            (EntityKind::Settings, ChangeAction::Updated, None),
            (EntityKind::Backup, ChangeAction::Created, Some(backup.id)),
            (EntityKind::Store, ChangeAction::Restored, None),
        ]
    );
}

#[test]
fn callbacks_can_reread_the_store() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    wiki.subscribe(move |store, _| {
        let titles: Vec<String> = store
            .list_pages(PageListQuery::default())
            .unwrap()
            .items
            .into_iter()
            .map(|page| page.title)
            .collect();
        sink.borrow_mut().push((store.stats().unwrap().pages, titles));
    });

    wiki.create_page(NewPage::new("First", "")).unwrap();
    wiki.create_page(NewPage::new("Second", "")).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], (1, vec!["First".to_string()]));
    assert_eq!(seen[1].0, 2);
    assert_eq!(seen[1].1.len(), 2);
    assert_eq!(wiki.subscriber_count(), 1);
}

#[test]
fn unsubscribed_callbacks_stop_receiving() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let first = Rc::new(RefCell::new(0));
    let second = Rc::new(RefCell::new(0));
    let first_sink = Rc::clone(&first);
    let second_sink = Rc::clone(&second);
    let first_id = wiki.subscribe(move |_, _| *first_sink.borrow_mut() += 1);
    wiki.subscribe(move |_, _| *second_sink.borrow_mut() += 1);
    assert_eq!(wiki.subscriber_count(), 2);

    wiki.create_folder(None, "One", None).unwrap();
    assert!(wiki.unsubscribe(first_id));
    assert!(!wiki.unsubscribe(first_id));
    wiki.create_folder(None, "Two", None).unwrap();

    assert_eq!(*first.borrow(), 1);
    assert_eq!(*second.borrow(), 2);
    assert_eq!(wiki.subscriber_count(), 1);
}

#[test]
fn config_opens_file_store_with_retention() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = WikiConfig::default();
    config.database.path = Some(dir.path().join("wiki.db"));
    config.backups.max_backups = 1;

    {
        let mut wiki = Wiki::from_config(&config).unwrap();
        wiki.create_page(NewPage::new("Persisted", "")).unwrap();
        wiki.create_backup("one").unwrap();
        wiki.create_backup("two").unwrap();
        assert_eq!(wiki.list_backups().unwrap().len(), 1);
    }

    let reopened = Wiki::from_config(&config).unwrap();
    assert_eq!(reopened.stats().unwrap().pages, 1);
    assert_eq!(reopened.list_backups().unwrap()[0].name, "two");
}
