use wikidesk_core::service::category_service::CategoryServiceError;
use wikidesk_core::{CategoryPatch, NewPage, Wiki, WikiError};

#[test]
fn create_normalizes_name_and_color() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let category = wiki
        .create_category(
            "  Guides ",
            Some("How-to material".to_string()),
            Some(" #FFAA00 ".to_string()),
        )
        .unwrap();

    assert_eq!(category.name, "Guides");
    assert_eq!(category.color.as_deref(), Some("#ffaa00"));
    assert_eq!(category.description.as_deref(), Some("How-to material"));
}

#[test]
fn invalid_color_and_duplicate_names_are_rejected() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    wiki.create_category("Reference", None, None).unwrap();

    assert!(matches!(
        wiki.create_category("reference", None, None).unwrap_err(),
        WikiError::Category(CategoryServiceError::DuplicateName(_))
    ));
    assert!(matches!(
        wiki.create_category("Other", None, Some("red".to_string()))
            .unwrap_err(),
        WikiError::Category(CategoryServiceError::Validation(_))
    ));
    assert!(matches!(
        wiki.create_category(" ", None, None).unwrap_err(),
        WikiError::Category(CategoryServiceError::InvalidName)
    ));
}

#[test]
fn list_is_sorted_with_page_counts() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let zeta = wiki.create_category("zeta", None, None).unwrap();
    let alpha = wiki.create_category("Alpha", None, None).unwrap();
    for title in ["One", "Two"] {
        wiki.create_page(NewPage {
            category_ids: vec![zeta.id],
            ..NewPage::new(title, "")
        })
        .unwrap();
    }

    let listed = wiki.list_categories().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].category.id, alpha.id);
    assert_eq!(listed[0].page_count, 0);
    assert_eq!(listed[1].category.id, zeta.id);
    assert_eq!(listed[1].page_count, 2);
}

#[test]
fn update_can_clear_color_and_rename() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let category = wiki
        .create_category("Old", None, Some("#000000".to_string()))
        .unwrap();

    let updated = wiki
        .update_category(
            category.id,
            CategoryPatch {
                name: Some("New".to_string()),
                color: Some(None),
                ..CategoryPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.name, "New");
    assert_eq!(updated.color, None);
}

#[test]
fn delete_unlinks_pages_but_keeps_them() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let category = wiki.create_category("Temp", None, None).unwrap();
    let page = wiki
        .create_page(NewPage {
            category_ids: vec![category.id],
            ..NewPage::new("Survivor", "")
        })
        .unwrap();

    wiki.delete_category(category.id).unwrap();

    assert!(wiki.get_page(page.id).unwrap().category_ids.is_empty());
    assert!(matches!(
        wiki.get_category(category.id).unwrap_err(),
        WikiError::Category(CategoryServiceError::CategoryNotFound(_))
    ));
    assert!(matches!(
        wiki.delete_category(category.id).unwrap_err(),
        WikiError::Category(CategoryServiceError::CategoryNotFound(_))
    ));
}
