use wikidesk_core::{NewPage, PagePatch, PageStatus, SearchError, SearchQuery, Wiki, WikiError};

fn wiki_with_page(title: &str, content: &str) -> (Wiki, wikidesk_core::Page) {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let page = wiki.create_page(NewPage::new(title, content)).unwrap();
    (wiki, page)
}

#[test]
fn search_matches_title_and_html_body_text() {
    let (mut wiki, page) = wiki_with_page("Kernel notes", "<p>Rust <b>borrow</b> checker</p>");
    wiki.create_page(NewPage::new("Unrelated", "<p>gardening</p>"))
        .unwrap();

    let by_body = wiki.search_pages(&SearchQuery::new("borrow")).unwrap();
    assert_eq!(by_body.len(), 1);
    assert_eq!(by_body[0].page_id, page.id);
    assert_eq!(by_body[0].slug, "kernel-notes");
    assert!(by_body[0].snippet.contains("[borrow]"));

    let by_title = wiki.search_pages(&SearchQuery::new("kernel")).unwrap();
    assert_eq!(by_title.len(), 1);
}

#[test]
fn markup_is_not_indexed() {
    let (wiki, _) = wiki_with_page("Styled", "<div class=\"callout\">visible</div>");

    assert!(wiki
        .search_pages(&SearchQuery::new("callout"))
        .unwrap()
        .is_empty());
    assert_eq!(
        wiki.search_pages(&SearchQuery::new("visible")).unwrap().len(),
        1
    );
}

#[test]
fn search_reflects_updated_content() {
    let (mut wiki, page) = wiki_with_page("Draft", "<p>alpha text</p>");

    wiki.update_page(
        page.id,
        PagePatch {
            content: Some("<p>beta text</p>".to_string()),
            ..PagePatch::default()
        },
    )
    .unwrap();

    assert!(wiki.search_pages(&SearchQuery::new("alpha")).unwrap().is_empty());
    let hits = wiki.search_pages(&SearchQuery::new("beta")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].page_id, page.id);
}

#[test]
fn deleted_pages_leave_the_index() {
    let (mut wiki, page) = wiki_with_page("Temporary", "<p>ephemeral</p>");
    wiki.delete_page(page.id).unwrap();

    assert!(wiki
        .search_pages(&SearchQuery::new("ephemeral"))
        .unwrap()
        .is_empty());
}

#[test]
fn status_filter_limits_hits() {
    let (mut wiki, draft) = wiki_with_page("Draft guide", "<p>shared term</p>");
    let published = wiki
        .create_page(NewPage::new("Live guide", "<p>shared term</p>"))
        .unwrap();
    wiki.publish_page(published.id).unwrap();

    let mut query = SearchQuery::new("shared");
    query.status = Some(PageStatus::Published);
    let hits = wiki.search_pages(&query).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].page_id, published.id);
    assert_ne!(hits[0].page_id, draft.id);
}

#[test]
fn blank_query_and_zero_limit_return_nothing() {
    let (wiki, _) = wiki_with_page("Anything", "<p>content</p>");

    assert!(wiki.search_pages(&SearchQuery::new("   ")).unwrap().is_empty());

    let mut query = SearchQuery::new("content");
    query.limit = 0;
    assert!(wiki.search_pages(&query).unwrap().is_empty());
}

#[test]
fn punctuation_in_plain_queries_is_escaped() {
    let (wiki, page) = wiki_with_page("Languages", "<p>c++ templates and \"quoted\" words</p>");

    let hits = wiki
        .search_pages(&SearchQuery::new("c++ \"quoted\""))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].page_id, page.id);
}

#[test]
fn raw_syntax_errors_surface_as_invalid_query() {
    let (wiki, _) = wiki_with_page("Raw", "<p>text</p>");

    let mut query = SearchQuery::new("\"unterminated");
    query.raw_fts_syntax = true;
    let err = wiki.search_pages(&query).unwrap_err();
    assert!(matches!(
        err,
        WikiError::Search(SearchError::InvalidQuery { .. })
    ));
}
