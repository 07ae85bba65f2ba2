use wikidesk_core::repo::ctf_repo::CtfListQuery;
use wikidesk_core::service::ctf_service::CtfServiceError;
use wikidesk_core::{CtfDifficulty, CtfPatch, NewCtf, NewPage, Wiki, WikiError};

#[test]
fn create_normalizes_fields_and_starts_unsolved() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let ctf = wiki
        .create_ctf(NewCtf {
            category: Some("  web ".to_string()),
            platform: Some(" ".to_string()),
            tags: vec!["SQLi".to_string(), "auth".to_string()],
            ..NewCtf::new(" Login bypass ", CtfDifficulty::Medium, 200)
        })
        .unwrap();

    assert_eq!(ctf.title, "Login bypass");
    assert_eq!(ctf.category.as_deref(), Some("web"));
    assert_eq!(ctf.platform, None);
    assert_eq!(ctf.tags, vec!["auth".to_string(), "sqli".to_string()]);
    assert!(!ctf.solved);
    assert_eq!(ctf.solved_at, None);
}

#[test]
fn points_must_be_positive() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let err = wiki
        .create_ctf(NewCtf::new("Zero", CtfDifficulty::Easy, 0))
        .unwrap_err();
    assert!(matches!(err, WikiError::Ctf(CtfServiceError::Validation(_))));

    let ctf = wiki
        .create_ctf(NewCtf::new("Valid", CtfDifficulty::Easy, 10))
        .unwrap();
    let err = wiki
        .update_ctf(
            ctf.id,
            CtfPatch {
                points: Some(-5),
                ..CtfPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, WikiError::Ctf(CtfServiceError::Validation(_))));
}

#[test]
fn solving_keeps_first_solve_time_and_unsolve_clears_it() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let ctf = wiki
        .create_ctf(NewCtf::new("Heap", CtfDifficulty::Hard, 500))
        .unwrap();

    let solved = wiki.mark_solved(ctf.id).unwrap();
    assert!(solved.solved);
    let solved_at = solved.solved_at.unwrap();

    let again = wiki.mark_solved(ctf.id).unwrap();
    assert_eq!(again.solved_at, Some(solved_at));

    let unsolved = wiki.mark_unsolved(ctf.id).unwrap();
    assert!(!unsolved.solved);
    assert_eq!(unsolved.solved_at, None);
}

#[test]
fn writeup_link_must_exist_and_clears_on_page_delete() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let page = wiki
        .create_page(NewPage::new("Heap writeup", "<p>steps</p>"))
        .unwrap();

    let err = wiki
        .create_ctf(NewCtf {
            writeup_page_id: Some(uuid::Uuid::new_v4()),
            ..NewCtf::new("Broken link", CtfDifficulty::Easy, 50)
        })
        .unwrap_err();
    assert!(matches!(
        err,
        WikiError::Ctf(CtfServiceError::WriteupPageNotFound(_))
    ));

    let ctf = wiki
        .create_ctf(NewCtf {
            writeup_page_id: Some(page.id),
            ..NewCtf::new("Linked", CtfDifficulty::Easy, 50)
        })
        .unwrap();
    assert_eq!(ctf.writeup_page_id, Some(page.id));

    wiki.delete_page(page.id).unwrap();
    assert_eq!(wiki.get_ctf(ctf.id).unwrap().writeup_page_id, None);
}

#[test]
fn list_filters_combine() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let web = wiki
        .create_ctf(NewCtf {
            category: Some("Web".to_string()),
            tags: vec!["xss".to_string()],
            ..NewCtf::new("Reflected", CtfDifficulty::Easy, 100)
        })
        .unwrap();
    let crypto = wiki
        .create_ctf(NewCtf {
            category: Some("crypto".to_string()),
            ..NewCtf::new("RSA", CtfDifficulty::Insane, 1000)
        })
        .unwrap();
    wiki.mark_solved(crypto.id).unwrap();

    let by_category = wiki
        .list_ctfs(CtfListQuery {
            category: Some("web".to_string()),
            ..CtfListQuery::default()
        })
        .unwrap();
    assert_eq!(by_category.len(), 1);
    assert_eq!(by_category[0].id, web.id);

    let solved = wiki
        .list_ctfs(CtfListQuery {
            solved: Some(true),
            ..CtfListQuery::default()
        })
        .unwrap();
    assert_eq!(solved.len(), 1);
    assert_eq!(solved[0].id, crypto.id);

    let tagged = wiki
        .list_ctfs(CtfListQuery {
            tag: Some("XSS".to_string()),
            difficulty: Some(CtfDifficulty::Easy),
            ..CtfListQuery::default()
        })
        .unwrap();
    assert_eq!(tagged.len(), 1);
}

#[test]
fn stats_cover_every_difficulty() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let easy = wiki
        .create_ctf(NewCtf::new("Warmup", CtfDifficulty::Easy, 50))
        .unwrap();
    wiki.create_ctf(NewCtf::new("Another warmup", CtfDifficulty::Easy, 75))
        .unwrap();
    wiki.create_ctf(NewCtf::new("Kernel", CtfDifficulty::Hard, 400))
        .unwrap();
    wiki.mark_solved(easy.id).unwrap();

    let stats = wiki.ctf_stats().unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.solved, 1);
    assert_eq!(stats.points_available, 525);
    assert_eq!(stats.points_earned, 50);
    assert_eq!(stats.by_difficulty.len(), 4);

    let difficulties: Vec<CtfDifficulty> = stats
        .by_difficulty
        .iter()
        .map(|bucket| bucket.difficulty)
        .collect();
    assert_eq!(difficulties, CtfDifficulty::ALL.to_vec());
    assert_eq!(stats.by_difficulty[0].total, 2);
    assert_eq!(stats.by_difficulty[0].solved, 1);
    assert_eq!(stats.by_difficulty[1].total, 0);
    assert_eq!(stats.by_difficulty[2].total, 1);
}

#[test]
fn delete_and_missing_ids() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let ctf = wiki
        .create_ctf(NewCtf::new("Gone", CtfDifficulty::Medium, 100))
        .unwrap();

    wiki.delete_ctf(ctf.id).unwrap();
    assert!(matches!(
        wiki.get_ctf(ctf.id).unwrap_err(),
        WikiError::Ctf(CtfServiceError::CtfNotFound(_))
    ));
    assert!(matches!(
        wiki.mark_solved(ctf.id).unwrap_err(),
        WikiError::Ctf(CtfServiceError::CtfNotFound(_))
    ));
}

#[test]
fn list_is_paged_fifty_at_a_time() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    for index in 0..51 {
        wiki.create_ctf(NewCtf::new(format!("Challenge {index}"), CtfDifficulty::Easy, 10))
            .unwrap();
    }

    assert_eq!(wiki.list_ctfs(CtfListQuery::default()).unwrap().len(), 50);
    let rest = wiki
        .list_ctfs(CtfListQuery {
            offset: 50,
            ..CtfListQuery::default()
        })
        .unwrap();
    assert_eq!(rest.len(), 1);
    let everything = wiki
        .list_ctfs(CtfListQuery {
            limit: Some(500),
            ..CtfListQuery::default()
        })
        .unwrap();
    assert_eq!(everything.len(), 51);
}
