use wikidesk_core::repo::media_repo::MediaListQuery;
use wikidesk_core::service::media_service::MediaServiceError;
use wikidesk_core::{
    FolderScope, MediaKind, MediaPatch, NewMedia, Wiki, WikiError, WikiSettings,
};

fn upload(name: &str, mime: Option<&str>, size: Option<i64>) -> NewMedia {
    NewMedia {
        name: name.to_string(),
        url: format!("/uploads/{name}"),
        mime_type: mime.map(str::to_string),
        size_bytes: size,
        ..NewMedia::default()
    }
}

#[test]
fn kind_is_inferred_from_mime_then_extension() {
    let mut wiki = Wiki::open_in_memory().unwrap();

    let by_mime = wiki
        .add_media(upload("clip.bin", Some("video/mp4"), None))
        .unwrap();
    let by_extension = wiki.add_media(upload("photo.JPG", None, None)).unwrap();
    let fallback = wiki.add_media(upload("report.pdf", None, None)).unwrap();

    assert_eq!(by_mime.kind, MediaKind::Video);
    assert_eq!(by_extension.kind, MediaKind::Image);
    assert_eq!(fallback.kind, MediaKind::Document);
}

#[test]
fn blank_name_or_url_is_rejected() {
    let mut wiki = Wiki::open_in_memory().unwrap();

    let mut nameless = upload("x.png", None, None);
    nameless.name = " ".to_string();
    assert!(matches!(
        wiki.add_media(nameless).unwrap_err(),
        WikiError::Media(MediaServiceError::InvalidName)
    ));

    let mut urlless = upload("x.png", None, None);
    urlless.url = String::new();
    assert!(matches!(
        wiki.add_media(urlless).unwrap_err(),
        WikiError::Media(MediaServiceError::InvalidUrl)
    ));
}

#[test]
fn upload_size_is_bounded_by_settings() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    wiki.update_settings(WikiSettings {
        max_upload_bytes: 1_000,
        ..WikiSettings::default()
    })
    .unwrap();

    wiki.add_media(upload("small.png", None, Some(1_000)))
        .unwrap();
    let err = wiki
        .add_media(upload("large.png", None, Some(1_001)))
        .unwrap_err();
    assert!(matches!(
        err,
        WikiError::Media(MediaServiceError::UploadTooLarge {
            size_bytes: 1_001,
            max_bytes: 1_000,
        })
    ));

    wiki.update_settings(WikiSettings {
        max_upload_bytes: 0,
        ..WikiSettings::default()
    })
    .unwrap();
    wiki.add_media(upload("huge.png", None, Some(10_000_000_000)))
        .unwrap();
}

#[test]
fn youtube_links_are_canonicalized() {
    let mut wiki = Wiki::open_in_memory().unwrap();

    for url in [
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42",
        "youtu.be/dQw4w9WgXcQ",
        "https://youtube.com/shorts/dQw4w9WgXcQ",
        "https://www.youtube.com/embed/dQw4w9WgXcQ",
    ] {
        let media = wiki.add_youtube(url, None, None).unwrap();
        assert_eq!(media.kind, MediaKind::Youtube);
        assert_eq!(media.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(media.name, "YouTube dQw4w9WgXcQ");
        assert_eq!(media.youtube_id(), Some("dQw4w9WgXcQ"));
    }

    let named = wiki
        .add_youtube("https://youtu.be/dQw4w9WgXcQ", Some("Talk".to_string()), None)
        .unwrap();
    assert_eq!(named.name, "Talk");

    let err = wiki
        .add_youtube("https://vimeo.com/12345", None, None)
        .unwrap_err();
    assert!(matches!(
        err,
        WikiError::Media(MediaServiceError::InvalidYoutubeUrl(_))
    ));
}

#[test]
fn list_filters_by_kind_and_folder() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let folder = wiki.create_folder(None, "Assets", None).unwrap();
    let filed = wiki
        .add_media(NewMedia {
            folder_id: Some(folder.id),
            ..upload("logo.svg", None, None)
        })
        .unwrap();
    wiki.add_media(upload("notes.txt", None, None)).unwrap();

    let images = wiki
        .list_media(&MediaListQuery {
            kind: Some(MediaKind::Image),
            ..MediaListQuery::default()
        })
        .unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].id, filed.id);

    let in_folder = wiki
        .list_media(&MediaListQuery {
            folder: FolderScope::In(folder.id),
            ..MediaListQuery::default()
        })
        .unwrap();
    assert_eq!(in_folder.len(), 1);

    let unfiled = wiki
        .list_media(&MediaListQuery {
            folder: FolderScope::Unfiled,
            ..MediaListQuery::default()
        })
        .unwrap();
    assert_eq!(unfiled.len(), 1);
    assert_eq!(unfiled[0].name, "notes.txt");
}

#[test]
fn update_move_and_delete() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let folder = wiki.create_folder(None, "Archive", None).unwrap();
    let media = wiki.add_media(upload("a.png", None, None)).unwrap();

    let renamed = wiki
        .update_media(
            media.id,
            MediaPatch {
                name: Some("b.png".to_string()),
                description: Some(Some("second".to_string())),
            },
        )
        .unwrap();
    assert_eq!(renamed.name, "b.png");
    assert_eq!(renamed.description.as_deref(), Some("second"));

    let moved = wiki.move_media(media.id, Some(folder.id)).unwrap();
    assert_eq!(moved.folder_id, Some(folder.id));
    assert!(matches!(
        wiki.move_media(media.id, Some(uuid::Uuid::new_v4()))
            .unwrap_err(),
        WikiError::Media(MediaServiceError::FolderNotFound(_))
    ));

    wiki.delete_media(media.id).unwrap();
    assert!(matches!(
        wiki.get_media(media.id).unwrap_err(),
        WikiError::Media(MediaServiceError::MediaNotFound(_))
    ));
}

#[test]
fn reads_do_not_depend_on_stored_settings() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    let media = wiki
        .add_media(NewMedia {
            name: "logo.svg".to_string(),
            url: "/uploads/logo.svg".to_string(),
            ..NewMedia::default()
        })
        .unwrap();
    wiki.connection()
        .execute(
            "INSERT INTO settings (key, value) VALUES ('max_upload_bytes', 'oops');",
            [],
        )
        .unwrap();

    assert_eq!(wiki.get_media(media.id).unwrap(), media);
    assert_eq!(wiki.list_media(&MediaListQuery::default()).unwrap().len(), 1);
    assert!(wiki
        .add_media(NewMedia {
            name: "other.svg".to_string(),
            url: "/uploads/other.svg".to_string(),
            ..NewMedia::default()
        })
        .is_err());
}

#[test]
fn list_defaults_to_fifty_and_pages_with_offset() {
    let mut wiki = Wiki::open_in_memory().unwrap();
    for index in 0..51 {
        wiki.add_media(NewMedia {
            name: format!("shot-{index}.png"),
            url: format!("/uploads/shot-{index}.png"),
            ..NewMedia::default()
        })
        .unwrap();
    }

    assert_eq!(wiki.list_media(&MediaListQuery::default()).unwrap().len(), 50);
    let rest = wiki
        .list_media(&MediaListQuery {
            offset: 50,
            ..MediaListQuery::default()
        })
        .unwrap();
    assert_eq!(rest.len(), 1);
}
