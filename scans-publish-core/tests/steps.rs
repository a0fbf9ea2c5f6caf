mod common;

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use common::{release, write_png, write_template};
use scans_publish_core::contract::{
    BlogTarget, ChapterSubmission, FolderHandle, MockBlogService, MockCatalogService, MockStorageProvider,
    NewPost, PostHandle, UploadedFile,
};
use scans_publish_core::outcome::FailureKind;
use scans_publish_core::retry::{FolderTarget, RetryPolicy};
use scans_publish_core::state::{LinkKind, PublishState};
use scans_publish_core::steps::{
    Artifact, BlogPostStep, BloggerSettings, CatalogStep, CompressStep, SelectCoverStep,
    UploadStep,
};
use scans_publish_core::template::TemplateRenderer;
use scans_publish_core::{CancellationFlag, Step, StepsService};
use tempfile::tempdir;

fn storage(name: &'static str) -> MockStorageProvider {
    let mut provider = MockStorageProvider::new();
    provider
        .expect_provider_name()
        .returning(move || name.to_string());
    provider
}

fn folder(id: &str) -> FolderHandle {
    FolderHandle {
        id: id.to_string(),
        name: "My Title!".to_string(),
    }
}

fn zipped_state() -> PublishState {
    let mut state = PublishState::new(release());
    state.internal.zip_file_path = Some("/tmp/My Title! - 10.zip".into());
    state
}

#[tokio::test]
async fn test_upload_records_download_and_reader_links() {
    let mut provider = storage("box");
    provider
        .expect_create_or_get_folder()
        .withf(|name: &str, parent: &Option<String>| {
            name.to_string() == "My Title!" && parent.as_deref() == Some("releases")
        })
        .times(1)
        .returning(|_name: &str, _parent: Option<String>| Ok(folder("f-1")));
    provider
        .expect_upload_file()
        .withf(|path: &Path, parent: &Option<String>| {
            path.ends_with("My Title! - 10.pdf") && parent.as_deref() == Some("f-1")
        })
        .times(1)
        .returning(|_path: &Path, _parent: Option<String>| {
            Ok(UploadedFile {
                download_url: "https://box/pdf".into(),
                preview_url: Some("https://box/preview".into()),
            })
        });

    let step = UploadStep::new(Arc::new(provider), Artifact::Pdf, LinkKind::BoxPdf)
        .with_reader_link(LinkKind::BoxPdfReader)
        .with_folder(FolderTarget::under("releases"));
    assert_eq!(step.name(), "upload-box-pdf");

    let mut state = PublishState::new(release()).with_pdf("/tmp/My Title! - 10.pdf");
    step.execute(&mut state, &CancellationFlag::new())
        .await
        .expect("upload should succeed");

    assert_eq!(state.links.get(LinkKind::BoxPdf), Some("https://box/pdf"));
    assert_eq!(
        state.links.get(LinkKind::BoxPdfReader),
        Some("https://box/preview")
    );
}

#[tokio::test]
async fn test_upload_falls_back_to_fallback_parent() {
    let mut provider = storage("drive");
    provider
        .expect_create_or_get_folder()
        .withf(|_name: &str, parent: &Option<String>| parent.as_deref() == Some("shared"))
        .times(1)
        .returning(|_name: &str, _parent: Option<String>| Err("403 forbidden".into()));
    provider
        .expect_create_or_get_folder()
        .withf(|_name: &str, parent: &Option<String>| parent.as_deref() == Some("mine"))
        .times(1)
        .returning(|_name: &str, _parent: Option<String>| Ok(folder("f-2")));
    provider
        .expect_upload_file()
        .times(1)
        .returning(|_path: &Path, _parent: Option<String>| {
            Ok(UploadedFile {
                download_url: "https://drive/zip".into(),
                preview_url: None,
            })
        });

    let step = UploadStep::new(Arc::new(provider), Artifact::Zip, LinkKind::DriveZip)
        .with_folder(FolderTarget::under("shared").with_fallback(Some("mine".into())));

    let mut state = zipped_state();
    step.execute(&mut state, &CancellationFlag::new())
        .await
        .unwrap();
    assert_eq!(state.links.get(LinkKind::DriveZip), Some("https://drive/zip"));
}

#[tokio::test]
async fn test_upload_retries_transient_errors() {
    let mut provider = storage("mega");
    provider
        .expect_create_or_get_folder()
        .returning(|_name: &str, _parent: Option<String>| Ok(folder("f-3")));
    let calls = AtomicU32::new(0);
    provider
        .expect_upload_file()
        .times(3)
        .returning(move |_path: &Path, _parent: Option<String>| {
            // First attempt fails against the folder and its fallback; the retry succeeds.
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                return Err("connection reset".into());
            }
            Ok(UploadedFile {
                download_url: "https://mega/zip".into(),
                preview_url: None,
            })
        });

    let step = UploadStep::new(Arc::new(provider), Artifact::Zip, LinkKind::MegaZip)
        .with_retry(RetryPolicy::attempts(2));

    let mut state = zipped_state();
    step.execute(&mut state, &CancellationFlag::new())
        .await
        .unwrap();
    assert_eq!(state.links.get(LinkKind::MegaZip), Some("https://mega/zip"));
}

#[tokio::test]
async fn test_upload_without_artifact_is_a_precondition_failure() {
    let mut provider = storage("box");
    provider.expect_create_or_get_folder().never();
    provider.expect_upload_file().never();

    let step = UploadStep::new(Arc::new(provider), Artifact::Zip, LinkKind::BoxZip);
    let mut state = PublishState::new(release());
    let failure = step
        .execute(&mut state, &CancellationFlag::new())
        .await
        .unwrap_err();
    assert!(failure.has_kind(FailureKind::Precondition));
    assert!(state.links.is_empty());
}

#[test]
fn test_upload_rejects_reader_link_equal_to_download_link() {
    let step = UploadStep::new(Arc::new(storage("box")), Artifact::Pdf, LinkKind::BoxPdf)
        .with_reader_link(LinkKind::BoxPdf);
    assert!(step.validate().is_err());
}

#[tokio::test]
async fn test_catalog_submits_chapter_and_records_link() {
    let mut catalog = MockCatalogService::new();
    catalog
        .expect_submit_chapter()
        .withf(|chapter: &ChapterSubmission| {
            chapter.title == "My Title!" && chapter.chapter_number == "10"
        })
        .times(1)
        .returning(|_chapter: ChapterSubmission| Ok("https://mangadex.org/chapter/abc".into()));

    let dir = tempdir().unwrap();
    let mut state = PublishState::new(release()).with_working_dir(dir.path());
    CatalogStep::new(Arc::new(catalog))
        .execute(&mut state, &CancellationFlag::new())
        .await
        .unwrap();
    assert_eq!(
        state.links.get(LinkKind::MangaDex),
        Some("https://mangadex.org/chapter/abc")
    );
}

fn blog_step(url: Option<&str>, id: Option<&str>, blog: MockBlogService, base: &Path) -> BlogPostStep {
    let settings = BloggerSettings::new(url.map(str::to_string), id.map(str::to_string))
        .with_access_token(Some("token".to_string()));
    BlogPostStep::new(settings, Arc::new(blog), TemplateRenderer::from_base_dir(base))
}

/// Working dir with a cover and a minimal template, ready for the blog step.
fn blog_ready_state(base: &Path) -> PublishState {
    write_template(base, "<h1>##RELEASE_TITLE##</h1>");
    let cover = write_png(&base.join("cover.png"), 20, 30);
    let mut state = PublishState::new(release());
    state.internal.cover_file_path = Some(cover);
    state
}

#[tokio::test]
async fn test_blog_reports_missing_url() {
    let dir = tempdir().unwrap();
    let mut blog = MockBlogService::new();
    blog.expect_create_post().never();

    let step = blog_step(Some("  "), Some("123"), blog, dir.path());
    let failure = step
        .execute(&mut PublishState::new(release()), &CancellationFlag::new())
        .await
        .unwrap_err();
    assert_eq!(failure.messages(), vec!["Blogger url is undefined."]);
}

#[tokio::test]
async fn test_blog_reports_missing_id() {
    let dir = tempdir().unwrap();
    let mut blog = MockBlogService::new();
    blog.expect_create_post().never();

    let step = blog_step(Some("https://my-scans.blogspot.com"), None, blog, dir.path());
    let failure = step
        .execute(&mut PublishState::new(release()), &CancellationFlag::new())
        .await
        .unwrap_err();
    assert_eq!(failure.messages(), vec!["Blogger id is undefined."]);
}

#[tokio::test]
async fn test_blog_reports_both_missing_settings_together() {
    let dir = tempdir().unwrap();
    let mut blog = MockBlogService::new();
    blog.expect_create_post().never();

    let step = blog_step(None, Some(""), blog, dir.path());
    assert!(step.validate().is_err());
    let failure = step
        .execute(&mut PublishState::new(release()), &CancellationFlag::new())
        .await
        .unwrap_err();
    assert_eq!(
        failure.messages(),
        vec!["Blogger url is undefined.", "Blogger id is undefined."]
    );
    assert!(failure.has_kind(FailureKind::Configuration));
}

#[tokio::test]
async fn test_blog_publishes_rendered_announcement() {
    let dir = tempdir().unwrap();
    write_template(
        dir.path(),
        r###"<h1>##RELEASE_TITLE## ##CHAPTER_TITLE##</h1><a href="##BOX_ZIP_LINK##" ##EXISTS_MEGA_ZIP_LINK##>dl</a>"###,
    );
    let cover = write_png(&dir.path().join("cover.png"), 60, 90);

    let mut blog = MockBlogService::new();
    blog.expect_create_post()
        .withf(|target: &BlogTarget, post: &NewPost| {
            target.blog_id == "123"
                && target.access_token == "token"
                && post.url_slug == "my-title-10"
                && post.title == "My Title! - Chapter 10"
                && post.label == "My Title!"
                && post.html_body.contains(r#"href="https://box/zip""#)
        })
        .times(1)
        .returning(|_target: &BlogTarget, _post: NewPost| {
            Ok(PostHandle {
                id: "post-1".into(),
                url: Some("https://my-scans.blogspot.com/2024/01/my-title-10.html".into()),
            })
        });

    let mut state = PublishState::new(release());
    state.internal.cover_file_path = Some(cover);
    state.links.set(LinkKind::BoxZip, "https://box/zip").unwrap();

    let step = blog_step(
        Some("https://my-scans.blogspot.com/"),
        Some("123"),
        blog,
        dir.path(),
    );
    step.execute(&mut state, &CancellationFlag::new())
        .await
        .expect("blog post should be created");

    assert_eq!(
        state.links.get(LinkKind::BlogPost),
        Some("https://my-scans.blogspot.com/2024/01/my-title-10.html")
    );
    let html = state.internal.announcement_html.as_deref().unwrap();
    assert!(html.starts_with("<h1>My Title! Chapter 10</h1>"));
    assert!(html.contains(r#"style="display: none !important;""#));
}

#[test]
fn test_blog_reports_missing_access_token_at_build_time() {
    let dir = tempdir().unwrap();
    let mut blog = MockBlogService::new();
    blog.expect_create_post().never();

    let step = BlogPostStep::new(
        BloggerSettings::new(
            Some("https://my-scans.blogspot.com".into()),
            Some("123".into()),
        ),
        Arc::new(blog),
        TemplateRenderer::from_base_dir(dir.path()),
    );
    let failure = StepsService::builder()
        .step(step)
        .build()
        .err()
        .expect("build should fail");
    assert_eq!(
        failure.messages(),
        vec!["blogger: Blogger access token is undefined."]
    );
    assert!(failure.has_kind(FailureKind::Configuration));
}

#[tokio::test]
async fn test_blog_rejects_relative_url_before_posting() {
    let dir = tempdir().unwrap();
    let mut blog = MockBlogService::new();
    blog.expect_create_post().never();

    let step = blog_step(Some("my-scans.blogspot.com"), Some("123"), blog, dir.path());
    let mut state = blog_ready_state(dir.path());
    let failure = step
        .execute(&mut state, &CancellationFlag::new())
        .await
        .unwrap_err();
    assert_eq!(
        failure.messages(),
        vec!["Unable to identify Blogger url as valid link."]
    );
    assert!(failure.has_kind(FailureKind::Configuration));
    assert!(state.links.get(LinkKind::BlogPost).is_none());
}

#[tokio::test]
async fn test_blog_client_error_becomes_external_failure() {
    let dir = tempdir().unwrap();
    let mut blog = MockBlogService::new();
    blog.expect_create_post()
        .times(1)
        .returning(|_target: &BlogTarget, _post: NewPost| Err("503 backend unavailable".into()));

    let step = blog_step(Some("https://my-scans.blogspot.com"), Some("123"), blog, dir.path());
    let mut state = blog_ready_state(dir.path());
    let failure = step
        .execute(&mut state, &CancellationFlag::new())
        .await
        .unwrap_err();

    assert_eq!(failure.reasons().len(), 1);
    assert_eq!(failure.reasons()[0].kind, FailureKind::External);
    assert_eq!(
        failure.messages(),
        vec!["Blogger: unable to create post: 503 backend unavailable"]
    );
    assert!(state.links.is_empty());
    assert!(state.internal.announcement_html.is_none());
}

#[tokio::test]
async fn test_catalog_client_error_becomes_external_failure() {
    let mut catalog = MockCatalogService::new();
    catalog
        .expect_submit_chapter()
        .times(1)
        .returning(|_chapter: ChapterSubmission| Err("rate limited".into()));

    let dir = tempdir().unwrap();
    let mut state = PublishState::new(release()).with_working_dir(dir.path());
    let failure = CatalogStep::new(Arc::new(catalog))
        .execute(&mut state, &CancellationFlag::new())
        .await
        .unwrap_err();

    assert_eq!(failure.reasons()[0].kind, FailureKind::External);
    assert_eq!(
        failure.messages(),
        vec!["Catalog: chapter submission failed: rate limited"]
    );
    assert!(state.links.get(LinkKind::MangaDex).is_none());
}

#[tokio::test]
async fn test_select_cover_picks_first_image_by_name() {
    let dir = tempdir().unwrap();
    write_png(&dir.path().join("002.png"), 4, 4);
    write_png(&dir.path().join("001.png"), 4, 4);
    std::fs::write(dir.path().join("000-credits.txt"), "thanks").unwrap();

    let mut state = PublishState::new(release()).with_working_dir(dir.path());
    SelectCoverStep::new()
        .execute(&mut state, &CancellationFlag::new())
        .await
        .unwrap();
    assert_eq!(
        state.internal.cover_file_path.as_deref(),
        Some(dir.path().join("001.png").as_path())
    );
}

#[tokio::test]
async fn test_select_cover_fails_on_directory_without_images() {
    let dir = tempdir().unwrap();
    let mut state = PublishState::new(release()).with_working_dir(dir.path());
    let failure = SelectCoverStep::new()
        .execute(&mut state, &CancellationFlag::new())
        .await
        .unwrap_err();
    assert!(failure.has_kind(FailureKind::Precondition));
}

#[tokio::test]
async fn test_compress_creates_archive_and_undo_removes_it() {
    let pages = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_png(&pages.path().join("001.png"), 4, 4);
    write_png(&pages.path().join("002.png"), 4, 4);

    let step = CompressStep::new(out.path());
    let mut state = PublishState::new(release()).with_working_dir(pages.path());
    step.execute(&mut state, &CancellationFlag::new())
        .await
        .unwrap();

    let archive = state.internal.zip_file_path.clone().unwrap();
    assert_eq!(archive, out.path().join("My Title! - 10.zip"));
    let zip = zip::ZipArchive::new(std::fs::File::open(&archive).unwrap()).unwrap();
    assert_eq!(zip.len(), 2);

    step.undo(&state).await.unwrap();
    assert!(!archive.exists());
    step.undo(&state).await.expect("second undo is a no-op");
}
