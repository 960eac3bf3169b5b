mod common;

use std::fs;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use blog_display::core::server::{routes, AppState, Server};
use blog_display::theme::{SiteInfo, ThemeRenderer};
use blog_display::MemoryRepository;
use common::{dataset, memory_repo};
use tower::ServiceExt;

fn state(repo: MemoryRepository) -> AppState<MemoryRepository> {
    let renderer = ThemeRenderer::new(
        SiteInfo {
            title: "Integration Blog".to_string(),
            description: Some("served in tests".to_string()),
        },
        None,
    )
    .unwrap();
    AppState::new(repo, renderer, "/media/")
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn index_renders() {
    let app = routes(state(memory_repo(12)));
    let (status, body) = get(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Integration Blog"));
    assert!(body.contains("Post 12"));
}

#[tokio::test]
async fn post_detail_with_and_without_trailing_slash() {
    for uri in ["/post/post-3/", "/post/post-3"] {
        let app = routes(state(memory_repo(12)));
        let (status, body) = get(app, uri).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert!(body.contains("Post 3"));
        assert!(body.contains("Comment 0 on post 3"));
    }
}

#[tokio::test]
async fn missing_post_is_404() {
    let app = routes(state(memory_repo(12)));
    let (status, body) = get(app, "/post/missing/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("404"));
}

#[tokio::test]
async fn ambiguous_slug_is_500() {
    let mut data = dataset(6);
    data.posts[0].post.slug = "post-2".to_string();
    let app = routes(state(MemoryRepository::new(data).unwrap()));
    let (status, body) = get(app, "/post/post-2/").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("500"));
}

#[tokio::test]
async fn tag_pages() {
    let app = routes(state(memory_repo(12)));
    let (status, body) = get(app, "/tag/rust/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("rust"));

    let app = routes(state(memory_repo(12)));
    let (status, _) = get(app, "/tag/Rust/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn contacts_renders() {
    for uri in ["/contacts/", "/contacts"] {
        let app = routes(state(memory_repo(1)));
        let (status, body) = get(app, uri).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert!(body.contains("Contacts"));
    }
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = routes(state(memory_repo(1)));
    let (status, _) = get(app, "/archive/2024/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn media_files_are_served_under_media_url() {
    let dir = std::env::temp_dir().join(format!("blog-display-media-{}", std::process::id()));
    fs::create_dir_all(dir.join("covers")).unwrap();
    fs::write(dir.join("covers").join("3.png"), b"not really a png").unwrap();

    let app = Server::new(state(memory_repo(3)), 0)
        .with_media_dir("/media/", Some(dir.clone()))
        .router();
    let (status, body) = get(app, "/media/covers/3.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "not really a png");

    fs::remove_dir_all(&dir).unwrap();
}
