mod common;

use blog_display::core::views::{self, SIDEBAR_SIZE, TAG_PAGE_SIZE};
use blog_display::BlogError;
use blog_display::MemoryRepository;
use common::{dataset, memory_repo, posts_with_tag};

const MEDIA: &str = "/media/";

#[tokio::test]
async fn index_lists_are_bounded() {
    let repo = memory_repo(40);
    let page = views::index(&repo, MEDIA).await.unwrap();

    assert_eq!(page.most_popular_posts.len(), SIDEBAR_SIZE);
    assert_eq!(page.page_posts.len(), SIDEBAR_SIZE);
    assert_eq!(page.popular_tags.len(), SIDEBAR_SIZE);
}

#[tokio::test]
async fn index_fresh_posts_are_newest_first() {
    let repo = memory_repo(40);
    let page = views::index(&repo, MEDIA).await.unwrap();

    let slugs: Vec<_> = page.page_posts.iter().map(|p| p.slug.as_str()).collect();
    assert_eq!(slugs, ["post-40", "post-39", "post-38", "post-37", "post-36"]);
    assert!(page
        .page_posts
        .windows(2)
        .all(|w| w[0].published_at >= w[1].published_at));
}

#[tokio::test]
async fn index_popular_posts_by_likes_then_date() {
    let repo = memory_repo(40);
    let page = views::index(&repo, MEDIA).await.unwrap();

    // 9 个点赞：7、17、27、37；8 个点赞中最新的是 34
    let slugs: Vec<_> = page.most_popular_posts.iter().map(|p| p.slug.as_str()).collect();
    assert_eq!(slugs, ["post-37", "post-27", "post-17", "post-7", "post-34"]);
    assert_eq!(page.most_popular_posts[0].comments_amount, 37 % 4);
}

#[tokio::test]
async fn index_popular_tags_carry_counts() {
    let repo = memory_repo(40);
    let page = views::index(&repo, MEDIA).await.unwrap();

    let rust = &page.popular_tags[0];
    assert_eq!(rust.title, "rust");
    assert_eq!(rust.posts_with_tag as usize, posts_with_tag(repo.dataset(), "rust"));
    assert!(page
        .popular_tags
        .windows(2)
        .all(|w| w[0].posts_with_tag >= w[1].posts_with_tag));
}

#[tokio::test]
async fn index_with_few_posts() {
    let repo = memory_repo(3);
    let page = views::index(&repo, MEDIA).await.unwrap();
    assert_eq!(page.page_posts.len(), 3);
    assert_eq!(page.most_popular_posts.len(), 3);
}

#[tokio::test]
async fn index_on_empty_store() {
    let repo = memory_repo(0);
    let page = views::index(&repo, MEDIA).await.unwrap();
    assert!(page.page_posts.is_empty());
    assert!(page.most_popular_posts.is_empty());
    // 没有文章时标签计数为 0，仍然列出
    assert!(page.popular_tags.iter().all(|t| t.posts_with_tag == 0));
}

#[tokio::test]
async fn untagged_post_has_null_first_tag() {
    let repo = memory_repo(10);
    let page = views::index(&repo, MEDIA).await.unwrap();

    let post = page.page_posts.iter().find(|p| p.slug == "post-10").unwrap();
    assert!(post.tags.is_empty());
    assert_eq!(post.first_tag_title, None);

    let tagged = page.page_posts.iter().find(|p| p.slug == "post-9").unwrap();
    assert_eq!(tagged.first_tag_title.as_deref(), Some(tagged.tags[0].title.as_str()));
    assert_eq!(tagged.image_url.as_deref(), Some("/media/covers/9.png"));
}

#[tokio::test]
async fn post_detail_missing_slug_is_not_found() {
    let repo = memory_repo(10);
    let err = views::post_detail(&repo, MEDIA, "no-such-post").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, BlogError::NotFound { entity: "post", .. }));
}

#[tokio::test]
async fn post_detail_rejects_ambiguous_slug() {
    let mut data = dataset(10);
    data.posts[0].post.slug = "post-5".to_string();
    let repo = MemoryRepository::new(data).unwrap();

    let err = views::post_detail(&repo, MEDIA, "post-5").await.unwrap_err();
    assert!(!err.is_not_found());
    assert!(matches!(err, BlogError::InvalidData(_)));

    // 其他别名不受影响
    assert!(views::post_detail(&repo, MEDIA, "post-6").await.is_ok());
}

#[tokio::test]
async fn post_detail_counts_likes_and_orders_comments() {
    let repo = memory_repo(10);
    let page = views::post_detail(&repo, MEDIA, "post-7").await.unwrap();

    assert_eq!(page.post.likes_amount, 9);
    assert_eq!(page.post.title, "Post 7");
    assert_eq!(page.post.text, "Short body 7");

    let texts: Vec<_> = page.post.comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(
        texts,
        ["Comment 2 on post 7", "Comment 1 on post 7", "Comment 0 on post 7"]
    );
    assert!(page
        .post
        .comments
        .windows(2)
        .all(|w| w[0].published_at <= w[1].published_at));

    assert!(page.popular_tags.len() <= SIDEBAR_SIZE);
    assert!(page.most_popular_posts.len() <= SIDEBAR_SIZE);
}

#[tokio::test]
async fn post_detail_without_likes() {
    let repo = memory_repo(10);
    let page = views::post_detail(&repo, MEDIA, "post-10").await.unwrap();
    assert_eq!(page.post.likes_amount, 0);
    assert!(page.post.tags.is_empty());
}

#[tokio::test]
async fn tag_filter_is_bounded_and_filtered() {
    let repo = memory_repo(60);
    let page = views::tag_filter(&repo, MEDIA, "rust").await.unwrap();

    assert_eq!(page.tag, "rust");
    assert_eq!(page.posts.len(), TAG_PAGE_SIZE);
    assert!(page
        .posts
        .iter()
        .all(|p| p.tags.iter().any(|t| t.title == "rust")));
    assert_eq!(page.posts[0].slug, "post-59");
    assert!(page.posts.windows(2).all(|w| w[0].published_at >= w[1].published_at));
}

#[tokio::test]
async fn tag_filter_small_tag() {
    let repo = memory_repo(12);
    // web 是 (i % 6) + 2 == 2，即 i = 6、12
    let page = views::tag_filter(&repo, MEDIA, "web").await.unwrap();
    let slugs: Vec<_> = page.posts.iter().map(|p| p.slug.as_str()).collect();
    assert_eq!(slugs, ["post-12", "post-6"]);
}

#[tokio::test]
async fn tag_filter_lookup_is_case_sensitive() {
    let repo = memory_repo(10);
    let err = views::tag_filter(&repo, MEDIA, "Rust").await.unwrap_err();
    assert!(matches!(err, BlogError::NotFound { entity: "tag", .. }));

    let err = views::tag_filter(&repo, MEDIA, "missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn round_trips_do_not_grow_with_posts() {
    for n in [10, 100] {
        let repo = memory_repo(n);

        repo.reset_round_trips();
        views::index(&repo, MEDIA).await.unwrap();
        assert_eq!(repo.round_trips(), 6, "index with {} posts", n);

        repo.reset_round_trips();
        views::post_detail(&repo, MEDIA, "post-3").await.unwrap();
        assert_eq!(repo.round_trips(), 7, "post_detail with {} posts", n);

        repo.reset_round_trips();
        views::tag_filter(&repo, MEDIA, "rust").await.unwrap();
        assert_eq!(repo.round_trips(), 7, "tag_filter with {} posts", n);
    }
}

#[tokio::test]
async fn missing_post_stops_after_one_query() {
    let repo = memory_repo(10);
    repo.reset_round_trips();
    let _ = views::post_detail(&repo, MEDIA, "nope").await;
    assert_eq!(repo.round_trips(), 1);
}

#[tokio::test]
async fn contacts_has_empty_context() {
    let page = views::contacts().await.unwrap();
    assert_eq!(serde_json::to_value(&page).unwrap(), serde_json::json!({}));
}
