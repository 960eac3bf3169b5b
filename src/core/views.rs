//! 页面组装：按页面需要组合查询，再把结果序列化为模板上下文。

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::error::BlogError;
use crate::core::query::{fetch_with_comments_count, PostQuery, TagQuery};
use crate::core::repository::BlogRepository;
use crate::core::serialize::{
    serialize_post_detail, serialize_posts, serialize_tags, PostDetailRecord, PostRecord,
    TagRecord,
};
use crate::models::LoadedPost;

/// 首页和侧栏每个列表的条数
pub const SIDEBAR_SIZE: usize = 5;
/// 标签页最多展示的文章数
pub const TAG_PAGE_SIZE: usize = 20;

/// 模板上下文，知道自己由哪个模板渲染
pub trait Page: Serialize {
    const TEMPLATE: &'static str;
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexContext {
    pub most_popular_posts: Vec<PostRecord>,
    pub page_posts: Vec<PostRecord>,
    pub popular_tags: Vec<TagRecord>,
}

impl Page for IndexContext {
    const TEMPLATE: &'static str = "index.html";
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetailContext {
    pub post: PostDetailRecord,
    pub popular_tags: Vec<TagRecord>,
    pub most_popular_posts: Vec<PostRecord>,
}

impl Page for PostDetailContext {
    const TEMPLATE: &'static str = "post-details.html";
}

#[derive(Debug, Clone, Serialize)]
pub struct TagFilterContext {
    pub tag: String,
    pub popular_tags: Vec<TagRecord>,
    pub posts: Vec<PostRecord>,
    pub most_popular_posts: Vec<PostRecord>,
}

impl Page for TagFilterContext {
    const TEMPLATE: &'static str = "posts-list.html";
}

// 访问统计和留言以后再加
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactsContext {}

impl Page for ContactsContext {
    const TEMPLATE: &'static str = "contacts.html";
}

/// 点赞最多的文章，带作者、标签和评论数
async fn most_popular_posts<R: BlogRepository>(repo: &R) -> Result<Vec<LoadedPost>, BlogError> {
    let query = PostQuery::all()
        .popular()
        .with_optimized_prefetch()
        .limit(SIDEBAR_SIZE);
    let posts = repo.posts(&query).await?;
    fetch_with_comments_count(repo, posts).await
}

async fn popular_tags<R: BlogRepository>(repo: &R) -> Result<Vec<TagRecord>, BlogError> {
    let tags = repo.tags(&TagQuery::all().popular().limit(SIDEBAR_SIZE)).await?;
    serialize_tags(&tags)
}

pub async fn index<R: BlogRepository>(repo: &R, media_url: &str) -> Result<IndexContext, BlogError> {
    let most_popular = most_popular_posts(repo).await?;

    let fresh_query = PostQuery::all()
        .with_optimized_prefetch()
        .with_comments_count()
        .order_by_published()
        .limit(SIDEBAR_SIZE);
    let most_fresh = repo.posts(&fresh_query).await?;

    let popular_tags = popular_tags(repo).await?;

    debug!(
        "index: {} popular, {} fresh, {} tags",
        most_popular.len(),
        most_fresh.len(),
        popular_tags.len()
    );
    Ok(IndexContext {
        most_popular_posts: serialize_posts(&most_popular, media_url)?,
        page_posts: serialize_posts(&most_fresh, media_url)?,
        popular_tags,
    })
}

pub async fn post_detail<R: BlogRepository>(
    repo: &R,
    media_url: &str,
    slug: &str,
) -> Result<PostDetailContext, BlogError> {
    let query = PostQuery::all()
        .slug(slug)
        .select_author()
        .prefetch_tags_with_posts_count()
        .prefetch_comments_with_authors()
        .with_likes_count()
        .limit(2);
    let mut matches = repo.posts(&query).await?;
    let post = match matches.len() {
        0 => return Err(BlogError::not_found("post", slug)),
        1 => matches.swap_remove(0),
        _ => {
            warn!("slug '{}' matches more than one post", slug);
            return Err(BlogError::invalid(format!(
                "slug '{}' matches more than one post",
                slug
            )));
        }
    };

    let popular_tags = popular_tags(repo).await?;
    let most_popular = most_popular_posts(repo).await?;

    Ok(PostDetailContext {
        post: serialize_post_detail(&post, media_url)?,
        popular_tags,
        most_popular_posts: serialize_posts(&most_popular, media_url)?,
    })
}

/// 标题按原样精确匹配，不做小写转换
pub async fn tag_filter<R: BlogRepository>(
    repo: &R,
    media_url: &str,
    tag_title: &str,
) -> Result<TagFilterContext, BlogError> {
    let tag = repo
        .tags(&TagQuery::all().with_posts_count().title(tag_title).limit(1))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| BlogError::not_found("tag", tag_title))?;

    let popular_tags = popular_tags(repo).await?;
    let most_popular = most_popular_posts(repo).await?;

    let related_query = PostQuery::all()
        .tagged(tag.tag.id)
        .with_optimized_prefetch()
        .with_comments_count()
        .limit(TAG_PAGE_SIZE);
    let related = repo.posts(&related_query).await?;

    Ok(TagFilterContext {
        tag: tag.tag.title,
        popular_tags,
        posts: serialize_posts(&related, media_url)?,
        most_popular_posts: serialize_posts(&most_popular, media_url)?,
    })
}

pub async fn contacts() -> Result<ContactsContext, BlogError> {
    Ok(ContactsContext::default())
}
