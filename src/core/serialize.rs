use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::error::BlogError;
use crate::models::{LoadedComment, LoadedPost, LoadedTag, Post};
use crate::utils::{media_url, truncate_chars};

/// 摘要的最大字符数
pub const TEASER_LENGTH: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    pub title: String,
    pub posts_with_tag: u64,
}

/// 列表中的文章
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub title: String,
    pub teaser_text: String,
    pub author: String,
    pub comments_amount: u64,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub slug: String,
    pub tags: Vec<TagRecord>,
    pub first_tag_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    pub text: String,
    pub published_at: DateTime<Utc>,
    pub author: String,
}

/// 详情页中的文章
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDetailRecord {
    pub title: String,
    pub text: String,
    pub author: String,
    pub comments: Vec<CommentRecord>,
    pub likes_amount: u64,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub slug: String,
    pub tags: Vec<TagRecord>,
}

/// 标签需要带 `posts_count`
pub fn serialize_tag(tag: &LoadedTag) -> Result<TagRecord, BlogError> {
    Ok(TagRecord {
        title: tag.tag.title.clone(),
        posts_with_tag: *tag.posts_count.get("posts_count")?,
    })
}

pub fn serialize_tags(tags: &[LoadedTag]) -> Result<Vec<TagRecord>, BlogError> {
    tags.iter().map(serialize_tag).collect()
}

/// 文章需要已加载作者、带计数的标签和 `comments_count`
pub fn serialize_post(post: &LoadedPost, media_prefix: &str) -> Result<PostRecord, BlogError> {
    let tags = serialize_tags(post.tags.get("tags")?)?;
    let first_tag_title = tags.first().map(|t| t.title.clone());

    Ok(PostRecord {
        title: post.post.title.clone(),
        teaser_text: truncate_chars(&post.post.text, TEASER_LENGTH).to_string(),
        author: post.author.get("author")?.username.clone(),
        comments_amount: *post.comments_count.get("comments_count")?,
        image_url: image_url(&post.post, media_prefix),
        published_at: post.post.published_at,
        slug: post.post.slug.clone(),
        tags,
        first_tag_title,
    })
}

pub fn serialize_posts(posts: &[LoadedPost], media_prefix: &str) -> Result<Vec<PostRecord>, BlogError> {
    posts.iter().map(|p| serialize_post(p, media_prefix)).collect()
}

pub fn serialize_comment(comment: &LoadedComment) -> Result<CommentRecord, BlogError> {
    Ok(CommentRecord {
        text: comment.comment.text.clone(),
        published_at: comment.comment.published_at,
        author: comment.author.get("comment author")?.username.clone(),
    })
}

/// 文章需要已加载作者、标签、评论及评论作者和 `likes_count`
pub fn serialize_post_detail(
    post: &LoadedPost,
    media_prefix: &str,
) -> Result<PostDetailRecord, BlogError> {
    let comments = post
        .comments
        .get("comments")?
        .iter()
        .map(serialize_comment)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PostDetailRecord {
        title: post.post.title.clone(),
        text: post.post.text.clone(),
        author: post.author.get("author")?.username.clone(),
        comments,
        likes_amount: *post.likes_count.get("likes_count")?,
        image_url: image_url(&post.post, media_prefix),
        published_at: post.post.published_at,
        slug: post.post.slug.clone(),
        tags: serialize_tags(post.tags.get("tags")?)?,
    })
}

fn image_url(post: &Post, media_prefix: &str) -> Option<String> {
    post.image
        .as_deref()
        .filter(|name| !name.is_empty())
        .map(|name| media_url(media_prefix, name))
}
