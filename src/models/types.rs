use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::BlogError;

/// 标签标题的最大长度
pub const TAG_TITLE_MAX_LENGTH: usize = 20;
/// 文章标题的最大长度
pub const POST_TITLE_MAX_LENGTH: usize = 200;
/// 文章别名的最大长度
pub const POST_SLUG_MAX_LENGTH: usize = 200;

/// 用户（由外部系统维护）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// 只有工作人员可以作为文章作者
    #[serde(default)]
    pub is_staff: bool,
}

/// 标签
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    /// 标签标题，保存时统一转为小写
    pub title: String,
}

impl Tag {
    /// 保存前的规范化
    pub fn clean(&mut self) {
        self.title = self.title.to_lowercase();
    }
}

/// 博客文章
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    /// 文章标题
    pub title: String,
    /// 正文
    pub text: String,
    /// 用于 URL 的别名
    pub slug: String,
    /// 配图（相对媒体目录的路径）
    #[serde(default)]
    pub image: Option<String>,
    /// 发布时间
    pub published_at: DateTime<Utc>,
    /// 作者
    pub author_id: i64,
}

/// 评论
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub published_at: DateTime<Utc>,
}

pub fn post_url(slug: &str) -> String {
    format!("/post/{}/", slug)
}

pub fn tag_url(title: &str) -> String {
    format!("/tag/{}/", title)
}

/// 按查询加载的关联或派生属性。
///
/// 只有请求了对应关联的查询才会得到 `Loaded`，
/// 其余情况下读取会返回 [`BlogError::NotLoaded`]。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relation<T> {
    Deferred,
    Loaded(T),
}

impl<T> Default for Relation<T> {
    fn default() -> Self {
        Relation::Deferred
    }
}

impl<T> Relation<T> {
    pub fn get(&self, attribute: &'static str) -> Result<&T, BlogError> {
        match self {
            Relation::Loaded(value) => Ok(value),
            Relation::Deferred => Err(BlogError::NotLoaded { attribute }),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Relation::Loaded(_))
    }

    pub fn loaded_if(condition: bool, value: impl FnOnce() -> T) -> Self {
        if condition {
            Relation::Loaded(value())
        } else {
            Relation::Deferred
        }
    }
}

/// 查询结果中的标签，带可选的文章数量注解
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTag {
    pub tag: Tag,
    pub posts_count: Relation<u64>,
}

impl LoadedTag {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            posts_count: Relation::Deferred,
        }
    }

    pub fn with_posts_count(tag: Tag, posts_count: u64) -> Self {
        Self {
            tag,
            posts_count: Relation::Loaded(posts_count),
        }
    }
}

/// 查询结果中的评论
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedComment {
    pub comment: Comment,
    pub author: Relation<User>,
}

/// 查询结果中的文章，关联和计数按查询预加载
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPost {
    pub post: Post,
    pub author: Relation<User>,
    pub tags: Relation<Vec<LoadedTag>>,
    pub comments: Relation<Vec<LoadedComment>>,
    pub comments_count: Relation<u64>,
    pub likes_count: Relation<u64>,
}

impl LoadedPost {
    pub fn new(post: Post) -> Self {
        Self {
            post,
            author: Relation::Deferred,
            tags: Relation::Deferred,
            comments: Relation::Deferred,
            comments_count: Relation::Deferred,
            likes_count: Relation::Deferred,
        }
    }

    /// 文章是否带有给定标签（需要已预加载标签）
    pub fn has_tag(&self, title: &str) -> Result<bool, BlogError> {
        Ok(self.tags.get("tags")?.iter().any(|t| t.tag.title == title))
    }
}
