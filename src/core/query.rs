//! 查询描述对象。
//!
//! `TagQuery` / `PostQuery` 只描述要取什么数据：过滤条件、排序、数量限制，
//! 以及需要一并加载的关联和计数。真正执行由 [`BlogRepository`] 完成，
//! 每个预加载的关联只对应一次批量查询，不会按文章逐条查询。

use std::cmp::Ordering;

use crate::core::error::BlogError;
use crate::core::repository::BlogRepository;
use crate::models::{LoadedPost, Post, Relation};

/// 标签排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagOrder {
    /// 按标题字母序（默认）
    #[default]
    Title,
    /// 按文章数量降序
    Popular,
}

/// 标签查询
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagQuery {
    pub(crate) title: Option<String>,
    pub(crate) with_posts_count: bool,
    pub(crate) order: TagOrder,
    pub(crate) limit: Option<usize>,
}

impl TagQuery {
    /// 所有标签
    pub fn all() -> Self {
        Self::default()
    }

    /// 附带每个标签的文章数量
    pub fn with_posts_count(mut self) -> Self {
        self.with_posts_count = true;
        self
    }

    /// 按文章数量降序，隐含 `with_posts_count`
    pub fn popular(self) -> Self {
        let mut query = self.with_posts_count();
        query.order = TagOrder::Popular;
        query
    }

    /// 按标题精确匹配（区分大小写）
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order(&self) -> TagOrder {
        self.order
    }
}

/// 文章排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostOrder {
    /// 按发布时间降序（默认）
    #[default]
    Published,
    /// 按点赞人数降序
    Popular,
}

/// 文章查询
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub(crate) slug: Option<String>,
    pub(crate) tag_id: Option<i64>,
    pub(crate) order: PostOrder,
    pub(crate) limit: Option<usize>,
    pub(crate) select_author: bool,
    pub(crate) tags: bool,
    pub(crate) comments: bool,
    pub(crate) comments_count: bool,
    pub(crate) likes_count: bool,
}

impl PostQuery {
    /// 所有文章
    pub fn all() -> Self {
        Self::default()
    }

    /// 按点赞人数降序，附带 `likes_count`
    pub fn popular(mut self) -> Self {
        self.order = PostOrder::Popular;
        self.likes_count = true;
        self
    }

    /// 按发布时间降序
    pub fn order_by_published(mut self) -> Self {
        self.order = PostOrder::Published;
        self
    }

    /// 与文章一起取出作者
    pub fn select_author(mut self) -> Self {
        self.select_author = true;
        self
    }

    /// 批量预加载标签及各标签的文章数量
    pub fn prefetch_tags_with_posts_count(mut self) -> Self {
        self.tags = true;
        self
    }

    /// 批量预加载评论及评论作者
    pub fn prefetch_comments_with_authors(mut self) -> Self {
        self.comments = true;
        self
    }

    /// 作者 + 带计数的标签
    pub fn with_optimized_prefetch(self) -> Self {
        self.select_author().prefetch_tags_with_posts_count()
    }

    /// 附带评论数量
    pub fn with_comments_count(mut self) -> Self {
        self.comments_count = true;
        self
    }

    /// 附带点赞人数
    pub fn with_likes_count(mut self) -> Self {
        self.likes_count = true;
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// 只取带有该标签的文章
    pub fn tagged(mut self, tag_id: i64) -> Self {
        self.tag_id = Some(tag_id);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order(&self) -> PostOrder {
        self.order
    }

    /// 除主查询外需要的批量预加载次数
    pub fn prefetch_count(&self) -> usize {
        usize::from(self.tags) + usize::from(self.comments)
    }
}

/// 文章默认排序：发布时间降序，同一时间按 id 降序
pub fn cmp_published_desc(a: &Post, b: &Post) -> Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// 一次分组查询得到所有文章的评论数，按输入顺序返回
pub async fn fetch_with_comments_count<R: BlogRepository>(
    repo: &R,
    mut posts: Vec<LoadedPost>,
) -> Result<Vec<LoadedPost>, BlogError> {
    if posts.is_empty() {
        return Ok(posts);
    }

    let ids: Vec<i64> = posts.iter().map(|p| p.post.id).collect();
    let counts = repo.comments_count_by_post(&ids).await?;
    for post in &mut posts {
        let count = counts.get(&post.post.id).copied().unwrap_or(0);
        post.comments_count = Relation::Loaded(count);
    }
    Ok(posts)
}
