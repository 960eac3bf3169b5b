use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::core::error::BlogError;
use crate::core::query::{cmp_published_desc, PostOrder, PostQuery, TagOrder, TagQuery};
use crate::core::repository::BlogRepository;
use crate::models::{Dataset, LoadedComment, LoadedPost, LoadedTag, PostEntry, Relation};

/// 基于内存数据集的仓库。
///
/// 数据在创建时清洗一次，之后只读。每次主查询和每个批量预加载
/// 都计为一次往返，便于检查页面不会随文章数量增加查询次数。
#[derive(Clone)]
pub struct MemoryRepository {
    data: Arc<Dataset>,
    round_trips: Arc<AtomicUsize>,
}

impl MemoryRepository {
    pub fn new(dataset: Dataset) -> Result<Self, BlogError> {
        let data = dataset.clean()?;
        info!(
            "Memory repository ready: {} posts, {} tags, {} comments",
            data.posts.len(),
            data.tags.len(),
            data.comments.len()
        );
        Ok(Self {
            data: Arc::new(data),
            round_trips: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// 从 YAML 数据文件创建
    pub fn from_file(path: &Path) -> Result<Self> {
        let dataset = Dataset::from_file(path)?;
        Ok(Self::new(dataset)?)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.data
    }

    /// 目前为止的往返次数
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    pub fn reset_round_trips(&self) {
        self.round_trips.store(0, Ordering::SeqCst);
    }

    fn record(&self, trips: usize) {
        self.round_trips.fetch_add(trips, Ordering::SeqCst);
    }

    fn likes_count(entry: &PostEntry) -> u64 {
        entry.likes.len() as u64
    }

    fn comments_count(&self, post_id: i64) -> u64 {
        self.data
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .count() as u64
    }

    fn tags_of(&self, entry: &PostEntry, posts_per_tag: &HashMap<i64, u64>) -> Vec<LoadedTag> {
        let mut tags: Vec<LoadedTag> = entry
            .tags
            .iter()
            .filter_map(|id| self.data.tag(*id))
            .map(|tag| {
                let count = posts_per_tag.get(&tag.id).copied().unwrap_or(0);
                LoadedTag::with_posts_count(tag.clone(), count)
            })
            .collect();
        tags.sort_by(|a, b| a.tag.title.cmp(&b.tag.title));
        tags
    }

    fn comments_of(&self, post_id: i64) -> Vec<LoadedComment> {
        let mut comments: Vec<LoadedComment> = self
            .data
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| LoadedComment {
                comment: c.clone(),
                author: match self.data.user(c.author_id) {
                    Some(user) => Relation::Loaded(user.clone()),
                    None => Relation::Deferred,
                },
            })
            .collect();
        comments.sort_by(|a, b| {
            a.comment
                .published_at
                .cmp(&b.comment.published_at)
                .then_with(|| a.comment.id.cmp(&b.comment.id))
        });
        comments
    }
}

impl BlogRepository for MemoryRepository {
    async fn tags(&self, query: &TagQuery) -> Result<Vec<LoadedTag>, BlogError> {
        self.record(1);
        let posts_per_tag = self.data.posts_per_tag();

        let mut tags: Vec<LoadedTag> = self
            .data
            .tags
            .iter()
            .filter(|t| query.title.as_deref().map_or(true, |title| t.title == title))
            .map(|t| {
                let count = posts_per_tag.get(&t.id).copied().unwrap_or(0);
                LoadedTag {
                    tag: t.clone(),
                    posts_count: Relation::loaded_if(query.with_posts_count, || count),
                }
            })
            .collect();

        match query.order {
            TagOrder::Title => tags.sort_by(|a, b| a.tag.title.cmp(&b.tag.title)),
            TagOrder::Popular => tags.sort_by(|a, b| {
                let count = |t: &LoadedTag| posts_per_tag.get(&t.tag.id).copied().unwrap_or(0);
                count(b)
                    .cmp(&count(a))
                    .then_with(|| a.tag.title.cmp(&b.tag.title))
            }),
        }
        if let Some(limit) = query.limit {
            tags.truncate(limit);
        }

        debug!("tags query {:?} -> {} rows", query, tags.len());
        Ok(tags)
    }

    async fn posts(&self, query: &PostQuery) -> Result<Vec<LoadedPost>, BlogError> {
        let mut entries: Vec<&PostEntry> = self
            .data
            .posts
            .iter()
            .filter(|e| query.slug.as_deref().map_or(true, |slug| e.post.slug == slug))
            .filter(|e| query.tag_id.map_or(true, |tag| e.tags.contains(&tag)))
            .collect();

        match query.order {
            PostOrder::Published => entries.sort_by(|a, b| cmp_published_desc(&a.post, &b.post)),
            PostOrder::Popular => entries.sort_by(|a, b| {
                Self::likes_count(b)
                    .cmp(&Self::likes_count(a))
                    .then_with(|| cmp_published_desc(&a.post, &b.post))
            }),
        }
        if let Some(limit) = query.limit {
            entries.truncate(limit);
        }

        // 主查询一次，每个预加载一次；没有结果时不再预加载
        let prefetches = if entries.is_empty() { 0 } else { query.prefetch_count() };
        self.record(1 + prefetches);

        let posts_per_tag = if query.tags {
            self.data.posts_per_tag()
        } else {
            HashMap::new()
        };

        let posts = entries
            .into_iter()
            .map(|entry| {
                let id = entry.post.id;
                LoadedPost {
                    post: entry.post.clone(),
                    author: match self.data.user(entry.post.author_id) {
                        Some(user) if query.select_author => Relation::Loaded(user.clone()),
                        _ => Relation::Deferred,
                    },
                    tags: Relation::loaded_if(query.tags, || self.tags_of(entry, &posts_per_tag)),
                    comments: Relation::loaded_if(query.comments, || self.comments_of(id)),
                    comments_count: Relation::loaded_if(query.comments_count, || {
                        self.comments_count(id)
                    }),
                    likes_count: Relation::loaded_if(query.likes_count, || {
                        Self::likes_count(entry)
                    }),
                }
            })
            .collect::<Vec<_>>();

        debug!("posts query {:?} -> {} rows", query, posts.len());
        Ok(posts)
    }

    async fn comments_count_by_post(&self, post_ids: &[i64]) -> Result<HashMap<i64, u64>, BlogError> {
        self.record(1);
        let mut counts = HashMap::new();
        for comment in &self.data.comments {
            if post_ids.contains(&comment.post_id) {
                *counts.entry(comment.post_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}
