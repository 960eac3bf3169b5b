use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::BlogError;
use crate::models::types::{
    Comment, Post, Tag, User, POST_SLUG_MAX_LENGTH, POST_TITLE_MAX_LENGTH, TAG_TITLE_MAX_LENGTH,
};
use crate::utils::slugify;

/// 数据文件中的文章条目：文章本身加上多对多关联
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostEntry {
    #[serde(flatten)]
    pub post: Post,
    /// 点赞用户
    #[serde(default)]
    pub likes: Vec<i64>,
    /// 标签
    #[serde(default)]
    pub tags: Vec<i64>,
}

/// 存储中的全部数据，用于填充仓库
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub posts: Vec<PostEntry>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Dataset {
    /// 从 YAML 数据文件加载（未清洗）
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read data file: {}", path.display()))?;
        let dataset: Dataset = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse data file: {}", path.display()))?;
        debug!(
            "Loaded {} posts, {} tags, {} comments from {}",
            dataset.posts.len(),
            dataset.tags.len(),
            dataset.comments.len(),
            path.display()
        );
        Ok(dataset)
    }

    /// 保存为 YAML 数据文件
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// 按保存规则清洗数据：
    /// 标签标题转小写且唯一，字段长度受限，作者必须是工作人员，所有引用都必须存在。
    pub fn clean(mut self) -> Result<Self, BlogError> {
        let mut user_ids = HashSet::new();
        let mut usernames = HashSet::new();
        for user in &self.users {
            if !user_ids.insert(user.id) {
                return Err(BlogError::invalid(format!("duplicate user id {}", user.id)));
            }
            if !usernames.insert(user.username.as_str()) {
                return Err(BlogError::invalid(format!(
                    "duplicate username '{}'",
                    user.username
                )));
            }
        }
        let staff: HashSet<i64> = self
            .users
            .iter()
            .filter(|u| u.is_staff)
            .map(|u| u.id)
            .collect();

        let mut tag_ids = HashSet::new();
        let mut tag_titles = HashSet::new();
        for tag in &mut self.tags {
            tag.clean();
            if tag.title.is_empty() || tag.title.chars().count() > TAG_TITLE_MAX_LENGTH {
                return Err(BlogError::invalid(format!(
                    "tag {} title must be 1..={} characters",
                    tag.id, TAG_TITLE_MAX_LENGTH
                )));
            }
            if !tag_ids.insert(tag.id) {
                return Err(BlogError::invalid(format!("duplicate tag id {}", tag.id)));
            }
            if !tag_titles.insert(tag.title.clone()) {
                return Err(BlogError::invalid(format!(
                    "duplicate tag title '{}'",
                    tag.title
                )));
            }
        }

        let mut post_ids = HashSet::new();
        for entry in &mut self.posts {
            let post = &mut entry.post;
            if !post_ids.insert(post.id) {
                return Err(BlogError::invalid(format!("duplicate post id {}", post.id)));
            }
            if post.title.is_empty() || post.title.chars().count() > POST_TITLE_MAX_LENGTH {
                return Err(BlogError::invalid(format!(
                    "post {} title must be 1..={} characters",
                    post.id, POST_TITLE_MAX_LENGTH
                )));
            }
            if !is_valid_slug(&post.slug) {
                return Err(BlogError::invalid(format!(
                    "post {} has invalid slug '{}'",
                    post.id, post.slug
                )));
            }
            if !user_ids.contains(&post.author_id) {
                return Err(BlogError::invalid(format!(
                    "post {} references unknown author {}",
                    post.id, post.author_id
                )));
            }
            if !staff.contains(&post.author_id) {
                return Err(BlogError::invalid(format!(
                    "post {} author {} is not staff",
                    post.id, post.author_id
                )));
            }
            if post.image.as_deref().is_some_and(str::is_empty) {
                post.image = None;
            }

            dedup_in_place(&mut entry.likes);
            if let Some(user) = entry.likes.iter().find(|id| !user_ids.contains(id)) {
                return Err(BlogError::invalid(format!(
                    "post {} liked by unknown user {}",
                    entry.post.id, user
                )));
            }
            dedup_in_place(&mut entry.tags);
            if let Some(tag) = entry.tags.iter().find(|id| !tag_ids.contains(id)) {
                return Err(BlogError::invalid(format!(
                    "post {} references unknown tag {}",
                    entry.post.id, tag
                )));
            }
        }

        let mut comment_ids = HashSet::new();
        for comment in &self.comments {
            if !comment_ids.insert(comment.id) {
                return Err(BlogError::invalid(format!(
                    "duplicate comment id {}",
                    comment.id
                )));
            }
            if !post_ids.contains(&comment.post_id) {
                return Err(BlogError::invalid(format!(
                    "comment {} references unknown post {}",
                    comment.id, comment.post_id
                )));
            }
            if !user_ids.contains(&comment.author_id) {
                return Err(BlogError::invalid(format!(
                    "comment {} references unknown author {}",
                    comment.id, comment.author_id
                )));
            }
        }

        Ok(self)
    }

    pub fn user(&self, id: i64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn tag(&self, id: i64) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }

    /// 每个标签下的文章数量
    pub fn posts_per_tag(&self) -> HashMap<i64, u64> {
        let mut counts = HashMap::new();
        for entry in &self.posts {
            for tag in &entry.tags {
                *counts.entry(*tag).or_insert(0) += 1;
            }
        }
        counts
    }

    /// 示例站点数据，`init` 时写入 data.yml
    pub fn sample() -> Self {
        let users = vec![
            User {
                id: 1,
                username: "editor".to_string(),
                is_staff: true,
            },
            User {
                id: 2,
                username: "reader".to_string(),
                is_staff: false,
            },
        ];
        let tags = ["rust", "web", "notes"]
            .iter()
            .enumerate()
            .map(|(i, title)| Tag {
                id: i as i64 + 1,
                title: title.to_string(),
            })
            .collect();

        let start = Utc::now() - Duration::days(7);
        let titles = [
            ("Hello World", vec![1, 3]),
            ("Building a Blog in Rust", vec![1, 2]),
            ("Serving Pages with Axum", vec![2]),
        ];
        let posts = titles
            .iter()
            .enumerate()
            .map(|(i, (title, tags))| PostEntry {
                post: Post {
                    id: i as i64 + 1,
                    title: title.to_string(),
                    text: format!("# {}\n\nThis is a sample post. Edit data.yml to replace it.", title),
                    slug: slugify(title),
                    image: None,
                    published_at: start + Duration::days(i as i64),
                    author_id: 1,
                },
                likes: if i == 0 { vec![2] } else { Vec::new() },
                tags: tags.clone(),
            })
            .collect();
        let comments = vec![Comment {
            id: 1,
            post_id: 1,
            author_id: 2,
            text: "Nice first post!".to_string(),
            published_at: start + Duration::hours(2),
        }];

        info!("Generated sample dataset");
        Dataset {
            users,
            tags,
            posts,
            comments,
        }
    }
}

/// 别名只允许字母、数字、下划线和连字符
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.chars().count() <= POST_SLUG_MAX_LENGTH
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn dedup_in_place(ids: &mut Vec<i64>) {
    let mut seen = HashSet::new();
    ids.retain(|id| seen.insert(*id));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Dataset {
        Dataset::sample()
    }

    #[test]
    fn sample_dataset_is_clean() {
        let cleaned = base().clean().unwrap();
        assert_eq!(cleaned.posts.len(), 3);
        assert_eq!(cleaned.posts[1].post.slug, "building-a-blog-in-rust");
    }

    #[test]
    fn clean_lowercases_tags_and_rejects_case_duplicates() {
        let mut data = base();
        data.tags[0].title = "Rust".to_string();
        let cleaned = data.clone().clean().unwrap();
        assert_eq!(cleaned.tags[0].title, "rust");

        data.tags[1].title = "RUST".to_string();
        let err = data.clean().unwrap_err();
        assert!(err.to_string().contains("duplicate tag title"));
    }

    #[test]
    fn clean_rejects_non_staff_author() {
        let mut data = base();
        data.posts[0].post.author_id = 2;
        let err = data.clean().unwrap_err();
        assert!(err.to_string().contains("is not staff"));
    }

    #[test]
    fn clean_rejects_dangling_references() {
        let mut data = base();
        data.posts[0].tags.push(99);
        assert!(data.clean().is_err());

        let mut data = base();
        data.comments[0].post_id = 42;
        assert!(data.clean().is_err());
    }

    #[test]
    fn clean_rejects_long_tag_title() {
        let mut data = base();
        data.tags[0].title = "a".repeat(TAG_TITLE_MAX_LENGTH + 1);
        assert!(data.clean().is_err());
    }

    #[test]
    fn clean_normalizes_empty_image_and_duplicate_likes() {
        let mut data = base();
        data.posts[0].post.image = Some(String::new());
        data.posts[0].likes = vec![2, 2, 1, 2];
        let cleaned = data.clean().unwrap();
        assert_eq!(cleaned.posts[0].post.image, None);
        assert_eq!(cleaned.posts[0].likes, vec![2, 1]);
    }

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("hello-world_2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("hello world"));
        assert!(!is_valid_slug("привет"));
    }

    #[test]
    fn dataset_parses_from_yaml() {
        let yaml = r#"
users:
  - id: 1
    username: admin
    is_staff: true
tags:
  - id: 1
    title: Rust
posts:
  - id: 1
    title: First
    text: Body
    slug: first
    published_at: 2024-05-01T10:00:00Z
    author_id: 1
    tags: [1]
"#;
        let data: Dataset = serde_yaml::from_str(yaml).unwrap();
        let data = data.clean().unwrap();
        assert_eq!(data.tags[0].title, "rust");
        assert_eq!(data.posts[0].tags, vec![1]);
        assert!(data.posts[0].likes.is_empty());
        assert_eq!(data.posts_per_tag().get(&1), Some(&1));
    }
}
