use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info};

use crate::core::error::BlogError;
use crate::core::query::{PostOrder, PostQuery, TagOrder, TagQuery};
use crate::core::repository::BlogRepository;
use crate::models::{
    Comment, Dataset, LoadedComment, LoadedPost, LoadedTag, Post, Relation, Tag, User,
};

const COMMENTS_COUNT_SQL: &str =
    "(SELECT COUNT(*) FROM blog_comment c WHERE c.post_id = p.id)";
const LIKES_COUNT_SQL: &str =
    "(SELECT COUNT(DISTINCT l.user_id) FROM blog_post_likes l WHERE l.post_id = p.id)";

/// SQLite 仓库。
///
/// 计数通过聚合查询得到，关联按 `IN (...)` 一次批量取出。
#[derive(Clone)]
pub struct SqlRepository {
    pool: SqlitePool,
}

impl SqlRepository {
    /// 连接数据库并执行迁移
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, BlogError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // 内存数据库只存在于单个连接中
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { max_connections.max(1) })
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Connected to {}", database_url);
        Ok(Self { pool })
    }

    /// 清洗数据集后在一个事务中写入
    pub async fn seed(&self, dataset: Dataset) -> Result<(), BlogError> {
        let data = dataset.clean()?;
        let mut tx = self.pool.begin().await?;

        for user in &data.users {
            sqlx::query("INSERT INTO auth_user (id, username, is_staff) VALUES (?, ?, ?)")
                .bind(user.id)
                .bind(&user.username)
                .bind(user.is_staff)
                .execute(&mut *tx)
                .await?;
        }
        for tag in &data.tags {
            sqlx::query("INSERT INTO blog_tag (id, title) VALUES (?, ?)")
                .bind(tag.id)
                .bind(&tag.title)
                .execute(&mut *tx)
                .await?;
        }
        for entry in &data.posts {
            let post = &entry.post;
            sqlx::query(
                "INSERT INTO blog_post (id, title, text, slug, image, published_at, author_id) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(post.id)
            .bind(&post.title)
            .bind(&post.text)
            .bind(&post.slug)
            .bind(&post.image)
            .bind(post.published_at)
            .bind(post.author_id)
            .execute(&mut *tx)
            .await?;

            for user_id in &entry.likes {
                sqlx::query("INSERT INTO blog_post_likes (post_id, user_id) VALUES (?, ?)")
                    .bind(post.id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
            }
            for tag_id in &entry.tags {
                sqlx::query("INSERT INTO blog_post_tags (post_id, tag_id) VALUES (?, ?)")
                    .bind(post.id)
                    .bind(tag_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        for comment in &data.comments {
            sqlx::query(
                "INSERT INTO blog_comment (id, post_id, author_id, text, published_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(comment.id)
            .bind(comment.post_id)
            .bind(comment.author_id)
            .bind(&comment.text)
            .bind(comment.published_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(
            "Seeded database with {} posts, {} tags, {} comments",
            data.posts.len(),
            data.tags.len(),
            data.comments.len()
        );
        Ok(())
    }

    /// 数据库中是否还没有文章
    pub async fn is_empty(&self) -> Result<bool, BlogError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM blog_post")
            .fetch_one(&self.pool)
            .await?;
        Ok(count(&row, "n")? == 0)
    }

    async fn prefetch_tags(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<LoadedTag>>, BlogError> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT pt.post_id, t.id, t.title, \
             (SELECT COUNT(*) FROM blog_post_tags x WHERE x.tag_id = t.id) AS posts_count \
             FROM blog_post_tags pt JOIN blog_tag t ON t.id = pt.tag_id \
             WHERE pt.post_id IN ",
        );
        push_id_list(&mut qb, post_ids);
        qb.push(" ORDER BY t.title ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut tags: HashMap<i64, Vec<LoadedTag>> = HashMap::new();
        for row in &rows {
            let tag = Tag {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
            };
            tags.entry(row.try_get("post_id")?)
                .or_default()
                .push(LoadedTag::with_posts_count(tag, count(row, "posts_count")?));
        }
        Ok(tags)
    }

    async fn prefetch_comments(
        &self,
        post_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<LoadedComment>>, BlogError> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT c.id, c.post_id, c.author_id, c.text, c.published_at, \
             u.username, u.is_staff \
             FROM blog_comment c JOIN auth_user u ON u.id = c.author_id \
             WHERE c.post_id IN ",
        );
        push_id_list(&mut qb, post_ids);
        qb.push(" ORDER BY c.published_at ASC, c.id ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut comments: HashMap<i64, Vec<LoadedComment>> = HashMap::new();
        for row in &rows {
            let comment = Comment {
                id: row.try_get("id")?,
                post_id: row.try_get("post_id")?,
                author_id: row.try_get("author_id")?,
                text: row.try_get("text")?,
                published_at: row.try_get("published_at")?,
            };
            let author = User {
                id: comment.author_id,
                username: row.try_get("username")?,
                is_staff: row.try_get("is_staff")?,
            };
            comments.entry(comment.post_id).or_default().push(LoadedComment {
                comment,
                author: Relation::Loaded(author),
            });
        }
        Ok(comments)
    }
}

impl BlogRepository for SqlRepository {
    async fn tags(&self, query: &TagQuery) -> Result<Vec<LoadedTag>, BlogError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT t.id, t.title");
        if query.with_posts_count {
            qb.push(", COUNT(pt.post_id) AS posts_count FROM blog_tag t \
                     LEFT JOIN blog_post_tags pt ON pt.tag_id = t.id");
        } else {
            qb.push(" FROM blog_tag t");
        }
        if let Some(title) = &query.title {
            qb.push(" WHERE t.title = ").push_bind(title.clone());
        }
        if query.with_posts_count {
            qb.push(" GROUP BY t.id, t.title");
        }
        match query.order {
            TagOrder::Title => qb.push(" ORDER BY t.title ASC"),
            TagOrder::Popular => qb.push(" ORDER BY posts_count DESC, t.title ASC"),
        };
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut tags = Vec::with_capacity(rows.len());
        for row in &rows {
            let tag = Tag {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
            };
            tags.push(if query.with_posts_count {
                LoadedTag::with_posts_count(tag, count(row, "posts_count")?)
            } else {
                LoadedTag::new(tag)
            });
        }

        debug!("tags query {:?} -> {} rows", query, tags.len());
        Ok(tags)
    }

    async fn posts(&self, query: &PostQuery) -> Result<Vec<LoadedPost>, BlogError> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT p.id, p.title, p.text, p.slug, p.image, p.published_at, p.author_id",
        );
        if query.select_author {
            qb.push(", u.username AS author_username, u.is_staff AS author_is_staff");
        }
        if query.comments_count {
            qb.push(format!(", {} AS comments_count", COMMENTS_COUNT_SQL));
        }
        if query.likes_count {
            qb.push(format!(", {} AS likes_count", LIKES_COUNT_SQL));
        }
        qb.push(" FROM blog_post p");
        if query.select_author {
            qb.push(" JOIN auth_user u ON u.id = p.author_id");
        }

        let mut has_where = false;
        if let Some(slug) = &query.slug {
            qb.push(" WHERE p.slug = ").push_bind(slug.clone());
            has_where = true;
        }
        if let Some(tag_id) = query.tag_id {
            qb.push(if has_where { " AND " } else { " WHERE " });
            qb.push("p.id IN (SELECT pt.post_id FROM blog_post_tags pt WHERE pt.tag_id = ")
                .push_bind(tag_id)
                .push(")");
        }

        match query.order {
            PostOrder::Published => qb.push(" ORDER BY p.published_at DESC, p.id DESC"),
            PostOrder::Popular => qb.push(format!(
                " ORDER BY {} DESC, p.published_at DESC, p.id DESC",
                LIKES_COUNT_SQL
            )),
        };
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut posts = Vec::with_capacity(rows.len());
        for row in &rows {
            posts.push(post_from_row(row, query)?);
        }
        if posts.is_empty() {
            return Ok(posts);
        }

        let ids: Vec<i64> = posts.iter().map(|p| p.post.id).collect();
        if query.tags {
            let mut tags = self.prefetch_tags(&ids).await?;
            for post in &mut posts {
                post.tags = Relation::Loaded(tags.remove(&post.post.id).unwrap_or_default());
            }
        }
        if query.comments {
            let mut comments = self.prefetch_comments(&ids).await?;
            for post in &mut posts {
                post.comments =
                    Relation::Loaded(comments.remove(&post.post.id).unwrap_or_default());
            }
        }

        debug!("posts query {:?} -> {} rows", query, posts.len());
        Ok(posts)
    }

    async fn comments_count_by_post(&self, post_ids: &[i64]) -> Result<HashMap<i64, u64>, BlogError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT post_id, COUNT(*) AS comments_count FROM blog_comment WHERE post_id IN ",
        );
        push_id_list(&mut qb, post_ids);
        qb.push(" GROUP BY post_id");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut counts = HashMap::with_capacity(rows.len());
        for row in &rows {
            counts.insert(row.try_get("post_id")?, count(row, "comments_count")?);
        }
        Ok(counts)
    }
}

fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    qb.push("(");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

fn count(row: &SqliteRow, column: &str) -> Result<u64, sqlx::Error> {
    let value: i64 = row.try_get(column)?;
    Ok(value.max(0) as u64)
}

fn post_from_row(row: &SqliteRow, query: &PostQuery) -> Result<LoadedPost, sqlx::Error> {
    let post = Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        text: row.try_get("text")?,
        slug: row.try_get("slug")?,
        image: row.try_get("image")?,
        published_at: row.try_get("published_at")?,
        author_id: row.try_get("author_id")?,
    };
    let mut loaded = LoadedPost::new(post);
    if query.select_author {
        loaded.author = Relation::Loaded(User {
            id: loaded.post.author_id,
            username: row.try_get("author_username")?,
            is_staff: row.try_get("author_is_staff")?,
        });
    }
    if query.comments_count {
        loaded.comments_count = Relation::Loaded(count(row, "comments_count")?);
    }
    if query.likes_count {
        loaded.likes_count = Relation::Loaded(count(row, "likes_count")?);
    }
    Ok(loaded)
}
