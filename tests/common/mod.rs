//! 集成测试共用的数据和仓库构造

use blog_display::core::memory::MemoryRepository;
use blog_display::models::{Comment, Dataset, Post, PostEntry, Tag, User};
use chrono::{DateTime, Duration, TimeZone, Utc};

pub const TAG_TITLES: [&str; 7] = ["rust", "web", "async", "cli", "notes", "sql", "tera"];

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// `n` 篇文章的数据集。
///
/// - 用户 1-2 是工作人员，3-12 是读者
/// - 除编号为 10 的倍数的文章外，都带 `rust` 标签和另一个标签
/// - 第 i 篇有 `(i * 7) % 10` 个点赞、`i % 4` 条评论
pub fn dataset(n: i64) -> Dataset {
    let users = (1..=12)
        .map(|id| User {
            id,
            username: format!("user{}", id),
            is_staff: id <= 2,
        })
        .collect();

    let tags = TAG_TITLES
        .iter()
        .enumerate()
        .map(|(i, title)| Tag {
            id: i as i64 + 1,
            title: title.to_string(),
        })
        .collect();

    let mut posts = Vec::new();
    let mut comments = Vec::new();
    for i in 1..=n {
        let published_at = start() + Duration::hours(i);
        let text = if i % 2 == 0 {
            "lorem ipsum ".repeat(40)
        } else {
            format!("Short body {}", i)
        };
        posts.push(PostEntry {
            post: Post {
                id: i,
                title: format!("Post {}", i),
                text,
                slug: format!("post-{}", i),
                image: (i % 3 == 0).then(|| format!("covers/{}.png", i)),
                published_at,
                author_id: i % 2 + 1,
            },
            likes: (0..(i * 7) % 10).map(|u| u + 3).collect(),
            tags: if i % 10 == 0 { vec![] } else { vec![1, i % 6 + 2] },
        });

        for c in 0..i % 4 {
            let id = comments.len() as i64 + 1;
            comments.push(Comment {
                id,
                post_id: i,
                author_id: id % 10 + 3,
                text: format!("Comment {} on post {}", c, i),
                published_at: published_at + Duration::minutes(30 - c * 10),
            });
        }
    }

    Dataset {
        users,
        tags,
        posts,
        comments,
    }
}

pub fn memory_repo(n: i64) -> MemoryRepository {
    MemoryRepository::new(dataset(n)).unwrap()
}

/// 带 `tag` 标签的文章数
#[allow(dead_code)]
pub fn posts_with_tag(data: &Dataset, tag: &str) -> usize {
    let Some(tag) = data.tags.iter().find(|t| t.title == tag) else {
        return 0;
    };
    data.posts.iter().filter(|p| p.tags.contains(&tag.id)).count()
}
