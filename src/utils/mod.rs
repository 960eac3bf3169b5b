pub mod markdown;

/// 从标题生成 URL 友好的别名
pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}

/// 截取前 `max_chars` 个字符（按字符而非字节）
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// 拼接媒体文件的 URL
pub fn media_url(prefix: &str, name: &str) -> String {
    format!(
        "{}{}",
        ensure_trailing_slash(prefix),
        name.trim_start_matches('/')
    )
}

/// 确保路径以斜杠结尾
pub fn ensure_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// 确保路径以斜杠开头
pub fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
