pub mod cli;
pub mod core;
pub mod models;
pub mod theme;
pub mod utils;

// 常用类型
pub use crate::core::{BlogError, BlogRepository, MemoryRepository, SqlRepository};
pub use crate::models::{Config, Dataset, LoadedPost, LoadedTag, Post, Tag};
pub use crate::theme::renderer::ThemeRenderer;
