pub mod config;
pub mod dataset;
pub mod types;

pub use config::{Config, DataConfig};
pub use dataset::{Dataset, PostEntry};
pub use types::{
    Comment, LoadedComment, LoadedPost, LoadedTag, Post, Relation, Tag, User,
};
