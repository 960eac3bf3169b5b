pub mod error;
pub mod memory;
pub mod query;
pub mod repository;
pub mod serialize;
pub mod server;
pub mod sql;
pub mod views;

pub use error::BlogError;
pub use memory::MemoryRepository;
pub use query::{PostQuery, TagQuery};
pub use repository::BlogRepository;
pub use server::{AppState, Server};
pub use sql::SqlRepository;
