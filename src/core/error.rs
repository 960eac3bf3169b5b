use thiserror::Error;

/// 博客展示层错误类型
#[derive(Error, Debug)]
pub enum BlogError {
    #[error("{entity} not found: {key}")]
    NotFound {
        entity: &'static str,
        key: String,
    },

    /// 读取了未通过对应查询加载的派生属性或关联
    #[error("attribute not available: {attribute} was not loaded by this query")]
    NotLoaded {
        attribute: &'static str,
    },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

impl BlogError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        BlogError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        BlogError::InvalidData(message.into())
    }

    /// 是否为"未找到"类错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlogError::NotFound { .. })
    }
}

impl From<sqlx::Error> for BlogError {
    fn from(err: sqlx::Error) -> Self {
        BlogError::Storage(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for BlogError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        BlogError::Storage(format!("migration failed: {}", err))
    }
}
