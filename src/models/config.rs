use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

/// 站点配置（`_config.yml`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub description: Option<String>,
    /// 服务器端口
    pub port: u16,
    /// 图片等媒体文件的 URL 前缀
    pub media_url: String,
    /// 媒体文件目录，相对站点目录
    pub media_dir: Option<String>,
    /// 静态资源目录，相对站点目录
    pub static_dir: Option<String>,
    /// 覆盖内置模板的目录
    pub templates_dir: Option<String>,
    pub data: DataConfig,
}

/// 数据源配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// YAML 数据文件
    pub fixture: Option<String>,
    /// SQLite 数据库地址，设置后优先于数据文件
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            description: None,
            port: 8000,
            media_url: "/media/".to_string(),
            media_dir: Some("media".to_string()),
            static_dir: Some("static".to_string()),
            templates_dir: Some("templates".to_string()),
            data: DataConfig::default(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            fixture: Some("data.yml".to_string()),
            database_url: None,
            max_connections: 5,
        }
    }
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// 加载站点目录下的 `_config.yml`，不存在时使用默认配置
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join("_config.yml");
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// 把相对站点目录的路径解析为绝对路径
    pub fn resolve(base_dir: &Path, relative: Option<&str>) -> Option<PathBuf> {
        relative.map(|dir| {
            let path = Path::new(dir);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base_dir.join(path)
            }
        })
    }
}
