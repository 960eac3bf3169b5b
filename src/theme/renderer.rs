use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use chrono::DateTime;
use serde::Serialize;
use tera::{Context as TeraContext, Tera};
use tracing::{debug, error, info};

use crate::core::error::BlogError;
use crate::core::views::Page;
use crate::models::types::{post_url, tag_url};
use crate::utils::markdown;

/// 内置模板
const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("macros.html", include_str!("../../templates/macros.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("post-details.html", include_str!("../../templates/post-details.html")),
    ("posts-list.html", include_str!("../../templates/posts-list.html")),
    ("contacts.html", include_str!("../../templates/contacts.html")),
    ("error.html", include_str!("../../templates/error.html")),
];

/// 模板中可用的站点信息
#[derive(Debug, Clone, Serialize)]
pub struct SiteInfo {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct ThemeRenderer {
    /// 模板引擎
    pub tera: Tera,
    /// 站点信息
    pub site: SiteInfo,
}

impl ThemeRenderer {
    /// 创建渲染器；`templates_dir` 中的同名文件会覆盖内置模板
    pub fn new(site: SiteInfo, templates_dir: Option<&Path>) -> Result<Self> {
        let mut templates: Vec<(String, String)> = Vec::with_capacity(DEFAULT_TEMPLATES.len());
        for (name, content) in DEFAULT_TEMPLATES {
            let content = match templates_dir.map(|dir| dir.join(name)) {
                Some(path) if path.is_file() => {
                    info!("Using template override {}", path.display());
                    fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read template: {}", path.display()))?
                }
                _ => content.to_string(),
            };
            templates.push((name.to_string(), content));
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)?;

        Self::register_filters(&mut tera);
        Self::register_functions(&mut tera);

        Ok(ThemeRenderer { tera, site })
    }

    /// 注册模板过滤器
    fn register_filters(tera: &mut Tera) {
        tera.register_filter("date_format", Self::date_format_filter);
        tera.register_filter("markdown", Self::markdown_filter);
    }

    /// 注册模板函数
    fn register_functions(tera: &mut Tera) {
        tera.register_function("url_for", Self::url_for_function);
    }

    /// 渲染页面
    pub fn render<P: Page>(&self, page: &P) -> Result<String, BlogError> {
        let mut context = TeraContext::from_serialize(page)?;
        context.insert("site", &self.site);
        self.render_template(P::TEMPLATE, &context)
    }

    /// 渲染错误页
    pub fn render_error(&self, status: u16, message: &str) -> Result<String, BlogError> {
        let mut context = TeraContext::new();
        context.insert("site", &self.site);
        context.insert("status", &status);
        context.insert("message", message);
        self.render_template("error.html", &context)
    }

    /// 检查布局是否存在
    pub fn has_layout(&self, layout: &str) -> bool {
        self.tera.get_template_names().any(|name| name == layout)
    }

    fn render_template(&self, template: &str, context: &TeraContext) -> Result<String, BlogError> {
        debug!("Rendering {}", template);
        self.tera.render(template, context).map_err(|e| {
            error!("模板渲染失败: {}: {:?}", template, e);
            BlogError::Template(e)
        })
    }

    fn date_format_filter(value: &tera::Value, args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
        if let Some(date) = value.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok()) {
            let format = args.get("format")
                .and_then(|f| f.as_str())
                .unwrap_or("%Y-%m-%d %H:%M");
            Ok(tera::Value::String(date.format(format).to_string()))
        } else {
            Ok(value.clone())
        }
    }

    fn markdown_filter(value: &tera::Value, _args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
        match value.as_str() {
            Some(text) => Ok(tera::Value::String(markdown::render(text))),
            None => Ok(value.clone()),
        }
    }

    /// `url_for(post=slug)`、`url_for(tag=title)` 或 `url_for(page="index"|"contacts")`
    fn url_for_function(args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
        let arg = |name: &str| args.get(name).and_then(|v| v.as_str());

        let url = if let Some(slug) = arg("post") {
            post_url(slug)
        } else if let Some(title) = arg("tag") {
            tag_url(title)
        } else {
            match arg("page") {
                Some("index") | None => "/".to_string(),
                Some("contacts") => "/contacts/".to_string(),
                Some(other) => return Err(tera::Error::msg(format!("未知页面: {}", other))),
            }
        };
        Ok(tera::Value::String(url))
    }
}
