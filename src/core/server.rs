use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::core::error::BlogError;
use crate::core::repository::BlogRepository;
use crate::core::views::{self, Page};
use crate::theme::renderer::ThemeRenderer;
use crate::utils::ensure_leading_slash;

/// 请求处理共享的状态
pub struct AppState<R> {
    pub repo: R,
    pub renderer: Arc<ThemeRenderer>,
    /// 媒体文件 URL 前缀
    pub media_url: Arc<str>,
}

impl<R: Clone> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            renderer: Arc::clone(&self.renderer),
            media_url: Arc::clone(&self.media_url),
        }
    }
}

impl<R: BlogRepository> AppState<R> {
    pub fn new(repo: R, renderer: ThemeRenderer, media_url: &str) -> Self {
        Self {
            repo,
            renderer: Arc::new(renderer),
            media_url: Arc::from(media_url),
        }
    }

    fn respond<P: Page>(&self, result: Result<P, BlogError>) -> Response {
        match result.and_then(|page| self.renderer.render(&page)) {
            Ok(html) => Html(html).into_response(),
            Err(err) => self.error_response(err),
        }
    }

    fn error_response(&self, err: BlogError) -> Response {
        let status = status_for(&err);
        if status == StatusCode::NOT_FOUND {
            info!("{}", err);
        } else {
            error!("Request failed: {}", err);
        }
        let message = if status == StatusCode::NOT_FOUND {
            err.to_string()
        } else {
            "Internal Server Error".to_string()
        };
        let body = self
            .renderer
            .render_error(status.as_u16(), &message)
            .unwrap_or(message);
        (status, Html(body)).into_response()
    }
}

/// 错误对应的 HTTP 状态码
pub fn status_for(err: &BlogError) -> StatusCode {
    if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

async fn index_page<R: BlogRepository>(State(state): State<AppState<R>>) -> Response {
    let result = views::index(&state.repo, &state.media_url).await;
    state.respond(result)
}

async fn post_detail_page<R: BlogRepository>(
    State(state): State<AppState<R>>,
    Path(slug): Path<String>,
) -> Response {
    let result = views::post_detail(&state.repo, &state.media_url, &slug).await;
    state.respond(result)
}

async fn tag_filter_page<R: BlogRepository>(
    State(state): State<AppState<R>>,
    Path(tag_title): Path<String>,
) -> Response {
    let result = views::tag_filter(&state.repo, &state.media_url, &tag_title).await;
    state.respond(result)
}

async fn contacts_page<R: BlogRepository>(State(state): State<AppState<R>>) -> Response {
    let result = views::contacts().await;
    state.respond(result)
}

async fn fallback<R: BlogRepository>(State(state): State<AppState<R>>) -> Response {
    state.error_response(BlogError::not_found("page", "requested path"))
}

/// 页面路由
pub fn routes<R: BlogRepository>(state: AppState<R>) -> Router {
    Router::new()
        .route("/", get(index_page::<R>))
        .route("/post/:slug", get(post_detail_page::<R>))
        .route("/post/:slug/", get(post_detail_page::<R>))
        .route("/tag/:tag_title", get(tag_filter_page::<R>))
        .route("/tag/:tag_title/", get(tag_filter_page::<R>))
        .route("/contacts", get(contacts_page::<R>))
        .route("/contacts/", get(contacts_page::<R>))
        .fallback(fallback::<R>)
        .with_state(state)
}

/// HTTP 服务器
pub struct Server<R> {
    state: AppState<R>,
    /// 端口
    port: u16,
    /// 媒体文件的挂载路径和目录
    media: Option<(String, PathBuf)>,
    /// 静态资源目录
    static_dir: Option<PathBuf>,
}

impl<R: BlogRepository> Server<R> {
    /// 创建新的服务器
    pub fn new(state: AppState<R>, port: u16) -> Self {
        Self {
            state,
            port,
            media: None,
            static_dir: None,
        }
    }

    /// `media_url` 同时决定挂载路径，例如 `/media/` 挂载到 `/media`
    pub fn with_media_dir(mut self, media_url: &str, dir: Option<PathBuf>) -> Self {
        let mount = ensure_leading_slash(media_url.trim_end_matches('/'));
        self.media = dir.filter(|_| mount != "/").map(|dir| (mount, dir));
        self
    }

    pub fn with_static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// 完整的路由：页面、媒体和静态文件，以及请求日志
    pub fn router(&self) -> Router {
        let mut app = routes(self.state.clone());
        if let Some((mount, dir)) = &self.media {
            debug!("Serving media from {} at {}", dir.display(), mount);
            app = app.nest_service(mount, ServeDir::new(dir));
        }
        if let Some(dir) = &self.static_dir {
            app = app.nest_service("/static", ServeDir::new(dir));
        }
        app.layer(TraceLayer::new_for_http())
    }

    /// 启动服务器
    pub async fn start(self) -> Result<()> {
        let app = self.router();

        let addr: SocketAddr = format!("0.0.0.0:{}", self.port).parse()?;
        info!("Server started at http://localhost:{}", self.port);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_not_found_maps_to_404() {
        assert_eq!(
            status_for(&BlogError::not_found("post", "nope")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&BlogError::NotLoaded { attribute: "likes_count" }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&BlogError::Storage("disk full".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
