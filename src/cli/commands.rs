use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use crate::core::memory::MemoryRepository;
use crate::core::repository::BlogRepository;
use crate::core::server::{AppState, Server};
use crate::core::sql::SqlRepository;
use crate::models::{Config, Dataset};
use crate::theme::renderer::{SiteInfo, ThemeRenderer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 指定站点目录
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 初始化新的博客站点
    Init(InitArgs),

    /// 启动博客服务器
    Server(ServerArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// 站点目录名称
    #[arg(value_name = "NAME")]
    pub name: String,

    /// 站点标题
    #[arg(short, long)]
    pub title: Option<String>,
}

#[derive(Args)]
pub struct ServerArgs {
    /// 服务器端口，默认取配置文件中的值
    #[arg(short, long)]
    pub port: Option<u16>,

    /// 数据库为空时先导入数据文件
    #[arg(long)]
    pub seed: bool,
}

const DEFAULT_STYLE_CSS: &str = include_str!("../../assets/css/style.css");

/// 创建站点目录结构：配置、示例数据、媒体和静态资源目录
fn initialize_site_structure(site_path: &Path, site_title: &str) -> Result<()> {
    let media_dir = site_path.join("media");
    let css_dir = site_path.join("static").join("css");
    let templates_dir = site_path.join("templates");

    for dir in [&media_dir, &css_dir, &templates_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    let config = Config {
        title: site_title.to_string(),
        ..Config::default()
    };
    config.save_to_file(&site_path.join("_config.yml"))?;

    let fixture = config.data.fixture.as_deref().unwrap_or("data.yml");
    Dataset::sample().save(&site_path.join(fixture))?;

    fs::write(css_dir.join("style.css"), DEFAULT_STYLE_CSS)?;

    Ok(())
}

fn init(site_root: &Path, args: InitArgs) -> Result<()> {
    let site_path = site_root.join(&args.name);

    // 目录不为空时询问是否继续
    if site_path.exists() && site_path.read_dir()?.next().is_some() {
        println!("Directory is not empty. Do you want to continue? (y/N)");
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Operation cancelled.");
            return Ok(());
        }
    }

    fs::create_dir_all(&site_path)?;

    let site_title = args.title.unwrap_or_else(|| args.name.clone());
    initialize_site_structure(&site_path, &site_title)?;

    info!("Initialized new site at: {}", site_path.display());
    println!(
        "{} {}",
        "Run".bright_white(),
        format!("blog-display --path {} server", site_path.display()).bright_green()
    );
    Ok(())
}

async fn serve<R: BlogRepository>(repo: R, config: &Config, site_path: &Path, port: u16) -> Result<()> {
    let templates_dir = Config::resolve(site_path, config.templates_dir.as_deref());
    let renderer = ThemeRenderer::new(
        SiteInfo {
            title: config.title.clone(),
            description: config.description.clone(),
        },
        templates_dir.as_deref(),
    )?;

    let state = AppState::new(repo, renderer, &config.media_url);
    Server::new(state, port)
        .with_media_dir(
            &config.media_url,
            Config::resolve(site_path, config.media_dir.as_deref()),
        )
        .with_static_dir(Config::resolve(site_path, config.static_dir.as_deref()))
        .start()
        .await
}

async fn server(site_path: &Path, args: ServerArgs) -> Result<()> {
    let config = Config::load(site_path)?;
    let port = args.port.unwrap_or(config.port);
    let fixture = Config::resolve(site_path, config.data.fixture.as_deref());

    if let Some(url) = config.data.database_url.as_deref() {
        info!("Using SQLite database {}", url);
        let repo = SqlRepository::connect(url, config.data.max_connections)
            .await
            .with_context(|| format!("Failed to open database: {}", url))?;

        if args.seed {
            match fixture {
                Some(path) => {
                    if repo.is_empty().await? {
                        info!("Seeding database from {}", path.display());
                        repo.seed(Dataset::from_file(&path)?).await?;
                    } else {
                        warn!("Database is not empty, skipping seed");
                    }
                }
                None => warn!("No fixture configured, nothing to seed"),
            }
        }
        serve(repo, &config, site_path, port).await
    } else {
        let Some(path) = fixture else {
            bail!("Neither data.database_url nor data.fixture is configured");
        };
        info!("Loading data from {}", path.display());
        let repo = MemoryRepository::from_file(&path)?;
        serve(repo, &config, site_path, port).await
    }
}

/// 执行命令
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init(args) => init(&cli.path, args),
        Commands::Server(args) => server(&cli.path, args).await,
    }
}
