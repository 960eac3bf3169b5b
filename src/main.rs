use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use blog_display::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志系统，RUST_LOG 未设置时默认 info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_target(false).with_env_filter(filter).init();

    let cli = cli::Cli::parse();

    println!("{}", "
 ____  _               ____  _           _
| __ )| | ___   __ _  |  _ \\(_)___ _ __ | | __ _ _   _
|  _ \\| |/ _ \\ / _` | | | | | / __| '_ \\| |/ _` | | | |
| |_) | | (_) | (_| | | |_| | \\__ \\ |_) | | (_| | |_| |
|____/|_|\\___/ \\__, | |____/|_|___/ .__/|_|\\__,_|\\__, |
               |___/              |_|            |___/
    ".bright_cyan());

    println!("{} {}", "Blog Display".bright_cyan(), env!("CARGO_PKG_VERSION").bright_green());
    println!("{}", "Posts, tags and comments served over HTTP".bright_white());
    println!();

    if let Err(e) = cli::execute(cli).await {
        error!("Error: {}", e);

        // 打印错误链
        for cause in e.chain().skip(1) {
            error!("Caused by: {}", cause);
        }

        std::process::exit(1);
    }

    Ok(())
}
