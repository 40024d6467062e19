mod bot;
mod config;
mod error;
mod logger;
mod pipeline;
mod platform;
mod preprocess;
mod reply;
mod search;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use config::*;

/// 以图搜图 discord bot
#[derive(Parser, Debug)]
#[command(name = "findmyfluff", version, about)]
struct Cli {
    /// 启动前加载的 dotenv 文件
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,
    /// 日志文件目录
    #[arg(long, default_value = "./logs")]
    log_dir: PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    let cli = Cli::parse();
    let env_loaded = load_env_file(&cli.env_file);
    let _guards = logger::init_logger(&cli.log_dir);
    let env_file = cli.env_file.display();
    match env_loaded {
        Ok(loaded) => tracing::debug!(%env_file, loaded, "读取环境变量"),
        Err(err) => tracing::warn!(%env_file, %err, "环境变量文件解析失败"),
    }

    let config = Arc::new(Config::from_env()?);
    bot::start(config).await
}

/// 文件不存在时返回 `Ok(false)`, 存在但解析失败时返回错误
fn load_env_file(path: &Path) -> dotenv::Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    dotenv::from_path(path).map(|_| true)
}


#[cfg(test)]
mod test_server;
