use std::sync::Arc;

use serenity::prelude::*;
use tracing::{info, warn};

use crate::config::Config;
use crate::pipeline::FindPipeline;
use crate::reply::BOT_NAME;

pub mod handler;
pub mod trigger;

pub use handler::*;

/// # 连接 discord 并一直运行
/// 断线重连交给 serenity, 收到 ctrl-c 时关闭所有分片
pub async fn start(config: Arc<Config>) -> color_eyre::Result<()> {
    tracing::info!("[DC] 初始化 {}", BOT_NAME);
    let finder = Arc::new(FindPipeline::new(&config)?);
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.bot_token, intents)
        .application_id(config.app_id)
        .event_handler(Handler {
            config: config.clone(),
            finder,
        })
        .await?;
    let shard_manager = client.shard_manager.clone();

    tokio::select! {
        result = client.start() => {
            warn!("[DC] Discord客户端退出");
            result?;
        },
        _ = tokio::signal::ctrl_c() => {
            info!("[DC] 收到退出信号, 正在断开连接");
            shard_manager.lock().await.shutdown_all().await;
        },
    }
    Ok(())
}
