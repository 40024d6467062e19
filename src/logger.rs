//! 配置日志追踪

use std::path::Path;

use time::format_description::FormatItem;
use time::UtcOffset;
use tracing::{debug, error, info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const F_PFX_NOR: &str = "findmyfluff.log";
const F_PFX_ERR: &str = "findmyfluff_err.log";
const ENV_FILTER: &str = "FINDMYFLUFF_LOG";
const DEFAULT_FILTER: &str = "info,serenity=warn,tracing::span=warn";

/// 配置时区和时间格式, 取不到本地时区时退回 UTC
fn get_timer(t_fmt: Vec<FormatItem<'static>>) -> OffsetTime<Vec<FormatItem<'static>>> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, t_fmt)
}

fn parse_format(desc: &'static str) -> Vec<FormatItem<'static>> {
    match time::format_description::parse(desc) {
        Ok(items) => items,
        Err(e) => {
            eprintln!("时间格式异常！{:#?}", e);
            Vec::new()
        }
    }
}

/// # 初始化日志
/// ### Arguments
/// - `log_dir` 日志文件目录
/// ### Return
/// 两个文件写入线程的 guard, 需要持有到进程退出
pub fn init_logger(log_dir: &Path) -> (WorkerGuard, WorkerGuard) {
    println!("init logger...");
    let t_fmt1 = parse_format("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");
    let t_fmt2 = parse_format("[hour]:[minute]:[second].[subsecond digits:3]");

    // 日志文件
    let (ff, nl_guard) = tracing_appender::non_blocking(rolling::never(log_dir, F_PFX_NOR));
    let f_normal = fmt::layer()
        .with_ansi(false)
        .with_writer(ff.with_min_level(Level::WARN).with_max_level(Level::INFO));
    let (ff, el_guard) = tracing_appender::non_blocking(rolling::never(log_dir, F_PFX_ERR));
    let f_error = fmt::layer()
        .with_ansi(false)
        .with_writer(ff.with_max_level(Level::ERROR));
    let (f_normal, f_error) = {
        let timer = get_timer(t_fmt1);
        (
            f_normal.with_timer(timer.clone()),
            f_error.with_timer(timer),
        )
    };

    // 标准输出
    let std_out = fmt::layer()
        .with_timer(get_timer(t_fmt2))
        .with_ansi(true)
        .with_writer(std::io::stdout);

    let filter =
        EnvFilter::try_from_env(ENV_FILTER).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // 注册
    tracing_subscriber::registry()
        .with(filter)
        .with(std_out)
        .with(f_normal)
        .with(f_error)
        .with(ErrorLayer::default())
        .init();

    // color_eyre 处理 panic
    if let Err(e) = color_eyre::install() {
        error!("color_eyre 配置异常！{:#?}", e);
    }

    info!(dir = %log_dir.display(), "logger ready.");
    debug!("env: {:?}", std::env::var(ENV_FILTER).ok());
    (nl_guard, el_guard)
}
