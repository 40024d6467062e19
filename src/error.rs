use reqwest::StatusCode;
use thiserror::Error;

/// 一次搜图请求内可能出现的失败, 都在事件处理边界被捕获并回复给用户
#[derive(Debug, Error)]
pub enum FindError {
    /// 图片下载失败或返回了非成功状态
    #[error("failed to download image: {0}")]
    Fetch(#[source] reqwest::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image worker stopped: {0}")]
    Worker(#[from] tokio::task::JoinError),
    /// 搜图接口返回非 2xx, 保留原始响应体
    #[error("search api error {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("search request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("search api returned an unreadable payload: {0}")]
    Malformed(#[from] serde_json::Error),
}
