use std::io::Cursor;

use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageFormat};
use tracing::{debug, instrument};

use crate::error::FindError;

/// 搜图接口要求的最大边长
pub const MAX_DIMENSION: u32 = 256;

/// # 下载图片
/// 网络错误和非成功状态都算下载失败
#[instrument(level = "debug", skip(http))]
pub async fn fetch_image(http: &reqwest::Client, url: &str) -> Result<Vec<u8>, FindError> {
    let response = http
        .get(url)
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(FindError::Fetch)?;
    let bytes = response.bytes().await.map_err(FindError::Fetch)?;
    debug!(size = bytes.len(), "图片下载完成");
    Ok(bytes.to_vec())
}

/// # 缩放并转成 png
/// 等比缩放到 [`MAX_DIMENSION`] 见方以内
pub fn normalize(raw: &[u8]) -> Result<Vec<u8>, FindError> {
    let img = image::load_from_memory(raw)?;
    let mut resized = img.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3);
    // png 编码器不支持浮点像素
    if matches!(resized.color(), ColorType::Rgb32F | ColorType::Rgba32F) {
        resized = DynamicImage::ImageRgba8(resized.to_rgba8());
    }
    let mut out = Cursor::new(Vec::new());
    resized.write_to(&mut out, ImageFormat::Png)?;
    debug!(
        from = ?(img.width(), img.height()),
        to = ?(resized.width(), resized.height()),
        "图片已缩放"
    );
    Ok(out.into_inner())
}

/// 下载图片并在阻塞线程里完成缩放编码
pub async fn preprocess_image(http: &reqwest::Client, url: &str) -> Result<Vec<u8>, FindError> {
    let raw = fetch_image(http, url).await?;
    tokio::task::spawn_blocking(move || normalize(&raw)).await?
}
