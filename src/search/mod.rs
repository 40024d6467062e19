pub mod response;

pub use response::SearchResult;

use reqwest::multipart::{Form, Part};
use tracing::{debug, error, instrument};

use crate::config::Config;
use crate::error::FindError;
use crate::platform::Platform;

pub const USER_AGENT: &str =
    "FurlabBot/1.0 (FindMyFluff Discord bot | The Furlab Project https://furlab.net)";
/// 每次搜索返回的最大结果数
pub const RESULT_LIMIT: u32 = 8;

const FIELD_IMAGE: &str = "imageBuffer";
const FIELD_NSFW: &str = "includeNsfw";
const FIELD_PLATFORMS: &str = "platforms[]";
const FIELD_LIMIT: &str = "limit";
const IMAGE_FILE_NAME: &str = "image.png";

/// 以图搜图接口
pub struct SearchClient {
    endpoint: String,
    token: String,
    include_nsfw: bool,
    req: reqwest::Client,
}

impl SearchClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let req = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(SearchClient {
            endpoint: config.api_url.clone(),
            token: config.api_token.clone(),
            include_nsfw: config.include_nsfw,
            req,
        })
    }

    fn form(&self, image: Vec<u8>) -> Result<Form, FindError> {
        let part = Part::bytes(image)
            .file_name(IMAGE_FILE_NAME)
            .mime_str(mime::IMAGE_PNG.as_ref())
            .map_err(FindError::Network)?;
        let mut form = Form::new()
            .part(FIELD_IMAGE, part)
            .text(FIELD_NSFW, self.include_nsfw.to_string());
        for platform in Platform::ALL {
            form = form.text(FIELD_PLATFORMS, platform.label());
        }
        Ok(form.text(FIELD_LIMIT, RESULT_LIMIT.to_string()))
    }

    /// # 提交图片搜索来源
    /// ### Arguments
    /// - `image` 已经缩放好的 png
    /// ### Return
    /// - `Err(FindError::Api)` 接口返回非 2xx
    /// - `Err(FindError::Network)` 请求没能完成
    #[instrument(skip_all, fields(size = image.len()))]
    pub async fn reverse_search(&self, image: Vec<u8>) -> Result<SearchResult, FindError> {
        let response = match self
            .req
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .multipart(self.form(image)?)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                error!(?err, "搜图请求失败");
                return Err(FindError::Network(err));
            }
        };
        let status = response.status();
        let body = response.text().await.map_err(FindError::Network)?;
        debug!(%status, "搜图接口响应");
        if !status.is_success() {
            error!(%status, body = %body, "搜图接口返回错误");
            return Err(FindError::Api { status, body });
        }
        let result: SearchResult = match serde_json::from_str(&body) {
            Ok(result) => result,
            Err(err) => {
                error!(?err, body = %body, "搜图结果转换json失败");
                return Err(FindError::Malformed(err));
            }
        };
        debug!(code = ?result.code, matches = result.matches().len(), "搜图完成");
        Ok(result)
    }
}
