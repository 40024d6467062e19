use serenity::async_trait;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::FindError;
use crate::preprocess::preprocess_image;
use crate::search::{SearchClient, SearchResult};

/// 根据图片链接查找来源
#[async_trait]
pub trait SourceFinder: Send + Sync {
    async fn find(&self, image_url: &str) -> Result<SearchResult, FindError>;
}

/// 下载缩放 -> 搜图
pub struct FindPipeline {
    http: reqwest::Client,
    search: SearchClient,
}

impl FindPipeline {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(FindPipeline {
            http: reqwest::Client::new(),
            search: SearchClient::new(config)?,
        })
    }
}

#[async_trait]
impl SourceFinder for FindPipeline {
    #[instrument(name = "find_pipeline", skip(self))]
    async fn find(&self, image_url: &str) -> Result<SearchResult, FindError> {
        let image = preprocess_image(&self.http, image_url).await?;
        let result = self.search.reverse_search(image).await?;
        info!(matches = result.matches().len(), "搜图结束");
        Ok(result)
    }
}
