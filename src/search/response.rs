use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::platform::format_social_name;

/// 搜图接口成功时的 code
pub const CODE_OK: u32 = 200;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// 没有 code 时当作没有结果
    #[serde(default)]
    pub code: Option<u32>,
    #[serde(default)]
    pub data: Option<SearchData>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchData {
    /// 接口有时把列表序列化成字符串再返回
    #[serde(default, deserialize_with = "embedded_list")]
    pub platforms: Vec<PlatformMatch>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PlatformMatch {
    pub platform: String,
    #[serde(alias = "location")]
    pub url: String,
    #[serde(default)]
    pub credits: Option<Credit>,
}

/// 上传者, 字段可能不全
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Credit {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl SearchResult {
    /// 只有 code 为 200 时的结果才算命中, 空切片即没有结果
    pub fn matches(&self) -> &[PlatformMatch] {
        match &self.data {
            Some(data) if self.code == Some(CODE_OK) => &data.platforms,
            _ => &[],
        }
    }
}

impl PlatformMatch {
    pub fn label(&self) -> &'static str {
        format_social_name(&self.platform)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Embedded {
    List(Vec<Value>),
    Serialized(String),
    Null(()),
}

fn embedded_list<'de, D>(deserializer: D) -> Result<Vec<PlatformMatch>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match Embedded::deserialize(deserializer)? {
        Embedded::List(list) => list,
        Embedded::Serialized(text) if text.trim().is_empty() => Vec::new(),
        Embedded::Serialized(text) => serde_json::from_str(&text).map_err(de::Error::custom)?,
        Embedded::Null(()) => Vec::new(),
    };
    Ok(entries.into_iter().filter_map(platform_match).collect())
}

/// 单条结果格式不对时丢掉, 不影响其他结果
fn platform_match(entry: Value) -> Option<PlatformMatch> {
    match serde_json::from_value(entry.clone()) {
        Ok(m) => Some(m),
        Err(err) => {
            warn!(%err, %entry, "丢弃无法识别的搜图结果");
            None
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}
