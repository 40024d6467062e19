use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use url::Url;

use crate::platform::Platform::*;

/// 无法识别的平台名
pub const UNKNOWN_PLATFORM: &str = "unknown";

/// 解析平台名错误
#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnumErr(String);

impl Display for ParseEnumErr {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// 搜图结果所属平台
///
/// 请求时的平台过滤和响应里的平台名解析都以这张表为准
/// # implement
/// ## [`FromStr`]
/// 忽略大小写和空白
/// ```
/// println!("{:?}", "Fur Affinity".parse::<Platform>());
/// ```
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Platform {
    FurAffinity,
    Twitter,
    E621,
    Weasyl,
    FurryNetwork,
    DeviantArt,
    Inkbunny,
}

impl Platform {
    pub const ALL: [Platform; 7] = [
        FurAffinity,
        Twitter,
        E621,
        Weasyl,
        FurryNetwork,
        DeviantArt,
        Inkbunny,
    ];

    /// 展示用名称, 也是搜图接口的过滤值
    pub fn label(self) -> &'static str {
        match self {
            FurAffinity => "Fur Affinity",
            Twitter => "Twitter",
            E621 => "e621",
            Weasyl => "Weasyl",
            FurryNetwork => "Furry Network",
            DeviantArt => "DeviantArt",
            Inkbunny => "Inkbunny",
        }
    }

    fn key(self) -> &'static str {
        match self {
            FurAffinity => "furaffinity",
            Twitter => "twitter",
            E621 => "e621",
            Weasyl => "weasyl",
            FurryNetwork => "furrynetwork",
            DeviantArt => "deviantart",
            Inkbunny => "inkbunny",
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Platform {
    type Err = ParseEnumErr;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        Platform::ALL
            .into_iter()
            .find(|platform| platform.key() == key)
            .ok_or_else(|| ParseEnumErr(format!("平台'{}'未定义", s)))
    }
}

/// # 平台名转展示名
/// 不在表里的名字统一返回 [`UNKNOWN_PLATFORM`]
pub fn format_social_name(name: &str) -> &'static str {
    name.parse::<Platform>()
        .map(Platform::label)
        .unwrap_or(UNKNOWN_PLATFORM)
}

const HOST_REPLACEMENTS: [(&str, &str); 4] = [
    ("twitter.com", "fxtwitter.com"),
    ("x.com", "fixupx.com"),
    ("furaffinity.net", "fxfuraffinity.net"),
    ("bsky.app", "fxbsky.app"),
];

/// # 把链接换成嵌入友好的镜像域名
/// 只替换完全匹配的主机名, 其余链接原样返回
pub fn url_fixer(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let replacement = parsed.host_str().and_then(|host| {
        HOST_REPLACEMENTS
            .iter()
            .find(|(from, _)| host.eq_ignore_ascii_case(from))
            .map(|(_, replacement)| *replacement)
    });
    match replacement {
        Some(host) => match parsed.set_host(Some(host)) {
            Ok(()) => parsed.into(),
            Err(_) => url.to_string(),
        },
        None => url.to_string(),
    }
}
