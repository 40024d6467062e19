use std::env;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use thiserror::Error;

pub const ENV_BOT_TOKEN: &str = "DISCORD_BOT_TOKEN";
pub const ENV_APP_ID: &str = "DISCORD_APP_ID";
pub const ENV_API_URL: &str = "API_URL";
pub const ENV_API_TOKEN: &str = "API_TOKEN";
pub const ENV_INCLUDE_NSFW: &str = "INCLUDE_NSFW";
pub const ENV_TRIGGER_PREFIX: &str = "TRIGGER_PREFIX";

const DEFAULT_TRIGGER_PREFIX: &str = "/";

/// 启动配置读取失败
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not defined")]
    Missing(&'static str),
    #[error("{key}='{value}' is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// bot 登录凭证
    pub bot_token: String,
    /// 应用 id, 同时也是 bot 用户的 id
    pub app_id: u64,
    /// 以图搜图接口地址
    pub api_url: String,
    pub api_token: String,
    pub include_nsfw: bool,
    /// 回复触发的前缀
    pub trigger_prefix: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// # 从任意键值来源读取配置
    /// ### Arguments
    /// - `lookup` 按变量名取值, 空白值视为未定义
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let bot_token = require(ENV_BOT_TOKEN)?;
        let app_id = require(ENV_APP_ID)?;
        let app_id = app_id
            .parse::<u64>()
            .map_err(|err| ConfigError::Invalid {
                key: ENV_APP_ID,
                value: app_id.clone(),
                reason: err.to_string(),
            })?;
        let api_url = require(ENV_API_URL)?;
        if let Err(err) = url::Url::parse(&api_url) {
            return Err(ConfigError::Invalid {
                key: ENV_API_URL,
                value: api_url,
                reason: err.to_string(),
            });
        }
        let api_token = require(ENV_API_TOKEN)?;
        let include_nsfw = match get(ENV_INCLUDE_NSFW) {
            Some(value) => parse_bool(&value).ok_or_else(|| ConfigError::Invalid {
                key: ENV_INCLUDE_NSFW,
                value,
                reason: "expected true or false".to_string(),
            })?,
            None => true,
        };
        let trigger_prefix =
            get(ENV_TRIGGER_PREFIX).unwrap_or_else(|| DEFAULT_TRIGGER_PREFIX.to_string());

        Ok(Config {
            bot_token,
            app_id,
            api_url,
            api_token,
            include_nsfw,
            trigger_prefix,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match &*value.to_lowercase() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("app_id", &self.app_id)
            .field("api_url", &self.api_url)
            .field("api_token", &"<redacted>")
            .field("include_nsfw", &self.include_nsfw)
            .field("trigger_prefix", &self.trigger_prefix)
            .finish()
    }
}
