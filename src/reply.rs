use serenity::builder::{CreateComponents, CreateEmbed};
use serenity::model::application::component::ButtonStyle;

use crate::platform::url_fixer;
use crate::search::SearchResult;

pub const BOT_NAME: &str = "FindMyFluff";
pub const BOT_URL: &str = "https://find.furlab.net";
pub const EMBED_COLOR: u32 = 0x6638f0;

pub const NO_MATCHES: &str = "No matches found.";
pub const FAILURE: &str = "Something went wrong. Please try again later.";
pub const NO_IMAGE: &str = "The replied message does not contain an image.";
pub const INVALID_REFERENCE: &str = "Invalid message reference or channel.";

/// 一行最多 5 个按钮, 一条消息最多 5 行
const BUTTONS_PER_ROW: usize = 5;
const MAX_BUTTONS: usize = 25;

/// 回复给用户的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Card(ResultCard),
}

impl Reply {
    pub fn text(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultCard {
    pub title: String,
    /// 各平台的上传者, 没有署名时为空
    pub description: Option<String>,
    pub links: Vec<LinkButton>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

/// # 把搜图结果组装成回复
/// 没有命中时返回 [`NO_MATCHES`]
pub fn render(result: &SearchResult) -> Reply {
    let matches = result.matches();
    if matches.is_empty() {
        return Reply::text(NO_MATCHES);
    }

    let credits: Vec<String> = matches
        .iter()
        .filter_map(|m| {
            m.credits
                .as_ref()
                .filter(|credit| !credit.name.is_empty())
                .map(|credit| format!("**{}**: {}", m.label(), credit.name))
        })
        .collect();
    let links = matches
        .iter()
        .map(|m| LinkButton {
            label: m.label().to_string(),
            url: url_fixer(&m.url),
        })
        .collect();
    let title = match matches.len() {
        1 => "Found 1 possible source".to_string(),
        n => format!("Found {} possible sources", n),
    };

    Reply::Card(ResultCard {
        title,
        description: (!credits.is_empty()).then(|| credits.join("\n")),
        links,
    })
}

impl ResultCard {
    pub fn to_embed(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::default();
        embed
            .author(|a| a.name(BOT_NAME).url(BOT_URL))
            .title(&self.title)
            .url(BOT_URL)
            .colour(EMBED_COLOR);
        if let Some(description) = &self.description {
            embed.description(description);
        }
        embed
    }

    pub fn to_components(&self) -> CreateComponents {
        let mut components = CreateComponents::default();
        let links = &self.links[..self.links.len().min(MAX_BUTTONS)];
        for row in links.chunks(BUTTONS_PER_ROW) {
            components.create_action_row(|r| {
                for link in row {
                    r.create_button(|b| {
                        b.style(ButtonStyle::Link).label(&link.label).url(&link.url)
                    });
                }
                r
            });
        }
        components
    }
}
