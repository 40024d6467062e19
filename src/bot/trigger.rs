use lazy_static::lazy_static;
use regex::Regex;
use serenity::async_trait;
use serenity::model::id::{ChannelId, MessageId};
use tracing::{error, info, instrument, warn};

use crate::pipeline::SourceFinder;
use crate::reply::{self, Reply};

lazy_static! {
    static ref MESSAGE_LINK: Regex = Regex::new(
        r"^https?://(?:(?:ptb|canary)\.)?discord(?:app)?\.com/channels/(?:\d+|@me)/(\d+)/(\d+)/?$"
    )
    .unwrap();
    static ref SNOWFLAKE: Regex = Regex::new(r"^\d{1,20}$").unwrap();
}

/// 触发搜图的两种方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSource {
    /// 回复一条带附件的消息
    MessageReply { image_url: String },
    /// `/find` 指令, 目标消息可能没有附件
    CommandInvocation { image_url: Option<String> },
}

impl TriggerSource {
    /// # 检查回复消息是否触发搜图
    /// ### Arguments
    /// - `content` 回复消息的文本
    /// - `mentions_bot` 回复消息是否 @ 了 bot
    /// - `prefix` 触发前缀
    /// - `attachment_url` 被回复消息的第一个附件
    pub fn from_reply(
        content: &str,
        mentions_bot: bool,
        prefix: &str,
        attachment_url: Option<&str>,
    ) -> Option<Self> {
        if !is_reply_trigger(content, mentions_bot, prefix) {
            return None;
        }
        attachment_url.map(|url| TriggerSource::MessageReply {
            image_url: url.to_string(),
        })
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            TriggerSource::MessageReply { image_url } => Some(image_url),
            TriggerSource::CommandInvocation { image_url } => image_url.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TriggerSource::MessageReply { .. } => "reply",
            TriggerSource::CommandInvocation { .. } => "command",
        }
    }
}

/// 以前缀开头或 @ 了 bot 的回复才会触发
pub fn is_reply_trigger(content: &str, mentions_bot: bool, prefix: &str) -> bool {
    mentions_bot || (!prefix.is_empty() && content.trim().starts_with(prefix))
}

/// 指令参数指向的消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTarget {
    /// 链接里带的频道, 没有时用指令所在频道
    pub channel_id: Option<ChannelId>,
    pub message_id: MessageId,
}

/// # 解析消息引用
/// 支持消息 id 和消息链接
/// ```
/// parse_message_reference("https://discord.com/channels/1/2/3");
/// parse_message_reference("1084186702567981077");
/// ```
pub fn parse_message_reference(reference: &str) -> Option<MessageTarget> {
    let reference = reference.trim();
    if SNOWFLAKE.is_match(reference) {
        return reference.parse::<u64>().ok().map(|id| MessageTarget {
            channel_id: None,
            message_id: MessageId(id),
        });
    }
    let caps = MESSAGE_LINK.captures(reference)?;
    let channel = caps.get(1)?.as_str().parse::<u64>().ok()?;
    let message = caps.get(2)?.as_str().parse::<u64>().ok()?;
    Some(MessageTarget {
        channel_id: Some(ChannelId(channel)),
        message_id: MessageId(message),
    })
}

/// 回复所在平台的发送方式
#[async_trait]
pub trait Responder: Send + Sync {
    /// 提示正在处理: 消息回复显示"正在输入", 指令则延迟响应
    async fn acknowledge(&self) -> serenity::Result<()>;
    async fn send(&self, reply: Reply) -> serenity::Result<()>;
}

async fn send_logged<R>(responder: &R, reply: Reply)
where
    R: Responder + ?Sized,
{
    if let Err(err) = responder.send(reply).await {
        error!(?err, "回复发送失败！");
    }
}

/// 结果卡片被 discord 拒收时改发失败提示
async fn deliver<R>(responder: &R, reply: Reply)
where
    R: Responder + ?Sized,
{
    let Reply::Card(_) = &reply else {
        send_logged(responder, reply).await;
        return;
    };
    if let Err(err) = responder.send(reply).await {
        error!(?err, "结果卡片发送失败, 改为发送失败提示");
        send_logged(responder, Reply::text(reply::FAILURE)).await;
    }
}

/// # 处理一次触发
/// 收到 -> 处理中 -> 已回复, 所有错误都在这里转换成给用户的回复
#[instrument(
    name = "find",
    skip_all,
    fields(request_id = %uuid::Uuid::new_v4(), kind = source.kind())
)]
pub async fn dispatch<R, F>(source: TriggerSource, responder: &R, finder: &F)
where
    R: Responder + ?Sized,
    F: SourceFinder + ?Sized,
{
    let Some(image_url) = source.image_url() else {
        info!("目标消息没有图片");
        send_logged(responder, Reply::text(reply::NO_IMAGE)).await;
        return;
    };
    info!(image_url, "开始搜图");

    if let Err(err) = responder.acknowledge().await {
        warn!(?err, "处理中提示发送失败");
    }

    let reply = match finder.find(image_url).await {
        Ok(result) => reply::render(&result),
        Err(err) => {
            error!(%err, "搜图失败！");
            Reply::text(reply::FAILURE)
        }
    };
    deliver(responder, reply).await;
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::error::FindError;
    use crate::search::response::{PlatformMatch, SearchData};
    use crate::search::SearchResult;

    macro_rules! aw {
        ($e:expr) => {
            tokio_test::block_on($e)
        };
    }

    #[derive(Debug, PartialEq)]
    enum Event {
        Acknowledge,
        Send(Reply),
    }

    #[derive(Default)]
    struct RecordingResponder {
        events: Mutex<Vec<Event>>,
        /// 模拟 discord 拒收结果卡片
        reject_cards: bool,
    }

    #[async_trait]
    impl Responder for RecordingResponder {
        async fn acknowledge(&self) -> serenity::Result<()> {
            self.events.lock().unwrap().push(Event::Acknowledge);
            Ok(())
        }

        async fn send(&self, reply: Reply) -> serenity::Result<()> {
            if self.reject_cards && matches!(reply, Reply::Card(_)) {
                return Err(serenity::Error::Other("Invalid Form Body"));
            }
            self.events.lock().unwrap().push(Event::Send(reply));
            Ok(())
        }
    }

    struct StubFinder {
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
        platforms: Option<Vec<PlatformMatch>>,
    }

    impl StubFinder {
        fn returning(platforms: Option<Vec<PlatformMatch>>) -> Self {
            StubFinder {
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
                platforms,
            }
        }
    }

    #[async_trait]
    impl SourceFinder for StubFinder {
        async fn find(&self, image_url: &str) -> Result<SearchResult, FindError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(image_url.to_string());
            match &self.platforms {
                Some(platforms) => Ok(SearchResult {
                    code: Some(200),
                    data: Some(SearchData {
                        platforms: platforms.clone(),
                    }),
                }),
                None => Err(FindError::Malformed(
                    serde_json::from_str::<SearchResult>("{").unwrap_err(),
                )),
            }
        }
    }

    fn twitter_hit() -> PlatformMatch {
        PlatformMatch {
            platform: "twitter".to_string(),
            url: "https://twitter.com/a/status/1".to_string(),
            credits: None,
        }
    }

    const IMAGE: &str = "https://cdn.discordapp.com/attachments/1/2/cat.png";

    #[test]
    fn reply_trigger_rules() {
        assert!(is_reply_trigger("/find", false, "/"));
        assert!(is_reply_trigger("   /find please", false, "/"));
        assert!(is_reply_trigger("what is this", true, "/"));
        assert!(!is_reply_trigger("what is this", false, "/"));
        assert!(!is_reply_trigger("find /this", false, "/"));
        assert!(!is_reply_trigger("/find", false, ""));
        assert!(is_reply_trigger("!find", false, "!find"));
    }

    #[test]
    fn reply_needs_an_attachment() {
        assert_eq!(TriggerSource::from_reply("/find", false, "/", None), None);
        assert_eq!(
            TriggerSource::from_reply("/find", false, "/", Some(IMAGE)),
            Some(TriggerSource::MessageReply {
                image_url: IMAGE.to_string()
            })
        );
        assert_eq!(TriggerSource::from_reply("nice art", false, "/", Some(IMAGE)), None);
    }

    #[test]
    fn parses_message_ids_and_links() {
        assert_eq!(
            parse_message_reference(" 1084186702567981077 "),
            Some(MessageTarget {
                channel_id: None,
                message_id: MessageId(1084186702567981077)
            })
        );
        for link in [
            "https://discord.com/channels/724829522230378536/781347109676384297/1082716108953497681",
            "https://ptb.discord.com/channels/724829522230378536/781347109676384297/1082716108953497681",
            "https://canary.discordapp.com/channels/724829522230378536/781347109676384297/1082716108953497681/",
        ] {
            assert_eq!(
                parse_message_reference(link),
                Some(MessageTarget {
                    channel_id: Some(ChannelId(781347109676384297)),
                    message_id: MessageId(1082716108953497681)
                }),
                "{link}"
            );
        }
        assert_eq!(
            parse_message_reference("https://discord.com/channels/@me/5/6"),
            Some(MessageTarget {
                channel_id: Some(ChannelId(5)),
                message_id: MessageId(6)
            })
        );
    }

    #[test]
    fn rejects_other_references() {
        for reference in [
            "",
            "abc",
            "99999999999999999999",
            "https://example.com/channels/1/2/3",
            "https://discord.com/channels/1/2",
            "#general",
        ] {
            assert_eq!(parse_message_reference(reference), None, "{reference}");
        }
    }

    #[test]
    fn reply_runs_pipeline_once() {
        aw!(async {
            let source = TriggerSource::from_reply("/find", false, "/", Some(IMAGE)).unwrap();
            let responder = RecordingResponder::default();
            let finder = StubFinder::returning(Some(vec![twitter_hit()]));
            dispatch(source, &responder, &finder).await;

            assert_eq!(finder.calls.load(Ordering::SeqCst), 1);
            assert_eq!(*finder.urls.lock().unwrap(), vec![IMAGE.to_string()]);
            let events = responder.events.lock().unwrap();
            assert_eq!(events.len(), 2);
            assert_eq!(events[0], Event::Acknowledge);
            match &events[1] {
                Event::Send(Reply::Card(card)) => {
                    assert_eq!(card.links.len(), 1);
                    assert_eq!(card.links[0].label, "Twitter");
                }
                other => panic!("unexpected: {:?}", other),
            }
        })
    }

    #[test]
    fn empty_result_reports_no_matches() {
        aw!(async {
            let responder = RecordingResponder::default();
            let finder = StubFinder::returning(Some(Vec::new()));
            let source = TriggerSource::CommandInvocation {
                image_url: Some(IMAGE.to_string()),
            };
            dispatch(source, &responder, &finder).await;
            assert_eq!(
                *responder.events.lock().unwrap(),
                vec![Event::Acknowledge, Event::Send(Reply::text(reply::NO_MATCHES))]
            );
        })
    }

    #[test]
    fn failures_become_generic_reply() {
        aw!(async {
            let responder = RecordingResponder::default();
            let finder = StubFinder::returning(None);
            let source = TriggerSource::MessageReply {
                image_url: IMAGE.to_string(),
            };
            dispatch(source, &responder, &finder).await;
            assert_eq!(
                *responder.events.lock().unwrap(),
                vec![Event::Acknowledge, Event::Send(Reply::text(reply::FAILURE))]
            );
        })
    }

    #[test]
    fn rejected_card_falls_back_to_failure_text() {
        aw!(async {
            let responder = RecordingResponder {
                reject_cards: true,
                ..Default::default()
            };
            let finder = StubFinder::returning(Some(vec![twitter_hit()]));
            let source = TriggerSource::CommandInvocation {
                image_url: Some(IMAGE.to_string()),
            };
            dispatch(source, &responder, &finder).await;
            assert_eq!(finder.calls.load(Ordering::SeqCst), 1);
            assert_eq!(
                *responder.events.lock().unwrap(),
                vec![Event::Acknowledge, Event::Send(Reply::text(reply::FAILURE))]
            );
        })
    }

    #[test]
    fn command_without_image_never_searches() {
        aw!(async {
            let responder = RecordingResponder::default();
            let finder = StubFinder::returning(Some(vec![twitter_hit()]));
            let source = TriggerSource::CommandInvocation { image_url: None };
            dispatch(source, &responder, &finder).await;
            assert_eq!(finder.calls.load(Ordering::SeqCst), 0);
            assert_eq!(
                *responder.events.lock().unwrap(),
                vec![Event::Send(Reply::text(reply::NO_IMAGE))]
            );
        })
    }
}
