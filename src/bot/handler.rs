use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serenity::async_trait;
use serenity::model::application::command::{Command, CommandOptionType};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::UserId;
use serenity::prelude::*;
use tracing::{debug, error, info, instrument, warn};

use super::trigger::{dispatch, is_reply_trigger, parse_message_reference, Responder, TriggerSource};
use crate::config::Config;
use crate::pipeline::SourceFinder;
use crate::reply::{self, Reply};

pub const FIND_COMMAND: &str = "find";
pub const MESSAGE_OPTION: &str = "message";
const FIND_DESCRIPTION: &str =
    "Find the source of an image by replying to a message with this command.";
const MESSAGE_DESCRIPTION: &str =
    "The message to analyze (must contain an image), as an id or a link.";

pub struct Handler {
    pub config: Arc<Config>,
    pub finder: Arc<dyn SourceFinder>,
}

/// 通过频道消息回复
struct MessageResponder<'a> {
    ctx: &'a Context,
    msg: &'a Message,
}

#[async_trait]
impl Responder for MessageResponder<'_> {
    async fn acknowledge(&self) -> serenity::Result<()> {
        self.msg.channel_id.broadcast_typing(&self.ctx.http).await
    }

    async fn send(&self, reply: Reply) -> serenity::Result<()> {
        self.msg
            .channel_id
            .send_message(&self.ctx.http, |m| {
                m.reference_message(self.msg);
                match reply {
                    Reply::Text(text) => m.content(text),
                    Reply::Card(card) => m
                        .set_embed(card.to_embed())
                        .set_components(card.to_components()),
                }
            })
            .await?;
        Ok(())
    }
}

/// 通过指令响应回复, 延迟响应后改为编辑原响应
struct CommandResponder<'a> {
    ctx: &'a Context,
    command: &'a ApplicationCommandInteraction,
    deferred: AtomicBool,
}

impl<'a> CommandResponder<'a> {
    fn new(ctx: &'a Context, command: &'a ApplicationCommandInteraction) -> Self {
        CommandResponder {
            ctx,
            command,
            deferred: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Responder for CommandResponder<'_> {
    async fn acknowledge(&self) -> serenity::Result<()> {
        self.command
            .create_interaction_response(&self.ctx.http, |r| {
                r.kind(InteractionResponseType::DeferredChannelMessageWithSource)
            })
            .await?;
        self.deferred.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, reply: Reply) -> serenity::Result<()> {
        if self.deferred.load(Ordering::SeqCst) {
            self.command
                .edit_original_interaction_response(&self.ctx.http, |r| match reply {
                    Reply::Text(text) => r.content(text),
                    Reply::Card(card) => r
                        .set_embed(card.to_embed())
                        .set_components(card.to_components()),
                })
                .await?;
        } else {
            self.command
                .create_interaction_response(&self.ctx.http, |r| {
                    r.kind(InteractionResponseType::ChannelMessageWithSource)
                        .interaction_response_data(|d| match reply {
                            Reply::Text(text) => d.content(text),
                            Reply::Card(card) => d
                                .set_embed(card.to_embed())
                                .set_components(card.to_components()),
                        })
                })
                .await?;
        }
        Ok(())
    }
}

impl Handler {
    /// 优先用消息里带的被回复消息, 没有时再去拉取
    async fn referenced_message(&self, ctx: &Context, msg: &Message) -> Option<Message> {
        if let Some(referenced) = &msg.referenced_message {
            return Some((**referenced).clone());
        }
        let reference = msg.message_reference.as_ref()?;
        let message_id = reference.message_id?;
        match reference.channel_id.message(&ctx.http, message_id).await {
            Ok(message) => Some(message),
            Err(err) => {
                warn!(?err, "获取被回复的消息失败");
                None
            }
        }
    }

    async fn find_command(&self, ctx: &Context, command: &ApplicationCommandInteraction) {
        let responder = CommandResponder::new(ctx, command);
        let target = command
            .data
            .options
            .iter()
            .find(|option| option.name == MESSAGE_OPTION)
            .and_then(|option| option.value.as_ref())
            .and_then(|value| value.as_str())
            .and_then(parse_message_reference);
        let Some(target) = target else {
            if let Err(err) = responder.send(Reply::text(reply::INVALID_REFERENCE)).await {
                error!(?err, "回复发送失败！");
            }
            return;
        };

        let channel_id = target.channel_id.unwrap_or(command.channel_id);
        let image_url = match channel_id.message(&ctx.http, target.message_id).await {
            Ok(message) => message.attachments.first().map(|a| a.url.clone()),
            Err(err) => {
                let message_id = target.message_id;
                error!(?err, ?channel_id, ?message_id, "获取目标消息失败！");
                if let Err(err) = responder.send(Reply::text(reply::FAILURE)).await {
                    error!(?err, "回复发送失败！");
                }
                return;
            }
        };
        dispatch(
            TriggerSource::CommandInvocation { image_url },
            &responder,
            self.finder.as_ref(),
        )
        .await;
    }
}

#[async_trait]
impl EventHandler for Handler {
    #[instrument(skip_all, name = "findmyfluff_recv")]
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot || msg.guild_id.is_none() {
            return;
        }
        if msg.message_reference.is_none() {
            return;
        }
        let mentions_bot = msg.mentions_user_id(UserId(self.config.app_id));
        // 先看文本, 不满足条件就不去拉取被回复的消息
        if !is_reply_trigger(&msg.content, mentions_bot, &self.config.trigger_prefix) {
            return;
        }
        let Some(referenced) = self.referenced_message(&ctx, &msg).await else {
            return;
        };
        let attachment_url = referenced.attachments.first().map(|a| a.url.as_str());
        let Some(source) = TriggerSource::from_reply(
            &msg.content,
            mentions_bot,
            &self.config.trigger_prefix,
            attachment_url,
        ) else {
            debug!("被回复的消息没有附件");
            return;
        };
        info!("{} -> {}", msg.author.name, msg.content);
        let responder = MessageResponder { ctx: &ctx, msg: &msg };
        dispatch(source, &responder, self.finder.as_ref()).await;
    }

    #[instrument(skip_all, name = "findmyfluff_interaction")]
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::ApplicationCommand(command) = interaction else {
            return;
        };
        if command.data.name != FIND_COMMAND {
            return;
        }
        info!(user = %command.user.name, "收到 /{} 指令", FIND_COMMAND);
        self.find_command(&ctx, &command).await;
    }

    #[instrument(skip_all, target = "findmyfluff")]
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Logged in as {}#{}", ready.user.name, ready.user.discriminator);
        info!("Started refreshing application (/) commands.");
        let resp = Command::set_global_application_commands(&ctx.http, |commands| {
            commands.create_application_command(|command| {
                command
                    .name(FIND_COMMAND)
                    .description(FIND_DESCRIPTION)
                    .create_option(|option| {
                        option
                            .name(MESSAGE_OPTION)
                            .description(MESSAGE_DESCRIPTION)
                            .kind(CommandOptionType::String)
                            .required(true)
                    })
            })
        })
        .await;
        match resp {
            Ok(commands) => info!(
                count = commands.len(),
                "Successfully reloaded application (/) commands."
            ),
            Err(err) => error!(?err, "注册指令失败！"),
        }
    }
}
