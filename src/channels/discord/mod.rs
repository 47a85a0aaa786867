use crate::config::DiscordConfig;
use crate::history::{
    ChannelId, Group, GroupId, HistorySource, Member, MemberId, Message, MessageId, ReplyRef,
    TextChannel,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serenity::builder::GetMessages;
use serenity::http::Http;
use serenity::model::channel::{ChannelType, Message as DiscordMessage};
use serenity::model::id::{
    ChannelId as DiscordChannelId, GuildId, MessageId as DiscordMessageId, UserId,
};
use serenity::model::user::User;
use tracing::{debug, info};

/// Start of the Discord snowflake clock (2015-01-01T00:00:00Z) in ms.
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;
const PAGE_SIZE: u8 = 100;
const MEMBER_PAGE_SIZE: u64 = 1000;

/// Read-only view of one guild over the Discord REST API.
pub struct DiscordHistory {
    http: Http,
    guild: GuildId,
}

impl DiscordHistory {
    pub fn new(config: &DiscordConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            anyhow::bail!("discord.token is not set (or export RELMAP_DISCORD_TOKEN)");
        }
        if config.guild_id == 0 {
            anyhow::bail!("discord.guildId is not set");
        }
        Ok(Self {
            http: Http::new(config.token.trim()),
            guild: GuildId::new(config.guild_id),
        })
    }

    /// The account the token belongs to; it is left out of every map.
    pub async fn bot_identity(&self) -> Result<MemberId> {
        let me = self
            .http
            .get_current_user()
            .await
            .context("Failed to look up the bot user")?;
        info!("Authenticated to Discord as {} ({})", me.name, me.id);
        Ok(MemberId(me.id.get()))
    }

    /// Members holding `role_id`. The guild id names the `@everyone` role.
    pub async fn resolve_group(&self, role_id: u64) -> Result<Group> {
        let roles = self
            .guild
            .roles(&self.http)
            .await
            .context("Failed to list guild roles")?;
        let name = roles
            .values()
            .find(|role| role.id.get() == role_id)
            .map(|role| role.name.clone())
            .with_context(|| format!("Role {} does not exist in guild {}", role_id, self.guild))?;

        let guild_id = self.guild.get();
        let mut members = Vec::new();
        let mut after: Option<UserId> = None;
        loop {
            let page = self
                .guild
                .members(&self.http, Some(MEMBER_PAGE_SIZE), after)
                .await
                .context("Failed to list guild members")?;
            let Some(last) = page.last() else {
                break;
            };
            after = Some(last.user.id);
            let full = page.len() as u64 == MEMBER_PAGE_SIZE;
            members.extend(
                page.iter()
                    .filter(|m| {
                        let roles: Vec<u64> = m.roles.iter().map(|r| r.get()).collect();
                        has_role(guild_id, role_id, &roles)
                    })
                    .map(|m| Member::new(m.user.id.get(), m.display_name().to_string())),
            );
            if !full {
                break;
            }
        }
        debug!("Role '{}' has {} members", name, members.len());

        Ok(Group {
            id: GroupId(role_id),
            name,
            members,
        })
    }

    /// Text channel of this guild whose name matches, ignoring a leading `#`.
    pub async fn find_channel(&self, name: &str) -> Result<Option<TextChannel>> {
        let wanted = name.trim_start_matches('#');
        Ok(self
            .text_channels()
            .await?
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(wanted)))
    }
}

#[async_trait]
impl HistorySource for DiscordHistory {
    async fn text_channels(&self) -> Result<Vec<TextChannel>> {
        let channels = self
            .guild
            .channels(&self.http)
            .await
            .context("Failed to list guild channels")?;
        let mut text: Vec<_> = channels
            .into_values()
            .filter(|c| c.kind == ChannelType::Text)
            .collect();
        text.sort_by_key(|c| (c.position, c.id));
        Ok(text
            .into_iter()
            .map(|c| TextChannel {
                id: ChannelId(c.id.get()),
                name: c.name,
            })
            .collect())
    }

    fn history(
        &self,
        channel: ChannelId,
        after: DateTime<Utc>,
    ) -> BoxStream<'_, Result<Message>> {
        let http = &self.http;
        let channel_id = DiscordChannelId::new(channel.get());
        stream::try_unfold(Some(snowflake_at(after)), move |cursor| async move {
            let Some(cursor) = cursor else {
                return Ok::<_, anyhow::Error>(None);
            };
            let mut page = channel_id
                .messages(
                    http,
                    GetMessages::new()
                        .after(DiscordMessageId::new(cursor))
                        .limit(PAGE_SIZE),
                )
                .await
                .with_context(|| format!("Failed to read history of channel {}", channel))?;
            // pages are not guaranteed to arrive oldest first
            page.sort_by_key(|m| m.id);
            let next = page.last().map(|m| m.id.get());
            let items: Vec<Result<Message>> = page.iter().map(|m| Ok(convert_message(m))).collect();
            Ok(next.map(|_| (stream::iter(items), next)))
        })
        .try_flatten()
        .boxed()
    }

    async fn fetch_message(&self, channel: ChannelId, id: MessageId) -> Result<Option<Message>> {
        match DiscordChannelId::new(channel.get())
            .message(&self.http, DiscordMessageId::new(id.get()))
            .await
        {
            Ok(message) => Ok(Some(convert_message(&message))),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to fetch message {} in channel {}", id, channel))),
        }
    }
}

fn is_not_found(err: &serenity::Error) -> bool {
    matches!(err, serenity::Error::Http(e) if e.status_code().is_some_and(|s| s.as_u16() == 404))
}

fn convert_message(msg: &DiscordMessage) -> Message {
    let reply_ref = msg.message_reference.as_ref().map(|r| ReplyRef {
        channel_id: ChannelId(r.channel_id.get()),
        message_id: r.message_id.map(|id| MessageId(id.get())),
        cached_author: msg
            .referenced_message
            .as_ref()
            .map(|original| member_of(&original.author)),
    });
    Message {
        id: MessageId(msg.id.get()),
        channel_id: ChannelId(msg.channel_id.get()),
        author: member_of(&msg.author),
        content: msg.content.clone(),
        timestamp: DateTime::from_timestamp(msg.timestamp.unix_timestamp(), 0)
            .unwrap_or_default(),
        reply_ref,
        mentions: msg.mentions.iter().map(member_of).collect(),
    }
}

fn member_of(user: &User) -> Member {
    Member::new(
        user.id.get(),
        display_name(user.global_name.as_deref(), &user.name),
    )
}

fn display_name(global_name: Option<&str>, username: &str) -> String {
    global_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(username)
        .to_string()
}

fn has_role(guild_id: u64, role_id: u64, member_roles: &[u64]) -> bool {
    role_id == guild_id || member_roles.contains(&role_id)
}

/// Smallest snowflake at or after `time`; never zero.
fn snowflake_at(time: DateTime<Utc>) -> u64 {
    let ms = (time.timestamp_millis() - DISCORD_EPOCH_MS).max(0) as u64;
    (ms << 22).max(1)
}
