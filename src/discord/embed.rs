//! Conversions from relay values to serenity builders.

use serenity::all::{ActivityData, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, OnlineStatus};

use crate::common::messages::RichContent;
use crate::relay::presence::{ActivityKind, Presence, PresenceStatus};

pub fn to_embed(content: &RichContent) -> CreateEmbed {
    let mut embed = CreateEmbed::new();

    if let Some(title) = &content.title {
        embed = embed.title(title);
    }
    if let Some(author) = &content.author {
        embed = embed.author(CreateEmbedAuthor::new(author));
    }
    if let Some(description) = &content.description {
        embed = embed.description(description);
    }
    if let Some(footer) = &content.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer));
    }
    for field in &content.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }
    if let Some(color) = content.color {
        embed = embed.colour(color);
    }

    embed
}

/// Streaming without a valid URL is shown as playing.
pub fn to_activity(presence: &Presence) -> ActivityData {
    let text = presence.text.as_str();
    match presence.activity {
        ActivityKind::Playing => ActivityData::playing(text),
        ActivityKind::Streaming => presence
            .url
            .as_deref()
            .and_then(|url| ActivityData::streaming(text, url).ok())
            .unwrap_or_else(|| ActivityData::playing(text)),
        ActivityKind::Listening => ActivityData::listening(text),
        ActivityKind::Watching => ActivityData::watching(text),
        ActivityKind::CustomStatus => ActivityData::custom(text),
        ActivityKind::Competing => ActivityData::competing(text),
    }
}

pub fn to_online_status(status: PresenceStatus) -> OnlineStatus {
    match status {
        PresenceStatus::Online => OnlineStatus::Online,
        PresenceStatus::Idle => OnlineStatus::Idle,
        PresenceStatus::DoNotDisturb => OnlineStatus::DoNotDisturb,
        PresenceStatus::Invisible => OnlineStatus::Invisible,
        PresenceStatus::Offline => OnlineStatus::Offline,
    }
}
