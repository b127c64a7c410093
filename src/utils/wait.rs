use crate::bot::{Context, Error};
use poise::{CreateReply, serenity_prelude as serenity};
use rand::random;
use serenity::{
    ButtonStyle, CreateActionRow, CreateButton, CreateInteractionResponse,
    CreateInteractionResponseMessage,
};
use std::time::Duration;

/// 等待下一則符合條件的訊息；逾時回傳 None，呼叫端自行收尾
pub async fn next_message(
    ctx: &Context<'_>,
    channel_id: serenity::ChannelId,
    author_id: serenity::UserId,
    timeout_secs: u64,
) -> Option<serenity::Message> {
    serenity::MessageCollector::new(ctx.serenity_context())
        .channel_id(channel_id)
        .author_id(author_id)
        .timeout(Duration::from_secs(timeout_secs))
        .await
}

/// 文字版的是/否確認結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Yes,
    No,
    Invalid,
    Timeout,
}

/// 在目前頻道等待發話者回覆是/否
pub async fn yes_or_no(ctx: &Context<'_>, timeout_secs: u64) -> Reply {
    let message = next_message(ctx, ctx.channel_id(), ctx.author().id, timeout_secs).await;
    match message {
        Some(message) => {
            let content = message.content.trim().to_lowercase();
            if content == "yes" || content == "y" || content == "是" {
                Reply::Yes
            } else if content == "no" || content == "n" || content == "否" {
                Reply::No
            } else {
                Reply::Invalid
            }
        }
        None => Reply::Timeout,
    }
}

/// 按鈕版確認對話框；逾時或取消都回傳 false
pub async fn confirm_buttons(ctx: &Context<'_>, prompt: impl Into<String>) -> Result<bool, Error> {
    let prompt = prompt.into();
    let nonce: u64 = random();
    let confirm_id = format!("arcade_confirm:{}:{}", ctx.author().id, nonce);
    let cancel_id = format!("arcade_cancel:{}:{}", ctx.author().id, nonce);
    let components = vec![CreateActionRow::Buttons(vec![
        CreateButton::new(confirm_id.clone())
            .label("確認")
            .style(ButtonStyle::Danger),
        CreateButton::new(cancel_id.clone())
            .label("取消")
            .style(ButtonStyle::Secondary),
    ])];

    let reply = CreateReply::default()
        .content(prompt)
        .components(components)
        .ephemeral(true);
    let sent = ctx.send(reply).await?;
    let mut message = sent.into_message().await?;
    let ctx_clone = ctx.serenity_context().clone();
    let author_id = ctx.author().id;

    let interaction = message
        .await_component_interaction(&ctx_clone)
        .author_id(author_id)
        .timeout(Duration::from_secs(30))
        .await;

    match interaction {
        Some(interaction) if interaction.data.custom_id == confirm_id => {
            let response = CreateInteractionResponseMessage::default()
                .content("已確認")
                .components(Vec::new());
            interaction
                .create_response(
                    &ctx_clone,
                    CreateInteractionResponse::UpdateMessage(response),
                )
                .await?;
            Ok(true)
        }
        Some(interaction) => {
            let response = CreateInteractionResponseMessage::default()
                .content("操作已取消")
                .components(Vec::new());
            interaction
                .create_response(
                    &ctx_clone,
                    CreateInteractionResponse::UpdateMessage(response),
                )
                .await?;
            Ok(false)
        }
        None => {
            let edit = serenity::builder::EditMessage::new()
                .content("操作逾時，未執行任何變更")
                .components(Vec::new());
            let _ = message.edit(&ctx_clone.http, edit).await;
            Ok(false)
        }
    }
}
