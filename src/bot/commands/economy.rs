use crate::bot::{Context, Error};
use crate::models::types::MAX_BALANCE;
use poise::{CreateReply, serenity_prelude as serenity};

/// 查詢餘額
#[poise::command(slash_command, guild_only)]
pub async fn balance(
    ctx: Context<'_>,
    #[description = "要查詢的成員，預設是自己"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let player = user.as_ref().unwrap_or(ctx.author());

    let currency = {
        let cfg = ctx.data().config.lock().await;
        cfg.guild(guild_id).currency
    };
    let amount = ctx.data().bank.balance(guild_id, player.id.get()).await?;
    ctx.say(format!("{} 的餘額：{} {}", player.name, amount, currency))
        .await?;
    Ok(())
}

/// 直接設定某位成員的餘額
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn setbal(
    ctx: Context<'_>,
    #[description = "成員"] user: serenity::User,
    #[description = "新的餘額"] amount: u64,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };

    let clamped = amount.min(MAX_BALANCE);
    ctx.data()
        .bank
        .set_balance(guild_id, user.id.get(), clamped)
        .await?;

    let currency = {
        let cfg = ctx.data().config.lock().await;
        cfg.guild(guild_id).currency
    };
    let reply = if clamped < amount {
        format!(
            "{} 的餘額已設為上限 {} {}（原輸入超過上限）",
            user.name, clamped, currency
        )
    } else {
        format!("{} 的餘額已設為 {} {}", user.name, clamped, currency)
    };
    ctx.send(CreateReply::default().content(reply)).await?;
    Ok(())
}
