use crate::bot::{Context, Error};
use crate::models::types::{GuildConfig, MAX_BALANCE};
use crate::utils::bank::Deposit;
use crate::utils::wait;
use poise::{CreateReply, serenity_prelude as serenity};

/// 優惠券代碼固定是 UUID 的 36 字元格式
const CODE_LEN: usize = 36;

/// 取出並作廢一張券；同一把設定鎖內呼叫，保證單次兌換
fn take_coupon(config: &mut GuildConfig, code: &str) -> Option<u64> {
    config.coupons.remove(code)
}

/// 入帳失敗時把券放回去，代碼維持可兌換
fn restore_coupon(config: &mut GuildConfig, code: &str, amount: u64) {
    config.coupons.insert(code.to_string(), amount);
}

/// 優惠券指令
#[poise::command(
    slash_command,
    guild_only,
    subcommands("create", "redeem", "list", "clearall")
)]
pub async fn coupon(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// 建立一張優惠券，代碼會私訊給你
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn create(
    ctx: Context<'_>,
    #[description = "兌換金額"]
    #[min = 1]
    amount: u64,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    if amount > MAX_BALANCE {
        ctx.say(format!("金額不能超過 {}", MAX_BALANCE)).await?;
        return Ok(());
    }

    let code = uuid::Uuid::new_v4().to_string();
    {
        let mut cfg = ctx.data().config.lock().await;
        cfg.update_guild(guild_id, |g| g.coupons.insert(code.clone(), amount))?;
    }

    let dm = serenity::CreateMessage::new().content(format!(
        "你建立了一張 {} 的優惠券，代碼：\n```{}```",
        amount, code
    ));
    match ctx.author().dm(ctx.serenity_context(), dm).await {
        Ok(_) => {
            ctx.send(
                CreateReply::default()
                    .content("優惠券已建立，代碼已私訊給你")
                    .ephemeral(true),
            )
            .await?;
        }
        Err(_) => {
            // 私訊被擋時只好在這裡用隱藏訊息交付
            ctx.send(
                CreateReply::default()
                    .content(format!("無法私訊你，代碼：```{}```", code))
                    .ephemeral(true),
            )
            .await?;
        }
    }
    Ok(())
}

/// 兌換優惠券
#[poise::command(slash_command)]
pub async fn redeem(
    ctx: Context<'_>,
    #[description = "優惠券代碼"] code: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let author_id = ctx.author().id.get();
    let code = code.trim().to_string();

    if code.len() != CODE_LEN {
        ctx.say("代碼格式不正確").await?;
        return Ok(());
    }

    // 在同一次鎖定內取出並作廢，避免同一張券被兌換兩次
    let amount = {
        let mut cfg = ctx.data().config.lock().await;
        cfg.update_guild(guild_id, |g| take_coupon(g, &code))?
    };
    let Some(amount) = amount else {
        ctx.say("查無此代碼，可能已被兌換").await?;
        return Ok(());
    };

    let currency = {
        let cfg = ctx.data().config.lock().await;
        cfg.guild(guild_id).currency
    };
    let deposit = match ctx.data().bank.deposit(guild_id, author_id, amount).await {
        Ok(deposit) => deposit,
        Err(e) => {
            // 入帳失敗不能吞掉這張券
            let mut cfg = ctx.data().config.lock().await;
            cfg.update_guild(guild_id, |g| restore_coupon(g, &code, amount))?;
            return Err(e.into());
        }
    };
    match deposit {
        Deposit::Credited { new_balance } => {
            ctx.say(format!(
                "兌換成功！{} {} 已入帳，目前餘額 {}",
                amount, currency, new_balance
            ))
            .await?;
        }
        Deposit::Clamped { max_balance } => {
            ctx.say(format!(
                "兌換成功，但你的餘額已達上限 {}，超出的部分進不了口袋",
                max_balance
            ))
            .await?;
        }
    }
    Ok(())
}

/// 列出尚未兌換的優惠券
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let coupons = {
        let cfg = ctx.data().config.lock().await;
        cfg.guild(guild_id).coupons
    };

    if coupons.is_empty() {
        ctx.send(
            CreateReply::default()
                .content("目前沒有未兌換的優惠券")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut rows: Vec<(&String, &u64)> = coupons.iter().collect();
    rows.sort_by(|a, b| b.1.cmp(a.1));
    let body: Vec<String> = rows
        .iter()
        .map(|(code, amount)| format!("{} -> {}", code, amount))
        .collect();
    ctx.send(
        CreateReply::default()
            .content(format!("```\n{}\n```", body.join("\n")))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// 作廢所有未兌換的優惠券
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn clearall(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };

    if !wait::confirm_buttons(&ctx, "確定要作廢所有未兌換的優惠券嗎？").await? {
        return Ok(());
    }

    let removed = {
        let mut cfg = ctx.data().config.lock().await;
        cfg.update_guild(guild_id, |g| {
            let n = g.coupons.len();
            g.coupons.clear();
            n
        })?
    };
    ctx.say(format!("已作廢 {} 張優惠券", removed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_coupon_is_single_use() {
        let mut config = GuildConfig::default();
        config.coupons.insert("abc".to_string(), 50);

        assert_eq!(take_coupon(&mut config, "abc"), Some(50));
        // 第二次取同一張券必須失敗
        assert_eq!(take_coupon(&mut config, "abc"), None);
    }

    #[test]
    fn test_restore_after_failed_credit_keeps_coupon_redeemable() {
        let mut config = GuildConfig::default();
        config.coupons.insert("abc".to_string(), 50);

        let amount = take_coupon(&mut config, "abc").unwrap();
        restore_coupon(&mut config, "abc", amount);
        assert_eq!(take_coupon(&mut config, "abc"), Some(50));
    }
}
