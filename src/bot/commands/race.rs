use crate::bot::{Context, Error};
use crate::models::types::RaceMode;
use crate::utils::bank::Deposit;
use crate::utils::race::{self, Entrant};
use crate::utils::sessions::{BetOutcome, EnterOutcome, RACE_MAX_ENTRANTS};
use crate::utils::timers::time_format;
use crate::utils::wait;
use poise::serenity_prelude::Mentionable;
use poise::{ChoiceParameter, CreateReply, serenity_prelude as serenity};
use std::time::Duration;

const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];

/// 動物賽跑指令
#[poise::command(
    slash_command,
    guild_only,
    subcommands("start", "enter", "bet", "stats", "clear", "wipe")
)]
pub async fn race(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

fn mode_label(mode: RaceMode) -> &'static str {
    match mode {
        RaceMode::Normal => "一般（全員烏龜）",
        RaceMode::Zoo => "動物園（隨機動物）",
    }
}

fn render_track(field: &[Entrant]) -> String {
    let lines: Vec<String> = field.iter().map(Entrant::track_line).collect();
    format!("**比賽進行中！**\n{}", lines.join("\n"))
}

/// 發起一場比賽
#[poise::command(slash_command)]
pub async fn start(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let author_id = ctx.author().id.get();
    let data = ctx.data();

    let (settings, currency) = {
        let cfg = data.config.lock().await;
        let g = cfg.guild(guild_id);
        (g.race, g.currency)
    };

    if !data.sessions.start_race(guild_id, author_id).await {
        ctx.say("已經有一場比賽了，用 /race enter 加入，或等它跑完")
            .await?;
        return Ok(());
    }
    {
        let mut cfg = data.config.lock().await;
        cfg.update_guild(guild_id, |g| g.race.games_played += 1)?;
    }

    let bet_hint = if settings.bet_allowed {
        format!(
            "，或用 /race bet 下注（{} ~ {} {}）",
            settings.bet_min, settings.bet_max, currency
        )
    } else {
        String::new()
    };
    ctx.say(format!(
        "🚩 {} 發起了一場{}賽跑！{} 內輸入 /race enter 參賽{}。",
        ctx.author().mention(),
        mode_label(settings.mode),
        time_format(settings.wait_secs),
        bet_hint
    ))
    .await?;

    tokio::time::sleep(Duration::from_secs(settings.wait_secs)).await;

    let players = data.sessions.close_race_gathering(guild_id).await;
    if players.is_empty() {
        data.sessions.end_race(guild_id).await;
        return Ok(());
    }

    let bot_id = ctx.framework().bot_id.get();
    let mut field = {
        let mut rng = rand::rng();
        race::build_field(&mut rng, settings.mode, &players, bot_id)
    };
    let mut podium = Vec::new();

    let handle = ctx.say(render_track(&field)).await?;
    loop {
        tokio::time::sleep(Duration::from_secs(2)).await;
        {
            let mut rng = rand::rng();
            race::run_tick(&mut rng, &mut field, &mut podium);
        }
        handle
            .edit(ctx, CreateReply::default().content(render_track(&field)))
            .await?;
        if race::race_over(&field) {
            break;
        }
    }

    let Some(session) = data.sessions.take_race(guild_id).await else {
        return Ok(());
    };

    // 勝敗統計：前三名依名次累計，其餘算一場敗績；機器人不入帳
    let placements = race::placement_table(&podium);
    {
        let mut cfg = data.config.lock().await;
        cfg.update_guild_members(guild_id, &players, |user_id, profile| {
            match placements.get(&user_id) {
                Some(&place) => profile.race.wins[place] += 1,
                None => profile.race.losses += 1,
            }
        })?;
    }

    let mut standings = Vec::new();
    for (i, entry) in podium.iter().enumerate() {
        let who = if entry.is_bot {
            "本機器人".to_string()
        } else {
            format!("<@{}>", entry.user_id)
        };
        standings.push(format!("{} {} {}", MEDALS[i], entry.emoji, who));
    }

    let mut payout_lines = Vec::new();
    let prize_due = settings.prize > 0 && players.len() as u32 >= settings.payout_min;
    if prize_due {
        for (user_id, amount) in
            race::prize_shares(settings.prize, settings.pooling, field.len(), &podium)
        {
            match data.bank.deposit(guild_id, user_id, amount).await? {
                Deposit::Credited { .. } => {
                    payout_lines.push(format!("<@{}> 獲得 {} {}", user_id, amount, currency));
                }
                Deposit::Clamped { .. } => {
                    payout_lines.push(format!("<@{}> 的餘額已達上限，獎金進不了口袋", user_id));
                }
            }
        }
    } else if settings.prize > 0 {
        payout_lines.push(format!(
            "真人參賽者不足 {} 名，本場不發獎金",
            settings.payout_min
        ));
    }

    let mut bet_lines = Vec::new();
    if settings.bet_allowed {
        for (bettor, payout) in
            race::settle_bets(&session.bets, podium.first(), settings.bet_multiplier)
        {
            data.bank.deposit(guild_id, bettor, payout).await?;
            bet_lines.push(format!("<@{}> 押中冠軍，贏得 {} {}", bettor, payout, currency));
        }
    }

    let mut embed = serenity::CreateEmbed::default()
        .title("🏁 比賽結束！")
        .description(standings.join("\n"))
        .colour(serenity::Colour::DARK_GREEN);
    if !payout_lines.is_empty() {
        embed = embed.field("獎金", payout_lines.join("\n"), false);
    }
    if !bet_lines.is_empty() {
        embed = embed.field("注單結算", bet_lines.join("\n"), false);
    }
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// 加入進行中的比賽
#[poise::command(slash_command)]
pub async fn enter(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let author_id = ctx.author().id.get();

    match ctx.data().sessions.enter_race(guild_id, author_id).await {
        EnterOutcome::Entered => {
            ctx.say(format!("{} 加入了比賽！", ctx.author().mention()))
                .await?;
        }
        EnterOutcome::NotActive => {
            ctx.say("現在沒有比賽，用 /race start 發起一場").await?;
        }
        EnterOutcome::AlreadyStarted => {
            ctx.say("比賽已經開跑，等下一場吧").await?;
        }
        EnterOutcome::AlreadyEntered => {
            ctx.say("你已經在參賽名單上了").await?;
        }
        EnterOutcome::RosterFull => {
            ctx.say(format!("跑道只有 {} 條，已經滿了", RACE_MAX_ENTRANTS))
                .await?;
        }
    }
    Ok(())
}

/// 在比賽開跑前對某位參賽者下注
#[poise::command(slash_command)]
pub async fn bet(
    ctx: Context<'_>,
    #[description = "注金"] amount: u64,
    #[description = "押注的參賽者"] user: serenity::User,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let author_id = ctx.author().id.get();
    let target_id = user.id.get();
    let data = ctx.data();

    let (settings, currency) = {
        let cfg = data.config.lock().await;
        let g = cfg.guild(guild_id);
        (g.race, g.currency)
    };

    if !settings.bet_allowed {
        ctx.say("本伺服器已關閉下注").await?;
        return Ok(());
    }
    if amount < settings.bet_min || amount > settings.bet_max {
        ctx.say(format!(
            "注金必須在 {} 到 {} {} 之間",
            settings.bet_min, settings.bet_max, currency
        ))
        .await?;
        return Ok(());
    }

    match data.sessions.check_bet(guild_id, author_id, target_id).await {
        BetOutcome::Placed => {}
        BetOutcome::NotActive => {
            ctx.say("現在沒有比賽可以下注").await?;
            return Ok(());
        }
        BetOutcome::AlreadyStarted => {
            ctx.say("比賽已經開跑，下注截止").await?;
            return Ok(());
        }
        BetOutcome::TargetNotRacing => {
            ctx.say(format!("{} 不在參賽名單上", user.name)).await?;
            return Ok(());
        }
        BetOutcome::AlreadyBet => {
            ctx.say("每人每場只能下一筆注").await?;
            return Ok(());
        }
    }

    if !data.bank.can_spend(guild_id, author_id, amount).await? {
        ctx.say("你的餘額不夠下這筆注").await?;
        return Ok(());
    }
    data.bank.withdraw(guild_id, author_id, amount).await?;

    // 扣款與落注之間場次可能剛好收盤；落注失敗就把錢還回去
    let outcome = data
        .sessions
        .place_bet(guild_id, author_id, target_id, amount)
        .await;
    if outcome != BetOutcome::Placed {
        data.bank.deposit(guild_id, author_id, amount).await?;
        ctx.say("下注窗口剛好關閉，注金已退回").await?;
        return Ok(());
    }

    ctx.say(format!(
        "已收下對 {} 的 {} {} 注金；押中冠軍可得 {} {}。注金不退還。",
        user.name,
        amount,
        currency,
        amount.saturating_mul(settings.bet_multiplier),
        currency
    ))
    .await?;
    Ok(())
}

/// 查看賽跑戰績
#[poise::command(slash_command)]
pub async fn stats(
    ctx: Context<'_>,
    #[description = "要查看的成員，預設是自己"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let player = user.as_ref().unwrap_or(ctx.author());

    let (profile, games_played) = {
        let cfg = ctx.data().config.lock().await;
        (
            cfg.member(guild_id, player.id.get()).race,
            cfg.guild(guild_id).race.games_played,
        )
    };

    let embed = serenity::CreateEmbed::default()
        .title(format!("{} 的賽跑戰績", player.name))
        .field("🥇 冠軍", profile.wins[0].to_string(), true)
        .field("🥈 亞軍", profile.wins[1].to_string(), true)
        .field("🥉 季軍", profile.wins[2].to_string(), true)
        .field("敗場", profile.losses.to_string(), true)
        .field("出賽次數", profile.total_races().to_string(), true)
        .field("本伺服器總場次", games_played.to_string(), true)
        .colour(serenity::Colour::DARK_GREEN);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// 重置卡住的比賽場次
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn clear(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    ctx.data().sessions.end_race(guild_id).await;
    ctx.say("```比賽狀態已重置```").await?;
    Ok(())
}

/// 清空全伺服器的賽跑統計與設定
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn wipe(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };

    if !wait::confirm_buttons(&ctx, "確定要清空所有成員的賽跑統計與賽跑設定嗎？此動作無法復原。")
        .await?
    {
        return Ok(());
    }

    {
        let mut cfg = ctx.data().config.lock().await;
        cfg.wipe_race_data(guild_id)?;
    }
    ctx.say("賽跑統計與設定已全部清空").await?;
    Ok(())
}

// ---- /setrace 設定群組 ----

/// 賽跑參數設定指令
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands(
        "wait_time",
        "mode",
        "prize",
        "togglepool",
        "payoutmin",
        "betmin",
        "betmax",
        "betmultiplier",
        "bettoggle"
    )
)]
pub async fn setrace(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

async fn update_race_setting(
    ctx: &Context<'_>,
    f: impl FnOnce(&mut crate::models::types::RaceSettings),
    reply: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    {
        let mut cfg = ctx.data().config.lock().await;
        cfg.update_guild(guild_id, |g| f(&mut g.race))?;
    }
    ctx.say(reply).await?;
    Ok(())
}

/// 設定報名等待時間（秒）
#[poise::command(slash_command, rename = "wait", required_permissions = "MANAGE_GUILD")]
pub async fn wait_time(
    ctx: Context<'_>,
    #[description = "等待秒數"]
    #[min = 1]
    seconds: u64,
) -> Result<(), Error> {
    update_race_setting(
        &ctx,
        |s| s.wait_secs = seconds,
        format!("報名時間已設為 {}", time_format(seconds)),
    )
    .await
}

#[derive(Clone, Copy, Debug, ChoiceParameter)]
pub enum ModeChoice {
    #[name = "normal"]
    Normal,
    #[name = "zoo"]
    Zoo,
}

/// 設定比賽模式
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn mode(
    ctx: Context<'_>,
    #[description = "比賽模式"] choice: ModeChoice,
) -> Result<(), Error> {
    let value = match choice {
        ModeChoice::Normal => RaceMode::Normal,
        ModeChoice::Zoo => RaceMode::Zoo,
    };
    update_race_setting(
        &ctx,
        |s| s.mode = value,
        format!("比賽模式已設為{}", mode_label(value)),
    )
    .await
}

/// 設定冠軍獎金
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn prize(
    ctx: Context<'_>,
    #[description = "獎金金額，0 表示不發獎"] amount: u64,
) -> Result<(), Error> {
    update_race_setting(
        &ctx,
        |s| s.prize = amount,
        format!("獎金已設為 {}", amount),
    )
    .await
}

/// 切換獎金池（前三名 60/30/10 分配）
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn togglepool(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let now_on = {
        let mut cfg = ctx.data().config.lock().await;
        cfg.update_guild(guild_id, |g| {
            g.race.pooling = !g.race.pooling;
            g.race.pooling
        })?
    };
    if now_on {
        ctx.say("獎金池開啟：四名以上參賽時前三名依 60/30/10 分配")
            .await?;
    } else {
        ctx.say("獎金池關閉：冠軍全拿").await?;
    }
    Ok(())
}

/// 設定發獎所需的最少真人參賽者數
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn payoutmin(
    ctx: Context<'_>,
    #[description = "最少真人參賽者數"] count: u32,
) -> Result<(), Error> {
    update_race_setting(
        &ctx,
        |s| s.payout_min = count,
        format!("真人參賽者達 {} 名才發獎金", count),
    )
    .await
}

/// 設定最低注金
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn betmin(
    ctx: Context<'_>,
    #[description = "最低注金"]
    #[min = 1]
    amount: u64,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let current_max = {
        let cfg = ctx.data().config.lock().await;
        cfg.guild(guild_id).race.bet_max
    };
    if amount > current_max {
        ctx.say(format!("最低注金不能高於目前的最高注金 {}", current_max))
            .await?;
        return Ok(());
    }
    update_race_setting(
        &ctx,
        |s| s.bet_min = amount,
        format!("最低注金已設為 {}", amount),
    )
    .await
}

/// 設定最高注金
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn betmax(
    ctx: Context<'_>,
    #[description = "最高注金"]
    #[min = 1]
    amount: u64,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let current_min = {
        let cfg = ctx.data().config.lock().await;
        cfg.guild(guild_id).race.bet_min
    };
    if amount < current_min {
        ctx.say(format!("最高注金不能低於目前的最低注金 {}", current_min))
            .await?;
        return Ok(());
    }
    update_race_setting(
        &ctx,
        |s| s.bet_max = amount,
        format!("最高注金已設為 {}", amount),
    )
    .await
}

/// 設定押中冠軍的賠率倍數
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn betmultiplier(
    ctx: Context<'_>,
    #[description = "倍率"]
    #[min = 1]
    multiplier: u64,
) -> Result<(), Error> {
    update_race_setting(
        &ctx,
        |s| s.bet_multiplier = multiplier,
        format!("押中冠軍可得注金的 {} 倍", multiplier),
    )
    .await
}

/// 開關下注功能
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn bettoggle(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let now_on = {
        let mut cfg = ctx.data().config.lock().await;
        cfg.update_guild(guild_id, |g| {
            g.race.bet_allowed = !g.race.bet_allowed;
            g.race.bet_allowed
        })?
    };
    ctx.say(if now_on { "下注功能開啟" } else { "下注功能關閉" })
        .await?;
    Ok(())
}
