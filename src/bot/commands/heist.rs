use crate::bot::{Context, Error};
use crate::models::types::{CrewOutput, GuildConfig, MemberStatus};
use crate::utils::bank::Deposit;
use crate::utils::heist::{self, CrewMember, PlayerOutcome};
use crate::utils::sessions::JoinOutcome;
use crate::utils::theme::{self, Theme, ThemeError};
use crate::utils::timers::{self, NO_COOLDOWN, cooldown_calculator, time_format};
use crate::utils::wait::{self, Reply};
use chrono::Utc;
use poise::serenity_prelude::Mentionable;
use poise::{ChoiceParameter, CreateReply, serenity_prelude as serenity};
use std::collections::HashMap;
use std::time::Duration;

/// 搶劫小遊戲指令
#[poise::command(
    slash_command,
    guild_only,
    subcommands(
        "play",
        "stats",
        "targets",
        "bailout",
        "release",
        "revive",
        "info",
        "theme",
        "themes",
        "reset",
        "clear",
        "createtarget",
        "edittarget",
        "removetarget"
    )
)]
pub async fn heist(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

async fn guild_snapshot(ctx: &Context<'_>, guild_id: u64) -> GuildConfig {
    ctx.data().config.lock().await.guild(guild_id)
}

fn load_theme(config: &GuildConfig) -> Theme {
    Theme::load(&theme::theme_dir(), &config.heist.theme).unwrap_or_default()
}

/// 發起或加入一場搶劫
#[poise::command(slash_command)]
pub async fn play(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let author_id = ctx.author().id.get();
    let data = ctx.data();

    let config = guild_snapshot(&ctx, guild_id).await;
    let t = load_theme(&config);
    let settings = config.heist.clone();

    // 前置條件：身分自由、目標存在、警戒解除、付得起入場費
    let profile = { data.config.lock().await.member(guild_id, author_id).heist };
    match profile.status {
        MemberStatus::Apprehended => {
            let served = timers::elapsed_secs(profile.status_since);
            ctx.say(format!(
                "你還在{}裡，不能出任務。剩餘{}：{}",
                t.jail,
                t.sentence,
                cooldown_calculator(served, profile.sentence_secs)
            ))
            .await?;
            return Ok(());
        }
        MemberStatus::Dead => {
            let elapsed = timers::elapsed_secs(profile.status_since);
            ctx.say(format!(
                "死人不會搶銀行。復活冷卻：{}（用 /heist revive 復活）",
                cooldown_calculator(elapsed, settings.death_secs)
            ))
            .await?;
            return Ok(());
        }
        MemberStatus::Free => {}
    }

    if config.targets.is_empty() {
        ctx.say("本伺服器還沒有任何目標，請管理員先用 /heist createtarget 建立")
            .await?;
        return Ok(());
    }

    if let Some(until) = settings.alert_until {
        let remaining = timers::secs_until(until);
        if remaining > 0 {
            ctx.say(format!(
                "{}仍在戒備中，風頭還沒過。再等：{}",
                t.police,
                time_format(remaining)
            ))
            .await?;
            return Ok(());
        }
    }

    if !data.bank.can_spend(guild_id, author_id, settings.cost).await? {
        ctx.say(format!(
            "入場費要 {} {}，你的餘額不夠",
            settings.cost, config.currency
        ))
        .await?;
        return Ok(());
    }

    // 已有場次就走加入路徑
    if !data.sessions.start_heist(guild_id, author_id).await {
        match data.sessions.join_heist(guild_id, author_id).await {
            JoinOutcome::Joined { crew_size } => {
                // can_spend 之後餘額可能已被別的指令花掉；扣不到錢就退出隊伍
                if let Err(e) = data.bank.withdraw(guild_id, author_id, settings.cost).await {
                    data.sessions.leave_heist(guild_id, author_id).await;
                    return Err(e.into());
                }
                ctx.say(format!(
                    "{} 加入了{}！目前共 {} 名成員。",
                    ctx.author().mention(),
                    t.crew,
                    crew_size
                ))
                .await?;
            }
            JoinOutcome::AlreadyJoined => {
                ctx.say(format!("你已經在{}裡了", t.crew)).await?;
            }
            JoinOutcome::TooLate | JoinOutcome::NotActive => {
                ctx.say(format!("{}已經出發，追不上這一趟了", t.crew)).await?;
            }
        }
        return Ok(());
    }

    // 發起者路徑：扣款後開啟招募窗口
    if let Err(e) = data.bank.withdraw(guild_id, author_id, settings.cost).await {
        data.sessions.end_heist(guild_id).await;
        return Err(e.into());
    }

    ctx.say(format!(
        "{} 正在策劃一場{}！{} 秒內輸入 /heist play 即可加入{}。",
        ctx.author().mention(),
        t.heist,
        settings.wait_secs,
        t.crew
    ))
    .await?;

    tokio::time::sleep(Duration::from_secs(settings.wait_secs)).await;

    let crew = data.sessions.close_heist_gathering(guild_id).await;
    if crew.len() < 2 {
        data.sessions.end_heist(guild_id).await;
        ctx.say(format!(
            "沒有人響應你的號召，{}就地解散。入場費不予退還。",
            t.crew
        ))
        .await?;
        return Ok(());
    }

    resolve_heist(&ctx, guild_id, crew, &t).await
}

/// 招募結束後的完整結算：選目標、逐人擲骰、套用狀態、分贓、設警戒
async fn resolve_heist(
    ctx: &Context<'_>,
    guild_id: u64,
    crew: Vec<u64>,
    t: &Theme,
) -> Result<(), Error> {
    let data = ctx.data();
    let config = guild_snapshot(ctx, guild_id).await;
    let settings = config.heist.clone();

    let Some((target_name, target)) = heist::select_target(&config.targets, crew.len() as u32)
    else {
        data.sessions.end_heist(guild_id).await;
        ctx.say(format!(
            "找不到適合 {} 人{}的目標，行動中止。入場費不予退還。",
            crew.len(),
            t.crew
        ))
        .await?;
        return Ok(());
    };
    let target_name = target_name.to_string();
    let target = target.clone();

    let crew_members: Vec<CrewMember> = {
        let cfg = data.config.lock().await;
        crew.iter()
            .map(|&user_id| CrewMember {
                user_id,
                oob: cfg.member(guild_id, user_id).heist.oob,
            })
            .collect()
    };

    ctx.say(format!(
        "準備行動！{} 帶著 {} 朝 **{}** 出發，目標是他們的{}！",
        t.crew,
        crew_roll_call(&crew, settings.crew_output),
        target_name,
        t.vault
    ))
    .await?;

    let (outcomes, vault) = {
        let mut rng = rand::rng();
        let outcomes = heist::run_heist(&mut rng, &crew_members, &target, settings.sentence_secs);
        let vault = heist::roll_vault(&mut rng, &target);
        (outcomes, vault)
    };

    // 套用狀態變化；整批成員一次存檔
    let outcome_map: HashMap<u64, PlayerOutcome> = outcomes.iter().copied().collect();
    let now = Utc::now();
    {
        let mut cfg = data.config.lock().await;
        cfg.update_guild_members(guild_id, &crew, |user_id, profile| {
            match outcome_map.get(&user_id) {
                Some(PlayerOutcome::Success) => {
                    profile.heist.spree += 1;
                }
                Some(PlayerOutcome::Apprehended { sentence_secs }) => {
                    let multiplier = sentence_secs / settings.sentence_secs.max(1);
                    profile.heist.status = MemberStatus::Apprehended;
                    profile.heist.sentence_secs = *sentence_secs;
                    profile.heist.status_since = Some(now);
                    profile.heist.bail_cost = settings.bail_base * multiplier.max(1);
                    profile.heist.oob = false;
                    profile.heist.jail_total += 1;
                    profile.heist.spree = 0;
                }
                Some(PlayerOutcome::Died) => {
                    profile.heist.status = MemberStatus::Dead;
                    profile.heist.sentence_secs = 0;
                    profile.heist.status_since = Some(now);
                    profile.heist.oob = false;
                    profile.heist.death_total += 1;
                    profile.heist.spree = 0;
                }
                None => {}
            }
        })?;
    }

    let mut lines = Vec::new();
    let mut survivors = Vec::new();
    let mut dead = Vec::new();
    for (user_id, outcome) in &outcomes {
        match outcome {
            PlayerOutcome::Success => {
                survivors.push(*user_id);
                lines.push(format!("🤑 <@{}> 安全脫身！", user_id));
            }
            PlayerOutcome::Apprehended { sentence_secs } => {
                lines.push(format!(
                    "🚔 <@{}> 被{}逮個正著，{}：{}",
                    user_id,
                    t.police,
                    t.sentence,
                    time_format(*sentence_secs)
                ));
            }
            PlayerOutcome::Died => {
                dead.push(*user_id);
                lines.push(format!("💀 <@{}> 在行動中喪命……", user_id));
            }
        }
    }

    if settings.hardcore {
        for &user_id in &dead {
            data.bank.wipe(guild_id, user_id).await?;
        }
    }

    let share = heist::split_payout(vault, survivors.len());
    let payout_line = if survivors.is_empty() {
        format!("無人生還，{}的{}原封不動。", target_name, t.vault)
    } else {
        let mut clamped = Vec::new();
        for &user_id in &survivors {
            if let Deposit::Clamped { .. } = data.bank.deposit(guild_id, user_id, share).await? {
                clamped.push(user_id);
            }
        }
        let mut line = format!(
            "{}被掏出 {} {}，{} 名生還者每人分得 {} {}。",
            t.vault,
            vault,
            config.currency,
            survivors.len(),
            share,
            config.currency
        );
        for user_id in clamped {
            line.push_str(&format!("\n<@{}> 的餘額已達上限，多的進不了口袋。", user_id));
        }
        line
    };

    // 下一場之前的警戒期
    {
        let mut cfg = data.config.lock().await;
        cfg.update_guild(guild_id, |g| {
            g.heist.alert_until =
                Some(Utc::now() + chrono::Duration::seconds(settings.police_secs as i64));
        })?;
    }
    data.sessions.end_heist(guild_id).await;

    let embed = serenity::CreateEmbed::default()
        .title(format!("{}結果：{}", t.heist, target_name))
        .description(lines.join("\n"))
        .field("戰利品", payout_line, false)
        .colour(serenity::Colour::GOLD);
    ctx.send(CreateReply::default().embed(embed)).await?;

    Ok(())
}

fn crew_roll_call(crew: &[u64], output: CrewOutput) -> String {
    match output {
        CrewOutput::None => format!("{} 名成員", crew.len()),
        CrewOutput::Short => {
            let shown: Vec<String> = crew.iter().take(5).map(|id| format!("<@{}>", id)).collect();
            if crew.len() > 5 {
                format!("{} 等 {} 人", shown.join("、"), crew.len())
            } else {
                shown.join("、")
            }
        }
        CrewOutput::Long => crew
            .iter()
            .map(|id| format!("<@{}>", id))
            .collect::<Vec<_>>()
            .join("、"),
    }
}

/// 查看自己的搶劫戰績
#[poise::command(slash_command)]
pub async fn stats(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let author_id = ctx.author().id.get();

    let config = guild_snapshot(&ctx, guild_id).await;
    let t = load_theme(&config);
    let profile = {
        ctx.data()
            .config
            .lock()
            .await
            .member(guild_id, author_id)
            .heist
    };

    let served = timers::elapsed_secs(profile.status_since);
    let sentence_fmt = cooldown_calculator(served, profile.sentence_secs);
    let death_fmt = match profile.status {
        MemberStatus::Dead => cooldown_calculator(served, config.heist.death_secs),
        _ => NO_COOLDOWN.to_string(),
    };
    let rank = heist::criminal_level(profile.jail_total + profile.death_total);

    let embed = serenity::CreateEmbed::default()
        .title(ctx.author().name.clone())
        .description(format!("罪犯等級：{}", rank))
        .field("狀態", profile.status.to_string(), true)
        .field("連勝", profile.spree.to_string(), true)
        .field(format!("{}金額", t.bail), profile.bail_cost.to_string(), true)
        .field(t.oob.clone(), if profile.oob { "是" } else { "否" }, true)
        .field(
            format!("{}{}", t.jail, t.sentence),
            sentence_fmt,
            true,
        )
        .field("復活冷卻", death_fmt, true)
        .field("被捕次數", profile.jail_total.to_string(), true)
        .field("死亡次數", profile.death_total.to_string(), true)
        .colour(serenity::Colour::BLURPLE);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// 列出本伺服器的搶劫目標
#[poise::command(slash_command)]
pub async fn targets(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let config = guild_snapshot(&ctx, guild_id).await;
    let t = load_theme(&config);

    if config.targets.is_empty() {
        ctx.say("還沒有任何目標，請管理員用 /heist createtarget 建立")
            .await?;
        return Ok(());
    }

    let mut rows: Vec<(&String, &crate::models::types::Target)> = config.targets.iter().collect();
    rows.sort_by(|a, b| b.1.crew.cmp(&a.1.crew));

    let mut table = format!(
        "{:<12} {:>6} {:>12} {:>12} {:>8}\n",
        "目標", "人數", t.vault, "上限", "成功率"
    );
    for (name, target) in rows {
        table.push_str(&format!(
            "{:<12} {:>6} {:>12} {:>12} {:>7}%\n",
            name, target.crew, target.vault_min, target.vault_max, target.success
        ));
    }
    ctx.say(format!("```\n{}```", table)).await?;
    Ok(())
}

/// 付保釋金讓自己或別人提早出獄
#[poise::command(slash_command)]
pub async fn bailout(
    ctx: Context<'_>,
    #[description = "要保釋的對象，預設是自己"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let author_id = ctx.author().id.get();
    let player = user.as_ref().unwrap_or(ctx.author());
    let player_id = player.id.get();
    let data = ctx.data();

    let config = guild_snapshot(&ctx, guild_id).await;
    let t = load_theme(&config);
    let profile = { data.config.lock().await.member(guild_id, player_id).heist };

    if profile.status != MemberStatus::Apprehended {
        ctx.say(format!("{} 並不在{}裡", player.name, t.jail)).await?;
        return Ok(());
    }

    let cost = profile.bail_cost;
    if !data.bank.can_spend(guild_id, author_id, cost).await? {
        ctx.say(format!("你付不起這筆{}（{} {}）", t.bail, cost, config.currency))
            .await?;
        return Ok(());
    }

    let prompt = if player_id == author_id {
        format!(
            "確定要付 {} {} 的{}嗎？提早出獄會留下{}紀錄，下次被捕{}三倍。請回覆 yes / no。",
            cost, config.currency, t.bail, t.oob, t.sentence
        )
    } else {
        format!(
            "確定要替 {} 付 {} {} 的{}嗎？請回覆 yes / no。",
            player.name, cost, config.currency, t.bail
        )
    };
    ctx.say(prompt).await?;

    match wait::yes_or_no(&ctx, 15).await {
        Reply::Yes => {
            data.bank.withdraw(guild_id, author_id, cost).await?;
            {
                let mut cfg = data.config.lock().await;
                cfg.update_member(guild_id, player_id, |p| {
                    p.heist.status = MemberStatus::Free;
                    p.heist.sentence_secs = 0;
                    p.heist.status_since = None;
                    p.heist.bail_cost = 0;
                    p.heist.oob = true;
                })?;
            }
            ctx.say(format!("<@{}> 重獲自由！好好呼吸外面的空氣吧。", player_id))
                .await?;
        }
        Reply::No => {
            ctx.say("交易取消。").await?;
        }
        Reply::Invalid => {
            ctx.say("看不懂你的回覆，交易取消。").await?;
        }
        Reply::Timeout => {
            ctx.say("等太久了，交易取消！").await?;
        }
    }
    Ok(())
}

/// 刑期服滿後出獄
#[poise::command(slash_command)]
pub async fn release(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let author_id = ctx.author().id.get();
    let data = ctx.data();

    let config = guild_snapshot(&ctx, guild_id).await;
    let t = load_theme(&config);
    let profile = { data.config.lock().await.member(guild_id, author_id).heist };

    if profile.status != MemberStatus::Apprehended {
        ctx.say(format!("你根本不在{}裡，不需要出獄", t.jail)).await?;
        return Ok(());
    }

    let served = timers::elapsed_secs(profile.status_since);
    let remaining = cooldown_calculator(served, profile.sentence_secs);
    if remaining != NO_COOLDOWN {
        ctx.say(format!(
            "你的{}還沒服完，剩餘：\n```{}```",
            t.sentence, remaining
        ))
        .await?;
        return Ok(());
    }

    {
        let mut cfg = data.config.lock().await;
        cfg.update_member(guild_id, author_id, |p| {
            p.heist.status = MemberStatus::Free;
            p.heist.sentence_secs = 0;
            p.heist.status_since = None;
            p.heist.bail_cost = 0;
        })?;
    }
    ctx.say("刑滿釋放！外面的空氣真香。").await?;
    Ok(())
}

/// 死亡冷卻結束後復活
#[poise::command(slash_command)]
pub async fn revive(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let author_id = ctx.author().id.get();
    let data = ctx.data();

    let config = guild_snapshot(&ctx, guild_id).await;
    let profile = { data.config.lock().await.member(guild_id, author_id).heist };

    if profile.status != MemberStatus::Dead {
        ctx.say("你還活著，不用急著詐屍").await?;
        return Ok(());
    }

    let elapsed = timers::elapsed_secs(profile.status_since);
    let remaining = cooldown_calculator(elapsed, config.heist.death_secs);
    if remaining != NO_COOLDOWN {
        ctx.say(format!("還差一口氣，復活冷卻剩餘：\n```{}```", remaining))
            .await?;
        return Ok(());
    }

    {
        let mut cfg = data.config.lock().await;
        cfg.update_member(guild_id, author_id, |p| {
            p.heist.status = MemberStatus::Free;
            p.heist.status_since = None;
        })?;
    }
    ctx.say("你從鬼門關前爬了回來！").await?;
    Ok(())
}

/// 查看本伺服器的搶劫設定
#[poise::command(slash_command)]
pub async fn info(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let config = guild_snapshot(&ctx, guild_id).await;
    let t = load_theme(&config);
    let s = &config.heist;

    let embed = serenity::CreateEmbed::default()
        .title("搶劫設定")
        .description(format!("主題：{}", s.theme))
        .field("入場費", format!("{} {}", s.cost, config.currency), true)
        .field(format!("{}基準", t.bail), s.bail_base.to_string(), true)
        .field("招募時間", time_format(s.wait_secs), true)
        .field(format!("{}警戒", t.police), time_format(s.police_secs), true)
        .field(
            format!("基準{}", t.sentence),
            time_format(s.sentence_secs),
            true,
        )
        .field("死亡冷卻", time_format(s.death_secs), true)
        .field("硬核模式", if s.hardcore { "ON" } else { "OFF" }, true)
        .colour(serenity::Colour::BLURPLE);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// 切換搶劫主題
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn theme(
    ctx: Context<'_>,
    #[description = "主題名稱（見 /heist themes）"] name: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };

    match Theme::load(&theme::theme_dir(), &name) {
        Ok(_) => {
            let mut cfg = ctx.data().config.lock().await;
            cfg.update_guild(guild_id, |g| g.heist.theme = name.clone())?;
            ctx.say(format!("主題已切換為 {}", name)).await?;
        }
        Err(ThemeError::NotFound(_)) => {
            let available = theme::list_themes(&theme::theme_dir()).unwrap_or_default();
            ctx.say(format!(
                "找不到這個主題。可用主題：```\n{}```",
                available.join("\n")
            ))
            .await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// 列出可用的主題
#[poise::command(slash_command)]
pub async fn themes(ctx: Context<'_>) -> Result<(), Error> {
    let available = theme::list_themes(&theme::theme_dir()).unwrap_or_default();
    if available.is_empty() {
        ctx.say("找不到任何主題檔案").await?;
    } else {
        ctx.say(format!("可用主題：```\n{}```", available.join("\n")))
            .await?;
    }
    Ok(())
}

/// 重置卡住的搶劫場次
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn reset(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let data = ctx.data();
    data.sessions.end_heist(guild_id).await;
    {
        let mut cfg = data.config.lock().await;
        cfg.update_guild(guild_id, |g| g.heist.alert_until = None)?;
    }
    ctx.say("```搶劫狀態已重置```").await?;
    Ok(())
}

/// 清除某位成員的入獄/死亡狀態
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn clear(
    ctx: Context<'_>,
    #[description = "要清除狀態的成員"] user: serenity::User,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    {
        let mut cfg = ctx.data().config.lock().await;
        cfg.update_member(guild_id, user.id.get(), |p| {
            p.heist.status = MemberStatus::Free;
            p.heist.sentence_secs = 0;
            p.heist.status_since = None;
            p.heist.bail_cost = 0;
            p.heist.oob = false;
        })?;
    }
    ctx.say(format!(
        "```{} 清除了 {} 的入獄/死亡狀態```",
        ctx.author().name,
        user.name
    ))
    .await?;
    Ok(())
}

/// 建立新的搶劫目標
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn createtarget(
    ctx: Context<'_>,
    #[description = "目標名稱"] name: String,
    #[description = "需要的隊伍人數，不可與其他目標重複"]
    #[min = 1]
    crew: u32,
    #[description = "金庫最小金額"]
    #[min = 1]
    vault_min: u64,
    #[description = "金庫最大金額"]
    #[min = 1]
    vault_max: u64,
    #[description = "成功率百分比"]
    #[min = 1]
    #[max = 100]
    success: u32,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let name = name.trim().to_string();
    if name.is_empty() {
        ctx.say("目標名稱不能是空白").await?;
        return Ok(());
    }
    if vault_max < vault_min {
        ctx.say("金庫最大金額不能低於最小金額").await?;
        return Ok(());
    }
    if vault_max >= u64::MAX {
        ctx.say("金額太大了，換個小一點的數字").await?;
        return Ok(());
    }

    let config = guild_snapshot(&ctx, guild_id).await;
    if config.targets.contains_key(&name) {
        ctx.say("已經有同名的目標了，建立取消").await?;
        return Ok(());
    }
    if config.targets.values().any(|t| t.crew == crew) {
        ctx.say("已經有目標使用同樣的隊伍人數了，建立取消").await?;
        return Ok(());
    }

    let target = crate::models::types::Target {
        crew,
        vault_min,
        vault_max,
        success: success as u8,
    };
    {
        let mut cfg = ctx.data().config.lock().await;
        cfg.update_guild(guild_id, |g| g.targets.insert(name.clone(), target.clone()))?;
    }
    ctx.say(format!(
        "目標已建立。```名稱：{}\n人數：{}\n金庫：{} ~ {}\n成功率：{}%```",
        name, crew, vault_min, vault_max, success
    ))
    .await?;
    Ok(())
}

#[derive(Clone, Copy, Debug, ChoiceParameter)]
pub enum TargetField {
    #[name = "name"]
    Name,
    #[name = "crew"]
    Crew,
    #[name = "vault-min"]
    VaultMin,
    #[name = "vault-max"]
    VaultMax,
    #[name = "success"]
    Success,
}

/// 修改既有目標的欄位
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn edittarget(
    ctx: Context<'_>,
    #[description = "目標名稱"] target: String,
    #[description = "要修改的欄位"] field: TargetField,
    #[description = "新數值（改名以外都必填）"] value: Option<u64>,
    #[description = "新名稱（僅改名用）"] new_name: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let target = target.trim().to_string();

    let config = guild_snapshot(&ctx, guild_id).await;
    let Some(existing) = config.targets.get(&target).cloned() else {
        ctx.say("沒有這個目標").await?;
        return Ok(());
    };

    match field {
        TargetField::Name => {
            let Some(new_name) = new_name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
            else {
                ctx.say("請提供新名稱").await?;
                return Ok(());
            };
            if config.targets.contains_key(&new_name) {
                ctx.say("新名稱已被其他目標使用").await?;
                return Ok(());
            }
            let mut cfg = ctx.data().config.lock().await;
            cfg.update_guild(guild_id, |g| {
                if let Some(t) = g.targets.remove(&target) {
                    g.targets.insert(new_name.clone(), t);
                }
            })?;
            ctx.say(format!("已把 {} 改名為 {}", target, new_name)).await?;
        }
        TargetField::Crew => {
            let Some(value) = value.filter(|&v| v > 0) else {
                ctx.say("請提供大於 0 的人數").await?;
                return Ok(());
            };
            if config
                .targets
                .iter()
                .any(|(name, t)| name != &target && u64::from(t.crew) == value)
            {
                ctx.say("這個人數已被其他目標使用，請先確認現有目標").await?;
                return Ok(());
            }
            let mut cfg = ctx.data().config.lock().await;
            cfg.update_guild(guild_id, |g| {
                if let Some(t) = g.targets.get_mut(&target) {
                    t.crew = value as u32;
                }
            })?;
            ctx.say(format!("已把 {} 的人數改為 {}", target, value)).await?;
        }
        TargetField::VaultMin | TargetField::VaultMax => {
            let Some(value) = value.filter(|&v| v > 0 && v < u64::MAX) else {
                ctx.say("請提供合理範圍內的金額").await?;
                return Ok(());
            };
            let valid = match field {
                TargetField::VaultMin => value <= existing.vault_max,
                _ => value >= existing.vault_min,
            };
            if !valid {
                ctx.say("金庫上下限不能交叉").await?;
                return Ok(());
            }
            let mut cfg = ctx.data().config.lock().await;
            cfg.update_guild(guild_id, |g| {
                if let Some(t) = g.targets.get_mut(&target) {
                    match field {
                        TargetField::VaultMin => t.vault_min = value,
                        _ => t.vault_max = value,
                    }
                }
            })?;
            ctx.say(format!("已更新 {} 的金庫範圍", target)).await?;
        }
        TargetField::Success => {
            let Some(value) = value.filter(|&v| (1..=100).contains(&v)) else {
                ctx.say("成功率必須在 1 到 100 之間").await?;
                return Ok(());
            };
            let mut cfg = ctx.data().config.lock().await;
            cfg.update_guild(guild_id, |g| {
                if let Some(t) = g.targets.get_mut(&target) {
                    t.success = value as u8;
                }
            })?;
            ctx.say(format!("已把 {} 的成功率改為 {}%", target, value)).await?;
        }
    }
    Ok(())
}

/// 刪除搶劫目標
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn removetarget(
    ctx: Context<'_>,
    #[description = "目標名稱"] target: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let target = target.trim().to_string();

    let config = guild_snapshot(&ctx, guild_id).await;
    if !config.targets.contains_key(&target) {
        ctx.say("沒有這個目標").await?;
        return Ok(());
    }

    if !wait::confirm_buttons(&ctx, format!("確定要刪除目標「{}」嗎？", target)).await? {
        return Ok(());
    }

    {
        let mut cfg = ctx.data().config.lock().await;
        cfg.update_guild(guild_id, |g| g.targets.remove(&target))?;
    }
    ctx.say(format!("{} 已從目標清單移除", target)).await?;
    Ok(())
}

// ---- /setheist 設定群組 ----

/// 搶劫參數設定指令
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands("cost", "bail", "sentence", "death", "wait", "police", "hardcore", "output")
)]
pub async fn setheist(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

async fn update_heist_setting(
    ctx: &Context<'_>,
    f: impl FnOnce(&mut crate::models::types::HeistSettings),
    reply: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    {
        let mut cfg = ctx.data().config.lock().await;
        cfg.update_guild(guild_id, |g| f(&mut g.heist))?;
    }
    ctx.say(reply).await?;
    Ok(())
}

/// 設定入場費
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn cost(
    ctx: Context<'_>,
    #[description = "入場費金額"] amount: u64,
) -> Result<(), Error> {
    update_heist_setting(
        &ctx,
        |s| s.cost = amount,
        format!("入場費已設為 {}", amount),
    )
    .await
}

/// 設定保釋金基準
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn bail(
    ctx: Context<'_>,
    #[description = "保釋金基準金額"] amount: u64,
) -> Result<(), Error> {
    update_heist_setting(
        &ctx,
        |s| s.bail_base = amount,
        format!("保釋金基準已設為 {}", amount),
    )
    .await
}

/// 設定被捕的基準刑期（秒）
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn sentence(
    ctx: Context<'_>,
    #[description = "刑期秒數"]
    #[min = 1]
    seconds: u64,
) -> Result<(), Error> {
    update_heist_setting(
        &ctx,
        |s| s.sentence_secs = seconds,
        format!("基準刑期已設為 {}", time_format(seconds)),
    )
    .await
}

/// 設定死亡冷卻（秒）
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn death(
    ctx: Context<'_>,
    #[description = "死亡冷卻秒數"]
    #[min = 1]
    seconds: u64,
) -> Result<(), Error> {
    update_heist_setting(
        &ctx,
        |s| s.death_secs = seconds,
        format!("死亡冷卻已設為 {}", time_format(seconds)),
    )
    .await
}

/// 設定招募隊員的等待時間（秒）
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn wait(
    ctx: Context<'_>,
    #[description = "等待秒數"]
    #[min = 1]
    seconds: u64,
) -> Result<(), Error> {
    update_heist_setting(
        &ctx,
        |s| s.wait_secs = seconds,
        format!("招募時間已設為 {}", time_format(seconds)),
    )
    .await
}

/// 設定警戒時間（秒）
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn police(
    ctx: Context<'_>,
    #[description = "警戒秒數"]
    #[min = 1]
    seconds: u64,
) -> Result<(), Error> {
    update_heist_setting(
        &ctx,
        |s| s.police_secs = seconds,
        format!("警戒時間已設為 {}", time_format(seconds)),
    )
    .await
}

/// 切換硬核模式（死亡清空餘額）
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn hardcore(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let now_on = {
        let mut cfg = ctx.data().config.lock().await;
        cfg.update_guild(guild_id, |g| {
            g.heist.hardcore = !g.heist.hardcore;
            g.heist.hardcore
        })?
    };
    if now_on {
        ctx.say("硬核模式開啟！**警告**：死亡將清空全部餘額。").await?;
    } else {
        ctx.say("硬核模式關閉。").await?;
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, ChoiceParameter)]
pub enum OutputChoice {
    #[name = "none"]
    None,
    #[name = "short"]
    Short,
    #[name = "long"]
    Long,
}

/// 設定開場訊息要列出多少隊員
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn output(
    ctx: Context<'_>,
    #[description = "顯示模式"] mode: OutputChoice,
) -> Result<(), Error> {
    let value = match mode {
        OutputChoice::None => CrewOutput::None,
        OutputChoice::Short => CrewOutput::Short,
        OutputChoice::Long => CrewOutput::Long,
    };
    update_heist_setting(
        &ctx,
        |s| s.crew_output = value,
        format!("開場訊息模式已設為 {:?}", value),
    )
    .await
}
