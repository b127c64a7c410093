use crate::bot::{Context, Error};
use crate::models::types::{ApplicationSettings, Question};
use crate::utils::timers::cooldown_calculator;
use crate::utils::wait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use poise::{CreateReply, serenity_prelude as serenity};
use std::collections::HashMap;
use std::sync::Mutex;

/// 同一成員兩次申請之間的最短間隔
const APPLY_COOLDOWN_SECS: u64 = 48 * 3600;

/// (伺服器, 成員) -> 上次送出申請的時刻。
/// 只存在於記憶體中，程序重啟後冷卻歸零。
static RECENT_APPLICATIONS: Lazy<Mutex<HashMap<(u64, u64), DateTime<Utc>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn apply_cooldown_remaining(guild_id: u64, user_id: u64) -> Option<String> {
    let recent = RECENT_APPLICATIONS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let last = recent.get(&(guild_id, user_id))?;
    let elapsed = (Utc::now() - *last).num_seconds().max(0) as u64;
    let remaining = cooldown_calculator(elapsed, APPLY_COOLDOWN_SECS);
    if remaining == crate::utils::timers::NO_COOLDOWN {
        None
    } else {
        Some(remaining)
    }
}

fn mark_applied(guild_id: u64, user_id: u64) {
    RECENT_APPLICATIONS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert((guild_id, user_id), Utc::now());
}

/// 申請加入管理團隊；問答會在私訊中進行
#[poise::command(slash_command, guild_only)]
pub async fn apply(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let author = ctx.author().clone();
    let author_id = author.id.get();

    let settings = {
        let cfg = ctx.data().config.lock().await;
        cfg.guild(guild_id).application
    };
    if !settings.is_set {
        ctx.say("本伺服器尚未開放申請，請管理員先用 /setapply setup 設定")
            .await?;
        return Ok(());
    }
    let Some(channel_id) = settings.channel_id else {
        ctx.say("申請收件頻道尚未設定").await?;
        return Ok(());
    };

    if let Some(remaining) = apply_cooldown_remaining(guild_id, author_id) {
        ctx.send(
            CreateReply::default()
                .content(format!("你最近才申請過，請再等：{}", remaining))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let dm = match author.create_dm_channel(ctx.serenity_context()).await {
        Ok(dm) => dm,
        Err(_) => {
            ctx.send(
                CreateReply::default()
                    .content("無法私訊你，請先開啟私人訊息再重試")
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    };

    ctx.send(
        CreateReply::default()
            .content("申請已開始，請到私訊回答問題")
            .ephemeral(true),
    )
    .await?;
    dm.id
        .say(
            ctx.serenity_context(),
            "感謝你的申請！接下來會依序提問，請逐題回答。",
        )
        .await?;

    let mut answers: Vec<(String, String)> = Vec::new();
    for question in &settings.questions {
        dm.id.say(ctx.serenity_context(), &question.prompt).await?;
        let Some(message) =
            wait::next_message(&ctx, dm.id, author.id, question.timeout_secs).await
        else {
            dm.id
                .say(ctx.serenity_context(), "等太久了，申請已取消。想繼續時請重新申請。")
                .await?;
            return Ok(());
        };
        let mut answer: String = message.content.trim().chars().take(1000).collect();
        if answer.is_empty() {
            answer = "（未填寫）".to_string();
        }
        answers.push((question.label.clone(), answer));
    }

    let mut embed = serenity::CreateEmbed::default()
        .title("新的職位申請")
        .description(format!("{}（{}）", author.name, author.id))
        .colour(serenity::Colour::ORANGE)
        .timestamp(serenity::Timestamp::now());
    if let Some(avatar) = author.avatar_url() {
        embed = embed.thumbnail(avatar);
    }
    for (label, answer) in &answers {
        embed = embed.field(label, answer, false);
    }

    serenity::ChannelId::new(channel_id)
        .send_message(
            ctx.serenity_context(),
            serenity::CreateMessage::new().embed(embed),
        )
        .await?;

    if let Some(role_id) = settings.applicant_role {
        if let Some(member) = ctx.author_member().await {
            let _ = member
                .add_role(ctx.serenity_context(), serenity::RoleId::new(role_id))
                .await;
        }
    }

    mark_applied(guild_id, author_id);
    dm.id
        .say(ctx.serenity_context(), "申請已送出，審核結果會再私訊通知你。")
        .await?;
    Ok(())
}

// ---- /setapply 設定群組 ----

/// 申請系統設定指令
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands("setup", "addquestion", "resetquestions")
)]
pub async fn setapply(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// 設定收件頻道與相關身分組，並開放申請
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn setup(
    ctx: Context<'_>,
    #[description = "申請表單送往的頻道"] channel: serenity::ChannelId,
    #[description = "可審核申請的身分組"] accepter: serenity::RoleId,
    #[description = "申請送出後授予的身分組"] applicant: Option<serenity::RoleId>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };

    {
        let mut cfg = ctx.data().config.lock().await;
        cfg.update_guild(guild_id, |g| {
            g.application.is_set = true;
            g.application.channel_id = Some(channel.get());
            g.application.accepter_role = Some(accepter.get());
            g.application.applicant_role = applicant.map(|r| r.get());
        })?;
    }

    let applicant_note = match applicant {
        Some(role) => format!("，申請者會獲得 <@&{}>", role.get()),
        None => String::new(),
    };
    ctx.say(format!(
        "申請系統已開放。表單會送到 <#{}>，由 <@&{}> 審核{}。",
        channel.get(),
        accepter.get(),
        applicant_note
    ))
    .await?;
    Ok(())
}

/// 在表單末尾新增一道題目
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn addquestion(
    ctx: Context<'_>,
    #[description = "題目內容"] prompt: String,
    #[description = "表單上顯示的欄位名稱"] label: String,
    #[description = "回答時限（秒）"]
    #[min = 10]
    timeout: Option<u64>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let question = Question::new(prompt, label, timeout.unwrap_or(120));
    let total = {
        let mut cfg = ctx.data().config.lock().await;
        cfg.update_guild(guild_id, |g| {
            g.application.questions.push(question.clone());
            g.application.questions.len()
        })?
    };
    ctx.say(format!("題目已新增，目前共 {} 題", total)).await?;
    Ok(())
}

/// 把題目清單重置回預設
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD")]
pub async fn resetquestions(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    {
        let mut cfg = ctx.data().config.lock().await;
        cfg.update_guild(guild_id, |g| g.application.questions = Question::defaults())?;
    }
    ctx.say("題目清單已重置為預設").await?;
    Ok(())
}

// ---- 審核 ----

async fn can_review(ctx: &Context<'_>, settings: &ApplicationSettings) -> bool {
    let Some(member) = ctx.author_member().await else {
        return false;
    };
    if let Some(role_id) = settings.accepter_role {
        if member.roles.iter().any(|r| r.get() == role_id) {
            return true;
        }
    }
    member
        .permissions(&ctx.serenity_context().cache)
        .map(|p| p.manage_guild())
        .unwrap_or(false)
}

async fn review_settings(ctx: &Context<'_>, guild_id: u64) -> ApplicationSettings {
    let cfg = ctx.data().config.lock().await;
    cfg.guild(guild_id).application
}

/// 接受一份申請並授予身分組
#[poise::command(slash_command, guild_only)]
pub async fn accept(
    ctx: Context<'_>,
    #[description = "申請者"] user: serenity::User,
) -> Result<(), Error> {
    let Some(guild) = ctx.guild_id() else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let guild_id = guild.get();
    let settings = review_settings(&ctx, guild_id).await;
    if !settings.is_set {
        ctx.say("本伺服器尚未開放申請").await?;
        return Ok(());
    }
    if !can_review(&ctx, &settings).await {
        ctx.say("你沒有審核申請的權限").await?;
        return Ok(());
    }

    ctx.say(format!(
        "要授予 {} 什麼身分組？請提及身分組或輸入完整名稱。",
        user.name
    ))
    .await?;
    let Some(message) = wait::next_message(&ctx, ctx.channel_id(), ctx.author().id, 60).await
    else {
        ctx.say("等太久了，操作取消").await?;
        return Ok(());
    };

    // 先看提及，再用名稱在快取裡比對
    let role_id = match message.mention_roles.first() {
        Some(&id) => Some(id),
        None => {
            let wanted = message.content.trim().to_string();
            ctx.guild().and_then(|g| {
                g.roles
                    .iter()
                    .find(|(_, role)| role.name == wanted)
                    .map(|(&id, _)| id)
            })
        }
    };
    let Some(role_id) = role_id else {
        ctx.say("找不到這個身分組，操作取消").await?;
        return Ok(());
    };

    let member = guild.member(ctx.serenity_context(), user.id).await?;
    member.add_role(ctx.serenity_context(), role_id).await?;
    if let Some(applicant_role) = settings.applicant_role {
        let _ = member
            .remove_role(
                ctx.serenity_context(),
                serenity::RoleId::new(applicant_role),
            )
            .await;
    }

    let dm = serenity::CreateMessage::new().content(format!(
        "恭喜！你在「{}」的申請已通過，並獲得了新的身分組。",
        guild
            .name(ctx.serenity_context())
            .unwrap_or_else(|| "該伺服器".to_string())
    ));
    if user.dm(ctx.serenity_context(), dm).await.is_err() {
        ctx.say("（對方關閉了私訊，通知未送達）").await?;
    }
    ctx.say(format!("{} 的申請已接受", user.name)).await?;
    Ok(())
}

/// 拒絕一份申請
#[poise::command(slash_command, guild_only)]
pub async fn deny(
    ctx: Context<'_>,
    #[description = "申請者"] user: serenity::User,
) -> Result<(), Error> {
    let Some(guild) = ctx.guild_id() else {
        ctx.say("此指令只能在伺服器中使用").await?;
        return Ok(());
    };
    let guild_id = guild.get();
    let settings = review_settings(&ctx, guild_id).await;
    if !settings.is_set {
        ctx.say("本伺服器尚未開放申請").await?;
        return Ok(());
    }
    if !can_review(&ctx, &settings).await {
        ctx.say("你沒有審核申請的權限").await?;
        return Ok(());
    }

    ctx.say("要附上拒絕原因嗎？請輸入原因，或輸入 no 略過。")
        .await?;
    let reason = match wait::next_message(&ctx, ctx.channel_id(), ctx.author().id, 60).await {
        Some(message) => {
            let content = message.content.trim().to_string();
            if content.eq_ignore_ascii_case("no") {
                None
            } else {
                Some(content)
            }
        }
        None => None,
    };

    let guild_name = guild
        .name(ctx.serenity_context())
        .unwrap_or_else(|| "該伺服器".to_string());
    let body = match reason {
        Some(reason) => format!(
            "很遺憾，你在「{}」的申請未通過。原因：{}",
            guild_name, reason
        ),
        None => format!("很遺憾，你在「{}」的申請未通過。", guild_name),
    };
    if user
        .dm(
            ctx.serenity_context(),
            serenity::CreateMessage::new().content(body),
        )
        .await
        .is_err()
    {
        ctx.say("（對方關閉了私訊，通知未送達）").await?;
    }

    if let Some(applicant_role) = settings.applicant_role {
        if let Ok(member) = guild.member(ctx.serenity_context(), user.id).await {
            let _ = member
                .remove_role(
                    ctx.serenity_context(),
                    serenity::RoleId::new(applicant_role),
                )
                .await;
        }
    }
    ctx.say(format!("{} 的申請已拒絕", user.name)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_blocks_within_window() {
        mark_applied(900, 1);
        assert!(apply_cooldown_remaining(900, 1).is_some());
        // 沒申請過的成員不受影響
        assert!(apply_cooldown_remaining(900, 2).is_none());
    }

    #[test]
    fn test_expired_cooldown_clears() {
        RECENT_APPLICATIONS
            .lock()
            .unwrap()
            .insert((901, 1), Utc::now() - chrono::Duration::seconds(49 * 3600));
        assert!(apply_cooldown_remaining(901, 1).is_none());
    }
}
