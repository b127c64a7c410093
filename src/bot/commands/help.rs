use crate::bot::{Context, Error};
use poise::ChoiceParameter;

#[derive(Clone, Copy, Debug, ChoiceParameter)]
pub enum HelpMode {
    #[name = "summary"]
    Summary,
    #[name = "detailed"]
    Detailed,
}

/// 顯示指令快速說明
#[poise::command(slash_command)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "顯示模式"] mode: Option<HelpMode>,
) -> Result<(), Error> {
    match mode.unwrap_or(HelpMode::Summary) {
        HelpMode::Summary => {
            ctx.say(
                "Arcade Discord Bot 指令速覽:\n\
\n\
/heist play — 發起或加入一場搶劫。\n\
/heist stats|targets|info — 查看個人戰績、目標清單與設定。\n\
/heist bailout|release|revive — 保釋、出獄、復活。\n\
/race start|enter — 發起或加入動物賽跑。\n\
/race bet <金額> <參賽者> — 開跑前下注。\n\
/coupon create|redeem — 建立與兌換優惠券。\n\
/apply — 申請加入管理團隊（私訊問答）。\n\
/balance [成員] — 查詢餘額。\n\
/help [summary|detailed] — 顯示這份簡表或詳細版。",
            )
            .await?;
        }
        HelpMode::Detailed => {
            ctx.say(
                r#"
# Arcade Discord Bot 說明

## 搶劫
- `/heist play`：沒有場次時發起招募，已有場次時加入；入場費在加入當下扣除且不退還。
- `/heist stats`：個人狀態、連勝、保釋金與前科統計。
- `/heist targets` / `/heist info`：目標清單與本伺服器設定。
- `/heist bailout [成員]`：付保釋金提早出獄；自保會留下緩刑標記，下次被捕刑期三倍。
- `/heist release` / `/heist revive`：刑期或死亡冷卻結束後恢復自由身。
- `/heist theme|themes`：切換與列出主題（管理員）。
- `/heist createtarget|edittarget|removetarget`：維護目標（管理員）。
- `/setheist ...`：入場費、刑期、等待與警戒時間等參數（管理員）。

## 賽跑
- `/race start`：發起一場比賽並開啟報名窗口，最多 14 人。
- `/race enter`：報名參賽；單人開跑時會補一名機器人對手。
- `/race bet <金額> <參賽者>`：開跑前下注，注金當下扣除不退還，押中冠軍領倍率獎金。
- `/race stats [成員]`：前三名次數、敗場與出賽統計。
- `/race clear` / `/race wipe`：重置場次、清空統計（管理員）。
- `/setrace ...`：模式、獎金、獎金池與下注限額（管理員）。

## 優惠券
- `/coupon create <金額>`：建立一張券，代碼私訊給你（管理員）。
- `/coupon redeem <代碼>`：兌換入帳；同一張券只能兌換一次。
- `/coupon list` / `/coupon clearall`：查看與作廢（管理員）。

## 申請
- `/apply`：私訊逐題作答，完成後送到審核頻道；48 小時內不能重複申請。
- `/setapply setup|addquestion|resetquestions`：設定收件頻道、身分組與題目（管理員）。
- `/accept <成員>` / `/deny <成員>`：審核申請並私訊通知結果。

## 經濟
- `/balance [成員]`：查詢餘額。
- `/setbal <成員> <金額>`：直接設定餘額（管理員）。

## 其他
- `/help [summary|detailed]`：切換本說明的摘要或完整內容。
                "#,
            )
            .await?;
        }
    }

    Ok(())
}
