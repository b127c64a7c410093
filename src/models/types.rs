use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 經濟帳本的餘額上限（SQLite INTEGER 為 i64）
pub const MAX_BALANCE: u64 = i64::MAX as u64;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuildConfig {
    #[serde(default)]
    pub currency: CurrencyName,
    #[serde(default)]
    pub heist: HeistSettings,
    #[serde(default)]
    pub race: RaceSettings,
    /// 搶劫目標，鍵為目標名稱；crew 人數在同一伺服器內不得重複
    #[serde(default)]
    pub targets: HashMap<String, Target>,
    /// 尚未兌換的優惠券：代碼 -> 金額
    #[serde(default)]
    pub coupons: HashMap<String, u64>,
    #[serde(default)]
    pub application: ApplicationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyName(pub String);

impl Default for CurrencyName {
    fn default() -> Self {
        Self("金幣".to_string())
    }
}

impl fmt::Display for CurrencyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeistSettings {
    /// 參加一次搶劫的入場費
    pub cost: u64,
    /// 保釋金基準（被捕時乘上刑期倍率後記錄在個人檔案）
    pub bail_base: u64,
    /// 招募隊員的等待秒數
    pub wait_secs: u64,
    /// 搶劫結束後警戒的秒數，期間不得再發起搶劫
    pub police_secs: u64,
    /// 被捕的基準刑期秒數
    pub sentence_secs: u64,
    /// 死亡後的復活冷卻秒數
    pub death_secs: u64,
    /// 硬核模式：死亡時清空餘額
    pub hardcore: bool,
    pub crew_output: CrewOutput,
    /// 目前使用的主題名稱（data/themes/<名稱>.txt）
    pub theme: String,
    /// 警戒解除時刻；None 表示沒有警戒
    #[serde(default)]
    pub alert_until: Option<DateTime<Utc>>,
}

impl Default for HeistSettings {
    fn default() -> Self {
        Self {
            cost: 100,
            bail_base: 250,
            wait_secs: 60,
            police_secs: 300,
            sentence_secs: 600,
            death_secs: 900,
            hardcore: false,
            crew_output: CrewOutput::Short,
            theme: "Heist".to_string(),
            alert_until: None,
        }
    }
}

/// 搶劫開場訊息要列出多少隊員
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrewOutput {
    None,
    Short,
    Long,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// 需要的隊伍人數門檻
    pub crew: u32,
    pub vault_min: u64,
    pub vault_max: u64,
    /// 每名隊員的成功率百分比 (1-100)
    pub success: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSettings {
    pub wait_secs: u64,
    pub mode: RaceMode,
    pub prize: u64,
    /// 開啟時 60/30/10 分配前三名，關閉時冠軍全拿
    pub pooling: bool,
    /// 發獎所需的最少真人參賽者數
    pub payout_min: u32,
    pub bet_multiplier: u64,
    pub bet_min: u64,
    pub bet_max: u64,
    pub bet_allowed: bool,
    pub games_played: u64,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            wait_secs: 60,
            mode: RaceMode::Normal,
            prize: 100,
            pooling: false,
            payout_min: 0,
            bet_multiplier: 2,
            bet_min: 10,
            bet_max: 50,
            bet_allowed: true,
            games_played: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceMode {
    /// 所有參賽者都是烏龜，步伐固定
    Normal,
    /// 從動物名單隨機抽選，各有不同步伐
    Zoo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    pub is_set: bool,
    /// 收件頻道
    pub channel_id: Option<u64>,
    /// 可以接受/拒絕申請的身分組
    pub accepter_role: Option<u64>,
    /// 申請送出後授予的身分組
    pub applicant_role: Option<u64>,
    pub questions: Vec<Question>,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            is_set: false,
            channel_id: None,
            accepter_role: None,
            applicant_role: None,
            questions: Question::defaults(),
        }
    }
}

/// 申請表單的一道題目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    /// 嵌入訊息中顯示的欄位名稱
    pub label: String,
    pub timeout_secs: u64,
}

impl Question {
    pub fn new(prompt: impl Into<String>, label: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            prompt: prompt.into(),
            label: label.into(),
            timeout_secs,
        }
    }

    pub fn defaults() -> Vec<Question> {
        vec![
            Question::new("你想申請什麼職位？", "職位", 120),
            Question::new("你的稱呼是？", "稱呼", 120),
            Question::new("你的年齡是？", "年齡", 120),
            Question::new("你每週有幾天會上 Discord？", "每週活躍天數", 120),
            Question::new("你每天大約活躍幾小時？", "每日活躍時數", 120),
            Question::new("是否有其他伺服器的管理經驗？有的話請簡述。", "過往經驗", 120),
            Question::new("為什麼想加入本伺服器的管理團隊？", "動機", 120),
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberProfile {
    #[serde(default)]
    pub heist: HeistProfile,
    #[serde(default)]
    pub race: RaceProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeistProfile {
    pub status: MemberStatus,
    /// 本次刑期總長；僅在 Apprehended 期間有意義
    pub sentence_secs: u64,
    /// 最近一次狀態改變的時刻，用來推算已服刑/已死亡時間
    pub status_since: Option<DateTime<Utc>>,
    /// 被捕時記錄的保釋金
    pub bail_cost: u64,
    /// 提前保釋的緩刑標記；下次被捕刑期三倍
    pub oob: bool,
    /// 連續成功次數
    pub spree: u64,
    pub jail_total: u64,
    pub death_total: u64,
}

impl Default for HeistProfile {
    fn default() -> Self {
        Self {
            status: MemberStatus::Free,
            sentence_secs: 0,
            status_since: None,
            bail_cost: 0,
            oob: false,
            spree: 0,
            jail_total: 0,
            death_total: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Free,
    Apprehended,
    Dead,
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MemberStatus::Free => "自由",
            MemberStatus::Apprehended => "服刑中",
            MemberStatus::Dead => "死亡",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RaceProfile {
    /// 依名次 (第一/二/三) 的勝場數
    pub wins: [u64; 3],
    pub losses: u64,
}

impl RaceProfile {
    pub fn total_races(&self) -> u64 {
        self.wins.iter().sum::<u64>() + self.losses
    }
}
