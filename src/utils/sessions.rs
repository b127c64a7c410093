use std::collections::HashMap;
use tokio::sync::Mutex;

/// 一場賽跑最多的參賽人數
pub const RACE_MAX_ENTRANTS: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// 等待玩家加入的招募窗口
    Gathering,
    InProgress,
}

#[derive(Debug)]
pub struct HeistSession {
    pub phase: Phase,
    /// 加入順序即列表順序
    pub crew: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bet {
    pub target: u64,
    pub stake: u64,
}

#[derive(Debug)]
pub struct RaceSession {
    pub phase: Phase,
    pub players: Vec<u64>,
    /// 每位下注者只能有一筆注單
    pub bets: HashMap<u64, Bet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined { crew_size: usize },
    NotActive,
    AlreadyJoined,
    /// 招募已截止
    TooLate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    Entered,
    NotActive,
    AlreadyStarted,
    AlreadyEntered,
    RosterFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetOutcome {
    Placed,
    NotActive,
    AlreadyStarted,
    TargetNotRacing,
    AlreadyBet,
}

/// 每個伺服器至多一場搶劫、一場賽跑的暫態登錄表。
///
/// 只存在於記憶體中；程序重啟後一切回到空白，持久資料都在
/// `ConfigManager` 與 `Bank`。
#[derive(Debug, Default)]
pub struct SessionManager {
    heists: Mutex<HashMap<u64, HeistSession>>,
    races: Mutex<HashMap<u64, RaceSession>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- 搶劫 ----

    /// 發起新搶劫；已有進行中的場次時回傳 false
    pub async fn start_heist(&self, guild_id: u64, starter: u64) -> bool {
        let mut heists = self.heists.lock().await;
        if heists.contains_key(&guild_id) {
            return false;
        }
        heists.insert(
            guild_id,
            HeistSession {
                phase: Phase::Gathering,
                crew: vec![starter],
            },
        );
        true
    }

    pub async fn heist_active(&self, guild_id: u64) -> bool {
        self.heists.lock().await.contains_key(&guild_id)
    }

    pub async fn join_heist(&self, guild_id: u64, user_id: u64) -> JoinOutcome {
        let mut heists = self.heists.lock().await;
        let Some(session) = heists.get_mut(&guild_id) else {
            return JoinOutcome::NotActive;
        };
        if session.phase != Phase::Gathering {
            return JoinOutcome::TooLate;
        }
        if session.crew.contains(&user_id) {
            return JoinOutcome::AlreadyJoined;
        }
        session.crew.push(user_id);
        JoinOutcome::Joined {
            crew_size: session.crew.len(),
        }
    }

    /// 把剛加入的成員移出隊伍（入場費扣款失敗時回滾用）
    pub async fn leave_heist(&self, guild_id: u64, user_id: u64) {
        if let Some(session) = self.heists.lock().await.get_mut(&guild_id) {
            session.crew.retain(|&id| id != user_id);
        }
    }

    /// 招募截止，回傳目前隊伍快照（保持加入順序）
    pub async fn close_heist_gathering(&self, guild_id: u64) -> Vec<u64> {
        let mut heists = self.heists.lock().await;
        match heists.get_mut(&guild_id) {
            Some(session) => {
                session.phase = Phase::InProgress;
                session.crew.clone()
            }
            None => Vec::new(),
        }
    }

    pub async fn end_heist(&self, guild_id: u64) {
        self.heists.lock().await.remove(&guild_id);
    }

    // ---- 賽跑 ----

    pub async fn start_race(&self, guild_id: u64, starter: u64) -> bool {
        let mut races = self.races.lock().await;
        if races.contains_key(&guild_id) {
            return false;
        }
        races.insert(
            guild_id,
            RaceSession {
                phase: Phase::Gathering,
                players: vec![starter],
                bets: HashMap::new(),
            },
        );
        true
    }

    pub async fn enter_race(&self, guild_id: u64, user_id: u64) -> EnterOutcome {
        let mut races = self.races.lock().await;
        let Some(session) = races.get_mut(&guild_id) else {
            return EnterOutcome::NotActive;
        };
        if session.phase != Phase::Gathering {
            return EnterOutcome::AlreadyStarted;
        }
        if session.players.contains(&user_id) {
            return EnterOutcome::AlreadyEntered;
        }
        if session.players.len() >= RACE_MAX_ENTRANTS {
            return EnterOutcome::RosterFull;
        }
        session.players.push(user_id);
        EnterOutcome::Entered
    }

    /// 只檢查注單是否會被接受，不落注；扣款成功後才真正記帳
    pub async fn check_bet(&self, guild_id: u64, bettor: u64, target: u64) -> BetOutcome {
        let races = self.races.lock().await;
        let Some(session) = races.get(&guild_id) else {
            return BetOutcome::NotActive;
        };
        Self::bet_conditions(session, bettor, target)
    }

    pub async fn place_bet(
        &self,
        guild_id: u64,
        bettor: u64,
        target: u64,
        stake: u64,
    ) -> BetOutcome {
        let mut races = self.races.lock().await;
        let Some(session) = races.get_mut(&guild_id) else {
            return BetOutcome::NotActive;
        };
        let outcome = Self::bet_conditions(session, bettor, target);
        if outcome == BetOutcome::Placed {
            session.bets.insert(bettor, Bet { target, stake });
        }
        outcome
    }

    fn bet_conditions(session: &RaceSession, bettor: u64, target: u64) -> BetOutcome {
        if session.phase != Phase::Gathering {
            return BetOutcome::AlreadyStarted;
        }
        if !session.players.contains(&target) {
            return BetOutcome::TargetNotRacing;
        }
        if session.bets.contains_key(&bettor) {
            return BetOutcome::AlreadyBet;
        }
        BetOutcome::Placed
    }

    /// 起跑：結束招募並回傳名單快照
    pub async fn close_race_gathering(&self, guild_id: u64) -> Vec<u64> {
        let mut races = self.races.lock().await;
        match races.get_mut(&guild_id) {
            Some(session) => {
                session.phase = Phase::InProgress;
                session.players.clone()
            }
            None => Vec::new(),
        }
    }

    /// 取走整個場次做結算；之後該伺服器回到 Idle
    pub async fn take_race(&self, guild_id: u64) -> Option<RaceSession> {
        self.races.lock().await.remove(&guild_id)
    }

    pub async fn end_race(&self, guild_id: u64) {
        self.races.lock().await.remove(&guild_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_one_heist_per_guild() {
        let sessions = SessionManager::new();
        assert!(sessions.start_heist(1, 10).await);
        assert!(!sessions.start_heist(1, 11).await);
        // 另一個伺服器互不影響
        assert!(sessions.start_heist(2, 10).await);
    }

    #[tokio::test]
    async fn test_heist_join_order_and_duplicates() {
        let sessions = SessionManager::new();
        sessions.start_heist(1, 10).await;
        assert_eq!(
            sessions.join_heist(1, 11).await,
            JoinOutcome::Joined { crew_size: 2 }
        );
        assert_eq!(sessions.join_heist(1, 11).await, JoinOutcome::AlreadyJoined);

        let crew = sessions.close_heist_gathering(1).await;
        assert_eq!(crew, vec![10, 11]);
        // 截止後不能再加入
        assert_eq!(sessions.join_heist(1, 12).await, JoinOutcome::TooLate);

        sessions.end_heist(1).await;
        assert!(!sessions.heist_active(1).await);
    }

    #[tokio::test]
    async fn test_leave_heist_removes_member() {
        let sessions = SessionManager::new();
        sessions.start_heist(1, 10).await;
        sessions.join_heist(1, 11).await;

        // 扣款失敗的回滾路徑：人出隊，已扣的其他人不受影響
        sessions.leave_heist(1, 11).await;
        let crew = sessions.close_heist_gathering(1).await;
        assert_eq!(crew, vec![10]);
    }

    #[tokio::test]
    async fn test_solo_heist_teardown_clears_guild() {
        let sessions = SessionManager::new();
        sessions.start_heist(1, 10).await;

        // 招募結束只剩發起人：場次解散，入場費由帳本層保持已扣狀態
        let crew = sessions.close_heist_gathering(1).await;
        assert_eq!(crew, vec![10]);
        sessions.end_heist(1).await;
        assert!(!sessions.heist_active(1).await);

        // 解散後可以立刻發起下一場
        assert!(sessions.start_heist(1, 11).await);
    }

    #[tokio::test]
    async fn test_enter_rejections() {
        let sessions = SessionManager::new();
        assert_eq!(sessions.enter_race(1, 10).await, EnterOutcome::NotActive);

        sessions.start_race(1, 10).await;
        assert_eq!(sessions.enter_race(1, 10).await, EnterOutcome::AlreadyEntered);
        for i in 11..24 {
            assert_eq!(sessions.enter_race(1, i).await, EnterOutcome::Entered);
        }
        // 名單已滿 14 人
        assert_eq!(sessions.enter_race(1, 99).await, EnterOutcome::RosterFull);

        let players = sessions.close_race_gathering(1).await;
        assert_eq!(players.len(), RACE_MAX_ENTRANTS);
        assert_eq!(sessions.enter_race(1, 99).await, EnterOutcome::AlreadyStarted);
    }

    #[tokio::test]
    async fn test_bet_rules() {
        let sessions = SessionManager::new();
        sessions.start_race(1, 10).await;
        sessions.enter_race(1, 11).await;

        assert_eq!(
            sessions.place_bet(1, 50, 99, 10).await,
            BetOutcome::TargetNotRacing
        );
        assert_eq!(sessions.place_bet(1, 50, 11, 10).await, BetOutcome::Placed);
        assert_eq!(
            sessions.place_bet(1, 50, 10, 10).await,
            BetOutcome::AlreadyBet
        );

        sessions.close_race_gathering(1).await;
        assert_eq!(
            sessions.place_bet(1, 51, 11, 10).await,
            BetOutcome::AlreadyStarted
        );

        let session = sessions.take_race(1).await.unwrap();
        assert_eq!(
            session.bets.get(&50),
            Some(&Bet {
                target: 11,
                stake: 10
            })
        );
        assert!(sessions.take_race(1).await.is_none());
    }
}
