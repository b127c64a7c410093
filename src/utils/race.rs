use crate::models::types::RaceMode;
use crate::utils::sessions::Bet;
use rand::Rng;
use std::collections::HashMap;

/// 跑道總長（前進點數）
pub const TRACK_LENGTH: u32 = 40;
/// 顯示用的格子數；進度會等比縮放到這個寬度
const TRACK_CELLS: u32 = 20;

/// 步伐模式：每個 tick 前進多少點
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gait {
    /// 固定步伐
    Steady(u32),
    /// 均勻隨機步伐
    Ranged { min: u32, max: u32 },
    /// 一半機率全速衝刺，一半機率原地發呆
    Burst { step: u32 },
}

impl Gait {
    fn step(&self, rng: &mut impl Rng) -> u32 {
        match *self {
            Gait::Steady(n) => n,
            Gait::Ranged { min, max } => rng.random_range(min..=max),
            Gait::Burst { step } => {
                if rng.random_bool(0.5) {
                    step
                } else {
                    0
                }
            }
        }
    }
}

/// 動物園模式的動物名單
pub const ZOO_SPECIES: &[(&str, Gait)] = &[
    ("🐢", Gait::Steady(3)),
    ("🐇", Gait::Burst { step: 8 }),
    ("🐎", Gait::Ranged { min: 4, max: 7 }),
    ("🐕", Gait::Ranged { min: 2, max: 8 }),
    ("🐈", Gait::Ranged { min: 1, max: 9 }),
    ("🦊", Gait::Ranged { min: 3, max: 7 }),
    ("🐖", Gait::Ranged { min: 1, max: 7 }),
    ("🐓", Gait::Ranged { min: 2, max: 6 }),
    ("🦔", Gait::Steady(4)),
    ("🐍", Gait::Burst { step: 7 }),
];

/// 一般模式：大家都是等速烏龜，名次由加入順序決定平手
pub const NORMAL_SPECIES: (&str, Gait) = ("🐢", Gait::Steady(3));

#[derive(Debug, Clone)]
pub struct Entrant {
    pub user_id: u64,
    /// 人數不足時補位的機器人；不領獎也不計統計
    pub is_bot: bool,
    pub emoji: &'static str,
    gait: Gait,
    pub progress: u32,
}

impl Entrant {
    fn new(user_id: u64, is_bot: bool, emoji: &'static str, gait: Gait) -> Self {
        Self {
            user_id,
            is_bot,
            emoji,
            gait,
            progress: 0,
        }
    }

    pub fn finished(&self) -> bool {
        self.progress >= TRACK_LENGTH
    }

    fn advance(&mut self, rng: &mut impl Rng) {
        self.progress = (self.progress + self.gait.step(rng)).min(TRACK_LENGTH);
    }

    /// 渲染單一跑道行，終點在左
    pub fn track_line(&self) -> String {
        let cell = (self.progress * TRACK_CELLS / TRACK_LENGTH).min(TRACK_CELLS);
        let ahead = "·".repeat((TRACK_CELLS - cell) as usize);
        let behind = "·".repeat(cell as usize);
        format!("🏁{}{}{}", ahead, self.emoji, behind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PodiumEntry {
    pub user_id: u64,
    pub is_bot: bool,
    pub emoji: &'static str,
}

/// 依模式為每位玩家抽一隻動物；單人參賽時補一名機器人對手
pub fn build_field(
    rng: &mut impl Rng,
    mode: RaceMode,
    players: &[u64],
    bot_id: u64,
) -> Vec<Entrant> {
    let mut pick = |user_id: u64, is_bot: bool| match mode {
        RaceMode::Normal => Entrant::new(user_id, is_bot, NORMAL_SPECIES.0, NORMAL_SPECIES.1),
        RaceMode::Zoo => {
            let (emoji, gait) = ZOO_SPECIES[rng.random_range(0..ZOO_SPECIES.len())];
            Entrant::new(user_id, is_bot, emoji, gait)
        }
    };

    let mut field: Vec<Entrant> = players.iter().map(|&id| pick(id, false)).collect();
    if field.len() == 1 {
        field.push(pick(bot_id, true));
    }
    field
}

/// 推進一個 tick：未完賽者依名單順序各走一步，
/// 抵達終點者依序記入前三名（平手以名單順序為準）。
pub fn run_tick(rng: &mut impl Rng, field: &mut [Entrant], podium: &mut Vec<PodiumEntry>) {
    for entrant in field.iter_mut() {
        if entrant.finished() {
            continue;
        }
        entrant.advance(rng);
        if entrant.finished() && podium.len() < 3 {
            podium.push(PodiumEntry {
                user_id: entrant.user_id,
                is_bot: entrant.is_bot,
                emoji: entrant.emoji,
            });
        }
    }
}

pub fn race_over(field: &[Entrant]) -> bool {
    field.iter().all(Entrant::finished)
}

/// 決定獎金去向。
///
/// 關閉獎金池或參賽者不足四名時冠軍全拿；開啟且人數足夠時
/// 以整數運算分 60/30/10。機器人佔據的名次直接跳過。
pub fn prize_shares(
    prize: u64,
    pooling: bool,
    entrant_count: usize,
    podium: &[PodiumEntry],
) -> Vec<(u64, u64)> {
    if prize == 0 || podium.is_empty() {
        return Vec::new();
    }

    if pooling && entrant_count >= 4 {
        podium
            .iter()
            .zip([6u64, 3, 1])
            .filter(|(entry, _)| !entry.is_bot)
            .map(|(entry, tenths)| {
                let share = (prize as u128 * tenths as u128 / 10) as u64;
                (entry.user_id, share)
            })
            .collect()
    } else {
        let first = &podium[0];
        if first.is_bot {
            Vec::new()
        } else {
            vec![(first.user_id, prize)]
        }
    }
}

/// 賽後統計用的名次表：真人參賽者 -> 名次索引 (0..=2)。
///
/// 機器人不入帳；不在表上的參賽者算一場敗績。
pub fn placement_table(podium: &[PodiumEntry]) -> HashMap<u64, usize> {
    podium
        .iter()
        .enumerate()
        .filter(|(_, entry)| !entry.is_bot)
        .map(|(place, entry)| (entry.user_id, place))
        .collect()
}

/// 注單結算：只有押中冠軍的注單領 `stake * multiplier`，
/// 其餘注金在下注時就已扣走，不退還。
pub fn settle_bets(
    bets: &HashMap<u64, Bet>,
    winner: Option<&PodiumEntry>,
    multiplier: u64,
) -> Vec<(u64, u64)> {
    let Some(winner) = winner else {
        return Vec::new();
    };
    let mut payouts: Vec<(u64, u64)> = bets
        .iter()
        .filter(|(_, bet)| bet.target == winner.user_id)
        .map(|(&bettor, bet)| (bettor, bet.stake.saturating_mul(multiplier)))
        .collect();
    payouts.sort_unstable();
    payouts
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn podium(specs: &[(u64, bool)]) -> Vec<PodiumEntry> {
        specs
            .iter()
            .map(|&(user_id, is_bot)| PodiumEntry {
                user_id,
                is_bot,
                emoji: "🐢",
            })
            .collect()
    }

    #[test]
    fn test_normal_mode_podium_follows_entry_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let players = [10, 11, 12, 13, 14];
        let mut field = build_field(&mut rng, RaceMode::Normal, &players, 1);
        let mut result = Vec::new();

        while !race_over(&field) {
            run_tick(&mut rng, &mut field, &mut result);
        }

        // 等速烏龜同 tick 抵達，平手以名單順序決勝
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].user_id, 10);
        assert_eq!(result[1].user_id, 11);
        assert_eq!(result[2].user_id, 12);
    }

    #[test]
    fn test_zoo_race_terminates_with_full_podium() {
        let mut rng = StdRng::seed_from_u64(99);
        let players: Vec<u64> = (1..=14).collect();
        let mut field = build_field(&mut rng, RaceMode::Zoo, &players, 777);
        let mut result = Vec::new();

        for _ in 0..10_000 {
            if race_over(&field) {
                break;
            }
            run_tick(&mut rng, &mut field, &mut result);
        }

        assert!(race_over(&field));
        assert_eq!(result.len(), 3);
        let ids: Vec<u64> = result.iter().map(|e| e.user_id).collect();
        assert!(ids.iter().all(|id| players.contains(id)));
    }

    #[test]
    fn test_single_player_gets_bot_opponent() {
        let mut rng = StdRng::seed_from_u64(5);
        let field = build_field(&mut rng, RaceMode::Normal, &[10], 777);
        assert_eq!(field.len(), 2);
        assert!(field[1].is_bot);
        assert_eq!(field[1].user_id, 777);
    }

    #[test]
    fn test_winner_take_all_has_single_recipient() {
        let result = prize_shares(100, false, 8, &podium(&[(10, false), (11, false), (12, false)]));
        assert_eq!(result, vec![(10, 100)]);
    }

    #[test]
    fn test_pooling_splits_sixty_thirty_ten() {
        let result = prize_shares(100, true, 4, &podium(&[(10, false), (11, false), (12, false)]));
        assert_eq!(result, vec![(10, 60), (11, 30), (12, 10)]);

        // floor 分配的總和不超過獎金
        let result = prize_shares(137, true, 5, &podium(&[(10, false), (11, false), (12, false)]));
        let total: u64 = result.iter().map(|&(_, amount)| amount).sum();
        assert!(total <= 137);
        assert_eq!(result[0].1, 137 * 6 / 10);
    }

    #[test]
    fn test_pooling_needs_four_entrants() {
        let result = prize_shares(100, true, 3, &podium(&[(10, false), (11, false), (12, false)]));
        assert_eq!(result, vec![(10, 100)]);
    }

    #[test]
    fn test_bot_placements_are_skipped() {
        // 機器人拿第一：冠軍全拿模式下無人領獎
        let result = prize_shares(100, false, 2, &podium(&[(777, true), (10, false)]));
        assert!(result.is_empty());

        // 獎金池模式下跳過機器人佔的名次
        let result = prize_shares(100, true, 4, &podium(&[(10, false), (777, true), (12, false)]));
        assert_eq!(result, vec![(10, 60), (12, 10)]);
    }

    #[test]
    fn test_placement_table_fourth_place_counts_as_loss() {
        let entrants = podium(&[(10, false), (11, false), (12, false)]);
        let table = placement_table(&entrants);
        assert_eq!(table.get(&10), Some(&0));
        assert_eq!(table.get(&11), Some(&1));
        assert_eq!(table.get(&12), Some(&2));

        // 第四名不在表上，結算時記一場敗績
        let players = [10u64, 11, 12, 13];
        let mut wins = [0u64; 3];
        let mut losses = 0u64;
        for player in players {
            match table.get(&player) {
                Some(&place) => wins[place] += 1,
                None => losses += 1,
            }
        }
        assert_eq!(wins, [1, 1, 1]);
        assert_eq!(losses, 1);
    }

    #[test]
    fn test_placement_table_skips_bot() {
        let table = placement_table(&podium(&[(10, false), (777, true), (12, false)]));
        assert_eq!(table.get(&10), Some(&0));
        assert!(!table.contains_key(&777));
        assert_eq!(table.get(&12), Some(&2));
    }

    #[test]
    fn test_bet_settlement_only_pays_winner_backers() {
        let mut bets = HashMap::new();
        bets.insert(50, Bet { target: 10, stake: 10 });
        bets.insert(51, Bet { target: 11, stake: 40 });
        bets.insert(52, Bet { target: 10, stake: 25 });

        let winner = PodiumEntry {
            user_id: 10,
            is_bot: false,
            emoji: "🐢",
        };
        let payouts = settle_bets(&bets, Some(&winner), 2);
        assert_eq!(payouts, vec![(50, 20), (52, 50)]);

        assert!(settle_bets(&bets, None, 2).is_empty());
    }

    #[test]
    fn test_spec_end_to_end_payout_example() {
        // 獎金 100、開池、四名真人、倍率 2、對冠軍押 10
        let entrants = podium(&[(10, false), (11, false), (12, false)]);
        let shares = prize_shares(100, true, 4, &entrants);
        assert_eq!(shares, vec![(10, 60), (11, 30), (12, 10)]);

        let mut bets = HashMap::new();
        bets.insert(50, Bet { target: 10, stake: 10 });
        let payouts = settle_bets(&bets, Some(&entrants[0]), 2);
        assert_eq!(payouts, vec![(50, 20)]);
        // 第四名不在名次內，不領獎（敗場統計在指令層累加）
        assert!(shares.iter().all(|&(user, _)| user != 13));
    }

    #[test]
    fn test_track_line_endpoints() {
        let mut entrant = Entrant::new(1, false, "🐢", Gait::Steady(1));
        let start = entrant.track_line();
        entrant.progress = TRACK_LENGTH;
        let end = entrant.track_line();
        assert_ne!(start, end);
        assert!(end.starts_with("🏁🐢"));
    }
}
