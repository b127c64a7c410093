use crate::models::types::Target;
use rand::Rng;
use std::collections::HashMap;

/// 搶劫中單一玩家的判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerOutcome {
    /// 全身而退，參與分贓
    Success,
    /// 被捕入獄；sentence_secs 已含緩刑三倍
    Apprehended { sentence_secs: u64 },
    Died,
}

/// 待判定的隊員：id 與是否背著緩刑標記
#[derive(Debug, Clone, Copy)]
pub struct CrewMember {
    pub user_id: u64,
    pub oob: bool,
}

/// 依隊伍人數挑目標：取 `crew <= crew_size` 中門檻最大者。
///
/// crew 門檻在設定時已保證互不重複，同門檻不會出現；
/// 完全沒有符合的門檻時回傳 None（「無可行目標」）。
pub fn select_target<'a>(
    targets: &'a HashMap<String, Target>,
    crew_size: u32,
) -> Option<(&'a str, &'a Target)> {
    targets
        .iter()
        .filter(|(_, t)| t.crew <= crew_size)
        .max_by_key(|(name, t)| (t.crew, std::cmp::Reverse(name.as_str())))
        .map(|(name, t)| (name.as_str(), t))
}

/// 逐一擲骰判定每名隊員，輸出順序與隊伍順序一致。
///
/// 1..=100 落在成功率內即成功；失敗時再以 50/50 決定被捕或死亡，
/// 被捕者若背著緩刑標記，刑期為基準的三倍。
pub fn run_heist(
    rng: &mut impl Rng,
    crew: &[CrewMember],
    target: &Target,
    base_sentence_secs: u64,
) -> Vec<(u64, PlayerOutcome)> {
    crew.iter()
        .map(|member| {
            let roll: u8 = rng.random_range(1..=100);
            let outcome = if roll <= target.success {
                PlayerOutcome::Success
            } else if rng.random_bool(0.5) {
                let multiplier = if member.oob { 3 } else { 1 };
                PlayerOutcome::Apprehended {
                    sentence_secs: base_sentence_secs * multiplier,
                }
            } else {
                PlayerOutcome::Died
            };
            (member.user_id, outcome)
        })
        .collect()
}

/// 金庫實際掏出的金額，均勻落在 [vault_min, vault_max]
pub fn roll_vault(rng: &mut impl Rng, target: &Target) -> u64 {
    let lo = target.vault_min.min(target.vault_max);
    let hi = target.vault_min.max(target.vault_max);
    rng.random_range(lo..=hi)
}

/// 生還者均分；無人生還時不分贓也不除以零
pub fn split_payout(vault: u64, survivors: usize) -> u64 {
    if survivors == 0 {
        0
    } else {
        vault / survivors as u64
    }
}

/// 依前科總數給個頭銜，純粹是統計頁面的裝飾
pub fn criminal_level(offences: u64) -> &'static str {
    match offences {
        0 => "良民",
        1..=4 => "小混混",
        5..=9 => "慣犯",
        10..=24 => "職業罪犯",
        25..=49 => "黑道大哥",
        _ => "傳奇怪盜",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn target(crew: u32, success: u8) -> Target {
        Target {
            crew,
            vault_min: 1000,
            vault_max: 2000,
            success,
        }
    }

    fn tiers(specs: &[(&str, u32)]) -> HashMap<String, Target> {
        specs
            .iter()
            .map(|&(name, crew)| (name.to_string(), target(crew, 50)))
            .collect()
    }

    #[test]
    fn test_select_target_best_fit_at_or_below() {
        let targets = tiers(&[("小銀行", 2), ("郡立銀行", 5), ("中央銀行", 10)]);

        let (name, t) = select_target(&targets, 7).unwrap();
        assert_eq!(name, "郡立銀行");
        assert_eq!(t.crew, 5);

        let (name, _) = select_target(&targets, 10).unwrap();
        assert_eq!(name, "中央銀行");
    }

    #[test]
    fn test_select_target_none_qualifies() {
        let targets = tiers(&[("郡立銀行", 5), ("中央銀行", 10)]);
        assert!(select_target(&targets, 3).is_none());
        assert!(select_target(&HashMap::new(), 100).is_none());
    }

    #[test]
    fn test_run_heist_guaranteed_success() {
        let mut rng = StdRng::seed_from_u64(7);
        let crew = vec![
            CrewMember {
                user_id: 1,
                oob: false,
            },
            CrewMember {
                user_id: 2,
                oob: true,
            },
        ];
        let outcomes = run_heist(&mut rng, &crew, &target(2, 100), 600);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0], (1, PlayerOutcome::Success));
        assert_eq!(outcomes[1], (2, PlayerOutcome::Success));
    }

    #[test]
    fn test_run_heist_oob_triples_sentence() {
        let mut rng = StdRng::seed_from_u64(42);
        // 成功率 0，全員失敗；抽樣夠多次保證兩種身分都出現被捕案例
        let crew: Vec<CrewMember> = (0..200)
            .map(|i| CrewMember {
                user_id: i,
                oob: i % 2 == 1,
            })
            .collect();
        let outcomes = run_heist(&mut rng, &crew, &target(1, 0), 600);

        let mut saw_plain = false;
        let mut saw_tripled = false;
        for (user_id, outcome) in outcomes {
            if let PlayerOutcome::Apprehended { sentence_secs } = outcome {
                if user_id % 2 == 1 {
                    assert_eq!(sentence_secs, 1800);
                    saw_tripled = true;
                } else {
                    assert_eq!(sentence_secs, 600);
                    saw_plain = true;
                }
            }
        }
        assert!(saw_plain && saw_tripled);
    }

    #[test]
    fn test_payout_never_exceeds_vault() {
        for survivors in 1..=10usize {
            let share = split_payout(1000, survivors);
            assert!(share * survivors as u64 <= 1000);
        }
    }

    #[test]
    fn test_payout_zero_survivors() {
        assert_eq!(split_payout(1000, 0), 0);
    }

    #[test]
    fn test_roll_vault_within_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let t = target(2, 50);
        for _ in 0..100 {
            let vault = roll_vault(&mut rng, &t);
            assert!((t.vault_min..=t.vault_max).contains(&vault));
        }
    }

    #[test]
    fn test_criminal_level_ladder() {
        assert_eq!(criminal_level(0), "良民");
        assert_eq!(criminal_level(5), "慣犯");
        assert_eq!(criminal_level(100), "傳奇怪盜");
    }
}
