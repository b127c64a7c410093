use chrono::{DateTime, Utc};

/// 冷卻歸零時 `cooldown_calculator` 回傳的哨兵字串
pub const NO_COOLDOWN: &str = "No Cooldown";

/// 剩餘冷卻 = max(0, base - served)。
///
/// 出獄、復活、統計、警戒檢查都必須走這一個函式。
pub fn cooldown_calculator(served_secs: u64, base_secs: u64) -> String {
    if served_secs >= base_secs {
        NO_COOLDOWN.to_string()
    } else {
        time_format(base_secs - served_secs)
    }
}

pub fn time_format(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{} 小時", hours));
    }
    if minutes > 0 {
        parts.push(format!("{} 分", minutes));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{} 秒", seconds));
    }
    parts.join(" ")
}

/// 自某時刻起經過的秒數；None 視為經過了無限久（冷卻已過）
pub fn elapsed_secs(since: Option<DateTime<Utc>>) -> u64 {
    match since {
        Some(t) => (Utc::now() - t).num_seconds().max(0) as u64,
        None => u64::MAX,
    }
}

/// 距某時刻還剩幾秒；時刻已過回傳 0
pub fn secs_until(deadline: DateTime<Utc>) -> u64 {
    (deadline - Utc::now()).num_seconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_sentinel_iff_served_at_least_base() {
        assert_eq!(cooldown_calculator(600, 600), NO_COOLDOWN);
        assert_eq!(cooldown_calculator(601, 600), NO_COOLDOWN);
        assert_ne!(cooldown_calculator(599, 600), NO_COOLDOWN);
        assert_eq!(cooldown_calculator(0, 0), NO_COOLDOWN);
    }

    #[test]
    fn test_remaining_is_base_minus_served() {
        assert_eq!(cooldown_calculator(0, 90), "1 分 30 秒");
        assert_eq!(cooldown_calculator(30, 90), "1 分");
        assert_eq!(cooldown_calculator(3600, 7265), "1 小時 1 分 5 秒");
    }

    #[test]
    fn test_time_format_zero() {
        assert_eq!(time_format(0), "0 秒");
    }

    #[test]
    fn test_elapsed_none_means_expired() {
        assert_eq!(elapsed_secs(None), u64::MAX);
        let just_now = Some(Utc::now());
        assert!(elapsed_secs(just_now) < 5);
    }

    #[test]
    fn test_secs_until_past_is_zero() {
        assert_eq!(secs_until(Utc::now() - Duration::seconds(10)), 0);
        let ahead = secs_until(Utc::now() + Duration::seconds(120));
        assert!((118..=120).contains(&ahead));
    }
}
