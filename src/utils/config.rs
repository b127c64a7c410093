use crate::models::types::{GuildConfig, MemberProfile};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// 所有持久化設定的唯一進入點。
///
/// 整個管理器放在一把 `tokio::sync::Mutex` 後面（見 `BotData`），
/// 因此 `update_*` 閉包內的讀改寫不會與其他指令交錯。
#[derive(Debug)]
pub struct ConfigManager {
    guilds: HashMap<u64, GuildConfig>,
    /// 伺服器 -> 成員 -> 個人檔案
    members: HashMap<u64, HashMap<u64, MemberProfile>>,
    config_path: String,
}

impl ConfigManager {
    pub fn new(config_path: &str) -> Result<Self, ConfigError> {
        let mut manager = Self {
            guilds: HashMap::new(),
            members: HashMap::new(),
            config_path: config_path.to_string(),
        };

        manager.load_config()?;
        Ok(manager)
    }

    pub fn load_config(&mut self) -> Result<(), ConfigError> {
        if Path::new(&self.config_path).exists() {
            let content = fs::read_to_string(&self.config_path)?;
            let config_data: ConfigData = serde_json::from_str(&content)?;

            self.guilds = config_data.guilds.unwrap_or_default();
            self.members = config_data.members.unwrap_or_default();
        } else {
            self.save_config()?;
        }

        Ok(())
    }

    pub fn save_config(&self) -> Result<(), ConfigError> {
        let config_data = ConfigData {
            guilds: Some(self.guilds.clone()),
            members: Some(self.members.clone()),
        };

        let content = serde_json::to_string_pretty(&config_data)?;
        fs::write(&self.config_path, content)?;
        Ok(())
    }

    pub fn guild(&self, guild_id: u64) -> GuildConfig {
        self.guilds.get(&guild_id).cloned().unwrap_or_default()
    }

    /// 在一次鎖定內讀改寫伺服器設定並存檔
    pub fn update_guild<T>(
        &mut self,
        guild_id: u64,
        f: impl FnOnce(&mut GuildConfig) -> T,
    ) -> Result<T, ConfigError> {
        let entry = self.guilds.entry(guild_id).or_default();
        let out = f(entry);
        self.save_config()?;
        Ok(out)
    }

    pub fn member(&self, guild_id: u64, user_id: u64) -> MemberProfile {
        self.members
            .get(&guild_id)
            .and_then(|m| m.get(&user_id))
            .cloned()
            .unwrap_or_default()
    }

    pub fn update_member<T>(
        &mut self,
        guild_id: u64,
        user_id: u64,
        f: impl FnOnce(&mut MemberProfile) -> T,
    ) -> Result<T, ConfigError> {
        let entry = self
            .members
            .entry(guild_id)
            .or_default()
            .entry(user_id)
            .or_default();
        let out = f(entry);
        self.save_config()?;
        Ok(out)
    }

    /// 逐一改寫某伺服器的全部成員檔案（賽後統計用）
    pub fn update_guild_members(
        &mut self,
        guild_id: u64,
        user_ids: &[u64],
        mut f: impl FnMut(u64, &mut MemberProfile),
    ) -> Result<(), ConfigError> {
        let guild_members = self.members.entry(guild_id).or_default();
        for &user_id in user_ids {
            let profile = guild_members.entry(user_id).or_default();
            f(user_id, profile);
        }
        self.save_config()
    }

    /// 清掉某伺服器所有成員的賽跑統計
    pub fn wipe_race_data(&mut self, guild_id: u64) -> Result<(), ConfigError> {
        if let Some(guild_members) = self.members.get_mut(&guild_id) {
            for profile in guild_members.values_mut() {
                profile.race = Default::default();
            }
        }
        self.guilds.entry(guild_id).or_default().race = Default::default();
        self.save_config()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigData {
    guilds: Option<HashMap<u64, GuildConfig>>,
    members: Option<HashMap<u64, HashMap<u64, MemberProfile>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::MemberStatus;

    fn temp_config_path() -> String {
        std::env::temp_dir()
            .join(format!("arcade-config-{}.json", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = temp_config_path();
        let manager = ConfigManager::new(&path).expect("Failed to create ConfigManager in test");
        let guild = manager.guild(1);
        assert_eq!(guild.race.prize, 100);
        assert_eq!(guild.heist.theme, "Heist");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_member_update_roundtrip() {
        let path = temp_config_path();
        let mut manager =
            ConfigManager::new(&path).expect("Failed to create ConfigManager in test");
        manager
            .update_member(1, 42, |profile| {
                profile.heist.status = MemberStatus::Dead;
                profile.heist.death_total += 1;
            })
            .unwrap();

        let reloaded = ConfigManager::new(&path).unwrap();
        let profile = reloaded.member(1, 42);
        assert_eq!(profile.heist.status, MemberStatus::Dead);
        assert_eq!(profile.heist.death_total, 1);
        // 沒寫過的成員應回傳預設檔案
        assert_eq!(reloaded.member(1, 43).heist.status, MemberStatus::Free);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_wipe_race_data_keeps_heist_profile() {
        let path = temp_config_path();
        let mut manager =
            ConfigManager::new(&path).expect("Failed to create ConfigManager in test");
        manager
            .update_member(1, 7, |profile| {
                profile.race.wins[0] = 3;
                profile.heist.jail_total = 2;
            })
            .unwrap();
        manager.wipe_race_data(1).unwrap();

        let profile = manager.member(1, 7);
        assert_eq!(profile.race.wins[0], 0);
        assert_eq!(profile.heist.jail_total, 2);
        let _ = std::fs::remove_file(&path);
    }
}
