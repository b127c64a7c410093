use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("Theme `{0}` not found")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 搶劫遊戲術語的替換字串，讀自 `data/themes/<名稱>.txt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub jail: String,
    pub sentence: String,
    pub police: String,
    pub bail: String,
    pub crew: String,
    pub vault: String,
    pub heist: String,
    pub oob: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            jail: "監獄".to_string(),
            sentence: "刑期".to_string(),
            police: "警方".to_string(),
            bail: "保釋金".to_string(),
            crew: "行動小隊".to_string(),
            vault: "金庫".to_string(),
            heist: "搶劫行動".to_string(),
            oob: "緩刑".to_string(),
        }
    }
}

impl Theme {
    /// 解析 `Key = value` 格式；缺少的鍵沿用預設值，空行與 `#` 開頭忽略
    pub fn parse(content: &str) -> Theme {
        let mut theme = Theme::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            match key.trim().to_ascii_lowercase().as_str() {
                "jail" => theme.jail = value,
                "sentence" => theme.sentence = value,
                "police" => theme.police = value,
                "bail" => theme.bail = value,
                "crew" => theme.crew = value,
                "vault" => theme.vault = value,
                "heist" => theme.heist = value,
                "oob" => theme.oob = value,
                _ => {}
            }
        }
        theme
    }

    pub fn load(dir: &Path, name: &str) -> Result<Theme, ThemeError> {
        let path = theme_path(dir, name);
        if !path.exists() {
            return Err(ThemeError::NotFound(name.to_string()));
        }
        let content = fs::read_to_string(path)?;
        Ok(Theme::parse(&content))
    }
}

pub fn theme_dir() -> PathBuf {
    PathBuf::from("data/themes")
}

fn theme_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.txt", name))
}

/// 列出目錄中的可用主題名稱（排序）
pub fn list_themes(dir: &Path) -> Result<Vec<String>, ThemeError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "txt") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_theme() {
        let content = "\
# 測試主題
Jail = 大牢
Sentence = 勞役
Police = 衛兵
Bail = 贖金
Crew = 盜賊團
Vault = 寶庫
Heist = 夜襲
OOB = 通緝
";
        let theme = Theme::parse(content);
        assert_eq!(theme.jail, "大牢");
        assert_eq!(theme.crew, "盜賊團");
        assert_eq!(theme.oob, "通緝");
    }

    #[test]
    fn test_parse_missing_keys_fall_back_to_default() {
        let theme = Theme::parse("Jail = 地牢\n");
        assert_eq!(theme.jail, "地牢");
        assert_eq!(theme.vault, Theme::default().vault);
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let err = Theme::load(Path::new("data/themes"), "NoSuchTheme").unwrap_err();
        assert!(matches!(err, ThemeError::NotFound(name) if name == "NoSuchTheme"));
    }

    #[test]
    fn test_bundled_default_theme_loads() {
        let theme = Theme::load(Path::new("data/themes"), "Heist");
        assert!(theme.is_ok());
    }
}
