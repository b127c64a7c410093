pub mod bank;
pub mod config;
pub mod heist;
pub mod logger;
pub mod race;
pub mod sessions;
pub mod theme;
pub mod timers;
pub mod wait;
