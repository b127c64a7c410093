pub mod application;
pub mod coupon;
pub mod economy;
pub mod heist;
pub mod help;
pub mod race;
