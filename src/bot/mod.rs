pub mod commands;
pub mod data;

pub type Error = anyhow::Error;
pub type Context<'a> = poise::Context<'a, data::BotData, Error>;

pub fn commands() -> Vec<poise::Command<data::BotData, Error>> {
    vec![
        commands::heist::heist(),
        commands::heist::setheist(),
        commands::race::race(),
        commands::race::setrace(),
        commands::coupon::coupon(),
        commands::application::apply(),
        commands::application::setapply(),
        commands::application::accept(),
        commands::application::deny(),
        commands::economy::balance(),
        commands::economy::setbal(),
        commands::help::help(),
    ]
}
