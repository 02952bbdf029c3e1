#![deny(warnings)]
pub mod board;
pub mod game;
pub mod inference;

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "arcade"
    }

    pub const fn codename() -> &'static str {
        "Slide & Guess"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
