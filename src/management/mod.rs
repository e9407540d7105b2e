mod auth;
mod lyrics;

pub use auth::TokenManager;
pub use lyrics::LyricCache;
