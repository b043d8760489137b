/// Database configuration and connection management
pub mod database;

/// Static marketplace data loaded from config.toml (revenue split, mentors)
pub mod marketplace;

/// Deployment settings read from environment variables
pub mod settings;

pub use marketplace::{MarketplaceConfig, MentorConfig};
pub use settings::Settings;
