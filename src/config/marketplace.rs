//! Marketplace configuration loading from config.toml
//!
//! This module loads the static data the service needs at startup: the seller
//! revenue share and the mentor directory used by mentor matching.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceConfig {
    /// Revenue split settings
    #[serde(default)]
    pub marketplace: RevenueConfig,
    /// Mentor directory
    #[serde(default)]
    pub mentors: Vec<MentorConfig>,
}

/// Revenue split between sellers and the platform
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RevenueConfig {
    /// Percentage of each sale credited to the seller
    #[serde(default = "default_seller_share")]
    pub seller_share_percent: u8,
}

const fn default_seller_share() -> u8 {
    80
}

impl Default for RevenueConfig {
    fn default() -> Self {
        Self {
            seller_share_percent: default_seller_share(),
        }
    }
}

/// One entry in the mentor directory
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MentorConfig {
    /// Mentor display name
    pub name: String,
    /// Skills the mentor teaches (e.g. "rust", "system design")
    pub expertise: Vec<String>,
    /// Years of professional experience
    pub years_experience: u32,
    /// Hourly rate in cents
    pub hourly_rate: i64,
    /// Average rating, 0.0 to 5.0
    pub rating: f32,
    /// Languages the mentor can teach in
    #[serde(default)]
    pub languages: Vec<String>,
    /// Short biography
    #[serde(default)]
    pub bio: String,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            marketplace: RevenueConfig::default(),
            mentors: Vec::new(),
        }
    }
}

impl MarketplaceConfig {
    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    /// Returns [`Error::Config`] on invalid TOML or an out-of-range share.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse config.toml: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let share = self.marketplace.seller_share_percent;
        if share == 0 || share > 100 {
            return Err(Error::Config {
                message: format!("seller_share_percent must be within 1..=100, got {share}"),
            });
        }
        if let Some(mentor) = self
            .mentors
            .iter()
            .find(|m| m.name.trim().is_empty() || !(0.0..=5.0).contains(&m.rating))
        {
            return Err(Error::Config {
                message: format!("Invalid mentor entry '{}'", mentor.name),
            });
        }
        Ok(())
    }
}

/// Loads marketplace configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value is out of range
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MarketplaceConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    MarketplaceConfig::from_toml_str(&contents)
}
