//! Configuration loading and management

use crate::core::order::DressType;
use anyhow::{Result, bail};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default price per garment type, applied on first approval only
pub type RateCard = IndexMap<DressType, Decimal>;

/// Sizing of the live projection feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedConfig {
    /// Window size used when a subscription does not name a limit
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

fn default_limit() -> usize {
    20
}

fn default_event_bus_capacity() -> usize {
    1024
}

fn default_advance_ratio() -> Decimal {
    Decimal::new(5, 1)
}

/// Complete configuration of a shop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopConfig {
    #[serde(default)]
    pub rate_card: RateCard,

    /// Share of the total asked as advance when the manager names none
    #[serde(default = "default_advance_ratio")]
    pub advance_ratio: Decimal,

    /// Measurements a new order must carry, per garment type
    ///
    /// Types without a template accept any measurement set.
    #[serde(default)]
    pub measurement_templates: IndexMap<DressType, Vec<String>>,

    /// Buffer of the change bus before slow subscribers lag
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    #[serde(default)]
    pub feed: FeedConfig,
}

impl ShopConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.advance_ratio < Decimal::ZERO || self.advance_ratio > Decimal::ONE {
            bail!("advanceRatio must be between 0 and 1, got {}", self.advance_ratio);
        }
        if let Some((dress_type, price)) = self.rate_card.iter().find(|(_, p)| **p < Decimal::ZERO) {
            bail!("rateCard.{} must not be negative, got {}", dress_type, price);
        }
        if self.event_bus_capacity == 0 {
            bail!("eventBusCapacity must be positive");
        }
        if self.feed.default_limit == 0 {
            bail!("feed.defaultLimit must be positive");
        }
        Ok(())
    }

    /// Required measurement names for a garment type
    pub fn required_measurements(&self, dress_type: DressType) -> &[String] {
        self.measurement_templates
            .get(&dress_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The shop's standard rate card and templates
    pub fn default_config() -> Self {
        let rate_card = [
            (DressType::Shirt, 600),
            (DressType::Pant, 700),
            (DressType::Suit, 5500),
            (DressType::Kurta, 500),
            (DressType::Safari, 1200),
            (DressType::Sherwani, 8000),
        ]
        .into_iter()
        .map(|(dress_type, price)| (dress_type, Decimal::from(price)))
        .collect();

        let template = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        let mut measurement_templates = IndexMap::new();
        measurement_templates.insert(
            DressType::Shirt,
            template(&["Collar", "Chest", "Sleeve Length", "Shoulder", "Shirt Length"]),
        );
        measurement_templates.insert(
            DressType::Pant,
            template(&["Waist", "Hip", "Inseam", "Outseam", "Bottom Opening"]),
        );
        measurement_templates.insert(
            DressType::Suit,
            template(&["Chest", "Waist", "Shoulder", "Back Length", "Armhole", "Sleeve"]),
        );

        Self {
            rate_card,
            advance_ratio: default_advance_ratio(),
            measurement_templates,
            event_bus_capacity: default_event_bus_capacity(),
            feed: FeedConfig::default(),
        }
    }
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self::default_config()
    }
}
