//! API route handlers
//!
//! Handlers run after routing, authentication and rate limiting. They
//! return `Result<GatewayResponse, GatewayError>`; the router renders the
//! error side.

pub mod achievement;
pub mod character;
pub mod icon;
pub mod item;
pub mod save_text;

pub use achievement::get_hidden_achievement;
pub use character::get_character_info;
pub use icon::get_icon_img;
pub use item::get_item_information;
pub use save_text::save_text;

use crate::allowlist::is_valid_asset_segment;
use crate::types::GatewayError;

/// Decoded query string. Repeated keys keep their first value.
#[derive(Debug, Clone, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn parse(query: Option<&str>) -> Self {
        let pairs = query
            .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
            .unwrap_or_default();
        Self(pairs)
    }

    /// Trimmed value of `name`, empty when absent
    pub fn get(&self, name: &str) -> &str {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .unwrap_or_default()
    }
}

/// `url`, `category` and `group` of the scrape endpoints
#[derive(Debug, Clone)]
pub struct TargetParams<'a> {
    pub url: &'a str,
    pub category: &'a str,
    pub group: &'a str,
}

impl<'a> TargetParams<'a> {
    pub fn from_query(query: &'a QueryParams) -> Result<Self, GatewayError> {
        let params = Self {
            url: query.get("url"),
            category: query.get("category"),
            group: query.get("group"),
        };

        if params.url.is_empty() || params.category.is_empty() || params.group.is_empty() {
            return Err(GatewayError::validation(
                "missing_parameter",
                "url, category, group is required",
            ));
        }
        if !is_valid_asset_segment(params.category) || !is_valid_asset_segment(params.group) {
            return Err(GatewayError::validation(
                "invalid_parameter",
                "category and group may only contain letters, digits, '_' and '-'",
            ));
        }
        Ok(params)
    }
}
