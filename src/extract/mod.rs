//! Field extraction from Lodestone markup
//!
//! Each extractor reads a fixed set of CSS locations, trims the text and
//! maps it onto one of the wire records. A record missing any required
//! field is an [`ExtractError`], never a partially filled value.
//!
//! Parsing is synchronous: `scraper::Html` is not `Send`, so handlers
//! fetch first and run the extractor without holding the document across
//! an await point.

mod achievement;
mod character;
mod item;

pub use achievement::extract_achievement;
pub use character::{extract_character, split_character_name, split_server_and_datacenter};
pub use item::extract_item;

use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("required {record} fields are missing: {fields}")]
    MissingFields {
        record: &'static str,
        fields: String,
    },
}

impl ExtractError {
    fn missing(record: &'static str, fields: &[&str]) -> Self {
        Self::MissingFields {
            record,
            fields: fields.join(", "),
        }
    }
}

/// Trimmed text of the first element matching `selector`
fn first_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(|element| element_text(&element))
        .unwrap_or_default()
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed attribute of the first element matching `selector`
fn first_attr(document: &Html, selector: &Selector, attr: &str) -> String {
    document
        .select(selector)
        .next()
        .and_then(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

/// File name under which an image URL is stored.
///
/// The last path segment with query and fragment removed. When that is
/// empty the name is the SHA-256 of the URL plus `.png`, so one source URL
/// always maps to one file.
pub fn image_file_name(image_url: &str) -> String {
    let without_fragment = image_url.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    let last = without_query.trim().rsplit('/').next().unwrap_or_default().trim();

    match last {
        "" | "." | ".." => format!("{}.png", hex::encode(Sha256::digest(image_url.as_bytes()))),
        name => name.to_string(),
    }
}

/// `achievementData/img/<category>/<group>/<file>`
pub fn achievement_icon_path(category: &str, group: &str, icon_url: &str) -> String {
    format!(
        "achievementData/img/{}/{}/{}",
        category,
        group,
        image_file_name(icon_url)
    )
}

/// `achievementData/img/<category>/<group>/item/<file>`
pub fn item_image_path(category: &str, group: &str, image_url: &str) -> String {
    format!(
        "achievementData/img/{}/{}/item/{}",
        category,
        group,
        image_file_name(image_url)
    )
}
