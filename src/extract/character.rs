use chrono::Utc;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

use super::{first_text, ExtractError};
use crate::types::records::{BattleRoles, Crafter, Gatherer};
use crate::types::{CharacterProfile, CharacterResponse};

static NAME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".frame__chara__name").expect("Invalid character name selector")
});

static WORLD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".frame__chara__world").expect("Invalid character world selector")
});

static SELF_INTRODUCTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".character__selfintroduction").expect("Invalid self introduction selector")
});

static SERVER_DATACENTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)\s*\((.*?)\)$").expect("Invalid regex pattern for server and datacenter")
});

/// Build the legacy character response from a profile page.
///
/// Only the display name is required. Job levels are not scraped and the
/// achievement list stays empty.
pub fn extract_character(html: &str, character_id: u64) -> Result<CharacterResponse, ExtractError> {
    let document = Html::parse_document(html);

    let name = first_text(&document, &NAME);
    if name.is_empty() {
        return Err(ExtractError::missing("character", &["name"]));
    }
    let (first_name, last_name) = split_character_name(&name);
    let (server, datacenter) = split_server_and_datacenter(&first_text(&document, &WORLD));
    let introduction = first_text(&document, &SELF_INTRODUCTION);

    Ok(CharacterResponse {
        character_id,
        fetched_date: Utc::now(),
        character_data: CharacterProfile {
            first_name,
            last_name,
            selfintroduction: Some(introduction).filter(|text| !text.is_empty()),
            server,
            datacenter,
            race: String::new(),
            clan: String::new(),
            gender: String::new(),
            birth_month: String::new(),
            birth_day: String::new(),
            battle_roles: BattleRoles::default(),
            crafter: Crafter::default(),
            gatherer: Gatherer::default(),
        },
        completed_achievements_kinds: Vec::new(),
        is_achievement_private: false,
    })
}

/// Split `"First Last"`; everything after the first token is the family name
pub fn split_character_name(text: &str) -> (String, String) {
    let mut parts = text.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}

/// Split `"Server (Datacenter)"`; text without a trailing parenthetical is
/// all server
pub fn split_server_and_datacenter(text: &str) -> (String, String) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return (String::new(), String::new());
    }
    match SERVER_DATACENTER.captures(trimmed) {
        Some(captures) => (
            captures[1].trim().to_string(),
            captures[2].trim().to_string(),
        ),
        None => (trimmed.to_string(), String::new()),
    }
}
