//! Wire records returned to clients
//!
//! Field names follow the JSON contract the editor front-end already
//! consumes, so everything is camelCase and a few names keep their
//! historical spelling (`characterID`, `selfintroduction`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/save_text`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveTextRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTextResponse {
    pub ok: bool,
    pub path: String,
    pub bytes: usize,
    pub updated_at: String,
}

/// Achievement record in the shape the editor stores under
/// `editedAchievementData/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditAchievement {
    pub title: String,
    pub description: String,
    pub icon_url: String,
    pub icon_path: String,
    pub point: i32,
    pub is_latest_patch: bool,
    pub is_created: bool,
    pub is_edited: bool,
    pub is_now_created: bool,
    pub source_index: i32,
    pub tag_ids: Vec<i32>,
    pub adjustment_patch_id: i32,
    pub patch_id: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title_award: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title_award_man: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title_award_woman: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub item_award: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub item_award_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub item_award_image_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub item_award_image_path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub award_condition: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedItemData {
    pub item_award: String,
    pub item_award_url: String,
    pub item_award_image_url: String,
    pub item_award_image_path: String,
}

/// Response of the public character lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterResponse {
    #[serde(rename = "characterID")]
    pub character_id: u64,
    #[serde(rename = "fetchedDate")]
    pub fetched_date: DateTime<Utc>,
    #[serde(rename = "characterData")]
    pub character_data: CharacterProfile,
    #[serde(rename = "completedAchievementsKinds")]
    pub completed_achievements_kinds: Vec<CompletedAchievementsKind>,
    #[serde(rename = "isAchievementPrivate")]
    pub is_achievement_private: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedAchievementsKind {
    pub key: String,
    pub achievements: Vec<CompletedAchievement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedAchievement {
    pub title: String,
    pub completed_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterProfile {
    pub first_name: String,
    pub last_name: String,
    pub selfintroduction: Option<String>,
    pub server: String,
    pub datacenter: String,
    pub race: String,
    pub clan: String,
    pub gender: String,
    pub birth_month: String,
    pub birth_day: String,
    pub battle_roles: BattleRoles,
    pub crafter: Crafter,
    pub gatherer: Gatherer,
}

/// Job levels are not scraped yet; the tables only keep the legacy shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLevel {
    pub level: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleRoles {
    pub tank_role: TankRole,
    pub healer_role: HealerRole,
    pub dps_role: DpsRole,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TankRole {
    pub paladin: JobLevel,
    pub warrior: JobLevel,
    pub dark_knight: JobLevel,
    pub gunbreaker: JobLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealerRole {
    pub white_mage: JobLevel,
    pub scholar: JobLevel,
    pub astrologian: JobLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DpsRole {
    pub melee_dps: MeleeDps,
    pub physical_ranged_dps: PhysicalRangedDps,
    pub magical_ranged_dps: MagicalRangedDps,
    pub limited_dps: LimitedDps,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeleeDps {
    pub monk: JobLevel,
    pub dragoon: JobLevel,
    pub ninja: JobLevel,
    pub samurai: JobLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalRangedDps {
    pub bard: JobLevel,
    pub machinist: JobLevel,
    pub dancer: JobLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagicalRangedDps {
    pub black_mage: JobLevel,
    pub summoner: JobLevel,
    pub red_mage: JobLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitedDps {
    pub blue_mage: JobLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Crafter {
    pub carpenter: JobLevel,
    pub blacksmith: JobLevel,
    pub armorer: JobLevel,
    pub goldsmith: JobLevel,
    pub leatherworker: JobLevel,
    pub weaver: JobLevel,
    pub alchemist: JobLevel,
    pub culinarian: JobLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gatherer {
    pub miner: JobLevel,
    pub botanist: JobLevel,
    pub fisher: JobLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_text_request_missing_fields_default_to_empty() {
        let req: SaveTextRequest = serde_json::from_str(r#"{"path":"tag/tag.json"}"#).unwrap();
        assert_eq!(req.text, "");
        assert_eq!(req.path, "tag/tag.json");
    }

    #[test]
    fn test_profile_serializes_legacy_keys() {
        let profile = CharacterProfile {
            first_name: "Test".into(),
            last_name: "Taro".into(),
            selfintroduction: None,
            server: "Aegis".into(),
            datacenter: "Elemental".into(),
            race: String::new(),
            clan: String::new(),
            gender: String::new(),
            birth_month: String::new(),
            birth_day: String::new(),
            battle_roles: BattleRoles::default(),
            crafter: Crafter::default(),
            gatherer: Gatherer::default(),
        };
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["firstName"], "Test");
        assert!(value["selfintroduction"].is_null());
        assert_eq!(value["battleRoles"]["tankRole"]["darkKnight"]["level"], 0);
        assert_eq!(value["battleRoles"]["dpsRole"]["limitedDps"]["blueMage"]["level"], 0);
        assert_eq!(value["gatherer"]["fisher"]["level"], 0);
    }

    #[test]
    fn test_empty_award_fields_are_omitted() {
        let record = EditAchievement {
            title: "t".into(),
            description: "d".into(),
            icon_url: "u".into(),
            icon_path: "p".into(),
            point: 10,
            is_latest_patch: false,
            is_created: true,
            is_edited: true,
            is_now_created: true,
            source_index: -1,
            tag_ids: vec![],
            adjustment_patch_id: 0,
            patch_id: 0,
            title_award: String::new(),
            title_award_man: String::new(),
            title_award_woman: String::new(),
            item_award: String::new(),
            item_award_url: String::new(),
            item_award_image_url: String::new(),
            item_award_image_path: String::new(),
            award_condition: vec![],
            url: String::new(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("titleAward").is_none());
        assert!(value.get("awardCondition").is_none());
        assert_eq!(value["tagIds"], serde_json::json!([]));
        assert_eq!(value["sourceIndex"], -1);
    }
}
