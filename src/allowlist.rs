//! Allow-lists for client supplied storage paths and scrape targets
//!
//! Both checks are pure and run before any storage write or outbound
//! request, so the gateway can never be used as an open fetch proxy or
//! write outside the three known document locations.

use regex::Regex;
use std::sync::LazyLock;

static EDITED_ACHIEVEMENT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^editedAchievementData/[a-z0-9_]+/[a-z0-9_]+\.json$")
        .expect("Invalid regex pattern for edited achievement path")
});

static TAG_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^tag/tag\.json$").expect("Invalid regex pattern for tag path"));

static PATCH_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^patch/patch\.json$").expect("Invalid regex pattern for patch path")
});

static ASSET_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid regex pattern for asset segment")
});

/// Lodestone character profile page; the last capture group is the character id
pub const LODESTONE_PROFILE_PATTERN: &str =
    r"^https://(jp|na|eu|fr|de)\.finalfantasyxiv\.com/lodestone/character/([0-9]+)/?$";

/// Achievement detail page of a character
pub const LODESTONE_ACHIEVEMENT_PATTERN: &str =
    r"^https://(jp|na|eu|fr|de)\.finalfantasyxiv\.com/lodestone/character/[0-9]+/achievement/detail/[0-9a-zA-Z]+/?$";

/// Item page of the Eorzea database
pub const LODESTONE_ITEM_PATTERN: &str =
    r"^https://(jp|na|eu|fr|de)\.finalfantasyxiv\.com/lodestone/playguide/db/item/[0-9a-zA-Z]+/?$";

/// Icon image on the Lodestone image host
pub const LODESTONE_ICON_PATTERN: &str =
    r"^https://img\.finalfantasyxiv\.com/lds/pc/global/images/itemicon/[0-9a-zA-Z]+/[0-9a-zA-Z]+\.(jpg|png|gif)(\?.*)?$";

/// Check whether `save_text` may write to `path`.
///
/// Exactly three shapes are accepted: `editedAchievementData/<category>/<group>.json`,
/// `tag/tag.json` and `patch/patch.json`.
pub fn is_allowed_save_path(path: &str) -> bool {
    EDITED_ACHIEVEMENT_PATH.is_match(path) || TAG_PATH.is_match(path) || PATCH_PATH.is_match(path)
}

/// Check a `category` / `group` query value before it becomes part of a storage path
pub fn is_valid_asset_segment(segment: &str) -> bool {
    ASSET_SEGMENT.is_match(segment)
}

/// Strip fragment, query and trailing slash from a pasted profile URL
pub fn normalize_profile_url(raw_url: &str) -> String {
    let trimmed = raw_url.trim();
    let without_fragment = trimmed.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    without_query
        .strip_suffix('/')
        .unwrap_or(without_query)
        .to_string()
}

/// The four external resource shapes the gateway is allowed to fetch
#[derive(Debug, Clone)]
pub struct TargetUrlAllowList {
    profile: Regex,
    achievement: Regex,
    item: Regex,
    icon: Regex,
}

impl TargetUrlAllowList {
    /// Build an allow-list from explicit patterns
    pub fn new(
        profile: &str,
        achievement: &str,
        item: &str,
        icon: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            profile: Regex::new(profile)?,
            achievement: Regex::new(achievement)?,
            item: Regex::new(item)?,
            icon: Regex::new(icon)?,
        })
    }

    /// Allow-list for the public Lodestone site
    pub fn lodestone() -> Self {
        Self::new(
            LODESTONE_PROFILE_PATTERN,
            LODESTONE_ACHIEVEMENT_PATTERN,
            LODESTONE_ITEM_PATTERN,
            LODESTONE_ICON_PATTERN,
        )
        .expect("Invalid regex pattern for Lodestone targets")
    }

    /// Match a normalized profile URL and return the character id
    pub fn match_profile(&self, url: &str) -> Option<u64> {
        let captures = self.profile.captures(url)?;
        captures
            .iter()
            .skip(1)
            .flatten()
            .last()
            .and_then(|m| m.as_str().parse().ok())
    }

    pub fn is_achievement_url(&self, url: &str) -> bool {
        self.achievement.is_match(url)
    }

    pub fn is_item_url(&self, url: &str) -> bool {
        self.item.is_match(url)
    }

    pub fn is_icon_url(&self, url: &str) -> bool {
        self.icon.is_match(url)
    }
}

impl Default for TargetUrlAllowList {
    fn default() -> Self {
        Self::lodestone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_save_paths() {
        assert!(is_allowed_save_path("tag/tag.json"));
        assert!(is_allowed_save_path("patch/patch.json"));
        assert!(is_allowed_save_path("editedAchievementData/battle/dungeon.json"));
        assert!(is_allowed_save_path("editedAchievementData/pvp_2/season_10.json"));
    }

    #[test]
    fn test_rejected_save_paths() {
        assert!(!is_allowed_save_path("../../etc/passwd"));
        assert!(!is_allowed_save_path(""));
        assert!(!is_allowed_save_path("tag/other.json"));
        assert!(!is_allowed_save_path("/tag/tag.json"));
        assert!(!is_allowed_save_path("editedAchievementData/Battle/dungeon.json"));
        assert!(!is_allowed_save_path("editedAchievementData/battle/../dungeon.json"));
        assert!(!is_allowed_save_path("editedAchievementData/battle/dungeon.json.bak"));
        assert!(!is_allowed_save_path("editedAchievementData/battle.json"));
        assert!(!is_allowed_save_path("tag/tag.json\n"));
    }

    #[test]
    fn test_asset_segments() {
        assert!(is_valid_asset_segment("battle"));
        assert!(is_valid_asset_segment("quests_2"));
        assert!(!is_valid_asset_segment(""));
        assert!(!is_valid_asset_segment(".."));
        assert!(!is_valid_asset_segment("a/b"));
    }

    #[test]
    fn test_normalize_profile_url() {
        assert_eq!(
            normalize_profile_url(" https://jp.finalfantasyxiv.com/lodestone/character/123/?x=1#top "),
            "https://jp.finalfantasyxiv.com/lodestone/character/123"
        );
        assert_eq!(normalize_profile_url(""), "");
    }

    #[test]
    fn test_profile_match_returns_character_id() {
        let targets = TargetUrlAllowList::lodestone();
        assert_eq!(
            targets.match_profile("https://na.finalfantasyxiv.com/lodestone/character/27436187"),
            Some(27436187)
        );
        assert_eq!(
            targets.match_profile("https://xx.finalfantasyxiv.com/lodestone/character/1"),
            None
        );
        assert_eq!(
            targets.match_profile("https://jpXfinalfantasyxiv.com/lodestone/character/1"),
            None
        );
        assert_eq!(
            targets.match_profile("https://jp.finalfantasyxiv.com/lodestone/character/1/achievement"),
            None
        );
    }

    #[test]
    fn test_achievement_and_item_urls() {
        let targets = TargetUrlAllowList::lodestone();
        assert!(targets.is_achievement_url(
            "https://jp.finalfantasyxiv.com/lodestone/character/1/achievement/detail/abc123/"
        ));
        assert!(!targets.is_achievement_url("https://evil.example.com/achievement/detail/abc"));
        assert!(targets.is_item_url("https://eu.finalfantasyxiv.com/lodestone/playguide/db/item/9f2c1a"));
        assert!(!targets.is_item_url(
            "https://eu.finalfantasyxiv.com/lodestone/playguide/db/item/9f2c1a?redirect=http://x"
        ));
    }

    #[test]
    fn test_icon_urls() {
        let targets = TargetUrlAllowList::lodestone();
        assert!(targets.is_icon_url(
            "https://img.finalfantasyxiv.com/lds/pc/global/images/itemicon/12/1234abcd.png?n5"
        ));
        assert!(targets.is_icon_url(
            "https://img.finalfantasyxiv.com/lds/pc/global/images/itemicon/ab/cd.jpg"
        ));
        assert!(!targets.is_icon_url(
            "https://img.finalfantasyxiv.com/lds/pc/global/images/itemicon/ab/cd.svg"
        ));
        assert!(!targets.is_icon_url("http://img.finalfantasyxiv.com/lds/pc/global/images/itemicon/ab/cd.png"));
    }
}
