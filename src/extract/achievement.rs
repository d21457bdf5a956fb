use scraper::{Html, Selector};
use std::sync::LazyLock;

use super::{achievement_icon_path, first_attr, first_text, ExtractError};
use crate::types::EditAchievement;

static TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".db-view__achievement__text__name").expect("Invalid achievement title selector")
});

static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".db-view__achievement__help").expect("Invalid achievement help selector")
});

static ICON: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".db-view__achievement__icon__image").expect("Invalid achievement icon selector")
});

static POINT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".db-view__achievement__point").expect("Invalid achievement point selector")
});

static LATEST_PATCH: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".latest_patch__major__icon").expect("Invalid latest patch selector")
});

/// Build an editable achievement record from an achievement detail page.
///
/// The record is flagged as newly created so the editor treats it as an
/// addition; `source_index` is -1 because it has no source row yet.
pub fn extract_achievement(
    html: &str,
    url: &str,
    category: &str,
    group: &str,
) -> Result<EditAchievement, ExtractError> {
    let document = Html::parse_document(html);

    let title = first_text(&document, &TITLE);
    let description = first_text(&document, &DESCRIPTION);
    let icon_url = first_attr(&document, &ICON, "src");

    let missing: Vec<&str> = [
        ("title", &title),
        ("description", &description),
        ("icon", &icon_url),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(name, _)| name)
    .collect();
    if !missing.is_empty() {
        return Err(ExtractError::missing("achievement", &missing));
    }

    let point = first_text(&document, &POINT).parse().unwrap_or(0);
    let is_latest_patch = document.select(&LATEST_PATCH).next().is_some();
    let icon_path = achievement_icon_path(category, group, &icon_url);

    Ok(EditAchievement {
        title,
        description,
        icon_url,
        icon_path,
        point,
        is_latest_patch,
        is_created: true,
        is_edited: true,
        is_now_created: true,
        source_index: -1,
        tag_ids: Vec::new(),
        adjustment_patch_id: 0,
        patch_id: 0,
        title_award: String::new(),
        title_award_man: String::new(),
        title_award_woman: String::new(),
        item_award: String::new(),
        item_award_url: String::new(),
        item_award_image_url: String::new(),
        item_award_image_path: String::new(),
        award_condition: Vec::new(),
        url: url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str =
        "https://jp.finalfantasyxiv.com/lodestone/character/1/achievement/detail/abc123/";

    fn page(title: &str, help: &str, icon: &str, extra: &str) -> String {
        format!(
            r#"<html><body>
            <div class="db-view__achievement__icon"><img class="db-view__achievement__icon__image" src="{icon}"></div>
            <p class="db-view__achievement__text__name"> {title} </p>
            <p class="db-view__achievement__help">
                {help}
            </p>
            {extra}
            </body></html>"#
        )
    }

    #[test]
    fn test_complete_page_yields_new_record() {
        let html = page(
            "Hidden Feat",
            "Complete a secret.",
            "https://img.finalfantasyxiv.com/lds/pc/global/images/itemicon/ab/icon.png?n1",
            r#"<p class="db-view__achievement__point">10</p><i class="latest_patch__major__icon"></i>"#,
        );

        let record = extract_achievement(&html, URL, "battle", "dungeon").unwrap();
        assert_eq!(record.title, "Hidden Feat");
        assert_eq!(record.description, "Complete a secret.");
        assert_eq!(record.icon_path, "achievementData/img/battle/dungeon/icon.png");
        assert_eq!(record.point, 10);
        assert!(record.is_latest_patch);
        assert!(record.is_created && record.is_edited && record.is_now_created);
        assert_eq!(record.source_index, -1);
        assert!(record.tag_ids.is_empty());
        assert_eq!(record.url, URL);
    }

    #[test]
    fn test_unparsable_point_is_zero() {
        let html = page(
            "t",
            "d",
            "https://img.example.com/i.png",
            r#"<p class="db-view__achievement__point">n/a</p>"#,
        );
        let record = extract_achievement(&html, URL, "c", "g").unwrap();
        assert_eq!(record.point, 0);
        assert!(!record.is_latest_patch);
    }

    #[test]
    fn test_missing_any_required_field_fails() {
        let cases = [
            page("", "d", "https://img.example.com/i.png", ""),
            page("t", "  ", "https://img.example.com/i.png", ""),
            page("t", "d", "", ""),
        ];
        for html in cases {
            assert!(extract_achievement(&html, URL, "c", "g").is_err());
        }
    }

    #[test]
    fn test_missing_fields_are_named() {
        let err = extract_achievement("<html></html>", URL, "c", "g").unwrap_err();
        assert_eq!(
            err.to_string(),
            "required achievement fields are missing: title, description, icon"
        );
    }
}
