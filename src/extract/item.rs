use scraper::{Html, Selector};
use std::sync::LazyLock;

use super::{first_attr, first_text, item_image_path, ExtractError};
use crate::types::FetchedItemData;

static NAME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".db-view__item__text__name").expect("Invalid item name selector")
});

static IMAGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".db-view__item__icon__item_image").expect("Invalid item image selector")
});

static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:title"]"#).expect("Invalid og:title selector")
});

static OG_IMAGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:image"]"#).expect("Invalid og:image selector")
});

/// Read name and image of an item page.
///
/// Falls back to the OpenGraph tags when the database markup is absent.
/// The image itself is not downloaded here.
pub fn extract_item(
    html: &str,
    url: &str,
    category: &str,
    group: &str,
) -> Result<FetchedItemData, ExtractError> {
    let document = Html::parse_document(html);

    let mut name = first_text(&document, &NAME);
    if name.is_empty() {
        name = first_attr(&document, &OG_TITLE, "content");
    }
    let mut image_url = first_attr(&document, &IMAGE, "src");
    if image_url.is_empty() {
        image_url = first_attr(&document, &OG_IMAGE, "content");
    }

    match (name.is_empty(), image_url.is_empty()) {
        (true, true) => return Err(ExtractError::missing("item", &["name", "image"])),
        (true, false) => return Err(ExtractError::missing("item", &["name"])),
        (false, true) => return Err(ExtractError::missing("item", &["image"])),
        (false, false) => {}
    }

    Ok(FetchedItemData {
        item_award_image_path: item_image_path(category, group, &image_url),
        item_award: name,
        item_award_url: url.to_string(),
        item_award_image_url: image_url,
    })
}
