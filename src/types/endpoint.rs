//! The five API endpoints and how they are classified

/// Rate-limit class of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    /// `save_text`, limited by the save quota
    Save,
    /// every `get_*` endpoint, limited by the read quota
    Read,
    /// Never limited. No routed endpoint uses it today; it is the class
    /// for routes that must stay reachable under load, such as a health
    /// check.
    Unlimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CharacterInfo,
    SaveText,
    HiddenAchievement,
    IconImg,
    ItemInformation,
}

impl Endpoint {
    pub const ALL: [Endpoint; 5] = [
        Endpoint::CharacterInfo,
        Endpoint::SaveText,
        Endpoint::HiddenAchievement,
        Endpoint::IconImg,
        Endpoint::ItemInformation,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Self::CharacterInfo => "/api/get_character_info",
            Self::SaveText => "/api/save_text",
            Self::HiddenAchievement => "/api/get_hidden_achievement",
            Self::IconImg => "/api/get_icon_img",
            Self::ItemInformation => "/api/get_item_infomation",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|endpoint| endpoint.path() == path)
    }

    pub fn class(self) -> EndpointClass {
        match self {
            Self::SaveText => EndpointClass::Save,
            Self::CharacterInfo
            | Self::HiddenAchievement
            | Self::IconImg
            | Self::ItemInformation => EndpointClass::Read,
        }
    }

    /// Only the character lookup can be called without a bearer token
    pub fn requires_auth(self) -> bool {
        !matches!(self, Self::CharacterInfo)
    }
}
