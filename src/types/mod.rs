//! Shared types

pub mod endpoint;
pub mod error;
pub mod records;

pub use endpoint::{Endpoint, EndpointClass};
pub use error::{ErrorEnvelope, GatewayError, Result};
pub use records::{
    CharacterProfile, CharacterResponse, EditAchievement, FetchedItemData, SaveTextRequest,
    SaveTextResponse,
};
