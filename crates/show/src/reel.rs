//! `Reel`: up to one asset per recognized [`AssetType`] (§3).

use crate::asset::{Asset, AssetType};
use dcsync_core::ids::Uuid;

#[derive(Debug, Clone, Default)]
pub struct Reel {
    pub id: Uuid,
    pub main_picture: Option<Asset>,
    pub main_sound: Option<Asset>,
    pub aux_data: Option<Asset>,
}

/// Builds a [`Reel`] by routing assets to their slot by kind; an asset of
/// `AssetType::Unknown` is silently dropped, matching the source's
/// permissive default.
#[derive(Debug, Clone, Default)]
pub struct ReelBuilder {
    reel: Reel,
}

impl ReelBuilder {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self { reel: Reel { id, ..Reel::default() } }
    }

    #[must_use]
    pub fn add_asset(mut self, asset: Asset) -> Self {
        match asset.kind {
            AssetType::MainPicture => self.reel.main_picture = Some(asset),
            AssetType::MainSound => self.reel.main_sound = Some(asset),
            AssetType::AuxData => self.reel.aux_data = Some(asset),
            AssetType::Unknown => {}
        }
        self
    }

    #[must_use]
    pub fn build(self) -> Reel {
        self.reel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetBuilder;

    #[test]
    fn unknown_assets_are_dropped() {
        let unknown = AssetBuilder::new(AssetType::Unknown, Uuid::from_bytes([9; 16])).build();
        let reel = ReelBuilder::new(Uuid::from_bytes([1; 16])).add_asset(unknown).build();
        assert!(reel.main_picture.is_none() && reel.main_sound.is_none() && reel.aux_data.is_none());
    }

    #[test]
    fn assets_route_to_their_slot() {
        let picture = AssetBuilder::new(AssetType::MainPicture, Uuid::from_bytes([2; 16])).build();
        let sound = AssetBuilder::new(AssetType::MainSound, Uuid::from_bytes([3; 16])).build();
        let reel =
            ReelBuilder::new(Uuid::from_bytes([1; 16])).add_asset(picture).add_asset(sound).build();
        assert!(reel.main_picture.is_some());
        assert!(reel.main_sound.is_some());
        assert!(reel.aux_data.is_none());
    }
}
