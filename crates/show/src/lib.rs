//! Show/CPL/Reel/Asset timeline model (§3, §4.12).
//!
//! An in-memory, arena-style tree: [`Show`] owns a `Vec<Cpl>`; each `Cpl`
//! owns a `Vec<Reel>`; each `Reel` holds up to one [`Asset`] per
//! recognized [`AssetType`]. Construction happens exclusively through the
//! builder types (`ShowManager`, `CplBuilder`, `ReelBuilder`,
//! `AssetBuilder`) — no CPL/ASSETMAP XML parsing lives in this crate.

pub mod asset;
pub mod cpl;
pub mod manager;
pub mod reel;
pub mod show;

pub use asset::{Asset, AssetBuilder, AssetType};
pub use cpl::{Cpl, CplBuilder};
pub use manager::{ShowManager, ShowManagerError};
pub use reel::{Reel, ReelBuilder};
pub use show::{FrameInfo, Show};
