//! Builds a [`dcsync_show::Show`] from descriptor JSON files instead of
//! `CompositionPlaylist.xml`/`ASSETMAP.xml` (out of scope per §6; this is
//! the in-memory `ShowBuilder` input shape the XML mapping documents).

use dcsync_core::editrate::EditRate;
use dcsync_core::ids::{Ul, Uuid};
use dcsync_show::{Asset, AssetBuilder, AssetType, Cpl, CplBuilder, Reel, ReelBuilder, Show};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShowLoaderError {
    #[error("failed to read show descriptor {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },

    #[error("invalid JSON in show descriptor {path}: {source}")]
    Parse { path: String, #[source] source: serde_json::Error },

    #[error("invalid identifier in show descriptor {path}: {source}")]
    Id { path: String, #[source] source: dcsync_core::Error },

    #[error("show descriptor {path} has a CPL with no reels")]
    EmptyCpl { path: String },

    #[error("loaded show has zero length")]
    EmptyShow,
}

#[derive(Debug, Deserialize)]
struct EditRateDescriptor {
    numerator: u32,
    denominator: u32,
}

impl From<EditRateDescriptor> for EditRate {
    fn from(d: EditRateDescriptor) -> Self {
        Self::new(d.numerator, d.denominator)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum AssetKindDescriptor {
    MainPicture,
    MainSound,
    AuxData,
}

#[derive(Debug, Deserialize)]
struct AssetDescriptor {
    kind: AssetKindDescriptor,
    id: String,
    edit_rate: EditRateDescriptor,
    #[serde(default)]
    frame_rate: Option<EditRateDescriptor>,
    #[serde(default)]
    intrinsic_duration: i32,
    #[serde(default)]
    entry_point: i32,
    duration: i32,
    #[serde(default)]
    data_essence_coding_ul: Option<String>,
    path: String,
}

#[derive(Debug, Deserialize)]
struct ReelDescriptor {
    id: String,
    assets: Vec<AssetDescriptor>,
}

#[derive(Debug, Deserialize)]
struct CplDescriptor {
    id: String,
    reels: Vec<ReelDescriptor>,
}

fn build_asset(path: &str, d: AssetDescriptor) -> Result<Asset, ShowLoaderError> {
    let id = Uuid::parse(&d.id).map_err(|source| ShowLoaderError::Id { path: path.to_string(), source })?;
    let edit_rate: EditRate = d.edit_rate.into();
    let kind = match d.kind {
        AssetKindDescriptor::MainPicture => AssetType::MainPicture,
        AssetKindDescriptor::MainSound => AssetType::MainSound,
        AssetKindDescriptor::AuxData => AssetType::AuxData,
    };

    let mut builder = AssetBuilder::new(kind, id)
        .edit_rate(edit_rate)
        .frame_rate(d.frame_rate.map_or(edit_rate, Into::into))
        .intrinsic_duration(d.intrinsic_duration)
        .entry_point(d.entry_point)
        .duration(d.duration)
        .path(PathBuf::from(d.path));

    if let Some(ul_text) = &d.data_essence_coding_ul {
        let ul = Ul::parse(ul_text).map_err(|source| ShowLoaderError::Id { path: path.to_string(), source })?;
        builder = builder.data_essence_coding_ul(ul);
    }

    Ok(builder.build())
}

fn build_reel(path: &str, d: ReelDescriptor) -> Result<Reel, ShowLoaderError> {
    let id = Uuid::parse(&d.id).map_err(|source| ShowLoaderError::Id { path: path.to_string(), source })?;
    let mut builder = ReelBuilder::new(id);
    for asset in d.assets {
        builder = builder.add_asset(build_asset(path, asset)?);
    }
    Ok(builder.build())
}

fn build_cpl(path: &str, d: CplDescriptor) -> Result<Cpl, ShowLoaderError> {
    let id = Uuid::parse(&d.id).map_err(|source| ShowLoaderError::Id { path: path.to_string(), source })?;
    let mut builder = CplBuilder::new(id);
    for reel in d.reels {
        builder = builder.add_reel(build_reel(path, reel)?);
    }
    Ok(builder.build())
}

/// Reads each descriptor in `paths`, builds a [`Cpl`] from it, and appends
/// it to a fresh [`Show`]'s timeline in order. Returns an error (appending
/// nothing further) on the first unreadable, malformed, or empty-reel-list
/// descriptor, or if the resulting show has zero length.
pub fn build_show(sample_rate: u32, paths: &[String]) -> Result<Show, ShowLoaderError> {
    let mut show = Show::new(sample_rate);
    for path in paths {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ShowLoaderError::Read { path: path.clone(), source })?;
        let descriptor: CplDescriptor =
            serde_json::from_str(&text).map_err(|source| ShowLoaderError::Parse { path: path.clone(), source })?;
        if descriptor.reels.is_empty() {
            return Err(ShowLoaderError::EmptyCpl { path: path.clone() });
        }
        let cpl = build_cpl(path, descriptor)?;
        show.add_cpl_to_end_of_timeline(cpl);
    }
    if show.length_in_frames() <= 0 {
        return Err(ShowLoaderError::EmptyShow);
    }
    Ok(show)
}
