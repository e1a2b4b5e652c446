//! Aux-data responder, the server half of §4.9.
//!
//! MXF essence-file reading is an explicit external collaborator (an
//! injected reader returns the bytes for a given edit unit); this module
//! only walks the show timeline to figure out which asset and edit unit
//! each requested index falls in, and serializes the result.

use crate::codec::{AuxDataBlock, AuxDataBlockTransferHeader};
use crate::error::ResponderError;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use dcsync_core::ids::Ul;
use dcsync_core::wire::Writer;
use dcsync_show::{Asset, AssetType, Show};
use serde::Deserialize;
use std::sync::{Arc, RwLock};

/// Returns the raw essence bytes for one edit unit of `asset`. Implemented
/// outside this crate against whatever MXF reader the host provides.
pub trait EssenceReader: Send + Sync {
    /// # Errors
    /// Returns an I/O error if the edit unit cannot be read.
    fn read_edit_unit(&self, asset: &Asset, edit_unit_index: u32) -> std::io::Result<Vec<u8>>;
}

pub struct ResponderState {
    pub show: RwLock<Show>,
    pub reader: Arc<dyn EssenceReader>,
}

#[derive(Debug, Deserialize)]
pub struct AuxDataRequest {
    pub coding_ul: String,
    pub start: u32,
    pub count: u32,
    #[allow(dead_code)]
    pub accept: String,
}

/// Walks the show timeline starting at `start`, reading up to `count` edit
/// units of aux-data essence. Crossing from one aux-data asset to the next
/// is transparent; running off the end of the last asset truncates the
/// result rather than erroring.
///
/// # Errors
/// Returns [`ResponderError::NoCoveringAsset`] if `start` itself isn't
/// covered by any aux-data asset, or a codec/I/O error from a later step.
pub fn build_response(
    show: &Show,
    reader: &dyn EssenceReader,
    coding_ul: Ul,
    start: u32,
    count: u32,
) -> Result<Vec<u8>, ResponderError> {
    let end = start.saturating_add(count);
    let mut blocks = Vec::new();
    let mut index = start;

    while index < end {
        let Some(asset) = show.asset_for_frame(index as i32, AssetType::AuxData) else {
            if index == start {
                return Err(ResponderError::NoCoveringAsset { start });
            }
            break;
        };

        let asset_end = asset.end_frame().unwrap_or(index as i32).max(index as i32);
        #[allow(clippy::cast_sign_loss)]
        let run_end = (u32::try_from(asset_end).unwrap_or(index) + 1).min(end);

        for edit_unit_index in index..run_end {
            let data = reader.read_edit_unit(asset, edit_unit_index)?;
            blocks.push(AuxDataBlock {
                edit_unit_index,
                edit_rate_num: i32::try_from(asset.edit_rate.numerator).unwrap_or(i32::MAX),
                edit_rate_den: i32::try_from(asset.edit_rate.denominator).unwrap_or(1),
                source_data_essence_coding_ul: coding_ul,
                source_data_item: data,
                source_cryptographic_context: Vec::new(),
            });
        }
        index = run_end;
    }

    let header = AuxDataBlockTransferHeader::new(
        start,
        u32::try_from(blocks.len()).unwrap_or(u32::MAX),
    );
    let mut w = Writer::with_capacity(64 + blocks.len() * 64);
    header.encode(&mut w);
    for block in &blocks {
        block.encode(&mut w);
    }
    Ok(w.into_inner())
}

async fn handle_get_edit_units(
    State(state): State<Arc<ResponderState>>,
    Query(request): Query<AuxDataRequest>,
) -> Response {
    let Ok(coding_ul) = Ul::parse(&request.coding_ul) else {
        return (StatusCode::BAD_REQUEST, "invalid coding_UL").into_response();
    };

    let show = state.show.read().expect("show lock poisoned");
    match build_response(&show, state.reader.as_ref(), coding_ul, request.start, request.count) {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(ResponderError::NoCoveringAsset { start }) => {
            tracing::warn!(start, "no aux-data asset covers the requested start index");
            (StatusCode::NOT_FOUND, "no aux-data asset covers the requested start index")
                .into_response()
        },
        Err(err) => {
            tracing::warn!(%err, "aux-data responder failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        },
    }
}

#[must_use]
pub fn router(state: Arc<ResponderState>) -> Router {
    Router::new().route("/v1/auxdata/editunits", get(handle_get_edit_units)).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcsync_core::editrate::EditRate;
    use dcsync_core::ids::Uuid;
    use dcsync_show::{AssetBuilder, CplBuilder, ReelBuilder};

    struct FixedReader;
    impl EssenceReader for FixedReader {
        fn read_edit_unit(&self, _asset: &Asset, edit_unit_index: u32) -> std::io::Result<Vec<u8>> {
            Ok(vec![edit_unit_index as u8])
        }
    }

    fn show_with_one_aux_asset(duration: i32) -> Show {
        let mut show = Show::new(48_000);
        let picture = AssetBuilder::new(AssetType::MainPicture, Uuid::from_bytes([2; 16]))
            .edit_rate(EditRate::FPS_24)
            .duration(duration)
            .build();
        let aux = AssetBuilder::new(AssetType::AuxData, Uuid::from_bytes([3; 16]))
            .edit_rate(EditRate::FPS_24)
            .duration(duration)
            .build();
        let cpl = CplBuilder::new(Uuid::from_bytes([1; 16]))
            .add_reel(
                ReelBuilder::new(Uuid::from_bytes([9; 16])).add_asset(picture).add_asset(aux).build(),
            )
            .build();
        show.add_cpl_to_end_of_timeline(cpl);
        show
    }

    #[test]
    fn reads_the_requested_window() {
        let show = show_with_one_aux_asset(100);
        let body =
            build_response(&show, &FixedReader, Ul::from_bytes([7; 16]), 10, 5).unwrap();
        let mut r = dcsync_core::wire::Reader::new(&body);
        let header = AuxDataBlockTransferHeader::decode(&mut r).unwrap();
        assert_eq!(header.edit_unit_range_start_index, 10);
        assert_eq!(header.edit_unit_range_count, 5);
        for expected in 10u32..15 {
            let block = AuxDataBlock::decode(&mut r).unwrap();
            assert_eq!(block.edit_unit_index, expected);
        }
    }

    #[test]
    fn truncates_at_the_end_of_the_covering_asset() {
        let show = show_with_one_aux_asset(20);
        let body =
            build_response(&show, &FixedReader, Ul::from_bytes([7; 16]), 15, 10).unwrap();
        let mut r = dcsync_core::wire::Reader::new(&body);
        let header = AuxDataBlockTransferHeader::decode(&mut r).unwrap();
        assert_eq!(header.edit_unit_range_count, 5);
    }

    #[test]
    fn start_outside_any_asset_is_an_error() {
        let show = show_with_one_aux_asset(10);
        let err = build_response(&show, &FixedReader, Ul::from_bytes([7; 16]), 100, 5).unwrap_err();
        assert!(matches!(err, ResponderError::NoCoveringAsset { start: 100 }));
    }
}
