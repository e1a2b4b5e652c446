//! `ShowManager`: owns a [`Show`] behind a load/reset lifecycle (§4.12).
//!
//! CPL/ASSETMAP XML parsing is out of scope here; `add_cpl`/`add_cpl_list`
//! accept already-built [`Cpl`] values from an external parser rather
//! than file paths, unlike the original's path-based `AddCPL`.

use crate::cpl::Cpl;
use crate::show::Show;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShowManagerError {
    #[error("CPL has no reels")]
    EmptyCpl,
}

pub struct ShowManager {
    sample_rate: u32,
    pending: Vec<Cpl>,
    show: Option<Show>,
    loaded: bool,
}

impl ShowManager {
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate, pending: Vec::new(), show: None, loaded: false }
    }

    /// Queues a single CPL for the next `load`. Rejects (and queues
    /// nothing) a CPL with no reels.
    pub fn add_cpl(&mut self, cpl: Cpl) -> Result<(), ShowManagerError> {
        if cpl.reels.is_empty() {
            return Err(ShowManagerError::EmptyCpl);
        }
        self.pending.push(cpl);
        Ok(())
    }

    /// Queues every CPL in `cpls`, but only if all of them are valid —
    /// a single empty CPL rejects the whole list and queues nothing.
    pub fn add_cpl_list(&mut self, cpls: Vec<Cpl>) -> Result<(), ShowManagerError> {
        if cpls.iter().any(|cpl| cpl.reels.is_empty()) {
            return Err(ShowManagerError::EmptyCpl);
        }
        self.pending.extend(cpls);
        Ok(())
    }

    /// Clears the loaded show and any queued CPLs.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.show = None;
        self.loaded = false;
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Builds a [`Show`] from every queued CPL, in the order queued.
    /// Succeeds only if the resulting show has nonzero length.
    pub fn load(&mut self) -> bool {
        let mut show = Show::new(self.sample_rate);
        for cpl in self.pending.drain(..) {
            show.add_cpl_to_end_of_timeline(cpl);
        }
        self.loaded = show.length_in_frames() > 0;
        self.show = Some(show);
        self.loaded
    }

    #[must_use]
    pub fn show(&self) -> Option<&Show> {
        self.show.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetBuilder, AssetType};
    use crate::cpl::CplBuilder;
    use crate::reel::ReelBuilder;
    use dcsync_core::ids::Uuid;

    fn cpl_with_one_reel() -> Cpl {
        let picture =
            AssetBuilder::new(AssetType::MainPicture, Uuid::from_bytes([2; 16])).duration(10).build();
        CplBuilder::new(Uuid::from_bytes([1; 16]))
            .add_reel(ReelBuilder::new(Uuid::from_bytes([3; 16])).add_asset(picture).build())
            .build()
    }

    #[test]
    fn load_succeeds_with_nonempty_cpls() {
        let mut manager = ShowManager::new(48_000);
        manager.add_cpl(cpl_with_one_reel()).unwrap();
        assert!(manager.load());
        assert!(manager.is_loaded());
        assert_eq!(manager.show().unwrap().length_in_frames(), 10);
    }

    #[test]
    fn empty_cpl_list_rejects_the_whole_batch() {
        let mut manager = ShowManager::new(48_000);
        let empty = Cpl { id: Uuid::from_bytes([9; 16]), reels: Vec::new() };
        let err = manager.add_cpl_list(vec![cpl_with_one_reel(), empty]).unwrap_err();
        assert_eq!(err, ShowManagerError::EmptyCpl);
        assert!(!manager.load());
    }

    #[test]
    fn reset_clears_loaded_state() {
        let mut manager = ShowManager::new(48_000);
        manager.add_cpl(cpl_with_one_reel()).unwrap();
        manager.load();
        manager.reset();
        assert!(!manager.is_loaded());
        assert!(manager.show().is_none());
    }
}
