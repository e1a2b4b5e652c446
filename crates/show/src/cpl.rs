//! `Cpl`: an ordered sequence of [`Reel`]s (§3).

use crate::reel::Reel;
use dcsync_core::ids::Uuid;

#[derive(Debug, Clone, Default)]
pub struct Cpl {
    pub id: Uuid,
    pub reels: Vec<Reel>,
}

#[derive(Debug, Clone, Default)]
pub struct CplBuilder {
    cpl: Cpl,
}

impl CplBuilder {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self { cpl: Cpl { id, reels: Vec::new() } }
    }

    #[must_use]
    pub fn add_reel(mut self, reel: Reel) -> Self {
        self.cpl.reels.push(reel);
        self
    }

    #[must_use]
    pub fn build(self) -> Cpl {
        self.cpl
    }
}
