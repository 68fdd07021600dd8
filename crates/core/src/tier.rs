// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage tiers and the volume layout they map onto.
//!
//! A job asks for an arbitrary number of bytes of working-directory space.
//! Admission rounds that request up to one of a few fixed tiers, and each
//! tier owns a distinct volume root on disk.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

const MIB: u64 = 1024 * 1024;

/// Default root under which tier volumes live.
pub const DEFAULT_VOLUME_ROOT: &str = "/var/lib/jobrunner/volumes";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TierError {
    #[error("requested {requested} bytes exceeds largest storage tier ({largest} bytes)")]
    ExceedsLargest { requested: u64, largest: u64 },
    #[error("{0} bytes is not a storage tier size")]
    UnknownTier(u64),
}

/// Fixed storage quota buckets, ordered smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageTier {
    Small,
    Medium,
    Large,
}

impl StorageTier {
    pub const ALL: [StorageTier; 3] = [StorageTier::Small, StorageTier::Medium, StorageTier::Large];

    pub fn bytes(self) -> u64 {
        match self {
            StorageTier::Small => 10 * MIB,
            StorageTier::Medium => 25 * MIB,
            StorageTier::Large => 50 * MIB,
        }
    }

    /// Directory name of this tier's volume under the layout root.
    pub fn dir_name(self) -> &'static str {
        match self {
            StorageTier::Small => "10mb",
            StorageTier::Medium => "25mb",
            StorageTier::Large => "50mb",
        }
    }

    /// Round a request up to the smallest tier that can hold it.
    pub fn quantize(requested: u64) -> Result<Self, TierError> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.bytes() >= requested)
            .ok_or(TierError::ExceedsLargest {
                requested,
                largest: StorageTier::Large.bytes(),
            })
    }

    /// Recover a tier from an already-quantized byte count.
    pub fn from_bytes(bytes: u64) -> Result<Self, TierError> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.bytes() == bytes)
            .ok_or(TierError::UnknownTier(bytes))
    }
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Maps each tier to its volume directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeLayout {
    root: PathBuf,
}

impl VolumeLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn volume_for(&self, tier: StorageTier) -> PathBuf {
        self.root.join(tier.dir_name())
    }
}

impl Default for VolumeLayout {
    fn default() -> Self {
        Self::new(DEFAULT_VOLUME_ROOT)
    }
}

#[cfg(test)]
#[path = "tier_tests.rs"]
mod tests;
