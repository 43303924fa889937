//! Logical compute device a camera view is pinned to.
//!
//! The pipeline stages views on the host and hands them to whichever
//! backend renders them, so the device here is a placement tag the renderer
//! reads, not a live context. Resolving a tag from a config string is
//! explicit and fallible, which lets [`Camera`](crate::Camera) apply its
//! warn-and-fall-back policy instead of aborting a whole capture load.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to resolve a device string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The string names no known device kind.
    #[error("unrecognized device '{0}' (expected \"cpu\", \"gpu\" or \"gpu:<index>\")")]
    Unrecognized(String),

    /// The adapter index after the colon is not a number.
    #[error("invalid adapter index in device '{0}'")]
    InvalidIndex(String),
}

/// A logical compute target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    /// Host memory / CPU rendering path.
    Cpu,
    /// Accelerator adapter, by enumeration index.
    Gpu(u32),
}

impl Device {
    /// Placement used when a requested device cannot be resolved.
    pub const FALLBACK: Device = Device::Gpu(0);
}

impl Default for Device {
    fn default() -> Self {
        Device::FALLBACK
    }
}

impl FromStr for Device {
    type Err = DeviceError;

    /// Resolve a device name.
    ///
    /// Accepts `"cpu"`, `"gpu"`, `"gpu:<index>"` and the torch-style
    /// spellings `"cuda"` / `"cuda:<index>"` that appear in existing
    /// capture configs. Matching is case-insensitive and ignores
    /// surrounding whitespace.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let normalized = name.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "cpu" => return Ok(Device::Cpu),
            "gpu" | "cuda" => return Ok(Device::Gpu(0)),
            _ => {}
        }
        for prefix in ["gpu:", "cuda:"] {
            if let Some(index) = normalized.strip_prefix(prefix) {
                return index
                    .parse::<u32>()
                    .map(Device::Gpu)
                    .map_err(|_| DeviceError::InvalidIndex(name.to_string()));
            }
        }
        Err(DeviceError::Unrecognized(name.to_string()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Gpu(index) => write!(f, "gpu:{index}"),
        }
    }
}
