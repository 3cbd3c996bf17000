//! Shared types for the Ridgeline terrain renderer.
//!
//! Device-independent vocabulary used by the effect layer, the renderer
//! consumers and the capability tooling: effect and filter identifiers,
//! chipset classification types and opaque device handles.

pub mod caps;
pub mod constants;
pub mod effect;
pub mod handles;

pub use caps::{AdapterIdentity, ChipsetId, DeviceCaps, ParseChipsetError, ShaderVersion, VendorId};
pub use constants::*;
pub use effect::{EffectId, FilterId, FilterMode};
pub use handles::{GeometryHandle, ShaderHandle, SurfaceHandle, Texel565, TextureHandle};
