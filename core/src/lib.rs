//! Ridgeline Core - shader capability negotiation and terrain effects
//!
//! This crate sits between the terrain, road and water renderers and the
//! graphics-device wrapper. It probes what the adapter can do, picks one
//! implementation per logical effect, and hands out the render state for
//! every pass of every effect at draw time.
//!
//! # Architecture
//!
//! - [`ShaderManager`] - Negotiation and the per-frame `set_shader` / `reset_shader` protocol
//! - [`EffectVariant`] - One hardware-specific way of drawing one or more effects
//! - [`FilterManager`] - Full-screen post filters (black and white, motion blur, crossfade)
//! - [`ShroudRenderer`] - Fog-of-war grid and its device texture
//! - [`RenderContext`] - Owner tying all of the above to the device lifetime

pub mod config;
pub mod consumer;
pub mod context;
pub mod device;
pub mod effect;
pub mod error;
pub mod filter;
pub mod manager;
pub mod probe;
pub mod render_target;
pub mod shroud;
pub mod state;
#[cfg(test)]
pub mod test_utils;

pub use config::RenderConfig;
pub use context::{FrameParts, RenderContext};
pub use device::{Device, RenderTexture, ScreenQuad, ScreenVertex, TextureLoader, Viewport};
pub use effect::{EffectCatalog, EffectVariant, PassOptions, SceneInputs, ShroudProjection};
pub use error::{DeviceError, RenderTargetError, ShaderError};
pub use filter::{FadeDirection, FilterManager, FilterVariant, FramePlan, ScenePass};
pub use manager::{PassStatus, ShaderManager};
pub use probe::{CapabilityProbe, CapabilityReport, caps_from_wgpu, classify_chipset};
pub use shroud::{FogGrid, ShroudLayout, ShroudRenderer, VisibleWindow};
pub use state::{GpuStateSnapshot, StateChange};

// Re-export shared vocabulary for convenience
pub use ridgeline_shared::{ChipsetId, EffectId, FilterId, FilterMode};
