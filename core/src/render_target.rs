//! Off-screen scratch target shared by the screen filters.
//!
//! One colour texture the size of the back buffer. While redirected, the
//! surfaces that were bound before are held so they can be put back.

use log::{debug, warn};
use ridgeline_shared::{SurfaceHandle, TextureHandle};

use crate::device::{Device, RenderTexture};
use crate::error::RenderTargetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SavedTarget {
    color: SurfaceHandle,
    depth: SurfaceHandle,
}

/// The scratch texture and the redirect it is part of, if any.
#[derive(Debug, Default)]
pub struct RenderToTextureScratch {
    target: Option<RenderTexture>,
    saved: Option<SavedTarget>,
}

impl RenderToTextureScratch {
    /// Allocate the scratch texture at back-buffer size.
    ///
    /// Releases any previous allocation first. On failure the scratch is
    /// left unavailable.
    pub fn allocate(&mut self, device: &mut dyn Device) -> Result<(), RenderTargetError> {
        self.release(device);
        let (width, height) = device.back_buffer_size();
        let target = device.create_render_texture(width, height)?;
        debug!("Render-to-texture scratch {width}x{height} allocated");
        self.target = Some(target);
        Ok(())
    }

    /// Free the scratch texture, ending a redirect still in progress.
    pub fn release(&mut self, device: &mut dyn Device) {
        if self.saved.is_some() {
            if let Err(e) = self.end(device) {
                warn!("Render target not restored on release: {e}");
            }
        }
        if let Some(target) = self.target.take() {
            device.release_surface(target.surface);
            device.release_texture(target.texture);
        }
    }

    pub fn is_available(&self) -> bool {
        self.target.is_some()
    }

    pub fn is_redirected(&self) -> bool {
        self.saved.is_some()
    }

    /// Scratch texture, invalid when not allocated.
    pub fn texture(&self) -> TextureHandle {
        self.target.map(|t| t.texture).unwrap_or_default()
    }

    /// Point rendering at the scratch texture, keeping the depth surface.
    pub fn begin(&mut self, device: &mut dyn Device) -> Result<(), RenderTargetError> {
        let Some(target) = self.target else {
            return Err(RenderTargetError::Unavailable);
        };
        if self.saved.is_some() {
            return Err(RenderTargetError::AlreadyRedirected);
        }
        let saved = SavedTarget {
            color: device.render_target()?,
            depth: device.depth_surface()?,
        };
        device.set_render_target(target.surface, saved.depth)?;
        self.saved = Some(saved);
        Ok(())
    }

    /// Put the previous render target back and return the captured texture.
    pub fn end(&mut self, device: &mut dyn Device) -> Result<TextureHandle, RenderTargetError> {
        let Some(saved) = self.saved.take() else {
            return Err(RenderTargetError::NotRedirected);
        };
        device.set_render_target(saved.color, saved.depth)?;
        Ok(self.texture())
    }
}

/// Ends a redirect when dropped.
///
/// Call [`RenderTargetGuard::finish`] to get the captured texture and see
/// restore errors; a plain drop only logs them.
pub struct RenderTargetGuard<'a> {
    scratch: &'a mut RenderToTextureScratch,
    device: &'a mut dyn Device,
    finished: bool,
}

impl<'a> RenderTargetGuard<'a> {
    /// Start a redirect that lasts as long as the guard.
    pub fn begin(
        scratch: &'a mut RenderToTextureScratch,
        device: &'a mut dyn Device,
    ) -> Result<Self, RenderTargetError> {
        scratch.begin(device)?;
        Ok(Self {
            scratch,
            device,
            finished: false,
        })
    }

    /// Device to draw with while redirected.
    pub fn device(&mut self) -> &mut dyn Device {
        &mut *self.device
    }

    pub fn finish(mut self) -> Result<TextureHandle, RenderTargetError> {
        self.finished = true;
        self.scratch.end(&mut *self.device)
    }
}

impl Drop for RenderTargetGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.scratch.end(&mut *self.device) {
            warn!("Failed to restore render target: {e}");
        }
    }
}
