//! Opaque device handles.
//!
//! Handles are plain integers issued by the device wrapper. Zero is never
//! issued and acts as the null handle for every kind.

use bytemuck::{Pod, Zeroable};

macro_rules! device_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Invalid/null handle
            pub const INVALID: $name = $name(0);

            #[inline]
            pub fn is_valid(self) -> bool {
                self.0 != 0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }
    };
}

device_handle!(
    /// Handle to a texture owned by the device (loaded asset or render target).
    TextureHandle
);

device_handle!(
    /// Handle to a colour or depth surface.
    SurfaceHandle
);

device_handle!(
    /// Handle to a compiled pixel-shader program.
    ShaderHandle
);

device_handle!(
    /// Handle to a batch of consumer geometry (vertex + index buffers).
    GeometryHandle
);

/// One 16-bit R5G6B5 texel.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Texel565(pub u16);

impl Texel565 {
    /// Pack 8-bit channels, dropping the low bits.
    #[inline]
    pub fn pack(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3))
    }

    /// Green channel widened back to 8 bits.
    #[inline]
    pub fn green(self) -> u8 {
        (((self.0 >> 5) & 0x3f) << 2) as u8
    }

    /// Red channel widened back to 8 bits.
    #[inline]
    pub fn red(self) -> u8 {
        (((self.0 >> 11) & 0x1f) << 3) as u8
    }

    /// Blue channel widened back to 8 bits.
    #[inline]
    pub fn blue(self) -> u8 {
        ((self.0 & 0x1f) << 3) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handles_are_invalid() {
        assert!(!TextureHandle::INVALID.is_valid());
        assert!(!TextureHandle::default().is_valid());
        assert!(SurfaceHandle(3).is_valid());
    }

    #[test]
    fn texel_keeps_high_bits() {
        let t = Texel565::pack(0xff, 0xff, 0xff);
        assert_eq!(t.0, 0xffff);
        assert_eq!(t.green(), 0xfc);

        let t = Texel565::pack(0, 0x80, 0);
        assert_eq!(t.red(), 0);
        assert_eq!(t.green(), 0x80);
        assert_eq!(t.blue(), 0);
    }
}
