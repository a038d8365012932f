//! Thumbnail validation seam.
//!
//! A cached thumbnail that cannot be decoded is treated as corrupt: it is
//! purged from the index and deleted. The check is injected so callers can
//! choose how strict it is.

/// Decides whether cached thumbnail bytes are usable.
pub trait ThumbnailDecoder: Send + Sync {
    /// Returns `true` if the bytes decode to an image.
    fn decode(&self, bytes: &[u8]) -> bool;
}

/// Accepts any bytes the `image` crate can decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl ThumbnailDecoder for ImageDecoder {
    fn decode(&self, bytes: &[u8]) -> bool {
        image::load_from_memory(bytes).is_ok()
    }
}

/// Accepts every non-empty payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ThumbnailDecoder for AcceptAll {
    #[inline]
    fn decode(&self, bytes: &[u8]) -> bool {
        !bytes.is_empty()
    }
}
