#[cfg(debug_assertions)]
use std::collections::HashSet;
use std::fmt;

use anyhow::{Context, Result};

use crate::device::{GraphicsBackend, SamplerDesc, TextureId};

use super::Graphics;

/// Opaque handle to a 2-D texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureHandle(TextureId);

impl TextureHandle {
    /// Backend name of the texture.
    pub fn id(self) -> TextureId {
        self.0
    }
}

impl fmt::Display for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "texture#{}", self.0.get())
    }
}

/// Texture-slot occupancy plus, in debug builds, the set of live handles.
#[derive(Debug)]
pub(crate) struct TextureRegistry {
    slots: Vec<Option<TextureHandle>>,
    /// Slot most recently made active on the backend.
    active_slot: Option<u32>,
    #[cfg(debug_assertions)]
    live: HashSet<TextureHandle>,
}

impl TextureRegistry {
    pub fn new(slot_count: u32) -> Self {
        Self {
            slots: vec![None; slot_count as usize],
            active_slot: None,
            #[cfg(debug_assertions)]
            live: HashSet::new(),
        }
    }

    pub fn slot_count(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Releases the occupancy table.
    pub fn release(&mut self) {
        self.slots = Vec::new();
        self.active_slot = None;
    }

    /// Handles loaded but never deleted.
    #[cfg(debug_assertions)]
    pub fn leaked(&self) -> Vec<TextureHandle> {
        self.live.iter().copied().collect()
    }
}

impl<B: GraphicsBackend> Graphics<B> {
    /// Loads an image file into an RGBA8 texture with bilinear
    /// filtering and edge-clamp wrapping.
    ///
    /// `path` goes through the configured [`PathResolver`](crate::asset::PathResolver)
    /// and [`ImageDecoder`](crate::asset::ImageDecoder); the decoded pixels are
    /// released once uploaded.
    pub fn load_texture(&mut self, path: &str) -> Result<TextureHandle> {
        let native = self
            .paths
            .resolve(path)
            .with_context(|| format!("failed to resolve texture path `{path}`"))?;
        let image = self
            .images
            .decode(&native)
            .with_context(|| format!("failed to decode texture `{path}`"))?;

        let expected = u64::from(image.width) * u64::from(image.height) * 4;
        anyhow::ensure!(
            image.pixels.len() as u64 == expected,
            "decoded `{path}` as {}x{} but got {} bytes of pixels, expected {expected}",
            image.width,
            image.height,
            image.pixels.len()
        );

        let id = self
            .backend
            .create_texture(image.width, image.height, &image.pixels, SamplerDesc::default())
            .with_context(|| format!("failed to create texture for `{path}`"))?;
        let (width, height) = (image.width, image.height);
        drop(image);

        // Creation goes through the active slot and leaves it empty.
        if let Some(slot) = self.textures.active_slot {
            self.textures.slots[slot as usize] = None;
        }

        let handle = TextureHandle(id);
        #[cfg(debug_assertions)]
        self.textures.live.insert(handle);

        log::debug!("loaded {handle} ({width}x{height}) from `{path}`");
        Ok(handle)
    }

    /// Binds `texture` to sampler slot `slot`.
    ///
    /// # Panics
    /// If `slot` is not below [`max_texture_slots`](Self::max_texture_slots),
    /// or (debug builds) if `texture` was deleted.
    pub fn bind_texture(&mut self, texture: TextureHandle, slot: u32) {
        assert!(
            slot < self.textures.slot_count(),
            "texture slot {slot} out of range (backend reports {})",
            self.textures.slot_count()
        );
        #[cfg(debug_assertions)]
        assert!(
            self.textures.live.contains(&texture),
            "bind of deleted or unknown {texture}"
        );

        self.backend.bind_texture(slot, Some(texture.0));
        self.textures.slots[slot as usize] = Some(texture);
        self.textures.active_slot = Some(slot);
    }

    /// Frees the texture. Slots it occupied become empty.
    ///
    /// # Panics
    /// In debug builds, if `texture` is unknown or already deleted.
    pub fn delete_texture(&mut self, texture: TextureHandle) {
        #[cfg(debug_assertions)]
        assert!(
            self.textures.live.remove(&texture),
            "double delete or unknown {texture}"
        );

        self.backend.delete_texture(texture.0);
        for slot in self.textures.slots.iter_mut().filter(|s| **s == Some(texture)) {
            *slot = None;
        }
        log::debug!("deleted {texture}");
    }

    /// Texture currently bound at `slot`, if any.
    pub fn texture_in_slot(&self, slot: u32) -> Option<TextureHandle> {
        self.textures.slots.get(slot as usize).copied().flatten()
    }

    /// Number of texture slots reported by the backend at init.
    pub fn max_texture_slots(&self) -> u32 {
        self.textures.slot_count()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::asset::{DecodedImage, ImageDecoder};
    use crate::device::{BackendCall, HeadlessBackend};
    use crate::graphics::system::headless_bare;

    use super::*;

    /// Decodes every path into a solid white image.
    struct Solid(u32, u32);

    impl ImageDecoder for Solid {
        fn decode(&self, _: &Path) -> Result<DecodedImage> {
            Ok(DecodedImage {
                width: self.0,
                height: self.1,
                pixels: vec![255; (self.0 * self.1 * 4) as usize],
            })
        }
    }

    /// Reports dimensions its pixel buffer does not cover.
    struct Truncated;

    impl ImageDecoder for Truncated {
        fn decode(&self, _: &Path) -> Result<DecodedImage> {
            Ok(DecodedImage {
                width: 2,
                height: 2,
                pixels: vec![0; 4],
            })
        }
    }

    struct Missing;

    impl ImageDecoder for Missing {
        fn decode(&self, path: &Path) -> Result<DecodedImage> {
            anyhow::bail!("no such file: {}", path.display())
        }
    }

    fn with_solid() -> Graphics<HeadlessBackend> {
        let mut g = headless_bare();
        g.set_image_decoder(Solid(2, 3));
        g
    }

    #[test]
    fn load_creates_clamped_bilinear_texture() {
        let mut g = with_solid();
        let texture = g.load_texture("textures/brick.png").unwrap();

        assert_eq!(
            g.backend.calls(),
            [BackendCall::CreateTexture {
                texture: texture.id(),
                width: 2,
                height: 3,
                sampler: SamplerDesc::default(),
            }]
        );
    }

    #[test]
    fn decode_failure_is_reported() {
        let mut g = headless_bare();
        g.set_image_decoder(Missing);

        let err = g.load_texture("textures/brick.png").unwrap_err();
        assert!(format!("{err:#}").contains("no such file"));
        assert!(g.backend.calls().is_empty());
    }

    #[test]
    fn short_pixel_buffer_is_rejected_before_upload() {
        let mut g = headless_bare();
        g.set_image_decoder(Truncated);

        let err = g.load_texture("textures/brick.png").unwrap_err();
        assert!(err.to_string().contains("expected 16"));
        assert!(g.backend.calls().is_empty());
    }

    #[test]
    fn bad_path_is_reported() {
        let mut g = with_solid();
        assert!(g.load_texture("../outside.png").is_err());
    }

    #[test]
    fn bind_records_slot_occupancy() {
        let mut g = with_solid();
        let texture = g.load_texture("a.png").unwrap();
        g.backend.take_calls();

        g.bind_texture(texture, 3);

        assert_eq!(
            g.backend.calls(),
            [BackendCall::BindTexture {
                slot: 3,
                texture: Some(texture.id()),
            }]
        );
        assert_eq!(g.texture_in_slot(3), Some(texture));
        assert_eq!(g.texture_in_slot(2), None);
        assert_eq!(g.texture_in_slot(99), None);
    }

    #[test]
    fn loading_clears_the_active_slot() {
        let mut g = with_solid();
        let first = g.load_texture("a.png").unwrap();
        g.bind_texture(first, 0);
        g.bind_texture(first, 5);

        g.load_texture("b.png").unwrap();

        assert_eq!(g.texture_in_slot(0), Some(first));
        assert_eq!(g.texture_in_slot(5), None);
    }

    #[test]
    fn delete_empties_occupied_slots() {
        let mut g = with_solid();
        let texture = g.load_texture("a.png").unwrap();
        g.bind_texture(texture, 0);
        g.bind_texture(texture, 1);

        g.delete_texture(texture);

        assert_eq!(g.texture_in_slot(0), None);
        assert_eq!(g.texture_in_slot(1), None);
        assert_eq!(
            g.backend.calls().last(),
            Some(&BackendCall::DeleteTexture(texture.id()))
        );
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn slot_beyond_maximum_panics() {
        let mut g = with_solid();
        let texture = g.load_texture("a.png").unwrap();
        let slots = g.max_texture_slots();
        g.bind_texture(texture, slots);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "double delete")]
    fn double_delete_panics() {
        let mut g = with_solid();
        let texture = g.load_texture("a.png").unwrap();
        g.delete_texture(texture);
        g.delete_texture(texture);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn leaked_textures_are_tracked() {
        let mut g = with_solid();
        let kept = g.load_texture("a.png").unwrap();
        let freed = g.load_texture("b.png").unwrap();
        g.delete_texture(freed);

        assert_eq!(g.textures.leaked(), [kept]);
    }
}
