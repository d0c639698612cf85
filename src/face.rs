use ttf_parser::GlyphId;

use crate::buffer::Buffer;
use crate::{Mask, Tag};

/// The font-side services the shaping core consumes.
///
/// The core never parses font binaries itself; the embedder supplies cmap,
/// GSUB introspection and GSUB application through this trait. All methods
/// are conservative oracles: a degraded implementation (for example a font
/// with no GSUB at all) simply answers `false`/`None` and shaping continues
/// without the dependent refinements.
pub trait Face {
    /// Nominal cmap lookup.
    fn glyph_index(&self, codepoint: u32) -> Option<GlyphId>;

    /// Whether the font's GSUB carries any lookup for `feature` under the
    /// chosen script. Features that are absent get no mask slot.
    fn has_feature(&self, feature: Tag) -> bool;

    /// Whether applying `feature` to exactly `glyphs` would substitute them.
    /// With `zero_context`, context-dependent lookups must not match.
    /// Must have no side effects.
    fn would_substitute(&self, feature: Tag, glyphs: &[u32], zero_context: bool) -> bool;

    /// Runs a single GSUB feature over `buffer[start..end)`, restricted to
    /// glyphs whose mask intersects `mask`. Returns the new end of the
    /// range, which may have shrunk (ligation) or grown (multiplication).
    fn apply_feature(
        &self,
        feature: Tag,
        buffer: &mut Buffer,
        start: usize,
        end: usize,
        mask: Mask,
        auto_zwnj: bool,
        auto_zwj: bool,
    ) -> usize;
}
