use bitflags::bitflags;

use crate::unicode::{CharExt, GeneralCategory};
use crate::Mask;

bitflags! {
    /// Per-glyph property flags.
    ///
    /// The substitution flags are written by the GSUB engine; the joiner and
    /// default-ignorable flags are set at buffer-entry time from the original
    /// codepoint, because the codepoint field may be cleared by substitution.
    pub struct GlyphPropsFlags: u16 {
        const SUBSTITUTED = 0x0001;
        const LIGATED = 0x0002;
        const MULTIPLIED = 0x0004;
        const ZWNJ = 0x0008;
        const ZWJ = 0x0010;
        const DEFAULT_IGNORABLE = 0x0020;
        const PRESERVE = Self::ZWNJ.bits | Self::ZWJ.bits | Self::DEFAULT_IGNORABLE.bits;
    }
}

bitflags! {
    pub struct BufferScratchFlags: u32 {
        const COMPLEX0 = 0x0100_0000;
        const COMPLEX1 = 0x0200_0000;
        const COMPLEX2 = 0x0400_0000;
        const COMPLEX3 = 0x0800_0000;
    }
}

/// One glyph of a shaping buffer.
#[derive(Clone, Copy, Debug)]
pub struct GlyphInfo {
    /// The original Unicode scalar value. May become 0 after substitution.
    pub codepoint: u32,
    /// The font glyph index, as mapped by cmap upstream.
    pub glyph_id: u32,
    /// Monotone non-decreasing source index. Shrinks under merges only.
    pub cluster: u32,
    /// Lookup mask. Bit 0 is the global bit; bits 8+ hold feature slots.
    pub mask: Mask,
    pub glyph_props: GlyphPropsFlags,
    /// Abstract shaping class. Owned by the active shaper.
    pub category: u8,
    /// Abstract slot used for reordering. Owned by the active shaper.
    pub position: u8,
    /// High nibble: syllable serial (1..15, wrapping). Low nibble: type.
    pub syllable: u8,
}

impl GlyphInfo {
    pub fn is_substituted(&self) -> bool {
        self.glyph_props.contains(GlyphPropsFlags::SUBSTITUTED)
    }

    pub fn is_ligated(&self) -> bool {
        self.glyph_props.contains(GlyphPropsFlags::LIGATED)
    }

    pub fn is_multiplied(&self) -> bool {
        self.glyph_props.contains(GlyphPropsFlags::MULTIPLIED)
    }

    pub fn is_ligated_and_didnt_multiply(&self) -> bool {
        self.is_ligated() && !self.is_multiplied()
    }

    pub fn clear_ligated_and_multiplied(&mut self) {
        self.glyph_props
            .remove(GlyphPropsFlags::LIGATED | GlyphPropsFlags::MULTIPLIED);
    }

    pub fn is_zwj(&self) -> bool {
        self.glyph_props.contains(GlyphPropsFlags::ZWJ)
    }

    pub fn is_zwnj(&self) -> bool {
        self.glyph_props.contains(GlyphPropsFlags::ZWNJ)
    }

    pub fn is_default_ignorable(&self) -> bool {
        self.glyph_props.contains(GlyphPropsFlags::DEFAULT_IGNORABLE)
    }

    pub(crate) fn syllable_type(&self) -> u8 {
        self.syllable & 0x0F
    }
}

/// A mutable glyph run.
///
/// Entries arrive from the upstream text-to-glyph stage in logical order;
/// the shaping core rewrites order, masks and the abstract class bytes.
pub struct Buffer {
    pub info: Vec<GlyphInfo>,
    pub scratch_flags: BufferScratchFlags,
}

impl Buffer {
    pub fn new() -> Self {
        Buffer {
            info: Vec::new(),
            scratch_flags: BufferScratchFlags::empty(),
        }
    }

    pub fn len(&self) -> usize {
        self.info.len()
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }

    /// Appends one mapped glyph, deriving the persistent joiner and
    /// default-ignorable props from the codepoint.
    pub fn push(&mut self, codepoint: u32, glyph_id: u32, cluster: u32) {
        let mut props = GlyphPropsFlags::empty();
        if let Some(c) = std::char::from_u32(codepoint) {
            match codepoint {
                0x200C => props |= GlyphPropsFlags::ZWNJ,
                0x200D => props |= GlyphPropsFlags::ZWJ,
                _ => {}
            }
            if c.is_default_ignorable() || c.general_category() == GeneralCategory::Format {
                props |= GlyphPropsFlags::DEFAULT_IGNORABLE;
            }
        }

        self.info.push(GlyphInfo {
            codepoint,
            glyph_id,
            cluster,
            mask: 0,
            glyph_props: props,
            category: 0,
            position: 0,
            syllable: 0,
        });
    }

    /// Returns the end of the syllable starting at `start`.
    pub fn next_syllable(&self, start: usize) -> usize {
        let mut end = start + 1;
        let syllable = self.info[start].syllable;
        while end < self.len() && self.info[end].syllable == syllable {
            end += 1;
        }
        end
    }

    /// Merges the clusters of `[start, end)` down to their minimum,
    /// extending the range over neighbors that already share a cluster
    /// so that cluster values stay monotone.
    pub fn merge_clusters(&mut self, start: usize, end: usize) {
        if end.saturating_sub(start) < 2 {
            return;
        }

        let mut cluster = self.info[start].cluster;
        for i in start + 1..end {
            cluster = cluster.min(self.info[i].cluster);
        }

        let mut start = start;
        let mut end = end;
        while start > 0 && self.info[start - 1].cluster == self.info[start].cluster {
            start -= 1;
        }
        while end < self.len() && self.info[end - 1].cluster == self.info[end].cluster {
            end += 1;
        }

        for i in start..end {
            self.info[i].cluster = cluster;
        }
    }

    pub fn reverse_range(&mut self, start: usize, end: usize) {
        self.info[start..end].reverse();
    }

    /// Stable insertion sort over `[start, end)`.
    ///
    /// The clusters of every displaced range are merged, so cluster
    /// monotonicity survives the permutation.
    pub fn sort_range<K>(&mut self, start: usize, end: usize, key: K)
    where
        K: Fn(&GlyphInfo) -> u8,
    {
        for i in start + 1..end {
            let mut j = i;
            while j > start && key(&self.info[j - 1]) > key(&self.info[i]) {
                j -= 1;
            }
            if i == j {
                continue;
            }
            // Move item i to occupy place for item j, shift what's in
            // between.
            self.merge_clusters(j, i + 1);
            self.info[j..=i].rotate_right(1);
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_of(clusters: &[u32]) -> Buffer {
        let mut buffer = Buffer::new();
        for (i, &cluster) in clusters.iter().enumerate() {
            buffer.push(0x0915 + i as u32, i as u32 + 1, cluster);
        }
        buffer
    }

    #[test]
    fn merge_clusters_takes_minimum() {
        let mut buffer = buffer_of(&[0, 1, 2, 3]);
        buffer.merge_clusters(1, 3);
        let clusters: Vec<_> = buffer.info.iter().map(|i| i.cluster).collect();
        assert_eq!(clusters, [0, 1, 1, 3]);
    }

    #[test]
    fn merge_clusters_extends_over_equal_neighbors() {
        let mut buffer = buffer_of(&[0, 1, 1, 2]);
        buffer.merge_clusters(2, 4);
        let clusters: Vec<_> = buffer.info.iter().map(|i| i.cluster).collect();
        assert_eq!(clusters, [0, 1, 1, 1]);
    }

    #[test]
    fn push_marks_joiners() {
        let mut buffer = Buffer::new();
        buffer.push(0x200D, 5, 0);
        buffer.push(0x200C, 6, 1);
        assert!(buffer.info[0].is_zwj());
        assert!(buffer.info[0].is_default_ignorable());
        assert!(buffer.info[1].is_zwnj());
    }
}
