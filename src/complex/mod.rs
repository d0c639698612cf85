pub mod indic;
pub mod indic_machine;
pub mod indic_table;
pub mod khmer;
pub mod khmer_machine;
pub mod myanmar;
pub mod myanmar_machine;

use std::any::Any;

use crate::buffer::{Buffer, BufferScratchFlags, GlyphInfo};
use crate::face::Face;
use crate::ot::{MapBuilder, ShapePlan};
use crate::{script, Script, Tag};

pub(crate) const HAS_BROKEN_SYLLABLE: BufferScratchFlags = BufferScratchFlags::COMPLEX0;

pub(crate) const DOTTED_CIRCLE: u32 = 0x25CC;

#[inline]
pub(crate) const fn flag(n: u32) -> u32 {
    1 << n
}

#[inline]
pub(crate) fn flag_unsafe(n: u32) -> u32 {
    if n < 32 {
        1 << n
    } else {
        0
    }
}

impl GlyphInfo {
    /// If it ligated, all bets are off.
    #[inline]
    pub(crate) fn is_one_of(&self, flags: u32) -> bool {
        if self.is_ligated() {
            return false;
        }
        flag_unsafe(self.category as u32) & flags != 0
    }
}

/// The per-family shaper operations, chosen once per shape call.
pub struct ComplexShaper {
    pub collect_features: fn(&mut MapBuilder),
    pub data_create: fn(&ShapePlan, &dyn Face) -> Box<dyn Any + Send + Sync>,
    /// Assigns the abstract (category, position) bytes.
    pub setup_categories: fn(&mut Buffer),
    /// Tags every glyph with (serial << 4) | syllable-type.
    pub find_syllables: fn(&mut Buffer),
    pub initial_reordering: fn(&ShapePlan, &dyn Face, &mut Buffer),
    pub final_reordering: Option<fn(&ShapePlan, &dyn Face, &mut Buffer)>,
    /// Applied per syllable, in order, between the two reordering passes.
    pub basic_features: &'static [Tag],
    /// Applied per syllable after the final reordering.
    pub other_features: &'static [Tag],
    /// The machine's broken-cluster syllable type value.
    pub broken_cluster_type: u8,
}

pub fn complex_shaper_for(script: Script) -> &'static ComplexShaper {
    match script {
        script::KHMER => &khmer::KHMER_SHAPER,
        script::MYANMAR => &myanmar::MYANMAR_SHAPER,
        _ => &indic::INDIC_SHAPER,
    }
}

/// Repairs broken clusters by inserting a dotted circle before the first
/// glyph of each one. Returns true when at least one was inserted; the
/// caller must then re-run category setup and syllable finding so serials
/// stay contiguous and the repaired clusters re-classify.
pub(crate) fn insert_dotted_circles(
    face: &dyn Face,
    buffer: &mut Buffer,
    broken_cluster_type: u8,
) -> bool {
    if !buffer.scratch_flags.contains(HAS_BROKEN_SYLLABLE) {
        return false;
    }

    let dotted_circle_glyph = match face.glyph_index(DOTTED_CIRCLE) {
        Some(glyph) => glyph.0 as u32,
        None => return false,
    };

    let mut starts = Vec::new();
    let mut last_syllable = 0;
    for (i, info) in buffer.info.iter().enumerate() {
        if info.syllable != last_syllable {
            last_syllable = info.syllable;
            if info.syllable_type() == broken_cluster_type {
                starts.push(i);
            }
        }
    }

    if starts.is_empty() {
        return false;
    }

    let global_mask = buffer.info[0].mask & 1;
    for &start in starts.iter().rev() {
        // A leading Repha stays in front of its dotted circle, so the
        // repaired cluster still parses as one syllable.
        let insert_at = if buffer.info[start].category == indic::category::REPHA {
            start + 1
        } else {
            start
        };

        let mut dotted_circle = GlyphInfo {
            codepoint: DOTTED_CIRCLE,
            glyph_id: dotted_circle_glyph,
            cluster: buffer.info[start].cluster,
            mask: global_mask,
            ..buffer.info[start]
        };
        dotted_circle.glyph_props = crate::buffer::GlyphPropsFlags::empty();
        buffer.info.insert(insert_at, dotted_circle);
    }

    buffer.scratch_flags.remove(HAS_BROKEN_SYLLABLE);
    true
}
