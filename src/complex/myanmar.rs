//! The Myanmar shaper.
//!
//! Myanmar reorders once, before GSUB: the kinzi prefix is tagged to land
//! after the main consonant, the medial Ra and the left vowel go in front,
//! and everything else is assigned a slot and stable-sorted. There is no
//! post-GSUB reordering pass.

use std::any::Any;

use log::trace;

use super::indic::{category, position};
use super::indic_table;
use super::myanmar_machine::{find_syllables_myanmar, SyllableType};
use super::ComplexShaper;
use crate::buffer::{Buffer, GlyphInfo};
use crate::face::Face;
use crate::ot::{feature, FeatureFlags, MapBuilder, ShapePlan};
use crate::Tag;

pub(crate) mod myanmar_category {
    /// Asat, U+103A.
    pub const AS: u8 = 18;
    /// Digit zero, U+1040.
    pub const D0: u8 = 13;
    /// Digits except zero.
    pub const D: u8 = 14;
    /// Medial Ha.
    pub const MH: u8 = 21;
    /// Medial Ra: visually pre-base.
    pub const MR: u8 = 22;
    /// Medial Wa.
    pub const MW: u8 = 23;
    /// Medial Ya.
    pub const MY: u8 = 24;
    /// Pwo and other tone marks.
    pub const PT: u8 = 25;
    pub const VABV: u8 = 26;
    pub const VBLW: u8 = 27;
    pub const VPRE: u8 = 28;
    pub const VPST: u8 = 29;
    /// Variation selectors.
    pub const VS: u8 = 30;
    /// Punctuation.
    pub const P: u8 = 31;
}

const MYANMAR_FEATURES: &[(Tag, FeatureFlags)] = &[
    // Basic features, applied in order, one syllable at a time.
    (feature::REPH_FORMS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::PRE_BASE_FORMS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::BELOW_BASE_FORMS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::POST_BASE_FORMS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    // Other features, applied after the basic ones.
    (feature::PRE_BASE_SUBSTITUTIONS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::ABOVE_BASE_SUBSTITUTIONS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::BELOW_BASE_SUBSTITUTIONS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::POST_BASE_SUBSTITUTIONS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
];

const BASIC_FEATURES: &[Tag] = &[
    feature::REPH_FORMS,
    feature::PRE_BASE_FORMS,
    feature::BELOW_BASE_FORMS,
    feature::POST_BASE_FORMS,
];

const OTHER_FEATURES: &[Tag] = &[
    feature::PRE_BASE_SUBSTITUTIONS,
    feature::ABOVE_BASE_SUBSTITUTIONS,
    feature::BELOW_BASE_SUBSTITUTIONS,
    feature::POST_BASE_SUBSTITUTIONS,
];

pub struct MyanmarShapePlan {}

fn collect_features(builder: &mut MapBuilder) {
    for &(tag, flags) in MYANMAR_FEATURES {
        builder.add_feature(tag, flags);
    }
}

fn data_create(_plan: &ShapePlan, _face: &dyn Face) -> Box<dyn Any + Send + Sync> {
    Box::new(MyanmarShapePlan {})
}

pub(crate) fn set_myanmar_properties(info: &mut GlyphInfo) {
    let u = info.codepoint;
    let (mut cat, pos) = indic_table::get_category_and_position(u);

    match u {
        0x200D => cat = category::ZWJ,
        0x200C => cat = category::ZWNJ,
        0x25CC => cat = category::DOTTED_CIRCLE,
        // MYANMAR SYMBOL AFOREMENTIONED shapes like a consonant even
        // though IndicSyllabicCategory disagrees.
        0x104E => cat = category::C,
        0x1004 | 0x101B | 0x105A => cat = category::RA,
        0x1032 | 0x1036 => cat = category::A,
        0x103A => cat = myanmar_category::AS,
        0x1039 => cat = category::H,
        0x103B | 0x105E..=0x105F => cat = myanmar_category::MY,
        0x103C => cat = myanmar_category::MR,
        0x103D | 0x1082 => cat = myanmar_category::MW,
        0x103E | 0x1060 => cat = myanmar_category::MH,
        0x1037 => cat = category::N,
        0x1040 => cat = myanmar_category::D0,
        0x1041..=0x1049 | 0x1090..=0x1099 => cat = myanmar_category::D,
        0x1063..=0x1064 | 0x1069..=0x106D | 0x1087..=0x108D | 0x108F | 0x109A..=0x109C => {
            cat = myanmar_category::PT
        }
        0x104A..=0x104B => cat = myanmar_category::P,
        0xFE00..=0xFE0F => cat = myanmar_category::VS,
        _ => {}
    }

    if cat == category::M {
        cat = match pos {
            position::PRE_M => myanmar_category::VPRE,
            position::ABOVE_C => myanmar_category::VABV,
            position::BELOW_C => myanmar_category::VBLW,
            _ => myanmar_category::VPST,
        };
    }

    info.category = cat;
    info.position = pos;
}

fn setup_categories(buffer: &mut Buffer) {
    for info in &mut buffer.info {
        set_myanmar_properties(info);
    }
}

fn is_consonant(info: &GlyphInfo) -> bool {
    info.is_one_of(
        super::flag(category::C as u32)
            | super::flag(category::CS as u32)
            | super::flag(category::RA as u32)
            | super::flag(category::V as u32)
            | super::flag(category::PLACEHOLDER as u32)
            | super::flag(category::DOTTED_CIRCLE as u32),
    )
}

fn reorder(_plan: &ShapePlan, _face: &dyn Face, buffer: &mut Buffer) {
    let mut start = 0;
    while start < buffer.len() {
        let end = buffer.next_syllable(start);
        let syllable_type = buffer.info[start].syllable_type();
        if syllable_type == SyllableType::ConsonantSyllable as u8
            || syllable_type == SyllableType::BrokenCluster as u8
        {
            initial_reordering_consonant_syllable(buffer, start, end);
        }
        start = end;
    }
}

fn initial_reordering_consonant_syllable(buffer: &mut Buffer, start: usize, end: usize) {
    let mut base = end;
    let mut has_reph = false;

    {
        let mut limit = start;
        if start + 3 <= end
            && buffer.info[start].category == category::RA
            && buffer.info[start + 1].category == myanmar_category::AS
            && buffer.info[start + 2].category == category::H
        {
            limit += 3;
            base = start;
            has_reph = true;
        }

        if !has_reph {
            base = limit;
        }

        for i in limit..end {
            if is_consonant(&buffer.info[i]) {
                base = i;
                break;
            }
        }
    }

    // Reorder!
    {
        let mut i = start;

        // The kinzi lands after the main consonant.
        let kinzi_end = start + if has_reph { 3 } else { 0 };
        while i < kinzi_end {
            buffer.info[i].position = position::AFTER_MAIN;
            i += 1;
        }

        while i < base {
            buffer.info[i].position = position::PRE_C;
            i += 1;
        }

        if i < end {
            buffer.info[i].position = position::BASE_C;
            i += 1;
        }

        let mut pos = position::AFTER_MAIN;
        // The following loop may be ugly, but it implements all of
        // Myanmar reordering!
        while i < end {
            // Pre-base reordering medial Ra.
            if buffer.info[i].category == myanmar_category::MR {
                buffer.info[i].position = position::PRE_C;
                i += 1;
                continue;
            }
            // Left matra.
            if buffer.info[i].position < position::BASE_C {
                i += 1;
                continue;
            }
            if buffer.info[i].category == myanmar_category::VS {
                buffer.info[i].position = buffer.info[i - 1].position;
                i += 1;
                continue;
            }

            if pos == position::AFTER_MAIN && buffer.info[i].category == myanmar_category::VBLW
            {
                pos = position::BELOW_C;
                buffer.info[i].position = pos;
                i += 1;
                continue;
            }

            if pos == position::BELOW_C && buffer.info[i].category == category::A {
                buffer.info[i].position = position::BEFORE_SUB;
                i += 1;
                continue;
            }
            if pos == position::BELOW_C && buffer.info[i].category == myanmar_category::VBLW {
                buffer.info[i].position = pos;
                i += 1;
                continue;
            }
            if pos == position::BELOW_C && buffer.info[i].category != category::A {
                pos = position::AFTER_SUB;
                buffer.info[i].position = pos;
                i += 1;
                continue;
            }

            buffer.info[i].position = pos;
            i += 1;
        }
    }

    {
        // Use syllable() for sort accounting temporarily.
        let syllable = buffer.info[start].syllable;
        for i in start..end {
            buffer.info[i].syllable = (i - start) as u8;
        }

        // Sit tight, rock 'n roll!
        buffer.sort_range(start, end, |info| info.position);

        // Find base again, and flip left-matra sequences while at it.
        // https://github.com/harfbuzz/harfbuzz/issues/3863
        let mut base = end;
        let mut first_left_matra = end;
        let mut last_left_matra = end;
        for i in start..end {
            if buffer.info[i].position == position::BASE_C {
                base = i;
                break;
            } else if buffer.info[i].position == position::PRE_M {
                if first_left_matra == end {
                    first_left_matra = i;
                }
                last_left_matra = i;
            }
        }

        if first_left_matra < last_left_matra {
            buffer.merge_clusters(first_left_matra, last_left_matra + 1);
            buffer.reverse_range(first_left_matra, last_left_matra + 1);
            let mut i = first_left_matra;
            for j in i..=last_left_matra {
                if buffer.info[j].category == myanmar_category::VPRE {
                    buffer.reverse_range(i, j + 1);
                    i = j + 1;
                }
            }
        }

        // Check the sort order and merge clusters as needed.
        if base < end && end - start <= 127 {
            // Note! syllable() is a one-byte field.
            for i in base..end {
                if buffer.info[i].syllable != 255 {
                    let mut max = i;
                    let mut j = start + buffer.info[i].syllable as usize;
                    while j != i {
                        max = max.max(j);
                        let next = start + buffer.info[j].syllable as usize;
                        buffer.info[j].syllable = 255; // So we don't process j again.
                        j = next;
                    }
                    if i != max {
                        buffer.merge_clusters(base.max(i.min(max)), max + 1);
                    }
                }
            }
        } else if base < end {
            buffer.merge_clusters(base, end);
        }

        // Put syllable back in.
        for i in start..end {
            buffer.info[i].syllable = syllable;
        }
    }

    trace!("myanmar reorder [{}, {})", start, end);
}

pub const MYANMAR_SHAPER: ComplexShaper = ComplexShaper {
    collect_features,
    data_create,
    setup_categories,
    find_syllables: find_syllables_myanmar,
    initial_reordering: reorder,
    final_reordering: None,
    basic_features: BASIC_FEATURES,
    other_features: OTHER_FEATURES,
    broken_cluster_type: SyllableType::BrokenCluster as u8,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn myanmar_categorization() {
        let mut buffer = Buffer::new();
        buffer.push(0x1004, 1, 0); // NGA
        buffer.push(0x103A, 2, 1); // ASAT
        buffer.push(0x1039, 3, 2); // VIRAMA
        buffer.push(0x1000, 4, 3); // KA
        buffer.push(0x1031, 5, 4); // E
        setup_categories(&mut buffer);
        assert_eq!(buffer.info[0].category, category::RA);
        assert_eq!(buffer.info[1].category, myanmar_category::AS);
        assert_eq!(buffer.info[2].category, category::H);
        assert_eq!(buffer.info[3].category, category::C);
        assert_eq!(buffer.info[4].category, myanmar_category::VPRE);
    }

    #[test]
    fn kinzi_sorts_after_main() {
        let mut buffer = Buffer::new();
        buffer.push(0x1004, 1, 0);
        buffer.push(0x103A, 2, 1);
        buffer.push(0x1039, 3, 2);
        buffer.push(0x1000, 4, 3);
        setup_categories(&mut buffer);
        find_syllables_myanmar(&mut buffer);
        initial_reordering_consonant_syllable(&mut buffer, 0, 4);

        // The kinzi triplet ends up after the base consonant.
        assert_eq!(buffer.info[0].codepoint, 0x1000);
        assert_eq!(buffer.info[0].position, position::BASE_C);
        assert_eq!(buffer.info[1].codepoint, 0x1004);
    }
}
