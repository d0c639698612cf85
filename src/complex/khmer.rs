//! The Khmer shaper.
//!
//! Khmer uses the Coeng model: subscript consonants and the
//! pre-base-reordering Ro are encoded as Coeng+consonant sequences, so
//! there is no base search and no post-GSUB reordering pass. The Coeng+Ro
//! sequence and left vowel pieces move to the front of the syllable before
//! features apply.

use std::any::Any;

use log::trace;

use super::indic::category;
use super::indic_table;
use super::khmer_machine::{find_syllables_khmer, SyllableType};
use super::ComplexShaper;
use crate::buffer::{Buffer, GlyphInfo};
use crate::face::Face;
use crate::ot::{feature, FeatureFlags, MapBuilder, ShapePlan};
use crate::{Mask, Tag};

pub(crate) mod khmer_category {
    /// Paired register shifters and the robat.
    pub const ROBATIC: u8 = 21;
    /// Marks that stack above and follow the vowels.
    pub const XGROUP: u8 = 22;
    /// Spacing marks that end the syllable.
    pub const YGROUP: u8 = 23;
    pub const VABV: u8 = 24;
    pub const VBLW: u8 = 25;
    pub const VPRE: u8 = 26;
    pub const VPST: u8 = 27;
}

const KHMER_FEATURES: &[(Tag, FeatureFlags)] = &[
    // Basic features, applied in order, one syllable at a time.
    (feature::PRE_BASE_FORMS, FeatureFlags::MANUAL_JOINERS),
    (feature::BELOW_BASE_FORMS, FeatureFlags::MANUAL_JOINERS),
    (feature::ABOVE_BASE_FORMS, FeatureFlags::MANUAL_JOINERS),
    (feature::POST_BASE_FORMS, FeatureFlags::MANUAL_JOINERS),
    (feature::CONJUNCT_FORM_AFTER_RO, FeatureFlags::MANUAL_JOINERS),
    // Other features, applied after the basic ones.
    (feature::PRE_BASE_SUBSTITUTIONS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::ABOVE_BASE_SUBSTITUTIONS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::BELOW_BASE_SUBSTITUTIONS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::POST_BASE_SUBSTITUTIONS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
];

mod khmer_feature {
    pub const PREF: usize = 0;
    pub const BLWF: usize = 1;
    pub const ABVF: usize = 2;
    pub const PSTF: usize = 3;
    pub const CFAR: usize = 4;
}

const BASIC_FEATURES: &[Tag] = &[
    feature::PRE_BASE_FORMS,
    feature::BELOW_BASE_FORMS,
    feature::ABOVE_BASE_FORMS,
    feature::POST_BASE_FORMS,
    feature::CONJUNCT_FORM_AFTER_RO,
];

const OTHER_FEATURES: &[Tag] = &[
    feature::PRE_BASE_SUBSTITUTIONS,
    feature::ABOVE_BASE_SUBSTITUTIONS,
    feature::BELOW_BASE_SUBSTITUTIONS,
    feature::POST_BASE_SUBSTITUTIONS,
];

pub struct KhmerShapePlan {
    mask_array: [Mask; KHMER_FEATURES.len()],
}

fn collect_features(builder: &mut MapBuilder) {
    for &(tag, flags) in KHMER_FEATURES {
        builder.add_feature(tag, flags);
    }
}

fn data_create(plan: &ShapePlan, _face: &dyn Face) -> Box<dyn Any + Send + Sync> {
    let mut mask_array = [0; KHMER_FEATURES.len()];
    for (i, &(tag, flags)) in KHMER_FEATURES.iter().enumerate() {
        mask_array[i] = if flags.contains(FeatureFlags::GLOBAL) {
            0
        } else {
            plan.ot_map.get_1_mask(tag)
        };
    }

    Box::new(KhmerShapePlan { mask_array })
}

pub(crate) fn set_khmer_properties(info: &mut GlyphInfo) {
    let u = info.codepoint;
    let (mut cat, pos) = indic_table::get_category_and_position(u);

    match u {
        0x200D => cat = category::ZWJ,
        0x200C => cat = category::ZWNJ,
        0x25CC => cat = category::DOTTED_CIRCLE,
        0x179A => cat = category::RA,
        // The register shifters and the robat behave alike.
        0x17C9..=0x17CA | 0x17CC => cat = khmer_category::ROBATIC,
        0x17C6 | 0x17CB | 0x17CD..=0x17D1 | 0x17D3 | 0x17DD => cat = khmer_category::XGROUP,
        0x17C7..=0x17C8 => cat = khmer_category::YGROUP,
        _ => {}
    }

    if cat == category::M {
        cat = match pos {
            super::indic::position::PRE_M => khmer_category::VPRE,
            super::indic::position::ABOVE_C => khmer_category::VABV,
            super::indic::position::BELOW_C => khmer_category::VBLW,
            _ => khmer_category::VPST,
        };
    }

    info.category = cat;
    info.position = pos;
}

fn setup_categories(buffer: &mut Buffer) {
    for info in &mut buffer.info {
        set_khmer_properties(info);
    }
}

fn reorder(plan: &ShapePlan, _face: &dyn Face, buffer: &mut Buffer) {
    let khmer_plan = plan.data::<KhmerShapePlan>();

    let mut start = 0;
    while start < buffer.len() {
        let end = buffer.next_syllable(start);
        let syllable_type = buffer.info[start].syllable_type();
        if syllable_type == SyllableType::ConsonantSyllable as u8
            || syllable_type == SyllableType::BrokenCluster as u8
        {
            reorder_consonant_syllable(khmer_plan, buffer, start, end);
        }
        start = end;
    }
}

fn reorder_consonant_syllable(
    khmer_plan: &KhmerShapePlan,
    buffer: &mut Buffer,
    start: usize,
    end: usize,
) {
    // Setup masks.
    {
        // Post-base.
        let mask = khmer_plan.mask_array[khmer_feature::BLWF]
            | khmer_plan.mask_array[khmer_feature::ABVF]
            | khmer_plan.mask_array[khmer_feature::PSTF];
        for i in start + 1..end {
            buffer.info[i].mask |= mask;
        }
    }

    let mut num_coengs = 0;
    let mut i = start + 1;
    while i < end {
        // When a COENG + (Cons | IndV) combination are found (and subscript
        // count is less than two) the character combination is handled
        // according to the subscript type of the character following the
        // COENG.
        //
        // ...
        //
        // Subscript Type 2 - The COENG + RO characters are reordered to
        // immediately before the base glyph. Then the COENG + RO character
        // combination is assigned to the 'pref' feature.
        if buffer.info[i].category == category::H && num_coengs <= 2 && i + 1 < end {
            num_coengs += 1;

            if buffer.info[i + 1].category == category::RA {
                for j in 0..2 {
                    buffer.info[i + j].mask |= khmer_plan.mask_array[khmer_feature::PREF];
                }

                // Move the Coeng,Ro sequence to the start.
                buffer.merge_clusters(start, i + 2);
                buffer.info[start..i + 2].rotate_right(2);

                // Mark the subsequent stuff with 'cfar'. Used in Khmer
                // fonts to prevent the subscript from attaching to the Ro.
                if khmer_plan.mask_array[khmer_feature::CFAR] != 0 {
                    for j in i + 2..end {
                        buffer.info[j].mask |= khmer_plan.mask_array[khmer_feature::CFAR];
                    }
                }

                num_coengs = 2; // Done.
            }
        } else if buffer.info[i].category == khmer_category::VPRE {
            // Reorder left matra piece: move to the start.
            buffer.merge_clusters(start, i + 1);
            buffer.info[start..=i].rotate_right(1);
        }

        i += 1;
    }

    trace!("khmer reorder [{}, {})", start, end);
}

pub const KHMER_SHAPER: ComplexShaper = ComplexShaper {
    collect_features,
    data_create,
    setup_categories,
    find_syllables: find_syllables_khmer,
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
    fn khmer_categorization() {
        let mut buffer = Buffer::new();
        buffer.push(0x1780, 1, 0); // KA
        buffer.push(0x17D2, 2, 1); // COENG
        buffer.push(0x179A, 3, 2); // RO
        buffer.push(0x17C1, 4, 3); // E
        setup_categories(&mut buffer);
        assert_eq!(buffer.info[0].category, category::C);
        assert_eq!(buffer.info[1].category, category::H);
        assert_eq!(buffer.info[2].category, category::RA);
        assert_eq!(buffer.info[3].category, khmer_category::VPRE);
    }
}
