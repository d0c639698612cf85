//! The Indic shaper: Devanagari, Bengali, Gurmukhi, Gujarati, Oriya,
//! Tamil, Telugu, Kannada, Malayalam and Sinhala.

use std::any::Any;

use log::trace;

use super::indic_machine::{find_syllables_indic, SyllableType};
use super::indic_table;
use super::{flag, flag_unsafe, ComplexShaper};
use crate::buffer::{Buffer, GlyphInfo};
use crate::face::Face;
use crate::ot::{feature, FeatureFlags, MapBuilder, ShapePlan, WouldSubstituteFeature};
use crate::{script, Mask, Script, Tag};

pub mod category {
    pub const X: u8 = 0;
    pub const C: u8 = 1;
    pub const V: u8 = 2;
    pub const N: u8 = 3;
    pub const H: u8 = 4;
    pub const ZWNJ: u8 = 5;
    pub const ZWJ: u8 = 6;
    pub const M: u8 = 7;
    pub const SM: u8 = 8;
    pub const VD: u8 = 9;
    pub const A: u8 = 10;
    pub const PLACEHOLDER: u8 = 11;
    pub const DOTTED_CIRCLE: u8 = 12;
    /// Register shifter.
    pub const RS: u8 = 13;
    /// Malayalam pre-composed reph, U+0D4E.
    pub const REPHA: u8 = 15;
    pub const RA: u8 = 16;
    pub const CM: u8 = 17;
    pub const SYMBOL: u8 = 18;
    /// Consonant with stacker.
    pub const CS: u8 = 19;
    /// Spacing post-base matra (Sinhala).
    pub const MPST: u8 = 20;
}

pub mod position {
    pub const START: u8 = 0;
    pub const RA_TO_BECOME_REPH: u8 = 1;
    pub const PRE_M: u8 = 2;
    pub const PRE_C: u8 = 3;
    pub const BASE_C: u8 = 4;
    pub const AFTER_MAIN: u8 = 5;
    pub const ABOVE_C: u8 = 6;
    pub const BEFORE_SUB: u8 = 7;
    pub const BELOW_C: u8 = 8;
    pub const AFTER_SUB: u8 = 9;
    pub const BEFORE_POST: u8 = 10;
    pub const POST_C: u8 = 11;
    pub const AFTER_POST: u8 = 12;
    pub const SMVD: u8 = 13;
    pub const END: u8 = 14;
}

const CONSONANT_FLAGS: u32 = flag(category::C as u32)
    | flag(category::CS as u32)
    | flag(category::RA as u32)
    | flag(category::CM as u32)
    | flag(category::V as u32)
    | flag(category::PLACEHOLDER as u32)
    | flag(category::DOTTED_CIRCLE as u32);

const JOINER_FLAGS: u32 = flag(category::ZWJ as u32) | flag(category::ZWNJ as u32);

#[inline]
fn is_consonant(info: &GlyphInfo) -> bool {
    info.is_one_of(CONSONANT_FLAGS)
}

#[inline]
fn is_joiner(info: &GlyphInfo) -> bool {
    info.is_one_of(JOINER_FLAGS)
}

#[inline]
fn is_halant(info: &GlyphInfo) -> bool {
    info.is_one_of(flag(category::H as u32))
}

fn is_ra(u: u32) -> bool {
    matches!(
        u,
        0x0930 | // Devanagari
        0x09B0 | // Bengali
        0x09F0 | // Bengali (Assamese)
        0x0A30 | // Gurmukhi; no Reph
        0x0AB0 | // Gujarati
        0x0B30 | // Oriya
        0x0BB0 | // Tamil; no Reph
        0x0C30 | // Telugu; Reph formed only with ZWJ
        0x0CB0 | // Kannada
        0x0D30 | // Malayalam; no Reph, Logical Repha
        0x0DBB | // Sinhala; Reph formed only with ZWJ
        0x179A // Khmer
    )
}

const INDIC_FEATURES: &[(Tag, FeatureFlags)] = &[
    // Basic features, applied in order, one syllable at a time.
    (feature::NUKTA_FORMS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::AKHANDS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::REPH_FORMS, FeatureFlags::MANUAL_JOINERS),
    (feature::RAKAR_FORMS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::PRE_BASE_FORMS, FeatureFlags::MANUAL_JOINERS),
    (feature::BELOW_BASE_FORMS, FeatureFlags::MANUAL_JOINERS),
    (feature::ABOVE_BASE_FORMS, FeatureFlags::MANUAL_JOINERS),
    (feature::HALF_FORMS, FeatureFlags::MANUAL_JOINERS),
    (feature::POST_BASE_FORMS, FeatureFlags::MANUAL_JOINERS),
    (feature::VATTU_VARIANTS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::CONJUNCT_FORMS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    // Other features, applied after the final reordering.
    (feature::INITIAL_FORMS, FeatureFlags::MANUAL_JOINERS),
    (feature::PRE_BASE_SUBSTITUTIONS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::ABOVE_BASE_SUBSTITUTIONS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::BELOW_BASE_SUBSTITUTIONS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::POST_BASE_SUBSTITUTIONS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::HALANT_FORMS, FeatureFlags::GLOBAL_MANUAL_JOINERS),
];

mod indic_feature {
    pub const RPHF: usize = 2;
    pub const PREF: usize = 4;
    pub const BLWF: usize = 5;
    pub const ABVF: usize = 6;
    pub const HALF: usize = 7;
    pub const PSTF: usize = 8;
    pub const CJCT: usize = 10;
    pub const INIT: usize = 11;
}

const BASIC_FEATURES: &[Tag] = &[
    feature::NUKTA_FORMS,
    feature::AKHANDS,
    feature::REPH_FORMS,
    feature::RAKAR_FORMS,
    feature::PRE_BASE_FORMS,
    feature::BELOW_BASE_FORMS,
    feature::ABOVE_BASE_FORMS,
    feature::HALF_FORMS,
    feature::POST_BASE_FORMS,
    feature::VATTU_VARIANTS,
    feature::CONJUNCT_FORMS,
];

const OTHER_FEATURES: &[Tag] = &[
    feature::INITIAL_FORMS,
    feature::PRE_BASE_SUBSTITUTIONS,
    feature::ABOVE_BASE_SUBSTITUTIONS,
    feature::BELOW_BASE_SUBSTITUTIONS,
    feature::POST_BASE_SUBSTITUTIONS,
    feature::HALANT_FORMS,
];

#[derive(Clone, Copy, PartialEq)]
enum BasePosition {
    Last,
    LastSinhala,
}

#[derive(Clone, Copy, PartialEq)]
enum RephMode {
    /// Reph formed out of initial Ra,H sequence.
    Implicit,
    /// Reph formed out of initial Ra,H,ZWJ sequence.
    Explicit,
    /// Encoded Repha character, needs no reordering.
    LogRepha,
}

#[derive(Clone, Copy, PartialEq)]
enum BlwfMode {
    /// Below-forms feature applied to pre-base and post-base.
    PreAndPost,
    /// Below-forms feature applied to post-base only.
    PostOnly,
}

#[derive(Clone, Copy)]
struct IndicConfig {
    script: Option<Script>,
    has_old_spec: bool,
    virama: u32,
    base_pos: BasePosition,
    reph_pos: u8,
    reph_mode: RephMode,
    blwf_mode: BlwfMode,
}

impl IndicConfig {
    const fn new(
        script: Option<Script>,
        has_old_spec: bool,
        virama: u32,
        base_pos: BasePosition,
        reph_pos: u8,
        reph_mode: RephMode,
        blwf_mode: BlwfMode,
    ) -> Self {
        IndicConfig {
            script,
            has_old_spec,
            virama,
            base_pos,
            reph_pos,
            reph_mode,
            blwf_mode,
        }
    }
}

const INDIC_CONFIGS: &[IndicConfig] = &[
    IndicConfig::new(
        None,
        false,
        0,
        BasePosition::Last,
        position::BEFORE_POST,
        RephMode::Implicit,
        BlwfMode::PreAndPost,
    ),
    IndicConfig::new(
        Some(script::DEVANAGARI),
        true,
        0x094D,
        BasePosition::Last,
        position::BEFORE_POST,
        RephMode::Implicit,
        BlwfMode::PreAndPost,
    ),
    IndicConfig::new(
        Some(script::BENGALI),
        true,
        0x09CD,
        BasePosition::Last,
        position::AFTER_SUB,
        RephMode::Implicit,
        BlwfMode::PreAndPost,
    ),
    IndicConfig::new(
        Some(script::GURMUKHI),
        true,
        0x0A4D,
        BasePosition::Last,
        position::BEFORE_SUB,
        RephMode::Implicit,
        BlwfMode::PreAndPost,
    ),
    IndicConfig::new(
        Some(script::GUJARATI),
        true,
        0x0ACD,
        BasePosition::Last,
        position::BEFORE_POST,
        RephMode::Implicit,
        BlwfMode::PreAndPost,
    ),
    IndicConfig::new(
        Some(script::ORIYA),
        true,
        0x0B4D,
        BasePosition::Last,
        position::AFTER_MAIN,
        RephMode::Implicit,
        BlwfMode::PreAndPost,
    ),
    IndicConfig::new(
        Some(script::TAMIL),
        true,
        0x0BCD,
        BasePosition::Last,
        position::AFTER_POST,
        RephMode::Implicit,
        BlwfMode::PreAndPost,
    ),
    IndicConfig::new(
        Some(script::TELUGU),
        true,
        0x0C4D,
        BasePosition::Last,
        position::AFTER_POST,
        RephMode::Explicit,
        BlwfMode::PostOnly,
    ),
    IndicConfig::new(
        Some(script::KANNADA),
        true,
        0x0CCD,
        BasePosition::Last,
        position::AFTER_POST,
        RephMode::Implicit,
        BlwfMode::PostOnly,
    ),
    IndicConfig::new(
        Some(script::MALAYALAM),
        true,
        0x0D4D,
        BasePosition::Last,
        position::AFTER_MAIN,
        RephMode::LogRepha,
        BlwfMode::PreAndPost,
    ),
    IndicConfig::new(
        Some(script::SINHALA),
        false,
        0x0DCA,
        BasePosition::LastSinhala,
        position::AFTER_POST,
        RephMode::Explicit,
        BlwfMode::PreAndPost,
    ),
];

pub struct IndicShapePlan {
    config: IndicConfig,
    is_old_spec: bool,
    virama_glyph: Option<u32>,
    rphf: WouldSubstituteFeature,
    pref: WouldSubstituteFeature,
    blwf: WouldSubstituteFeature,
    pstf: WouldSubstituteFeature,
    vatu: WouldSubstituteFeature,
    mask_array: [Mask; INDIC_FEATURES.len()],
}

fn collect_features(builder: &mut MapBuilder) {
    for &(tag, flags) in INDIC_FEATURES {
        builder.add_feature(tag, flags);
    }

    builder.enable_feature(feature::CONTEXTUAL_ALTERNATES, FeatureFlags::NONE);
    builder.enable_feature(feature::CONTEXTUAL_LIGATURES, FeatureFlags::NONE);
}

fn data_create(plan: &ShapePlan, face: &dyn Face) -> Box<dyn Any + Send + Sync> {
    let config = INDIC_CONFIGS
        .iter()
        .skip(1)
        .find(|config| config.script == Some(plan.script))
        .copied()
        .unwrap_or(INDIC_CONFIGS[0]);

    let is_old_spec =
        config.has_old_spec && plan.ot_map.chosen_script().to_bytes()[3] != b'2';

    // Use zero-context would_substitute() matching for new-spec of the main
    // Indic scripts, but not for old-spec or Malayalam. Testing with
    // Malayalam shows that old and new spec both allow context.
    let zero_context = !is_old_spec && plan.script != script::MALAYALAM;

    let virama_glyph = if config.virama != 0 {
        face.glyph_index(config.virama).map(|g| g.0 as u32)
    } else {
        None
    };

    let mut mask_array = [0; INDIC_FEATURES.len()];
    for (i, &(tag, flags)) in INDIC_FEATURES.iter().enumerate() {
        mask_array[i] = if flags.contains(FeatureFlags::GLOBAL) {
            0
        } else {
            plan.ot_map.get_1_mask(tag)
        };
    }

    Box::new(IndicShapePlan {
        config,
        is_old_spec,
        virama_glyph,
        rphf: WouldSubstituteFeature::new(&plan.ot_map, feature::REPH_FORMS, zero_context),
        pref: WouldSubstituteFeature::new(&plan.ot_map, feature::PRE_BASE_FORMS, zero_context),
        blwf: WouldSubstituteFeature::new(&plan.ot_map, feature::BELOW_BASE_FORMS, zero_context),
        pstf: WouldSubstituteFeature::new(&plan.ot_map, feature::POST_BASE_FORMS, zero_context),
        vatu: WouldSubstituteFeature::new(&plan.ot_map, feature::VATTU_VARIANTS, zero_context),
        mask_array,
    })
}

pub(crate) fn set_indic_properties(info: &mut GlyphInfo) {
    let u = info.codepoint;
    let (mut cat, mut pos) = indic_table::get_category_and_position(u);

    // Overrides, in order.
    match u {
        0x200D => {
            cat = category::ZWJ;
            pos = position::END;
        }
        0x200C => {
            cat = category::ZWNJ;
            pos = position::END;
        }
        0x25CC => {
            cat = category::DOTTED_CIRCLE;
            pos = position::BASE_C;
        }
        0x0D4E => {
            cat = category::REPHA;
            pos = position::RA_TO_BECOME_REPH;
        }
        _ => {
            if is_ra(u) {
                cat = category::RA;
            }
        }
    }

    info.category = cat;
    info.position = pos;
}

fn setup_categories(buffer: &mut Buffer) {
    for info in &mut buffer.info {
        set_indic_properties(info);
    }
}

fn consonant_position_from_face(
    indic_plan: &IndicShapePlan,
    face: &dyn Face,
    consonant: u32,
    virama: u32,
) -> u8 {
    // For old-spec, the order of glyphs is Consonant,Virama, whereas for
    // new-spec, it is Virama,Consonant. However, some broken fonts simply
    // copied lookups from old-spec to new-spec without modification, and
    // Uniscribe seems to respect those lookups. Try to support them.
    if indic_plan.blwf.would_substitute(face, &[virama, consonant])
        || indic_plan.blwf.would_substitute(face, &[consonant, virama])
        || indic_plan.vatu.would_substitute(face, &[virama, consonant])
        || indic_plan.vatu.would_substitute(face, &[consonant, virama])
    {
        return position::BELOW_C;
    }
    if indic_plan.pstf.would_substitute(face, &[virama, consonant])
        || indic_plan.pstf.would_substitute(face, &[consonant, virama])
    {
        return position::POST_C;
    }
    if indic_plan.pref.would_substitute(face, &[virama, consonant])
        || indic_plan.pref.would_substitute(face, &[consonant, virama])
    {
        return position::POST_C;
    }

    position::BASE_C
}

fn update_consonant_positions(
    indic_plan: &IndicShapePlan,
    face: &dyn Face,
    buffer: &mut Buffer,
) {
    if indic_plan.config.base_pos != BasePosition::Last {
        return;
    }

    let virama = match indic_plan.virama_glyph {
        Some(virama) => virama,
        None => return,
    };

    for info in &mut buffer.info {
        if info.position == position::BASE_C {
            let consonant = info.glyph_id;
            info.position = consonant_position_from_face(indic_plan, face, consonant, virama);
        }
    }
}

fn initial_reordering(plan: &ShapePlan, face: &dyn Face, buffer: &mut Buffer) {
    let indic_plan = plan.data::<IndicShapePlan>();

    update_consonant_positions(indic_plan, face, buffer);

    let mut start = 0;
    while start < buffer.len() {
        let end = buffer.next_syllable(start);
        let syllable_type = buffer.info[start].syllable_type();
        if syllable_type == SyllableType::ConsonantSyllable as u8
            || syllable_type == SyllableType::VowelSyllable as u8
            || syllable_type == SyllableType::StandaloneCluster as u8
            || syllable_type == SyllableType::BrokenCluster as u8
        {
            initial_reordering_consonant_syllable(plan, indic_plan, face, buffer, start, end);
        }
        start = end;
    }
}

fn initial_reordering_consonant_syllable(
    plan: &ShapePlan,
    indic_plan: &IndicShapePlan,
    face: &dyn Face,
    buffer: &mut Buffer,
    start: usize,
    end: usize,
) {
    // https://github.com/harfbuzz/harfbuzz/issues/435#issuecomment-335560167
    // For compatibility with legacy usage in Kannada, Ra+h+ZWJ must
    // behave like Ra+ZWJ+h.
    if plan.script == script::KANNADA
        && start + 3 <= end
        && buffer.info[start].is_one_of(flag(category::RA as u32))
        && buffer.info[start + 1].is_one_of(flag(category::H as u32))
        && buffer.info[start + 2].is_one_of(flag(category::ZWJ as u32))
    {
        buffer.merge_clusters(start, start + 3);
        buffer.info.swap(start + 1, start + 2);
    }

    // 1. Find base consonant:
    //
    // The shaping engine finds the base consonant of the syllable, using the
    // following algorithm: starting from the end of the syllable, move
    // backwards until a consonant is found that does not have a below-base
    // or post-base form (post-base forms have to follow below-base forms),
    // or that is not a pre-base-reordering Ra, or arrive at the first
    // consonant. The consonant stopped at will be the base.
    let mut base = end;
    let mut has_reph = false;

    {
        // -> If the syllable starts with Ra + Halant (in a script that has
        //    Reph) and has more than one consonant, Ra is excluded from
        //    candidates for base consonants.
        let mut limit = start;
        if indic_plan.mask_array[indic_feature::RPHF] != 0
            && start + 3 <= end
            && buffer.info[start].category == category::RA
            && buffer.info[start + 1].category == category::H
            && ((indic_plan.config.reph_mode == RephMode::Implicit
                && !is_joiner(&buffer.info[start + 2]))
                || (indic_plan.config.reph_mode == RephMode::Explicit
                    && buffer.info[start + 2].category == category::ZWJ))
        {
            // See if it matches the 'rphf' feature.
            let glyphs = [
                buffer.info[start].glyph_id,
                buffer.info[start + 1].glyph_id,
                buffer.info[start + 2].glyph_id,
            ];
            if indic_plan.rphf.would_substitute(face, &glyphs[0..2])
                || (indic_plan.config.reph_mode == RephMode::Explicit
                    && indic_plan.rphf.would_substitute(face, &glyphs))
            {
                limit += 2;
                while limit < end && is_joiner(&buffer.info[limit]) {
                    limit += 1;
                }
                base = start;
                has_reph = true;
            }
        } else if indic_plan.config.reph_mode == RephMode::LogRepha
            && buffer.info[start].category == category::REPHA
        {
            limit += 1;
            while limit < end && is_joiner(&buffer.info[limit]) {
                limit += 1;
            }
            base = start;
            has_reph = true;
        }

        match indic_plan.config.base_pos {
            BasePosition::Last => {
                // -> starting from the end of the syllable, move backwards
                let mut i = end;
                let mut seen_below = false;
                loop {
                    i -= 1;
                    // -> until a consonant is found
                    if is_consonant(&buffer.info[i]) {
                        // -> that does not have a below-base or post-base form
                        // (post-base forms have to follow below-base forms),
                        if buffer.info[i].position != position::BELOW_C
                            && (buffer.info[i].position != position::POST_C || seen_below)
                        {
                            base = i;
                            break;
                        }
                        if buffer.info[i].position == position::BELOW_C {
                            seen_below = true;
                        }

                        // -> or that is not a pre-base-reordering Ra,
                        //
                        // IMPLEMENTATION NOTES:
                        //
                        // Our pre-base-reordering Ra's are marked POS_POST_C,
                        // so will be skipped by the logic above.
                        //
                        // -> or arrive at the first consonant. The consonant
                        //    stopped at will be the base.
                        base = i;
                    } else {
                        // A ZWJ after a Halant stops the base search, and
                        // requests an explicit half form.
                        // A ZWJ before a Halant, requests a subjoined form
                        // instead, and hence search continues. This is
                        // particularly important for Bengali sequences like:
                        // Ya,H,Ya,H,Ya,H,Ya.
                        if start < i
                            && buffer.info[i].category == category::ZWJ
                            && buffer.info[i - 1].category == category::H
                        {
                            break;
                        }
                    }

                    if i <= limit {
                        break;
                    }
                }
            }
            BasePosition::LastSinhala => {
                // Sinhala base positioning is slightly different from main
                // Indic, in that: 1. Its ZWJ behavior is different, 2. We
                // don't need to look into the font for consonant positions.
                if !has_reph {
                    base = limit;
                }

                // Find the last consonant that is not blocked by ZWJ. If
                // there is a ZWJ right before a consonant, that consonant is
                // not the base.
                for i in limit..end {
                    if is_consonant(&buffer.info[i]) {
                        if limit < i && buffer.info[i - 1].category == category::ZWJ {
                            break;
                        }
                        base = i;
                    }
                }
            }
        }

        // -> If the syllable starts with Ra + Halant (in a script that has
        //    Reph) and has more than one consonant, Ra is excluded from
        //    candidates for base consonants.
        //
        //  Only do this for unforced Reph. (ie. not for Ra,H,ZWJ.)
        if has_reph && base == start && limit - base <= 2 {
            // Have no other consonant, so Reph is not formed and Ra becomes
            // base.
            has_reph = false;
        }
    }

    // 2. Decompose and reorder Matras: handled upstream by the normalizer.
    //
    // 3. Reorder marks to canonical order: also upstream.

    // Reorder characters.
    for i in start..base {
        buffer.info[i].position = buffer.info[i].position.min(position::PRE_C);
    }
    if base < end {
        buffer.info[base].position = position::BASE_C;
    }

    // Handle beginning Ra.
    if has_reph {
        buffer.info[start].position = position::RA_TO_BECOME_REPH;
    }

    // Attach misc marks to previous char to move with them.
    {
        let mut last_pos = position::START;
        for i in start..end {
            let ok = flag_unsafe(buffer.info[i].category as u32)
                & (JOINER_FLAGS
                    | flag(category::N as u32)
                    | flag(category::RS as u32)
                    | flag(category::CM as u32)
                    | flag(category::H as u32))
                != 0;
            if ok {
                buffer.info[i].position = last_pos;

                // Uniscribe doesn't move the Halant with Left Matra.
                // TEST: U+092B,U+093F,U+094D
                if buffer.info[i].category == category::H
                    && buffer.info[i].position == position::PRE_M
                {
                    for j in (start + 1..=i).rev() {
                        if buffer.info[j - 1].position != position::PRE_M {
                            buffer.info[i].position = buffer.info[j - 1].position;
                            break;
                        }
                    }
                }
            } else if buffer.info[i].position != position::SMVD {
                if buffer.info[i].category == category::MPST
                    && i > start
                    && buffer.info[i - 1].category == category::SM
                {
                    buffer.info[i - 1].position = buffer.info[i].position;
                }
                last_pos = buffer.info[i].position;
            }
        }
    }

    // For post-base consonants let them own anything before them since the
    // last consonant or matra.
    {
        let mut last = base;
        for i in base + 1..end {
            if is_consonant(&buffer.info[i]) {
                for j in last + 1..i {
                    if buffer.info[j].position < position::SMVD {
                        buffer.info[j].position = buffer.info[i].position;
                    }
                }
                last = i;
            } else if buffer.info[i].category == category::M {
                last = i;
            }
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
            // Left matras in visual order are the reverse of their logical
            // encoding order.
            buffer.merge_clusters(first_left_matra, last_left_matra + 1);
            buffer.reverse_range(first_left_matra, last_left_matra + 1);
            // Reverse back nuktas and other subgroups, so a matra and its
            // trailing marks keep their own order.
            let mut i = first_left_matra;
            for j in i..=last_left_matra {
                if buffer.info[j].category == category::M {
                    buffer.reverse_range(i, j + 1);
                    i = j + 1;
                }
            }
        }

        // For old-style Indic fonts, move the first post-base Halant after
        // the last consonant. Kannada stops on a second halant: it does not
        // want that.
        // Reason: the Halant placement changes conjunct ligature formation
        // in pre-Unicode-1.8 style fonts.
        if indic_plan.is_old_spec && base < end {
            for i in base + 1..end {
                if buffer.info[i].category == category::H {
                    let mut j = end - 1;
                    while j > i {
                        if is_consonant(&buffer.info[j])
                            || (plan.script == script::KANNADA
                                && buffer.info[j].category == category::H)
                        {
                            break;
                        }
                        j -= 1;
                    }
                    if buffer.info[j].category != category::H && j > i {
                        // Move Halant to after last consonant.
                        buffer.info[i..=j].rotate_left(1);
                    }
                    break;
                }
            }
        }

        // Things are out-of-control for post base positions, they may
        // shuffle around like crazy. In old-spec mode, we move halants
        // around, so in that case merge all clusters after base. Otherwise,
        // check the sort order and merge as needed. For pre-base stuff, we
        // handle cluster issues in the pre-base matra code.
        if (indic_plan.is_old_spec || end - start > 127) && base < end {
            buffer.merge_clusters(base, end);
        } else if base < end {
            // Note! syllable() is a one-byte field.
            for i in base..end {
                if buffer.info[i].syllable != 255 {
                    let mut max = i;
                    let mut j = start + buffer.info[i].syllable as usize;
                    while j != i {
                        max = max.max(j);
                        let next = start + buffer.info[j].syllable as usize;
                        buffer.info[j].syllable = 255; // So we don't process j later again.
                        j = next;
                    }
                    if i != max {
                        buffer.merge_clusters(base.max(i.min(max)), max + 1);
                    }
                }
            }
        }

        // Put syllable back in.
        for i in start..end {
            buffer.info[i].syllable = syllable;
        }
    }

    // Find base again, the sort may have moved it.
    let mut base = end;
    for i in start..end {
        if buffer.info[i].position == position::BASE_C {
            base = i;
            break;
        }
    }

    trace!(
        "initial reorder [{}, {}): base at {}, reph {}",
        start,
        end,
        base,
        has_reph
    );

    // Setup masks now.
    {
        // Reph.
        let mut i = start;
        while i < end && buffer.info[i].position == position::RA_TO_BECOME_REPH {
            buffer.info[i].mask |= indic_plan.mask_array[indic_feature::RPHF];
            i += 1;
        }

        // Pre-base.
        let mut mask = indic_plan.mask_array[indic_feature::HALF];
        if !indic_plan.is_old_spec && indic_plan.config.blwf_mode == BlwfMode::PreAndPost {
            mask |= indic_plan.mask_array[indic_feature::BLWF];
        }
        for i in start..base.min(end) {
            buffer.info[i].mask |= mask;
        }

        // Post-base.
        let mask = indic_plan.mask_array[indic_feature::BLWF]
            | indic_plan.mask_array[indic_feature::ABVF]
            | indic_plan.mask_array[indic_feature::PSTF];
        if base < end {
            for i in base + 1..end {
                buffer.info[i].mask |= mask;
            }
        }
    }

    // A Ra,Halant pair before the base that is not followed by ZWJ may
    // still form a below-base Ra in pre-and-post scripts.
    if !indic_plan.is_old_spec && indic_plan.config.blwf_mode == BlwfMode::PreAndPost {
        let mut i = start;
        while i + 1 < base {
            if buffer.info[i].category == category::RA
                && buffer.info[i + 1].category == category::H
                && (i + 2 == base || buffer.info[i + 2].category != category::ZWJ)
            {
                buffer.info[i].mask |= indic_plan.mask_array[indic_feature::BLWF];
                buffer.info[i + 1].mask |= indic_plan.mask_array[indic_feature::BLWF];
            }
            i += 1;
        }
    }

    let pref_len = 2;
    if indic_plan.mask_array[indic_feature::PREF] != 0 && base + pref_len < end {
        // Find a Halant,Ra sequence and mark it for pre-base-reordering
        // processing.
        for i in base + 1..=end - pref_len {
            let glyphs = [buffer.info[i].glyph_id, buffer.info[i + 1].glyph_id];
            if indic_plan.pref.would_substitute(face, &glyphs) {
                for j in 0..pref_len {
                    buffer.info[i + j].mask |= indic_plan.mask_array[indic_feature::PREF];
                }
                break;
            }
        }
    }

    // Apply ZWJ/ZWNJ effects.
    for i in start + 1..end {
        if is_joiner(&buffer.info[i]) {
            let non_joiner = buffer.info[i].category == category::ZWNJ;
            let mut j = i;
            loop {
                j -= 1;

                // ZWJ/ZWNJ should disable CJCT. They do that by simply
                // being there, since we don't skip them for the CJCT
                // feature (manual joiners).
                buffer.info[j].mask &= !indic_plan.mask_array[indic_feature::CJCT];

                // A ZWNJ disables HALF.
                if non_joiner {
                    buffer.info[j].mask &= !indic_plan.mask_array[indic_feature::HALF];
                }

                if j <= start || is_consonant(&buffer.info[j]) {
                    break;
                }
            }
        }
    }
}

fn final_reordering(plan: &ShapePlan, _face: &dyn Face, buffer: &mut Buffer) {
    if buffer.is_empty() {
        return;
    }

    let indic_plan = plan.data::<IndicShapePlan>();

    let mut start = 0;
    while start < buffer.len() {
        let end = buffer.next_syllable(start);
        let syllable_type = buffer.info[start].syllable_type();
        if syllable_type == SyllableType::ConsonantSyllable as u8
            || syllable_type == SyllableType::VowelSyllable as u8
            || syllable_type == SyllableType::StandaloneCluster as u8
            || syllable_type == SyllableType::BrokenCluster as u8
        {
            final_reordering_syllable(plan, indic_plan, buffer, start, end);
        }
        start = end;
    }

    // Apply 'init' to the first glyph of the run.
    let init_mask = indic_plan.mask_array[indic_feature::INIT];
    if init_mask != 0 {
        buffer.info[0].mask |= init_mask;
    }
}

fn final_reordering_syllable(
    plan: &ShapePlan,
    indic_plan: &IndicShapePlan,
    buffer: &mut Buffer,
    start: usize,
    end: usize,
) {
    // This function relies heavily on halant glyphs. Lots of ligation and
    // possibly multiple substitutions happened prior to this phase, and
    // that might have messed up our properties. Recover from a particular
    // case of that where we're fairly sure that a class of H is desired
    // but has been lost.
    if let Some(virama_glyph) = indic_plan.virama_glyph {
        for i in start..end {
            let info = &mut buffer.info[i];
            if info.glyph_id == virama_glyph && info.is_ligated() && info.is_multiplied() {
                // This will make sure that this glyph passes is_halant()
                // test.
                info.category = category::H;
                info.clear_ligated_and_multiplied();
            }
        }
    }

    // 4. Final reordering:
    //
    // After the localized forms and basic shaping forms GSUB features have
    // been applied, the shaping engine performs some final glyph
    // reordering before applying all the remaining font features to the
    // entire syllable.

    let mut try_pref = indic_plan.mask_array[indic_feature::PREF] != 0;

    // Find base again.
    let mut base = start;
    while base < end {
        if buffer.info[base].position >= position::BASE_C {
            if try_pref && base + 1 < end {
                for i in base + 1..end {
                    if buffer.info[i].mask & indic_plan.mask_array[indic_feature::PREF] != 0 {
                        if !(buffer.info[i].is_substituted()
                            && buffer.info[i].is_ligated_and_didnt_multiply())
                        {
                            // Ok, this was a 'pref' candidate but didn't
                            // form any. Base is around here...
                            base = i;
                            while base < end && is_halant(&buffer.info[base]) {
                                base += 1;
                            }
                            if base < end {
                                buffer.info[base].position = position::BASE_C;
                            }
                            try_pref = false;
                        }
                        break;
                    }
                }
            }

            // For Malayalam, skip over unformed below- (but NOT post-)
            // forms.
            if plan.script == script::MALAYALAM {
                let mut i = base + 1;
                while i < end {
                    while i < end && is_joiner(&buffer.info[i]) {
                        i += 1;
                    }
                    if i == end || !is_halant(&buffer.info[i]) {
                        break;
                    }
                    i += 1; // Skip halant.
                    while i < end && is_joiner(&buffer.info[i]) {
                        i += 1;
                    }
                    if i < end
                        && is_consonant(&buffer.info[i])
                        && buffer.info[i].position == position::BELOW_C
                    {
                        base = i;
                        buffer.info[base].position = position::BASE_C;
                    }
                    i += 1;
                }
            }

            if start < base && buffer.info[base].position > position::BASE_C {
                base -= 1;
            }
            break;
        }
        base += 1;
    }

    if base == end
        && start < base
        && buffer.info[base - 1].is_one_of(flag(category::ZWJ as u32))
    {
        base -= 1;
    }
    if base < end {
        while start < base
            && buffer.info[base]
                .is_one_of(flag(category::N as u32) | flag(category::H as u32))
        {
            base -= 1;
        }
    }

    // o Reorder matras:
    //
    // If a pre-base matra character had been reordered before applying
    // basic features, the glyph can be moved closer to the main consonant
    // based on whether half-forms had been formed. Actual position for the
    // matra is defined as "after last standalone halant glyph, after
    // initial matra position and before the main consonant". If ZWJ or
    // ZWNJ follow this halant, position is moved after it.
    if start + 1 < end && start < base {
        // Otherwise there can't be any pre-base matra characters.
        // If we lost track of base, alas, position before last thingy.
        let mut new_pos = if base == end { base - 2 } else { base - 1 };

        // Malayalam / Tamil do not have "half" forms or explicit virama
        // forms. The glyphs formed by 'half' are Chillus or ligated
        // explicit viramas. We want to position matra after them.
        if plan.script != script::MALAYALAM && plan.script != script::TAMIL {
            loop {
                while new_pos > start
                    && !buffer.info[new_pos].is_one_of(
                        flag(category::M as u32)
                            | flag(category::MPST as u32)
                            | flag(category::H as u32),
                    )
                {
                    new_pos -= 1;
                }

                // If we found no Halant we are done. Otherwise only proceed
                // if the Halant does not belong to the Matra itself!
                if is_halant(&buffer.info[new_pos])
                    && buffer.info[new_pos].position != position::PRE_M
                {
                    if new_pos + 1 < end
                        && buffer.info[new_pos + 1].category == category::ZWJ
                    {
                        // -> If ZWJ follows this halant, matra is NOT
                        //    repositioned after this halant.
                        if new_pos > start {
                            new_pos -= 1;
                            continue; // Keep searching.
                        }
                    }
                } else {
                    new_pos = start; // No move.
                }
                break;
            }
        }

        if start < new_pos && buffer.info[new_pos].position != position::PRE_M {
            // Now go see if there's actually any matras...
            for i in (start + 1..=new_pos).rev() {
                if buffer.info[i - 1].position == position::PRE_M {
                    let old_pos = i - 1;
                    if old_pos < base && base <= new_pos {
                        // Shouldn't actually happen.
                        base -= 1;
                    }

                    buffer.info[old_pos..=new_pos].rotate_left(1);

                    // Note: this merge_clusters() is intentionally *after*
                    // the reordering. Indic matra reordering is special and
                    // tricky...
                    buffer.merge_clusters(new_pos, (base + 1).min(end));

                    new_pos -= 1;
                }
            }
        } else {
            for i in start..base {
                if buffer.info[i].position == position::PRE_M {
                    buffer.merge_clusters(i, (base + 1).min(end));
                    break;
                }
            }
        }
    }

    // o Reorder reph:
    //
    // Reph's original position is always at the beginning of the syllable,
    // (i.e. it is not reordered at the character reordering stage).
    // However, it will be reordered according to the basic-forms shaping
    // results. Possible positions for reph, depending on the script, are:
    // after main, before post-base consonant forms, and after post-base
    // consonant forms.
    //
    // Two cases:
    // - If reph should be positioned after post-base consonant forms,
    //   proceed to step 5.
    // - If the reph repositioning class is not after post-base: target
    //   position is after the first explicit halant glyph between the
    //   first post-reph consonant and last main consonant.
    if start + 1 < end
        && buffer.info[start].position == position::RA_TO_BECOME_REPH
        && ((buffer.info[start].category == category::REPHA)
            != buffer.info[start].is_ligated_and_didnt_multiply())
    {
        let reph_pos = indic_plan.config.reph_pos;

        let new_reph_pos = 'found: loop {
            // 1. If reph should be positioned after post-base consonant
            //    forms, proceed to step 5.
            if reph_pos != position::AFTER_POST {
                // 2. If the reph repositioning class is not after
                //    post-base: target position is after the first explicit
                //    halant glyph between the first post-reph consonant and
                //    last main consonant. If ZWJ or ZWNJ are following this
                //    halant, position is moved after it. If such position
                //    is found, this is the target position.
                if let Some(pos) = reph_halant_target(buffer, start, base) {
                    break 'found pos;
                }

                // 3. If reph should be repositioned after the main
                //    consonant: from the main consonant, walk forward over
                //    everything that sorts no later than after-main.
                if reph_pos == position::AFTER_MAIN {
                    let mut pos = base;
                    while pos + 1 < end
                        && buffer.info[pos + 1].position <= position::AFTER_MAIN
                    {
                        pos += 1;
                    }
                    if pos < end {
                        break 'found pos;
                    }
                }

                // 4. If reph should be positioned before post-base
                //    consonant: advance from the base until hitting a
                //    post-base or later slot.
                if reph_pos == position::AFTER_SUB {
                    let mut pos = base;
                    while pos + 1 < end
                        && (flag_unsafe(buffer.info[pos + 1].position as u32)
                            & (flag(position::POST_C as u32)
                                | flag(position::AFTER_POST as u32)
                                | flag(position::SMVD as u32)))
                            == 0
                    {
                        pos += 1;
                    }
                    if pos < end {
                        break 'found pos;
                    }
                }
            }

            // 5. If no consonant is found in steps 3 or 4, move reph to a
            //    position immediately before the first post-base matra,
            //    syllable modifier sign or vedic sign that has a reordering
            //    class after the intended reph position.
            //
            // Copied from step 2.
            if let Some(pos) = reph_halant_target(buffer, start, base) {
                break 'found pos;
            }

            // 6. Otherwise, reorder reph to the end of the syllable.
            {
                let mut pos = end - 1;
                while pos > start && buffer.info[pos].position == position::SMVD {
                    pos -= 1;
                }

                // If the Reph is to be ending up after a Matra,Halant
                // sequence, position it before that Halant so it can
                // interact with the Matra. However, if it's a plain
                // Consonant,Halant we shouldn't do that. Uniscribe doesn't
                // do this.
                // TEST: U+0930,U+094D,U+0915,U+094B,U+094D
                if is_halant(&buffer.info[pos]) {
                    for i in base + 1..pos {
                        if buffer.info[i].category == category::M {
                            // Ok, got it.
                            pos -= 1;
                        }
                    }
                }

                break 'found pos;
            }
        };

        // Move. The reph now occupies the slot its policy asked for.
        buffer.merge_clusters(start, new_reph_pos + 1);
        buffer.info[start..=new_reph_pos].rotate_left(1);
        buffer.info[new_reph_pos].position = reph_pos;

        if start < base && base <= new_reph_pos {
            base -= 1;
        }
    }

    // o Reorder pre-base-reordering consonants:
    //
    // If a pre-base-reordering consonant is found, reorder it according to
    // the following rules:
    if try_pref && base + 1 < end {
        // Otherwise there can't be any pre-base-reordering Ra.
        for i in base + 1..end {
            if buffer.info[i].mask & indic_plan.mask_array[indic_feature::PREF] != 0 {
                // 1. Only reorder a glyph produced by substitution during
                //    application of the <pref> feature. (Note that a font
                //    may shape a Ra consonant with the feature generally
                //    but block it in certain contexts.)
                if buffer.info[i].is_substituted()
                    && buffer.info[i].is_ligated_and_didnt_multiply()
                {
                    // 2. Try to find a target position the same way as for
                    //    pre-base matra. If it is found, reorder
                    //    pre-base-reordering consonant glyph before the
                    //    first consonant in the syllable.
                    let mut new_pos = base;

                    // Malayalam / Tamil do not have "half" forms or
                    // explicit virama forms.
                    if plan.script != script::MALAYALAM && plan.script != script::TAMIL {
                        while new_pos > start
                            && !buffer.info[new_pos - 1].is_one_of(
                                flag(category::M as u32)
                                    | flag(category::MPST as u32)
                                    | flag(category::H as u32),
                            )
                        {
                            new_pos -= 1;
                        }
                    }

                    if new_pos > start && is_halant(&buffer.info[new_pos - 1]) {
                        // -> If ZWJ or ZWNJ follow this halant, position is
                        //    moved after it.
                        if new_pos < end && is_joiner(&buffer.info[new_pos]) {
                            new_pos += 1;
                        }
                    }

                    let old_pos = i;

                    buffer.merge_clusters(new_pos, old_pos + 1);
                    buffer.info[new_pos..=old_pos].rotate_right(1);

                    if new_pos <= base && base < old_pos {
                        base += 1;
                    }
                }

                break;
            }
        }
    }

    let _ = base;

    // Finish off the clusters: within the syllable, a ZWJ glues its
    // segment together while a ZWNJ keeps segments apart.
    {
        let mut has_zwj = false;
        let mut has_zwnj = false;
        for i in start..end {
            has_zwj |= buffer.info[i].is_zwj();
            has_zwnj |= buffer.info[i].is_zwnj();
        }

        if has_zwnj {
            let mut seg_start = start;
            let mut seg_has_zwj = false;
            for i in start..end {
                if buffer.info[i].is_zwj() {
                    seg_has_zwj = true;
                    buffer.merge_clusters(seg_start, i + 1);
                } else if buffer.info[i].is_zwnj() {
                    seg_start = i + 1;
                    seg_has_zwj = false;
                }
            }
            if seg_has_zwj {
                buffer.merge_clusters(seg_start, end);
            }
        } else if has_zwj {
            buffer.merge_clusters(start, end);
        }
    }

    trace!("final reorder [{}, {})", start, end);
}

// The target slot after the first explicit halant between the first
// post-reph glyph and the base; a following joiner shifts it by one.
fn reph_halant_target(buffer: &Buffer, start: usize, base: usize) -> Option<usize> {
    let mut new_pos = start + 1;
    while new_pos < base && !is_halant(&buffer.info[new_pos]) {
        new_pos += 1;
    }

    if new_pos < base && is_halant(&buffer.info[new_pos]) {
        // -> If ZWJ or ZWNJ are following this halant, position is moved
        //    after it.
        if new_pos + 1 < base && is_joiner(&buffer.info[new_pos + 1]) {
            new_pos += 1;
        }
        return Some(new_pos);
    }

    None
}

pub const INDIC_SHAPER: ComplexShaper = ComplexShaper {
    collect_features,
    data_create,
    setup_categories,
    find_syllables: find_syllables_indic,
    initial_reordering,
    final_reordering: Some(final_reordering),
    basic_features: BASIC_FEATURES,
    other_features: OTHER_FEATURES,
    broken_cluster_type: SyllableType::BrokenCluster as u8,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ra_detection() {
        assert!(is_ra(0x0930));
        assert!(is_ra(0x0DBB));
        assert!(!is_ra(0x0915));
    }

    #[test]
    fn properties_overrides() {
        let mut buffer = Buffer::new();
        buffer.push(0x200D, 1, 0);
        buffer.push(0x0D4E, 2, 1);
        buffer.push(0x0930, 3, 2);
        setup_categories(&mut buffer);
        assert_eq!(buffer.info[0].category, category::ZWJ);
        assert_eq!(buffer.info[1].category, category::REPHA);
        assert_eq!(buffer.info[1].position, position::RA_TO_BECOME_REPH);
        assert_eq!(buffer.info[2].category, category::RA);
    }

    #[test]
    fn feature_table_is_complete() {
        assert_eq!(INDIC_FEATURES.len(), 17);
        assert_eq!(BASIC_FEATURES.len(), 11);
        assert_eq!(INDIC_FEATURES[indic_feature::RPHF].0, feature::REPH_FORMS);
        assert_eq!(INDIC_FEATURES[indic_feature::INIT].0, feature::INITIAL_FORMS);
    }
}
