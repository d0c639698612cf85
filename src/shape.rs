//! The complex-script shaping pipeline.

use crate::buffer::{Buffer, BufferScratchFlags};
use crate::complex;
use crate::face::Face;
use crate::ot::{feature, ShapePlan};

/// Shapes `buffer` in place.
///
/// The buffer must already be mapped (cmap applied upstream) and
/// normalized. The pipeline classifies, finds syllables, repairs broken
/// clusters, reorders, and drives the GSUB features of `face` in the
/// order the script requires. It never fails: malformed input surfaces as
/// dotted-circle clusters, and missing font resources degrade the
/// shaping instead of aborting it.
pub fn shape_complex_script(plan: &ShapePlan, face: &dyn Face, buffer: &mut Buffer) {
    if buffer.is_empty() {
        return;
    }

    let shaper = plan.shaper;

    buffer.scratch_flags = BufferScratchFlags::empty();

    // Every glyph starts out with the global mask.
    let global_mask = plan.ot_map.global_mask();
    for info in &mut buffer.info {
        info.mask = global_mask;
    }

    (shaper.setup_categories)(buffer);
    (shaper.find_syllables)(buffer);

    if complex::insert_dotted_circles(face, buffer, shaper.broken_cluster_type) {
        // The repaired clusters re-classify around their dotted circle,
        // and serials stay contiguous.
        (shaper.setup_categories)(buffer);
        (shaper.find_syllables)(buffer);
    }

    (shaper.initial_reordering)(plan, face, buffer);

    for &tag in shaper.basic_features {
        apply_feature_per_syllable(plan, face, buffer, tag);
    }

    if let Some(final_reordering) = shaper.final_reordering {
        final_reordering(plan, face, buffer);
    }

    for &tag in shaper.other_features {
        apply_feature_per_syllable(plan, face, buffer, tag);
    }

    // The neutral horizontal features run over the whole buffer at once,
    // with automatic joiner handling.
    for &tag in &[
        feature::CONTEXTUAL_ALTERNATES,
        feature::CONTEXTUAL_LIGATURES,
    ] {
        if let Some(feature_map) = plan.ot_map.get_feature(tag).copied() {
            let end = buffer.len();
            face.apply_feature(
                tag,
                buffer,
                0,
                end,
                feature_map.mask,
                feature_map.auto_zwnj,
                feature_map.auto_zwj,
            );
        }
    }
}

fn apply_feature_per_syllable(
    plan: &ShapePlan,
    face: &dyn Face,
    buffer: &mut Buffer,
    tag: crate::Tag,
) {
    let feature_map = match plan.ot_map.get_feature(tag) {
        Some(feature_map) => *feature_map,
        None => return,
    };

    let mut start = 0;
    while start < buffer.len() {
        let end = buffer.next_syllable(start);
        // The range may shrink (ligation) or grow (multiplication); the
        // face reports where the syllable now ends.
        let new_end = face.apply_feature(
            tag,
            buffer,
            start,
            end,
            feature_map.mask,
            feature_map.auto_zwnj,
            feature_map.auto_zwj,
        );
        debug_assert!(new_end > start || buffer.is_empty());
        start = new_end.max(start + 1);
    }
}
