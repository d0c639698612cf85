//! End-to-end shaping runs against a table-driven font oracle.

use std::collections::{HashMap, HashSet};

use matra::complex::indic::{category, position};
use matra::{
    script, Buffer, Face, GlyphId, GlyphPropsFlags, Mask, Script, ShapePlan, Tag,
};

/// A deterministic `Face`: cmap, would-substitute answers and ligature
/// rules all come from tables the test builds up.
#[derive(Default)]
struct TestFace {
    cmap: HashMap<u32, u16>,
    would: HashSet<(Tag, Vec<u32>)>,
    ligatures: Vec<(Tag, Vec<u32>, u32)>,
}

impl TestFace {
    fn map(&mut self, codepoint: u32, glyph: u16) -> u32 {
        self.cmap.insert(codepoint, glyph);
        glyph as u32
    }

    fn would_substitute(&mut self, tag: &[u8; 4], glyphs: &[u32]) {
        self.would.insert((Tag::from_bytes(tag), glyphs.to_vec()));
    }

    fn ligature(&mut self, tag: &[u8; 4], glyphs: &[u32], ligature: u32) {
        self.would_substitute(tag, glyphs);
        self.ligatures
            .push((Tag::from_bytes(tag), glyphs.to_vec(), ligature));
    }
}

impl Face for TestFace {
    fn glyph_index(&self, codepoint: u32) -> Option<GlyphId> {
        self.cmap.get(&codepoint).map(|&glyph| GlyphId(glyph))
    }

    fn has_feature(&self, _: Tag) -> bool {
        true
    }

    fn would_substitute(&self, feature: Tag, glyphs: &[u32], _zero_context: bool) -> bool {
        self.would.contains(&(feature, glyphs.to_vec()))
    }

    fn apply_feature(
        &self,
        feature: Tag,
        buffer: &mut Buffer,
        start: usize,
        end: usize,
        mask: Mask,
        _auto_zwnj: bool,
        _auto_zwj: bool,
    ) -> usize {
        let mut end = end;
        let mut i = start;
        'outer: while i < end {
            for (tag, sequence, ligature) in &self.ligatures {
                if *tag != feature || i + sequence.len() > end {
                    continue;
                }
                let window = &buffer.info[i..i + sequence.len()];
                let glyphs_match = window
                    .iter()
                    .zip(sequence)
                    .all(|(info, &glyph)| info.glyph_id == glyph);
                if glyphs_match && window.iter().all(|info| info.mask & mask != 0) {
                    buffer.merge_clusters(i, i + sequence.len());
                    buffer.info[i].glyph_id = *ligature;
                    buffer.info[i].glyph_props |=
                        GlyphPropsFlags::SUBSTITUTED | GlyphPropsFlags::LIGATED;
                    let removed = sequence.len() - 1;
                    buffer.info.drain(i + 1..i + sequence.len());
                    end -= removed;
                    i += 1;
                    continue 'outer;
                }
            }
            i += 1;
        }
        end
    }
}

fn make_buffer(face: &TestFace, text: &[u32]) -> Buffer {
    let mut buffer = Buffer::new();
    for (i, &codepoint) in text.iter().enumerate() {
        let glyph = face
            .glyph_index(codepoint)
            .map(|g| g.0 as u32)
            .unwrap_or(0);
        buffer.push(codepoint, glyph, i as u32);
    }
    buffer
}

fn shape(face: &TestFace, script: Script, chosen_script: &[u8; 4], text: &[u32]) -> Buffer {
    let mut buffer = make_buffer(face, text);
    let plan = ShapePlan::new(face, script, Tag::from_bytes(chosen_script));
    matra::shape_complex_script(&plan, face, &mut buffer);
    assert_clusters_monotone(&buffer);
    assert_syllable_partition(&buffer);
    buffer
}

fn assert_clusters_monotone(buffer: &Buffer) {
    for i in 1..buffer.len() {
        assert!(
            buffer.info[i - 1].cluster <= buffer.info[i].cluster,
            "clusters not monotone: {:?}",
            buffer.info.iter().map(|g| g.cluster).collect::<Vec<_>>()
        );
    }
}

fn assert_syllable_partition(buffer: &Buffer) {
    for info in &buffer.info {
        assert_ne!(info.syllable, 0, "entry left outside any syllable");
    }
}

fn glyphs(buffer: &Buffer) -> Vec<u32> {
    buffer.info.iter().map(|info| info.glyph_id).collect()
}

fn clusters(buffer: &Buffer) -> Vec<u32> {
    buffer.info.iter().map(|info| info.cluster).collect()
}

// Devanagari क्ष: Ka, Halant, Ssa. The pair before the base keeps its
// logical order and carries the half mask; the last consonant is the base.
#[test]
fn devanagari_kssa() {
    let mut face = TestFace::default();
    let ka = face.map(0x0915, 1);
    let halant = face.map(0x094D, 2);
    let ssa = face.map(0x0937, 3);
    face.map(0x25CC, 99);

    let buffer = shape(&face, script::DEVANAGARI, b"dev2", &[0x0915, 0x094D, 0x0937]);

    assert_eq!(glyphs(&buffer), [ka, halant, ssa]);
    assert_eq!(buffer.info[0].position, position::PRE_C);
    assert_eq!(buffer.info[1].position, position::PRE_C);
    assert_eq!(buffer.info[2].position, position::BASE_C);

    // Exactly one base per consonant syllable.
    let bases = buffer
        .info
        .iter()
        .filter(|info| info.position == position::BASE_C)
        .count();
    assert_eq!(bases, 1);
}

// Devanagari र्क: Ra, Halant, Ka. The Ra+Halant pair ligates under rphf
// and the resulting reph moves after the base.
#[test]
fn devanagari_reph() {
    let mut face = TestFace::default();
    let ra = face.map(0x0930, 1);
    let halant = face.map(0x094D, 2);
    let ka = face.map(0x0915, 3);
    let reph = 4;
    face.ligature(b"rphf", &[ra, halant], reph);

    let buffer = shape(&face, script::DEVANAGARI, b"dev2", &[0x0930, 0x094D, 0x0915]);

    assert_eq!(glyphs(&buffer), [ka, reph]);
    assert_eq!(buffer.info[1].position, position::BEFORE_POST);
    // The whole syllable collapsed into one cluster.
    assert_eq!(clusters(&buffer), [0, 0]);

    // No entry still waits to become a reph.
    let pending = buffer
        .info
        .iter()
        .filter(|info| {
            info.position == position::RA_TO_BECOME_REPH
                && ((info.category == category::REPHA) != info.is_ligated_and_didnt_multiply())
        })
        .count();
    assert_eq!(pending, 0);
}

// Devanagari कि: Ka, pre-base matra I. The matra sorts to the front of
// the syllable and stays there through the final pass.
#[test]
fn devanagari_pre_base_matra() {
    let mut face = TestFace::default();
    let ka = face.map(0x0915, 1);
    let matra_i = face.map(0x093F, 2);

    let buffer = shape(&face, script::DEVANAGARI, b"dev2", &[0x0915, 0x093F]);

    assert_eq!(glyphs(&buffer), [matra_i, ka]);
    assert_eq!(buffer.info[0].position, position::PRE_M);
    assert_eq!(buffer.info[1].position, position::BASE_C);
    assert_eq!(clusters(&buffer), [0, 0]);
}

// Tamil க்ஷ: no half forms, so the final matra pass must not walk over
// halants; the initial pass still clamps the pair before the base.
#[test]
fn tamil_kssa() {
    let mut face = TestFace::default();
    let ka = face.map(0x0B95, 1);
    let pulli = face.map(0x0BCD, 2);
    let ssa = face.map(0x0BB7, 3);

    let buffer = shape(&face, script::TAMIL, b"tml2", &[0x0B95, 0x0BCD, 0x0BB7]);

    assert_eq!(glyphs(&buffer), [ka, pulli, ssa]);
    assert_eq!(buffer.info[2].position, position::BASE_C);
}

// Tamil கி with a halant in front of the matra target: Malayalam and
// Tamil place the pre-base matra without searching for half forms.
#[test]
fn tamil_matra_skips_halant_walk() {
    let mut face = TestFace::default();
    let ka = face.map(0x0B95, 1);
    let pulli = face.map(0x0BCD, 2);
    let ssa = face.map(0x0BB7, 3);
    let matra_i = face.map(0x0BBF, 4);

    let buffer = shape(
        &face,
        script::TAMIL,
        b"tml2",
        &[0x0B95, 0x0BCD, 0x0BB7, 0x0BBF],
    );

    // Tamil I is a right matra; order is preserved.
    assert_eq!(glyphs(&buffer), [ka, pulli, ssa, matra_i]);
}

// Malayalam encoded repha U+0D4E: categorized Repha, moved per the
// after-main policy without any ligature forming.
#[test]
fn malayalam_dot_reph() {
    let mut face = TestFace::default();
    let repha = face.map(0x0D4E, 1);
    let ka = face.map(0x0D15, 2);
    face.map(0x0D4D, 3);

    let buffer = shape(&face, script::MALAYALAM, b"mlm2", &[0x0D4E, 0x0D15]);

    assert_eq!(glyphs(&buffer), [ka, repha]);
    assert_eq!(buffer.info[1].position, position::AFTER_MAIN);
    assert_eq!(clusters(&buffer), [0, 0]);
}

// Kannada old-spec: the below-base consonant drags the halant past it
// before the cluster merge, and the below form ligates in Consonant,
// Virama order.
#[test]
fn kannada_old_spec_halant_hop() {
    let mut face = TestFace::default();
    let ka = face.map(0x0C95, 1);
    let virama = face.map(0x0CCD, 2);
    let va = face.map(0x0CB5, 3);
    let va_below = 4;
    // Old-spec lookup order: Consonant, Virama.
    face.ligature(b"blwf", &[va, virama], va_below);

    let buffer = shape(&face, script::KANNADA, b"knda", &[0x0C95, 0x0CCD, 0x0CB5]);

    // The halant hopped past the below consonant, then the pair ligated.
    assert_eq!(glyphs(&buffer), [ka, va_below]);
    assert_eq!(clusters(&buffer), [0, 0]);
}

// Sinhala explicit reph: Ra, Al-lakuna, ZWJ, Ka. Reph forms only because
// of the ZWJ, verified through the would-substitute oracle.
#[test]
fn sinhala_explicit_reph() {
    let mut face = TestFace::default();
    let ra = face.map(0x0DBB, 1);
    let al = face.map(0x0DCA, 2);
    let zwj = face.map(0x200D, 3);
    let ka = face.map(0x0D9A, 4);
    let reph = 5;
    face.ligature(b"rphf", &[ra, al], reph);

    let buffer = shape(
        &face,
        script::SINHALA,
        b"sinh",
        &[0x0DBB, 0x0DCA, 0x200D, 0x0D9A],
    );

    // The reph ligature formed and was moved to the end of the syllable;
    // the ZWJ glyph survives shaping (positioning hides it later).
    assert_eq!(glyphs(&buffer), [zwj, ka, reph]);
    assert_eq!(clusters(&buffer), [0, 0, 0]);
}

// Two below matras keep their relative order through the stable sort.
#[test]
fn stable_sort_tie_break() {
    let mut face = TestFace::default();
    let ka = face.map(0x0915, 1);
    let u = face.map(0x0941, 2);
    let uu = face.map(0x0942, 3);

    let buffer = shape(&face, script::DEVANAGARI, b"dev2", &[0x0915, 0x0941, 0x0942]);

    assert_eq!(glyphs(&buffer), [ka, u, uu]);
}

// A lone matra is a broken cluster; the shaper inserts a dotted circle
// in front of it and the repaired cluster is no longer broken.
#[test]
fn broken_cluster_gets_dotted_circle() {
    let mut face = TestFace::default();
    face.map(0x093F, 1);
    let dotted_circle = face.map(0x25CC, 2);

    let buffer = shape(&face, script::DEVANAGARI, b"dev2", &[0x093F]);

    assert_eq!(buffer.len(), 2);
    // The matra is a left matra, so it sorts in front of its new base.
    assert_eq!(glyphs(&buffer), [1, dotted_circle]);
    for info in &buffer.info {
        // 4 is the broken-cluster type; nothing may remain broken.
        assert_ne!(info.syllable & 0x0F, 4, "cluster still broken");
    }
}

// Without a dotted-circle glyph in the font the buffer is left alone.
#[test]
fn broken_cluster_without_dotted_circle_glyph() {
    let mut face = TestFace::default();
    face.map(0x093F, 1);

    let buffer = shape(&face, script::DEVANAGARI, b"dev2", &[0x093F]);

    assert_eq!(buffer.len(), 1);
}

// Khmer Coeng+Ro moves to the front of the syllable.
#[test]
fn khmer_coeng_ro() {
    let mut face = TestFace::default();
    let ka = face.map(0x1780, 1);
    let coeng = face.map(0x17D2, 2);
    let ro = face.map(0x179A, 3);

    let buffer = shape(&face, script::KHMER, b"khmr", &[0x1780, 0x17D2, 0x179A]);

    assert_eq!(glyphs(&buffer), [coeng, ro, ka]);
    assert_eq!(clusters(&buffer), [0, 0, 0]);
}

// Khmer pre-base vowel moves to the front.
#[test]
fn khmer_vpre() {
    let mut face = TestFace::default();
    let ka = face.map(0x1780, 1);
    let e = face.map(0x17C1, 2);

    let buffer = shape(&face, script::KHMER, b"khmr", &[0x1780, 0x17C1]);

    assert_eq!(glyphs(&buffer), [e, ka]);
    assert_eq!(clusters(&buffer), [0, 0]);
}

// Myanmar kinzi: Nga, Asat, Virama prefix sorts after the base.
#[test]
fn myanmar_kinzi() {
    let mut face = TestFace::default();
    let nga = face.map(0x1004, 1);
    let asat = face.map(0x103A, 2);
    let virama = face.map(0x1039, 3);
    let ka = face.map(0x1000, 4);

    let buffer = shape(
        &face,
        script::MYANMAR,
        b"mym2",
        &[0x1004, 0x103A, 0x1039, 0x1000],
    );

    assert_eq!(glyphs(&buffer), [ka, nga, asat, virama]);
}

// Myanmar left vowel: Ma + E. The vowel sign sorts in front.
#[test]
fn myanmar_vowel_e() {
    let mut face = TestFace::default();
    let ma = face.map(0x1019, 1);
    let e = face.map(0x1031, 2);

    let buffer = shape(&face, script::MYANMAR, b"mym2", &[0x1019, 0x1031]);

    assert_eq!(glyphs(&buffer), [e, ma]);
}

// Masks are stable for the life of a plan.
#[test]
fn mask_stability() {
    let face = TestFace::default();
    let plan = ShapePlan::new(&face, script::DEVANAGARI, Tag::from_bytes(b"dev2"));
    let rphf = plan.ot_map.get_1_mask(Tag::from_bytes(b"rphf"));
    let half = plan.ot_map.get_1_mask(Tag::from_bytes(b"half"));
    assert_ne!(rphf, 0);
    assert_ne!(half, 0);
    assert_ne!(rphf, half);
    assert_eq!(plan.ot_map.get_1_mask(Tag::from_bytes(b"rphf")), rphf);
}

// Multiple syllables get distinct adjacent serials.
#[test]
fn syllable_serials_differ() {
    let mut face = TestFace::default();
    face.map(0x0915, 1);
    face.map(0x093F, 2);

    let buffer = shape(
        &face,
        script::DEVANAGARI,
        b"dev2",
        &[0x0915, 0x093F, 0x0915, 0x093F],
    );

    let first = buffer.info[0].syllable;
    let last = buffer.info[buffer.len() - 1].syllable;
    assert_ne!(first >> 4, 0);
    assert_ne!(last >> 4, 0);
    assert_ne!(first, last);
}

// Shaping an already shaped run again yields the same glyph sequence.
#[test]
fn shaping_is_stable() {
    let mut face = TestFace::default();
    face.map(0x0915, 1);
    face.map(0x094D, 2);
    face.map(0x0937, 3);

    let once = shape(&face, script::DEVANAGARI, b"dev2", &[0x0915, 0x094D, 0x0937]);
    let twice = shape(&face, script::DEVANAGARI, b"dev2", &[0x0915, 0x094D, 0x0937]);
    assert_eq!(glyphs(&once), glyphs(&twice));
    assert_eq!(clusters(&once), clusters(&twice));
}
