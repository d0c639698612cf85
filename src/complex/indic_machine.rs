//! Indic syllable recognition.
//!
//! A hand-written recognizer for the Indic syllable grammar. Productions
//! are tried at each start position and the longest match wins; anything
//! no production accepts becomes a broken cluster (if it starts with
//! syllable material) or a non-Indic cluster.

use log::trace;

use super::indic::category as cat;
use super::HAS_BROKEN_SYLLABLE;
use crate::buffer::Buffer;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SyllableType {
    ConsonantSyllable = 0,
    VowelSyllable,
    StandaloneCluster,
    SymbolCluster,
    BrokenCluster,
    NonIndicCluster,
}

pub fn find_syllables_indic(buffer: &mut Buffer) {
    let cats: Vec<u8> = buffer.info.iter().map(|info| info.category).collect();

    let mut has_broken = false;
    let mut serial: u8 = 1;
    let mut start = 0;
    while start < cats.len() {
        let (end, syllable_type) = match_syllable(&cats, start);
        debug_assert!(end > start);

        if syllable_type == SyllableType::BrokenCluster {
            has_broken = true;
        }

        let tag = (serial << 4) | syllable_type as u8;
        for info in &mut buffer.info[start..end] {
            info.syllable = tag;
        }
        trace!(
            "syllable {}: [{}, {}) {:?}",
            serial,
            start,
            end,
            syllable_type
        );

        serial = if serial == 15 { 1 } else { serial + 1 };
        start = end;
    }

    if has_broken {
        buffer.scratch_flags |= HAS_BROKEN_SYLLABLE;
    }
}

fn match_syllable(cats: &[u8], start: usize) -> (usize, SyllableType) {
    let candidates = [
        (
            match_consonant_syllable(cats, start),
            SyllableType::ConsonantSyllable,
        ),
        (match_vowel_syllable(cats, start), SyllableType::VowelSyllable),
        (
            match_standalone_cluster(cats, start),
            SyllableType::StandaloneCluster,
        ),
        (match_symbol_cluster(cats, start), SyllableType::SymbolCluster),
        (match_broken_cluster(cats, start), SyllableType::BrokenCluster),
    ];

    let mut best = None;
    for &(end, syllable_type) in &candidates {
        if let Some(end) = end {
            if best.map_or(true, |(best_end, _)| end > best_end) {
                best = Some((end, syllable_type));
            }
        }
    }

    best.unwrap_or((start + 1, SyllableType::NonIndicCluster))
}

#[inline]
fn get(cats: &[u8], i: usize) -> Option<u8> {
    cats.get(i).copied()
}

#[inline]
fn is_joiner_cat(c: u8) -> bool {
    c == cat::ZWJ || c == cat::ZWNJ
}

#[inline]
fn is_c(c: u8) -> bool {
    c == cat::C || c == cat::RA
}

// n = ((ZWNJ? RS)? (N N?)?). Matches the empty string.
fn match_n(cats: &[u8], mut i: usize) -> usize {
    let mut j = i;
    if get(cats, j) == Some(cat::ZWNJ) {
        j += 1;
    }
    if get(cats, j) == Some(cat::RS) {
        i = j + 1;
    }
    if get(cats, i) == Some(cat::N) {
        i += 1;
        if get(cats, i) == Some(cat::N) {
            i += 1;
        }
    }
    i
}

// cn = c ZWJ? n
fn match_cn(cats: &[u8], mut i: usize) -> Option<usize> {
    if !get(cats, i).map_or(false, is_c) {
        return None;
    }
    i += 1;
    if get(cats, i) == Some(cat::ZWJ) {
        i += 1;
    }
    Some(match_n(cats, i))
}

// reph = Ra H | Repha
fn match_reph(cats: &[u8], i: usize) -> Option<usize> {
    if get(cats, i) == Some(cat::RA) && get(cats, i + 1) == Some(cat::H) {
        return Some(i + 2);
    }
    if get(cats, i) == Some(cat::REPHA) {
        return Some(i + 1);
    }
    None
}

// forced_rakar = ZWJ H ZWJ Ra
fn match_forced_rakar(cats: &[u8], i: usize) -> Option<usize> {
    if get(cats, i) == Some(cat::ZWJ)
        && get(cats, i + 1) == Some(cat::H)
        && get(cats, i + 2) == Some(cat::ZWJ)
        && get(cats, i + 3) == Some(cat::RA)
    {
        Some(i + 4)
    } else {
        None
    }
}

// matra_group = z* (M | MPst) N? (H | forced_rakar)?
fn match_matra_group(cats: &[u8], i: usize) -> Option<usize> {
    let mut j = i;
    while get(cats, j).map_or(false, is_joiner_cat) {
        j += 1;
    }
    match get(cats, j) {
        Some(cat::M) | Some(cat::MPST) => j += 1,
        _ => return None,
    }
    if get(cats, j) == Some(cat::N) {
        j += 1;
    }
    if let Some(k) = match_forced_rakar(cats, j) {
        j = k;
    } else if get(cats, j) == Some(cat::H) {
        j += 1;
    }
    Some(j)
}

// syllable_tail = (z? SM SM? ZWNJ?)? (A | VD)*. Matches the empty string.
fn match_syllable_tail(cats: &[u8], mut i: usize) -> usize {
    let mut j = i;
    if get(cats, j).map_or(false, is_joiner_cat) {
        j += 1;
    }
    if get(cats, j) == Some(cat::SM) {
        j += 1;
        if get(cats, j) == Some(cat::SM) {
            j += 1;
        }
        if get(cats, j) == Some(cat::ZWNJ) {
            j += 1;
        }
        i = j;
    }
    while matches!(get(cats, i), Some(cat::A) | Some(cat::VD)) {
        i += 1;
    }
    i
}

// halant_group = z? H (ZWJ N?)?
fn match_halant_group(cats: &[u8], i: usize) -> Option<usize> {
    let mut j = i;
    if get(cats, j).map_or(false, is_joiner_cat) {
        j += 1;
    }
    if get(cats, j) != Some(cat::H) {
        return None;
    }
    j += 1;
    if get(cats, j) == Some(cat::ZWJ) {
        j += 1;
        if get(cats, j) == Some(cat::N) {
            j += 1;
        }
    }
    Some(j)
}

// final_halant_group = halant_group | H ZWNJ
fn match_final_halant_group(cats: &[u8], i: usize) -> Option<usize> {
    let mut j = match_halant_group(cats, i)?;
    if j == i + 1 && get(cats, j) == Some(cat::ZWNJ) {
        j += 1;
    }
    Some(j)
}

// complex_syllable_tail = (halant_group cn)* medial_group
//                         halant_or_matra_group syllable_tail
// Matches the empty string.
fn match_complex_syllable_tail(cats: &[u8], mut i: usize) -> usize {
    loop {
        let halant_end = match match_halant_group(cats, i) {
            Some(j) => j,
            None => break,
        };
        match match_cn(cats, halant_end) {
            Some(j) => i = j,
            None => break,
        }
    }

    // medial_group = CM?
    if get(cats, i) == Some(cat::CM) {
        i += 1;
    }

    // halant_or_matra_group = final_halant_group | matra_group{0,4}
    if let Some(j) = match_final_halant_group(cats, i) {
        i = j;
    } else {
        for _ in 0..4 {
            match match_matra_group(cats, i) {
                Some(j) => i = j,
                None => break,
            }
        }
    }

    match_syllable_tail(cats, i)
}

// consonant_syllable = (Repha | CS)? cn complex_syllable_tail
fn match_consonant_syllable(cats: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    if matches!(get(cats, i), Some(cat::REPHA) | Some(cat::CS)) {
        i += 1;
    }
    let i = match_cn(cats, i)?;
    Some(match_complex_syllable_tail(cats, i))
}

// vowel_syllable = reph? V n (ZWJ | complex_syllable_tail)
fn match_vowel_syllable(cats: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    if let Some(j) = match_reph(cats, i) {
        if get(cats, j) == Some(cat::V) {
            i = j;
        }
    }
    if get(cats, i) != Some(cat::V) {
        return None;
    }
    i += 1;
    i = match_n(cats, i);

    let tail = match_complex_syllable_tail(cats, i);
    if get(cats, i) == Some(cat::ZWJ) && i + 1 > tail {
        Some(i + 1)
    } else {
        Some(tail)
    }
}

// standalone_cluster = ((Repha | CS)? PLACEHOLDER | reph? DOTTEDCIRCLE)
//                      n complex_syllable_tail
fn match_standalone_cluster(cats: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    let mut matched = false;

    let mut j = start;
    if matches!(get(cats, j), Some(cat::REPHA) | Some(cat::CS)) {
        j += 1;
    }
    if get(cats, j) == Some(cat::PLACEHOLDER) {
        i = j + 1;
        matched = true;
    }

    if !matched {
        let mut j = start;
        if let Some(k) = match_reph(cats, j) {
            if get(cats, k) == Some(cat::DOTTED_CIRCLE) {
                j = k;
            }
        }
        if get(cats, j) == Some(cat::DOTTED_CIRCLE) {
            i = j + 1;
            matched = true;
        }
    }

    if !matched {
        return None;
    }
    let i = match_n(cats, i);
    Some(match_complex_syllable_tail(cats, i))
}

// symbol_cluster = Symbol N? syllable_tail
fn match_symbol_cluster(cats: &[u8], start: usize) -> Option<usize> {
    if get(cats, start) != Some(cat::SYMBOL) {
        return None;
    }
    let mut i = start + 1;
    if get(cats, i) == Some(cat::N) {
        i += 1;
    }
    Some(match_syllable_tail(cats, i))
}

// broken_cluster = reph? n complex_syllable_tail, non-empty
fn match_broken_cluster(cats: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    if let Some(j) = match_reph(cats, i) {
        i = j;
    }
    i = match_n(cats, i);
    i = match_complex_syllable_tail(cats, i);
    if i > start {
        Some(i)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syllables_of(categories: &[u8]) -> Vec<(usize, usize, SyllableType)> {
        let mut out = Vec::new();
        let mut start = 0;
        while start < categories.len() {
            let (end, t) = match_syllable(categories, start);
            out.push((start, end, t));
            start = end;
        }
        out
    }

    #[test]
    fn consonant_halant_consonant() {
        // Ka Halant Ssa
        let s = syllables_of(&[cat::C, cat::H, cat::C]);
        assert_eq!(s, [(0, 3, SyllableType::ConsonantSyllable)]);
    }

    #[test]
    fn reph_then_base() {
        // Ra Halant Ka
        let s = syllables_of(&[cat::RA, cat::H, cat::C]);
        assert_eq!(s, [(0, 3, SyllableType::ConsonantSyllable)]);
    }

    #[test]
    fn matras_extend_the_syllable() {
        // Ka I-matra I-matra: up to four matra groups are accepted.
        let s = syllables_of(&[cat::C, cat::M, cat::M]);
        assert_eq!(s, [(0, 3, SyllableType::ConsonantSyllable)]);
    }

    #[test]
    fn zwnj_ends_syllable() {
        // Ka Halant ZWNJ Ka: explicit virama form, the syllable breaks.
        let s = syllables_of(&[cat::C, cat::H, cat::ZWNJ, cat::C]);
        assert_eq!(
            s,
            [
                (0, 3, SyllableType::ConsonantSyllable),
                (3, 4, SyllableType::ConsonantSyllable),
            ]
        );
    }

    #[test]
    fn lone_halant_is_broken() {
        let s = syllables_of(&[cat::H]);
        assert_eq!(s, [(0, 1, SyllableType::BrokenCluster)]);
    }

    #[test]
    fn latin_is_non_indic() {
        let s = syllables_of(&[cat::X, cat::X]);
        assert_eq!(
            s,
            [
                (0, 1, SyllableType::NonIndicCluster),
                (1, 2, SyllableType::NonIndicCluster),
            ]
        );
    }

    #[test]
    fn digit_is_standalone() {
        let s = syllables_of(&[cat::PLACEHOLDER]);
        assert_eq!(s, [(0, 1, SyllableType::StandaloneCluster)]);
    }
}
