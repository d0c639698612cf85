//! Myanmar syllable recognition.

use log::trace;

use super::indic::category as cat;
use super::myanmar::myanmar_category as mcat;
use super::HAS_BROKEN_SYLLABLE;
use crate::buffer::Buffer;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SyllableType {
    ConsonantSyllable = 0,
    PunctuationCluster = 1,
    BrokenCluster = 2,
    NonMyanmarCluster = 3,
}

pub fn find_syllables_myanmar(buffer: &mut Buffer) {
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
            "myanmar syllable {}: [{}, {}) {:?}",
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
    if let Some(end) = match_consonant_syllable(cats, start) {
        return (end, SyllableType::ConsonantSyllable);
    }
    if get(cats, start) == Some(mcat::P) {
        return (start + 1, SyllableType::PunctuationCluster);
    }
    if let Some(end) = match_broken_cluster(cats, start) {
        return (end, SyllableType::BrokenCluster);
    }
    (start + 1, SyllableType::NonMyanmarCluster)
}

#[inline]
fn get(cats: &[u8], i: usize) -> Option<u8> {
    cats.get(i).copied()
}

#[inline]
fn is_c(c: u8) -> bool {
    c == cat::C || c == cat::RA
}

// k = Ra As H (the kinzi-forming prefix)
fn match_kinzi(cats: &[u8], i: usize) -> Option<usize> {
    if get(cats, i) == Some(cat::RA)
        && get(cats, i + 1) == Some(mcat::AS)
        && get(cats, i + 2) == Some(cat::H)
    {
        Some(i + 3)
    } else {
        None
    }
}

// medial_group = MY? As? MR? ((MW MH? | MH) As?)?. Matches the empty string.
fn match_medial_group(cats: &[u8], mut i: usize) -> usize {
    if get(cats, i) == Some(mcat::MY) {
        i += 1;
    }
    if get(cats, i) == Some(mcat::AS) {
        i += 1;
    }
    if get(cats, i) == Some(mcat::MR) {
        i += 1;
    }
    let mut matched = false;
    if get(cats, i) == Some(mcat::MW) {
        i += 1;
        matched = true;
        if get(cats, i) == Some(mcat::MH) {
            i += 1;
        }
    } else if get(cats, i) == Some(mcat::MH) {
        i += 1;
        matched = true;
    }
    if matched && get(cats, i) == Some(mcat::AS) {
        i += 1;
    }
    i
}

// main_vowel_group = (VPre VS?)* VAbv* VBlw* A* (DB As?)?
// Matches the empty string.
fn match_main_vowel_group(cats: &[u8], mut i: usize) -> usize {
    while get(cats, i) == Some(mcat::VPRE) {
        i += 1;
        if get(cats, i) == Some(mcat::VS) {
            i += 1;
        }
    }
    while get(cats, i) == Some(mcat::VABV) {
        i += 1;
    }
    while get(cats, i) == Some(mcat::VBLW) {
        i += 1;
    }
    while get(cats, i) == Some(cat::A) {
        i += 1;
    }
    if get(cats, i) == Some(cat::N) {
        i += 1;
        if get(cats, i) == Some(mcat::AS) {
            i += 1;
        }
    }
    i
}

// post_vowel_group = VPst MH? As* VAbv* A* (DB As?)?
fn match_post_vowel_group(cats: &[u8], i: usize) -> Option<usize> {
    if get(cats, i) != Some(mcat::VPST) {
        return None;
    }
    let mut i = i + 1;
    if get(cats, i) == Some(mcat::MH) {
        i += 1;
    }
    while get(cats, i) == Some(mcat::AS) {
        i += 1;
    }
    while get(cats, i) == Some(mcat::VABV) {
        i += 1;
    }
    while get(cats, i) == Some(cat::A) {
        i += 1;
    }
    if get(cats, i) == Some(cat::N) {
        i += 1;
        if get(cats, i) == Some(mcat::AS) {
            i += 1;
        }
    }
    Some(i)
}

// pwo_tone_group = PT A* DB? As?
fn match_pwo_tone_group(cats: &[u8], i: usize) -> Option<usize> {
    if get(cats, i) != Some(mcat::PT) {
        return None;
    }
    let mut i = i + 1;
    while get(cats, i) == Some(cat::A) {
        i += 1;
    }
    if get(cats, i) == Some(cat::N) {
        i += 1;
    }
    if get(cats, i) == Some(mcat::AS) {
        i += 1;
    }
    Some(i)
}

// complex_syllable_tail = As* medial_group main_vowel_group
//                         post_vowel_group* (pwo_tone_group | SM)* V* j?
// Matches the empty string.
fn match_complex_syllable_tail(cats: &[u8], mut i: usize) -> usize {
    while get(cats, i) == Some(mcat::AS) {
        i += 1;
    }
    i = match_medial_group(cats, i);
    i = match_main_vowel_group(cats, i);
    while let Some(j) = match_post_vowel_group(cats, i) {
        i = j;
    }
    loop {
        if let Some(j) = match_pwo_tone_group(cats, i) {
            i = j;
        } else if get(cats, i) == Some(cat::SM) {
            i += 1;
        } else {
            break;
        }
    }
    while get(cats, i) == Some(cat::V) {
        i += 1;
    }
    if matches!(get(cats, i), Some(cat::ZWJ) | Some(cat::ZWNJ)) {
        i += 1;
    }
    i
}

// syllable_tail = (H (c | V) VS?)* (H | complex_syllable_tail)
fn match_syllable_tail(cats: &[u8], mut i: usize) -> usize {
    loop {
        if get(cats, i) != Some(cat::H) {
            break;
        }
        let j = i + 1;
        if !(get(cats, j).map_or(false, is_c) || get(cats, j) == Some(cat::V)) {
            break;
        }
        i = j + 1;
        if get(cats, i) == Some(mcat::VS) {
            i += 1;
        }
    }

    if get(cats, i) == Some(cat::H) {
        i + 1
    } else {
        match_complex_syllable_tail(cats, i)
    }
}

// consonant_syllable = (k | CS)? (c | V | D | D0 | GB | DOTTEDCIRCLE) VS?
//                      syllable_tail
fn match_consonant_syllable(cats: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    if let Some(j) = match_kinzi(cats, i) {
        i = j;
    } else if get(cats, i) == Some(cat::CS) {
        i += 1;
    }

    let leader = get(cats, i)?;
    if !(is_c(leader)
        || leader == cat::V
        || leader == mcat::D
        || leader == mcat::D0
        || leader == cat::PLACEHOLDER
        || leader == cat::DOTTED_CIRCLE)
    {
        return None;
    }
    i += 1;
    if get(cats, i) == Some(mcat::VS) {
        i += 1;
    }

    Some(match_syllable_tail(cats, i))
}

// broken_cluster = k? VS? syllable_tail, non-empty
fn match_broken_cluster(cats: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    if let Some(j) = match_kinzi(cats, i) {
        i = j;
    }
    if get(cats, i) == Some(mcat::VS) {
        i += 1;
    }
    i = match_syllable_tail(cats, i);
    if i > start {
        Some(i)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinzi_prefix() {
        // Nga As H Ka
        let cats = [cat::RA, mcat::AS, cat::H, cat::C];
        assert_eq!(
            match_syllable(&cats, 0),
            (4, SyllableType::ConsonantSyllable)
        );
    }

    #[test]
    fn medials_and_vowels() {
        // Ma MR VPre: medial ra then the left vowel
        let cats = [cat::C, mcat::MR, mcat::VPRE];
        assert_eq!(
            match_syllable(&cats, 0),
            (3, SyllableType::ConsonantSyllable)
        );
    }

    #[test]
    fn punctuation() {
        let cats = [mcat::P];
        assert_eq!(
            match_syllable(&cats, 0),
            (1, SyllableType::PunctuationCluster)
        );
    }

    #[test]
    fn stacked_consonants() {
        // Ka H Ka
        let cats = [cat::C, cat::H, cat::C];
        assert_eq!(
            match_syllable(&cats, 0),
            (3, SyllableType::ConsonantSyllable)
        );
    }
}
