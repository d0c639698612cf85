//! Khmer syllable recognition.

use log::trace;

use super::indic::category as cat;
use super::khmer::khmer_category as kcat;
use super::HAS_BROKEN_SYLLABLE;
use crate::buffer::Buffer;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SyllableType {
    ConsonantSyllable = 0,
    BrokenCluster = 1,
    NonKhmerCluster = 2,
}

pub fn find_syllables_khmer(buffer: &mut Buffer) {
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
            "khmer syllable {}: [{}, {}) {:?}",
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
    if let Some(end) = match_broken_cluster(cats, start) {
        return (end, SyllableType::BrokenCluster);
    }
    (start + 1, SyllableType::NonKhmerCluster)
}

#[inline]
fn get(cats: &[u8], i: usize) -> Option<u8> {
    cats.get(i).copied()
}

#[inline]
fn is_joiner_cat(c: u8) -> bool {
    c == cat::ZWJ || c == cat::ZWNJ
}

// c = C | Ra | V
#[inline]
fn is_c(c: u8) -> bool {
    c == cat::C || c == cat::RA || c == cat::V
}

// cn = c (joiner? Robatic)?
fn match_cn(cats: &[u8], i: usize) -> Option<usize> {
    if !get(cats, i).map_or(false, is_c) {
        return None;
    }
    let mut j = i + 1;
    let mut k = j;
    if get(cats, k).map_or(false, is_joiner_cat) {
        k += 1;
    }
    if get(cats, k) == Some(kcat::ROBATIC) {
        j = k + 1;
    }
    Some(j)
}

// xgroup = (joiner* Xgroup)*. Matches the empty string.
fn match_xgroup(cats: &[u8], mut i: usize) -> usize {
    loop {
        let mut j = i;
        while get(cats, j).map_or(false, is_joiner_cat) {
            j += 1;
        }
        if get(cats, j) == Some(kcat::XGROUP) {
            i = j + 1;
        } else {
            return i;
        }
    }
}

// ygroup = Ygroup*. Matches the empty string.
fn match_ygroup(cats: &[u8], mut i: usize) -> usize {
    while get(cats, i) == Some(kcat::YGROUP) {
        i += 1;
    }
    i
}

// matra_group = VPre? xgroup VBlw? xgroup (VAbv | VPst)? xgroup ygroup
// Matches the empty string.
fn match_matra_group(cats: &[u8], mut i: usize) -> usize {
    if get(cats, i) == Some(kcat::VPRE) {
        i += 1;
    }
    i = match_xgroup(cats, i);
    if get(cats, i) == Some(kcat::VBLW) {
        i += 1;
    }
    i = match_xgroup(cats, i);
    if matches!(get(cats, i), Some(kcat::VABV) | Some(kcat::VPST)) {
        i += 1;
    }
    i = match_xgroup(cats, i);
    match_ygroup(cats, i)
}

// coeng_cn = Coeng cn
fn match_coeng_cn(cats: &[u8], i: usize) -> Option<usize> {
    if get(cats, i) != Some(cat::H) {
        return None;
    }
    match_cn(cats, i + 1)
}

// syllable_tail = xgroup matra_group xgroup (Coeng cn)? ygroup
// Matches the empty string.
fn match_syllable_tail(cats: &[u8], mut i: usize) -> usize {
    i = match_xgroup(cats, i);
    i = match_matra_group(cats, i);
    i = match_xgroup(cats, i);
    if let Some(j) = match_coeng_cn(cats, i) {
        i = j;
    }
    match_ygroup(cats, i)
}

// consonant_syllable = (cn | PLACEHOLDER | DOTTEDCIRCLE)
//                      (joiner? Coeng cn)* syllable_tail
fn match_consonant_syllable(cats: &[u8], start: usize) -> Option<usize> {
    let mut i = match match_cn(cats, start) {
        Some(i) => i,
        None => {
            if matches!(
                get(cats, start),
                Some(cat::PLACEHOLDER) | Some(cat::DOTTED_CIRCLE)
            ) {
                start + 1
            } else {
                return None;
            }
        }
    };

    loop {
        let mut j = i;
        if get(cats, j).map_or(false, is_joiner_cat) {
            j += 1;
        }
        match match_coeng_cn(cats, j) {
            Some(k) => i = k,
            None => break,
        }
    }

    Some(match_syllable_tail(cats, i))
}

// broken_cluster = (Coeng cn)? syllable_tail, non-empty
fn match_broken_cluster(cats: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    if let Some(j) = match_coeng_cn(cats, i) {
        i = j;
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
    fn coeng_stack() {
        // Ka Coeng Ka
        let cats = [cat::C, cat::H, cat::C];
        assert_eq!(
            match_syllable(&cats, 0),
            (3, SyllableType::ConsonantSyllable)
        );
    }

    #[test]
    fn vowels_attach() {
        // Ka VPre
        let cats = [cat::C, kcat::VPRE];
        assert_eq!(
            match_syllable(&cats, 0),
            (2, SyllableType::ConsonantSyllable)
        );
    }

    #[test]
    fn lone_coeng_is_broken() {
        let cats = [cat::H, cat::C];
        assert_eq!(match_syllable(&cats, 0), (2, SyllableType::BrokenCluster));
    }

    #[test]
    fn non_khmer() {
        let cats = [cat::X];
        assert_eq!(
            match_syllable(&cats, 0),
            (1, SyllableType::NonKhmerCluster)
        );
    }
}
