use bitflags::bitflags;

use crate::face::Face;
use crate::{Mask, Script, Tag};

bitflags! {
    pub struct FeatureFlags: u32 {
        const NONE = 0x0000;
        /// Feature applies to all characters; not setting a per-glyph mask bit.
        const GLOBAL = 0x0001;
        /// Don't skip over ZWNJ when matching, requires manual handling.
        const MANUAL_ZWNJ = 0x0002;
        /// Don't skip over ZWJ when matching, requires manual handling.
        const MANUAL_ZWJ = 0x0004;
        const MANUAL_JOINERS = Self::MANUAL_ZWNJ.bits | Self::MANUAL_ZWJ.bits;
        const GLOBAL_MANUAL_JOINERS = Self::GLOBAL.bits | Self::MANUAL_JOINERS.bits;
    }
}

#[derive(Clone, Copy)]
struct FeatureInfo {
    tag: Tag,
    flags: FeatureFlags,
}

/// Collects the features a shaper wants, in application order.
pub struct MapBuilder {
    pub script: Script,
    /// The GSUB script tag the font actually matched, e.g. `deva` or `dev2`.
    pub chosen_script: Tag,
    infos: Vec<FeatureInfo>,
}

impl MapBuilder {
    pub fn new(script: Script, chosen_script: Tag) -> Self {
        MapBuilder {
            script,
            chosen_script,
            infos: Vec::new(),
        }
    }

    pub fn add_feature(&mut self, tag: Tag, flags: FeatureFlags) {
        self.infos.push(FeatureInfo { tag, flags });
    }

    pub fn enable_feature(&mut self, tag: Tag, flags: FeatureFlags) {
        self.add_feature(tag, flags | FeatureFlags::GLOBAL);
    }

    /// Allocates mask bits and drops features the font doesn't carry.
    ///
    /// Bit 0 is the global bit every glyph starts with; global features
    /// share it. Bits 1..=7 are reserved for sibling shapers' positional
    /// masks. Non-global features take consecutive bits from 8 up, in the
    /// order they were added, which keeps mask values stable for the life
    /// of the compiled map.
    pub fn compile(self, face: &dyn Face) -> Map {
        const GLOBAL_BIT: u32 = 0;
        const FIRST_FREE_BIT: u32 = 8;

        let mut features = Vec::with_capacity(self.infos.len());
        let mut next_bit = FIRST_FREE_BIT;
        for info in &self.infos {
            if features.iter().any(|f: &FeatureMap| f.tag == info.tag) {
                continue;
            }
            if !face.has_feature(info.tag) {
                continue;
            }

            let mask = if info.flags.contains(FeatureFlags::GLOBAL) {
                1 << GLOBAL_BIT
            } else {
                if next_bit > 31 {
                    // Out of bits; the feature is dropped.
                    continue;
                }
                let mask = 1 << next_bit;
                next_bit += 1;
                mask
            };

            features.push(FeatureMap {
                tag: info.tag,
                mask,
                auto_zwnj: !info.flags.contains(FeatureFlags::MANUAL_ZWNJ),
                auto_zwj: !info.flags.contains(FeatureFlags::MANUAL_ZWJ),
            });
        }

        Map {
            chosen_script: self.chosen_script,
            features,
            global_mask: 1 << GLOBAL_BIT,
        }
    }
}

#[derive(Clone, Copy)]
pub struct FeatureMap {
    pub tag: Tag,
    pub mask: Mask,
    pub auto_zwnj: bool,
    pub auto_zwj: bool,
}

/// The compiled feature map of a shape plan.
pub struct Map {
    chosen_script: Tag,
    features: Vec<FeatureMap>,
    global_mask: Mask,
}

impl Map {
    pub fn chosen_script(&self) -> Tag {
        self.chosen_script
    }

    pub fn global_mask(&self) -> Mask {
        self.global_mask
    }

    pub fn get_feature(&self, tag: Tag) -> Option<&FeatureMap> {
        self.features.iter().find(|f| f.tag == tag)
    }

    /// The mask of `tag`, or 0 if the feature didn't make it into the map.
    pub fn get_1_mask(&self, tag: Tag) -> Mask {
        self.get_feature(tag).map_or(0, |f| f.mask)
    }
}

/// A conservative GSUB applicability tester bound to one feature.
pub struct WouldSubstituteFeature {
    tag: Tag,
    zero_context: bool,
    in_map: bool,
}

impl WouldSubstituteFeature {
    pub fn new(map: &Map, tag: Tag, zero_context: bool) -> Self {
        WouldSubstituteFeature {
            tag,
            zero_context,
            // A feature that didn't make it into the map can never apply.
            in_map: map.get_1_mask(tag) != 0,
        }
    }

    pub fn would_substitute(&self, face: &dyn Face, glyphs: &[u32]) -> bool {
        self.in_map && face.would_substitute(self.tag, glyphs, self.zero_context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::ot::feature;
    use crate::script;

    struct AllFeatures;

    impl Face for AllFeatures {
        fn glyph_index(&self, _: u32) -> Option<ttf_parser::GlyphId> {
            None
        }
        fn has_feature(&self, _: Tag) -> bool {
            true
        }
        fn would_substitute(&self, _: Tag, _: &[u32], _: bool) -> bool {
            false
        }
        fn apply_feature(
            &self,
            _: Tag,
            _: &mut Buffer,
            _: usize,
            end: usize,
            _: Mask,
            _: bool,
            _: bool,
        ) -> usize {
            end
        }
    }

    #[test]
    fn mask_allocation() {
        let mut builder = MapBuilder::new(script::DEVANAGARI, Tag::from_bytes(b"dev2"));
        builder.enable_feature(feature::NUKTA_FORMS, FeatureFlags::MANUAL_JOINERS);
        builder.add_feature(feature::REPH_FORMS, FeatureFlags::MANUAL_JOINERS);
        builder.add_feature(feature::HALF_FORMS, FeatureFlags::MANUAL_JOINERS);
        let map = builder.compile(&AllFeatures);

        assert_eq!(map.get_1_mask(feature::NUKTA_FORMS), 1);
        assert_eq!(map.get_1_mask(feature::REPH_FORMS), 1 << 8);
        assert_eq!(map.get_1_mask(feature::HALF_FORMS), 1 << 9);
        assert_eq!(map.get_1_mask(feature::AKHANDS), 0);
    }
}
