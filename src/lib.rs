/*!
`matra` is a complex-script shaping core: it turns a mapped, normalized
run of Indic, Khmer or Myanmar codepoints into a correctly ordered,
feature-tagged glyph run, ready for OpenType GSUB/GPOS application.

The crate owns syllable segmentation, per-glyph categorization, base
consonant selection, both reordering passes and the per-syllable feature
masks. Everything font-side — cmap, GSUB introspection and application —
is consumed through the [`Face`] oracle trait, so the core itself never
parses a font binary.

```no_run
use matra::{script, Buffer, Face, ShapePlan, Tag};

fn shape(face: &dyn Face, buffer: &mut Buffer) {
    let plan = ShapePlan::new(face, script::DEVANAGARI, Tag::from_bytes(b"dev2"));
    matra::shape_complex_script(&plan, face, buffer);
}
```
*/

mod buffer;
mod face;
mod shape;
mod tag;
mod unicode;

pub mod complex;
pub mod ot;
pub mod script;

pub use ttf_parser::GlyphId;

pub use buffer::{Buffer, BufferScratchFlags, GlyphInfo, GlyphPropsFlags};
pub use face::Face;
pub use ot::ShapePlan;
pub use script::Script;
pub use shape::shape_complex_script;
pub use tag::Tag;

/// A glyph lookup mask.
pub type Mask = u32;
