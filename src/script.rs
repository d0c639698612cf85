use crate::Tag;

/// A writing system, identified by its ISO 15924 tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Script(Tag);

impl Script {
    pub const fn from_tag(tag: Tag) -> Self {
        Script(tag)
    }

    pub const fn tag(self) -> Tag {
        self.0
    }
}

pub const DEVANAGARI: Script = Script(Tag::from_bytes(b"Deva"));
pub const BENGALI: Script = Script(Tag::from_bytes(b"Beng"));
pub const GURMUKHI: Script = Script(Tag::from_bytes(b"Guru"));
pub const GUJARATI: Script = Script(Tag::from_bytes(b"Gujr"));
pub const ORIYA: Script = Script(Tag::from_bytes(b"Orya"));
pub const TAMIL: Script = Script(Tag::from_bytes(b"Taml"));
pub const TELUGU: Script = Script(Tag::from_bytes(b"Telu"));
pub const KANNADA: Script = Script(Tag::from_bytes(b"Knda"));
pub const MALAYALAM: Script = Script(Tag::from_bytes(b"Mlym"));
pub const SINHALA: Script = Script(Tag::from_bytes(b"Sinh"));
pub const KHMER: Script = Script(Tag::from_bytes(b"Khmr"));
pub const MYANMAR: Script = Script(Tag::from_bytes(b"Mymr"));
