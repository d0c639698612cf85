//! Registered OpenType feature tags used by the complex shapers.

use crate::Tag;

// Basic shaping forms.
pub const NUKTA_FORMS: Tag = Tag::from_bytes(b"nukt");
pub const AKHANDS: Tag = Tag::from_bytes(b"akhn");
pub const REPH_FORMS: Tag = Tag::from_bytes(b"rphf");
pub const RAKAR_FORMS: Tag = Tag::from_bytes(b"rkrf");
pub const PRE_BASE_FORMS: Tag = Tag::from_bytes(b"pref");
pub const BELOW_BASE_FORMS: Tag = Tag::from_bytes(b"blwf");
pub const ABOVE_BASE_FORMS: Tag = Tag::from_bytes(b"abvf");
pub const HALF_FORMS: Tag = Tag::from_bytes(b"half");
pub const POST_BASE_FORMS: Tag = Tag::from_bytes(b"pstf");
pub const VATTU_VARIANTS: Tag = Tag::from_bytes(b"vatu");
pub const CONJUNCT_FORMS: Tag = Tag::from_bytes(b"cjct");

// Presentation forms, applied after the final reordering.
pub const INITIAL_FORMS: Tag = Tag::from_bytes(b"init");
pub const PRE_BASE_SUBSTITUTIONS: Tag = Tag::from_bytes(b"pres");
pub const ABOVE_BASE_SUBSTITUTIONS: Tag = Tag::from_bytes(b"abvs");
pub const BELOW_BASE_SUBSTITUTIONS: Tag = Tag::from_bytes(b"blws");
pub const POST_BASE_SUBSTITUTIONS: Tag = Tag::from_bytes(b"psts");
pub const HALANT_FORMS: Tag = Tag::from_bytes(b"haln");

// Khmer.
pub const CONJUNCT_FORM_AFTER_RO: Tag = Tag::from_bytes(b"cfar");

// Neutral horizontal features.
pub const CONTEXTUAL_ALTERNATES: Tag = Tag::from_bytes(b"calt");
pub const CONTEXTUAL_LIGATURES: Tag = Tag::from_bytes(b"clig");
