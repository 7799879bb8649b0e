//! Glyph classifier contract.
//!
//! Equation detection asks two classifiers about every sizeable glyph: one
//! trained on math symbols and one for the page language. Both see the same
//! size-normalized glyph and answer with choices ranked best first.

use smol_str::SmolStr;
use unicode_properties::{GeneralCategoryGroup, UnicodeGeneralCategory};

use crate::geometry::BBox;
use crate::glyph::SpecialTextType;

/// Canonical x-height glyphs are scaled to before classification.
pub const NORMALIZED_X_HEIGHT: f32 = 128.0;

/// Character class properties of a unichar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnicharProps {
    pub alpha: bool,
    pub digit: bool,
    pub punctuation: bool,
}

impl UnicharProps {
    /// Derives the properties from the characters of `unichar`.
    ///
    /// A multi-character unichar has a property when all of its characters do.
    pub fn from_unichar(unichar: &str) -> Self {
        if unichar.is_empty() {
            return Self::default();
        }
        Self {
            alpha: unichar.chars().all(char::is_alphabetic),
            digit: unichar.chars().all(char::is_numeric),
            punctuation: unichar.chars().all(is_punctuation),
        }
    }
}

/// Unicode punctuation (general category P). Symbols such as `+`, `=` or
/// `|` are not punctuation.
pub fn is_punctuation(c: char) -> bool {
    c.general_category_group() == GeneralCategoryGroup::Punctuation
}

/// One ranked answer of a classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobChoice {
    pub unichar: SmolStr,
    /// Higher is more confident; values are usually negative.
    pub certainty: f32,
    pub props: UnicharProps,
    /// True when the matched font is italic.
    pub italic: bool,
}

impl BlobChoice {
    pub fn new(unichar: impl Into<SmolStr>, certainty: f32) -> Self {
        let unichar = unichar.into();
        let props = UnicharProps::from_unichar(&unichar);
        Self {
            unichar,
            certainty,
            props,
            italic: false,
        }
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }
}

/// A glyph moved so its bottom centre is at the origin and scaled so its
/// height matches [`NORMALIZED_X_HEIGHT`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedGlyph {
    /// Box of the glyph on the page.
    pub source: BBox,
    pub x_origin: f32,
    pub y_origin: f32,
    pub scale: f32,
}

impl NormalizedGlyph {
    pub fn new(source: BBox) -> Self {
        let height = source.height().max(1) as f32;
        Self {
            source,
            x_origin: (source.left + source.right) as f32 / 2.0,
            y_origin: source.bottom as f32,
            scale: NORMALIZED_X_HEIGHT / height,
        }
    }
}

/// Shape classifier consulted once per glyph.
pub trait GlyphClassifier {
    /// Ranked choices, best first. An empty list means no answer.
    fn classify(&self, glyph: &NormalizedGlyph) -> Vec<BlobChoice>;
}

impl<C: GlyphClassifier + ?Sized> GlyphClassifier for Box<C> {
    fn classify(&self, glyph: &NormalizedGlyph) -> Vec<BlobChoice> {
        (**self).classify(glyph)
    }
}

/// Characters that read as punctuation in ordinary text as often as in math.
const NON_MATH_PUNCTUATION: &[&str] = &[
    "'", "`", "\"", "\\", ",", ".", "\u{3008}", "\u{3009}", "\u{300a}", "\u{300b}", "\u{300d}",
    "\u{300c}",
];

/// Characters readily confused with digits.
const DIGIT_LIKE: &[char] = &['|'];

/// Guesses the special text type of the language model's answer.
pub fn estimate_type_for_unichar(choice: &BlobChoice) -> SpecialTextType {
    if choice.props.alpha {
        return SpecialTextType::None;
    }
    if choice.props.punctuation {
        return if NON_MATH_PUNCTUATION.contains(&choice.unichar.as_str()) {
            SpecialTextType::None
        } else {
            SpecialTextType::Math
        };
    }
    let mut chars = choice.unichar.chars();
    let digit_like = match (chars.next(), chars.next()) {
        (Some(c), None) => DIGIT_LIKE.contains(&c),
        _ => false,
    };
    if choice.props.digit || digit_like {
        SpecialTextType::Digit
    } else {
        SpecialTextType::Math
    }
}
