//! Glyphs: connected components owned by a partition.

use crate::geometry::BBox;

/// Per-glyph category assigned by the special-text labeler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpecialTextType {
    #[default]
    None,
    Italic,
    Digit,
    Math,
    Unclear,
    /// Excluded from classification because it duplicates a neighbour.
    Skip,
}

impl SpecialTextType {
    /// Number of distinct tags.
    pub const COUNT: usize = 6;

    pub const ALL: [SpecialTextType; Self::COUNT] = [
        Self::None,
        Self::Italic,
        Self::Digit,
        Self::Math,
        Self::Unclear,
        Self::Skip,
    ];

    /// Dense index used for per-tag tables.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Italic => "italic",
            Self::Digit => "digit",
            Self::Math => "math",
            Self::Unclear => "unclear",
            Self::Skip => "skip",
        }
    }
}

/// Coarse region type of a glyph, inherited from its partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlobRegionType {
    Noise,
    HLine,
    VLine,
    RectImage,
    PolyImage,
    #[default]
    Unknown,
    VertText,
    Text,
}

/// Text-flow confidence, ordered from weakest to strongest.
///
/// `Leader` sits at the end but always loses a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TextFlow {
    #[default]
    None,
    NonText,
    Neutral,
    TextOnImage,
    StrongChain,
    Chain,
    Leader,
}

impl TextFlow {
    /// True if `self` should survive when merged with `other`.
    pub fn dominates_in_merge(self, other: TextFlow) -> bool {
        if self == TextFlow::Leader {
            return false;
        }
        if other == TextFlow::Leader {
            return true;
        }
        self >= other
    }
}

/// A single connected component.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub bbox: BBox,
    pub special_text_type: SpecialTextType,
    /// Set when upstream segmentation merged this glyph into its predecessor.
    pub joined_to_prev: bool,
    pub region_type: BlobRegionType,
    pub flow: TextFlow,
}

impl Glyph {
    pub fn new(bbox: BBox) -> Self {
        Self {
            bbox,
            special_text_type: SpecialTextType::None,
            joined_to_prev: false,
            region_type: BlobRegionType::Unknown,
            flow: TextFlow::None,
        }
    }

    /// Builder-style tag setter, mostly for fixtures.
    pub fn with_type(mut self, special_text_type: SpecialTextType) -> Self {
        self.special_text_type = special_text_type;
        self
    }
}

/// Resets the special-text tag of every glyph to `None`.
pub fn reset_special_text<'a>(glyphs: impl IntoIterator<Item = &'a mut Glyph>) {
    for glyph in glyphs {
        glyph.special_text_type = SpecialTextType::None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leader_always_loses() {
        assert!(!TextFlow::Leader.dominates_in_merge(TextFlow::None));
        assert!(TextFlow::None.dominates_in_merge(TextFlow::Leader));
        assert!(TextFlow::Chain.dominates_in_merge(TextFlow::StrongChain));
        assert!(!TextFlow::Neutral.dominates_in_merge(TextFlow::Chain));
        assert!(TextFlow::Neutral.dominates_in_merge(TextFlow::Neutral));
    }

    #[test]
    fn test_reset_special_text() {
        let mut glyphs = vec![
            Glyph::new(BBox::new(0, 0, 1, 1)).with_type(SpecialTextType::Math),
            Glyph::new(BBox::new(2, 0, 3, 1)).with_type(SpecialTextType::Skip),
        ];
        reset_special_text(glyphs.iter_mut());
        assert!(
            glyphs
                .iter()
                .all(|g| g.special_text_type == SpecialTextType::None)
        );
    }

    #[test]
    fn test_type_indices_are_dense() {
        for (i, t) in SpecialTextType::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }
}
