//! Pass 0: per-glyph special text labeling.

use crate::classify::{BlobChoice, GlyphClassifier, NormalizedGlyph, estimate_type_for_unichar};
use crate::geometry::BBox;
use crate::glyph::{Glyph, SpecialTextType, reset_special_text};
use crate::grid::PartitionGrid;
use crate::params::EquationParams;

/// Labels the glyphs of every text or equation partition. Returns how many
/// glyphs were sent to the classifiers.
pub(crate) fn identify_special_text(
    grid: &mut PartitionGrid,
    params: &EquationParams,
    math: &dyn GlyphClassifier,
    lang: &dyn GlyphClassifier,
) -> usize {
    let mut classified = 0;
    for id in grid.full_search() {
        let part = grid.part_mut(id);
        if !part.part_type().is_text_or_equation() {
            continue;
        }
        let glyphs = part.glyphs_mut();
        reset_special_text(glyphs.iter_mut());
        identify_blobs_to_skip(glyphs, params);

        let mut heights: Vec<i32> = glyphs
            .iter()
            .filter(|g| g.special_text_type != SpecialTextType::Skip)
            .map(|g| g.bbox.height())
            .collect();
        if heights.is_empty() {
            continue;
        }
        heights.sort_unstable();
        let height_th = heights[heights.len() / 2] / 3 * 2;

        for glyph in glyphs
            .iter_mut()
            .filter(|g| g.special_text_type != SpecialTextType::Skip)
        {
            if glyph.bbox.height() < height_th && height_th > 0 {
                glyph.special_text_type = SpecialTextType::None;
                continue;
            }
            glyph.special_text_type = classify_glyph(glyph.bbox, params, math, lang);
            classified += 1;
        }
    }
    tracing::debug!(classified, "labeled special text");
    classified
}

fn classify_glyph(
    bbox: BBox,
    params: &EquationParams,
    math: &dyn GlyphClassifier,
    lang: &dyn GlyphClassifier,
) -> SpecialTextType {
    let normalized = NormalizedGlyph::new(bbox);
    let math_choices = math.classify(&normalized);
    let lang_choices = lang.classify(&normalized);
    decide_special_type(math_choices.first(), lang_choices.first(), params)
}

/// Picks a tag from the top answers of the math and language classifiers.
///
/// A missing answer counts as the lowest possible certainty.
pub fn decide_special_type(
    math: Option<&BlobChoice>,
    lang: Option<&BlobChoice>,
    params: &EquationParams,
) -> SpecialTextType {
    let math_score = math.map_or(f32::MIN, |c| c.certainty);
    let lang_score = lang.map_or(f32::MIN, |c| c.certainty);
    let diff = (lang_score - math_score).abs();

    let tag = if math_score.max(lang_score) < params.confidence_floor {
        SpecialTextType::Unclear
    } else if diff > params.confidence_gap && math_score > lang_score {
        SpecialTextType::Math
    } else if let Some(choice) = lang {
        estimate_type_for_unichar(choice)
    } else {
        SpecialTextType::None
    };

    if tag == SpecialTextType::None && lang.is_some_and(|c| c.italic) {
        SpecialTextType::Italic
    } else {
        tag
    }
}

/// Tags glyphs that duplicate the glyph before them as Skip.
///
/// Glyphs must be sorted by left edge. Starting from each untagged glyph,
/// every following glyph that starts left of the accumulated right edge and
/// overlaps it closely in both size and position is merged into the
/// accumulated box; the starting glyph is skipped too when anything merged.
///
/// # Panics
/// Panics if a glyph is already joined to its predecessor.
pub fn identify_blobs_to_skip(glyphs: &mut [Glyph], params: &EquationParams) {
    assert!(
        glyphs.iter().all(|g| !g.joined_to_prev),
        "glyph joined to its predecessor before skip detection"
    );
    for i in 0..glyphs.len() {
        if glyphs[i].special_text_type == SpecialTextType::Skip {
            continue;
        }
        let mut coverage = glyphs[i].bbox;
        let mut found = false;
        for next in glyphs[i + 1..].iter_mut() {
            let next_box = next.bbox;
            if next_box.left >= coverage.right {
                break;
            }
            let x_overlap = coverage.major_x_overlap(&next_box);
            let y_overlap = coverage.y_overlap(&next_box);
            let width_ratio = ratio(next_box.width(), coverage.width());
            let height_ratio = ratio(next_box.height(), coverage.height());
            if x_overlap
                && y_overlap
                && width_ratio > params.skip_width_ratio
                && height_ratio > params.skip_height_ratio
            {
                found = true;
                next.special_text_type = SpecialTextType::Skip;
                coverage += next_box;
            }
        }
        if found {
            glyphs[i].special_text_type = SpecialTextType::Skip;
        }
    }
}

/// Smaller over larger; 0 when both are 0.
fn ratio(a: i32, b: i32) -> f32 {
    let (lo, hi) = (a.min(b), a.max(b));
    if hi == 0 {
        0.0
    } else {
        lo as f32 / hi as f32
    }
}
