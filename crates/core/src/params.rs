//! Equation detection parameters.
//!
//! Contains [`EquationParams`], the thresholds used by every detection pass.
//! Distances are given in inches and converted to pixels with
//! [`EquationParams::px`] once the page resolution is known.

use crate::error::{EquationError, Result};

/// Thresholds for equation detection.
#[derive(Debug, Clone, PartialEq)]
pub struct EquationParams {
    /// Certainty below which both classifier answers are considered unclear.
    pub confidence_floor: f32,

    /// How much more certain the math classifier has to be to win outright.
    pub confidence_gap: f32,

    /// Minimum width ratio (smaller over larger) for a glyph to be skipped as
    /// a duplicate of its predecessor.
    pub skip_width_ratio: f32,

    /// Minimum height ratio for a glyph to be skipped as a duplicate.
    pub skip_height_ratio: f32,

    /// Radius, in grid cells, of the overlap search used when merging.
    pub merge_radius_cells: i32,

    /// Overlap fraction in both axes above which two partitions are merged.
    pub large_overlap: f64,

    /// X overlap fraction an equation needs with a neighbour that it touches
    /// vertically to absorb it.
    pub equation_x_overlap: f64,

    /// Y overlap fraction an equation needs with a neighbour that it touches
    /// horizontally to absorb it.
    pub equation_y_overlap: f64,

    /// Math plus digit density that makes a partition a seed on its own.
    pub math_digit_density_high: f32,

    /// Math plus digit density needed when italics push the total over
    /// [`EquationParams::math_italic_density`], and for indented seeds.
    pub math_digit_density_low: f32,

    /// Math, digit and italic density above which the low threshold applies.
    pub math_italic_density: f32,

    /// Unclear density that lets a crowded neighbour join a seed.
    pub unclear_density: f32,

    /// Glyphs a seed needs at least.
    pub seed_blobs_count: usize,

    /// Math glyphs a seed needs to exceed.
    pub seed_math_blobs: usize,

    /// Math plus digit glyphs a seed needs to exceed.
    pub seed_math_digit_blobs: usize,

    /// Aligned indented text lines that veto an indented seed.
    pub left_indent_alignment_count: usize,

    /// Glyphs above which a non-seed partition is used as text evidence.
    pub text_blobs_count: usize,

    /// Foreground density threshold used when no text evidence exists.
    pub default_foreground_density: f32,

    /// Multiplier applied to the median text foreground density.
    pub foreground_density_ratio: f32,

    /// Share of horizontal runs that must be lighter than the threshold.
    pub seed_part_ratio: f32,

    /// Alignment tolerance for left edges, in inches.
    pub alignment_tolerance: f32,

    /// Horizontal offset that counts as an indent, in inches.
    pub indent_gap: f32,

    /// Search radius of the indentation test, in inches.
    pub indent_radius: f32,

    /// Largest vertical gap to a neighbour considered for indentation, in inches.
    pub indent_y_gap: f32,

    /// Distance from the page margin that counts as aligned, in inches.
    pub inline_margin: f32,

    /// Largest gap to a side neighbour on the same line, in inches.
    pub inline_side_gap: f32,

    /// Line gaps needed before a line spacing estimate is trusted.
    pub min_line_spacing_samples: usize,

    /// Slack added to the estimated line spacing, in inches.
    pub line_spacing_pad: f32,

    /// Line gap used when spacing cannot be estimated, in inches.
    pub default_line_gap: f32,

    /// Height ratio above which a vertical neighbour reads as the same text.
    pub inline_height_ratio: f32,

    /// Vertical search stops once the gap exceeds this many of the smaller
    /// height.
    pub inline_y_gap_ratio: f32,

    /// Largest gap a seed grows across, in inches.
    pub expand_gap: f32,

    /// Y overlap fraction an equation needs to join a seed sideways.
    pub expand_y_overlap: f64,

    /// X overlap fraction an equation needs to join a seed vertically.
    pub expand_x_overlap: f64,

    /// Horizontal gap for a near small neighbour, in inches.
    pub near_neighbor_x_gap: f32,

    /// Vertical gap for a near small neighbour, in inches.
    pub near_neighbor_y_gap: f32,

    /// Vertical search range for satellite neighbours, in inches.
    pub satellite_search_gap: f32,

    /// Largest gap between a satellite and its equation, in inches.
    pub satellite_math_gap: f32,
}

impl Default for EquationParams {
    fn default() -> Self {
        Self {
            confidence_floor: -5.0,
            confidence_gap: 1.8,
            skip_width_ratio: 0.4,
            skip_height_ratio: 0.3,
            merge_radius_cells: 30,
            large_overlap: 0.95,
            equation_x_overlap: 0.4,
            equation_y_overlap: 0.5,
            math_digit_density_high: 0.25,
            math_digit_density_low: 0.1,
            math_italic_density: 0.5,
            unclear_density: 0.25,
            seed_blobs_count: 10,
            seed_math_blobs: 2,
            seed_math_digit_blobs: 5,
            left_indent_alignment_count: 1,
            text_blobs_count: 20,
            default_foreground_density: 0.15,
            foreground_density_ratio: 0.8,
            seed_part_ratio: 0.3,
            alignment_tolerance: 0.03,
            indent_gap: 0.5,
            indent_radius: 3.0,
            indent_y_gap: 0.5,
            inline_margin: 0.5,
            inline_side_gap: 1.0,
            min_line_spacing_samples: 8,
            line_spacing_pad: 0.02,
            default_line_gap: 0.05,
            inline_height_ratio: 0.5,
            inline_y_gap_ratio: 1.0,
            expand_gap: 0.2,
            expand_y_overlap: 0.6,
            expand_x_overlap: 0.4,
            near_neighbor_x_gap: 0.25,
            near_neighbor_y_gap: 0.05,
            satellite_search_gap: 0.5,
            satellite_math_gap: 0.1,
        }
    }
}

impl EquationParams {
    /// Converts a distance in inches to whole pixels at `resolution`.
    pub fn px(inches: f32, resolution: i32) -> i32 {
        (inches * resolution as f32).round() as i32
    }

    /// Checks that ratios and fractions are in range.
    pub fn validate(&self) -> Result<()> {
        let fractions = [
            ("skip_width_ratio", f64::from(self.skip_width_ratio)),
            ("skip_height_ratio", f64::from(self.skip_height_ratio)),
            ("large_overlap", self.large_overlap),
            ("equation_x_overlap", self.equation_x_overlap),
            ("equation_y_overlap", self.equation_y_overlap),
            ("math_digit_density_high", f64::from(self.math_digit_density_high)),
            ("math_digit_density_low", f64::from(self.math_digit_density_low)),
            ("math_italic_density", f64::from(self.math_italic_density)),
            ("unclear_density", f64::from(self.unclear_density)),
            ("seed_part_ratio", f64::from(self.seed_part_ratio)),
            ("inline_height_ratio", f64::from(self.inline_height_ratio)),
            ("expand_y_overlap", self.expand_y_overlap),
            ("expand_x_overlap", self.expand_x_overlap),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(EquationError::InvalidParam {
                    name,
                    msg: format!("{value} is not in [0, 1]"),
                });
            }
        }
        if self.merge_radius_cells < 0 {
            return Err(EquationError::InvalidParam {
                name: "merge_radius_cells",
                msg: format!("{} is negative", self.merge_radius_cells),
            });
        }
        Ok(())
    }
}
