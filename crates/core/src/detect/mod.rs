//! Equation region detection.
//!
//! [`EquationDetector::find_equation_parts`] runs five passes over the
//! partitions of one page:
//!
//! 0. label every glyph as math, digit, italic, unclear or plain text
//! 1. merge overlapping text partitions until nothing changes
//! 2. pick seed partitions by glyph density and indentation, then demote
//!    seeds that sit inside a text line to inline equations
//! 3. grow the remaining seeds by absorbing small compatible neighbours
//! 4. fold short text lines hugging an equation block into it
//!
//! All state of a run lives in a [`PageRun`] borrowed from the caller, so a
//! detector can be reused across pages.

mod expand;
mod inline;
mod merge;
mod satellite;
mod seeds;
mod special_text;

pub use seeds::{IndentType, count_alignment};
pub use special_text::{decide_special_type, identify_blobs_to_skip};

use crate::classify::GlyphClassifier;
use crate::columns::ColumnLayout;
use crate::error::{EquationError, Result};
use crate::geometry::BBox;
use crate::grid::{PartId, PartitionGrid};
use crate::image::BinaryImage;
use crate::params::EquationParams;
use crate::partition::PartitionType;

/// Counters describing what one page run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionSummary {
    pub page: u32,
    /// Glyphs sent to the classifiers.
    pub glyphs_classified: usize,
    /// Partitions absorbed while merging overlaps.
    pub merged: usize,
    /// Block seeds accepted before the inline check.
    pub seeds: usize,
    /// Seeds and candidates marked as inline equations.
    pub inline: usize,
    /// Partitions absorbed into growing seeds.
    pub expanded: usize,
    /// Text partitions folded into equation blocks.
    pub satellites: usize,
    /// Equation partitions on the page afterwards.
    pub equations: usize,
    /// Inline equation partitions on the page afterwards.
    pub inline_equations: usize,
}

/// Finds block and inline equations in segmented pages.
pub struct EquationDetector {
    params: EquationParams,
    math_classifier: Box<dyn GlyphClassifier>,
    lang_classifier: Option<Box<dyn GlyphClassifier>>,
    resolution: i32,
    page_count: u32,
}

impl EquationDetector {
    /// Creates a detector around a math-trained classifier. The language
    /// classifier and the resolution must be set before the first page.
    pub fn new(math_classifier: impl GlyphClassifier + 'static, params: EquationParams) -> Self {
        Self {
            params,
            math_classifier: Box::new(math_classifier),
            lang_classifier: None,
            resolution: 0,
            page_count: 0,
        }
    }

    /// Sets the classifier of the page language.
    pub fn set_lang_classifier(&mut self, classifier: impl GlyphClassifier + 'static) {
        self.lang_classifier = Some(Box::new(classifier));
    }

    /// Builder form of [`EquationDetector::set_lang_classifier`].
    pub fn with_lang_classifier(mut self, classifier: impl GlyphClassifier + 'static) -> Self {
        self.set_lang_classifier(classifier);
        self
    }

    /// Sets the pixels per inch of the pages that follow.
    pub fn set_resolution(&mut self, resolution: i32) {
        self.resolution = resolution;
    }

    pub fn resolution(&self) -> i32 {
        self.resolution
    }

    pub fn params(&self) -> &EquationParams {
        &self.params
    }

    /// Pages processed so far.
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Runs all passes over one page.
    ///
    /// On error nothing in `grid` has been touched.
    pub fn find_equation_parts(
        &mut self,
        grid: &mut PartitionGrid,
        columns: &ColumnLayout,
        image: &BinaryImage,
    ) -> Result<DetectionSummary> {
        let Some(lang_classifier) = self.lang_classifier.as_deref() else {
            tracing::warn!("no language classifier, skipping equation detection");
            return Err(EquationError::MissingLanguageClassifier);
        };
        if columns.is_empty() {
            tracing::warn!("no column layout, skipping equation detection");
            return Err(EquationError::MissingColumns);
        }
        if self.resolution <= 0 {
            return Err(EquationError::InvalidResolution(self.resolution));
        }
        self.params.validate()?;

        self.page_count += 1;
        let _span = tracing::debug_span!("find_equation_parts", page = self.page_count).entered();

        let mut run = PageRun::new(&self.params, self.resolution, grid, columns, image);
        run.summary.page = self.page_count;

        // Pass 0
        run.summary.glyphs_classified = special_text::identify_special_text(
            run.grid,
            run.params,
            self.math_classifier.as_ref(),
            lang_classifier,
        );
        // Pass 1
        run.summary.merged = run.merge_parts_by_location();
        // Pass 2
        run.identify_seed_parts();
        run.identify_inline_parts();
        // Pass 3
        run.summary.expanded = run.expand_seeds();
        // Pass 4
        run.summary.satellites = run.process_math_block_satellite_parts();

        Ok(run.finish())
    }
}

/// Working state of one page.
pub(crate) struct PageRun<'a> {
    pub(crate) params: &'a EquationParams,
    pub(crate) resolution: i32,
    pub(crate) grid: &'a mut PartitionGrid,
    pub(crate) columns: &'a ColumnLayout,
    pub(crate) image: &'a BinaryImage,
    /// Current block seeds.
    pub(crate) seeds: Vec<PartId>,
    /// Union of every partition box, refreshed before the inline pass.
    pub(crate) super_bbox: BBox,
    pub(crate) summary: DetectionSummary,
}

impl<'a> PageRun<'a> {
    pub(crate) fn new(
        params: &'a EquationParams,
        resolution: i32,
        grid: &'a mut PartitionGrid,
        columns: &'a ColumnLayout,
        image: &'a BinaryImage,
    ) -> Self {
        let super_bbox = grid.super_bbox();
        Self {
            params,
            resolution,
            grid,
            columns,
            image,
            seeds: Vec::new(),
            super_bbox,
            summary: DetectionSummary::default(),
        }
    }

    /// `inches` in pixels at the page resolution.
    pub(crate) fn px(&self, inches: f32) -> i32 {
        EquationParams::px(inches, self.resolution)
    }

    /// Re-inserts a partition whose box changed.
    ///
    /// Column indices are recomputed from the column set of its grid row,
    /// which also re-derives a type; type, region type and flow are then
    /// restored so the equation labels survive.
    pub(crate) fn insert_part_after_absorb(&mut self, id: PartId) {
        let bbox = self.grid.part(id).bbox();
        let (_, grid_y) = self.grid.grid_coords(bbox.left, bbox.bottom);
        let resolution = self.resolution;
        let column_set = self.columns.row(grid_y);
        let part = self.grid.part_mut(id);
        let (part_type, blob_type, flow) = (part.part_type(), part.blob_type(), part.flow());
        if let Some(set) = column_set {
            part.set_partition_type(resolution, set);
        }
        part.set_part_type(part_type);
        part.set_blob_type(blob_type);
        part.set_flow(flow);
        part.set_blob_types();
        self.grid.insert(id);
    }

    fn finish(mut self) -> DetectionSummary {
        for (_, part) in self.grid.iter() {
            match part.part_type() {
                PartitionType::Equation => self.summary.equations += 1,
                PartitionType::InlineEquation => self.summary.inline_equations += 1,
                _ => {}
            }
        }
        tracing::debug!(
            page = self.summary.page,
            merged = self.summary.merged,
            seeds = self.summary.seeds,
            inline = self.summary.inline,
            expanded = self.summary.expanded,
            satellites = self.summary.satellites,
            equations = self.summary.equations,
            "equation detection finished"
        );
        self.summary
    }
}
