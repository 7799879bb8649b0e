//! Partitions: typed page regions owning their glyphs.
//!
//! A partition keeps its glyphs sorted by left edge (by bottom edge for
//! vertical text) and caches per-tag densities. Densities are only valid
//! after [`Partition::compute_special_densities`]; every operation that
//! changes the glyph set recomputes them.

use crate::columns::{ColumnSet, spanning_partition_type};
use crate::geometry::BBox;
use crate::glyph::{BlobRegionType, Glyph, SpecialTextType, TextFlow};

/// Coarse partition type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PartitionType {
    #[default]
    Unknown,
    FlowingText,
    HeadingText,
    PulloutText,
    Equation,
    InlineEquation,
    Table,
    VerticalText,
    CaptionText,
    FlowingImage,
    HeadingImage,
    PulloutImage,
    HorzLine,
    VertLine,
    Noise,
}

impl PartitionType {
    /// Types whose content is read as text. Block equations are excluded.
    pub const fn is_text(self) -> bool {
        matches!(
            self,
            Self::FlowingText
                | Self::HeadingText
                | Self::PulloutText
                | Self::Table
                | Self::VerticalText
                | Self::CaptionText
                | Self::InlineEquation
        )
    }

    pub const fn is_text_or_equation(self) -> bool {
        self.is_text() || matches!(self, Self::Equation)
    }

    pub const fn is_line(self) -> bool {
        matches!(self, Self::HorzLine | Self::VertLine)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::FlowingText => "flowing_text",
            Self::HeadingText => "heading_text",
            Self::PulloutText => "pullout_text",
            Self::Equation => "equation",
            Self::InlineEquation => "inline_equation",
            Self::Table => "table",
            Self::VerticalText => "vertical_text",
            Self::CaptionText => "caption_text",
            Self::FlowingImage => "flowing_image",
            Self::HeadingImage => "heading_image",
            Self::PulloutImage => "pullout_image",
            Self::HorzLine => "horz_line",
            Self::VertLine => "vert_line",
            Self::Noise => "noise",
        }
    }

    pub const ALL: [PartitionType; 15] = [
        Self::Unknown,
        Self::FlowingText,
        Self::HeadingText,
        Self::PulloutText,
        Self::Equation,
        Self::InlineEquation,
        Self::Table,
        Self::VerticalText,
        Self::CaptionText,
        Self::FlowingImage,
        Self::HeadingImage,
        Self::PulloutImage,
        Self::HorzLine,
        Self::VertLine,
        Self::Noise,
    ];

    /// Inverse of [`PartitionType::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Region type of glyphs in a fresh partition of this type.
    pub const fn default_blob_type(self) -> BlobRegionType {
        match self {
            Self::FlowingImage | Self::HeadingImage | Self::PulloutImage => {
                BlobRegionType::RectImage
            }
            Self::HorzLine => BlobRegionType::HLine,
            Self::VertLine => BlobRegionType::VLine,
            Self::VerticalText => BlobRegionType::VertText,
            Self::Noise => BlobRegionType::Noise,
            Self::Unknown => BlobRegionType::Unknown,
            _ => BlobRegionType::Text,
        }
    }
}

/// A typed region of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    bbox: BBox,
    part_type: PartitionType,
    blob_type: BlobRegionType,
    flow: TextFlow,
    glyphs: Vec<Glyph>,
    special_densities: [f32; SpecialTextType::COUNT],
    median_width: i32,
    first_column: i32,
    last_column: i32,
}

impl Partition {
    /// Creates an empty partition.
    pub fn new(part_type: PartitionType, blob_type: BlobRegionType, flow: TextFlow) -> Self {
        Self {
            bbox: BBox::EMPTY,
            part_type,
            blob_type,
            flow,
            glyphs: Vec::new(),
            special_densities: [0.0; SpecialTextType::COUNT],
            median_width: 0,
            first_column: -1,
            last_column: -1,
        }
    }

    /// Creates a partition owning `glyphs`, with limits and densities computed.
    pub fn from_glyphs(
        part_type: PartitionType,
        blob_type: BlobRegionType,
        flow: TextFlow,
        glyphs: impl IntoIterator<Item = Glyph>,
    ) -> Self {
        let mut part = Self::new(part_type, blob_type, flow);
        part.glyphs = glyphs.into_iter().collect();
        part.sort_glyphs();
        part.set_blob_types();
        part.compute_limits();
        part.compute_special_densities();
        part
    }

    /// A glyph-less partition covering `bbox`, for fixtures and synthetic input.
    pub fn fake(bbox: BBox, part_type: PartitionType) -> Self {
        let blob_type = match part_type {
            PartitionType::VerticalText => BlobRegionType::VertText,
            PartitionType::HorzLine => BlobRegionType::HLine,
            PartitionType::VertLine => BlobRegionType::VLine,
            PartitionType::FlowingImage
            | PartitionType::HeadingImage
            | PartitionType::PulloutImage => BlobRegionType::RectImage,
            PartitionType::Noise => BlobRegionType::Noise,
            _ => BlobRegionType::Text,
        };
        let mut part = Self::new(part_type, blob_type, TextFlow::Chain);
        part.bbox = bbox;
        part.median_width = bbox.width();
        part
    }

    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    pub fn part_type(&self) -> PartitionType {
        self.part_type
    }

    pub fn set_part_type(&mut self, part_type: PartitionType) {
        self.part_type = part_type;
    }

    pub fn blob_type(&self) -> BlobRegionType {
        self.blob_type
    }

    pub fn set_blob_type(&mut self, blob_type: BlobRegionType) {
        self.blob_type = blob_type;
    }

    pub fn flow(&self) -> TextFlow {
        self.flow
    }

    pub fn set_flow(&mut self, flow: TextFlow) {
        self.flow = flow;
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    /// Mutable glyph access for tagging. Geometry must not be changed here.
    pub fn glyphs_mut(&mut self) -> &mut [Glyph] {
        &mut self.glyphs
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn median_width(&self) -> i32 {
        self.median_width
    }

    pub fn set_median_width(&mut self, width: i32) {
        self.median_width = width;
    }

    pub fn first_column(&self) -> i32 {
        self.first_column
    }

    pub fn last_column(&self) -> i32 {
        self.last_column
    }

    /// Vertically flowing text and vertical rules.
    pub fn is_vertical_type(&self) -> bool {
        matches!(
            self.blob_type,
            BlobRegionType::VertText | BlobRegionType::VLine
        )
    }

    /// Adds a glyph, keeping sort order and growing the box.
    pub fn add_glyph(&mut self, glyph: Glyph) {
        let vertical = self.is_vertical_type();
        let key = |g: &Glyph| if vertical { g.bbox.bottom } else { g.bbox.left };
        let at = self.glyphs.partition_point(|g| key(g) <= key(&glyph));
        self.bbox += glyph.bbox;
        self.glyphs.insert(at, glyph);
    }

    fn sort_glyphs(&mut self) {
        if self.is_vertical_type() {
            self.glyphs.sort_by_key(|g| g.bbox.bottom);
        } else {
            self.glyphs.sort_by_key(|g| g.bbox.left);
        }
    }

    /// Recomputes the box and median glyph width from the glyphs.
    ///
    /// A glyph-less partition keeps whatever box it was given.
    pub fn compute_limits(&mut self) {
        if self.glyphs.is_empty() {
            self.median_width = self.bbox.width();
            return;
        }
        self.bbox = self.glyphs.iter().map(|g| g.bbox).collect();
        self.median_width = weighted_median_width(&self.glyphs).unwrap_or(self.bbox.width());
    }

    /// Number of glyphs currently carrying `tag`.
    pub fn special_count(&self, tag: SpecialTextType) -> usize {
        self.glyphs
            .iter()
            .filter(|g| g.special_text_type == tag)
            .count()
    }

    /// Recomputes the cached share of glyphs for every tag.
    ///
    /// Skip counts as its own bucket, so the densities of a non-empty
    /// partition sum to one.
    pub fn compute_special_densities(&mut self) {
        self.special_densities = [0.0; SpecialTextType::COUNT];
        if self.glyphs.is_empty() {
            return;
        }
        for glyph in &self.glyphs {
            self.special_densities[glyph.special_text_type.index()] += 1.0;
        }
        let total = self.glyphs.len() as f32;
        for density in &mut self.special_densities {
            *density /= total;
        }
    }

    /// Cached density of `tag`.
    pub fn special_density(&self, tag: SpecialTextType) -> f32 {
        self.special_densities[tag.index()]
    }

    /// Overrides a cached density. Only meant for building fixtures.
    pub fn set_special_density(&mut self, tag: SpecialTextType, density: f32) {
        self.special_densities[tag.index()] = density;
    }

    pub fn log_special_densities(&self) {
        tracing::debug!(
            bbox = ?self.bbox,
            part_type = self.part_type.name(),
            glyphs = self.glyphs.len(),
            none = self.special_density(SpecialTextType::None),
            italic = self.special_density(SpecialTextType::Italic),
            digit = self.special_density(SpecialTextType::Digit),
            math = self.special_density(SpecialTextType::Math),
            unclear = self.special_density(SpecialTextType::Unclear),
            skip = self.special_density(SpecialTextType::Skip),
            "special densities"
        );
    }

    /// Copies region type and flow onto every owned glyph.
    pub fn set_blob_types(&mut self) {
        let (region, flow) = (self.blob_type, self.flow);
        for glyph in &mut self.glyphs {
            glyph.region_type = region;
            glyph.flow = flow;
        }
    }

    /// Derives column indices and type from where the box sits in `columns`.
    pub fn set_partition_type(&mut self, resolution: i32, columns: &ColumnSet) {
        let placement = columns.place(resolution, &self.bbox);
        self.first_column = placement.first_column;
        self.last_column = placement.last_column;
        self.part_type = spanning_partition_type(self.blob_type, placement.span);
    }

    /// Takes over all glyphs of `other`.
    ///
    /// The box becomes the union of both boxes, the stronger flow wins and
    /// the cached statistics are recomputed.
    pub fn absorb(&mut self, other: Partition) {
        if !self.flow.dominates_in_merge(other.flow) {
            self.flow = other.flow;
            self.blob_type = other.blob_type;
        }
        self.bbox += other.bbox;
        self.glyphs.extend(other.glyphs);
        self.sort_glyphs();
        self.set_blob_types();
        if !self.glyphs.is_empty() {
            self.median_width = weighted_median_width(&self.glyphs).unwrap_or(self.bbox.width());
        }
        self.compute_special_densities();
    }

    /// Splits off the glyphs whose left edge is at or right of `split_x`.
    ///
    /// Returns `None`, leaving `self` untouched, when `split_x` is not
    /// strictly inside the box or nothing lies right of it.
    pub fn split_at(&mut self, split_x: i32) -> Option<Partition> {
        if split_x <= self.bbox.left || split_x >= self.bbox.right {
            return None;
        }
        let (right, left): (Vec<Glyph>, Vec<Glyph>) = std::mem::take(&mut self.glyphs)
            .into_iter()
            .partition(|g| g.bbox.left >= split_x);
        if right.is_empty() || left.is_empty() {
            self.glyphs = left.into_iter().chain(right).collect();
            self.sort_glyphs();
            return None;
        }
        self.glyphs = left;
        self.compute_limits();
        let mut split = Self::new(self.part_type, self.blob_type, self.flow);
        split.glyphs = right;
        split.first_column = self.first_column;
        split.last_column = self.last_column;
        split.compute_limits();
        Some(split)
    }

    /// Position of the first horizontal gap wider than `threshold`.
    fn next_split_x(&self, threshold: f64) -> Option<i32> {
        let mut previous_right: Option<i32> = None;
        for glyph in &self.glyphs {
            let b = glyph.bbox;
            if let Some(prev) = previous_right.filter(|&prev| f64::from(b.left - prev) > threshold) {
                return Some((b.left + prev) / 2);
            }
            // Overlapping glyphs may end further right than their successor.
            previous_right = Some(previous_right.map_or(b.right, |prev| prev.max(b.right)));
        }
        None
    }

    /// Splits a copy of this partition at every gap wider than three median
    /// glyph widths. Densities of the pieces are recomputed.
    pub fn split_horizontally(&self) -> Vec<Partition> {
        if self.median_width == 0 || self.glyphs.is_empty() {
            return Vec::new();
        }
        let threshold = f64::from(self.median_width) * 3.0;
        let mut pieces = Vec::new();
        let mut rest = self.clone();
        while let Some(mid_x) = rest.next_split_x(threshold) {
            let Some(right) = rest.split_at(mid_x) else {
                break;
            };
            rest.compute_special_densities();
            pieces.push(std::mem::replace(&mut rest, right));
        }
        rest.compute_special_densities();
        pieces.push(rest);
        pieces
    }

    /// Boxes of the runs [`Partition::split_horizontally`] would produce,
    /// without building partitions.
    pub fn split_horizontally_lite(&self) -> Vec<BBox> {
        let mut boxes = Vec::new();
        if self.median_width == 0 {
            return boxes;
        }
        let threshold = f64::from(self.median_width) * 3.0;
        let mut run = BBox::EMPTY;
        let mut previous_right: Option<i32> = None;
        for glyph in &self.glyphs {
            let b = glyph.bbox;
            if previous_right.is_some_and(|prev| f64::from(b.left - prev) > threshold) {
                boxes.push(run);
                run = BBox::EMPTY;
                previous_right = None;
            }
            run += b;
            previous_right = Some(previous_right.map_or(b.right, |prev| prev.max(b.right)));
        }
        if previous_right.is_some() {
            boxes.push(run);
        }
        boxes
    }
}

/// Area-weighted median of glyph widths; `None` when every glyph is degenerate.
fn weighted_median_width(glyphs: &[Glyph]) -> Option<i32> {
    let mut samples: Vec<(i32, i64)> = glyphs
        .iter()
        .map(|g| (g.bbox.width(), g.bbox.area()))
        .filter(|&(_, area)| area > 0)
        .collect();
    if samples.is_empty() {
        return None;
    }
    samples.sort_unstable_by_key(|&(width, _)| width);
    let total: i64 = samples.iter().map(|&(_, area)| area).sum();
    let mut seen = 0;
    for (width, area) in samples.iter().copied() {
        seen += area;
        if seen * 2 >= total {
            return Some(width);
        }
    }
    samples.last().map(|&(width, _)| width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_part(boxes: &[(i32, i32, i32, i32)]) -> Partition {
        Partition::from_glyphs(
            PartitionType::FlowingText,
            BlobRegionType::Text,
            TextFlow::Chain,
            boxes
                .iter()
                .map(|&(l, b, r, t)| Glyph::new(BBox::new(l, b, r, t))),
        )
    }

    fn split_fixture() -> Partition {
        let mut part = text_part(&[
            (0, 0, 10, 50),
            (11, 0, 20, 60),
            (25, 0, 30, 55),
            (100, 0, 110, 15),
            (125, 0, 140, 45),
            (500, 0, 540, 35),
        ]);
        part.set_median_width(10);
        part
    }

    #[test]
    fn test_type_names() {
        for ty in PartitionType::ALL {
            assert_eq!(PartitionType::from_name(ty.name()), Some(ty));
        }
        assert_eq!(PartitionType::from_name("EQUATION"), None);
        assert_eq!(
            PartitionType::FlowingImage.default_blob_type(),
            BlobRegionType::RectImage
        );
        assert_eq!(
            PartitionType::InlineEquation.default_blob_type(),
            BlobRegionType::Text
        );
    }

    #[test]
    fn test_text_types() {
        assert!(PartitionType::InlineEquation.is_text());
        assert!(!PartitionType::Equation.is_text());
        assert!(PartitionType::Equation.is_text_or_equation());
        assert!(!PartitionType::FlowingImage.is_text_or_equation());
        assert!(PartitionType::HorzLine.is_line());
    }

    #[test]
    fn test_glyphs_sorted_and_limits() {
        let part = text_part(&[(50, 0, 60, 10), (0, 0, 10, 20), (20, 5, 30, 10)]);
        let lefts: Vec<i32> = part.glyphs().iter().map(|g| g.bbox.left).collect();
        assert_eq!(lefts, vec![0, 20, 50]);
        assert_eq!(part.bbox(), BBox::new(0, 0, 60, 20));
        assert_eq!(part.median_width(), 10);
    }

    #[test]
    fn test_densities_sum_to_one() {
        let mut part = text_part(&[(0, 0, 10, 10), (20, 0, 30, 10), (40, 0, 50, 10), (60, 0, 70, 10)]);
        part.glyphs_mut()[0].special_text_type = SpecialTextType::Math;
        part.glyphs_mut()[1].special_text_type = SpecialTextType::Skip;
        part.glyphs_mut()[2].special_text_type = SpecialTextType::Math;
        part.compute_special_densities();
        assert_eq!(part.special_density(SpecialTextType::Math), 0.5);
        assert_eq!(part.special_density(SpecialTextType::Skip), 0.25);
        let sum: f32 = SpecialTextType::ALL
            .iter()
            .map(|&t| part.special_density(t))
            .sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_partition_densities_are_zero() {
        let mut part = Partition::fake(BBox::new(0, 0, 10, 10), PartitionType::FlowingText);
        part.compute_special_densities();
        assert!(
            SpecialTextType::ALL
                .iter()
                .all(|&t| part.special_density(t) == 0.0)
        );
    }

    #[test]
    fn test_absorb_conserves_glyphs() {
        let mut a = text_part(&[(0, 0, 10, 10), (20, 0, 30, 10)]);
        let mut b = text_part(&[(15, 30, 25, 40)]);
        b.glyphs_mut()[0].special_text_type = SpecialTextType::Math;
        b.set_flow(TextFlow::StrongChain);
        a.absorb(b);
        assert_eq!(a.glyph_count(), 3);
        assert_eq!(a.bbox(), BBox::new(0, 0, 30, 40));
        assert_eq!(a.glyphs()[1].bbox.left, 15);
        assert!((a.special_density(SpecialTextType::Math) - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(a.flow(), TextFlow::Chain);
    }

    #[test]
    fn test_absorb_empty_is_noop() {
        let mut a = text_part(&[(0, 0, 10, 10), (20, 0, 30, 10)]);
        let before = a.clone();
        a.absorb(Partition::new(
            PartitionType::FlowingText,
            BlobRegionType::Text,
            TextFlow::None,
        ));
        assert_eq!(a, before);
    }

    #[test]
    fn test_split_at() {
        let mut part = split_fixture();
        assert!(part.split_at(0).is_none());
        assert!(part.split_at(540).is_none());
        let right = part.split_at(65).expect("split inside box");
        assert_eq!(part.bbox(), BBox::new(0, 0, 30, 60));
        assert_eq!(right.bbox(), BBox::new(100, 0, 540, 45));
        assert_eq!(part.glyph_count() + right.glyph_count(), 6);
    }

    #[test]
    fn test_split_horizontally_lite() {
        let part = split_fixture();
        assert_eq!(
            part.split_horizontally_lite(),
            vec![
                BBox::new(0, 0, 30, 60),
                BBox::new(100, 0, 140, 45),
                BBox::new(500, 0, 540, 35),
            ]
        );
    }

    #[test]
    fn test_split_horizontally() {
        let part = split_fixture();
        let boxes: Vec<BBox> = part.split_horizontally().iter().map(Partition::bbox).collect();
        assert_eq!(
            boxes,
            vec![
                BBox::new(0, 0, 30, 60),
                BBox::new(100, 0, 140, 45),
                BBox::new(500, 0, 540, 35),
            ]
        );
    }

    #[test]
    fn test_split_without_median_width() {
        let mut part = split_fixture();
        part.set_median_width(0);
        assert!(part.split_horizontally().is_empty());
        assert!(part.split_horizontally_lite().is_empty());
    }

    #[test]
    fn test_vertical_type() {
        let mut part = Partition::fake(BBox::new(0, 0, 10, 100), PartitionType::VerticalText);
        assert!(part.is_vertical_type());
        part.set_blob_type(BlobRegionType::Text);
        assert!(!part.is_vertical_type());
    }
}
