//! Pass 2: picking equation seeds.

use ordered_float::OrderedFloat;

use super::PageRun;
use crate::glyph::SpecialTextType;
use crate::grid::PartId;
use crate::partition::{Partition, PartitionType};

/// Which sides of a partition stick out less than its neighbours above or
/// below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentType {
    None,
    Left,
    Right,
    Both,
}

impl IndentType {
    fn from_sides(left: bool, right: bool) -> Self {
        match (left, right) {
            (true, true) => Self::Both,
            (true, false) => Self::Left,
            (false, true) => Self::Right,
            (false, false) => Self::None,
        }
    }

    pub const fn is_left(self) -> bool {
        matches!(self, Self::Left | Self::Both)
    }

    pub const fn is_right(self) -> bool {
        matches!(self, Self::Right | Self::Both)
    }
}

/// Counts values of the sorted slice within `tolerance` (exclusive) of `val`,
/// scanning outwards from the last element not greater than `val`.
pub fn count_alignment(sorted: &[i32], val: i32, tolerance: i32) -> usize {
    if sorted.is_empty() {
        return 0;
    }
    let pos = sorted.partition_point(|&v| v <= val).saturating_sub(1);
    let left = sorted[..=pos]
        .iter()
        .rev()
        .take_while(|&&v| (val - v).abs() < tolerance)
        .count();
    let right = sorted[pos + 1..]
        .iter()
        .take_while(|&&v| v - val < tolerance)
        .count();
    left + right
}

fn math_digit_density(part: &Partition) -> f32 {
    part.special_density(SpecialTextType::Math) + part.special_density(SpecialTextType::Digit)
}

impl PageRun<'_> {
    /// Density gate: either math plus digit glyphs dominate, or together with
    /// italics they make up most glyphs and still pass the low bar.
    pub(crate) fn check_seed_density(&self, high: f32, low: f32, part: &Partition) -> bool {
        let math_digit = math_digit_density(part);
        let italic = part.special_density(SpecialTextType::Italic);
        math_digit > high || (math_digit + italic > self.params.math_italic_density && math_digit > low)
    }

    /// Count gate: enough glyphs overall, and more than a handful of math and
    /// digit glyphs.
    pub(crate) fn check_seed_blobs_count(&self, part: &Partition) -> bool {
        let math = part.special_count(SpecialTextType::Math);
        let digit = part.special_count(SpecialTextType::Digit);
        part.glyph_count() >= self.params.seed_blobs_count
            && math > self.params.seed_math_blobs
            && math + digit > self.params.seed_math_digit_blobs
    }

    /// Compares `id` with the text lines right above and below it.
    ///
    /// A neighbour sharing most of its height and sitting close by means the
    /// partition is a fragment of a line, which is never indented.
    pub(crate) fn is_indented(&self, id: PartId) -> IndentType {
        let part_box = self.grid.part(id).bbox();
        let x_gap_th = self.px(self.params.indent_gap);
        let y_gap_th = self.px(self.params.indent_y_gap);
        let gridsize = self.grid.gridsize();
        let radius = (self.px(self.params.indent_radius) + gridsize - 1) / gridsize;

        let (mut left, mut right) = (false, false);
        for nid in self
            .grid
            .radius_search(part_box.center_x(), part_box.center_y(), radius)
        {
            if left && right {
                break;
            }
            if nid == id {
                continue;
            }
            let neighbor = self.grid.part(nid);
            let neighbor_box = neighbor.bbox();
            if part_box.major_y_overlap(&neighbor_box) && part_box.x_gap(&neighbor_box) < x_gap_th {
                return IndentType::None;
            }
            if !neighbor.part_type().is_text_or_equation()
                || !part_box.x_overlap(&neighbor_box)
                || part_box.y_overlap(&neighbor_box)
            {
                continue;
            }
            if part_box.y_gap(&neighbor_box) < y_gap_th {
                left |= part_box.left - neighbor_box.left > x_gap_th;
                right |= neighbor_box.right - part_box.right > x_gap_th;
            }
        }
        IndentType::from_sides(left, right)
    }

    /// True when enough horizontal runs of the partition are lighter than
    /// `density_th`.
    fn check_seed_fg_density(&self, density_th: f32, part: &Partition) -> bool {
        let runs = part.split_horizontally_lite();
        if runs.is_empty() {
            return false;
        }
        let passed = runs
            .iter()
            .filter(|b| self.image.foreground_fraction(b) < density_th)
            .count();
        passed as f32 / runs.len() as f32 >= self.params.seed_part_ratio
    }

    /// Classifies text partitions into block seeds, inline equations and
    /// plain text.
    ///
    /// Dense partitions become seeds unless their runs are as dark as body
    /// text or they are indented like aligned paragraph starts. Moderately
    /// dense indented partitions become seeds when they are light and not
    /// aligned with indented text.
    pub(crate) fn identify_seed_parts(&mut self) {
        let (high, low) = (
            self.params.math_digit_density_high,
            self.params.math_digit_density_low,
        );
        let mut seeds1 = Vec::new();
        let mut seeds2 = Vec::new();
        let mut indented_lefts = Vec::new();
        let mut text_densities = Vec::new();

        for id in self.grid.full_search() {
            let part = self.grid.part_mut(id);
            if !part.part_type().is_text_or_equation() {
                continue;
            }
            part.compute_special_densities();
            part.log_special_densities();
            let part = self.grid.part(id);
            let blobs_ok = self.check_seed_blobs_count(part);
            if blobs_ok && self.check_seed_density(high, low, part) {
                seeds1.push(id);
                continue;
            }
            let indent = self.is_indented(id);
            if indent.is_left() && blobs_ok && self.check_seed_density(low, low, part) {
                seeds2.push(id);
            } else if !indent.is_right() && part.glyph_count() > self.params.text_blobs_count {
                let bbox = part.bbox();
                if indent.is_left() {
                    indented_lefts.push(bbox.left);
                }
                text_densities.push(OrderedFloat(self.image.foreground_fraction(&bbox)));
            }
        }

        indented_lefts.sort_unstable();
        text_densities.sort_unstable();
        let density_th = text_densities
            .get(text_densities.len() / 2)
            .map_or(self.params.default_foreground_density, |d| {
                self.params.foreground_density_ratio * d.into_inner()
            });
        let tolerance = self.px(self.params.alignment_tolerance);
        let aligned = |left: i32| {
            count_alignment(&indented_lefts, left, tolerance) >= self.params.left_indent_alignment_count
        };

        let mut accepted = Vec::new();
        let mut demoted = 0;
        for id in seeds1 {
            let part = self.grid.part(id);
            let left = part.bbox().left;
            let is_block = self.check_seed_fg_density(density_th, part)
                && !(self.is_indented(id).is_left() && aligned(left));
            accepted.push((id, is_block));
            if !is_block {
                demoted += 1;
            }
        }
        for id in seeds2 {
            let bbox = self.grid.part(id).bbox();
            if !aligned(bbox.left) && self.image.foreground_fraction(&bbox) <= density_th {
                accepted.push((id, true));
            }
        }

        for (id, is_block) in accepted {
            let part_type = if is_block {
                self.seeds.push(id);
                PartitionType::Equation
            } else {
                PartitionType::InlineEquation
            };
            self.grid.part_mut(id).set_part_type(part_type);
        }
        self.summary.seeds = self.seeds.len();
        self.summary.inline += demoted;
        tracing::debug!(
            seeds = self.seeds.len(),
            demoted,
            density_th,
            "identified seed parts"
        );
    }
}
