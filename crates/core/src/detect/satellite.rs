//! Pass 4: folding short text lines into the equation blocks they hug.

use smallvec::SmallVec;

use super::PageRun;
use crate::grid::{PartId, Vertical};
use crate::partition::PartitionType;

/// Median of ascending heights; the rounded mean of the two middle values
/// for an even count.
fn median_height(sorted: &[i32]) -> i32 {
    let n = sorted.len();
    let mid = sorted[n / 2];
    if n % 2 == 0 && n > 1 {
        (0.5 * (sorted[n / 2 - 1] + mid) as f32).round() as i32
    } else {
        mid
    }
}

impl PageRun<'_> {
    /// Turns every not-taller-than-median text line that sits right above or
    /// below an equation block into an equation absorbing that block.
    /// Returns the number of lines converted.
    pub(crate) fn process_math_block_satellite_parts(&mut self) -> usize {
        let mut text_parts: Vec<(i32, PartId)> = self
            .grid
            .full_search()
            .into_iter()
            .filter_map(|id| {
                let part = self.grid.part(id);
                matches!(
                    part.part_type(),
                    PartitionType::FlowingText | PartitionType::HeadingText
                )
                .then(|| (part.bbox().height(), id))
            })
            .collect();
        if text_parts.is_empty() {
            return 0;
        }
        text_parts.sort_by_key(|&(height, _)| height);
        let heights: Vec<i32> = text_parts.iter().map(|&(h, _)| h).collect();
        let med_height = median_height(&heights);

        let mut merged = 0;
        for (height, id) in text_parts {
            if height > med_height || !self.grid.contains(id) {
                continue;
            }
            let Some(blocks) = self.math_block_neighbors(id) else {
                continue;
            };
            self.grid.remove(id);
            self.grid.part_mut(id).set_part_type(PartitionType::Equation);
            for block in blocks {
                self.grid.absorb(id, block);
            }
            self.insert_part_after_absorb(id);
            merged += 1;
        }
        tracing::debug!(merged, med_height, "merged math block satellites");
        merged
    }

    /// The equation blocks `id` is a satellite of, nearest first, or `None`.
    ///
    /// The line must lie within the horizontal span of its vertical
    /// neighbours and its nearest neighbour must be a close equation; the
    /// farther one joins too when it also is.
    fn math_block_neighbors(&self, id: PartId) -> Option<SmallVec<[PartId; 2]>> {
        let part_box = self.grid.part(id).bbox();
        let mut neighbors = [
            self.search_nn_vertical(id, Vertical::Up),
            self.search_nn_vertical(id, Vertical::Down),
        ];
        if neighbors[0].map(|(n, _)| n) == neighbors[1].map(|(n, _)| n) {
            neighbors[1] = None;
        }

        let mut left = i32::MAX;
        let mut right = 0;
        for (n, _) in neighbors.iter().flatten() {
            let b = self.grid.part(*n).bbox();
            left = left.min(b.left);
            right = right.max(b.right);
        }
        if part_box.left < left || part_box.right > right {
            return None;
        }

        let gap = |i: usize| neighbors[i].map_or(i32::MAX, |(_, g)| g);
        let near = if gap(0) < gap(1) { 0 } else { 1 };
        let mut blocks = SmallVec::new();
        for i in [near, 1 - near] {
            match neighbors[i] {
                Some((n, g)) if self.is_near_math_neighbor(n, g) => blocks.push(n),
                _ => break,
            }
        }
        (!blocks.is_empty()).then_some(blocks)
    }

    /// Nearest text or equation partition in `dir` that shares most of the
    /// width of `id` and does not stick out past it on the far side.
    fn search_nn_vertical(&self, id: PartId, dir: Vertical) -> Option<(PartId, i32)> {
        let part_box = self.grid.part(id).bbox();
        let gap_th = self.px(self.params.satellite_search_gap);
        let y = match dir {
            Vertical::Up => part_box.top,
            Vertical::Down => part_box.bottom,
        };
        let mut nearest: Option<(PartId, i32)> = None;
        for nid in self.grid.vertical_search(part_box.left, part_box.right, y, dir) {
            if nid == id {
                continue;
            }
            let neighbor = self.grid.part(nid);
            if !neighbor.part_type().is_text_or_equation() {
                continue;
            }
            let b = neighbor.bbox();
            let y_gap = b.y_gap(&part_box);
            if y_gap > gap_th {
                break;
            }
            let protrudes = match dir {
                Vertical::Up => b.top < part_box.top,
                Vertical::Down => b.bottom > part_box.bottom,
            };
            if !b.major_x_overlap(&part_box) || protrudes {
                continue;
            }
            if nearest.is_none_or(|(_, best)| y_gap < best) {
                nearest = Some((nid, y_gap));
            }
        }
        nearest
    }

    fn is_near_math_neighbor(&self, id: PartId, y_gap: i32) -> bool {
        self.grid.part(id).part_type() == PartitionType::Equation
            && y_gap <= self.px(self.params.satellite_math_gap)
    }
}
