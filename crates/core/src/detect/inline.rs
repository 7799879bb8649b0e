//! Pass 2.5: demoting seeds that sit inside running text.

use itertools::Itertools;

use super::PageRun;
use crate::grid::{Horizontal, PartId, Vertical};
use crate::partition::PartitionType;

impl PageRun<'_> {
    /// Marks seeds that read as part of a text line as inline equations.
    pub(crate) fn identify_inline_parts(&mut self) {
        self.super_bbox = self.grid.super_bbox();
        self.identify_inline_parts_horizontal();
        let spacing = self.estimate_text_line_spacing();
        let gap_th = match spacing {
            Some(spacing) if spacing > 0 => spacing + self.px(self.params.line_spacing_pad),
            _ => self.px(self.params.default_line_gap),
        };
        tracing::debug!(?spacing, gap_th, "text line spacing");
        self.identify_inline_parts_vertical(Vertical::Up, gap_th);
        self.identify_inline_parts_vertical(Vertical::Down, gap_th);
    }

    fn demote(&mut self, id: PartId) {
        self.grid.part_mut(id).set_part_type(PartitionType::InlineEquation);
        self.summary.inline += 1;
    }

    /// A seed hugging one page margin is inline unless the text beside it
    /// is narrower or itself an equation.
    fn identify_inline_parts_horizontal(&mut self) {
        let margin_th = self.px(self.params.inline_margin);
        let gap_th = self.px(self.params.inline_side_gap);
        let page = self.super_bbox;

        for id in std::mem::take(&mut self.seeds) {
            let part_box = self.grid.part(id).bbox();
            let left_margin = part_box.left - page.left;
            let right_margin = page.right - part_box.right;
            let (x, dir) = if left_margin + margin_th < right_margin && left_margin < margin_th {
                (part_box.right, Horizontal::Right)
            } else if right_margin + margin_th < left_margin && right_margin < margin_th {
                (part_box.left, Horizontal::Left)
            } else {
                self.seeds.push(id);
                continue;
            };

            let neighbor = self
                .grid
                .side_search(x, part_box.bottom, part_box.top, dir)
                .into_iter()
                .filter(|&nid| nid != id)
                .map(|nid| self.grid.part(nid))
                .find(|n| {
                    let b = n.bbox();
                    n.part_type().is_text_or_equation()
                        && part_box.x_gap(&b) <= gap_th
                        && part_box.major_y_overlap(&b)
                        && !part_box.major_x_overlap(&b)
                })
                .map(|n| (n.bbox(), n.part_type()));

            let inline = match neighbor {
                None => true,
                Some((b, ty)) => b.width() > part_box.width() && ty != PartitionType::Equation,
            };
            if inline {
                self.demote(id);
            } else {
                self.seeds.push(id);
            }
        }
    }

    /// Typical gap between stacked text lines, from the lower half of the
    /// observed gaps. `None` with too few samples.
    pub(crate) fn estimate_text_line_spacing(&self) -> Option<i32> {
        let mut gaps: Vec<i32> = self
            .grid
            .full_search()
            .into_iter()
            .map(|id| self.grid.part(id))
            .filter(|p| p.part_type().is_text())
            .map(|p| p.bbox())
            .tuple_windows()
            .filter(|(prev, cur)| cur.major_x_overlap(prev) && !cur.y_overlap(prev))
            .map(|(prev, cur)| (cur.y_gap(&prev), cur.height().min(prev.height())))
            .filter(|&(gap, min_height)| gap < min_height)
            .map(|(gap, _)| gap)
            .collect();
        if gaps.len() < self.params.min_line_spacing_samples {
            return None;
        }
        gaps.sort_unstable();
        let lower = &gaps[..gaps.len() / 2];
        Some(lower[lower.len() / 2])
    }

    /// Top-down with `Vertical::Up` checks each seed against the line above;
    /// bottom-up with `Vertical::Down` against the line below. Seeds demoted
    /// earlier in a sweep count as text for the ones after them.
    fn identify_inline_parts_vertical(&mut self, dir: Vertical, gap_th: i32) {
        if self.seeds.is_empty() {
            return;
        }
        let mut seeds = std::mem::take(&mut self.seeds);
        match dir {
            Vertical::Up => seeds.sort_by_key(|&id| std::cmp::Reverse(self.grid.part(id).bbox().top)),
            Vertical::Down => seeds.sort_by_key(|&id| self.grid.part(id).bbox().bottom),
        }
        for id in seeds {
            if self.is_inline(id, dir, gap_th) {
                self.demote(id);
            } else {
                self.seeds.push(id);
            }
        }
    }

    fn is_inline(&self, id: PartId, dir: Vertical, gap_th: i32) -> bool {
        let part_box = self.grid.part(id).bbox();
        let y = match dir {
            Vertical::Up => part_box.top,
            Vertical::Down => part_box.bottom,
        };
        for nid in self.grid.vertical_search(part_box.left, part_box.right, y, dir) {
            if nid == id {
                continue;
            }
            let neighbor = self.grid.part(nid);
            let b = neighbor.bbox();
            let min_height = part_box.height().min(b.height());
            let max_height = part_box.height().max(b.height());
            if part_box.y_gap(&b) as f32 > self.params.inline_y_gap_ratio * min_height as f32 {
                break;
            }
            if !neighbor.part_type().is_text() {
                continue;
            }
            if part_box.x_overlap(&b)
                && part_box.y_gap(&b) <= gap_th
                && max_height > 0
                && min_height as f32 / max_height as f32 > self.params.inline_height_ratio
            {
                return true;
            }
        }
        false
    }
}
