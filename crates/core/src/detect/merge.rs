//! Pass 1: merging partitions that overlap heavily.

use smallvec::SmallVec;

use super::PageRun;
use crate::grid::PartId;
use crate::partition::PartitionType;

impl PageRun<'_> {
    /// Sweeps the page merging overlapping text partitions until a sweep
    /// changes nothing. Returns the number of partitions absorbed.
    pub(crate) fn merge_parts_by_location(&mut self) -> usize {
        let mut merged = 0;
        loop {
            let mut updated = Vec::new();
            for id in self.grid.full_search() {
                if !self.grid.contains(id) || !self.grid.part(id).part_type().is_text_or_equation() {
                    continue;
                }
                let overlapping = self.search_by_overlap(id);
                if overlapping.is_empty() {
                    continue;
                }
                self.grid.remove(id);
                for other in overlapping {
                    self.grid.absorb(id, other);
                    merged += 1;
                }
                updated.push(id);
            }
            if updated.is_empty() {
                break;
            }
            tracing::trace!(updated = updated.len(), "merge sweep");
            for id in updated {
                self.insert_part_after_absorb(id);
            }
        }
        merged
    }

    /// Finds text partitions around `seed` that overlap it enough to be
    /// merged and takes them out of the grid.
    ///
    /// Overlap fractions are measured on the neighbour. Any seed merges a
    /// neighbour that it almost covers; an equation seed also merges
    /// neighbours that share most of one axis with it and touch it in the
    /// other.
    pub(crate) fn search_by_overlap(&mut self, seed: PartId) -> SmallVec<[PartId; 4]> {
        let seed_part = self.grid.part(seed);
        let seed_box = seed_part.bbox();
        let seed_is_equation = seed_part.part_type() == PartitionType::Equation;
        let large = self.params.large_overlap;
        let (x_th, y_th) = (self.params.equation_x_overlap, self.params.equation_y_overlap);

        let mut found = SmallVec::new();
        let candidates = self.grid.radius_search(
            seed_box.center_x(),
            seed_box.center_y(),
            self.params.merge_radius_cells,
        );
        for id in candidates {
            if id == seed || !self.grid.contains(id) {
                continue;
            }
            let part = self.grid.part(id);
            if !part.part_type().is_text_or_equation() {
                continue;
            }
            let part_box = part.bbox();
            let x_fraction = part_box.x_overlap_fraction(&seed_box);
            let y_fraction = part_box.y_overlap_fraction(&seed_box);
            let merge = (x_fraction >= large && y_fraction >= large)
                || (seed_is_equation
                    && ((x_fraction > x_th && y_fraction > 0.0)
                        || (x_fraction > 0.0 && y_fraction > y_th)));
            if merge {
                self.grid.remove(id);
                found.push(id);
            }
        }
        found
    }
}
