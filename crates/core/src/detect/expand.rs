//! Pass 3: growing equation seeds into whole blocks.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::PageRun;
use crate::geometry::BBox;
use crate::glyph::{BlobRegionType, SpecialTextType};
use crate::grid::{Horizontal, PartId, Vertical};
use crate::partition::{Partition, PartitionType};

type Found = SmallVec<[PartId; 8]>;

impl PageRun<'_> {
    /// Expands every seed, then keeps expanding the seeds that grew until a
    /// round changes nothing. Returns the number of partitions absorbed.
    pub(crate) fn expand_seeds(&mut self) -> usize {
        let mut absorbed = 0;
        let mut round = 0;
        while !self.seeds.is_empty() {
            round += 1;
            let mut slots: Vec<Option<PartId>> =
                std::mem::take(&mut self.seeds).into_iter().map(Some).collect();
            let slot_of: FxHashMap<PartId, usize> = slots
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.map(|id| (id, i)))
                .collect();

            let mut expanded = Vec::new();
            for i in 0..slots.len() {
                let Some(id) = slots[i] else {
                    continue;
                };
                let Some(merged) = self.expand_seed(id) else {
                    continue;
                };
                for other in &merged {
                    if let Some(&j) = slot_of.get(other) {
                        slots[j] = None;
                    }
                }
                absorbed += merged.len();
                expanded.push(id);
            }
            tracing::trace!(round, expanded = expanded.len(), "seed expansion round");
            for &id in &expanded {
                self.insert_part_after_absorb(id);
            }
            self.seeds = expanded;
        }
        absorbed
    }

    /// Absorbs compatible neighbours on all four sides plus anything the seed
    /// overlaps. Returns the absorbed ids, or `None` when nothing was found
    /// and the seed is untouched.
    fn expand_seed(&mut self, seed: PartId) -> Option<Found> {
        if self.grid.get(seed)?.is_vertical_type() {
            return None;
        }
        let mut found = Found::new();
        self.expand_seed_horizontal(seed, Horizontal::Left, &mut found);
        self.expand_seed_horizontal(seed, Horizontal::Right, &mut found);
        self.expand_seed_vertical(seed, Vertical::Up, &mut found);
        self.expand_seed_vertical(seed, Vertical::Down, &mut found);
        found.extend(self.search_by_overlap(seed));
        if found.is_empty() {
            return None;
        }
        self.grid.remove(seed);
        for &id in &found {
            self.grid.absorb(seed, id);
        }
        Some(found)
    }

    fn expand_seed_horizontal(&mut self, seed: PartId, dir: Horizontal, found: &mut Found) {
        let seed_box = self.grid.part(seed).bbox();
        let gap_th = self.px(self.params.expand_gap);
        let x = match dir {
            Horizontal::Left => seed_box.left,
            Horizontal::Right => seed_box.right,
        };
        for id in self.grid.side_search(x, seed_box.bottom, seed_box.top, dir) {
            if id == seed || !self.grid.contains(id) {
                continue;
            }
            let part = self.grid.part(id);
            let part_box = part.bbox();
            if part_box.x_gap(&seed_box) > gap_th {
                break;
            }
            let extends = match dir {
                Horizontal::Left => part_box.left < seed_box.left,
                Horizontal::Right => part_box.right > seed_box.right,
            };
            if !extends {
                continue;
            }
            let accept = if part.part_type() == PartitionType::Equation {
                let th = self.params.expand_y_overlap;
                part_box.y_overlap_fraction(&seed_box) >= th
                    || seed_box.y_overlap_fraction(&part_box) >= th
            } else {
                self.is_expansion_neighbor(&seed_box, part)
            };
            if accept {
                self.grid.remove(id);
                found.push(id);
            }
        }
    }

    /// Candidates above or below are collected first; a candidate is only
    /// taken if no rejected non-equation partition lies between it and the
    /// seed.
    fn expand_seed_vertical(&mut self, seed: PartId, dir: Vertical, found: &mut Found) {
        let seed_box = self.grid.part(seed).bbox();
        let gap_th = self.px(self.params.expand_gap);
        let y = match dir {
            Vertical::Up => seed_box.top,
            Vertical::Down => seed_box.bottom,
        };
        let mut skipped_min_top = i32::MAX;
        let mut skipped_max_bottom = i32::MIN;
        let mut candidates = Found::new();
        for id in self
            .grid
            .vertical_search(self.super_bbox.left, self.super_bbox.right, y, dir)
        {
            if id == seed || !self.grid.contains(id) {
                continue;
            }
            let part = self.grid.part(id);
            let part_box = part.bbox();
            if part_box.y_gap(&seed_box) > gap_th {
                break;
            }
            let extends = match dir {
                Vertical::Up => part_box.top > seed_box.top,
                Vertical::Down => part_box.bottom < seed_box.bottom,
            };
            if !extends {
                continue;
            }
            let is_equation = part.part_type() == PartitionType::Equation;
            let accept = if is_equation {
                let th = self.params.expand_x_overlap;
                part_box.x_overlap_fraction(&seed_box) >= th
                    || seed_box.x_overlap_fraction(&part_box) >= th
            } else {
                self.is_expansion_neighbor(&seed_box, part)
            };
            if accept {
                candidates.push(id);
            } else if !is_equation {
                skipped_min_top = skipped_min_top.min(part_box.top);
                skipped_max_bottom = skipped_max_bottom.max(part_box.bottom);
            }
        }

        for id in candidates {
            let part_box = self.grid.part(id).bbox();
            let clear = match dir {
                Vertical::Up => part_box.bottom < skipped_min_top,
                Vertical::Down => part_box.top > skipped_max_bottom,
            };
            if clear {
                self.grid.remove(id);
                found.push(id);
            }
        }
    }

    /// Rules for non-equation partitions next to a seed: inline equations
    /// and non-text partitions other than horizontal rules never join.
    fn is_expansion_neighbor(&self, seed_box: &BBox, part: &Partition) -> bool {
        let part_type = part.part_type();
        if part_type == PartitionType::InlineEquation
            || (!part_type.is_text_or_equation() && part.blob_type() != BlobRegionType::HLine)
        {
            return false;
        }
        self.is_near_small_neighbor(seed_box, &part.bbox()) && self.check_seed_neighbor_density(part)
    }

    /// No larger than the seed in either dimension and close to it, either
    /// stacked or side by side.
    pub(crate) fn is_near_small_neighbor(&self, seed_box: &BBox, part_box: &BBox) -> bool {
        if part_box.height() > seed_box.height() || part_box.width() > seed_box.width() {
            return false;
        }
        let x_gap_th = self.px(self.params.near_neighbor_x_gap);
        let y_gap_th = self.px(self.params.near_neighbor_y_gap);
        (part_box.major_x_overlap(seed_box) && part_box.y_gap(seed_box) <= y_gap_th)
            || (part_box.major_y_overlap(seed_box) && part_box.x_gap(seed_box) <= x_gap_th)
    }

    /// Small partitions always pass; larger ones need a math-heavy or
    /// unclear-heavy glyph mix.
    pub(crate) fn check_seed_neighbor_density(&self, part: &Partition) -> bool {
        if part.glyph_count() < self.params.seed_blobs_count {
            return true;
        }
        let math_digit =
            part.special_density(SpecialTextType::Math) + part.special_density(SpecialTextType::Digit);
        math_digit > self.params.math_digit_density_high
            || part.special_density(SpecialTextType::Unclear) > self.params.unclear_density
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::test_support::{Page, fake, mix, tagged};

    fn seeded(page: &mut Page, seed: BBox, others: &[(BBox, PartitionType)]) -> (PartId, Vec<PartId>) {
        let id = page.grid.add(fake(seed, PartitionType::Equation));
        let others = others
            .iter()
            .map(|&(b, ty)| page.grid.add(fake(b, ty)))
            .collect();
        (id, others)
    }

    #[test]
    fn test_is_near_small_neighbor() {
        let mut page = Page::new();
        let run = page.run();
        let seed = BBox::new(100, 500, 400, 540);
        // Side by side, gap 75.
        assert!(run.is_near_small_neighbor(&seed, &BBox::new(475, 505, 500, 535)));
        assert!(!run.is_near_small_neighbor(&seed, &BBox::new(476, 505, 500, 535)));
        // Stacked, gap 15.
        assert!(run.is_near_small_neighbor(&seed, &BBox::new(150, 470, 350, 485)));
        assert!(!run.is_near_small_neighbor(&seed, &BBox::new(150, 470, 350, 484)));
        // Taller than the seed.
        assert!(!run.is_near_small_neighbor(&seed, &BBox::new(410, 490, 450, 550)));
        // Wider than the seed.
        assert!(!run.is_near_small_neighbor(&seed, &BBox::new(50, 530, 500, 560)));
    }

    #[test]
    fn test_check_seed_neighbor_density() {
        let mut page = Page::new();
        let run = page.run();
        let bbox = BBox::new(0, 0, 300, 30);
        assert!(run.check_seed_neighbor_density(&tagged(bbox, PartitionType::FlowingText, &mix(0, 0, 9))));
        assert!(!run.check_seed_neighbor_density(&tagged(bbox, PartitionType::FlowingText, &mix(0, 0, 10))));
        assert!(run.check_seed_neighbor_density(&tagged(bbox, PartitionType::FlowingText, &mix(2, 1, 7))));
        let mut unclear = mix(0, 0, 7);
        unclear.extend([SpecialTextType::Unclear; 3]);
        assert!(run.check_seed_neighbor_density(&tagged(bbox, PartitionType::FlowingText, &unclear)));
    }

    #[test]
    fn test_small_side_neighbor_joins() {
        let mut page = Page::new();
        let (seed, others) = seeded(
            &mut page,
            BBox::new(100, 500, 400, 540),
            &[(BBox::new(420, 505, 500, 535), PartitionType::FlowingText)],
        );
        let mut run = page.run();
        run.seeds = vec![seed];
        assert_eq!(run.expand_seeds(), 1);
        assert!(!page.grid.is_alive(others[0]));
        assert!(page.grid.contains(seed));
        let part = page.grid.part(seed);
        assert_eq!(part.bbox(), BBox::new(100, 500, 500, 540));
        assert_eq!(part.part_type(), PartitionType::Equation);
    }

    #[test]
    fn test_tall_side_neighbor_never_joins() {
        let mut page = Page::new();
        let (seed, others) = seeded(
            &mut page,
            BBox::new(100, 500, 400, 540),
            &[(BBox::new(420, 490, 500, 550), PartitionType::FlowingText)],
        );
        let mut run = page.run();
        run.seeds = vec![seed];
        assert_eq!(run.expand_seeds(), 0);
        assert!(page.grid.contains(others[0]));
        assert_eq!(page.grid.part(seed).bbox(), BBox::new(100, 500, 400, 540));
    }

    #[test]
    fn test_growth_repeats_until_stable() {
        let mut page = Page::new();
        let (seed, _) = seeded(
            &mut page,
            BBox::new(100, 500, 400, 540),
            &[
                (BBox::new(420, 505, 500, 535), PartitionType::FlowingText),
                (BBox::new(520, 505, 600, 535), PartitionType::FlowingText),
            ],
        );
        let mut run = page.run();
        run.seeds = vec![seed];
        assert_eq!(run.expand_seeds(), 2);
        assert!(run.seeds.is_empty());
        assert_eq!(page.grid.part(seed).bbox(), BBox::new(100, 500, 600, 540));
        assert_eq!(page.grid.len(), 1);
    }

    #[test]
    fn test_equation_below_joins() {
        let mut page = Page::new();
        let (seed, others) = seeded(
            &mut page,
            BBox::new(100, 500, 600, 560),
            &[(BBox::new(100, 430, 600, 460), PartitionType::Equation)],
        );
        let mut run = page.run();
        run.seeds = vec![seed];
        assert_eq!(run.expand_seeds(), 1);
        assert!(!page.grid.is_alive(others[0]));
        assert_eq!(page.grid.part(seed).bbox(), BBox::new(100, 430, 600, 560));
    }

    #[test]
    fn test_plain_text_blocks_equation_beyond_it() {
        let mut page = Page::new();
        let seed = page
            .grid
            .add(fake(BBox::new(100, 500, 600, 560), PartitionType::Equation));
        let wall = page.grid.add(tagged(
            BBox::new(150, 470, 550, 490),
            PartitionType::FlowingText,
            &mix(0, 0, 12),
        ));
        let far = page
            .grid
            .add(fake(BBox::new(100, 430, 600, 460), PartitionType::Equation));

        let mut run = page.run();
        let seed_box = run.grid.part(seed).bbox();
        let wall_part = run.grid.part(wall);
        assert!(run.is_near_small_neighbor(&seed_box, &wall_part.bbox()));
        assert!(!run.check_seed_neighbor_density(wall_part));

        run.seeds = vec![seed];
        assert_eq!(run.expand_seeds(), 0);
        assert!(page.grid.contains(wall));
        assert!(page.grid.contains(far));
        assert_eq!(page.grid.part(seed).bbox(), seed_box);
    }

    #[test]
    fn test_wide_text_blocks_equation_beyond_it() {
        let mut page = Page::new();
        let (seed, others) = seeded(
            &mut page,
            BBox::new(100, 500, 600, 560),
            &[
                (BBox::new(100, 470, 900, 490), PartitionType::FlowingText),
                (BBox::new(100, 430, 600, 460), PartitionType::Equation),
            ],
        );
        let mut run = page.run();
        run.seeds = vec![seed];
        assert_eq!(run.expand_seeds(), 0);
        assert!(page.grid.contains(others[0]));
        assert!(page.grid.contains(others[1]));
        assert_eq!(page.grid.part(seed).bbox(), BBox::new(100, 500, 600, 560));
    }

    #[test]
    fn test_absorbed_seed_is_dropped() {
        let mut page = Page::new();
        let (first, others) = seeded(
            &mut page,
            BBox::new(100, 500, 600, 560),
            &[(BBox::new(100, 430, 600, 460), PartitionType::Equation)],
        );
        let second = others[0];
        let mut run = page.run();
        run.seeds = vec![first, second];
        assert_eq!(run.expand_seeds(), 1);
        assert!(!page.grid.is_alive(second));
        assert_eq!(page.grid.len(), 1);
    }

    #[test]
    fn test_inline_equation_neighbor_rejected() {
        let mut page = Page::new();
        let (seed, others) = seeded(
            &mut page,
            BBox::new(100, 500, 400, 540),
            &[(BBox::new(420, 505, 500, 535), PartitionType::InlineEquation)],
        );
        let mut run = page.run();
        run.seeds = vec![seed];
        assert_eq!(run.expand_seeds(), 0);
        assert!(page.grid.contains(others[0]));
    }
}
