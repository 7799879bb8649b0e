mod common;

use std::collections::HashMap;
use std::hint::black_box;

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};

use eqdetect_core::{
    BBox, BinaryImage, BlobChoice, BlobRegionType, ColumnLayout, ColumnSet, ColumnSpan,
    EquationDetector, EquationParams, Glyph, GlyphClassifier, NormalizedGlyph, Partition,
    PartitionGrid, PartitionType, TextFlow,
};

use common::{XorShift64, bench_config, bench_criterion, configure_group, partitions_throughput};

const RESOLUTION: i32 = 300;
const PAGE: BBox = BBox::new(0, 0, 2550, 3300);

#[derive(Clone, Default)]
struct Table(HashMap<BBox, BlobChoice>);

impl GlyphClassifier for Table {
    fn classify(&self, glyph: &NormalizedGlyph) -> Vec<BlobChoice> {
        self.0.get(&glyph.source).cloned().into_iter().collect()
    }
}

struct SyntheticPage {
    parts: Vec<Partition>,
    image: BinaryImage,
    math: Table,
    lang: Table,
}

/// A single-column page of `lines` text lines; roughly one in eight is a
/// centred display equation.
fn generate_page(seed: u64, lines: usize) -> SyntheticPage {
    let mut rng = XorShift64::new(seed);
    let mut page = SyntheticPage {
        parts: Vec::with_capacity(lines),
        image: BinaryImage::new(PAGE.width(), PAGE.height()),
        math: Table::default(),
        lang: Table::default(),
    };
    let line_pitch = (PAGE.height() - 200) / lines.max(1) as i32;

    for i in 0..lines {
        let top = PAGE.top - 100 - i as i32 * line_pitch;
        let height = (line_pitch * 2 / 3).max(4);
        let display = rng.gen_bool(0.125);
        let (left, right, glyph_width) = if display {
            (900 + rng.gen_range(0, 100), 1650 + rng.gen_range(0, 100), 14)
        } else {
            (150 + rng.gen_range(0, 8), 2400 - rng.gen_range(0, 8), 22)
        };

        let mut glyphs = Vec::new();
        let mut x = left;
        while x + glyph_width < right {
            let bbox = BBox::new(x, top - height, x + glyph_width, top);
            page.image.fill(&bbox);
            let (math, lang) = if display || rng.gen_bool(0.02) {
                (BlobChoice::new("+", -1.0), BlobChoice::new("t", -4.0))
            } else {
                (BlobChoice::new("+", -3.0), BlobChoice::new("e", -1.0))
            };
            page.math.0.insert(bbox, math);
            page.lang.0.insert(bbox, lang);
            glyphs.push(Glyph::new(bbox));
            x += glyph_width + rng.gen_range(6, 14);
        }
        page.parts.push(Partition::from_glyphs(
            PartitionType::FlowingText,
            BlobRegionType::Text,
            TextFlow::Chain,
            glyphs,
        ));
    }
    page
}

fn bench_find_equation_parts(c: &mut Criterion) {
    let cfg = bench_config();
    let sizes: &[usize] = if cfg.tier == common::BenchTier::Quick {
        &[40, 80]
    } else {
        &[40, 80, 160]
    };
    let columns = ColumnLayout::uniform(ColumnSet::new(vec![ColumnSpan::new(0, PAGE.right)]));

    let mut group = c.benchmark_group("find_equation_parts");
    configure_group(&mut group, &cfg);

    for &n in sizes {
        let page = generate_page(cfg.seed ^ (n as u64), n);
        let mut detector = EquationDetector::new(page.math.clone(), EquationParams::default())
            .with_lang_classifier(page.lang.clone());
        detector.set_resolution(RESOLUTION);

        group.throughput(partitions_throughput(n));
        group.bench_with_input(BenchmarkId::new("lines", n), &page, |b, page| {
            b.iter_batched(
                || {
                    let mut grid = PartitionGrid::new(16, PAGE);
                    for part in &page.parts {
                        grid.add(part.clone());
                    }
                    grid
                },
                |mut grid| {
                    let summary = detector
                        .find_equation_parts(&mut grid, &columns, &page.image)
                        .unwrap();
                    black_box(summary.equations);
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    name = detect_benches;
    config = bench_criterion();
    targets = bench_find_equation_parts
);
criterion_main!(detect_benches);
