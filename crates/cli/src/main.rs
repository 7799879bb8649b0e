//! eqdetect - Find equation regions in a segmented page
//!
//! Reads a page description as JSON: the page size and resolution, the
//! column layout, the text partitions with their glyph boxes, and the
//! answers the math and language classifiers gave for every glyph. The
//! recorded answers are replayed through the detector and the resulting
//! partitions are written back out as JSON.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use eqdetect_core::{
    BBox, BinaryImage, BlobChoice, ColumnLayout, ColumnSet, ColumnSpan, DetectionSummary,
    EquationDetector, EquationParams, Glyph, GlyphClassifier, NormalizedGlyph, Partition,
    PartitionGrid, PartitionType, TextFlow,
};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing_subscriber::EnvFilter;

/// Find equation regions in a segmented page.
#[derive(Parser, Debug)]
#[command(name = "eqdetect")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the page description (JSON), or "-" for stdin
    input: String,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,

    /// Override the page resolution (pixels per inch)
    #[arg(short = 'r', long)]
    resolution: Option<i32>,

    // === Detection thresholds ===
    /// Math plus digit density that makes a partition a seed on its own
    #[arg(long = "math-density-high")]
    math_density_high: Option<f32>,

    /// Math plus digit density for italic-heavy and indented seeds
    #[arg(long = "math-density-low")]
    math_density_low: Option<f32>,

    /// Foreground density threshold used when the page has no body text
    #[arg(long = "foreground-density")]
    foreground_density: Option<f32>,

    /// Print partitions compactly on one line
    #[arg(short = 'c', long, action = ArgAction::SetTrue)]
    compact: bool,
}

fn build_params(args: &Args) -> EquationParams {
    let mut params = EquationParams::default();
    if let Some(v) = args.math_density_high {
        params.math_digit_density_high = v;
    }
    if let Some(v) = args.math_density_low {
        params.math_digit_density_low = v;
    }
    if let Some(v) = args.foreground_density {
        params.default_foreground_density = v;
    }
    params
}

// === Input ===

#[derive(Debug, Deserialize)]
struct PageInput {
    resolution: i32,
    width: i32,
    height: i32,
    #[serde(default = "default_gridsize")]
    gridsize: i32,
    /// Column spans per grid row, bottom row first. A single row applies to
    /// the whole page.
    columns: Vec<Vec<[i32; 2]>>,
    partitions: Vec<PartitionInput>,
}

fn default_gridsize() -> i32 {
    16
}

#[derive(Debug, Deserialize)]
struct PartitionInput {
    #[serde(rename = "type")]
    part_type: String,
    glyphs: Vec<GlyphInput>,
}

#[derive(Debug, Deserialize)]
struct GlyphInput {
    /// left, bottom, right, top
    bbox: [i32; 4],
    #[serde(default)]
    math: Option<ChoiceInput>,
    #[serde(default)]
    lang: Option<ChoiceInput>,
}

#[derive(Debug, Deserialize)]
struct ChoiceInput {
    unichar: SmolStr,
    certainty: f32,
    #[serde(default)]
    italic: bool,
}

impl From<&ChoiceInput> for BlobChoice {
    fn from(c: &ChoiceInput) -> Self {
        BlobChoice::new(c.unichar.clone(), c.certainty).italic(c.italic)
    }
}

/// Classifier answering from recorded results, keyed by glyph box.
#[derive(Debug, Default)]
struct RecordedClassifier {
    answers: HashMap<BBox, BlobChoice>,
}

impl GlyphClassifier for RecordedClassifier {
    fn classify(&self, glyph: &NormalizedGlyph) -> Vec<BlobChoice> {
        self.answers.get(&glyph.source).cloned().into_iter().collect()
    }
}

struct Page {
    resolution: i32,
    grid: PartitionGrid,
    columns: ColumnLayout,
    image: BinaryImage,
    math: RecordedClassifier,
    lang: RecordedClassifier,
}

fn bbox_of([left, bottom, right, top]: [i32; 4]) -> Result<BBox> {
    if left > right || bottom > top {
        bail!("malformed box [{left}, {bottom}, {right}, {top}]");
    }
    Ok(BBox::new(left, bottom, right, top))
}

fn build_page(input: PageInput) -> Result<Page> {
    if input.width <= 0 || input.height <= 0 {
        bail!("page size must be positive, got {}x{}", input.width, input.height);
    }
    if input.gridsize <= 0 {
        bail!("grid size must be positive, got {}", input.gridsize);
    }
    let page_box = BBox::new(0, 0, input.width, input.height);

    let rows: Vec<ColumnSet> = input
        .columns
        .iter()
        .map(|row| {
            ColumnSet::new(
                row.iter()
                    .map(|&[left, right]| ColumnSpan::new(left, right))
                    .collect(),
            )
        })
        .collect();
    let mut page = Page {
        resolution: input.resolution,
        grid: PartitionGrid::new(input.gridsize, page_box),
        columns: ColumnLayout::new(rows),
        image: BinaryImage::new(input.width, input.height),
        math: RecordedClassifier::default(),
        lang: RecordedClassifier::default(),
    };

    for (index, part) in input.partitions.iter().enumerate() {
        let part_type = PartitionType::from_name(&part.part_type)
            .with_context(|| format!("partition {index}: unknown type `{}`", part.part_type))?;
        let mut glyphs = Vec::with_capacity(part.glyphs.len());
        for glyph in &part.glyphs {
            let bbox = bbox_of(glyph.bbox).with_context(|| format!("partition {index}"))?;
            page.image.fill(&bbox);
            if let Some(math) = &glyph.math {
                page.math.answers.insert(bbox, math.into());
            }
            if let Some(lang) = &glyph.lang {
                page.lang.answers.insert(bbox, lang.into());
            }
            glyphs.push(Glyph::new(bbox));
        }
        let flow = if part_type.is_text_or_equation() {
            TextFlow::Chain
        } else {
            TextFlow::NonText
        };
        page.grid.add(Partition::from_glyphs(
            part_type,
            part_type.default_blob_type(),
            flow,
            glyphs,
        ));
    }
    tracing::debug!(
        partitions = page.grid.len(),
        math_answers = page.math.answers.len(),
        lang_answers = page.lang.answers.len(),
        "page loaded"
    );
    Ok(page)
}

// === Output ===

#[derive(Debug, Serialize)]
struct PageOutput {
    summary: SummaryOutput,
    partitions: Vec<PartitionOutput>,
}

#[derive(Debug, Serialize)]
struct SummaryOutput {
    glyphs_classified: usize,
    merged: usize,
    seeds: usize,
    inline: usize,
    expanded: usize,
    satellites: usize,
    equations: usize,
    inline_equations: usize,
}

impl From<&DetectionSummary> for SummaryOutput {
    fn from(s: &DetectionSummary) -> Self {
        Self {
            glyphs_classified: s.glyphs_classified,
            merged: s.merged,
            seeds: s.seeds,
            inline: s.inline,
            expanded: s.expanded,
            satellites: s.satellites,
            equations: s.equations,
            inline_equations: s.inline_equations,
        }
    }
}

#[derive(Debug, Serialize)]
struct PartitionOutput {
    #[serde(rename = "type")]
    part_type: &'static str,
    bbox: [i32; 4],
    glyphs: usize,
}

impl From<&Partition> for PartitionOutput {
    fn from(p: &Partition) -> Self {
        let b = p.bbox();
        Self {
            part_type: p.part_type().name(),
            bbox: [b.left, b.bottom, b.right, b.top],
            glyphs: p.glyph_count(),
        }
    }
}

/// Partitions in reading order: top to bottom, then left to right.
fn collect_output(grid: &PartitionGrid, summary: &DetectionSummary) -> PageOutput {
    let mut parts: Vec<&Partition> = grid.iter().map(|(_, p)| p).collect();
    parts.sort_by_key(|p| {
        let b = p.bbox();
        (-b.top, b.left)
    });
    PageOutput {
        summary: summary.into(),
        partitions: parts.into_iter().map(PartitionOutput::from).collect(),
    }
}

fn read_input(path: &str) -> Result<PageInput> {
    if path == "-" {
        return serde_json::from_reader(io::stdin().lock()).context("reading page from stdin");
    }
    let path = PathBuf::from(path);
    let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))
}

fn init_logging(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let mut page = build_page(read_input(&args.input)?)?;
    let resolution = args.resolution.unwrap_or(page.resolution);

    let mut detector = EquationDetector::new(std::mem::take(&mut page.math), build_params(&args))
        .with_lang_classifier(std::mem::take(&mut page.lang));
    detector.set_resolution(resolution);
    let summary = detector
        .find_equation_parts(&mut page.grid, &page.columns, &page.image)
        .context("equation detection failed")?;

    let output = collect_output(&page.grid, &summary);
    let mut out: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.outfile)
            .with_context(|| format!("creating output file {}", args.outfile))?;
        Box::new(BufWriter::new(file))
    };
    if args.compact {
        serde_json::to_writer(&mut out, &output)?;
    } else {
        serde_json::to_writer_pretty(&mut out, &output)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
