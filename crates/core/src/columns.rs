//! Column layout of a page.
//!
//! Column indices follow the `2n + 1` convention: odd values are real
//! columns (0 based `n`), even values are the gaps between them with 0
//! left of the leftmost column.

use crate::geometry::BBox;
use crate::glyph::BlobRegionType;
use crate::partition::PartitionType;

/// Minimum width, in inches, of something lying between columns before it
/// stops being noise.
const MIN_COLUMN_WIDTH: f64 = 2.0 / 3.0;

/// Horizontal extent of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpan {
    pub left: i32,
    pub right: i32,
}

impl ColumnSpan {
    pub const fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }

    const fn contains(&self, x: i32) -> bool {
        self.left <= x && x <= self.right
    }
}

/// How a box sits across the columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanningType {
    /// Lies between columns and is too small to matter.
    Noise,
    /// Inside a single column.
    Flowing,
    /// Spans whole columns edge to edge.
    Heading,
    /// Crosses a column boundary without reaching the far edges.
    Pullout,
}

/// Result of placing a box into a [`ColumnSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnPlacement {
    pub span: SpanningType,
    pub first_column: i32,
    pub last_column: i32,
}

/// Ordered set of columns valid for some band of the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    spans: Vec<ColumnSpan>,
}

impl ColumnSet {
    pub fn new(mut spans: Vec<ColumnSpan>) -> Self {
        spans.sort_by_key(|s| s.left);
        Self { spans }
    }

    pub fn spans(&self) -> &[ColumnSpan] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Works out which columns `bbox` touches and what kind of spanning that is.
    pub fn place(&self, resolution: i32, bbox: &BBox) -> ColumnPlacement {
        let (left, right, height) = (bbox.left, bbox.right, bbox.height());
        let mut first: Option<i32> = None;
        let mut last: Option<i32> = None;
        let mut margin_columns = 0;
        let mut col_index = 1;
        let count = self.spans.len();

        for (i, col) in self.spans.iter().enumerate() {
            let at_first = i == 0;
            let at_last = i + 1 == count;
            let holds_right = col.contains(right) || (at_last && col.contains(right - height));
            if col.contains(left) || (at_first && col.contains(left + height)) {
                first = Some(col_index);
                if holds_right {
                    return ColumnPlacement {
                        span: SpanningType::Flowing,
                        first_column: col_index,
                        last_column: col_index,
                    };
                }
                if left <= col.left {
                    margin_columns = 1;
                }
            } else if holds_right {
                if first.is_none() {
                    first = Some(col_index - 1);
                }
                if right >= col.right {
                    margin_columns += 1;
                }
                last = Some(col_index);
                break;
            } else if left < col.left && right > col.right {
                if first.is_none() {
                    first = Some(col_index - 1);
                }
                last = Some(col_index);
            } else if right < col.left {
                last = Some(col_index - 1);
                if first.is_none() {
                    first = Some(col_index - 1);
                }
                break;
            }
            col_index += 2;
        }

        let first_column = first.unwrap_or(col_index - 1);
        let last_column = last.unwrap_or(col_index - 1).max(first_column);
        let span = if first_column == last_column
            && ((right - left) as f64) < MIN_COLUMN_WIDTH * resolution as f64
        {
            SpanningType::Noise
        } else if margin_columns <= 1 {
            if margin_columns == 1 && count == 1 {
                SpanningType::Heading
            } else {
                SpanningType::Pullout
            }
        } else {
            SpanningType::Heading
        };
        ColumnPlacement {
            span,
            first_column,
            last_column,
        }
    }
}

/// Column sets for every grid row of the page, bottom row first.
#[derive(Debug, Clone, Default)]
pub struct ColumnLayout {
    rows: Vec<ColumnSet>,
}

impl ColumnLayout {
    pub fn new(rows: Vec<ColumnSet>) -> Self {
        Self { rows }
    }

    /// One column set valid for every row.
    pub fn uniform(set: ColumnSet) -> Self {
        Self { rows: vec![set] }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The column set of grid row `grid_y`, clamped to the known rows.
    pub fn row(&self, grid_y: i32) -> Option<&ColumnSet> {
        let last = self.rows.len().checked_sub(1)?;
        self.rows.get((grid_y.max(0) as usize).min(last))
    }
}

/// Maps a region type and its column spanning onto a partition type.
pub fn spanning_partition_type(blob_type: BlobRegionType, span: SpanningType) -> PartitionType {
    let span = match span {
        SpanningType::Noise => match blob_type {
            BlobRegionType::HLine
            | BlobRegionType::VLine
            | BlobRegionType::RectImage
            | BlobRegionType::VertText => SpanningType::Flowing,
            _ => return PartitionType::Noise,
        },
        other => other,
    };
    match blob_type {
        BlobRegionType::Noise => PartitionType::Noise,
        BlobRegionType::HLine => PartitionType::HorzLine,
        BlobRegionType::VLine => PartitionType::VertLine,
        BlobRegionType::VertText => PartitionType::VerticalText,
        BlobRegionType::RectImage | BlobRegionType::PolyImage => match span {
            SpanningType::Heading => PartitionType::HeadingImage,
            SpanningType::Pullout => PartitionType::PulloutImage,
            _ => PartitionType::FlowingImage,
        },
        BlobRegionType::Text | BlobRegionType::Unknown => match span {
            SpanningType::Heading => PartitionType::HeadingText,
            SpanningType::Pullout => PartitionType::PulloutText,
            _ => PartitionType::FlowingText,
        },
    }
}
