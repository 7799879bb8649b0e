//! eqdetect - equation region detection for segmented page images.
//!
//! Takes the text partitions found by page layout analysis and relabels the
//! ones holding mathematics as block or inline equations.

pub mod classify;
pub mod columns;
pub mod detect;
pub mod error;
pub mod geometry;
pub mod glyph;
pub mod grid;
pub mod image;
pub mod params;
pub mod partition;

pub use classify::{BlobChoice, GlyphClassifier, NormalizedGlyph};
pub use columns::{ColumnLayout, ColumnSet, ColumnSpan};
pub use detect::{DetectionSummary, EquationDetector};
pub use error::{EquationError, Result};
pub use geometry::BBox;
pub use glyph::{BlobRegionType, Glyph, SpecialTextType, TextFlow};
pub use grid::{PartId, PartitionGrid};
pub use image::BinaryImage;
pub use params::EquationParams;
pub use partition::{Partition, PartitionType};
