//! Integer bounding-box geometry.
//!
//! Page coordinates are in pixels with the y axis pointing up, so `bottom`
//! is always the smaller y value. Overlap tests are inclusive of shared
//! edges; gaps are negative when the boxes overlap on that axis.

use std::ops::{Add, AddAssign};

/// Axis-aligned integer rectangle `(left, bottom, right, top)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BBox {
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    pub top: i32,
}

impl Default for BBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BBox {
    /// The empty box. It is the identity of [`BBox::union`].
    pub const EMPTY: Self = Self {
        left: i32::MAX,
        bottom: i32::MAX,
        right: i32::MIN,
        top: i32::MIN,
    };

    pub const fn new(left: i32, bottom: i32, right: i32, top: i32) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// True for a box with inverted corners. Zero-width boxes are not empty.
    pub const fn is_empty(&self) -> bool {
        self.right < self.left || self.top < self.bottom
    }

    pub const fn width(&self) -> i32 {
        if self.is_empty() {
            0
        } else {
            self.right - self.left
        }
    }

    pub const fn height(&self) -> i32 {
        if self.is_empty() {
            0
        } else {
            self.top - self.bottom
        }
    }

    pub const fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    pub const fn center_x(&self) -> i32 {
        (self.left + self.right) / 2
    }

    pub const fn center_y(&self) -> i32 {
        (self.bottom + self.top) / 2
    }

    /// True if the x ranges touch or overlap.
    pub const fn x_overlap(&self, other: &Self) -> bool {
        other.left <= self.right && other.right >= self.left
    }

    /// True if the y ranges touch or overlap.
    pub const fn y_overlap(&self, other: &Self) -> bool {
        other.bottom <= self.top && other.top >= self.bottom
    }

    /// True if the shared x range covers at least half the width of either box.
    pub fn major_x_overlap(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let mut overlap = other.width();
        if self.left > other.left {
            overlap -= self.left - other.left;
        }
        if self.right < other.right {
            overlap -= other.right - self.right;
        }
        overlap >= other.width() / 2 || overlap >= self.width() / 2
    }

    /// True if the shared y range covers at least half the height of either box.
    pub fn major_y_overlap(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let mut overlap = other.height();
        if self.bottom > other.bottom {
            overlap -= self.bottom - other.bottom;
        }
        if self.top < other.top {
            overlap -= other.top - self.top;
        }
        overlap >= other.height() / 2 || overlap >= self.height() / 2
    }

    /// Horizontal gap between the boxes; negative when they overlap in x.
    /// `i32::MAX` when either box is empty.
    pub fn x_gap(&self, other: &Self) -> i32 {
        if self.is_empty() || other.is_empty() {
            return i32::MAX;
        }
        self.left
            .max(other.left)
            .saturating_sub(self.right.min(other.right))
    }

    /// Vertical gap between the boxes; negative when they overlap in y.
    /// `i32::MAX` when either box is empty.
    pub fn y_gap(&self, other: &Self) -> i32 {
        if self.is_empty() || other.is_empty() {
            return i32::MAX;
        }
        self.bottom
            .max(other.bottom)
            .saturating_sub(self.top.min(other.top))
    }

    /// Fraction of this box's width shared with `other`, in `[0, 1]`.
    ///
    /// A zero-width box counts as fully overlapped when its x lies inside
    /// `other`. Empty boxes overlap nothing.
    pub fn x_overlap_fraction(&self, other: &Self) -> f64 {
        overlap_fraction(self.left, self.right, other.left, other.right)
    }

    /// Fraction of this box's height shared with `other`, in `[0, 1]`.
    pub fn y_overlap_fraction(&self, other: &Self) -> f64 {
        overlap_fraction(self.bottom, self.top, other.bottom, other.top)
    }

    /// True if `other` lies inside this box, edges included.
    pub const fn contains(&self, other: &Self) -> bool {
        self.left <= other.left
            && self.bottom <= other.bottom
            && self.right >= other.right
            && self.top >= other.top
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &Self) -> Self {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Self {
            left: self.left.min(other.left),
            bottom: self.bottom.min(other.bottom),
            right: self.right.max(other.right),
            top: self.top.max(other.top),
        }
    }
}

fn overlap_fraction(lo: i32, hi: i32, other_lo: i32, other_hi: i32) -> f64 {
    if hi < lo || other_hi < other_lo {
        return 0.0;
    }
    let extent = i64::from(hi) - i64::from(lo);
    if extent == 0 {
        return if other_lo <= lo && lo <= other_hi {
            1.0
        } else {
            0.0
        };
    }
    let shared = i64::from(hi.min(other_hi)) - i64::from(lo.max(other_lo));
    (shared as f64 / extent as f64).max(0.0)
}

impl Add for BBox {
    type Output = BBox;

    fn add(self, rhs: BBox) -> BBox {
        self.union(&rhs)
    }
}

impl AddAssign for BBox {
    fn add_assign(&mut self, rhs: BBox) {
        *self = self.union(&rhs);
    }
}

impl FromIterator<BBox> for BBox {
    fn from_iter<I: IntoIterator<Item = BBox>>(iter: I) -> Self {
        iter.into_iter().fold(BBox::EMPTY, |acc, b| acc + b)
    }
}
