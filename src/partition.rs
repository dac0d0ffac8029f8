//! Partition planning over geopotential height.
//!
//! Buckets come from floor division anchored at zero: bucket `i` covers the
//! half-open range `[i * width, (i + 1) * width)`. A value's bucket depends
//! only on the value and the width, so replanning from a superset of the data
//! extends the covered span without moving anything already placed.

use crate::errors::IgraDataErr;

/// The name of the catch-all bucket for heights outside every explicit range.
pub const DEFAULT_BUCKET: &str = "default";

/// A contiguous half-open range of heights assigned to one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRange {
    /// Bucket number, `lower / width`.
    pub index: i64,
    /// Inclusive lower bound.
    pub lower: i64,
    /// Exclusive upper bound.
    pub upper: i64,
}

impl PartitionRange {
    /// Test whether a height falls inside this range.
    pub fn contains(&self, gph: i64) -> bool {
        gph >= self.lower && gph < self.upper
    }

    /// The bucket identifier, used in partition table and export file names.
    pub fn name(&self) -> String {
        self.index.to_string()
    }
}

/// Where a height value lands within a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Index into [`PartitionPlan::ranges`].
    Range(usize),
    /// The catch-all bucket.
    Default,
}

/// An ordered, gap-free list of height ranges covering the observed span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    width: i64,
    ranges: Vec<PartitionRange>,
}

impl PartitionPlan {
    /// Plan the buckets covering `[min, max]` with the given bucket width.
    pub fn build(min: i64, max: i64, width: i64) -> Result<Self, IgraDataErr> {
        if width <= 0 {
            return Err(IgraDataErr::InvalidBucketWidth(width));
        }
        if min > max {
            return Err(IgraDataErr::InvertedRange { min, max });
        }

        let first = min.div_euclid(width);
        let last = max.div_euclid(width);

        let ranges = (first..=last)
            .map(|index| PartitionRange {
                index,
                lower: index * width,
                upper: (index + 1) * width,
            })
            .collect();

        Ok(PartitionPlan { width, ranges })
    }

    /// The bucket width the plan was built with.
    pub fn width(&self) -> i64 {
        self.width
    }

    /// The explicit ranges, ordered by height.
    pub fn ranges(&self) -> &[PartitionRange] {
        &self.ranges
    }

    /// The span covered by the explicit ranges, as `[lower, upper)`.
    pub fn covered(&self) -> (i64, i64) {
        // build() always produces at least one range.
        (
            self.ranges[0].lower,
            self.ranges[self.ranges.len() - 1].upper,
        )
    }

    /// Route a height to its bucket.
    ///
    /// Missing heights and heights outside the covered span, sentinel values
    /// included, land in the catch-all.
    pub fn locate(&self, gph: Option<i64>) -> Bucket {
        let gph = match gph {
            Some(gph) => gph,
            None => return Bucket::Default,
        };

        let (lower, upper) = self.covered();
        if gph < lower || gph >= upper {
            return Bucket::Default;
        }

        Bucket::Range((gph.div_euclid(self.width) - self.ranges[0].index) as usize)
    }
}

/// The store table holding one bucket's level rows.
pub(crate) fn partition_table(bucket: &str) -> String {
    format!("level_p_{}", bucket)
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
