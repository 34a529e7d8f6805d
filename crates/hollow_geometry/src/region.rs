//! # Region Algebra
//!
//! A `Region` is a finite set of voxels in one world, described by
//! composition rather than stored. Building a region allocates only the
//! expression tree; voxels are produced lazily by `Region::voxels`.
//!
//! ## Primitives
//!
//! - `Region::empty()` - no members, identity for union
//! - `Region::segment(start, end, width, height)` - a swept box along a line
//! - `Region::union(other)` - set union
//! - `Region::restrict_to_cell(cell)` - intersection with a cell's column
//! - `Region::translate(dx, dy, dz)` - shift every member
//!
//! ## Enumeration Contract
//!
//! `voxels()` may yield the same voxel more than once (overlapping segments,
//! overlapping union members). Consumers that apply side effects must go
//! through `materialize()`, which deduplicates and orders canonically by
//! `(x, z, y)`. `contains()` is exact: a voxel is a member iff it appears in
//! `materialize()`.

use std::collections::{BTreeSet, HashSet};

use crate::cell::{CellCoord, Voxel, CELL_SIZE};

/// Lazy, finite, restartable voxel sequence.
pub type Voxels<'a> = Box<dyn Iterator<Item = Voxel> + 'a>;

/// Anything that can answer voxel membership.
///
/// Implemented by `Region` (structural test) and by materialized sets.
pub trait VoxelSet {
    /// Returns true if `voxel` is a member.
    fn includes(&self, voxel: Voxel) -> bool;
}

impl VoxelSet for BTreeSet<Voxel> {
    fn includes(&self, voxel: Voxel) -> bool {
        self.contains(&voxel)
    }
}

impl VoxelSet for HashSet<Voxel> {
    fn includes(&self, voxel: Voxel) -> bool {
        self.contains(&voxel)
    }
}

/// Block read/write primitives supplied by the host.
///
/// Generic over the block type so the algebra stays free of any material
/// vocabulary.
pub trait BlockAccess {
    /// The host's block type.
    type Block: Copy + PartialEq;

    /// Reads the block at `voxel`.
    fn block(&self, voxel: Voxel) -> Self::Block;

    /// Writes the block at `voxel`.
    fn set_block(&mut self, voxel: Voxel, block: Self::Block);
}

/// A straight tunnel piece: boxes swept along a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Segment {
    start: Voxel,
    end: Voxel,
    width: i32,
    height: i32,
    /// Number of intervals; `steps + 1` samples are taken.
    steps: i32,
}

impl Segment {
    /// Sample `k` of `0..=steps`, floored onto the grid.
    ///
    /// Interpolates the delta only, so translating both endpoints by an
    /// integer shifts every sample by exactly that integer.
    #[inline]
    fn sample(&self, k: i32) -> Voxel {
        let (k, steps) = (f64::from(k), f64::from(self.steps));
        let lerp = |a: i32, b: i32| -> i32 {
            // the step never exceeds |b - a|, so it fits i32
            #[allow(clippy::cast_possible_truncation)]
            let step = (k * f64::from(b - a) / steps).floor() as i32;
            a + step
        };
        Voxel::new(
            lerp(self.start.x, self.end.x),
            lerp(self.start.y, self.end.y),
            lerp(self.start.z, self.end.z),
            self.start.world,
        )
    }

    /// Lowest corner of the box grown from a sample.
    #[inline]
    fn box_origin(&self, sample: Voxel) -> Voxel {
        let half = self.width / 2;
        sample.offset(-half, 0, -half)
    }

    fn translated(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            start: self.start.offset(dx, dy, dz),
            end: self.end.offset(dx, dy, dz),
            ..*self
        }
    }

    /// Inclusive horizontal bounds `(min_x, max_x, min_z, max_z)`.
    fn horizontal_bounds(&self) -> (i32, i32, i32, i32) {
        let a = self.box_origin(self.start);
        let b = self.box_origin(self.end);
        (
            a.x.min(b.x),
            a.x.max(b.x) + self.width - 1,
            a.z.min(b.z),
            a.z.max(b.z) + self.width - 1,
        )
    }

    fn touches_cell(&self, cell: CellCoord) -> bool {
        if cell.world != self.start.world {
            return false;
        }
        let (min_x, max_x, min_z, max_z) = self.horizontal_bounds();
        let cell_min_x = cell.min_block_x();
        let cell_min_z = cell.min_block_z();
        let cell_max_x = cell_min_x + CELL_SIZE - 1;
        let cell_max_z = cell_min_z + CELL_SIZE - 1;
        min_x <= cell_max_x && max_x >= cell_min_x && min_z <= cell_max_z && max_z >= cell_min_z
    }

    fn contains(&self, voxel: Voxel) -> bool {
        if voxel.world != self.start.world {
            return false;
        }
        (0..=self.steps).any(|k| {
            let o = self.box_origin(self.sample(k));
            (o.x..o.x + self.width).contains(&voxel.x)
                && (o.y..o.y + self.height).contains(&voxel.y)
                && (o.z..o.z + self.width).contains(&voxel.z)
        })
    }

    fn voxels(self) -> Voxels<'static> {
        let (w, h) = (self.width, self.height);
        Box::new((0..=self.steps).flat_map(move |k| {
            let o = self.box_origin(self.sample(k));
            (0..w).flat_map(move |dx| {
                (0..h).flat_map(move |dy| (0..w).map(move |dz| o.offset(dx, dy, dz)))
            })
        }))
    }
}

/// Internal expression tree.
#[derive(Clone, Debug, PartialEq)]
enum Shape {
    Empty,
    Segment(Segment),
    Union(Vec<Region>),
    Within { inner: Box<Region>, cell: CellCoord },
    Offset { inner: Box<Region>, delta: [i32; 3] },
}

/// A composable, lazily enumerated set of voxels.
///
/// # Example
///
/// ```rust
/// use hollow_geometry::{CellCoord, Region, Voxel, WorldId};
///
/// let w = WorldId(0);
/// let tunnel = Region::segment(Voxel::new(2, 40, 2, w), Voxel::new(30, 44, 9, w), 3, 4);
/// let mine = tunnel.restrict_to_cell(CellCoord::new(0, 0, w));
///
/// assert!(mine.materialize().iter().all(|v| v.x < 16 && v.z < 16));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Region(Shape);

impl Default for Region {
    fn default() -> Self {
        Self::empty()
    }
}

impl Region {
    /// The region with no members.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Shape::Empty)
    }

    /// Boxes of `width x height x width` swept from `start` to `end`.
    ///
    /// Takes `ceil(distance) + 1` evenly spaced samples (both endpoints
    /// included). Each sample grows a box centred horizontally on it
    /// (offset `-(width / 2)` in X and Z) and extending upward only.
    ///
    /// Degenerate input (`start == end`, zero width or height, endpoints in
    /// different worlds) yields `Region::empty()`.
    #[must_use]
    pub fn segment(start: Voxel, end: Voxel, width: u32, height: u32) -> Self {
        let (Ok(width), Ok(height)) = (i32::try_from(width), i32::try_from(height)) else {
            return Self::empty();
        };
        if start == end || width == 0 || height == 0 || start.world != end.world {
            return Self::empty();
        }
        // distance between distinct i32 points is at least 1 and far below i32::MAX
        #[allow(clippy::cast_possible_truncation)]
        let steps = start.distance(end).ceil() as i32;
        Self(Shape::Segment(Segment {
            start,
            end,
            width,
            height,
            steps,
        }))
    }

    /// Set union of `self` and `other`.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        match (self.0, other.0) {
            (Shape::Empty, rhs) => Self(rhs),
            (lhs, Shape::Empty) => Self(lhs),
            (Shape::Union(mut parts), Shape::Union(more)) => {
                parts.extend(more);
                Self(Shape::Union(parts))
            }
            (Shape::Union(mut parts), rhs) => {
                parts.push(Self(rhs));
                Self(Shape::Union(parts))
            }
            (lhs, rhs) => Self(Shape::Union(vec![Self(lhs), Self(rhs)])),
        }
    }

    /// Union of every region in `parts`.
    #[must_use]
    pub fn union_all(parts: impl IntoIterator<Item = Self>) -> Self {
        parts.into_iter().fold(Self::empty(), Self::union)
    }

    /// Intersection with the column of `cell`, unbounded vertically.
    ///
    /// Restricting twice to the same cell is a no-op; restricting an
    /// already-restricted region to a different cell yields the empty region.
    #[must_use]
    pub fn restrict_to_cell(self, cell: CellCoord) -> Self {
        match self.0 {
            Shape::Empty => Self::empty(),
            Shape::Within { inner, cell: current } if current == cell => {
                Self(Shape::Within { inner, cell })
            }
            Shape::Within { .. } => Self::empty(),
            Shape::Segment(segment) if !segment.touches_cell(cell) => Self::empty(),
            Shape::Union(parts) => {
                Self::union_all(parts.into_iter().map(|part| part.restrict_to_cell(cell)))
            }
            shape => Self(Shape::Within {
                inner: Box::new(Self(shape)),
                cell,
            }),
        }
    }

    /// Shifts every member by `(dx, dy, dz)`.
    #[must_use]
    pub fn translate(self, dx: i32, dy: i32, dz: i32) -> Self {
        if dx == 0 && dy == 0 && dz == 0 {
            return self;
        }
        match self.0 {
            Shape::Empty => Self::empty(),
            Shape::Segment(segment) => Self(Shape::Segment(segment.translated(dx, dy, dz))),
            Shape::Union(parts) => Self(Shape::Union(
                parts.into_iter().map(|p| p.translate(dx, dy, dz)).collect(),
            )),
            // a vertical shift keeps the column, so the restriction can stay outermost
            Shape::Within { inner, cell } if dx == 0 && dz == 0 => Self(Shape::Within {
                inner: Box::new(inner.translate(0, dy, 0)),
                cell,
            }),
            Shape::Offset { inner, delta } => {
                inner.translate(delta[0] + dx, delta[1] + dy, delta[2] + dz)
            }
            shape => Self(Shape::Offset {
                inner: Box::new(Self(shape)),
                delta: [dx, dy, dz],
            }),
        }
    }

    /// Lazily enumerates members. May repeat voxels.
    #[must_use]
    pub fn voxels(&self) -> Voxels<'_> {
        match &self.0 {
            Shape::Empty => Box::new(std::iter::empty()),
            Shape::Segment(segment) => segment.voxels(),
            Shape::Union(parts) => Box::new(parts.iter().flat_map(Self::voxels)),
            Shape::Within { inner, cell } => {
                let cell = *cell;
                Box::new(inner.voxels().filter(move |v| cell.contains(*v)))
            }
            Shape::Offset { inner, delta } => {
                let [dx, dy, dz] = *delta;
                Box::new(inner.voxels().map(move |v| v.offset(dx, dy, dz)))
            }
        }
    }

    /// Deduplicated members in canonical `(x, z, y)` order.
    #[must_use]
    pub fn materialize(&self) -> BTreeSet<Voxel> {
        self.voxels().collect()
    }

    /// Exact membership test, without materializing.
    #[must_use]
    pub fn contains(&self, voxel: Voxel) -> bool {
        match &self.0 {
            Shape::Empty => false,
            Shape::Segment(segment) => segment.contains(voxel),
            Shape::Union(parts) => parts.iter().any(|p| p.contains(voxel)),
            Shape::Within { inner, cell } => cell.contains(voxel) && inner.contains(voxel),
            Shape::Offset { inner, delta } => {
                inner.contains(voxel.offset(-delta[0], -delta[1], -delta[2]))
            }
        }
    }

    /// Returns true if the region has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voxels().next().is_none()
    }

    /// Sets every member not currently holding an `exceptions` block to
    /// `material`. Returns the number of voxels written.
    pub fn fill<A: BlockAccess>(
        &self,
        access: &mut A,
        material: A::Block,
        exceptions: &[A::Block],
    ) -> usize {
        let mut written = 0;
        for voxel in self.materialize() {
            if exceptions.contains(&access.block(voxel)) {
                continue;
            }
            access.set_block(voxel, material);
            written += 1;
        }
        written
    }

    /// Like `fill`, but a member whose lower neighbour is not a member gets
    /// `floor` instead of `air`: the lower boundary becomes floor, the rest
    /// becomes open space. Returns the number of voxels written.
    pub fn fill_with_floor<A: BlockAccess>(
        &self,
        access: &mut A,
        air: A::Block,
        floor: A::Block,
        exceptions: &[A::Block],
    ) -> usize {
        let members = self.materialize();
        let mut written = 0;
        for &voxel in &members {
            if exceptions.contains(&access.block(voxel)) {
                continue;
            }
            let block = if members.contains(&voxel.below()) {
                air
            } else {
                floor
            };
            access.set_block(voxel, block);
            written += 1;
        }
        written
    }
}

impl VoxelSet for Region {
    fn includes(&self, voxel: Voxel) -> bool {
        self.contains(voxel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::WorldId;
    use std::collections::HashMap;

    const W: WorldId = WorldId(0);

    fn v(x: i32, y: i32, z: i32) -> Voxel {
        Voxel::new(x, y, z, W)
    }

    /// Sparse block store for fill tests.
    #[derive(Default)]
    struct Blocks(HashMap<Voxel, u8>);

    impl BlockAccess for Blocks {
        type Block = u8;

        fn block(&self, voxel: Voxel) -> u8 {
            self.0.get(&voxel).copied().unwrap_or(1)
        }

        fn set_block(&mut self, voxel: Voxel, block: u8) {
            self.0.insert(voxel, block);
        }
    }

    #[test]
    fn test_point_segment_is_empty() {
        for (w, h) in [(1, 1), (3, 4), (7, 2)] {
            let r = Region::segment(v(5, 5, 5), v(5, 5, 5), w, h);
            assert!(r.materialize().is_empty());
        }
    }

    #[test]
    fn test_unit_segment_samples_both_ends() {
        let r = Region::segment(v(0, 10, 0), v(3, 10, 0), 1, 1);
        let members: Vec<Voxel> = r.materialize().into_iter().collect();
        assert_eq!(members, vec![v(0, 10, 0), v(1, 10, 0), v(2, 10, 0), v(3, 10, 0)]);
    }

    #[test]
    fn test_segment_box_grows_up_and_centres_horizontally() {
        let r = Region::segment(v(0, 10, 0), v(1, 10, 0), 3, 2);
        let members = r.materialize();
        // lowest layer is the sample's own y
        assert!(members.iter().all(|m| m.y >= 10 && m.y < 12));
        // width 3 -> offset -1
        assert!(members.contains(&v(-1, 10, -1)));
        assert!(members.contains(&v(2, 11, 1)));
        assert!(!members.contains(&v(-2, 10, 0)));
        assert_eq!(members.len(), 4 * 3 * 2);
    }

    #[test]
    fn test_contains_agrees_with_materialize() {
        let r = Region::segment(v(-3, 20, 7), v(21, 27, -12), 3, 4)
            .union(Region::segment(v(0, 5, 0), v(0, 30, 0), 2, 1))
            .restrict_to_cell(CellCoord::new(0, 0, W))
            .translate(1, -2, 3);
        let members = r.materialize();

        for x in -8..24 {
            for z in -16..24 {
                for y in 0..40 {
                    let probe = v(x, y, z);
                    assert_eq!(
                        r.contains(probe),
                        members.contains(&probe),
                        "membership mismatch at {probe}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_union_commutes_and_has_identity() {
        let a = Region::segment(v(0, 0, 0), v(10, 3, 4), 2, 3);
        let b = Region::segment(v(5, 1, -5), v(5, 1, 9), 3, 2);

        assert_eq!(
            a.clone().union(b.clone()).materialize(),
            b.clone().union(a.clone()).materialize()
        );
        assert_eq!(a.clone().union(Region::empty()).materialize(), a.materialize());
        assert_eq!(Region::empty().union(b.clone()).materialize(), b.materialize());
    }

    #[test]
    fn test_union_associates() {
        let a = Region::segment(v(0, 0, 0), v(4, 0, 0), 1, 1);
        let b = Region::segment(v(0, 0, 0), v(0, 0, 4), 1, 1);
        let c = Region::segment(v(0, 0, 0), v(0, 4, 0), 1, 1);

        let left = a.clone().union(b.clone()).union(c.clone());
        let right = a.union(b.union(c));
        assert_eq!(left.materialize(), right.materialize());
    }

    #[test]
    fn test_restrict_is_idempotent() {
        let cell = CellCoord::new(0, 0, W);
        let r = Region::segment(v(-10, 30, 4), v(25, 35, 8), 4, 5);

        let once = r.clone().restrict_to_cell(cell);
        let twice = r.restrict_to_cell(cell).restrict_to_cell(cell);
        assert_eq!(once.materialize(), twice.materialize());
        assert!(!once.is_empty());
    }

    #[test]
    fn test_restrict_to_other_cell_is_empty() {
        let r = Region::segment(v(-10, 30, 4), v(25, 35, 8), 4, 5)
            .restrict_to_cell(CellCoord::new(0, 0, W));
        assert!(r.restrict_to_cell(CellCoord::new(1, 0, W)).is_empty());
    }

    #[test]
    fn test_restrict_keeps_only_the_column() {
        let cell = CellCoord::new(-1, 0, W);
        let r = Region::segment(v(-30, 12, 3), v(12, 60, 12), 3, 4).restrict_to_cell(cell);
        let members = r.materialize();

        assert!(!members.is_empty());
        for m in &members {
            assert!((-CELL_SIZE..0).contains(&m.x), "x out of column: {m}");
            assert!((0..CELL_SIZE).contains(&m.z), "z out of column: {m}");
        }
    }

    #[test]
    fn test_restrict_checks_world() {
        let r = Region::segment(v(0, 0, 0), v(8, 0, 8), 2, 2);
        assert!(r.restrict_to_cell(CellCoord::new(0, 0, WorldId(7))).is_empty());
    }

    #[test]
    fn test_translate_shifts_members() {
        let r = Region::segment(v(0, 0, 0), v(5, 2, 1), 2, 2);
        let shifted: BTreeSet<Voxel> = r.materialize().iter().map(|m| m.offset(4, -1, 9)).collect();
        assert_eq!(r.translate(4, -1, 9).materialize(), shifted);
    }

    #[test]
    fn test_translate_restricted_horizontally_moves_out_of_column() {
        let cell = CellCoord::new(0, 0, W);
        let r = Region::segment(v(0, 0, 0), v(15, 0, 0), 1, 1).restrict_to_cell(cell);
        let shifted = r.translate(CELL_SIZE, 0, 0).materialize();
        assert!(shifted.iter().all(|m| m.x >= CELL_SIZE));
        assert_eq!(shifted.len(), 16);
    }

    #[test]
    fn test_enumeration_may_repeat_but_materialize_does_not() {
        let a = Region::segment(v(0, 0, 0), v(3, 0, 0), 1, 1);
        let r = a.clone().union(a);
        assert_eq!(r.voxels().count(), 8);
        assert_eq!(r.materialize().len(), 4);
    }

    #[test]
    fn test_fill_respects_exceptions() {
        let r = Region::segment(v(0, 0, 0), v(3, 0, 0), 1, 1);
        let mut blocks = Blocks::default();
        blocks.set_block(v(2, 0, 0), 9);

        let written = r.fill(&mut blocks, 0, &[9]);
        assert_eq!(written, 3);
        assert_eq!(blocks.block(v(1, 0, 0)), 0);
        assert_eq!(blocks.block(v(2, 0, 0)), 9);
    }

    #[test]
    fn test_fill_with_floor_marks_lower_boundary() {
        let r = Region::segment(v(0, 10, 0), v(2, 10, 0), 1, 3);
        let mut blocks = Blocks::default();

        r.fill_with_floor(&mut blocks, 0, 5, &[]);
        for x in 0..=2 {
            assert_eq!(blocks.block(v(x, 10, 0)), 5, "bottom layer is floor");
            assert_eq!(blocks.block(v(x, 11, 0)), 0);
            assert_eq!(blocks.block(v(x, 12, 0)), 0);
        }
        // outside the region is untouched
        assert_eq!(blocks.block(v(0, 9, 0)), 1);
    }
}
