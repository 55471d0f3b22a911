//! A fixed-size occupancy grid using const generics.
//!
//! The type is `no_std` friendly and avoids heap allocations. Cells are
//! addressed as `(x, y)` and packed into an unsigned integer `T` at bit
//! `y * N + x`. This is the accumulator used by the layout check: the same
//! cell-by-cell fold the deployment circuit performs.

use core::ops::{BitAnd, BitOr};
use core::{fmt, mem};
use num_traits::{PrimInt, Unsigned, Zero};

/// Errors returned by grid operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    /// Requested grid size N*N exceeds capacity of `T::BITS`.
    SizeTooLarge { n: usize, capacity: usize },
    /// Cell lies outside [0..N) on either axis.
    OutOfBounds { x: usize, y: usize },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::SizeTooLarge { n, capacity } => {
                write!(f, "grid of {} cells exceeds capacity {}", n * n, capacity)
            }
            GridError::OutOfBounds { x, y } => write!(f, "cell ({}, {}) is off the board", x, y),
        }
    }
}

/// An N×N set of cells stored in the unsigned integer `T`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grid<T, const N: usize>
where
    T: PrimInt + Unsigned + Zero,
{
    bits: T,
}

impl<T, const N: usize> Grid<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    /// Create an empty grid without size check.
    #[inline]
    pub fn new() -> Self {
        Grid { bits: T::zero() }
    }

    /// Fallible constructor: returns `Err(SizeTooLarge)` if N*N > T::BITS.
    pub fn try_new() -> Result<Self, GridError> {
        let capacity = mem::size_of::<T>() * 8;
        if N * N > capacity {
            Err(GridError::SizeTooLarge { n: N, capacity })
        } else {
            Ok(Self::new())
        }
    }

    #[inline]
    fn index(x: usize, y: usize) -> Result<usize, GridError> {
        if x >= N || y >= N {
            Err(GridError::OutOfBounds { x, y })
        } else {
            Ok(y * N + x)
        }
    }

    /// Whether `(x, y)` is in the set. Off-board cells are never contained.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        match Self::index(x, y) {
            Ok(idx) => ((self.bits >> idx) & T::one()) != T::zero(),
            Err(_) => false,
        }
    }

    /// Add `(x, y)`. Returns `Ok(false)` if it was already present.
    pub fn insert(&mut self, x: usize, y: usize) -> Result<bool, GridError> {
        let idx = Self::index(x, y)?;
        let bit = T::one() << idx;
        let fresh = (self.bits & bit).is_zero();
        self.bits = self.bits | bit;
        Ok(fresh)
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_zero()
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        (self.bits & other.bits).is_zero()
    }

    /// Builds a grid from `(x, y)` cells, failing on the first off-board cell.
    pub fn from_cells<I>(cells: I) -> Result<Self, GridError>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut grid = Self::new();
        for (x, y) in cells {
            grid.insert(x, y)?;
        }
        Ok(grid)
    }

    /// Occupied cells in row-major order.
    pub fn cells(&self) -> Cells<'_, T, N> {
        Cells { grid: self, idx: 0 }
    }
}

impl<T, const N: usize> Default for Grid<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> fmt::Debug for Grid<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid<{}>:", N)?;
        for y in 0..N {
            for x in 0..N {
                write!(f, "{} ", if self.contains(x, y) { '■' } else { '□' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Iterator over the occupied cells of a grid.
pub struct Cells<'a, T, const N: usize>
where
    T: PrimInt + Unsigned + Zero,
{
    grid: &'a Grid<T, N>,
    idx: usize,
}

impl<'a, T, const N: usize> Iterator for Cells<'a, T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while self.idx < N * N {
            let idx = self.idx;
            self.idx += 1;
            if ((self.grid.bits >> idx) & T::one()) != T::zero() {
                return Some((idx % N, idx / N));
            }
        }
        None
    }
}

impl<T, const N: usize> BitAnd for Grid<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Grid { bits: self.bits & rhs.bits }
    }
}

impl<T, const N: usize> BitOr for Grid<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Grid { bits: self.bits | rhs.bits }
    }
}
