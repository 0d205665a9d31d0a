//! Bounded breadth-first search for the closest pixel matching a predicate.
//!
//! Expansion is 4-connected and neighbours are queued up, down, left, right,
//! so among cells at the same BFS depth the first one queued wins. The budget
//! counts queue pops, including pops that are then dropped for being out of
//! bounds or already visited.

use std::collections::VecDeque;

use crate::grid::{Pixel, PixelGrid};

/// Default cap on queue pops per search.
pub const DEFAULT_SEARCH_BUDGET: usize = 8000;

const NEIGHBORS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
    /// `(row, col)` of the first matching pixel, or `None` when the queue
    /// drained or the budget ran out.
    pub found: Option<(usize, usize)>,
    /// Number of queue pops consumed. Never exceeds the budget.
    pub dequeued: usize,
}

/// Reusable scratch state for repeated searches over grids of one size.
///
/// The visited set is a dense per-cell stamp array; bumping the generation
/// clears it in O(1) between searches.
#[derive(Debug)]
pub struct NearestSearch {
    width: usize,
    height: usize,
    stamps: Vec<u32>,
    generation: u32,
    queue: VecDeque<(isize, isize)>,
}

impl NearestSearch {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width as usize, height as usize);
        Self {
            width,
            height,
            stamps: vec![0; width * height],
            generation: 0,
            queue: VecDeque::new(),
        }
    }

    pub fn for_grid(grid: &PixelGrid) -> Self {
        Self::new(grid.width(), grid.height())
    }

    fn begin(&mut self, grid: &PixelGrid) {
        let (w, h) = (grid.width() as usize, grid.height() as usize);
        if w != self.width || h != self.height {
            *self = Self::new(grid.width(), grid.height());
        }
        self.queue.clear();
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.stamps.fill(0);
            self.generation = 1;
        }
    }

    #[inline]
    fn index(&self, row: isize, col: isize) -> Option<usize> {
        if row < 0 || col < 0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        (row < self.height && col < self.width).then(|| row * self.width + col)
    }

    #[inline]
    fn visited(&self, row: isize, col: isize) -> bool {
        self.index(row, col).is_some_and(|i| self.stamps[i] == self.generation)
    }

    /// Search `grid` outward from `start`, popping at most `budget` queue entries.
    pub fn find<P>(
        &mut self,
        grid: &PixelGrid,
        start: (usize, usize),
        predicate: P,
        budget: usize,
    ) -> SearchOutcome
    where
        P: Fn(&Pixel) -> bool,
    {
        self.begin(grid);
        self.queue.push_back((start.0 as isize, start.1 as isize));

        let pixels = grid.pixels();
        let mut dequeued = 0;
        while dequeued < budget {
            let Some((row, col)) = self.queue.pop_front() else {
                break;
            };
            dequeued += 1;

            let Some(idx) = self.index(row, col) else {
                continue;
            };
            if self.stamps[idx] == self.generation {
                continue;
            }
            self.stamps[idx] = self.generation;

            if predicate(&pixels[idx]) {
                return SearchOutcome {
                    found: Some((row as usize, col as usize)),
                    dequeued,
                };
            }

            // Bounds are checked when popped, not here.
            for (dr, dc) in NEIGHBORS {
                let next = (row + dr, col + dc);
                if !self.visited(next.0, next.1) {
                    self.queue.push_back(next);
                }
            }
        }

        SearchOutcome {
            found: None,
            dequeued,
        }
    }
}

/// One-off search; see [`NearestSearch::find`].
pub fn find_nearest<P>(
    grid: &PixelGrid,
    row: usize,
    col: usize,
    predicate: P,
    budget: usize,
) -> Option<(usize, usize)>
where
    P: Fn(&Pixel) -> bool,
{
    NearestSearch::for_grid(grid)
        .find(grid, (row, col), predicate, budget)
        .found
}
