//! # Cache Color Reservations
//!
//! Clients (processes, kernel subsystems) can reserve colors of a cache level
//! for their exclusive use. A reservation at one level also takes away the
//! overlapping colors of every other level, so two clients never share sets
//! in any cache:
//!
//! ```text
//!  L3 (8 colors)  │0│1│2│3│4│5│6│7│
//!  L2 (4 colors)  │ 0 │ 1 │ 2 │ 3 │
//!  L1 (2 colors)  │   0   │   1   │
//!
//!  reserve L2:1 ─► L2 {1}, L3 {2,3}, L1 {0} become unavailable
//! ```
//!
//! A client's [`ColorMap`] always records what it owns in **last-level
//! cache** colors, which is what [`PhysicalMemoryManager::alloc_in_colors`]
//! consumes.
//!
//! [`PhysicalMemoryManager::alloc_in_colors`]: crate::PhysicalMemoryManager::alloc_in_colors

use crate::cache::{CacheLevel, CacheTopology, MAX_COLORS, overlapping_colors};
use crate::error::ColorError;
use core::fmt;
use core::ops::Range;
use kernel_sync::SpinMutex;
use log::trace;

const WORDS: usize = MAX_COLORS / 64;

/// A set of color numbers below [`MAX_COLORS`].
#[derive(Clone, PartialEq, Eq)]
pub struct ColorMap {
    bits: [u64; WORDS],
}

impl ColorMap {
    #[must_use]
    pub const fn new() -> Self {
        Self { bits: [0; WORDS] }
    }

    /// The set `0..colors`.
    #[must_use]
    pub fn full(colors: usize) -> Self {
        let mut map = Self::new();
        map.insert_range(0..colors);
        map
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, color: usize) -> bool {
        color < MAX_COLORS && self.bits[color / 64] & (1 << (color % 64)) != 0
    }

    /// # Panics
    /// If `color` is not below [`MAX_COLORS`].
    #[inline]
    pub fn insert(&mut self, color: usize) {
        assert!(color < MAX_COLORS, "color {color} out of range");
        self.bits[color / 64] |= 1 << (color % 64);
    }

    #[inline]
    pub fn remove(&mut self, color: usize) {
        if color < MAX_COLORS {
            self.bits[color / 64] &= !(1 << (color % 64));
        }
    }

    pub fn insert_range(&mut self, colors: Range<usize>) {
        colors.for_each(|c| self.insert(c));
    }

    pub fn remove_range(&mut self, colors: Range<usize>) {
        colors.for_each(|c| self.remove(c));
    }

    /// Whether every color of `colors` is in the set.
    #[must_use]
    pub fn contains_range(&self, colors: Range<usize>) -> bool {
        colors.into_iter().all(|c| self.contains(c))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Lowest color in the set.
    #[must_use]
    pub fn first(&self) -> Option<usize> {
        self.bits
            .iter()
            .enumerate()
            .find(|&(_, &w)| w != 0)
            .map(|(i, w)| i * 64 + w.trailing_zeros() as usize)
    }

    /// Colors in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_COLORS).filter(|&c| self.contains(c))
    }
}

impl Default for ColorMap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ColorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Per-level maps of colors nobody has reserved.
struct FreeColors {
    levels: [Option<ColorMap>; 3],
}

/// Global color reservation state for a cache topology.
pub struct ColorReservations {
    topology: CacheTopology,
    llc_colors: usize,
    free: SpinMutex<FreeColors>,
}

impl ColorReservations {
    /// All colors of all described levels start out available.
    #[must_use]
    pub fn new(topology: CacheTopology) -> Self {
        let levels = CacheLevel::ALL.map(|level| topology.get(level).map(|c| ColorMap::full(c.num_colors())));
        Self {
            llc_colors: topology.llc_colors(),
            topology,
            free: SpinMutex::new(FreeColors { levels }),
        }
    }

    #[must_use]
    pub const fn topology(&self) -> &CacheTopology {
        &self.topology
    }

    /// Number of unreserved colors at `level`.
    #[must_use]
    pub fn free_colors(&self, level: CacheLevel) -> Option<usize> {
        self.free.lock_irq().levels[level.index()].as_ref().map(ColorMap::len)
    }

    #[must_use]
    pub fn is_free(&self, level: CacheLevel, color: usize) -> bool {
        self.free.lock_irq().levels[level.index()]
            .as_ref()
            .is_some_and(|m| m.contains(color))
    }

    fn colors_of(&self, level: CacheLevel) -> Result<usize, ColorError> {
        self.topology
            .get(level)
            .map(|c| c.num_colors())
            .ok_or(ColorError::NoSuchCache(level))
    }

    fn check_color(&self, level: CacheLevel, color: usize) -> Result<usize, ColorError> {
        let colors = self.colors_of(level)?;
        if color >= colors {
            return Err(ColorError::InvalidColor { color, colors });
        }
        Ok(colors)
    }

    /// Reserve the lowest free color of `level` into `map`.
    ///
    /// # Errors
    /// [`ColorError::NoneFree`] if every color of the level is taken.
    pub fn reserve(&self, level: CacheLevel, map: &mut ColorMap) -> Result<usize, ColorError> {
        let colors = self.colors_of(level)?;
        let mut free = self.free.lock_irq();
        let color = free.levels[level.index()]
            .as_ref()
            .and_then(ColorMap::first)
            .ok_or(ColorError::NoneFree)?;
        self.take(&mut free, level, colors, color, map);
        Ok(color)
    }

    /// Reserve `color` of `level` into `map`.
    ///
    /// # Errors
    /// [`ColorError::Unavailable`] if another reservation overlaps it.
    pub fn reserve_specific(&self, level: CacheLevel, color: usize, map: &mut ColorMap) -> Result<(), ColorError> {
        let colors = self.check_color(level, color)?;
        let mut free = self.free.lock_irq();
        if !free.levels[level.index()].as_ref().is_some_and(|m| m.contains(color)) {
            return Err(ColorError::Unavailable(color));
        }
        self.take(&mut free, level, colors, color, map);
        Ok(())
    }

    /// Give back the lowest color of `level` that `map` owns.
    ///
    /// Does nothing if `map` owns none.
    ///
    /// # Errors
    /// [`ColorError::NoSuchCache`] if the level is not described.
    pub fn release(&self, level: CacheLevel, map: &mut ColorMap) -> Result<(), ColorError> {
        let colors = self.colors_of(level)?;
        let mut free = self.free.lock_irq();
        let owned = (0..colors).find(|&c| {
            let taken = !free.levels[level.index()].as_ref().is_some_and(|m| m.contains(c));
            taken && map.contains_range(overlapping_colors(colors, self.llc_colors, c))
        });
        if let Some(color) = owned {
            self.give_back(&mut free, level, colors, color, map);
        }
        Ok(())
    }

    /// Give back `color` of `level`.
    ///
    /// Does nothing if the color is not reserved or `map` does not own it.
    ///
    /// # Errors
    /// [`ColorError::InvalidColor`] for a color outside the level.
    pub fn release_specific(&self, level: CacheLevel, color: usize, map: &mut ColorMap) -> Result<(), ColorError> {
        let colors = self.check_color(level, color)?;
        let mut free = self.free.lock_irq();
        if free.levels[level.index()].as_ref().is_some_and(|m| m.contains(color)) {
            return Ok(());
        }
        if !map.contains_range(overlapping_colors(colors, self.llc_colors, color)) {
            return Ok(());
        }
        self.give_back(&mut free, level, colors, color, map);
        Ok(())
    }

    /// Levels in update order: `level` itself first, then the others.
    fn update_order(&self, level: CacheLevel) -> impl Iterator<Item = (CacheLevel, usize)> + '_ {
        core::iter::once(level)
            .chain(CacheLevel::ALL.into_iter().filter(move |&l| l != level))
            .filter_map(|l| self.topology.get(l).map(|c| (l, c.num_colors())))
    }

    fn take(&self, free: &mut FreeColors, level: CacheLevel, colors: usize, color: usize, map: &mut ColorMap) {
        for (other, other_colors) in self.update_order(level) {
            if let Some(m) = free.levels[other.index()].as_mut() {
                m.remove_range(overlapping_colors(colors, other_colors, color));
            }
        }
        map.insert_range(overlapping_colors(colors, self.llc_colors, color));
        trace!("reserved {level} color {color}");
    }

    fn give_back(&self, free: &mut FreeColors, level: CacheLevel, colors: usize, color: usize, map: &mut ColorMap) {
        for (other, other_colors) in self.update_order(level) {
            let overlap = overlapping_colors(colors, other_colors, color);
            if colors <= other_colors {
                if let Some(m) = free.levels[other.index()].as_mut() {
                    m.insert_range(overlap);
                }
                continue;
            }

            // A coarser color comes back only once all of its finer colors
            // at this level are free again.
            let coarse = overlap.start;
            let all_free = free.levels[level.index()]
                .as_ref()
                .is_some_and(|m| m.contains_range(overlapping_colors(other_colors, colors, coarse)));
            if all_free && let Some(m) = free.levels[other.index()].as_mut() {
                m.insert(coarse);
            }
        }
        map.remove_range(overlapping_colors(colors, self.llc_colors, color));
        trace!("released {level} color {color}");
    }
}
