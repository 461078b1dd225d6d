//! Player color allocation from the shared palette

use rand::Rng;

/// Colors handed out to players, in preference order
pub const PALETTE: [&str; 8] = [
    "#ff4d6d", // rose
    "#4dabff", // sky
    "#7dff6a", // lime
    "#ffd23f", // amber
    "#c77dff", // violet
    "#3fffd2", // aqua
    "#ff8f3f", // orange
    "#f5f5f5", // white
];

/// Reference-counted palette allocator.
///
/// The free list is every palette entry with no holders, in palette order.
/// Once the palette is exhausted colors are drawn uniformly at random, so two
/// players can share a color; a shared color only becomes free again when its
/// last holder releases it.
#[derive(Debug, Clone)]
pub struct ColorAllocator {
    holders: [u32; PALETTE.len()],
}

impl ColorAllocator {
    pub fn new() -> Self {
        Self {
            holders: [0; PALETTE.len()],
        }
    }

    /// Take the first free palette entry, or a random one when none are free
    pub fn acquire<R: Rng + ?Sized>(&mut self, rng: &mut R) -> String {
        let index = self
            .holders
            .iter()
            .position(|&count| count == 0)
            .unwrap_or_else(|| rng.gen_range(0..PALETTE.len()));

        self.holders[index] += 1;
        PALETTE[index].to_string()
    }

    /// Give a color back. Colors outside the palette are ignored.
    pub fn release(&mut self, color: &str) {
        if let Some(index) = PALETTE.iter().position(|&c| c == color) {
            self.holders[index] = self.holders[index].saturating_sub(1);
        }
    }

    /// Palette entries nobody holds, in preference order
    pub fn free(&self) -> impl Iterator<Item = &'static str> + '_ {
        PALETTE
            .iter()
            .zip(self.holders.iter())
            .filter(|(_, count)| **count == 0)
            .map(|(&color, _)| color)
    }
}

impl Default for ColorAllocator {
    fn default() -> Self {
        Self::new()
    }
}
