use indexmap::IndexMap;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Dice roller and uniform picker used by the character builder.
///
/// The generator is owned by the roller and passed explicitly into
/// [`crate::builder::generate_character`], so callers decide whether a sheet
/// is reproducible (`from_seed`) or not (`from_entropy`). Tests can inject
/// any [`Rng`] through [`Roller::new`].
#[derive(Debug, Clone)]
pub struct Roller<R = StdRng> {
    rng: R,
}

impl Roller<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Roller<R> {
    pub fn new(rng: R) -> Self {
        Roller { rng }
    }

    /// Sum of `count` independent draws from `1..=sides`.
    ///
    /// Both arguments are expected to be positive. A zero count rolls no
    /// dice and yields 0; a zero-sided die is clamped to one side.
    pub fn roll_dice(&mut self, sides: u32, count: u32) -> u32 {
        let sides = sides.max(1);
        (0..count).fold(0u32, |total, _| {
            total.saturating_add(self.rng.gen_range(1..=sides))
        })
    }

    /// 2d6 - 2d4, giving a stat in `-6..=10`.
    pub fn roll_stat(&mut self) -> i32 {
        self.roll_dice(6, 2) as i32 - self.roll_dice(4, 2) as i32
    }

    /// Uniformly chosen element, or `None` when there is nothing to choose.
    pub fn pick<'a, T>(&mut self, candidates: &'a [T]) -> Option<&'a T> {
        if candidates.is_empty() {
            return None;
        }
        candidates.get(self.rng.gen_range(0..candidates.len()))
    }

    /// Uniformly chosen key of an ordered table.
    pub fn pick_key<'a, K, V>(&mut self, table: &'a IndexMap<K, V>) -> Option<&'a K> {
        if table.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..table.len());
        table.get_index(idx).map(|(key, _)| key)
    }
}
