use crate::error::ConfigurationError;

/// Axis a group arranges its children along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Children side by side, left to right.
    Horizontal,
    /// Children stacked, top to bottom.
    Vertical,
}

/// Upper bound of a size preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bound {
    Cells(u16),
    Unbounded,
    /// The node's current content extent, resolved at plot build time.
    Natural,
}

/// Immutable (minimum, maximum) extent declaration for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizePref {
    min: u16,
    max: Bound,
}

impl Default for SizePref {
    /// As much as is available, but none is fine.
    fn default() -> Self {
        Self {
            min: 0,
            max: Bound::Unbounded,
        }
    }
}

impl SizePref {
    /// Fails when a finite maximum is below the minimum.
    pub fn new(min: u16, max: Bound) -> Result<Self, ConfigurationError> {
        if let Bound::Cells(cells) = max {
            if cells < min {
                return Err(ConfigurationError::InvalidSizePreference { min, max: cells });
            }
        }
        Ok(Self { min, max })
    }

    pub fn range(min: u16, max: u16) -> Result<Self, ConfigurationError> {
        Self::new(min, Bound::Cells(max))
    }

    pub const fn fixed(cells: u16) -> Self {
        Self {
            min: cells,
            max: Bound::Cells(cells),
        }
    }

    pub const fn at_least(min: u16) -> Self {
        Self {
            min,
            max: Bound::Unbounded,
        }
    }

    /// At least `min`, growing up to the content extent.
    pub const fn natural(min: u16) -> Self {
        Self {
            min,
            max: Bound::Natural,
        }
    }

    pub const fn min(&self) -> u16 {
        self.min
    }

    pub const fn max(&self) -> Bound {
        self.max
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Replace a natural maximum with the content extent. A content extent
    /// below the minimum resolves to the minimum.
    pub fn resolve(&self, natural: usize) -> Resolved {
        let min = u32::from(self.min);
        let max = match self.max {
            Bound::Cells(cells) => Some(u32::from(cells)),
            Bound::Unbounded => None,
            Bound::Natural => Some(u32::try_from(natural).unwrap_or(u32::MAX).max(min)),
        };
        Resolved { min, max }
    }
}

/// A size preference with natural bounds substituted; `None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolved {
    pub min: u32,
    pub max: Option<u32>,
}

impl Default for Resolved {
    fn default() -> Self {
        Self { min: 0, max: None }
    }
}

impl Resolved {
    pub const fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Merge children along the axis they are arranged on: minima add up, and
    /// maxima add up only while every child is bounded.
    pub fn merge_main<I>(prefs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut min = 0u32;
        let mut max = Some(0u32);
        for pref in prefs {
            min = min.saturating_add(pref.min);
            max = match (max, pref.max) {
                (Some(total), Some(child)) => Some(total.saturating_add(child)),
                _ => None,
            };
        }
        Self { min, max }
    }

    /// Merge children across the axis they are arranged on: the largest
    /// minimum and, while every child is bounded, the largest maximum.
    pub fn merge_cross<I>(prefs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut min = 0u32;
        let mut max = Some(0u32);
        for pref in prefs {
            min = min.max(pref.min);
            max = match (max, pref.max) {
                (Some(widest), Some(child)) => Some(widest.max(child)),
                _ => None,
            };
        }
        Self { min, max }
    }

    /// Narrow a merged preference by a node's own declaration.
    pub fn clamp_to(self, own: Self) -> Self {
        let min = self.min.max(own.min);
        let max = match (self.max, own.max) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
        .map(|max| max.max(min));
        Self { min, max }
    }
}

/// Partition `total` cells among siblings in order.
///
/// Minima are reserved first-come-first-served, so under scarcity the
/// latest siblings get nothing. The surplus then raises a shared watermark
/// over the bounded siblings, lowest remaining room first, until either all
/// of them reach their maximum or the surplus can no longer lift every
/// unsaturated sibling by a whole cell. What is left goes to the unbounded
/// siblings, then to bounded siblings still below their maximum, and only
/// when neither exists to every sibling. Each residual split is as even as
/// possible with the odd cells going to the earliest siblings.
pub fn divvy(prefs: &[Resolved], total: u32) -> Vec<u32> {
    let mut alloc = vec![0u32; prefs.len()];
    let mut remaining = total;

    for (slot, pref) in alloc.iter_mut().zip(prefs) {
        let take = pref.min.min(remaining);
        *slot = take;
        remaining -= take;
    }
    if remaining == 0 {
        return alloc;
    }

    let mut rising: Vec<(u32, usize)> = (0..prefs.len())
        .filter_map(|idx| {
            let room = prefs[idx].max?.saturating_sub(alloc[idx]);
            (room > 0).then_some((room, idx))
        })
        .collect();
    rising.sort_unstable();

    let mut level = 0u32;
    let mut unsaturated = rising.len() as u32;
    for &(target, _) in &rising {
        let step = (target - level).saturating_mul(unsaturated);
        if step <= remaining {
            remaining -= step;
            level = target;
            unsaturated -= 1;
        } else {
            let lift = remaining / unsaturated;
            level += lift;
            remaining -= lift * unsaturated;
            break;
        }
    }
    for &(target, idx) in &rising {
        alloc[idx] += target.min(level);
    }
    if remaining == 0 {
        return alloc;
    }

    let unbounded: Vec<usize> = (0..prefs.len())
        .filter(|&idx| prefs[idx].max.is_none())
        .collect();
    let receivers = if unbounded.is_empty() {
        let below_max: Vec<usize> = rising
            .iter()
            .map(|&(_, idx)| idx)
            .filter(|&idx| prefs[idx].max.is_some_and(|max| alloc[idx] < max))
            .collect();
        if below_max.is_empty() {
            (0..prefs.len()).collect()
        } else {
            let mut ordered = below_max;
            ordered.sort_unstable();
            ordered
        }
    } else {
        unbounded
    };

    split_evenly(&mut alloc, &receivers, remaining);
    alloc
}

fn split_evenly(alloc: &mut [u32], receivers: &[usize], amount: u32) {
    if receivers.is_empty() {
        return;
    }
    let count = receivers.len() as u32;
    let base = amount / count;
    let extra = amount % count;
    for (rank, &idx) in receivers.iter().enumerate() {
        alloc[idx] += base + u32::from((rank as u32) < extra);
    }
}
