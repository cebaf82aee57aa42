//! Interval arithmetic over lists of memory regions.
//!
//! Neither list is assumed to be sorted, and regions within a list may overlap.

use fdt::MemRegion;

/// Returns the intersection of `a` and `b`.
///
/// Disjoint regions produce a zero-size region based at the later of the two bases.
pub fn overlap(a: MemRegion, b: MemRegion) -> MemRegion {
    let start = a.base.max(b.base);
    let end = a.end().min(b.end());
    MemRegion::new(start, end.saturating_sub(start))
}

/// Sums the available memory not covered by any reserved region.
///
/// Each reservation is subtracted from each available region it intersects. Reservations
/// that overlap each other are subtracted twice, so the result is a lower bound.
pub fn available_memory(available: &[MemRegion], reserved: &[MemRegion]) -> usize {
    available
        .iter()
        .map(|region| {
            let lost: usize = reserved
                .iter()
                .map(|reservation| overlap(*region, *reservation).size)
                .sum();
            region.size.saturating_sub(lost)
        })
        .sum()
}

/// Finds the largest contiguous range in `available` that no `reserved` region touches.
///
/// Each available region is scanned on its own. A cursor tracks the end of the occupied
/// extent; each step takes the lowest-based reservation still reaching past the cursor,
/// measures the gap before it and moves the cursor to its end. The cursor only moves
/// forward, which merges overlapping reservations, and nothing is buffered, so any
/// number of reservations is honoured. Ties keep the first gap found. Returns an empty
/// region if there is no gap at all.
pub fn find_largest_gap(available: &[MemRegion], reserved: &[MemRegion]) -> MemRegion {
    largest_gap(available, reserved.iter())
}

/// [`find_largest_gap`] over any re-iterable set of reservations.
pub(crate) fn largest_gap<'r, R>(available: &[MemRegion], reserved: R) -> MemRegion
where
    R: Iterator<Item = &'r MemRegion> + Clone,
{
    let mut best = MemRegion::empty();

    for region in available.iter().filter(|region| !region.is_empty()) {
        let mut last = region.base;
        while let Some(hit) = reserved
            .clone()
            .map(|reservation| overlap(*region, *reservation))
            .filter(|hit| !hit.is_empty() && hit.end() > last)
            .min_by_key(|hit| hit.base)
        {
            if hit.base > last {
                consider(&mut best, MemRegion::new(last, hit.base - last));
            }
            last = hit.end();
        }
        if region.end() > last {
            consider(&mut best, MemRegion::new(last, region.end() - last));
        }
    }

    best
}

fn consider(best: &mut MemRegion, gap: MemRegion) {
    if gap.size > best.size {
        *best = gap;
    }
}
