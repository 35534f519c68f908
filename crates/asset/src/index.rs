//! OBJ-style index references: 1-based, or negative relative to the end.

/// Turn a raw face reference into a zero-based index.
///
/// `count` is the number of elements known at the time the reference is
/// read. `0` is never a legal reference. The result is not bounds-checked
/// against `count`; callers validate at the point of use.
#[inline]
pub fn resolve(raw: i64, count: usize) -> Option<usize> {
    if raw > 0 {
        usize::try_from(raw - 1).ok()
    } else if raw < 0 {
        let back = usize::try_from(raw.unsigned_abs()).ok()?;
        count.checked_sub(back)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_is_one_based() {
        for n in [0usize, 1, 7, 1000] {
            for i in 1..=10i64 {
                assert_eq!(resolve(i, n), Some(i as usize - 1));
            }
        }
    }

    #[test]
    fn negative_counts_from_end() {
        let n = 5;
        for k in 1..=n as i64 {
            assert_eq!(resolve(-k, n), Some(n - k as usize));
        }
        assert_eq!(resolve(-1, 5), Some(4));
    }

    #[test]
    fn zero_is_never_valid() {
        for n in [0usize, 1, 42] {
            assert_eq!(resolve(0, n), None);
        }
    }

    #[test]
    fn negative_past_start_is_invalid() {
        assert_eq!(resolve(-4, 3), None);
        assert_eq!(resolve(-1, 0), None);
        assert_eq!(resolve(i64::MIN, 10), None);
    }

    #[test]
    fn positive_is_not_clamped() {
        assert_eq!(resolve(9, 3), Some(8));
    }
}
