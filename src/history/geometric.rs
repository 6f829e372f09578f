//! Geometric series of history lengths.

use itertools::Itertools;

/// Compute 'num' history lengths growing geometrically from 'min_hist' to
/// 'max_hist' (shortest first).
///
/// Each length is `min_hist * ratio^i` rounded to the nearest integer,
/// where `ratio = (max_hist / min_hist)^(1 / (num - 1))`. Collisions between
/// neighboring lengths are resolved upward so that the result is strictly
/// increasing.
///
/// The caller must ensure that `max_hist - min_hist + 1 >= num`.
pub fn geometric_lengths(min_hist: usize, max_hist: usize, num: usize)
    -> Vec<usize>
{
    assert!(num > 0);
    assert!(min_hist > 0 && min_hist <= max_hist);
    assert!(max_hist - min_hist + 1 >= num);

    if num == 1 {
        return vec![min_hist];
    }

    let ratio = (max_hist as f64 / min_hist as f64)
        .powf(1.0 / (num - 1) as f64);

    let mut res: Vec<usize> = (0..num).map(|i| {
        (min_hist as f64 * ratio.powi(i as i32) + 0.5) as usize
    }).collect();
    res[0] = min_hist;
    res[num - 1] = max_hist;

    for i in 1..num {
        res[i] = res[i].max(res[i - 1] + 1);
    }
    // NOTE: The upward pass can only overshoot near the top when the range
    // is nearly saturated; pull the tail back under 'max_hist'.
    res[num - 1] = max_hist;
    for i in (0..num - 1).rev() {
        res[i] = res[i].min(res[i + 1] - 1);
    }
    res
}

/// Returns 'true' if 'lengths' is strictly increasing.
pub fn is_strictly_increasing(lengths: &[usize]) -> bool {
    lengths.iter().tuple_windows().all(|(a, b)| a < b)
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn geometric_5_to_5000() {
        let lens = geometric_lengths(5, 5000, 25);
        assert_eq!(lens.len(), 25);
        assert_eq!(lens[0], 5);
        assert_eq!(*lens.last().unwrap(), 5000);
        assert!(is_strictly_increasing(&lens));

        let ratio = 1000f64.powf(1.0 / 24.0);
        for (i, len) in lens.iter().enumerate() {
            let ideal = 5.0 * ratio.powi(i as i32);
            assert!((*len as f64 - ideal).abs() <= 1.0,
                "length {} = {} too far from {:.2}", i, len, ideal);
        }
    }

    #[test]
    fn crowded_range_is_still_increasing() {
        let lens = geometric_lengths(5, 12, 8);
        assert_eq!(lens, vec![5, 6, 7, 8, 9, 10, 11, 12]);

        let lens = geometric_lengths(2, 40, 10);
        assert!(is_strictly_increasing(&lens));
        assert_eq!(lens[0], 2);
        assert_eq!(lens[9], 40);
    }

    #[test]
    fn single_length() {
        assert_eq!(geometric_lengths(7, 100, 1), vec![7]);
    }
}
