use std::collections::HashMap;
use std::hash::Hash;

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Returns the most frequent value, breaking ties by first occurrence.
/// Returns `None` for empty input.
pub fn mode<T, I>(values: I) -> Option<T>
where
    T: Copy + Eq + Hash,
    I: IntoIterator<Item = T>,
{
    // counts[i] belongs to the i-th distinct value in order of first appearance
    let mut slots: HashMap<T, usize> = HashMap::new();
    let mut counts: Vec<(T, usize)> = Vec::new();

    for value in values {
        let slot = *slots.entry(value).or_insert_with(|| {
            counts.push((value, 0));
            counts.len() - 1
        });
        counts[slot].1 += 1;
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[3.0, 1.0]), 2.0);
        assert_eq!(mean(&[0.0, 0.0, 3.0]), 1.0);
    }

    #[test]
    fn test_mode_picks_most_frequent() {
        assert_eq!(mode([4, 7, 7, 4, 7]), Some(7));
    }

    #[test]
    fn test_mode_tie_breaks_on_first_occurrence() {
        assert_eq!(mode(["A", "B", "A", "B"]), Some("A"));
        assert_eq!(mode([9, 2, 2, 9]), Some(9));
    }

    #[test]
    fn test_mode_empty() {
        assert_eq!(mode(Vec::<i64>::new()), None);
    }
}
