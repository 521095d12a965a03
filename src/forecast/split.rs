//! Shuffled train/test split over row indices.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` and hold out `ceil(test_fraction * n)` rows for testing.
///
/// With a seed the split is reproducible; without one it is drawn from OS
/// entropy. `None` when either side would end up empty.
pub fn train_test_split(n: usize, test_fraction: f64, seed: Option<u64>) -> Option<Split> {
    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return None;
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Some(Split { train, test: indices })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_follow_ceiling_of_fraction() {
        let split = train_test_split(10, 0.2, Some(1)).unwrap();
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.train.len(), 8);

        let split = train_test_split(11, 0.2, Some(1)).unwrap();
        assert_eq!(split.test.len(), 3);
    }

    #[test]
    fn partitions_cover_every_row_once() {
        let split = train_test_split(25, 0.2, None).unwrap();
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_same_split() {
        assert_eq!(train_test_split(30, 0.2, Some(7)), train_test_split(30, 0.2, Some(7)));
    }

    #[test]
    fn too_few_rows_is_none() {
        assert_eq!(train_test_split(1, 0.2, Some(0)), None);
        assert_eq!(train_test_split(0, 0.2, Some(0)), None);
    }
}
