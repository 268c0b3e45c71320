//! Stratified partitioning

use crate::error::{DiagnosisError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row indices of a train/test partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

impl TrainTestSplit {
    /// Materialize the partition: `(x_train, x_test, y_train, y_test)`
    pub fn apply(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> (Array2<f64>, Array2<f64>, Array1<f64>, Array1<f64>) {
        (
            x.select(Axis(0), &self.train_indices),
            x.select(Axis(0), &self.test_indices),
            y.select(Axis(0), &self.train_indices),
            y.select(Axis(0), &self.test_indices),
        )
    }

    pub fn n_train(&self) -> usize {
        self.train_indices.len()
    }

    pub fn n_test(&self) -> usize {
        self.test_indices.len()
    }
}

/// A single fold of a k-fold partition
#[derive(Debug, Clone)]
pub struct Fold {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Shuffled train/test split that preserves class proportions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StratifiedSplit {
    test_size: f64,
    random_state: u64,
}

impl StratifiedSplit {
    pub fn new(test_size: f64, random_state: u64) -> Self {
        Self {
            test_size,
            random_state,
        }
    }

    /// Partition sample indices by the class codes in `y`.
    ///
    /// `n_test = ceil(test_size * n)`. Each class contributes its
    /// proportional share of the test set, rounded by largest remainder
    /// (ties go to the lower class code), so every partition is within one
    /// sample of the exact class ratio.
    pub fn split(&self, y: &Array1<f64>) -> Result<TrainTestSplit> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(DiagnosisError::InvalidParameter {
                name: "test_size".to_string(),
                value: self.test_size.to_string(),
                reason: "must lie strictly between 0 and 1".to_string(),
            });
        }

        let n = y.len();
        let class_indices = group_by_class(y);
        let n_classes = class_indices.len();

        if let Some((class, members)) = class_indices.iter().find(|(_, m)| m.len() < 2) {
            return Err(DiagnosisError::ValidationError(format!(
                "class {} has {} member(s); stratification needs at least 2",
                class,
                members.len()
            )));
        }

        let n_test = ((self.test_size * n as f64) - 1e-9).ceil() as usize;
        let n_train = n - n_test;
        if n_test < n_classes || n_train < n_classes {
            return Err(DiagnosisError::ValidationError(format!(
                "split of {} samples into {} train / {} test cannot hold all {} classes",
                n, n_train, n_test, n_classes
            )));
        }

        let counts: Vec<usize> = class_indices.values().map(Vec::len).collect();
        let test_counts = allocate(&counts, n_test);
        for ((class, &count), &k_test) in class_indices.keys().zip(&counts).zip(&test_counts) {
            if k_test == 0 || k_test >= count {
                return Err(DiagnosisError::ValidationError(format!(
                    "class {} gets {} of its {} member(s) in the test partition; both partitions must hold every class",
                    class, k_test, count
                )));
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut train_indices = Vec::with_capacity(n_train);
        let mut test_indices = Vec::with_capacity(n_test);

        for (members, &k_test) in class_indices.values().zip(test_counts.iter()) {
            let mut members = members.clone();
            members.shuffle(&mut rng);
            test_indices.extend_from_slice(&members[..k_test]);
            train_indices.extend_from_slice(&members[k_test..]);
        }

        train_indices.shuffle(&mut rng);
        test_indices.shuffle(&mut rng);

        Ok(TrainTestSplit {
            train_indices,
            test_indices,
        })
    }
}

/// Stratified k-fold partition. Each class is shuffled and dealt
/// round-robin across folds.
pub fn stratified_k_fold(y: &Array1<f64>, n_splits: usize, random_state: u64) -> Result<Vec<Fold>> {
    if n_splits < 2 {
        return Err(DiagnosisError::ValidationError(
            "n_splits must be at least 2".to_string(),
        ));
    }
    if y.len() < n_splits {
        return Err(DiagnosisError::ValidationError(format!(
            "n_samples ({}) must be >= n_splits ({})",
            y.len(),
            n_splits
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(random_state);
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];

    for (_, mut members) in group_by_class(y) {
        members.shuffle(&mut rng);
        for (i, idx) in members.into_iter().enumerate() {
            folds[i % n_splits].push(idx);
        }
    }

    Ok((0..n_splits)
        .map(|fold_idx| Fold {
            test_indices: folds[fold_idx].clone(),
            train_indices: folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold_idx)
                .flat_map(|(_, f)| f.iter().copied())
                .collect(),
            fold_idx,
        })
        .collect())
}

/// Sample indices per class code, in ascending code order
pub(crate) fn group_by_class(y: &Array1<f64>) -> BTreeMap<i64, Vec<usize>> {
    let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in y.iter().enumerate() {
        class_indices.entry(label.round() as i64).or_default().push(idx);
    }
    class_indices
}

/// Largest-remainder allocation of `total` slots proportional to `counts`
fn allocate(counts: &[usize], total: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * total as f64 / n as f64)
        .collect();
    let mut alloc: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut remaining = total - alloc.iter().sum::<usize>();
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    for &k in order.iter().cycle() {
        if remaining == 0 {
            break;
        }
        if alloc[k] < counts[k] {
            alloc[k] += 1;
            remaining -= 1;
        }
    }

    alloc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n_benign: usize, n_malignant: usize) -> Array1<f64> {
        let mut y = vec![0.0; n_benign];
        y.extend(vec![1.0; n_malignant]);
        Array1::from_vec(y)
    }

    fn class_count(y: &Array1<f64>, indices: &[usize], class: f64) -> usize {
        indices.iter().filter(|&&i| y[i] == class).count()
    }

    #[test]
    fn test_sixty_forty_split_sizes() {
        let y = labels(60, 40);
        let split = StratifiedSplit::new(0.2, 42).split(&y).unwrap();

        assert_eq!(split.n_train(), 80);
        assert_eq!(split.n_test(), 20);
        assert_eq!(class_count(&y, &split.train_indices, 0.0), 48);
        assert_eq!(class_count(&y, &split.train_indices, 1.0), 32);
        assert_eq!(class_count(&y, &split.test_indices, 0.0), 12);
        assert_eq!(class_count(&y, &split.test_indices, 1.0), 8);
    }

    #[test]
    fn test_split_is_deterministic() {
        let y = labels(37, 21);
        let a = StratifiedSplit::new(0.2, 7).split(&y).unwrap();
        let b = StratifiedSplit::new(0.2, 7).split(&y).unwrap();
        assert_eq!(a, b);

        let c = StratifiedSplit::new(0.2, 8).split(&y).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_split_is_a_partition() {
        let y = labels(33, 18);
        let split = StratifiedSplit::new(0.25, 1).split(&y).unwrap();

        let mut all: Vec<usize> = split
            .train_indices
            .iter()
            .chain(split.test_indices.iter())
            .copied()
            .collect();
        all.sort();
        assert_eq!(all, (0..51).collect::<Vec<_>>());
    }

    #[test]
    fn test_class_ratio_within_one_sample() {
        for (b, m) in [(357, 212), (50, 7), (11, 9), (101, 99)] {
            let y = labels(b, m);
            let n = (b + m) as f64;
            let split = StratifiedSplit::new(0.2, 42).split(&y).unwrap();

            for (indices, size) in [
                (&split.train_indices, split.n_train()),
                (&split.test_indices, split.n_test()),
            ] {
                let expected = m as f64 / n * size as f64;
                let actual = class_count(&y, indices, 1.0) as f64;
                assert!((actual - expected).abs() <= 1.0, "{} vs {}", actual, expected);
            }
        }
    }

    #[test]
    fn test_singleton_class_rejected() {
        let y = labels(10, 1);
        assert!(StratifiedSplit::new(0.2, 42).split(&y).is_err());
    }

    #[test]
    fn test_rare_class_must_reach_both_partitions() {
        let y = labels(98, 2);
        assert!(matches!(
            StratifiedSplit::new(0.2, 42).split(&y),
            Err(DiagnosisError::ValidationError(_))
        ));

        // enough minority members to land one in test
        let y = labels(90, 10);
        let split = StratifiedSplit::new(0.2, 42).split(&y).unwrap();
        assert_eq!(class_count(&y, &split.test_indices, 1.0), 2);
    }

    #[test]
    fn test_invalid_test_size() {
        let y = labels(10, 10);
        assert!(matches!(
            StratifiedSplit::new(1.0, 42).split(&y),
            Err(DiagnosisError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_stratified_k_fold_balances_classes() {
        let y = labels(20, 10);
        let folds = stratified_k_fold(&y, 5, 42).unwrap();

        assert_eq!(folds.len(), 5);
        for fold in &folds {
            assert_eq!(fold.test_indices.len(), 6);
            assert_eq!(class_count(&y, &fold.test_indices, 1.0), 2);
            assert_eq!(fold.train_indices.len() + fold.test_indices.len(), 30);
        }
    }

    #[test]
    fn test_allocate_largest_remainder() {
        assert_eq!(allocate(&[60, 40], 20), vec![12, 8]);
        assert_eq!(allocate(&[5, 5], 3), vec![2, 1]);
        assert_eq!(allocate(&[357, 212], 114).iter().sum::<usize>(), 114);
    }
}
