//! In-memory sorting strategies applied to a single partition.

/// Sorting capability. Sorts `items` in place so that no item is followed by one that is `less` than it.
pub trait SortAlgorithm {
    fn sort_by<T, F>(&self, items: &mut [T], less: F)
    where
        F: Fn(&T, &T) -> bool;
}

/// Quicksort using the Lomuto-like wall partition scheme and a median-of-three pivot.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickSort;

impl QuickSort {
    fn quick_sort<T, F>(mut items: &mut [T], less: &F)
    where
        F: Fn(&T, &T) -> bool,
    {
        // recurse into the smaller side only to keep stack depth logarithmic
        while items.len() > 1 {
            let wall = Self::partition(items, less);
            let (left, right) = std::mem::take(&mut items).split_at_mut(wall);
            let right = &mut right[1..];
            if left.len() < right.len() {
                Self::quick_sort(left, less);
                items = right;
            } else {
                Self::quick_sort(right, less);
                items = left;
            }
        }
    }

    fn median_of_three<T, F>(items: &[T], less: &F) -> usize
    where
        F: Fn(&T, &T) -> bool,
    {
        let (left, right) = (0, items.len() - 1);
        let mid = left + (right - left) / 2;

        if less(&items[left], &items[mid]) {
            if less(&items[right], &items[left]) {
                left
            } else if less(&items[right], &items[mid]) {
                right
            } else {
                mid
            }
        } else if less(&items[right], &items[mid]) {
            mid
        } else if less(&items[right], &items[left]) {
            right
        } else {
            left
        }
    }

    /// Moves the pivot to its final position and returns it.
    /// Items after the pivot are greater than it, items before it are not.
    fn partition<T, F>(items: &mut [T], less: &F) -> usize
    where
        F: Fn(&T, &T) -> bool,
    {
        let pivot = Self::median_of_three(items, less);
        items.swap(pivot, 0);

        let mut wall = items.len() - 1;
        for pos in (1..items.len()).rev() {
            if less(&items[0], &items[pos]) {
                items.swap(pos, wall);
                wall -= 1;
            }
        }
        items.swap(0, wall);

        return wall;
    }
}

impl SortAlgorithm for QuickSort {
    fn sort_by<T, F>(&self, items: &mut [T], less: F)
    where
        F: Fn(&T, &T) -> bool,
    {
        Self::quick_sort(items, &less);
    }
}

/// Bubble sort. Quadratic, intended for small inputs only.
#[derive(Debug, Clone, Copy, Default)]
pub struct BubbleSort;

impl SortAlgorithm for BubbleSort {
    fn sort_by<T, F>(&self, items: &mut [T], less: F)
    where
        F: Fn(&T, &T) -> bool,
    {
        let mut unsorted = items.len();
        while unsorted > 1 {
            let mut last_swap = 0;
            for idx in 1..unsorted {
                if less(&items[idx], &items[idx - 1]) {
                    items.swap(idx, idx - 1);
                    last_swap = idx;
                }
            }
            unsorted = last_swap;
        }
    }
}

/// Standard library unstable sort.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdSort;

impl SortAlgorithm for StdSort {
    fn sort_by<T, F>(&self, items: &mut [T], less: F)
    where
        F: Fn(&T, &T) -> bool,
    {
        items.sort_unstable_by(|a, b| {
            if less(a, b) {
                std::cmp::Ordering::Less
            } else if less(b, a) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });
    }
}

/// Runtime-selectable sorting strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    Quick,
    Bubble,
    Std,
}

impl SortAlgorithm for Algorithm {
    fn sort_by<T, F>(&self, items: &mut [T], less: F)
    where
        F: Fn(&T, &T) -> bool,
    {
        match self {
            Algorithm::Quick => QuickSort.sort_by(items, less),
            Algorithm::Bubble => BubbleSort.sort_by(items, less),
            Algorithm::Std => StdSort.sort_by(items, less),
        }
    }
}

#[cfg(test)]
mod test {
    use rand::seq::SliceRandom;
    use rand::Rng;
    use rstest::*;

    use super::{Algorithm, BubbleSort, QuickSort, SortAlgorithm};

    fn ascending(a: &i64, b: &i64) -> bool {
        a < b
    }

    #[rstest]
    #[case(Algorithm::Quick, vec![])]
    #[case(Algorithm::Quick, vec![1])]
    #[case(Algorithm::Quick, vec![5, 3, 1, 4, 2])]
    #[case(Algorithm::Quick, vec![2, 2, 1, 1, 3, 3, 2])]
    #[case(Algorithm::Quick, Vec::from_iter(0..500))]
    #[case(Algorithm::Quick, Vec::from_iter((0..500).rev()))]
    #[case(Algorithm::Quick, vec![7; 100])]
    #[case(Algorithm::Bubble, vec![])]
    #[case(Algorithm::Bubble, vec![5, 3, 1, 4, 2])]
    #[case(Algorithm::Bubble, vec![-1, i64::MAX, i64::MIN, 0])]
    #[case(Algorithm::Std, vec![5, 3, 1, 4, 2])]
    fn test_sort(#[case] algorithm: Algorithm, #[case] input: Vec<i64>) {
        let mut expected = input.clone();
        expected.sort();

        let mut actual = input;
        algorithm.sort_by(&mut actual, ascending);

        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case(Algorithm::Quick)]
    #[case(Algorithm::Bubble)]
    #[case(Algorithm::Std)]
    fn test_sort_descending(#[case] algorithm: Algorithm) {
        let mut input = Vec::from_iter(0..64);
        input.shuffle(&mut rand::thread_rng());

        algorithm.sort_by(&mut input, |a: &i64, b: &i64| a > b);

        assert_eq!(input, Vec::from_iter((0..64).rev()));
    }

    #[test]
    fn test_quick_sort_matches_bubble_sort() {
        let mut rng = rand::thread_rng();
        for len in 0..60 {
            let input: Vec<i64> = (0..len).map(|_| rng.gen_range(-20..20)).collect();

            let mut quick = input.clone();
            QuickSort.sort_by(&mut quick, ascending);
            let mut bubble = input;
            BubbleSort.sort_by(&mut bubble, ascending);

            assert_eq!(quick, bubble);
        }
    }

    #[test]
    fn test_quick_sort_by_key() {
        let mut input = vec![(3, 'c'), (1, 'a'), (2, 'b')];
        QuickSort.sort_by(&mut input, |a, b| a.0 < b.0);
        assert_eq!(input, vec![(1, 'a'), (2, 'b'), (3, 'c')]);
    }
}
