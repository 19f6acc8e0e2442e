//! Factorization enumerators for tile-size and subcluster parameters
//! (spec.md §4.1).
//!
//! Two flavors are needed because the reference search space treats
//! "how many ways can a tile dimension be split across `v` loop levels"
//! and "how many ways can `n` sub-clusters be arranged across `v` spatial
//! axes" as subtly different problems: the former allows factors of 1
//! (a level can contribute no tiling at all) while the latter requires
//! every factor to be at least 2 (a sub-cluster split of 1 is not a split).

/// Enumerate every ordered tuple `(f_1, .., f_v)` of positive integers with
/// `f_1 * .. * f_v == n`, factors `>= 1`.
///
/// Order matches the reference recursion: the first factor is tried from
/// `n` down to `1`, and for each choice the remaining factors of
/// `n / f_1` are enumerated the same way.
pub fn combinations(n: i64, v: usize) -> Vec<Vec<i64>> {
    if v == 0 {
        return if n == 1 { vec![vec![]] } else { vec![] };
    }
    if v == 1 {
        return vec![vec![n]];
    }
    let mut out = Vec::new();
    let mut f = n;
    while f >= 1 {
        if n % f == 0 {
            let rest = n / f;
            for mut tail in combinations(rest, v - 1) {
                let mut row = Vec::with_capacity(v);
                row.push(f);
                row.append(&mut tail);
                out.push(row);
            }
        }
        f -= 1;
    }
    out
}

/// Enumerate every ordered tuple `(f_1, .., f_v)` of integers `>= 2` with
/// `f_1 * .. * f_v == n`.
///
/// Order matches the reference recursion: the first factor is tried from
/// `2` up to `n`, ascending, the opposite direction of [`combinations`].
pub fn combinations_v2(n: i64, v: usize) -> Vec<Vec<i64>> {
    if v == 0 {
        return if n == 1 { vec![vec![]] } else { vec![] };
    }
    if v == 1 {
        return if n >= 1 { vec![vec![n]] } else { vec![] };
    }
    let mut out = Vec::new();
    let mut f = 2;
    while f <= n {
        if n % f == 0 {
            let rest = n / f;
            for mut tail in combinations_v2(rest, v - 1) {
                let mut row = Vec::with_capacity(v);
                row.push(f);
                row.append(&mut tail);
                out.push(row);
            }
        }
        f += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinations_single_level_is_identity() {
        assert_eq!(combinations(12, 1), vec![vec![12]]);
    }

    #[test]
    fn combinations_every_tuple_multiplies_to_n() {
        for row in combinations(24, 3) {
            assert_eq!(row.len(), 3);
            assert_eq!(row.iter().product::<i64>(), 24);
            assert!(row.iter().all(|&f| f >= 1));
        }
    }

    #[test]
    fn combinations_descends_from_n_first() {
        let rows = combinations(6, 2);
        assert_eq!(rows.first(), Some(&vec![6, 1]));
        assert_eq!(rows.last(), Some(&vec![1, 6]));
    }

    #[test]
    fn combinations_v2_excludes_factor_one() {
        for row in combinations_v2(16, 2) {
            assert!(row.iter().all(|&f| f >= 2));
            assert_eq!(row.iter().product::<i64>(), 16);
        }
    }

    #[test]
    fn combinations_v2_prime_n_has_no_split_for_v_gt_1() {
        assert!(combinations_v2(7, 2).is_empty());
        assert_eq!(combinations_v2(7, 1), vec![vec![7]]);
    }

    #[test]
    fn combinations_v2_ascends_from_two_first() {
        let rows = combinations_v2(8, 2);
        assert_eq!(rows.first(), Some(&vec![2, 4]));
        assert_eq!(rows.last(), Some(&vec![4, 2]));
    }
}
