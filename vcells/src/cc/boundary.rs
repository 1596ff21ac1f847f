//! Boundary extraction: given the set of triangles a half-space clip just
//! removed, recover the cyclic boundary of the hole they leave behind.
//!
//! The boundary of a set of removed triangles is exactly the set of
//! directed edges that occur in only one of them — a shared edge between
//! two removed triangles appears once in each triangle's orientation, as
//! `(a,b)` in one and `(b,a)` in the other, and cancels. This module
//! computes that cancellation directly (collect all `3r` directed edges,
//! drop every edge whose reverse is also present) rather than the
//! incremental swap-window retry loop described for a SIMT-kernel
//! implementation: both compute the same invariant, and this version is
//! easier to verify at the cost of O(r) scratch instead of zero allocation
//! (acceptable for host/worker-pool code). See DESIGN.md for the full
//! rationale and a hand-verified trace against a worked example.

use std::collections::HashSet;

use crate::ids::PlaneId;

#[derive(Debug, PartialEq, Eq)]
pub struct Unreachable;

/// Computes the boundary cycle of the triangles in `removed`, writing the
/// successor map into `cycle` (indexed by plane id, must be at least
/// `p_max` long and pre-filled with `PlaneId::INVALID` by the caller) and
/// returning a plane id on the cycle (`head`).
pub fn compute(
    removed: &[(PlaneId, PlaneId, PlaneId)],
    cycle: &mut [PlaneId],
) -> Result<PlaneId, Unreachable> {
    if removed.is_empty() {
        return Err(Unreachable);
    }

    let mut edges: HashSet<(u8, u8)> = HashSet::with_capacity(removed.len() * 3);
    for &(t0, t1, t2) in removed {
        edges.insert((t0.0, t1.0));
        edges.insert((t1.0, t2.0));
        edges.insert((t2.0, t0.0));
    }

    let mut boundary_edges: Vec<(u8, u8)> = Vec::new();
    for &(a, b) in &edges {
        if !edges.contains(&(b, a)) {
            boundary_edges.push((a, b));
        }
    }

    if boundary_edges.is_empty() {
        return Err(Unreachable);
    }

    let mut head = None;
    for &(a, b) in &boundary_edges {
        let idx = a as usize;
        if idx >= cycle.len() || cycle[idx] != PlaneId::INVALID {
            // a duplicate successor means the removed-triangle set is not a
            // consistent, orientable boundary (inconsistent winding or a
            // genuinely non-manifold cut).
            return Err(Unreachable);
        }
        cycle[idx] = PlaneId(b);
        if head.is_none() {
            head = Some(PlaneId(a));
        }
    }

    let head = head.ok_or(Unreachable)?;

    // Validate: walking from head for boundary_edges.len() steps must
    // return to head, visiting every surviving edge exactly once.
    let mut cur = head;
    for _ in 0..boundary_edges.len() {
        let next = cycle[cur.as_usize()];
        if !next.is_valid() {
            return Err(Unreachable);
        }
        cur = next;
    }
    if cur != head {
        return Err(Unreachable);
    }

    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: u8) -> PlaneId {
        PlaneId(id)
    }

    #[test]
    fn four_triangle_removal_recovers_expected_cycle() {
        let removed = vec![(p(2), p(5), p(0)), (p(5), p(3), p(0)), (p(1), p(5), p(2)), (p(5), p(1), p(3))];
        let mut cycle = vec![PlaneId::INVALID; 8];
        let head = compute(&removed, &mut cycle).expect("boundary should resolve");

        // Expected cycle (up to rotation): 0->2, 2->1, 1->3, 3->0
        let mut seq = vec![head];
        let mut cur = head;
        for _ in 0..3 {
            cur = cycle[cur.as_usize()];
            seq.push(cur);
        }
        assert_eq!(cycle[cur.as_usize()], head, "cycle must close");

        let expected: std::collections::HashMap<u8, u8> =
            [(0u8, 2u8), (2, 1), (1, 3), (3, 0)].into_iter().collect();
        let mut c = head;
        for _ in 0..4 {
            let n = cycle[c.as_usize()];
            assert_eq!(expected[&c.0], n.0);
            c = n;
        }
    }

    #[test]
    fn four_triangle_removal_is_order_independent() {
        use itertools_like_permutations::permutations4;
        let base = [
            (p(2), p(5), p(0)),
            (p(5), p(3), p(0)),
            (p(1), p(5), p(2)),
            (p(5), p(1), p(3)),
        ];
        for perm in permutations4(base) {
            let mut cycle = vec![PlaneId::INVALID; 8];
            let head = compute(&perm, &mut cycle).expect("boundary should resolve");
            let expected: std::collections::HashMap<u8, u8> =
                [(0u8, 2u8), (2, 1), (1, 3), (3, 0)].into_iter().collect();
            let mut c = head;
            for _ in 0..4 {
                let n = cycle[c.as_usize()];
                assert_eq!(expected[&c.0], n.0);
                c = n;
            }
        }
    }

    /// Minimal local permutation generator for a 4-element array, avoiding a
    /// dependency on the `itertools` crate for a single test helper.
    mod itertools_like_permutations {
        pub fn permutations4<T: Copy>(items: [T; 4]) -> Vec<[T; 4]> {
            let mut indices = [0usize, 1, 2, 3];
            let mut result = Vec::new();
            permute(&mut indices, 0, &mut result);
            result
                .into_iter()
                .map(|idx| [items[idx[0]], items[idx[1]], items[idx[2]], items[idx[3]]])
                .collect()
        }

        fn permute(arr: &mut [usize; 4], k: usize, out: &mut Vec<[usize; 4]>) {
            if k == arr.len() {
                out.push(*arr);
                return;
            }
            for i in k..arr.len() {
                arr.swap(k, i);
                permute(arr, k + 1, out);
                arr.swap(k, i);
            }
        }
    }

    #[test]
    fn empty_input_is_unreachable() {
        let mut cycle = vec![PlaneId::INVALID; 8];
        assert_eq!(compute(&[], &mut cycle), Err(Unreachable));
    }

    /// Builds a "fan" of triangles `(v_i, v_{i+1}, apex)` around an
    /// arbitrary boundary cycle `v_0..v_{m-1}` and an apex plane outside it
    /// (the same shape the per-point stitch step produces). The internal
    /// `(v, apex)`/`(apex, v)` edges cancel pairwise regardless of input
    /// order, so the recovered boundary must be exactly the input cycle
    /// (up to rotation), of length `m`, for every permutation of the
    /// triangle list.
    #[test]
    fn fan_triangulation_recovers_input_cycle_for_any_order() {
        for &m in &[3usize, 4, 5, 7, 10] {
            let apex = m as u8;
            let rim: Vec<u8> = (0..m as u8).collect();
            let mut triangles: Vec<(PlaneId, PlaneId, PlaneId)> = (0..m)
                .map(|i| {
                    let a = rim[i];
                    let b = rim[(i + 1) % m];
                    (p(a), p(b), p(apex))
                })
                .collect();

            // Exercise a handful of input orderings, not just identity.
            for shift in 0..m {
                triangles.rotate_left(1);
                let _ = shift;
                let mut cycle = vec![PlaneId::INVALID; (m + 1).max(8)];
                let head = compute(&triangles, &mut cycle).expect("fan boundary should resolve");

                let mut seen = std::collections::HashSet::new();
                let mut cur = head;
                let mut len = 0;
                loop {
                    assert!(seen.insert(cur), "cycle revisited a node before closing, m={m}");
                    len += 1;
                    cur = cycle[cur.as_usize()];
                    if cur == head {
                        break;
                    }
                    assert!(len <= m, "cycle longer than expected rim, m={m}");
                }
                assert_eq!(len, m, "boundary cycle length must equal rim size, m={m}");
                assert!(!seen.contains(&p(apex)), "apex must not appear on the boundary, m={m}");
                for &r in &rim {
                    assert!(seen.contains(&p(r)), "rim plane {r} missing from boundary, m={m}");
                }
            }
        }
    }
}
