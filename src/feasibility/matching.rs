//! Maximum bipartite matching.
//!
//! # Algorithm
//! Kuhn's augmenting paths: for every left vertex, search depth-first for a
//! path that ends at a free right vertex, flipping matched edges on the way.
//!
//! # Complexity
//! O(V × E).
//!
//! # Reference
//! Kuhn (1955), "The Hungarian method for the assignment problem"

/// Result of [`max_matching`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matching {
    /// Right vertex matched to each left vertex.
    pub left: Vec<Option<usize>>,
    pub size: usize,
}

impl Matching {
    /// Left vertices without a partner.
    pub fn unmatched(&self) -> Vec<usize> {
        self.left
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_none())
            .map(|(l, _)| l)
            .collect()
    }
}

/// Maximum matching of a bipartite graph given as left adjacency lists.
pub fn max_matching(adjacency: &[Vec<usize>], right_count: usize) -> Matching {
    let mut right: Vec<Option<usize>> = vec![None; right_count];
    let mut size = 0;
    for l in 0..adjacency.len() {
        let mut seen = vec![false; right_count];
        if augment(l, adjacency, &mut right, &mut seen) {
            size += 1;
        }
    }

    let mut left = vec![None; adjacency.len()];
    for (r, l) in right.iter().enumerate() {
        if let Some(l) = *l {
            left[l] = Some(r);
        }
    }
    Matching { left, size }
}

fn augment(
    l: usize,
    adjacency: &[Vec<usize>],
    right: &mut [Option<usize>],
    seen: &mut [bool],
) -> bool {
    for &r in &adjacency[l] {
        if r >= right.len() || seen[r] {
            continue;
        }
        seen[r] = true;
        let free = match right[r] {
            None => true,
            Some(other) => augment(other, adjacency, right, seen),
        };
        if free {
            right[r] = Some(l);
            return true;
        }
    }
    false
}
