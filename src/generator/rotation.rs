//! Round-robin building blocks.
//!
//! # Reference
//! Berger (1899) circle method; de Werra (1981), "Scheduling in sports",
//! Annals of Discrete Mathematics 11.

/// Circle-method single round robin over `n` slots (`n` even).
///
/// Returns `n - 1` rounds of `n / 2` pairs; every unordered pair appears in
/// exactly one round. Pairs are `(smaller, larger)`. Slot `n - 1` is the
/// fixed pivot.
pub fn circle_rounds(n: usize) -> Vec<Vec<(usize, usize)>> {
    if n < 2 {
        return Vec::new();
    }
    let m = n - 1;
    (0..m)
        .map(|r| {
            let mut pairs = Vec::with_capacity(n / 2);
            pairs.push((r, m));
            for k in 1..n / 2 {
                let a = (r + k) % m;
                let b = (r + m - k) % m;
                pairs.push((a.min(b), a.max(b)));
            }
            pairs
        })
        .collect()
}

/// Rank pairing of Latin-square round `k` between two groups of size `s`:
/// rank `i` meets rank `(i + k) mod s`.
pub fn latin_pairs(s: usize, k: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..s).map(move |i| (i, (i + k) % s))
}

/// Parity venue rule: the first side hosts when `i + j + year` is even.
#[inline]
pub fn first_hosts(i: usize, j: usize, year: u16) -> bool {
    (i + j + usize::from(year)) % 2 == 0
}

/// Orients a graph in which every vertex has even degree so that each
/// vertex hosts exactly half of its edges.
///
/// Walks closed trails over unused edges and orients each edge in walking
/// direction. Output is aligned with `edges` as `(from, to)`.
///
/// # Reference
/// Hierholzer (1873); balanced orientation via Euler circuits.
pub fn balanced_orientation(nodes: usize, edges: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut adjacency: Vec<Vec<(usize, usize)>> = vec![Vec::new(); nodes];
    for (e, &(a, b)) in edges.iter().enumerate() {
        adjacency[a].push((b, e));
        adjacency[b].push((a, e));
    }
    let mut used = vec![false; edges.len()];
    let mut oriented = edges.to_vec();

    for start in 0..nodes {
        loop {
            let mut current = start;
            let mut moved = false;
            loop {
                let step = adjacency[current].iter().copied().find(|&(_, e)| !used[e]);
                let Some((next, e)) = step else {
                    break;
                };
                used[e] = true;
                oriented[e] = (current, next);
                current = next;
                moved = true;
            }
            if !moved {
                break;
            }
        }
    }
    oriented
}
