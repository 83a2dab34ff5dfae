//! Neighbor sampling over an in-memory typed adjacency table
//!
//! Sampling results come back in sparse COO form: entry `i` of
//! [`SparseNeighbors`] sits at `indices[i] = [row, col]`, where `row` is the
//! position of the query node and `col` the slot within that node's samples.
//! This is the layout a sparse embedding lookup consumes directly.
//!
//! # Examples
//!
//! ```
//! use gnnops_kernels::neighbor::{topk_neighbor, NeighborTable};
//!
//! let table = NeighborTable::from_edges(&[
//!     (1, 2, 0.5, 0),
//!     (1, 3, 2.0, 0),
//!     (1, 4, 1.0, 1),
//! ]);
//!
//! let top = topk_neighbor(&table, &[1], &[0], 1);
//! assert_eq!(top.neighbors, vec![3]);
//! assert_eq!(top.indices, vec![[0, 0]]);
//! ```

use rustc_hash::FxHashMap;
use scirs2_core::random::Rng;

/// Edge type reported for default-filled samples
pub const DEFAULT_EDGE_TYPE: i32 = -1;

/// One outgoing edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Destination node id
    pub id: i64,
    /// Sampling weight; non-positive weights are only drawn as a fallback
    pub weight: f32,
    /// User-defined edge type
    pub edge_type: i32,
}

/// Outgoing typed, weighted adjacency keyed by node id
#[derive(Debug, Clone, Default)]
pub struct NeighborTable {
    adjacency: FxHashMap<i64, Vec<Neighbor>>,
    num_edges: usize,
}

impl NeighborTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(src, dst, weight, edge_type)` tuples
    pub fn from_edges(edges: &[(i64, i64, f32, i32)]) -> Self {
        let mut table = Self::new();
        for &(src, dst, weight, edge_type) in edges {
            table.add_edge(src, dst, weight, edge_type);
        }
        table
    }

    /// Append a directed edge `src -> dst`; duplicates are kept
    pub fn add_edge(&mut self, src: i64, dst: i64, weight: f32, edge_type: i32) {
        self.adjacency.entry(src).or_default().push(Neighbor {
            id: dst,
            weight,
            edge_type,
        });
        self.num_edges += 1;
    }

    /// Outgoing neighbors of `node` whose type is in `edge_types`
    ///
    /// An empty `edge_types` slice matches every type.
    pub fn neighbors(&self, node: i64, edge_types: &[i32]) -> Vec<Neighbor> {
        self.adjacency
            .get(&node)
            .map(|list| {
                list.iter()
                    .filter(|n| edge_types.is_empty() || edge_types.contains(&n.edge_type))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of nodes with at least one outgoing edge
    pub fn num_nodes(&self) -> usize {
        self.adjacency.len()
    }

    /// Total number of edges added
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }
}

/// Sparse (COO) neighbor result
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseNeighbors {
    /// `[row, col]` per entry
    pub indices: Vec<[usize; 2]>,
    /// Neighbor node id per entry
    pub neighbors: Vec<i64>,
    /// Edge weight per entry
    pub weights: Vec<f32>,
    /// Edge type per entry
    pub types: Vec<i32>,
}

impl SparseNeighbors {
    fn push(&mut self, row: usize, col: usize, neighbor: &Neighbor) {
        self.indices.push([row, col]);
        self.neighbors.push(neighbor.id);
        self.weights.push(neighbor.weight);
        self.types.push(neighbor.edge_type);
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// True when no entry was produced
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

/// Draw `count` neighbors per node, with replacement, proportional to edge weight
///
/// Non-positive weights are never drawn unless every candidate is
/// non-positive, in which case candidates are drawn uniformly. A node without
/// a matching neighbor yields `count` entries of `default_node` with weight 0
/// and type [`DEFAULT_EDGE_TYPE`].
pub fn sample_neighbor<R>(
    table: &NeighborTable,
    nodes: &[i64],
    edge_types: &[i32],
    count: usize,
    default_node: i64,
    rng: &mut R,
) -> SparseNeighbors
where
    R: Rng,
{
    let mut out = SparseNeighbors::default();
    let filler = Neighbor {
        id: default_node,
        weight: 0.0,
        edge_type: DEFAULT_EDGE_TYPE,
    };

    for (row, &node) in nodes.iter().enumerate() {
        let candidates = table.neighbors(node, edge_types);
        if candidates.is_empty() {
            for col in 0..count {
                out.push(row, col, &filler);
            }
            continue;
        }

        let mut cumulative = Vec::with_capacity(candidates.len());
        let mut total = 0.0_f64;
        for n in &candidates {
            total += f64::from(n.weight.max(0.0));
            cumulative.push(total);
        }

        for col in 0..count {
            let pick = if total > 0.0 {
                let u = rng.random::<f64>() * total;
                cumulative
                    .partition_point(|&c| c <= u)
                    .min(candidates.len() - 1)
            } else {
                rng.random_range(0..candidates.len())
            };
            out.push(row, col, &candidates[pick]);
        }
    }

    tracing::trace!(nodes = nodes.len(), count, sampled = out.len(), "sample_neighbor");
    out
}

/// Up to `k` heaviest neighbors per node, ties broken by ascending id
///
/// Nodes without matching neighbors contribute no entries.
pub fn topk_neighbor(
    table: &NeighborTable,
    nodes: &[i64],
    edge_types: &[i32],
    k: usize,
) -> SparseNeighbors {
    let mut out = SparseNeighbors::default();

    for (row, &node) in nodes.iter().enumerate() {
        let mut candidates = table.neighbors(node, edge_types);
        candidates.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.id.cmp(&b.id)));
        for (col, n) in candidates.iter().take(k).enumerate() {
            out.push(row, col, n);
        }
    }

    out
}
