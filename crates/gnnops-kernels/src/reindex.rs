//! Node reindexing ("graph reorder")
//!
//! Compacts the node ids of a mini-batch: several id sequences, possibly
//! overlapping and with repeats, are merged into one table of unique ids in
//! first-seen order, and each sequence is rewritten as positions into that
//! table.
//!
//! # Examples
//!
//! ```
//! use gnnops_kernels::reindex;
//!
//! let out = reindex(&[&[1, 2, 3, 4], &[3, 4, 5, 6, 7]]);
//! assert_eq!(out.unique, vec![1, 2, 3, 4, 5, 6, 7]);
//! assert_eq!(out.positions, vec![vec![0, 1, 2, 3], vec![2, 3, 4, 5, 6]]);
//! ```

use rustc_hash::FxHashMap;

/// Output of [`reindex`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reindexed {
    /// Unique ids in first-seen order
    pub unique: Vec<i64>,
    /// One position list per input sequence; `unique[positions[k][i]] == sequences[k][i]`
    pub positions: Vec<Vec<usize>>,
}

impl Reindexed {
    /// Map one position list back to the original ids
    pub fn restore(&self, sequence: usize) -> Option<Vec<i64>> {
        self.positions
            .get(sequence)
            .map(|positions| positions.iter().map(|&p| self.unique[p]).collect())
    }
}

/// Incremental builder behind [`reindex`]
///
/// Sequences are pushed one at a time; every pushed id either reuses its
/// existing position or is appended to the unique table.
#[derive(Debug, Clone, Default)]
pub struct NodeReindexer {
    lookup: FxHashMap<i64, usize>,
    unique: Vec<i64>,
}

impl NodeReindexer {
    /// Create an empty reindexer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty reindexer sized for roughly `capacity` distinct ids
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lookup: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            unique: Vec::with_capacity(capacity),
        }
    }

    /// Assign positions to a sequence, extending the unique table as needed
    pub fn push(&mut self, sequence: &[i64]) -> Vec<usize> {
        sequence.iter().map(|&id| self.position_or_insert(id)).collect()
    }

    /// Position of `id` if it has been seen
    pub fn position_of(&self, id: i64) -> Option<usize> {
        self.lookup.get(&id).copied()
    }

    /// Number of distinct ids seen so far
    pub fn len(&self) -> usize {
        self.unique.len()
    }

    /// True if no id has been pushed
    pub fn is_empty(&self) -> bool {
        self.unique.is_empty()
    }

    /// Unique ids seen so far, in first-seen order
    pub fn unique(&self) -> &[i64] {
        &self.unique
    }

    /// Consume the reindexer and return the unique table
    pub fn finish(self) -> Vec<i64> {
        self.unique
    }

    fn position_or_insert(&mut self, id: i64) -> usize {
        let next = self.unique.len();
        let position = *self.lookup.entry(id).or_insert(next);
        if position == next {
            self.unique.push(id);
        }
        position
    }
}

/// Deduplicate several id sequences into one ordered unique table
///
/// Sequences are scanned in order and ids within a sequence in slot order. An
/// unseen id is appended to the table; a seen id reuses its position.
///
/// # Complexity
///
/// Time: O(total ids) expected
/// Space: O(distinct ids + total ids)
pub fn reindex(sequences: &[&[i64]]) -> Reindexed {
    let total: usize = sequences.iter().map(|s| s.len()).sum();
    let mut reindexer = NodeReindexer::with_capacity(total);

    let positions: Vec<Vec<usize>> = sequences.iter().map(|seq| reindexer.push(seq)).collect();
    tracing::trace!(
        sequences = sequences.len(),
        total,
        unique = reindexer.len(),
        "reindex"
    );

    Reindexed {
        unique: reindexer.finish(),
        positions,
    }
}
