//! Greedy packing of per-collection entries into capacity-sized chunks.

/// Entries grouped under the collection (table) they belong to.
pub type Collection<T> = (String, Vec<T>);

/// What goes into the next call and what is left for later ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPlan<T> {
    /// Entries for the next call, in collection order.
    pub batch: Vec<Collection<T>>,
    /// Everything else, in the same relative order as the input.
    pub remainder: Vec<Collection<T>>,
}

impl<T> ChunkPlan<T> {
    /// Number of entries in the batch.
    #[must_use]
    pub fn batch_len(&self) -> usize {
        outstanding(&self.batch)
    }
}

/// Pack entries into a batch of at most `capacity`, visiting collections in
/// order.
///
/// A collection that fits goes in whole. The first one that does not fit is
/// split: its head fills the batch and its tail opens the remainder. Every
/// collection after that is deferred whole, including when the capacity ran
/// out exactly on a collection boundary. Empty collections are dropped.
/// A zero capacity packs nothing.
#[must_use]
pub fn plan_chunk<T>(collections: Vec<Collection<T>>, capacity: usize) -> ChunkPlan<T> {
    let mut available = capacity;
    let mut batch = Vec::new();
    let mut remainder = Vec::new();

    for (name, mut entries) in collections {
        if entries.is_empty() {
            continue;
        }
        if available == 0 {
            remainder.push((name, entries));
        } else if entries.len() <= available {
            available -= entries.len();
            batch.push((name, entries));
        } else {
            let tail = entries.split_off(available);
            available = 0;
            remainder.push((name.clone(), tail));
            batch.push((name, entries));
        }
    }

    ChunkPlan { batch, remainder }
}

/// Total number of entries across collections.
#[must_use]
pub fn outstanding<T>(collections: &[Collection<T>]) -> usize {
    collections.iter().map(|(_, entries)| entries.len()).sum()
}

/// Put entries the store handed back ahead of the remainder.
///
/// Only neighbouring runs of the same collection are merged, so a collection
/// named again further down the remainder keeps its place.
#[must_use]
pub fn requeue<T>(handed_back: Vec<Collection<T>>, remainder: Vec<Collection<T>>) -> Vec<Collection<T>> {
    let mut merged: Vec<Collection<T>> = Vec::with_capacity(handed_back.len() + remainder.len());
    for (name, entries) in handed_back.into_iter().chain(remainder) {
        if entries.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some((last, existing)) if *last == name => existing.extend(entries),
            _ => merged.push((name, entries)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coll(name: &str, range: std::ops::Range<u32>) -> Collection<u32> {
        (name.to_owned(), range.collect())
    }

    #[test]
    fn test_should_pack_everything_when_under_capacity() {
        let plan = plan_chunk(vec![coll("a", 0..3), coll("b", 0..2)], 25);
        assert_eq!(plan.batch, vec![coll("a", 0..3), coll("b", 0..2)]);
        assert!(plan.remainder.is_empty());
    }

    #[test]
    fn test_should_split_collection_that_overflows() {
        let plan = plan_chunk(vec![coll("a", 0..10), coll("b", 0..30), coll("c", 0..4)], 25);
        assert_eq!(plan.batch, vec![coll("a", 0..10), coll("b", 0..15)]);
        assert_eq!(plan.remainder, vec![coll("b", 15..30), coll("c", 0..4)]);
        assert_eq!(plan.batch_len(), 25);
    }

    #[test]
    fn test_should_defer_next_collection_on_exact_boundary() {
        let plan = plan_chunk(vec![coll("a", 0..25), coll("b", 0..1)], 25);
        assert_eq!(plan.batch, vec![coll("a", 0..25)]);
        assert_eq!(plan.remainder, vec![coll("b", 0..1)]);
    }

    #[test]
    fn test_should_drop_empty_collections() {
        let plan = plan_chunk(vec![coll("a", 0..0), coll("b", 0..2), coll("c", 0..0)], 1);
        assert_eq!(plan.batch, vec![coll("b", 0..1)]);
        assert_eq!(plan.remainder, vec![coll("b", 1..2)]);
    }

    #[test]
    fn test_should_drain_in_ceil_steps_preserving_order() {
        let mut pending = vec![coll("a", 0..37), coll("b", 0..11), coll("c", 0..12)];
        let total = outstanding(&pending);
        let mut drained = Vec::new();
        let mut steps = 0;
        while outstanding(&pending) > 0 {
            let before = outstanding(&pending);
            let plan = plan_chunk(pending, 25);
            assert!(plan.batch_len() <= 25);
            drained.extend(plan.batch.clone());
            pending = plan.remainder;
            assert!(outstanding(&pending) < before);
            steps += 1;
        }
        assert_eq!(steps, total.div_ceil(25));
        let flattened: Vec<(String, u32)> = drained
            .into_iter()
            .flat_map(|(n, v)| v.into_iter().map(move |x| (n.clone(), x)))
            .collect();
        let expected: Vec<(String, u32)> = [coll("a", 0..37), coll("b", 0..11), coll("c", 0..12)]
            .into_iter()
            .flat_map(|(n, v)| v.into_iter().map(move |x| (n.clone(), x)))
            .collect();
        assert_eq!(flattened, expected);
    }

    #[test]
    fn test_should_requeue_handed_back_entries_first() {
        let merged = requeue(
            vec![coll("b", 5..7), coll("a", 0..1)],
            vec![coll("b", 7..9), coll("c", 0..1)],
        );
        assert_eq!(
            merged,
            vec![coll("b", 5..7), coll("a", 0..1), coll("b", 7..9), coll("c", 0..1)]
        );

        let merged = requeue(vec![coll("b", 5..7)], vec![coll("b", 7..9), coll("c", 0..1)]);
        assert_eq!(merged, vec![coll("b", 5..9), coll("c", 0..1)]);
    }

    #[test]
    fn test_should_keep_later_run_of_same_collection_in_place() {
        let remainder = vec![coll("t", 10..12), coll("u", 0..5), coll("t", 200..205)];
        assert_eq!(requeue(Vec::new(), remainder.clone()), remainder);

        let merged = requeue(
            vec![coll("u", 0..1)],
            vec![coll("t", 10..12), coll("u", 1..5), coll("t", 200..205)],
        );
        assert_eq!(
            merged,
            vec![coll("u", 0..1), coll("t", 10..12), coll("u", 1..5), coll("t", 200..205)]
        );
    }

    #[test]
    fn test_should_pack_nothing_with_zero_capacity() {
        let plan = plan_chunk(vec![coll("a", 0..2)], 0);
        assert!(plan.batch.is_empty());
        assert_eq!(plan.remainder, vec![coll("a", 0..2)]);
    }
}
