//! Bucketed slot storage with rollback.

/// `bucket_count` parallel arrays of `size` slots each.
///
/// A slot equal to `S::default()` is empty. Writes made through
/// [`replace_logged`](Self::replace_logged) can be undone in reverse order,
/// which is how an abandoned insert puts every displaced fingerprint back.
#[derive(Debug, Clone)]
pub(crate) struct BucketTable<S> {
    buckets: Vec<Vec<S>>,
    size: u64,
}

/// Previous slot values, oldest first.
pub(crate) type UndoLog<S> = Vec<(usize, u64, S)>;

impl<S: Copy + Default + PartialEq> BucketTable<S> {
    /// Allocates a zeroed table.
    pub fn new(bucket_count: usize, size: u64) -> Self {
        Self {
            buckets: vec![vec![S::default(); size as usize]; bucket_count],
            size,
        }
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub fn get(&self, bucket: usize, slot: u64) -> S {
        self.buckets[bucket][slot as usize]
    }

    #[inline]
    pub fn is_empty(&self, bucket: usize, slot: u64) -> bool {
        self.get(bucket, slot) == S::default()
    }

    /// Overwrites a slot without logging.
    #[inline]
    pub fn set(&mut self, bucket: usize, slot: u64, value: S) {
        self.buckets[bucket][slot as usize] = value;
    }

    /// Overwrites a slot, records its previous value and returns it.
    #[inline]
    pub fn replace_logged(
        &mut self,
        bucket: usize,
        slot: u64,
        value: S,
        log: &mut UndoLog<S>,
    ) -> S {
        let previous = std::mem::replace(&mut self.buckets[bucket][slot as usize], value);
        log.push((bucket, slot, previous));
        previous
    }

    /// Restores every logged slot, newest first.
    pub fn rollback(&mut self, log: UndoLog<S>) {
        for (bucket, slot, previous) in log.into_iter().rev() {
            self.set(bucket, slot, previous);
        }
    }

    /// Number of non-empty slots.
    pub fn occupied(&self) -> usize {
        self.buckets
            .iter()
            .flatten()
            .filter(|slot| **slot != S::default())
            .count()
    }
}
