//! Session result storage.
//!
//! A [`ResultStore`] is written by the session's background worker and read by
//! the foreground selector. Matches live in fixed-size chunks: full chunks are
//! sealed and shared, and only the open tail chunk is ever written. Writers
//! hold the lock for a hash lookup and a push; readers take a [`Snapshot`] by
//! cloning two `Arc`s, so neither side waits on the other for longer than that.

use std::collections::HashSet;
use std::ops::Index;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::search::{Match, MatchKey};

/// Matches per sealed chunk.
const CHUNK_LEN: usize = 256;

type Chunk = Arc<[Arc<Match>]>;

#[derive(Debug, Default)]
struct StoreInner {
    sealed: Arc<Vec<Chunk>>,
    tail: Arc<Vec<Arc<Match>>>,
    index: HashSet<MatchKey>,
    collapse_adjacent: bool,
    /// File and line of the last match offered, kept or not.
    last_offered: Option<(PathBuf, usize)>,
}

impl StoreInner {
    fn len(&self) -> usize {
        self.sealed.len() * CHUNK_LEN + self.tail.len()
    }

    fn append(&mut self, m: Arc<Match>) {
        // Copies at most one chunk when a reader still holds the tail.
        Arc::make_mut(&mut self.tail).push(m);
        if self.tail.len() == CHUNK_LEN {
            let full = std::mem::take(&mut self.tail);
            let chunk: Chunk = Arc::unwrap_or_clone(full).into();
            Arc::make_mut(&mut self.sealed).push(chunk);
        }
    }
}

/// Point-in-time view of a store's matches in arrival order.
///
/// Later pushes to the store never show up in an existing snapshot.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    sealed: Arc<Vec<Chunk>>,
    tail: Arc<Vec<Arc<Match>>>,
}

impl Snapshot {
    #[must_use]
    pub fn len(&self) -> usize {
        self.sealed.len() * CHUNK_LEN + self.tail.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<Match>> {
        match self.sealed.get(index / CHUNK_LEN) {
            Some(chunk) => chunk.get(index % CHUNK_LEN),
            None => self.tail.get(index - self.sealed.len() * CHUNK_LEN),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Match>> {
        self.sealed
            .iter()
            .flat_map(|chunk| chunk.iter())
            .chain(self.tail.iter())
    }

    /// Matches after the first `offset` ones.
    pub fn iter_from(&self, offset: usize) -> impl Iterator<Item = &Arc<Match>> {
        let first_chunk = (offset / CHUNK_LEN).min(self.sealed.len());
        self.sealed[first_chunk..]
            .iter()
            .flat_map(|chunk| chunk.iter())
            .chain(self.tail.iter())
            .skip(offset - first_chunk * CHUNK_LEN)
    }
}

impl Index<usize> for Snapshot {
    type Output = Arc<Match>;

    fn index(&self, index: usize) -> &Self::Output {
        match self.get(index) {
            Some(m) => m,
            None => panic!("snapshot index {index} out of range for length {}", self.len()),
        }
    }
}

/// Ordered, de-duplicated matches of one search session.
#[derive(Debug, Clone)]
pub struct ResultStore {
    inner: Arc<Mutex<StoreInner>>,
    len_tx: Arc<watch::Sender<usize>>,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultStore {
    #[must_use]
    pub fn new() -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(Mutex::new(StoreInner::default())),
            len_tx: Arc::new(len_tx),
        }
    }

    /// A store that drops matches on the line right after the previous match
    /// in the same file, so multi-line hits show up once.
    #[must_use]
    pub fn collapsing_adjacent() -> Self {
        let store = Self::new();
        store.lock().collapse_adjacent = true;
        store
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a match unless its identity is already present.
    ///
    /// Returns `true` when the match was stored.
    pub fn push(&self, m: Match) -> bool {
        let len = {
            let mut inner = self.lock();

            let previous = inner.last_offered.replace((m.file_path.clone(), m.line));
            if inner.collapse_adjacent
                && let Some((file, line)) = previous
                && file == m.file_path
                && line.checked_add(1) == Some(m.line)
            {
                return false;
            }

            if !inner.index.insert(m.key()) {
                return false;
            }
            inner.append(Arc::new(m));
            inner.len()
        };
        self.len_tx.send_replace(len);
        true
    }

    /// Append every match in order, returning how many were stored.
    pub fn extend(&self, matches: impl IntoIterator<Item = Match>) -> usize {
        matches
            .into_iter()
            .map(|m| self.push(m))
            .filter(|&stored| stored)
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current matches in arrival order.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            sealed: Arc::clone(&inner.sealed),
            tail: Arc::clone(&inner.tail),
        }
    }

    /// Matches stored after the first `offset` ones.
    #[must_use]
    pub fn since(&self, offset: usize) -> Vec<Arc<Match>> {
        self.snapshot().iter_from(offset).cloned().collect()
    }

    /// Owned copy of every match, used for the full results view.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Match> {
        self.snapshot().iter().map(|m| Match::clone(m)).collect()
    }

    /// Receiver that observes the number of stored matches.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.len_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(file: &str, line: usize, column: Option<usize>, text: &str) -> Match {
        Match {
            file_path: PathBuf::from(file),
            line,
            column,
            match_text: text.to_string(),
            line_text: format!("line {line}"),
        }
    }

    #[test]
    fn duplicates_are_suppressed_in_first_seen_order() {
        let store = ResultStore::new();
        let input = [
            hit("b.rs", 2, Some(1), "x"),
            hit("a.rs", 1, Some(1), "x"),
            hit("b.rs", 2, Some(1), "x"),
            hit("a.rs", 1, Some(4), "x"),
            hit("a.rs", 1, Some(1), "x"),
        ];
        assert_eq!(store.extend(input), 3);

        let order: Vec<(String, Option<usize>)> = store
            .snapshot()
            .iter()
            .map(|m| (m.file_path.display().to_string(), m.column))
            .collect();
        assert_eq!(
            order,
            [
                ("b.rs".to_string(), Some(1)),
                ("a.rs".to_string(), Some(1)),
                ("a.rs".to_string(), Some(4)),
            ]
        );
    }

    #[test]
    fn line_text_does_not_affect_identity() {
        let store = ResultStore::new();
        let mut second = hit("a.rs", 1, None, "");
        second.line_text = "changed".to_string();
        assert!(store.push(hit("a.rs", 1, None, "")));
        assert!(!store.push(second));
    }

    #[test]
    fn since_returns_only_new_items() {
        let store = ResultStore::new();
        store.push(hit("a", 1, None, ""));
        store.push(hit("a", 2, None, ""));
        store.push(hit("a", 3, None, ""));
        let tail = store.since(2);
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].line, 3);
        assert!(store.since(10).is_empty());
    }

    #[test]
    fn snapshot_is_stable_while_writing() {
        let store = ResultStore::new();
        store.push(hit("a", 1, None, ""));
        let snapshot = store.snapshot();
        store.push(hit("a", 2, None, ""));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn subscribers_see_growth() {
        let store = ResultStore::new();
        let rx = store.subscribe();
        store.push(hit("a", 1, None, ""));
        store.push(hit("a", 1, None, ""));
        assert_eq!(*rx.borrow(), 1);
    }

    #[test]
    fn collapse_adjacent_keeps_first_of_a_run() {
        let store = ResultStore::collapsing_adjacent();
        store.extend([
            hit("a", 10, None, ""),
            hit("a", 11, None, ""),
            hit("a", 12, None, ""),
            hit("b", 13, None, ""),
            hit("a", 20, None, ""),
        ]);
        let lines: Vec<usize> = store.snapshot().iter().map(|m| m.line).collect();
        assert_eq!(lines, [10, 13, 20]);
    }

    #[test]
    fn collapse_adjacent_at_the_last_line_number() {
        let store = ResultStore::collapsing_adjacent();
        assert!(store.push(hit("a", usize::MAX, None, "x")));
        assert!(!store.push(hit("a", usize::MAX, None, "x")));
        assert!(store.push(hit("a", 1, None, "x")));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn snapshots_span_sealed_chunks() {
        let store = ResultStore::new();
        let total = CHUNK_LEN * 2 + 7;
        for line in 1..=total {
            store.push(hit("a", line, None, ""));
        }
        let early = store.snapshot();
        store.push(hit("b", 1, None, ""));

        assert_eq!(early.len(), total);
        assert_eq!(early[0].line, 1);
        assert_eq!(early[CHUNK_LEN].line, CHUNK_LEN + 1);
        assert_eq!(early[total - 1].line, total);
        assert!(early.get(total).is_none());
        assert_eq!(early.iter().count(), total);

        let lines: Vec<usize> = early.iter().map(|m| m.line).collect();
        assert_eq!(lines, (1..=total).collect::<Vec<_>>());

        let tail = store.since(CHUNK_LEN + 3);
        assert_eq!(tail.len(), total + 1 - (CHUNK_LEN + 3));
        assert_eq!(tail[0].line, CHUNK_LEN + 4);
        assert_eq!(tail.last().map(|m| m.file_path.clone()), Some(PathBuf::from("b")));
        assert!(store.since(total + 5).is_empty());
    }

    #[test]
    fn held_snapshot_does_not_see_sealing() {
        let store = ResultStore::new();
        for line in 1..CHUNK_LEN {
            store.push(hit("a", line, None, ""));
        }
        let held = store.snapshot();
        store.push(hit("a", CHUNK_LEN, None, ""));
        store.push(hit("a", CHUNK_LEN + 1, None, ""));
        assert_eq!(held.len(), CHUNK_LEN - 1);
        assert_eq!(store.snapshot().len(), CHUNK_LEN + 1);
    }

    #[test]
    fn concurrent_writer_and_reader() {
        let store = ResultStore::new();
        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for line in 1..=500 {
                    store.push(hit("a", line, None, ""));
                }
            })
        };
        let mut last = 0;
        while !writer.is_finished() {
            let now = store.snapshot().len();
            assert!(now >= last);
            last = now;
        }
        writer.join().unwrap();
        assert_eq!(store.len(), 500);
    }
}
