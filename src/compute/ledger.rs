//! Growable store of generated sample segments for one node.

use super::data::Data;
use super::deferred::{Deferred, TaskKey};
use super::payload::Output;
use crate::store::GraphError;
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::trace;

/// One generated segment `[start, start + n)` of a node's sample stream.
#[derive(Debug, Clone)]
pub struct OutputRecord {
    pub key: TaskKey,
    pub output: Deferred<Output>,
    data: Deferred<Data>,
}

impl OutputRecord {
    pub fn new(key: TaskKey, output: Deferred<Output>) -> Self {
        let data = output.map(None, |o| Ok(o.data));
        Self { key, output, data }
    }

    pub fn start(&self) -> usize { self.key.start }
    pub fn len(&self) -> usize { self.key.n }
    pub fn is_empty(&self) -> bool { self.key.n == 0 }
    pub fn end(&self) -> usize { self.key.start + self.key.n }

    /// The `data` field of the segment's output.
    pub fn data(&self) -> &Deferred<Data> { &self.data }
}

/// Segments are keyed by their start index and never overlap. The ledger
/// only grows: segments are neither replaced nor removed.
#[derive(Debug, Clone)]
pub struct Ledger {
    node: String,
    segments: BTreeMap<usize, OutputRecord>,
}

impl Ledger {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into(), segments: BTreeMap::new() }
    }

    /// Adds a segment. The caller guarantees it does not overlap an existing one.
    pub fn add(&mut self, record: OutputRecord) {
        debug_assert!(
            self.segments.values().all(|s| record.end() <= s.start() || s.end() <= record.start()),
            "segment {} overlaps the ledger of '{}'",
            record.key,
            self.node
        );
        self.segments.insert(record.start(), record);
    }

    /// Total number of cached samples over all segments.
    pub fn len(&self) -> usize {
        self.segments.values().map(OutputRecord::len).sum()
    }

    pub fn is_empty(&self) -> bool { self.segments.is_empty() }

    pub fn segment_count(&self) -> usize { self.segments.len() }

    /// Segments in start order.
    pub fn segments(&self) -> impl Iterator<Item = &OutputRecord> + '_ {
        self.segments.values()
    }

    /// Assembles `[start, stop)` from the segments starting inside it.
    ///
    /// The range has to line up with segment boundaries: no segment is cut.
    /// A single matching segment is returned as is, several are concatenated
    /// lazily in start order.
    pub fn fetch(&self, range: Range<usize>) -> Result<Deferred<Data>, GraphError> {
        let matched: Vec<&OutputRecord> = self.segments.range(range.clone()).map(|(_, r)| r).collect();
        trace!(node = %self.node, start = range.start, stop = range.end, segments = matched.len(), "ledger fetch");

        let (first, last) = match (matched.first(), matched.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(GraphError::EmptyRange { node: self.node.clone(), start: range.start, stop: range.end });
            }
        };

        let contiguous = matched.windows(2).all(|w| w[0].end() == w[1].start());
        if first.start() != range.start || last.end() != range.end || !contiguous {
            return Err(GraphError::MisalignedRange { node: self.node.clone(), start: range.start, stop: range.end });
        }

        if matched.len() == 1 {
            return Ok(first.data().clone());
        }

        let parts: Vec<Deferred<Data>> = matched.iter().map(|r| r.data().clone()).collect();
        Ok(Deferred::new(None, move || {
            let values = parts.iter().map(Deferred::compute).collect::<Result<Vec<_>, _>>()?;
            Data::concatenate(&values)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: usize, n: usize) -> OutputRecord {
        let rows: Vec<Vec<f64>> = (start..start + n).map(|i| vec![i as f64]).collect();
        let key = TaskKey::new("node", start, n);
        let output = Deferred::new(Some(key.clone()), move || {
            Ok(Output { data: Data::from_rows(rows)?, n, index: start, random_state: None })
        });
        OutputRecord::new(key, output)
    }

    fn filled(sizes: &[usize]) -> Ledger {
        let mut ledger = Ledger::new("node");
        let mut start = 0;
        for &n in sizes {
            ledger.add(segment(start, n));
            start += n;
        }
        ledger
    }

    #[test]
    fn test_len_sums_segments() {
        let ledger = filled(&[2, 3, 1]);
        assert_eq!(ledger.len(), 6);
        assert_eq!(ledger.segment_count(), 3);
        assert!(Ledger::new("empty").is_empty());
    }

    #[test]
    fn test_single_segment_returned_unchanged() {
        let ledger = filled(&[2, 3]);
        let fetched = ledger.fetch(2..5).unwrap();
        let stored = ledger.segments().nth(1).unwrap().data();
        assert!(fetched.ptr_eq(stored));
    }

    #[test]
    fn test_multiple_segments_concatenate_in_order() {
        let ledger = filled(&[2, 3, 1]);
        let all = ledger.fetch(0..6).unwrap().compute().unwrap();
        assert_eq!(all.to_vec_f64().unwrap(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);

        let tail = ledger.fetch(2..6).unwrap().compute().unwrap();
        assert_eq!(tail.shape(), &[4, 1]);
    }

    #[test]
    fn test_empty_range() {
        let ledger = filled(&[2]);
        let err = ledger.fetch(5..7).unwrap_err();
        assert_eq!(err, GraphError::EmptyRange { node: "node".into(), start: 5, stop: 7 });
    }

    #[test]
    fn test_partial_segment_rejected() {
        let ledger = filled(&[3, 3]);
        assert!(matches!(ledger.fetch(0..2), Err(GraphError::MisalignedRange { .. })));
        assert!(matches!(ledger.fetch(1..6), Err(GraphError::MisalignedRange { .. })));
        assert!(matches!(ledger.fetch(0..4), Err(GraphError::MisalignedRange { .. })));
    }
}
