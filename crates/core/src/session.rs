//! Continuation state for "give me another option" follow-ups
//!
//! A session holds at most one `CandidateList`: the ordered results of the
//! last recommendation search plus a cursor. Advancing moves the cursor
//! forward and saturates at the end of the list; it never wraps, reorders or
//! refetches. A new search key replaces the list.
//!
//! The state round-trips through the platform's opaque session attribute bag
//! under a single key.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SessionError;

/// Opaque per-session key-value bag owned by the voice platform
pub type SessionAttributes = Map<String, Value>;

/// Attribute key the continuation is stored under
pub const CONTINUATION_KEY: &str = "continuation";

// ============================================================================
// Candidate list
// ============================================================================

/// Ordered results of one search with a forward-only cursor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateList<T> {
    search_key: String,
    items: Vec<T>,
    index: usize,
}

/// Outcome of an advance request
#[derive(Debug, PartialEq)]
pub enum Advance<'a, T> {
    /// The cursor moved to `index`, which holds `item`.
    Next { index: usize, item: &'a T },
    /// No further candidates; the cursor stays at the end.
    Exhausted,
    /// There is no candidate list to advance.
    Empty,
}

/// Observable state of a session's continuation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationState {
    Empty,
    HasCandidates { index: usize, len: usize },
    Exhausted,
}

impl<T> CandidateList<T> {
    pub fn new(search_key: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            search_key: search_key.into(),
            items,
            index: 0,
        }
    }

    pub fn search_key(&self) -> &str {
        &self.search_key
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.items.len()
    }

    /// Candidate under the cursor, `None` once exhausted
    pub fn current(&self) -> Option<&T> {
        self.items.get(self.index)
    }

    /// Move to the next candidate. Past the last one the cursor parks at
    /// `len()` and every further call reports `Exhausted`.
    pub fn advance(&mut self) -> Advance<'_, T> {
        if self.index + 1 < self.items.len() {
            self.index += 1;
            Advance::Next {
                index: self.index,
                item: &self.items[self.index],
            }
        } else {
            self.index = self.items.len();
            Advance::Exhausted
        }
    }

    pub fn state(&self) -> ContinuationState {
        if self.is_exhausted() {
            ContinuationState::Exhausted
        } else {
            ContinuationState::HasCandidates {
                index: self.index,
                len: self.items.len(),
            }
        }
    }

    fn matches_key(&self, search_key: &str) -> bool {
        self.search_key.trim().eq_ignore_ascii_case(search_key.trim())
    }
}

// ============================================================================
// Continuation
// ============================================================================

/// Session-scoped continuation: empty, or holding one candidate list
#[derive(Debug, Clone, PartialEq)]
pub struct Continuation<T> {
    list: Option<CandidateList<T>>,
}

impl<T> Default for Continuation<T> {
    fn default() -> Self {
        Self { list: None }
    }
}

impl<T> Continuation<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Option<&CandidateList<T>> {
        self.list.as_ref()
    }

    pub fn current(&self) -> Option<&T> {
        self.list.as_ref().and_then(CandidateList::current)
    }

    pub fn state(&self) -> ContinuationState {
        match self.list {
            Some(ref list) => list.state(),
            None => ContinuationState::Empty,
        }
    }

    /// Discard any stored list and start a new one at index 0
    pub fn reset(&mut self, search_key: impl Into<String>, items: Vec<T>) -> &CandidateList<T> {
        self.list.insert(CandidateList::new(search_key, items))
    }

    /// Keep the stored list when it was produced by the same search key,
    /// otherwise fetch and store a fresh one.
    pub fn start_or_keep<F>(&mut self, search_key: &str, fetch: F) -> &CandidateList<T>
    where
        F: FnOnce() -> Vec<T>,
    {
        let list = match self.list.take() {
            Some(list) if list.matches_key(search_key) => list,
            _ => {
                tracing::debug!(search_key = %search_key, "starting new candidate list");
                CandidateList::new(search_key, fetch())
            }
        };
        self.list.insert(list)
    }

    pub fn advance(&mut self) -> Advance<'_, T> {
        match self.list {
            Some(ref mut list) => list.advance(),
            None => Advance::Empty,
        }
    }

    pub fn clear(&mut self) {
        self.list = None;
    }
}

impl<T: Serialize + DeserializeOwned> Continuation<T> {
    /// Read the continuation from session attributes; a missing key is
    /// `Empty`, a value of the wrong shape is an error.
    pub fn load(attributes: &SessionAttributes) -> Result<Self, SessionError> {
        let value = match attributes.get(CONTINUATION_KEY) {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(v) => v.clone(),
        };

        let list: CandidateList<T> =
            serde_json::from_value(value).map_err(|e| SessionError::Malformed(e.to_string()))?;

        if list.index > list.items.len() {
            return Err(SessionError::Malformed(format!(
                "index {} beyond list of {}",
                list.index,
                list.items.len()
            )));
        }

        Ok(Self { list: Some(list) })
    }

    /// Write the continuation into session attributes
    pub fn store(&self, attributes: &mut SessionAttributes) -> Result<(), SessionError> {
        match self.list {
            Some(ref list) => {
                let value = serde_json::to_value(list).map_err(SessionError::Serialize)?;
                attributes.insert(CONTINUATION_KEY.to_string(), value);
            }
            None => {
                attributes.remove(CONTINUATION_KEY);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Candidate;

    #[test]
    fn test_two_item_scenario() {
        let mut cont = Continuation::new();
        cont.reset("curry", vec!["A", "B"]);
        assert_eq!(cont.state(), ContinuationState::HasCandidates { index: 0, len: 2 });
        assert_eq!(cont.current(), Some(&"A"));

        assert_eq!(cont.advance(), Advance::Next { index: 1, item: &"B" });
        assert_eq!(cont.current(), Some(&"B"));

        assert_eq!(cont.advance(), Advance::Exhausted);
        assert_eq!(cont.state(), ContinuationState::Exhausted);

        let before = cont.clone();
        assert_eq!(cont.advance(), Advance::Exhausted);
        assert_eq!(cont, before);
        assert_eq!(cont.list().unwrap().index(), 2);
    }

    #[test]
    fn test_advance_n_times_is_monotonic() {
        let n = 5;
        let mut list = CandidateList::new("pizza", (0..n).collect::<Vec<_>>());
        let mut seen = vec![list.index()];
        for _ in 0..n {
            if let Advance::Next { index, item } = list.advance() {
                assert_eq!(index, *item);
                seen.push(index);
            }
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert!(list.is_exhausted());
        assert_eq!(list.items(), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_continuation_reports_empty() {
        let mut cont: Continuation<String> = Continuation::new();
        assert_eq!(cont.state(), ContinuationState::Empty);
        assert_eq!(cont.advance(), Advance::Empty);
        assert!(cont.list().is_none());
    }

    #[test]
    fn test_empty_candidate_list_is_exhausted() {
        let mut cont: Continuation<u8> = Continuation::new();
        cont.reset("nothing", Vec::new());
        assert_eq!(cont.state(), ContinuationState::Exhausted);
        assert_eq!(cont.advance(), Advance::Exhausted);
    }

    #[test]
    fn test_new_search_key_replaces_list() {
        let mut cont = Continuation::new();
        cont.reset("tacos", vec![1, 2, 3]);
        cont.advance();

        let list = cont.start_or_keep("Tacos ", || panic!("same key must not refetch"));
        assert_eq!(list.index(), 1);

        let list = cont.start_or_keep("ramen", || vec![9, 8]);
        assert_eq!(list.search_key(), "ramen");
        assert_eq!(list.index(), 0);
        assert_eq!(cont.current(), Some(&9));
    }

    #[test]
    fn test_attributes_roundtrip_and_clear() {
        let mut attributes = SessionAttributes::new();
        attributes.insert("other".to_string(), Value::from(1));

        let mut cont = Continuation::new();
        cont.reset(
            "italian",
            vec![
                Candidate::Restaurant {
                    name: "Luigi's".to_string(),
                    address: None,
                    rating: None,
                },
                Candidate::Restaurant {
                    name: "Roma".to_string(),
                    address: None,
                    rating: Some(4.0),
                },
            ],
        );
        cont.advance();
        cont.store(&mut attributes).unwrap();

        let loaded: Continuation<Candidate> = Continuation::load(&attributes).unwrap();
        assert_eq!(loaded, cont);
        assert_eq!(loaded.current().map(Candidate::title), Some("Roma"));

        cont.clear();
        cont.store(&mut attributes).unwrap();
        assert!(!attributes.contains_key(CONTINUATION_KEY));
        assert_eq!(attributes["other"], 1);
    }

    #[test]
    fn test_missing_attributes_load_empty() {
        let loaded: Continuation<Candidate> =
            Continuation::load(&SessionAttributes::new()).unwrap();
        assert_eq!(loaded.state(), ContinuationState::Empty);
    }

    #[test]
    fn test_malformed_attributes_are_errors() {
        let mut attributes = SessionAttributes::new();
        attributes.insert(CONTINUATION_KEY.to_string(), Value::from("not a list"));
        assert!(matches!(
            Continuation::<String>::load(&attributes),
            Err(SessionError::Malformed(_))
        ));

        attributes.insert(
            CONTINUATION_KEY.to_string(),
            serde_json::json!({ "searchKey": "x", "items": ["a"], "index": 5 }),
        );
        assert!(matches!(
            Continuation::<String>::load(&attributes),
            Err(SessionError::Malformed(_))
        ));
    }
}
