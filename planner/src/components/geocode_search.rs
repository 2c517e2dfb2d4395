use std::time::Duration;

use serde::Serialize;
use shared_types::{Coordinate, SearchCandidate};

use crate::error::ProviderError;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    /// Quiet period after the last keystroke before a request goes out.
    pub debounce: Duration,
    /// Queries shorter than this (in characters, after trimming) never hit the network.
    pub min_chars: usize,
    /// Maximum number of candidates kept from one response.
    pub page_size: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            min_chars: 2,
            page_size: 5,
        }
    }
}

/// A search the session wants issued, stamped with the generation it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTicket {
    pub generation: u64,
    pub query: String,
}

/// The place a user picked from the result list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedPlace {
    pub label: String,
    pub coordinate: Coordinate,
}

impl From<&SearchCandidate> for SelectedPlace {
    fn from(candidate: &SearchCandidate) -> Self {
        Self {
            label: candidate.label.clone(),
            coordinate: candidate.coordinate,
        }
    }
}

/// Query text, the candidates for it, and the generation counter that decides
/// which responses are still allowed to land.
///
/// Every query change bumps the generation. A response is applied only when it
/// carries the generation that is current when it arrives, so a slow answer to
/// an old query can never overwrite the answer to a newer one.
#[derive(Debug)]
pub struct GeocodeSearchSession {
    settings: SearchSettings,
    query: String,
    generation: u64,
    candidates: Vec<SearchCandidate>,
    no_results: bool,
    loading: bool,
    visible: bool,
    last_error: Option<String>,
}

impl GeocodeSearchSession {
    pub fn new(settings: SearchSettings) -> Self {
        Self {
            settings,
            query: String::new(),
            generation: 0,
            candidates: Vec::new(),
            no_results: false,
            loading: false,
            visible: false,
            last_error: None,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn candidates(&self) -> &[SearchCandidate] {
        &self.candidates
    }

    pub fn no_results(&self) -> bool {
        self.no_results
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn results_visible(&self) -> bool {
        self.visible
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Records new query text. Returns the ticket to debounce and issue, or
    /// `None` when the query is too short to search (results are cleared
    /// immediately in that case).
    pub fn set_query(&mut self, text: &str) -> Option<SearchTicket> {
        self.query = text.to_string();
        self.generation += 1;
        self.loading = false;

        let trimmed = text.trim();
        if trimmed.chars().count() < self.settings.min_chars {
            self.clear_results();
            return None;
        }

        Some(SearchTicket {
            generation: self.generation,
            query: trimmed.to_string(),
        })
    }

    /// Marks the request for `generation` as in flight. Returns false when the
    /// ticket was superseded while its debounce timer ran.
    pub fn begin_request(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.loading = true;
        true
    }

    /// Applies a provider response. Returns false (and changes nothing) when
    /// the response belongs to a superseded query.
    pub fn apply_results(
        &mut self,
        generation: u64,
        outcome: Result<Vec<SearchCandidate>, ProviderError>,
    ) -> bool {
        if !self.is_current(generation) {
            tracing::debug!(
                "Dropping stale geocode response (generation {}, current {})",
                generation,
                self.generation
            );
            return false;
        }

        self.loading = false;
        match outcome {
            Ok(mut candidates) => {
                candidates.truncate(self.settings.page_size);
                self.no_results = candidates.is_empty();
                self.visible = !candidates.is_empty();
                self.candidates = candidates;
                self.last_error = None;
            }
            Err(e) => {
                tracing::warn!("Place search failed for {:?}: {}", self.query, e);
                self.candidates.clear();
                self.no_results = false;
                self.visible = false;
                self.last_error = Some(e.to_string());
            }
        }
        true
    }

    /// Ends the session with `candidate`: results are cleared, the query text
    /// becomes the chosen label, and anything still in flight is superseded.
    pub fn select_candidate(&mut self, candidate: &SearchCandidate) -> SelectedPlace {
        self.generation += 1;
        self.query = candidate.label.clone();
        self.loading = false;
        self.clear_results();
        SelectedPlace::from(candidate)
    }

    pub fn select_index(&mut self, index: usize) -> Option<SelectedPlace> {
        let candidate = self.candidates.get(index).cloned()?;
        Some(self.select_candidate(&candidate))
    }

    /// Hides the result list without discarding it (click outside the search box).
    pub fn dismiss(&mut self) {
        self.visible = false;
    }

    fn clear_results(&mut self) {
        self.candidates.clear();
        self.no_results = false;
        self.visible = false;
        self.last_error = None;
    }
}
