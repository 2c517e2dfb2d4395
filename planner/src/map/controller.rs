use std::sync::Arc;

use serde::Serialize;
use shared_types::{
    Coordinate, FavoritePlace, FavoriteUpdate, RouteResult, SavedSearch, SearchCandidate,
    TransportMode,
};
use tokio::{sync::mpsc, task::AbortHandle};

use super::{
    overlay::{derive_overlays, OverlaySet},
    viewport::{MapSettings, Viewport},
};
use crate::{
    components::{
        GeocodeSearchSession, RouteRequestCoordinator, RouteStatus, RouteTicket, SearchSettings,
        SearchTicket, SelectedPlace, SelectionPhase, SelectionState,
    },
    db::{PlacesBackend, RecentPlacesStore},
    error::ProviderError,
    services::{DirectionsProvider, GeocodeProvider},
    utils::auth::SessionContext,
};

pub type CompletionSender = mpsc::UnboundedSender<Completion>;
pub type CompletionReceiver = mpsc::UnboundedReceiver<Completion>;

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub map: MapSettings,
    pub search: SearchSettings,
    pub recent_limit: usize,
}

/// Result of background work, handed back to the controller by the host loop.
///
/// Store completions carry the user they were issued for; they are ignored if
/// someone else is signed in by the time they arrive. A full reload is also
/// ignored once the local lists changed after it was issued.
#[derive(Debug)]
pub enum Completion {
    SearchDue(SearchTicket),
    SearchFinished {
        generation: u64,
        outcome: Result<Vec<SearchCandidate>, ProviderError>,
    },
    RouteFinished {
        ticket: RouteTicket,
        outcome: Result<RouteResult, ProviderError>,
    },
    RecentSearchSaved {
        user_id: String,
        saved: Option<SavedSearch>,
    },
    SavedPlacesLoaded {
        user_id: String,
        generation: u64,
        recent: Vec<SavedSearch>,
        favorites: Vec<FavoritePlace>,
    },
    FavoriteAdded {
        user_id: String,
        favorite: Option<FavoritePlace>,
    },
    FavoriteUpdated {
        user_id: String,
        id: String,
        favorite: Option<FavoritePlace>,
    },
    FavoriteDeleted {
        user_id: String,
        id: String,
        deleted: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub signed_in_as: Option<String>,
    pub mode: TransportMode,
    pub selection: SelectionState,
    pub route_status: &'static str,
    pub viewport: &'a Viewport,
    pub query: &'a str,
    pub focus: Option<&'a SelectedPlace>,
    pub overlays: &'a OverlaySet,
    pub recent_searches: &'a [SavedSearch],
    pub favorites: &'a [FavoritePlace],
}

pub struct MapInteractionController<P, B> {
    map: MapSettings,
    recent_limit: usize,
    provider: Arc<P>,
    store: RecentPlacesStore<B>,
    session: SessionContext,
    completions: CompletionSender,

    search: GeocodeSearchSession,
    routes: RouteRequestCoordinator,
    focus: Option<SelectedPlace>,
    viewport: Viewport,
    last_position: Option<Coordinate>,
    recent_searches: Vec<SavedSearch>,
    favorites: Vec<FavoritePlace>,
    // bumped by every local change to the saved-place lists
    places_generation: u64,
    debounce: Option<AbortHandle>,
    overlays: OverlaySet,
}

impl<P, B> MapInteractionController<P, B>
where
    P: GeocodeProvider + DirectionsProvider,
    B: PlacesBackend,
{
    pub fn new(
        settings: ControllerSettings,
        provider: Arc<P>,
        backend: Arc<B>,
        session: SessionContext,
        completions: CompletionSender,
    ) -> Self {
        let mut controller = Self {
            viewport: Viewport::initial(&settings.map),
            map: settings.map,
            recent_limit: settings.recent_limit,
            provider,
            store: RecentPlacesStore::new(backend, session.clone(), settings.recent_limit),
            session,
            completions,
            search: GeocodeSearchSession::new(settings.search),
            routes: RouteRequestCoordinator::new(),
            focus: None,
            last_position: None,
            recent_searches: Vec::new(),
            favorites: Vec::new(),
            places_generation: 0,
            debounce: None,
            overlays: OverlaySet::default(),
        };
        controller.refresh();
        controller
    }

    // --- accessors ---

    pub fn overlays(&self) -> &OverlaySet {
        &self.overlays
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn selection(&self) -> SelectionState {
        self.routes.selection()
    }

    pub fn mode(&self) -> TransportMode {
        self.routes.mode()
    }

    pub fn route_status(&self) -> &RouteStatus {
        self.routes.status()
    }

    pub fn search(&self) -> &GeocodeSearchSession {
        &self.search
    }

    pub fn focus(&self) -> Option<&SelectedPlace> {
        self.focus.as_ref()
    }

    pub fn recent_searches(&self) -> &[SavedSearch] {
        &self.recent_searches
    }

    pub fn favorites(&self) -> &[FavoritePlace] {
        &self.favorites
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            signed_in_as: self.session.current().map(|identity| identity.user_id),
            mode: self.routes.mode(),
            selection: self.routes.selection(),
            route_status: match self.routes.status() {
                RouteStatus::Idle => "idle",
                RouteStatus::Pending => "pending",
                RouteStatus::Ready(_) => "ready",
                RouteStatus::Unavailable => "no route available",
            },
            viewport: &self.viewport,
            query: self.search.query(),
            focus: self.focus.as_ref(),
            overlays: &self.overlays,
            recent_searches: &self.recent_searches,
            favorites: &self.favorites,
        }
    }

    // --- map events ---

    /// Click cycle: origin, then destination, then start over from the new point.
    pub fn on_map_click(&mut self, coord: Coordinate) {
        match self.routes.selection().phase() {
            SelectionPhase::Empty => {
                let ticket = self.routes.set_origin(coord);
                self.dispatch_route(ticket);
            }
            SelectionPhase::OriginSet => match self.routes.set_destination(coord) {
                Ok(ticket) => self.dispatch_route(ticket),
                Err(e) => tracing::warn!("Ignoring click at {}: {}", coord, e),
            },
            SelectionPhase::BothSet => self.routes.reset_with_origin(coord),
        }
        self.refresh();
    }

    pub fn on_geolocate(&mut self, position: Coordinate) {
        self.last_position = Some(position);
        self.viewport = Viewport::focus(&self.map, position);
        self.refresh();
    }

    pub fn on_map_move(&mut self, center: Coordinate, zoom: f64) {
        self.viewport = Viewport::Centered { center, zoom };
        self.refresh();
    }

    pub fn set_mode(&mut self, mode: TransportMode) {
        let ticket = self.routes.set_mode(mode);
        self.dispatch_route(ticket);
        self.refresh();
    }

    // --- search ---

    /// Keystroke in the search box. Restarts the debounce timer.
    pub fn set_query(&mut self, text: &str) {
        self.cancel_debounce();
        if let Some(ticket) = self.search.set_query(text) {
            let delay = self.search.settings().debounce;
            let tx = self.completions.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(Completion::SearchDue(ticket));
            });
            self.debounce = Some(handle.abort_handle());
        }
        self.refresh();
    }

    pub fn dismiss_search_results(&mut self) {
        self.search.dismiss();
        self.refresh();
    }

    /// Picks a result by its position in the visible list.
    pub fn select_result(&mut self, index: usize) -> bool {
        if !self.search.results_visible() {
            return false;
        }
        let Some(candidate) = self.search.candidates().get(index).cloned() else {
            return false;
        };
        self.on_search_select(&candidate);
        true
    }

    /// Focuses the candidate without touching origin or destination, and
    /// records it as a recent search for signed-in users.
    pub fn on_search_select(&mut self, candidate: &SearchCandidate) {
        let typed = self.search.query().trim().to_string();
        self.cancel_debounce();
        let place = self.search.select_candidate(candidate);
        self.viewport = Viewport::focus(&self.map, place.coordinate);

        match self.session.current() {
            Some(identity) => {
                self.places_generation += 1;
                let query = if typed.is_empty() {
                    place.label.clone()
                } else {
                    typed
                };
                let store = self.store.clone();
                let tx = self.completions.clone();
                let (label, coordinate) = (place.label.clone(), place.coordinate);
                tokio::spawn(async move {
                    let saved = store.save_recent_search(&query, coordinate, &label).await;
                    let _ = tx.send(Completion::RecentSearchSaved {
                        user_id: identity.user_id,
                        saved,
                    });
                });
            }
            None => tracing::debug!("Not saving search for anonymous user"),
        }

        self.focus = Some(place);
        self.refresh();
    }

    pub fn clear_focus(&mut self) {
        self.focus = None;
        self.refresh();
    }

    // --- directions ---

    pub fn get_directions_to_focus(&mut self) -> bool {
        let Some(target) = self.focus.as_ref().map(|place| place.coordinate) else {
            return false;
        };
        self.route_to(target);
        true
    }

    pub fn get_directions_to_favorite(&mut self, id: &str) -> bool {
        let Some(target) = self
            .favorites
            .iter()
            .find(|favorite| favorite.id == id)
            .map(|favorite| favorite.coordinates)
        else {
            tracing::warn!("No favorite with id {}", id);
            return false;
        };
        self.route_to(target);
        true
    }

    fn route_to(&mut self, target: Coordinate) {
        let result = match (self.routes.selection().origin, self.last_position) {
            (None, Some(position)) => {
                self.routes.set_origin(position);
                self.routes.set_destination(target)
            }
            (None, None) => Ok(self.routes.set_origin(target)),
            (Some(_), _) => self.routes.set_destination(target),
        };
        match result {
            Ok(ticket) => self.dispatch_route(ticket),
            Err(e) => tracing::warn!("Could not route to {}: {}", target, e),
        }
        self.refresh();
    }

    // --- saved places ---

    pub fn load_saved_places(&mut self) {
        let Some(identity) = self.session.current() else {
            tracing::debug!("Not loading saved places for anonymous user");
            return;
        };
        let store = self.store.clone();
        let tx = self.completions.clone();
        let generation = self.places_generation;
        tokio::spawn(async move {
            let (recent, favorites) =
                tokio::join!(store.list_recent_searches(), store.list_favorites());
            let _ = tx.send(Completion::SavedPlacesLoaded {
                user_id: identity.user_id,
                generation,
                recent,
                favorites,
            });
        });
    }

    /// Sign-in loads the new user's places, sign-out forgets the old ones.
    pub fn on_session_changed(&mut self) {
        self.places_generation += 1;
        self.recent_searches.clear();
        self.favorites.clear();
        self.load_saved_places();
        self.refresh();
    }

    pub fn add_focus_to_favorites(&mut self, notes: Option<String>) -> bool {
        let Some(place) = self.focus.clone() else {
            return false;
        };
        let Some(identity) = self.session.current() else {
            tracing::debug!("Sign in to save favorites");
            return false;
        };
        self.places_generation += 1;
        let store = self.store.clone();
        let tx = self.completions.clone();
        tokio::spawn(async move {
            let favorite = store
                .add_favorite(&place.label, place.coordinate, notes.as_deref())
                .await;
            let _ = tx.send(Completion::FavoriteAdded {
                user_id: identity.user_id,
                favorite,
            });
        });
        true
    }

    /// Applies the edit locally right away; the remote result replaces it when
    /// it arrives, a remote failure leaves the local edit in place.
    pub fn update_favorite(&mut self, id: &str, update: FavoriteUpdate) -> bool {
        if update.is_empty() {
            return false;
        }
        let Some(favorite) = self.favorites.iter_mut().find(|favorite| favorite.id == id) else {
            tracing::warn!("No favorite with id {}", id);
            return false;
        };
        update.apply_to(favorite);
        self.places_generation += 1;

        if let Some(identity) = self.session.current() {
            let store = self.store.clone();
            let tx = self.completions.clone();
            let id = id.to_string();
            tokio::spawn(async move {
                let favorite = store.update_favorite(&id, &update).await;
                let _ = tx.send(Completion::FavoriteUpdated {
                    user_id: identity.user_id,
                    id,
                    favorite,
                });
            });
        }
        self.refresh();
        true
    }

    /// Removes the favorite locally, then remotely. Returns false when no
    /// local entry had that id; other entries are never touched.
    pub fn delete_favorite(&mut self, id: &str) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|favorite| favorite.id != id);
        let removed = self.favorites.len() != before;
        self.places_generation += 1;

        if let Some(identity) = self.session.current() {
            let store = self.store.clone();
            let tx = self.completions.clone();
            let id = id.to_string();
            tokio::spawn(async move {
                let deleted = store.delete_favorite(&id).await;
                let _ = tx.send(Completion::FavoriteDeleted {
                    user_id: identity.user_id,
                    id,
                    deleted,
                });
            });
        }
        self.refresh();
        removed
    }

    // --- completions ---

    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::SearchDue(ticket) => {
                if self.search.begin_request(ticket.generation) {
                    self.dispatch_search(ticket);
                }
            }
            Completion::SearchFinished {
                generation,
                outcome,
            } => {
                self.search.apply_results(generation, outcome);
            }
            Completion::RouteFinished { ticket, outcome } => {
                if self.routes.apply(&ticket, outcome) {
                    if let Some(route) = self.routes.route() {
                        self.viewport = Viewport::fit(&self.map, route.bounds);
                    }
                }
            }
            Completion::RecentSearchSaved { user_id, saved } => {
                if let Some(saved) = saved.filter(|_| self.is_current_user(&user_id)) {
                    self.recent_searches.insert(0, saved);
                    self.recent_searches.truncate(self.recent_limit);
                }
            }
            Completion::SavedPlacesLoaded {
                user_id,
                generation,
                recent,
                favorites,
            } => {
                if generation != self.places_generation {
                    tracing::debug!(
                        "Dropping saved places load {} (local lists at {})",
                        generation,
                        self.places_generation
                    );
                } else if self.is_current_user(&user_id) {
                    self.recent_searches = recent;
                    self.favorites = favorites;
                }
            }
            Completion::FavoriteAdded { user_id, favorite } => {
                if let Some(favorite) = favorite.filter(|_| self.is_current_user(&user_id)) {
                    self.favorites.insert(0, favorite);
                }
            }
            Completion::FavoriteUpdated {
                user_id,
                id,
                favorite,
            } => match favorite {
                Some(remote) if self.is_current_user(&user_id) => {
                    if let Some(local) = self.favorites.iter_mut().find(|f| f.id == id) {
                        *local = remote;
                    }
                }
                Some(_) => {}
                None => tracing::warn!("Favorite {} was not updated remotely", id),
            },
            Completion::FavoriteDeleted { id, deleted, .. } => {
                if !deleted {
                    tracing::warn!("Favorite {} was not deleted remotely", id);
                }
            }
        }
        self.refresh();
    }

    // --- internals ---

    fn is_current_user(&self, user_id: &str) -> bool {
        let current = self.session.current();
        let matches = current.as_ref().is_some_and(|identity| identity.user_id == user_id);
        if !matches {
            tracing::debug!("Dropping completion issued for user {}", user_id);
        }
        matches
    }

    fn cancel_debounce(&mut self) {
        if let Some(handle) = self.debounce.take() {
            handle.abort();
        }
    }

    fn dispatch_search(&self, ticket: SearchTicket) {
        let provider = Arc::clone(&self.provider);
        let tx = self.completions.clone();
        let limit = self.search.settings().page_size;
        tokio::spawn(async move {
            let outcome = provider.search_places(&ticket.query, limit).await;
            let _ = tx.send(Completion::SearchFinished {
                generation: ticket.generation,
                outcome,
            });
        });
    }

    fn dispatch_route(&self, ticket: Option<RouteTicket>) {
        let Some(ticket) = ticket else {
            return;
        };
        let provider = Arc::clone(&self.provider);
        let tx = self.completions.clone();
        tokio::spawn(async move {
            let outcome = provider
                .directions(ticket.origin, ticket.destination, ticket.mode)
                .await;
            let _ = tx.send(Completion::RouteFinished { ticket, outcome });
        });
    }

    fn refresh(&mut self) {
        self.overlays = derive_overlays(
            &self.routes.selection(),
            self.routes.status(),
            self.routes.mode(),
            self.focus.as_ref(),
            &self.search,
        );
    }
}

impl<P, B> Drop for MapInteractionController<P, B> {
    fn drop(&mut self) {
        if let Some(handle) = self.debounce.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryPlacesBackend;
    use crate::error::StoreError;
    use crate::utils::auth::Identity;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeProvider {
        searches: Mutex<Vec<String>>,
        routes: Mutex<Vec<TransportMode>>,
    }

    impl FakeProvider {
        fn searches(&self) -> Vec<String> {
            self.searches.lock().unwrap().clone()
        }

        fn routes(&self) -> Vec<TransportMode> {
            self.routes.lock().unwrap().clone()
        }
    }

    impl GeocodeProvider for FakeProvider {
        async fn search_places(
            &self,
            query: &str,
            limit: usize,
        ) -> Result<Vec<SearchCandidate>, ProviderError> {
            self.searches.lock().unwrap().push(query.to_string());
            // the short prefix answers slowly so it lands after the full query
            let delay = if query == "jer" { 500 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;

            if query == "nowhere" {
                return Ok(Vec::new());
            }
            Ok((0..limit + 2)
                .map(|i| SearchCandidate {
                    id: format!("{}-{}", query, i),
                    label: format!("{} #{}", query, i),
                    coordinate: Coordinate::new(34.7 + i as f64 / 100.0, 32.0).unwrap(),
                })
                .collect())
        }
    }

    impl DirectionsProvider for FakeProvider {
        async fn directions(
            &self,
            origin: Coordinate,
            destination: Coordinate,
            mode: TransportMode,
        ) -> Result<RouteResult, ProviderError> {
            self.routes.lock().unwrap().push(mode);
            let (delay, duration) = match mode {
                TransportMode::Driving => (500, 600.0),
                TransportMode::Walking => (10, 3600.0),
                TransportMode::Cycling => (10, 1200.0),
                TransportMode::DrivingTraffic => (10, 900.0),
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(RouteResult::new(vec![origin, destination], duration, 4200.0))
        }
    }

    /// In-memory backend that counts writes.
    #[derive(Default)]
    struct CountingBackend {
        inner: InMemoryPlacesBackend,
        writes: AtomicUsize,
    }

    impl CountingBackend {
        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        fn wrote(&self) {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl PlacesBackend for CountingBackend {
        async fn insert_recent_search(
            &self,
            user_id: &str,
            search_query: &str,
            coordinates: Coordinate,
            place_name: &str,
        ) -> Result<SavedSearch, StoreError> {
            self.wrote();
            self.inner
                .insert_recent_search(user_id, search_query, coordinates, place_name)
                .await
        }

        async fn recent_searches(
            &self,
            user_id: &str,
            limit: usize,
        ) -> Result<Vec<SavedSearch>, StoreError> {
            self.inner.recent_searches(user_id, limit).await
        }

        async fn insert_favorite(
            &self,
            user_id: &str,
            place_name: &str,
            coordinates: Coordinate,
            notes: Option<&str>,
        ) -> Result<FavoritePlace, StoreError> {
            self.wrote();
            self.inner
                .insert_favorite(user_id, place_name, coordinates, notes)
                .await
        }

        async fn favorites(&self, user_id: &str) -> Result<Vec<FavoritePlace>, StoreError> {
            self.inner.favorites(user_id).await
        }

        async fn update_favorite(
            &self,
            user_id: &str,
            id: &str,
            update: &FavoriteUpdate,
        ) -> Result<FavoritePlace, StoreError> {
            self.wrote();
            self.inner.update_favorite(user_id, id, update).await
        }

        async fn delete_favorite(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
            self.wrote();
            self.inner.delete_favorite(user_id, id).await
        }
    }

    type TestController = MapInteractionController<FakeProvider, CountingBackend>;

    struct Harness {
        controller: TestController,
        rx: CompletionReceiver,
        provider: Arc<FakeProvider>,
        backend: Arc<CountingBackend>,
        session: SessionContext,
    }

    fn settings() -> ControllerSettings {
        ControllerSettings {
            map: MapSettings {
                initial_center: Coordinate::new(34.7818, 32.0853).unwrap(),
                initial_zoom: 10.0,
                focus_zoom: 14.0,
                fit_padding: 50,
            },
            search: SearchSettings::default(),
            recent_limit: 10,
        }
    }

    fn harness(session: SessionContext) -> Harness {
        let (tx, rx) = mpsc::unbounded_channel();
        let provider = Arc::new(FakeProvider::default());
        let backend = Arc::new(CountingBackend::default());
        let controller = MapInteractionController::new(
            settings(),
            Arc::clone(&provider),
            Arc::clone(&backend),
            session.clone(),
            tx,
        );
        Harness {
            controller,
            rx,
            provider,
            backend,
            session,
        }
    }

    impl Harness {
        /// Applies completions until nothing arrives for a full second.
        async fn settle(&mut self) {
            while let Ok(Some(completion)) =
                tokio::time::timeout(Duration::from_secs(1), self.rx.recv()).await
            {
                self.controller.apply(completion);
            }
        }
    }

    fn coord(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn three_clicks_cycle_origin_destination_reset() {
        let mut h = harness(SessionContext::new());
        let (a, b, c) = (coord(34.78, 32.08), coord(34.80, 32.10), coord(34.76, 32.05));

        h.controller.on_map_click(a);
        assert_eq!(
            h.controller.selection(),
            SelectionState { origin: Some(a), destination: None }
        );
        assert!(!h.controller.overlays().instructions);

        h.controller.on_map_click(b);
        assert_eq!(
            h.controller.selection(),
            SelectionState { origin: Some(a), destination: Some(b) }
        );
        h.settle().await;
        assert!(h.controller.overlays().route_line.is_some());
        assert!(matches!(h.controller.viewport(), Viewport::Fitted { padding: 50, .. }));

        h.controller.on_map_click(c);
        assert_eq!(
            h.controller.selection(),
            SelectionState { origin: Some(c), destination: None }
        );
        let overlays = h.controller.overlays();
        assert!(overlays.route_line.is_none());
        assert!(overlays.route_info.is_none());
        assert!(overlays.destination_marker.is_none());

        h.settle().await;
        assert_eq!(h.provider.routes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn mode_change_issues_exactly_one_request_and_hides_old_route() {
        let mut h = harness(SessionContext::new());
        h.controller.on_map_click(coord(34.78, 32.08));
        h.controller.on_map_click(coord(34.80, 32.10));
        h.settle().await;
        assert_eq!(h.provider.routes(), vec![TransportMode::Driving]);

        h.controller.set_mode(TransportMode::Walking);
        assert!(h.controller.overlays().route_line.is_none());
        assert_eq!(h.controller.route_status(), &RouteStatus::Pending);

        h.settle().await;
        assert_eq!(
            h.provider.routes(),
            vec![TransportMode::Driving, TransportMode::Walking]
        );
        let line = h.controller.overlays().route_line.clone().unwrap();
        assert_eq!(line.color, TransportMode::Walking.color());
        assert_eq!(h.controller.overlays().route_info.clone().unwrap().duration, "1h 0m");

        h.controller.set_mode(TransportMode::Walking);
        h.settle().await;
        assert_eq!(h.provider.routes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_route_for_previous_mode_is_discarded() {
        let mut h = harness(SessionContext::new());
        h.controller.on_map_click(coord(34.78, 32.08));
        h.controller.on_map_click(coord(34.80, 32.10));
        h.controller.set_mode(TransportMode::Cycling);
        h.settle().await;

        assert_eq!(h.provider.routes().len(), 2);
        let line = h.controller.overlays().route_line.clone().unwrap();
        assert_eq!(line.mode, TransportMode::Cycling);
        assert_eq!(h.controller.overlays().route_info.clone().unwrap().duration, "20m");
    }

    #[tokio::test(start_paused = true)]
    async fn single_character_never_searches() {
        let mut h = harness(SessionContext::new());
        h.controller.set_query("t");
        h.settle().await;
        assert!(h.provider.searches().is_empty());
        assert!(h.controller.overlays().search_dropdown.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn keystrokes_inside_debounce_window_issue_one_search() {
        let mut h = harness(SessionContext::new());
        for text in ["te", "tel", "tel ", "tel a"] {
            h.controller.set_query(text);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        h.settle().await;

        assert_eq!(h.provider.searches(), vec!["tel a".to_string()]);
        let dropdown = h.controller.overlays().search_dropdown.clone().unwrap();
        assert_eq!(dropdown.candidates.len(), 5);
        assert_eq!(dropdown.candidates[0].label, "tel a #0");
    }

    #[tokio::test(start_paused = true)]
    async fn late_response_for_older_query_never_replaces_newer_results() {
        let mut h = harness(SessionContext::new());
        h.controller.set_query("jer");
        tokio::time::sleep(Duration::from_millis(350)).await;
        let due = h.rx.try_recv().unwrap();
        h.controller.apply(due);

        h.controller.set_query("jerusalem");
        h.settle().await;

        assert_eq!(h.provider.searches(), vec!["jer".to_string(), "jerusalem".to_string()]);
        assert_eq!(h.controller.search().candidates()[0].label, "jerusalem #0");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_response_shows_no_results() {
        let mut h = harness(SessionContext::new());
        h.controller.set_query("nowhere");
        h.settle().await;
        assert!(h.controller.overlays().search_dropdown.clone().unwrap().no_results);
    }

    #[tokio::test(start_paused = true)]
    async fn anonymous_selection_focuses_without_persisting() {
        let mut h = harness(SessionContext::new());
        h.controller.set_query("tel");
        h.settle().await;

        assert!(h.controller.select_result(1));
        h.settle().await;

        let focus = h.controller.focus().unwrap().clone();
        assert_eq!(focus.label, "tel #1");
        assert_eq!(
            h.controller.viewport(),
            &Viewport::Centered { center: focus.coordinate, zoom: 14.0 }
        );
        assert_eq!(h.controller.selection(), SelectionState::default());
        assert!(h.controller.overlays().place_card.is_some());
        assert!(h.controller.overlays().search_dropdown.is_none());
        assert_eq!(h.backend.writes(), 0);
        assert!(h.controller.recent_searches().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn signed_in_selection_records_recent_search() {
        let mut h = harness(SessionContext::signed_in(Identity::new("u1")));
        h.controller.set_query("haifa");
        h.settle().await;
        h.controller.select_result(0);
        h.settle().await;

        assert_eq!(h.backend.writes(), 1);
        let recent = h.controller.recent_searches();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].search_query, "haifa");
        assert_eq!(recent[0].place_name, "haifa #0");
    }

    #[tokio::test(start_paused = true)]
    async fn directions_to_focus_uses_position_then_focus() {
        let mut h = harness(SessionContext::new());
        h.controller.set_query("port");
        h.settle().await;
        h.controller.select_result(0);
        let target = h.controller.focus().unwrap().coordinate;

        let here = coord(34.77, 32.07);
        h.controller.on_geolocate(here);
        assert_eq!(h.controller.selection(), SelectionState::default());

        assert!(h.controller.get_directions_to_focus());
        assert_eq!(
            h.controller.selection(),
            SelectionState { origin: Some(here), destination: Some(target) }
        );
        h.settle().await;
        assert_eq!(h.provider.routes().len(), 1);
        assert_eq!(h.backend.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn directions_without_position_make_focus_the_origin() {
        let mut h = harness(SessionContext::new());
        assert!(!h.controller.get_directions_to_focus());

        h.controller.set_query("port");
        h.settle().await;
        h.controller.select_result(0);
        let target = h.controller.focus().unwrap().coordinate;

        h.controller.get_directions_to_focus();
        assert_eq!(
            h.controller.selection(),
            SelectionState { origin: Some(target), destination: None }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn favorite_directions_after_sign_out_do_not_write() {
        let session = SessionContext::signed_in(Identity::new("u1"));
        let mut h = harness(session);
        h.backend
            .inner
            .insert_favorite("u1", "Office", coord(34.79, 32.07), None)
            .await
            .unwrap();
        h.controller.load_saved_places();
        h.settle().await;
        let id = h.controller.favorites()[0].id.clone();

        // controller has not been told about the sign-out yet
        h.session.sign_out();
        h.controller.on_map_click(coord(34.78, 32.08));
        assert!(h.controller.get_directions_to_favorite(&id));
        h.settle().await;

        assert_eq!(h.backend.writes(), 0);
        assert_eq!(h.provider.routes().len(), 1);
        assert!(!h.controller.get_directions_to_favorite("missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_missing_favorite_leaves_others_intact() {
        let mut h = harness(SessionContext::signed_in(Identity::new("u1")));
        for name in ["Home", "Work", "Gym"] {
            h.backend
                .inner
                .insert_favorite("u1", name, coord(34.78, 32.08), None)
                .await
                .unwrap();
        }
        h.controller.load_saved_places();
        h.settle().await;
        let work = h.controller.favorites()[1].id.clone();

        assert!(h.controller.delete_favorite(&work));
        h.settle().await;
        assert!(!h.controller.delete_favorite(&work));
        h.settle().await;

        let names: Vec<_> = h
            .controller
            .favorites()
            .iter()
            .map(|f| f.place_name.as_str())
            .collect();
        assert_eq!(names, vec!["Gym", "Home"]);
    }

    async fn signed_in_with_favorites(names: &[&str]) -> Harness {
        let mut h = harness(SessionContext::signed_in(Identity::new("u1")));
        for name in names {
            h.backend
                .inner
                .insert_favorite("u1", name, coord(34.78, 32.08), None)
                .await
                .unwrap();
        }
        h.controller.load_saved_places();
        h.settle().await;
        h
    }

    fn favorite_names(h: &Harness) -> Vec<String> {
        h.controller
            .favorites()
            .iter()
            .map(|f| f.place_name.clone())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn reload_in_flight_does_not_restore_deleted_favorite() {
        let mut h = signed_in_with_favorites(&["Home", "Work"]).await;
        assert_eq!(favorite_names(&h), vec!["Work", "Home"]);
        let work = h.controller.favorites()[0].id.clone();

        h.controller.load_saved_places();
        assert!(h.controller.delete_favorite(&work));
        h.settle().await;

        assert_eq!(favorite_names(&h), vec!["Home"]);
        let remote: Vec<_> = h
            .backend
            .inner
            .favorites("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.place_name)
            .collect();
        assert_eq!(remote, vec!["Home"]);
    }

    #[tokio::test(start_paused = true)]
    async fn reload_in_flight_never_reverts_optimistic_edit() {
        let mut h = signed_in_with_favorites(&["Home"]).await;
        let id = h.controller.favorites()[0].id.clone();

        h.controller.load_saved_places();
        let update = FavoriteUpdate {
            place_name: Some("Casa".to_string()),
            notes: None,
        };
        assert!(h.controller.update_favorite(&id, update));

        while let Ok(Some(completion)) =
            tokio::time::timeout(Duration::from_secs(1), h.rx.recv()).await
        {
            h.controller.apply(completion);
            assert_eq!(favorite_names(&h), vec!["Casa"]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reload_after_local_change_is_applied() {
        let mut h = signed_in_with_favorites(&["Home", "Work"]).await;
        let work = h.controller.favorites()[0].id.clone();
        h.controller.delete_favorite(&work);
        h.settle().await;

        h.backend
            .inner
            .insert_favorite("u1", "Gym", coord(34.78, 32.08), None)
            .await
            .unwrap();
        h.controller.load_saved_places();
        h.settle().await;
        assert_eq!(favorite_names(&h), vec!["Gym", "Home"]);
    }

    #[tokio::test(start_paused = true)]
    async fn dismissed_results_cannot_be_selected() {
        let mut h = harness(SessionContext::new());
        h.controller.set_query("tel");
        h.settle().await;
        h.controller.dismiss_search_results();

        assert!(!h.controller.select_result(0));
        assert!(h.controller.focus().is_none());
        assert!(h.controller.overlays().place_card.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn closing_place_card_keeps_route_selection() {
        let mut h = harness(SessionContext::new());
        h.controller.on_map_click(coord(34.78, 32.08));
        h.controller.set_query("port");
        h.settle().await;
        h.controller.select_result(0);
        assert!(h.controller.overlays().place_card.is_some());

        h.controller.clear_focus();
        assert!(h.controller.focus().is_none());
        assert!(h.controller.overlays().place_card.is_none());
        assert!(!h.controller.get_directions_to_focus());
        assert!(h.controller.overlays().origin_marker.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn favorite_edit_is_visible_before_remote_confirms() {
        let mut h = harness(SessionContext::signed_in(Identity::new("u1")));
        h.controller.set_query("beach");
        h.settle().await;
        h.controller.select_result(0);
        assert!(h.controller.add_focus_to_favorites(Some("sunset".to_string())));
        h.settle().await;
        let id = h.controller.favorites()[0].id.clone();

        let update = FavoriteUpdate {
            place_name: Some("Gordon Beach".to_string()),
            notes: None,
        };
        assert!(h.controller.update_favorite(&id, update));
        assert_eq!(h.controller.favorites()[0].place_name, "Gordon Beach");

        h.settle().await;
        assert_eq!(h.controller.favorites()[0].place_name, "Gordon Beach");
        assert_eq!(h.controller.favorites()[0].notes.as_deref(), Some("sunset"));
    }

    #[tokio::test(start_paused = true)]
    async fn loads_for_previous_user_are_dropped() {
        let session = SessionContext::signed_in(Identity::new("u1"));
        let mut h = harness(session);
        h.backend
            .inner
            .insert_favorite("u1", "Old", coord(34.78, 32.08), None)
            .await
            .unwrap();
        h.backend
            .inner
            .insert_favorite("u2", "New", coord(34.78, 32.08), None)
            .await
            .unwrap();

        h.controller.load_saved_places();
        h.session.sign_in(Identity::new("u2"));
        h.controller.on_session_changed();
        h.settle().await;

        let names: Vec<_> = h
            .controller
            .favorites()
            .iter()
            .map(|f| f.place_name.as_str())
            .collect();
        assert_eq!(names, vec!["New"]);

        h.session.sign_out();
        h.controller.on_session_changed();
        assert!(h.controller.favorites().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn anonymous_favorite_add_is_refused() {
        let mut h = harness(SessionContext::new());
        h.controller.set_query("beach");
        h.settle().await;
        h.controller.select_result(0);
        assert!(!h.controller.add_focus_to_favorites(None));
        assert_eq!(h.backend.writes(), 0);
    }
}
