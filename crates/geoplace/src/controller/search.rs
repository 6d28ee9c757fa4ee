//! Location search: literal coordinates, then geocoding.

use crate::error::Error;
use crate::providers::geocode::{SearchSuggestion, parse_lat_lng};
use crate::scene::SceneRenderer;
use crate::state::PartialViewState;

use super::Controller;
use super::message::{Effect, RequestToken, Timer};

pub const SEARCH_DEBOUNCE_MS: u64 = 250;
/// Delay before hiding results after the input loses focus, so a click on a
/// result still lands.
pub const SEARCH_BLUR_MS: u64 = 150;

/// What the dropdown under the search box shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SearchPanel {
    #[default]
    Hidden,
    Message(String),
    Results(Vec<SearchSuggestion>),
}

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub query: String,
    pub panel: SearchPanel,
    pub(crate) debounce: Option<RequestToken>,
    pub(crate) blur: Option<RequestToken>,
    pub(crate) in_flight: Option<RequestToken>,
}

impl<R: SceneRenderer> Controller<R> {
    pub(super) fn search_text_changed(&mut self, text: String) {
        self.search.query = text;
        // Results for the previous text are no longer wanted.
        self.search.in_flight = None;
        let token = self.tokens.issue();
        self.search.debounce = Some(token);
        self.effects.push(Effect::Schedule {
            timer: Timer::SearchDebounce,
            token,
            delay_ms: SEARCH_DEBOUNCE_MS,
        });
    }

    pub(super) fn search_focus_lost(&mut self) {
        let token = self.tokens.issue();
        self.search.blur = Some(token);
        self.effects.push(Effect::Schedule {
            timer: Timer::SearchBlur,
            token,
            delay_ms: SEARCH_BLUR_MS,
        });
    }

    pub(super) fn search_timer_elapsed(&mut self, timer: Timer, token: RequestToken) {
        match timer {
            Timer::SearchDebounce if self.search.debounce == Some(token) => {
                self.search.debounce = None;
                self.run_search();
            }
            Timer::SearchBlur if self.search.blur == Some(token) => {
                self.search.blur = None;
                self.search.panel = SearchPanel::Hidden;
            }
            _ => {}
        }
    }

    pub(super) fn run_search(&mut self) {
        self.search.debounce = None;
        let query = self.search.query.trim().to_string();
        if query.is_empty() {
            self.search.in_flight = None;
            self.search.panel = SearchPanel::Hidden;
            return;
        }

        if let Some((lat, lng)) = parse_lat_lng(&query) {
            self.search.in_flight = None;
            self.scene.set_view_state(PartialViewState::center(lat, lng));
            self.set_status(format!("Camera centered on {lat:.5}, {lng:.5}"));
            self.search.panel = SearchPanel::Hidden;
            return;
        }

        let Some(provider) = self.geocoder.clone() else {
            self.set_status("No geocoding provider configured. Add Mapbox or Google API key.");
            self.search.panel = SearchPanel::Message(
                "No geocoder available. Set GEOPLACE_MAPBOX_ACCESS_TOKEN or GEOPLACE_GOOGLE_MAPS_API_KEY."
                    .to_string(),
            );
            return;
        };

        self.set_status(format!(
            "Searching for location via {}...",
            provider.label()
        ));
        let token = self.tokens.issue();
        self.search.in_flight = Some(token);
        self.effects.push(Effect::Geocode {
            token,
            provider,
            query,
        });
    }

    pub(super) fn geocode_completed(
        &mut self,
        token: RequestToken,
        result: Result<Vec<SearchSuggestion>, Error>,
    ) {
        if self.search.in_flight != Some(token) {
            tracing::debug!(?token, "Dropping stale geocoding response");
            return;
        }
        self.search.in_flight = None;

        let suggestions = match result {
            Ok(suggestions) => suggestions,
            Err(error) => {
                tracing::error!("Geocoding failed: {error}");
                let message = match &self.geocoder {
                    Some(provider) => provider.failure_message(&error),
                    None => error.to_string(),
                };
                self.set_status(message.clone());
                self.search.panel = SearchPanel::Message(message);
                return;
            }
        };

        let Some(first) = suggestions.first().cloned() else {
            self.set_status(
                "Unable to locate that address. Try latitude,longitude or refine your search.",
            );
            self.search.panel = SearchPanel::Message(
                "No results. Try a more specific address or lat,lng.".to_string(),
            );
            return;
        };

        self.search.panel = SearchPanel::Results(suggestions);
        self.scene
            .set_view_state(PartialViewState::center(first.lat, first.lng));
        self.set_status(format!("Camera centered on {}", first.label));
    }

    pub(super) fn search_result_chosen(&mut self, index: usize) {
        let SearchPanel::Results(results) = &self.search.panel else {
            return;
        };
        let Some(choice) = results.get(index).cloned() else {
            return;
        };
        self.scene
            .set_view_state(PartialViewState::center(choice.lat, choice.lng));
        self.set_status(format!("Camera centered on {}", choice.label));
        self.search.panel = SearchPanel::Hidden;
    }
}
