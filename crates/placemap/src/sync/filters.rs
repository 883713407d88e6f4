use std::sync::Arc;

use tracing::debug;

use super::Event;
use crate::{
    filters::{FilterState, FilterValidator, Mode, RawFilters, Strategy, ValidationError},
    i18n::Translator,
};

/// A change made through a filter control.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterInput {
    Mode(String),
    Location {
        latitude: Option<f64>,
        longitude: Option<f64>,
        address: Option<String>,
    },
    ClearLocation,
    Radius(i64),
    ToggleTag(String),
    Featured(bool),
    Replace(RawFilters),
}

/// Owns the filter form.
///
/// Input comes straight from a visitor, so it is validated with
/// [`Strategy::Throw`]; a rejected change leaves the current filters intact
/// and is surfaced as a localized message.
pub struct FiltersComponent {
    validator: FilterValidator,
    translator: Arc<dyn Translator>,
    locale: String,
    state: FilterState,
    error: Option<ValidationError>,
}

impl FiltersComponent {
    pub fn new(
        validator: FilterValidator,
        initial: FilterState,
        translator: Arc<dyn Translator>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            validator,
            translator,
            locale: locale.into(),
            state: initial,
            error: None,
        }
    }

    pub const fn filters(&self) -> &FilterState {
        &self.state
    }

    pub const fn error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error
            .as_ref()
            .map(|e| e.localize(self.translator.as_ref(), &self.locale))
    }

    /// Applies one control change; emits `filters-updated` when the
    /// validated filters differ from the current ones.
    pub fn apply(&mut self, input: FilterInput) -> Vec<Event> {
        let mut raw = self.state.to_component_data();
        match input {
            FilterInput::Mode(mode) => {
                // Worldwide carries no point; a later switch back to proximity
                // starts from an empty location.
                if Mode::parse(&mode) == Some(Mode::Worldwide) {
                    raw.latitude = None;
                    raw.longitude = None;
                    raw.address = None;
                }
                raw.mode = Some(mode);
            }
            FilterInput::Location {
                latitude,
                longitude,
                address,
            } => {
                raw.latitude = latitude;
                raw.longitude = longitude;
                raw.address = address;
            }
            FilterInput::ClearLocation => {
                raw.latitude = None;
                raw.longitude = None;
                raw.address = None;
            }
            FilterInput::Radius(radius) => raw.radius = Some(radius),
            FilterInput::ToggleTag(tag) => {
                let slug = tag.trim().to_lowercase();
                if let Some(pos) = raw.tags.iter().position(|t| *t == slug) {
                    raw.tags.remove(pos);
                } else {
                    raw.tags.push(slug);
                }
            }
            FilterInput::Featured(featured) => raw.featured = Some(featured),
            FilterInput::Replace(replacement) => raw = replacement,
        }

        match self.validator.validate(&raw, Strategy::Throw) {
            Ok(next) => {
                self.error = None;
                if next == self.state {
                    return vec![];
                }
                self.state = next;
                vec![Event::FiltersUpdated {
                    filters: self.state.to_component_data(),
                }]
            }
            Err(e) => {
                debug!(error = %e, "Filter input rejected");
                self.error = Some(e);
                vec![]
            }
        }
    }
}
