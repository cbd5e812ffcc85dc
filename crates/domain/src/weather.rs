//! Weather snapshot fetched periodically from the hub.

/// Latest weather reading.
///
/// Whole-value replace semantics: a poll either updates every field or none.
/// `valid` stays `false` until the first successful poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherState {
    pub temperature_c: f32,
    pub condition: String,
    pub valid: bool,
}
