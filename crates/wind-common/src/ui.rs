//! UI state payload produced for the host collaborator.

use serde::{Deserialize, Serialize};

/// Coarse status of the overlay pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Off,
    Idle,
    Loading,
    Ok,
    Warn,
    Error,
}

/// The full state snapshot emitted to the host UI.
///
/// Emission is de-duplicated by serialized content: two snapshots
/// with equal JSON signatures are the same emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub enabled: bool,
    pub status_text: String,
    pub status_level: StatusLevel,
    pub forecast_text: String,
    pub offset_hours: u32,
    pub density_level: u8,
    pub effective_density_level: u8,
    pub last_error: Option<String>,
}

impl UiState {
    /// Content signature used for emission de-duplication.
    pub fn signature(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// De-duplicating emitter: `push` yields the state only when its
/// serialized payload changed since the last emission.
#[derive(Debug, Default)]
pub struct UiEmitter {
    last_signature: String,
}

impl UiEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, state: &UiState) -> Option<UiState> {
        let signature = state.signature();
        if signature == self.last_signature {
            return None;
        }
        self.last_signature = signature;
        Some(state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> UiState {
        UiState {
            enabled: true,
            status_text: "Wind overlay active.".to_string(),
            status_level: StatusLevel::Ok,
            forecast_text: "Forecast: Mon 14:00".to_string(),
            offset_hours: 0,
            density_level: 5,
            effective_density_level: 5,
            last_error: None,
        }
    }

    #[test]
    fn emitter_suppresses_identical_payloads() {
        let mut emitter = UiEmitter::new();
        let state = sample_state();

        assert!(emitter.push(&state).is_some());
        assert!(emitter.push(&state).is_none());

        let mut changed = state.clone();
        changed.status_level = StatusLevel::Warn;
        assert!(emitter.push(&changed).is_some());
    }

    #[test]
    fn status_level_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&StatusLevel::Loading).unwrap(),
            "\"loading\""
        );
    }
}
