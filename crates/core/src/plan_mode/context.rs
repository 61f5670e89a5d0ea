//! §3 "Plan-mode context": persists across prompts within one session, activated on a positive
//! detection and deactivated only explicitly.

use serde::{Deserialize, Serialize};

/// Which of the four detection sources (§4.5) produced a positive result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanModeSource {
    ExplicitMarker,
    PlanningKeyword,
    EnvironmentVar,
    SessionPersisted,
}

/// Mutable, serialisable state a caller persists between prompts in one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanModeContext {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub source: Option<PlanModeSource>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub activated_at: Option<f64>,
    #[serde(default)]
    pub detected_markers: Vec<String>,
    #[serde(default)]
    pub turn_count: u32,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl Default for PlanModeContext {
    fn default() -> Self {
        Self {
            is_active: false,
            source: None,
            confidence: 0.0,
            activated_at: None,
            detected_markers: Vec::new(),
            turn_count: 0,
            session_id: None,
        }
    }
}

impl PlanModeContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Default::default()
        }
    }

    /// Activates on a positive detection. When the context was already active, a fresh
    /// `activate()` call (source/confidence may differ) resets the turn count to 1 -- only
    /// [`Self::increment_turn`] preserves it, matching §4.5's "on positive result where the
    /// context was inactive, activate it... and set turn count to 1".
    pub fn activate(&mut self, source: PlanModeSource, confidence: f64, markers: Vec<String>, now: f64) {
        self.is_active = true;
        self.source = Some(source);
        self.confidence = confidence;
        self.activated_at = Some(now);
        self.detected_markers = markers;
        self.turn_count = 1;
    }

    pub fn increment_turn(&mut self) {
        self.turn_count += 1;
    }

    /// Clears activity/source/confidence/markers. `turn_count` and `session_id` are left
    /// untouched (§4.5: a caller restarting plan mode immediately after an explicit
    /// deactivation resumes the same session id, not a spuriously-reset turn counter).
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.source = None;
        self.confidence = 0.0;
        self.activated_at = None;
        self.detected_markers = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activate_sets_turn_count_to_one() {
        let mut ctx = PlanModeContext::default();
        ctx.activate(PlanModeSource::ExplicitMarker, 1.0, vec!["@plan".to_string()], 100.0);
        assert!(ctx.is_active);
        assert_eq!(ctx.turn_count, 1);
        assert_eq!(ctx.activated_at, Some(100.0));
    }

    #[test]
    fn increment_turn_preserves_other_fields() {
        let mut ctx = PlanModeContext::default();
        ctx.activate(PlanModeSource::PlanningKeyword, 0.8, vec![], 100.0);
        ctx.increment_turn();
        ctx.increment_turn();
        assert_eq!(ctx.turn_count, 3);
        assert!(ctx.is_active);
    }

    #[test]
    fn deactivate_preserves_turn_count_and_session_id() {
        let mut ctx = PlanModeContext::new("sess-1");
        ctx.activate(PlanModeSource::ExplicitMarker, 1.0, vec!["@plan".to_string()], 100.0);
        ctx.increment_turn();
        ctx.deactivate();
        assert!(!ctx.is_active);
        assert!(ctx.source.is_none());
        assert_eq!(ctx.turn_count, 2);
        assert_eq!(ctx.session_id.as_deref(), Some("sess-1"));
    }

    #[test]
    fn round_trips_through_json() {
        let mut ctx = PlanModeContext::new("sess-1");
        ctx.activate(PlanModeSource::EnvironmentVar, 1.0, vec![], 5.0);
        let json = serde_json::to_string(&ctx).unwrap();
        let back: PlanModeContext = serde_json::from_str(&json).unwrap();
        assert_eq!(ctx, back);
    }

    #[test]
    fn missing_fields_default_on_deserialize() {
        let ctx: PlanModeContext = serde_json::from_str("{}").unwrap();
        assert_eq!(ctx, PlanModeContext::default());
    }
}
