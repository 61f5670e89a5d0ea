//! §4.5 plan-mode detector: classifies a user prompt against explicit markers, an
//! environment override, scored planning keywords, and session-persisted state, in that order.

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;

use super::context::{PlanModeContext, PlanModeSource};

const EXPLICIT_CONFIDENCE: f64 = 1.0;
const ENV_CONFIDENCE: f64 = 1.0;
const KEYWORD_BASE_CONFIDENCE: f64 = 0.7;
const BOOSTER_INCREMENT: f64 = 0.1;
const BOOSTER_CAP: f64 = 0.3;
const NEGATIVE_DECREMENT: f64 = 0.15;
const DEFAULT_THRESHOLD: f64 = 0.6;
const ENV_VAR_NAME: &str = "CLAUDE_PLAN_MODE";

const EXPLICIT_MARKERS: &[&str] = &["@agent-plan", "@plan", "--plan", "plan mode"];

static PLANNING_VERB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(create|make|write|design|implement|develop|draft|formulate)\s+(a\s+)?(\w+\s+){0,3}plan\b").unwrap()
});

static BOOSTER_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"step[- ]by[- ]step", r"phases?", r"milestones?", r"tasks?", r"timeline", r"roadmap"]
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
        .collect()
});

static NEGATIVE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"execute", r"\brun\b", r"\bapply\b", r"implement this", r"\bdo it\b", r"start coding", r"write the code"]
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
        .collect()
});

/// One detection pass's outcome (§3 "Detection result").
#[derive(Debug, Clone, PartialEq)]
pub struct PlanModeDetectionResult {
    pub is_plan_mode: bool,
    pub confidence: f64,
    pub source: Option<PlanModeSource>,
    pub detected_markers: Vec<String>,
    pub detection_time: Duration,
}

#[derive(Debug, Clone)]
pub struct PlanModeDetector {
    pub confidence_threshold: f64,
}

impl Default for PlanModeDetector {
    fn default() -> Self {
        Self { confidence_threshold: DEFAULT_THRESHOLD }
    }
}

impl PlanModeDetector {
    /// Checks, in order: explicit markers, the `CLAUDE_PLAN_MODE` environment override,
    /// scored planning keywords, then (if `prior_context` is still active) session
    /// persistence. First success wins.
    pub fn detect(&self, prompt: &str, prior_context: Option<&PlanModeContext>) -> PlanModeDetectionResult {
        let started = Instant::now();

        if let Some(markers) = self.matched_explicit_markers(prompt) {
            return PlanModeDetectionResult {
                is_plan_mode: true,
                confidence: EXPLICIT_CONFIDENCE,
                source: Some(PlanModeSource::ExplicitMarker),
                detected_markers: markers,
                detection_time: started.elapsed(),
            };
        }

        if env_override_is_truthy() {
            return PlanModeDetectionResult {
                is_plan_mode: true,
                confidence: ENV_CONFIDENCE,
                source: Some(PlanModeSource::EnvironmentVar),
                detected_markers: Vec::new(),
                detection_time: started.elapsed(),
            };
        }

        let keyword_score = self.keyword_confidence(prompt);
        if keyword_score >= self.confidence_threshold {
            return PlanModeDetectionResult {
                is_plan_mode: true,
                confidence: keyword_score,
                source: Some(PlanModeSource::PlanningKeyword),
                detected_markers: Vec::new(),
                detection_time: started.elapsed(),
            };
        }

        if let Some(ctx) = prior_context {
            if ctx.is_active {
                return PlanModeDetectionResult {
                    is_plan_mode: true,
                    confidence: ctx.confidence,
                    source: Some(PlanModeSource::SessionPersisted),
                    detected_markers: ctx.detected_markers.clone(),
                    detection_time: started.elapsed(),
                };
            }
        }

        PlanModeDetectionResult {
            is_plan_mode: false,
            confidence: keyword_score.max(0.0),
            source: None,
            detected_markers: Vec::new(),
            detection_time: started.elapsed(),
        }
    }

    /// On a positive detection, activates an inactive context or increments turn count on an
    /// already-active one. A negative detection leaves the context untouched -- deactivation
    /// is only ever explicit (§4.5).
    pub fn update_context(&self, result: &PlanModeDetectionResult, mut context: PlanModeContext, now: f64) -> PlanModeContext {
        if !result.is_plan_mode {
            return context;
        }
        let Some(source) = result.source else { return context };
        if context.is_active {
            context.increment_turn();
        } else {
            context.activate(source, result.confidence, result.detected_markers.clone(), now);
        }
        context
    }

    fn matched_explicit_markers(&self, prompt: &str) -> Option<Vec<String>> {
        let lower = prompt.to_ascii_lowercase();
        let matched: Vec<String> = EXPLICIT_MARKERS.iter().filter(|m| lower.contains(*m)).map(|m| m.to_string()).collect();
        if matched.is_empty() {
            None
        } else {
            Some(matched)
        }
    }

    fn keyword_confidence(&self, prompt: &str) -> f64 {
        if !PLANNING_VERB_RE.is_match(prompt) {
            return 0.0;
        }
        let mut score = KEYWORD_BASE_CONFIDENCE;
        let boost: f64 = BOOSTER_RES.iter().filter(|re| re.is_match(prompt)).count() as f64 * BOOSTER_INCREMENT;
        score += boost.min(BOOSTER_CAP);
        let negatives: f64 = NEGATIVE_RES.iter().filter(|re| re.is_match(prompt)).count() as f64 * NEGATIVE_DECREMENT;
        score -= negatives;
        score.clamp(0.0, 1.0)
    }
}

fn env_override_is_truthy() -> bool {
    match std::env::var(ENV_VAR_NAME) {
        Ok(val) => matches!(val.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on"),
        Err(_) => false,
    }
}

/// Convenience wrapper mirroring the original module-level `detect_plan_mode`: runs detection
/// then folds the result into an updated context in one call.
pub fn detect_plan_mode(
    detector: &PlanModeDetector,
    prompt: &str,
    context: PlanModeContext,
    now: f64,
) -> (PlanModeDetectionResult, PlanModeContext) {
    let result = detector.detect(prompt, Some(&context));
    let updated = detector.update_context(&result, context, now);
    (result, updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_marker_scores_full_confidence() {
        let detector = PlanModeDetector::default();
        let result = detector.detect("@plan Create a feature plan", None);
        assert!(result.is_plan_mode);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.source, Some(PlanModeSource::ExplicitMarker));
        assert_eq!(result.detected_markers, vec!["@plan".to_string()]);
    }

    #[test]
    fn planning_keywords_with_boosters_score_highly() {
        let detector = PlanModeDetector::default();
        let result = detector.detect("Create a plan with phases and milestones", None);
        assert!(result.is_plan_mode);
        assert!(result.confidence >= 0.9 && result.confidence <= 1.0);
        assert_eq!(result.source, Some(PlanModeSource::PlanningKeyword));
    }

    #[test]
    fn negative_terms_suppress_detection() {
        let detector = PlanModeDetector::default();
        let result = detector.detect("Execute the plan now", None);
        assert!(!result.is_plan_mode);
    }

    #[test]
    fn session_persistence_is_checked_last() {
        let detector = PlanModeDetector::default();
        let mut ctx = PlanModeContext::new("sess-1");
        ctx.activate(PlanModeSource::ExplicitMarker, 1.0, vec!["@plan".to_string()], 0.0);
        let result = detector.detect("continue with the next step", Some(&ctx));
        assert!(result.is_plan_mode);
        assert_eq!(result.source, Some(PlanModeSource::SessionPersisted));
    }

    #[test]
    fn update_context_activates_inactive_context() {
        let detector = PlanModeDetector::default();
        let result = detector.detect("@plan Create a feature plan", None);
        let ctx = detector.update_context(&result, PlanModeContext::default(), 42.0);
        assert!(ctx.is_active);
        assert_eq!(ctx.turn_count, 1);
        assert_eq!(ctx.activated_at, Some(42.0));
    }

    #[test]
    fn update_context_increments_turn_on_active_context() {
        let detector = PlanModeDetector::default();
        let mut ctx = PlanModeContext::default();
        ctx.activate(PlanModeSource::PlanningKeyword, 0.8, vec![], 1.0);
        let result = detector.detect("Create a plan with phases", Some(&ctx));
        let ctx = detector.update_context(&result, ctx, 2.0);
        assert_eq!(ctx.turn_count, 2);
    }
}
