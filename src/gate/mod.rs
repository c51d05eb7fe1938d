//! Language Gate: policy check applied after acquisition metadata arrives
//! and before any transcription cost is committed.

/// Outcome of the language gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    /// Route the item to `Skipped` - a policy decision, not an error.
    Reject,
}

/// Check the detected source language against the configured target.
///
/// Always passes when `bypass` is set. Passes when detection is unavailable:
/// source metadata is unreliable and blocking on it would skip valid content
/// (fail-open). Rejects only a known, differing language.
pub fn check(detected: Option<&str>, configured: &str, bypass: bool) -> GateDecision {
    if bypass {
        return GateDecision::Pass;
    }

    match detected {
        None => GateDecision::Pass,
        Some(detected) => {
            if primary_subtag(detected) == primary_subtag(configured) {
                GateDecision::Pass
            } else {
                GateDecision::Reject
            }
        }
    }
}

/// Compare languages by primary subtag so "en-US" matches "en".
fn primary_subtag(code: &str) -> String {
    code.split(['-', '_'])
        .next()
        .unwrap_or(code)
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bypass_always_passes() {
        assert_eq!(check(Some("ja"), "en", true), GateDecision::Pass);
        assert_eq!(check(None, "en", true), GateDecision::Pass);
        assert_eq!(check(Some("en"), "en", true), GateDecision::Pass);
    }

    #[test]
    fn unknown_detection_fails_open() {
        assert_eq!(check(None, "en", false), GateDecision::Pass);
    }

    #[test]
    fn known_mismatch_rejects() {
        assert_eq!(check(Some("ja"), "en", false), GateDecision::Reject);
        assert_eq!(check(Some("de"), "ja", false), GateDecision::Reject);
    }

    #[test]
    fn matching_language_passes() {
        assert_eq!(check(Some("ja"), "ja", false), GateDecision::Pass);
    }

    #[test]
    fn regional_variants_match_by_primary_subtag() {
        assert_eq!(check(Some("en-US"), "en", false), GateDecision::Pass);
        assert_eq!(check(Some("PT"), "pt_BR", false), GateDecision::Pass);
        assert_eq!(check(Some("en-US"), "ja", false), GateDecision::Reject);
    }
}
