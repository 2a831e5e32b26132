use regex::RegexSet;

/// Known transcription-model artifacts produced on silence or noise.
/// A transcription matching any of these is treated as empty.
const ARTIFACT_PATTERNS: &[&str] = &[
    r"(?i)^thank you\.?$",
    r"(?i)^thanks\.?$",
    r"^תודה\.?$",
    r"^\.+$",
    r"(?i)^you$",
    r"(?i)^bye\.?$",
    r"(?i)^okay\.?$",
];

/// Filters degenerate transcription output before translation.
pub struct HallucinationFilter {
    patterns: RegexSet,
}

impl HallucinationFilter {
    pub fn new() -> Self {
        Self {
            patterns: RegexSet::new(ARTIFACT_PATTERNS).expect("artifact patterns compile"),
        }
    }

    /// Trims the raw transcription and returns it, or an empty string when
    /// the text is whitespace-only or matches a known artifact.
    pub fn clean<'a>(&self, raw: &'a str) -> &'a str {
        let trimmed = raw.trim();
        if trimmed.is_empty() || self.patterns.is_match(trimmed) {
            ""
        } else {
            trimmed
        }
    }
}

impl Default for HallucinationFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_real_speech_through() {
        let filter = HallucinationFilter::new();
        assert_eq!(filter.clean("שלום לכולם"), "שלום לכולם");
        assert_eq!(filter.clean("  Thank you all for coming  "), "Thank you all for coming");
    }

    #[test]
    fn drops_acknowledgement_artifacts() {
        let filter = HallucinationFilter::new();
        for artifact in ["Thank you.", "thanks", "תודה.", "you", "Bye.", "okay"] {
            assert_eq!(filter.clean(artifact), "", "expected {:?} to be dropped", artifact);
        }
    }

    #[test]
    fn drops_punctuation_and_whitespace() {
        let filter = HallucinationFilter::new();
        assert_eq!(filter.clean("..."), "");
        assert_eq!(filter.clean("   "), "");
        assert_eq!(filter.clean(""), "");
    }

    #[test]
    fn artifacts_must_match_the_whole_text() {
        let filter = HallucinationFilter::new();
        assert_eq!(filter.clean("thank you for the warm welcome"), "thank you for the warm welcome");
        assert_eq!(filter.clean("okay, let's begin"), "okay, let's begin");
    }
}
