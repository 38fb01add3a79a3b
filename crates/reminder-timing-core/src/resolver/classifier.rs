//! Narrow-therapeutic-index medication classifier.
//!
//! Matching is plain substring containment against a lower-cased name, so
//! "TACROLIMUS 1mg" and "tacrolimus er" both match the `tacrolimus` fragment.

use crate::models::ReminderCriticality;

/// Built-in name fragments for time-sensitive medications, generic and brand.
pub const DEFAULT_TIME_SENSITIVE_FRAGMENTS: &[&str] = &[
    // Immunosuppressants
    "tacrolimus",
    "prograf",
    "envarsus",
    "astagraf",
    "cyclosporine",
    "ciclosporin",
    "neoral",
    "sandimmune",
    "gengraf",
    "sirolimus",
    "rapamune",
    "everolimus",
    "zortress",
    "mycophenol",
    "cellcept",
    "myfortic",
    // Anticoagulants
    "warfarin",
    "coumadin",
    "jantoven",
    // Anti-epileptics
    "phenytoin",
    "dilantin",
    "carbamazepine",
    "tegretol",
    "valproate",
    "valproic",
    "depakote",
    "phenobarbital",
    // Others
    "lithium",
    "digoxin",
    "lanoxin",
    "levothyroxine",
    "synthroid",
    "theophylline",
];

/// Classifies medication names as standard or time-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalityClassifier {
    fragments: Vec<String>,
}

impl Default for CriticalityClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CriticalityClassifier {
    /// Classifier over [`DEFAULT_TIME_SENSITIVE_FRAGMENTS`].
    pub fn new() -> Self {
        Self::from_fragments(DEFAULT_TIME_SENSITIVE_FRAGMENTS)
    }

    /// Classifier over a custom table. Fragments are normalized with [`normalize_fragments`].
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fragments: normalize_fragments(fragments),
        }
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Classify a medication name. Missing or blank names are standard.
    pub fn classify(&self, medication_name: Option<&str>) -> ReminderCriticality {
        if self.matching_fragment(medication_name).is_some() {
            ReminderCriticality::TimeSensitive
        } else {
            ReminderCriticality::Standard
        }
    }

    /// First table fragment contained in the name.
    pub fn matching_fragment(&self, medication_name: Option<&str>) -> Option<&str> {
        let name = medication_name?.trim().to_lowercase();
        if name.is_empty() {
            return None;
        }

        self.fragments
            .iter()
            .find(|fragment| name.contains(fragment.as_str()))
            .map(String::as_str)
    }
}

/// Trim and lower-case fragments, dropping blanks and duplicates. Order is kept.
pub fn normalize_fragments<I, S>(fragments: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for fragment in fragments {
        let fragment = fragment.as_ref().trim().to_lowercase();
        if fragment.is_empty() || normalized.contains(&fragment) {
            continue;
        }
        normalized.push(fragment);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_is_case_insensitive() {
        let classifier = CriticalityClassifier::new();

        assert_eq!(
            classifier.classify(Some("TACROLIMUS 1mg")),
            ReminderCriticality::TimeSensitive
        );
        assert_eq!(
            classifier.classify(Some("tacrolimus")),
            ReminderCriticality::TimeSensitive
        );
        assert_eq!(
            classifier.classify(Some("  Warfarin Sodium 5 MG ")),
            ReminderCriticality::TimeSensitive
        );
    }

    #[test]
    fn test_classify_brand_names() {
        let classifier = CriticalityClassifier::new();

        assert_eq!(classifier.matching_fragment(Some("Prograf XL")), Some("prograf"));
        assert_eq!(classifier.matching_fragment(Some("Depakote ER 500")), Some("depakote"));
        assert_eq!(
            classifier.matching_fragment(Some("Mycophenolate mofetil")),
            Some("mycophenol")
        );
    }

    #[test]
    fn test_classify_standard() {
        let classifier = CriticalityClassifier::new();

        assert_eq!(classifier.classify(Some("Metformin")), ReminderCriticality::Standard);
        assert_eq!(classifier.classify(Some("Vitamin D3")), ReminderCriticality::Standard);
        assert_eq!(classifier.classify(Some("")), ReminderCriticality::Standard);
        assert_eq!(classifier.classify(Some("   ")), ReminderCriticality::Standard);
        assert_eq!(classifier.classify(None), ReminderCriticality::Standard);
    }

    #[test]
    fn test_classify_is_repeatable() {
        let classifier = CriticalityClassifier::new();

        let first = classifier.classify(Some("Lithium carbonate"));
        for _ in 0..3 {
            assert_eq!(classifier.classify(Some("Lithium carbonate")), first);
        }
    }

    #[test]
    fn test_custom_fragments() {
        let classifier = CriticalityClassifier::from_fragments([" Insulin ", "insulin", "", "HEPARIN"]);

        assert_eq!(classifier.fragments(), &["insulin".to_string(), "heparin".to_string()]);
        assert_eq!(
            classifier.classify(Some("Heparin flush")),
            ReminderCriticality::TimeSensitive
        );
        assert_eq!(classifier.classify(Some("Tacrolimus")), ReminderCriticality::Standard);
    }
}
