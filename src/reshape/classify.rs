//! Ordered keyword-bucket classification.
//!
//! Buckets are tried top to bottom against the lower-cased text; the first
//! bucket with any matching keyword wins. Order encodes priority: more severe or
//! more specific buckets come first.

/// A label and the keywords that select it.
pub type Bucket = (&'static str, &'static [&'static str]);

#[derive(Debug, Clone, Copy)]
pub struct KeywordClassifier {
    buckets: &'static [Bucket],
    fallback: &'static str,
}

impl KeywordClassifier {
    pub const fn new(buckets: &'static [Bucket], fallback: &'static str) -> Self {
        KeywordClassifier { buckets, fallback }
    }

    /// Classifies the space-joined, lower-cased `fields`.
    pub fn classify(&self, fields: &[&str]) -> &'static str {
        let text = fields.join(" ").to_lowercase();
        self.buckets
            .iter()
            .find(|(_, keywords)| contains_any(&text, keywords))
            .map(|(label, _)| *label)
            .unwrap_or(self.fallback)
    }
}

pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

// Maritime incident severity.

const CRITICAL_EVENT_WORDS: &[&str] = &["fatal", "death", "foundered", "sinking"];
const CRITICAL_DESCRIPTION_WORDS: &[&str] = &["fatal", "death", "foundered"];

const SEVERITY_BUCKETS: &[Bucket] = &[
    (
        "Major",
        &["collision", "grounding", "fire", "explosion", "capsize", "flooding", "structural"],
    ),
    (
        "Moderate",
        &["contact", "near miss", "mechanical", "propulsion", "equipment"],
    ),
];

/// Buckets tested after the critical and injury checks.
pub const SEVERITY: KeywordClassifier = KeywordClassifier::new(SEVERITY_BUCKETS, "Minor");

/// `Critical`, `Major`, `Moderate` or `Minor`.
///
/// Critical keywords in either field beat the injury count; any injury beats
/// the remaining keyword buckets.
pub fn incident_severity(what_happened: &str, injured: Option<f64>, description: &str) -> &'static str {
    let what = what_happened.to_lowercase();
    if contains_any(&what, CRITICAL_EVENT_WORDS)
        || contains_any(&description.to_lowercase(), CRITICAL_DESCRIPTION_WORDS)
    {
        return "Critical";
    }
    if injured.is_some_and(|n| n > 0.0) {
        return "Major";
    }
    SEVERITY.classify(&[&what])
}

// Event categories.

const EVENT_BUCKETS: &[Bucket] = &[
    (
        "Music & Performance",
        &["jazz", "concert", "music", "performance", "orchestra", "band", "singing"],
    ),
    (
        "Arts & Culture",
        &["art", "craft", "exhibition", "gallery", "culture", "museum", "drawing", "painting"],
    ),
    (
        "Sports & Recreation",
        &["sport", "volleyball", "skateboard", "training", "fitness", "gym", "recreation"],
    ),
    (
        "Comedy & Entertainment",
        &["comedy", "comedian", "laugh", "entertainment", "magic", "illusionist"],
    ),
    (
        "Food & Dining",
        &["food", "dining", "restaurant", "cuisine", "chef", "cooking", "market"],
    ),
    (
        "Education & Workshops",
        &["workshop", "class", "learn", "training", "education", "course", "tutorial"],
    ),
    (
        "Family & Children",
        &["children", "kids", "family", "youth", "teens", "playground"],
    ),
    (
        "Health & Wellness",
        &["yoga", "wellness", "health", "meditation", "therapy", "healing"],
    ),
    (
        "Business & Professional",
        &["business", "professional", "networking", "conference", "meeting"],
    ),
    (
        "Film & Cinema",
        &["film", "movie", "cinema", "screening", "documentary"],
    ),
];

pub const EVENT_CATEGORY: KeywordClassifier = KeywordClassifier::new(EVENT_BUCKETS, "Other");

// -- Tests -------------------------------------------------------------------
