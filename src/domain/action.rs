//! Action label normalization.
//!
//! Detections and ground truth name actions in slightly different ways
//! ("Add Food", "add food", "add-food"). Everything is reduced to a
//! lower-case hyphenated slug before counting or matching.

/// Alternate phrasings and the canonical slug they count as. Keys are
/// already hyphenated; no canonical slug appears as a key.
const SYNONYMS: &[(&str, &str)] = &[
    ("add-ingredient", "add-food"),
    ("add-ingredients", "add-food"),
    ("remove-ingredient", "remove-food"),
    ("remove-ingredients", "remove-food"),
    ("place-pan", "add-pan"),
    ("put-lid-on", "add-lid"),
    ("take-lid-off", "remove-lid"),
    ("flip-food", "flip"),
    ("add-seasoning", "season"),
    ("stir-food", "stir"),
];

/// Reduce an action label to its canonical slug.
///
/// Lower-cases, trims, joins whitespace-separated words with single hyphens
/// and then applies the synonym table. Idempotent.
pub fn normalize_action(action: &str) -> String {
    let slug = action
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");

    match SYNONYMS.iter().find(|(from, _)| *from == slug) {
        Some((_, to)) => (*to).to_string(),
        None => slug,
    }
}

/// Permissive label comparison used by the matcher.
///
/// Two normalized labels intersect when they are equal or either contains
/// the other. An empty label never intersects anything.
pub fn labels_intersect(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(b) || b.contains(a)
}
