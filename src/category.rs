//! Label colour → category normalization.
//!
//! Rules are checked in a fixed order and the first hit wins, so text that
//! mentions several colours resolves to the highest-priority one
//! (green, then red, then yellow).

use crate::models::Category;

const RULES: &[(Category, &[&str])] = &[
    (
        Category::AgricultureGreen,
        &["verde", "green", "agricultur"],
    ),
    (
        Category::ConstructionRed,
        &["rojo", "construcción", "construccion", "construction"],
    ),
    (
        Category::PaintYellow,
        &["amarillo", "pintura", "yellow", "paint"],
    ),
];

/// Map freeform text to one of the four fixed categories.
///
/// Matching is a case-insensitive substring test. Text that matches no
/// rule is [`Category::Uncategorized`].
pub fn normalize_category(text: &str) -> Category {
    let lower = text.to_lowercase();

    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Uncategorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spanish_labels() {
        assert_eq!(normalize_category("Rojo - Construcción"), Category::ConstructionRed);
        assert_eq!(normalize_category("Verde-Agricultura"), Category::AgricultureGreen);
        assert_eq!(normalize_category("AMARILLO"), Category::PaintYellow);
        assert_eq!(normalize_category("CONSTRUCCIÓN"), Category::ConstructionRed);
        assert_eq!(normalize_category("agricultura"), Category::AgricultureGreen);
        assert_eq!(normalize_category("Agricultural supplies"), Category::AgricultureGreen);
    }

    #[test]
    fn test_no_match() {
        assert_eq!(normalize_category("azul"), Category::Uncategorized);
        assert_eq!(normalize_category(""), Category::Uncategorized);
    }

    #[test]
    fn test_green_outranks_other_colours() {
        assert_eq!(
            normalize_category("Etiqueta roja con borde verde"),
            Category::AgricultureGreen
        );
        assert_eq!(
            normalize_category("pintura para construccion"),
            Category::ConstructionRed
        );
    }
}
