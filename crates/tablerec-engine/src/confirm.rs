//! Confirmation prompt generation.
//!
//! Summarizes extracted preferences as a bullet list the user can confirm
//! or correct before a recommendation task starts.

use tablerec_core::types::{ConfirmationRequest, Preferences};

fn type_display(key: &str) -> &str {
    match key {
        "casual" => "Casual Dining",
        "fine-dining" => "Fine Dining",
        "fast-casual" => "Fast Casual",
        "street-food" => "Street Food",
        "buffet" => "Buffet",
        "cafe" => "Cafe",
        other => other,
    }
}

fn flavor_display(key: &str) -> &str {
    match key {
        "spicy" => "Spicy",
        "savory" => "Savory",
        "sweet" => "Sweet",
        "sour" => "Sour",
        "mild" => "Mild",
        other => other,
    }
}

fn purpose_display(key: &str) -> &str {
    match key {
        "date-night" => "Date Night",
        "family" => "Family Dining",
        "business" => "Business Meeting",
        "solo" => "Solo Dining",
        "friends" => "Friends Gathering",
        "celebration" => "Celebration",
        other => other,
    }
}

/// Build the confirmation prompt text for a query and its extracted
/// preferences. Only concrete facets get a bullet; when nothing was
/// extracted a default bullet block is shown instead.
pub fn confirmation_prompt(query: &str, preferences: &Preferences) -> String {
    let mut parts = Vec::new();

    if preferences.has_types() {
        let types: Vec<&str> = preferences
            .restaurant_types
            .iter()
            .map(|t| type_display(t))
            .collect();
        parts.push(format!("\u{2022} Restaurant Type: {}", types.join(", ")));
    }

    if preferences.has_flavors() {
        let flavors: Vec<&str> = preferences
            .flavor_profiles
            .iter()
            .map(|f| flavor_display(f))
            .collect();
        parts.push(format!("\u{2022} Flavor Profile: {}", flavors.join(", ")));
    }

    if preferences.has_purpose() {
        parts.push(format!(
            "\u{2022} Dining Purpose: {}",
            purpose_display(&preferences.dining_purpose)
        ));
    }

    let budget = &preferences.budget_range;
    match (budget.min, budget.max) {
        (Some(min), Some(max)) => {
            parts.push(format!(
                "\u{2022} Budget Range: {}-{} SGD per person",
                min, max
            ));
        }
        (Some(min), None) => {
            parts.push(format!("\u{2022} Minimum Budget: {} SGD per person", min));
        }
        (None, Some(max)) => {
            parts.push(format!("\u{2022} Maximum Budget: {} SGD per person", max));
        }
        (None, None) => {}
    }

    if preferences.has_location() {
        parts.push(format!("\u{2022} Location: {}", preferences.location));
    }

    if parts.is_empty() {
        parts = vec![
            "\u{2022} Restaurant Type: Any".to_string(),
            "\u{2022} Flavor Profile: Any".to_string(),
            "\u{2022} Dining Purpose: Any".to_string(),
            "\u{2022} Budget Range: 20-60 SGD per person".to_string(),
            "\u{2022} Location: Any".to_string(),
        ];
    }

    format!(
        "Based on your query '{}', I understand you want:\n\n{}\n\nIs this correct?",
        query,
        parts.join("\n")
    )
}

/// Build a full confirmation request for the given query and preferences.
pub fn confirmation_request(query: &str, preferences: &Preferences) -> ConfirmationRequest {
    ConfirmationRequest {
        message: confirmation_prompt(query, preferences),
        preferences: preferences.clone(),
        needs_confirmation: true,
    }
}
