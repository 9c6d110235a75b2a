//! Preference extraction from free-text queries.
//!
//! Keyword tables cover restaurant types, flavor profiles, and dining
//! purpose; regexes cover budgets; a known-area list covers location.
//! Facets the query does not mention fall back to the user's stored
//! profile during merge.

use regex::Regex;
use std::sync::LazyLock;

use tablerec_core::types::{BudgetRange, Preferences};

const TYPE_KEYWORDS: &[(&str, &[&str])] = &[
    ("casual", &["casual", "relaxed", "informal", "everyday"]),
    (
        "fine-dining",
        &["fine dining", "fancy", "elegant", "upscale", "romantic", "special occasion"],
    ),
    ("fast-casual", &["fast casual", "quick", "grab and go"]),
    ("street-food", &["street food", "hawker", "food court", "local"]),
    ("buffet", &["buffet", "all you can eat", "unlimited"]),
    ("cafe", &["cafe", "coffee", "brunch", "light meal"]),
];

const FLAVOR_KEYWORDS: &[(&str, &[&str])] = &[
    ("spicy", &["spicy", "hot", "chili", "sichuan", "thai", "indian", "korean"]),
    ("savory", &["savory", "umami", "meaty", "rich"]),
    ("sweet", &["sweet", "dessert", "cake", "chocolate"]),
    ("sour", &["sour", "tangy", "citrus", "vinegar"]),
    ("mild", &["mild", "gentle", "subtle", "light"]),
];

const PURPOSE_KEYWORDS: &[(&str, &[&str])] = &[
    ("date-night", &["date", "romantic", "anniversary", "valentine", "couple"]),
    ("family", &["family", "kids", "children", "parents"]),
    ("business", &["business", "meeting", "client", "professional"]),
    ("solo", &["solo", "alone", "myself", "personal"]),
    ("friends", &["friends", "group", "party", "celebration"]),
    ("celebration", &["celebration", "birthday", "graduation", "promotion"]),
];

const KNOWN_AREAS: &[&str] = &[
    "orchard",
    "marina bay",
    "chinatown",
    "bugis",
    "tanjong pagar",
    "clarke quay",
    "little india",
    "holland village",
    "tiong bahru",
    "katong",
    "joo chiat",
    "downtown",
    "cbd",
    "central",
];

struct BudgetPatterns {
    dollar_amount: Regex,
    range: Regex,
    under: Regex,
    around: Regex,
    budget: Regex,
}

static BUDGET_PATTERNS: LazyLock<BudgetPatterns> = LazyLock::new(|| BudgetPatterns {
    dollar_amount: Regex::new(r"\$+\s*(\d+)").expect("Invalid budget regex"),
    range: Regex::new(r"(\d+)\s*to\s*(\d+)").expect("Invalid budget regex"),
    under: Regex::new(r"under\s*(\d+)").expect("Invalid budget regex"),
    around: Regex::new(r"around\s*(\d+)").expect("Invalid budget regex"),
    budget: Regex::new(r"budget\s*(\d+)").expect("Invalid budget regex"),
});

/// Preferences as mentioned by a single query, before merging with the
/// user's stored profile. Empty or `None` fields were not mentioned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPreferences {
    pub restaurant_types: Vec<String>,
    pub flavor_profiles: Vec<String>,
    pub dining_purpose: Option<String>,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
    pub location: Option<String>,
}

/// Extract the preference facets a query mentions.
pub fn extract_preferences(query: &str) -> ExtractedPreferences {
    let query_lower = query.to_lowercase();
    let mut extracted = ExtractedPreferences::default();

    for (type_key, keywords) in TYPE_KEYWORDS {
        if keywords.iter().any(|k| query_lower.contains(k)) {
            extracted.restaurant_types.push((*type_key).to_string());
        }
    }

    for (flavor_key, keywords) in FLAVOR_KEYWORDS {
        if keywords.iter().any(|k| query_lower.contains(k)) {
            extracted.flavor_profiles.push((*flavor_key).to_string());
        }
    }

    for (purpose_key, keywords) in PURPOSE_KEYWORDS {
        if keywords.iter().any(|k| query_lower.contains(k)) {
            extracted.dining_purpose = Some((*purpose_key).to_string());
            break;
        }
    }

    (extracted.budget_min, extracted.budget_max) = extract_budget(&query_lower);

    for area in KNOWN_AREAS {
        if query_lower.contains(area) {
            extracted.location = Some(title_case(area));
            break;
        }
    }

    extracted
}

/// First matching budget pattern wins.
///
/// "N to M" sets both bounds, "under N" only the upper bound, and a single
/// amount ("around N", "budget N", "$N") becomes the range [N, N+20].
fn extract_budget(query_lower: &str) -> (Option<i64>, Option<i64>) {
    let p = &*BUDGET_PATTERNS;

    if let Some(caps) = p.dollar_amount.captures(query_lower) {
        if let Some(amount) = parse_amount(&caps, 1) {
            return (Some(amount), Some(amount + 20));
        }
    }
    if let Some(caps) = p.range.captures(query_lower) {
        if let (Some(min), Some(max)) = (parse_amount(&caps, 1), parse_amount(&caps, 2)) {
            return (Some(min), Some(max));
        }
    }
    if let Some(caps) = p.under.captures(query_lower) {
        if let Some(amount) = parse_amount(&caps, 1) {
            return (None, Some(amount));
        }
    }
    if let Some(caps) = p.around.captures(query_lower) {
        if let Some(amount) = parse_amount(&caps, 1) {
            return (Some(amount), Some(amount + 20));
        }
    }
    if let Some(caps) = p.budget.captures(query_lower) {
        if let Some(amount) = parse_amount(&caps, 1) {
            return (Some(amount), Some(amount + 20));
        }
    }

    (None, None)
}

fn parse_amount(caps: &regex::Captures<'_>, group: usize) -> Option<i64> {
    caps.get(group).and_then(|m| m.as_str().parse().ok())
}

/// Merge extracted facets with the user's stored profile.
///
/// Facets the query mentioned win; the rest come from the stored profile.
pub fn merge_preferences(extracted: &ExtractedPreferences, stored: &Preferences) -> Preferences {
    let restaurant_types = if extracted.restaurant_types.is_empty() {
        stored.restaurant_types.clone()
    } else {
        extracted.restaurant_types.clone()
    };

    let flavor_profiles = if extracted.flavor_profiles.is_empty() {
        stored.flavor_profiles.clone()
    } else {
        extracted.flavor_profiles.clone()
    };

    let dining_purpose = extracted
        .dining_purpose
        .clone()
        .unwrap_or_else(|| stored.dining_purpose.clone());

    let budget_range = if extracted.budget_min.is_none() && extracted.budget_max.is_none() {
        stored.budget_range.clone()
    } else {
        BudgetRange {
            min: extracted.budget_min,
            max: extracted.budget_max,
            currency: stored.budget_range.currency.clone(),
            per: stored.budget_range.per.clone(),
        }
    };

    let location = extracted
        .location
        .clone()
        .unwrap_or_else(|| stored.location.clone());

    Preferences {
        restaurant_types,
        flavor_profiles,
        dining_purpose,
        budget_range,
        location,
    }
}

fn title_case(area: &str) -> String {
    area.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
