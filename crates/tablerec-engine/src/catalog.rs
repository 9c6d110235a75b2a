//! Restaurant catalog and filtering.
//!
//! Carries the built-in Singapore catalog and the filter pipeline:
//! location, budget, spicy-cuisine, and dining-purpose filters, a
//! fallback when nothing matches, rating sort, and a shuffled tail so
//! repeat queries are not identical.

use rand::seq::SliceRandom;

use tablerec_core::types::{Preferences, Restaurant};

/// Restaurants kept at the top of the ranking before shuffling the rest.
const TOP_KEPT: usize = 3;

/// Price-bucket to approximate SGD-per-person mapping.
fn price_level(price: &str) -> i64 {
    match price {
        "$" => 20,
        "$$" => 40,
        "$$$" => 80,
        "$$$$" => 150,
        _ => 0,
    }
}

fn restaurant(
    id: &str,
    name: &str,
    cuisine: &str,
    location: &str,
    rating: f64,
    price: &str,
    highlights: &[&str],
    reason: &str,
    reference: &str,
) -> Restaurant {
    Restaurant {
        id: id.to_string(),
        name: name.to_string(),
        cuisine: Some(cuisine.to_string()),
        location: Some(location.to_string()),
        rating: Some(rating),
        price: Some(price.to_string()),
        highlights: Some(highlights.iter().map(|h| h.to_string()).collect()),
        reason: Some(reason.to_string()),
        reference: Some(reference.to_string()),
    }
}

/// The built-in restaurant catalog.
pub fn default_restaurants() -> Vec<Restaurant> {
    vec![
        restaurant(
            "1",
            "Din Tai Fung",
            "Taiwanese",
            "Orchard",
            4.2,
            "$$",
            &["Xiao Long Bao", "Noodles", "Family-friendly"],
            "Perfect for family dining with authentic Taiwanese cuisine and famous soup dumplings",
            "https://www.dintaifung.com.sg",
        ),
        restaurant(
            "2",
            "Burnt Ends",
            "Modern Australian",
            "Tanjong Pagar",
            4.5,
            "$$$$",
            &["BBQ", "Wine", "Date Night"],
            "Exceptional BBQ and wine selection, perfect for special occasions",
            "https://www.burntends.com.sg",
        ),
        restaurant(
            "3",
            "Hawker Chan",
            "Singaporean",
            "Chinatown",
            3.8,
            "$",
            &["Michelin Star", "Soya Sauce Chicken", "Affordable"],
            "Michelin-starred hawker food at unbeatable prices",
            "https://www.hawkerchan.com",
        ),
        restaurant(
            "4",
            "Odette",
            "French",
            "Marina Bay",
            4.8,
            "$$$$",
            &["Fine Dining", "3 Michelin Stars", "Romantic"],
            "World-class French cuisine with impeccable service and atmosphere",
            "https://www.odetterestaurant.com",
        ),
        restaurant(
            "5",
            "Jumbo Seafood",
            "Chinese",
            "Clarke Quay",
            4.1,
            "$$$",
            &["Chilli Crab", "Seafood", "Waterfront"],
            "Famous for Singapore's signature chilli crab with beautiful river views",
            "https://www.jumboseafood.com.sg",
        ),
        restaurant(
            "6",
            "Lau Pa Sat",
            "Mixed Hawker",
            "Marina Bay",
            3.9,
            "$",
            &["Satay", "Local Food", "Historic"],
            "Historic hawker center with diverse local food options",
            "https://www.laupasat.com.sg",
        ),
        restaurant(
            "7",
            "Candlenut",
            "Peranakan",
            "Tanjong Pagar",
            4.3,
            "$$$",
            &["Peranakan", "Heritage", "Unique"],
            "Award-winning Peranakan cuisine in a modern setting",
            "https://www.candlenut.com.sg",
        ),
        restaurant(
            "8",
            "Tippling Club",
            "Modern European",
            "Tanjong Pagar",
            4.4,
            "$$$$",
            &["Cocktails", "Innovative", "Trendy"],
            "Creative cocktails and innovative dishes in a trendy atmosphere",
            "https://www.tipplingclub.com",
        ),
    ]
}

/// Filter and rank the catalog against a query and preferences.
///
/// When every filter strikes out, the top of the catalog is returned so
/// the user always sees something. Results are sorted by rating; beyond
/// the top three, the remainder is shuffled before trimming to
/// `max_results`.
pub fn filter_restaurants(
    catalog: &[Restaurant],
    query: &str,
    preferences: &Preferences,
    max_results: usize,
) -> Vec<Restaurant> {
    let query_lower = query.to_lowercase();
    let mut filtered: Vec<Restaurant> = catalog.to_vec();

    if preferences.has_location() {
        let loc = preferences.location.to_lowercase();
        filtered.retain(|r| {
            r.location
                .as_ref()
                .is_some_and(|l| l.to_lowercase().contains(&loc))
        });
    }

    let budget_min = preferences.budget_range.min;
    let budget_max = preferences.budget_range.max;
    if budget_min.is_some() || budget_max.is_some() {
        filtered.retain(|r| {
            r.price.as_ref().is_some_and(|p| {
                let level = price_level(p);
                level >= budget_min.unwrap_or(0) && level <= budget_max.unwrap_or(i64::MAX)
            })
        });
    }

    let wants_spicy = preferences.flavor_profiles.iter().any(|f| f == "spicy")
        || query_lower.contains("spicy")
        || query_lower.contains("hot");
    if wants_spicy {
        const SPICY_CUISINES: &[&str] = &["chinese", "korean", "thai", "indian", "peranakan"];
        filtered.retain(|r| {
            r.cuisine.as_ref().is_some_and(|c| {
                let c = c.to_lowercase();
                SPICY_CUISINES.iter().any(|s| c.contains(s))
            })
        });
    }

    match preferences.dining_purpose.as_str() {
        "date-night" => {
            filtered.retain(|r| {
                is_pricey(r)
                    && r.highlights
                        .as_ref()
                        .is_some_and(|hs| hs.iter().any(|h| h.to_lowercase() == "romantic"))
            });
        }
        "family" => {
            filtered.retain(|r| {
                r.highlights
                    .as_ref()
                    .is_some_and(|hs| hs.iter().any(|h| h.to_lowercase().contains("family")))
                    || matches!(r.price.as_deref(), Some("$") | Some("$$"))
            });
        }
        "business" => {
            filtered.retain(|r| is_pricey(r) && r.rating.is_some_and(|rt| rt >= 4.0));
        }
        _ => {}
    }

    // Never return an empty list; fall back to the top of the catalog.
    if filtered.is_empty() {
        filtered = catalog.iter().take(TOP_KEPT).cloned().collect();
    }

    filtered.sort_by(|a, b| {
        b.rating
            .unwrap_or(0.0)
            .total_cmp(&a.rating.unwrap_or(0.0))
    });

    let top = TOP_KEPT.min(max_results);
    if filtered.len() > max_results {
        let mut others = filtered.split_off(top);
        others.shuffle(&mut rand::rng());
        filtered.extend(others.into_iter().take(max_results - top));
    } else {
        filtered.truncate(max_results);
    }

    filtered
}

fn is_pricey(r: &Restaurant) -> bool {
    matches!(r.price.as_deref(), Some("$$$") | Some("$$$$"))
}

/// Confidence in a recommendation: 0.5 base, +0.1 per concrete preference
/// facet, +0.1 when any restaurants were found, capped at 1.0.
pub fn confidence_score(preferences: &Preferences, restaurants: &[Restaurant]) -> f64 {
    let mut confidence: f64 = 0.5;

    if preferences.has_types() {
        confidence += 0.1;
    }
    if preferences.has_flavors() {
        confidence += 0.1;
    }
    if preferences.has_purpose() {
        confidence += 0.1;
    }
    if preferences.has_location() {
        confidence += 0.1;
    }
    if !restaurants.is_empty() {
        confidence += 0.1;
    }

    confidence.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablerec_core::types::BudgetRange;

    fn unconstrained() -> Preferences {
        Preferences {
            budget_range: BudgetRange {
                min: None,
                max: None,
                currency: "SGD".to_string(),
                per: "person".to_string(),
            },
            ..Preferences::default()
        }
    }

    #[test]
    fn test_catalog_has_eight_entries() {
        assert_eq!(default_restaurants().len(), 8);
    }

    #[test]
    fn test_unconstrained_returns_six_sorted() {
        let catalog = default_restaurants();
        let results = filter_restaurants(&catalog, "anything", &unconstrained(), 6);
        assert_eq!(results.len(), 6);
        // Top three are the highest rated, in order.
        assert_eq!(results[0].name, "Odette");
        assert_eq!(results[1].name, "Burnt Ends");
        assert_eq!(results[2].name, "Tippling Club");
    }

    #[test]
    fn test_location_filter() {
        let catalog = default_restaurants();
        let prefs = Preferences {
            location: "Tanjong Pagar".to_string(),
            ..unconstrained()
        };
        let results = filter_restaurants(&catalog, "dinner", &prefs, 6);
        assert!(results
            .iter()
            .all(|r| r.location.as_deref() == Some("Tanjong Pagar")));
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_budget_filter() {
        let catalog = default_restaurants();
        let prefs = Preferences {
            budget_range: BudgetRange {
                min: None,
                max: Some(40),
                currency: "SGD".to_string(),
                per: "person".to_string(),
            },
            ..unconstrained()
        };
        let results = filter_restaurants(&catalog, "cheap food", &prefs, 6);
        assert!(results
            .iter()
            .all(|r| matches!(r.price.as_deref(), Some("$") | Some("$$"))));
    }

    #[test]
    fn test_spicy_filter_by_flavor() {
        let catalog = default_restaurants();
        let prefs = Preferences {
            flavor_profiles: vec!["spicy".to_string()],
            ..unconstrained()
        };
        let results = filter_restaurants(&catalog, "dinner", &prefs, 6);
        // Jumbo Seafood (Chinese) and Candlenut (Peranakan) qualify.
        assert!(!results.is_empty());
        for r in &results {
            let c = r.cuisine.as_deref().unwrap().to_lowercase();
            assert!(
                ["chinese", "korean", "thai", "indian", "peranakan"]
                    .iter()
                    .any(|s| c.contains(s)),
                "unexpected cuisine: {}",
                c
            );
        }
    }

    #[test]
    fn test_spicy_filter_by_query() {
        let catalog = default_restaurants();
        let results = filter_restaurants(&catalog, "something spicy", &unconstrained(), 6);
        assert!(results
            .iter()
            .all(|r| r.cuisine.as_deref() == Some("Chinese")
                || r.cuisine.as_deref() == Some("Peranakan")));
    }

    #[test]
    fn test_date_night_filter() {
        let catalog = default_restaurants();
        let prefs = Preferences {
            dining_purpose: "date-night".to_string(),
            ..unconstrained()
        };
        let results = filter_restaurants(&catalog, "dinner", &prefs, 6);
        // Only Odette is pricey with a "Romantic" highlight.
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Odette");
    }

    #[test]
    fn test_business_filter() {
        let catalog = default_restaurants();
        let prefs = Preferences {
            dining_purpose: "business".to_string(),
            ..unconstrained()
        };
        let results = filter_restaurants(&catalog, "lunch", &prefs, 6);
        assert!(!results.is_empty());
        for r in &results {
            assert!(matches!(r.price.as_deref(), Some("$$$") | Some("$$$$")));
            assert!(r.rating.unwrap() >= 4.0);
        }
    }

    #[test]
    fn test_fallback_when_nothing_matches() {
        let catalog = default_restaurants();
        let prefs = Preferences {
            location: "Jurong".to_string(),
            ..unconstrained()
        };
        let results = filter_restaurants(&catalog, "dinner", &prefs, 6);
        // No catalog entry is in Jurong; the top of the catalog comes back.
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].name, "Burnt Ends");
    }

    #[test]
    fn test_max_results_caps_output() {
        let catalog = default_restaurants();
        let results = filter_restaurants(&catalog, "anything", &unconstrained(), 4);
        assert_eq!(results.len(), 4);
        // The top of the ranking survives the cap.
        assert_eq!(results[0].name, "Odette");
        assert_eq!(results[1].name, "Burnt Ends");
        assert_eq!(results[2].name, "Tippling Club");

        let tight = filter_restaurants(&catalog, "anything", &unconstrained(), 2);
        assert_eq!(tight.len(), 2);
    }

    #[test]
    fn test_confidence_base() {
        let prefs = Preferences {
            budget_range: BudgetRange {
                min: None,
                max: None,
                currency: "SGD".to_string(),
                per: "person".to_string(),
            },
            ..Preferences::default()
        };
        assert_eq!(confidence_score(&prefs, &[]), 0.5);
    }

    #[test]
    fn test_confidence_increases_with_facets() {
        let prefs = Preferences {
            restaurant_types: vec!["cafe".to_string()],
            flavor_profiles: vec!["sweet".to_string()],
            dining_purpose: "solo".to_string(),
            location: "Orchard".to_string(),
            ..Preferences::default()
        };
        let restaurants = default_restaurants();
        let score = confidence_score(&prefs, &restaurants);
        assert!((score - 1.0).abs() < 1e-9);
    }
}
