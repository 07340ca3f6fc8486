//! Rule-based theme tagging: no ML, no network calls, deterministic.
//!
//! Each theme owns an ordered list of substring patterns matched against the
//! lowercased name and description. Patterns are tried in listed order only
//! for speed (first hit short-circuits that theme's check); theme order in
//! [`THEMES`] does not affect which themes end up assigned, since every
//! theme is checked independently against the same input.

struct ThemeRule {
    code: &'static str,
    patterns: &'static [&'static str],
}

const THEMES: &[ThemeRule] = &[
    ThemeRule {
        code: "natural_environment",
        patterns: &[
            "forest", "wetland", "habitat", "vegetation", "wildlife", "conservation",
            "ecology", "ecosystem", "soil", "geology", "biodiversity", "nature reserve",
        ],
    },
    ThemeRule {
        code: "built_environment",
        patterns: &[
            "building", "zoning", "land use", "parcel", "cadastr", "property",
            "planning", "development", "housing", "infrastructure",
        ],
    },
    ThemeRule {
        code: "transport",
        patterns: &[
            "road", "highway", "railway", "rail", "transit", "bus route", "cycle",
            "pedestrian", "traffic", "parking", "airport", "runway",
        ],
    },
    ThemeRule {
        code: "marine",
        patterns: &[
            "marine", "ocean", "coastal", "coastline", "reef", "bathymetry", "tidal",
            "shoreline", "offshore",
        ],
    },
    ThemeRule {
        code: "hydrology",
        patterns: &[
            "river", "stream", "watershed", "flood", "catchment", "aquifer",
            "groundwater", "drainage", "lake", "reservoir", "hydro",
        ],
    },
];

/// Classify a dataset by name and optional description into a deterministic
/// set of theme codes. Order-independent: the same input always yields the
/// same set regardless of iteration order.
pub fn classify(name: &str, description: Option<&str>) -> Vec<&'static str> {
    let haystack = match description {
        Some(desc) => format!("{name} {desc}").to_lowercase(),
        None => name.to_lowercase(),
    };

    let mut themes = Vec::new();
    for rule in THEMES {
        if rule.patterns.iter().any(|p| haystack.contains(p)) {
            themes.push(rule.code);
        }
    }
    themes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_single_theme() {
        let themes = classify("City Road Network", None);
        assert_eq!(themes, vec!["transport"]);
    }

    #[test]
    fn matches_multiple_themes() {
        let themes = classify("Coastal Wetland Survey", Some("marine habitat mapping"));
        assert!(themes.contains(&"natural_environment"));
        assert!(themes.contains(&"marine"));
    }

    #[test]
    fn no_match_yields_empty() {
        let themes = classify("Quarterly Budget Report", None);
        assert!(themes.is_empty());
    }

    #[test]
    fn is_deterministic_and_order_independent() {
        let a = classify("River Flood Zones near Railway", None);
        let b = classify("River Flood Zones near Railway", None);
        assert_eq!(a, b);
        assert!(a.contains(&"hydrology"));
        assert!(a.contains(&"transport"));
    }
}
