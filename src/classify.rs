//! Classification of scores and enum values into visual bands.
//!
//! Both lookups are total: every input resolves to exactly one band, so the
//! three renderers can never disagree about a colour.

use std::collections::BTreeMap;

use crate::error::RulesError;
use crate::model::Rgb;

#[derive(Debug, Clone, PartialEq)]
pub enum BandKey {
    Threshold(f64),
    Key(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationBand {
    pub key: BandKey,
    pub background: Rgb,
    pub text: Rgb,
    pub label: String,
}

impl ClassificationBand {
    /// The darker of the two band colours, used for bar fills.
    pub fn strong(&self) -> Rgb {
        if self.text.luminance() < self.background.luminance() { self.text } else { self.background }
    }

    fn threshold(&self) -> f64 {
        match self.key {
            BandKey::Threshold(t) => t,
            BandKey::Key(_) => f64::NEG_INFINITY,
        }
    }
}

/// Score bands ordered by descending threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreScale {
    upper: Vec<ClassificationBand>,
    floor: ClassificationBand,
}

impl ScoreScale {
    pub fn new(name: &str, mut bands: Vec<ClassificationBand>) -> Result<Self, RulesError> {
        if bands.iter().any(|b| !b.threshold().is_finite()) {
            return Err(RulesError::NonFiniteThreshold { name: name.to_string() });
        }
        bands.sort_by(|a, b| b.threshold().total_cmp(&a.threshold()));
        let floor = bands.pop().ok_or_else(|| RulesError::EmptyScale { name: name.to_string() })?;
        Ok(Self { upper: bands, floor })
    }

    /// All bands, highest threshold first.
    #[cfg(test)]
    pub fn bands(&self) -> impl Iterator<Item = &ClassificationBand> {
        self.upper.iter().chain(std::iter::once(&self.floor))
    }
}

/// First band whose threshold the score reaches; the lowest band otherwise
/// (including NaN).
pub fn score_to_band(score: f64, scale: &ScoreScale) -> &ClassificationBand {
    scale.upper.iter().find(|band| score >= band.threshold()).unwrap_or(&scale.floor)
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumScale {
    entries: BTreeMap<String, ClassificationBand>,
    fallback: ClassificationBand,
}

impl EnumScale {
    pub fn new(name: &str, entries: Vec<ClassificationBand>, fallback: &str) -> Result<Self, RulesError> {
        let mut map = BTreeMap::new();
        for mut band in entries {
            if let BandKey::Key(key) = &band.key {
                let key = normalize_key(key);
                if map.contains_key(&key) {
                    return Err(RulesError::DuplicateKey { name: name.to_string(), key });
                }
                band.key = BandKey::Key(key.clone());
                map.insert(key, band);
            }
        }
        let fallback_band = map.get(&normalize_key(fallback)).cloned().ok_or_else(|| {
            RulesError::UnknownFallback { name: name.to_string(), fallback: fallback.to_string() }
        })?;
        Ok(Self { entries: map, fallback: fallback_band })
    }
}

/// Case-normalized lookup; unknown or empty keys resolve to the fallback band.
pub fn enum_to_band<'a>(key: &str, scale: &'a EnumScale) -> &'a ClassificationBand {
    scale.entries.get(&normalize_key(key)).unwrap_or(&scale.fallback)
}

/// `"Pass With-Warnings "` -> `"pass_with_warnings"`.
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c.to_ascii_lowercase() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(threshold: f64, label: &str) -> ClassificationBand {
        ClassificationBand {
            key: BandKey::Threshold(threshold),
            background: Rgb::WHITE,
            text: Rgb(0, 0, 0),
            label: label.to_string(),
        }
    }

    fn keyed(key: &str) -> ClassificationBand {
        ClassificationBand {
            key: BandKey::Key(key.to_string()),
            background: Rgb::WHITE,
            text: Rgb(0, 0, 0),
            label: key.to_uppercase(),
        }
    }

    fn traffic_light() -> ScoreScale {
        // Deliberately unsorted input.
        ScoreScale::new("traffic", vec![band(70.0, "amber"), band(0.0, "red"), band(90.0, "green")]).unwrap()
    }

    #[test]
    fn test_market_and_risk_scores() {
        let scale = traffic_light();
        assert_eq!(score_to_band(92.0, &scale).label, "green");
        assert_eq!(score_to_band(41.0, &scale).label, "red");
        assert_eq!(score_to_band(70.0, &scale).label, "amber");
        assert_eq!(score_to_band(89.99, &scale).label, "amber");
    }

    #[test]
    fn test_below_every_threshold_uses_lowest_band() {
        let scale = ScoreScale::new("s", vec![band(50.0, "mid"), band(20.0, "low")]).unwrap();
        assert_eq!(score_to_band(-5.0, &scale).label, "low");
        assert_eq!(score_to_band(f64::NAN, &scale).label, "low");
    }

    #[test]
    fn test_score_lookup_is_monotonic() {
        let scale = traffic_light();
        let rank = |label: &str| scale.bands().position(|b| b.label == label).unwrap();
        let mut previous = usize::MAX;
        for score in 0..=100 {
            let current = rank(&score_to_band(score as f64, &scale).label);
            assert!(current <= previous, "band got worse at score {}", score);
            previous = current;
        }
    }

    #[test]
    fn test_invalid_score_scales() {
        assert!(matches!(ScoreScale::new("empty", vec![]), Err(RulesError::EmptyScale { .. })));
        assert!(matches!(
            ScoreScale::new("nan", vec![band(f64::NAN, "x")]),
            Err(RulesError::NonFiniteThreshold { .. })
        ));
    }

    #[test]
    fn test_enum_lookup_normalizes_and_falls_back() {
        let scale = EnumScale::new("severity", vec![keyed("CRITICAL"), keyed("high"), keyed("low")], "LOW").unwrap();
        assert_eq!(enum_to_band("critical", &scale).label, "CRITICAL");
        assert_eq!(enum_to_band(" High ", &scale).label, "HIGH");
        assert_eq!(enum_to_band("", &scale).label, "LOW");
        assert_eq!(enum_to_band("catastrophic", &scale).label, "LOW");
    }

    #[test]
    fn test_enum_fallback_must_exist() {
        let err = EnumScale::new("verdict", vec![keyed("pass")], "fail").unwrap_err();
        assert!(matches!(err, RulesError::UnknownFallback { .. }));
    }

    #[test]
    fn test_enum_keys_must_stay_distinct_after_normalizing() {
        for (a, b) in [("high", "HIGH"), ("pass-with", "pass_with"), ("no go", "No-Go")] {
            let err = EnumScale::new("severity", vec![keyed(a), keyed(b)], a).unwrap_err();
            assert!(matches!(err, RulesError::DuplicateKey { .. }), "{} / {} were merged", a, b);
        }
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Pass With-Warnings "), "pass_with_warnings");
        assert_eq!(normalize_key("STRONG_GO"), "strong_go");
    }
}
