//! Schema adapters: one report profile per payload domain.
//!
//! A profile knows where its payload's fields live, how its artifacts are
//! named, and how to flatten the payload into a [`Document`]. Every score and
//! severity is classified here, once, so the renderers only ever see bands.

mod business;
mod camper;
mod code_review;
mod directory;
mod idea_finder;
mod intel;
mod medigap;
mod plugin_ideas;
mod recommender;
mod vehicle;

use clap::ValueEnum;
use serde_json::{Map, Value};

use crate::error::{ExportError, RulesError};
use crate::model::{Document, Section};
use crate::payload::Fields;
use crate::rules::Palette;

pub use business::BusinessProfile;
pub use camper::CamperInventoryProfile;
pub use code_review::CodeReviewProfile;
pub use directory::DirectoryProfile;
pub use idea_finder::IdeaFinderProfile;
pub use intel::{AccuracyProfile, BriefingProfile, PredictionsProfile};
pub use medigap::MedigapProfile;
pub use plugin_ideas::PluginIdeasProfile;
pub use recommender::{CAMPER_RECOMMENDATIONS, RecommenderProfile, VEHICLE_RECOMMENDATIONS};
pub use vehicle::VehicleProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    BusinessAnalysis,
    CodeReview,
    VehicleInventory,
    Directory,
    IdeaFinder,
    PluginIdeas,
    CamperInventory,
    VehicleRecommendations,
    CamperRecommendations,
    MedigapSelection,
    IntelBriefing,
    IntelPredictions,
    IntelAccuracy,
}

impl ReportKind {
    pub const ALL: [ReportKind; 13] = [
        ReportKind::BusinessAnalysis,
        ReportKind::CodeReview,
        ReportKind::VehicleInventory,
        ReportKind::Directory,
        ReportKind::IdeaFinder,
        ReportKind::PluginIdeas,
        ReportKind::CamperInventory,
        ReportKind::VehicleRecommendations,
        ReportKind::CamperRecommendations,
        ReportKind::MedigapSelection,
        ReportKind::IntelBriefing,
        ReportKind::IntelPredictions,
        ReportKind::IntelAccuracy,
    ];

    /// Name used on the command line and in the manifest.
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::BusinessAnalysis => "business-analysis",
            ReportKind::CodeReview => "code-review",
            ReportKind::VehicleInventory => "vehicle-inventory",
            ReportKind::Directory => "directory",
            ReportKind::IdeaFinder => "idea-finder",
            ReportKind::PluginIdeas => "plugin-ideas",
            ReportKind::CamperInventory => "camper-inventory",
            ReportKind::VehicleRecommendations => "vehicle-recommendations",
            ReportKind::CamperRecommendations => "camper-recommendations",
            ReportKind::MedigapSelection => "medigap-selection",
            ReportKind::IntelBriefing => "intel-briefing",
            ReportKind::IntelPredictions => "intel-predictions",
            ReportKind::IntelAccuracy => "intel-accuracy",
        }
    }

    /// Rule-book table holding this kind's palette. The intel reports share one.
    pub fn rule_table(self) -> &'static str {
        match self {
            ReportKind::IntelBriefing | ReportKind::IntelPredictions | ReportKind::IntelAccuracy => "intel",
            other => other.as_str(),
        }
    }

    pub fn profile(self) -> &'static dyn ReportProfile {
        match self {
            ReportKind::BusinessAnalysis => &BusinessProfile,
            ReportKind::CodeReview => &CodeReviewProfile,
            ReportKind::VehicleInventory => &VehicleProfile,
            ReportKind::Directory => &DirectoryProfile,
            ReportKind::IdeaFinder => &IdeaFinderProfile,
            ReportKind::PluginIdeas => &PluginIdeasProfile,
            ReportKind::CamperInventory => &CamperInventoryProfile,
            ReportKind::VehicleRecommendations => &VEHICLE_RECOMMENDATIONS,
            ReportKind::CamperRecommendations => &CAMPER_RECOMMENDATIONS,
            ReportKind::MedigapSelection => &MedigapProfile,
            ReportKind::IntelBriefing => &BriefingProfile,
            ReportKind::IntelPredictions => &PredictionsProfile,
            ReportKind::IntelAccuracy => &AccuracyProfile,
        }
    }

    fn from_type_literal(literal: &str) -> Option<ReportKind> {
        Self::ALL.into_iter().find(|kind| kind.profile().expected_type() == literal)
    }
}

/// Per-domain configuration of the generic export engine.
pub trait ReportProfile: Sync {
    fn kind(&self) -> ReportKind;

    /// Value of the payload's `type` field this profile expects.
    fn expected_type(&self) -> &'static str;

    /// Folder under the output directory that receives the artifacts.
    fn folder(&self) -> &'static str;

    /// Free text that is slugified into the artifact stem.
    fn stem_subject(&self, payload: Fields<'_>) -> String;

    /// Fixed trailing part of the artifact stem.
    fn stem_suffix(&self, payload: Fields<'_>) -> String;

    /// Score scales `build` reads from the palette.
    fn score_scales(&self) -> &'static [&'static str] {
        &["score"]
    }

    /// Enum scales `build` reads from the palette.
    fn enum_scales(&self) -> &'static [&'static str];

    fn build(&self, payload: Fields<'_>, palette: &Palette) -> Result<Document, ExportError>;

    /// Domain-specific fields merged into the manifest.
    fn summary(&self, payload: Fields<'_>) -> Map<String, Value>;
}

/// Pick the report kind, returning any schema-mismatch warnings.
///
/// An explicit kind wins; otherwise the payload's `type` field decides, and a
/// payload without a recognizable type is treated as a business analysis.
pub fn resolve_kind(requested: Option<ReportKind>, payload: Fields<'_>) -> (ReportKind, Vec<String>) {
    let declared = payload.get("type").as_text();
    let mut warnings = Vec::new();

    let kind = match (requested, declared.as_deref()) {
        (Some(kind), Some(literal)) => {
            if literal != kind.profile().expected_type() {
                warnings.push(format!(
                    "Expected type '{}', got '{}'. Proceeding anyway.",
                    kind.profile().expected_type(),
                    literal
                ));
            }
            kind
        }
        (Some(kind), None) => kind,
        (None, Some(literal)) => match ReportKind::from_type_literal(literal) {
            Some(kind) => kind,
            None => {
                warnings.push(format!(
                    "Unrecognized payload type '{}', rendering as {}.",
                    literal,
                    ReportKind::BusinessAnalysis.as_str()
                ));
                ReportKind::BusinessAnalysis
            }
        },
        (None, None) => {
            warnings.push(format!(
                "Payload has no 'type' field, rendering as {}.",
                ReportKind::BusinessAnalysis.as_str()
            ));
            ReportKind::BusinessAnalysis
        }
    };

    (kind, warnings)
}

/// Fail early when a palette lacks a scale the profile classifies with.
pub fn check_palette(profile: &dyn ReportProfile, palette: &Palette) -> Result<(), RulesError> {
    for name in profile.score_scales() {
        palette.score_scale(name)?;
    }
    for name in profile.enum_scales() {
        palette.enum_scale(name)?;
    }
    Ok(())
}

/// `"Yes"`/`"No"` for boolean columns.
fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

/// Space-joined non-empty fields, e.g. year, make and model.
fn join_fields(source: Fields<'_>, keys: &[&str]) -> String {
    keys.iter().map(|key| source.text_or(key, "")).filter(|part| !part.is_empty()).collect::<Vec<_>>().join(" ")
}

/// One `Label: text` paragraph per present, non-blank field.
fn labelled_notes(section: &mut Section, source: Fields<'_>, labels: &[(&str, &str)]) {
    for (label, key) in labels {
        let text = source.text_or(key, "");
        if !text.trim().is_empty() {
            section.narrative(format!("{}: {}", label, text));
        }
    }
}

/// `"SAAS_APP"` -> `"Saas App"`.
fn title_case(raw: &str) -> String {
    raw.split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_inferred_from_type() {
        let payload = json!({"type": "code_review"});
        let (kind, warnings) = resolve_kind(None, Fields::new(&payload));
        assert_eq!(kind, ReportKind::CodeReview);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_mismatched_type_is_a_warning() {
        let payload = json!({"type": "business_analysis"});
        let (kind, warnings) = resolve_kind(Some(ReportKind::VehicleInventory), Fields::new(&payload));
        assert_eq!(kind, ReportKind::VehicleInventory);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("vehicle_inventory"));
    }

    #[test]
    fn test_untyped_payload_defaults_to_business() {
        let payload = json!({"idea_description": "x"});
        let (kind, warnings) = resolve_kind(None, Fields::new(&payload));
        assert_eq!(kind, ReportKind::BusinessAnalysis);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_builtin_palettes_cover_every_profile() {
        let book = crate::rules::RuleBook::builtin().unwrap();
        for kind in ReportKind::ALL {
            let palette = book.palette(kind.rule_table()).unwrap();
            check_palette(kind.profile(), palette).unwrap_or_else(|e| panic!("{}: {}", kind.as_str(), e));
        }
    }

    #[test]
    fn test_every_type_literal_is_recognized() {
        for (literal, expected) in [
            ("idea_finder_shortlist", ReportKind::IdeaFinder),
            ("plugin_idea_shortlist", ReportKind::PluginIdeas),
            ("camper_inventory", ReportKind::CamperInventory),
            ("vehicle_recommendations", ReportKind::VehicleRecommendations),
            ("camper_recommendations", ReportKind::CamperRecommendations),
            ("medigap_selection", ReportKind::MedigapSelection),
            ("briefing", ReportKind::IntelBriefing),
            ("predictions", ReportKind::IntelPredictions),
            ("accuracy", ReportKind::IntelAccuracy),
        ] {
            let payload = json!({"type": literal});
            let (kind, warnings) = resolve_kind(None, Fields::new(&payload));
            assert_eq!(kind, expected, "{}", literal);
            assert!(warnings.is_empty());
        }
    }

    #[test]
    fn test_kind_names_round_trip_through_clap() {
        for kind in ReportKind::ALL {
            assert_eq!(ReportKind::from_str(kind.as_str(), false), Ok(kind));
        }
        assert_eq!(ReportKind::IntelPredictions.rule_table(), "intel");
        assert_eq!(ReportKind::MedigapSelection.rule_table(), "medigap-selection");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("saas_app"), "Saas App");
        assert_eq!(title_case("MARKETPLACE_PLUGIN"), "Marketplace Plugin");
        assert_eq!(title_case("cross-domain"), "Cross Domain");
    }

    #[test]
    fn test_profiles_agree_with_their_kind() {
        for kind in ReportKind::ALL {
            assert_eq!(kind.profile().kind(), kind);
            assert_eq!(ReportKind::from_type_literal(kind.profile().expected_type()), Some(kind));
        }
    }
}
