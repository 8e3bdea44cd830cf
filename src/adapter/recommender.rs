use serde_json::{Map, Value};

use super::{ReportKind, ReportProfile, join_fields, labelled_notes};
use crate::error::ExportError;
use crate::model::{Block, Cell, ColumnDef, Document, Section, Table};
use crate::payload::{Fields, format_number, number_value};
use crate::rules::Palette;

const SCORES: [(&str, &str); 3] = [("Composite", "composite_score"), ("Fit", "fit_score"), ("Market", "market_score")];

/// Ranked shortlist of models matching a buyer's requirements.
///
/// Vehicles and campers share the layout; campers add RV specifications
/// and tank capacities.
pub struct RecommenderProfile {
    kind: ReportKind,
    expected_type: &'static str,
    folder: &'static str,
    title: &'static str,
    /// Requirements field naming what is being shopped for.
    subject_key: &'static str,
    subject_default: &'static str,
    analyzed_key: &'static str,
    /// Trim or floorplan appended to the model name.
    variant_key: &'static str,
    rating: (&'static str, &'static str),
    best_pick: (&'static str, &'static str),
    leader: (&'static str, &'static str),
    rv_specs: bool,
}

pub static VEHICLE_RECOMMENDATIONS: RecommenderProfile = RecommenderProfile {
    kind: ReportKind::VehicleRecommendations,
    expected_type: "vehicle_recommendations",
    folder: "Vehicle_Recommendations",
    title: "Vehicle Recommendations",
    subject_key: "vehicle_type",
    subject_default: "Vehicle",
    analyzed_key: "vehicles_analyzed",
    variant_key: "trim",
    rating: ("Reliability", "reliability_rating"),
    best_pick: ("Best trim", "best_trim_recommendation"),
    leader: ("Reliability leader", "reliability_leader"),
    rv_specs: false,
};

pub static CAMPER_RECOMMENDATIONS: RecommenderProfile = RecommenderProfile {
    kind: ReportKind::CamperRecommendations,
    expected_type: "camper_recommendations",
    folder: "Camper_Recommendations",
    title: "Camper/RV Recommendations",
    subject_key: "camper_type",
    subject_default: "Camper/RV",
    analyzed_key: "campers_analyzed",
    variant_key: "floorplan",
    rating: ("Build quality", "build_quality_rating"),
    best_pick: ("Best floorplan", "best_floorplan_recommendation"),
    leader: ("Quality leader", "quality_leader"),
    rv_specs: true,
};

impl RecommenderProfile {
    fn subject(&self, payload: Fields<'_>) -> String {
        payload.get("requirements_profile").text_or(self.subject_key, self.subject_default)
    }

    fn name(&self, rec: Fields<'_>) -> String {
        let name = join_fields(rec, &["make_model", self.variant_key]);
        if name.is_empty() { "Unknown".to_string() } else { name }
    }

    fn requirements(&self, profile: Fields<'_>) -> Section {
        let mut section = Section::new("Your Requirements");
        let listed = |key: &str| {
            let items = profile.strings(key);
            if items.is_empty() { "None specified".to_string() } else { items.join(", ") }
        };
        let kind_label = if self.rv_specs { "RV type" } else { "Vehicle type" };
        let kind_value = match profile.text_or("rv_type", "") {
            rv if self.rv_specs && !rv.is_empty() => rv,
            _ => profile.text_or(self.subject_key, self.subject_default),
        };
        let mut items = vec![
            format!("{}: {}", kind_label, kind_value),
            format!(
                "Budget: {} ({})",
                profile.text_or("budget_range", "Not specified"),
                profile.text_or("buying_preference", "")
            ),
            format!("Must-haves: {}", listed("must_haves")),
            format!("Priorities: {}", listed("priorities")),
        ];
        if self.rv_specs {
            items.push(format!("Tow vehicle: {}", profile.text_or("tow_vehicle", "Not specified")));
        }
        section.list(items, false);
        section
    }

    fn overview(&self, recommendations: &[Fields<'_>], palette: &Palette) -> Result<Section, ExportError> {
        let mut section = Section::new("Recommendation Overview");
        if recommendations.is_empty() {
            section.narrative("No recommendations were produced.");
            return Ok(section);
        }
        let mut columns = vec![ColumnDef::new("#", 8.0).centered(), ColumnDef::new("Model", 50.0)];
        if self.rv_specs {
            columns.push(ColumnDef::new("RV Type", 26.0));
        }
        columns.extend([
            ColumnDef::new("Tier", 22.0).centered(),
            ColumnDef::new("Score", 12.0).centered(),
            ColumnDef::new("Fit", 12.0).centered(),
            ColumnDef::new("Market", 12.0).centered(),
            ColumnDef::new("Year", 12.0).centered(),
            ColumnDef::new("MSRP", 30.0),
        ]);
        let mut table = Table::new(columns);
        for rec in recommendations {
            let tier = palette.enum_band("tier", &rec.text_or("tier", ""))?;
            let mut row = vec![rec.text_or("rank", "").into(), self.name(*rec).into()];
            if self.rv_specs {
                row.push(rec.text("rv_type").into());
            }
            row.push(Cell::banded(tier.label.clone(), tier));
            for (_, key) in SCORES {
                let score = rec.number(key);
                row.push(Cell::banded(format_number(score), palette.score_band("score", score)?));
            }
            row.push(rec.text("year").into());
            row.push(rec.text("msrp_range").into());
            table.push_row(row)?;
        }
        section.table(table);
        Ok(section)
    }

    fn detail(&self, rec: Fields<'_>, palette: &Palette) -> Result<Section, ExportError> {
        let tier = palette.enum_band("tier", &rec.text_or("tier", ""))?;
        let mut section = Section::new(format!("#{} {} ({})", rec.text_or("rank", ""), self.name(rec), tier.label));
        for (label, key) in SCORES {
            let score = rec.number(key);
            section.push(Block::ScoreBar {
                label: label.to_string(),
                score,
                band: palette.score_band("score", score)?.clone(),
            });
        }

        let mut facts = vec![
            format!("Year: {}", rec.text("year")),
            format!("MSRP range: {}", rec.text("msrp_range")),
            format!("{}: {}", self.rating.0, rec.text(self.rating.1)),
        ];
        if self.rv_specs {
            facts.extend([
                format!("RV type: {}", rec.text("rv_type")),
                format!("Sleeping capacity: {}", rec.text("sleeping_capacity")),
                format!("Length: {} ft", rec.text("length_ft")),
                format!("Dry weight: {} lbs", rec.text("dry_weight_lbs")),
                format!("GVWR: {} lbs", rec.text("gvwr_lbs")),
                format!("Slides: {}", rec.text("slides")),
            ]);
            if rec.is_present("tank_capacities") {
                let tanks = rec.get("tank_capacities");
                facts.push(format!(
                    "Tanks: fresh {} / gray {} / black {} / propane {}",
                    tanks.text("fresh_water"),
                    tanks.text("gray_water"),
                    tanks.text("black_water"),
                    tanks.text("propane")
                ));
            }
        }
        if rec.is_present("tco_5year") || rec.is_present("resale_3year") {
            facts.push(format!("5-year cost of ownership: {}", rec.text("tco_5year")));
            facts.push(format!("3-year resale: {}", rec.text("resale_3year")));
        }
        section.list(facts, false);
        labelled_notes(&mut section, rec, &[self.best_pick]);

        for (label, key) in [("Strengths:", "pros"), ("Weaknesses:", "cons")] {
            let items = rec.strings(key);
            if !items.is_empty() {
                section.narrative(label);
                section.list(items, false);
            }
        }
        let sources = rec.strings("key_sources");
        if !sources.is_empty() {
            section.narrative(format!("Sources: {}", sources.join(", ")));
        }
        labelled_notes(&mut section, rec, &[("Finder prompt", "finder_prompt")]);
        Ok(section)
    }
}

impl ReportProfile for RecommenderProfile {
    fn kind(&self) -> ReportKind {
        self.kind
    }

    fn expected_type(&self) -> &'static str {
        self.expected_type
    }

    fn folder(&self) -> &'static str {
        self.folder
    }

    fn stem_subject(&self, payload: Fields<'_>) -> String {
        self.subject(payload)
    }

    fn stem_suffix(&self, _payload: Fields<'_>) -> String {
        self.folder.to_string()
    }

    fn enum_scales(&self) -> &'static [&'static str] {
        &["tier"]
    }

    fn build(&self, payload: Fields<'_>, palette: &Palette) -> Result<Document, ExportError> {
        let requirements = payload.get("requirements_profile");
        let recommendations = payload.list("recommendations");

        let mut doc = Document::new(self.title, self.kind.as_str(), palette.accent);
        doc.subtitle =
            format!("{} - {}", self.subject(payload), requirements.text_or("budget_range", "Not specified"));
        doc.footer = self.title.to_string();
        doc.meta("Generated", payload.text_or("generated_date", ""))
            .meta("Depth", payload.text_or("depth", "standard").to_uppercase())
            .meta("Analyzed", format_number(payload.number(self.analyzed_key)))
            .meta("Shortlist", format_number(payload.number("shortlist_count")));

        doc.push_section(self.requirements(requirements));

        let methodology = payload.get("methodology");
        let mut method = Section::new("Methodology");
        if payload.is_present("methodology") {
            method.list(
                vec![
                    format!("Agents dispatched: {}", format_number(methodology.number("agents_dispatched"))),
                    format!("Total searches: {}", format_number(methodology.number("total_searches"))),
                    format!("Sources covered: {}", methodology.strings("sources_covered").join(", ")),
                    format!("Depth: {}", methodology.text_or("depth", "standard")),
                ],
                false,
            );
        }
        doc.push_section(method);

        doc.push_section(self.overview(&recommendations, palette)?);
        for rec in &recommendations {
            doc.push_section(self.detail(*rec, palette)?);
        }

        let mut insights = Section::new("Segment Insights");
        labelled_notes(
            &mut insights,
            payload.get("themes"),
            &[
                ("Segment insight", "segment_insight"),
                ("Best value", "best_value"),
                self.leader,
                ("Rising star", "rising_star"),
            ],
        );
        doc.push_section(insights);

        Ok(doc)
    }

    fn summary(&self, payload: Fields<'_>) -> Map<String, Value> {
        let recommendations = payload.list("recommendations");
        let mut summary = Map::new();
        summary.insert("recommendations".into(), number_value(recommendations.len() as f64));
        if let Some(top) = recommendations.first() {
            summary.insert("top_pick".into(), Value::String(self.name(*top)));
            summary.insert("top_tier".into(), Value::String(top.text_or("tier", "CONSIDER")));
        }
        summary
    }
}
