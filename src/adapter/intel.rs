//! Intelligence briefings and the prediction log kept alongside them.
//!
//! All three reports share one folder and one palette. Confidence values
//! arrive as fractions (`0.85`) and are classified as percentages.

use serde_json::{Map, Value};

use super::{ReportKind, ReportProfile};
use crate::error::ExportError;
use crate::model::{Cell, ColumnDef, Document, Section, Table};
use crate::payload::{Fields, format_number, number_value};
use crate::rules::Palette;

const FOLDER: &str = "Intel-Briefings";

/// Percentage for a confidence field. Values above 1 are taken as percentages already.
fn confidence_percent(source: Fields<'_>, key: &str) -> f64 {
    let raw = source.number(key);
    if raw > 1.0 { raw } else { raw * 100.0 }
}

/// Confidence cell such as `85%`, banded high, medium or low.
fn confidence_cell(source: Fields<'_>, key: &str, palette: &Palette) -> Result<Cell, ExportError> {
    let pct = confidence_percent(source, key);
    let text = if pct == 0.0 { "N/A".to_string() } else { format!("{:.0}%", pct) };
    Ok(Cell::banded(text, palette.score_band("confidence", pct)?))
}

/// Upper-cased enum value drawn in its band, e.g. `PARTIALLY CORRECT`.
fn enum_cell(palette: &Palette, scale: &str, value: &str) -> Result<Cell, ExportError> {
    let band = palette.enum_band(scale, value)?;
    let text = if value.trim().is_empty() { band.label.clone() } else { value.to_uppercase().replace('_', " ") };
    Ok(Cell::banded(text, band))
}

fn generated_meta(doc: &mut Document, payload: Fields<'_>) {
    doc.meta("Generated", payload.text_or("date", ""));
}

/// Periodic briefing across financial and geopolitical sources.
pub struct BriefingProfile;

impl ReportProfile for BriefingProfile {
    fn kind(&self) -> ReportKind {
        ReportKind::IntelBriefing
    }

    fn expected_type(&self) -> &'static str {
        "briefing"
    }

    fn folder(&self) -> &'static str {
        FOLDER
    }

    fn stem_subject(&self, _payload: Fields<'_>) -> String {
        "intel-briefing".to_string()
    }

    fn stem_suffix(&self, payload: Fields<'_>) -> String {
        format!("v{}", payload.text_or("version", "1"))
    }

    fn score_scales(&self) -> &'static [&'static str] {
        &["confidence"]
    }

    fn enum_scales(&self) -> &'static [&'static str] {
        &["outlook", "risk", "outcome"]
    }

    fn build(&self, payload: Fields<'_>, palette: &Palette) -> Result<Document, ExportError> {
        let version = payload.text_or("version", "1");
        let title = format!("Intelligence Briefing v{}", version);
        let mut doc = Document::new(title.clone(), self.kind().as_str(), palette.accent);
        doc.subtitle = "Financial and geopolitical intelligence".to_string();
        doc.footer = title;
        generated_meta(&mut doc, payload);
        doc.meta("Documents", format_number(payload.number("document_count")))
            .meta("New Since Last", format_number(payload.number("new_since_last")))
            .meta("Active Predictions", format_number(payload.number("prediction_count")));

        let mut summary = Section::new("Executive Summary");
        summary.narrative(payload.text_or("executive_summary", "No summary available."));
        doc.push_section(summary);

        doc.push_section(developments(&payload.list("key_developments"), palette)?);
        if payload.is_present("financial_section") {
            doc.push_section(financial(payload.get("financial_section"), palette)?);
        }
        if payload.is_present("geopolitical_section") {
            doc.push_section(geopolitical(payload.get("geopolitical_section"), palette)?);
        }
        doc.push_section(cross_domain(&payload.list("cross_domain_themes"), palette)?);
        doc.push_section(consensus(payload, palette)?);
        doc.push_section(contested(payload));
        doc.push_section(tracking(payload.get("prediction_tracking"), palette)?);

        let mut alerts = Section::new("Alert Matches");
        alerts.list(
            payload
                .list("alert_matches")
                .iter()
                .map(|alert| format!("{}: {}", alert.text_or("alert_topic", ""), alert.text_or("significance", "")))
                .collect(),
            false,
        );
        doc.push_section(alerts);

        let mut watch = Section::new("Watch Items");
        watch.list(payload.strings("watch_items"), false);
        doc.push_section(watch);

        Ok(doc)
    }

    fn summary(&self, payload: Fields<'_>) -> Map<String, Value> {
        let mut summary = Map::new();
        summary.insert("version".into(), Value::String(payload.text_or("version", "1")));
        summary.insert("documents".into(), number_value(payload.number("document_count")));
        summary.insert("predictions".into(), number_value(payload.number("prediction_count")));
        summary
    }
}

fn developments(items: &[Fields<'_>], palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("Key Developments Since Last Briefing");
    let mut plain = Vec::new();
    let mut table = Table::new(vec![
        ColumnDef::new("Development", 90.0),
        ColumnDef::new("Source", 40.0),
        ColumnDef::new("Impact", 20.0).centered(),
    ]);
    for item in items {
        match item.as_text() {
            Some(text) => plain.push(text),
            None => table.push_row(vec![
                item.text_or("development", "").into(),
                item.text("source").into(),
                enum_cell(palette, "risk", &item.text_or("impact", "medium"))?,
            ])?,
        }
    }
    section.list(plain, false);
    if !table.is_empty() {
        section.table(table);
    }
    Ok(section)
}

fn prediction_table(predictions: &[Fields<'_>], palette: &Palette) -> Result<Table, ExportError> {
    let mut table = Table::new(vec![
        ColumnDef::new("#", 8.0).centered(),
        ColumnDef::new("Prediction", 70.0),
        ColumnDef::new("Timeframe", 22.0).centered(),
        ColumnDef::new("Confidence", 20.0).centered(),
        ColumnDef::new("Rationale", 50.0),
    ]);
    for (i, prediction) in predictions.iter().enumerate() {
        table.push_row(vec![
            (i + 1).to_string().into(),
            prediction.text_or("prediction", "").into(),
            prediction.text_or("timeframe", "").into(),
            confidence_cell(*prediction, "confidence", palette)?,
            prediction.text_or("rationale", "").into(),
        ])?;
    }
    Ok(table)
}

fn financial(section_data: Fields<'_>, palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("Financial Outlook");
    let outlook = section_data.get("market_outlook");
    section.narrative(format!("Short-term (0-6mo): {}", outlook.text("short_term")));
    section.narrative(format!("Medium-term (6-24mo): {}", outlook.text("medium_term")));

    let views = section_data.list("sector_views");
    if !views.is_empty() {
        let mut table = Table::new(vec![
            ColumnDef::new("Sector", 40.0),
            ColumnDef::new("Outlook", 22.0).centered(),
            ColumnDef::new("Confidence", 20.0).centered(),
            ColumnDef::new("Key Factor", 80.0),
        ]);
        for view in &views {
            table.push_row(vec![
                view.text_or("sector", "").into(),
                enum_cell(palette, "outlook", &view.text_or("outlook", ""))?,
                confidence_cell(*view, "confidence", palette)?,
                view.text_or("rationale", "").into(),
            ])?;
        }
        section.narrative("Sector views:");
        section.table(table);
    }

    let predictions = section_data.list("predictions");
    if !predictions.is_empty() {
        section.narrative("Financial predictions:");
        section.table(prediction_table(&predictions, palette)?);
    }
    Ok(section)
}

fn geopolitical(section_data: Fields<'_>, palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("Geopolitical Analysis");
    section.narrative(section_data.text_or("section_summary", ""));

    let risks = section_data.list("risk_matrix");
    if !risks.is_empty() {
        let mut table = Table::new(vec![
            ColumnDef::new("Risk", 70.0),
            ColumnDef::new("Probability", 24.0).centered(),
            ColumnDef::new("Impact", 24.0).centered(),
            ColumnDef::new("Timeframe", 30.0).centered(),
        ]);
        for risk in &risks {
            table.push_row(vec![
                risk.text_or("risk", "").into(),
                enum_cell(palette, "risk", &risk.text_or("probability", ""))?,
                enum_cell(palette, "risk", &risk.text_or("impact", ""))?,
                risk.text_or("timeframe", "").into(),
            ])?;
        }
        section.narrative("Risk matrix:");
        section.table(table);
    }

    let predictions = section_data.list("predictions");
    if !predictions.is_empty() {
        section.narrative("Geopolitical predictions:");
        section.table(prediction_table(&predictions, palette)?);
    }
    Ok(section)
}

fn cross_domain(themes: &[Fields<'_>], palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("Cross-Domain Themes");
    if themes.is_empty() {
        return Ok(section);
    }
    let mut table = Table::new(vec![
        ColumnDef::new("Theme", 40.0),
        ColumnDef::new("Financial Angle", 55.0),
        ColumnDef::new("Geopolitical Angle", 55.0),
        ColumnDef::new("Confidence", 20.0).centered(),
    ]);
    for theme in themes {
        table.push_row(vec![
            theme.text_or("theme", "").into(),
            theme.text_or("financial_angle", "").into(),
            theme.text_or("geopolitical_angle", "").into(),
            confidence_cell(*theme, "confidence", palette)?,
        ])?;
    }
    section.table(table);
    Ok(section)
}

fn consensus(payload: Fields<'_>, palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("High-Confidence Themes");
    let themes = payload.entries("consensus_themes");
    if themes.is_empty() {
        if payload.is_present("consensus_themes") {
            section.narrative("No consensus themes detected yet.");
        }
        return Ok(section);
    }
    let mut table = Table::new(vec![
        ColumnDef::new("Theme", 45.0),
        ColumnDef::new("Description", 100.0),
        ColumnDef::new("Confidence", 20.0).centered(),
    ]);
    for (name, info) in themes {
        let description = info.as_text().unwrap_or_else(|| info.text_or("description", ""));
        table.push_row(vec![name.into(), description.into(), confidence_cell(info, "confidence", palette)?])?;
    }
    section.table(table);
    Ok(section)
}

fn contested(payload: Fields<'_>) -> Section {
    let mut section = Section::new("Contested Topics");
    for (name, info) in payload.entries("contested_topics") {
        section.narrative(name);
        let view = |key: &str| {
            let side = info.get(key);
            let sources = side.strings("sources");
            if sources.is_empty() {
                side.text_or("position", "")
            } else {
                format!("{} (sources: {})", side.text_or("position", ""), sources.join(", "))
            }
        };
        section.list(
            vec![
                format!("View A: {}", view("view_a")),
                format!("View B: {}", view("view_b")),
                format!("Assessment: {}", info.text_or("assessment", "")),
            ],
            false,
        );
    }
    section
}

fn tracking(tracking: Fields<'_>, palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("Prediction Tracking");
    let due = tracking.list("due_for_evaluation");
    if !due.is_empty() {
        let mut table = Table::new(vec![
            ColumnDef::new("Prediction", 80.0),
            ColumnDef::new("Made", 22.0).centered(),
            ColumnDef::new("Target Date", 22.0).centered(),
            ColumnDef::new("Source", 40.0),
        ]);
        for prediction in &due {
            table.push_row(
                ["prediction", "made", "target_date", "source"]
                    .iter()
                    .map(|key| Cell::plain(prediction.text_or(key, "")))
                    .collect(),
            )?;
        }
        section.narrative("Due for evaluation:");
        section.table(table);
    }

    let outcomes = tracking.list("recent_outcomes");
    if !outcomes.is_empty() {
        let mut table = Table::new(vec![
            ColumnDef::new("Prediction", 80.0),
            ColumnDef::new("Outcome", 30.0).centered(),
            ColumnDef::new("Notes", 60.0),
        ]);
        for outcome in &outcomes {
            table.push_row(vec![
                outcome.text_or("prediction", "").into(),
                enum_cell(palette, "outcome", &outcome.text_or("outcome", ""))?,
                outcome.text_or("notes", "").into(),
            ])?;
        }
        section.narrative("Recent outcomes:");
        section.table(table);
    }

    if tracking.is_present("accuracy_summary") {
        let accuracy = tracking.get("accuracy_summary");
        section.list(
            vec![
                format!("Financial accuracy: {}", accuracy.text("financial")),
                format!("Geopolitical accuracy: {}", accuracy.text("geopolitical")),
                format!("Overall accuracy: {}", accuracy.text("overall")),
            ],
            false,
        );
    }
    Ok(section)
}

/// Log of every tracked prediction and its outcome so far.
pub struct PredictionsProfile;

impl ReportProfile for PredictionsProfile {
    fn kind(&self) -> ReportKind {
        ReportKind::IntelPredictions
    }

    fn expected_type(&self) -> &'static str {
        "predictions"
    }

    fn folder(&self) -> &'static str {
        FOLDER
    }

    fn stem_subject(&self, _payload: Fields<'_>) -> String {
        "prediction report".to_string()
    }

    fn stem_suffix(&self, _payload: Fields<'_>) -> String {
        String::new()
    }

    fn score_scales(&self) -> &'static [&'static str] {
        &["confidence"]
    }

    fn enum_scales(&self) -> &'static [&'static str] {
        &["outcome"]
    }

    fn build(&self, payload: Fields<'_>, palette: &Palette) -> Result<Document, ExportError> {
        let predictions = payload.list("predictions");
        let mut doc = Document::new("Prediction Tracking Report", self.kind().as_str(), palette.accent);
        doc.footer = "Prediction Tracking Report".to_string();
        generated_meta(&mut doc, payload);
        doc.meta("Total Predictions", predictions.len().to_string());

        let mut section = Section::new("Predictions");
        if predictions.is_empty() {
            section.narrative("No predictions are being tracked.");
        } else {
            let mut table = Table::new(vec![
                ColumnDef::new("Prediction", 70.0),
                ColumnDef::new("Category", 24.0).centered(),
                ColumnDef::new("Confidence", 20.0).centered(),
                ColumnDef::new("Timeframe", 22.0).centered(),
                ColumnDef::new("Target", 22.0).centered(),
                ColumnDef::new("Outcome", 28.0).centered(),
                ColumnDef::new("Source", 30.0),
            ]);
            for prediction in &predictions {
                table.push_row(vec![
                    prediction.text_or("prediction_text", "").into(),
                    prediction.text_or("category", "").into(),
                    confidence_cell(*prediction, "initial_confidence", palette)?,
                    prediction.text_or("timeframe", "").into(),
                    prediction.text_or("target_date", "").into(),
                    enum_cell(palette, "outcome", &prediction.text_or("outcome", "pending"))?,
                    prediction.text_or("source_author", "").into(),
                ])?;
            }
            section.table(table);
        }
        doc.push_section(section);
        Ok(doc)
    }

    fn summary(&self, payload: Fields<'_>) -> Map<String, Value> {
        let mut summary = Map::new();
        summary.insert("predictions".into(), number_value(payload.list("predictions").len() as f64));
        summary
    }
}

/// Scorecard of evaluated predictions by category and by source.
pub struct AccuracyProfile;

impl ReportProfile for AccuracyProfile {
    fn kind(&self) -> ReportKind {
        ReportKind::IntelAccuracy
    }

    fn expected_type(&self) -> &'static str {
        "accuracy"
    }

    fn folder(&self) -> &'static str {
        FOLDER
    }

    fn stem_subject(&self, _payload: Fields<'_>) -> String {
        "accuracy report".to_string()
    }

    fn stem_suffix(&self, _payload: Fields<'_>) -> String {
        String::new()
    }

    fn score_scales(&self) -> &'static [&'static str] {
        &[]
    }

    fn enum_scales(&self) -> &'static [&'static str] {
        &[]
    }

    fn build(&self, payload: Fields<'_>, palette: &Palette) -> Result<Document, ExportError> {
        let mut doc = Document::new("Prediction Accuracy Report", self.kind().as_str(), palette.accent);
        doc.footer = "Prediction Accuracy Report".to_string();
        generated_meta(&mut doc, payload);

        let overall = payload.get("overall");
        let mut section = Section::new("Overall Performance");
        section.list(
            vec![
                format!("Total: {}", format_number(overall.number("total"))),
                format!("Evaluated: {}", format_number(overall.number("evaluated"))),
                format!("Correct: {}", format_number(overall.number("correct"))),
                format!("Accuracy: {}", overall.text("accuracy")),
                format!("Brier score: {}", overall.text("brier")),
            ],
            false,
        );
        doc.push_section(section);

        let categories = payload.list("by_category");
        let mut section = Section::new("By Category");
        if !categories.is_empty() {
            let mut table = Table::new(vec![
                ColumnDef::new("Category", 40.0),
                ColumnDef::new("Evaluated", 20.0).right(),
                ColumnDef::new("Correct", 18.0).right(),
                ColumnDef::new("Partial", 18.0).right(),
                ColumnDef::new("Incorrect", 20.0).right(),
                ColumnDef::new("Accuracy", 20.0).centered(),
                ColumnDef::new("Brier", 18.0).centered(),
            ]);
            for category in &categories {
                table.push_row(vec![
                    category.text_or("category", "").into(),
                    format_number(category.number("evaluated")).into(),
                    format_number(category.number("correct")).into(),
                    format_number(category.number("partial")).into(),
                    format_number(category.number("incorrect")).into(),
                    category.text("accuracy").into(),
                    category.text("brier").into(),
                ])?;
            }
            section.table(table);
        }
        doc.push_section(section);

        let sources = payload.list("by_source");
        let mut section = Section::new("By Source");
        if !sources.is_empty() {
            let mut table = Table::new(vec![
                ColumnDef::new("Source", 50.0),
                ColumnDef::new("Predictions", 22.0).right(),
                ColumnDef::new("Correct", 18.0).right(),
                ColumnDef::new("Accuracy", 20.0).centered(),
                ColumnDef::new("Trust Tier", 24.0).centered(),
            ]);
            for source in &sources {
                table.push_row(vec![
                    source.text_or("source", "").into(),
                    format_number(source.number("predictions")).into(),
                    format_number(source.number("correct")).into(),
                    source.text("accuracy").into(),
                    source.text_or("trust_tier", "STANDARD").into(),
                ])?;
            }
            section.table(table);
        }
        doc.push_section(section);

        Ok(doc)
    }

    fn summary(&self, payload: Fields<'_>) -> Map<String, Value> {
        let overall = payload.get("overall");
        let mut summary = Map::new();
        summary.insert("evaluated".into(), number_value(overall.number("evaluated")));
        summary.insert("accuracy".into(), Value::String(overall.text("accuracy")));
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Block;
    use crate::report::export::artifact_stem;
    use crate::rules::RuleBook;
    use serde_json::json;

    fn palette(book: &RuleBook) -> &Palette {
        book.palette("intel").unwrap()
    }

    fn tables(section: &Section) -> Vec<&Table> {
        section
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Table(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_stems_follow_report_type() {
        let payload = json!({"date": "2025-05-01", "version": 3});
        let fields = Fields::new(&payload);
        assert_eq!(artifact_stem(&BriefingProfile, fields), "2025-05-01_intel-briefing_v3");
        assert_eq!(artifact_stem(&PredictionsProfile, fields), "2025-05-01_prediction-report");
        assert_eq!(artifact_stem(&AccuracyProfile, fields), "2025-05-01_accuracy-report");
    }

    #[test]
    fn test_briefing_bands_confidence_outlook_and_impact() {
        let payload = json!({
            "type": "briefing",
            "version": 2,
            "key_developments": [
                "Rates held steady",
                {"development": "Port strike", "source": "Reuters", "impact": "high"}
            ],
            "financial_section": {
                "sector_views": [
                    {"sector": "Energy", "outlook": "bullish", "confidence": 0.72},
                    {"sector": "Retail", "outlook": "sideways", "confidence": 0.35}
                ]
            }
        });
        let book = RuleBook::builtin().unwrap();
        let doc = BriefingProfile.build(Fields::new(&payload), palette(&book)).unwrap();
        assert_eq!(doc.title, "Intelligence Briefing v2");

        let devs = doc.sections.iter().find(|s| s.heading.starts_with("Key Developments")).unwrap();
        assert!(matches!(&devs.blocks[0], Block::List { items, .. } if items[0] == "Rates held steady"));
        let impact = &tables(devs)[0].rows()[0][2];
        assert_eq!(impact.text, "HIGH");
        assert_eq!(impact.band.as_ref().unwrap().background.to_hex(), "#FEE2E2");

        let fin = doc.sections.iter().find(|s| s.heading == "Financial Outlook").unwrap();
        let rows = tables(fin)[0].rows();
        assert_eq!(rows[0][1].text, "BULLISH");
        assert_eq!(rows[0][2].text, "72%");
        assert_eq!(rows[0][2].band.as_ref().unwrap().label, "HIGH");
        assert_eq!(rows[1][1].band.as_ref().unwrap().label, "NEUTRAL");
        assert_eq!(rows[1][2].band.as_ref().unwrap().label, "LOW");
    }

    #[test]
    fn test_briefing_without_summary_says_so() {
        let book = RuleBook::builtin().unwrap();
        let doc = BriefingProfile.build(Fields::new(&json!({})), palette(&book)).unwrap();
        assert_eq!(doc.sections[0].heading, "Executive Summary");
        assert!(matches!(&doc.sections[0].blocks[0], Block::Narrative(text) if text == "No summary available."));
    }

    #[test]
    fn test_prediction_outcomes_default_to_pending() {
        let payload = json!({"predictions": [
            {"prediction_text": "Oil above $90", "initial_confidence": 0.55, "outcome": "partially_correct"},
            {"prediction_text": "Tariffs eased", "initial_confidence": 0.8}
        ]});
        let book = RuleBook::builtin().unwrap();
        let doc = PredictionsProfile.build(Fields::new(&payload), palette(&book)).unwrap();
        let rows = tables(&doc.sections[0])[0].rows();
        assert_eq!(rows[0][2].band.as_ref().unwrap().label, "MEDIUM");
        assert_eq!(rows[0][5].text, "PARTIALLY CORRECT");
        assert_eq!(rows[1][5].text, "PENDING");
        assert_eq!(rows[1][5].band.as_ref().unwrap().label, "PENDING");
    }

    #[test]
    fn test_accuracy_sources_default_trust_tier() {
        let payload = json!({
            "overall": {"total": 40, "evaluated": 25, "correct": 15, "accuracy": "60%"},
            "by_source": [{"source": "Analyst Desk", "predictions": 12, "correct": 8, "accuracy": "67%"}]
        });
        let book = RuleBook::builtin().unwrap();
        let doc = AccuracyProfile.build(Fields::new(&payload), palette(&book)).unwrap();
        let by_source = doc.sections.iter().find(|s| s.heading == "By Source").unwrap();
        assert_eq!(tables(by_source)[0].rows()[0][4].text, "STANDARD");
        assert!(doc.sections.iter().all(|s| s.heading != "By Category"));
        assert_eq!(AccuracyProfile.summary(Fields::new(&payload))["accuracy"], "60%");
    }
}
