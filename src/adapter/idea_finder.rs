use serde_json::{Map, Value};

use super::{ReportKind, ReportProfile, labelled_notes};
use crate::error::ExportError;
use crate::model::{Block, Cell, ColumnDef, Document, Section, Table};
use crate::payload::{Fields, format_number, number_value};
use crate::rules::Palette;

const SCORES: [(&str, &str); 3] =
    [("Composite", "composite_score"), ("Profile Fit", "profile_fit"), ("Opportunity", "opportunity_signal")];

/// Shortlist of business ideas surfaced by a broad market scan.
pub struct IdeaFinderProfile;

impl ReportProfile for IdeaFinderProfile {
    fn kind(&self) -> ReportKind {
        ReportKind::IdeaFinder
    }

    fn expected_type(&self) -> &'static str {
        "idea_finder_shortlist"
    }

    fn folder(&self) -> &'static str {
        "Idea_Finder"
    }

    fn stem_subject(&self, payload: Fields<'_>) -> String {
        let topic = payload.text_or("topic", "");
        if topic.trim().is_empty() { "broad scan".to_string() } else { topic }
    }

    fn stem_suffix(&self, _payload: Fields<'_>) -> String {
        "Idea_Finder".to_string()
    }

    fn enum_scales(&self) -> &'static [&'static str] {
        &["tier"]
    }

    fn build(&self, payload: Fields<'_>, palette: &Palette) -> Result<Document, ExportError> {
        let topic = payload.text_or("topic", "");
        let topic = if topic.trim().is_empty() { "Broad Market Scan".to_string() } else { topic };
        let shortlist = payload.list("shortlist");

        let mut doc = Document::new("Business Idea Finder", self.kind().as_str(), palette.accent);
        doc.subtitle = topic;
        doc.footer = "Business Idea Finder".to_string();
        doc.meta("Generated", payload.text_or("generated_date", ""))
            .meta("Depth", payload.text_or("depth", "explore").to_uppercase())
            .meta("Raw Discoveries", format_number(payload.number("total_raw_discoveries")))
            .meta("After Dedup", format_number(payload.number("after_dedup")))
            .meta("Shortlisted", format_number(shortlist.len() as f64));

        let methodology = payload.get("methodology");
        let mut method = Section::new("Methodology");
        if payload.is_present("methodology") {
            method.list(
                vec![
                    format!("Agents dispatched: {}", format_number(methodology.number("agents_dispatched"))),
                    format!("Total searches: {}", format_number(methodology.number("total_searches"))),
                    format!("Duplicates merged: {}", format_number(methodology.number("dedup_merges"))),
                    format!("Sources covered: {}", methodology.strings("sources_covered").join(", ")),
                ],
                false,
            );
        }
        doc.push_section(method);

        doc.push_section(overview(&shortlist, palette)?);

        for idea in &shortlist {
            doc.push_section(idea_detail(*idea, palette)?);
        }

        let mut themes = Section::new("Emerging Themes");
        labelled_notes(
            &mut themes,
            payload.get("themes"),
            &[
                ("Dominant theme", "dominant_theme"),
                ("Emerging niche", "emerging_niche"),
                ("Strongest arbitrage", "strongest_arbitrage"),
            ],
        );
        doc.push_section(themes);

        Ok(doc)
    }

    fn summary(&self, payload: Fields<'_>) -> Map<String, Value> {
        let shortlist = payload.list("shortlist");
        let mut summary = Map::new();
        summary.insert("shortlist".into(), number_value(shortlist.len() as f64));
        if let Some(top) = shortlist.first() {
            summary.insert("top_idea".into(), Value::String(top.text_or("idea_name", "Unnamed Idea")));
            summary.insert("top_tier".into(), Value::String(top.text_or("tier", "WATCH")));
        }
        summary
    }
}

fn overview(shortlist: &[Fields<'_>], palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("Shortlist Overview");
    if shortlist.is_empty() {
        section.narrative("No ideas made the shortlist.");
        return Ok(section);
    }
    let mut table = Table::new(vec![
        ColumnDef::new("#", 8.0).centered(),
        ColumnDef::new("Idea", 46.0),
        ColumnDef::new("Tier", 18.0).centered(),
        ColumnDef::new("Score", 14.0).centered(),
        ColumnDef::new("Fit", 12.0).centered(),
        ColumnDef::new("Opp", 12.0).centered(),
        ColumnDef::new("Type", 28.0),
        ColumnDef::new("Build", 18.0),
        ColumnDef::new("Window", 20.0),
    ]);
    for idea in shortlist {
        let tier = palette.enum_band("tier", &idea.text_or("tier", ""))?;
        let mut row = vec![
            idea.text_or("rank", "").into(),
            idea.text_or("idea_name", "Unnamed Idea").into(),
            Cell::banded(tier.label.clone(), tier),
        ];
        for (_, key) in SCORES {
            let score = idea.number(key);
            row.push(Cell::banded(format_number(score), palette.score_band("score", score)?));
        }
        row.extend([
            idea.text_or("opportunity_type", "Unknown").into(),
            idea.text("estimated_build_time").into(),
            idea.text("arbitrage_window").into(),
        ]);
        table.push_row(row)?;
    }
    section.table(table);
    Ok(section)
}

fn idea_detail(idea: Fields<'_>, palette: &Palette) -> Result<Section, ExportError> {
    let tier = palette.enum_band("tier", &idea.text_or("tier", ""))?;
    let mut section = Section::new(format!(
        "#{} {} ({})",
        idea.text_or("rank", ""),
        idea.text_or("idea_name", "Unnamed Idea"),
        tier.label
    ));
    section.narrative(idea.text_or("one_liner", ""));
    for (label, key) in SCORES {
        let score = idea.number(key);
        let band = palette.score_band("score", score)?.clone();
        section.push(Block::ScoreBar { label: label.to_string(), score, band });
    }

    let mut facts = vec![
        format!("Opportunity type: {}", idea.text_or("opportunity_type", "Unknown")),
        format!("Build time: {}", idea.text("estimated_build_time")),
        format!("Arbitrage window: {}", idea.text("arbitrage_window")),
    ];
    let modes = idea.strings("discovery_modes");
    if !modes.is_empty() {
        facts.push(format!("Discovery modes: {}", modes.join(", ")));
    }
    if let Some(multiplier) = idea.opt_number("intersection_multiplier")
        && multiplier > 1.0
    {
        facts.push(format!("Intersection multiplier: {}x", format_number(multiplier)));
    }
    section.list(facts, false);
    labelled_notes(
        &mut section,
        idea,
        &[("Key evidence", "key_evidence"), ("AI advantage", "ai_advantage"), ("Analyze next", "analyze_prompt")],
    );
    Ok(section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleBook;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "type": "idea_finder_shortlist",
            "topic": "",
            "depth": "deep",
            "generated_date": "2025-04-02",
            "shortlist": [
                {"rank": 1, "idea_name": "Permit Tracker", "tier": "HOT", "composite_score": 84,
                 "profile_fit": 71, "opportunity_signal": 48, "intersection_multiplier": 1.5,
                 "discovery_modes": ["pain_mining", "regulation"]},
                {"rank": 2, "idea_name": "Quiet Idea", "tier": "mystery", "composite_score": 55}
            ],
            "themes": {"dominant_theme": "Compliance automation"}
        })
    }

    fn build(payload: &Value) -> Document {
        let book = RuleBook::builtin().unwrap();
        IdeaFinderProfile.build(Fields::new(payload), book.palette("idea-finder").unwrap()).unwrap()
    }

    #[test]
    fn test_shortlist_scores_and_tiers_are_banded() {
        let doc = build(&sample());
        assert_eq!(doc.subtitle, "Broad Market Scan");
        let section = doc.sections.iter().find(|s| s.heading == "Shortlist Overview").unwrap();
        let Block::Table(table) = &section.blocks[0] else { panic!("expected a table") };
        let rows = table.rows();
        assert_eq!(rows[0][2].text, "HOT");
        assert_eq!(rows[0][3].band.as_ref().unwrap().label, "Excellent");
        assert_eq!(rows[0][4].band.as_ref().unwrap().label, "Strong");
        assert_eq!(rows[0][5].band.as_ref().unwrap().label, "Weak");
        assert_eq!(rows[1][2].text, "WATCH");
    }

    #[test]
    fn test_detail_lists_multiplier_only_above_one() {
        let doc = build(&sample());
        let detail = doc.sections.iter().find(|s| s.heading == "#1 Permit Tracker (HOT)").unwrap();
        let facts = detail.blocks.iter().find_map(|b| match b {
            Block::List { items, .. } => Some(items.clone()),
            _ => None,
        });
        let facts = facts.unwrap();
        assert!(facts.contains(&"Intersection multiplier: 1.5x".to_string()));
        assert!(facts.contains(&"Discovery modes: pain_mining, regulation".to_string()));

        let quiet = doc.sections.iter().find(|s| s.heading == "#2 Quiet Idea (WATCH)").unwrap();
        assert!(!format!("{:?}", quiet.blocks).contains("Intersection"));
    }

    #[test]
    fn test_blank_topic_names_a_broad_scan() {
        let payload = sample();
        assert_eq!(IdeaFinderProfile.stem_subject(Fields::new(&payload)), "broad scan");
        let summary = IdeaFinderProfile.summary(Fields::new(&payload));
        assert_eq!(summary["top_idea"], "Permit Tracker");
        assert_eq!(summary["shortlist"], 2);
    }
}
