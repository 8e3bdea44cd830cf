use serde_json::{Map, Value};

use super::{ReportKind, ReportProfile, labelled_notes, title_case};
use crate::error::ExportError;
use crate::model::{Block, Cell, ColumnDef, Document, Section, Table};
use crate::payload::{Fields, format_number, number_value};
use crate::rules::Palette;

/// Score columns shared by the overview table and the detail bars.
const SCORES: [(&str, &str); 4] = [
    ("Composite", "composite_score"),
    ("Personal Utility", "personal_utility"),
    ("Marketization", "marketization_score"),
    ("Novelty", "novelty_score"),
];

/// Shortlist of plugin ideas generated from an existing plugin portfolio.
pub struct PluginIdeasProfile;

impl ReportProfile for PluginIdeasProfile {
    fn kind(&self) -> ReportKind {
        ReportKind::PluginIdeas
    }

    fn expected_type(&self) -> &'static str {
        "plugin_idea_shortlist"
    }

    fn folder(&self) -> &'static str {
        "Plugin_Ideas"
    }

    fn stem_subject(&self, payload: Fields<'_>) -> String {
        let topic = payload.text_or("topic", "");
        if topic.trim().is_empty() { "open discovery".to_string() } else { topic }
    }

    fn stem_suffix(&self, _payload: Fields<'_>) -> String {
        "Plugin_Ideas".to_string()
    }

    fn enum_scales(&self) -> &'static [&'static str] {
        &["tier", "pathway"]
    }

    fn build(&self, payload: Fields<'_>, palette: &Palette) -> Result<Document, ExportError> {
        let topic = payload.text_or("topic", "");
        let shortlist = payload.list("shortlist");

        let mut doc = Document::new("Plugin Idea Generator", self.kind().as_str(), palette.accent);
        doc.subtitle = if topic.trim().is_empty() { "Open Discovery".to_string() } else { topic };
        doc.footer = "Plugin Idea Generator".to_string();
        doc.meta("Generated", payload.text_or("generated_date", ""))
            .meta("Depth", payload.text_or("depth", "standard").to_uppercase())
            .meta("Plugins Scanned", format_number(payload.number("plugins_scanned")))
            .meta("Ideas Generated", format_number(payload.number("ideas_generated")))
            .meta("Shortlisted", format_number(shortlist.len() as f64));

        let methodology = payload.get("methodology");
        let mut method = Section::new("Methodology");
        if payload.is_present("methodology") {
            let mut items = vec![
                format!("Agents dispatched: {}", format_number(methodology.number("agents_dispatched"))),
                format!("Total searches: {}", format_number(methodology.number("total_searches"))),
                format!("Duplicates merged: {}", format_number(methodology.number("dedup_merges"))),
                format!("Sources covered: {}", methodology.strings("sources_covered").join(", ")),
            ];
            let strategies: Vec<String> = methodology
                .entries("strategies_used")
                .into_iter()
                .map(|(name, count)| format!("{}: {}", name, count.as_text().unwrap_or_default()))
                .collect();
            if !strategies.is_empty() {
                items.push(format!("Strategies used: {}", strategies.join(", ")));
            }
            method.list(items, false);
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
                ("Emerging capability", "emerging_capability"),
                ("Strongest market signal", "strongest_market_signal"),
            ],
        );
        doc.push_section(themes);

        doc.push_section(portfolio_gaps(payload.get("portfolio_analysis"), payload.is_present("portfolio_analysis")));

        Ok(doc)
    }

    fn summary(&self, payload: Fields<'_>) -> Map<String, Value> {
        let shortlist = payload.list("shortlist");
        let mut summary = Map::new();
        summary.insert("shortlist".into(), number_value(shortlist.len() as f64));
        if let Some(top) = shortlist.first() {
            summary.insert("top_idea".into(), Value::String(display_name(*top)));
            summary.insert("top_tier".into(), Value::String(top.text_or("tier", "BACKLOG")));
        }
        summary
    }
}

fn display_name(idea: Fields<'_>) -> String {
    idea.get("display_name").as_text().unwrap_or_else(|| idea.text_or("plugin_name", "Unnamed"))
}

fn overview(shortlist: &[Fields<'_>], palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("Shortlist Overview");
    if shortlist.is_empty() {
        section.narrative("No plugin ideas made the shortlist.");
        return Ok(section);
    }
    let mut table = Table::new(vec![
        ColumnDef::new("#", 8.0).centered(),
        ColumnDef::new("Plugin Idea", 42.0),
        ColumnDef::new("Tier", 20.0).centered(),
        ColumnDef::new("Score", 12.0).centered(),
        ColumnDef::new("Utility", 12.0).centered(),
        ColumnDef::new("Market", 12.0).centered(),
        ColumnDef::new("Novelty", 12.0).centered(),
        ColumnDef::new("Pathway", 26.0).centered(),
        ColumnDef::new("Extends", 24.0),
    ]);
    for idea in shortlist {
        let tier = palette.enum_band("tier", &idea.text_or("tier", ""))?;
        let pathway = palette.enum_band("pathway", &idea.text_or("product_pathway", ""))?;
        let mut row = vec![
            idea.text_or("rank", "").into(),
            display_name(*idea).into(),
            Cell::banded(tier.label.clone(), tier),
        ];
        for (_, key) in SCORES {
            let score = idea.number(key);
            row.push(Cell::banded(format_number(score), palette.score_band("score", score)?));
        }
        row.push(Cell::banded(pathway.label.clone(), pathway));
        row.push(extends(*idea, "--").into());
        table.push_row(row)?;
    }
    section.table(table);
    Ok(section)
}

fn extends(idea: Fields<'_>, standalone: &str) -> String {
    let name = idea.text_or("extends_plugin", "");
    if name.trim().is_empty() { standalone.to_string() } else { name }
}

fn idea_detail(idea: Fields<'_>, palette: &Palette) -> Result<Section, ExportError> {
    let tier = palette.enum_band("tier", &idea.text_or("tier", ""))?;
    let pathway = palette.enum_band("pathway", &idea.text_or("product_pathway", ""))?;
    let mut section =
        Section::new(format!("#{} {} ({})", idea.text_or("rank", ""), display_name(idea), tier.label));
    section.narrative(idea.text_or("one_liner", ""));
    for (label, key) in SCORES {
        let score = idea.number(key);
        section.push(Block::ScoreBar {
            label: label.to_string(),
            score,
            band: palette.score_band("score", score)?.clone(),
        });
    }

    let build = idea.get("build_estimate");
    let structure = idea.get("proposed_structure");
    let strategy = match idea.text_or("generation_strategy", "") {
        raw if raw.is_empty() => "N/A".to_string(),
        raw => title_case(&raw),
    };
    section.list(
        vec![
            format!("Product pathway: {}", pathway.label),
            format!("Extends: {}", extends(idea, "Standalone")),
            format!("Target user: {}", idea.text_or("target_user", "")),
            format!("Generation strategy: {}", strategy),
            format!("Build: plugin {} / product {}", build.text("plugin_mvp"), build.text("product_mvp")),
            format!(
                "Structure: {} agents, {} commands, {} skills",
                format_number(structure.number("agents")),
                format_number(structure.number("commands")),
                format_number(structure.number("skills"))
            ),
        ],
        false,
    );

    let advantage = idea.get("ai_native_advantage").as_text().unwrap_or_else(|| idea.text_or("ai_advantage", ""));
    labelled_notes(&mut section, idea, &[("Why it fits", "why_it_fits"), ("Market signal", "market_signal")]);
    if !advantage.trim().is_empty() {
        section.narrative(format!("AI-native advantage: {}", advantage));
    }
    labelled_notes(&mut section, idea, &[("Monetization pathway", "pathway_note"), ("Key risk", "key_risk")]);

    if idea.is_present("architecture_sketch") {
        let sketch = idea.get("architecture_sketch");
        let mut parts: Vec<String> = sketch
            .list("agents")
            .iter()
            .map(|a| {
                format!("Agent {} ({}): {}", a.text_or("name", ""), a.text_or("model", ""), a.text_or("purpose", ""))
            })
            .collect();
        parts.extend(
            sketch
                .list("commands")
                .iter()
                .map(|c| format!("Command {}: {}", c.text_or("name", ""), c.text_or("description", ""))),
        );
        section.narrative("Architecture sketch:");
        section.list(parts, false);
        labelled_notes(&mut section, sketch, &[("Data flow", "data_flow"), ("Interconnections", "interconnections")]);
    }
    labelled_notes(&mut section, idea, &[("Build this plugin", "create_prompt")]);
    Ok(section)
}

fn portfolio_gaps(analysis: Fields<'_>, present: bool) -> Section {
    let mut section = Section::new("Portfolio Gap Analysis");
    if !present {
        return section;
    }
    let covered = analysis.strings("covered_domains");
    let gaps = analysis.strings("gap_domains");
    section.list(
        vec![
            format!("Total plugins: {}", format_number(analysis.number("total_plugins"))),
            format!("Covered domains ({}): {}", covered.len(), covered.join(", ")),
            format!("Gap domains ({}): {}", gaps.len(), gaps.join(", ")),
        ],
        false,
    );
    let extensions: Vec<String> = analysis
        .list("extension_opportunities")
        .iter()
        .map(|ext| format!("{} -> {}", ext.text_or("existing", ""), ext.text_or("extension", "")))
        .collect();
    if !extensions.is_empty() {
        section.narrative("Extension opportunities:");
        section.list(extensions, false);
    }
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleBook;
    use serde_json::json;

    fn build(payload: &Value) -> Document {
        let book = RuleBook::builtin().unwrap();
        PluginIdeasProfile.build(Fields::new(payload), book.palette("plugin-ideas").unwrap()).unwrap()
    }

    #[test]
    fn test_overview_bands_tier_scores_and_pathway() {
        let payload = json!({
            "shortlist": [
                {"rank": 1, "plugin_name": "inbox-zero", "tier": "BUILD_NOW", "composite_score": 82,
                 "personal_utility": 90, "marketization_score": 66, "novelty_score": 40,
                 "product_pathway": "chrome_extension", "extends_plugin": "mail-sorter"},
                {"rank": 2, "display_name": "Deck Coach", "tier": "", "product_pathway": "vr_headset"}
            ]
        });
        let doc = build(&payload);
        let section = doc.sections.iter().find(|s| s.heading == "Shortlist Overview").unwrap();
        let Block::Table(table) = &section.blocks[0] else { panic!("expected a table") };
        let rows = table.rows();
        assert_eq!(rows[0][1].text, "inbox-zero");
        assert_eq!(rows[0][2].text, "BUILD NOW");
        assert_eq!(rows[0][3].band.as_ref().unwrap().label, "Excellent");
        assert_eq!(rows[0][5].band.as_ref().unwrap().label, "Strong");
        assert_eq!(rows[0][6].band.as_ref().unwrap().label, "Weak");
        assert_eq!(rows[0][7].text, "Chrome Extension");
        assert_eq!(rows[0][8].text, "mail-sorter");
        assert_eq!(rows[1][1].text, "Deck Coach");
        assert_eq!(rows[1][2].text, "BACKLOG");
        assert_eq!(rows[1][7].text, "Unknown");
        assert_eq!(rows[1][8].text, "--");
    }

    #[test]
    fn test_portfolio_gaps_list_extensions() {
        let payload = json!({
            "portfolio_analysis": {
                "total_plugins": 14,
                "covered_domains": ["finance", "travel"],
                "gap_domains": ["health"],
                "extension_opportunities": [{"existing": "trip-planner", "extension": "visa checker"}]
            }
        });
        let doc = build(&payload);
        let gaps = doc.sections.iter().find(|s| s.heading == "Portfolio Gap Analysis").unwrap();
        let Block::List { items, .. } = &gaps.blocks[0] else { panic!("expected a list") };
        assert_eq!(items[1], "Covered domains (2): finance, travel");
        assert!(matches!(&gaps.blocks[2], Block::List { items, .. } if items[0] == "trip-planner -> visa checker"));
    }

    #[test]
    fn test_missing_portfolio_analysis_leaves_no_section() {
        let doc = build(&json!({}));
        assert!(doc.sections.iter().all(|s| s.heading != "Portfolio Gap Analysis"));
        assert_eq!(PluginIdeasProfile.stem_subject(Fields::new(&json!({}))), "open discovery");
    }
}
