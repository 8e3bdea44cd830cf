use serde_json::{Map, Value};

use super::{ReportKind, ReportProfile, yes_no};
use crate::error::ExportError;
use crate::model::{Badge, Block, Cell, ColumnDef, Document, Section, Table};
use crate::payload::{Fields, format_number, number_value};
use crate::rules::Palette;

/// Ranked business opportunities with a detailed look at the top one.
pub struct BusinessProfile;

impl ReportProfile for BusinessProfile {
    fn kind(&self) -> ReportKind {
        ReportKind::BusinessAnalysis
    }

    fn expected_type(&self) -> &'static str {
        "business_analysis"
    }

    fn folder(&self) -> &'static str {
        "Business_Analysis"
    }

    fn stem_subject(&self, payload: Fields<'_>) -> String {
        payload.text_or("idea_description", "business-idea")
    }

    fn stem_suffix(&self, payload: Fields<'_>) -> String {
        format!("{}_Analysis", payload.text_or("depth", "standard"))
    }

    fn score_scales(&self) -> &'static [&'static str] {
        &["score", "pain_severity"]
    }

    fn enum_scales(&self) -> &'static [&'static str] {
        &["verdict", "severity"]
    }

    fn build(&self, payload: Fields<'_>, palette: &Palette) -> Result<Document, ExportError> {
        let idea = payload.text_or("idea_description", "Business Idea");
        let mut doc = Document::new(format!("Business Idea Analysis: {}", idea), self.kind().as_str(), palette.accent);
        doc.subtitle = format!("Operator profile: {}", payload.text_or("operator_profile", "solopreneur"));
        doc.footer = "Business Idea Analysis".to_string();

        let methodology = payload.get("methodology");
        doc.meta("Date", payload.text_or("date", ""))
            .meta("Depth", payload.text_or("depth", "standard"))
            .meta("Profile", payload.text_or("operator_profile", "solopreneur"))
            .meta("Searches", format_number(methodology.number("web_searches_performed")))
            .meta("Agents", format_number(methodology.number("agents_dispatched")));

        let mut summary = Section::new("Executive Summary");
        summary.narrative(payload.text_or("executive_summary", ""));
        doc.push_section(summary);

        let opportunities = payload.list("opportunities");
        doc.push_section(rankings(&opportunities, palette)?);
        if let Some(top) = opportunities.first() {
            for section in top_opportunity(*top, palette)? {
                doc.push_section(section);
            }
        }

        let market = payload.get("market_research");
        doc.push_section(pain_points(market, palette)?);

        let competitive = payload.get("competitive_analysis");
        doc.push_section(competition(competitive)?);

        doc.push_section(risk_register(payload, palette)?);

        let mut method = Section::new("Methodology");
        method.list(
            vec![
                format!("Web searches performed: {}", format_number(methodology.number("web_searches_performed"))),
                format!("Agents dispatched: {}", format_number(methodology.number("agents_dispatched"))),
                format!(
                    "Confidence threshold: {}",
                    format_number(methodology.opt_number("confidence_threshold").unwrap_or(70.0))
                ),
            ],
            false,
        );
        doc.push_section(method);

        Ok(doc)
    }

    fn summary(&self, payload: Fields<'_>) -> Map<String, Value> {
        let mut summary = Map::new();
        if let Some(top) = payload.list("opportunities").first() {
            summary.insert("top_opportunity".into(), Value::String(top.text_or("name", "")));
            summary.insert("top_score".into(), number_value(top.number("composite_score")));
            summary.insert("top_verdict".into(), Value::String(top.text_or("verdict", "NO_GO")));
        }
        summary
    }
}

fn rankings(opportunities: &[Fields<'_>], palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("Opportunity Rankings");
    if opportunities.is_empty() {
        return Ok(section);
    }

    let mut table = Table::new(vec![
        ColumnDef::new("#", 8.0).centered(),
        ColumnDef::new("Opportunity", 55.0),
        ColumnDef::new("Score", 16.0).centered(),
        ColumnDef::new("Verdict", 28.0).centered(),
        ColumnDef::new("Solo", 12.0).centered(),
        ColumnDef::new("Pricing", 40.0),
    ]);
    for opp in opportunities {
        let score = opp.number("composite_score");
        let verdict = palette.enum_band("verdict", &opp.text_or("verdict", ""))?;
        table.push_row(vec![
            opp.text_or("rank", "").into(),
            opp.text_or("name", "").into(),
            Cell::banded(format_number(score), palette.score_band("score", score)?),
            Cell::banded(verdict.label.clone(), verdict),
            yes_no(opp.flag("solopreneur_viable")).into(),
            opp.text_or("recommended_pricing", "").into(),
        ])?;
    }
    section.table(table);
    Ok(section)
}

fn top_opportunity(top: Fields<'_>, palette: &Palette) -> Result<Vec<Section>, ExportError> {
    let score = top.number("composite_score");
    let verdict = palette.enum_band("verdict", &top.text_or("verdict", ""))?;
    let score_band = palette.score_band("score", score)?;

    let mut overview = Section::new(format!("Top Opportunity: {}", top.text_or("name", "")));
    overview.push(Block::BadgeRow(vec![
        Badge::from_band(verdict),
        Badge::new(format!("Score {}/100", format_number(score)), score_band),
    ]));
    overview.narrative(top.text_or("description", ""));
    overview.narrative(format!(
        "MVP: {}  |  Pricing: {}  |  Solo: {}",
        top.text_or("mvp_timeline", "TBD"),
        top.text_or("recommended_pricing", "TBD"),
        yes_no(top.flag("solopreneur_viable"))
    ));

    let tam = top.get("tam");
    if top.is_present("tam") {
        let mut sizing = Table::new(vec![ColumnDef::new("Market", 60.0), ColumnDef::new("Size", 60.0)]);
        for (label, key) in [
            ("Total addressable (TAM)", "total_addressable"),
            ("Serviceable addressable (SAM)", "serviceable_addressable"),
            ("Obtainable, year 1", "obtainable_y1"),
            ("Obtainable, year 3", "obtainable_y3"),
        ] {
            sizing.push_row(vec![label.into(), tam.text(key).into()])?;
        }
        overview.table(sizing);
    }

    let dimensions = top.list("dimensions");
    let mut scores = Section::new("Dimension Scores");
    for dim in &dimensions {
        let value = dim.number("score");
        let weight = (dim.number("weight") * 100.0).round();
        scores.push(Block::ScoreBar {
            label: format!("{} ({}%)", dim.text_or("name", ""), format_number(weight)),
            score: value,
            band: palette.score_band("score", value)?.clone(),
        });
    }

    let mut findings = Section::new("Key Findings");
    for dim in &dimensions {
        let items = dim.strings("key_findings");
        if items.is_empty() {
            continue;
        }
        let name = dim.text_or("name", "");
        let summary = dim.text_or("summary", "");
        if summary.is_empty() {
            findings.narrative(name);
        } else {
            findings.narrative(format!("{}: {}", name, summary));
        }
        findings.list(items, false);
    }

    let mut risks = Section::new("Top Risks");
    let top_risks = top.list("top_risks");
    if !top_risks.is_empty() {
        let mut table = Table::new(vec![
            ColumnDef::new("Severity", 20.0).centered(),
            ColumnDef::new("Risk", 70.0),
            ColumnDef::new("Mitigation", 70.0),
        ]);
        for risk in &top_risks {
            let band = palette.enum_band("severity", &risk.text_or("severity", "medium"))?;
            table.push_row(vec![
                Cell::banded(band.label.clone(), band),
                risk.text_or("risk", "").into(),
                risk.text_or("mitigation", "").into(),
            ])?;
        }
        risks.table(table);
    }

    let mut kill = Section::new("Kill Criteria");
    kill.list(
        top.list("kill_criteria")
            .iter()
            .map(|kc| {
                let mark = if kc.text_or("status", "unverified") == "unverified" { "[ ]" } else { "[x]" };
                format!(
                    "{} {} -- Kill if: {}",
                    mark,
                    kc.text_or("assumption", ""),
                    kc.text_or("kill_condition", "")
                )
            })
            .collect(),
        false,
    );

    let mut steps = Section::new("Next Steps");
    steps.list(top.strings("next_steps"), true);

    Ok(vec![overview, scores, findings, risks, kill, steps])
}

fn pain_points(market: Fields<'_>, palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("Pain Points");
    let points = market.list("pain_points");
    if points.is_empty() {
        return Ok(section);
    }
    let mut table = Table::new(vec![
        ColumnDef::new("Pain Point", 60.0),
        ColumnDef::new("Severity", 16.0).centered(),
        ColumnDef::new("Frequency", 20.0).centered(),
        ColumnDef::new("Segment", 34.0),
        ColumnDef::new("Economic Impact", 40.0),
    ]);
    for pp in &points {
        let severity = pp.number("severity");
        table.push_row(vec![
            pp.text_or("description", "").into(),
            Cell::banded(format_number(severity), palette.score_band("pain_severity", severity)?),
            pp.text_or("frequency", "").into(),
            pp.text_or("affected_segment", "").into(),
            pp.text_or("economic_impact", "").into(),
        ])?;
    }
    section.table(table);
    Ok(section)
}

fn competition(competitive: Fields<'_>) -> Result<Section, ExportError> {
    let mut section = Section::new("Competitive Landscape");
    let competitors = competitive.list("competitors");
    if !competitors.is_empty() {
        let mut table = Table::new(vec![
            ColumnDef::new("Competitor", 35.0),
            ColumnDef::new("Pricing", 25.0),
            ColumnDef::new("Strengths", 55.0),
            ColumnDef::new("Weaknesses", 55.0),
        ]);
        for comp in &competitors {
            table.push_row(vec![
                comp.text_or("name", "").into(),
                comp.text_or("pricing", "").into(),
                comp.strings("strengths").join(", ").into(),
                comp.strings("weaknesses").join(", ").into(),
            ])?;
        }
        section.table(table);
    }

    let matrix = competitive.get("feature_matrix");
    let features = matrix.strings("features");
    let vendors = matrix.entries("competitors");
    if !features.is_empty() && !vendors.is_empty() {
        let mut columns = vec![ColumnDef::new("Feature", 50.0)];
        columns.extend(vendors.iter().map(|(name, _)| ColumnDef::new(*name, 20.0).centered()));
        let mut table = Table::new(columns);
        let support: Vec<Vec<bool>> = vendors.iter().map(|(_, values)| values.as_flags()).collect();
        for (i, feature) in features.iter().enumerate() {
            let mut row = vec![Cell::plain(feature.clone())];
            row.extend(support.iter().map(|flags| {
                Cell::plain(if flags.get(i).copied().unwrap_or(false) { "[x]" } else { "[ ]" })
            }));
            table.push_row(row)?;
        }
        section.table(table);
    }

    let gap = competitive.text_or("gap_summary", "");
    if !gap.is_empty() {
        section.narrative(format!("Gap Summary: {}", gap));
    }
    Ok(section)
}

fn risk_register(payload: Fields<'_>, palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("Risk Register");
    let register = payload.list("risk_register");
    if register.is_empty() {
        return Ok(section);
    }
    let mut table = Table::new(vec![
        ColumnDef::new("ID", 14.0),
        ColumnDef::new("Category", 24.0),
        ColumnDef::new("Severity", 20.0).centered(),
        ColumnDef::new("Description", 62.0),
        ColumnDef::new("Mitigation", 50.0),
    ]);
    for risk in &register {
        let band = palette.enum_band("severity", &risk.text_or("severity", "medium"))?;
        table.push_row(vec![
            risk.text_or("id", "").into(),
            risk.text_or("category", "").into(),
            Cell::banded(band.label.clone(), band),
            risk.text_or("description", "").into(),
            risk.text_or("mitigation", "").into(),
        ])?;
    }
    section.table(table);
    Ok(section)
}
