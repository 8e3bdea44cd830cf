use serde_json::{Map, Value};

use super::{ReportKind, ReportProfile};
use crate::classify::normalize_key;
use crate::error::ExportError;
use crate::model::{Badge, Block, Cell, ColumnDef, Document, Section, Table};
use crate::payload::{Fields, format_number, number_value};
use crate::rules::Palette;

/// Severity groups in display order. Anything else is filed under LOW.
const SEVERITY_ORDER: [&str; 4] = ["CRITICAL", "HIGH", "MEDIUM", "LOW"];

/// Production-readiness review of a code base.
pub struct CodeReviewProfile;

impl ReportProfile for CodeReviewProfile {
    fn kind(&self) -> ReportKind {
        ReportKind::CodeReview
    }

    fn expected_type(&self) -> &'static str {
        "code_review"
    }

    fn folder(&self) -> &'static str {
        "Code_Reviews"
    }

    fn stem_subject(&self, payload: Fields<'_>) -> String {
        payload.text_or("project_name", "project")
    }

    fn stem_suffix(&self, _payload: Fields<'_>) -> String {
        "Code_Review".to_string()
    }

    fn enum_scales(&self) -> &'static [&'static str] {
        &["verdict", "severity"]
    }

    fn build(&self, payload: Fields<'_>, palette: &Palette) -> Result<Document, ExportError> {
        let project = payload.text_or("project_name", "Project");
        let title = format!("{} - Production Code Review", project);
        let mut doc = Document::new(title, self.kind().as_str(), palette.accent);
        doc.subtitle = "Production Code Review Report".to_string();
        doc.footer = format!("{} Code Review", project);
        doc.meta("Date", payload.text_or("date", ""))
            .meta("Stack", payload.text_or("tech_stack", ""))
            .meta("Files Reviewed", format_number(payload.number("files_reviewed_total")));

        let score = payload.number("production_readiness_score");
        let verdict = palette.enum_band("verdict", &payload.text_or("verdict", ""))?;
        let counts = payload.get("issue_summary");

        let mut overview = Section::new("");
        let mut badges = vec![Badge::from_band(verdict)];
        for severity in SEVERITY_ORDER {
            let band = palette.enum_band("severity", severity)?;
            let count = counts.number(&severity.to_ascii_lowercase());
            badges.push(Badge::new(format!("{} {}", format_number(count), severity), band));
        }
        overview.push(Block::BadgeRow(badges));
        overview.push(Block::ScoreBar {
            label: "Production Readiness".to_string(),
            score,
            band: palette.score_band("score", score)?.clone(),
        });
        overview.narrative(format!(
            "{} issues found across {} files.",
            format_number(counts.number("total")),
            format_number(payload.number("files_reviewed_total"))
        ));
        doc.push_section(overview);

        let mut summary = Section::new("Executive Summary");
        summary.narrative(payload.text_or("executive_summary", ""));
        doc.push_section(summary);

        let dimensions = payload.list("dimensions");
        doc.push_section(score_breakdown(&dimensions, palette)?);

        for section in issue_sections(&payload.list("issues"), palette)? {
            doc.push_section(section);
        }

        let mut recs = Section::new("Recommendations");
        recs.list(payload.strings("recommendations"), true);
        doc.push_section(recs);

        let mut positive = Section::new("Positive Findings");
        for dim in &dimensions {
            let findings = dim.strings("positive_findings");
            if !findings.is_empty() {
                positive.narrative(dim.text_or("name", ""));
                positive.list(findings, false);
            }
        }
        doc.push_section(positive);

        Ok(doc)
    }

    fn summary(&self, payload: Fields<'_>) -> Map<String, Value> {
        let mut summary = Map::new();
        summary.insert("verdict".into(), Value::String(payload.text_or("verdict", "")));
        summary.insert("score".into(), number_value(payload.number("production_readiness_score")));
        summary
    }
}

fn score_breakdown(dimensions: &[Fields<'_>], palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("Score Breakdown");
    if dimensions.is_empty() {
        return Ok(section);
    }
    let mut table = Table::new(vec![
        ColumnDef::new("Dimension", 60.0),
        ColumnDef::new("Score", 20.0).centered(),
        ColumnDef::new("Rating", 30.0).centered(),
        ColumnDef::new("Issues", 20.0).centered(),
    ]);
    for dim in dimensions {
        let score = dim.number("score");
        let band = palette.score_band("score", score)?;
        section.push(Block::ScoreBar { label: dim.text_or("name", ""), score, band: band.clone() });
        table.push_row(vec![
            dim.text_or("name", "").into(),
            Cell::banded(format!("{}/100", format_number(score)), band),
            Cell::banded(band.label.clone(), band),
            format_number(dim.number("issue_count")).into(),
        ])?;
    }
    section.table(table);
    Ok(section)
}

/// Uppercase severity group of an issue; missing or unknown severities are LOW.
fn severity_group(issue: Fields<'_>) -> &'static str {
    let raw = issue.text_or("severity", "LOW").to_ascii_uppercase();
    SEVERITY_ORDER.into_iter().find(|s| *s == raw.trim()).unwrap_or("LOW")
}

fn dimension_label(key: &str) -> String {
    match normalize_key(key).as_str() {
        "code_quality" => "Code Quality".to_string(),
        "testing" => "Testing".to_string(),
        "ui_ux" => "UI/UX".to_string(),
        "responsive_design" => "Responsive".to_string(),
        "security" => "Security".to_string(),
        "performance" => "Performance".to_string(),
        _ => key.to_string(),
    }
}

fn issue_sections(issues: &[Fields<'_>], palette: &Palette) -> Result<Vec<Section>, ExportError> {
    let mut sections = Vec::new();
    for severity in SEVERITY_ORDER {
        let group: Vec<Fields<'_>> =
            issues.iter().copied().filter(|issue| severity_group(*issue) == severity).collect();
        if group.is_empty() {
            continue;
        }
        let band = palette.enum_band("severity", severity)?;
        let mut section = Section::new(format!("{} Issues ({})", severity, group.len()));
        let mut table = Table::new(vec![
            ColumnDef::new("ID", 16.0),
            ColumnDef::new("Severity", 20.0).centered(),
            ColumnDef::new("Issue", 62.0),
            ColumnDef::new("Location", 50.0),
            ColumnDef::new("Dimension", 24.0),
        ]);
        let mut fixes = Vec::new();
        for issue in &group {
            let locations: Vec<String> = issue
                .list("files")
                .iter()
                .map(|f| format!("{}:{}", f.text_or("path", ""), f.text_or("line", "")))
                .collect();
            table.push_row(vec![
                issue.text_or("id", "").into(),
                Cell::banded(band.label.clone(), band),
                issue.text_or("title", "").into(),
                locations.join(", ").into(),
                dimension_label(&issue.text_or("dimension", "")).into(),
            ])?;
            let fix = issue.text_or("recommendation", "");
            if !fix.is_empty() {
                fixes.push(format!("{}: {}", issue.text_or("id", ""), fix));
            }
        }
        section.table(table);
        section.list(fixes, false);
        sections.push(section);
    }
    Ok(sections)
}
