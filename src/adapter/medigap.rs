use serde_json::{Map, Value};

use super::{ReportKind, ReportProfile, yes_no};
use crate::error::ExportError;
use crate::model::{Badge, Block, Cell, ColumnDef, Document, Section, Table};
use crate::payload::{Fields, format_number, number_value};
use crate::rules::Palette;

/// Scoring factors and their weights, in display order.
const FACTORS: [(&str, &str); 5] = [
    ("Cost Efficiency (30%)", "cost_efficiency"),
    ("Risk Protection (25%)", "risk_protection"),
    ("Flexibility (20%)", "flexibility"),
    ("Priority Alignment (15%)", "priority_alignment"),
    ("Insurer Quality (10%)", "insurer_quality"),
];

/// Plan G versus Plan N decision for one Medicare supplement shopper.
pub struct MedigapProfile;

/// Payload key of the winning plan, e.g. `"plan_g"` for `"Plan G"`.
fn winner_key(winner: &str) -> Option<&'static str> {
    let winner = winner.trim().to_ascii_uppercase();
    if winner.contains('G') {
        Some("plan_g")
    } else if winner.ends_with('N') {
        Some("plan_n")
    } else {
        None
    }
}

impl ReportProfile for MedigapProfile {
    fn kind(&self) -> ReportKind {
        ReportKind::MedigapSelection
    }

    fn expected_type(&self) -> &'static str {
        "medigap_selection"
    }

    fn folder(&self) -> &'static str {
        "Medigap_Selection"
    }

    fn stem_subject(&self, payload: Fields<'_>) -> String {
        let profile = payload.get("requirements_profile");
        format!("{} {}", profile.text_or("state", "unknown"), profile.text_or("zip_code", "00000"))
    }

    fn stem_suffix(&self, _payload: Fields<'_>) -> String {
        "Medigap_Selection".to_string()
    }

    fn enum_scales(&self) -> &'static [&'static str] {
        &["confidence", "plan"]
    }

    fn build(&self, payload: Fields<'_>, palette: &Palette) -> Result<Document, ExportError> {
        let profile = payload.get("requirements_profile");
        let recommendation = payload.get("recommendation");
        let state = profile.text("state");
        let winner = recommendation.text("winner");
        let winning = winner_key(&winner);

        let mut doc = Document::new("Medigap Plan Selection", self.kind().as_str(), palette.accent);
        doc.subtitle = format!("{} ({}) - Plan G vs Plan N", state, profile.text("zip_code"));
        doc.footer = "Medigap Plan Selection".to_string();
        doc.meta("Generated", payload.text_or("generated_date", ""))
            .meta("Recommendation", winner.clone())
            .meta("Confidence", recommendation.text("confidence"));

        let mut verdict = Section::new("Recommendation");
        let plan = palette.enum_band("plan", winning.unwrap_or(""))?;
        let confidence = palette.enum_band("confidence", &recommendation.text_or("confidence", ""))?;
        verdict.push(Block::BadgeRow(vec![
            Badge::new(winner.clone(), plan),
            Badge::new(format!("{} CONFIDENCE", confidence.label), confidence),
        ]));
        if let Some(key) = winning {
            let score = recommendation.number(&format!("{}_score", key));
            verdict.push(Block::ScoreBar {
                label: format!("{} score", winner),
                score,
                band: palette.score_band("score", score)?.clone(),
            });
        }
        verdict.narrative(recommendation.text_or("one_line_summary", ""));
        doc.push_section(verdict);

        let priorities = profile.strings("priorities");
        let mut you = Section::new("Your Profile");
        you.list(
            vec![
                format!("Location: {} ({})", state, profile.text("zip_code")),
                format!("Age: {} - {}", profile.text("age"), profile.text("enrollment_status")),
                format!(
                    "Medical usage: {} (~{} visits/year)",
                    profile.text("medical_usage"),
                    profile.text("estimated_annual_visits")
                ),
                format!(
                    "Priorities: {}",
                    if priorities.is_empty() { "None specified".to_string() } else { priorities.join(", ") }
                ),
                format!("Provider assignment: {}", profile.text("provider_assignment")),
            ],
            false,
        );
        doc.push_section(you);

        doc.push_section(scoring(payload.get("scoring_detail"), recommendation, palette)?);
        doc.push_section(premiums(payload.get("premium_comparison"), payload.get("insurer_rankings"))?);

        let break_even = payload.get("break_even_analysis");
        let mut even = Section::new("Break-Even Analysis");
        even.list(
            vec![
                format!("Monthly premium spread: {}", break_even.text("monthly_premium_spread")),
                format!("Visits to break even: {}/year", break_even.text("visits_to_break_even")),
                format!("Your estimated visits: {}/year", break_even.text("user_estimated_visits")),
                format!("Excess charge risk: {}", break_even.text("excess_charge_risk_level")),
            ],
            false,
        );
        even.narrative(break_even.text_or("bottom_line", ""));
        doc.push_section(even);

        doc.push_section(scenarios(&payload.list("scenario_summary"))?);

        let rules = payload.get("state_rules_impact");
        let mut state_rules = Section::new(format!("State Rules: {}", state));
        state_rules.list(
            vec![
                format!("Birthday rule: {}", yes_no(rules.flag("birthday_rule")).to_uppercase()),
                format!("Strategic value: {}", rules.text("strategic_value")),
                format!("Switching recommendation: {}", rules.text_or("switching_recommendation", "")),
            ],
            false,
        );
        doc.push_section(state_rules);

        let mut advice = Section::new("Strategic Advice");
        advice.list(payload.strings("strategic_advice"), true);
        doc.push_section(advice);

        if let Some(key) = winning {
            doc.push_section(top_insurers(&payload.get("insurer_rankings").list(key))?);
        }

        let methodology = payload.get("methodology");
        let mut method = Section::new("Methodology");
        if payload.is_present("methodology") {
            method.list(
                vec![
                    format!("Agents dispatched: {}", format_number(methodology.number("agents_dispatched"))),
                    format!("Total searches: {}", format_number(methodology.number("total_searches"))),
                    format!("Scoring system: {}", methodology.text_or("scoring_system", "")),
                    format!("Sources: {}", methodology.strings("sources_covered").join(", ")),
                ],
                false,
            );
        }
        doc.push_section(method);

        let mut disclaimers = Section::new("Disclaimers");
        disclaimers.list(payload.strings("disclaimers"), false);
        doc.push_section(disclaimers);

        Ok(doc)
    }

    fn summary(&self, payload: Fields<'_>) -> Map<String, Value> {
        let recommendation = payload.get("recommendation");
        let mut summary = Map::new();
        summary.insert("winner".into(), Value::String(recommendation.text("winner")));
        summary.insert("confidence".into(), Value::String(recommendation.text("confidence")));
        summary.insert("plan_g_score".into(), number_value(recommendation.number("plan_g_score")));
        summary.insert("plan_n_score".into(), number_value(recommendation.number("plan_n_score")));
        summary
    }
}

fn scoring(detail: Fields<'_>, recommendation: Fields<'_>, palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("Scoring Comparison");
    let mut table = Table::new(vec![
        ColumnDef::new("Factor (Weight)", 70.0),
        ColumnDef::new("Plan G", 30.0).centered(),
        ColumnDef::new("Plan N", 30.0).centered(),
    ]);
    let banded = |score: f64| -> Result<Cell, ExportError> {
        Ok(Cell::banded(format_number(score), palette.score_band("score", score)?))
    };
    for (label, key) in FACTORS {
        let g = detail.get("plan_g").get(key).number("score");
        let n = detail.get("plan_n").get(key).number("score");
        table.push_row(vec![label.into(), banded(g)?, banded(n)?])?;
    }
    table.push_row(vec![
        "Composite".into(),
        banded(recommendation.number("plan_g_score"))?,
        banded(recommendation.number("plan_n_score"))?,
    ])?;
    section.table(table);
    Ok(section)
}

fn premiums(comparison: Fields<'_>, rankings: Fields<'_>) -> Result<Section, ExportError> {
    let mut section = Section::new("Premium Comparison");
    section.list(
        vec![
            format!("Plan G range: {}", comparison.text("plan_g_range")),
            format!("Plan N range: {}", comparison.text("plan_n_range")),
            format!("Average spread: {}/month", comparison.text("avg_monthly_spread")),
        ],
        false,
    );

    let plan_g = rankings.list("plan_g");
    let plan_n = rankings.list("plan_n");
    let mut insurers: Vec<String> = Vec::new();
    for entry in plan_g.iter().chain(plan_n.iter()) {
        let name = entry.text_or("insurer", "");
        if !insurers.contains(&name) {
            insurers.push(name);
        }
    }
    if insurers.is_empty() {
        return Ok(section);
    }
    let mut table = Table::new(vec![
        ColumnDef::new("Insurer", 50.0),
        ColumnDef::new("Plan G", 24.0).right(),
        ColumnDef::new("Plan N", 24.0).right(),
        ColumnDef::new("AM Best", 18.0).centered(),
        ColumnDef::new("NAIC", 18.0).centered(),
    ]);
    for name in &insurers {
        let g = find_insurer(&plan_g, name);
        let n = find_insurer(&plan_n, name);
        let either = |key: &str| {
            g.and_then(|e| e.get(key).as_text())
                .or_else(|| n.and_then(|e| e.get(key).as_text()))
                .unwrap_or_else(|| "N/A".into())
        };
        table.push_row(vec![
            name.as_str().into(),
            g.map(|e| e.text("monthly_premium")).unwrap_or_else(|| "N/A".into()).into(),
            n.map(|e| e.text("monthly_premium")).unwrap_or_else(|| "N/A".into()).into(),
            either("am_best").into(),
            either("naic_ratio").into(),
        ])?;
    }
    section.table(table);
    Ok(section)
}

fn find_insurer<'a>(ranked: &[Fields<'a>], name: &str) -> Option<Fields<'a>> {
    ranked.iter().copied().find(|entry| entry.text_or("insurer", "") == name)
}

fn scenarios(rows: &[Fields<'_>]) -> Result<Section, ExportError> {
    let mut section = Section::new("Scenario Comparison");
    if rows.is_empty() {
        return Ok(section);
    }
    let mut table = Table::new(vec![
        ColumnDef::new("Scenario", 60.0),
        ColumnDef::new("Plan G", 22.0).right(),
        ColumnDef::new("Plan N", 22.0).right(),
        ColumnDef::new("Winner", 18.0).centered(),
        ColumnDef::new("Savings", 20.0).right(),
    ]);
    for row in rows {
        table.push_row(
            ["scenario", "plan_g_cost", "plan_n_cost", "winner", "savings"]
                .iter()
                .map(|key| Cell::plain(row.text_or(key, "")))
                .collect(),
        )?;
    }
    section.table(table);
    Ok(section)
}

fn top_insurers(ranked: &[Fields<'_>]) -> Result<Section, ExportError> {
    let mut section = Section::new("Top Insurer Recommendations");
    for insurer in ranked.iter().take(3) {
        section.narrative(format!(
            "#{} {} - {}/month",
            insurer.text_or("rank", ""),
            insurer.text_or("insurer", ""),
            insurer.text_or("monthly_premium", "")
        ));
        let mut items = vec![
            format!(
                "AM Best: {} | NAIC: {} | Avg increase: {}",
                insurer.text("am_best"),
                insurer.text("naic_ratio"),
                insurer.text("avg_annual_increase")
            ),
            format!(
                "Rating method: {} | Household discount: {}",
                insurer.text("rating_method"),
                insurer.text("household_discount")
            ),
        ];
        let why = insurer.text_or("why_recommended", "");
        if !why.is_empty() {
            items.push(why);
        }
        section.list(items, false);
    }
    Ok(section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleBook;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "type": "medigap_selection",
            "requirements_profile": {"state": "OH", "zip_code": "43215", "priorities": ["low premiums"]},
            "recommendation": {"winner": "Plan N", "confidence": "HIGH", "plan_g_score": 71, "plan_n_score": 86},
            "scoring_detail": {
                "plan_g": {"cost_efficiency": {"score": 60}},
                "plan_n": {"cost_efficiency": {"score": 90}}
            },
            "insurer_rankings": {
                "plan_g": [{"rank": 1, "insurer": "Acme Mutual", "monthly_premium": "$142", "am_best": "A+"}],
                "plan_n": [
                    {"rank": 1, "insurer": "Buckeye Life", "monthly_premium": "$98", "naic_ratio": "81%"},
                    {"rank": 2, "insurer": "Acme Mutual", "monthly_premium": "$104"}
                ]
            },
            "state_rules_impact": {"birthday_rule": true}
        })
    }

    fn build(payload: &Value) -> Document {
        let book = RuleBook::builtin().unwrap();
        MedigapProfile.build(Fields::new(payload), book.palette("medigap-selection").unwrap()).unwrap()
    }

    fn table<'a>(doc: &'a Document, heading: &str) -> &'a Table {
        let section = doc.sections.iter().find(|s| s.heading == heading).unwrap();
        section
            .blocks
            .iter()
            .find_map(|b| match b {
                Block::Table(t) => Some(t),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_winner_key() {
        assert_eq!(winner_key("Plan G"), Some("plan_g"));
        assert_eq!(winner_key("plan n"), Some("plan_n"));
        assert_eq!(winner_key("N/A"), None);
    }

    #[test]
    fn test_badges_and_factor_scores_are_banded() {
        let doc = build(&sample());
        let verdict = &doc.sections[0];
        let Block::BadgeRow(badges) = &verdict.blocks[0] else { panic!("expected badges") };
        assert_eq!(badges[0].label, "Plan N");
        assert_eq!(badges[0].band.label, "Plan N");
        assert_eq!(badges[1].label, "HIGH CONFIDENCE");
        assert!(matches!(&verdict.blocks[1], Block::ScoreBar { score, .. } if *score == 86.0));

        let scores = table(&doc, "Scoring Comparison");
        let rows = scores.rows();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0][1].band.as_ref().unwrap().label, "Fair");
        assert_eq!(rows[0][2].band.as_ref().unwrap().label, "Excellent");
        assert_eq!(rows[1][1].text, "0");
        assert_eq!(rows[5][2].band.as_ref().unwrap().label, "Excellent");
    }

    #[test]
    fn test_insurers_are_merged_across_plans() {
        let doc = build(&sample());
        let rows = table(&doc, "Premium Comparison").rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0].text, "Acme Mutual");
        assert_eq!(rows[0][1].text, "$142");
        assert_eq!(rows[0][2].text, "$104");
        assert_eq!(rows[0][3].text, "A+");
        assert_eq!(rows[1][0].text, "Buckeye Life");
        assert_eq!(rows[1][1].text, "N/A");
        assert_eq!(rows[1][4].text, "81%");

        let top = doc.sections.iter().find(|s| s.heading == "Top Insurer Recommendations").unwrap();
        assert!(matches!(&top.blocks[0], Block::Narrative(text) if text == "#1 Buckeye Life - $98/month"));
    }

    #[test]
    fn test_undecided_winner_skips_winner_sections() {
        let doc = build(&json!({"requirements_profile": {"state": "TX"}}));
        assert!(doc.sections.iter().all(|s| s.heading != "Top Insurer Recommendations"));
        let Block::BadgeRow(badges) = &doc.sections[0].blocks[0] else { panic!("expected badges") };
        assert_eq!(badges[0].band.label, "Undecided");
        assert_eq!(badges[1].label, "MEDIUM CONFIDENCE");
        assert_eq!(MedigapProfile.stem_subject(Fields::new(&json!({}))), "unknown 00000");
    }
}
