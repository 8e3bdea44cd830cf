use serde_json::{Map, Value};

use super::{ReportKind, ReportProfile};
use crate::error::ExportError;
use crate::model::{Cell, ColumnDef, Document, Section, Table};
use crate::payload::{Fields, format_number, number_value};
use crate::rules::Palette;

/// Listings shown in the report; the rest stay in the raw data.
const MAX_LISTINGS: usize = 50;

/// A local business directory built from crawled listings.
pub struct DirectoryProfile;

impl ReportProfile for DirectoryProfile {
    fn kind(&self) -> ReportKind {
        ReportKind::Directory
    }

    fn expected_type(&self) -> &'static str {
        "directory_data"
    }

    fn folder(&self) -> &'static str {
        "Directory_Creator"
    }

    fn stem_subject(&self, payload: Fields<'_>) -> String {
        payload.text_or("directory_name", "directory")
    }

    fn stem_suffix(&self, _payload: Fields<'_>) -> String {
        "Directory".to_string()
    }

    fn enum_scales(&self) -> &'static [&'static str] {
        &["status"]
    }

    fn build(&self, payload: Fields<'_>, palette: &Palette) -> Result<Document, ExportError> {
        let name = payload.text_or("directory_name", "Business Directory");
        let mut doc = Document::new(name.clone(), self.kind().as_str(), palette.accent);
        doc.subtitle = format!("{} in {}", payload.text("niche_type"), payload.text("geography"));
        doc.footer = format!("{} Directory", name);
        doc.meta("Generated", payload.text_or("generated_date", ""))
            .meta("Depth", payload.text_or("depth", "standard"));

        let stats = payload.get("statistics");
        let mut statistics = Section::new("Directory Statistics");
        let mut table = Table::new(vec![ColumnDef::new("Metric", 60.0), ColumnDef::new("Count", 30.0).right()]);
        for (label, key) in [
            ("Total found", "total_found"),
            ("Verified", "verified"),
            ("Needs verification", "needs_verification"),
            ("Duplicates removed", "duplicates_removed"),
            ("Low quality removed", "low_quality_removed"),
        ] {
            table.push_row(vec![label.into(), format_number(stats.number(key)).into()])?;
        }
        statistics.table(table);
        doc.push_section(statistics);

        let methodology = payload.get("methodology");
        let mut method = Section::new("Methodology");
        method.list(
            vec![
                format!("Searches: {}", format_number(methodology.number("total_searches"))),
                format!("Websites crawled: {}", format_number(methodology.number("websites_crawled"))),
                format!("Agents dispatched: {}", format_number(methodology.number("agents_dispatched"))),
                format!("Duration: {} minutes", format_number(methodology.number("duration_minutes"))),
            ],
            false,
        );
        doc.push_section(method);

        doc.push_section(top_listings(&payload.list("businesses"), palette)?);
        Ok(doc)
    }

    fn summary(&self, payload: Fields<'_>) -> Map<String, Value> {
        let businesses = payload.list("businesses");
        let verified = businesses.iter().filter(|b| b.text_or("status", "") == "verified").count();
        let mut summary = Map::new();
        summary.insert("directory_name".into(), Value::String(payload.text_or("directory_name", "")));
        summary.insert("listings".into(), number_value(businesses.len() as f64));
        summary.insert("verified".into(), number_value(verified as f64));
        summary
    }
}

/// Non-removed listings, best quality first, capped at [`MAX_LISTINGS`].
fn ranked<'a>(businesses: &[Fields<'a>]) -> Vec<Fields<'a>> {
    let mut kept: Vec<Fields<'a>> =
        businesses.iter().copied().filter(|b| b.text_or("status", "") != "removed").collect();
    // Stable sort keeps payload order among equal scores.
    kept.sort_by(|a, b| b.number("quality_score").total_cmp(&a.number("quality_score")));
    kept.truncate(MAX_LISTINGS);
    kept
}

fn top_listings(businesses: &[Fields<'_>], palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("Top Listings");
    let listings = ranked(businesses);
    if listings.is_empty() {
        return Ok(section);
    }
    let mut table = Table::new(vec![
        ColumnDef::new("Business", 45.0),
        ColumnDef::new("Category", 28.0),
        ColumnDef::new("City", 25.0),
        ColumnDef::new("Phone", 26.0),
        ColumnDef::new("Rating", 16.0).centered(),
        ColumnDef::new("Score", 14.0).centered(),
        ColumnDef::new("Status", 30.0).centered(),
    ]);
    for business in &listings {
        let score = business.number("quality_score");
        let status = palette.enum_band("status", &business.text_or("status", ""))?;
        let rating = match business.opt_number("rating") {
            Some(r) => format!("{} ({})", format_number(r), format_number(business.number("review_count"))),
            None => "N/A".to_string(),
        };
        table.push_row(vec![
            business.text_or("name", "").into(),
            business.text_or("category", "").into(),
            business.text_or("city", "").into(),
            business.text_or("phone", "").into(),
            rating.into(),
            Cell::banded(format_number(score), palette.score_band("score", score)?),
            Cell::banded(status.label.clone(), status),
        ])?;
    }
    section.table(table);
    Ok(section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ranked_drops_removed_and_sorts() {
        let payload = json!({"businesses": [
            {"name": "a", "quality_score": 40, "status": "verified"},
            {"name": "b", "quality_score": 95, "status": "removed"},
            {"name": "c", "quality_score": 80},
            {"name": "d", "quality_score": 40, "status": "needs_verification"}
        ]});
        let fields = Fields::new(&payload);
        let names: Vec<String> = ranked(&fields.list("businesses")).iter().map(|b| b.text("name")).collect();
        assert_eq!(names, vec!["c", "a", "d"]);
    }

    #[test]
    fn test_ranked_caps_listing_count() {
        let businesses: Vec<Value> = (0..70).map(|i| json!({"name": i.to_string(), "quality_score": i})).collect();
        let payload = json!({ "businesses": businesses });
        let fields = Fields::new(&payload);
        let listings = ranked(&fields.list("businesses"));
        assert_eq!(listings.len(), MAX_LISTINGS);
        assert_eq!(listings[0].text("name"), "69");
    }

    #[test]
    fn test_summary_counts_verified() {
        let payload = json!({"directory_name": "Austin Plumbers", "businesses": [
            {"status": "verified"}, {"status": "verified"}, {"status": "removed"}
        ]});
        let summary = DirectoryProfile.summary(Fields::new(&payload));
        assert_eq!(summary["listings"], 3);
        assert_eq!(summary["verified"], 2);
    }
}
