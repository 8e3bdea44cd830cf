use serde_json::{Map, Value};

use super::{ReportKind, ReportProfile};
use crate::error::ExportError;
use crate::model::{Cell, ColumnDef, Document, Section, Table};
use crate::payload::{Fields, format_currency, format_number, number_value};
use crate::rules::Palette;

/// Dealer listings for one make/model search, ranked by deal quality.
pub struct VehicleProfile;

impl ReportProfile for VehicleProfile {
    fn kind(&self) -> ReportKind {
        ReportKind::VehicleInventory
    }

    fn expected_type(&self) -> &'static str {
        "vehicle_inventory"
    }

    fn folder(&self) -> &'static str {
        "Vehicle_Inventory"
    }

    fn stem_subject(&self, payload: Fields<'_>) -> String {
        let params = payload.get("search_params");
        format!("{} {}", params.text_or("make", "vehicle"), params.text_or("model", ""))
    }

    fn stem_suffix(&self, _payload: Fields<'_>) -> String {
        "Vehicle_Inventory".to_string()
    }

    fn enum_scales(&self) -> &'static [&'static str] {
        &["deal"]
    }

    fn build(&self, payload: Fields<'_>, palette: &Palette) -> Result<Document, ExportError> {
        let params = payload.get("search_params");
        let market = payload.get("market_context");
        let listings = payload.list("listings");

        let vehicle = [params.text_or("year", ""), params.text_or("make", "Vehicle"), params.text_or("model", "")]
            .iter()
            .filter(|part| !part.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");
        let mut doc = Document::new(format!("{} Inventory Report", vehicle), self.kind().as_str(), palette.accent);
        doc.subtitle = format!("{} - {}", vehicle, params.text_or("condition", "New"));
        doc.footer = "Vehicle Inventory Report".to_string();
        doc.meta("Generated", payload.text_or("generated_date", ""))
            .meta("Listings", format!("{} unique", format_number(market.number("unique_listings"))))
            .meta("FMV Average", format_currency(market.number("fmv_average")));

        let mut search = Section::new("Search Parameters");
        let mut table = Table::new(vec![ColumnDef::new("Parameter", 40.0), ColumnDef::new("Value", 100.0)]);
        let trims = params.strings("trims").join(", ");
        for (label, value) in [
            ("Year", params.text("year")),
            ("Make", params.text("make")),
            ("Model", params.text("model")),
            ("Trims", if trims.is_empty() { "Any".to_string() } else { trims }),
            ("Condition", params.text_or("condition", "New")),
            (
                "Max Price",
                params.opt_number("max_price").map(format_currency).unwrap_or_else(|| params.text("max_price")),
            ),
            ("Radius", format!("{} miles", params.text("radius_miles"))),
            ("Zip Code", params.text("zip_code")),
        ] {
            table.push_row(vec![label.into(), value.into()])?;
        }
        search.table(table);
        doc.push_section(search);

        let mut context = Section::new("Market Context");
        context.list(
            vec![
                format!("Fair market value average: {}", format_currency(market.number("fmv_average"))),
                format!("Average asking price: {}", format_currency(market.number("average_asking"))),
                format!(
                    "Listings found: {} ({} unique after deduplication)",
                    format_number(market.number("total_listings_found")),
                    format_number(market.number("unique_listings"))
                ),
                format!("Market trend: {}", market.text("market_trend")),
                format!("Timing: {}", market.text("best_time_insight")),
            ],
            false,
        );
        let incentives = market.strings("incentives_summary");
        if !incentives.is_empty() {
            context.narrative("Current incentives:");
            context.list(incentives, false);
        }
        doc.push_section(context);

        doc.push_section(overview(&listings, palette)?);

        let mut notes = Section::new("Listing Notes");
        for listing in &listings {
            let features = listing.strings("key_features");
            let negotiation = listing.text_or("negotiation_notes", "");
            if features.is_empty() && negotiation.is_empty() {
                continue;
            }
            notes.narrative(format!(
                "#{} {} - {} ({})",
                listing.text_or("rank", ""),
                describe(*listing),
                listing.text_or("dealer_name", "Unknown"),
                listing.text_or("listing_url", "no link")
            ));
            notes.list(features, false);
            if !negotiation.is_empty() {
                notes.narrative(format!("Negotiation: {}", negotiation));
            }
        }
        doc.push_section(notes);

        let methodology = payload.get("methodology");
        let mut method = Section::new("Methodology");
        let mut items = vec![
            format!("Agents dispatched: {}", format_number(methodology.number("agents_dispatched"))),
            format!("Total searches: {}", format_number(methodology.number("total_searches"))),
            format!("Deduplication removals: {}", format_number(methodology.number("deduplication_removals"))),
        ];
        let sources = methodology.strings("sources_covered");
        if !sources.is_empty() {
            items.push(format!("Sources covered: {}", sources.join(", ")));
        }
        let fmv_sources = methodology.strings("fmv_sources");
        if !fmv_sources.is_empty() {
            items.push(format!("FMV sources: {}", fmv_sources.join(", ")));
        }
        method.list(items, false);
        doc.push_section(method);

        Ok(doc)
    }

    fn summary(&self, payload: Fields<'_>) -> Map<String, Value> {
        let listings = payload.list("listings");
        let mut summary = Map::new();
        summary.insert("listings".into(), number_value(listings.len() as f64));
        if let Some(top) = listings.first() {
            summary.insert("top_listing".into(), Value::String(describe(*top)));
            summary.insert("top_deal".into(), Value::String(top.text_or("deal_rating", "FAIR_PRICE")));
        }
        summary
    }
}

pub(super) fn describe(listing: Fields<'_>) -> String {
    ["year", "make", "model", "trim"]
        .iter()
        .map(|key| listing.text_or(key, ""))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Signed difference to fair market value, e.g. `-$1,200` or `+$350`.
pub(super) fn fmv_delta(listing: Fields<'_>) -> String {
    match listing.opt_number("price_vs_fmv") {
        Some(delta) if delta > 0.0 => format!("+{}", format_currency(delta)),
        Some(delta) => format_currency(delta),
        None => "N/A".to_string(),
    }
}

fn overview(listings: &[Fields<'_>], palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("Listings Overview");
    if listings.is_empty() {
        section.narrative("No listings matched the search.");
        return Ok(section);
    }
    let mut table = Table::new(vec![
        ColumnDef::new("#", 8.0).centered(),
        ColumnDef::new("Deal", 24.0).centered(),
        ColumnDef::new("Vehicle", 48.0),
        ColumnDef::new("Price", 20.0).right(),
        ColumnDef::new("vs FMV", 18.0).right(),
        ColumnDef::new("Dealer", 36.0),
        ColumnDef::new("Miles", 12.0).right(),
        ColumnDef::new("Score", 14.0).centered(),
    ]);
    for listing in listings {
        let deal = palette.enum_band("deal", &listing.text_or("deal_rating", ""))?;
        let score = listing.number("composite_score");
        table.push_row(vec![
            listing.text_or("rank", "").into(),
            Cell::banded(deal.label.clone(), deal),
            describe(*listing).into(),
            format_currency(listing.number("price")).into(),
            fmv_delta(*listing).into(),
            listing.text_or("dealer_name", "Unknown").into(),
            listing.text("dealer_distance_miles").into(),
            Cell::banded(format_number(score), palette.score_band("score", score)?),
        ])?;
    }
    section.table(table);
    Ok(section)
}
