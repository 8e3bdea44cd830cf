use serde_json::{Map, Value};

use super::vehicle::fmv_delta;
use super::{ReportKind, ReportProfile, join_fields};
use crate::error::ExportError;
use crate::model::{Cell, ColumnDef, Document, Section, Table};
use crate::payload::{Fields, format_currency, format_number, group_thousands, number_value};
use crate::rules::Palette;

/// Dealer listings of campers and RVs, ranked by deal quality.
pub struct CamperInventoryProfile;

impl ReportProfile for CamperInventoryProfile {
    fn kind(&self) -> ReportKind {
        ReportKind::CamperInventory
    }

    fn expected_type(&self) -> &'static str {
        "camper_inventory"
    }

    fn folder(&self) -> &'static str {
        "Camper_Inventory"
    }

    fn stem_subject(&self, payload: Fields<'_>) -> String {
        let params = payload.get("search_params");
        format!("{} {}", params.text_or("make", "camper"), params.text_or("model", ""))
    }

    fn stem_suffix(&self, _payload: Fields<'_>) -> String {
        "Camper_Inventory".to_string()
    }

    fn enum_scales(&self) -> &'static [&'static str] {
        &["deal"]
    }

    fn build(&self, payload: Fields<'_>, palette: &Palette) -> Result<Document, ExportError> {
        let params = payload.get("search_params");
        let market = payload.get("market_context");
        let listings = payload.list("listings");

        let mut camper = join_fields(params, &["year", "make", "model", "floorplan"]);
        if camper.is_empty() {
            camper = "Camper".to_string();
        }
        let rv_type = params.text_or("rv_type", "");
        let mut doc = Document::new(format!("{} Inventory Report", camper), self.kind().as_str(), palette.accent);
        doc.subtitle = format!(
            "{} - {}",
            camper,
            if rv_type.is_empty() { params.text_or("condition", "New") } else { rv_type.clone() }
        );
        doc.footer = "Camper/RV Inventory Report".to_string();
        doc.meta("Generated", payload.text_or("generated_date", ""))
            .meta("RV Type", if rv_type.is_empty() { "N/A".to_string() } else { rv_type.clone() })
            .meta("Listings", format!("{} unique", format_number(market.number("unique_listings"))))
            .meta("FMV Average", format_currency(market.number("fmv_average")));

        let mut search = Section::new("Search Parameters");
        let mut table = Table::new(vec![ColumnDef::new("Parameter", 40.0), ColumnDef::new("Value", 100.0)]);
        let features = params.strings("features").join(", ");
        for (label, value) in [
            ("Year", params.text("year")),
            ("Make", params.text("make")),
            ("Model", params.text("model")),
            ("Floorplan", params.text_or("floorplan", "All")),
            ("RV Type", if rv_type.is_empty() { "All".to_string() } else { rv_type }),
            ("Condition", params.text_or("condition", "New")),
            ("Budget", format_currency(params.number("max_price"))),
            ("Radius", format!("{} miles", params.text("radius_miles"))),
            ("Zip Code", params.text("zip_code")),
            ("Features", if features.is_empty() { "Any".to_string() } else { features }),
        ] {
            table.push_row(vec![label.into(), value.into()])?;
        }
        search.table(table);
        doc.push_section(search);

        doc.push_section(market_context(market, payload.is_present("market_context")));
        doc.push_section(overview(&listings, palette)?);
        for listing in &listings {
            doc.push_section(listing_detail(*listing, palette)?);
        }

        let methodology = payload.get("methodology");
        let mut method = Section::new("Methodology");
        if payload.is_present("methodology") {
            let mut items = vec![
                format!("Agents dispatched: {}", format_number(methodology.number("agents_dispatched"))),
                format!("Total searches: {}", format_number(methodology.number("total_searches"))),
            ];
            for (label, key) in [("Sources covered", "sources_covered"), ("FMV sources", "fmv_sources")] {
                let names = methodology.strings(key);
                if !names.is_empty() {
                    items.push(format!("{}: {}", label, names.join(", ")));
                }
            }
            method.list(items, false);
        }
        doc.push_section(method);

        Ok(doc)
    }

    fn summary(&self, payload: Fields<'_>) -> Map<String, Value> {
        let listings = payload.list("listings");
        let mut summary = Map::new();
        summary.insert("listings".into(), number_value(listings.len() as f64));
        if let Some(top) = listings.first() {
            let name = join_fields(*top, &["year", "make", "model", "floorplan"]);
            summary.insert("top_listing".into(), Value::String(name));
            summary.insert("top_deal".into(), Value::String(top.text_or("deal_rating", "FAIR_PRICE")));
        }
        summary
    }
}

fn market_context(market: Fields<'_>, present: bool) -> Section {
    let mut section = Section::new("Market Context");
    if !present {
        return section;
    }
    let mut items = vec![
        format!("Fair market value average: {}", format_currency(market.number("fmv_average"))),
        format!("Average asking price: {}", format_currency(market.number("average_asking"))),
        format!(
            "Listings found: {} ({} unique)",
            format_number(market.number("total_listings_found")),
            format_number(market.number("unique_listings"))
        ),
    ];
    for (label, key) in
        [("NADA value", "fmv_nada"), ("RVTrader average", "fmv_rvtrader_avg"), ("JD Power value", "fmv_jd_power")]
    {
        if let Some(value) = market.opt_number(key).filter(|v| *v != 0.0) {
            items.push(format!("{}: {}", label, format_currency(value)));
        }
    }
    items.push(format!("Market trend: {}", market.text("market_trend")));
    items.push(format!("Best time to buy: {}", market.text("best_time_insight")));
    let prep = market.text_or("prep_fee_notes", "");
    if !prep.is_empty() {
        items.push(format!("Dealer prep fees: {}", prep));
    }
    section.list(items, false);
    let incentives = market.strings("incentives_summary");
    if !incentives.is_empty() {
        section.narrative("Current incentives:");
        section.list(incentives, false);
    }
    section
}

/// Compact spec line, e.g. `28ft / 5,820lbs / 1sl`.
fn specs(listing: Fields<'_>) -> String {
    let mut parts = Vec::new();
    if let Some(length) = listing.get("length_ft").as_text().filter(|l| !l.is_empty()) {
        parts.push(format!("{}ft", length));
    }
    match listing.opt_number("dry_weight_lbs") {
        Some(weight) => parts.push(format!("{}lbs", group_thousands(weight))),
        None => {
            if let Some(weight) = listing.get("dry_weight_lbs").as_text().filter(|w| !w.is_empty()) {
                parts.push(format!("{}lbs", weight));
            }
        }
    }
    if let Some(slides) = listing.get("slides").as_text().filter(|s| !s.is_empty()) {
        parts.push(format!("{}sl", slides));
    }
    if parts.is_empty() { "N/A".to_string() } else { parts.join(" / ") }
}

fn weight(listing: Fields<'_>, key: &str) -> String {
    listing.opt_number(key).map(group_thousands).unwrap_or_else(|| listing.text(key))
}

fn overview(listings: &[Fields<'_>], palette: &Palette) -> Result<Section, ExportError> {
    let mut section = Section::new("Listings Overview");
    if listings.is_empty() {
        section.narrative("No listings matched the search.");
        return Ok(section);
    }
    let mut table = Table::new(vec![
        ColumnDef::new("#", 8.0).centered(),
        ColumnDef::new("Deal", 22.0).centered(),
        ColumnDef::new("Camper", 44.0),
        ColumnDef::new("Price", 20.0).right(),
        ColumnDef::new("vs FMV", 18.0).right(),
        ColumnDef::new("Specs", 30.0),
        ColumnDef::new("Dealer", 32.0),
        ColumnDef::new("Rating", 12.0).centered(),
        ColumnDef::new("Score", 12.0).centered(),
    ]);
    for listing in listings {
        let deal = palette.enum_band("deal", &listing.text_or("deal_rating", ""))?;
        let score = listing.number("composite_score");
        table.push_row(vec![
            listing.text_or("rank", "").into(),
            Cell::banded(deal.label.clone(), deal),
            join_fields(*listing, &["year", "model", "floorplan"]).into(),
            format_currency(listing.number("price")).into(),
            fmv_delta(*listing).into(),
            specs(*listing).into(),
            listing.text_or("dealer_name", "Unknown").into(),
            listing.text("dealer_rating").into(),
            Cell::banded(format_number(score), palette.score_band("score", score)?),
        ])?;
    }
    section.table(table);
    Ok(section)
}

fn listing_detail(listing: Fields<'_>, palette: &Palette) -> Result<Section, ExportError> {
    let deal = palette.enum_band("deal", &listing.text_or("deal_rating", ""))?;
    let mut section = Section::new(format!(
        "#{} {}",
        listing.text_or("rank", ""),
        join_fields(listing, &["year", "make", "model", "floorplan"])
    ));
    let pct = listing.opt_number("price_vs_fmv_pct").map(|p| format!("{:+.1}%", p)).unwrap_or_else(|| "N/A".into());
    section.narrative(format!(
        "Deal rating: {} | Score: {} | Confidence: {}",
        deal.label,
        format_number(listing.number("composite_score")),
        listing.text("confidence")
    ));
    section.list(
        vec![
            format!("Price: {}", format_currency(listing.number("price"))),
            format!("MSRP: {}", format_currency(listing.number("msrp"))),
            format!("FMV: {}", format_currency(listing.number("fmv"))),
            format!("vs FMV: {} ({})", fmv_delta(listing), pct),
        ],
        false,
    );
    section.list(
        vec![
            format!("RV type: {}", listing.text("rv_type")),
            format!("Length: {} ft", listing.text("length_ft")),
            format!("Dry weight: {} lbs", weight(listing, "dry_weight_lbs")),
            format!("GVWR: {} lbs", weight(listing, "gvwr_lbs")),
            format!("Slide-outs: {}", listing.text("slides")),
            format!("Sleeping capacity: {}", listing.text("sleeping_capacity")),
            format!(
                "Tanks: fresh {} / gray {} / black {} gal",
                listing.text("fresh_water_gal"),
                listing.text("gray_water_gal"),
                listing.text("black_water_gal")
            ),
        ],
        false,
    );
    section.list(
        vec![
            format!("Exterior: {}", listing.text("exterior_color")),
            format!("Mileage: {}", listing.text("mileage")),
            format!("Days on market: {}", listing.text("days_on_market")),
            format!("Stock #: {}", listing.text("stock_number")),
            format!(
                "Dealer: {} ({} miles), rated {} ({} reviews)",
                listing.text_or("dealer_name", "Unknown"),
                listing.text("dealer_distance_miles"),
                listing.text("dealer_rating"),
                listing.text("dealer_review_count")
            ),
            format!("Source: {}", listing.text("source")),
        ],
        false,
    );
    let features = listing.strings("key_features");
    if !features.is_empty() {
        section.narrative("Key features:");
        section.list(features, false);
    }
    let incentives = listing.strings("incentives");
    if !incentives.is_empty() {
        section.narrative("Incentives:");
        section.list(incentives, false);
    }
    let negotiation = listing.text_or("negotiation_notes", "");
    if !negotiation.is_empty() {
        section.narrative(format!("Negotiation: {}", negotiation));
    }
    let url = listing.text_or("listing_url", "");
    if !url.is_empty() {
        section.narrative(format!("Listing: {}", url));
    }
    Ok(section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Block;
    use crate::rules::RuleBook;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "type": "camper_inventory",
            "search_params": {"year": 2025, "make": "Grand Design", "model": "Imagine", "rv_type": "Travel Trailer"},
            "market_context": {"fmv_average": 48000, "fmv_nada": 47500, "fmv_jd_power": 0},
            "listings": [
                {"rank": 1, "deal_rating": "GOOD_DEAL", "year": 2025, "make": "Grand Design", "model": "Imagine",
                 "floorplan": "2800BH", "price": 45990, "price_vs_fmv": -2010, "price_vs_fmv_pct": -4.19,
                 "length_ft": 33, "dry_weight_lbs": 6995, "slides": 1, "composite_score": 74}
            ]
        })
    }

    #[test]
    fn test_listing_row_shows_specs_and_banded_score() {
        let payload = sample();
        let book = RuleBook::builtin().unwrap();
        let palette = book.palette("camper-inventory").unwrap();
        let doc = CamperInventoryProfile.build(Fields::new(&payload), palette).unwrap();
        assert_eq!(doc.title, "2025 Grand Design Imagine Inventory Report");
        assert_eq!(doc.subtitle, "2025 Grand Design Imagine - Travel Trailer");

        let section = doc.sections.iter().find(|s| s.heading == "Listings Overview").unwrap();
        let Block::Table(table) = &section.blocks[0] else { panic!("expected a table") };
        let row = &table.rows()[0];
        assert_eq!(row[1].text, "GOOD DEAL");
        assert_eq!(row[2].text, "2025 Imagine 2800BH");
        assert_eq!(row[4].text, "-$2,010");
        assert_eq!(row[5].text, "33ft / 6,995lbs / 1sl");
        assert_eq!(row[8].band.as_ref().unwrap().label, "Good");

        let detail = doc.sections.iter().find(|s| s.heading == "#1 2025 Grand Design Imagine 2800BH").unwrap();
        assert!(matches!(&detail.blocks[1], Block::List { items, .. } if items[3] == "vs FMV: -$2,010 (-4.2%)"));
    }

    #[test]
    fn test_zero_valuations_are_omitted() {
        let payload = sample();
        let book = RuleBook::builtin().unwrap();
        let palette = book.palette("camper-inventory").unwrap();
        let doc = CamperInventoryProfile.build(Fields::new(&payload), palette).unwrap();
        let context = doc.sections.iter().find(|s| s.heading == "Market Context").unwrap();
        let Block::List { items, .. } = &context.blocks[0] else { panic!("expected a list") };
        assert!(items.contains(&"NADA value: $47,500".to_string()));
        assert!(!items.iter().any(|item| item.starts_with("JD Power")));
    }

    #[test]
    fn test_specs_without_data() {
        assert_eq!(specs(Fields::new(&json!({}))), "N/A");
        assert_eq!(CamperInventoryProfile.stem_subject(Fields::new(&sample())), "Grand Design Imagine");
    }
}
