//! Canned analysis data served by the mock backend.

use serde_json::{json, Map, Value};

use dealcheck_core::{
    AnalyzeResult, HealthStatus, Judgement, MetaHit, PriceComparison, ReceiptItem, Summary,
};

/// Fixed ten-item receipt returned for every mock analysis.
pub fn sample_analysis() -> AnalyzeResult {
    AnalyzeResult {
        purchase_date: Some("2024-04-01".to_string()),
        summary: Some(Summary {
            deal_count: 4,
            overpay_count: 4,
            unknown_count: 2,
            total_diff: 28.0,
        }),
        items: sample_items(),
        debug: Some(debug_info()),
    }
}

pub fn health() -> HealthStatus {
    HealthStatus {
        ok: true,
        vision_model: vec!["mock-vision-v1".to_string()],
        estat_app_id_set: true,
    }
}

pub fn meta_hits() -> Vec<MetaHit> {
    vec![
        hit("0113", "Bread", "011301"),
        hit("0113", "Rolls", "011302"),
        hit("0114", "Milk", "011401"),
        hit("0114", "Yogurt", "011402"),
        hit("0115", "Eggs", "011501"),
        hit("0116", "Tofu", "011601"),
        hit("0117", "Chicken", "011701"),
        hit("0118", "Tomatoes", "011801"),
        hit("0118", "Bananas", "011802"),
        hit("0119", "Juice", "011901"),
        hit("0119", "Instant noodles", "011902"),
        hit("0120", "Cereal bar", "012001"),
    ]
}

/// Case-insensitive name match plus exact code substring match. A query
/// that matches nothing falls back to the first few hits so the caller
/// always has something to show.
pub fn filter_hits(query: &str) -> Vec<MetaHit> {
    let q = query.trim();
    let all = meta_hits();
    if q.is_empty() {
        return all;
    }
    let lower = q.to_lowercase();
    let hits: Vec<MetaHit> = all
        .iter()
        .filter(|hit| {
            let name = hit.name.as_deref().unwrap_or("");
            let code = hit.code.as_deref().unwrap_or("");
            name.contains(q) || name.to_lowercase().contains(&lower) || code.contains(q)
        })
        .cloned()
        .collect();
    if hits.is_empty() {
        all.into_iter().take(3).collect()
    } else {
        hits
    }
}

fn sample_items() -> Vec<ReceiptItem> {
    vec![
        item(
            "Milk 1L",
            Some("Milk"),
            198.0,
            1.0,
            compared(210.0, -12.0, -0.057, Judgement::Deal, "Slightly cheaper than average"),
        ),
        item(
            "Bread (6 slices)",
            Some("Bread"),
            168.0,
            1.0,
            compared(160.0, 8.0, 0.05, Judgement::Overpay, "A bit higher than average"),
        ),
        item(
            "Eggs (10 pack)",
            Some("Eggs"),
            258.0,
            1.0,
            compared(260.0, -2.0, -0.008, Judgement::Deal, "Close to average"),
        ),
        item(
            "Seasonal juice",
            None,
            238.0,
            1.0,
            not_found("No matching stats found"),
        ),
        item(
            "Tomatoes (2 packs)",
            Some("Tomatoes"),
            120.0,
            2.0,
            compared(110.0, 10.0, 0.091, Judgement::Overpay, "Market price lower"),
        ),
        item(
            "Bananas (1 bunch)",
            Some("Bananas"),
            158.0,
            1.0,
            compared(170.0, -12.0, -0.071, Judgement::Deal, "Discounted today"),
        ),
        item(
            "Tofu (2 blocks)",
            Some("Tofu"),
            98.0,
            2.0,
            compared(100.0, -2.0, -0.02, Judgement::Deal, "Slightly below average"),
        ),
        item(
            "Chicken breast 400g",
            Some("Chicken breast"),
            420.0,
            1.0,
            compared(400.0, 20.0, 0.05, Judgement::Overpay, "Higher than average"),
        ),
        item(
            "Instant noodles (5 pack)",
            Some("Instant noodles"),
            298.0,
            1.0,
            compared(280.0, 18.0, 0.064, Judgement::Overpay, "Store price higher"),
        ),
        item(
            "Cereal bar",
            None,
            148.0,
            1.0,
            not_found("No matching stats found"),
        ),
    ]
}

fn debug_info() -> Map<String, Value> {
    let mut debug = Map::new();
    debug.insert("source".to_string(), json!("mock"));
    debug.insert(
        "ocr_lines".to_string(),
        json!([
            "Milk 1L 198",
            "Bread 6 slices 168",
            "Eggs 10 pack 258",
            "Seasonal juice 238",
            "Tomatoes 2 packs 120",
            "Bananas 1 bunch 158",
            "Tofu 2 blocks 98",
            "Chicken breast 400g 420",
            "Instant noodles 5 pack 298",
            "Cereal bar 148"
        ]),
    );
    debug.insert(
        "hint".to_string(),
        json!("Set DEALCHECK_USE_MOCK=true to always use sample data."),
    );
    debug
}

fn item(
    raw_name: &str,
    canonical: Option<&str>,
    paid_unit_price: f64,
    quantity: f64,
    estat: PriceComparison,
) -> ReceiptItem {
    ReceiptItem {
        raw_name: raw_name.to_string(),
        canonical: canonical.map(str::to_string),
        paid_unit_price: Some(paid_unit_price),
        quantity: Some(quantity),
        estat: Some(estat),
    }
}

fn compared(
    stat_price: f64,
    diff: f64,
    rate: f64,
    judgement: Judgement,
    note: &str,
) -> PriceComparison {
    PriceComparison {
        found: true,
        stat_price: Some(stat_price),
        stat_unit: None,
        diff: Some(diff),
        rate: Some(rate),
        judgement: Some(judgement),
        note: Some(note.to_string()),
    }
}

fn not_found(note: &str) -> PriceComparison {
    PriceComparison {
        found: false,
        judgement: Some(Judgement::Unknown),
        note: Some(note.to_string()),
        ..Default::default()
    }
}

fn hit(class_id: &str, name: &str, code: &str) -> MetaHit {
    MetaHit {
        id: None,
        class_id: Some(class_id.to_string()),
        name: Some(name.to_string()),
        code: Some(code.to_string()),
    }
}
