use serde::{Deserialize, Serialize};

/// Verdict on a paid price relative to the reference statistic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Judgement {
    Deal,
    Fair,
    Overpay,
    Unknown,
}

impl std::fmt::Display for Judgement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deal => write!(f, "DEAL"),
            Self::Fair => write!(f, "FAIR"),
            Self::Overpay => write!(f, "OVERPAY"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl std::str::FromStr for Judgement {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEAL" => Ok(Self::Deal),
            "FAIR" => Ok(Self::Fair),
            "OVERPAY" => Ok(Self::Overpay),
            "UNKNOWN" => Ok(Self::Unknown),
            other => Err(format!("unknown judgement: {other}")),
        }
    }
}

/// Comparison of one item against the reference price statistics.
/// Serialized under the `estat` key on items, after the statistics source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceComparison {
    #[serde(default)]
    pub found: bool,
    pub stat_price: Option<f64>,
    pub stat_unit: Option<String>,
    pub diff: Option<f64>,
    pub rate: Option<f64>,
    pub judgement: Option<Judgement>,
    pub note: Option<String>,
}

/// One line item extracted from a receipt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub raw_name: String,
    pub canonical: Option<String>,
    pub paid_unit_price: Option<f64>,
    pub quantity: Option<f64>,
    pub estat: Option<PriceComparison>,
}

/// Aggregate judgement counts over a result's items.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub deal_count: u32,
    #[serde(default)]
    pub overpay_count: u32,
    #[serde(default)]
    pub unknown_count: u32,
    #[serde(default)]
    pub total_diff: f64,
}

impl Summary {
    /// Recompute the summary from items. DEAL and OVERPAY count only explicit
    /// judgements; an item with no comparison or no judgement counts as
    /// UNKNOWN; FAIR increments no counter. Absent diffs contribute 0.
    pub fn tally(items: &[ReceiptItem]) -> Self {
        let mut summary = Summary::default();
        for item in items {
            match item.estat.as_ref().and_then(|e| e.judgement) {
                Some(Judgement::Deal) => summary.deal_count += 1,
                Some(Judgement::Overpay) => summary.overpay_count += 1,
                Some(Judgement::Unknown) | None => summary.unknown_count += 1,
                Some(Judgement::Fair) => {}
            }
            summary.total_diff += item.estat.as_ref().and_then(|e| e.diff).unwrap_or(0.0);
        }
        summary
    }
}

/// A full analysis of one receipt, as produced by the backend.
/// Opaque to the stores beyond shape-checking; `items` always decodes to a
/// sequence even when the field is missing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResult {
    pub purchase_date: Option<String>,
    pub summary: Option<Summary>,
    #[serde(default)]
    pub items: Vec<ReceiptItem>,
    pub debug: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Backend health probe response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub vision_model: Vec<String>,
    #[serde(default)]
    pub estat_app_id_set: bool,
}

/// One entry from the reference price catalog search.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaHit {
    pub id: Option<String>,
    pub class_id: Option<String>,
    pub name: Option<String>,
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(judgement: Option<Judgement>, diff: Option<f64>) -> ReceiptItem {
        ReceiptItem {
            raw_name: "item".into(),
            canonical: None,
            paid_unit_price: Some(100.0),
            quantity: Some(1.0),
            estat: Some(PriceComparison {
                found: judgement.is_some(),
                diff,
                judgement,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn judgement_wire_strings() {
        assert_eq!(serde_json::to_string(&Judgement::Deal).unwrap(), "\"DEAL\"");
        assert_eq!(serde_json::to_string(&Judgement::Overpay).unwrap(), "\"OVERPAY\"");
        let parsed: Judgement = serde_json::from_str("\"UNKNOWN\"").unwrap();
        assert_eq!(parsed, Judgement::Unknown);
        assert!(serde_json::from_str::<Judgement>("\"deal\"").is_err());
    }

    #[test]
    fn judgement_display_from_str_roundtrip() {
        for j in [Judgement::Deal, Judgement::Fair, Judgement::Overpay, Judgement::Unknown] {
            let parsed: Judgement = j.to_string().parse().unwrap();
            assert_eq!(j, parsed);
        }
        assert!("FAIRLY".parse::<Judgement>().is_err());
    }

    #[test]
    fn tally_counts_explicit_judgements() {
        let items = vec![
            item(Some(Judgement::Deal), Some(-12.0)),
            item(Some(Judgement::Deal), Some(-2.0)),
            item(Some(Judgement::Overpay), Some(8.0)),
            item(Some(Judgement::Unknown), None),
        ];
        let summary = Summary::tally(&items);
        assert_eq!(summary.deal_count, 2);
        assert_eq!(summary.overpay_count, 1);
        assert_eq!(summary.unknown_count, 1);
        assert!((summary.total_diff - -6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tally_missing_judgement_counts_as_unknown() {
        let mut no_comparison = item(None, None);
        no_comparison.estat = None;
        let items = vec![no_comparison, item(None, Some(5.0))];
        let summary = Summary::tally(&items);
        assert_eq!(summary.unknown_count, 2);
        assert_eq!(summary.deal_count, 0);
        assert!((summary.total_diff - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tally_fair_increments_nothing() {
        let items = vec![item(Some(Judgement::Fair), Some(0.0))];
        let summary = Summary::tally(&items);
        assert_eq!(summary.deal_count, 0);
        assert_eq!(summary.overpay_count, 0);
        assert_eq!(summary.unknown_count, 0);
    }

    #[test]
    fn analyze_result_missing_items_decodes_empty() {
        let result: AnalyzeResult =
            serde_json::from_str(r#"{"purchase_date":"2024-04-01"}"#).unwrap();
        assert_eq!(result.purchase_date.as_deref(), Some("2024-04-01"));
        assert!(result.items.is_empty());
    }

    #[test]
    fn analyze_result_tolerates_unknown_keys() {
        let result: AnalyzeResult =
            serde_json::from_str(r#"{"currency":"JPY","items":[],"foo":"bar"}"#).unwrap();
        assert!(result.items.is_empty());
        assert!(result.summary.is_none());
    }

    #[test]
    fn analyze_result_rejects_non_objects() {
        assert!(serde_json::from_str::<AnalyzeResult>("null").is_err());
        assert!(serde_json::from_str::<AnalyzeResult>("[1,2,3]").is_err());
        assert!(serde_json::from_str::<AnalyzeResult>("\"text\"").is_err());
    }

    #[test]
    fn item_requires_raw_name() {
        assert!(serde_json::from_str::<ReceiptItem>(r#"{"paid_unit_price":100}"#).is_err());
        let parsed: ReceiptItem =
            serde_json::from_str(r#"{"raw_name":"Milk 1L"}"#).unwrap();
        assert_eq!(parsed.raw_name, "Milk 1L");
        assert!(parsed.estat.is_none());
    }

    #[test]
    fn comparison_defaults() {
        let parsed: PriceComparison = serde_json::from_str("{}").unwrap();
        assert!(!parsed.found);
        assert!(parsed.stat_price.is_none());
        assert!(parsed.judgement.is_none());
    }
}
