//! Domain definitions for cost prediction: the shipment input record and the
//! models that price it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::error::{ShipError, ShipResult};
use crate::data::domain::{Column, ColumnValues, Dataset};

pub const ARTIST_REPUTATION: &str = "Artist Reputation";
pub const HEIGHT: &str = "Height";
pub const WIDTH: &str = "Width";
pub const WEIGHT: &str = "Weight";
pub const MATERIAL: &str = "Material";
pub const PRICE_OF_SCULPTURE: &str = "Price Of Sculpture";
pub const BASE_SHIPPING_PRICE: &str = "Base Shipping Price";
pub const INTERNATIONAL: &str = "International";
pub const EXPRESS_SHIPMENT: &str = "Express Shipment";
pub const INSTALLATION_INCLUDED: &str = "Installation Included";
pub const TRANSPORT: &str = "Transport";
pub const FRAGILE: &str = "Fragile";
pub const CUSTOMER_INFORMATION: &str = "Customer Information";
pub const REMOTE_LOCATION: &str = "Remote Location";

/// Input columns of a prediction request, in model order.
pub const INPUT_COLUMNS: [&str; 14] = [
    ARTIST_REPUTATION,
    HEIGHT,
    WIDTH,
    WEIGHT,
    MATERIAL,
    PRICE_OF_SCULPTURE,
    BASE_SHIPPING_PRICE,
    INTERNATIONAL,
    EXPRESS_SHIPMENT,
    INSTALLATION_INCLUDED,
    TRANSPORT,
    FRAGILE,
    CUSTOMER_INFORMATION,
    REMOTE_LOCATION,
];

/// One shipment to price. Serialised with the dataset column names so a
/// request body can be fed straight in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShippingData {
    #[serde(rename = "Artist Reputation")]
    pub artist_reputation: f64,
    #[serde(rename = "Height")]
    pub height: f64,
    #[serde(rename = "Width")]
    pub width: f64,
    #[serde(rename = "Weight")]
    pub weight: f64,
    #[serde(rename = "Material")]
    pub material: String,
    #[serde(rename = "Price Of Sculpture")]
    pub price_of_sculpture: f64,
    #[serde(rename = "Base Shipping Price")]
    pub base_shipping_price: f64,
    #[serde(rename = "International")]
    pub international: String,
    #[serde(rename = "Express Shipment")]
    pub express_shipment: String,
    #[serde(rename = "Installation Included")]
    pub installation_included: String,
    #[serde(rename = "Transport")]
    pub transport: String,
    #[serde(rename = "Fragile")]
    pub fragile: String,
    #[serde(rename = "Customer Information")]
    pub customer_information: String,
    #[serde(rename = "Remote Location")]
    pub remote_location: String,
}

impl ShippingData {
    /// Single-row dataset with one column per field, in [`INPUT_COLUMNS`] order.
    pub fn to_dataset(&self) -> ShipResult<Dataset> {
        let num = |name: &str, v: f64| Column::new(name, ColumnValues::Numeric(vec![Some(v)]));
        let text = |name: &str, v: &str| {
            Column::new(name, ColumnValues::Text(vec![Some(v.to_string())]))
        };
        Dataset::new(
            "prediction",
            vec![
                num(ARTIST_REPUTATION, self.artist_reputation),
                num(HEIGHT, self.height),
                num(WIDTH, self.width),
                num(WEIGHT, self.weight),
                text(MATERIAL, &self.material),
                num(PRICE_OF_SCULPTURE, self.price_of_sculpture),
                num(BASE_SHIPPING_PRICE, self.base_shipping_price),
                text(INTERNATIONAL, &self.international),
                text(EXPRESS_SHIPMENT, &self.express_shipment),
                text(INSTALLATION_INCLUDED, &self.installation_included),
                text(TRANSPORT, &self.transport),
                text(FRAGILE, &self.fragile),
                text(CUSTOMER_INFORMATION, &self.customer_information),
                text(REMOTE_LOCATION, &self.remote_location),
            ],
        )
    }
}

/// A model that prices one row of a dataset.
pub trait CostModel: Send + Sync {
    fn name(&self) -> &'static str;
    fn predict_row(&self, dataset: &Dataset, row: usize) -> ShipResult<f64>;
}

fn number(dataset: &Dataset, column: &str, row: usize) -> ShipResult<f64> {
    dataset
        .column(column)
        .ok_or_else(|| ShipError::invalid(format!("missing column `{column}`")))?
        .values
        .number_at(row)
        .ok_or_else(|| ShipError::invalid(format!("`{column}` row {row} is not a number")))
}

fn yes(dataset: &Dataset, column: &str, row: usize) -> ShipResult<bool> {
    let value = dataset
        .column(column)
        .ok_or_else(|| ShipError::invalid(format!("missing column `{column}`")))?
        .values
        .text_at(row);
    Ok(value.is_some_and(|v| v.trim().eq_ignore_ascii_case("yes")))
}

/// Rule-of-thumb pricing used while no trained artefact is available.
#[derive(Copy, Clone, Debug, Default)]
pub struct FallbackCostModel;

impl FallbackCostModel {
    pub const INTERNATIONAL_FACTOR: f64 = 1.5;
    pub const EXPRESS_FACTOR: f64 = 1.3;
    pub const FRAGILE_FACTOR: f64 = 1.2;
}

impl CostModel for FallbackCostModel {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn predict_row(&self, dataset: &Dataset, row: usize) -> ShipResult<f64> {
        let factor = |flag: bool, f: f64| if flag { f } else { 1.0 };
        let base = number(dataset, BASE_SHIPPING_PRICE, row)?;
        let weight = number(dataset, WEIGHT, row)?;
        Ok(base
            * weight
            * factor(yes(dataset, INTERNATIONAL, row)?, Self::INTERNATIONAL_FACTOR)
            * factor(yes(dataset, EXPRESS_SHIPMENT, row)?, Self::EXPRESS_FACTOR)
            * factor(yes(dataset, FRAGILE, row)?, Self::FRAGILE_FACTOR))
    }
}

/// Trained linear regression over numeric columns and one-hot categorical
/// levels. Unseen levels contribute nothing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearCostModel {
    pub intercept: f64,
    #[serde(default)]
    pub numeric: BTreeMap<String, f64>,
    #[serde(default)]
    pub categorical: BTreeMap<String, BTreeMap<String, f64>>,
}

impl CostModel for LinearCostModel {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn predict_row(&self, dataset: &Dataset, row: usize) -> ShipResult<f64> {
        let mut total = self.intercept;
        for (column, coef) in &self.numeric {
            total += coef * number(dataset, column, row)?;
        }
        for (column, levels) in &self.categorical {
            let value = dataset
                .column(column)
                .ok_or_else(|| ShipError::invalid(format!("missing column `{column}`")))?
                .values
                .text_at(row);
            if let Some(coef) = value.and_then(|v| levels.get(v.trim())) {
                total += coef;
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ShippingData {
        ShippingData {
            artist_reputation: 0.26,
            height: 17.0,
            width: 6.0,
            weight: 4128.0,
            material: "Brass".into(),
            price_of_sculpture: 13.91,
            base_shipping_price: 16.27,
            international: "Yes".into(),
            express_shipment: "Yes".into(),
            installation_included: "No".into(),
            transport: "Airways".into(),
            fragile: "No".into(),
            customer_information: "Working Class".into(),
            remote_location: "No".into(),
        }
    }

    #[test]
    fn dataset_has_one_row_in_column_order() {
        let ds = sample().to_dataset().unwrap();
        assert_eq!(ds.n_rows(), 1);
        assert_eq!(ds.column_names().collect::<Vec<_>>(), INPUT_COLUMNS);
    }

    #[test]
    fn request_body_uses_column_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["Base Shipping Price"], 16.27);
        let back: ShippingData = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn fallback_multiplies_flags() {
        let ds = sample().to_dataset().unwrap();
        let cost = FallbackCostModel.predict_row(&ds, 0).unwrap();
        let expected = 16.27 * 4128.0 * 1.5 * 1.3;
        assert!((cost - expected).abs() < 1e-6, "{cost} vs {expected}");
    }

    #[test]
    fn fallback_flags_are_case_insensitive() {
        let mut data = sample();
        data.international = "no".into();
        data.express_shipment = "NO".into();
        data.fragile = "yEs".into();
        let ds = data.to_dataset().unwrap();
        let cost = FallbackCostModel.predict_row(&ds, 0).unwrap();
        assert!((cost - 16.27 * 4128.0 * 1.2).abs() < 1e-6);
    }

    #[test]
    fn fallback_needs_price_and_weight() {
        let ds = sample().to_dataset().unwrap().without_column(WEIGHT);
        assert!(matches!(
            FallbackCostModel.predict_row(&ds, 0),
            Err(ShipError::InvalidInput(_))
        ));
    }

    #[test]
    fn linear_model_sums_terms() {
        let model: LinearCostModel = serde_json::from_str(
            r#"{
                "intercept": 10.0,
                "numeric": {"Weight": 0.5, "Height": 2.0},
                "categorical": {"Material": {"Brass": 100.0, "Clay": -5.0}}
            }"#,
        )
        .unwrap();
        let ds = sample().to_dataset().unwrap();
        let cost = model.predict_row(&ds, 0).unwrap();
        assert!((cost - (10.0 + 0.5 * 4128.0 + 2.0 * 17.0 + 100.0)).abs() < 1e-9);
    }

    #[test]
    fn linear_model_ignores_unseen_levels() {
        let model = LinearCostModel {
            intercept: 1.0,
            categorical: BTreeMap::from([(
                TRANSPORT.to_string(),
                BTreeMap::from([("Roadways".to_string(), 3.0)]),
            )]),
            ..Default::default()
        };
        let ds = sample().to_dataset().unwrap();
        assert_eq!(model.predict_row(&ds, 0).unwrap(), 1.0);
    }
}
