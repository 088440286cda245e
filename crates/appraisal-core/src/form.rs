//! Appraisal form fields and upload groups

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppraisalError, Result};
use crate::upload::RawUpload;

pub const DEFAULT_CONTRACTOR: &str = "ООО «Агентство «Бизнес-Актив»";

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d.%m.%Y"];

/// Parse `YYYY-MM-DD` or `DD.MM.YYYY`
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

fn deserialize_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_date(&text).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "invalid date '{}', expected YYYY-MM-DD or DD.MM.YYYY",
            text
        ))
    })
}

fn default_contractor() -> String {
    DEFAULT_CONTRACTOR.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppraisalForm {
    #[serde(default)]
    pub contract_no: String,
    /// "Основание"
    #[serde(default)]
    pub basis: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub valuation_date: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    pub report_date: NaiveDate,
    #[serde(default)]
    pub customer: String,
    #[serde(default = "default_contractor")]
    pub contractor: String,
    #[serde(default)]
    pub price_vat: f64,
    #[serde(default)]
    pub price_no_vat: f64,
    #[serde(default)]
    pub otchet_number: String,
    #[serde(default)]
    pub object_type: String,
    #[serde(default)]
    pub car_name: String,
    #[serde(default)]
    pub vin_model: String,
}

impl AppraisalForm {
    /// An empty form dated `date`
    pub fn dated(date: NaiveDate) -> Self {
        Self {
            contract_no: String::new(),
            basis: String::new(),
            valuation_date: date,
            report_date: date,
            customer: String::new(),
            contractor: default_contractor(),
            price_vat: 0.0,
            price_no_vat: 0.0,
            otchet_number: String::new(),
            object_type: String::new(),
            car_name: String::new(),
            vin_model: String::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("price_vat", self.price_vat), ("price_no_vat", self.price_no_vat)] {
            if !value.is_finite() {
                return Err(AppraisalError::invalid(field, "must be a finite number"));
            }
            if value < 0.0 {
                return Err(AppraisalError::invalid(field, "must not be negative"));
            }
        }
        Ok(())
    }

    /// Report number shown in the document; falls back to the contract number
    pub fn report_number(&self) -> &str {
        match self.otchet_number.trim() {
            "" => self.contract_no.trim(),
            number => number,
        }
    }
}

/// The four fixed upload groups of the form
#[derive(Debug, Clone)]
pub struct FormUploads<H = RawUpload> {
    pub object_photos: Vec<H>,
    pub appendix_1: Vec<H>,
    pub appendix_2: Vec<H>,
    pub rights_documents: Vec<H>,
}

impl<H> Default for FormUploads<H> {
    fn default() -> Self {
        Self {
            object_photos: Vec::new(),
            appendix_1: Vec::new(),
            appendix_2: Vec::new(),
            rights_documents: Vec::new(),
        }
    }
}
