use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::DomainError;

const DEFAULT_UNIT: &str = "pieces";
const DEFAULT_CATEGORY: &str = "other";

/// Lowercases, trims and collapses inner whitespace so `" Whole  Milk"` and
/// `"whole milk"` compare equal everywhere in the pipeline.
pub fn normalize_name(value: &str) -> String {
    value.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Loosely typed record as supplied by the history collaborator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPurchaseRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub is_organic: Option<bool>,
    #[serde(default)]
    pub expiration_days: Option<u32>,
}

/// A validated, normalized purchase. Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    name: String,
    category: String,
    quantity: u32,
    unit: String,
    purchased_at: DateTime<Utc>,
    /// Calendar day in the offset the purchase was recorded with.
    purchase_day: NaiveDate,
    unit_price: Decimal,
    is_organic: bool,
    shelf_life_days: Option<u32>,
}

impl PurchaseRecord {
    /// Build a record with default quantity, unit and price.
    pub fn new(
        name: &str,
        category: &str,
        purchased_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(DomainError::MissingItemName);
        }

        let category = normalize_name(category);
        Ok(Self {
            name,
            category: if category.is_empty() { DEFAULT_CATEGORY.to_owned() } else { category },
            quantity: 1,
            unit: DEFAULT_UNIT.to_owned(),
            purchased_at,
            purchase_day: purchased_at.date_naive(),
            unit_price: Decimal::ZERO,
            is_organic: false,
            shelf_life_days: None,
        })
    }

    /// Build a record from a timestamp carrying the shopper's local offset.
    pub fn at_local_time(
        name: &str,
        category: &str,
        purchased_at: DateTime<FixedOffset>,
    ) -> Result<Self, DomainError> {
        let mut record = Self::new(name, category, purchased_at.with_timezone(&Utc))?;
        record.purchase_day = purchased_at.date_naive();
        Ok(record)
    }

    pub fn with_quantity(mut self, quantity: u32, unit: &str) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::ZeroQuantity { item: self.name });
        }
        self.quantity = quantity;
        let unit = unit.trim();
        self.unit = if unit.is_empty() { DEFAULT_UNIT.to_owned() } else { unit.to_owned() };
        Ok(self)
    }

    pub fn with_unit_price(mut self, unit_price: Decimal) -> Result<Self, DomainError> {
        if unit_price < Decimal::ZERO {
            return Err(DomainError::NegativePrice {
                item: self.name,
                price: unit_price.to_string(),
            });
        }
        self.unit_price = unit_price;
        Ok(self)
    }

    pub fn organic(mut self, is_organic: bool) -> Self {
        self.is_organic = is_organic;
        self
    }

    pub fn with_shelf_life_days(mut self, days: u32) -> Self {
        self.shelf_life_days = Some(days);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn purchased_at(&self) -> DateTime<Utc> {
        self.purchased_at
    }

    pub fn purchase_day(&self) -> NaiveDate {
        self.purchase_day
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub fn is_organic(&self) -> bool {
        self.is_organic
    }

    pub fn shelf_life_days(&self) -> Option<u32> {
        self.shelf_life_days
    }
}

impl TryFrom<RawPurchaseRecord> for PurchaseRecord {
    type Error = DomainError;

    fn try_from(raw: RawPurchaseRecord) -> Result<Self, Self::Error> {
        let name = raw.name.as_deref().map(normalize_name).unwrap_or_default();
        if name.is_empty() {
            return Err(DomainError::MissingItemName);
        }

        let date_value = match raw.purchase_date.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => value.to_owned(),
            _ => return Err(DomainError::MissingPurchaseDate { item: name }),
        };
        let purchased_at = parse_local_purchase_date(&date_value)
            .ok_or_else(|| DomainError::MalformedPurchaseDate { item: name.clone(), value: date_value })?;

        let mut record =
            PurchaseRecord::at_local_time(&name, raw.category.as_deref().unwrap_or(""), purchased_at)?
            .with_quantity(raw.quantity.unwrap_or(1), raw.unit.as_deref().unwrap_or(""))?
            .with_unit_price(raw.price.unwrap_or(Decimal::ZERO))?
            .organic(raw.is_organic.unwrap_or(false));
        if let Some(days) = raw.expiration_days {
            record = record.with_shelf_life_days(days);
        }

        Ok(record)
    }
}

/// Accepts RFC 3339, naive ISO-8601 datetimes (treated as UTC) and plain dates.
pub fn parse_purchase_date(value: &str) -> Option<DateTime<Utc>> {
    parse_local_purchase_date(value).map(|parsed| parsed.with_timezone(&Utc))
}

/// Like [`parse_purchase_date`] but keeps the offset the value was written in.
pub fn parse_local_purchase_date(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed);
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc().fixed_offset());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc().fixed_offset())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub reason: String,
    pub message: String,
}

#[derive(Clone, Debug)]
pub struct IngestReport {
    pub history: PurchaseHistory,
    pub skipped: Vec<SkippedRecord>,
}

/// Ordered, read-only snapshot of a user's purchases.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseHistory {
    records: Vec<PurchaseRecord>,
}

impl PurchaseHistory {
    pub fn new(records: Vec<PurchaseRecord>) -> Self {
        Self { records }
    }

    /// Validate raw rows, keeping the good ones in their original order.
    pub fn ingest(raw_records: impl IntoIterator<Item = RawPurchaseRecord>) -> IngestReport {
        let mut records = Vec::new();
        let mut skipped = Vec::new();

        for (index, raw) in raw_records.into_iter().enumerate() {
            match PurchaseRecord::try_from(raw) {
                Ok(record) => records.push(record),
                Err(error) => {
                    warn!(
                        event_name = "core.ingest.record_skipped",
                        record_index = index,
                        reason = error.reason_code(),
                        "skipping purchase record: {error}"
                    );
                    skipped.push(SkippedRecord {
                        index,
                        reason: error.reason_code().to_owned(),
                        message: error.to_string(),
                    });
                }
            }
        }

        IngestReport { history: Self { records }, skipped }
    }

    pub fn records(&self) -> &[PurchaseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn distinct_items(&self) -> BTreeSet<&str> {
        self.records.iter().map(PurchaseRecord::name).collect()
    }

    /// First and last purchase instants, if any.
    pub fn date_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.records.iter().map(PurchaseRecord::purchased_at).min()?;
        let last = self.records.iter().map(PurchaseRecord::purchased_at).max()?;
        Some((first, last))
    }
}

impl FromIterator<PurchaseRecord> for PurchaseHistory {
    fn from_iter<T: IntoIterator<Item = PurchaseRecord>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
