use chrono::{NaiveDate, NaiveTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Named fields of a document or of one `Items` element. `None` marks a key
/// that Azure sent as `null` (or with a shape we could not read).
pub type FieldMap = HashMap<String, Option<DocumentField>>;

/// `analyzeResult` of a succeeded Azure Document Intelligence operation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub model_id: String,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub content: String,
    #[serde(default)]
    pub documents: Option<Vec<AnalyzedDocument>>,
}

/// One recognized receipt inside an analysis result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedDocument {
    #[serde(default)]
    pub doc_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub fields: Option<FieldMap>,
    #[serde(default, deserialize_with = "lenient")]
    pub confidence: Option<f64>,
}

/// Single field from Azure prebuilt-receipt: raw content, typed value* properties and confidence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentField {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_string: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_number: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_integer: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_currency: Option<CurrencyValue>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_address: Option<AddressValue>,
    #[serde(default, deserialize_with = "lenient_array")]
    pub value_array: Option<Vec<Option<DocumentField>>>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub value_object: Option<FieldMap>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyValue {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressValue {
    #[serde(default)]
    pub street_address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl DocumentField {
    /// Textual value of the field: the raw recognized content, falling back to
    /// the typed value rendered as a string.
    pub fn text(&self) -> Option<String> {
        self.content.clone().or_else(|| self.typed_text())
    }

    fn typed_text(&self) -> Option<String> {
        let primary = match self.kind.as_deref() {
            Some("string") => self.value_string.clone(),
            Some("phoneNumber") => self.value_phone_number.clone(),
            Some("date") => self.value_date.map(|d| d.to_string()),
            Some("time") => self.value_time.map(|t| t.to_string()),
            Some("number") => self.value_number.map(|n| n.to_string()),
            Some("integer") => self.value_integer.map(|n| n.to_string()),
            Some("currency") => self.currency_text(),
            Some("address") => self.address_text(),
            _ => None,
        };

        // Type missing or disagreeing with the populated value* property.
        primary
            .or_else(|| self.value_string.clone())
            .or_else(|| self.value_phone_number.clone())
            .or_else(|| self.value_date.map(|d| d.to_string()))
            .or_else(|| self.value_time.map(|t| t.to_string()))
            .or_else(|| self.currency_text())
            .or_else(|| self.value_number.map(|n| n.to_string()))
            .or_else(|| self.value_integer.map(|n| n.to_string()))
            .or_else(|| self.address_text())
    }

    fn currency_text(&self) -> Option<String> {
        self.value_currency
            .as_ref()
            .and_then(|c| c.amount)
            .map(|a| a.to_string())
    }

    fn address_text(&self) -> Option<String> {
        self.value_address
            .as_ref()
            .and_then(|a| a.street_address.clone())
    }
}

/// Decode `T`, treating a value of unexpected shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| serde_json::from_value(v).ok()))
}

/// Like [`lenient`], with `null` or an unexpected shape read as `T::default()`.
fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    lenient(deserializer).map(Option::unwrap_or_default)
}

/// Decode a list of fields. A non-list is absent; an unreadable element
/// becomes `None` so the element count is kept.
fn lenient_array<'de, D>(deserializer: D) -> Result<Option<Vec<Option<DocumentField>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Array(values)) => Some(
            values
                .into_iter()
                .map(|v| serde_json::from_value::<Option<DocumentField>>(v).ok().flatten())
                .collect(),
        ),
        _ => None,
    })
}

/// Decode a field map. A non-object is absent; an unreadable entry is kept as `None`.
fn lenient_map<'de, D>(deserializer: D) -> Result<Option<FieldMap>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Object(entries)) => Some(
            entries
                .into_iter()
                .map(|(k, v)| {
                    let field = serde_json::from_value::<Option<DocumentField>>(v).ok().flatten();
                    (k, field)
                })
                .collect(),
        ),
        _ => None,
    })
}

/// Simplified receipt returned to clients. Keys are only present for fields Azure recognized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReceiptRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<LineItem>>,
}

/// One purchased row of a receipt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<String>,
}

/// Debug view of the raw analysis result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub model_id: String,
    pub content: String,
    pub document_count: usize,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeReceiptResponse {
    pub success: bool,
    pub data: Vec<ReceiptRecord>,
    pub raw_result: ResultSummary,
}
