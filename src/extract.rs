//! Flattens an Azure prebuilt-receipt analysis into [`ReceiptRecord`]s.
//!
//! Every copy is driven by a [`FieldMapping`] table: a source field that is
//! missing or `null` leaves its output key unset, so extraction never fails.

use crate::types::{AnalyzeResult, DocumentField, FieldMap, LineItem, ReceiptRecord};

/// Azure field name -> setter for the output value (and its confidence, if kept).
pub struct FieldMapping<T> {
    pub source: &'static str,
    pub value: fn(&mut T, String),
    pub confidence: Option<fn(&mut T, f64)>,
}

/// Top-level prebuilt-receipt fields.
pub const RECEIPT_FIELDS: &[FieldMapping<ReceiptRecord>] = &[
    FieldMapping {
        source: "MerchantName",
        value: |r: &mut ReceiptRecord, v: String| r.merchant_name = Some(v),
        confidence: Some(|r: &mut ReceiptRecord, c: f64| r.merchant_confidence = Some(c)),
    },
    FieldMapping {
        source: "MerchantAddress",
        value: |r: &mut ReceiptRecord, v: String| r.merchant_address = Some(v),
        confidence: None,
    },
    FieldMapping {
        source: "MerchantPhoneNumber",
        value: |r: &mut ReceiptRecord, v: String| r.merchant_phone = Some(v),
        confidence: None,
    },
    FieldMapping {
        source: "TransactionDate",
        value: |r: &mut ReceiptRecord, v: String| r.transaction_date = Some(v),
        confidence: None,
    },
    FieldMapping {
        source: "TransactionTime",
        value: |r: &mut ReceiptRecord, v: String| r.transaction_time = Some(v),
        confidence: None,
    },
    FieldMapping {
        source: "Total",
        value: |r: &mut ReceiptRecord, v: String| r.total = Some(v),
        confidence: Some(|r: &mut ReceiptRecord, c: f64| r.total_confidence = Some(c)),
    },
    FieldMapping {
        source: "Subtotal",
        value: |r: &mut ReceiptRecord, v: String| r.subtotal = Some(v),
        confidence: None,
    },
    FieldMapping {
        source: "TotalTax",
        value: |r: &mut ReceiptRecord, v: String| r.tax = Some(v),
        confidence: None,
    },
];

/// Sub-fields of each `Items` element.
pub const LINE_ITEM_FIELDS: &[FieldMapping<LineItem>] = &[
    FieldMapping {
        source: "Description",
        value: |i: &mut LineItem, v: String| i.description = Some(v),
        confidence: None,
    },
    FieldMapping {
        source: "Quantity",
        value: |i: &mut LineItem, v: String| i.quantity = Some(v),
        confidence: None,
    },
    FieldMapping {
        source: "Price",
        value: |i: &mut LineItem, v: String| i.price = Some(v),
        confidence: None,
    },
    FieldMapping {
        source: "TotalPrice",
        value: |i: &mut LineItem, v: String| i.total_price = Some(v),
        confidence: None,
    },
];

/// Look up a field that is both present and non-null.
fn present<'a>(fields: Option<&'a FieldMap>, key: &str) -> Option<&'a DocumentField> {
    fields?.get(key)?.as_ref()
}

/// Copy every mapped field found in `fields` into a fresh `T`.
fn copy_fields<T: Default>(fields: Option<&FieldMap>, table: &[FieldMapping<T>]) -> T {
    let mut out = T::default();
    for mapping in table {
        let Some(field) = present(fields, mapping.source) else {
            continue;
        };
        if let Some(text) = field.text() {
            (mapping.value)(&mut out, text);
        }
        if let (Some(set_confidence), Some(confidence)) = (mapping.confidence, field.confidence) {
            set_confidence(&mut out, confidence);
        }
    }
    out
}

/// Line items in source order. A null element, or one without sub-fields,
/// still yields an empty [`LineItem`] so the count matches the source.
fn extract_line_items(items: &DocumentField) -> Option<Vec<LineItem>> {
    let elements = items.value_array.as_ref()?;
    Some(
        elements
            .iter()
            .map(|element| {
                let sub_fields = element.as_ref().and_then(|e| e.value_object.as_ref());
                copy_fields(sub_fields, LINE_ITEM_FIELDS)
            })
            .collect(),
    )
}

/// Build the record for one analyzed document.
pub fn extract_receipt(fields: Option<&FieldMap>) -> ReceiptRecord {
    let mut receipt = copy_fields(fields, RECEIPT_FIELDS);
    if let Some(items) = present(fields, "Items") {
        receipt.items = extract_line_items(items);
    }
    receipt
}

/// Extract one [`ReceiptRecord`] per document, in document order.
pub fn extract_receipt_fields(result: &AnalyzeResult) -> Vec<ReceiptRecord> {
    let Some(documents) = result.documents.as_deref() else {
        return Vec::new();
    };
    documents
        .iter()
        .map(|document| extract_receipt(document.fields.as_ref()))
        .collect()
}
