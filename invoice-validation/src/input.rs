//! Inputs the engine accepts as records

use crate::{Error, InvoiceRecord, Result};
use serde_json::Value;
use std::borrow::Cow;

/// Record id reported for inputs that carry none
pub const UNKNOWN_RECORD_ID: &str = "unknown";

/// Something that can be validated as an invoice record
///
/// Typed [`InvoiceRecord`]s always convert. Raw JSON from a worker boundary
/// may not, in which case the engine reports a record-shape finding instead
/// of aborting the batch.
pub trait RecordInput {
    /// Identifier used in findings, even when the record is malformed
    fn record_id(&self) -> String;

    /// Read the input as an invoice record
    fn to_invoice(&self) -> Result<Cow<'_, InvoiceRecord>>;
}

impl RecordInput for InvoiceRecord {
    fn record_id(&self) -> String {
        self.id.clone()
    }

    fn to_invoice(&self) -> Result<Cow<'_, InvoiceRecord>> {
        Ok(Cow::Borrowed(self))
    }
}

impl RecordInput for Value {
    fn record_id(&self) -> String {
        match self.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => UNKNOWN_RECORD_ID.to_string(),
        }
    }

    fn to_invoice(&self) -> Result<Cow<'_, InvoiceRecord>> {
        if !self.is_object() {
            return Err(Error::MalformedRecord(format!(
                "expected an object, got {}",
                json_kind(self)
            )));
        }

        serde_json::from_value(self.clone())
            .map(Cow::Owned)
            .map_err(|e| Error::MalformedRecord(e.to_string()))
    }
}

impl<T: RecordInput + ?Sized> RecordInput for &T {
    fn record_id(&self) -> String {
        (**self).record_id()
    }

    fn to_invoice(&self) -> Result<Cow<'_, InvoiceRecord>> {
        (**self).to_invoice()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_is_malformed() {
        let input = json!({});
        assert_eq!(input.record_id(), UNKNOWN_RECORD_ID);
        assert!(matches!(input.to_invoice(), Err(Error::MalformedRecord(_))));
    }

    #[test]
    fn test_missing_amount_keeps_record_id() {
        let input = json!({ "id": "INV-7", "taxAmount": 1, "totalAmount": 11 });
        assert_eq!(input.record_id(), "INV-7");
        assert!(input.to_invoice().is_err());
    }

    #[test]
    fn test_non_object_is_malformed() {
        let err = json!([1, 2]).to_invoice().unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_valid_json_record() {
        let input = json!({ "id": 3, "amount": 10, "taxAmount": 1, "totalAmount": 11 });
        let record = input.to_invoice().unwrap();
        assert_eq!(record.id, "3");
        assert_eq!(input.record_id(), "3");
    }
}
