//! GraphQL documents and response shapes for the Blink wallet API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Invoice, InvoiceStatus, WalletError};

pub const CREATE_INVOICE_MUTATION: &str = r#"
mutation LnInvoiceCreateOnBehalfOfRecipient($input: LnInvoiceCreateOnBehalfOfRecipientInput!) {
  lnInvoiceCreateOnBehalfOfRecipient(input: $input) {
    invoice {
      paymentRequest
      paymentHash
      satoshis
    }
    errors {
      message
    }
  }
}
"#;

pub const INVOICE_STATUS_QUERY: &str = r#"
query LnInvoicePaymentStatus($input: LnInvoicePaymentStatusInput!) {
  lnInvoicePaymentStatus(input: $input) {
    status
    errors {
      message
    }
  }
}
"#;

#[derive(Debug, Serialize)]
pub struct GraphqlRequest<'a> {
    pub query: &'a str,
    pub variables: Value,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceData {
    pub ln_invoice_create_on_behalf_of_recipient: CreateInvoicePayload,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoicePayload {
    pub invoice: Option<InvoiceFields>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFields {
    pub payment_request: String,
    pub payment_hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStatusData {
    pub ln_invoice_payment_status: InvoiceStatusPayload,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceStatusPayload {
    pub status: Option<String>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

/// Joins GraphQL error messages; `None` when the list is empty.
fn join_errors(errors: &[GraphqlError]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }
    Some(
        errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Unwraps the `data` field, surfacing top-level GraphQL errors first.
fn take_data<T>(response: GraphqlResponse<T>) -> Result<T, WalletError> {
    if let Some(message) = join_errors(&response.errors) {
        return Err(WalletError::Graphql(message));
    }
    response.data.ok_or(WalletError::MissingData)
}

pub fn parse_create_invoice(
    response: GraphqlResponse<CreateInvoiceData>,
) -> Result<Invoice, WalletError> {
    let payload = take_data(response)?.ln_invoice_create_on_behalf_of_recipient;
    if let Some(message) = join_errors(&payload.errors) {
        return Err(WalletError::Graphql(message));
    }
    let invoice = payload.invoice.ok_or(WalletError::EmptyInvoice)?;
    Ok(Invoice {
        payment_request: invoice.payment_request,
        payment_hash: invoice.payment_hash,
    })
}

pub fn parse_invoice_status(
    response: GraphqlResponse<InvoiceStatusData>,
) -> Result<InvoiceStatus, WalletError> {
    let payload = take_data(response)?.ln_invoice_payment_status;
    if let Some(message) = join_errors(&payload.errors) {
        return Err(WalletError::Graphql(message));
    }
    match payload.status.as_deref() {
        Some("PAID") => Ok(InvoiceStatus::Paid),
        Some("PENDING") => Ok(InvoiceStatus::Pending),
        Some("EXPIRED") => Ok(InvoiceStatus::Expired),
        Some(other) => Err(WalletError::UnexpectedStatus(other.to_string())),
        None => Err(WalletError::MissingData),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_invoice_success() {
        let raw = r#"{"data":{"lnInvoiceCreateOnBehalfOfRecipient":{
            "invoice":{"paymentRequest":"lnbc210n1...","paymentHash":"abc123","satoshis":21},
            "errors":[]}}}"#;
        let response: GraphqlResponse<CreateInvoiceData> = serde_json::from_str(raw).unwrap();
        let invoice = parse_create_invoice(response).unwrap();
        assert_eq!(invoice.payment_request, "lnbc210n1...");
        assert_eq!(invoice.payment_hash, "abc123");
    }

    #[test]
    fn test_parse_create_invoice_payload_errors() {
        let raw = r#"{"data":{"lnInvoiceCreateOnBehalfOfRecipient":{
            "invoice":null,"errors":[{"message":"Invalid wallet"},{"message":"Try again"}]}}}"#;
        let response: GraphqlResponse<CreateInvoiceData> = serde_json::from_str(raw).unwrap();
        match parse_create_invoice(response) {
            Err(WalletError::Graphql(msg)) => assert_eq!(msg, "Invalid wallet; Try again"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_create_invoice_top_level_errors() {
        let raw = r#"{"data":null,"errors":[{"message":"Unauthorized"}]}"#;
        let response: GraphqlResponse<CreateInvoiceData> = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            parse_create_invoice(response),
            Err(WalletError::Graphql(_))
        ));
    }

    #[test]
    fn test_parse_invoice_status_variants() {
        for (text, expected) in [
            ("PAID", InvoiceStatus::Paid),
            ("PENDING", InvoiceStatus::Pending),
            ("EXPIRED", InvoiceStatus::Expired),
        ] {
            let raw = format!(
                r#"{{"data":{{"lnInvoicePaymentStatus":{{"status":"{text}","errors":[]}}}}}}"#
            );
            let response: GraphqlResponse<InvoiceStatusData> = serde_json::from_str(&raw).unwrap();
            assert_eq!(parse_invoice_status(response).unwrap(), expected);
        }
    }

    #[test]
    fn test_parse_invoice_status_unknown() {
        let raw = r#"{"data":{"lnInvoicePaymentStatus":{"status":"REFUNDED"}}}"#;
        let response: GraphqlResponse<InvoiceStatusData> = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            parse_invoice_status(response),
            Err(WalletError::UnexpectedStatus(s)) if s == "REFUNDED"
        ));
    }
}
