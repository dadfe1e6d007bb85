use std::collections::BTreeMap;
use std::str::FromStr;

use runtime::constants::{MESSAGE_DATA_PAYLOAD, MESSAGE_DATA_TYPE};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use ts_rs::TS;

/// Kind of work a push message asks for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    TS,
)]
#[ts(export)]
pub enum NotificationType {
    #[serde(rename = "address_txs_confirmed")]
    #[strum(serialize = "address_txs_confirmed")]
    AddressTxsConfirmed,
    #[serde(rename = "lnurlpay_info")]
    #[strum(serialize = "lnurlpay_info")]
    LnurlPayInfo,
    #[serde(rename = "lnurlpay_invoice")]
    #[strum(serialize = "lnurlpay_invoice")]
    LnurlPayInvoice,
    #[serde(rename = "payment_received")]
    #[strum(serialize = "payment_received")]
    PaymentReceived,
}

/// A decoded push message. The payload stays opaque until a job parses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub notification_type: NotificationType,
    pub payload: String,
}

impl NotificationMessage {
    /// Decodes the push data the host received, serialized as a JSON object.
    ///
    /// Returns `None` when the message type is missing or unknown, or when
    /// there is no payload. A payload sent as a nested JSON value instead of
    /// a string is accepted and kept in its serialized form.
    pub fn decode(raw: &str) -> Option<Self> {
        let data: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw).ok()?;
        let notification_type = data.get(MESSAGE_DATA_TYPE)?.as_str()?;
        let payload = match data.get(MESSAGE_DATA_PAYLOAD)? {
            serde_json::Value::String(payload) => payload.clone(),
            serde_json::Value::Null => return None,
            other => other.to_string(),
        };
        Self::new(notification_type, payload)
    }

    /// Decodes push data delivered as a flat string map (FCM data messages,
    /// APNs user info).
    pub fn from_data(data: &BTreeMap<String, String>) -> Option<Self> {
        Self::new(
            data.get(MESSAGE_DATA_TYPE)?,
            data.get(MESSAGE_DATA_PAYLOAD)?.clone(),
        )
    }

    fn new(notification_type: &str, payload: String) -> Option<Self> {
        let notification_type = NotificationType::from_str(notification_type).ok()?;
        if payload.trim().is_empty() {
            return None;
        }
        Some(Self {
            notification_type,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use runtime::constants::{
        MESSAGE_TYPE_ADDRESS_TXS_CONFIRMED, MESSAGE_TYPE_LNURL_PAY_INFO,
        MESSAGE_TYPE_LNURL_PAY_INVOICE, MESSAGE_TYPE_PAYMENT_RECEIVED,
    };

    use super::*;

    #[test]
    fn test_wire_names() {
        for (ty, name) in [
            (
                NotificationType::AddressTxsConfirmed,
                MESSAGE_TYPE_ADDRESS_TXS_CONFIRMED,
            ),
            (NotificationType::LnurlPayInfo, MESSAGE_TYPE_LNURL_PAY_INFO),
            (
                NotificationType::LnurlPayInvoice,
                MESSAGE_TYPE_LNURL_PAY_INVOICE,
            ),
            (
                NotificationType::PaymentReceived,
                MESSAGE_TYPE_PAYMENT_RECEIVED,
            ),
        ] {
            assert_eq!(ty.to_string(), name);
            assert_eq!(NotificationType::from_str(name).unwrap(), ty);
            assert_eq!(
                serde_json::to_value(ty).unwrap(),
                serde_json::Value::String(name.into())
            );
        }
    }

    #[test]
    fn test_decode_invoice_message() {
        let message = NotificationMessage::decode(
            r#"{
                "notification_type": "lnurlpay_invoice",
                "notification_payload": "{\"reply_url\":\"https://x/y\",\"amount\":5000}"
            }"#,
        )
        .unwrap();
        assert_eq!(
            message.notification_type,
            NotificationType::LnurlPayInvoice
        );
        assert_eq!(message.payload, r#"{"reply_url":"https://x/y","amount":5000}"#);
    }

    #[test]
    fn test_decode_nested_payload() {
        let message = NotificationMessage::decode(
            r#"{"notification_type": "payment_received", "notification_payload": {"payment_hash": "ab"}}"#,
        )
        .unwrap();
        assert_eq!(message.payload, r#"{"payment_hash":"ab"}"#);
    }

    #[test]
    fn test_decode_rejects() {
        for raw in [
            "",
            "not json",
            "[]",
            r#"{"notification_payload": "{}"}"#,
            r#"{"notification_type": "unknown", "notification_payload": "{}"}"#,
            r#"{"notification_type": 3, "notification_payload": "{}"}"#,
            r#"{"notification_type": "payment_received"}"#,
            r#"{"notification_type": "payment_received", "notification_payload": null}"#,
            r#"{"notification_type": "payment_received", "notification_payload": "  "}"#,
        ] {
            assert_eq!(NotificationMessage::decode(raw), None, "{raw}");
        }
    }

    #[test]
    fn test_from_data() {
        let data = BTreeMap::from([
            (MESSAGE_DATA_TYPE.to_owned(), "address_txs_confirmed".to_owned()),
            (
                MESSAGE_DATA_PAYLOAD.to_owned(),
                r#"{"address":"bc1q"}"#.to_owned(),
            ),
        ]);
        let message = NotificationMessage::from_data(&data).unwrap();
        assert_eq!(
            message.notification_type,
            NotificationType::AddressTxsConfirmed
        );

        let data = BTreeMap::from([(MESSAGE_DATA_TYPE.to_owned(), "lnurlpay_info".to_owned())]);
        assert_eq!(NotificationMessage::from_data(&data), None);
    }
}
