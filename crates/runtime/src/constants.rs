use std::time::Duration;

// Push message data keys
pub const MESSAGE_DATA_TYPE: &str = "notification_type";
pub const MESSAGE_DATA_PAYLOAD: &str = "notification_payload";

// Push message types
pub const MESSAGE_TYPE_ADDRESS_TXS_CONFIRMED: &str = "address_txs_confirmed";
pub const MESSAGE_TYPE_LNURL_PAY_INFO: &str = "lnurlpay_info";
pub const MESSAGE_TYPE_LNURL_PAY_INVOICE: &str = "lnurlpay_invoice";
pub const MESSAGE_TYPE_PAYMENT_RECEIVED: &str = "payment_received";

// Resource identifiers, looked up in the host's localized resource table
pub const LNURL_PAY_INFO_NOTIFICATION_TITLE: &str = "lnurl_pay_info_notification_title";
pub const LNURL_PAY_INVOICE_NOTIFICATION_TITLE: &str = "lnurl_pay_invoice_notification_title";
pub const LNURL_PAY_METADATA_PLAIN_TEXT: &str = "lnurl_pay_metadata_plain_text";
pub const LNURL_PAY_NOTIFICATION_FAILURE_TITLE: &str = "lnurl_pay_notification_failure_title";
pub const PAYMENT_RECEIVED_NOTIFICATION_TITLE: &str = "payment_received_notification_title";
pub const PAYMENT_RECEIVED_NOTIFICATION_FAILURE_TITLE: &str =
    "payment_received_notification_failure_title";
pub const SWAP_TX_CONFIRMED_NOTIFICATION_TITLE: &str = "swap_tx_confirmed_notification_title";
pub const SWAP_TX_CONFIRMED_NOTIFICATION_FAILURE_TITLE: &str =
    "swap_tx_confirmed_notification_failure_title";

// Defaults used when the host has no entry for a resource identifier
pub const DEFAULT_LNURL_PAY_INFO_NOTIFICATION_TITLE: &str = "Retrieving Payment Information";
pub const DEFAULT_LNURL_PAY_INVOICE_NOTIFICATION_TITLE: &str = "Fetching invoice";
pub const DEFAULT_LNURL_PAY_METADATA_PLAIN_TEXT: &str = "Pay with LNURL";
pub const DEFAULT_LNURL_PAY_NOTIFICATION_FAILURE_TITLE: &str = "Receive Payment Failed";
// `%d` is replaced by the amount in sats
pub const DEFAULT_PAYMENT_RECEIVED_NOTIFICATION_TITLE: &str = "Received %d sats";
pub const DEFAULT_PAYMENT_RECEIVED_NOTIFICATION_FAILURE_TITLE: &str = "Receive Payment Failed";
pub const DEFAULT_SWAP_TX_CONFIRMED_NOTIFICATION_TITLE: &str = "Swap Confirmed";
pub const DEFAULT_SWAP_TX_CONFIRMED_NOTIFICATION_FAILURE_TITLE: &str = "Redeem Swap Failed";

/// 3 minutes
pub const DEFAULT_SERVICE_TIMEOUT: Duration = Duration::from_secs(3 * 60);
pub const DEFAULT_SHUTDOWN_DELAY: Duration = Duration::from_secs(60);
pub const DEFAULT_AUTO_CHANNEL_SETUP_FEE_LIMIT_MSAT: u64 = 0;

// Smallest amount we accept for an LNURL invoice when no channel has to be
// opened
pub const MIN_RECEIVABLE_MSAT: u64 = 1_000;
pub const MSATS_PER_SAT: u64 = 1_000;

// Timeout for the reply POSTed back to the LNURL server
pub const LNURL_REPLY_TIMEOUT: Duration = Duration::from_secs(15);

// Connecting to the node usually takes a couple of seconds, anything above
// this gets logged
pub const SLOW_CONNECT_WARN: Duration = Duration::from_secs(10);
