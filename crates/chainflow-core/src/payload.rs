//! Transaction payload types.
//!
//! A [`TxPayload`] is the byte-exact call the encoder produces; a
//! [`SignaturePayload`] wraps it with the human-readable annotations the
//! external signer displays. Both are immutable once emitted.

use serde::{Deserialize, Serialize};

/// The operation a payload performs, as shown to the signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxAction {
    Swap,
    Stake,
    Unstake,
    Claim,
    Approve,
}

impl std::fmt::Display for TxAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TxAction::Swap => "swap",
            TxAction::Stake => "stake",
            TxAction::Unstake => "unstake",
            TxAction::Claim => "claim",
            TxAction::Approve => "approve",
        };
        f.write_str(s)
    }
}

/// A fully-encoded transaction call.
///
/// All fields are `0x`-prefixed hex strings. `data` is the function selector
/// (8 hex chars) followed by one 64-char word per parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPayload {
    /// Target contract address.
    #[serde(rename = "to_address")]
    pub to: String,

    /// Native value sent with the call.
    pub value: String,

    /// ABI-encoded call data.
    pub data: String,

    /// Gas limit for the call.
    pub gas_limit: String,

    /// Gas price offered.
    pub gas_price: String,
}

/// The ready-to-sign transaction descriptor handed to the external signer.
///
/// Consumed verbatim by the wallet; the annotation fields exist only for
/// display and never feed back into encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignaturePayload {
    /// What the transaction does.
    pub action: TxAction,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,

    /// Approximate fee shown to the user.
    pub gas_fee: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Step marker for multi-payload operations ("step 1/2: approve").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_info: Option<String>,

    /// The encoded transaction itself.
    #[serde(flatten)]
    pub tx: TxPayload,
}

impl SignaturePayload {
    /// Start a payload for `action` around an encoded transaction, with the
    /// annotation fields unset.
    pub fn new(action: TxAction, tx: TxPayload) -> Self {
        Self {
            action,
            from_token: None,
            to_token: None,
            token: None,
            amount: None,
            pool: None,
            gas_fee: "0.001 MEER".to_string(),
            slippage: None,
            title: None,
            description: None,
            step_info: None,
            tx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> TxPayload {
        TxPayload {
            to: "0x1111111111111111111111111111111111111111".into(),
            value: "0x0".into(),
            data: "0xef5cfb8c".into(),
            gas_limit: "0x30D40".into(),
            gas_price: "0x3B9ACA00".into(),
        }
    }

    #[test]
    fn test_payload_flattens_tx_fields() {
        let payload = SignaturePayload::new(TxAction::Claim, sample_tx());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["action"], "claim");
        assert_eq!(json["to_address"], sample_tx().to);
        assert_eq!(json["data"], "0xef5cfb8c");
        // unset annotations are omitted, not null
        assert!(json.get("from_token").is_none());
    }
}
