//! Transaction payload encoder.
//!
//! Builds byte-exact call payloads for the supported operations. Every
//! function here is deterministic and side-effect-free: the same request
//! against the same registry yields the same bytes.
//!
//! Wire encoding: `data` = `0x` + 8-char function selector + one left-padded
//! 64-char hex word per parameter.

use std::sync::Arc;

use chainflow_core::{ChainflowError, Result, TxPayload};
use tracing::debug;

use crate::registry::{ContractRegistry, SwapMethod, STAKING_CONTRACT, SWAP_CONTRACT};

// Function selectors (keccak-256 of the canonical signature, first 4 bytes).
const SELECTOR_BUY_TOKEN: &str = "a4821719"; // buyToken()
const SELECTOR_SELL_TOKEN: &str = "2397e4d7"; // sellToken(uint256)
const SELECTOR_STAKE: &str = "a694fc3a"; // stake(uint256)
const SELECTOR_UNSTAKE: &str = "2e17de78"; // unstake(uint256)
const SELECTOR_CLAIM_REWARDS: &str = "ef5cfb8c"; // claimRewards()
const SELECTOR_APPROVE: &str = "095ea7b3"; // approve(address,uint256)

// Fixed gas parameters per operation.
const GAS_LIMIT_SWAP: &str = "0x186A0"; // 100000
const GAS_LIMIT_STAKE: &str = "0x30D40"; // 200000
const GAS_LIMIT_APPROVE: &str = "0x1FBBF"; // 130000
const GAS_PRICE: &str = "0x3B9ACA00"; // 1 gwei

/// A token exchange request.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    pub from_token: String,
    pub to_token: String,
    /// Human decimal amount of `from_token`.
    pub amount: String,
}

/// A stake, unstake or approve request.
#[derive(Debug, Clone, PartialEq)]
pub struct StakeRequest {
    pub token: String,
    /// Human decimal amount of `token`.
    pub amount: String,
}

/// A reward claim request.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimRequest {
    pub token: String,
}

/// The payload encoder.
#[derive(Debug, Clone)]
pub struct TxEncoder {
    registry: Arc<ContractRegistry>,
}

impl TxEncoder {
    /// Create an encoder over a loaded registry.
    pub fn new(registry: Arc<ContractRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this encoder reads from.
    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    /// Build the swap call for `req`.
    ///
    /// `buyToken` pairs carry the amount as native value with bare-selector
    /// data; `sellToken` pairs carry it as the sole call parameter.
    pub fn build_swap(&self, req: &SwapRequest) -> Result<TxPayload> {
        let pair = self.registry.swap_pair(&req.from_token, &req.to_token)?;
        let contract = self.registry.contract(SWAP_CONTRACT)?;
        let decimals = self.registry.token(&req.from_token)?.decimals;
        let units = base_units(&req.amount, decimals)?;

        let payload = match pair.method {
            SwapMethod::BuyToken => TxPayload {
                to: contract.address.clone(),
                value: format!("0x{units:x}"),
                data: format!("0x{SELECTOR_BUY_TOKEN}"),
                gas_limit: GAS_LIMIT_SWAP.to_string(),
                gas_price: GAS_PRICE.to_string(),
            },
            SwapMethod::SellToken => TxPayload {
                to: contract.address.clone(),
                value: "0x0".to_string(),
                data: format!("0x{SELECTOR_SELL_TOKEN}{}", word_u128(units)),
                gas_limit: GAS_LIMIT_SWAP.to_string(),
                gas_price: GAS_PRICE.to_string(),
            },
        };

        debug!(from = %req.from_token, to = %req.to_token, amount = %req.amount, "swap payload built");
        Ok(payload)
    }

    /// Build the `stake(uint256)` call for `req`.
    pub fn build_stake(&self, req: &StakeRequest) -> Result<TxPayload> {
        self.staking_call(SELECTOR_STAKE, req)
    }

    /// Build the `unstake(uint256)` call for `req`.
    pub fn build_unstake(&self, req: &StakeRequest) -> Result<TxPayload> {
        self.staking_call(SELECTOR_UNSTAKE, req)
    }

    /// Build the parameterless `claimRewards()` call.
    pub fn build_claim(&self, _req: &ClaimRequest) -> Result<TxPayload> {
        let contract = self.registry.contract(STAKING_CONTRACT)?;
        Ok(TxPayload {
            to: contract.address.clone(),
            value: "0x0".to_string(),
            data: format!("0x{SELECTOR_CLAIM_REWARDS}"),
            gas_limit: GAS_LIMIT_STAKE.to_string(),
            gas_price: GAS_PRICE.to_string(),
        })
    }

    /// Build the `approve(address,uint256)` call granting the staking
    /// contract an allowance over `req.amount` of `req.token`.
    ///
    /// The target is the token contract; the spender parameter is the
    /// staking contract.
    pub fn build_approve(&self, req: &StakeRequest) -> Result<TxPayload> {
        let token = self.registry.token(&req.token)?;
        let token_address = token
            .contract_address
            .as_deref()
            .ok_or_else(|| ChainflowError::UnknownContract(format!("{} token", req.token)))?;
        let spender = &self.registry.contract(STAKING_CONTRACT)?.address;
        let units = base_units(&req.amount, token.decimals)?;

        let data = format!(
            "0x{SELECTOR_APPROVE}{}{}",
            word_address(spender)?,
            word_u128(units)
        );

        debug!(token = %req.token, amount = %req.amount, spender = %spender, "approve payload built");
        Ok(TxPayload {
            to: token_address.to_string(),
            value: "0x0".to_string(),
            data,
            gas_limit: GAS_LIMIT_APPROVE.to_string(),
            gas_price: GAS_PRICE.to_string(),
        })
    }

    /// Expected output quantity of a swap, from the registry pair rate.
    ///
    /// Recorded against the swap task so that a dependent task's
    /// "use the previous output" amount resolves from real data.
    pub fn expected_swap_output(&self, req: &SwapRequest) -> Result<String> {
        let pair = self.registry.swap_pair(&req.from_token, &req.to_token)?;
        let amount: f64 = req
            .amount
            .parse()
            .map_err(|_| ChainflowError::InvalidAmount(req.amount.clone()))?;
        let output = amount * pair.rate;
        if output.fract() == 0.0 {
            Ok(format!("{}", output as u128))
        } else {
            Ok(format!("{output}"))
        }
    }

    fn staking_call(&self, selector: &str, req: &StakeRequest) -> Result<TxPayload> {
        let contract = self.registry.contract(STAKING_CONTRACT)?;
        let decimals = self.registry.token(&req.token)?.decimals;
        let units = base_units(&req.amount, decimals)?;
        Ok(TxPayload {
            to: contract.address.clone(),
            value: "0x0".to_string(),
            data: format!("0x{selector}{}", word_u128(units)),
            gas_limit: GAS_LIMIT_STAKE.to_string(),
            gas_price: GAS_PRICE.to_string(),
        })
    }
}

/// Convert a human decimal amount into the token's integer base units
/// (amount x 10^decimals). Excess fractional digits are truncated, never
/// rounded up.
pub fn base_units(amount: &str, decimals: u32) -> Result<u128> {
    let amount = amount.trim();
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(ChainflowError::InvalidAmount(amount.to_string()));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ChainflowError::InvalidAmount(amount.to_string()));
    }

    let scale = 10u128
        .checked_pow(decimals)
        .ok_or_else(|| ChainflowError::InvalidAmount(amount.to_string()))?;

    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .map_err(|_| ChainflowError::InvalidAmount(amount.to_string()))?
    };

    // Truncate the fraction to `decimals` digits, then scale what remains.
    let frac_digits: String = frac_part.chars().take(decimals as usize).collect();
    let frac_value: u128 = if frac_digits.is_empty() {
        0
    } else {
        let parsed: u128 = frac_digits
            .parse()
            .map_err(|_| ChainflowError::InvalidAmount(amount.to_string()))?;
        parsed * 10u128.pow(decimals - frac_digits.len() as u32)
    };

    int_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(|| ChainflowError::InvalidAmount(amount.to_string()))
}

/// Left-pad an integer to a 64-char hex word.
fn word_u128(value: u128) -> String {
    format!("{value:064x}")
}

/// Left-pad an address to a 64-char hex word.
fn word_address(address: &str) -> Result<String> {
    let stripped = address
        .strip_prefix("0x")
        .unwrap_or(address)
        .to_ascii_lowercase();
    if stripped.len() != 40 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ChainflowError::Internal(format!(
            "malformed contract address in registry: {address}"
        )));
    }
    Ok(format!("{stripped:0>64}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> TxEncoder {
        TxEncoder::new(Arc::new(ContractRegistry::builtin()))
    }

    fn swap_req(amount: &str) -> SwapRequest {
        SwapRequest {
            from_token: "MEER".into(),
            to_token: "MTK".into(),
            amount: amount.into(),
        }
    }

    #[test]
    fn test_base_units() {
        assert_eq!(base_units("10", 18).unwrap(), 10_000_000_000_000_000_000);
        assert_eq!(base_units("0.5", 18).unwrap(), 500_000_000_000_000_000);
        assert_eq!(base_units("1.25", 2).unwrap(), 125);
        // excess fractional digits truncate, never round up
        assert_eq!(base_units("1.999", 2).unwrap(), 199);
        assert_eq!(base_units("0", 18).unwrap(), 0);
    }

    #[test]
    fn test_base_units_rejects_garbage() {
        assert!(base_units("", 18).is_err());
        assert!(base_units("ten", 18).is_err());
        assert!(base_units("-5", 18).is_err());
        assert!(base_units("1.2.3", 18).is_err());
    }

    #[test]
    fn test_buy_token_swap_carries_value() {
        let payload = encoder().build_swap(&swap_req("10")).unwrap();
        // 10 * 10^18 = 0x8ac7230489e80000
        assert_eq!(payload.value, "0x8ac7230489e80000");
        assert_eq!(payload.data, "0xa4821719");
        assert_eq!(payload.gas_limit, "0x186A0");
    }

    #[test]
    fn test_sell_token_swap_encodes_amount_word() {
        let payload = encoder()
            .build_swap(&SwapRequest {
                from_token: "MTK".into(),
                to_token: "MEER".into(),
                amount: "10".into(),
            })
            .unwrap();
        assert_eq!(payload.value, "0x0");
        assert_eq!(
            payload.data,
            format!("0x2397e4d7{:064x}", 10_000_000_000_000_000_000u128)
        );
    }

    #[test]
    fn test_stake_payload() {
        let payload = encoder()
            .build_stake(&StakeRequest {
                token: "MTK".into(),
                amount: "1000".into(),
            })
            .unwrap();
        assert!(payload.data.starts_with("0xa694fc3a"));
        // selector + one 64-char word
        assert_eq!(payload.data.len(), 2 + 8 + 64);
        assert_eq!(payload.gas_limit, "0x30D40");
    }

    #[test]
    fn test_approve_targets_token_with_staking_spender() {
        let enc = encoder();
        let payload = enc
            .build_approve(&StakeRequest {
                token: "MTK".into(),
                amount: "1000".into(),
            })
            .unwrap();
        let registry = enc.registry();
        assert_eq!(
            payload.to,
            registry.token("MTK").unwrap().contract_address.clone().unwrap()
        );
        let staking = registry.contract(STAKING_CONTRACT).unwrap();
        let spender_word = format!("{:0>64}", staking.address.trim_start_matches("0x"));
        assert_eq!(payload.data, format!("0x095ea7b3{spender_word}{:064x}", 1000u128 * 10u128.pow(18)));
    }

    #[test]
    fn test_claim_payload_has_no_parameters() {
        let payload = encoder().build_claim(&ClaimRequest { token: "MTK".into() }).unwrap();
        assert_eq!(payload.data, "0xef5cfb8c");
        assert_eq!(payload.value, "0x0");
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let enc = encoder();
        let a = enc.build_swap(&swap_req("3.14")).unwrap();
        let b = enc.build_swap(&swap_req("3.14")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unsupported_pair_fails_fast() {
        let err = encoder()
            .build_swap(&SwapRequest {
                from_token: "MEER".into(),
                to_token: "USDT".into(),
                amount: "10".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ChainflowError::UnsupportedPair { .. }));
    }

    #[test]
    fn test_bad_amount_fails_fast() {
        let err = encoder().build_swap(&swap_req("lots")).unwrap_err();
        assert!(matches!(err, ChainflowError::InvalidAmount(_)));
    }

    #[test]
    fn test_expected_swap_output_uses_pair_rate() {
        let enc = encoder();
        assert_eq!(enc.expected_swap_output(&swap_req("10")).unwrap(), "10000");
        assert_eq!(
            enc.expected_swap_output(&SwapRequest {
                from_token: "MTK".into(),
                to_token: "MEER".into(),
                amount: "500".into(),
            })
            .unwrap(),
            "0.5"
        );
    }
}
