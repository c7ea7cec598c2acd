//! Display helpers. Nothing here mutates stored amounts; every value is
//! rendered from exact integers.

use primitive_types::{U256, U512};

use crate::abi;
use crate::types::{Address, CampaignRecord};

pub const ETHER_DECIMALS: u32 = 18;

/// `0x1234...abcd`.
pub fn truncate_address(address: &Address) -> String {
    let full = abi::format_address(address);
    truncate_hex(&full)
}

pub fn truncate_hex(text: &str) -> String {
    if text.len() > 12 {
        format!("{}...{}", &text[..6], &text[text.len() - 4..])
    } else {
        text.to_string()
    }
}

/// Renders `amount` (in base units) with four fractional digits, rounding
/// half up, e.g. `1.2346 ETH`.
pub fn format_balance(amount: U256, decimals: u32, symbol: &str) -> String {
    const SHOWN: u32 = 4;
    let unit = U512::from(10u8).pow(U512::from(decimals));
    let shown = U512::from(10u8).pow(U512::from(SHOWN));
    let scaled = (U512::from(amount) * shown + unit / 2) / unit;
    let whole = scaled / shown;
    let frac = (scaled % shown).low_u64();
    format!("{whole}.{frac:04} {symbol}")
}

/// Parses a non-negative decimal integer amount typed by the user.
pub fn parse_amount(text: &str) -> Option<U256> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_dec_str(trimmed).ok()
}

/// `"{total} / {target} donated ({progress}%)"`.
pub fn progress_line(record: &CampaignRecord) -> String {
    format!(
        "{} / {} donated ({}%)",
        record.total_donated, record.target_amount, record.progress
    )
}
