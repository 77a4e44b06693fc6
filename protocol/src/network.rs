//! Network flag formatting for the ledger tool.
//!
//! Operators write the network however they like in the settings file
//! (`"mainnet"`, `"preview testnet 2"`, `"--testnet-magic 1"`). The ledger
//! tool only understands `--mainnet` or `--testnet-magic <n>`, so every
//! configured value is canonicalised here. Formatting is total: unknown
//! input falls back to mainnet rather than failing.

use std::fmt;

/// Flag selecting mainnet.
pub const MAINNET_FLAG: &str = "--mainnet";

/// Flag prefix selecting a testnet by magic number.
pub const TESTNET_MAGIC_FLAG: &str = "--testnet-magic";

/// Magic used when a testnet is requested without a number (preview).
pub const DEFAULT_TESTNET_MAGIC: i32 = 2;

/// Canonicalise a free-form network setting into a ledger-tool flag.
///
/// Rules, first match wins:
///
/// 1. Values already starting with `--mainnet` or `--testnet-magic` pass
///    through unchanged.
/// 2. `mainnet` (any case) yields `--mainnet`.
/// 3. Anything containing `testnet` (any case) yields
///    `--testnet-magic <n>`, where `n` is the first token (split on space,
///    hyphen, underscore) that parses as an integer, or
///    [`DEFAULT_TESTNET_MAGIC`].
/// 4. Everything else yields `--mainnet`.
pub fn format_network_parameter(raw: &str) -> String {
    if raw.starts_with(MAINNET_FLAG) || raw.starts_with(TESTNET_MAGIC_FLAG) {
        return raw.to_string();
    }

    if raw.eq_ignore_ascii_case("mainnet") {
        return MAINNET_FLAG.to_string();
    }

    if raw.to_ascii_lowercase().contains("testnet") {
        let magic = raw
            .split(|c| matches!(c, ' ' | '-' | '_'))
            .find_map(|part| part.parse::<i32>().ok())
            .unwrap_or(DEFAULT_TESTNET_MAGIC);
        return format!("{TESTNET_MAGIC_FLAG} {magic}");
    }

    MAINNET_FLAG.to_string()
}

/// A canonical network flag, ready to be spliced into an argument list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkFlag(String);

impl NetworkFlag {
    /// Canonicalise `raw` with [`format_network_parameter`].
    pub fn from_setting(raw: &str) -> Self {
        NetworkFlag(format_network_parameter(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The flag as discrete argv tokens: `["--testnet-magic", "2"]`.
    pub fn args(&self) -> Vec<String> {
        self.0.split_whitespace().map(str::to_string).collect()
    }
}

impl fmt::Display for NetworkFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
