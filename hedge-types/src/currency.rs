use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO-like three letter currency code, always stored upper-case.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// Account address on the settlement network (a Stellar `G...` key on testnet).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(addr: &str) -> Self {
        Self(addr.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log lines and headers.
    pub fn short(&self) -> &str {
        let end = self.0.char_indices().nth(8).map(|(i, _)| i).unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(addr: &str) -> Self {
        Self::new(addr)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CurrencyInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub supported: bool,
}

/// Latin American currencies the dashboard knows about.
pub const CURRENCIES: &[CurrencyInfo] = &[
    CurrencyInfo { code: "MXN", name: "Mexican Peso", supported: true },
    CurrencyInfo { code: "COP", name: "Colombian Peso", supported: true },
    CurrencyInfo { code: "BRL", name: "Brazilian Real", supported: true },
    CurrencyInfo { code: "ARS", name: "Argentine Peso", supported: true },
    CurrencyInfo { code: "CLP", name: "Chilean Peso", supported: true },
    CurrencyInfo { code: "PEN", name: "Peruvian Sol", supported: true },
];

impl CurrencyInfo {
    pub fn lookup(code: &CurrencyCode) -> Option<&'static CurrencyInfo> {
        CURRENCIES.iter().find(|c| c.code == code.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_normalized() {
        assert_eq!(CurrencyCode::new(" ars ").as_str(), "ARS");
        assert!(CurrencyCode::new("   ").is_empty());
    }

    #[test]
    fn catalogue_lookup() {
        let info = CurrencyInfo::lookup(&CurrencyCode::new("pen")).unwrap();
        assert_eq!(info.name, "Peruvian Sol");
        assert!(CurrencyInfo::lookup(&CurrencyCode::new("EUR")).is_none());
    }

    #[test]
    fn short_address() {
        let addr = Address::new("GDNDD6KLDSDL3A5BGG2CIQ56E5GBVXMJCFAKBZ7J3INF4N4ETVDFUKJT");
        assert_eq!(addr.short(), "GDNDD6KL");
        assert_eq!(Address::new("GAB").short(), "GAB");
    }
}
