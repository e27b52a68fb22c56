pub mod config;
pub mod conversion;
pub mod currency;
pub mod market;
pub mod metrics;
pub mod network;

pub use config::{ProtectionLimits, UserConfiguration};
pub use conversion::{ConversionEvent, ProtectionRecord, TriggerReason};
pub use currency::{Address, CurrencyCode, CurrencyInfo, CURRENCIES};
pub use market::{MarketSnapshot, RateSample, Window};
pub use metrics::ProtectionMetrics;
pub use network::{ContractAddresses, Network};

pub const SECONDS_PER_DAY: u64 = 86_400;
pub const SECONDS_PER_WEEK: u64 = 604_800;
