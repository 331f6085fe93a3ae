use std::env;

// Top-level configuration container for the engine.
#[derive(Debug, Clone)]
pub struct Config {
    pub scheduling: SchedulingConfig,
    pub pricing: PricingConfig,
    pub voucher: VoucherConfig,
    pub database: DatabaseConfig,
}

// Operating window and slot grid for session scheduling.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    /// Hour (local) at which the venue opens.
    pub open_hour: u32,
    /// Hour (local) at which the venue closes; sessions must end by then.
    pub close_hour: u32,
    /// Step between proposed start times, in minutes.
    pub slot_granularity_minutes: u32,
}

// Currency handling.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// Minor-unit digits of the venue currency (2 for EUR/USD).
    pub currency_scale: u32,
}

// Voucher ledger tuning.
#[derive(Debug, Clone)]
pub struct VoucherConfig {
    /// Bounded retries of the conditional use-counter increment under
    /// storage contention before surfacing a conflict.
    pub redeem_retries: u32,
}

// Database settings. The url is optional: the in-memory store needs none.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            scheduling: SchedulingConfig {
                open_hour: env::var("VENUE_OPEN_HOUR")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("VENUE_OPEN_HOUR must be a valid hour"),
                close_hour: env::var("VENUE_CLOSE_HOUR")
                    .unwrap_or_else(|_| "23".to_string())
                    .parse()
                    .expect("VENUE_CLOSE_HOUR must be a valid hour"),
                slot_granularity_minutes: env::var("SLOT_GRANULARITY_MINUTES")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse()
                    .expect("SLOT_GRANULARITY_MINUTES must be a valid number"),
            },
            pricing: PricingConfig {
                currency_scale: env::var("CURRENCY_SCALE")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .expect("CURRENCY_SCALE must be a valid number"),
            },
            voucher: VoucherConfig {
                redeem_retries: env::var("VOUCHER_REDEEM_RETRIES")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .expect("VOUCHER_REDEEM_RETRIES must be a valid number"),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok(),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scheduling: SchedulingConfig {
                open_hour: 10,
                close_hour: 23,
                slot_granularity_minutes: 15,
            },
            pricing: PricingConfig { currency_scale: 2 },
            voucher: VoucherConfig { redeem_retries: 3 },
            database: DatabaseConfig {
                url: None,
                pool_size: 20,
            },
        }
    }
}
