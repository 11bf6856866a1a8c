pub const CUSTOMER_FRUSTRATION: &str = "customer_frustration";
pub const AGENT_DELAY: &str = "agent_delay";
pub const AGENT_DENIAL: &str = "agent_denial";

/// Upper bound on evidence samples kept per cause.
pub const MAX_EVIDENCE_ITEMS: usize = 5;

pub const DEFAULT_WARNING_THRESHOLD: u32 = 2;
pub const MIN_WARNING_THRESHOLD: u32 = 1;
pub const MAX_WARNING_THRESHOLD: u32 = 10;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
/// Weight applied to a signal that has no explicit multi-signal weight.
pub const DEFAULT_SIGNAL_WEIGHT: f64 = 0.1;

pub const DEFAULT_RISK_WINDOW_SIZE: usize = 3;
/// A window saturates at this many signals per turn on average.
pub const SIGNALS_PER_TURN_SATURATION: usize = 2;
pub const DEFAULT_HIGH_RISK_THRESHOLD: f64 = 0.7;

pub const DEFAULT_TOP_WARNINGS: usize = 10;

pub const CONFIG_PATH_ENV: &str = "CAUSAL_CHAT_CONFIG";
