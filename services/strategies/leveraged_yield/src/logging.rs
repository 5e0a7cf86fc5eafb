//! Standardized emoji logging for the leveraged yield strategy
//!
//! Keeps emoji usage consistent across controller, callback and binary output.

/// Standard emoji set for strategy logging
pub struct LogEmoji;

impl LogEmoji {
    // Status indicators
    pub const SUCCESS: &'static str = "✅"; // Operation succeeded
    pub const ERROR: &'static str = "❌"; // Operation failed
    pub const WARNING: &'static str = "⚠️"; // Rollback or rejection

    // Module-specific
    pub const CHART: &'static str = "📊"; // Position metrics
    pub const EXECUTE: &'static str = "⚡"; // Flash loan execution
    pub const MONEY: &'static str = "💰"; // Profit/rewards
    pub const CLOCK: &'static str = "⏱️"; // Blocks mined

    // Position events
    pub const SUPPLY: &'static str = "➕"; // Leveraged supply opened
    pub const UNWIND: &'static str = "➖"; // Position unwound
    pub const SWAP: &'static str = "🔄"; // Off-asset or reward swap
}

// Convenience macros for standardized logging
#[macro_export]
macro_rules! log_success {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::SUCCESS, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        tracing::error!("{} {}", $crate::logging::LogEmoji::ERROR, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_rollback {
    ($($arg:tt)*) => {
        tracing::warn!("{} {}", $crate::logging::LogEmoji::WARNING, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_metrics {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::CHART, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_execution {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::EXECUTE, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_profit {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::MONEY, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_swap {
    ($($arg:tt)*) => {
        tracing::debug!("{} {}", $crate::logging::LogEmoji::SWAP, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_supply {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::SUPPLY, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_unwind {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::UNWIND, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_blocks {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::CLOCK, format!($($arg)*))
    };
}
