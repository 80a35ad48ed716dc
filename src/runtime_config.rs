//! Environment variable-based configuration for the coroutine runtime.
//!
//! ## Environment Variables
//!
//! ### `SLUICE_STACK_SIZE`
//!
//! Sets the stack size for the server's coroutines. Accepts values in:
//! - Decimal: `16384` (16 KB)
//! - Hexadecimal: `0x4000` (16 KB)
//!
//! Default: `0x4000` (16 KB)
//!
//! Handlers run synchronously inside the connection coroutine, so the stack
//! must accommodate the deepest filter/middleware/handler chain the
//! application registers. Total memory is `stack_size × concurrent
//! connections`; tune accordingly.
//!
//! ## Usage
//!
//! ```rust
//! use sluice::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! may::config().set_stack_size(config.stack_size);
//! ```

use std::env;

/// Runtime configuration loaded from environment variables.
///
/// Load this at startup using [`RuntimeConfig::from_env()`] to configure
/// the coroutine runtime behavior before starting the server.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes (default: 16 KB / 0x4000)
    pub stack_size: usize,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let stack_size = match env::var("SLUICE_STACK_SIZE") {
            Ok(val) => {
                if let Some(hex) = val.strip_prefix("0x") {
                    usize::from_str_radix(hex, 16).unwrap_or(0x4000)
                } else {
                    val.parse().unwrap_or(0x4000)
                }
            }
            Err(_) => 0x4000,
        };
        RuntimeConfig { stack_size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_16k_without_env() {
        std::env::remove_var("SLUICE_STACK_SIZE");
        let config = RuntimeConfig::from_env();
        assert_eq!(config.stack_size, 0x4000);
    }
}
