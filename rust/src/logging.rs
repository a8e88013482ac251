//! Verbosity-gated diagnostics for the induction engine.
//!
//! Nothing is formatted when the level is below the threshold, so the macros
//! cost a single integer comparison in the silent case. Levels:
//! - 0: SILENT (nothing)
//! - 1: DECISIONS (per-trainset outcomes, committed plans, parameter writes)
//! - 2: CHECKS (certificate and job card evaluation, tolerated lookups)
//! - 3: DEBUG (raw counters and intermediate values)

pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_DECISIONS: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at DECISIONS level (verbosity >= 1).
#[macro_export]
macro_rules! log_decisions {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DECISIONS {
            eprintln!("[induction] {}", format_args!($($arg)*));
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            eprintln!("[induction]   {}", format_args!($($arg)*));
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            eprintln!("[induction]     {}", format_args!($($arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(VERBOSITY_SILENT < VERBOSITY_DECISIONS);
        assert!(VERBOSITY_DECISIONS < VERBOSITY_CHECKS);
        assert!(VERBOSITY_CHECKS < VERBOSITY_DEBUG);
    }

    #[test]
    fn test_silent_macros_do_not_evaluate_format() {
        let verbosity = VERBOSITY_SILENT;
        let mut touched = false;
        let mut touch = || {
            touched = true;
            "x"
        };
        log_decisions!(verbosity, "{}", touch());
        log_checks!(verbosity, "{}", 2);
        log_debug!(verbosity, "{}", 3);
        assert!(!touched);
    }
}
