// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Shared validation utilities for configuration and command-line input.

/// Largest ring the dump renderer and cursor arithmetic are exercised with.
pub const MAX_CAPACITY: usize = 1024;

/// Result type for validation functions
pub type ValidationResult = Result<(), String>;

/// Validate a worker count against the ring capacity.
///
/// # Returns
/// * `Ok(())` if `1 <= count <= capacity`
/// * `Err(reason)` otherwise
pub fn validate_worker_count(count: i64, capacity: usize, context: &str) -> ValidationResult {
    if count < 1 || usize::try_from(count).map_or(true, |count| count > capacity) {
        return Err(format!(
            "{} must be between 1 and {}, got {}",
            context, capacity, count
        ));
    }
    Ok(())
}

/// Validate a ring capacity.
pub fn validate_capacity(capacity: usize) -> ValidationResult {
    if capacity == 0 {
        return Err("capacity cannot be 0".to_string());
    }
    if capacity > MAX_CAPACITY {
        return Err(format!(
            "capacity {} exceeds maximum of {}",
            capacity, MAX_CAPACITY
        ));
    }
    Ok(())
}
