/// Exit codes for CI/automation.
pub const SUCCESS: i32 = 0;
/// The description, configuration, or request is invalid.
pub const VALIDATION_FAILED: i32 = 2;
/// The remote API failed or rejected the operation.
pub const RUN_FAILED: i32 = 3;
pub const RUNTIME_ERROR: i32 = 4;
