//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - rejected input such as an empty version tag
pub const VALIDATION_ERROR: i32 = 2;

/// Environment error - the container backend could not be reached
pub const ENVIRONMENT_ERROR: i32 = 3;

/// Tool error - a containerized tool (yq, helm) exited with a failure
pub const TOOL_ERROR: i32 = 4;

/// Reference error - packaging output or archive did not have the expected shape
pub const REFERENCE_ERROR: i32 = 5;

/// IO error - file not found, permission denied, bad configuration file
pub const IO_ERROR: i32 = 6;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;

/// Interrupted by Ctrl-C (128 + SIGINT)
pub const CANCELLED: i32 = 130;
