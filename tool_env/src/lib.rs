#![forbid(unsafe_code)]

//! Environment variable names shared by gosh-freeze, its tests and the test
//! helpers. Each variable overrides the location of one external tool.

/// Overrides the `gosh` interpreter used to capture the load trace.
///
/// # Examples
///
/// ```
/// use tool_env::GOSH_ENV;
/// assert_eq!(GOSH_ENV, "GOSH_FREEZE_GOSH");
/// ```
pub const GOSH_ENV: &str = "GOSH_FREEZE_GOSH";

/// Overrides the host C compiler.
pub const CC_ENV: &str = "GOSH_FREEZE_CC";

/// Overrides the `gauche-config` helper that reports the runtime's build flags.
pub const GAUCHE_CONFIG_ENV: &str = "GOSH_FREEZE_GAUCHE_CONFIG";

/// Overrides the link-dependency enumeration tool (`ldd`).
pub const LDD_ENV: &str = "GOSH_FREEZE_LDD";

/// Overrides the static-image tool (`statifier`).
pub const STATIFIER_ENV: &str = "GOSH_FREEZE_STATIFIER";
