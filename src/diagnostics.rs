//! Diagnostic emission.
//!
//! Every event carries the module id, a numeric code (`tag_base` plus the [`Code`]) and its
//! key/value details as `tracing` fields. Debug and trace events are skipped before any field
//! is evaluated when the configuration or the subscriber disables them.

/// Module id attached to every event.
pub const MODULE_ID: &str = "voxscript";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Code {
    RuntimeCreated = 1,
    RuntimeDestroyed = 2,
    ContextCreated = 3,
    ContextDestroyed = 4,
    ScopePushed = 10,
    ScopePopped = 11,
    ScopesCleared = 12,
    Evaluated = 20,
    SyntaxError = 21,
    ScriptException = 22,
    BudgetExceeded = 23,
    OutOfMemory = 24,
    ReadOnlyWrite = 30,
    ConversionFailed = 31,
    GarbageCollected = 40,
    ForgottenRoots = 41,
    LockTimeout = 50,
    Fatal = 60,
}

/// Diagnostic settings, passed explicitly to every runtime and context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticConfig {
    pub tag_base: u32,
    pub enabled: bool,
}

impl DiagnosticConfig {
    pub fn new() -> Self {
        DiagnosticConfig {
            tag_base: 0,
            enabled: true,
        }
    }

    /// Debug and trace events off; errors and warnings still go out.
    pub fn quiet() -> Self {
        DiagnosticConfig {
            enabled: false,
            ..Self::new()
        }
    }

    pub fn tag_base(mut self, base: u32) -> Self {
        self.tag_base = base;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn code(&self, code: Code) -> u32 {
        self.tag_base + code as u32
    }
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! diag_error {
    ($cfg:expr, $code:expr, $($rest:tt)+) => {
        tracing::error!(
            module = $crate::diagnostics::MODULE_ID,
            code = $cfg.code($code),
            $($rest)+
        )
    };
}

macro_rules! diag_warn {
    ($cfg:expr, $code:expr, $($rest:tt)+) => {
        tracing::warn!(
            module = $crate::diagnostics::MODULE_ID,
            code = $cfg.code($code),
            $($rest)+
        )
    };
}

macro_rules! diag_debug {
    ($cfg:expr, $code:expr, $($rest:tt)+) => {
        if $cfg.enabled && tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(
                module = $crate::diagnostics::MODULE_ID,
                code = $cfg.code($code),
                $($rest)+
            )
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_offset_by_tag_base() {
        let cfg = DiagnosticConfig::new().tag_base(5000);
        assert_eq!(cfg.code(Code::ScopePushed), 5010);
        assert_eq!(DiagnosticConfig::default().code(Code::Fatal), 60);
    }

    #[test]
    fn test_disabled_debug_skips_field_evaluation() {
        let cfg = DiagnosticConfig::quiet();
        let evaluated = std::cell::Cell::new(false);
        let detail = || {
            evaluated.set(true);
            1
        };
        diag_debug!(cfg, Code::Evaluated, detail = detail(), "never emitted");
        assert!(!evaluated.get());
    }
}
