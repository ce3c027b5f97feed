use std::env;

lazy_static! {
    static ref FLAGS: Flags = init_flags();
}

/// Process-wide knobs. There is no CLI in this crate, so everything comes
/// from the environment at first use.
#[derive(Clone)]
pub struct Flags {
    /// Override for the per-task scratch size, in bytes
    /// (RETRACE_FORCED_SCRATCH_SIZE).
    pub forced_scratch_size: Option<usize>,
    /// Suppress warnings related to environmental features outside our
    /// control (RETRACE_SUPPRESS_ENVIRONMENT_WARNINGS).
    pub suppress_environment_warnings: bool,
    /// Any warning or error that would be printed is treated as fatal
    /// (RETRACE_FATAL_ERRORS).
    pub fatal_errors_and_warnings: bool,
}

impl Flags {
    pub fn get() -> &'static Flags {
        &*FLAGS
    }
}

fn init_flags() -> Flags {
    Flags {
        forced_scratch_size: env::var("RETRACE_FORCED_SCRATCH_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok()),
        suppress_environment_warnings: env::var_os("RETRACE_SUPPRESS_ENVIRONMENT_WARNINGS")
            .is_some(),
        fatal_errors_and_warnings: env::var_os("RETRACE_FATAL_ERRORS").is_some(),
    }
}
