// Licensed under the Apache License, Version 2.0 (see LICENSE).

///
/// Macro to allow fatal logging to a file which bypasses the standard logging systems.
/// Useful for code paths that run after the logger has been torn down, or before it has
/// been installed (e.g. argument-parsing failures).
///
#[macro_export]
macro_rules! fatal_log {
    ($($arg:tt)+) => {
      {
        eprintln!($($arg)+);
      }
    };
}

/// Installs `env_logger` as the global logger, honoring `RUST_LOG` if set and
/// otherwise defaulting to `level`.
///
/// Idempotent: a second call after the logger is already installed is a silent
/// no-op, which matters for tests that each want logging enabled.
pub fn init(level: log::LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .is_test(cfg!(test))
        .try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        super::init(log::LevelFilter::Info);
        super::init(log::LevelFilter::Debug);
    }
}
