use std::sync::PoisonError;
use std::sync::RwLock;

use once_cell::sync::Lazy;


static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::default()));


/// What to do when a trail is annotated from a thread other than its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strictness {
    /// Record the annotation silently.
    Ignore,

    /// Record the annotation and emit a warning event.
    Warn,

    /// Treat the call as a fatal precondition violation and panic.
    Panic,
}


/// Process-wide behaviour of the trail engine.
///
/// # Examples
///
/// ```
/// extern crate optrail;
///
/// use optrail::Config;
/// use optrail::Strictness;
///
///
/// fn main() {
///     optrail::configure(Config::default()
///         .strictness(Strictness::Warn)
///         .isolate_reporters(true));
///     assert_eq!(optrail::config().strictness_level(), Strictness::Warn);
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    isolate_reporters: bool,
    strictness: Strictness,
}

impl Config {
    /// Catch panics raised by reporters.
    ///
    /// When enabled a panicking reporter is logged and skipped: the other
    /// reporters still receive the snapshot and the trail is still finalized.
    pub fn isolate_reporters(mut self, isolate: bool) -> Self {
        self.isolate_reporters = isolate;
        self
    }

    /// Sets the policy for annotations made from the wrong thread.
    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }
}

impl Config {
    /// Access the reporter isolation flag.
    pub fn reporters_isolated(&self) -> bool {
        self.isolate_reporters
    }

    /// Access the cross-thread annotation policy.
    pub fn strictness_level(&self) -> Strictness {
        self.strictness
    }
}

impl Default for Config {
    /// Returns the default configuration.
    ///
    /// By default:
    ///
    ///   * Annotating a trail from the wrong thread panics.
    ///   * Reporters are isolated from each other.
    fn default() -> Config {
        Config {
            isolate_reporters: true,
            strictness: Strictness::Panic,
        }
    }
}


/// Replaces the process-wide configuration.
///
/// Changes apply to calls made after `configure` returns.
pub fn configure(config: Config) {
    let mut current = CONFIG.write().unwrap_or_else(PoisonError::into_inner);
    *current = config;
}

/// Returns a copy of the process-wide configuration.
pub fn config() -> Config {
    CONFIG.read().unwrap_or_else(PoisonError::into_inner).clone()
}


#[cfg(test)]
mod tests {
    use super::super::testing;
    use super::Config;
    use super::Strictness;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.reporters_isolated());
        assert_eq!(config.strictness_level(), Strictness::Panic);
    }

    #[test]
    fn builder() {
        let config = Config::default()
            .isolate_reporters(false)
            .strictness(Strictness::Ignore);
        assert!(!config.reporters_isolated());
        assert_eq!(config.strictness_level(), Strictness::Ignore);
    }

    #[test]
    fn configure_process() {
        let _guard = testing::serial();
        super::configure(Config::default().strictness(Strictness::Warn));
        assert_eq!(super::config().strictness_level(), Strictness::Warn);
    }
}
