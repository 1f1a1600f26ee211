/// Mutable SDK state and the initialization lifecycle.
use crate::api::Credentials;
use crate::config::{LanguagePolicy, PaymentPolicy, SdkOptions};
use crate::logger::Logger;

/// Where an SDK instance is in its initialization lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initializing,
    Initialized,
}

/// Configuration and session state of one SDK instance.
///
/// `initialized` is a latch: only a successful `initialize()` sets it and
/// only [`SdkState::reset`] clears it. Every reset bumps `generation`, so a
/// run that started before the reset can tell its results are stale.
#[derive(Debug, Clone)]
pub struct SdkState {
    pub api_key: String,
    pub device_id: String,
    pub base_url: String,
    pub location_url: String,
    pub payment_policy: PaymentPolicy,
    pub language_policy: LanguagePolicy,
    initialized: bool,
    initializing: bool,
    generation: u64,
    logger: Logger,
}

impl SdkState {
    pub fn new(logger: Logger) -> Self {
        let mut state = Self {
            api_key: String::new(),
            device_id: String::new(),
            base_url: String::new(),
            location_url: String::new(),
            payment_policy: PaymentPolicy::default(),
            language_policy: LanguagePolicy::default(),
            initialized: false,
            initializing: false,
            generation: 0,
            logger,
        };
        state.reset();
        state
    }

    /// Restore every field to its default. The logger handle is kept.
    pub fn reset(&mut self) {
        let defaults = SdkOptions::default();
        self.api_key.clear();
        self.device_id.clear();
        self.base_url = defaults.base_url;
        self.location_url = defaults.location_url;
        self.payment_policy = defaults.payment_policy;
        self.language_policy = defaults.language_policy;
        self.initialized = false;
        self.initializing = false;
        self.generation = self.generation.wrapping_add(1);
        self.logger.set_enabled(defaults.enable_logging);
    }

    /// Merge validated options over the current state. The api key always wins.
    pub fn apply(&mut self, options: SdkOptions, api_key: &str) {
        if let Some(device_id) = options.device_id {
            self.device_id = device_id;
        }
        self.base_url = options.base_url;
        self.location_url = options.location_url;
        self.payment_policy = options.payment_policy;
        self.language_policy = options.language_policy;
        self.logger.set_enabled(options.enable_logging);
        self.api_key = api_key.to_string();
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn enable_logging(&self) -> bool {
        self.logger.is_enabled()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.initialized {
            Lifecycle::Initialized
        } else if self.initializing {
            Lifecycle::Initializing
        } else {
            Lifecycle::Uninitialized
        }
    }

    /// Incremented by every [`SdkState::reset`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Enter the `Initializing` state and return the generation the run belongs to.
    pub(crate) fn begin_initializing(&mut self) -> u64 {
        self.initializing = true;
        self.generation
    }

    /// Leave the `Initializing` state, latching `initialized` on success.
    pub(crate) fn finish_initializing(&mut self, succeeded: bool) {
        self.initializing = false;
        if succeeded {
            self.initialized = true;
        }
    }

    /// Ready for tracking calls: initialized and holding a device id.
    pub fn is_ready(&self) -> bool {
        self.initialized && !self.device_id.is_empty()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
        }
    }
}
