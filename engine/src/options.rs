//! Per-operation option structs.
//!
//! Every struct defaults to "no precondition, no expiry, no durability,
//! connection-wide timeout". Setters consume and return `self`.

use crate::durability::{Durability, DurabilityLevel};
use crate::expiry::Expiry;
use crate::{error::Result, Cas};
use std::time::Duration;

macro_rules! timeout_setter {
    ($name:ident) => {
        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Override the connection-wide operation timeout.
            #[must_use]
            pub const fn timeout(mut self, value: Duration) -> Self {
                self.timeout = Some(value);
                self
            }
        }
    };
}

macro_rules! cas_setter {
    ($name:ident) => {
        impl $name {
            /// Only apply if the document still has this CAS.
            #[must_use]
            pub const fn cas(mut self, value: Cas) -> Self {
                self.cas = value;
                self
            }
        }
    };
}

macro_rules! expiry_setter {
    ($name:ident) => {
        impl $name {
            #[must_use]
            pub fn expiry(mut self, value: impl Into<Expiry>) -> Self {
                self.expiry = value.into();
                self
            }
        }
    };
}

macro_rules! durability_setters {
    ($name:ident) => {
        impl $name {
            /// Synchronous durability level, enforced by the server.
            #[must_use]
            pub const fn durability_level(mut self, value: DurabilityLevel) -> Self {
                self.durability_level = value;
                self
            }

            /// Copies (active included) that must persist before success.
            #[must_use]
            pub const fn persist_to(mut self, value: u8) -> Self {
                self.persist_to = value;
                self
            }

            /// Replicas that must receive the mutation before success.
            #[must_use]
            pub const fn replicate_to(mut self, value: u8) -> Self {
                self.replicate_to = value;
                self
            }

            pub(crate) fn durability(&self) -> Result<Durability> {
                Durability::from_parts(self.durability_level, self.persist_to, self.replicate_to)
            }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    pub timeout: Option<Duration>,
    /// Also fetch the document expiry.
    pub with_expiry: bool,
}
timeout_setter!(GetOptions);

impl GetOptions {
    #[must_use]
    pub const fn with_expiry(mut self, value: bool) -> Self {
        self.with_expiry = value;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistsOptions {
    pub timeout: Option<Duration>,
}
timeout_setter!(ExistsOptions);

/// Options for getAndLock, getAndTouch, touch and unlock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchOptions {
    pub timeout: Option<Duration>,
}
timeout_setter!(TouchOptions);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertOptions {
    pub timeout: Option<Duration>,
    pub expiry: Expiry,
    pub durability_level: DurabilityLevel,
    pub persist_to: u8,
    pub replicate_to: u8,
}
timeout_setter!(InsertOptions);
expiry_setter!(InsertOptions);
durability_setters!(InsertOptions);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertOptions {
    pub timeout: Option<Duration>,
    pub expiry: Expiry,
    pub durability_level: DurabilityLevel,
    pub persist_to: u8,
    pub replicate_to: u8,
}
timeout_setter!(UpsertOptions);
expiry_setter!(UpsertOptions);
durability_setters!(UpsertOptions);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceOptions {
    pub timeout: Option<Duration>,
    pub cas: Cas,
    pub expiry: Expiry,
    pub durability_level: DurabilityLevel,
    pub persist_to: u8,
    pub replicate_to: u8,
}
timeout_setter!(ReplaceOptions);
cas_setter!(ReplaceOptions);
expiry_setter!(ReplaceOptions);
durability_setters!(ReplaceOptions);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    pub timeout: Option<Duration>,
    pub cas: Cas,
    pub durability_level: DurabilityLevel,
    pub persist_to: u8,
    pub replicate_to: u8,
}
timeout_setter!(RemoveOptions);
cas_setter!(RemoveOptions);
durability_setters!(RemoveOptions);

/// Options for append and prepend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendOptions {
    pub timeout: Option<Duration>,
    pub cas: Cas,
    pub durability_level: DurabilityLevel,
    pub persist_to: u8,
    pub replicate_to: u8,
}
timeout_setter!(AppendOptions);
cas_setter!(AppendOptions);
durability_setters!(AppendOptions);

/// Options for increment, decrement and counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterOptions {
    pub timeout: Option<Duration>,
    /// Amount to adjust by; zero is rejected.
    pub delta: u64,
    /// Create a missing document with this value instead of failing.
    pub initial: Option<u64>,
    pub expiry: Expiry,
    pub durability_level: DurabilityLevel,
    pub persist_to: u8,
    pub replicate_to: u8,
}

impl Default for CounterOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            delta: 1,
            initial: None,
            expiry: Expiry::None,
            durability_level: DurabilityLevel::None,
            persist_to: 0,
            replicate_to: 0,
        }
    }
}
timeout_setter!(CounterOptions);
expiry_setter!(CounterOptions);
durability_setters!(CounterOptions);

impl CounterOptions {
    #[must_use]
    pub const fn delta(mut self, value: u64) -> Self {
        self.delta = value;
        self
    }

    #[must_use]
    pub const fn initial(mut self, value: u64) -> Self {
        self.initial = Some(value);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupInOptions {
    pub timeout: Option<Duration>,
}
timeout_setter!(LookupInOptions);

/// How mutateIn treats document existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreSemantics {
    /// The document must exist.
    #[default]
    Replace,
    /// Create the document if it is missing.
    Upsert,
    /// The document must not exist.
    Insert,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutateInOptions {
    pub timeout: Option<Duration>,
    pub cas: Cas,
    pub expiry: Expiry,
    pub store_semantics: StoreSemantics,
    pub durability_level: DurabilityLevel,
    pub persist_to: u8,
    pub replicate_to: u8,
}
timeout_setter!(MutateInOptions);
cas_setter!(MutateInOptions);
expiry_setter!(MutateInOptions);
durability_setters!(MutateInOptions);

impl MutateInOptions {
    #[must_use]
    pub const fn store_semantics(mut self, value: StoreSemantics) -> Self {
        self.store_semantics = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_defaults_to_one() {
        let options = CounterOptions::default();
        assert_eq!(options.delta, 1);
        assert!(options.initial.is_none());
    }

    #[test]
    fn builder_pattern() {
        let options = ReplaceOptions::new()
            .cas(42)
            .expiry(Duration::from_secs(10))
            .timeout(Duration::from_millis(100));
        assert_eq!(options.cas, 42);
        assert_eq!(options.expiry, Expiry::Relative(Duration::from_secs(10)));
        assert_eq!(options.timeout, Some(Duration::from_millis(100)));
    }

    #[test]
    fn durability_resolution() {
        let options = UpsertOptions::new().persist_to(1).replicate_to(1);
        assert!(matches!(options.durability(), Ok(Durability::Observe(_))));

        let options = UpsertOptions::new()
            .durability_level(DurabilityLevel::Majority)
            .replicate_to(1);
        assert!(options.durability().is_err());
    }
}
