//! Version-keyed lazy caches for distribution-derived quantities.
//!
//! Every distribution carries a parameter version that its setters bump. A
//! cached value remembers the version it was built for and is rebuilt on the
//! first read after the version moved, so no setter has to know which caches
//! depend on which parameter.

use std::cell::RefCell;
use std::sync::Arc;

/// Monotone counter identifying one parameter set of a distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParameterVersion(u64);

impl ParameterVersion {
    pub fn bump(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// A value derived from a distribution's parameters.
///
/// Interior mutability through `RefCell`: the owning distribution is `Send`
/// but not `Sync`, so each thread works on its own instance.
#[derive(Debug)]
pub struct VersionedCache<T> {
    slot: RefCell<Option<(ParameterVersion, Arc<T>)>>,
}

impl<T> Default for VersionedCache<T> {
    fn default() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }
}

impl<T> Clone for VersionedCache<T> {
    fn clone(&self) -> Self {
        Self {
            slot: RefCell::new(self.slot.borrow().clone()),
        }
    }
}

impl<T> VersionedCache<T> {
    /// Cached value for `version`, running `build` if the cache is empty or stale.
    ///
    /// `build` must not read this same cache.
    pub fn get_or_build(&self, version: ParameterVersion, build: impl FnOnce() -> T) -> Arc<T> {
        if let Some((built_for, value)) = &*self.slot.borrow() {
            if *built_for == version {
                return Arc::clone(value);
            }
        }
        let value = Arc::new(build());
        *self.slot.borrow_mut() = Some((version, Arc::clone(&value)));
        value
    }

    /// Whether a value for `version` is already cached.
    pub fn is_fresh(&self, version: ParameterVersion) -> bool {
        matches!(&*self.slot.borrow(), Some((v, _)) if *v == version)
    }
}
