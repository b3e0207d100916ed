//! Boolean gate predicates evaluated before an entry is materialized
//!
//! Filters see the raw call as an inspection view; they never mutate it.
//! All registered filters must pass for a call to proceed.

use crate::core::entry::{LogArg, Message};
use crate::core::ident::FilterId;
use crate::core::logger::Logger;
use std::fmt;
use std::sync::Arc;

/// Read-only view of a pending log call handed to filters.
pub struct FilterContext<'a> {
    pub logger: &'a Logger,
    /// Resolved numeric severity of the call.
    pub level: i32,
    pub message: &'a Message,
    pub args: &'a [LogArg],
}

type FilterFn = dyn Fn(&FilterContext<'_>) -> bool + Send + Sync;

/// A registered gate predicate with a stable identity.
#[derive(Clone)]
pub struct Filter {
    id: FilterId,
    name: String,
    f: Arc<FilterFn>,
}

impl Filter {
    pub fn new(f: impl Fn(&FilterContext<'_>) -> bool + Send + Sync + 'static) -> Self {
        Self::named("<filter>", f)
    }

    pub fn named(
        name: impl Into<String>,
        f: impl Fn(&FilterContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: FilterId::next(),
            name: name.into(),
            f: Arc::new(f),
        }
    }

    pub fn id(&self) -> FilterId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, ctx: &FilterContext<'_>) -> bool {
        (self.f)(ctx)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
