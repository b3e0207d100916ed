//! Opaque registration identities
//!
//! Filters, transformers and transports are registered with the logger by
//! value; removal and per-entry exclusion work on a stable id assigned at
//! construction time rather than on pointer identity.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

macro_rules! ident {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            pub(crate) fn next() -> Self {
                $name(next_id())
            }

            pub fn as_u64(self) -> u64 {
                self.0
            }
        }
    };
}

ident! {
    /// Identity of a registered filter.
    FilterId
}

ident! {
    /// Identity of a registered transformer, used in per-entry exclusion sets.
    TransformerId
}

ident! {
    /// Identity of a registered transport, used in per-entry exclusion sets.
    TransportId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = TransportId::next();
        let b = TransportId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }
}
