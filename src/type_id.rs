// Pass type identity tokens

use std::sync::atomic::{AtomicU64, Ordering};

/// A unique identity token for a pass class.
///
/// Statically defined passes reserve their token once at first use;
/// dynamically defined (external) passes obtain theirs from a
/// [`TypeIdAllocator`]. All tokens are drawn from one process-wide counter,
/// so ids handed out by distinct allocators never collide with each other
/// or with the built-in passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassTypeId(u64);

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn allocate_type_id() -> PassTypeId {
    PassTypeId(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Issues [`PassTypeId`] tokens for dynamically registered pass classes.
#[derive(Debug, Default)]
pub struct TypeIdAllocator {
    _private: (),
}

impl TypeIdAllocator {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Returns a token distinct from every token previously returned by any
    /// allocator and from the built-in pass identities.
    pub fn allocate(&mut self) -> PassTypeId {
        allocate_type_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn allocated_ids_are_distinct() {
        let mut a = TypeIdAllocator::new();
        let mut b = TypeIdAllocator::new();

        let mut seen = HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(a.allocate()));
            assert!(seen.insert(b.allocate()));
        }
    }
}
