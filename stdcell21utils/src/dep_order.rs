//!
//! # Dependency-Ordering Trait and Helpers
//!

// Std-lib
use std::collections::HashSet;
use std::marker::PhantomData;

///
/// # Dependency-Ordering Trait
///
/// Process hierarchies form a DAG: each process instantiates sub-processes,
/// and must be synthesized only after all of them. The [DepOrder] trait
/// produces that bottom-up ordering without each caller re-writing the
/// depth-first walk.
///
/// Implementers define a single method `process`, which visits one `Item`
/// (commonly a pointer to a hierarchy node) and calls `orderer.push` for each
/// of its direct dependencies. The provided [DepOrderer] recursively
/// traverses dependencies, calling `process` on each, and detects cycles via
/// its pending-set, reporting them through the implementer's `fail` method.
///
/// Typical usage:
///
/// ```text
/// struct ProcOrder;
/// impl DepOrder for ProcOrder {
///     type Item = Ptr<Process>;
///     type Error = LayoutError;
///
///     fn process(item: &Self::Item, orderer: &mut DepOrderer<Self>) -> Result<(), Self::Error> {
///         for child in item.read()?.instances.iter() {
///             orderer.push(child)?;
///         }
///         Ok(())
///     }
///     fn fail() -> Result<(), Self::Error> {
///         Err(LayoutError::msg("Circular process hierarchy"))
///     }
/// }
/// ```
///
/// The default-implemented [DepOrder::order] then returns a vector in which
/// every item appears after all of its dependencies.
///
pub trait DepOrder: Sized {
    /// Item Type. Typically pointers or keys to the nodes in the dependency graph.
    type Item: Clone + Eq + std::hash::Hash;
    /// Error Type
    type Error;

    /// Dependency-order all entries in slice `items`
    fn order(items: &[Self::Item]) -> Result<Vec<Self::Item>, Self::Error> {
        DepOrderer::<Self>::order(items)
    }

    /// Process a single `item`, typically depth-first
    fn process(item: &Self::Item, orderer: &mut DepOrderer<Self>) -> Result<(), Self::Error>;
    /// Failure-handler. Return our `Error` type.
    fn fail() -> Result<(), Self::Error>;
}

/// # Dependency Order Helper
/// Should not be used directly.
/// Public solely for use in the call-signature of [DepOrder::process].
pub struct DepOrderer<P: DepOrder> {
    /// Ordered, completed items
    stack: Vec<P::Item>,
    /// Hash-set of completed items, for quick membership tests
    seen: HashSet<P::Item>,
    /// Hash-set of pending items, for cycle detection
    pending: HashSet<P::Item>,
    // Item-processor phantom reference
    p: PhantomData<P>,
}
impl<P: DepOrder> DepOrderer<P> {
    /// Dependency-order all entries in slice `items`
    pub fn order(items: &[P::Item]) -> Result<Vec<P::Item>, P::Error> {
        let len = items.len();
        let mut this = Self {
            stack: Vec::with_capacity(len),
            seen: HashSet::with_capacity(len),
            pending: HashSet::new(),
            p: PhantomData,
        };
        for item in items.iter() {
            this.push(item)?;
        }
        Ok(this.stack)
    }
    /// Push `item`'s dependencies, and then itself, onto the stack
    pub fn push(&mut self, item: &P::Item) -> Result<(), P::Error> {
        if !self.seen.contains(item) {
            // An item in the pending-set is an open recursive stack-frame, i.e. a cycle.
            if self.pending.contains(item) {
                return P::fail();
            }
            self.pending.insert(item.clone());
            // Process the Item, dependencies first
            P::process(item, self)?;
            if !self.pending.remove(item) {
                return P::fail();
            }
            self.seen.insert(item.clone());
            self.stack.push(item.clone());
        }
        Ok(())
    }
}
