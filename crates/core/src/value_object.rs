//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by value. `Money` is the main
/// example here: two prices of 2990 minor units are the same price no matter
/// which product generation they were captured from.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
