use std::fmt;

use serde::{Deserialize, Serialize};

/// Trait bound for element types storable in a [`Tensor`](crate::Tensor).
///
/// Images are carried as `f32`, multi-hot labels as `u8`.
pub trait Element:
    Copy
    + Clone
    + Default
    + PartialEq
    + PartialOrd
    + fmt::Debug
    + Send
    + Sync
    + Serialize
    + for<'de> Deserialize<'de>
    + 'static
{
    const ZERO: Self;
}

impl Element for u8 {
    const ZERO: Self = 0;
}

impl Element for f32 {
    const ZERO: Self = 0.0;
}
