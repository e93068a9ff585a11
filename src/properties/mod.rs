//! Typed property accumulators and the stores they build.

pub mod accumulator;
pub mod kind;
pub mod max;
pub mod store;

pub use accumulator::{PropertyAccumulator, TypedAccumulator};
pub use kind::{
    DoubleArrayKind, DoubleKind, FloatArrayKind, LongArrayKind, LongKind, PropertyKind,
};
pub use max::{DoubleMax, LongMax, NoMax, RunningMax};
pub use store::{
    DoubleArrayPropertyValues, DoublePropertyValues, FloatArrayPropertyValues,
    LongArrayPropertyValues, LongPropertyValues, NodePropertyValues, TypedPropertyValues,
};
