//! Module implement common utility types.

pub mod spinlock;

pub use spinlock::Spinlock;
