//! Miscellaneous utility structs and functions.

mod listeners;

#[doc(inline)]
pub use self::listeners::Listeners;
