//! Shared state store.
//!
//! A branch carries a scope: aliases bound to shared objects. Two default
//! bags are always present, a [`WriteOnceBag`] under `val` and a
//! [`ReadWriteBag`] under `var`. Nodes may overlay their own objects, and
//! objects of a known type returned in a result stream replace the scope
//! entry of that type.

mod bags;
mod parser;
mod scope;

pub use bags::{is_default_bag, ReadWriteBag, WriteOnceBag};
pub use parser::{ResultParser, SortedData};
pub use scope::{StateMap, DEFAULT_READ_WRITE_ALIAS, DEFAULT_WRITE_ONCE_ALIAS};
