//! Range ownership: interval sets, their storage, and the manager that
//! mutates them.

pub(crate) mod locks;
mod manager;
mod selection;
mod set;
mod store;

pub use manager::{RangeManager, RangeMove};
pub use selection::{PickedRanges, pick_ascending};
pub use set::{Conflict, Insertion, NotContained, OwnerRangeSet};
pub use store::{RangeStore, range_key, token_index_key};
pub(crate) use store::{read_json, write_json};
