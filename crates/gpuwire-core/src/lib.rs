pub mod config;
pub mod error;
pub mod object_table;

pub use error::{AllocationError, CoreError, LookupError};
pub use object_table::{ObjectData, ObjectTable, SlotState, SlotStatus};
