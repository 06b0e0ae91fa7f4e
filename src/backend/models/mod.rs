pub mod object;

pub use object::{ExternalFn, Object, ObjectType};
