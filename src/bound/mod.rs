//! Model bounds: resolved `[min, max]` quantities per model.
//!
//! [`to_model_bounds`] turns a compacted restriction list into the bounds
//! consumed by the matcher. The remaining functions implement interval
//! arithmetic used when committing or releasing resources.

mod extract;
mod types;

pub use extract::to_model_bounds;
pub use types::{
    aggregate, max_of, subtract_lists, to_restrictions, ModelBound, SubtractMode, MAX_THRESHOLD,
};
