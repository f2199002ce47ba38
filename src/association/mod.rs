//! Association engine: rank correlation between pathway metagenes and drug
//! responses, and threshold-based association views

mod correlation;
mod index;

pub use correlation::{correlate, shared_cell_lines, CorrelationMatrix};
pub use index::{
    associations, validate_threshold, Association, AssociationIndex, AssociationParams, Partner,
};
