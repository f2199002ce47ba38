//! Data structures shared by the pipeline stages

mod expression;
mod identifiers;
mod labeled;
mod pathway;

pub use expression::ExpressionMatrix;
pub use identifiers::{canonical_cell_line, GeneNamespace, IdMapping, IdentifierMap};
pub use labeled::LabeledMatrix;
pub use pathway::{
    Direction, GeneSet, PathwayDatabase, PathwayHierarchy, PathwayRecord, ResolvedPathway,
};
