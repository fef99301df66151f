// Core transformation: reconciliation, dimensions, unification, validation

pub mod dimensions;
pub mod normalize;
pub mod quality_gate;
pub mod unify;
