//! Behavioural model of the `DotProduct` hardware unit.
//!
//! The unit takes a clock, an active-low reset, two N-wide vectors of 32-bit
//! inputs, and drives one 32-bit result. Internally it is a registered
//! multiply stage, an adder tree, and an output register; the model keeps the
//! cycle timing of that structure (see [`DotProductParams::adder_tree_latency`])
//! without modelling the individual adders.

#![warn(missing_docs)]

pub mod dot_product;
pub mod params;

pub use dot_product::{DotProduct, DotProductPorts};
pub use params::DotProductParams;
