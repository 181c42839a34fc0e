//! Likelihood core — data tensors, reducible model tensors, and alignment.
//!
//! Building blocks shared by the likelihood engine and the FIM aggregator:
//! - [`tensor`]: the [`Reducible`](tensor::Reducible) capability and its
//!   dense and state-indexed implementations.
//! - [`species_link`]: observed/unobserved species axes.
//! - [`data`]: column tables and the sparse per-time count tensor.
//! - [`align`]: marginalize, pad/truncate, renormalize, floor.
//! - [`options`]: probability floor, truncation policy, FSP tolerance.
//! - [`prior`]: additive log-prior terms.
pub mod align;
pub mod data;
pub mod options;
pub mod prior;
pub mod species_link;
pub mod tensor;
