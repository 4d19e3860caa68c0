//! Build pipeline for docpress.
//!
//! Ties together manifest resolution, registry validation, document
//! assembly, the external converter, and artifact verification into the
//! end-to-end [`pipeline::build`] workflow.

pub mod assembler;
pub mod converter;
pub mod manifest;
pub mod pipeline;
pub mod registry;
pub mod verify;
