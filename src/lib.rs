//! # Strata
//!
//! Generalization hierarchies for data de-identification.
//!
//! ## Architecture
//!
//! A hierarchy maps every distinct value of an attribute to a sequence of
//! increasingly general labels. Hierarchies are described declaratively and
//! rebuilt wholesale on every change:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │           HierarchySpec (*.ahs, JSON)                    │
//! │  (interval / order / redaction / date)                   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [spec]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Builder<DataType> + ValueDomain                   │
//! └─────────────────────────────────────────────────────────┘
//!                │                          │
//!                ▼ [hierarchy]              ▼ [layout]
//! ┌──────────────────────────┐  ┌──────────────────────────┐
//! │  Hierarchy (value rows)  │  │  Layout (balanced levels)│
//! └──────────────────────────┘  └──────────────────────────┘
//! ```
//!
//! [`model::HierarchyModel`] ties the pieces together for interactive
//! editing with several views.

pub mod aggregate;
pub mod config;
pub mod domain;
pub mod error;
pub mod hierarchy;
pub mod layout;
pub mod logging;
pub mod model;
pub mod spec;
pub mod types;

pub use error::{ConfigurationError, HierarchyError, SpecificationError, ValueError};
pub use hierarchy::{Hierarchy, HierarchyBuilder};
pub use spec::HierarchySpec;
