//! The component engine of the observability operator.
//!
//! A component is an independently toggleable sub-system (profiling, log
//! shipping, metric collection). Each one validates its own configuration and
//! renders its manifest templates into a [`plan::ResourcePlan`], the objects
//! to apply and the objects to delete. Talking to the API server is left to
//! the caller.
//!
//! ```
//! use observability_components::{
//!     component::{Component, pixie::{PixieComponent, PixieConfig}},
//!     registry::NamingRegistry,
//!     template::EmbeddedSource,
//! };
//!
//! let pixie = PixieComponent::new(
//!     &EmbeddedSource::default(),
//!     NamingRegistry::default(),
//!     PixieConfig::default(),
//! )
//! .unwrap();
//!
//! // Disabled components are always valid and apply nothing.
//! assert!(pixie.validate().is_valid());
//! assert!(pixie.resources().unwrap().to_apply().is_empty());
//! ```

pub mod component;
pub mod config;
pub mod hash;
pub mod iter;
pub mod kvp;
pub mod logging;
pub mod object;
pub mod plan;
pub mod quantity;
pub mod registry;
pub mod template;
pub mod validation;
pub mod yaml;

// External re-exports
pub use k8s_openapi;
pub use kube;
