//! Camp aggregate root, service facade, and HTTP surface.

pub mod domain;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{Camp, CampSetup, CampView};
pub use router::camp_router;
pub use service::{CampError, CampService};
