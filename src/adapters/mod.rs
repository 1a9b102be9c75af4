//! Adapters Layer
//!
//! Inbound adapters expose the service over transport protocols; outbound
//! adapters implement the domain ports against concrete backends.

pub mod inbound;
pub mod outbound;
