//! Default implementations for the external capability seams.
//!
//! The gate and handlers consume trait objects; these modules supply the
//! standalone-deployment defaults (no hosted identity provider, no remote
//! role database, no detection model). Each degrades gracefully per the
//! failure policy rather than panicking.

pub mod detector;
pub mod identity;
pub mod roles;
