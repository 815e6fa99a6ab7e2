//! Fortune Pricing
//!
//! Line-item pricing where the total is scaled by a multiplier drawn from a
//! weighted table, revealed to the user with a cycling animation that settles
//! on the drawn entry.
//!
//! The draw itself belongs to a [`service::PricingService`]. This crate
//! validates the selection, takes a snapshot of the multiplier table, drives
//! the reveal on a [`surface::RevealSurface`] and presents the result.

pub mod admin;
pub mod catalog;
pub mod config;
pub mod fixture;
pub mod flow;
pub mod http;
pub mod multipliers;
pub mod outcome;
pub mod prelude;
pub mod presenter;
pub mod resolver;
pub mod reveal;
pub mod selection;
pub mod service;
pub mod surface;
