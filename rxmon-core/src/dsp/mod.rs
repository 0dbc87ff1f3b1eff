//! Signal conditioning for the monitor pipeline.
//!
//! Everything in here runs per-sample on the audio thread: no allocation,
//! no locking, no logging. State carries across callbacks (and across
//! session restarts) so gain and ramp continuity survive frame boundaries.

pub mod agc;
pub mod interp;
