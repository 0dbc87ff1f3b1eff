//! Types crossing the boundary to the surrounding application.
//!
//! Everything here derives `serde::Serialize` + `serde::Deserialize` so the
//! hosting process (CLI shell, GUI, remote control surface) can forward it
//! verbatim.

pub mod events;
