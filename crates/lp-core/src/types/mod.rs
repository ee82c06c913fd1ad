//! Domain types for the live pipe.
//!
//! - [`signal`] - The ingested record and its schema constants
//!
//! Public types are re-exported at this module level and at the crate root:
//!
//! ```
//! use lp_core::Signal;
//! use lp_core::types::Signal as AlsoSignal;
//! ```

mod signal;

pub use signal::{SIDES, Signal};
