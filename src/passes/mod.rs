//! Infrastructure analyzers shipped with the driver.
//!
//! Only mechanism lives here: `inspect` exposes a shared traversal for other
//! analyzers to build on. Actual analysis rules are defined by drivers.

mod inspect;

pub use inspect::{inspect_analyzer, Inspector, INSPECT};
