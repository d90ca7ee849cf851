//! Fixed-point host bridge for Axon.
//!
//! Hosts with only 16-bit integer arithmetic drive a network through a
//! [`HostContext`]: parameters are exchanged as `num / den` fractions
//! ([`fraction_approx`] converts the other way), inputs and outputs are
//! rounded to `i16`, and failures leave a sticky [`HostStatus`] behind for
//! hosts that poll instead of checking every call.
//!
//! Several sessions can coexist in a [`ContextTable`], which reports a
//! closed or unknown [`ContextId`] as a status code like any other failure.
//!
//! ```
//! use axon_host::{HostContext, HostStatus};
//!
//! let mut ctx = HostContext::on_heap();
//! ctx.init(2, &[2], &[0]).unwrap();
//! ctx.set_weights(0, &[1, 0, 0, 1], &[1, 1, 1, 1]).unwrap();
//! ctx.set_offsets(0, &[0, 0], &[1, 1]).unwrap();
//! ctx.set_inputs(&[3, -4]).unwrap();
//! ctx.eval().unwrap();
//!
//! let mut out = [0i16; 2];
//! ctx.outputs(&mut out).unwrap();
//! assert_eq!(out, [3, -4]);
//! assert_eq!(ctx.error(), HostStatus::Ok);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod fraction;
pub mod session;
pub mod status;

pub use context::HostContext;
pub use fraction::{fraction_approx, fraction_value, MAX_TERM};
pub use session::{ContextId, ContextTable};
pub use status::HostStatus;
