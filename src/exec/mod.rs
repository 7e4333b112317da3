//! Supervisor driver.
//!
//! - `driver`: the [`Exec`] state machine (before → root/signals/cancellation → after);
//! - `builder`: [`ExecBuilder`], the immutable option set of one run;
//! - `signals`: [`Signal`] and the OS listener feeding the driver's select loop.

mod builder;
mod driver;
mod signals;

pub use builder::ExecBuilder;
pub use driver::{execute, Exec};
pub use signals::Signal;

pub(crate) use driver::Ended;
