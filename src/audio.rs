//! `rodio` backend for local files.
//!
//! A dedicated thread owns the output stream and the current sink; the
//! [`RodioDevice`] handle forwards transport calls to it over a channel.

mod device;
mod sink;
mod thread;

pub use device::RodioDevice;
