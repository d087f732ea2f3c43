//! A fixed-size worker pool, and a native window whose creation and event
//! loop live on a dedicated thread.
#![deny(unsafe_op_in_unsafe_fn)]

pub mod error;
mod handle;
pub mod pool;
pub mod prelude;
pub mod utilities;
pub mod window;
