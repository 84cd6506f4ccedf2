//! User ID
//!
//! The account identifier is shared with other crates through the kernel.

pub use kernel::id::UserId;
