//! npm input documents: package.json and package-lock.json (v1 layout)

pub mod lockfile;
pub mod manifest;

pub use lockfile::{LockedEntry, Lockfile};
pub use manifest::Manifest;
