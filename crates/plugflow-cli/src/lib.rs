//! plugflow CLI library: plugin directory loading and command handlers,
//! shared by the `plugflow` binary and its integration tests.

pub mod assets;
pub mod commands;
pub mod loader;
