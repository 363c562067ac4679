//! One module per subcommand.

pub mod create;
pub mod delete;
pub mod list;
pub mod read;
pub mod scan;
pub mod update;
