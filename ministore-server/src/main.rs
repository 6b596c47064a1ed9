//! The ministore server binary.
//!
//! Starts the storage API and management UI listeners as configured on the command line. Run with
//! `--help` for all options.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

fn main() -> anyhow::Result<()> {
    ministore_server::cli::execute()
}
