//! Command-line front end for the bond governance client.

pub mod clap_app;
pub mod cli;
pub mod governance;
