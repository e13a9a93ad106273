//! Library to run configured backup jobs.
//!
//! A job is compiled into shell pipelines by the backend matching its type
//! (see [`backends`]) and executed by the [`runner`], which tallies failing
//! commands. Jobs are declared in a TOML file read into a [`config::Config`].

#![forbid(unsafe_code)]

pub mod backends;
pub mod cli;
pub mod config;
pub mod executor;
pub mod job;
pub mod lock;
pub mod logging;
pub mod runner;
pub mod util;
