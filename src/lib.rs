#[macro_use]
extern crate log;
#[macro_use]
extern crate derive_builder;
#[macro_use]
extern crate lazy_static;

pub mod browser_controller;
pub mod network_idle;
pub mod runner;
pub mod sites;
pub mod types;
pub mod utils;
