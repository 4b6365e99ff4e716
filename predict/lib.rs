#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

pub mod binning;
pub mod dataset;
pub mod features;
pub mod inference;
pub mod model;
pub mod schema;
pub mod startup;

#[path = "../web/mod.rs"]
pub mod web;
