//! Test modules for the sophy service

pub mod router_tests;
