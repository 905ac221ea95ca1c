//! Integration tests for the modelfit library
//!
//! This module organizes all integration tests that test the library as a whole,
//! rather than individual components.


// Peak-fitting workflows in the style of lmfit-py
pub mod lmfit_comparison;

// Real-world fitting problems
pub mod real_world;
