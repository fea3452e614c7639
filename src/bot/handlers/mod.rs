//! Discord interaction handlers
//!
//! This module provides handlers for Discord interactions that are not commands
//! themselves, such as autocomplete.

/// Autocomplete handlers for friend and group names
pub mod autocomplete;
