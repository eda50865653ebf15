//! Integration tests for kube-rail
//!
//! These run the built binary against fake `docker` and `kubectl` scripts.

#![cfg(unix)]

mod test_apply;
mod test_build;
mod test_preflight;
