//! Shared test harness modules for the Beacon CLI.

use super::*;

mod helpers;
