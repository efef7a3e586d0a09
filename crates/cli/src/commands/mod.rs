//! Command implementations for the Seiri CLI.
//!
//! `scan` walks a project directory, runs the full pipeline, and writes
//! the markdown report; `report` re-renders a report from a saved triage
//! result without rescanning.

pub mod report;
pub mod scan;
