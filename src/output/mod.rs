//! Output formatters for scan results.
//!
//! - [`TextOutput`] for the terminal report
//! - [`JsonOutput`] for automation and scripting
//! - [`ScriptOutput`] for the reviewable `rm` script
//!
//! # Example
//!
//! ```no_run
//! use dedupe::duplicates::DuplicateFinder;
//! use dedupe::error::ExitCode;
//! use dedupe::output::JsonOutput;
//! use dedupe::plan::DeletionPlan;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (sets, summary) = finder.find_duplicates(Path::new(".")).unwrap();
//! let plan = DeletionPlan::build(&summary.root, &[], sets);
//!
//! let output = JsonOutput::new(&plan, &summary, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod script;
pub mod text;

pub use json::{JsonOutput, JsonOutputError};
pub use script::ScriptOutput;
pub use text::TextOutput;
