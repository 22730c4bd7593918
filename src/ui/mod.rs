//! Build output in buildpack conventions
//!
//! Topics are printed as `-----> message`, details are indented under
//! them and warnings are prefixed with ` !     `. In an interactive
//! terminal the markers are styled with `console`; under CI or when the
//! output is piped into the platform's build log, plain text is used.
//!
//! # Example
//!
//! ```rust,ignore
//! use rubypack::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//!
//! ui::topic(&ctx, "Installing dependencies using bundler 2.0.2");
//! ui::detail(&ctx, "Running: bundle install --deployment");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Fetching libyaml-0.1.4.tgz");
//! spinner.stop("Fetched libyaml-0.1.4.tgz");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{detail, stream_line, topic, warning, warning_block};
pub use progress::TaskSpinner;
