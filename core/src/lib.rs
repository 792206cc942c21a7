//! Declarative command-line option parsing.
//!
//! This crate turns a schema of options, positional arguments and
//! subcommands into a parser for argument vectors:
//!
//! - [`OptionSpec`]: one flag with short/long names, a [`ValueKind`], defaults,
//!   environment fallbacks and display metadata.
//! - [`Group`]: an ordered, titled set of options with an optional namespace.
//! - [`Command`]: an invocable node with its own group, [`Positional`] slots
//!   and child commands.
//! - [`OptionParser`]: validates a tree and parses argv against it.
//!
//! Validation ([`validate_command`]) rejects duplicate names and malformed
//! schemas before parsing. Defaults and environment values are applied by
//! [`resolve_defaults`]. Help and man output come from [`render_help`] and
//! [`render_man_page`]. Schemas can also be loaded from YAML or JSON via
//! [`SchemaDocument`].
//!
//! # Example
//!
//! ```
//! use flagtree_core::*;
//!
//! let root = Command::new("greet")
//!     .with_option(
//!         OptionSpec::scalar(Some('n'), Some("name"), ScalarType::String)
//!             .with_description("Who to greet")
//!             .with_default("world"),
//!     )
//!     .with_option(OptionSpec::counter(Some('v'), Some("verbose")));
//!
//! let mut parser = OptionParser::new(root).unwrap();
//! parser.parse(["-vv"]).unwrap();
//!
//! let root = parser.command();
//! assert_eq!(root.value("name"), Some(&Value::String("world".into())));
//! assert!(parser.help().contains("Who to greet (world)"));
//! ```

mod command;
mod document;
mod env;
mod error;
mod group;
mod help;
mod man;
mod option;
mod parser;
mod resolve;
mod validate;

pub use command::{Command, DEFAULT_HEADING, Multiplicity, Positional};
pub use document::{
    Collection, CommandDocument, DocumentError, GroupDocument, OptionDocument, ParserDocument,
    PositionalDocument, SchemaDocument,
};
pub use env::{Environment, ProcessEnv};
pub use error::{Error, ErrorKind, Result};
pub use group::Group;
pub use help::{HelpStyle, render_help, render_usage};
pub use man::{render_man_page, render_man_page_today};
pub use option::{AssignError, Callback, OptionSpec, ScalarType, Value, ValueKind, ValueOrigin};
pub use parser::{Convention, OptionParser, Parsed, ParserConfig};
pub use resolve::{Precedence, resolve_defaults, resolve_tree, resolve_with};
pub use validate::{SchemaError, validate_command, validate_help_names};
