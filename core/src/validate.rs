//! Command tree validation.
//!
//! Validates structural invariants of a command tree before it is used for
//! parsing, catching duplicate option names, malformed option names and
//! namespaces, duplicate subcommands, and misplaced rest slots.
//!
//! # Examples
//!
//! ```
//! use flagtree_core::*;
//!
//! let root = Command::new("prog").with_option(OptionSpec::flag(Some('v'), Some("verbose")));
//! assert!(validate_command(&root).is_empty());
//!
//! // Invalid: two options share `-v`
//! let bad = Command::new("prog")
//!     .with_option(OptionSpec::flag(Some('v'), Some("verbose")))
//!     .with_option(OptionSpec::flag(Some('v'), Some("version")));
//! assert!(!validate_command(&bad).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::command::{Command, Multiplicity};
use crate::error::ErrorKind;
use crate::parser::{Convention, ParserConfig};

/// Schema construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Command name is empty or whitespace-only.
    #[error("command name cannot be empty")]
    EmptyCommandName,
    /// An option has neither a short nor a long name.
    #[error("option must define a short or long name")]
    MissingOptionName,
    /// Short name is whitespace, non-printable, or a prefix character.
    #[error("invalid short option name: {0:?}")]
    InvalidShortName(char),
    /// Long name is empty or contains whitespace or `=`.
    #[error("invalid long option name: {0:?}")]
    InvalidLongName(String),
    /// Group namespace contains whitespace or `=`.
    #[error("invalid group namespace: {0:?}")]
    InvalidNamespace(String),
    /// Two options in one command share a short name.
    #[error("duplicate short option `-{short}' in command `{command}'")]
    DuplicateShort { command: String, short: char },
    /// Two options in one command share a qualified long name.
    #[error("duplicate long option `--{long}' in command `{command}'")]
    DuplicateLong { command: String, long: String },
    /// An option reuses a name of the built-in help flag.
    #[error("option `{name}' in command `{command}' collides with the built-in help flag")]
    ReservedHelpName { command: String, name: String },
    /// Two children of one command share a name or alias.
    #[error("duplicate command name or alias `{name}' under `{parent}'")]
    DuplicateCommand { parent: String, name: String },
    /// Positional slot has an empty name.
    #[error("positional argument name cannot be empty in command `{0}'")]
    EmptyPositionalName(String),
    /// A rest slot is followed by another slot.
    #[error("positional argument `{name}' takes all remaining arguments but is not last in `{command}'")]
    MisplacedRest { command: String, name: String },
}

impl SchemaError {
    /// Parse error kind this schema error maps to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateShort { .. }
            | Self::DuplicateLong { .. }
            | Self::ReservedHelpName { .. }
            | Self::DuplicateCommand { .. } => ErrorKind::DuplicateDefinition,
            _ => ErrorKind::InvalidDefinition,
        }
    }
}

/// Validates a command tree.
///
/// Checks every command in the tree and reports every problem found, in
/// preorder. An option with a malformed name is not checked for duplicates.
pub fn validate_command(command: &Command) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    validate_node(command, &mut errors);
    errors
}

fn validate_node(command: &Command, errors: &mut Vec<SchemaError>) {
    if command.name.trim().is_empty() {
        errors.push(SchemaError::EmptyCommandName);
    }

    command.group.visit("", &mut |group, _| {
        if let Some(ns) = group.namespace.as_deref() {
            if !ns.is_empty() && !is_valid_long(ns) {
                errors.push(SchemaError::InvalidNamespace(ns.to_string()));
            }
        }
    });

    let mut seen_short: HashSet<char> = HashSet::new();
    let mut seen_long: HashSet<String> = HashSet::new();
    for (option, long) in command.group.all_options() {
        if option.short.is_none() && option.long.is_none() {
            errors.push(SchemaError::MissingOptionName);
            continue;
        }
        if let Some(short) = option.short {
            if !is_valid_short(short) {
                errors.push(SchemaError::InvalidShortName(short));
            } else if !seen_short.insert(short) {
                errors.push(SchemaError::DuplicateShort {
                    command: command.name.clone(),
                    short,
                });
            }
        }
        if let (Some(raw), Some(long)) = (option.long.as_deref(), long) {
            if !is_valid_long(raw) {
                errors.push(SchemaError::InvalidLongName(raw.to_string()));
            } else if !seen_long.insert(long.clone()) {
                errors.push(SchemaError::DuplicateLong {
                    command: command.name.clone(),
                    long,
                });
            }
        }
    }

    let last = command.positional.len().saturating_sub(1);
    for (i, slot) in command.positional.iter().enumerate() {
        if slot.name.trim().is_empty() {
            errors.push(SchemaError::EmptyPositionalName(command.name.clone()));
        }
        if slot.multiplicity == Multiplicity::Rest && i != last {
            errors.push(SchemaError::MisplacedRest {
                command: command.name.clone(),
                name: slot.name.clone(),
            });
        }
    }

    let mut seen_children: HashSet<&str> = HashSet::new();
    for child in &command.subcommands {
        for name in std::iter::once(&child.name).chain(&child.aliases) {
            if !seen_children.insert(name.as_str()) {
                errors.push(SchemaError::DuplicateCommand {
                    parent: command.name.clone(),
                    name: name.clone(),
                });
            }
        }
    }
    for child in &command.subcommands {
        validate_node(child, errors);
    }
}

/// Checks that no option in the tree reuses a spelling of the help flag.
pub fn validate_help_names(command: &Command, config: &ParserConfig) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    if config.help_flag {
        check_help_names(command, config.convention, &mut errors);
    }
    errors
}

fn check_help_names(command: &Command, convention: Convention, errors: &mut Vec<SchemaError>) {
    for (option, long) in command.group.all_options() {
        let short_clash = option.short.filter(|&c| convention.is_help_short(c));
        let long_clash = long.filter(|l| convention.is_help_long(l));
        let clash = short_clash.map(String::from).or(long_clash);
        if let Some(name) = clash {
            errors.push(SchemaError::ReservedHelpName {
                command: command.name.clone(),
                name,
            });
        }
    }
    for child in &command.subcommands {
        check_help_names(child, convention, errors);
    }
}

fn is_valid_short(c: char) -> bool {
    !c.is_whitespace() && !c.is_control() && c != '-' && c != '/'
}

fn is_valid_long(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c.is_whitespace() || c == '=')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Positional;
    use crate::group::Group;
    use crate::option::{OptionSpec, ScalarType};

    #[test]
    fn test_valid_tree_passes() {
        let root = Command::new("prog")
            .with_option(OptionSpec::flag(Some('v'), Some("verbose")))
            .with_group(
                Group::new("Subgroup")
                    .with_namespace("sip")
                    .with_option(OptionSpec::scalar(None, Some("opt"), ScalarType::String)),
            )
            .with_group(
                Group::new("Other")
                    .with_namespace("sap")
                    .with_option(OptionSpec::scalar(None, Some("opt"), ScalarType::String)),
            )
            .with_positional(Positional::new("file"))
            .with_positional(Positional::rest("rest"))
            .with_subcommand(Command::new("run").with_alias("r"));
        assert!(validate_command(&root).is_empty());
    }

    #[test]
    fn test_duplicate_long_across_groups() {
        let root = Command::new("prog")
            .with_option(OptionSpec::scalar(None, Some("sip.opt"), ScalarType::String))
            .with_group(
                Group::new("Subgroup")
                    .with_namespace("sip")
                    .with_option(OptionSpec::scalar(None, Some("opt"), ScalarType::String)),
            );
        let errors = validate_command(&root);
        assert_eq!(
            errors,
            vec![SchemaError::DuplicateLong {
                command: "prog".to_string(),
                long: "sip.opt".to_string(),
            }]
        );
        assert_eq!(errors[0].kind(), ErrorKind::DuplicateDefinition);
    }

    #[test]
    fn test_same_names_in_different_commands_are_fine() {
        let root = Command::new("prog")
            .with_option(OptionSpec::flag(Some('v'), Some("verbose")))
            .with_subcommand(
                Command::new("run").with_option(OptionSpec::flag(Some('v'), Some("verbose"))),
            );
        assert!(validate_command(&root).is_empty());
    }

    #[test]
    fn test_malformed_names() {
        let root = Command::new("prog").with_option(OptionSpec::flag(None, None));
        assert_eq!(validate_command(&root), vec![SchemaError::MissingOptionName]);

        let root = Command::new("prog").with_option(OptionSpec::flag(Some(' '), None));
        assert_eq!(validate_command(&root), vec![SchemaError::InvalidShortName(' ')]);

        let root = Command::new("prog").with_option(OptionSpec::flag(None, Some("a=b")));
        assert_eq!(
            validate_command(&root),
            vec![SchemaError::InvalidLongName("a=b".to_string())]
        );
        assert_eq!(
            validate_command(&root)[0].kind(),
            ErrorKind::InvalidDefinition
        );
    }

    #[test]
    fn test_invalid_namespace() {
        let root = Command::new("prog").with_group(
            Group::new("Outer")
                .with_namespace("")
                .with_group(
                    Group::new("Inner")
                        .with_namespace("a b")
                        .with_option(OptionSpec::flag(None, Some("opt"))),
                ),
        );
        let errors = validate_command(&root);
        assert_eq!(errors, vec![SchemaError::InvalidNamespace("a b".to_string())]);
        assert_eq!(errors[0].kind(), ErrorKind::InvalidDefinition);
    }

    #[test]
    fn test_every_problem_is_reported() {
        let root = Command::new("prog")
            .with_option(OptionSpec::flag(Some('v'), Some("verbose")))
            .with_option(OptionSpec::flag(Some('v'), Some("bad name")))
            .with_positional(Positional::rest("files"))
            .with_positional(Positional::new("dest"))
            .with_subcommand(Command::new("run").with_option(OptionSpec::flag(None, None)));
        assert_eq!(
            validate_command(&root),
            vec![
                SchemaError::DuplicateShort {
                    command: "prog".to_string(),
                    short: 'v',
                },
                SchemaError::InvalidLongName("bad name".to_string()),
                SchemaError::MisplacedRest {
                    command: "prog".to_string(),
                    name: "files".to_string(),
                },
                SchemaError::MissingOptionName,
            ]
        );
    }

    #[test]
    fn test_duplicate_alias_detected() {
        let root = Command::new("prog")
            .with_subcommand(Command::new("remove").with_alias("rm"))
            .with_subcommand(Command::new("rm"));
        assert_eq!(
            validate_command(&root),
            vec![SchemaError::DuplicateCommand {
                parent: "prog".to_string(),
                name: "rm".to_string(),
            }]
        );
    }

    #[test]
    fn test_rest_must_be_last() {
        let root = Command::new("prog")
            .with_positional(Positional::rest("files"))
            .with_positional(Positional::new("dest"));
        assert!(matches!(
            validate_command(&root).as_slice(),
            [SchemaError::MisplacedRest { name, .. }] if name == "files"
        ));
    }

    #[test]
    fn test_help_names_reserved_only_when_enabled() {
        let root = Command::new("prog")
            .with_subcommand(Command::new("run").with_option(OptionSpec::flag(Some('h'), Some("host"))));

        let errors = validate_help_names(&root, &ParserConfig::default());
        assert_eq!(
            errors,
            vec![SchemaError::ReservedHelpName {
                command: "run".to_string(),
                name: "h".to_string(),
            }]
        );

        let config = ParserConfig {
            help_flag: false,
            ..ParserConfig::default()
        };
        assert!(validate_help_names(&root, &config).is_empty());
    }
}
