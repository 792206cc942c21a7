//! Default and environment resolution.
//!
//! Fills options that received no command-line value: declared default
//! literals first, otherwise the first non-empty environment variable.
//! Resolution never touches an option that already has a value, so running
//! it twice changes nothing.

use tracing::{debug, trace};

use crate::command::Command;
use crate::env::Environment;
use crate::error::{Error, ErrorKind, Result};
use crate::option::{AssignError, OptionSpec, ValueKind, ValueOrigin};

/// Resolution order between declared defaults and the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precedence {
    /// Declared defaults, then environment.
    #[default]
    DefaultsFirst,
    /// Environment, then declared defaults.
    EnvFirst,
}

/// Resolves every option of one command (all of its groups).
///
/// Returns how many options received a value.
pub fn resolve_defaults(command: &mut Command, env: &dyn Environment) -> Result<usize> {
    resolve_with(command, env, Precedence::DefaultsFirst)
}

/// Resolves `root` and every subcommand below it, invoked or not.
pub fn resolve_tree(root: &mut Command, env: &dyn Environment, precedence: Precedence) -> Result<usize> {
    let mut applied = resolve_with(root, env, precedence)?;
    for child in &mut root.subcommands {
        applied += resolve_tree(child, env, precedence)?;
    }
    Ok(applied)
}

/// Resolves one command with an explicit precedence.
pub fn resolve_with(command: &mut Command, env: &dyn Environment, precedence: Precedence) -> Result<usize> {
    let name = command.name.clone();
    let mut applied = 0;
    let mut failure = None;
    command.group.for_each_option_mut(&mut |option| {
        if failure.is_some() {
            return;
        }
        match resolve_option(option, env, precedence) {
            Ok(true) => applied += 1,
            Ok(false) => {}
            Err(err) => failure = Some(err),
        }
    });
    if let Some(err) = failure {
        return Err(err);
    }
    if applied > 0 {
        debug!(command = %name, applied, "resolved option defaults");
    }
    Ok(applied)
}

fn resolve_option(option: &mut OptionSpec, env: &dyn Environment, precedence: Precedence) -> Result<bool> {
    if option.is_set() {
        return Ok(false);
    }
    let applied = match precedence {
        Precedence::DefaultsFirst => apply_defaults(option)? || apply_env(option, env)?,
        Precedence::EnvFirst => apply_env(option, env)? || apply_defaults(option)?,
    };
    Ok(applied)
}

fn apply_defaults(option: &mut OptionSpec) -> Result<bool> {
    if option.defaults.is_empty() {
        return Ok(false);
    }
    let literals = option.defaults.clone();
    for literal in &literals {
        option
            .assign(Some(literal), ValueOrigin::Default)
            .map_err(|err| invalid(option, &format!("default value `{literal}'"), err))?;
    }
    trace!(option = %option_label(option), count = literals.len(), "applied default literals");
    Ok(true)
}

fn apply_env(option: &mut OptionSpec, env: &dyn Environment) -> Result<bool> {
    let found = option
        .env
        .iter()
        .find_map(|name| env.var(name).filter(|v| !v.is_empty()).map(|v| (name.clone(), v)));
    let Some((name, raw)) = found else {
        return Ok(false);
    };

    let splits = matches!(option.kind, ValueKind::Sequence(_) | ValueKind::Mapping(_));
    let items: Vec<String> = match option.env_delimiter.as_deref() {
        Some(delim) if splits && !delim.is_empty() => raw.split(delim).map(String::from).collect(),
        _ => vec![raw],
    };
    for item in &items {
        option
            .assign(Some(item), ValueOrigin::Env)
            .map_err(|err| invalid(option, &format!("environment variable {name}"), err))?;
    }
    trace!(option = %option_label(option), env = %name, "applied environment value");
    Ok(true)
}

fn option_label(option: &OptionSpec) -> String {
    option.label(option.long.as_deref(), "-", "--")
}

fn invalid(option: &OptionSpec, source: &str, err: AssignError) -> Error {
    Error::new(
        ErrorKind::InvalidValue,
        format!("invalid {source} for flag `{}': {err}", option_label(option)),
    )
}
