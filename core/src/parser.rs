//! Argument parsing engine.
//!
//! [`OptionParser`] owns a validated command tree and walks an argument
//! vector over it in a single pass. Bound values are written into the
//! descriptors of the tree; the returned [`Parsed`] carries the activated
//! command chain and the unconsumed arguments.
//!
//! # Examples
//!
//! ```
//! use flagtree_core::*;
//!
//! let root = Command::new("prog")
//!     .with_option(OptionSpec::counter(Some('v'), Some("verbose")))
//!     .with_option(OptionSpec::scalar(Some('o'), Some("output"), ScalarType::String))
//!     .with_subcommand(
//!         Command::new("run").with_option(OptionSpec::flag(None, Some("dry-run"))),
//!     );
//!
//! let mut parser = OptionParser::new(root).unwrap();
//! let parsed = parser.parse(["-vv", "-ofile.txt", "run", "--dry-run"]).unwrap();
//!
//! assert_eq!(parsed.commands, vec!["prog", "run"]);
//! let root = parser.command();
//! assert_eq!(root.value("output"), Some(&Value::String("file.txt".into())));
//! assert_eq!(root.value("verbose").and_then(Value::as_list).map(|l| l.len()), Some(2));
//! assert_eq!(root.find_child("run").unwrap().value("dry-run"), Some(&Value::Bool(true)));
//! ```

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::command::Command;
use crate::env::{Environment, ProcessEnv};
use crate::error::{Error, ErrorKind, Result};
use crate::group::OptionPath;
use crate::help::{HelpStyle, render_help, render_usage};
use crate::man::render_man_page;
use crate::option::AssignError;
use crate::resolve::{Precedence, resolve_tree};
use crate::validate::{SchemaError, validate_command, validate_help_names};

/// Option syntax accepted and displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Convention {
    /// `-x`, `--long`, `--long=value`.
    #[default]
    Posix,
    /// `/x`, `/long`, `/long:value`, plus the POSIX forms.
    Windows,
}

impl Convention {
    pub fn short_prefix(self) -> &'static str {
        match self {
            Self::Posix => "-",
            Self::Windows => "/",
        }
    }

    pub fn long_prefix(self) -> &'static str {
        match self {
            Self::Posix => "--",
            Self::Windows => "/",
        }
    }

    /// Separator between a long name and its value in help output.
    pub fn value_separator(self) -> char {
        match self {
            Self::Posix => '=',
            Self::Windows => ':',
        }
    }

    pub fn is_help_short(self, c: char) -> bool {
        c == 'h' || (self == Self::Windows && c == '?')
    }

    pub fn is_help_long(self, name: &str) -> bool {
        name == "help"
    }
}

/// Parser behavior switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub convention: Convention,
    /// Recognize `-h`/`--help` and list them under `Help Options`.
    pub help_flag: bool,
    /// Consume `--` silently. When off the token is kept in `remaining`.
    pub pass_double_dash: bool,
    /// Put unknown flags into `remaining` instead of failing.
    pub ignore_unknown: bool,
    /// Stop option parsing at the first non-option that is neither a slot
    /// value nor a subcommand.
    pub pass_after_non_option: bool,
    /// Let environment values win over declared defaults.
    pub env_overrides_defaults: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            convention: Convention::Posix,
            help_flag: true,
            pass_double_dash: true,
            ignore_unknown: false,
            pass_after_non_option: false,
            env_overrides_defaults: false,
        }
    }
}

/// Successful parse outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Parsed {
    /// Names of the activated commands, root first.
    pub commands: Vec<String>,
    /// Arguments not consumed by options, slots or subcommands.
    pub remaining: Vec<String>,
}

enum Token<'a> {
    Terminator,
    Long { name: &'a str, value: Option<&'a str> },
    Short { cluster: &'a str, value: Option<&'a str> },
    Plain,
}

fn classify(arg: &str, convention: Convention) -> Token<'_> {
    if arg == "--" {
        return Token::Terminator;
    }
    if let Some(body) = arg.strip_prefix("--") {
        let (name, value) = split_value(body, &['=']);
        return Token::Long { name, value };
    }
    if let Some(body) = arg.strip_prefix('-') {
        if body.is_empty() {
            return Token::Plain;
        }
        let mut chars = body.char_indices();
        chars.next();
        return match chars.next() {
            Some((pos, '=')) => Token::Short {
                cluster: &body[..pos],
                value: Some(&body[pos + 1..]),
            },
            _ => Token::Short {
                cluster: body,
                value: None,
            },
        };
    }
    if convention == Convention::Windows {
        if let Some(body) = arg.strip_prefix('/').filter(|b| !b.is_empty()) {
            let (name, value) = split_value(body, &[':', '=']);
            return if name.chars().count() == 1 {
                Token::Short { cluster: name, value }
            } else {
                Token::Long { name, value }
            };
        }
    }
    Token::Plain
}

fn split_value<'a>(body: &'a str, separators: &[char]) -> (&'a str, Option<&'a str>) {
    match body.find(separators) {
        Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
        None => (body, None),
    }
}

/// An option resolved somewhere along the active chain.
struct Found {
    depth: usize,
    path: OptionPath,
    label: String,
    takes_value: bool,
    optional_value: Option<String>,
    negative_ok: bool,
}

enum Interrupt {
    Help,
    Failed(Error),
}

impl From<Error> for Interrupt {
    fn from(err: Error) -> Self {
        Self::Failed(err)
    }
}

type Step<T = usize> = std::result::Result<T, Interrupt>;

#[derive(Default)]
struct State {
    /// Child indices from the root to the active command.
    path: Vec<usize>,
    remaining: Vec<String>,
    positional_only: bool,
}

/// Parser over an owned command tree.
pub struct OptionParser {
    root: Command,
    config: ParserConfig,
    env: Box<dyn Environment>,
}

impl fmt::Debug for OptionParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionParser")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OptionParser {
    /// Validates `root` and creates a parser with the default configuration.
    pub fn new(root: Command) -> std::result::Result<Self, SchemaError> {
        Self::with_config(root, ParserConfig::default())
    }

    pub fn with_config(root: Command, config: ParserConfig) -> std::result::Result<Self, SchemaError> {
        let errors = validate_command(&root)
            .into_iter()
            .chain(validate_help_names(&root, &config));
        if let Some(err) = errors.into_iter().next() {
            return Err(err);
        }
        Ok(Self {
            root,
            config,
            env: Box::new(ProcessEnv),
        })
    }

    /// Replaces the environment used for env-backed defaults.
    pub fn with_env<E: Environment + 'static>(mut self, env: E) -> Self {
        self.env = Box::new(env);
        self
    }

    pub fn command(&self) -> &Command {
        &self.root
    }

    /// Mutable access to the tree, e.g. to bind values by hand. Changing
    /// names here bypasses validation.
    pub fn command_mut(&mut self) -> &mut Command {
        &mut self.root
    }

    pub fn into_command(self) -> Command {
        self.root
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn style(&self) -> HelpStyle {
        HelpStyle::from(&self.config)
    }

    /// Help text for the currently active command chain.
    pub fn help(&self) -> String {
        render_help(&self.root, &self.style())
    }

    pub fn usage(&self) -> String {
        render_usage(&self.root, &self.style())
    }

    pub fn man_page(&self, date: NaiveDate) -> String {
        render_man_page(&self.root, date)
    }

    /// Applies defaults and environment values to every command in the tree
    /// without parsing anything.
    pub fn resolve_defaults(&mut self) -> Result<usize> {
        let precedence = self.precedence();
        resolve_tree(&mut self.root, &*self.env, precedence)
    }

    fn precedence(&self) -> Precedence {
        if self.config.env_overrides_defaults {
            Precedence::EnvFirst
        } else {
            Precedence::DefaultsFirst
        }
    }

    /// Parses `args` (without the program name).
    ///
    /// Every parse starts from a clean tree: activation markers and bound
    /// values from a previous parse are cleared first.
    pub fn parse<I, S>(&mut self, args: I) -> Result<Parsed>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        self.root.reset();
        self.root.set_active(true);

        let mut state = State::default();
        let mut i = 0;
        while i < args.len() {
            let step = if state.positional_only {
                self.after_terminator(&mut state, &args[i]).map(|()| i + 1)
            } else {
                self.step(&mut state, &args, i)
            };
            match step {
                Ok(next) => i = next,
                Err(Interrupt::Help) => return Err(self.help_requested(&state)),
                Err(Interrupt::Failed(err)) => {
                    if !state.positional_only && self.help_follows(&state.path, &args[i + 1..]) {
                        return Err(self.help_requested(&state));
                    }
                    return Err(err);
                }
            }
        }

        self.finish(state)
    }

    fn step(&mut self, state: &mut State, args: &[String], i: usize) -> Step {
        let arg = args[i].as_str();
        match classify(arg, self.config.convention) {
            Token::Terminator => {
                state.positional_only = true;
                if !self.config.pass_double_dash {
                    state.remaining.push(arg.to_string());
                }
                Ok(i + 1)
            }
            Token::Long { name, value } => self.parse_long(state, args, i, name, value),
            Token::Short { cluster, value } => self.parse_short(state, args, i, cluster, value),
            Token::Plain => self.parse_plain(state, args, i),
        }
    }

    fn parse_long(
        &mut self,
        state: &mut State,
        args: &[String],
        i: usize,
        name: &str,
        value: Option<&str>,
    ) -> Step {
        if self.config.help_flag && self.config.convention.is_help_long(name) {
            return Err(Interrupt::Help);
        }
        let Some(found) = self.lookup(&state.path, |c| c.group.locate_long(name)) else {
            return self
                .unknown(state, &args[i], format!("unknown flag `{name}'"))
                .map(|()| i + 1);
        };

        let mut next = i + 1;
        let raw = match value {
            Some(v) => Some(v.to_string()),
            None if !found.takes_value => None,
            None => match found.optional_value.clone() {
                Some(v) => Some(v),
                None => {
                    next += 1;
                    Some(self.take_value(&found, args, i + 1)?)
                }
            },
        };
        self.bind(&state.path, &found, raw.as_deref())?;
        Ok(next)
    }

    fn parse_short(
        &mut self,
        state: &mut State,
        args: &[String],
        i: usize,
        cluster: &str,
        value: Option<&str>,
    ) -> Step {
        for (pos, c) in cluster.char_indices() {
            if self.config.help_flag && self.config.convention.is_help_short(c) {
                return Err(Interrupt::Help);
            }
            let Some(found) = self.lookup(&state.path, |cmd| cmd.group.locate_short(c)) else {
                if self.windows_long_alias(&state.path, &args[i], cluster) {
                    return self.parse_long(state, args, i, cluster, value);
                }
                return self
                    .unknown(state, &args[i], format!("unknown flag `{c}'"))
                    .map(|()| i + 1);
            };

            let rest = &cluster[pos + c.len_utf8()..];
            if found.takes_value {
                if !rest.is_empty() {
                    self.bind(&state.path, &found, Some(rest))?;
                    return Ok(i + 1);
                }
                if let Some(v) = value {
                    self.bind(&state.path, &found, Some(v))?;
                    return Ok(i + 1);
                }
                if let Some(v) = found.optional_value.clone() {
                    self.bind(&state.path, &found, Some(&v))?;
                    return Ok(i + 1);
                }
                let v = self.take_value(&found, args, i + 1)?;
                self.bind(&state.path, &found, Some(&v))?;
                return Ok(i + 2);
            }

            let explicit = if rest.is_empty() { value } else { None };
            self.bind(&state.path, &found, explicit)?;
        }
        Ok(i + 1)
    }

    /// `/x` names a one-character long option when no short option `x` exists.
    fn windows_long_alias(&self, path: &[usize], arg: &str, cluster: &str) -> bool {
        self.config.convention == Convention::Windows
            && arg.starts_with('/')
            && cluster.chars().count() == 1
            && self.lookup(path, |cmd| cmd.group.locate_long(cluster)).is_some()
    }

    fn parse_plain(&mut self, state: &mut State, args: &[String], i: usize) -> Step {
        let arg = args[i].as_str();
        if self.fill_slot(&state.path, arg)? {
            return Ok(i + 1);
        }

        let command = self.root.descend(&state.path);
        if !command.subcommands.is_empty() {
            if let Some(index) = command.child_index(arg) {
                state.path.push(index);
                let child = self.root.descend_mut(&state.path);
                child.set_active(true);
                debug!(command = %child.name, token = arg, "activated subcommand");
                return Ok(i + 1);
            }
            if self.config.pass_after_non_option {
                state.remaining.extend(args[i..].iter().cloned());
                return Ok(args.len());
            }
            return Err(Error::new(ErrorKind::UnknownCommand, format!("Unknown command `{arg}'")).into());
        }

        if self.config.pass_after_non_option {
            state.remaining.extend(args[i..].iter().cloned());
            return Ok(args.len());
        }
        if command.positional.is_empty() {
            state.remaining.push(arg.to_string());
            return Ok(i + 1);
        }
        Err(Error::new(
            ErrorKind::UnexpectedPositional,
            format!("unexpected argument `{arg}'"),
        )
        .into())
    }

    fn after_terminator(&mut self, state: &mut State, arg: &str) -> Step<()> {
        if !self.fill_slot(&state.path, arg)? {
            state.remaining.push(arg.to_string());
        }
        Ok(())
    }

    fn fill_slot(&mut self, path: &[usize], arg: &str) -> Step<bool> {
        let command = self.root.descend_mut(path);
        let Some(slot) = command.positional.iter_mut().find(|s| s.accepts_more()) else {
            return Ok(false);
        };
        slot.fill(arg).map_err(|detail| {
            Error::new(
                ErrorKind::InvalidValue,
                format!("invalid argument for `{}': {detail}", slot.name),
            )
        })?;
        trace!(slot = %slot.name, value = arg, "filled positional argument");
        Ok(true)
    }

    fn unknown(&self, state: &mut State, arg: &str, message: String) -> Step<()> {
        if self.config.ignore_unknown {
            trace!(token = arg, "passing unknown flag through");
            state.remaining.push(arg.to_string());
            return Ok(());
        }
        Err(Error::new(ErrorKind::UnknownFlag, message).into())
    }

    /// Looks `locate` up in the active command, then in each ancestor.
    fn lookup(&self, path: &[usize], locate: impl Fn(&Command) -> Option<OptionPath>) -> Option<Found> {
        let convention = self.config.convention;
        (0..=path.len()).rev().find_map(|depth| {
            let command = self.root.descend(&path[..depth]);
            let at = locate(command)?;
            let option = command.group.option_at(&at)?;
            let long = option.qualified_long(&command.group.prefix_at(&at));
            Some(Found {
                depth,
                label: option.label(long.as_deref(), convention.short_prefix(), convention.long_prefix()),
                takes_value: option.takes_value(),
                optional_value: option.optional_value.clone(),
                negative_ok: option.accepts_negative_numbers(),
                path: at,
            })
        })
    }

    fn take_value(&self, found: &Found, args: &[String], at: usize) -> Step<String> {
        let Some(next) = args.get(at) else {
            return Err(missing_value(found).into());
        };
        let option_like = !matches!(classify(next, self.config.convention), Token::Plain);
        if option_like && !(found.negative_ok && next.parse::<f64>().is_ok()) {
            return Err(Error::new(
                ErrorKind::MissingValue,
                format!("expected argument for flag `{}', but got option `{next}'", found.label),
            )
            .into());
        }
        Ok(next.clone())
    }

    fn bind(&mut self, path: &[usize], found: &Found, raw: Option<&str>) -> Step<()> {
        let command = self.root.descend_mut(&path[..found.depth]);
        let Some(option) = command.group.option_at_mut(&found.path) else {
            return Ok(());
        };
        option.bind(raw).map_err(|err| match err {
            AssignError::MissingValue => missing_value(found),
            AssignError::InvalidValue(detail) => Error::new(
                ErrorKind::InvalidValue,
                format!("invalid argument for flag `{}': {detail}", found.label),
            ),
        })?;
        trace!(flag = %found.label, value = raw.unwrap_or_default(), "bound option");
        Ok(())
    }

    /// Reports whether a help flag appears in `rest` before any `--`.
    ///
    /// Short clusters are scanned one character at a time, up to the first
    /// option that takes a value.
    fn help_follows(&self, path: &[usize], rest: &[String]) -> bool {
        if !self.config.help_flag {
            return false;
        }
        let convention = self.config.convention;
        for arg in rest {
            match classify(arg, convention) {
                Token::Terminator => return false,
                Token::Long { name, .. } if convention.is_help_long(name) => return true,
                Token::Short { cluster, .. } => {
                    for c in cluster.chars() {
                        if convention.is_help_short(c) {
                            return true;
                        }
                        let takes_value = self
                            .lookup(path, |cmd| cmd.group.locate_short(c))
                            .is_some_and(|found| found.takes_value);
                        if takes_value {
                            break;
                        }
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn help_requested(&self, state: &State) -> Error {
        let active = self.root.descend(&state.path);
        debug!(command = %active.name, "help requested");
        Error::new(ErrorKind::HelpRequested, self.help())
    }

    fn finish(&mut self, state: State) -> Result<Parsed> {
        let precedence = self.precedence();
        resolve_tree(&mut self.root, &*self.env, precedence)?;
        self.check_required()?;

        let commands: Vec<String> = self
            .root
            .active_chain()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        debug!(?commands, remaining = state.remaining.len(), "parse finished");
        Ok(Parsed {
            commands,
            remaining: state.remaining,
        })
    }

    fn check_required(&self) -> Result<()> {
        let convention = self.config.convention;
        let chain = self.root.active_chain();

        let mut flags = Vec::new();
        for command in &chain {
            for (option, long) in command.group.all_options() {
                if option.required && !option.is_set() {
                    let label = option.label(long.as_deref(), convention.short_prefix(), convention.long_prefix());
                    flags.push(format!("`{label}'"));
                }
            }
        }
        match flags.len() {
            0 => {}
            1 => {
                return Err(Error::new(
                    ErrorKind::RequiredMissing,
                    format!("the required flag {} was not specified", flags[0]),
                ));
            }
            _ => {
                return Err(Error::new(
                    ErrorKind::RequiredMissing,
                    format!("the required flags {} were not specified", join_list(&flags, "and")),
                ));
            }
        }

        let slots: Vec<String> = chain
            .iter()
            .flat_map(|c| c.positional.iter())
            .filter(|slot| slot.required && !slot.is_filled())
            .map(|slot| format!("`{}'", slot.name))
            .collect();
        match slots.len() {
            0 => {}
            1 => {
                return Err(Error::new(
                    ErrorKind::RequiredMissing,
                    format!("the required argument {} was not provided", slots[0]),
                ));
            }
            _ => {
                return Err(Error::new(
                    ErrorKind::RequiredMissing,
                    format!("the required arguments {} were not provided", join_list(&slots, "and")),
                ));
            }
        }

        if let Some(leaf) = chain.last() {
            let children = leaf.visible_subcommands();
            if leaf.required_subcommand && leaf.active_child().is_none() && !children.is_empty() {
                let message = match children.as_slice() {
                    [only] => format!("Please specify the {} command", only.name),
                    _ => {
                        let names: Vec<String> = children.iter().map(|c| c.name.clone()).collect();
                        format!("Please specify one command of: {}", join_list(&names, "or"))
                    }
                };
                return Err(Error::new(ErrorKind::CommandRequired, message));
            }
        }

        Ok(())
    }
}

/// Joins `a, b and c`.
fn join_list(items: &[String], word: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} {word} {last}", init.join(", ")),
    }
}

fn missing_value(found: &Found) -> Error {
    Error::new(
        ErrorKind::MissingValue,
        format!("expected argument for flag `{}'", found.label),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::command::Positional;
    use crate::group::Group;
    use crate::option::{OptionSpec, ScalarType, Value, ValueOrigin};

    fn parser(root: Command) -> OptionParser {
        OptionParser::new(root).unwrap().with_env(HashMap::new())
    }

    fn sample() -> Command {
        Command::new("prog")
            .with_option(OptionSpec::counter(Some('v'), Some("verbose")))
            .with_option(OptionSpec::scalar(Some('n'), Some("count"), ScalarType::Integer))
            .with_option(OptionSpec::scalar(Some('o'), Some("output"), ScalarType::String))
            .with_option(OptionSpec::flag(Some('q'), Some("quiet")))
            .with_group(
                Group::new("Subgroup")
                    .with_namespace("sip")
                    .with_option(OptionSpec::scalar(None, Some("opt"), ScalarType::String)),
            )
    }

    #[test]
    fn test_long_forms() {
        let mut p = parser(sample());
        p.parse(["--output=a", "--count", "3", "--sip.opt", "x", "--quiet=false"]).unwrap();
        let root = p.command();
        assert_eq!(root.value("output"), Some(&Value::String("a".into())));
        assert_eq!(root.value("count"), Some(&Value::Integer(3)));
        assert_eq!(root.value("sip.opt"), Some(&Value::String("x".into())));
        assert_eq!(root.value("quiet"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_short_clusters() {
        let mut p = parser(sample());
        p.parse(["-vvq", "-ofile", "-n=7"]).unwrap();
        let root = p.command();
        assert_eq!(root.value("v").and_then(Value::as_list).map(<[Value]>::len), Some(2));
        assert_eq!(root.value("q"), Some(&Value::Bool(true)));
        assert_eq!(root.value("o"), Some(&Value::String("file".into())));
        assert_eq!(root.value("n"), Some(&Value::Integer(7)));
    }

    #[test]
    fn test_negative_number_is_a_value_for_numeric_options() {
        let mut p = parser(sample());
        p.parse(["-n", "-5"]).unwrap();
        assert_eq!(p.command().value("count"), Some(&Value::Integer(-5)));

        let err = p.parse(["--output", "-q"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingValue);
        assert_eq!(
            err.message,
            "expected argument for flag `-o, --output', but got option `-q'"
        );
    }

    #[test]
    fn test_error_kinds_and_messages() {
        let mut p = parser(sample());

        let err = p.parse(["--bogus"]).unwrap_err();
        assert_eq!((err.kind, err.message.as_str()), (ErrorKind::UnknownFlag, "unknown flag `bogus'"));

        let err = p.parse(["-vx"]).unwrap_err();
        assert_eq!((err.kind, err.message.as_str()), (ErrorKind::UnknownFlag, "unknown flag `x'"));

        let err = p.parse(["--count"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingValue);
        assert_eq!(err.message, "expected argument for flag `-n, --count'");

        let err = p.parse(["--count=abc"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidValue);
        assert_eq!(
            err.message,
            "invalid argument for flag `-n, --count': expected int, got `abc'"
        );
    }

    #[test]
    fn test_overflow_without_slots_goes_to_remaining() {
        let mut p = parser(sample());
        let parsed = p.parse(["a", "-q", "b", "--", "-v", "--count"]).unwrap();
        assert_eq!(parsed.remaining, vec!["a", "b", "-v", "--count"]);
        assert_eq!(p.command().value("verbose"), None);
    }

    #[test]
    fn test_slots_then_unexpected_positional() {
        let root = Command::new("prog")
            .with_positional(Positional::new("src"))
            .with_positional(Positional::new("num").with_type(ScalarType::Integer));
        let mut p = parser(root);

        p.parse(["a.txt", "4"]).unwrap();
        assert_eq!(p.command().positional_value("num"), Some(&Value::Integer(4)));

        let err = p.parse(["a.txt", "4", "extra"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedPositional);
        assert_eq!(err.message, "unexpected argument `extra'");

        let err = p.parse(["a.txt", "four"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidValue);
    }

    #[test]
    fn test_terminator_fills_slots_then_remaining() {
        let root = Command::new("prog")
            .with_option(OptionSpec::flag(Some('q'), None))
            .with_positional(Positional::new("first"));
        let mut p = parser(root);
        let parsed = p.parse(["--", "-q", "-x"]).unwrap();
        assert_eq!(p.command().positional_value("first"), Some(&Value::String("-q".into())));
        assert_eq!(parsed.remaining, vec!["-x"]);
        assert_eq!(p.command().value("q"), None);
    }

    #[test]
    fn test_rest_slot_absorbs_everything() {
        let root = Command::new("prog")
            .with_option(OptionSpec::flag(Some('q'), None))
            .with_positional(Positional::rest("files"))
            .with_subcommand(Command::new("run"));
        let mut p = parser(root);
        let parsed = p.parse(["a", "run", "-q", "b"]).unwrap();
        assert_eq!(parsed.commands, vec!["prog"]);
        assert_eq!(
            p.command().positional_value("files"),
            Some(&Value::List(vec![
                Value::String("a".into()),
                Value::String("run".into()),
                Value::String("b".into()),
            ]))
        );
        assert_eq!(p.command().value("q"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_subcommands_and_parent_flags() {
        let root = sample().with_subcommand(
            Command::new("remote")
                .with_alias("rm")
                .with_option(OptionSpec::flag(Some('f'), Some("force"))),
        );
        let mut p = parser(root);

        let parsed = p.parse(["rm", "-fq"]).unwrap();
        assert_eq!(parsed.commands, vec!["prog", "remote"]);
        let root = p.command();
        assert!(root.find_child("remote").unwrap().is_active());
        assert_eq!(root.find_child("remote").unwrap().value("force"), Some(&Value::Bool(true)));
        assert_eq!(root.value("quiet"), Some(&Value::Bool(true)));

        // Child flags are not visible from the parent.
        let err = p.parse(["--force", "remote"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownFlag);

        let err = p.parse(["nope"]).unwrap_err();
        assert_eq!((err.kind, err.message.as_str()), (ErrorKind::UnknownCommand, "Unknown command `nope'"));
    }

    #[test]
    fn test_required_checks() {
        let root = Command::new("prog")
            .with_option(OptionSpec::scalar(Some('a'), Some("alpha"), ScalarType::String).required())
            .with_option(OptionSpec::scalar(None, Some("beta"), ScalarType::String).required())
            .with_option(
                OptionSpec::scalar(None, Some("gamma"), ScalarType::String)
                    .required()
                    .with_default("g"),
            )
            .with_positional(Positional::new("file").required());
        let mut p = parser(root);

        let err = p.parse(Vec::<String>::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RequiredMissing);
        assert_eq!(
            err.message,
            "the required flags `-a, --alpha' and `--beta' were not specified"
        );

        let err = p.parse(["-a", "x", "--beta", "y"]).unwrap_err();
        assert_eq!(err.message, "the required argument `file' was not provided");

        p.parse(["-a", "x", "--beta", "y", "f"]).unwrap();
    }

    #[test]
    fn test_inactive_subcommands_receive_defaults() {
        let root = Command::new("prog")
            .with_option(OptionSpec::flag(Some('q'), Some("quiet")))
            .with_subcommand(
                Command::new("run")
                    .with_option(OptionSpec::scalar(None, Some("lvl"), ScalarType::String).with_default("d"))
                    .with_option(OptionSpec::scalar(None, Some("target"), ScalarType::String).required()),
            );
        let mut p = parser(root);

        let parsed = p.parse(Vec::<String>::new()).unwrap();
        assert_eq!(parsed.commands, vec!["prog".to_string()]);
        let run = p.command().find_child("run").unwrap();
        assert!(!run.is_active());
        assert_eq!(run.value("lvl"), Some(&Value::String("d".into())));
        assert_eq!(run.value("target"), None);

        let err = p.parse(["run"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RequiredMissing);
    }

    #[test]
    fn test_required_subcommand() {
        let root = Command::new("prog")
            .require_subcommand()
            .with_subcommand(Command::new("b"))
            .with_subcommand(Command::new("a"));
        let mut p = parser(root);
        let err = p.parse(Vec::<String>::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CommandRequired);
        assert_eq!(err.message, "Please specify one command of: a or b");
        assert!(p.parse(["a"]).is_ok());
    }

    #[test]
    fn test_help_wins_over_earlier_error() {
        let mut p = parser(sample());
        let err = p.parse(["--bogus", "-h"]).unwrap_err();
        assert!(err.is_help());

        let err = p.parse(["--bogus", "--", "-h"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownFlag);
    }

    #[test]
    fn test_help_inside_short_cluster_wins_over_earlier_error() {
        let mut p = parser(sample());
        assert!(p.parse(["--bogus", "-vh"]).unwrap_err().is_help());
        assert!(p.parse(["--count", "abc", "-qvh"]).unwrap_err().is_help());

        // `-oh` gives `h` to --output as its value.
        let err = p.parse(["--bogus", "-oh"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownFlag);
        assert_eq!(err.message, "unknown flag `bogus'");
    }

    #[test]
    fn test_windows_convention() {
        let config = ParserConfig {
            convention: Convention::Windows,
            ..ParserConfig::default()
        };
        let mut p = OptionParser::with_config(sample(), config)
            .unwrap()
            .with_env(HashMap::new());

        p.parse(["/v", "/output:x", "/n:4", "--quiet"]).unwrap();
        let root = p.command();
        assert_eq!(root.value("output"), Some(&Value::String("x".into())));
        assert_eq!(root.value("count"), Some(&Value::Integer(4)));
        assert_eq!(root.value("quiet"), Some(&Value::Bool(true)));

        for help in ["/?", "/h", "/help", "-?"] {
            assert!(p.parse([help]).unwrap_err().is_help(), "{help}");
        }

        let err = p.parse(["/bogus"]).unwrap_err();
        assert_eq!(err.message, "unknown flag `bogus'");
    }

    #[test]
    fn test_windows_single_character_long_names() {
        let config = ParserConfig {
            convention: Convention::Windows,
            ..ParserConfig::default()
        };
        let root = Command::new("prog")
            .with_option(OptionSpec::scalar(None, Some("x"), ScalarType::String))
            .with_option(OptionSpec::flag(Some('y'), Some("yes")))
            .with_option(OptionSpec::flag(None, Some("y")));
        let mut p = OptionParser::with_config(root, config)
            .unwrap()
            .with_env(HashMap::new());

        p.parse(["/x:val"]).unwrap();
        assert_eq!(p.command().value("x"), Some(&Value::String("val".into())));

        p.parse(["/x", "other"]).unwrap();
        assert_eq!(p.command().value("x"), Some(&Value::String("other".into())));

        // A short name still takes priority over a one-character long name.
        p.parse(["/y"]).unwrap();
        assert_eq!(p.command().value("yes"), Some(&Value::Bool(true)));
        assert_eq!(p.command().value("y"), None);

        let err = p.parse(["/z"]).unwrap_err();
        assert_eq!(err.message, "unknown flag `z'");
    }

    #[test]
    fn test_ignore_unknown_and_pass_after_non_option() {
        let config = ParserConfig {
            ignore_unknown: true,
            ..ParserConfig::default()
        };
        let mut p = OptionParser::with_config(sample(), config).unwrap().with_env(HashMap::new());
        let parsed = p.parse(["--bogus", "-q"]).unwrap();
        assert_eq!(parsed.remaining, vec!["--bogus"]);

        let config = ParserConfig {
            pass_after_non_option: true,
            ..ParserConfig::default()
        };
        let mut p = OptionParser::with_config(sample(), config).unwrap().with_env(HashMap::new());
        let parsed = p.parse(["-q", "cmd", "-v", "--bogus"]).unwrap();
        assert_eq!(parsed.remaining, vec!["cmd", "-v", "--bogus"]);
        assert_eq!(p.command().value("verbose"), None);
    }

    #[test]
    fn test_pass_double_dash_off_keeps_terminator() {
        let config = ParserConfig {
            pass_double_dash: false,
            ..ParserConfig::default()
        };
        let mut p = OptionParser::with_config(sample(), config).unwrap().with_env(HashMap::new());
        let parsed = p.parse(["--", "-q"]).unwrap();
        assert_eq!(parsed.remaining, vec!["--", "-q"]);
    }

    #[test]
    fn test_optional_value_and_choices() {
        let root = Command::new("prog").with_option(
            OptionSpec::scalar(None, Some("color"), ScalarType::String)
                .with_optional_value("auto")
                .with_choices(&["auto", "always", "never"]),
        );
        let mut p = parser(root);

        p.parse(["--color"]).unwrap();
        assert_eq!(p.command().value("color"), Some(&Value::String("auto".into())));

        p.parse(["--color=never"]).unwrap();
        assert_eq!(p.command().value("color"), Some(&Value::String("never".into())));

        let err = p.parse(["--color=sometimes"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidValue);
        assert_eq!(
            err.message,
            "invalid argument for flag `--color': `sometimes' is not one of: auto, always, never"
        );
    }

    #[test]
    fn test_reparse_starts_clean() {
        let mut p = parser(sample().with_subcommand(Command::new("run")));
        p.parse(["-q", "run"]).unwrap();
        let parsed = p.parse(Vec::<String>::new()).unwrap();
        assert_eq!(parsed.commands, vec!["prog"]);
        assert_eq!(p.command().value("quiet"), None);
        assert!(!p.command().find_child("run").unwrap().is_active());
    }

    #[test]
    fn test_env_injection_and_precedence() {
        let root = Command::new("prog").with_option(
            OptionSpec::scalar(None, Some("level"), ScalarType::String)
                .with_default("info")
                .with_env("LEVEL"),
        );
        let env = HashMap::from([("LEVEL".to_string(), "debug".to_string())]);

        let mut p = OptionParser::new(root).unwrap().with_env(env.clone());
        p.parse(Vec::<String>::new()).unwrap();
        assert_eq!(p.command().value("level"), Some(&Value::String("info".into())));
        assert_eq!(
            p.command().resolve_long("level").and_then(OptionSpec::origin),
            Some(ValueOrigin::Default)
        );

        let config = ParserConfig {
            env_overrides_defaults: true,
            ..ParserConfig::default()
        };
        let mut p = OptionParser::with_config(p.into_command(), config).unwrap().with_env(env);
        p.parse(Vec::<String>::new()).unwrap();
        assert_eq!(p.command().value("level"), Some(&Value::String("debug".into())));
    }

    #[test]
    fn test_help_collision_rejected() {
        let root = Command::new("prog").with_option(OptionSpec::flag(None, Some("help")));
        assert!(matches!(
            OptionParser::new(root),
            Err(SchemaError::ReservedHelpName { .. })
        ));
    }

    #[test]
    fn test_join_list() {
        let items = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(join_list(&items(&["a"]), "or"), "a");
        assert_eq!(join_list(&items(&["a", "b", "c"]), "or"), "a, b or c");
    }
}
