//! Command nodes and positional slots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::group::Group;
use crate::option::{OptionSpec, ScalarType, Value};

/// Heading of a command's own top-level group unless overridden.
pub const DEFAULT_HEADING: &str = "Application Options";

/// How many tokens a positional slot takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Multiplicity {
    /// Exactly one token.
    #[default]
    One,
    /// Every remaining non-flag token. Only valid on the last slot.
    Rest,
}

/// A named positional argument.
#[derive(Debug, Clone)]
pub struct Positional {
    pub name: String,
    pub description: Option<String>,
    pub value_type: ScalarType,
    pub multiplicity: Multiplicity,
    pub required: bool,
    value: Option<Value>,
}

impl Positional {
    /// A single-token string slot.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            value_type: ScalarType::String,
            multiplicity: Multiplicity::One,
            required: false,
            value: None,
        }
    }

    /// A slot collecting every remaining token into a list.
    pub fn rest(name: &str) -> Self {
        Self {
            multiplicity: Multiplicity::Rest,
            ..Self::new(name)
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn with_type(mut self, value_type: ScalarType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn is_filled(&self) -> bool {
        self.value.is_some()
    }

    pub(crate) fn accepts_more(&self) -> bool {
        self.multiplicity == Multiplicity::Rest || self.value.is_none()
    }

    pub(crate) fn fill(&mut self, raw: &str) -> Result<(), String> {
        let value = self.value_type.parse(raw)?;
        match self.multiplicity {
            Multiplicity::One => self.value = Some(value),
            Multiplicity::Rest => match &mut self.value {
                Some(Value::List(items)) => items.push(value),
                _ => self.value = Some(Value::List(vec![value])),
            },
        }
        Ok(())
    }

    /// Usage-line form: `name`, `[name]`, `name ...` or `[name ...]`.
    pub fn usage(&self) -> String {
        let name = match self.multiplicity {
            Multiplicity::One => self.name.clone(),
            Multiplicity::Rest => format!("{} ...", self.name),
        };
        if self.required {
            name
        } else {
            format!("[{name}]")
        }
    }
}

/// An invocable node in the command tree.
///
/// # Examples
///
/// ```
/// use flagtree_core::{Command, OptionSpec, Positional};
///
/// let root = Command::new("git")
///     .with_option(OptionSpec::flag(Some('v'), Some("verbose")))
///     .with_subcommand(
///         Command::new("clone")
///             .with_alias("cl")
///             .with_description("Clone a repository")
///             .with_positional(Positional::new("url").required()),
///     );
///
/// assert!(root.resolve_short('v').is_some());
/// assert_eq!(root.find_child("cl").map(|c| c.name.as_str()), Some("clone"));
/// ```
#[derive(Debug)]
pub struct Command {
    pub name: String,
    pub aliases: Vec<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    /// Replaces the `[OPTIONS]` tag in the usage line.
    pub usage: Option<String>,
    pub hidden: bool,
    /// Fails the parse if no child command gets activated.
    pub required_subcommand: bool,
    pub group: Group,
    pub positional: Vec<Positional>,
    pub subcommands: Vec<Command>,
    active: bool,
}

impl Command {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            short_description: None,
            long_description: None,
            usage: None,
            hidden: false,
            required_subcommand: false,
            group: Group::new(DEFAULT_HEADING),
            positional: Vec::new(),
            subcommands: Vec::new(),
            active: false,
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// Sets the one-line description shown in command listings.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.short_description = Some(desc.to_string());
        self
    }

    pub fn with_long_description(mut self, desc: &str) -> Self {
        self.long_description = Some(desc.to_string());
        self
    }

    pub fn with_usage(mut self, usage: &str) -> Self {
        self.usage = Some(usage.to_string());
        self
    }

    pub fn with_heading(mut self, heading: &str) -> Self {
        self.group.heading = heading.to_string();
        self
    }

    pub fn with_option(mut self, option: OptionSpec) -> Self {
        self.group.options.push(option);
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.group.groups.push(group);
        self
    }

    pub fn with_positional(mut self, slot: Positional) -> Self {
        self.positional.push(slot);
        self
    }

    pub fn with_subcommand(mut self, command: Command) -> Self {
        self.subcommands.push(command);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn require_subcommand(mut self) -> Self {
        self.required_subcommand = true;
        self
    }

    /// Whether `name` is this command's name or one of its aliases.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }

    /// Finds a direct child by exact name or alias.
    pub fn find_child(&self, name: &str) -> Option<&Command> {
        self.subcommands.iter().find(|c| c.answers_to(name))
    }

    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut Command> {
        self.subcommands.iter_mut().find(|c| c.answers_to(name))
    }

    pub(crate) fn child_index(&self, name: &str) -> Option<usize> {
        self.subcommands.iter().position(|c| c.answers_to(name))
    }

    /// Finds an option of this command by fully-qualified long name.
    pub fn resolve_long(&self, qualified: &str) -> Option<&OptionSpec> {
        let path = self.group.locate_long(qualified)?;
        self.group.option_at(&path)
    }

    /// Finds an option of this command by short name.
    pub fn resolve_short(&self, short: char) -> Option<&OptionSpec> {
        let path = self.group.locate_short(short)?;
        self.group.option_at(&path)
    }

    /// Bound value of an option, looked up by qualified long name or, for a
    /// single character, by short name.
    pub fn value(&self, name: &str) -> Option<&Value> {
        let mut chars = name.chars();
        let option = match (chars.next(), chars.next()) {
            (Some(c), None) => self.resolve_short(c).or_else(|| self.resolve_long(name)),
            _ => self.resolve_long(name),
        };
        option.and_then(OptionSpec::value)
    }

    pub fn positional_value(&self, name: &str) -> Option<&Value> {
        self.positional
            .iter()
            .find(|slot| slot.name == name)
            .and_then(Positional::value)
    }

    /// Whether the most recent parse activated this command.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn active_child(&self) -> Option<&Command> {
        self.subcommands.iter().find(|c| c.active)
    }

    /// This command followed by each active descendant.
    pub fn active_chain(&self) -> Vec<&Command> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(child) = current.active_child() {
            chain.push(child);
            current = child;
        }
        chain
    }

    pub fn has_visible_options(&self) -> bool {
        self.group.has_visible_options()
    }

    /// Non-hidden children ordered by name.
    pub fn visible_subcommands(&self) -> Vec<&Command> {
        let mut children: Vec<&Command> = self.subcommands.iter().filter(|c| !c.hidden).collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children
    }

    /// Values bound to this command's options, keyed by qualified long name
    /// (or the short name for short-only options).
    pub fn bound_values(&self) -> BTreeMap<String, Value> {
        self.group
            .all_options()
            .into_iter()
            .filter_map(|(option, long)| {
                let value = option.value()?.clone();
                let key = long.or_else(|| option.short.map(String::from))?;
                Some((key, value))
            })
            .collect()
    }

    /// Values bound to this command's positional slots, keyed by slot name.
    pub fn positional_values(&self) -> BTreeMap<String, Value> {
        self.positional
            .iter()
            .filter_map(|slot| Some((slot.name.clone(), slot.value()?.clone())))
            .collect()
    }

    pub(crate) fn descend(&self, path: &[usize]) -> &Command {
        let mut command = self;
        for &i in path {
            match command.subcommands.get(i) {
                Some(child) => command = child,
                None => break,
            }
        }
        command
    }

    pub(crate) fn descend_mut(&mut self, path: &[usize]) -> &mut Command {
        let mut command = self;
        for &i in path {
            if i >= command.subcommands.len() {
                break;
            }
            command = &mut command.subcommands[i];
        }
        command
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Clears activation and every bound value in the whole tree.
    pub(crate) fn reset(&mut self) {
        self.active = false;
        self.group.for_each_option_mut(&mut OptionSpec::reset);
        for slot in &mut self.positional {
            slot.value = None;
        }
        for child in &mut self.subcommands {
            child.reset();
        }
    }
}
