//! Usage and help text rendering.
//!
//! Rendering reads the activation markers left by the last parse: the usage
//! line, option sections and argument listings cover the root and every
//! active subcommand, and the command listing shows the children of the
//! deepest active command.

use crate::command::Command;
use crate::group::Group;
use crate::option::OptionSpec;
use crate::parser::{Convention, ParserConfig};

const PADDING_BEFORE_OPTION: usize = 2;
const DISTANCE_BEFORE_DESCRIPTION: usize = 2;
const SUBCOMMAND_INDENT: usize = 4;
const HELP_DESCRIPTION: &str = "Show this help message";

/// Presentation settings shared with the parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpStyle {
    pub convention: Convention,
    /// Whether the built-in help flag is listed.
    pub help_flag: bool,
}

impl Default for HelpStyle {
    fn default() -> Self {
        Self {
            convention: Convention::Posix,
            help_flag: true,
        }
    }
}

impl From<&ParserConfig> for HelpStyle {
    fn from(config: &ParserConfig) -> Self {
        Self {
            convention: config.convention,
            help_flag: config.help_flag,
        }
    }
}

impl HelpStyle {
    fn help_options(&self) -> Vec<OptionSpec> {
        if !self.help_flag {
            return Vec::new();
        }
        let mut options = Vec::new();
        if self.convention == Convention::Windows {
            options.push(OptionSpec::flag(Some('?'), None).with_description(HELP_DESCRIPTION));
        }
        options.push(OptionSpec::flag(Some('h'), Some("help")).with_description(HELP_DESCRIPTION));
        options
    }
}

#[derive(Debug, Default)]
struct Alignment {
    max_len: usize,
    has_short: bool,
    has_value_name: bool,
}

impl Alignment {
    fn measure(chain: &[&Command], style: &HelpStyle) -> Self {
        let mut align = Self::default();
        let help_options = style.help_options();
        for (depth, command) in chain.iter().enumerate() {
            let indented = depth > 0;
            for (group, prefix) in command.group.visible_groups() {
                for option in group.options.iter().filter(|o| !o.hidden) {
                    align.record_option(option, option.qualified_long(&prefix), indented);
                }
            }
            for option in &help_options {
                align.record_option(option, option.long.clone(), indented);
            }
            for slot in &command.positional {
                align.record(slot.name.chars().count(), indented);
            }
        }
        align
    }

    fn record_option(&mut self, option: &OptionSpec, long: Option<String>, indented: bool) {
        if option.short.is_some() {
            self.has_short = true;
        }
        if option.value_name.as_deref().is_some_and(|n| !n.is_empty()) {
            self.has_value_name = true;
        }
        let mut len = long.map_or(0, |l| l.chars().count());
        len += option.value_name.as_deref().map_or(0, |n| n.chars().count());
        if !option.choices.is_empty() {
            len += choices_text(option).chars().count();
        }
        self.record(len, indented);
    }

    fn record(&mut self, len: usize, indented: bool) {
        let len = if indented { len + SUBCOMMAND_INDENT } else { len };
        self.max_len = self.max_len.max(len);
    }

    fn description_start(&self) -> usize {
        let mut start = self.max_len + DISTANCE_BEFORE_DESCRIPTION;
        if self.has_short {
            start += 2;
        }
        if self.max_len > 0 {
            start += 4;
        }
        if self.has_value_name {
            start += 3;
        }
        start + PADDING_BEFORE_OPTION
    }
}

/// Renders the usage line (without the `Usage:` header) for the active chain.
pub fn render_usage(root: &Command, style: &HelpStyle) -> String {
    let chain = root.active_chain();
    let last = chain.len() - 1;
    let mut line = String::new();

    for (depth, command) in chain.iter().enumerate() {
        if depth > 0 {
            line.push(' ');
        }
        line.push_str(&command.name);

        let tag = match command.usage.as_deref() {
            Some(usage) => Some(usage.to_string()),
            None if depth == 0 && (style.help_flag || command.has_visible_options()) => {
                Some("[OPTIONS]".to_string())
            }
            None if depth > 0 && command.has_visible_options() => {
                Some(format!("[{}-OPTIONS]", command.name))
            }
            None => None,
        };
        if let Some(tag) = tag {
            line.push(' ');
            line.push_str(&tag);
        }

        for slot in &command.positional {
            line.push(' ');
            line.push_str(&slot.usage());
        }

        if depth == last && !command.visible_subcommands().is_empty() {
            line.push_str(" <command>");
        }
    }

    line
}

/// Renders the full help text for the active chain of `root`.
///
/// # Examples
///
/// ```
/// use flagtree_core::{Command, HelpStyle, OptionSpec, render_help};
///
/// let root = Command::new("prog")
///     .with_option(OptionSpec::flag(Some('v'), Some("verbose")).with_description("Be loud"));
///
/// let help = render_help(&root, &HelpStyle::default());
/// assert!(help.starts_with("Usage:\n  prog [OPTIONS]\n"));
/// assert!(help.contains("  -v, --verbose  Be loud\n"));
/// ```
pub fn render_help(root: &Command, style: &HelpStyle) -> String {
    let chain = root.active_chain();
    let align = Alignment::measure(&chain, style);
    let mut out = String::new();

    out.push_str("Usage:\n  ");
    out.push_str(&render_usage(root, style));
    out.push('\n');

    if let Some(desc) = chain.last().and_then(|c| c.long_description.as_deref()) {
        out.push('\n');
        out.push_str(desc);
        out.push('\n');
    }

    for (depth, command) in chain.iter().enumerate() {
        let indented = depth > 0;
        let mut announced = false;

        for (i, (group, prefix)) in command.group.visible_groups().into_iter().enumerate() {
            let options: Vec<&OptionSpec> = group.options.iter().filter(|o| !o.hidden).collect();
            if options.is_empty() {
                continue;
            }
            if indented && !announced {
                out.push_str(&format!("\n[{} command options]\n", command.name));
                announced = true;
            }
            write_heading(&mut out, group, indented && i == 0, indented);
            for option in options {
                let long = option.qualified_long(&prefix);
                write_option(&mut out, option, long.as_deref(), &align, indented, style);
            }
        }

        if depth == 0 && style.help_flag {
            out.push_str("\nHelp Options:\n");
            for option in style.help_options() {
                write_option(&mut out, &option, option.long.as_deref(), &align, false, style);
            }
        }
    }

    let start = align.description_start();
    for (depth, command) in chain.iter().enumerate() {
        if command.positional.is_empty() {
            continue;
        }
        if depth == 0 {
            out.push_str("\nArguments:\n");
        } else {
            out.push_str(&format!("\n[{} command arguments]\n", command.name));
        }
        for slot in &command.positional {
            let mut line = " ".repeat(PADDING_BEFORE_OPTION);
            line.push_str(&slot.name);
            if let Some(desc) = slot.description.as_deref().filter(|d| !d.is_empty()) {
                line.push(':');
                pad_to(&mut line, start);
                line.push_str(desc);
            }
            out.push_str(&line);
            out.push('\n');
        }
    }

    if let Some(leaf) = chain.last() {
        let children = leaf.visible_subcommands();
        if !children.is_empty() {
            out.push_str("\nAvailable commands:\n");
            let width = children.iter().map(|c| c.name.chars().count()).max().unwrap_or(0);
            for child in children {
                out.push_str("  ");
                out.push_str(&child.name);
                if let Some(desc) = child.short_description.as_deref().filter(|d| !d.is_empty()) {
                    pad_to_width(&mut out, width - child.name.chars().count());
                    out.push_str("  ");
                    out.push_str(desc);
                    if !child.aliases.is_empty() {
                        out.push_str(&format!(" (aliases: {})", child.aliases.join(", ")));
                    }
                }
                out.push('\n');
            }
        }
    }

    out
}

fn write_heading(out: &mut String, group: &Group, untitled: bool, indented: bool) {
    if untitled || group.heading.is_empty() {
        return;
    }
    out.push('\n');
    if indented {
        out.push_str(&" ".repeat(SUBCOMMAND_INDENT));
    }
    out.push_str(&group.heading);
    out.push_str(":\n");
}

fn write_option(
    out: &mut String,
    option: &OptionSpec,
    long: Option<&str>,
    align: &Alignment,
    indented: bool,
    style: &HelpStyle,
) {
    let convention = style.convention;
    let mut line = " ".repeat(PADDING_BEFORE_OPTION);
    if indented {
        line.push_str(&" ".repeat(SUBCOMMAND_INDENT));
    }

    match option.short {
        Some(short) => {
            line.push_str(convention.short_prefix());
            line.push(short);
        }
        None if align.has_short => line.push_str("  "),
        None => {}
    }

    if let Some(long) = long {
        if option.short.is_some() {
            line.push_str(", ");
        } else if align.has_short {
            line.push_str("  ");
        }
        line.push_str(convention.long_prefix());
        line.push_str(long);
    }

    if option.takes_value() {
        line.push(convention.value_separator());
        if let Some(name) = option.value_name.as_deref() {
            line.push_str(name);
        }
        if !option.choices.is_empty() {
            line.push_str(&choices_text(option));
        }
    }

    let desc = description_text(option);
    if !desc.is_empty() {
        let start = align.description_start();
        pad_to(&mut line, start);
        let continuation = format!("\n{}", " ".repeat(start));
        line.push_str(&desc.replace('\n', &continuation));
    }

    out.push_str(&line);
    out.push('\n');
}

fn description_text(option: &OptionSpec) -> String {
    let mut text = option.description.clone().unwrap_or_default();
    if text.is_empty() {
        return text;
    }
    if !option.defaults.is_empty() {
        text.push_str(&format!(" ({})", option.defaults.join(", ")));
    }
    if !option.env.is_empty() {
        text.push_str(&format!(" [{}]", option.env.join(", ")));
    }
    text
}

fn choices_text(option: &OptionSpec) -> String {
    format!("[{}]", option.choices.join("|"))
}

fn pad_to(line: &mut String, column: usize) {
    let width = line.chars().count();
    pad_to_width(line, column.saturating_sub(width));
}

fn pad_to_width(line: &mut String, count: usize) {
    line.extend(std::iter::repeat_n(' ', count));
}
