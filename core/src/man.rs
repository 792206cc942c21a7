//! roff man page rendering.

use chrono::{Local, NaiveDate};

use crate::command::Command;
use crate::option::OptionSpec;

/// Renders a section 1 man page for `root`, dated `date`.
pub fn render_man_page(root: &Command, date: NaiveDate) -> String {
    let mut out = String::new();
    let name = man_quote(&root.name);

    out.push_str(&format!(".TH {name} 1 \"{}\"\n", date.format("%-d %B %Y")));
    out.push_str(".SH NAME\n");
    out.push_str(&format!(
        "{name} \\- {}\n",
        man_quote(root.short_description.as_deref().unwrap_or_default())
    ));
    out.push_str(".SH SYNOPSIS\n");
    let usage = root.usage.as_deref().unwrap_or("[OPTIONS]");
    out.push_str(&format!("\\fB{name}\\fP {}\n", man_quote(usage)));
    out.push_str(".SH DESCRIPTION\n");
    out.push_str(&format_for_man(root.long_description.as_deref().unwrap_or_default()));
    out.push('\n');
    out.push_str(".SH OPTIONS\n");
    write_options(&mut out, root);

    if !root.visible_subcommands().is_empty() {
        out.push_str(".SH COMMANDS\n");
        write_subcommands(&mut out, &name, "", root);
    }

    out
}

/// Renders a man page dated today in local time.
pub fn render_man_page_today(root: &Command) -> String {
    render_man_page(root, Local::now().date_naive())
}

fn write_options(out: &mut String, command: &Command) {
    for (group, prefix) in command.group.visible_groups() {
        for option in group.options.iter().filter(|o| !o.hidden) {
            write_option(out, option, option.qualified_long(&prefix).as_deref());
        }
    }
}

fn write_option(out: &mut String, option: &OptionSpec, long: Option<&str>) {
    out.push_str(".TP\n\\fB");
    if let Some(short) = option.short {
        out.push('-');
        out.push_str(&man_quote(&short.to_string()));
        if long.is_some() {
            out.push_str(", ");
        }
    }
    if let Some(long) = long {
        out.push_str("--");
        out.push_str(&man_quote(long));
    }
    out.push_str("\\fP\n");
    if let Some(desc) = option.description.as_deref().filter(|d| !d.is_empty()) {
        out.push_str(&format_for_man(desc));
        out.push('\n');
    }
}

fn write_subcommands(out: &mut String, program: &str, parent: &str, command: &Command) {
    for child in command.visible_subcommands() {
        let name = if parent.is_empty() {
            man_quote(&child.name)
        } else {
            format!("{parent} {}", man_quote(&child.name))
        };

        out.push_str(&format!(".SS {name}\n"));
        out.push_str(&man_quote(child.short_description.as_deref().unwrap_or_default()));
        out.push('\n');

        if let Some(long) = child.long_description.as_deref().filter(|d| !d.is_empty()) {
            out.push('\n');
            out.push_str(&format_for_man(long));
            out.push('\n');
        }

        let mut usage = format!("{program} [OPTIONS] {name}");
        match child.usage.as_deref() {
            Some(custom) => {
                usage.push(' ');
                usage.push_str(&man_quote(custom));
            }
            None if child.has_visible_options() => {
                usage.push_str(&format!(" [{}-OPTIONS]", man_quote(&child.name)));
            }
            None => {}
        }
        out.push_str(&format!("\n\\fBUsage\\fP: {usage}\n\n"));

        if !child.aliases.is_empty() {
            out.push_str(&format!("\n\\fBAliases\\fP: {}\n\n", man_quote(&child.aliases.join(", "))));
        }

        write_options(out, child);
        write_subcommands(out, program, &name, child);
    }
}

fn man_quote(s: &str) -> String {
    s.replace('\\', "\\\\")
}

/// Quotes `s` and turns `` `word' `` spans into bold.
fn format_for_man(s: &str) -> String {
    let mut out = String::new();
    let mut rest = s;
    while let Some(open) = rest.find('`') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('\'') else {
            break;
        };
        out.push_str(&man_quote(&rest[..open]));
        out.push_str("\\fB");
        out.push_str(&man_quote(&after[..close]));
        out.push_str("\\fP");
        rest = &after[close + 1..];
    }
    out.push_str(&man_quote(rest));
    out
}
