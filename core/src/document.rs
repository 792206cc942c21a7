//! Declarative schema documents.
//!
//! A [`SchemaDocument`] describes a command tree and the parser settings in
//! YAML or JSON, for tools that cannot use the builder API. Callback options
//! have no document form.
//!
//! # Example YAML
//!
//! ```yaml
//! name: deploy
//! description: Deploy a service
//! parser:
//!   convention: posix
//! options:
//!   - short: v
//!     long: verbose
//!     type: bool
//!     collection: sequence
//!     description: Show verbose output
//!   - long: region
//!     default: [eu-west-1]
//!     env: [DEPLOY_REGION]
//! groups:
//!   - heading: Network
//!     namespace: net
//!     options:
//!       - long: port
//!         type: integer
//! positional:
//!   - name: service
//!     required: true
//! commands:
//!   - name: rollback
//!     aliases: [rb]
//!     description: Roll back the last deploy
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::{Command, DEFAULT_HEADING, Multiplicity, Positional};
use crate::group::Group;
use crate::option::{OptionSpec, ScalarType, ValueKind};
use crate::parser::{OptionParser, ParserConfig};
use crate::validate::SchemaError;

/// Errors raised while loading a schema document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),
}

pub type Result<T> = std::result::Result<T, DocumentError>;

/// Parser settings section of a document.
pub type ParserDocument = ParserConfig;

/// How repeated occurrences of an option are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    #[default]
    Scalar,
    Sequence,
    Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionDocument {
    pub short: Option<char>,
    pub long: Option<String>,
    #[serde(rename = "type")]
    pub value_type: ScalarType,
    pub collection: Collection,
    pub description: Option<String>,
    pub value_name: Option<String>,
    pub required: bool,
    pub hidden: bool,
    pub default: Vec<String>,
    pub env: Vec<String>,
    pub env_delimiter: Option<String>,
    pub choices: Vec<String>,
    pub optional_value: Option<String>,
}

impl OptionDocument {
    pub fn into_option(self) -> OptionSpec {
        let kind = match self.collection {
            Collection::Scalar => ValueKind::Scalar(self.value_type),
            Collection::Sequence => ValueKind::Sequence(self.value_type),
            Collection::Mapping => ValueKind::Mapping(self.value_type),
        };
        let mut option = OptionSpec::flag(self.short, self.long.as_deref());
        option.kind = kind;
        option.description = self.description;
        option.value_name = self.value_name;
        option.required = self.required;
        option.hidden = self.hidden;
        option.defaults = self.default;
        option.env = self.env;
        option.env_delimiter = self.env_delimiter;
        option.choices = self.choices;
        option.optional_value = self.optional_value;
        option
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupDocument {
    pub heading: String,
    pub namespace: Option<String>,
    pub hidden: bool,
    pub options: Vec<OptionDocument>,
    pub groups: Vec<GroupDocument>,
}

impl GroupDocument {
    pub fn into_group(self) -> Group {
        Group {
            heading: self.heading,
            namespace: self.namespace,
            hidden: self.hidden,
            options: self.options.into_iter().map(OptionDocument::into_option).collect(),
            groups: self.groups.into_iter().map(GroupDocument::into_group).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionalDocument {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub value_type: ScalarType,
    pub multiplicity: Multiplicity,
    pub required: bool,
}

impl PositionalDocument {
    pub fn into_positional(self) -> Positional {
        let mut slot = match self.multiplicity {
            Multiplicity::One => Positional::new(&self.name),
            Multiplicity::Rest => Positional::rest(&self.name),
        };
        slot.description = self.description;
        slot.value_type = self.value_type;
        slot.required = self.required;
        slot
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandDocument {
    pub name: String,
    pub aliases: Vec<String>,
    /// One-line description.
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub usage: Option<String>,
    pub hidden: bool,
    pub required_subcommand: bool,
    /// Heading of the command's own options; `Application Options` if unset.
    pub heading: Option<String>,
    pub options: Vec<OptionDocument>,
    pub groups: Vec<GroupDocument>,
    pub positional: Vec<PositionalDocument>,
    pub commands: Vec<CommandDocument>,
}

impl CommandDocument {
    pub fn into_command(self) -> Command {
        let mut command = Command::new(&self.name);
        command.aliases = self.aliases;
        command.short_description = self.description;
        command.long_description = self.long_description;
        command.usage = self.usage;
        command.hidden = self.hidden;
        command.required_subcommand = self.required_subcommand;
        command.group.heading = self.heading.unwrap_or_else(|| DEFAULT_HEADING.to_string());
        command.group.options = self.options.into_iter().map(OptionDocument::into_option).collect();
        command.group.groups = self.groups.into_iter().map(GroupDocument::into_group).collect();
        command.positional = self
            .positional
            .into_iter()
            .map(PositionalDocument::into_positional)
            .collect();
        command.subcommands = self
            .commands
            .into_iter()
            .map(CommandDocument::into_command)
            .collect();
        command
    }
}

/// A root command plus parser settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub parser: ParserDocument,
    #[serde(flatten)]
    pub command: CommandDocument,
}

impl SchemaDocument {
    /// Loads a document, as JSON for `.json` files and as YAML otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let doc = if is_json(path) {
            serde_json::from_reader(reader)?
        } else {
            serde_yaml::from_reader(reader)?
        };
        Ok(doc)
    }

    /// Saves the document in the format implied by the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        if is_json(path) {
            serde_json::to_writer_pretty(writer, self)?;
        } else {
            serde_yaml::to_writer(writer, self)?;
        }
        Ok(())
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Splits the document into its command tree and parser settings.
    pub fn into_parts(self) -> (Command, ParserConfig) {
        (self.command.into_command(), self.parser)
    }

    /// Builds a validated parser from the document.
    pub fn into_parser(self) -> Result<OptionParser> {
        let (root, config) = self.into_parts();
        Ok(OptionParser::with_config(root, config)?)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
