//! Option descriptors and their value sinks.
//!
//! An [`OptionSpec`] describes one bindable flag: its short and long names,
//! the [`ValueKind`] that decides how raw strings are stored, and display
//! metadata used by the help renderer. The bound [`Value`] lives on the
//! descriptor itself and is overwritten in place while parsing.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Element type of a scalar, sequence, or mapping option.
///
/// # Examples
///
/// ```
/// use flagtree_core::{ScalarType, Value};
///
/// assert_eq!(ScalarType::Integer.parse("42"), Ok(Value::Integer(42)));
/// assert!(ScalarType::Integer.parse("forty-two").is_err());
/// assert_eq!(ScalarType::Bool.parse("F"), Ok(Value::Bool(false)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    /// `true`/`false` literals.
    Bool,
    /// Any string (the default).
    #[default]
    String,
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit float.
    Float,
}

impl ScalarType {
    /// Short type name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::String => "string",
            Self::Integer => "int",
            Self::Float => "float",
        }
    }

    /// Parses `raw` into a [`Value`] of this type.
    pub fn parse(self, raw: &str) -> Result<Value, String> {
        match self {
            Self::Bool => parse_bool(raw).map(Value::Bool),
            Self::String => Ok(Value::String(raw.to_string())),
            Self::Integer => raw
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| format!("expected int, got `{raw}'")),
            Self::Float => raw
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("expected float, got `{raw}'")),
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(format!("expected bool, got `{raw}'")),
    }
}

/// Function invoked with every raw value of a callback option.
pub type Callback = Box<dyn FnMut(&str) -> Result<(), String>>;

/// How an option stores the values it receives.
pub enum ValueKind {
    /// One value; later occurrences overwrite. `Scalar(Bool)` is a plain flag.
    Scalar(ScalarType),
    /// Every occurrence appends. `Sequence(Bool)` counts bare occurrences.
    Sequence(ScalarType),
    /// Every occurrence adds a `key:value` (or `key=value`) entry.
    Mapping(ScalarType),
    /// Every occurrence calls the function with the raw value.
    Callback(Callback),
}

impl ValueKind {
    /// Whether occurrences of this option consume a value.
    pub fn takes_value(&self) -> bool {
        !matches!(
            self,
            Self::Scalar(ScalarType::Bool) | Self::Sequence(ScalarType::Bool)
        )
    }

    /// Element type, if the kind has one.
    pub fn element(&self) -> Option<ScalarType> {
        match self {
            Self::Scalar(t) | Self::Sequence(t) | Self::Mapping(t) => Some(*t),
            Self::Callback(_) => None,
        }
    }

    fn accepts_negative_numbers(&self) -> bool {
        matches!(self, Self::Scalar(t) | Self::Sequence(t) if t.is_numeric())
    }
}

impl fmt::Debug for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(t) => f.debug_tuple("Scalar").field(t).finish(),
            Self::Sequence(t) => f.debug_tuple("Sequence").field(t).finish(),
            Self::Mapping(t) => f.debug_tuple("Mapping").field(t).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// A bound option or positional value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            Self::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

/// Where the current value of an option came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueOrigin {
    CommandLine,
    Default,
    Env,
}

/// Failure to store a raw value into an option.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignError {
    /// The option takes a value but none was supplied.
    #[error("expected a value")]
    MissingValue,
    /// The value could not be converted or was rejected.
    #[error("{0}")]
    InvalidValue(String),
}

/// Descriptor for a single flag.
///
/// Use the constructors ([`flag`](OptionSpec::flag),
/// [`scalar`](OptionSpec::scalar), [`sequence`](OptionSpec::sequence),
/// [`mapping`](OptionSpec::mapping), [`callback`](OptionSpec::callback)) and
/// chain the `with_*` builders.
///
/// # Examples
///
/// ```
/// use flagtree_core::{OptionSpec, ScalarType, Value};
///
/// let mut port = OptionSpec::scalar(Some('p'), Some("port"), ScalarType::Integer)
///     .with_description("Port to listen on");
/// assert!(port.takes_value());
///
/// port.bind(Some("8080")).unwrap();
/// assert_eq!(port.value(), Some(&Value::Integer(8080)));
/// assert!(port.bind(Some("http")).is_err());
/// ```
#[derive(Debug)]
pub struct OptionSpec {
    /// Single-character name (e.g. `v` for `-v`).
    pub short: Option<char>,
    /// Long name without prefix and without group namespace.
    pub long: Option<String>,
    pub kind: ValueKind,
    pub description: Option<String>,
    /// Placeholder shown after the separator in help output.
    pub value_name: Option<String>,
    pub required: bool,
    pub hidden: bool,
    /// Default literals, applied in order when no value was given.
    pub defaults: Vec<String>,
    /// Environment variables probed in order when there are no defaults.
    pub env: Vec<String>,
    /// Splits environment values into several items for sequences and maps.
    pub env_delimiter: Option<String>,
    /// Allowed values; empty means unrestricted.
    pub choices: Vec<String>,
    /// Value used when the option is given without one.
    pub optional_value: Option<String>,
    value: Option<Value>,
    origin: Option<ValueOrigin>,
}

impl OptionSpec {
    fn with_kind(short: Option<char>, long: Option<&str>, kind: ValueKind) -> Self {
        Self {
            short,
            long: long.map(String::from),
            kind,
            description: None,
            value_name: None,
            required: false,
            hidden: false,
            defaults: Vec::new(),
            env: Vec::new(),
            env_delimiter: None,
            choices: Vec::new(),
            optional_value: None,
            value: None,
            origin: None,
        }
    }

    /// Creates a boolean flag.
    pub fn flag(short: Option<char>, long: Option<&str>) -> Self {
        Self::with_kind(short, long, ValueKind::Scalar(ScalarType::Bool))
    }

    /// Creates a flag whose bare occurrences accumulate (`-vvv`).
    pub fn counter(short: Option<char>, long: Option<&str>) -> Self {
        Self::with_kind(short, long, ValueKind::Sequence(ScalarType::Bool))
    }

    /// Creates a single-valued option.
    pub fn scalar(short: Option<char>, long: Option<&str>, value_type: ScalarType) -> Self {
        Self::with_kind(short, long, ValueKind::Scalar(value_type))
    }

    /// Creates an option whose occurrences append to a list.
    pub fn sequence(short: Option<char>, long: Option<&str>, value_type: ScalarType) -> Self {
        Self::with_kind(short, long, ValueKind::Sequence(value_type))
    }

    /// Creates an option collecting `key:value` entries.
    pub fn mapping(short: Option<char>, long: Option<&str>, value_type: ScalarType) -> Self {
        Self::with_kind(short, long, ValueKind::Mapping(value_type))
    }

    /// Creates an option that hands each raw value to `f`.
    pub fn callback<F>(short: Option<char>, long: Option<&str>, f: F) -> Self
    where
        F: FnMut(&str) -> Result<(), String> + 'static,
    {
        Self::with_kind(short, long, ValueKind::Callback(Box::new(f)))
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn with_value_name(mut self, name: &str) -> Self {
        self.value_name = Some(name.to_string());
        self
    }

    /// Marks the option as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Hides the option from help and man output.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_default(mut self, literal: &str) -> Self {
        self.defaults.push(literal.to_string());
        self
    }

    pub fn with_env(mut self, name: &str) -> Self {
        self.env.push(name.to_string());
        self
    }

    pub fn with_env_delimiter(mut self, delimiter: &str) -> Self {
        self.env_delimiter = Some(delimiter.to_string());
        self
    }

    pub fn with_choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_optional_value(mut self, value: &str) -> Self {
        self.optional_value = Some(value.to_string());
        self
    }

    /// Whether occurrences of this option consume a value.
    pub fn takes_value(&self) -> bool {
        self.kind.takes_value()
    }

    /// Whether a leading `-` value such as `-5` is a value rather than a flag.
    pub(crate) fn accepts_negative_numbers(&self) -> bool {
        self.kind.accepts_negative_numbers()
    }

    /// The bound value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Where the bound value came from.
    pub fn origin(&self) -> Option<ValueOrigin> {
        self.origin
    }

    /// Whether the option received a value from any source.
    pub fn is_set(&self) -> bool {
        self.origin.is_some()
    }

    /// Fully-qualified long name under `prefix` (the enclosing namespaces).
    pub fn qualified_long(&self, prefix: &str) -> Option<String> {
        self.long.as_deref().map(|long| qualify(prefix, long))
    }

    /// Binds a command-line occurrence. `None` means the flag appeared bare.
    pub fn bind(&mut self, raw: Option<&str>) -> Result<(), AssignError> {
        self.assign(raw, ValueOrigin::CommandLine)
    }

    pub(crate) fn assign(
        &mut self,
        raw: Option<&str>,
        origin: ValueOrigin,
    ) -> Result<(), AssignError> {
        // Explicit input replaces values that came from defaults or env.
        if origin == ValueOrigin::CommandLine
            && matches!(self.origin, Some(ValueOrigin::Default | ValueOrigin::Env))
        {
            self.value = None;
        }

        if let Some(raw) = raw {
            if !self.choices.is_empty() && !self.choices.iter().any(|c| c == raw) {
                return Err(AssignError::InvalidValue(format!(
                    "`{raw}' is not one of: {}",
                    self.choices.join(", ")
                )));
            }
        }

        match &mut self.kind {
            ValueKind::Callback(f) => {
                let raw = raw.ok_or(AssignError::MissingValue)?;
                f(raw).map_err(AssignError::InvalidValue)?;
            }
            ValueKind::Scalar(ScalarType::Bool) => {
                let flag = match raw {
                    Some(raw) => parse_bool(raw).map_err(AssignError::InvalidValue)?,
                    None => true,
                };
                self.value = Some(Value::Bool(flag));
            }
            ValueKind::Scalar(value_type) => {
                let raw = raw.ok_or(AssignError::MissingValue)?;
                self.value = Some(value_type.parse(raw).map_err(AssignError::InvalidValue)?);
            }
            ValueKind::Sequence(value_type) => {
                let item = match (raw, *value_type) {
                    (None, ScalarType::Bool) => Value::Bool(true),
                    (None, _) => return Err(AssignError::MissingValue),
                    (Some(raw), value_type) => {
                        value_type.parse(raw).map_err(AssignError::InvalidValue)?
                    }
                };
                match &mut self.value {
                    Some(Value::List(items)) => items.push(item),
                    _ => self.value = Some(Value::List(vec![item])),
                }
            }
            ValueKind::Mapping(value_type) => {
                let raw = raw.ok_or(AssignError::MissingValue)?;
                let (key, value) = split_entry(raw).ok_or_else(|| {
                    AssignError::InvalidValue(format!("expected key:value, got `{raw}'"))
                })?;
                let value = value_type.parse(value).map_err(AssignError::InvalidValue)?;
                match &mut self.value {
                    Some(Value::Map(entries)) => {
                        entries.insert(key.to_string(), value);
                    }
                    _ => {
                        self.value = Some(Value::Map(BTreeMap::from([(key.to_string(), value)])));
                    }
                }
            }
        }

        self.origin = Some(origin);
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.value = None;
        self.origin = None;
    }

    /// Human-readable signature like `-v, --verbose` used in errors.
    pub(crate) fn label(&self, qualified_long: Option<&str>, short_prefix: &str, long_prefix: &str) -> String {
        match (self.short, qualified_long) {
            (Some(short), Some(long)) => format!("{short_prefix}{short}, {long_prefix}{long}"),
            (Some(short), None) => format!("{short_prefix}{short}"),
            (None, Some(long)) => format!("{long_prefix}{long}"),
            (None, None) => String::new(),
        }
    }
}

/// Joins a namespace prefix and a name with `.`.
pub(crate) fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn split_entry(raw: &str) -> Option<(&str, &str)> {
    let pos = raw.find([':', '='])?;
    Some((&raw[..pos], &raw[pos + 1..]))
}
