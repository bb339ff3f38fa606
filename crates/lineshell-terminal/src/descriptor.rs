//! Command descriptors used for help rendering.
//!
//! A descriptor carries no behavior. Interpreters hand them out so `help`
//! can describe a command and so [`LineParser::typed_arg_map`] knows which
//! type each `key:value` argument should take.
//!
//! [`LineParser::typed_arg_map`]: crate::LineParser::typed_arg_map

use std::fmt;

/// Declared type of a `key:value` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    Bool,
    Char,
    Double,
    Int,
    String,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgKind::Bool => "bool",
            ArgKind::Char => "char",
            ArgKind::Double => "double",
            ArgKind::Int => "int",
            ArgKind::String => "string",
        };
        f.write_str(name)
    }
}

/// Description of one argument, `key:value` unless marked positional.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgSpec {
    pub key: String,
    pub kind: ArgKind,
    /// Allowed values, if constrained.
    pub values: Option<Vec<String>>,
    pub optional: bool,
    /// Given as a bare word rather than `key:value`.
    pub positional: bool,
    pub description: String,
    /// Extra help text shown by `help <command>`.
    pub help: Option<String>,
}

impl ArgSpec {
    /// A required argument.
    pub fn new(key: &str, kind: ArgKind, description: &str) -> Self {
        Self {
            key: key.to_string(),
            kind,
            values: None,
            optional: false,
            positional: false,
            description: description.to_string(),
            help: None,
        }
    }

    /// Mark the argument optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Take the argument as a bare word, e.g. `wait 500`.
    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    /// Constrain the argument to a fixed set of values.
    pub fn values(mut self, values: &[&str]) -> Self {
        self.values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Attach extra help text.
    pub fn help(mut self, text: &str) -> Self {
        self.help = Some(text.to_string());
        self
    }

    fn usage(&self) -> String {
        let form = if self.positional {
            format!("<{}>", self.key)
        } else {
            format!("{}:<{}>", self.key, self.kind)
        };
        if self.optional { format!("[{form}]") } else { form }
    }
}

/// Description of a command word.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub name: String,
    pub category: Option<String>,
    pub args: Vec<ArgSpec>,
    pub description: String,
}

impl CommandSpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            category: None,
            args: Vec::new(),
            description: description.to_string(),
        }
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    /// One-line usage, e.g. `wait ms:<int>`.
    pub fn usage(&self) -> String {
        let mut out = self.name.clone();
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.usage());
        }
        out
    }

    /// Multi-line plain-text description for `help <command>`.
    pub fn render(&self) -> String {
        let mut out = self.name.clone();
        if let Some(cat) = &self.category {
            out.push_str(&format!(" ({cat})"));
        }
        out.push_str(&format!("\n  {}\n  Usage: {}", self.description, self.usage()));
        for arg in &self.args {
            out.push_str(&format!("\n    {:12} {}", arg.key, arg.description));
            if let Some(values) = &arg.values {
                out.push_str(&format!(" (one of: {})", values.join(", ")));
            }
            if let Some(help) = &arg.help {
                out.push_str(&format!("\n    {:12} {help}", ""));
            }
        }
        out
    }
}
