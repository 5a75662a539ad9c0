//! User-facing console errors.
//!
//! Every variant renders as one fixed output line. None of them ends the
//! read-eval-print loop.

use crate::storage::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ConsoleError {
    ClassNameMissing,
    ClassDoesntExist,
    InstanceIdMissing,
    NoInstanceFound,
    AttributeNameMissing,
    ValueMissing,
    /// Line matched neither command syntax.
    UnknownSyntax(String),
    /// Backend failure while executing an otherwise valid command.
    Storage(StoreError),
}

impl Display for ConsoleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClassNameMissing => f.write_str("** class name missing **"),
            Self::ClassDoesntExist => f.write_str("** class doesn't exist **"),
            Self::InstanceIdMissing => f.write_str("** instance id missing **"),
            Self::NoInstanceFound => f.write_str("** no instance found **"),
            Self::AttributeNameMissing => f.write_str("** attribute name missing **"),
            Self::ValueMissing => f.write_str("** value missing **"),
            Self::UnknownSyntax(line) => write!(f, "*** Unknown syntax: {line}"),
            Self::Storage(err) => write!(f, "** {err} **"),
        }
    }
}

impl Error for ConsoleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ConsoleError {
    fn from(value: StoreError) -> Self {
        Self::Storage(value)
    }
}

impl ConsoleError {
    /// Stable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ClassNameMissing => "class_name_missing",
            Self::ClassDoesntExist => "class_doesnt_exist",
            Self::InstanceIdMissing => "instance_id_missing",
            Self::NoInstanceFound => "no_instance_found",
            Self::AttributeNameMissing => "attribute_name_missing",
            Self::ValueMissing => "value_missing",
            Self::UnknownSyntax(_) => "unknown_syntax",
            Self::Storage(_) => "storage_error",
        }
    }
}
