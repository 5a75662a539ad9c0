//! Line-oriented command console over the active storage.
//!
//! # Responsibility
//! - Read one line at a time, parse it with either syntax, and run the
//!   canonical command against the owned `Storage`.
//! - Validate every command in one fixed order, shared by both syntaxes.
//! - Print results and the literal error lines; never abort the loop on a
//!   user error.
//!
//! # Invariants
//! - Validation order: kind present → kind exists → id present → id
//!   resolves → attribute present → value present.
//! - Mutating commands persist through `Storage::save` before returning.
//! - Blank lines produce no output.

pub mod coerce;
pub mod command;
pub mod error;
pub mod parse;

use crate::console::coerce::{coerce_token, split_assignment};
use crate::console::command::{Args, Command, Verb};
use crate::console::error::ConsoleError;
use crate::console::parse::parse_line;
use crate::model::entity::Entity;
use crate::model::kind::Kind;
use crate::model::value::python_str;
use crate::storage::Storage;
use log::{debug, warn};
use std::io::{self, BufRead, Write};

pub const PROMPT: &str = "(hbnb) ";

const HELP_TEXT: &str = "\
Documented commands (type help <topic>):
========================================
EOF  all  count  create  destroy  help  quit  show  update";

/// Whether the loop should keep reading after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Read-eval-print loop bound to one storage and one output sink.
pub struct Console<W: Write> {
    storage: Box<dyn Storage>,
    out: W,
    prompt: bool,
}

impl<W: Write> Console<W> {
    pub fn new(storage: Box<dyn Storage>, out: W) -> Self {
        Self {
            storage,
            out,
            prompt: false,
        }
    }

    /// Prints `(hbnb) ` before each line (for interactive terminals).
    pub fn with_prompt(mut self, prompt: bool) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn storage_mut(&mut self) -> &mut dyn Storage {
        self.storage.as_mut()
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_parts(self) -> (Box<dyn Storage>, W) {
        (self.storage, self.out)
    }

    /// Runs until `quit`/`EOF` or end of input.
    pub fn run<R: BufRead>(&mut self, mut input: R) -> io::Result<()> {
        let mut line = String::new();
        loop {
            if self.prompt {
                self.out.write_all(PROMPT.as_bytes())?;
                self.out.flush()?;
            }

            line.clear();
            if input.read_line(&mut line)? == 0 {
                if self.prompt {
                    writeln!(self.out)?;
                }
                return Ok(());
            }

            if self.execute(&line)? == Flow::Quit {
                return Ok(());
            }
        }
    }

    /// Executes one line and writes its output.
    pub fn execute(&mut self, line: &str) -> io::Result<Flow> {
        let command = match parse_line(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(err) => {
                self.report(None, &err)?;
                return Ok(Flow::Continue);
            }
        };

        let verb = command.verb;
        if verb == Verb::Quit {
            return Ok(Flow::Quit);
        }

        match self.dispatch(command) {
            Ok(Some(output)) => {
                debug!("event=console_command module=console status=ok verb={}", verb.name());
                writeln!(self.out, "{output}")?;
            }
            Ok(None) => {
                debug!("event=console_command module=console status=ok verb={}", verb.name());
            }
            Err(err) => self.report(Some(verb), &err)?,
        }
        self.out.flush()?;
        Ok(Flow::Continue)
    }

    fn report(&mut self, verb: Option<Verb>, err: &ConsoleError) -> io::Result<()> {
        let verb = verb.map_or("none", Verb::name);
        match err {
            ConsoleError::Storage(_) => warn!(
                "event=console_command module=console status=error verb={} error_code={} error={}",
                verb,
                err.code(),
                err
            ),
            _ => debug!(
                "event=console_command module=console status=rejected verb={} error_code={}",
                verb,
                err.code()
            ),
        }
        writeln!(self.out, "{err}")
    }

    fn dispatch(&mut self, command: Command) -> Result<Option<String>, ConsoleError> {
        match command.verb {
            Verb::Create => self.create(command).map(Some),
            Verb::Show => {
                let kind = self.require_kind(command.kind.as_deref())?;
                let entity = self.require_entity(kind, command.id.as_deref())?;
                Ok(Some(entity.to_string()))
            }
            Verb::Destroy => {
                let kind = self.require_kind(command.kind.as_deref())?;
                let entity = self.require_entity(kind, command.id.as_deref())?;
                self.storage.delete(&entity)?;
                self.storage.save()?;
                Ok(None)
            }
            Verb::All => {
                let kind = self.optional_kind(command.kind.as_deref())?;
                let items: Vec<String> = self
                    .storage
                    .all(kind)?
                    .values()
                    .map(|entity| python_str(&entity.to_string()))
                    .collect();
                Ok(Some(format!("[{}]", items.join(", "))))
            }
            Verb::Count => {
                let kind = self.optional_kind(command.kind.as_deref())?;
                Ok(Some(self.storage.count(kind)?.to_string()))
            }
            Verb::Update => self.update(command).map(|()| None),
            Verb::Help => Ok(Some(HELP_TEXT.to_string())),
            Verb::Quit => Ok(None),
        }
    }

    fn create(&mut self, command: Command) -> Result<String, ConsoleError> {
        let kind = self.require_kind(command.kind.as_deref())?;
        let mut entity = Entity::new(kind);

        let assignments: Vec<(String, String)> = match command.args {
            Args::Tokens(tokens) => tokens
                .iter()
                .filter_map(|token| split_assignment(token))
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            Args::Mapping(pairs) => pairs,
        };
        for (key, raw) in &assignments {
            let applied = coerce_token(raw).is_some_and(|value| entity.set(key, value));
            if !applied {
                debug!(
                    "event=console_create module=console status=dropped kind={} attribute={}",
                    kind, key
                );
            }
        }

        entity.save(self.storage.as_mut())?;
        Ok(entity.id().to_string())
    }

    fn update(&mut self, command: Command) -> Result<(), ConsoleError> {
        let kind = self.require_kind(command.kind.as_deref())?;
        let mut entity = self.require_entity(kind, command.id.as_deref())?;

        let assignments: Vec<(String, String)> = match command.args {
            Args::Tokens(tokens) => {
                let mut tokens = tokens.into_iter();
                let attribute = tokens.next().ok_or(ConsoleError::AttributeNameMissing)?;
                let value = tokens.next().ok_or(ConsoleError::ValueMissing)?;
                vec![(attribute, value)]
            }
            Args::Mapping(pairs) if pairs.is_empty() => {
                return Err(ConsoleError::AttributeNameMissing);
            }
            Args::Mapping(pairs) => pairs,
        };

        for (attribute, raw) in &assignments {
            let applied = coerce_token(raw).is_some_and(|value| entity.set(attribute, value));
            if !applied {
                debug!(
                    "event=console_update module=console status=ignored kind={} attribute={}",
                    kind, attribute
                );
            }
        }

        entity.save(self.storage.as_mut())?;
        Ok(())
    }

    /// Kind present → kind exists (and is supported by the active backend).
    fn require_kind(&self, name: Option<&str>) -> Result<Kind, ConsoleError> {
        let name = name.ok_or(ConsoleError::ClassNameMissing)?;
        Kind::from_name(name)
            .filter(|kind| self.storage.supports(*kind))
            .ok_or(ConsoleError::ClassDoesntExist)
    }

    fn optional_kind(&self, name: Option<&str>) -> Result<Option<Kind>, ConsoleError> {
        name.map(|name| self.require_kind(Some(name))).transpose()
    }

    /// Id present → id resolves.
    fn require_entity(&self, kind: Kind, id: Option<&str>) -> Result<Entity, ConsoleError> {
        let id = id.ok_or(ConsoleError::InstanceIdMissing)?;
        self.storage
            .get(kind, id)?
            .ok_or(ConsoleError::NoInstanceFound)
    }
}
