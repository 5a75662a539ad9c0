//! Canonical command record produced by both parsers.

/// Operation requested by one console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Show,
    Destroy,
    All,
    Update,
    Count,
    Help,
    Quit,
}

impl Verb {
    /// Resolves a verb-first command word.
    pub fn from_word(word: &str) -> Option<Verb> {
        match word {
            "create" => Some(Self::Create),
            "show" => Some(Self::Show),
            "destroy" => Some(Self::Destroy),
            "all" => Some(Self::All),
            "update" => Some(Self::Update),
            "count" => Some(Self::Count),
            "help" => Some(Self::Help),
            "quit" | "EOF" => Some(Self::Quit),
            _ => None,
        }
    }

    /// Resolves the method name of a dot-call (`Kind.<verb>(...)`).
    pub fn from_method(name: &str) -> Option<Verb> {
        match name {
            "create" => Some(Self::Create),
            "show" => Some(Self::Show),
            "destroy" => Some(Self::Destroy),
            "all" => Some(Self::All),
            "update" => Some(Self::Update),
            "count" => Some(Self::Count),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Show => "show",
            Self::Destroy => "destroy",
            Self::All => "all",
            Self::Update => "update",
            Self::Count => "count",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }
}

/// Arguments following the kind/id slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Args {
    /// Raw tokens in input order; quotes are preserved for coercion.
    Tokens(Vec<String>),
    /// Pairs from a dot-call dict literal, values kept raw.
    Mapping(Vec<(String, String)>),
}

impl Default for Args {
    fn default() -> Self {
        Self::Tokens(Vec::new())
    }
}

/// One parsed console line, independent of its source syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: Verb,
    pub kind: Option<String>,
    pub id: Option<String>,
    pub args: Args,
}

impl Command {
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            kind: None,
            id: None,
            args: Args::default(),
        }
    }
}
