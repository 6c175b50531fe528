use std::fmt::Display;

use thiserror::Error;

/// The closed set of error kinds the language can raise. The first seven
/// are raised by the core (lexer, parser, environment, evaluator); the
/// rest belong to external collaborators reached through the built-in
/// call boundary and propagate through the evaluator verbatim.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    DarkMagic,
    SpellMiscast,
    UnknownIncantation,
    UnknownBinding,
    ForbiddenMagic,
    CursedScroll,
    ProphecyViolation,
    QuestFailed,
    PortalFailure,
    VoiceSilenced,
    AzureRealmError,
    ScrollDamaged,
    OracleSilent,
}

impl ErrorKind {
    /// The narrative banner printed before the message.
    pub fn title(self) -> &'static str {
        match self {
            Self::DarkMagic => "Dark Magic Detected!",
            Self::SpellMiscast => "Spell Miscast!",
            Self::UnknownIncantation => "Unknown Incantation!",
            Self::UnknownBinding => "Unknown Binding!",
            Self::ForbiddenMagic => "Forbidden Magic!",
            Self::CursedScroll => "Cursed Scroll!",
            Self::ProphecyViolation => "Prophecy Violation!",
            Self::QuestFailed => "Quest Failed!",
            Self::PortalFailure => "Portal Failure!",
            Self::VoiceSilenced => "Voice Silenced!",
            Self::AzureRealmError => "Azure Realm Error!",
            Self::ScrollDamaged => "Scroll Damaged!",
            Self::OracleSilent => "Oracle Silent!",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
#[error("{}", self.render())]
pub struct SlayError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Option<usize>,
}

impl SlayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
        }
    }

    pub fn dark_magic(message: impl Into<String>, line: usize) -> Self {
        Self::new(ErrorKind::DarkMagic, message, Some(line))
    }

    pub fn miscast(message: impl Into<String>, line: usize) -> Self {
        Self::new(ErrorKind::SpellMiscast, message, Some(line))
    }

    pub fn unknown_incantation(message: impl Into<String>, line: usize) -> Self {
        Self::new(ErrorKind::UnknownIncantation, message, Some(line))
    }

    pub fn unknown_binding(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownBinding, message, None)
    }

    pub fn forbidden_magic(message: impl Into<String>, line: usize) -> Self {
        Self::new(ErrorKind::ForbiddenMagic, message, Some(line))
    }

    pub fn cursed_scroll(message: impl Into<String>, line: usize) -> Self {
        Self::new(ErrorKind::CursedScroll, message, Some(line))
    }

    pub fn prophecy_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProphecyViolation, message, None)
    }

    pub fn quest_failed(message: impl Into<String>, line: usize) -> Self {
        Self::new(ErrorKind::QuestFailed, message, Some(line))
    }

    /// Attach a source line if the error does not carry one yet. Used by
    /// the evaluator to pin environment errors to the offending node.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line.get_or_insert(line);
        self
    }

    fn render(&self) -> String {
        match self.line {
            Some(line) => format!("{} {} at line {line}", self.kind, self.message),
            None => format!("{} {}", self.kind, self.message),
        }
    }
}
