/// Why a formula failed to parse.
///
/// Every variant carries the byte offset into the source and, where there is
/// one, the offending substring.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown token '{fragment}' at offset {offset}")]
    UnknownToken { fragment: String, offset: usize },

    #[error("unbalanced parenthesis '{fragment}' at offset {offset}")]
    UnbalancedParens { fragment: String, offset: usize },

    #[error("unknown primitive '{fragment}' at offset {offset}")]
    UnknownPrimitive { fragment: String, offset: usize },

    #[error("malformed duration '{fragment}' at offset {offset}: {reason}")]
    MalformedDuration {
        fragment: String,
        offset: usize,
        reason: &'static str,
    },

    #[error("unexpected '{fragment}' at offset {offset}, expected {expected}")]
    UnexpectedToken {
        fragment: String,
        offset: usize,
        expected: &'static str,
    },

    #[error("unexpected end of input at offset {offset}, expected {expected}")]
    UnexpectedEnd { offset: usize, expected: &'static str },

    #[error("{function}() takes {expected} argument(s), got {found} (offset {offset})")]
    Arity {
        function: String,
        expected: &'static str,
        found: usize,
        offset: usize,
    },

    #[error("argument {position} of {function}() must be {expected}, got '{fragment}' (offset {offset})")]
    ArgumentKind {
        function: String,
        position: usize,
        expected: &'static str,
        fragment: String,
        offset: usize,
    },

    #[error("formula nests deeper than {limit} levels at '{fragment}' (offset {offset})")]
    NestingTooDeep {
        fragment: String,
        offset: usize,
        limit: usize,
    },
}

impl ParseError {
    /// Byte offset into the formula source.
    pub fn offset(&self) -> usize {
        match self {
            Self::UnknownToken { offset, .. }
            | Self::UnbalancedParens { offset, .. }
            | Self::UnknownPrimitive { offset, .. }
            | Self::MalformedDuration { offset, .. }
            | Self::UnexpectedToken { offset, .. }
            | Self::UnexpectedEnd { offset, .. }
            | Self::Arity { offset, .. }
            | Self::ArgumentKind { offset, .. }
            | Self::NestingTooDeep { offset, .. } => *offset,
        }
    }

    /// The offending substring (empty at end of input).
    pub fn fragment(&self) -> &str {
        match self {
            Self::UnknownToken { fragment, .. }
            | Self::UnbalancedParens { fragment, .. }
            | Self::UnknownPrimitive { fragment, .. }
            | Self::MalformedDuration { fragment, .. }
            | Self::UnexpectedToken { fragment, .. }
            | Self::ArgumentKind { fragment, .. }
            | Self::NestingTooDeep { fragment, .. } => fragment,
            Self::Arity { function, .. } => function,
            Self::UnexpectedEnd { .. } => "",
        }
    }
}
