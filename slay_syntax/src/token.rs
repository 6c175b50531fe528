use std::fmt::Display;

/// The enum variants are in SCREAMING_SNAKE_CASE as they technically
/// represent constants, but Rust does not allow const enum variants.
#[allow(nonstandard_style)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TokenKind {
    // Literals
    IDENT,
    STRING,
    INTEGER,
    FLOAT,
    // Declaration keywords
    CONJURE,
    SUMMON,
    TRANSMUTE,
    CONST,
    PROPHECY,
    VANQUISH,
    AS,
    // Type marker keywords
    SCROLL,
    RUNE,
    POTION,
    CHARM,
    TOME,
    GRIMOIRE,
    VOID,
    TRUE,
    FALSE,
    // Function keywords
    SPELL,
    INCANTATION,
    CAST,
    // Control flow keywords
    REVEALS,
    OTHERWISE,
    FATE,
    DECREES,
    PATROL,
    UNTIL,
    HUNT,
    EACH,
    IN,
    BREAK,
    CONTINUE,
    // Comparison keywords
    IS,
    ISNT,
    EXCEEDS,
    UNDER,
    ATLEAST,
    ATMOST,
    // Logical keywords
    AND,
    OR,
    NOT,
    // Arithmetic
    PLUS,
    MINUS,
    STAR,
    SLASH,
    PERCENT,
    POWER,
    // Delimiters
    LPAREN,
    RPAREN,
    LBRACKET,
    RBRACKET,
    LBRACE,
    RBRACE,
    COMMA,
    COLON,
    DOT,
    // Miscellaneous tokens
    NEWLINE,
    EOF,
}

impl TokenKind {
    pub fn from_char(c: char) -> Option<Self> {
        let token = match c {
            '+' => Self::PLUS,
            '-' => Self::MINUS,
            '*' => Self::STAR,
            '/' => Self::SLASH,
            '%' => Self::PERCENT,
            '(' => Self::LPAREN,
            ')' => Self::RPAREN,
            '[' => Self::LBRACKET,
            ']' => Self::RBRACKET,
            '{' => Self::LBRACE,
            '}' => Self::RBRACE,
            ',' => Self::COMMA,
            ':' => Self::COLON,
            '.' => Self::DOT,
            _ => return None,
        };
        Some(token)
    }

    pub fn from_keyword(kw: &str) -> Option<Self> {
        let token = match kw {
            "conjure" => Self::CONJURE,
            "summon" => Self::SUMMON,
            "transmute" => Self::TRANSMUTE,
            "const" => Self::CONST,
            "prophecy" => Self::PROPHECY,
            "vanquish" => Self::VANQUISH,
            "as" => Self::AS,
            "scroll" => Self::SCROLL,
            "rune" => Self::RUNE,
            "potion" => Self::POTION,
            "charm" => Self::CHARM,
            "tome" => Self::TOME,
            "grimoire" => Self::GRIMOIRE,
            "void" => Self::VOID,
            "true" => Self::TRUE,
            "false" => Self::FALSE,
            "spell" => Self::SPELL,
            "incantation" => Self::INCANTATION,
            "cast" => Self::CAST,
            "reveals" => Self::REVEALS,
            "otherwise" => Self::OTHERWISE,
            "fate" => Self::FATE,
            "decrees" => Self::DECREES,
            "patrol" => Self::PATROL,
            "until" => Self::UNTIL,
            "hunt" => Self::HUNT,
            "each" => Self::EACH,
            "in" => Self::IN,
            "break" => Self::BREAK,
            "continue" => Self::CONTINUE,
            "is" => Self::IS,
            "isnt" => Self::ISNT,
            "exceeds" => Self::EXCEEDS,
            "under" => Self::UNDER,
            "atleast" => Self::ATLEAST,
            "atmost" => Self::ATMOST,
            "and" => Self::AND,
            "or" => Self::OR,
            "not" => Self::NOT,
            _ => return None,
        };
        Some(token)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.lexeme)
    }
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: String, line: usize) -> Self {
        Self { kind, lexeme, line }
    }
}
