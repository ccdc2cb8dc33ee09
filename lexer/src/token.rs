use logos::Logos;

mod token_impl;

/// The Ada 83 token set. Keywords and identifiers are matched without
/// regard to case; the parser interns identifiers case-folded.
///
/// Character literals are not matched here: a tick is always lexed as
/// `Tick` and the `Lexer` wrapper joins `'x'` into a `ConstantChar`
/// when the preceding token rules out an attribute or qualified
/// expression. The apostrophe literal `'''` is the one form the token
/// table can match directly.
#[derive(Debug, PartialEq, Logos, Clone, Copy)]
pub enum Token {
    // Identifiers: a letter followed by letters, digits, or single underscores
    #[regex(r"[a-zA-Z][a-zA-Z0-9_]*", priority = 0)]
    Identifier,

    //
    // literals
    //

    // Integer literals: decimal (with optional positive exponent)
    // and based, e.g. 16#FF#
    #[regex(r"[0-9][0-9_]*([eE]\+?[0-9][0-9_]*)?")]
    #[regex(r"[0-9]+#[0-9a-fA-F][0-9a-fA-F_]*#([eE]\+?[0-9][0-9_]*)?")]
    ConstantInt,

    // Real literals: a literal containing a point, decimal or based,
    // with an optional signed exponent
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][-+]?[0-9][0-9_]*)?")]
    #[regex(r"[0-9]+#[0-9a-fA-F][0-9a-fA-F_]*\.[0-9a-fA-F][0-9a-fA-F_]*#([eE][-+]?[0-9][0-9_]*)?")]
    ConstantReal,

    // Character literals; the apostrophe itself is written '''
    #[token("'''")]
    ConstantChar,

    // String literals; an embedded quote is doubled
    #[regex(r#""([^"]|"")*""#)]
    ConstantString,

    //
    // Keywords
    //
    #[token("abort", ignore(ascii_case))]
    Abort,

    #[token("abs", ignore(ascii_case))]
    Abs,

    #[token("accept", ignore(ascii_case))]
    Accept,

    #[token("access", ignore(ascii_case))]
    Access,

    #[token("all", ignore(ascii_case))]
    All,

    #[token("and", ignore(ascii_case))]
    And,

    #[token("array", ignore(ascii_case))]
    Array,

    #[token("at", ignore(ascii_case))]
    At,

    #[token("begin", ignore(ascii_case))]
    Begin,

    #[token("body", ignore(ascii_case))]
    Body,

    #[token("case", ignore(ascii_case))]
    Case,

    #[token("constant", ignore(ascii_case))]
    Constant,

    #[token("declare", ignore(ascii_case))]
    Declare,

    #[token("delay", ignore(ascii_case))]
    Delay,

    #[token("delta", ignore(ascii_case))]
    Delta,

    #[token("digits", ignore(ascii_case))]
    Digits,

    #[token("do", ignore(ascii_case))]
    Do,

    #[token("else", ignore(ascii_case))]
    Else,

    #[token("elsif", ignore(ascii_case))]
    Elsif,

    #[token("end", ignore(ascii_case))]
    End,

    #[token("entry", ignore(ascii_case))]
    Entry,

    #[token("exception", ignore(ascii_case))]
    Exception,

    #[token("exit", ignore(ascii_case))]
    Exit,

    #[token("for", ignore(ascii_case))]
    For,

    #[token("function", ignore(ascii_case))]
    Function,

    #[token("generic", ignore(ascii_case))]
    Generic,

    #[token("goto", ignore(ascii_case))]
    Goto,

    #[token("if", ignore(ascii_case))]
    If,

    #[token("in", ignore(ascii_case))]
    In,

    #[token("is", ignore(ascii_case))]
    Is,

    #[token("limited", ignore(ascii_case))]
    Limited,

    #[token("loop", ignore(ascii_case))]
    Loop,

    #[token("mod", ignore(ascii_case))]
    Mod,

    #[token("new", ignore(ascii_case))]
    New,

    #[token("not", ignore(ascii_case))]
    Not,

    #[token("null", ignore(ascii_case))]
    Null,

    #[token("of", ignore(ascii_case))]
    Of,

    #[token("or", ignore(ascii_case))]
    Or,

    #[token("others", ignore(ascii_case))]
    Others,

    #[token("out", ignore(ascii_case))]
    Out,

    #[token("package", ignore(ascii_case))]
    Package,

    #[token("pragma", ignore(ascii_case))]
    Pragma,

    #[token("private", ignore(ascii_case))]
    Private,

    #[token("procedure", ignore(ascii_case))]
    Procedure,

    #[token("raise", ignore(ascii_case))]
    Raise,

    #[token("range", ignore(ascii_case))]
    Range,

    #[token("record", ignore(ascii_case))]
    Record,

    #[token("rem", ignore(ascii_case))]
    Rem,

    #[token("renames", ignore(ascii_case))]
    Renames,

    #[token("return", ignore(ascii_case))]
    Return,

    #[token("reverse", ignore(ascii_case))]
    Reverse,

    #[token("select", ignore(ascii_case))]
    Select,

    #[token("separate", ignore(ascii_case))]
    Separate,

    #[token("subtype", ignore(ascii_case))]
    Subtype,

    #[token("task", ignore(ascii_case))]
    Task,

    #[token("terminate", ignore(ascii_case))]
    Terminate,

    #[token("then", ignore(ascii_case))]
    Then,

    #[token("type", ignore(ascii_case))]
    Type,

    #[token("use", ignore(ascii_case))]
    Use,

    #[token("when", ignore(ascii_case))]
    When,

    #[token("while", ignore(ascii_case))]
    While,

    #[token("with", ignore(ascii_case))]
    With,

    #[token("xor", ignore(ascii_case))]
    Xor,

    //
    // Compound delimiters
    //
    #[token("=>")]
    Arrow,

    #[token("..")]
    DotDot,

    #[token("**")]
    StarStar,

    #[token(":=")]
    Assignment,

    #[token("/=")]
    NotEqual,

    #[token(">=")]
    GreaterThanOrEq,

    #[token("<=")]
    LessThanOrEq,

    #[token("<<")]
    LeftLabel,

    #[token(">>")]
    RightLabel,

    #[token("<>")]
    Box,

    //
    // Simple delimiters
    //
    #[token("&")]
    Ampersand,

    #[token("'")]
    Tick,

    #[token("(")]
    LeftParenthesis,

    #[token(")")]
    RightParenthesis,

    #[token("*")]
    Mul,

    #[token("+")]
    Add,

    #[token(",")]
    Comma,

    #[token("-")]
    Neg,

    #[token(".")]
    Dot,

    #[token("/")]
    Div,

    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token("<")]
    LessThan,

    #[token("=")]
    Equal,

    #[token(">")]
    GreaterThan,

    #[token("|")]
    Bar,

    // skipped patterns
    #[regex(r"\n")]
    #[regex(r"[ \t\r\f]+")]
    #[regex(r"--[^\n]*")]
    Skip,

    // invalid patterns: an identifier glued to a leading digit
    #[regex(r"[0-9][0-9_]*[a-zA-Z_][a-zA-Z0-9_]*", priority = 1)]
    Error,
}
