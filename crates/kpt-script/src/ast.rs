//! AST for the scripted-transformer expression language (SPEC_FULL.md §9.1).

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// Dotted field access, e.g. `.metadata.labels.tier`, stored without the
    /// leading dot.
    Path(Vec<String>),
    Not(Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// The only mutating statement: `<path> = <expr>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub path: Vec<String>,
    pub expr: Expr,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program(pub Vec<Statement>);
