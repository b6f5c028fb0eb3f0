use crate::language::span::Location;
use crate::runtime::value::ValueKind;
use std::rc::Rc;

/// Words that lex as identifiers but cannot name variables or functions.
pub const RESERVED_WORDS: &[&str] = &[
    "box",
    "createobject",
    "eval",
    "getglobalaa",
    "getlastruncompileerror",
    "getlastrunruntimeerror",
    "line_num",
    "objfun",
    "pos",
    "run",
    "tab",
    "type",
];

#[derive(Clone, Debug, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub location: Location,
}

impl Identifier {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }

    pub fn is_reserved(&self) -> bool {
        let lowered = self.name.to_ascii_lowercase();
        RESERVED_WORDS.contains(&lowered.as_str())
    }

    /// Trailing `$ % ! # &` character, if the name carries one.
    pub fn designator(&self) -> Option<char> {
        self.name
            .chars()
            .last()
            .filter(|ch| matches!(ch, '$' | '%' | '!' | '#' | '&'))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    IntDivide,
    Modulo,
    Power,
    LeftShift,
    RightShift,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::IntDivide => "\\",
            BinaryOp::Modulo => "mod",
            BinaryOp::Power => "^",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "<>",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "not",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncrementOp {
    Increment,
    Decrement,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Invalid,
    Boolean(bool),
    String(String),
    Integer(i32),
    LongInteger(i64),
    Float(f32),
    Double(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Identifier,
    pub kind: ValueKind,
    pub default: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionExpr {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: ValueKind,
    pub is_sub: bool,
    pub body: Block,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AAMember {
    pub name: String,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
        location: Location,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        optional: bool,
        closing: Location,
        location: Location,
    },
    Function(Rc<FunctionExpr>),
    DottedGet {
        object: Box<Expr>,
        name: Identifier,
        optional: bool,
        location: Location,
    },
    AttributeGet {
        object: Box<Expr>,
        name: Identifier,
        location: Location,
    },
    IndexedGet {
        object: Box<Expr>,
        indexes: Vec<Expr>,
        optional: bool,
        closing: Location,
        location: Location,
    },
    Grouping {
        expr: Box<Expr>,
        location: Location,
    },
    Literal(Literal, Location),
    ArrayLiteral {
        elements: Vec<Expr>,
        location: Location,
    },
    AALiteral {
        members: Vec<AAMember>,
        location: Location,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        location: Location,
    },
    Variable(Identifier),
}

impl Expr {
    pub fn location(&self) -> &Location {
        match self {
            Expr::Binary { location, .. }
            | Expr::Call { location, .. }
            | Expr::DottedGet { location, .. }
            | Expr::AttributeGet { location, .. }
            | Expr::IndexedGet { location, .. }
            | Expr::Grouping { location, .. }
            | Expr::Literal(_, location)
            | Expr::ArrayLiteral { location, .. }
            | Expr::AALiteral { location, .. }
            | Expr::Unary { location, .. } => location,
            Expr::Function(func) => &func.location,
            Expr::Variable(ident) => &ident.location,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PrintItem {
    Expr(Expr),
    Comma,
    Semicolon,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElseIf {
    pub condition: Expr,
    pub block: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Assignment {
        name: Identifier,
        value: Expr,
        location: Location,
    },
    Dim {
        name: Identifier,
        dimensions: Vec<Expr>,
        location: Location,
    },
    Block(Block),
    Expression(Expr),
    ExitFor(Location),
    ExitWhile(Location),
    ContinueFor(Location),
    ContinueWhile(Location),
    Function {
        name: Identifier,
        func: Rc<FunctionExpr>,
    },
    If {
        condition: Expr,
        then_branch: Block,
        else_ifs: Vec<ElseIf>,
        else_branch: Option<Block>,
        location: Location,
    },
    Increment {
        target: Expr,
        op: IncrementOp,
        location: Location,
    },
    Print {
        items: Vec<PrintItem>,
        location: Location,
    },
    Goto {
        label: Identifier,
        location: Location,
    },
    Label(Identifier),
    Return {
        value: Option<Expr>,
        location: Location,
    },
    End(Location),
    Stop(Location),
    For {
        counter: Identifier,
        start: Expr,
        final_value: Expr,
        step: Option<Expr>,
        body: Block,
        location: Location,
    },
    ForEach {
        item: Identifier,
        target: Expr,
        body: Block,
        location: Location,
    },
    While {
        condition: Expr,
        body: Block,
        location: Location,
    },
    DottedSet {
        object: Expr,
        name: Identifier,
        value: Expr,
        location: Location,
    },
    IndexedSet {
        object: Expr,
        indexes: Vec<Expr>,
        value: Expr,
        closing: Location,
        location: Location,
    },
    Library {
        path: String,
        location: Location,
    },
    TryCatch {
        try_block: Block,
        error_binding: Identifier,
        catch_block: Block,
        location: Location,
    },
    Throw {
        value: Expr,
        location: Location,
    },
}

impl Statement {
    pub fn location(&self) -> &Location {
        match self {
            Statement::Assignment { location, .. }
            | Statement::Dim { location, .. }
            | Statement::If { location, .. }
            | Statement::Increment { location, .. }
            | Statement::Print { location, .. }
            | Statement::Goto { location, .. }
            | Statement::Return { location, .. }
            | Statement::For { location, .. }
            | Statement::ForEach { location, .. }
            | Statement::While { location, .. }
            | Statement::DottedSet { location, .. }
            | Statement::IndexedSet { location, .. }
            | Statement::Library { location, .. }
            | Statement::TryCatch { location, .. }
            | Statement::Throw { location, .. } => location,
            Statement::ExitFor(location)
            | Statement::ExitWhile(location)
            | Statement::ContinueFor(location)
            | Statement::ContinueWhile(location)
            | Statement::End(location)
            | Statement::Stop(location) => location,
            Statement::Block(block) => &block.location,
            Statement::Expression(expr) => expr.location(),
            Statement::Function { func, .. } => &func.location,
            Statement::Label(ident) => &ident.location,
        }
    }

    /// Short name used by the debugger prompt.
    pub fn describe(&self) -> &'static str {
        match self {
            Statement::Assignment { .. } => "assignment",
            Statement::Dim { .. } => "dim",
            Statement::Block(_) => "block",
            Statement::Expression(_) => "expression",
            Statement::ExitFor(_) => "exit for",
            Statement::ExitWhile(_) => "exit while",
            Statement::ContinueFor(_) => "continue for",
            Statement::ContinueWhile(_) => "continue while",
            Statement::Function { .. } => "function",
            Statement::If { .. } => "if",
            Statement::Increment { .. } => "increment",
            Statement::Print { .. } => "print",
            Statement::Goto { .. } => "goto",
            Statement::Label(_) => "label",
            Statement::Return { .. } => "return",
            Statement::End(_) => "end",
            Statement::Stop(_) => "stop",
            Statement::For { .. } => "for",
            Statement::ForEach { .. } => "for each",
            Statement::While { .. } => "while",
            Statement::DottedSet { .. } => "dotted set",
            Statement::IndexedSet { .. } => "indexed set",
            Statement::Library { .. } => "library",
            Statement::TryCatch { .. } => "try",
            Statement::Throw { .. } => "throw",
        }
    }
}
