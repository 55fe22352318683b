use std::fmt;

use crate::token::Token;

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub token: Token,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub token: Token,
    pub statements: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    /// `var a = e`, `var a, b = e`, `const a = e`.
    Var {
        token: Token,
        names: Vec<Ident>,
        value: Expr,
        constant: bool,
    },
    /// `a := e`, `a, b := e`.
    ShortDecl {
        token: Token,
        names: Vec<Ident>,
        value: Expr,
    },
    Return {
        token: Token,
        value: Option<Expr>,
    },
    Break {
        token: Token,
    },
    Continue {
        token: Token,
    },
    For {
        token: Token,
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Block,
    },
    ForIn {
        token: Token,
        name: Ident,
        iterable: Expr,
        body: Block,
    },
    Expr {
        token: Token,
        expr: Expr,
    },
}

impl Stmt {
    pub fn line(&self) -> u32 {
        match self {
            Stmt::Var { token, .. }
            | Stmt::ShortDecl { token, .. }
            | Stmt::Return { token, .. }
            | Stmt::Break { token }
            | Stmt::Continue { token }
            | Stmt::For { token, .. }
            | Stmt::ForIn { token, .. }
            | Stmt::Expr { token, .. } => token.line,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefixOp {
    Not,
    Neg,
    Plus,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOp::Not => write!(f, "!"),
            PrefixOp::Neg => write!(f, "-"),
            PrefixOp::Plus => write!(f, "+"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Mod => "%",
            InfixOp::Eq => "==",
            InfixOp::NotEq => "!=",
            InfixOp::Lt => "<",
            InfixOp::Gt => ">",
            InfixOp::LtEq => "<=",
            InfixOp::GtEq => ">=",
            InfixOp::And => "&&",
            InfixOp::Or => "||",
        };
        write!(f, "{text}")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Ident(Ident),
    Int {
        token: Token,
        value: i64,
    },
    Float {
        token: Token,
        value: f64,
    },
    Str {
        token: Token,
        value: String,
    },
    Bool {
        token: Token,
        value: bool,
    },
    Null {
        token: Token,
    },
    Prefix {
        token: Token,
        op: PrefixOp,
        right: Box<Expr>,
    },
    Infix {
        token: Token,
        op: InfixOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        token: Token,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    If {
        token: Token,
        cond: Box<Expr>,
        consequence: Block,
        alternative: Option<Block>,
    },
    Function {
        token: Token,
        name: Option<String>,
        params: Vec<Ident>,
        body: Block,
    },
    Call {
        token: Token,
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        token: Token,
        left: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        token: Token,
        left: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
    },
    Member {
        token: Token,
        object: Box<Expr>,
        name: String,
    },
    Array {
        token: Token,
        elements: Vec<Expr>,
    },
    Map {
        token: Token,
        pairs: Vec<(Expr, Expr)>,
    },
}

impl Expr {
    pub fn line(&self) -> u32 {
        match self {
            Expr::Ident(ident) => ident.token.line,
            Expr::Int { token, .. }
            | Expr::Float { token, .. }
            | Expr::Str { token, .. }
            | Expr::Bool { token, .. }
            | Expr::Null { token }
            | Expr::Prefix { token, .. }
            | Expr::Infix { token, .. }
            | Expr::Assign { token, .. }
            | Expr::If { token, .. }
            | Expr::Function { token, .. }
            | Expr::Call { token, .. }
            | Expr::Index { token, .. }
            | Expr::Slice { token, .. }
            | Expr::Member { token, .. }
            | Expr::Array { token, .. }
            | Expr::Map { token, .. } => token.line,
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{stmt}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{stmt}")?;
        }
        Ok(())
    }
}

fn join_names(names: &[Ident]) -> String {
    names
        .iter()
        .map(|ident| ident.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Var {
                names,
                value,
                constant,
                ..
            } => {
                let keyword = if *constant { "const" } else { "var" };
                write!(f, "{keyword} {} = {value};", join_names(names))
            }
            Stmt::ShortDecl { names, value, .. } => {
                write!(f, "{} := {value};", join_names(names))
            }
            Stmt::Return { value, .. } => match value {
                Some(value) => write!(f, "return {value};"),
                None => write!(f, "return;"),
            },
            Stmt::Break { .. } => write!(f, "break;"),
            Stmt::Continue { .. } => write!(f, "continue;"),
            Stmt::For {
                init,
                cond,
                post,
                body,
                ..
            } => {
                write!(f, "for ")?;
                if let Some(init) = init {
                    write!(f, "{init} ")?;
                }
                if let Some(cond) = cond {
                    write!(f, "{cond}")?;
                }
                if let Some(post) = post {
                    write!(f, "; {post}")?;
                }
                write!(f, " {{ {body} }}")
            }
            Stmt::ForIn {
                name,
                iterable,
                body,
                ..
            } => write!(f, "for {name} in {iterable} {{ {body} }}"),
            Stmt::Expr { expr, .. } => write!(f, "{expr}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident(ident) => write!(f, "{ident}"),
            Expr::Int { value, .. } => write!(f, "{value}"),
            Expr::Float { value, .. } => write!(f, "{value}"),
            Expr::Str { value, .. } => write!(f, "\"{value}\""),
            Expr::Bool { value, .. } => write!(f, "{value}"),
            Expr::Null { .. } => write!(f, "null"),
            Expr::Prefix { op, right, .. } => write!(f, "({op}{right})"),
            Expr::Infix {
                op, left, right, ..
            } => write!(f, "({left} {op} {right})"),
            Expr::Assign { target, value, .. } => write!(f, "({target} = {value})"),
            Expr::If {
                cond,
                consequence,
                alternative,
                ..
            } => {
                write!(f, "if {cond} {{ {consequence} }}")?;
                if let Some(alternative) = alternative {
                    write!(f, " else {{ {alternative} }}")?;
                }
                Ok(())
            }
            Expr::Function {
                name, params, body, ..
            } => {
                write!(f, "func")?;
                if let Some(name) = name {
                    write!(f, " {name}")?;
                }
                write!(f, "({}) {{ {body} }}", join_names(params))
            }
            Expr::Call { callee, args, .. } => {
                let args = args
                    .iter()
                    .map(|arg| arg.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{callee}({args})")
            }
            Expr::Index { left, index, .. } => write!(f, "({left}[{index}])"),
            Expr::Slice {
                left, start, end, ..
            } => {
                write!(f, "({left}[")?;
                if let Some(start) = start {
                    write!(f, "{start}")?;
                }
                write!(f, ":")?;
                if let Some(end) = end {
                    write!(f, "{end}")?;
                }
                write!(f, "])")
            }
            Expr::Member { object, name, .. } => write!(f, "({object}.{name})"),
            Expr::Array { elements, .. } => {
                let elements = elements
                    .iter()
                    .map(|element| element.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{elements}]")
            }
            Expr::Map { pairs, .. } => {
                let pairs = pairs
                    .iter()
                    .map(|(key, value)| format!("{key}: {value}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{{{pairs}}}")
            }
        }
    }
}
