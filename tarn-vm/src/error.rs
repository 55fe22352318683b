use std::fmt;

pub const DEFAULT_SCRIPT_NAME: &str = "script.tarn";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Compile,
    Runtime,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Parse => write!(f, "Parse error"),
            ErrorKind::Compile => write!(f, "Compile error"),
            ErrorKind::Runtime => write!(f, "Runtime error"),
            ErrorKind::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceFrame {
    pub function: String,
    pub line: u32,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {})", self.function, self.line)
    }
}

/// Error record shared by every stage of the pipeline. Parse and compile
/// errors carry a position; runtime errors additionally carry the frame
/// list captured at the raising instruction.
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptError {
    pub kind: ErrorKind,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub function: String,
    pub frames: Vec<TraceFrame>,
    pub critical: bool,
}

impl ScriptError {
    pub fn parse(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            kind: ErrorKind::Parse,
            message: message.into(),
            file: DEFAULT_SCRIPT_NAME.to_string(),
            line,
            column,
            function: String::new(),
            frames: Vec::new(),
            critical: false,
        }
    }

    pub fn compile(message: impl Into<String>, line: u32) -> Self {
        Self {
            kind: ErrorKind::Compile,
            message: message.into(),
            file: DEFAULT_SCRIPT_NAME.to_string(),
            line,
            column: 0,
            function: String::new(),
            frames: Vec::new(),
            critical: false,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Runtime,
            message: message.into(),
            file: DEFAULT_SCRIPT_NAME.to_string(),
            line: 0,
            column: 0,
            function: String::new(),
            frames: Vec::new(),
            critical: false,
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Cancelled,
            message: message.into(),
            file: DEFAULT_SCRIPT_NAME.to_string(),
            line: 0,
            column: 0,
            function: String::new(),
            frames: Vec::new(),
            critical: false,
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.file.is_empty() || self.line > 0 {
            write!(f, " at ")?;
            if self.file.is_empty() {
                write!(f, "script")?;
            } else {
                write!(f, "{}", self.file)?;
            }
            if self.line > 0 {
                write!(f, ":{}", self.line)?;
            }
        }
        if !self.function.is_empty() {
            write!(f, " in {}", self.function)?;
        }
        writeln!(f)?;
        write!(f, "  {}", self.message)?;
        if !self.frames.is_empty() {
            writeln!(f)?;
            writeln!(f, "Stack trace:")?;
            for frame in &self.frames {
                writeln!(f, "  {frame}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ScriptError {}
