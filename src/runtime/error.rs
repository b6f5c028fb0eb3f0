use crate::language::span::Location;
use crate::runtime::callable::Signature;
use crate::runtime::value::{Value, ValueKind};
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, Signal>;

macro_rules! error_details {
    ($($variant:ident = $errno:literal => $message:literal,)*) => {
        /// Runtime error taxonomy. `Display` yields the device message.
        #[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
        pub enum RuntimeErrorDetail {
            $(
                #[error($message)]
                $variant,
            )*
        }

        impl RuntimeErrorDetail {
            pub const ALL: &'static [RuntimeErrorDetail] = &[$(RuntimeErrorDetail::$variant,)*];

            pub fn errno(self) -> i32 {
                match self {
                    $(RuntimeErrorDetail::$variant => $errno,)*
                }
            }
        }
    };
}

error_details! {
    NextWithoutFor = 0 => "Next Without For.",
    BadSyntax = 2 => "Syntax Error.",
    ReturnedWithoutGosub = 4 => "Return Without Gosub.",
    OutOfData = 6 => "Out of Data on READ.",
    BadFunctionOrArrayParam = 8 => "Invalid parameter passed to function/array (e.g neg matrix dim or sqr root).",
    OutOfMemory = 12 => "Out Of Memory.",
    MissingLineNumber = 14 => "Label/Line Not Found.",
    IndexOutOfBounds = 16 => "Array subscript out of bounds.",
    RedimensionArray = 18 => "Attempted to redimension an array.",
    DivideByZero = 20 => "Divide by Zero.",
    TypeMismatch = 24 => "Type Mismatch.",
    OutOfMemoryStringOp = 26 => "Out of Memory when doing string operation.",
    StringTooLong = 28 => "String Too Long.",
    BadBitShift = 30 => "Invalid Bitwise Shift.",
    NoContinue = 32 => "Continue Not Allowed.",
    OutOfRange = 34 => "Constant Out Of Range",
    ExecutionTimeout = 35 => "Execution timeout",
    InvalidFormatSpecifier = 36 => "Invalid Format Specifier",
    MalformedThrow = 38 => "Invalid argument to Throw",
    UserDefined = 40 => "User-specified exception",
    TooManyTasks = 41 => "Too many task threads",
    RunNotSupported = 140 => "run() is unsupported.",
    ContinueForWithoutFor = 141 => "Continue For is not inside a For loop",
    ContinueWhileWithoutWhile = 142 => "Continue While is not inside a While",
    TryContainsLabel = 143 => "Labels are illegal inside a TRY clause.",
    EvalDisabled = 144 => "eval() is deprecated. You must eliminate usage of eval().",
    FunctionNotFound = 145 => "Function is not defined in component's namespace",
    NameShadowsBuiltin = 157 => "Syntax Error. Builtin function call expected.",
    VarShadowsFunctionName = 160 => "Variable name cannot be the same as that of a declared function.",
    LabelLimitExceeded = 161 => "Too Many Labels. Internal Label table size exceeded.",
    ClassNotFound = 162 => "Class Not Found.",
    InterfaceTooLarge = 163 => "Interface has too many functions for bytecode.",
    NoInitializer = 164 => "Assignment initializer missing.",
    ExitForWithoutFor = 165 => "Exit For is not inside a For loop.",
    Deprecated = 166 => "Statement type no longer supported.",
    BadType = 167 => "Type is Invalid.",
    MissingReturnType = 168 => "Function must have a return type.",
    ReturnWithoutValue = 169 => "Return must return a value.",
    ReturnWithValue = 170 => "Return can not have a return-value if inside a Sub or Function with Void return type.",
    TypeMismatchForEachIndex = 171 => "For-Each index variable must be 'dynamic' type.",
    MissingMainFunction = 172 => "No Main() Found.",
    DuplicateSub = 173 => "SUB or FUNCTION defined twice.",
    LimitExceeded = 174 => "Internal limit size exceeded.",
    ExitWhileWithoutWhile = 175 => "Exit While is not inside a While.",
    TooManyVariables = 176 => "Variable table size exceeded.",
    TooManyConstants = 177 => "Constant table size exceeded.",
    FunctionNotExpected = 178 => "Function not expected here.",
    UnterminatedString = 179 => "String missing ending quote.",
    DuplicateLabel = 180 => "Label/LineNumber defined more than once.",
    UnterminatedBlock = 181 => "A block (such as FOR/NEXT or IF/ENDIF) was not terminated correctly.",
    BadNext = 182 => "Variable in NEXT does not match correct FOR.",
    EndOfFile = 183 => "Unexpected End-Of-File.",
    CannotReadFile = 185 => "Error loading file.",
    LineNumberSequenceError = 186 => "Classic BASIC style line number is out of sequence.",
    NoLineNumber = 187 => "Line Number not found where expected.",
    IfWithoutEndIf = 189 => "ENDIF Missing.",
    WhileWithoutEndWhile = 190 => "While Statement is missing a matching EndWhile.",
    EndWhileWithoutWhile = 191 => "EndWhile Without While.",
    ExceptionThrownOnStack = 222 => "UNEXPECTED INTERNAL (Exception on stack)",
    StackOverflow = 223 => "Stack overflow.",
    NotAFunction = 224 => "Function Call Operator ( ) attempted on non-function.",
    UnsupportedUnicode = 225 => "Error: Unicode not supported.",
    ValueReturn = 226 => "Return from non-function.",
    BadNumberOfIndexes = 227 => "Invalid number of Array indexes.",
    BadLHS = 228 => "Invalid value for left-side of expression.",
    MissingReturnValue = 229 => "Function does not have a required return.",
    UninitializedFunction = 230 => "Use of a reference to a function/sub that is not initialized.",
    UndimmedArray = 231 => "Array operation attempted on variable not DIM'd.",
    NonNumericArrayIndex = 232 => "Attempt to use a non-numeric array index not allowed.",
    UninitializedVariable = 233 => "Use of uninitialized variable.",
    TypelessOperation = 235 => "Operation on UnTyped operand(s) attempted.",
    DotOnNonObject = 236 => "'Dot' Operator attempted with invalid BrightScript Component or interface reference.",
    NonStaticInterfaceCall = 237 => "Interface function calls from type rotINTERFACE must by static.",
    NotWaitable = 238 => "Tried to Wait on an BrightScript Component that does not have MessagePort interface.",
    NotPrintable = 239 => "Non printable value.",
    ReturnValueIgnored = 240 => "Function returns a value that is ignored.",
    WrongNumberOfParams = 241 => "Wrong number of function parameters.",
    TooManyParams = 242 => "Too many function parameters (internal limit exceeded).",
    InterfaceNotAMember = 243 => "Interface not a member of BrightScript Component",
    MemberFunctionNotFound = 244 => "Member function not found in BrightScript Component or interface.",
    RoWrongNumberOfParams = 245 => "BrightScript Component function call does not have the correct number of parameters.",
    ObjectClassNotFound = 246 => "BrightScript Component Class not Found.",
    Stop = 247 => "STOP",
    Break = 248 => "BREAK",
    StackUnderflow = 249 => "Stack Underflow.",
    MissingParenthesis = 250 => "Missing Parentheses",
    UndefinedOperator = 251 => "Unsupported expression operator.",
    NormalEnd = 252 => "Normal End.",
    UndefinedOpCode = 253 => "Undefined Op Code.",
    Internal = 254 => "UNEXPECTED INTERNAL.",
    Okay = 255 => "OKAY",
}

impl RuntimeErrorDetail {
    pub fn from_errno(errno: i32) -> Option<RuntimeErrorDetail> {
        Self::ALL.iter().copied().find(|detail| detail.errno() == errno)
    }

    pub fn message(self) -> String {
        self.to_string()
    }
}

/// One frame of the call stack.
#[derive(Clone, Debug)]
pub struct TracePoint {
    pub function_name: String,
    pub function_location: Location,
    pub call_location: Location,
    pub signature: Signature,
}

impl TracePoint {
    /// `name(a As Integer,b As String) As Void`, as shown in backtraces.
    pub fn signature_text(&self) -> String {
        let args: Vec<String> = self
            .signature
            .args
            .iter()
            .map(|arg| format!("{} As {}", arg.name, arg.kind))
            .collect();
        format!(
            "{}({}) As {}",
            self.function_name,
            args.join(","),
            self.signature.returns
        )
    }
}

/// Any error raised while running a script.
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct BrsError {
    pub message: String,
    pub errno: Option<i32>,
    pub location: Location,
    pub backtrace: Option<Vec<TracePoint>>,
    /// Extra members of a thrown associative array, surfaced to `catch`.
    pub extra_fields: Vec<(String, Value)>,
}

impl BrsError {
    pub fn new(message: impl Into<String>, location: Location) -> Self {
        Self {
            message: message.into(),
            errno: None,
            location,
            backtrace: None,
            extra_fields: Vec::new(),
        }
    }

    pub fn runtime(detail: RuntimeErrorDetail, location: Location) -> Self {
        Self::with_errno(detail.errno(), detail.message(), location)
    }

    pub fn with_errno(errno: i32, message: impl Into<String>, location: Location) -> Self {
        Self {
            errno: Some(errno),
            ..Self::new(message, location)
        }
    }

    pub fn with_backtrace(mut self, backtrace: Vec<TracePoint>) -> Self {
        self.backtrace = Some(backtrace);
        self
    }

    pub fn is_runtime(&self) -> bool {
        self.errno.is_some()
    }

    /// Error number exposed to `catch`; non-runtime errors report `Internal`.
    pub fn number(&self) -> i32 {
        self.errno
            .unwrap_or_else(|| RuntimeErrorDetail::Internal.errno())
    }

    pub fn format(&self) -> String {
        format!("{}: {}", self.location, self.message)
    }
}

/// Operand descriptor for type-mismatch messages.
#[derive(Clone, Debug)]
pub struct Operand {
    pub kind: ValueKind,
    pub location: Location,
}

impl Operand {
    pub fn new(kind: ValueKind, location: &Location) -> Self {
        Self {
            kind,
            location: location.clone(),
        }
    }
}

/// Builder for the `Type Mismatch.` family of runtime errors.
#[derive(Clone, Debug)]
pub struct TypeMismatch {
    pub message: String,
    pub left: Operand,
    pub right: Option<Operand>,
    pub cast: bool,
}

impl TypeMismatch {
    pub fn new(message: impl Into<String>, left: Operand, right: Option<Operand>) -> Self {
        Self {
            message: message.into(),
            left,
            right,
            cast: false,
        }
    }

    /// `Unable to cast "value" to "target"`.
    pub fn cast(target: Operand, value: Operand) -> Self {
        Self {
            message: String::new(),
            left: target,
            right: Some(value),
            cast: true,
        }
    }

    pub fn into_error(self) -> BrsError {
        let detail = RuntimeErrorDetail::TypeMismatch;
        let text = match (&self.right, self.cast) {
            (Some(right), true) => format!(
                "{} Unable to cast \"{}\" to \"{}\".",
                detail, right.kind, self.left.kind
            ),
            (Some(right), false) => format!(
                "{} {} \"{}\" and \"{}\".",
                detail, self.message, self.left.kind, right.kind
            ),
            (None, _) => format!("{} {} \"{}\".", detail, self.message, self.left.kind),
        };
        let location = match &self.right {
            Some(right) if right.location.file == self.left.location.file => {
                self.left.location.union(&right.location)
            }
            _ => self.left.location.clone(),
        };
        BrsError::with_errno(detail.errno(), text, location)
    }
}

impl From<TypeMismatch> for BrsError {
    fn from(mismatch: TypeMismatch) -> Self {
        mismatch.into_error()
    }
}

/// Non-local control transfer. Loops catch the exit/continue variants, call
/// frames catch `Return`, and everything reaches the top-level runner otherwise.
#[derive(Debug)]
pub enum Signal {
    ExitFor(Location),
    ExitWhile(Location),
    ContinueFor(Location),
    ContinueWhile(Location),
    Goto { label: String, location: Location },
    Return { value: Option<Value>, location: Location },
    End(Location),
    DebugExit(Location),
    Error(Box<BrsError>),
}

impl From<BrsError> for Signal {
    fn from(error: BrsError) -> Self {
        Signal::Error(Box::new(error))
    }
}

pub fn format_location(location: &Location) -> String {
    let file = if location.file.starts_with("pkg:") {
        location.file.to_string()
    } else {
        format!("pkg:/{}", location.file)
    };
    if location.start.line > 0 {
        format!("{}({})", file, location.start.line)
    } else {
        format!("{}(??)", file)
    }
}

/// Text backtrace, innermost frame first.
pub fn format_backtrace(location: &Location, stack: &[TracePoint]) -> String {
    let mut text = String::new();
    let mut current = location.clone();
    for (index, frame) in stack.iter().enumerate().rev() {
        text.push_str(&format!("#{}  Function {}\r\n", index, frame.signature_text()));
        text.push_str(&format!("   file/line: {}\r\n", format_location(&current)));
        current = frame.call_location.clone();
    }
    text
}

/// Backtrace as an roArray of `{filename, function, line_number}`, outermost first.
pub fn backtrace_array(location: &Location, stack: &[TracePoint]) -> Value {
    let mut frames = Vec::with_capacity(stack.len());
    let mut current = location.clone();
    for frame in stack.iter().rev() {
        frames.push(Value::new_assoc_array(vec![
            ("filename".to_string(), Value::string(current.file.to_string())),
            ("function".to_string(), Value::string(frame.signature_text())),
            (
                "line_number".to_string(),
                Value::Int32(current.start.line as i32),
            ),
        ]));
        current = frame.call_location.clone();
    }
    frames.reverse();
    Value::new_array(frames)
}

/// Identifier returned by `on_error`; pass it to `remove_observer` to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

struct Observer {
    id: ObserverId,
    once: bool,
    handler: Box<dyn FnMut(&BrsError)>,
}

/// Per-interpreter accumulator of raised errors plus their observers.
#[derive(Default)]
pub struct ErrorSink {
    errors: Vec<BrsError>,
    observers: Vec<Observer>,
    next_id: usize,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &[BrsError] {
        &self.errors
    }

    pub fn subscribe(&mut self, once: bool, handler: Box<dyn FnMut(&BrsError)>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push(Observer { id, once, handler });
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|observer| observer.id != id);
        before != self.observers.len()
    }

    pub fn record(&mut self, error: &BrsError) {
        self.errors.push(error.clone());
        for observer in self.observers.iter_mut() {
            (observer.handler)(error);
        }
        self.observers.retain(|observer| !observer.once);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::span::{Position, Span};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn at(line: usize, start: usize, end: usize) -> Location {
        Location::new(
            Rc::from("source/main.brs"),
            Position::new(line, start),
            Position::new(line, end),
            Span::default(),
        )
    }

    #[test]
    fn details_round_trip_through_errno() {
        for detail in RuntimeErrorDetail::ALL {
            assert_eq!(RuntimeErrorDetail::from_errno(detail.errno()), Some(*detail));
        }
        assert_eq!(RuntimeErrorDetail::BadBitShift.errno(), 30);
        assert_eq!(RuntimeErrorDetail::from_errno(3), None);
    }

    #[test]
    fn format_includes_location_and_message() {
        let err = BrsError::runtime(RuntimeErrorDetail::DivideByZero, at(4, 2, 9));
        assert_eq!(err.format(), "source/main.brs(4,2-9): Divide by Zero.");
        assert_eq!(err.number(), 20);
        assert_eq!(BrsError::new("oops", at(1, 0, 0)).number(), 254);
    }

    #[test]
    fn type_mismatch_phrasings() {
        let binary = TypeMismatch::new(
            "Operator \"+\" can't be applied to",
            Operand::new(ValueKind::Int32, &at(1, 0, 1)),
            Some(Operand::new(ValueKind::String, &at(1, 4, 7))),
        )
        .into_error();
        assert_eq!(
            binary.message,
            "Type Mismatch. Operator \"+\" can't be applied to \"Integer\" and \"String\"."
        );
        assert_eq!(binary.location.end.column, 7);

        let cast = TypeMismatch::cast(
            Operand::new(ValueKind::Int32, &at(1, 0, 2)),
            Operand::new(ValueKind::String, &at(1, 5, 8)),
        )
        .into_error();
        assert_eq!(cast.message, "Type Mismatch. Unable to cast \"String\" to \"Integer\".");
        assert_eq!(cast.errno, Some(24));
    }

    #[test]
    fn backtrace_text_walks_frames_innermost_first() {
        let frame = |name: &str, call_line: usize| TracePoint {
            function_name: name.to_string(),
            function_location: at(1, 0, 0),
            call_location: at(call_line, 0, 0),
            signature: Signature {
                args: Vec::new(),
                returns: ValueKind::Void,
                variadic: false,
            },
        };
        let stack = vec![frame("main", 1), frame("helper", 7)];
        let text = format_backtrace(&at(12, 0, 0), &stack);
        assert_eq!(
            text,
            "#1  Function helper() As Void\r\n   file/line: pkg:/source/main.brs(12)\r\n\
             #0  Function main() As Void\r\n   file/line: pkg:/source/main.brs(7)\r\n"
        );
    }

    #[test]
    fn once_observers_fire_a_single_time() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut sink = ErrorSink::new();
        let captured = seen.clone();
        sink.subscribe(
            true,
            Box::new(move |err: &BrsError| captured.borrow_mut().push(err.message.clone())),
        );
        sink.record(&BrsError::new("first", at(1, 0, 0)));
        sink.record(&BrsError::new("second", at(1, 0, 0)));
        assert_eq!(*seen.borrow(), vec!["first".to_string()]);
        assert_eq!(sink.errors().len(), 2);
    }
}
