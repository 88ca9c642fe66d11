//! Exceptions attached to log events.
//!
//! A [`Throwable`] carries a class name, an optional message, its captured
//! frames, and an optional cause. The cause lives in a [`OnceCell`] so it can
//! be linked after the throwable is shared, which makes cyclic cause chains
//! representable. Consumers therefore must not assume the chain terminates:
//! [`Throwable::root_cause`] detects loops, and
//! [`Throwable::write_stack_trace`] marks revisited throwables instead of
//! following them.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use thiserror::Error;

/// One captured frame of a stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub class_name: String,
    pub method_name: String,
    pub file_name: Option<String>,
    /// Source line; negative when unknown, `-2` for native frames.
    pub line_number: i32,
}

impl StackFrame {
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        file_name: Option<&str>,
        line_number: i32,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            file_name: file_name.map(str::to_string),
            line_number,
        }
    }

    pub fn is_native(&self) -> bool {
        self.line_number == -2
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.class_name, self.method_name)?;
        if self.is_native() {
            f.write_str("Native Method)")
        } else {
            match &self.file_name {
                Some(file) if self.line_number >= 0 => write!(f, "{}:{})", file, self.line_number),
                Some(file) => write!(f, "{})", file),
                None => f.write_str("Unknown Source)"),
            }
        }
    }
}

/// Raised when a cause chain loops back onto itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("loop in causal chain of {class_name}")]
pub struct CausalLoop {
    /// Class of the throwable where the loop was detected.
    pub class_name: String,
}

/// An exception, its frames, and its cause.
#[derive(Debug)]
pub struct Throwable {
    class_name: String,
    message: Option<String>,
    stack_trace: Vec<StackFrame>,
    cause: OnceCell<Arc<Throwable>>,
}

impl Throwable {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message: None,
            stack_trace: Vec::new(),
            cause: OnceCell::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_frame(mut self, frame: StackFrame) -> Self {
        self.stack_trace.push(frame);
        self
    }

    pub fn with_stack_trace(mut self, frames: Vec<StackFrame>) -> Self {
        self.stack_trace = frames;
        self
    }

    pub fn with_cause(self, cause: Arc<Throwable>) -> Self {
        // a fresh cell always accepts its first value
        let _ = self.cause.set(cause);
        self
    }

    /// Links a cause to an already shared throwable.
    ///
    /// Returns the rejected cause if one was already set.
    pub fn set_cause(&self, cause: Arc<Throwable>) -> Result<(), Arc<Throwable>> {
        self.cause.set(cause)
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn stack_trace(&self) -> &[StackFrame] {
        &self.stack_trace
    }

    pub fn cause(&self) -> Option<&Throwable> {
        self.cause.get().map(Arc::as_ref)
    }

    /// The last throwable of the cause chain; `self` when there is no cause.
    ///
    /// A second pointer walks the chain at half speed. If the leading pointer
    /// ever lands on it, the chain is cyclic and [`CausalLoop`] is returned.
    pub fn root_cause(&self) -> Result<&Throwable, CausalLoop> {
        let mut fast = self;
        let mut slow = self;
        let mut advance_slow = false;
        while let Some(next) = fast.cause() {
            fast = next;
            if ptr::eq(fast, slow) {
                return Err(CausalLoop {
                    class_name: fast.class_name.clone(),
                });
            }
            if advance_slow {
                if let Some(next_slow) = slow.cause() {
                    slow = next_slow;
                }
            }
            advance_slow = !advance_slow;
        }
        Ok(fast)
    }

    /// Writes the conventional multi-line stack trace text.
    ///
    /// Frames a cause shares with the trace that encloses it are collapsed
    /// into `... N more`. A throwable seen earlier in the chain is printed as
    /// `[CIRCULAR REFERENCE: ...]` and ends the output.
    pub fn write_stack_trace(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(out, "{}", self)?;
        for frame in &self.stack_trace {
            writeln!(out, "\tat {}", frame)?;
        }

        let mut seen: Vec<&Throwable> = vec![self];
        let mut enclosing = self;
        let mut current = self.cause();
        while let Some(throwable) = current {
            if seen.iter().any(|visited| ptr::eq(*visited, throwable)) {
                writeln!(out, "Caused by: [CIRCULAR REFERENCE: {}]", throwable)?;
                break;
            }
            seen.push(throwable);

            let trace = &throwable.stack_trace;
            let in_common = frames_in_common(trace, &enclosing.stack_trace);
            writeln!(out, "Caused by: {}", throwable)?;
            for frame in &trace[..trace.len() - in_common] {
                writeln!(out, "\tat {}", frame)?;
            }
            if in_common > 0 {
                writeln!(out, "\t... {} more", in_common)?;
            }

            enclosing = throwable;
            current = throwable.cause();
        }
        Ok(())
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.class_name, message),
            None => f.write_str(&self.class_name),
        }
    }
}

/// Number of trailing frames `trace` shares with `enclosing`.
fn frames_in_common(trace: &[StackFrame], enclosing: &[StackFrame]) -> usize {
    trace
        .iter()
        .rev()
        .zip(enclosing.iter().rev())
        .take_while(|(a, b)| a == b)
        .count()
}
