use crate::{CompileError, LoweringErrorKind};

/// Helper to create lowering errors
pub fn make_lowering_error(
    kind: LoweringErrorKind,
    line: usize,
    message: impl Into<String>,
) -> CompileError {
    CompileError::Lowering {
        kind,
        line,
        message: message.into(),
    }
}
