use nix::sys::wait::WaitStatus as WS;

/// Returned when a redirection cannot be set up or a pipe stage is ambiguous.
pub const EXIT_FAILURE: i32 = 1;
/// `execvp` returned: the program could not be found or run.
pub const EXIT_NOT_FOUND: i32 = 127;
/// `fork`, `pipe` or `waitpid` failed in the interpreter itself (sysexits EX_OSERR).
pub const EXIT_OS_ERROR: i32 = 71;
/// Offset added to the signal number of a signal-terminated child.
pub const SIGNAL_OFFSET: i32 = 128;

/// Collapses a wait result into a single shell exit status.
pub fn normalize(ws: WS) -> i32 {
    match ws {
        WS::Exited(_, code) => code,
        WS::Signaled(_, sig, _core_dumped) => SIGNAL_OFFSET + sig as i32,
        _ => EXIT_FAILURE,
    }
}

/// C `atoi`: optional leading whitespace and sign, then as many digits as
/// are present. Anything unparsable is 0.
pub fn atoi(text: &str) -> i32 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut value: i32 = 0;
    for b in digits.bytes().take_while(|b| b.is_ascii_digit()) {
        value = value.wrapping_mul(10).wrapping_add(i32::from(b - b'0'));
    }

    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}
