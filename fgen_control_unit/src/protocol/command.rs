//! Command parsing.
//!
//! A line is matched against an ordered prefix table, case-sensitive; the
//! first match wins. `RF:OUTPUT ON` and `RF:OUTPUT OFF` must match the whole
//! line. Anything else is `Unknown`.

/// One parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Identify,
    Reset,
    Status,
    SetFrequency(u64),
    GetFrequency,
    SetPower(i8),
    GetPower,
    SetOutput(bool),
    GetOutput,
    ProgramRun,
    ProgramStop,
    CalibrationStart,
    CalibrationSave,
    Unknown(String),
}

#[derive(Clone, Copy)]
enum Match {
    Prefix,
    Exact,
}

/// Builds the command from the text following the matched keyword.
type Build = fn(&str) -> Command;

const TABLE: &[(&str, Match, Build)] = &[
    ("SYS:IDN?", Match::Prefix, |_| Command::Identify),
    ("SYS:RESET", Match::Prefix, |_| Command::Reset),
    ("SYS:STAT?", Match::Prefix, |_| Command::Status),
    ("RF:FREQ ", Match::Prefix, |arg| {
        Command::SetFrequency(saturate_u64(parse_integer(arg)))
    }),
    ("RF:FREQ?", Match::Prefix, |_| Command::GetFrequency),
    ("RF:POWER ", Match::Prefix, |arg| {
        Command::SetPower(saturate_i8(parse_integer(arg)))
    }),
    ("RF:POWER?", Match::Prefix, |_| Command::GetPower),
    ("RF:OUTPUT ON", Match::Exact, |_| Command::SetOutput(true)),
    ("RF:OUTPUT OFF", Match::Exact, |_| Command::SetOutput(false)),
    ("RF:OUTPUT?", Match::Prefix, |_| Command::GetOutput),
    ("PROG:RUN", Match::Prefix, |_| Command::ProgramRun),
    ("PROG:STOP", Match::Prefix, |_| Command::ProgramStop),
    ("CAL:START", Match::Prefix, |_| Command::CalibrationStart),
    ("CAL:SAVE", Match::Prefix, |_| Command::CalibrationSave),
];

impl Command {
    /// Parse one framed line.
    pub fn parse(line: &str) -> Self {
        for &(keyword, kind, build) in TABLE {
            let arg = match kind {
                Match::Prefix => line.strip_prefix(keyword),
                Match::Exact => (line == keyword).then_some(""),
            };
            if let Some(arg) = arg {
                return build(arg);
            }
        }
        Command::Unknown(line.to_string())
    }
}

/// Tolerant decimal integer parser.
///
/// Skips leading whitespace, accepts an optional sign, then reads digits up
/// to the first non-digit. No digits yields 0. Saturates at the `i64` bounds.
pub fn parse_integer(text: &str) -> i64 {
    let s = text.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut value: i64 = 0;
    for d in digits.bytes().take_while(u8::is_ascii_digit) {
        let d = (d - b'0') as i64;
        value = if negative {
            value.saturating_mul(10).saturating_sub(d)
        } else {
            value.saturating_mul(10).saturating_add(d)
        };
    }
    value
}

fn saturate_u64(value: i64) -> u64 {
    value.max(0) as u64
}

fn saturate_i8(value: i64) -> i8 {
    value.clamp(i8::MIN as i64, i8::MAX as i64) as i8
}
