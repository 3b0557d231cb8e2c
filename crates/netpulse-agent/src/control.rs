//! Control signals accepted by a monitor worker

use std::fmt;
use std::str::FromStr;

/// External control over a monitor worker
///
/// Signals travel as raw `i32` codes so that unknown values reach the worker
/// and are rejected there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ControlSignal {
    /// Capture a fresh baseline, emit a full report and start sampling
    Start = 1,
    /// Sample at the burst interval for a limited number of ticks
    Burst = 2,
    /// Stop sampling until the next Start
    Stop = 4,
}

impl ControlSignal {
    /// Wire code of the signal
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for ControlSignal {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Start),
            2 => Ok(Self::Burst),
            4 => Ok(Self::Stop),
            other => Err(other),
        }
    }
}

impl From<ControlSignal> for i32 {
    fn from(signal: ControlSignal) -> Self {
        signal.code()
    }
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Burst => write!(f, "burst"),
            Self::Stop => write!(f, "stop"),
        }
    }
}

impl FromStr for ControlSignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "burst" => Ok(Self::Burst),
            "stop" => Ok(Self::Stop),
            _ => Err(format!("Unknown control signal: {}", s)),
        }
    }
}

/// Decode one line of control input into a raw code
///
/// Accepts signal names and numeric codes. Numeric codes are passed through
/// unchecked so the worker can reject them. Returns `None` for blank or
/// unparsable lines.
pub fn parse_control_line(line: &str) -> Option<i32> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Ok(code) = line.parse::<i32>() {
        return Some(code);
    }

    line.parse::<ControlSignal>().ok().map(ControlSignal::code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1, Ok(ControlSignal::Start) ; "start")]
    #[test_case(2, Ok(ControlSignal::Burst) ; "burst")]
    #[test_case(4, Ok(ControlSignal::Stop) ; "stop")]
    #[test_case(0, Err(0) ; "zero")]
    #[test_case(3, Err(3) ; "start or burst")]
    #[test_case(8, Err(8) ; "next bit")]
    #[test_case(256, Err(256) ; "beyond a byte")]
    #[test_case(-1, Err(-1) ; "negative")]
    fn test_decode_code(code: i32, expected: Result<ControlSignal, i32>) {
        assert_eq!(ControlSignal::try_from(code), expected);
    }

    #[test]
    fn test_codes_round_trip() {
        for signal in [ControlSignal::Start, ControlSignal::Burst, ControlSignal::Stop] {
            assert_eq!(ControlSignal::try_from(i32::from(signal)), Ok(signal));
        }
    }

    #[test_case("1", Some(1) ; "numeric start")]
    #[test_case(" 4 \n", Some(4) ; "numeric with whitespace")]
    #[test_case("7", Some(7) ; "unknown code forwarded")]
    #[test_case("start", Some(1) ; "named start")]
    #[test_case("BURST", Some(2) ; "named uppercase")]
    #[test_case("Stop", Some(4) ; "named mixed case")]
    #[test_case("", None ; "blank")]
    #[test_case("restart", None ; "unknown name")]
    #[test_case("300", Some(300) ; "wide code forwarded")]
    #[test_case("-1", Some(-1) ; "negative code forwarded")]
    #[test_case("99999999999", None ; "overflow")]
    fn test_parse_control_line(line: &str, expected: Option<i32>) {
        assert_eq!(parse_control_line(line), expected);
    }

    #[test]
    fn test_display_matches_parse() {
        for signal in [ControlSignal::Start, ControlSignal::Burst, ControlSignal::Stop] {
            assert_eq!(signal.to_string().parse::<ControlSignal>(), Ok(signal));
        }
    }
}
