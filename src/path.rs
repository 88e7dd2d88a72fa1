//! SVG path data parsing and serialization.
//!
//! SVG path syntax: https://www.w3.org/TR/SVG/paths.html

use crate::error::PathError;

/// Path command kind, independent of relative/absolute form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// M/m
    MoveTo,
    /// L/l
    LineTo,
    /// H/h
    HorizontalTo,
    /// V/v
    VerticalTo,
    /// C/c
    CurveTo,
    /// S/s
    SmoothCurveTo,
    /// Q/q
    QuadTo,
    /// T/t
    SmoothQuadTo,
    /// A/a
    Arc,
    /// Z/z
    ClosePath,
}

impl Instruction {
    /// Decode a command letter into its instruction and relativity.
    pub fn from_letter(c: char) -> Option<(Self, bool)> {
        let instruction = match c.to_ascii_lowercase() {
            'm' => Self::MoveTo,
            'l' => Self::LineTo,
            'h' => Self::HorizontalTo,
            'v' => Self::VerticalTo,
            'c' => Self::CurveTo,
            's' => Self::SmoothCurveTo,
            'q' => Self::QuadTo,
            't' => Self::SmoothQuadTo,
            'a' => Self::Arc,
            'z' => Self::ClosePath,
            _ => return None,
        };
        Some((instruction, c.is_ascii_lowercase()))
    }

    pub fn letter(self, relative: bool) -> char {
        let upper = match self {
            Self::MoveTo => 'M',
            Self::LineTo => 'L',
            Self::HorizontalTo => 'H',
            Self::VerticalTo => 'V',
            Self::CurveTo => 'C',
            Self::SmoothCurveTo => 'S',
            Self::QuadTo => 'Q',
            Self::SmoothQuadTo => 'T',
            Self::Arc => 'A',
            Self::ClosePath => 'Z',
        };
        if relative { upper.to_ascii_lowercase() } else { upper }
    }

    /// Number of arguments one command of this kind takes.
    pub fn arity(self) -> usize {
        match self {
            Self::ClosePath => 0,
            Self::HorizontalTo | Self::VerticalTo => 1,
            Self::MoveTo | Self::LineTo | Self::SmoothQuadTo => 2,
            Self::SmoothCurveTo | Self::QuadTo => 4,
            Self::CurveTo => 6,
            Self::Arc => 7,
        }
    }
}

/// One path command. Arc flags are stored as `0.0` / `1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub instruction: Instruction,
    pub relative: bool,
    pub args: Vec<f64>,
}

impl Command {
    pub fn new(instruction: Instruction, relative: bool, args: Vec<f64>) -> Self {
        Self {
            instruction,
            relative,
            args,
        }
    }

    pub fn letter(&self) -> char {
        self.instruction.letter(self.relative)
    }
}

/// A parsed `d` attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathData {
    pub commands: Vec<Command>,
}

impl PathData {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Append another path's commands.
    ///
    /// A leading relative moveto is relative to the origin in its own path,
    /// so it is made absolute before it lands after our last point.
    pub fn append(&mut self, other: PathData) {
        let mut commands = other.commands.into_iter();
        if let Some(mut first) = commands.next() {
            if first.instruction == Instruction::MoveTo {
                first.relative = false;
            }
            self.commands.push(first);
        }
        self.commands.extend(commands);
    }

    /// Equivalent path where every command uses absolute coordinates.
    pub fn to_absolute(&self) -> PathData {
        let mut current = (0.0, 0.0);
        let mut subpath_start = (0.0, 0.0);
        let mut commands = Vec::with_capacity(self.commands.len());

        for cmd in &self.commands {
            let (dx, dy) = if cmd.relative { current } else { (0.0, 0.0) };
            let mut args = cmd.args.clone();
            match cmd.instruction {
                Instruction::ClosePath => {
                    current = subpath_start;
                }
                Instruction::HorizontalTo => {
                    if let Some(x) = args.first_mut() {
                        *x += dx;
                        current.0 = *x;
                    }
                }
                Instruction::VerticalTo => {
                    if let Some(y) = args.first_mut() {
                        *y += dy;
                        current.1 = *y;
                    }
                }
                instruction => {
                    let pairs = if instruction == Instruction::Arc {
                        args.get_mut(5..).unwrap_or_default()
                    } else {
                        &mut args[..]
                    };
                    for pair in pairs.chunks_exact_mut(2) {
                        pair[0] += dx;
                        pair[1] += dy;
                        current = (pair[0], pair[1]);
                    }
                    if instruction == Instruction::MoveTo {
                        subpath_start = current;
                    }
                }
            }
            commands.push(Command::new(cmd.instruction, false, args));
        }

        PathData { commands }
    }
}

/// Output options for [`serialize_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathFormat {
    /// Decimal places to round to; `None` keeps the shortest exact form.
    pub precision: Option<u8>,
    /// Write `0.5` as `.5`.
    pub leading_zero: bool,
    /// Drop the separator before negative numbers and before `.5` following a fractional number.
    pub negative_extra_space: bool,
    /// Drop the separators after arc flags.
    pub no_space_after_flags: bool,
    /// Omit repeated command letters (and `L` right after `M`).
    pub collapse_repeated: bool,
}

impl Default for PathFormat {
    fn default() -> Self {
        Self {
            precision: None,
            leading_zero: true,
            negative_extra_space: true,
            no_space_after_flags: false,
            collapse_repeated: true,
        }
    }
}

/// Parse SVG path data.
pub fn parse_path(d: &str) -> Result<PathData, PathError> {
    PathParser::new(d).parse()
}

/// Serialize path data.
pub fn serialize_path(path: &PathData, format: &PathFormat) -> String {
    // (letter, instruction, concatenated args)
    let mut groups: Vec<(char, Instruction, Vec<f64>)> = Vec::new();
    let mut prev: Option<(Instruction, bool)> = None;

    for cmd in &path.commands {
        let continues = format.collapse_repeated
            && prev.is_some_and(|(instruction, relative)| {
                relative == cmd.relative
                    && match (instruction, cmd.instruction) {
                        (Instruction::MoveTo, Instruction::LineTo) => true,
                        (Instruction::MoveTo | Instruction::ClosePath, _) => false,
                        (a, b) => a == b,
                    }
            });
        match groups.last_mut() {
            Some(group) if continues => group.2.extend_from_slice(&cmd.args),
            _ => groups.push((cmd.letter(), cmd.instruction, cmd.args.clone())),
        }
        prev = Some((cmd.instruction, cmd.relative));
    }

    let mut out = String::new();
    for (letter, instruction, args) in &groups {
        out.push(*letter);
        out.push_str(&cleanup_out_data(args, format, *instruction == Instruction::Arc));
    }
    out
}

/// Join numbers with the fewest separators the options allow.
fn cleanup_out_data(data: &[f64], format: &PathFormat, arc: bool) -> String {
    let mut out = String::new();
    let mut prev: Option<f64> = None;

    for (i, &raw) in data.iter().enumerate() {
        let value = round(raw, format.precision);
        let mut text = format_number(value, None);
        if format.leading_zero {
            text = remove_leading_zero(&text);
        }

        let mut delimiter = i > 0;
        if arc && format.no_space_after_flags && matches!(i % 7, 4 | 5) {
            delimiter = false;
        }
        if format.negative_extra_space
            && delimiter
            && (value < 0.0 || (text.starts_with('.') && prev.is_some_and(|p| p.fract() != 0.0)))
        {
            delimiter = false;
        }

        if delimiter {
            out.push(' ');
        }
        out.push_str(&text);
        prev = Some(value);
    }

    out
}

fn round(n: f64, precision: Option<u8>) -> f64 {
    match precision {
        Some(p) => {
            let factor = 10f64.powi(i32::from(p));
            (n * factor).round() / factor
        }
        None => n,
    }
}

/// Format a number, rounded to `precision` decimals if given, in its
/// shortest round-trip form without a trailing `.0`.
pub fn format_number(n: f64, precision: Option<u8>) -> String {
    let n = round(n, precision);
    if n == 0.0 {
        return "0".into();
    }
    let mut buffer = ryu::Buffer::new();
    let s = buffer.format(n);
    s.strip_suffix(".0").unwrap_or(s).to_string()
}

/// `0.5` → `.5`, `-0.5` → `-.5`.
pub fn remove_leading_zero(text: &str) -> String {
    if let Some(rest) = text.strip_prefix("0.") {
        format!(".{rest}")
    } else if let Some(rest) = text.strip_prefix("-0.") {
        format!("-.{rest}")
    } else {
        text.to_string()
    }
}

struct PathParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> PathParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self, message: impl Into<String>) -> PathError {
        PathError {
            message: message.into(),
            offset: self.pos,
        }
    }

    fn parse(&mut self) -> Result<PathData, PathError> {
        let mut commands = Vec::new();
        let mut current: Option<(Instruction, bool)> = None;

        self.skip_whitespace();

        while !self.is_eof() {
            let (instruction, relative) = match self.peek() {
                Some(c) if c.is_ascii_alphabetic() => {
                    let parsed = Instruction::from_letter(c)
                        .ok_or_else(|| self.error(format!("unknown command `{c}`")))?;
                    if commands.is_empty() && parsed.0 != Instruction::MoveTo {
                        return Err(self.error("path data must start with a moveto"));
                    }
                    self.next();
                    parsed
                }
                // Implicit command: repeat the last one, lineto after moveto
                _ => match current {
                    Some((Instruction::MoveTo, relative)) => (Instruction::LineTo, relative),
                    Some((Instruction::ClosePath, _)) | None => {
                        return Err(self.error("expected a command letter"));
                    }
                    Some(other) => other,
                },
            };

            let args = self.parse_args(instruction)?;
            commands.push(Command::new(instruction, relative, args));
            current = Some((instruction, relative));
            self.skip_whitespace_and_comma();
        }

        Ok(PathData { commands })
    }

    fn parse_args(&mut self, instruction: Instruction) -> Result<Vec<f64>, PathError> {
        let arity = instruction.arity();
        let mut args = Vec::with_capacity(arity);
        for i in 0..arity {
            if i > 0 {
                self.skip_whitespace_and_comma();
            }
            let value = if instruction == Instruction::Arc && (i == 3 || i == 4) {
                self.parse_flag()?
            } else {
                self.parse_number()?
            };
            args.push(value);
        }
        Ok(args)
    }

    fn parse_number(&mut self) -> Result<f64, PathError> {
        self.skip_whitespace();

        let start = self.pos;

        if matches!(self.peek(), Some('-' | '+')) {
            self.next();
        }
        self.skip_digits();
        if self.peek() == Some('.') {
            self.next();
            self.skip_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.next();
            if matches!(self.peek(), Some('-' | '+')) {
                self.next();
            }
            self.skip_digits();
        }

        let s = &self.input[start..self.pos];
        if s.is_empty() {
            return Err(self.error("expected a number"));
        }

        s.parse()
            .map_err(|_| self.error(format!("invalid number `{s}`")))
    }

    /// Flags are a single character, so `a1 1 0 00 5 5` is valid.
    fn parse_flag(&mut self) -> Result<f64, PathError> {
        self.skip_whitespace();
        match self.next() {
            Some('0') => Ok(0.0),
            Some('1') => Ok(1.0),
            Some(c) => Err(self.error(format!("expected an arc flag, got `{c}`"))),
            None => Err(self.error("expected an arc flag")),
        }
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.next();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.next();
        }
    }

    fn skip_whitespace_and_comma(&mut self) {
        self.skip_whitespace();
        if self.peek() == Some(',') {
            self.next();
        }
        self.skip_whitespace();
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_path() {
        let path = parse_path("M10 20 L30 40").unwrap();
        assert_eq!(path.commands.len(), 2);
        assert_eq!(path.commands[1].args, vec![30.0, 40.0]);
    }

    #[test]
    fn test_parse_implicit_lineto() {
        let path = parse_path("m10 20 30 40 5 5").unwrap();
        assert_eq!(path.commands.len(), 3);
        assert_eq!(path.commands[1].instruction, Instruction::LineTo);
        assert!(path.commands[1].relative);
    }

    #[test]
    fn test_parse_compact_numbers() {
        let path = parse_path("M.5.5-1-2l1e2.25").unwrap();
        assert_eq!(path.commands[0].args, vec![0.5, 0.5]);
        assert_eq!(path.commands[1].args, vec![-1.0, -2.0]);
        assert_eq!(path.commands[2].args, vec![100.0, 0.25]);
    }

    #[test]
    fn test_parse_arc_flags_without_separators() {
        let path = parse_path("M0 0a10 20 30 1020 20").unwrap();
        assert_eq!(
            path.commands[1].args,
            vec![10.0, 20.0, 30.0, 1.0, 0.0, 20.0, 20.0]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_path("L10 10").is_err());
        assert!(parse_path("M10").is_err());
        assert!(parse_path("M0 0 A1 1 0 2 0 5 5").is_err());
        assert!(parse_path("M0 0z 5 5").is_err());
        assert!(parse_path("M0 0 X").is_err());
        assert_eq!(parse_path("").unwrap(), PathData::default());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.0, None), "0");
        assert_eq!(format_number(-0.0001, Some(2)), "0");
        assert_eq!(format_number(1.0, None), "1");
        assert_eq!(format_number(1.5, Some(2)), "1.5");
        assert_eq!(format_number(0.1 + 0.2, Some(3)), "0.3");
        assert_eq!(format_number(1.234, Some(2)), "1.23");
        assert_eq!(format_number(-12.0, None), "-12");
        assert_eq!(remove_leading_zero("-0.5"), "-.5");
        assert_eq!(remove_leading_zero("10.5"), "10.5");
    }

    #[test]
    fn test_serialize_path() {
        let path = parse_path("M 10.00 20.00 L 30.00 40.00 Z").unwrap();
        let format = PathFormat {
            precision: Some(0),
            ..PathFormat::default()
        };
        assert_eq!(serialize_path(&path, &format), "M10 20 30 40Z");
    }

    #[test]
    fn test_serialize_compact() {
        let path = parse_path("M 0.5 0.5 L -0.5 -0.5").unwrap();
        assert_eq!(serialize_path(&path, &PathFormat::default()), "M.5.5-.5-.5");

        let spaced = PathFormat {
            leading_zero: false,
            negative_extra_space: false,
            collapse_repeated: false,
            ..PathFormat::default()
        };
        assert_eq!(serialize_path(&path, &spaced), "M0.5 0.5L-0.5 -0.5");
    }

    #[test]
    fn test_serialize_keeps_repeated_moveto() {
        let path = parse_path("M0 0 L1 1 M5 5 L6 6 L7 7").unwrap();
        assert_eq!(serialize_path(&path, &PathFormat::default()), "M0 0 1 1M5 5 6 6 7 7");
    }

    #[test]
    fn test_serialize_arc_flags() {
        let path = parse_path("M0 0 A10 10 0 0 1 20 20").unwrap();
        let tight = PathFormat {
            no_space_after_flags: true,
            ..PathFormat::default()
        };
        assert_eq!(serialize_path(&path, &tight), "M0 0A10 10 0 0120 20");
        assert_eq!(parse_path("M0 0A10 10 0 0120 20").unwrap(), path);
    }

    #[test]
    fn test_round_trip_preserves_commands() {
        let src = "M10 10c.5-1.25 3 4-2 2s1 1 2 2q1 1 2 2t3 3h-5v.5a5 5 0 1 0-10 0z";
        let path = parse_path(src).unwrap();
        let again = parse_path(&serialize_path(&path, &PathFormat::default())).unwrap();
        assert_eq!(again, path);
    }

    #[test]
    fn test_append_makes_leading_moveto_absolute() {
        let mut a = parse_path("M0 0h10").unwrap();
        a.append(parse_path("m20 20h5").unwrap());
        assert_eq!(serialize_path(&a, &PathFormat::default()), "M0 0h10M20 20h5");
    }

    #[test]
    fn test_to_absolute() {
        let path = parse_path("m10 10 5 5h5v-5z l1 1").unwrap().to_absolute();
        let expected = parse_path("M10 10 15 15H20V10Z L11 11").unwrap();
        assert_eq!(path, expected);
    }
}
