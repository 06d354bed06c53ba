use nom::{
    branch::alt,
    character::complete::{char, one_of, space0, space1},
    combinator::{map_res, opt, recognize},
    multi::{many1, separated_list1},
    sequence::{delimited, pair, tuple},
    IResult,
};

use crate::error::{Result, W90Error};

pub fn decimal(input: &str) -> IResult<&str, u32> {
    map_res(recognize(many1(one_of("0123456789"))), |out: &str| {
        out.parse::<u32>()
    })(input)
}

pub fn decimal_usize(input: &str) -> IResult<&str, usize> {
    map_res(recognize(many1(one_of("0123456789"))), |out: &str| {
        out.parse::<usize>()
    })(input)
}

/// Signed floating point number. Accepts `.42`, `42`, `42.`, `42.42`,
/// each optionally followed by an exponent.
pub fn float(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            alt((
                // Case one: .42
                recognize(pair(char('.'), decimal)),
                // Case two: 42, 42. and 42.42
                recognize(pair(decimal, opt(pair(char('.'), opt(decimal))))),
            )),
            opt(tuple((one_of("eE"), opt(one_of("+-")), decimal))),
        ))),
        |out: &str| out.parse::<f64>(),
    )(input)
}

/// Whitespace separated floats at the start of a line. Trailing text
/// (labels, comments) is left in the remainder.
pub fn float_row(input: &str) -> IResult<&str, Vec<f64>> {
    delimited(space0, separated_list1(space1, float), space0)(input)
}

/// Turn a nom result into the crate error, naming the file format and
/// the start of the input the parser stopped at.
pub fn finish<'a, T>(format: &'static str, res: IResult<&'a str, T>) -> Result<(&'a str, T)> {
    res.map_err(|e| match e {
        nom::Err::Error(e) | nom::Err::Failure(e) => W90Error::parse(
            format,
            format!("{:?} near `{}`", e.code, snippet(e.input)),
        ),
        nom::Err::Incomplete(_) => W90Error::parse(format, "incomplete input"),
    })
}

/// Parse a full line of floats, failing on leftover text.
pub fn float_line(format: &'static str, line: &str) -> Result<Vec<f64>> {
    let (rest, values) = finish(format, float_row(line))?;
    if rest.is_empty() {
        Ok(values)
    } else {
        Err(W90Error::parse(
            format,
            format!("unexpected text `{}`", snippet(rest)),
        ))
    }
}

fn snippet(input: &str) -> &str {
    let line = input.lines().next().unwrap_or("");
    match line.char_indices().nth(40) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_float_forms() {
        assert_eq!(float("-0.125 x").unwrap(), (" x", -0.125));
        assert_eq!(float(".5").unwrap().1, 0.5);
        assert_eq!(float("42").unwrap().1, 42.0);
        assert_eq!(float("42.").unwrap().1, 42.0);
        assert_eq!(float("+1.5E-02").unwrap().1, 0.015);
        assert_eq!(float("0.149E+02").unwrap().1, 14.9);
        assert!(float("abc").is_err());
    }

    #[test]
    fn test_float_row_stops_at_label() {
        let (rest, row) = float_row("  0.0 0.5   0.0 ! X").unwrap();
        assert_eq!(row, vec![0.0, 0.5, 0.0]);
        assert_eq!(rest, "! X");
    }

    #[test]
    fn test_float_line_rejects_text() {
        assert!(float_line("test", "1.0 2.0").is_ok());
        assert!(float_line("test", "1.0 abc").is_err());
    }
}
