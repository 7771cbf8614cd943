use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, opt, value},
    number::complete::double,
    sequence::preceded,
    IResult, Parser,
};

use crate::error::ReadingError;

/// Detection-limit qualifier written in front of a lab value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    /// `<x`: below the detection limit `x`
    BelowDetection,
    /// `>x`: above the upper reporting limit `x`
    AboveRange,
}

/// A raw reading split into its parts. The unit is the symbol as written.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReading<'a> {
    pub qualifier: Option<Qualifier>,
    pub value: Option<f64>,
    pub unit: Option<&'a str>,
}

impl ParsedReading<'_> {
    fn missing() -> Self {
        ParsedReading {
            qualifier: None,
            value: None,
            unit: None,
        }
    }
}

/// Parse a textual reading such as `1.25 g/t`, `<0.005ppm`, `12%` or `-`.
pub fn parse(input: &str) -> Result<ParsedReading<'_>, ReadingError> {
    let input = input.trim();
    if input.is_empty() || missing_marker(input).is_ok() {
        return Ok(ParsedReading::missing());
    }

    match reading(input) {
        Ok((remaining, parsed)) => {
            if !remaining.trim().is_empty() {
                return Err(ReadingError::Malformed {
                    input: input.to_string(),
                    position: input.len() - remaining.len(),
                });
            }
            match parsed.value {
                Some(v) if !v.is_finite() => Err(ReadingError::Malformed {
                    input: input.to_string(),
                    position: 0,
                }),
                _ => Ok(parsed),
            }
        }
        Err(_) => Err(ReadingError::Malformed {
            input: input.to_string(),
            position: 0,
        }),
    }
}

fn missing_marker(input: &str) -> IResult<&str, ()> {
    all_consuming(value(
        (),
        alt((
            tag_no_case("n/a"),
            tag_no_case("nan"),
            tag_no_case("null"),
            tag_no_case("na"),
            tag_no_case("nd"),
            tag("-"),
        )),
    ))
    .parse(input)
}

fn reading(input: &str) -> IResult<&str, ParsedReading<'_>> {
    let (input, qualifier) = opt(qualifier).parse(input)?;
    let (input, number) = number(input)?;
    let (input, unit) = opt(unit).parse(input)?;
    Ok((
        input,
        ParsedReading {
            qualifier,
            value: Some(number),
            unit,
        },
    ))
}

fn qualifier(input: &str) -> IResult<&str, Qualifier> {
    alt((
        value(Qualifier::BelowDetection, char('<')),
        value(Qualifier::AboveRange, char('>')),
    ))
    .parse(input)
}

fn number(input: &str) -> IResult<&str, f64> {
    preceded(multispace0, double).parse(input)
}

fn unit(input: &str) -> IResult<&str, &str> {
    preceded(multispace0, take_while1(|c: char| !c.is_whitespace())).parse(input)
}
