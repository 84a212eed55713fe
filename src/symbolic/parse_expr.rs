//! Formula text to [`Expr`].
//!
//! Grammar, loosest binding first:
//! ```text
//! sum     := product (("+" | "-") product)*
//! product := unary (("*" | "/") unary)*
//! unary   := ("-" | "+") unary | power
//! power   := atom (("^" | "**") unary)?          right associative
//! atom    := number | name "(" args ")" | name | "(" sum ")"
//! ```
//! so `-x^2` is `-(x^2)` and `2^-x` is accepted. Known function names: `exp`, `ln`, `log`
//! (natural), `log10`, `sqrt`, `sin`, `cos`, `tan`/`tg`, `arctan`/`atan`/`arctg`, `erf`,
//! `gamma`, `factorial` (as `gamma(u + 1)`) and the two-argument `polygamma(n, u)`.
//! The name `pi` is the number π.
use crate::error::{CurveFitError, Result};
use crate::symbolic::symbolic_engine::Expr;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0, one_of},
    combinator::{not, peek, recognize},
    error::{Error, ErrorKind},
    multi::many0,
    number::complete::double,
    sequence::{delimited, pair, preceded, terminated},
};
use std::f64::consts::PI;

fn ws<'a, O, P>(inner: P) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
    P: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn failure(input: &str, kind: ErrorKind) -> nom::Err<Error<&str>> {
    nom::Err::Failure(Error::new(input, kind))
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

fn parse_number(input: &str) -> IResult<&str, Expr> {
    let leading: IResult<&str, char> = peek(one_of("0123456789.")).parse(input);
    leading?;
    let parsed: IResult<&str, f64> = double.parse(input);
    let (rest, value) = parsed?;
    Ok((rest, Expr::Const(value)))
}

fn parse_parenthesized(input: &str) -> IResult<&str, Expr> {
    delimited(char('('), ws(parse_sum), char(')')).parse(input)
}

fn apply_function(name: &str, arg: Expr) -> Option<Expr> {
    let expr = match name {
        "exp" => arg.exp(),
        "ln" | "log" => arg.ln(),
        "log10" => arg.log10(),
        "sqrt" => arg.sqrt(),
        "sin" => Expr::sin(arg.boxed()),
        "cos" => Expr::cos(arg.boxed()),
        "tan" | "tg" => Expr::tg(arg.boxed()),
        "arctan" | "atan" | "arctg" => Expr::arctg(arg.boxed()),
        "erf" => Expr::erf(arg.boxed()),
        "gamma" => Expr::gamma(arg.boxed()),
        "factorial" => Expr::gamma((arg + Expr::Const(1.0)).boxed()),
        _ => return None,
    };
    Some(expr)
}

fn parse_call<'a>(name: &'a str, input: &'a str) -> IResult<&'a str, Expr> {
    let (input, _) = ws(char('(')).parse(input)?;
    if name == "polygamma" {
        let (rest, order) = terminated(ws(parse_sum), char(',')).parse(input)?;
        let order = match order.simplify_() {
            Expr::Const(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => n as u32,
            _ => return Err(failure(input, ErrorKind::Digit)),
        };
        let (rest, arg) = terminated(ws(parse_sum), char(')')).parse(rest)?;
        return Ok((rest, Expr::polygamma(order, arg.boxed())));
    }
    let (rest, arg) = terminated(ws(parse_sum), char(')')).parse(input)?;
    match apply_function(name, arg) {
        Some(expr) => Ok((rest, expr)),
        None => Err(failure(input, ErrorKind::Verify)),
    }
}

fn parse_name(input: &str) -> IResult<&str, Expr> {
    let (rest, name) = parse_identifier(input)?;
    let opens_call: IResult<&str, char> = preceded(multispace0, char('(')).parse(rest);
    if opens_call.is_ok() {
        return parse_call(name, rest);
    }
    if name == "pi" {
        return Ok((rest, Expr::Const(PI)));
    }
    Ok((rest, Expr::var(name)))
}

fn parse_atom(input: &str) -> IResult<&str, Expr> {
    ws(alt((parse_number, parse_name, parse_parenthesized))).parse(input)
}

fn parse_power(input: &str) -> IResult<&str, Expr> {
    let (rest, base) = parse_atom(input)?;
    let power_op: IResult<&str, &str> = ws(alt((tag("**"), tag("^")))).parse(rest);
    match power_op {
        Ok((after_op, _)) => {
            let (rest, exponent) = parse_unary(after_op)?;
            Ok((rest, base.pow(exponent)))
        }
        Err(_) => Ok((rest, base)),
    }
}

fn parse_unary(input: &str) -> IResult<&str, Expr> {
    let sign: IResult<&str, char> = ws(one_of("+-")).parse(input);
    match sign {
        Ok((rest, '-')) => {
            let (rest, operand) = parse_unary(rest)?;
            Ok((rest, -operand))
        }
        Ok((rest, _)) => parse_unary(rest),
        Err(_) => parse_power(input),
    }
}

fn parse_product(input: &str) -> IResult<&str, Expr> {
    let (mut rest, mut acc) = parse_unary(input)?;
    loop {
        let op: IResult<&str, char> =
            ws(alt((terminated(char('*'), not(char('*'))), char('/')))).parse(rest);
        match op {
            Ok((after_op, op)) => {
                let (after_operand, rhs) = parse_unary(after_op)?;
                acc = if op == '*' { acc * rhs } else { acc / rhs };
                rest = after_operand;
            }
            Err(nom::Err::Error(_)) => return Ok((rest, acc)),
            Err(e) => return Err(e),
        }
    }
}

fn parse_sum(input: &str) -> IResult<&str, Expr> {
    let (mut rest, mut acc) = parse_product(input)?;
    loop {
        let op: IResult<&str, char> = ws(one_of("+-")).parse(rest);
        match op {
            Ok((after_op, op)) => {
                let (after_operand, rhs) = parse_product(after_op)?;
                acc = if op == '+' { acc + rhs } else { acc - rhs };
                rest = after_operand;
            }
            Err(nom::Err::Error(_)) => return Ok((rest, acc)),
            Err(e) => return Err(e),
        }
    }
}

fn describe(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Verify => "unknown function",
        ErrorKind::Digit => "polygamma order must be a non-negative integer",
        ErrorKind::Char => "unbalanced parenthesis or missing operand",
        _ => "expected a number, a name or a parenthesized expression",
    }
}

fn parse_error(input: &str, rest: &str, message: &str) -> CurveFitError {
    CurveFitError::Parse {
        input: input.to_string(),
        position: input.len() - rest.len(),
        message: message.to_string(),
    }
}

impl Expr {
    /// Parses formula text into an expression.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let expr = Expr::parse_expression("Bmax*x/(Kd + x)")?;
    /// assert_eq!(expr.all_arguments_are_variables(), vec!["Bmax", "Kd", "x"]);
    /// ```
    pub fn parse_expression(input: &str) -> Result<Expr> {
        match terminated(ws(parse_sum), multispace0).parse(input) {
            Ok((rest, expr)) if rest.is_empty() => Ok(expr),
            Ok((rest, _)) => Err(parse_error(input, rest, "unexpected trailing input")),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                Err(parse_error(input, e.input, describe(e.code)))
            }
            Err(nom::Err::Incomplete(_)) => Err(parse_error(input, "", "incomplete input")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eval(text: &str, vars: &[&str], args: &[f64]) -> f64 {
        Expr::parse_expression(text)
            .unwrap()
            .eval_expression(vars, args)
            .unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_relative_eq!(eval("1 + 2 * 3", &[], &[]), 7.0);
        assert_relative_eq!(eval("-x^2", &["x"], &[3.0]), -9.0);
        assert_relative_eq!(eval("2^3^2", &[], &[]), 512.0);
        assert_relative_eq!(eval("x**2 * 2", &["x"], &[3.0]), 18.0);
        assert_relative_eq!(eval("8 / 4 / 2", &[], &[]), 1.0);
        assert_relative_eq!(eval("2^-1", &[], &[]), 0.5);
        assert_relative_eq!(eval("1 - 2 - 3", &[], &[]), -4.0);
    }

    #[test]
    fn test_catalog_style_formulas() {
        let text = "baseline + (peak - baseline)/(1 + 10**((pEC50 - x)*HillSlope))";
        let expr = Expr::parse_expression(text).unwrap();
        assert_eq!(
            expr.all_arguments_are_variables(),
            vec!["HillSlope", "baseline", "pEC50", "peak", "x"]
        );
        let value = expr
            .eval_expression(&["x", "HillSlope", "baseline", "pEC50", "peak"], &[-7.0, 1.0, 0.0, -7.0, 2.0])
            .unwrap();
        assert_relative_eq!(value, 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_functions() {
        assert_relative_eq!(eval("exp(ln(x))", &["x"], &[2.5]), 2.5, epsilon = 1e-14);
        assert_relative_eq!(eval("log10(1000)", &[], &[]), 3.0, epsilon = 1e-14);
        assert_relative_eq!(eval("sqrt(x)", &["x"], &[16.0]), 4.0);
        assert_relative_eq!(eval("factorial(4)", &[], &[]), 24.0, epsilon = 1e-12);
        assert_relative_eq!(eval("sin(pi/2) + cos(0)", &[], &[]), 2.0, epsilon = 1e-15);
        assert_relative_eq!(eval("polygamma(1, 1)", &[], &[]), PI * PI / 6.0, epsilon = 1e-12);
        assert_relative_eq!(eval("erf(0)", &[], &[]), 0.0);
    }

    #[test]
    fn test_errors_carry_position() {
        match Expr::parse_expression("x + * 2") {
            Err(CurveFitError::Parse { position, .. }) => assert!(position >= 2),
            other => panic!("expected a parse error, got {:?}", other),
        }
        match Expr::parse_expression("x + 1)") {
            Err(CurveFitError::Parse { position, message, .. }) => {
                assert_eq!(position, 5);
                assert_eq!(message, "unexpected trailing input");
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
        match Expr::parse_expression("foo(x)") {
            Err(CurveFitError::Parse { message, .. }) => assert_eq!(message, "unknown function"),
            other => panic!("expected a parse error, got {:?}", other),
        }
        assert!(Expr::parse_expression("(x + 1").is_err());
        assert!(Expr::parse_expression("").is_err());
    }
}
