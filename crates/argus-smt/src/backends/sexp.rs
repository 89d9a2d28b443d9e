//! Reading SMT-LIB2 solver responses.

use num::rational::Rational64;
use num::{BigUint, Num, One, Zero};

use crate::solver::ModelValue;
use crate::sorts::SmtSort;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sexp {
    Atom(String),
    List(Vec<Sexp>),
}

impl Sexp {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Sexp::Atom(a) => Some(a),
            Sexp::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Sexp]> {
        match self {
            Sexp::List(items) => Some(items),
            Sexp::Atom(_) => None,
        }
    }
}

/// Net parenthesis depth of `text`, ignoring quoted symbols and strings.
pub fn paren_balance(text: &str) -> i64 {
    let mut depth = 0i64;
    let mut in_symbol = false;
    let mut in_string = false;
    for c in text.chars() {
        match c {
            '|' if !in_string => in_symbol = !in_symbol,
            '"' if !in_symbol => in_string = !in_string,
            '(' if !in_symbol && !in_string => depth += 1,
            ')' if !in_symbol && !in_string => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// Parses exactly one s-expression. Quoted `|symbols|` lose their bars.
pub fn parse_sexp(input: &str) -> Result<Sexp, String> {
    let tokens = tokenize(input)?;
    let mut pos = 0;
    let sexp = parse_tokens(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(format!("trailing input after s-expression: {input}"));
    }
    Ok(sexp)
}

#[derive(Debug, PartialEq)]
enum Token {
    Open,
    Close,
    Atom(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '|' => {
                chars.next();
                let mut sym = String::new();
                loop {
                    match chars.next() {
                        Some('|') => break,
                        Some(c) => sym.push(c),
                        None => return Err("unterminated quoted symbol".into()),
                    }
                }
                tokens.push(Token::Atom(sym));
            }
            '"' => {
                chars.next();
                let mut s = String::from("\"");
                loop {
                    match chars.next() {
                        Some('"') if chars.peek() == Some(&'"') => {
                            chars.next();
                            s.push('"');
                        }
                        Some('"') => break,
                        Some(c) => s.push(c),
                        None => return Err("unterminated string literal".into()),
                    }
                }
                s.push('"');
                tokens.push(Token::Atom(s));
            }
            _ => {
                let mut atom = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    atom.push(c);
                    chars.next();
                }
                tokens.push(Token::Atom(atom));
            }
        }
    }
    Ok(tokens)
}

fn parse_tokens(tokens: &[Token], pos: &mut usize) -> Result<Sexp, String> {
    match tokens.get(*pos) {
        Some(Token::Atom(a)) => {
            *pos += 1;
            Ok(Sexp::Atom(a.clone()))
        }
        Some(Token::Open) => {
            *pos += 1;
            let mut items = Vec::new();
            loop {
                match tokens.get(*pos) {
                    Some(Token::Close) => {
                        *pos += 1;
                        return Ok(Sexp::List(items));
                    }
                    Some(_) => items.push(parse_tokens(tokens, pos)?),
                    None => return Err("unbalanced parentheses".into()),
                }
            }
        }
        Some(Token::Close) => Err("unexpected ')'".into()),
        None => Err("empty input".into()),
    }
}

/// Interprets a model value printed by the solver as a value of `sort`.
///
/// Values of sorts without a [`ModelValue`] representation (arrays, rounding
/// modes) and shapes this reader does not recognise yield `None`.
pub fn parse_value(value: &Sexp, sort: &SmtSort) -> Option<ModelValue> {
    match sort {
        SmtSort::Int => parse_int(value).map(ModelValue::Int),
        SmtSort::Bool => match value.as_atom()? {
            "true" => Some(ModelValue::Bool(true)),
            "false" => Some(ModelValue::Bool(false)),
            _ => None,
        },
        SmtSort::Real => parse_real(value).map(ModelValue::Real),
        SmtSort::BitVec(width) => parse_bits(value).map(|(_, value)| ModelValue::BitVec {
            width: *width,
            value,
        }),
        SmtSort::Float(exp, sig) => parse_float(value, *exp, *sig).map(|bits| ModelValue::Float {
            exp: *exp,
            sig: *sig,
            bits,
        }),
        SmtSort::Array(..) | SmtSort::RoundingMode => None,
    }
}

fn parse_int(value: &Sexp) -> Option<i64> {
    match value {
        Sexp::Atom(a) => a.parse().ok(),
        Sexp::List(items) => match items.as_slice() {
            [Sexp::Atom(minus), inner] if minus == "-" => parse_int(inner)?.checked_neg(),
            _ => None,
        },
    }
}

fn parse_real(value: &Sexp) -> Option<Rational64> {
    match value {
        Sexp::Atom(a) => parse_decimal(a),
        Sexp::List(items) => match items.as_slice() {
            [Sexp::Atom(minus), inner] if minus == "-" => Some(-parse_real(inner)?),
            [Sexp::Atom(div), n, d] if div == "/" => {
                let d = parse_real(d)?;
                (!d.is_zero()).then(|| parse_real(n).map(|n| n / d)).flatten()
            }
            _ => None,
        },
    }
}

fn parse_decimal(text: &str) -> Option<Rational64> {
    match text.split_once('.') {
        None => text.parse::<i64>().ok().map(Rational64::from_integer),
        Some((whole, frac)) => {
            let scale = 10i64.checked_pow(u32::try_from(frac.len()).ok()?)?;
            let digits: i64 = format!("{whole}{frac}").parse().ok()?;
            Some(Rational64::new(digits, scale))
        }
    }
}

/// `#b...`, `#x...` or `(_ bvN w)`; returns the literal's own width and value.
fn parse_bits(value: &Sexp) -> Option<(u32, BigUint)> {
    match value {
        Sexp::Atom(a) => {
            if let Some(bin) = a.strip_prefix("#b") {
                let width = u32::try_from(bin.len()).ok()?;
                Some((width, BigUint::from_str_radix(bin, 2).ok()?))
            } else if let Some(hex) = a.strip_prefix("#x") {
                let width = u32::try_from(hex.len() * 4).ok()?;
                Some((width, BigUint::from_str_radix(hex, 16).ok()?))
            } else {
                None
            }
        }
        Sexp::List(items) => match items.as_slice() {
            [Sexp::Atom(under), Sexp::Atom(bv), Sexp::Atom(w)] if under == "_" => {
                let digits = bv.strip_prefix("bv")?;
                Some((w.parse().ok()?, digits.parse().ok()?))
            }
            _ => None,
        },
    }
}

fn parse_float(value: &Sexp, exp: u32, sig: u32) -> Option<BigUint> {
    let items = value.as_list()?;
    let frac_width = sig.checked_sub(1)? as usize;
    let exp_mask = (BigUint::one() << exp as usize) - BigUint::one();
    let sign_bit = BigUint::one() << (frac_width + exp as usize);
    match items {
        [Sexp::Atom(fp), sign, e, f] if fp == "fp" => {
            let (_, sign) = parse_bits(sign)?;
            let (_, e) = parse_bits(e)?;
            let (_, f) = parse_bits(f)?;
            Some((((sign << exp as usize) | e) << frac_width) | f)
        }
        [Sexp::Atom(under), Sexp::Atom(special), _, _] if under == "_" => match special.as_str() {
            "+zero" => Some(BigUint::zero()),
            "-zero" => Some(sign_bit),
            "+oo" => Some(exp_mask << frac_width),
            "-oo" => Some(sign_bit | (exp_mask << frac_width)),
            "NaN" => Some((exp_mask << frac_width) | (BigUint::one() << frac_width.checked_sub(1)?)),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(text: &str, sort: &SmtSort) -> Option<ModelValue> {
        parse_value(&parse_sexp(text).expect("well formed"), sort)
    }

    #[test]
    fn parses_nested_get_value_response() {
        let parsed = parse_sexp("((|x#0| 5) (y (- 7)))").expect("well formed");
        let pairs = parsed.as_list().expect("list");
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].as_list().expect("pair")[0].as_atom(), Some("x#0"));
    }

    #[test]
    fn parses_integers_and_reals() {
        assert_eq!(value("(- 7)", &SmtSort::Int), Some(ModelValue::Int(-7)));
        assert_eq!(value("42", &SmtSort::Int), Some(ModelValue::Int(42)));
        assert_eq!(
            value("(/ 3.0 2.0)", &SmtSort::Real),
            Some(ModelValue::Real(Rational64::new(3, 2)))
        );
        assert_eq!(
            value("(- 0.25)", &SmtSort::Real),
            Some(ModelValue::Real(Rational64::new(-1, 4)))
        );
    }

    #[test]
    fn parses_bitvector_notations() {
        let expected = Some(ModelValue::BitVec {
            width: 8,
            value: BigUint::from(0xa5u32),
        });
        assert_eq!(value("#b10100101", &SmtSort::BitVec(8)), expected);
        assert_eq!(value("#xa5", &SmtSort::BitVec(8)), expected);
        assert_eq!(value("(_ bv165 8)", &SmtSort::BitVec(8)), expected);
    }

    #[test]
    fn parses_float_literals_and_specials() {
        let sort = SmtSort::Float(5, 11);
        let bits = |v: u32| {
            Some(ModelValue::Float {
                exp: 5,
                sig: 11,
                bits: BigUint::from(v),
            })
        };
        assert_eq!(value("(fp #b1 #b01111 #b1000000000)", &sort), bits(0xbe00));
        assert_eq!(value("(_ -zero 5 11)", &sort), bits(0x8000));
        assert_eq!(value("(_ +oo 5 11)", &sort), bits(0x7c00));
        assert_eq!(value("(_ NaN 5 11)", &sort), bits(0x7e00));
    }

    #[test]
    fn paren_balance_ignores_quoted_symbols() {
        assert_eq!(paren_balance("((|a)b| 1)"), 1);
        assert_eq!(paren_balance("((x 1))"), 0);
    }
}
