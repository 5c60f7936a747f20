/*!
  The tokenizer splits assembly source into `Token`s, one at a time, so that the assembler can
  track positions for diagnostics.

  The lexical structure is:
    ```text
    <blank>         ::= [ \t\r\n]+
    <line_comment>  ::= '#' [^\n]*
    <block_comment> ::= '#|' .* '|#'
    <operator>      ::= '+' | '-'
    <number>        ::= ('0x' | '0X') <hex_digit>* | <digit>+
    <character>     ::= '\'' <any char>
    <here>          ::= '?'
    <label>         ::= <label_char>+ (':')?
    ```
  where a label character is an ASCII letter, digit, `_`, `.`, or any non-ASCII character. Labels
  can't start with a digit, since a digit starts a number.

  A character literal is the Unicode scalar value of the character after the quote, which is its
  byte value for ASCII. A quote at the end of the source is 0.
*/

use nom::{
  branch::alt,
  bytes::complete::{tag, tag_no_case, take_till, take_until, take_while, take_while1},
  character::complete::{anychar, char as one_char},
  combinator::{map, opt},
  sequence::{pair, preceded, terminated},
  IResult
};

use crate::word::Word;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Operator {
  Add,
  Subtract,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Token<'s> {
  /// Whitespace or a complete comment.
  Blank,
  /// A block comment running to the end of the source.
  UnterminatedComment,
  Operator(Operator),
  /// A number or character literal.
  Literal(Word),
  /// `?`, the address of the value being assembled.
  Here,
  Declaration(&'s str),
  Reference(&'s str),
  /// Any character that starts no other token.
  Unexpected,
}

impl<'s> Token<'s> {
  /// Whether the token produces a value.
  pub fn is_value(&self) -> bool {
    matches!(self, Token::Literal(_) | Token::Here | Token::Reference(_))
  }
}

pub fn is_label_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '_' || c == '.' || !c.is_ascii()
}

/// Whether a value token may not be directly followed by a token starting with `c`.
pub fn needs_separator(c: char) -> bool {
  is_label_char(c) || c == '?' || c == '\''
}

fn is_blank(c: char) -> bool {
  matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Accumulates digits in `radix` with wraparound.
fn digits_to_word(digits: &str, radix: u32) -> Word {
  digits.chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(Word::ZERO, |acc, d| acc.mul_small(radix) + d as u64)
}

fn blank(input: &str) -> IResult<&str, Token> {
  map(take_while1(is_blank), |_| Token::Blank)(input)
}

/// `#|` … `|#`, or a `#|` that never closes.
fn block_comment(input: &str) -> IResult<&str, Token> {
  preceded(
    tag("#|"),
    alt((
      map(terminated(take_until("|#"), tag("|#")), |_| Token::Blank),
      map(take_while(|_: char| true), |_| Token::UnterminatedComment)
    ))
  )(input)
}

fn line_comment(input: &str) -> IResult<&str, Token> {
  map(pair(one_char('#'), take_till(|c: char| c == '\n')), |_| Token::Blank)(input)
}

fn operator(input: &str) -> IResult<&str, Token> {
  alt((
    map(one_char('+'), |_| Token::Operator(Operator::Add)),
    map(one_char('-'), |_| Token::Operator(Operator::Subtract))
  ))(input)
}

fn hexadecimal(input: &str) -> IResult<&str, Token> {
  map(
    preceded(tag_no_case("0x"), take_while(|c: char| c.is_ascii_hexdigit())),
    |digits: &str| Token::Literal(digits_to_word(digits, 16))
  )(input)
}

fn decimal(input: &str) -> IResult<&str, Token> {
  map(
    take_while1(|c: char| c.is_ascii_digit()),
    |digits: &str| Token::Literal(digits_to_word(digits, 10))
  )(input)
}

/// `'c` is the code of `c`. A quote at the very end of the source is 0.
fn character(input: &str) -> IResult<&str, Token> {
  map(
    preceded(one_char('\''), opt(anychar)),
    |c: Option<char>| Token::Literal(Word::from(c.map_or(0, |c| c as u32)))
  )(input)
}

fn here(input: &str) -> IResult<&str, Token> {
  map(one_char('?'), |_| Token::Here)(input)
}

fn label(input: &str) -> IResult<&str, Token> {
  map(
    pair(take_while1(is_label_char), opt(one_char(':'))),
    |(name, colon): (&str, Option<char>)| match colon {
      Some(_) => Token::Declaration(name),
      None    => Token::Reference(name)
    }
  )(input)
}

fn unexpected(input: &str) -> IResult<&str, Token> {
  map(anychar, |_| Token::Unexpected)(input)
}

/// Reads one token from the front of `input`, which must not be empty.
pub fn next_token(input: &str) -> IResult<&str, Token> {
  alt((
    blank,
    block_comment,
    line_comment,
    operator,
    hexadecimal,
    decimal,
    character,
    here,
    label,
    unexpected
  ))(input)
}

/// Iterates over the tokens of a source string along with their byte spans.
pub struct Tokens<'s> {
  source : &'s str,
  rest   : &'s str,
}

impl<'s> Tokens<'s> {
  pub fn new(source: &'s str) -> Tokens<'s> {
    Tokens { source, rest: source }
  }

  /// The byte offset of the next unread character.
  pub fn offset(&self) -> usize {
    self.source.len() - self.rest.len()
  }

  /// The next unread character, without consuming it.
  pub fn peek(&self) -> Option<char> {
    self.rest.chars().next()
  }
}

impl<'s> Iterator for Tokens<'s> {
  /// A token and the byte range it occupies.
  type Item = (Token<'s>, std::ops::Range<usize>);

  fn next(&mut self) -> Option<Self::Item> {
    if self.rest.is_empty() {
      return None;
    }
    let start = self.offset();
    let (rest, token) = match next_token(self.rest) {
      Ok(result) => result,
      // Unreachable: `unexpected` accepts any character.
      Err(_) => (&self.rest[self.rest.len()..], Token::Unexpected)
    };
    self.rest = rest;
    Some((token, start..self.offset()))
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  fn tokens(source: &str) -> Vec<Token> {
    Tokens::new(source)
      .map(|(token, _)| token)
      .filter(|token| *token != Token::Blank)
      .collect()
  }

  #[test]
  fn numbers() {
    assert_eq!(tokens("123"), vec![Token::Literal(Word(123))]);
    assert_eq!(tokens("0xff 0XFF"), vec![Token::Literal(Word(255)), Token::Literal(Word(255))]);
    assert_eq!(tokens("0x"), vec![Token::Literal(Word(0))]);
    assert_eq!(tokens("18446744073709551616"), vec![Token::Literal(Word(0))]);
  }

  #[test]
  fn characters() {
    assert_eq!(
      tokens("'H 'i"),
      vec![Token::Literal(Word(72)), Token::Literal(Word(105))]
    );
    assert_eq!(tokens("' "), vec![Token::Literal(Word(32))]);
    assert_eq!(tokens("'"), vec![Token::Literal(Word(0))]);
  }

  #[test]
  fn labels() {
    assert_eq!(
      tokens("loop: .end: a.b _x9 λ"),
      vec![
        Token::Declaration("loop"),
        Token::Declaration(".end"),
        Token::Reference("a.b"),
        Token::Reference("_x9"),
        Token::Reference("λ"),
      ]
    );
  }

  #[test]
  fn operators_and_here() {
    assert_eq!(
      tokens("?-2+x"),
      vec![
        Token::Here,
        Token::Operator(Operator::Subtract),
        Token::Literal(Word(2)),
        Token::Operator(Operator::Add),
        Token::Reference("x"),
      ]
    );
  }

  #[test]
  fn comments() {
    assert_eq!(tokens("1 # two\n3"), vec![Token::Literal(Word(1)), Token::Literal(Word(3))]);
    assert_eq!(tokens("1 #| 2\n 3 |# 4"), vec![Token::Literal(Word(1)), Token::Literal(Word(4))]);
    assert_eq!(tokens("#||#5"), vec![Token::Literal(Word(5))]);
    assert_eq!(tokens("1 #| 2"), vec![Token::Literal(Word(1)), Token::UnterminatedComment]);
    assert_eq!(tokens("#"), Vec::<Token>::new());
  }

  #[test]
  fn unexpected_characters() {
    assert_eq!(tokens("$"), vec![Token::Unexpected]);
    assert_eq!(tokens(":"), vec![Token::Unexpected]);
  }

  #[test]
  fn spans() {
    let spans: Vec<_> = Tokens::new("ab: 12").collect();
    assert_eq!(
      spans,
      vec![
        (Token::Declaration("ab"), 0..3),
        (Token::Blank, 3..4),
        (Token::Literal(Word(12)), 4..6),
      ]
    );
  }

  #[test]
  fn offset_and_peek_follow_the_iterator() {
    let mut tokens = Tokens::new("x: 'a");
    assert_eq!(tokens.offset(), 0);
    assert_eq!(tokens.next(), Some((Token::Declaration("x"), 0..2)));
    assert_eq!(tokens.offset(), 2);
    tokens.next();
    assert_eq!(tokens.peek(), Some('\''));
    assert_eq!(tokens.next(), Some((Token::Literal(Word(97)), 3..5)));
    assert_eq!(tokens.offset(), 5);
    assert_eq!(tokens.peek(), None);
    assert_eq!(tokens.next(), None);
  }

  #[test]
  fn character_literal_is_scalar_value() {
    assert_eq!(tokens("'\u{e9} '"), vec![Token::Literal(Word(0xe9))]);
  }
}
