//! Built-in script minifier.
//!
//! A conservative single pass: comments are removed and whitespace runs are
//! collapsed. String, template and regular expression literals pass through
//! unchanged. A newline is kept wherever dropping it could change automatic
//! semicolon insertion.

#[derive(Clone, Copy)]
enum State {
  Code,
  Str(char),
  StrEscape(char),
  Slash,
  BlockComment,
  BlockCommentStar,
  LineComment,
  Regex,
  RegexEscape,
  RegexClass,
  RegexClassEscape,
}

/// Characters after which whitespace is never significant.
const TIGHT_AFTER: &[char] = &[
  '(', '[', '{', ',', ';', ':', '=', '*', '%', '&', '|', '^', '!', '<', '>', '?',
];
/// Characters before which whitespace is never significant.
const TIGHT_BEFORE: &[char] = &[
  ')', ']', '}', ',', ';', ':', '=', '*', '%', '&', '|', '^', '<', '>', '?',
];

/// Characters after which a `/` opens a regular expression rather than dividing.
const REGEX_AFTER: &[char] = &[
  '(', ',', '=', ':', '[', '!', '&', '|', '?', '{', '}', ';', '+', '-', '*', '%', '<', '>', '~', '^',
];
/// Keywords after which a `/` opens a regular expression.
const REGEX_KEYWORDS: &[&str] = &[
  "return", "typeof", "case", "do", "else", "in", "instanceof", "new", "delete", "void", "throw", "yield", "await",
];

fn is_word_char(ch: char) -> bool {
  ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Whether a `/` following the emitted text starts a regex literal.
fn starts_regex(out: &str) -> bool {
  let code = out.trim_end();
  let Some(prev) = code.chars().last() else {
    return true;
  };
  if REGEX_AFTER.contains(&prev) {
    return true;
  }
  if is_word_char(prev) {
    let start = code
      .char_indices()
      .rev()
      .take_while(|(_, c)| is_word_char(*c))
      .last()
      .map_or(code.len(), |(i, _)| i);
    return REGEX_KEYWORDS.contains(&&code[start..]);
  }
  false
}

/// Push the first character after a regex's opening `/` and pick the next state.
fn enter_regex(out: &mut String, ch: char) -> State {
  out.push(ch);
  match ch {
    '\\' => State::RegexEscape,
    '[' => State::RegexClass,
    _ => State::Regex,
  }
}

/// Decide what a pending whitespace run becomes before `next`.
fn flush_space(out: &mut String, next: char, saw_newline: bool) {
  let Some(prev) = out.chars().last() else {
    return;
  };
  if TIGHT_AFTER.contains(&prev) || TIGHT_BEFORE.contains(&next) {
    return;
  }
  if saw_newline {
    out.push('\n');
  } else if (is_word_char(prev) && is_word_char(next))
    || (prev == '+' && next == '+')
    || (prev == '-' && next == '-')
    || prev == '/'
    || next == '/'
  {
    out.push(' ');
  }
}

/// Minify script text.
pub fn minify_script(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  let mut state = State::Code;
  let mut pending = false;
  let mut saw_newline = false;

  for ch in input.chars() {
    state = match state {
      State::Code => {
        if ch.is_whitespace() {
          pending = true;
          saw_newline |= ch == '\n';
          State::Code
        } else if ch == '/' {
          State::Slash
        } else {
          if pending {
            flush_space(&mut out, ch, saw_newline);
            pending = false;
            saw_newline = false;
          }
          out.push(ch);
          if matches!(ch, '"' | '\'' | '`') { State::Str(ch) } else { State::Code }
        }
      }
      State::Slash => match ch {
        '*' => State::BlockComment,
        '/' => State::LineComment,
        _ => {
          let regex = starts_regex(&out);
          if pending {
            flush_space(&mut out, '/', saw_newline);
            pending = false;
            saw_newline = false;
          }
          out.push('/');
          if regex {
            enter_regex(&mut out, ch)
          } else if ch.is_whitespace() {
            pending = true;
            saw_newline = ch == '\n';
            State::Code
          } else {
            out.push(ch);
            if matches!(ch, '"' | '\'' | '`') { State::Str(ch) } else { State::Code }
          }
        }
      },
      State::Str(quote) => {
        out.push(ch);
        if ch == '\\' {
          State::StrEscape(quote)
        } else if ch == quote {
          State::Code
        } else {
          State::Str(quote)
        }
      }
      State::StrEscape(quote) => {
        out.push(ch);
        State::Str(quote)
      }
      State::BlockComment => {
        if ch == '*' {
          State::BlockCommentStar
        } else {
          State::BlockComment
        }
      }
      State::BlockCommentStar => match ch {
        '/' => {
          pending = true;
          State::Code
        }
        '*' => State::BlockCommentStar,
        _ => State::BlockComment,
      },
      State::LineComment => {
        if ch == '\n' {
          pending = true;
          saw_newline = true;
          State::Code
        } else {
          State::LineComment
        }
      }
      State::Regex => {
        out.push(ch);
        match ch {
          '\\' => State::RegexEscape,
          '[' => State::RegexClass,
          '/' => State::Code,
          _ => State::Regex,
        }
      }
      State::RegexEscape => {
        out.push(ch);
        State::Regex
      }
      State::RegexClass => {
        out.push(ch);
        match ch {
          '\\' => State::RegexClassEscape,
          ']' => State::Regex,
          _ => State::RegexClass,
        }
      }
      State::RegexClassEscape => {
        out.push(ch);
        State::RegexClass
      }
    };
  }

  if matches!(state, State::Slash) {
    out.push('/');
  }
  out.trim().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn removes_comments_and_collapses_whitespace() {
    let input = "/* header */\nfunction add ( a, b ) {\n  // sum\n  return a + b ;\n}\n";
    assert_eq!(minify_script(input), "function add(a,b){return a+b;}");
  }

  #[test]
  fn keeps_string_contents() {
    let input = r#"const s = "a  /* not */  b"; const t = `x // y`;"#;
    assert_eq!(minify_script(input), r#"const s="a  /* not */  b";const t=`x // y`;"#);
  }

  #[test]
  fn keeps_newline_where_semicolon_may_be_implied() {
    let input = "let a = 1\nlet b = 2\n";
    assert_eq!(minify_script(input), "let a=1\nlet b=2");
  }

  #[test]
  fn does_not_merge_increment_operators() {
    assert_eq!(minify_script("a + ++b"), "a+ ++b");
    assert_eq!(minify_script("a - --b"), "a- --b");
  }

  #[test]
  fn keeps_division_and_regex_literals() {
    assert_eq!(minify_script("x = a / b"), "x=a / b");
    assert_eq!(minify_script("ok = /ab/.test(s)"), "ok=/ab/.test(s)");
  }

  #[test]
  fn escaped_slash_in_regex_is_not_a_comment() {
    let input = "var n = path.split(/\\//g).length; run(n);";
    assert_eq!(minify_script(input), "var n=path.split(/\\//g).length;run(n);");

    let input = "var parts = path.split(/\\//);\nrun(parts);";
    assert_eq!(minify_script(input), "var parts=path.split(/\\//);run(parts);");
  }

  #[test]
  fn quotes_inside_regex_do_not_open_strings() {
    assert_eq!(minify_script("s.replace(/'/g, \"\")"), "s.replace(/'/g,\"\")");
    assert_eq!(minify_script("t = /\"/ ; u = 1"), "t=/\"/;u=1");
  }

  #[test]
  fn slash_inside_character_class_stays_in_regex() {
    assert_eq!(minify_script("ok = /[/]x/.test(s) // trailing"), "ok=/[/]x/.test(s)");
  }

  #[test]
  fn regex_after_keyword() {
    assert_eq!(minify_script("return /a b/.test(x)"), "return /a b/.test(x)");
    assert_eq!(minify_script("total / count / 2"), "total / count / 2");
  }
}
