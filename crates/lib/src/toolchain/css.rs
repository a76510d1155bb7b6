//! Built-in style compiler.
//!
//! Understands plain CSS plus selector nesting, which is all the scoper's
//! wrapped output needs: nested rules are flattened under their parent
//! selectors (`&` refers to the parent), conditional group rules such as
//! `@media` are re-emitted around the flattened rules, and `@keyframes` /
//! `@font-face` blocks bubble up untouched. Output is compact.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
  Decl(String),
  Rule { selectors: String, children: Vec<Node> },
  AtBlock { prelude: String, children: Vec<Node> },
  Verbatim(String),
}

struct Parser {
  chars: Vec<char>,
  pos: usize,
}

fn collapse_ws(text: &str) -> String {
  text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_verbatim_at_rule(prelude: &str) -> bool {
  let lower = prelude.to_ascii_lowercase();
  lower.starts_with('@') && (lower.contains("keyframes") || lower.starts_with("@font-face") || lower.starts_with("@page"))
}

impl Parser {
  fn new(source: &str) -> Self {
    Self {
      chars: source.chars().collect(),
      pos: 0,
    }
  }

  fn peek(&self, offset: usize) -> Option<char> {
    self.chars.get(self.pos + offset).copied()
  }

  fn skip_comment(&mut self) {
    self.pos += 2;
    while self.pos < self.chars.len() {
      if self.chars[self.pos] == '*' && self.peek(1) == Some('/') {
        self.pos += 2;
        return;
      }
      self.pos += 1;
    }
  }

  /// Copy a quoted string starting at the current quote into `buf`.
  fn copy_string(&mut self, buf: &mut String) {
    let quote = self.chars[self.pos];
    buf.push(quote);
    self.pos += 1;
    while self.pos < self.chars.len() {
      let ch = self.chars[self.pos];
      buf.push(ch);
      self.pos += 1;
      if ch == '\\' {
        if let Some(next) = self.peek(0) {
          buf.push(next);
          self.pos += 1;
        }
      } else if ch == quote {
        return;
      }
    }
  }

  fn flush_statement(buf: &mut String, nodes: &mut Vec<Node>) {
    let statement = buf.trim();
    if statement.is_empty() {
      buf.clear();
      return;
    }
    if statement.starts_with('@') {
      nodes.push(Node::Verbatim(format!("{};", collapse_ws(statement))));
    } else {
      let decl = match statement.split_once(':') {
        Some((prop, value)) => format!("{}:{}", prop.trim(), collapse_ws(value)),
        None => collapse_ws(statement),
      };
      nodes.push(Node::Decl(decl));
    }
    buf.clear();
  }

  /// Raw text of a balanced block, the opening brace already consumed.
  fn raw_block(&mut self) -> Result<String, String> {
    let mut buf = String::new();
    let mut depth = 0usize;
    while self.pos < self.chars.len() {
      let ch = self.chars[self.pos];
      match ch {
        '/' if self.peek(1) == Some('*') => {
          self.skip_comment();
          continue;
        }
        '"' | '\'' => {
          self.copy_string(&mut buf);
          continue;
        }
        '{' => depth += 1,
        '}' if depth == 0 => {
          self.pos += 1;
          return Ok(collapse_ws(&buf));
        }
        '}' => depth -= 1,
        _ => {}
      }
      buf.push(ch);
      self.pos += 1;
    }
    Err("unclosed block".to_string())
  }

  fn parse_block(&mut self, nested: bool) -> Result<Vec<Node>, String> {
    let mut nodes = Vec::new();
    let mut buf = String::new();
    let mut parens = 0usize;

    while self.pos < self.chars.len() {
      let ch = self.chars[self.pos];
      match ch {
        '/' if self.peek(1) == Some('*') => {
          self.skip_comment();
          continue;
        }
        '"' | '\'' => {
          self.copy_string(&mut buf);
          continue;
        }
        '(' => parens += 1,
        ')' => parens = parens.saturating_sub(1),
        ';' if parens == 0 => {
          self.pos += 1;
          Self::flush_statement(&mut buf, &mut nodes);
          continue;
        }
        '{' if parens == 0 => {
          self.pos += 1;
          let prelude = collapse_ws(buf.trim());
          buf.clear();
          if is_verbatim_at_rule(&prelude) {
            let body = self.raw_block()?;
            nodes.push(Node::Verbatim(format!("{}{{{}}}", prelude, body)));
          } else {
            let children = self.parse_block(true)?;
            if prelude.starts_with('@') {
              nodes.push(Node::AtBlock { prelude, children });
            } else {
              nodes.push(Node::Rule {
                selectors: prelude,
                children,
              });
            }
          }
          continue;
        }
        '}' if parens == 0 => {
          self.pos += 1;
          if !nested {
            return Err(format!("unexpected '}}' at offset {}", self.pos - 1));
          }
          Self::flush_statement(&mut buf, &mut nodes);
          return Ok(nodes);
        }
        _ => {}
      }
      buf.push(ch);
      self.pos += 1;
    }

    if nested {
      return Err("unclosed block".to_string());
    }
    Self::flush_statement(&mut buf, &mut nodes);
    Ok(nodes)
  }
}

/// Split a selector list on top-level commas.
fn split_selectors(selectors: &str) -> Vec<String> {
  let mut parts = Vec::new();
  let mut current = String::new();
  let mut depth = 0usize;
  let mut quote: Option<char> = None;

  for ch in selectors.chars() {
    match (quote, ch) {
      (Some(q), c) if c == q => quote = None,
      (Some(_), _) => {}
      (None, '"' | '\'') => quote = Some(ch),
      (None, '(' | '[') => depth += 1,
      (None, ')' | ']') => depth = depth.saturating_sub(1),
      (None, ',') if depth == 0 => {
        parts.push(current.trim().to_string());
        current.clear();
        continue;
      }
      _ => {}
    }
    current.push(ch);
  }
  if !current.trim().is_empty() {
    parts.push(current.trim().to_string());
  }
  parts
}

fn combine(parents: &[String], selectors: &str) -> Vec<String> {
  let children = split_selectors(selectors);
  if parents.is_empty() {
    return children;
  }
  parents
    .iter()
    .flat_map(|parent| {
      children.iter().map(move |child| {
        if child.contains('&') {
          child.replace('&', parent)
        } else {
          format!("{} {}", parent, child)
        }
      })
    })
    .collect()
}

fn emit(nodes: &[Node], parents: &[String], out: &mut String) {
  let decls: Vec<&str> = nodes
    .iter()
    .filter_map(|n| match n {
      Node::Decl(d) => Some(d.as_str()),
      _ => None,
    })
    .collect();

  if !decls.is_empty() {
    if parents.is_empty() {
      for decl in &decls {
        out.push_str(decl);
        out.push(';');
      }
    } else {
      out.push_str(&parents.join(","));
      out.push('{');
      out.push_str(&decls.join(";"));
      out.push('}');
    }
  }

  for node in nodes {
    match node {
      Node::Decl(_) => {}
      Node::Rule { selectors, children } => emit(children, &combine(parents, selectors), out),
      Node::AtBlock { prelude, children } => {
        let mut inner = String::new();
        emit(children, parents, &mut inner);
        if !inner.is_empty() {
          out.push_str(prelude);
          out.push('{');
          out.push_str(&inner);
          out.push('}');
        }
      }
      Node::Verbatim(text) => out.push_str(text),
    }
  }
}

/// Compile nested CSS to flat, compact CSS.
pub fn compile_nested(source: &str) -> Result<String, String> {
  let nodes = Parser::new(source).parse_block(false)?;
  let mut out = String::new();
  emit(&nodes, &[], &mut out);
  Ok(out)
}
