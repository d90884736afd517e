use std::fmt;

/// Operator tag of a node, as printed by the tree dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    None,
    And,
    Or,
    Semi,
    Pipe,
    Subshell,
}

impl Conjunction {
    pub fn name(self) -> &'static str {
        match self {
            Conjunction::None => "NONE",
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
            Conjunction::Semi => "SEMI",
            Conjunction::Pipe => "PIPE",
            Conjunction::Subshell => "SUBSHELL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Redirections {
    pub input: Option<String>,
    pub output: Option<String>,
}

impl Redirections {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }
}

impl fmt::Display for Redirections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(input) = &self.input {
            write!(f, " < {}", input)?;
        }
        if let Some(output) = &self.output {
            write!(f, " > {}", output)?;
        }
        Ok(())
    }
}

/// A program invocation. `argv` is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCommand {
    pub argv: Vec<String>,
    pub redirections: Redirections,
}

impl SimpleCommand {
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn arguments(&self) -> &[String] {
        &self.argv[1..]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subshell {
    pub body: Box<Node>,
    pub redirections: Redirections,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Simple(SimpleCommand),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Sequence(Box<Node>, Box<Node>),
    Pipe(Box<Node>, Box<Node>),
    Subshell(Subshell),
}

impl Node {
    pub fn conjunction(&self) -> Conjunction {
        match self {
            Node::Simple(_) => Conjunction::None,
            Node::And(..) => Conjunction::And,
            Node::Or(..) => Conjunction::Or,
            Node::Sequence(..) => Conjunction::Semi,
            Node::Pipe(..) => Conjunction::Pipe,
            Node::Subshell(_) => Conjunction::Subshell,
        }
    }

    /// Redirections owned by this node itself; binary operators have none.
    pub fn redirections(&self) -> Option<&Redirections> {
        match self {
            Node::Simple(cmd) => Some(&cmd.redirections),
            Node::Subshell(sub) => Some(&sub.redirections),
            _ => None,
        }
    }

    pub fn input(&self) -> Option<&str> {
        self.redirections().and_then(|r| r.input.as_deref())
    }

    pub fn output(&self) -> Option<&str> {
        self.redirections().and_then(|r| r.output.as_deref())
    }

    /// Left-to-right traversal trace, one line per node.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out);
        out
    }

    fn dump_into(&self, out: &mut String) {
        let (left, right): (Option<&Node>, Option<&Node>) = match self {
            Node::Simple(_) => (None, None),
            Node::And(l, r) | Node::Or(l, r) | Node::Sequence(l, r) | Node::Pipe(l, r) => {
                (Some(l.as_ref()), Some(r.as_ref()))
            }
            Node::Subshell(sub) => (Some(sub.body.as_ref()), None),
        };

        if let Some(left) = left {
            left.dump_into(out);
        }

        match self {
            Node::Simple(cmd) => out.push_str(&format!("NONE: {}, ", cmd.program())),
            other => out.push_str(&format!("{}, ", other.conjunction().name())),
        }
        out.push_str(&format!(
            "IR: {}, OR: {}\n",
            self.input().unwrap_or("None"),
            self.output().unwrap_or("None")
        ));

        if let Some(right) = right {
            right.dump_into(out);
        }
    }
}

/// One-line rendering of the tree; parentheses appear only for subshells.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Simple(cmd) => write!(f, "{}{}", cmd.argv.join(" "), cmd.redirections),
            Node::And(l, r) => write!(f, "{} && {}", l, r),
            Node::Or(l, r) => write!(f, "{} || {}", l, r),
            Node::Sequence(l, r) => write!(f, "{}; {}", l, r),
            Node::Pipe(l, r) => write!(f, "{} | {}", l, r),
            Node::Subshell(sub) => write!(f, "({}){}", sub.body, sub.redirections),
        }
    }
}
