//! Regexp search (§4.G): patterns compile to a flat array of [`Node`]s
//! (`LITCHAR`, `ANY`, `CCL`/`NCCL`, `BOL`/`EOL`, `GROUP_BEGIN`/`GROUP_END`,
//! terminated by `NIL`), each optionally carrying a closure. Matching
//! (`amatch`) walks the node array recursively; a closure first grabs
//! greedily (or minimally, under `MIN_CLOSURE`) then backtracks one
//! character at a time until the rest of the pattern also matches.
//!
//! A trailing `:m` on the pattern text (stripped during [`Regex::compile`])
//! enables multi-line mode, under which `.` also matches the boundary
//! between two lines instead of stopping at end-of-line.

use core_status::{EdResult, Status};
use core_text::motion::{current_byte, next_char, prev_char};
use core_text::{LineStore, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closure {
    None,
    ZeroOrMore,
    OneOrMore,
    ZeroOrOne,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    LitChar(u8),
    Any,
    Ccl(Box<[bool; 256]>),
    Nccl(Box<[bool; 256]>),
    Bol,
    Eol,
    GroupBegin(usize),
    GroupEnd(usize),
    Nil,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub closure: Closure,
    /// `MIN_CLOSURE`: try the shortest match first instead of the longest.
    /// Spelled `*?`/`+?`/`??` at the source level.
    pub min: bool,
}

fn lit(kind: NodeKind) -> Node {
    Node { kind, closure: Closure::None, min: false }
}

/// A compiled regexp pattern plus its capture-group count (not counting
/// the implicit whole-match group 0).
///
/// Compilation also produces a reversed copy of the node list for backward
/// scanning: order reversed, `GroupBegin`/`GroupEnd` swapped so the node
/// reached first still records the edge it lands on first, `BOL`/`EOL` left
/// alone since reversing their position in the list already puts them where
/// a backward walk needs them checked.
#[derive(Debug, Clone)]
pub struct Regex {
    nodes: Vec<Node>,
    rev_nodes: Vec<Node>,
    pub group_count: usize,
    multiline: bool,
}

impl Regex {
    /// Compiles `pattern`, honoring a trailing `:m` options trailer (§4.G):
    /// stripped before compilation, it makes `.` also match the boundary
    /// between two lines instead of stopping at end-of-line.
    pub fn compile(pattern: &[u8]) -> EdResult<Self> {
        let (pattern, multiline) = match pattern.strip_suffix(b":m") {
            Some(rest) => (rest, true),
            None => (pattern, false),
        };
        let (nodes, group_count) = compile_nodes(pattern)?;
        let rev_nodes = reverse_for_backward(&nodes);
        Ok(Self { nodes, rev_nodes, group_count, multiline })
    }
}

fn reverse_for_backward(nodes: &[Node]) -> Vec<Node> {
    let mut body: Vec<Node> = nodes.iter().filter(|n| !matches!(n.kind, NodeKind::Nil)).cloned().collect();
    body.reverse();
    for node in &mut body {
        let kind = std::mem::replace(&mut node.kind, NodeKind::Nil);
        node.kind = match kind {
            NodeKind::GroupBegin(g) => NodeKind::GroupEnd(g),
            NodeKind::GroupEnd(g) => NodeKind::GroupBegin(g),
            other => other,
        };
    }
    body.push(lit(NodeKind::Nil));
    body
}

fn compile_class(bytes: &[u8]) -> EdResult<(NodeKind, usize)> {
    let mut i = 1; // skip '['
    let negate = bytes.get(i) == Some(&b'^');
    if negate {
        i += 1;
    }
    let start = i;
    let mut set = [false; 256];
    let mut first = true;
    while i < bytes.len() && (bytes[i] != b']' || first) {
        first = false;
        if bytes[i] == b'-' && i > start && i + 1 < bytes.len() && bytes[i + 1] != b']' {
            let lo = bytes[i - 1];
            let hi = bytes[i + 1];
            if hi >= lo {
                for c in lo..=hi {
                    set[c as usize] = true;
                }
                i += 2;
                continue;
            }
            // Out-of-order range: '-' stands for itself.
            set[b'-' as usize] = true;
            i += 1;
            continue;
        }
        set[bytes[i] as usize] = true;
        i += 1;
    }
    if i >= bytes.len() {
        return Err(Status::failure("unterminated character class"));
    }
    i += 1; // consume ']'
    let kind = if negate { NodeKind::Nccl(Box::new(set)) } else { NodeKind::Ccl(Box::new(set)) };
    Ok((kind, i))
}

fn compile_nodes(pattern: &[u8]) -> EdResult<(Vec<Node>, usize)> {
    let mut nodes = Vec::new();
    let mut group_counter = 0usize;
    let mut group_stack = Vec::new();
    let mut i = 0;
    // At pattern start (and right after another closure) a closure
    // character is literal rather than a quantifier.
    let mut closure_is_literal = true;
    let mut last_was_group_end = false;

    while i < pattern.len() {
        let b = pattern[i];
        match b {
            b'\\' => {
                i += 1;
                let c = *pattern.get(i).ok_or_else(|| Status::failure("trailing backslash in pattern"))?;
                nodes.push(lit(NodeKind::LitChar(c)));
                closure_is_literal = false;
                last_was_group_end = false;
                i += 1;
            }
            b'.' => {
                nodes.push(lit(NodeKind::Any));
                closure_is_literal = false;
                last_was_group_end = false;
                i += 1;
            }
            b'^' if i == 0 => {
                nodes.push(lit(NodeKind::Bol));
                closure_is_literal = false;
                last_was_group_end = false;
                i += 1;
            }
            b'$' if i == pattern.len() - 1 => {
                nodes.push(lit(NodeKind::Eol));
                closure_is_literal = false;
                last_was_group_end = false;
                i += 1;
            }
            b'(' => {
                group_counter += 1;
                group_stack.push(group_counter);
                nodes.push(lit(NodeKind::GroupBegin(group_counter)));
                closure_is_literal = true;
                last_was_group_end = false;
                i += 1;
            }
            b')' => {
                let g = group_stack.pop().ok_or_else(|| Status::failure("unmatched ) in pattern"))?;
                nodes.push(lit(NodeKind::GroupEnd(g)));
                closure_is_literal = false;
                last_was_group_end = true;
                i += 1;
            }
            b'[' => {
                let (kind, consumed) = compile_class(&pattern[i..])?;
                nodes.push(lit(kind));
                i += consumed;
                closure_is_literal = false;
                last_was_group_end = false;
            }
            b'*' | b'+' | b'?' => {
                if closure_is_literal {
                    nodes.push(lit(NodeKind::LitChar(b)));
                    closure_is_literal = false;
                    last_was_group_end = false;
                    i += 1;
                    continue;
                }
                if last_was_group_end {
                    return Err(Status::failure("closure on a group is not allowed"));
                }
                let last = nodes.last_mut().ok_or_else(|| Status::failure("closure with no preceding atom"))?;
                last.closure = match b {
                    b'*' => Closure::ZeroOrMore,
                    b'+' => Closure::OneOrMore,
                    _ => Closure::ZeroOrOne,
                };
                i += 1;
                if pattern.get(i) == Some(&b'?') {
                    last.min = true;
                    i += 1;
                }
                closure_is_literal = true;
                last_was_group_end = false;
            }
            _ => {
                nodes.push(lit(NodeKind::LitChar(b)));
                closure_is_literal = false;
                last_was_group_end = false;
                i += 1;
            }
        }
    }
    if !group_stack.is_empty() {
        return Err(Status::failure("unmatched ( in pattern"));
    }
    nodes.push(lit(NodeKind::Nil));
    Ok((nodes, group_counter))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Reads the byte `amatch` would consume from `point` in direction `dir`.
/// At a line boundary (not end-of-buffer), `current_byte` has nothing to
/// report; under `multiline` that boundary itself counts as a `\n` byte so
/// `.` can cross it, matching `:m`'s "dot matches newline" (§4.G).
fn consume(store: &LineStore, point: Point, dir: Direction, multiline: bool) -> Option<(u8, Point)> {
    match dir {
        Direction::Forward => match current_byte(store, point) {
            Some(b) => {
                let next = next_char(store, point)?;
                Some((b, next))
            }
            None if multiline => {
                let next = next_char(store, point)?;
                Some((b'\n', next))
            }
            None => None,
        },
        Direction::Backward => {
            let prev = prev_char(store, point)?;
            match current_byte(store, prev) {
                Some(b) => Some((b, prev)),
                None if multiline => Some((b'\n', prev)),
                None => None,
            }
        }
    }
}

fn atom_matches(kind: &NodeKind, b: u8) -> bool {
    match kind {
        NodeKind::LitChar(c) => *c == b,
        NodeKind::Any => true,
        NodeKind::Ccl(set) => set[b as usize],
        NodeKind::Nccl(set) => !set[b as usize],
        _ => false,
    }
}

type Groups = Vec<Option<(Point, Point)>>;

fn match_closure(
    nodes: &[Node],
    ni: usize,
    store: &LineStore,
    point: Point,
    dir: Direction,
    starts: &mut Vec<Option<Point>>,
    groups: &mut Groups,
    min_count: usize,
    max_count: usize,
    multiline: bool,
) -> Option<Point> {
    let node = &nodes[ni];
    let mut positions = vec![point];
    let mut cur = point;
    while positions.len() - 1 < max_count {
        let Some((b, next)) = consume(store, cur, dir, multiline) else { break };
        if !atom_matches(&node.kind, b) {
            break;
        }
        cur = next;
        positions.push(cur);
    }
    if positions.len() - 1 < min_count {
        return None;
    }
    let hi = positions.len() - 1;
    if node.min {
        for k in min_count..=hi {
            if let Some(end) = amatch(nodes, ni + 1, store, positions[k], dir, starts, groups, multiline) {
                return Some(end);
            }
        }
    } else {
        for k in (min_count..=hi).rev() {
            if let Some(end) = amatch(nodes, ni + 1, store, positions[k], dir, starts, groups, multiline) {
                return Some(end);
            }
        }
    }
    None
}

/// `amatch(pattern, direction)` (§4.G): does `nodes[ni..]` match starting at
/// `point`? Returns the point just past the match on success. `multiline`
/// is `:m`'s "dot matches newline" flag, threaded down to `consume`.
pub fn amatch(
    nodes: &[Node],
    ni: usize,
    store: &LineStore,
    point: Point,
    dir: Direction,
    starts: &mut Vec<Option<Point>>,
    groups: &mut Groups,
    multiline: bool,
) -> Option<Point> {
    let node = nodes.get(ni)?;
    match &node.kind {
        NodeKind::Nil => Some(point),
        NodeKind::Bol => {
            if point.offset == 0 { amatch(nodes, ni + 1, store, point, dir, starts, groups, multiline) } else { None }
        }
        NodeKind::Eol => {
            let at_eol = store.is_header(point.line) || point.offset == store.len(point.line);
            if at_eol { amatch(nodes, ni + 1, store, point, dir, starts, groups, multiline) } else { None }
        }
        NodeKind::GroupBegin(g) => {
            let g = *g;
            let saved = starts[g];
            starts[g] = Some(point);
            let result = amatch(nodes, ni + 1, store, point, dir, starts, groups, multiline);
            if result.is_none() {
                starts[g] = saved;
            }
            result
        }
        NodeKind::GroupEnd(g) => {
            let g = *g;
            let saved = groups[g];
            let begin = starts[g].expect("GroupEnd reached without a matching GroupBegin");
            groups[g] = Some(if dir == Direction::Forward { (begin, point) } else { (point, begin) });
            let result = amatch(nodes, ni + 1, store, point, dir, starts, groups, multiline);
            if result.is_none() {
                groups[g] = saved;
            }
            result
        }
        _ => match node.closure {
            Closure::None => {
                let (b, next) = consume(store, point, dir, multiline)?;
                if atom_matches(&node.kind, b) {
                    amatch(nodes, ni + 1, store, next, dir, starts, groups, multiline)
                } else {
                    None
                }
            }
            Closure::ZeroOrMore => match_closure(nodes, ni, store, point, dir, starts, groups, 0, usize::MAX, multiline),
            Closure::OneOrMore => match_closure(nodes, ni, store, point, dir, starts, groups, 1, usize::MAX, multiline),
            Closure::ZeroOrOne => match_closure(nodes, ni, store, point, dir, starts, groups, 0, 1, multiline),
        },
    }
}

/// `mcscan` (§4.G): try `amatch` at every position from `from` in direction
/// `dir` until one succeeds or a buffer boundary is reached. `groups[0]` is
/// always the whole match on success; `groups[1..]` are the pattern's
/// numbered capture groups, `None` where a group never participated.
pub fn mcscan(store: &LineStore, from: Point, regex: &Regex, dir: Direction) -> EdResult<Groups> {
    let nodes = match dir {
        Direction::Forward => &regex.nodes,
        Direction::Backward => &regex.rev_nodes,
    };
    let mut point = from;
    loop {
        let mut starts = vec![None; regex.group_count + 1];
        let mut groups: Groups = vec![None; regex.group_count + 1];
        if let Some(end) = amatch(nodes, 0, store, point, dir, &mut starts, &mut groups, regex.multiline) {
            groups[0] = Some(if dir == Direction::Forward { (point, end) } else { (end, point) });
            return Ok(groups);
        }
        let stepped = match dir {
            Direction::Forward => next_char(store, point),
            Direction::Backward => prev_char(store, point),
        };
        point = stepped.ok_or(Status::NotFound)?;
    }
}
