//! Lexical scope tree.
//!
//! Scopes are arena-allocated and addressed by [`ScopeId`]; parent links are plain indices, so
//! the tree never owns a cycle. The root scope (level 0) spans the whole source and every other
//! scope's range lies within its parent's.
//!
//! Declaration attribution:
//! - `var` goes to the nearest enclosing function scope (or the root), mirroring hoisting
//! - `let` / `const` / `class` go to the immediate block; `for (let ...)` and `catch (e)`
//!   bindings go to the block that follows the header
//! - a function declaration's name goes to the enclosing scope, its parameters to the function's
//!   own scope

use crate::lexer::{Token, TokenKind, TokenStream};
use calc_script_lang::{FunctionParameter, ScriptLanguage};
use std::collections::{BTreeSet, HashSet};
use std::ops::Range;

/// Index of a scope inside a [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The root (global) scope.
    pub const ROOT: ScopeId = ScopeId(0);

    /// Arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A lexical region and the names declared directly in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// Nesting depth (root is 0).
    pub level: u32,
    /// Enclosing scope (`None` only for the root).
    pub parent: Option<ScopeId>,
    /// Child scopes in source order.
    pub children: Vec<ScopeId>,
    /// Whether this is a function body (or the root).
    pub is_function_scope: bool,
    /// `let` / `const` / `class` names and header bindings.
    pub block_vars: BTreeSet<String>,
    /// `var` names (hoisted here) and parameters.
    pub function_vars: BTreeSet<String>,
    /// Names of functions declared in this scope.
    pub function_names: BTreeSet<String>,
}

impl Scope {
    fn new(start: usize, end: usize, level: u32, parent: Option<ScopeId>, is_function: bool) -> Self {
        Self {
            start,
            end,
            level,
            parent,
            children: Vec::new(),
            is_function_scope: is_function,
            block_vars: BTreeSet::new(),
            function_vars: BTreeSet::new(),
            function_names: BTreeSet::new(),
        }
    }

    /// Returns `true` if `offset` lies within this scope.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Returns `true` if `name` is declared directly in this scope.
    pub fn declares(&self, name: &str) -> bool {
        self.block_vars.contains(name)
            || self.function_vars.contains(name)
            || self.function_names.contains(name)
    }
}

/// A function declared in the script itself.
///
/// Its parameter list doubles as an arity signature: parameters with a default value are
/// optional, and a rest parameter (or use of `arguments`) makes the function variadic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredFunction {
    /// Function name.
    pub name: String,
    /// Declared parameters.
    pub parameters: Vec<FunctionParameter>,
    /// Accepts any number of trailing arguments.
    pub variadic: bool,
    /// Byte offset of the name.
    pub offset: usize,
    /// Scope the name is bound in.
    pub scope: ScopeId,
    /// The function's own body scope, once its `{` has been seen.
    pub body: Option<ScopeId>,
}

impl DeclaredFunction {
    /// Number of arguments a call must provide.
    pub fn required_count(&self) -> usize {
        self.parameters.iter().filter(|p| !p.optional).count()
    }

    /// Maximum number of arguments, or `None` if variadic.
    pub fn max_count(&self) -> Option<usize> {
        (!self.variadic).then_some(self.parameters.len())
    }
}

/// The scope tree of one source text.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    declaration_sites: HashSet<usize>,
    functions: Vec<DeclaredFunction>,
}

impl ScopeTree {
    /// Build the tree from tokens of `source`.
    ///
    /// Words the language reserves as keywords never become binding names.
    pub fn build(source: &str, tokens: &TokenStream, language: &ScriptLanguage) -> Self {
        Builder::new(source, tokens, language).run()
    }

    /// The root scope.
    pub fn root(&self) -> &Scope {
        &self.scopes[0]
    }

    /// Scope by id.
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// All scopes in creation (source) order; index 0 is the root.
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Functions declared in the script.
    pub fn functions(&self) -> &[DeclaredFunction] {
        &self.functions
    }

    /// Returns `true` if an identifier starting at `offset` binds a name (declaration,
    /// parameter, catch binding, ...).
    pub fn is_declaration_site(&self, offset: usize) -> bool {
        self.declaration_sites.contains(&offset)
    }

    /// The innermost scope containing `offset`.
    pub fn innermost_at(&self, offset: usize) -> ScopeId {
        let mut current = ScopeId::ROOT;
        'descend: loop {
            for &child in &self.get(current).children {
                if self.get(child).contains(offset) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// `id` followed by each of its ancestors up to the root.
    pub fn ancestors(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(id), |&scope| self.get(scope).parent)
    }

    /// The nearest function scope enclosing (or equal to) `id`.
    pub fn enclosing_function(&self, id: ScopeId) -> ScopeId {
        self.ancestors(id)
            .find(|&scope| self.get(scope).is_function_scope)
            .unwrap_or(ScopeId::ROOT)
    }

    /// Every name visible at `offset`: declarations of the innermost scope and all its
    /// ancestors, including hoisted `var`s of enclosing functions and the globals.
    pub fn variables_in_scope(&self, offset: usize) -> HashSet<String> {
        let mut names = HashSet::new();
        for id in self.ancestors(self.innermost_at(offset)) {
            let scope = self.get(id);
            names.extend(scope.block_vars.iter().cloned());
            names.extend(scope.function_names.iter().cloned());
            names.extend(scope.function_vars.iter().cloned());
        }
        names
    }

    /// Returns `true` if `name` is declared in a scope visible from `offset`.
    pub fn is_visible(&self, name: &str, offset: usize) -> bool {
        self.ancestors(self.innermost_at(offset))
            .any(|id| self.get(id).declares(name))
    }

    /// The script-declared function `name` resolves to at `offset`, if any.
    pub fn function_at(&self, name: &str, offset: usize) -> Option<&DeclaredFunction> {
        let visible: Vec<ScopeId> = self.ancestors(self.innermost_at(offset)).collect();
        visible.iter().find_map(|scope| {
            self.functions
                .iter()
                .find(|f| f.name == name && f.scope == *scope)
        })
    }
}

#[derive(Debug, Clone)]
struct Binding {
    name: String,
    offset: usize,
    optional: bool,
    rest: bool,
}

#[derive(Debug)]
struct OpenScope {
    id: ScopeId,
    /// Token index at which a synthetic (expression-bodied arrow) scope ends.
    close_at: Option<usize>,
}

#[derive(Debug)]
struct PendingBody {
    brace_index: usize,
    /// Where the scope starts: the header's `(` so parameters are visible in defaults.
    start: usize,
    is_function: bool,
    bindings: Vec<Binding>,
    self_name: Option<String>,
    function: Option<usize>,
}

#[derive(Debug)]
struct ForHeader {
    open: usize,
    close: usize,
    bindings: Vec<Binding>,
}

struct Builder<'a> {
    source: &'a str,
    language: &'a ScriptLanguage,
    stream: &'a TokenStream,
    tokens: &'a [Token],
    scopes: Vec<Scope>,
    stack: Vec<OpenScope>,
    pending: Vec<PendingBody>,
    for_headers: Vec<ForHeader>,
    declaration_sites: HashSet<usize>,
    functions: Vec<DeclaredFunction>,
}

impl<'a> Builder<'a> {
    fn new(source: &'a str, stream: &'a TokenStream, language: &'a ScriptLanguage) -> Self {
        Self {
            source,
            language,
            stream,
            tokens: stream.tokens(),
            scopes: vec![Scope::new(0, source.len(), 0, None, true)],
            stack: vec![OpenScope {
                id: ScopeId::ROOT,
                close_at: None,
            }],
            pending: Vec::new(),
            for_headers: Vec::new(),
            declaration_sites: HashSet::new(),
            functions: Vec::new(),
        }
    }

    fn run(mut self) -> ScopeTree {
        for idx in 0..self.tokens.len() {
            self.close_synthetic_scopes(idx);
            self.pending.retain(|p| p.brace_index >= idx);

            let token = self.tokens[idx];
            match token.kind {
                TokenKind::Punct('{') => self.open_block(idx),
                TokenKind::Punct('}') => self.close_block(token.end),
                TokenKind::Punct(')') => self.finish_for_header(idx),
                TokenKind::Operator if self.text(idx) == "=>" => self.arrow(idx),
                TokenKind::Identifier => self.identifier(idx),
                _ => {}
            }
        }

        let end = self.source.len();
        while self.stack.len() > 1 {
            if let Some(open) = self.stack.pop() {
                self.scopes[open.id.index()].end = end;
            }
        }
        self.mark_variadic_functions();

        ScopeTree {
            scopes: self.scopes,
            declaration_sites: self.declaration_sites,
            functions: self.functions,
        }
    }

    fn text(&self, idx: usize) -> &'a str {
        self.tokens[idx].text(self.source)
    }

    fn is_text(&self, idx: usize, text: &str) -> bool {
        idx < self.tokens.len() && self.text(idx) == text
    }

    fn is_punct(&self, idx: usize, ch: char) -> bool {
        self.tokens.get(idx).is_some_and(|t| t.is_punct(ch))
    }

    fn current(&self) -> ScopeId {
        self.stack.last().map(|s| s.id).unwrap_or(ScopeId::ROOT)
    }

    fn open_scope(&mut self, start: usize, is_function: bool, close_at: Option<usize>) -> ScopeId {
        let parent = self.current();
        let level = self.scopes[parent.index()].level + 1;
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes
            .push(Scope::new(start, self.source.len(), level, Some(parent), is_function));
        self.scopes[parent.index()].children.push(id);
        self.stack.push(OpenScope { id, close_at });
        id
    }

    fn close_synthetic_scopes(&mut self, idx: usize) {
        while let Some(pos) = self.stack.iter().rposition(|s| s.close_at == Some(idx)) {
            let end = self.tokens[idx].start;
            for open in self.stack.drain(pos..) {
                self.scopes[open.id.index()].end = end;
            }
        }
    }

    fn open_block(&mut self, idx: usize) {
        let start = self.tokens[idx].start;
        let pending = self
            .pending
            .iter()
            .position(|p| p.brace_index == idx)
            .map(|pos| self.pending.remove(pos));

        let Some(pending) = pending else {
            self.open_scope(start, false, None);
            return;
        };

        let id = self.open_scope(pending.start.min(start), pending.is_function, None);
        let scope = &mut self.scopes[id.index()];
        for binding in pending.bindings {
            if pending.is_function {
                scope.function_vars.insert(binding.name);
            } else {
                scope.block_vars.insert(binding.name);
            }
        }
        if let Some(name) = pending.self_name {
            scope.function_names.insert(name);
        }
        if let Some(function) = pending.function {
            self.functions[function].body = Some(id);
        }
    }

    fn close_block(&mut self, end: usize) {
        while let Some(top) = self.stack.last() {
            if top.id == ScopeId::ROOT {
                return;
            }
            let synthetic = top.close_at.is_some();
            if let Some(open) = self.stack.pop() {
                self.scopes[open.id.index()].end = end;
            }
            if !synthetic {
                return;
            }
        }
    }

    fn identifier(&mut self, idx: usize) {
        match self.text(idx) {
            "var" => {
                let bindings = self.declarators(idx + 1);
                let target = self.function_scope_of_current();
                self.bind(target, bindings, Slot::Function);
            }
            "let" | "const" => {
                let bindings = self.declarators(idx + 1);
                if let Some(header) = self
                    .for_headers
                    .last_mut()
                    .filter(|h| idx < h.close)
                {
                    for binding in &bindings {
                        self.declaration_sites.insert(binding.offset);
                    }
                    header.bindings.extend(bindings);
                } else {
                    let target = self.current();
                    self.bind(target, bindings, Slot::Block);
                }
            }
            "class" => {
                if let Some(next) = self.tokens.get(idx + 1)
                    && next.is_identifier()
                {
                    let binding = Binding {
                        name: self.text(idx + 1).to_string(),
                        offset: next.start,
                        optional: false,
                        rest: false,
                    };
                    let target = self.current();
                    self.bind(target, vec![binding], Slot::Block);
                }
            }
            "function" => self.function_header(idx),
            "catch" if self.is_punct(idx + 1, '(') => {
                if let Some(close) = self.stream.partner(idx + 1) {
                    let bindings = self.collect_bindings(idx + 2..close);
                    for binding in &bindings {
                        self.declaration_sites.insert(binding.offset);
                    }
                    self.pending.push(PendingBody {
                        brace_index: close + 1,
                        start: self.tokens[idx + 1].start,
                        is_function: false,
                        bindings,
                        self_name: None,
                        function: None,
                    });
                }
            }
            "for" if self.is_punct(idx + 1, '(') => {
                if let Some(close) = self.stream.partner(idx + 1) {
                    // `for (key in obj)` binds `key` without a declaration keyword.
                    let mut bindings = Vec::new();
                    if let Some(first) = self.tokens.get(idx + 2)
                        && first.is_identifier()
                        && !self.is_reserved(self.text(idx + 2))
                        && (self.is_text(idx + 3, "in") || self.is_text(idx + 3, "of"))
                    {
                        self.declaration_sites.insert(first.start);
                        bindings.push(Binding {
                            name: self.text(idx + 2).to_string(),
                            offset: first.start,
                            optional: false,
                            rest: false,
                        });
                    }
                    self.for_headers.push(ForHeader {
                        open: self.tokens[idx + 1].start,
                        close,
                        bindings,
                    });
                }
            }
            _ => self.method_shorthand(idx),
        }
    }

    /// `name(params) { ... }` inside object literals and class bodies.
    fn method_shorthand(&mut self, idx: usize) {
        if !self.is_punct(idx + 1, '(') || self.is_reserved(self.text(idx)) {
            return;
        }
        if idx > 0 && (self.is_text(idx - 1, "function") || self.is_punct(idx - 1, '.')) {
            return;
        }
        let Some(close) = self.stream.partner(idx + 1) else {
            return;
        };
        if !self.is_punct(close + 1, '{') || self.pending.iter().any(|p| p.brace_index == close + 1)
        {
            return;
        }
        let bindings = self.collect_bindings(idx + 2..close);
        for binding in &bindings {
            self.declaration_sites.insert(binding.offset);
        }
        self.pending.push(PendingBody {
            brace_index: close + 1,
            start: self.tokens[idx + 1].start,
            is_function: true,
            bindings,
            self_name: None,
            function: None,
        });
    }

    fn function_header(&mut self, idx: usize) {
        let mut cursor = idx + 1;
        let name = match self.tokens.get(cursor) {
            Some(token) if token.is_identifier() => {
                cursor += 1;
                Some((self.text(cursor - 1).to_string(), token.start))
            }
            _ => None,
        };
        // Generator marker.
        if self.is_text(cursor, "*") {
            cursor += 1;
        }
        if !self.is_punct(cursor, '(') {
            return;
        }
        let Some(close) = self.stream.partner(cursor) else {
            return;
        };

        let params = self.collect_bindings(cursor + 1..close);
        for param in &params {
            self.declaration_sites.insert(param.offset);
        }

        let mut self_name = None;
        let mut function = None;
        if let Some((name, offset)) = name {
            self.declaration_sites.insert(offset);
            if self.is_function_declaration(idx) {
                let scope = self.current();
                self.scopes[scope.index()]
                    .function_names
                    .insert(name.clone());
                function = Some(self.functions.len());
                self.functions.push(DeclaredFunction {
                    name,
                    parameters: params
                        .iter()
                        .filter(|p| !p.rest)
                        .map(|p| FunctionParameter {
                            name: p.name.clone(),
                            optional: p.optional,
                        })
                        .collect(),
                    variadic: params.iter().any(|p| p.rest),
                    offset,
                    scope,
                    body: None,
                });
            } else {
                self_name = Some(name);
            }
        }

        self.pending.push(PendingBody {
            brace_index: close + 1,
            start: self.tokens[cursor].start,
            is_function: true,
            bindings: params,
            self_name,
            function,
        });
    }

    fn is_function_declaration(&self, idx: usize) -> bool {
        let mut prev = idx.checked_sub(1);
        if let Some(p) = prev
            && self.is_text(p, "async")
        {
            prev = p.checked_sub(1);
        }
        let Some(prev) = prev else {
            return true;
        };
        let token = self.tokens[prev];
        match token.kind {
            TokenKind::Punct(';' | '{' | '}' | ')') => true,
            TokenKind::Identifier => matches!(self.text(prev), "else" | "export" | "default" | "do"),
            _ => false,
        }
    }

    fn arrow(&mut self, idx: usize) {
        let Some(prev) = idx.checked_sub(1) else {
            return;
        };
        let params_open = if self.is_punct(prev, ')') {
            self.stream.partner(prev)
        } else {
            None
        };
        let header_start = self.tokens[params_open.unwrap_or(prev)].start;
        let bindings = if self.is_punct(prev, ')') {
            match params_open {
                Some(open) => self.collect_bindings(open + 1..prev),
                None => Vec::new(),
            }
        } else if self.tokens[prev].is_identifier() {
            vec![Binding {
                name: self.text(prev).to_string(),
                offset: self.tokens[prev].start,
                optional: false,
                rest: false,
            }]
        } else {
            Vec::new()
        };
        for binding in &bindings {
            self.declaration_sites.insert(binding.offset);
        }

        if self.is_punct(idx + 1, '{') {
            self.pending.push(PendingBody {
                brace_index: idx + 1,
                start: header_start,
                is_function: true,
                bindings,
                self_name: None,
                function: None,
            });
            return;
        }

        let close_at = self.expression_end(idx + 1);
        let id = self.open_scope(self.tokens[idx].start, true, Some(close_at));
        let scope = &mut self.scopes[id.index()];
        for binding in bindings {
            scope.function_vars.insert(binding.name);
        }
    }

    /// Token index where an expression starting at `from` ends: the first top-level `,` or `;`,
    /// or an unmatched closer.
    fn expression_end(&self, from: usize) -> usize {
        let mut idx = from;
        while let Some(token) = self.tokens.get(idx) {
            match token.kind {
                TokenKind::Punct(',' | ';' | ')' | ']' | '}') => return idx,
                TokenKind::Punct('(' | '[' | '{') => match self.stream.partner(idx) {
                    Some(close) => idx = close + 1,
                    None => return self.tokens.len(),
                },
                _ => idx += 1,
            }
        }
        self.tokens.len()
    }

    fn finish_for_header(&mut self, idx: usize) {
        if !self.for_headers.last().is_some_and(|h| h.close == idx) {
            return;
        }
        let Some(header) = self.for_headers.pop() else {
            return;
        };
        if self.is_punct(idx + 1, '{') {
            self.pending.push(PendingBody {
                brace_index: idx + 1,
                start: header.open,
                is_function: false,
                bindings: header.bindings,
                self_name: None,
                function: None,
            });
        } else {
            let target = self.current();
            self.bind(target, header.bindings, Slot::Block);
        }
    }

    fn function_scope_of_current(&self) -> ScopeId {
        let mut id = self.current();
        loop {
            let scope = &self.scopes[id.index()];
            if scope.is_function_scope {
                return id;
            }
            match scope.parent {
                Some(parent) => id = parent,
                None => return ScopeId::ROOT,
            }
        }
    }

    fn bind(&mut self, target: ScopeId, bindings: Vec<Binding>, slot: Slot) {
        let scope = &mut self.scopes[target.index()];
        for binding in bindings {
            self.declaration_sites.insert(binding.offset);
            match slot {
                Slot::Block => scope.block_vars.insert(binding.name),
                Slot::Function => scope.function_vars.insert(binding.name),
            };
        }
    }

    /// Names bound by a `var` / `let` / `const` declarator list starting at `from`.
    fn declarators(&self, from: usize) -> Vec<Binding> {
        #[derive(PartialEq)]
        enum Expect {
            Name,
            AfterName,
            Initializer,
        }

        let mut bindings = Vec::new();
        let mut expect = Expect::Name;
        let mut idx = from;

        while let Some(token) = self.tokens.get(idx) {
            match expect {
                Expect::Name => match token.kind {
                    TokenKind::Identifier if !self.is_reserved(self.text(idx)) => {
                        bindings.push(Binding {
                            name: self.text(idx).to_string(),
                            offset: token.start,
                            optional: false,
                            rest: false,
                        });
                        expect = Expect::AfterName;
                        idx += 1;
                    }
                    TokenKind::Punct('{' | '[') => {
                        let Some(close) = self.stream.partner(idx) else {
                            break;
                        };
                        bindings.extend(self.collect_bindings(idx..close + 1));
                        expect = Expect::AfterName;
                        idx = close + 1;
                    }
                    _ => break,
                },
                Expect::AfterName => match token.kind {
                    TokenKind::Operator if self.text(idx) == "=" => {
                        expect = Expect::Initializer;
                        idx += 1;
                    }
                    TokenKind::Punct(',') => {
                        expect = Expect::Name;
                        idx += 1;
                    }
                    _ => break,
                },
                Expect::Initializer => match token.kind {
                    TokenKind::Punct(',') => {
                        expect = Expect::Name;
                        idx += 1;
                    }
                    TokenKind::Punct(';' | ')' | ']' | '}') => break,
                    TokenKind::Punct('(' | '[' | '{') => match self.stream.partner(idx) {
                        Some(close) => idx = close + 1,
                        None => break,
                    },
                    _ if self.starts_new_statement(idx) => break,
                    _ => idx += 1,
                },
            }
        }

        bindings
    }

    /// Automatic semicolon insertion heuristic: a keyword/identifier on a new line after an
    /// expression-ending token starts a new statement.
    fn starts_new_statement(&self, idx: usize) -> bool {
        let Some(prev) = idx.checked_sub(1).and_then(|p| self.tokens.get(p)) else {
            return false;
        };
        let token = self.tokens[idx];
        let ends_expression = prev.is_identifier()
            || prev.is_literal()
            || prev.is_punct(')')
            || prev.is_punct(']')
            || prev.is_punct('}');
        ends_expression
            && token.is_identifier()
            && self.source[prev.end..token.start].contains('\n')
    }

    /// Words that can never be binding names.
    fn is_reserved(&self, word: &str) -> bool {
        self.language.is_keyword(word)
    }

    /// Binding names in a parameter list or destructuring pattern spanning `range`.
    fn collect_bindings(&self, range: Range<usize>) -> Vec<Binding> {
        let mut bindings: Vec<Binding> = Vec::new();
        let mut brackets: Vec<char> = Vec::new();
        let mut in_default = false;
        let mut rest_next = false;

        let end = range.end.min(self.tokens.len());
        for idx in range.start..end {
            let token = self.tokens[idx];
            let prev = if idx > range.start {
                Some(self.tokens[idx - 1])
            } else {
                None
            };

            match token.kind {
                TokenKind::Punct(open @ ('(' | '[' | '{')) => brackets.push(open),
                TokenKind::Punct(')' | ']' | '}') => {
                    brackets.pop();
                }
                TokenKind::Punct(',') if brackets.is_empty() => in_default = false,
                TokenKind::Operator if brackets.is_empty() && self.text(idx) == "=" => {
                    in_default = true;
                    if let Some(last) = bindings.last_mut() {
                        last.optional = true;
                    }
                }
                TokenKind::Operator if self.text(idx) == "..." => rest_next = !in_default,
                TokenKind::Identifier if !in_default && !self.is_reserved(self.text(idx)) => {
                    let in_pattern = !brackets.is_empty() && brackets.iter().all(|b| *b != '(');
                    let prev_allows = match prev {
                        None => true,
                        Some(p) => {
                            p.is_punct(',')
                                || p.is_punct('{')
                                || p.is_punct('[')
                                || (in_pattern && p.is_punct(':'))
                                || (p.kind == TokenKind::Operator && p.text(self.source) == "...")
                        }
                    };
                    let next_is_key = self
                        .tokens
                        .get(idx + 1)
                        .is_some_and(|n| n.is_punct(':') || n.is_punct('('));
                    let binds = if brackets.is_empty() {
                        prev.is_none_or(|p| {
                            p.is_punct(',')
                                || (p.kind == TokenKind::Operator && p.text(self.source) == "...")
                        })
                    } else {
                        in_pattern && prev_allows && !next_is_key
                    };
                    if binds {
                        bindings.push(Binding {
                            name: self.text(idx).to_string(),
                            offset: token.start,
                            optional: false,
                            rest: rest_next && brackets.is_empty(),
                        });
                    }
                    rest_next = false;
                }
                _ => {}
            }
        }

        bindings
    }

    fn mark_variadic_functions(&mut self) {
        for function in &mut self.functions {
            let Some(body) = function.body else {
                continue;
            };
            let scope = &self.scopes[body.index()];
            let first = self.stream.index_at(scope.start);
            let uses_arguments = self.tokens[first..]
                .iter()
                .take_while(|t| t.start < scope.end)
                .any(|t| t.is_identifier() && t.text(self.source) == "arguments");
            if uses_arguments {
                function.variadic = true;
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Block,
    Function,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn build(source: &str) -> ScopeTree {
        ScopeTree::build(source, &TokenStream::new(source), &ScriptLanguage::default())
    }

    fn visible_at(source: &str, marker: &str) -> HashSet<String> {
        let tree = build(source);
        let offset = source.find(marker).expect("marker present");
        tree.variables_in_scope(offset)
    }

    #[test]
    fn test_root_spans_source() {
        let src = "var a = 1;";
        let tree = build(src);
        assert_eq!(tree.root().start, 0);
        assert_eq!(tree.root().end, src.len());
        assert_eq!(tree.root().level, 0);
        assert!(tree.root().function_vars.contains("a"));
    }

    #[test]
    fn test_function_params_and_name_visible_in_body() {
        let src = "function f(a,b){ return a+b; }";
        let names = visible_at(src, "return");
        for name in ["a", "b", "f"] {
            assert!(names.contains(name), "{name} should be visible");
        }
        let tree = build(src);
        assert!(!tree.root().function_vars.contains("a"));
        assert!(tree.root().function_names.contains("f"));
        assert_eq!(tree.functions().len(), 1);
        assert_eq!(tree.functions()[0].required_count(), 2);
        assert_eq!(tree.functions()[0].max_count(), Some(2));
    }

    #[test]
    fn test_let_is_block_scoped() {
        let src = "{ let y = 1; } console.log(y);";
        assert!(!visible_at(src, "console").contains("y"));
        assert!(visible_at(src, "= 1").contains("y"));
    }

    #[test]
    fn test_var_hoists_to_function_scope() {
        let src = "function f(){ if (true) { var x = 1; } return x; }";
        assert!(visible_at(src, "return").contains("x"));
        let tree = build(src);
        assert!(!tree.root().function_vars.contains("x"));
    }

    #[test]
    fn test_scopes_are_nested_and_contained() {
        let src = "function f(a) { { let b; { const c = () => { return a; }; } } }";
        let tree = build(src);
        for scope in tree.scopes().iter().skip(1) {
            let parent = tree.get(scope.parent.expect("non-root has parent"));
            assert!(parent.start <= scope.start && scope.end <= parent.end);
            assert_eq!(scope.level, parent.level + 1);
        }
    }

    #[test]
    fn test_for_let_binds_to_loop_body() {
        let src = "for (let i = 0; i < 3; i++) { total += i; }\nafter(i);";
        assert!(visible_at(src, "total").contains("i"));
        assert!(!visible_at(src, "after").contains("i"));
    }

    #[test]
    fn test_for_of_const_binding() {
        let src = "for (const dose of doses) { sum(dose); }";
        assert!(visible_at(src, "sum").contains("dose"));
    }

    #[test]
    fn test_for_in_without_declaration_binds_key() {
        let src = "for (key in doses) { print(key); }";
        let tree = build(src);
        assert!(visible_at(src, "print").contains("key"));
        assert!(tree.is_declaration_site(src.find("key").unwrap()));
    }

    #[test]
    fn test_catch_binding() {
        let src = "try { risky(); } catch (err) { report(err); } done(err);";
        assert!(visible_at(src, "report").contains("err"));
        assert!(!visible_at(src, "done").contains("err"));
    }

    #[test]
    fn test_var_list_with_initializers() {
        let src = "var a = f(1, 2), b = [3, 4], c;";
        let tree = build(src);
        let names: Vec<_> = tree.root().function_vars.iter().cloned().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(tree.is_declaration_site(src.find("b =").unwrap()));
    }

    #[test]
    fn test_declarator_stops_at_newline_statement() {
        let src = "var a = 1\nb = 2;";
        let tree = build(src);
        assert!(tree.root().function_vars.contains("a"));
        assert!(!tree.root().function_vars.contains("b"));
    }

    #[test]
    fn test_destructuring_declarations() {
        let src = "const { dose, unit: u } = cfg; let [lo, hi] = range;";
        let tree = build(src);
        let names: Vec<_> = tree.root().block_vars.iter().cloned().collect();
        assert_eq!(names, vec!["dose", "hi", "lo", "u"]);
    }

    #[test]
    fn test_arrow_functions() {
        let src = "const sq = x => x * x; const add = (a, b = 1) => { return a + b; };";
        assert!(visible_at(src, "x * x").contains("x"));
        assert!(!visible_at(src, "const add").contains("x"));
        assert!(visible_at(src, "return").contains("b"));
    }

    #[test]
    fn test_function_expression_name_is_local() {
        let src = "var g = function inner(n) { return inner(n - 1); }; use(g);";
        let tree = build(src);
        assert!(!tree.root().function_names.contains("inner"));
        assert!(visible_at(src, "return").contains("inner"));
        assert!(tree.functions().is_empty());
    }

    #[test]
    fn test_default_and_rest_parameters() {
        let src = "function fmt(value, decimals = 2, ...rest) { }\nfunction sum() { return arguments.length; }";
        let tree = build(src);
        let fmt = &tree.functions()[0];
        assert_eq!(fmt.required_count(), 1);
        assert_eq!(fmt.max_count(), None);
        assert_eq!(fmt.parameters.len(), 2);
        let sum = &tree.functions()[1];
        assert_eq!(sum.max_count(), None);
    }

    #[test]
    fn test_method_shorthand_params() {
        let src = "var o = { area(w, h) { return w * h; } };";
        let names = visible_at(src, "return");
        assert!(names.contains("w") && names.contains("h"));
    }

    #[test]
    fn test_function_at_respects_visibility() {
        let src = "function outer() { function helper(a) {} helper(1); }\nhelper(2);";
        let tree = build(src);
        let inner_call = src.find("helper(1)").unwrap();
        let outer_call = src.find("helper(2)").unwrap();
        assert!(tree.function_at("helper", inner_call).is_some());
        assert!(tree.function_at("helper", outer_call).is_none());
        assert!(tree.function_at("outer", outer_call).is_some());
    }

    #[test]
    fn test_language_keywords_are_not_bindings() {
        let src = "var dose = 1;\nfunction f(a, dose) { }";
        let mut language = ScriptLanguage::default();
        language.keywords.insert("dose".to_string());
        let tree = ScopeTree::build(src, &TokenStream::new(src), &language);
        assert!(!tree.root().function_vars.contains("dose"));
        let names: Vec<_> = tree.functions()[0]
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["a"]);
        assert!(build(src).root().function_vars.contains("dose"));
    }
}
