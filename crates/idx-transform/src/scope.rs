//! Lexical scope analysis.
//!
//! A single read-only pass builds the scope tree of a program, records every
//! declaration, read and write of an identifier, and resolves the references
//! once the whole program has been seen (so hoisted declarations are found).
//! Identifier occurrences are keyed by their span, which is unique for nodes
//! that come from the parser.

use crate::binding;
use crate::error::RewriteError;
use std::collections::{HashMap, HashSet};
use swc_common::Span;
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};

pub type ScopeId = usize;
pub type BindingId = usize;

const ROOT: ScopeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Program,
    Function,
    Block,
    Catch,
    /// Scope holding a class expression's own name
    Class,
    /// Scope holding a function expression's own name
    NamedFunction,
    StaticBlock,
}

impl ScopeKind {
    /// Whether `var` declarations stop at this scope.
    fn hoists_vars(self) -> bool {
        matches!(
            self,
            ScopeKind::Program | ScopeKind::Function | ScopeKind::StaticBlock
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Var,
    Lexical,
    Param,
    Function,
    Class,
    Import,
}

#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    kind: ScopeKind,
    bindings: HashMap<String, BindingId>,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    pub scope: ScopeId,
    /// Span of the first declaring identifier
    pub span: Span,
    /// Further declarations of the same name in the same scope
    pub redeclarations: Vec<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Direct callee of a call expression
    Callee,
    /// Any other read
    Read,
    /// Assignment target, update operand or for-in/of head
    Write,
}

#[derive(Debug, Clone)]
pub struct Reference {
    pub name: String,
    pub span: Span,
    pub kind: ReferenceKind,
    pub scope: ScopeId,
    /// Resolved binding; `None` for globals
    pub binding: Option<BindingId>,
}

/// Where a helper binding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperOrigin {
    /// `import idx from 'idx'`, with the span of the whole declaration
    Import { span: Span },
    /// `const idx = require('idx')`, with the span of the declarator
    Require { span: Span, exported: bool },
}

#[derive(Debug, Clone, Copy)]
pub struct HelperDeclaration {
    pub binding: BindingId,
    pub origin: HelperOrigin,
}

/// Result of analyzing one program.
#[derive(Debug)]
pub struct ScopeAnalysis {
    scopes: Vec<Scope>,
    bindings: Vec<Binding>,
    references: Vec<Reference>,
    /// Helper declarations in source order
    pub helpers: Vec<HelperDeclaration>,
    /// `const { idx } = require('idx')` and similar, left alone
    pub unrecognized_requires: Vec<Span>,
    names: HashSet<String>,
}

impl ScopeAnalysis {
    /// Analyze `program`, recognizing declarations of the helper imported
    /// from `import_name`.
    ///
    /// Fails on the first malformed helper import.
    pub fn analyze(program: &Program, import_name: &str) -> Result<Self, RewriteError> {
        let mut analyzer = Analyzer::new(import_name);
        program.visit_with(&mut analyzer);
        if let Some(err) = analyzer.error {
            return Err(err);
        }

        let mut collector = NameCollector::default();
        program.visit_with(&mut collector);

        let Analyzer {
            scopes,
            bindings,
            mut references,
            helpers,
            unrecognized_requires,
            ..
        } = analyzer;

        for reference in &mut references {
            reference.binding = resolve(&scopes, reference.scope, &reference.name);
        }

        log::debug!(
            "scope analysis: {} scopes, {} bindings, {} references, {} helper declarations",
            scopes.len(),
            bindings.len(),
            references.len(),
            helpers.len()
        );

        Ok(ScopeAnalysis {
            scopes,
            bindings,
            references,
            helpers,
            unrecognized_requires,
            names: collector.names,
        })
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id]
    }

    pub fn scope_kind(&self, id: ScopeId) -> ScopeKind {
        self.scopes[id].kind
    }

    /// References resolved to `binding`, in source order.
    pub fn references_to(&self, binding: BindingId) -> impl Iterator<Item = &Reference> {
        self.references
            .iter()
            .filter(move |r| r.binding == Some(binding))
    }

    /// Resolve `name` as seen from `scope`.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<BindingId> {
        resolve(&self.scopes, scope, name)
    }

    /// A generator that avoids every identifier name used in the program.
    pub fn uid_generator(&self) -> UidGenerator {
        UidGenerator {
            used: self.names.clone(),
        }
    }
}

fn resolve(scopes: &[Scope], mut scope: ScopeId, name: &str) -> Option<BindingId> {
    loop {
        if let Some(&id) = scopes[scope].bindings.get(name) {
            return Some(id);
        }
        scope = scopes[scope].parent?;
    }
}

/// Generates `_ref`, `_ref2`, `_ref3`, ... never repeating a name and never
/// colliding with an identifier of the program.
#[derive(Debug, Clone, Default)]
pub struct UidGenerator {
    used: HashSet<String>,
}

impl UidGenerator {
    pub fn new(used: impl IntoIterator<Item = String>) -> Self {
        Self {
            used: used.into_iter().collect(),
        }
    }

    pub fn generate(&mut self, hint: &str) -> String {
        let mut counter = 1;
        loop {
            let candidate = if counter == 1 {
                format!("_{}", hint)
            } else {
                format!("_{}{}", hint, counter)
            };
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

#[derive(Default)]
struct NameCollector {
    names: HashSet<String>,
}

impl Visit for NameCollector {
    fn visit_ident(&mut self, ident: &Ident) {
        self.names.insert(ident.sym.to_string());
    }
}

/// How a `BindingIdent` met during traversal is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatMode {
    Read,
    Declare(BindingKind),
    Write,
}

struct Analyzer<'a> {
    import_name: &'a str,
    scopes: Vec<Scope>,
    current: ScopeId,
    mode: PatMode,
    var_kind: BindingKind,
    exporting: bool,
    bindings: Vec<Binding>,
    references: Vec<Reference>,
    helpers: Vec<HelperDeclaration>,
    unrecognized_requires: Vec<Span>,
    error: Option<RewriteError>,
}

impl<'a> Analyzer<'a> {
    fn new(import_name: &'a str) -> Self {
        Self {
            import_name,
            scopes: vec![Scope {
                parent: None,
                kind: ScopeKind::Program,
                bindings: HashMap::new(),
            }],
            current: ROOT,
            mode: PatMode::Read,
            var_kind: BindingKind::Var,
            exporting: false,
            bindings: Vec::new(),
            references: Vec::new(),
            helpers: Vec::new(),
            unrecognized_requires: Vec::new(),
            error: None,
        }
    }

    fn fail(&mut self, err: RewriteError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn with_scope(&mut self, kind: ScopeKind, f: impl FnOnce(&mut Self)) {
        let id = self.scopes.len();
        self.scopes.push(Scope {
            parent: Some(self.current),
            kind,
            bindings: HashMap::new(),
        });
        let saved_scope = std::mem::replace(&mut self.current, id);
        let saved_mode = std::mem::replace(&mut self.mode, PatMode::Read);
        let saved_exporting = std::mem::replace(&mut self.exporting, false);
        f(self);
        self.exporting = saved_exporting;
        self.mode = saved_mode;
        self.current = saved_scope;
    }

    fn with_mode(&mut self, mode: PatMode, f: impl FnOnce(&mut Self)) {
        let saved = std::mem::replace(&mut self.mode, mode);
        f(self);
        self.mode = saved;
    }

    fn target_scope(&self, kind: BindingKind) -> ScopeId {
        match kind {
            BindingKind::Import => ROOT,
            BindingKind::Var => {
                let mut scope = self.current;
                while !self.scopes[scope].kind.hoists_vars() {
                    match self.scopes[scope].parent {
                        Some(parent) => scope = parent,
                        None => break,
                    }
                }
                scope
            }
            _ => self.current,
        }
    }

    fn declare(&mut self, ident: &Ident, kind: BindingKind) -> BindingId {
        let scope = self.target_scope(kind);
        let name = ident.sym.to_string();
        if let Some(&id) = self.scopes[scope].bindings.get(&name) {
            self.bindings[id].redeclarations.push(ident.span);
            return id;
        }

        let id = self.bindings.len();
        self.bindings.push(Binding {
            name: name.clone(),
            kind,
            scope,
            span: ident.span,
            redeclarations: Vec::new(),
        });
        self.scopes[scope].bindings.insert(name, id);
        id
    }

    fn reference(&mut self, ident: &Ident, kind: ReferenceKind) {
        self.references.push(Reference {
            name: ident.sym.to_string(),
            span: ident.span,
            kind,
            scope: self.current,
            binding: None,
        });
    }

    fn visit_block_in(&mut self, kind: ScopeKind, block: &BlockStmt) {
        self.with_scope(kind, |s| block.stmts.visit_with(s));
    }

    fn visit_params(&mut self, params: &impl VisitWith<Self>) {
        self.with_mode(PatMode::Declare(BindingKind::Param), |s| params.visit_with(s));
    }
}

/// Leftmost identifier of `a.b.c` in type position.
fn entity_root(name: &TsEntityName) -> Option<&Ident> {
    match name {
        TsEntityName::Ident(ident) => Some(ident),
        TsEntityName::TsQualifiedName(qualified) => entity_root(&qualified.left),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// The identifier `expr` is, looking through parentheses.
fn bare_ident(expr: &Expr) -> Option<&Ident> {
    match expr {
        Expr::Ident(ident) => Some(ident),
        Expr::Paren(paren) => bare_ident(&paren.expr),
        _ => None,
    }
}

impl Visit for Analyzer<'_> {
    // Declarations

    fn visit_import_decl(&mut self, decl: &ImportDecl) {
        if binding::imports_helper(decl, self.import_name) {
            match binding::check_import(decl) {
                Ok(local) => {
                    let id = self.declare(local, BindingKind::Import);
                    self.helpers.push(HelperDeclaration {
                        binding: id,
                        origin: HelperOrigin::Import { span: decl.span },
                    });
                    return;
                }
                Err(err) => self.fail(err),
            }
        }

        for specifier in &decl.specifiers {
            let local = match specifier {
                ImportSpecifier::Named(named) => &named.local,
                ImportSpecifier::Default(default) => &default.local,
                ImportSpecifier::Namespace(namespace) => &namespace.local,
            };
            self.declare(local, BindingKind::Import);
        }
    }

    fn visit_var_decl(&mut self, decl: &VarDecl) {
        let kind = match decl.kind {
            VarDeclKind::Var => BindingKind::Var,
            VarDeclKind::Let | VarDeclKind::Const => BindingKind::Lexical,
        };
        let saved = std::mem::replace(&mut self.var_kind, kind);
        decl.decls.visit_with(self);
        self.var_kind = saved;
    }

    fn visit_using_decl(&mut self, decl: &UsingDecl) {
        let saved = std::mem::replace(&mut self.var_kind, BindingKind::Lexical);
        decl.decls.visit_with(self);
        self.var_kind = saved;
    }

    fn visit_var_declarator(&mut self, declarator: &VarDeclarator) {
        let kind = self.var_kind;
        if let Some(init) = declarator.init.as_deref() {
            if binding::is_helper_require(init, self.import_name) {
                if let Pat::Ident(name) = &declarator.name {
                    let id = self.declare(&name.id, kind);
                    self.helpers.push(HelperDeclaration {
                        binding: id,
                        origin: HelperOrigin::Require {
                            span: declarator.span,
                            exported: self.exporting,
                        },
                    });
                    init.visit_with(self);
                    return;
                }
                self.unrecognized_requires.push(declarator.span);
            }
        }

        self.with_mode(PatMode::Declare(kind), |s| declarator.name.visit_with(s));
        declarator.init.visit_with(self);
    }

    fn visit_export_decl(&mut self, export: &ExportDecl) {
        let saved = std::mem::replace(&mut self.exporting, true);
        export.decl.visit_with(self);
        self.exporting = saved;
    }

    fn visit_export_default_decl(&mut self, export: &ExportDefaultDecl) {
        match &export.decl {
            DefaultDecl::Fn(FnExpr {
                ident: Some(ident),
                function,
            }) => {
                self.declare(ident, BindingKind::Function);
                function.visit_with(self);
            }
            DefaultDecl::Class(ClassExpr {
                ident: Some(ident),
                class,
            }) => {
                self.declare(ident, BindingKind::Class);
                class.visit_with(self);
            }
            other => other.visit_with(self),
        }
    }

    fn visit_named_export(&mut self, export: &NamedExport) {
        // Re-exports from another module do not touch local bindings.
        if export.src.is_some() {
            return;
        }
        for specifier in &export.specifiers {
            if let ExportSpecifier::Named(ExportNamedSpecifier {
                orig: ModuleExportName::Ident(orig),
                ..
            }) = specifier
            {
                self.reference(orig, ReferenceKind::Read);
            }
        }
    }

    fn visit_fn_decl(&mut self, decl: &FnDecl) {
        self.declare(&decl.ident, BindingKind::Function);
        decl.function.visit_with(self);
    }

    fn visit_fn_expr(&mut self, expr: &FnExpr) {
        match &expr.ident {
            Some(ident) => self.with_scope(ScopeKind::NamedFunction, |s| {
                s.declare(ident, BindingKind::Function);
                expr.function.visit_with(s);
            }),
            None => expr.function.visit_with(self),
        }
    }

    fn visit_class_decl(&mut self, decl: &ClassDecl) {
        self.declare(&decl.ident, BindingKind::Class);
        decl.class.visit_with(self);
    }

    fn visit_class_expr(&mut self, expr: &ClassExpr) {
        match &expr.ident {
            Some(ident) => self.with_scope(ScopeKind::Class, |s| {
                s.declare(ident, BindingKind::Class);
                expr.class.visit_with(s);
            }),
            None => expr.class.visit_with(self),
        }
    }

    fn visit_binding_ident(&mut self, ident: &BindingIdent) {
        match self.mode {
            PatMode::Declare(kind) => {
                self.declare(&ident.id, kind);
            }
            PatMode::Write => self.reference(&ident.id, ReferenceKind::Write),
            PatMode::Read => log::trace!("binding identifier `{}` outside a pattern", ident.id.sym),
        }
    }

    fn visit_ts_enum_decl(&mut self, decl: &TsEnumDecl) {
        self.declare(&decl.id, BindingKind::Lexical);
        decl.members.visit_with(self);
    }

    fn visit_ts_module_decl(&mut self, decl: &TsModuleDecl) {
        if let TsModuleName::Ident(ident) = &decl.id {
            self.declare(ident, BindingKind::Lexical);
        }
        self.with_scope(ScopeKind::Block, |s| decl.body.visit_with(s));
    }

    fn visit_ts_import_equals_decl(&mut self, decl: &TsImportEqualsDecl) {
        self.declare(&decl.id, BindingKind::Lexical);
        if let TsModuleRef::TsEntityName(name) = &decl.module_ref {
            if let Some(root) = entity_root(name) {
                self.reference(root, ReferenceKind::Read);
            }
        }
    }

    // Scopes

    fn visit_function(&mut self, function: &Function) {
        self.with_scope(ScopeKind::Function, |s| {
            function.decorators.visit_with(s);
            s.visit_params(&function.params);
            if let Some(body) = &function.body {
                body.stmts.visit_with(s);
            }
        });
    }

    fn visit_arrow_expr(&mut self, arrow: &ArrowExpr) {
        self.with_scope(ScopeKind::Function, |s| {
            s.visit_params(&arrow.params);
            match &*arrow.body {
                BlockStmtOrExpr::BlockStmt(block) => block.stmts.visit_with(s),
                BlockStmtOrExpr::Expr(expr) => expr.visit_with(s),
            }
        });
    }

    fn visit_constructor(&mut self, ctor: &Constructor) {
        ctor.key.visit_with(self);
        self.with_scope(ScopeKind::Function, |s| {
            s.visit_params(&ctor.params);
            if let Some(body) = &ctor.body {
                body.stmts.visit_with(s);
            }
        });
    }

    fn visit_getter_prop(&mut self, getter: &GetterProp) {
        getter.key.visit_with(self);
        self.with_scope(ScopeKind::Function, |s| {
            if let Some(body) = &getter.body {
                body.stmts.visit_with(s);
            }
        });
    }

    fn visit_setter_prop(&mut self, setter: &SetterProp) {
        setter.key.visit_with(self);
        self.with_scope(ScopeKind::Function, |s| {
            s.visit_params(&setter.this_param);
            s.visit_params(&setter.param);
            if let Some(body) = &setter.body {
                body.stmts.visit_with(s);
            }
        });
    }

    fn visit_static_block(&mut self, block: &StaticBlock) {
        self.visit_block_in(ScopeKind::StaticBlock, &block.body);
    }

    fn visit_block_stmt(&mut self, block: &BlockStmt) {
        self.visit_block_in(ScopeKind::Block, block);
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause) {
        self.with_scope(ScopeKind::Catch, |s| {
            s.with_mode(PatMode::Declare(BindingKind::Lexical), |s| {
                clause.param.visit_with(s)
            });
            clause.body.stmts.visit_with(s);
        });
    }

    fn visit_for_stmt(&mut self, stmt: &ForStmt) {
        self.with_scope(ScopeKind::Block, |s| stmt.visit_children_with(s));
    }

    fn visit_for_in_stmt(&mut self, stmt: &ForInStmt) {
        self.with_scope(ScopeKind::Block, |s| stmt.visit_children_with(s));
    }

    fn visit_for_of_stmt(&mut self, stmt: &ForOfStmt) {
        self.with_scope(ScopeKind::Block, |s| stmt.visit_children_with(s));
    }

    fn visit_for_head(&mut self, head: &ForHead) {
        match head {
            ForHead::Pat(pat) => self.with_mode(PatMode::Write, |s| pat.visit_with(s)),
            other => other.visit_children_with(self),
        }
    }

    fn visit_switch_stmt(&mut self, stmt: &SwitchStmt) {
        stmt.discriminant.visit_with(self);
        self.with_scope(ScopeKind::Block, |s| stmt.cases.visit_with(s));
    }

    // References

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(ident) => self.reference(ident, ReferenceKind::Read),
            _ => expr.visit_children_with(self),
        }
    }

    fn visit_call_expr(&mut self, call: &CallExpr) {
        if let Callee::Expr(callee) = &call.callee {
            // `(idx)(a, _ => _.b)` is a direct call too
            if let Some(ident) = bare_ident(callee) {
                self.reference(ident, ReferenceKind::Callee);
                call.args.visit_with(self);
                return;
            }
        }
        call.visit_children_with(self);
    }

    fn visit_assign_expr(&mut self, assign: &AssignExpr) {
        match &assign.left {
            AssignTarget::Simple(SimpleAssignTarget::Ident(target)) => {
                self.reference(&target.id, ReferenceKind::Write);
            }
            AssignTarget::Simple(SimpleAssignTarget::Paren(paren)) => match bare_ident(&paren.expr) {
                Some(ident) => self.reference(ident, ReferenceKind::Write),
                None => paren.visit_with(self),
            },
            AssignTarget::Simple(other) => other.visit_with(self),
            AssignTarget::Pat(pat) => self.with_mode(PatMode::Write, |s| pat.visit_with(s)),
        }
        assign.right.visit_with(self);
    }

    fn visit_update_expr(&mut self, update: &UpdateExpr) {
        match bare_ident(&update.arg) {
            Some(ident) => self.reference(ident, ReferenceKind::Write),
            None => update.arg.visit_with(self),
        }
    }

    fn visit_prop(&mut self, prop: &Prop) {
        match prop {
            Prop::Shorthand(ident) => self.reference(ident, ReferenceKind::Read),
            _ => prop.visit_children_with(self),
        }
    }

    fn visit_jsx_element_name(&mut self, name: &JSXElementName) {
        match name {
            // Lowercase names are intrinsic elements, not bindings.
            JSXElementName::Ident(ident) => {
                if !ident.sym.starts_with(|c: char| c.is_ascii_lowercase()) {
                    self.reference(ident, ReferenceKind::Read);
                }
            }
            _ => name.visit_children_with(self),
        }
    }

    fn visit_jsx_object(&mut self, object: &JSXObject) {
        match object {
            JSXObject::Ident(ident) => self.reference(ident, ReferenceKind::Read),
            _ => object.visit_children_with(self),
        }
    }

    fn visit_ts_type_query(&mut self, query: &TsTypeQuery) {
        if let TsTypeQueryExpr::TsEntityName(name) = &query.expr_name {
            if let Some(root) = entity_root(name) {
                self.reference(root, ReferenceKind::Read);
            }
        }
    }
}
