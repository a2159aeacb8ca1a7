//! Block scopes
//!
//! Blocks of one function body live in an arena. Parents are indices, so the
//! tree can be walked upward for lookups and for goto/label validation.

use crate::sema::value::Const;
use crate::types::Type;
use crate::utils::Span;

// ==================== Identifiers ====================

/// Index of a block in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

/// Index of a variable in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub usize);

// ==================== Entries ====================

/// Block-local variable (parameters live in the root block)
#[derive(Debug, Clone)]
pub struct Var {
    pub name: String,
    pub ty: Type,
    pub mutable: bool,
    pub constant: Option<Const>,
    pub used: bool,
    /// Parameters and receivers are never reported as unused
    pub is_param: bool,
    pub span: Span,
}

/// Block-local type alias
#[derive(Debug, Clone)]
pub struct LocalAlias {
    pub name: String,
    pub ty: Type,
    pub used: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub parent: Option<BlockId>,
    /// Statement index of this block inside its parent
    pub index_in_parent: usize,
    pub is_unsafe: bool,
    pub vars: Vec<VarId>,
    pub aliases: Vec<LocalAlias>,
    /// Indices of statements that declare variables
    pub decls: Vec<usize>,
}

// ==================== Arena ====================

/// Block tree of one function body
#[derive(Debug, Default)]
pub struct ScopeArena {
    blocks: Vec<Block>,
    vars: Vec<Var>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_block(&mut self, parent: Option<BlockId>, index_in_parent: usize, is_unsafe: bool) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(Block {
            parent,
            index_in_parent,
            is_unsafe,
            vars: Vec::new(),
            aliases: Vec::new(),
            decls: Vec::new(),
        });
        id
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id.0]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut Var {
        &mut self.vars[id.0]
    }

    /// Declares a variable; `Err` carries the existing variable of the same block
    pub fn declare(&mut self, block: BlockId, var: Var) -> Result<VarId, VarId> {
        if let Some(existing) = self.find_local(block, &var.name) {
            return Err(existing);
        }
        let id = VarId(self.vars.len());
        self.vars.push(var);
        self.blocks[block.0].vars.push(id);
        Ok(id)
    }

    pub fn find_local(&self, block: BlockId, name: &str) -> Option<VarId> {
        self.blocks[block.0]
            .vars
            .iter()
            .rev()
            .copied()
            .find(|v| self.vars[v.0].name == name)
    }

    /// Innermost visible variable
    pub fn lookup(&self, from: BlockId, name: &str) -> Option<VarId> {
        self.ancestors(from).find_map(|b| self.find_local(b, name))
    }

    /// Innermost visible block alias; marks it used
    pub fn lookup_alias(&mut self, from: BlockId, name: &str) -> Option<Type> {
        let blocks: Vec<BlockId> = self.ancestors(from).collect();
        for b in blocks {
            if let Some(alias) = self.blocks[b.0].aliases.iter_mut().rev().find(|a| a.name == name) {
                alias.used = true;
                return Some(alias.ty.clone());
            }
        }
        None
    }

    /// `from` followed by its parents up to the root
    pub fn ancestors(&self, from: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        std::iter::successors(Some(from), move |b| self.blocks[b.0].parent)
    }

    pub fn is_ancestor(&self, ancestor: BlockId, of: BlockId) -> bool {
        self.ancestors(of).any(|b| b == ancestor)
    }

    pub fn in_unsafe(&self, from: BlockId) -> bool {
        self.ancestors(from).any(|b| self.blocks[b.0].is_unsafe)
    }

    /// Unused variables and aliases declared directly in `block`
    pub fn unused(&self, block: BlockId) -> Vec<(String, Span)> {
        let b = &self.blocks[block.0];
        let vars = b
            .vars
            .iter()
            .map(|v| &self.vars[v.0])
            .filter(|v| !v.used && !v.is_param && v.name != "_")
            .map(|v| (v.name.clone(), v.span));
        let aliases = b
            .aliases
            .iter()
            .filter(|a| !a.used)
            .map(|a| (a.name.clone(), a.span));
        vars.chain(aliases).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeId;
    use pretty_assertions::assert_eq;

    fn var(name: &str) -> Var {
        Var {
            name: name.to_string(),
            ty: Type::primitive(TypeId::Int),
            mutable: false,
            constant: None,
            used: false,
            is_param: false,
            span: Span::dummy(),
        }
    }

    #[test]
    fn test_shadowing_and_redeclaration() {
        let mut arena = ScopeArena::new();
        let root = arena.push_block(None, 0, false);
        let inner = arena.push_block(Some(root), 3, false);
        let outer_x = arena.declare(root, var("x")).unwrap();
        assert!(arena.declare(root, var("x")).is_err());
        let inner_x = arena.declare(inner, var("x")).unwrap();
        assert_eq!(arena.lookup(inner, "x"), Some(inner_x));
        assert_eq!(arena.lookup(root, "x"), Some(outer_x));
        assert_eq!(arena.lookup(inner, "y"), None);
    }

    #[test]
    fn test_ancestry_and_unsafe() {
        let mut arena = ScopeArena::new();
        let root = arena.push_block(None, 0, false);
        let unsafe_block = arena.push_block(Some(root), 1, true);
        let nested = arena.push_block(Some(unsafe_block), 0, false);
        assert!(arena.is_ancestor(root, nested));
        assert!(!arena.is_ancestor(nested, root));
        assert!(arena.in_unsafe(nested));
        assert!(!arena.in_unsafe(root));
    }

    #[test]
    fn test_unused_reporting() {
        let mut arena = ScopeArena::new();
        let root = arena.push_block(None, 0, false);
        let used = arena.declare(root, var("a")).unwrap();
        arena.declare(root, var("b")).unwrap();
        arena.var_mut(used).used = true;
        let names: Vec<String> = arena.unused(root).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b".to_string()]);
    }
}
