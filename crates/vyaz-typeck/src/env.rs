//! Type environment (scoped symbol table)

use std::collections::HashMap;

use vyaz_ast::AccessModifier;

use crate::types::{FunctionSig, PropertySig, Type, TypeParamInfo};

/// A value binding.
#[derive(Debug, Clone)]
pub struct VarInfo {
    /// Type at this point, possibly narrowed
    pub ty: Type,
    /// Type assignments are checked against
    pub declared: Type,
    pub mutable: bool,
    /// Declared by the hoisting pass, not yet checked
    pub(crate) hoisted: bool,
}

impl VarInfo {
    pub fn new(ty: Type, mutable: bool) -> Self {
        Self {
            declared: ty.clone(),
            ty,
            mutable,
            hoisted: false,
        }
    }
}

/// A named type.
#[derive(Debug, Clone)]
pub enum TypeDef {
    Alias {
        params: Vec<TypeParamInfo>,
        ty: Type,
    },
    Interface(InterfaceInfo),
    Class(ClassInfo),
    /// Generic parameter in scope
    Param { constraint: Option<Type> },
    /// Imported from another module; checked as `любой`
    Opaque,
}

#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    pub params: Vec<TypeParamInfo>,
    pub extends: Vec<Type>,
    pub properties: Vec<PropertySig>,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub params: Vec<TypeParamInfo>,
    /// Instance type of the base class
    pub extends: Option<Type>,
    pub is_abstract: bool,
    /// Own constructor; inherited from the base class when absent
    pub ctor: Option<FunctionSig>,
    pub members: Vec<ClassMemberInfo>,
}

#[derive(Debug, Clone)]
pub struct ClassMemberInfo {
    pub name: String,
    pub ty: Type,
    pub access: AccessModifier,
    pub is_static: bool,
    pub readonly: bool,
    pub optional: bool,
    pub is_abstract: bool,
}

impl ClassInfo {
    pub fn own_member(&self, name: &str, is_static: bool) -> Option<&ClassMemberInfo> {
        self.members
            .iter()
            .find(|m| m.name == name && m.is_static == is_static)
    }

    /// Base class name, when the class extends one.
    pub fn base_name(&self) -> Option<&str> {
        match &self.extends {
            Some(Type::Named { name, .. }) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Scope {
    values: HashMap<String, VarInfo>,
    types: HashMap<String, TypeDef>,
}

/// Type environment with scoped symbol tables
#[derive(Debug, Clone)]
pub struct TypeEnv {
    scopes: Vec<Scope>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Pops scopes until `depth` remain.
    pub fn truncate(&mut self, depth: usize) {
        while self.scopes.len() > depth.max(1) {
            self.scopes.pop();
        }
    }

    pub fn declare(&mut self, name: String, info: VarInfo) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.values.insert(name, info);
        }
    }

    /// Binding in the innermost scope only
    pub fn current_scope_entry(&self, name: &str) -> Option<&VarInfo> {
        self.scopes.last().and_then(|scope| scope.values.get(name))
    }

    pub fn lookup(&self, name: &str) -> Option<&VarInfo> {
        self.scopes.iter().rev().find_map(|scope| scope.values.get(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut VarInfo> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.values.get_mut(name))
    }

    pub fn define_type(&mut self, name: String, def: TypeDef) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.types.insert(name, def);
        }
    }

    pub fn has_type_in_current_scope(&self, name: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|scope| scope.types.contains_key(name))
    }

    pub fn lookup_type(&self, name: &str) -> Option<&TypeDef> {
        self.scopes.iter().rev().find_map(|scope| scope.types.get(name))
    }

    pub fn lookup_class(&self, name: &str) -> Option<&ClassInfo> {
        match self.lookup_type(name) {
            Some(TypeDef::Class(info)) => Some(info),
            _ => None,
        }
    }

    /// Replaces a class definition wherever it is visible.
    pub fn update_class(&mut self, info: ClassInfo) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(def) = scope.types.get_mut(&info.name) {
                *def = TypeDef::Class(info);
                return;
            }
        }
    }

    /// True when `class` is `ancestor` or inherits from it.
    pub fn is_subclass_of(&self, class: &str, ancestor: &str) -> bool {
        let mut current = Some(class.to_string());
        let mut steps = 0;
        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            steps += 1;
            if steps > 64 {
                return false;
            }
            current = self
                .lookup_class(&name)
                .and_then(|info| info.base_name())
                .map(str::to_string);
        }
        false
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadowing_resolves_innermost() {
        let mut env = TypeEnv::new();
        env.declare("x".to_string(), VarInfo::new(Type::Number, true));
        env.push_scope();
        env.declare("x".to_string(), VarInfo::new(Type::String, false));
        assert_eq!(env.lookup("x").map(|v| v.ty.clone()), Some(Type::String));
        env.pop_scope();
        assert_eq!(env.lookup("x").map(|v| v.ty.clone()), Some(Type::Number));
    }

    #[test]
    fn test_module_scope_is_never_popped() {
        let mut env = TypeEnv::new();
        env.pop_scope();
        env.declare("y".to_string(), VarInfo::new(Type::Boolean, true));
        assert_eq!(env.depth(), 1);
        assert!(env.current_scope_entry("y").is_some());
    }
}
