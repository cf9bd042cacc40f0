//! Symbol contexts and per-query symbol overlays.

use hashbrown::HashMap;

use std::{
    collections::BTreeMap,
    iter,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    error::RegistrationError,
    fns::{Function, FunctionRef, Overloads, Prelude},
    registry::{ExpressionRef, ExpressionToken, Operator, OperatorRef, TokenRegistry, TokenSet},
    tokens::{builtin_registry, is_valid_symbol_name},
    Value,
};

/// Name of the variable holding the result of the last successful non-assignment query.
pub const LAST_RESULT: &str = "$";

#[derive(Debug, Default)]
struct Scope {
    variables: HashMap<String, Value>,
    constants: HashMap<String, Value>,
    functions: HashMap<String, Overloads>,
    tokens: TokenRegistry,
}

/// Symbol context: variables, constants, functions and custom tokens, optionally
/// with a parent context.
///
/// Name resolution walks the context chain from this context to the root; within each
/// context, variables take precedence over constants. Mutations only ever affect
/// the context they are called on.
///
/// A context can be shared among threads; all methods take `&self` and synchronize
/// access internally. Locks are held only for the duration of individual lookups
/// or registrations, never during evaluation of user-defined functions.
///
/// # Examples
///
/// ```
/// use mathexpr::{Context, Symbols, Value};
///
/// # fn main() -> anyhow::Result<()> {
/// let root = Context::with_prelude();
/// root.bind_variable("x", Value::real(2.0));
/// let child = root.child();
/// child.bind_variable("y", Value::real(3.0));
///
/// let value = mathexpr::evaluate(&child, "x * y + cos(0)", &Symbols::new())?;
/// assert_eq!(value, Value::real(7.0));
/// // The parent context is not affected by child mutations.
/// assert!(root.lookup("y", &Symbols::new()).is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Context<'p> {
    parent: Option<&'p Context<'p>>,
    scope: RwLock<Scope>,
}

impl Context<'static> {
    /// Creates an empty root context. Built-in operators and expression descriptors
    /// are still available.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a root context with the [`Prelude`] loaded.
    pub fn with_prelude() -> Self {
        let context = Self::new();
        let loaded = context.load(&Prelude);
        debug_assert!(loaded.is_ok(), "{loaded:?}");
        context
    }
}

impl<'p> Context<'p> {
    /// Creates a child context. The child sees all definitions in this context,
    /// but its own definitions are not visible here.
    pub fn child(&self) -> Context<'_> {
        Context {
            parent: Some(self),
            scope: RwLock::default(),
        }
    }

    /// Returns the parent context, if any.
    pub fn parent(&self) -> Option<&'p Context<'p>> {
        self.parent
    }

    fn read(&self) -> RwLockReadGuard<'_, Scope> {
        self.scope.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Scope> {
        self.scope.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn chain(&self) -> impl Iterator<Item = &Context<'p>> + '_ {
        iter::successors(Some(self), |context| context.parent)
    }

    /// Resolves `name` using `symbols` as the overlay, returning the missing sentinel
    /// if the name is not defined anywhere.
    pub fn resolve(&self, name: &str, symbols: &Symbols) -> Value {
        self.lookup(name, symbols).unwrap_or_default()
    }

    /// Looks up `name`: first in `symbols`, then through the context chain.
    pub fn lookup(&self, name: &str, symbols: &Symbols) -> Option<Value> {
        if let Some(value) = symbols.get(name) {
            return Some(value.clone());
        }
        self.chain().find_map(|context| {
            let scope = context.read();
            scope
                .variables
                .get(name)
                .or_else(|| scope.constants.get(name))
                .cloned()
        })
    }

    /// Binds a variable in this context, returning the previous value of the variable.
    pub fn bind_variable(&self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.write().variables.insert(name.into(), value)
    }

    /// Declares a constant in this context, returning the previous value of the constant.
    /// Unlike [`Self::register_constant()`], the name is not validated.
    pub fn declare_constant(&self, name: impl Into<String>, value: Value) -> Option<Value> {
        let name = name.into();
        tracing::debug!(name = %name, %value, "declared constant");
        self.write().constants.insert(name, value)
    }

    /// Declares a constant after checking that its name can be referenced from expressions.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidName`] if the name is not a valid symbol name.
    pub fn register_constant(
        &self,
        name: impl Into<String>,
        value: Value,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        if !is_valid_symbol_name(&name) {
            return Err(RegistrationError::InvalidName { name });
        }
        self.declare_constant(name, value);
        Ok(())
    }

    /// Removes a variable from this context.
    pub fn remove_variable(&self, name: &str) -> Option<Value> {
        self.write().variables.remove(name)
    }

    /// Removes a constant from this context.
    pub fn remove_constant(&self, name: &str) -> Option<Value> {
        self.write().constants.remove(name)
    }

    /// Removes all variables from this context.
    pub fn clear_variables(&self) {
        self.write().variables.clear();
    }

    /// Returns variables defined in this context (not including parent contexts),
    /// ordered by name.
    pub fn variables(&self) -> Vec<(String, Value)> {
        Self::sorted(&self.read().variables)
    }

    /// Returns constants defined in this context, ordered by name.
    pub fn constants(&self) -> Vec<(String, Value)> {
        Self::sorted(&self.read().constants)
    }

    fn sorted(values: &HashMap<String, Value>) -> Vec<(String, Value)> {
        let mut values: Vec<_> = values
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        values.sort_unstable_by(|(x, _), (y, _)| x.cmp(y));
        values
    }

    /// Returns the result of the last successful non-assignment query evaluated
    /// in this context.
    pub fn last_result(&self) -> Option<Value> {
        self.read().variables.get(LAST_RESULT).cloned()
    }

    /// Registers a function, replacing all overloads with the same name in this context.
    pub fn register_function(
        &self,
        name: impl Into<String>,
        function: impl Function + 'static,
    ) -> &Self {
        self.register_function_ref(name, Arc::new(function))
    }

    pub(crate) fn register_function_ref(
        &self,
        name: impl Into<String>,
        function: FunctionRef,
    ) -> &Self {
        let name = name.into();
        tracing::debug!(name = %name, signature = %function.signature(), "registered function");
        self.write()
            .functions
            .insert(name, Overloads::single(function));
        self
    }

    /// Adds an overload for the function `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::ConflictingSignature`] if an overload with the same
    /// signature is already registered in this context.
    pub fn register_overload(
        &self,
        name: impl Into<String>,
        function: impl Function + 'static,
    ) -> Result<&Self, RegistrationError> {
        self.register_overload_ref(name, Arc::new(function))
    }

    pub(crate) fn register_overload_ref(
        &self,
        name: impl Into<String>,
        function: FunctionRef,
    ) -> Result<&Self, RegistrationError> {
        let name = name.into();
        let signature = function.signature();
        let mut scope = self.write();
        if let Some(overloads) = scope.functions.get_mut(&name) {
            overloads
                .push(function)
                .map_err(|signature| RegistrationError::ConflictingSignature {
                    name: name.clone(),
                    signature,
                })?;
        } else {
            scope.functions.insert(name.clone(), Overloads::single(function));
        }
        drop(scope);

        tracing::debug!(name = %name, %signature, "registered overload");
        Ok(self)
    }

    /// Removes a function with all its overloads from this context.
    pub fn remove_function(&self, name: &str) -> bool {
        self.write().functions.remove(name).is_some()
    }

    /// Finds overloads for the function `name` in the nearest context defining it.
    pub fn find_function(&self, name: &str) -> Option<Overloads> {
        self.chain()
            .find_map(|context| context.read().functions.get(name).cloned())
    }

    /// Returns names of functions visible from this context, ordered and deduplicated.
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .chain()
            .flat_map(|context| context.read().functions.keys().cloned().collect::<Vec<_>>())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Registers an operator in this context. An operator with the same symbol and fixity
    /// previously registered in this context is replaced. Operators in this context take
    /// precedence over operators in parent contexts and built-in operators.
    pub fn register_operator(&self, op: impl Operator + 'static) -> &Self {
        self.register_operator_ref(Arc::new(op))
    }

    pub(crate) fn register_operator_ref(&self, op: OperatorRef) -> &Self {
        tracing::debug!(
            symbol = op.symbol(),
            level = op.level(),
            fixity = ?op.fixity(),
            "registered operator"
        );
        self.write().tokens.register_operator(op);
        self
    }

    /// Removes an operator with the specified symbol from this context.
    pub fn remove_operator(&self, symbol: &str) -> bool {
        self.write().tokens.remove_operator(symbol)
    }

    /// Registers an expression descriptor in this context. Descriptors in this context
    /// are tried before descriptors in parent contexts and built-in descriptors.
    pub fn register_expression(&self, token: impl ExpressionToken + 'static) -> &Self {
        self.register_expression_ref(Arc::new(token))
    }

    pub(crate) fn register_expression_ref(&self, token: ExpressionRef) -> &Self {
        tracing::debug!(name = token.name(), "registered expression descriptor");
        self.write().tokens.register_expression(token);
        self
    }

    /// Removes an expression descriptor with the specified name from this context.
    pub fn remove_expression(&self, name: &str) -> bool {
        self.write().tokens.remove_expression(name)
    }

    /// Returns the descriptors visible from this context in the lookup order.
    pub fn token_set(&self) -> TokenSet {
        let scopes: Vec<_> = self.chain().map(Self::read).collect();
        let registries = scopes.iter().map(|scope| &scope.tokens);
        TokenSet::from_registries(registries.chain([builtin_registry()]))
    }

    /// Takes a snapshot of variables and constants defined in this context. Opaque values
    /// are skipped.
    pub fn snapshot(&self) -> Snapshot {
        let scope = self.read();
        let persistent = |values: &HashMap<String, Value>| {
            values
                .iter()
                .filter(|(_, value)| value.is_numeric())
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()
        };
        Snapshot {
            variables: persistent(&scope.variables),
            constants: persistent(&scope.constants),
        }
    }

    /// Restores variables and constants from a snapshot. Existing definitions with
    /// the same names are overwritten; other definitions are retained.
    pub fn restore(&self, snapshot: Snapshot) {
        let mut scope = self.write();
        scope.variables.extend(snapshot.variables);
        scope.constants.extend(snapshot.constants);
    }
}

/// Persistent state of a [`Context`]: its variables and constants.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Variables ordered by name.
    pub variables: BTreeMap<String, Value>,
    /// Constants ordered by name.
    pub constants: BTreeMap<String, Value>,
}

/// Per-query symbol overlay. Symbols in the overlay take precedence over all context
/// definitions, and are never written to by evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Symbols {
    values: HashMap<String, Value>,
}

impl Symbols {
    /// Creates an empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a symbol to this overlay, returning its previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    /// Adds a symbol to this overlay.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Gets a symbol value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns the number of symbols in this overlay.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Checks whether this overlay is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over symbols in this overlay in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<S: Into<String>, V: Into<Value>> FromIterator<(S, V)> for Symbols {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let values = iter
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        Self { values }
    }
}
