//! Loading bundles of functions, operators, expression descriptors and constants
//! into a [`Context`].

use std::sync::Arc;

use crate::{
    error::RegistrationError,
    fns::{Function, FunctionRef},
    registry::{ExpressionRef, ExpressionToken, Operator, OperatorRef},
    tokens::is_valid_symbol_name,
    Context, Value,
};

/// Single item provided by a [`Plugin`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Extension {
    /// Function replacing all existing overloads with the same name.
    Function {
        /// Function name.
        name: String,
        /// Function implementation.
        function: FunctionRef,
    },
    /// Additional overload for a function name.
    Overload {
        /// Function name.
        name: String,
        /// Function implementation.
        function: FunctionRef,
    },
    /// Operator descriptor.
    Operator(OperatorRef),
    /// Expression descriptor.
    Expression(ExpressionRef),
    /// Named constant.
    Constant {
        /// Constant name.
        name: String,
        /// Constant value.
        value: Value,
    },
}

impl Extension {
    /// Creates a function extension.
    pub fn function(name: impl Into<String>, function: impl Function + 'static) -> Self {
        Self::Function {
            name: name.into(),
            function: Arc::new(function),
        }
    }

    /// Creates an overload extension.
    pub fn overload(name: impl Into<String>, function: impl Function + 'static) -> Self {
        Self::Overload {
            name: name.into(),
            function: Arc::new(function),
        }
    }

    /// Creates an operator extension.
    pub fn operator(op: impl Operator + 'static) -> Self {
        Self::Operator(Arc::new(op))
    }

    /// Creates an expression descriptor extension.
    pub fn expression(token: impl ExpressionToken + 'static) -> Self {
        Self::Expression(Arc::new(token))
    }

    /// Creates a constant extension.
    pub fn constant(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Constant {
            name: name.into(),
            value: value.into(),
        }
    }

    fn check_name(&self) -> Result<(), RegistrationError> {
        let name = match self {
            Self::Function { name, .. } | Self::Overload { name, .. } | Self::Constant { name, .. } => {
                name
            }
            Self::Operator(_) | Self::Expression(_) => return Ok(()),
        };
        if is_valid_symbol_name(name) {
            Ok(())
        } else {
            Err(RegistrationError::InvalidName { name: name.clone() })
        }
    }
}

/// Bundle of [`Extension`]s that can be [loaded](Context::load()) into a context at once.
pub trait Plugin {
    /// Returns a human-readable name of the plugin used in logs.
    fn name(&self) -> &str;

    /// Returns extensions provided by this plugin in the registration order.
    fn extensions(&self) -> Vec<Extension>;
}

/// Plugin assembled from extensions at runtime.
///
/// # Examples
///
/// ```
/// use mathexpr::{fns, Context, Extension, ExtensionSet, Symbols, Value};
///
/// # fn main() -> anyhow::Result<()> {
/// let units = ExtensionSet::new("units")
///     .with(Extension::constant("km", 1_000.0))
///     .with(Extension::function("cm", fns::wrap(|x: f64| x / 100.0)));
/// let context = Context::new();
/// assert_eq!(context.load(&units)?, 2);
///
/// let value = mathexpr::evaluate(&context, "2 * km + cm(50)", &Symbols::new())?;
/// assert_eq!(value, Value::real(2_000.5));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ExtensionSet {
    name: String,
    extensions: Vec<Extension>,
}

impl ExtensionSet {
    /// Creates an empty set with the specified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensions: vec![],
        }
    }

    /// Adds an extension to this set.
    #[must_use]
    pub fn with(mut self, extension: Extension) -> Self {
        self.extensions.push(extension);
        self
    }
}

impl Extend<Extension> for ExtensionSet {
    fn extend<I: IntoIterator<Item = Extension>>(&mut self, iter: I) {
        self.extensions.extend(iter);
    }
}

impl Plugin for ExtensionSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn extensions(&self) -> Vec<Extension> {
        self.extensions.clone()
    }
}

impl Context<'_> {
    /// Loads all extensions from the `plugin` into this context, returning the number
    /// of loaded extensions.
    ///
    /// Names are validated before anything is registered, so an invalid name leaves
    /// the context intact.
    ///
    /// # Errors
    ///
    /// - Returns [`RegistrationError::InvalidName`] if a function or constant has a name
    ///   that cannot be referenced from expressions.
    /// - Returns [`RegistrationError::ConflictingSignature`] if an overload conflicts with
    ///   an existing one. Extensions preceding the conflicting overload remain registered.
    pub fn load(&self, plugin: &dyn Plugin) -> Result<usize, RegistrationError> {
        let extensions = plugin.extensions();
        for extension in &extensions {
            extension.check_name()?;
        }

        let count = extensions.len();
        for extension in extensions {
            match extension {
                Extension::Function { name, function } => {
                    self.register_function_ref(name, function);
                }
                Extension::Overload { name, function } => {
                    self.register_overload_ref(name, function)?;
                }
                Extension::Operator(op) => {
                    self.register_operator_ref(op);
                }
                Extension::Expression(token) => {
                    self.register_expression_ref(token);
                }
                Extension::Constant { name, value } => {
                    self.declare_constant(name, value);
                }
            }
        }
        tracing::debug!(plugin = plugin.name(), count, "loaded plugin");
        Ok(count)
    }
}
