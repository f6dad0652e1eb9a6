use crate::model::callable::{Factory, IntoFactory};

/// Descriptor of a reflected constructor.
///
/// Constructors carry argument types only; the descriptor never records argument names.
#[derive(Debug, Clone)]
pub struct ConstructorDescriptor {
    name: String,
    factory: Factory,
    param_types: Vec<String>,
}

impl ConstructorDescriptor {
    /// Describe a constructor named `name` (conventionally the class name) backed by `f`.
    pub fn new<M>(name: impl Into<String>, f: impl IntoFactory<M>) -> Self {
        ConstructorDescriptor {
            name: name.into(),
            factory: f.into_factory(),
            param_types: Vec::new(),
        }
    }

    /// Spell the leading argument types.
    #[must_use]
    pub fn param_types(mut self, types: &[&str]) -> Self {
        self.param_types = types.iter().map(ToString::to_string).collect();
        self
    }

    /// Constructor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.factory.arg_types().len()
    }

    /// Spelled type of argument `index`, if one was given.
    #[must_use]
    pub fn param_type(&self, index: usize) -> Option<&str> {
        self.param_types.get(index).map(String::as_str)
    }

    /// Callable creating the instance.
    #[must_use]
    pub fn factory(&self) -> &Factory {
        &self.factory
    }
}
