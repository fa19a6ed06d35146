//! Plugin registry: qualified name to typed constructor.
//!
//! A [`PluginRegistry`] is an ordinary value. The host builds one at start-up
//! from plugin bundles and passes it to [`bind`](crate::bind::bind); tests
//! build isolated registries of their own. Registration is additive only and
//! a name can be taken exactly once, whatever its capability kind.

use std::collections::BTreeMap;
use std::fmt;

use adp_sdk::params::Params;
use adp_sdk::{Sink, Source, Transform};
use adp_types::{CapabilityKind, PluginError, PluginName};
use serde_json::Value;

/// Builds a source from its stage parameters.
pub type SourceFactory = Box<dyn Fn(&Params) -> Result<Box<dyn Source>, PluginError> + Send + Sync>;
/// Builds a transform from its stage parameters.
pub type TransformFactory =
    Box<dyn Fn(&Params) -> Result<Box<dyn Transform>, PluginError> + Send + Sync>;
/// Builds a sink from its stage parameters.
pub type SinkFactory = Box<dyn Fn(&Params) -> Result<Box<dyn Sink>, PluginError> + Send + Sync>;

/// Entry-point function exported by a plugin package.
pub type PluginBundle = fn(&mut PluginRegistry) -> Result<(), RegistryError>;

/// Registry failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("plugin '{name}' is already registered as a {existing}")]
    DuplicateName {
        name: PluginName,
        existing: CapabilityKind,
    },

    #[error("unknown plugin '{0}'")]
    UnknownPlugin(PluginName),

    #[error("plugin '{name}' is a {actual}, expected a {expected}")]
    KindMismatch {
        name: PluginName,
        expected: CapabilityKind,
        actual: CapabilityKind,
    },

    #[error("invalid plugin name '{0}': must be non-empty with no whitespace")]
    InvalidName(String),

    #[error("invalid parameter schema for '{name}': {message}")]
    InvalidSchema { name: PluginName, message: String },
}

/// Tagged constructor: the capability kind is the variant.
pub enum Constructor {
    Source(SourceFactory),
    Transform(TransformFactory),
    Sink(SinkFactory),
}

impl Constructor {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::Source(_) => CapabilityKind::Source,
            Self::Transform(_) => CapabilityKind::Transform,
            Self::Sink(_) => CapabilityKind::Sink,
        }
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constructor::{:?}", self.kind())
    }
}

/// A named plugin implementation.
#[derive(Debug)]
pub struct Registration {
    name: PluginName,
    constructor: Constructor,
    schema: Option<Value>,
    description: String,
}

impl Registration {
    fn new(name: impl Into<PluginName>, constructor: Constructor) -> Self {
        Self {
            name: name.into(),
            constructor,
            schema: None,
            description: String::new(),
        }
    }

    pub fn source<F>(name: impl Into<PluginName>, factory: F) -> Self
    where
        F: Fn(&Params) -> Result<Box<dyn Source>, PluginError> + Send + Sync + 'static,
    {
        Self::new(name, Constructor::Source(Box::new(factory)))
    }

    pub fn transform<F>(name: impl Into<PluginName>, factory: F) -> Self
    where
        F: Fn(&Params) -> Result<Box<dyn Transform>, PluginError> + Send + Sync + 'static,
    {
        Self::new(name, Constructor::Transform(Box::new(factory)))
    }

    pub fn sink<F>(name: impl Into<PluginName>, factory: F) -> Self
    where
        F: Fn(&Params) -> Result<Box<dyn Sink>, PluginError> + Send + Sync + 'static,
    {
        Self::new(name, Constructor::Sink(Box::new(factory)))
    }

    /// JSON Schema the stage parameters are validated against at bind time.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> &PluginName {
        &self.name
    }

    pub fn kind(&self) -> CapabilityKind {
        self.constructor.kind()
    }

    pub fn constructor(&self) -> &Constructor {
        &self.constructor
    }

    pub fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Name-to-constructor mapping consulted by the binder.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<PluginName, Registration>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry by installing each bundle in order.
    ///
    /// # Errors
    ///
    /// Returns the first registration error any bundle reports.
    pub fn with_bundles(bundles: &[PluginBundle]) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for bundle in bundles {
            registry.install(*bundle)?;
        }
        Ok(registry)
    }

    /// Run a bundle's entry point against this registry.
    ///
    /// # Errors
    ///
    /// Propagates the bundle's registration error.
    pub fn install(&mut self, bundle: PluginBundle) -> Result<(), RegistryError> {
        let before = self.plugins.len();
        bundle(self)?;
        tracing::debug!(added = self.plugins.len() - before, "Plugin bundle installed");
        Ok(())
    }

    /// Add a registration.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidName`] for an empty name or one containing
    ///   whitespace.
    /// - [`RegistryError::DuplicateName`] if the name is already taken,
    ///   under any capability kind.
    /// - [`RegistryError::InvalidSchema`] if the parameter schema does not
    ///   compile.
    pub fn register(&mut self, registration: Registration) -> Result<(), RegistryError> {
        let name = registration.name.as_str();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        if let Some(existing) = self.plugins.get(&registration.name) {
            return Err(RegistryError::DuplicateName {
                name: registration.name.clone(),
                existing: existing.kind(),
            });
        }
        if let Some(schema) = &registration.schema {
            jsonschema::validator_for(schema).map_err(|e| RegistryError::InvalidSchema {
                name: registration.name.clone(),
                message: e.to_string(),
            })?;
        }
        tracing::trace!(
            plugin = registration.name.as_str(),
            kind = registration.kind().as_str(),
            "Plugin registered"
        );
        self.plugins.insert(registration.name.clone(), registration);
        Ok(())
    }

    /// Look a name up, requiring it to implement `kind`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownPlugin`] if nothing is registered under the
    /// name, [`RegistryError::KindMismatch`] if it is registered as another
    /// capability kind.
    pub fn resolve(
        &self,
        name: &PluginName,
        kind: CapabilityKind,
    ) -> Result<&Registration, RegistryError> {
        let registration = self
            .plugins
            .get(name)
            .ok_or_else(|| RegistryError::UnknownPlugin(name.clone()))?;
        if registration.kind() != kind {
            return Err(RegistryError::KindMismatch {
                name: name.clone(),
                expected: kind,
                actual: registration.kind(),
            });
        }
        Ok(registration)
    }

    pub fn get(&self, name: &PluginName) -> Option<&Registration> {
        self.plugins.get(name)
    }

    pub fn contains(&self, name: &PluginName) -> bool {
        self.plugins.contains_key(name)
    }

    /// All registrations, sorted by name.
    pub fn list(&self) -> impl Iterator<Item = &Registration> + '_ {
        self.plugins.values()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
