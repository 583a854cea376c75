//! Definition descriptors for introspection and diagnostics.

use crate::argument::ArgumentKind;
use crate::definition::{Definition, ServiceOptions};
use crate::reference::{Reference, Tag};

/// Snapshot of one registered definition.
///
/// # Examples
///
/// ```rust
/// use ref_di::{Argument, Container, Provider, ServiceDef};
///
/// let container = Container::new();
/// container.register([
///     ServiceDef::new("port").provider(Provider::new(|| 8080u16)),
///     ServiceDef::new("server")
///         .provider(Provider::new(|port: u16| format!("0.0.0.0:{port}")))
///         .arg(Argument::service("port"))
///         .tag("http")
///         .build_on_first_request(),
/// ]);
/// container.set("version", ref_di::Value::new("1.0"));
///
/// container.build().unwrap();
/// let infos = container.definitions();
///
/// assert_eq!(infos.len(), 3);
/// assert!(infos[0].built);
/// assert!(!infos[1].built);
/// assert!(infos[1].has_tag("http"));
/// assert!(infos[2].preset);
/// ```
#[derive(Debug, Clone)]
pub struct DefinitionInfo {
    pub reference: Reference,
    pub tags: Vec<Tag>,
    pub options: ServiceOptions,
    /// Kinds of the declared provider arguments, in order
    pub arguments: Vec<ArgumentKind>,
    /// Names of the declared methods, sorted
    pub methods: Vec<String>,
    /// Registered through `Container::set` rather than with a provider
    pub preset: bool,
    /// An instance is currently cached
    pub built: bool,
    /// Type of the cached instance, if any
    pub instance_type: Option<&'static str>,
}

impl DefinitionInfo {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_lazy(&self) -> bool {
        !self.options.is_eager()
    }
}

impl From<&Definition> for DefinitionInfo {
    fn from(definition: &Definition) -> Self {
        let spec = definition.spec();
        let instance = definition.instance();
        let mut methods: Vec<String> = spec.methods.keys().cloned().collect();
        methods.sort();

        DefinitionInfo {
            reference: definition.reference().clone(),
            tags: definition.tags().to_vec(),
            options: definition.options(),
            arguments: spec.args.iter().map(|a| a.kind()).collect(),
            methods,
            preset: !definition.has_provider(),
            built: instance.is_some(),
            instance_type: instance.map(|v| v.type_name()),
        }
    }
}
