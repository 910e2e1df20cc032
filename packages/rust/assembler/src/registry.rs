//! Component registry: type references to constructors and property setters.
//!
//! Each command type registers a constructor plus an explicit table of
//! `{property name: setter}` entries. The assembler looks these up by the
//! strings in a definition; nothing is bound by reflection.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use tracing::trace;

use chainworks_core::{
    CatalogFactory, Chain, Command, CopyCommand, LookupCommand, RemoveCommand,
};
use chainworks_shared::{ChainError, Result};

use crate::directive::Properties;

/// Type reference of the plain [`Chain`].
pub const CHAIN_TYPE: &str = "chain";

/// What constructors may use while a definition is being built.
pub struct BuildContext<'a> {
    /// The factory the assembled catalogs will be committed to.
    pub factory: &'a Arc<CatalogFactory>,
}

type Setter<T> = Box<dyn Fn(&mut T, &str) -> Result<()> + Send + Sync>;

/// Parse a property value, mapping failures to a configuration error.
pub fn parse_value<T>(value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ChainError::configuration(format!("invalid value '{value}': {e}")))
}

fn apply_properties<T>(
    type_name: &str,
    target: &mut T,
    setters: &BTreeMap<String, Setter<T>>,
    properties: &Properties,
) -> Result<()> {
    for (name, value) in properties {
        let setter = setters.get(name).ok_or_else(|| {
            ChainError::configuration(format!("type '{type_name}' has no property '{name}'"))
        })?;
        setter(target, value).map_err(|e| {
            let reason = match e {
                ChainError::Configuration { message } => message,
                other => other.to_string(),
            };
            ChainError::configuration(format!(
                "cannot set property '{name}' of type '{type_name}': {reason}"
            ))
        })?;
        trace!(type_name, property = %name, "property set");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

/// Registration of a plain command type.
pub struct CommandType<T> {
    name: String,
    ctor: Box<dyn Fn(&BuildContext<'_>) -> T + Send + Sync>,
    setters: BTreeMap<String, Setter<T>>,
}

impl<T: Command> CommandType<T> {
    pub fn new(
        name: impl Into<String>,
        ctor: impl Fn(&BuildContext<'_>) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            ctor: Box::new(ctor),
            setters: BTreeMap::new(),
        }
    }

    /// Declare a settable property.
    pub fn property(
        mut self,
        name: impl Into<String>,
        setter: impl Fn(&mut T, &str) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.setters.insert(name.into(), Box::new(setter));
        self
    }
}

/// Registration of a chain type. `wrap` receives the assembled [`Chain`];
/// properties are applied to the wrapped value afterwards.
pub struct ChainType<T> {
    name: String,
    wrapper: Box<dyn Fn(Chain) -> T + Send + Sync>,
    setters: BTreeMap<String, Setter<T>>,
}

impl<T: Command> ChainType<T> {
    pub fn new(name: impl Into<String>, wrap: impl Fn(Chain) -> T + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            wrapper: Box::new(wrap),
            setters: BTreeMap::new(),
        }
    }

    pub fn property(
        mut self,
        name: impl Into<String>,
        setter: impl Fn(&mut T, &str) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.setters.insert(name.into(), Box::new(setter));
        self
    }
}

/// Type-erased builder stored in the registry.
trait Component: Send + Sync {
    fn build(&self, ctx: &BuildContext<'_>, properties: &Properties) -> Result<Arc<dyn Command>>;

    /// Build from an assembled chain. `None` for non-chain types.
    fn build_chain(&self, chain: Chain, properties: &Properties) -> Option<Result<Arc<dyn Command>>>;
}

impl<T: Command> Component for CommandType<T> {
    fn build(&self, ctx: &BuildContext<'_>, properties: &Properties) -> Result<Arc<dyn Command>> {
        let mut command = (self.ctor)(ctx);
        apply_properties(&self.name, &mut command, &self.setters, properties)?;
        Ok(Arc::new(command))
    }

    fn build_chain(&self, _chain: Chain, _properties: &Properties) -> Option<Result<Arc<dyn Command>>> {
        None
    }
}

impl<T: Command> ChainType<T> {
    fn wrap(&self, chain: Chain, properties: &Properties) -> Result<Arc<dyn Command>> {
        let mut command = (self.wrapper)(chain);
        apply_properties(&self.name, &mut command, &self.setters, properties)?;
        Ok(Arc::new(command))
    }
}

impl<T: Command> Component for ChainType<T> {
    // A chain type used as a plain command is an empty chain.
    fn build(&self, _ctx: &BuildContext<'_>, properties: &Properties) -> Result<Arc<dyn Command>> {
        self.wrap(Chain::new(), properties)
    }

    fn build_chain(&self, chain: Chain, properties: &Properties) -> Option<Result<Arc<dyn Command>>> {
        Some(self.wrap(chain, properties))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps type references to registered command and chain types.
#[derive(Default)]
pub struct ComponentRegistry {
    components: BTreeMap<String, Box<dyn Component>>,
}

impl ComponentRegistry {
    /// An empty registry. Even `chain` must be registered; see
    /// [`ComponentRegistry::with_builtins`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the plain chain and the generic commands:
    ///
    /// | type | properties |
    /// |---|---|
    /// | `chain` | none |
    /// | `copy` | `from_key`, `to_key`, `value` |
    /// | `remove` | `from_key` |
    /// | `lookup` | `catalog`, `name`, `name_key`, `optional`, `ignore_execute_result`, `ignore_postprocess_result` |
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_chain(ChainType::new(CHAIN_TYPE, |chain| chain));

        registry.register(
            CommandType::new("copy", |_| CopyCommand::default())
                .property("from_key", |c, v| {
                    c.from_key = Some(v.to_string());
                    Ok(())
                })
                .property("to_key", |c, v| {
                    c.to_key = v.to_string();
                    Ok(())
                })
                .property("value", |c, v| {
                    c.value = Some(v.to_string());
                    Ok(())
                }),
        );

        registry.register(
            CommandType::new("remove", |_| RemoveCommand::default()).property("from_key", |c, v| {
                c.from_key = v.to_string();
                Ok(())
            }),
        );

        registry.register(
            CommandType::new("lookup", |ctx| LookupCommand::new(ctx.factory))
                .property("catalog", |c, v| {
                    c.catalog = Some(v.to_string());
                    Ok(())
                })
                .property("name", |c, v| {
                    c.name = Some(v.to_string());
                    Ok(())
                })
                .property("name_key", |c, v| {
                    c.name_key = Some(v.to_string());
                    Ok(())
                })
                .property("optional", |c, v| {
                    c.optional = parse_value(v)?;
                    Ok(())
                })
                .property("ignore_execute_result", |c, v| {
                    c.ignore_execute_result = parse_value(v)?;
                    Ok(())
                })
                .property("ignore_postprocess_result", |c, v| {
                    c.ignore_postprocess_result = parse_value(v)?;
                    Ok(())
                }),
        );

        registry
    }

    /// Register a command type, replacing any type with the same name.
    pub fn register<T: Command>(&mut self, command_type: CommandType<T>) -> &mut Self {
        self.components
            .insert(command_type.name.clone(), Box::new(command_type));
        self
    }

    /// Register a chain type, replacing any type with the same name.
    pub fn register_chain<T: Command>(&mut self, chain_type: ChainType<T>) -> &mut Self {
        self.components
            .insert(chain_type.name.clone(), Box::new(chain_type));
        self
    }

    pub fn contains(&self, type_ref: &str) -> bool {
        self.components.contains_key(type_ref)
    }

    /// Registered type references, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        self.components.keys().map(String::as_str).collect()
    }

    fn component(&self, type_ref: &str) -> Result<&dyn Component> {
        self.components
            .get(type_ref)
            .map(|component| &**component)
            .ok_or_else(|| ChainError::configuration(format!("unknown type '{type_ref}'")))
    }

    /// Instantiate `type_ref` and apply `properties` to it.
    pub fn instantiate(
        &self,
        type_ref: &str,
        ctx: &BuildContext<'_>,
        properties: &Properties,
    ) -> Result<Arc<dyn Command>> {
        self.component(type_ref)?.build(ctx, properties)
    }

    /// Wrap an assembled chain in the chain type `type_ref`.
    pub fn instantiate_chain(
        &self,
        type_ref: &str,
        chain: Chain,
        properties: &Properties,
    ) -> Result<Arc<dyn Command>> {
        self.component(type_ref)?
            .build_chain(chain, properties)
            .unwrap_or_else(|| {
                Err(ChainError::configuration(format!(
                    "type '{type_ref}' is not a chain type"
                )))
            })
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}
