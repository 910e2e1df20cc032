//! TOML definition documents.
//!
//! A document is read into an ordered [`Directive`] stream:
//!
//! ```toml
//! [aliases]
//! echo = "copy"
//!
//! [[catalogs]]
//! name = "foo"
//!
//! [[catalogs.commands]]
//! name = "Greeting"
//! type = "echo"
//! to_key = "greeting"
//! value = "hello"
//! ```
//!
//! `name`, `type`, `ref`, `chain` and `commands` are reserved keys. Every
//! other scalar key on an element is a property.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use chainworks_shared::{ChainError, Result};

use crate::directive::{CommandSource, Directive, Properties};

static CATALOG_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]*$").expect("catalog name regex"));

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentFile {
    #[serde(default)]
    aliases: BTreeMap<String, String>,
    /// Definitions for the default catalog.
    #[serde(default)]
    commands: Vec<Element>,
    #[serde(default)]
    catalogs: Vec<CatalogDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogDoc {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    commands: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    type_ref: Option<String>,
    #[serde(default, rename = "ref")]
    reference: Option<String>,
    #[serde(default)]
    chain: bool,
    #[serde(default)]
    commands: Vec<Element>,
    #[serde(flatten)]
    properties: BTreeMap<String, toml::Value>,
}

impl Element {
    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    fn is_chain(&self) -> bool {
        self.chain || !self.commands.is_empty()
    }

    fn string_properties(&self) -> Result<Properties> {
        self.properties
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    toml::Value::String(s) => s.clone(),
                    toml::Value::Integer(i) => i.to_string(),
                    toml::Value::Float(f) => f.to_string(),
                    toml::Value::Boolean(b) => b.to_string(),
                    toml::Value::Datetime(d) => d.to_string(),
                    toml::Value::Array(_) | toml::Value::Table(_) => {
                        return Err(ChainError::configuration(format!(
                            "property '{key}' of '{}' must be a scalar",
                            self.label()
                        )));
                    }
                };
                Ok((key.clone(), value))
            })
            .collect()
    }
}

/// Read a definition file.
pub fn load(path: &Path) -> Result<Vec<Directive>> {
    let content = std::fs::read_to_string(path).map_err(|e| ChainError::io(path, e))?;
    parse_str(&content)
}

/// Parse a definition document into directives, in document order.
pub fn parse_str(content: &str) -> Result<Vec<Directive>> {
    let document: DocumentFile = toml::from_str(content)
        .map_err(|e| ChainError::configuration(format!("invalid definition document: {e}")))?;

    let mut directives = alias_directives(document.aliases)?;

    for element in document.commands {
        emit(element, &mut directives)?;
    }

    for catalog in document.catalogs {
        let name = catalog.name.filter(|name| !name.is_empty());
        if let Some(name) = &name {
            if !CATALOG_NAME_RE.is_match(name) {
                return Err(ChainError::configuration(format!(
                    "invalid catalog name '{name}': use letters, digits, '_' or '-'"
                )));
            }
        }
        directives.push(Directive::BeginCatalog { name });
        for element in catalog.commands {
            emit(element, &mut directives)?;
        }
        directives.push(Directive::EndCatalog);
    }

    debug!(directives = directives.len(), "definition document parsed");
    Ok(directives)
}

/// Order aliases so each one follows any alias it names.
fn alias_directives(mut pending: BTreeMap<String, String>) -> Result<Vec<Directive>> {
    let mut directives = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready: Vec<String> = pending
            .iter()
            .filter(|(_, target)| !pending.contains_key(target.as_str()))
            .map(|(alias, _)| alias.clone())
            .collect();

        if ready.is_empty() {
            let names: Vec<&str> = pending.keys().map(String::as_str).collect();
            return Err(ChainError::configuration(format!(
                "alias cycle among {}",
                names.join(", ")
            )));
        }

        for alias in ready {
            if let Some(implementation) = pending.remove(&alias) {
                directives.push(Directive::Alias { alias, implementation });
            }
        }
    }
    Ok(directives)
}

fn emit(element: Element, out: &mut Vec<Directive>) -> Result<()> {
    let properties = element.string_properties()?;

    if let Some(target) = &element.reference {
        if element.type_ref.is_some() || element.is_chain() || !properties.is_empty() {
            return Err(ChainError::configuration(format!(
                "reference '{}' cannot also have a type, members or properties",
                element.label()
            )));
        }
        out.push(Directive::DefineCommand {
            id: element.name,
            source: CommandSource::Reference(target.clone()),
            properties,
        });
        return Ok(());
    }

    if element.is_chain() {
        out.push(Directive::BeginChain {
            id: element.name,
            implementation: element.type_ref,
            properties,
        });
        for member in element.commands {
            emit(member, out)?;
        }
        out.push(Directive::EndChain);
        return Ok(());
    }

    let Some(type_ref) = element.type_ref else {
        return Err(ChainError::configuration(format!(
            "element '{}' needs `type`, `ref` or `commands`",
            element.label()
        )));
    };
    out.push(Directive::DefineCommand {
        id: element.name,
        source: CommandSource::Implementation(type_ref),
        properties,
    });
    Ok(())
}
