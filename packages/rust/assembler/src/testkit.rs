//! Test doubles for chain scenarios, and a registry that knows them.
//!
//! Every double appends its id to the `log` context entry, so a scenario's
//! execution order reads as a `/`-separated string.

use std::sync::Arc;

use chainworks_core::{Chain, Command, Context, Filter, Outcome, Propagation};
use chainworks_shared::{ChainError, Result};

use crate::registry::{ChainType, CommandType, ComponentRegistry};

const LOG: &str = "log";

/// Raised by the exception doubles. Displays as the bare id.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ArithmeticError(pub String);

#[derive(Debug, Default)]
pub struct AddingCommand {
    pub id: String,
}

impl Command for AddingCommand {
    fn execute(&self, context: &mut Context) -> Result<Outcome> {
        context.append_log(LOG, &self.id);
        Ok(Outcome::Continue)
    }
}

#[derive(Debug, Default)]
pub struct DelegatingCommand {
    pub id: String,
}

impl Command for DelegatingCommand {
    fn execute(&self, context: &mut Context) -> Result<Outcome> {
        context.append_log(LOG, &self.id);
        Ok(Outcome::Continue)
    }
}

#[derive(Debug, Default)]
pub struct NonDelegatingCommand {
    pub id: String,
}

impl Command for NonDelegatingCommand {
    fn execute(&self, context: &mut Context) -> Result<Outcome> {
        context.append_log(LOG, &self.id);
        Ok(Outcome::Processed)
    }
}

#[derive(Debug, Default)]
pub struct ExceptionCommand {
    pub id: String,
}

impl Command for ExceptionCommand {
    fn execute(&self, context: &mut Context) -> Result<Outcome> {
        context.append_log(LOG, &self.id);
        Err(ChainError::execution(ArithmeticError(self.id.clone())))
    }
}

/// Filter doubles log `id1` on execute and `id2` on postprocess.
#[derive(Debug, Default)]
pub struct FilterIds {
    pub id1: String,
    pub id2: String,
}

#[derive(Debug, Default)]
pub struct DelegatingFilter(pub FilterIds);

impl Command for DelegatingFilter {
    fn execute(&self, context: &mut Context) -> Result<Outcome> {
        context.append_log(LOG, &self.0.id1);
        Ok(Outcome::Continue)
    }

    fn as_filter(&self) -> Option<&dyn Filter> {
        Some(self)
    }
}

impl Filter for DelegatingFilter {
    fn postprocess(&self, context: &mut Context, _error: Option<&ChainError>) -> Result<Propagation> {
        context.append_log(LOG, &self.0.id2);
        Ok(Propagation::Continue)
    }
}

#[derive(Debug, Default)]
pub struct NonDelegatingFilter(pub FilterIds);

impl Command for NonDelegatingFilter {
    fn execute(&self, context: &mut Context) -> Result<Outcome> {
        context.append_log(LOG, &self.0.id1);
        Ok(Outcome::Processed)
    }

    fn as_filter(&self) -> Option<&dyn Filter> {
        Some(self)
    }
}

impl Filter for NonDelegatingFilter {
    fn postprocess(&self, context: &mut Context, _error: Option<&ChainError>) -> Result<Propagation> {
        context.append_log(LOG, &self.0.id2);
        Ok(Propagation::Continue)
    }
}

#[derive(Debug, Default)]
pub struct ExceptionFilter(pub FilterIds);

impl Command for ExceptionFilter {
    fn execute(&self, context: &mut Context) -> Result<Outcome> {
        context.append_log(LOG, &self.0.id1);
        Err(ChainError::execution(ArithmeticError(self.0.id1.clone())))
    }

    fn as_filter(&self) -> Option<&dyn Filter> {
        Some(self)
    }
}

impl Filter for ExceptionFilter {
    fn postprocess(&self, context: &mut Context, _error: Option<&ChainError>) -> Result<Propagation> {
        context.append_log(LOG, &self.0.id2);
        Ok(Propagation::Continue)
    }
}

#[derive(Debug, Default)]
pub struct TestCommand {
    pub foo: String,
    pub bar: String,
}

impl Command for TestCommand {
    fn execute(&self, _context: &mut Context) -> Result<Outcome> {
        Ok(Outcome::Continue)
    }
}

/// A chain type with its own property.
#[derive(Debug)]
pub struct TestChain {
    pub inner: Chain,
    pub label: String,
}

impl Command for TestChain {
    fn execute(&self, context: &mut Context) -> Result<Outcome> {
        self.inner.execute(context)
    }

    fn describe(&self) -> &str {
        "test-chain"
    }

    fn members(&self) -> &[Arc<dyn Command>] {
        self.inner.members()
    }
}

fn id_type<T: Command>(name: &str, ctor: fn() -> T, id: fn(&mut T) -> &mut String) -> CommandType<T> {
    CommandType::new(name, move |_| ctor()).property("id", move |c, v| {
        *id(c) = v.to_string();
        Ok(())
    })
}

fn filter_type<T: Command>(name: &str, ctor: fn() -> T, ids: fn(&mut T) -> &mut FilterIds) -> CommandType<T> {
    CommandType::new(name, move |_| ctor())
        .property("id1", move |c, v| {
            ids(c).id1 = v.to_string();
            Ok(())
        })
        .property("id2", move |c, v| {
            ids(c).id2 = v.to_string();
            Ok(())
        })
}

/// Builtins plus every double above.
pub fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::with_builtins();
    registry
        .register(id_type("adding", AddingCommand::default, |c| &mut c.id))
        .register(id_type("delegating", DelegatingCommand::default, |c| &mut c.id))
        .register(id_type("non-delegating", NonDelegatingCommand::default, |c| &mut c.id))
        .register(id_type("exception", ExceptionCommand::default, |c| &mut c.id))
        .register(filter_type("delegating-filter", DelegatingFilter::default, |c| &mut c.0))
        .register(filter_type("non-delegating-filter", NonDelegatingFilter::default, |c| &mut c.0))
        .register(filter_type("exception-filter", ExceptionFilter::default, |c| &mut c.0))
        .register(
            CommandType::new("test-command", |_| TestCommand::default())
                .property("foo", |c, v| {
                    c.foo = v.to_string();
                    Ok(())
                })
                .property("bar", |c, v| {
                    c.bar = v.to_string();
                    Ok(())
                }),
        )
        .register_chain(
            ChainType::new("test-chain", |inner| TestChain {
                inner,
                label: String::new(),
            })
            .property("label", |c, v| {
                c.label = v.to_string();
                Ok(())
            }),
        );
    registry
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chainworks_core::CatalogFactory;

    use super::*;
    use crate::assembler::Assembler;

    const TEST_CONFIG: &str = include_str!("../fixtures/test-config.toml");
    const TEST_CONFIG_REFS: &str = include_str!("../fixtures/test-config-2.toml");

    fn assemble(document: &str) -> Arc<CatalogFactory> {
        let registry = registry();
        let factory = Arc::new(CatalogFactory::new());
        Assembler::new(&registry, factory.clone())
            .parse_str(document)
            .unwrap();
        factory
    }

    /// Run `name` from catalog `foo` and return its outcome and log.
    fn run(factory: &CatalogFactory, name: &str) -> (Result<Outcome>, String) {
        let command = factory.catalog(Some("foo")).lookup(name).unwrap();
        let mut ctx = Context::new();
        let result = command.execute(&mut ctx);
        (result, ctx.get_str(LOG).unwrap_or_default().to_string())
    }

    fn check_scenarios(factory: &CatalogFactory) {
        let processed = [
            ("Execute2a", "1/2/3", Outcome::Processed),
            ("Execute2b", "1/2/3", Outcome::Continue),
            ("Execute4a", "1/2/3/c/a", Outcome::Processed),
            ("Execute4b", "1/2/3/b", Outcome::Continue),
        ];
        for (name, log, expected) in processed {
            let (result, actual) = run(factory, name);
            assert_eq!(result.unwrap(), expected, "{name}");
            assert_eq!(actual, log, "{name}");
        }

        let failing = [
            ("Execute2c", "1/2/3", "3"),
            ("Execute2d", "1/2", "2"),
            ("Execute4c", "1/2/3/c/b/a", "3"),
            ("Execute4d", "1/2/b/a", "2"),
        ];
        for (name, log, message) in failing {
            let (result, actual) = run(factory, name);
            let err = result.unwrap_err();
            assert_eq!(err.to_string(), message, "{name}");
            assert!(err.downcast_execution::<ArithmeticError>().is_some(), "{name}");
            assert_eq!(actual, log, "{name}");
        }
    }

    #[test]
    fn fixture_defines_all_commands() {
        let factory = assemble(TEST_CONFIG);
        let foo = factory.catalog(Some("foo"));
        assert_eq!(foo.len(), 17);
        for name in foo.names() {
            assert!(foo.get(&name).is_some(), "{name} does not exist");
        }

        let singles = [
            "AddingCommand",
            "DelegatingCommand",
            "DelegatingFilter",
            "ExceptionCommand",
            "ExceptionFilter",
            "NonDelegatingCommand",
            "NonDelegatingFilter",
        ];
        for name in singles {
            assert!(foo.contains(name), "{name} missing");
        }
        assert!(foo.lookup("AddingCommand").unwrap().is::<AddingCommand>());
        assert!(foo.lookup("ExceptionFilter").unwrap().is::<ExceptionFilter>());
        assert!(foo.lookup("ChainBase").unwrap().is::<TestChain>());

        let configurable = foo.lookup("Configurable").unwrap();
        let configurable = configurable.downcast_ref::<TestCommand>().unwrap();
        assert_eq!(configurable.foo, "Foo Value");
        assert_eq!(configurable.bar, "Bar Value");
    }

    #[test]
    fn fixture_scenarios() {
        check_scenarios(&assemble(TEST_CONFIG));
    }

    #[test]
    fn aliased_and_referenced_fixture_matches() {
        let factory = assemble(TEST_CONFIG_REFS);
        assert_eq!(factory.catalog(Some("foo")).len(), 17);
        assert_eq!(factory.catalog_names(), vec!["foo", "shared"]);
        check_scenarios(&factory);
    }

    #[test]
    fn lookup_returns_the_same_instance() {
        let factory = assemble(TEST_CONFIG);
        let foo = factory.catalog(Some("foo"));
        let first = foo.lookup("Execute2a").unwrap();
        let second = factory.lookup_command("foo.Execute2a").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn pristine_factory_has_no_commands() {
        let factory = CatalogFactory::new();
        assert!(factory.catalog(None).is_empty());
        assert!(factory.catalog(Some("foo")).is_empty());
    }

    #[test]
    fn fixture_loads_from_disk() {
        let dir = std::env::temp_dir().join(format!("chainworks-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path: PathBuf = dir.join("definitions.toml");
        std::fs::write(&path, TEST_CONFIG).unwrap();

        let registry = registry();
        let factory = Arc::new(CatalogFactory::new());
        let summary = Assembler::new(&registry, factory.clone())
            .parse_path(&path)
            .unwrap();
        assert_eq!(summary.commands, 17);
        assert_eq!(summary.catalogs, vec!["foo"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
