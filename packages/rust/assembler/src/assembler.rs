//! Directive-driven catalog assembler.
//!
//! An [`Assembler`] applies directives one at a time and keeps everything it
//! builds in a staging area. [`Assembler::finish`] then:
//!
//! 1. checks that every chain and catalog was closed,
//! 2. binds every reference against the staged and existing commands,
//! 3. commits the staged registrations to the [`CatalogFactory`].
//!
//! Any error aborts the run and discards the staging area, so a failed run
//! leaves the factory exactly as it was. Successive runs accumulate into the
//! same factory.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument, trace, warn};

use chainworks_core::factory::QUALIFIER;
use chainworks_core::{CatalogFactory, Chain, Command};
use chainworks_shared::{ChainError, DuplicatePolicy, Result};

use crate::directive::{CommandSource, Directive, Properties};
use crate::document;
use crate::reference::CommandRef;
use crate::registry::{BuildContext, CHAIN_TYPE, ComponentRegistry};

/// What a successful run committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblySummary {
    /// Catalogs the run touched, by name (`""` is the default catalog).
    pub catalogs: Vec<String>,
    /// Top-level commands registered.
    pub commands: usize,
    /// References bound.
    pub references: usize,
}

/// A chain whose members are still being read.
struct Frame {
    id: Option<String>,
    implementation: Option<String>,
    properties: Properties,
    chain: Chain,
}

/// State of the run in progress.
#[derive(Default)]
struct Run {
    aliases: BTreeMap<String, String>,
    /// Catalog key while inside `BeginCatalog`/`EndCatalog`.
    catalog: Option<String>,
    catalogs_seen: BTreeSet<String>,
    frames: Vec<Frame>,
    staged: BTreeMap<String, BTreeMap<String, Arc<dyn Command>>>,
    references: Vec<Arc<CommandRef>>,
    applied: usize,
}

impl Run {
    fn scope(&self) -> &str {
        self.catalog.as_deref().unwrap_or_default()
    }
}

/// Builds catalogs from an ordered directive stream.
pub struct Assembler<'r> {
    registry: &'r ComponentRegistry,
    factory: Arc<CatalogFactory>,
    policy: DuplicatePolicy,
    run: Run,
}

impl<'r> Assembler<'r> {
    pub fn new(registry: &'r ComponentRegistry, factory: Arc<CatalogFactory>) -> Self {
        Self {
            registry,
            factory,
            policy: DuplicatePolicy::default(),
            run: Run::default(),
        }
    }

    /// Set the policy for names that are already registered.
    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn factory(&self) -> &Arc<CatalogFactory> {
        &self.factory
    }

    /// Apply every directive, then finish the run.
    pub fn assemble(&mut self, directives: impl IntoIterator<Item = Directive>) -> Result<AssemblySummary> {
        for directive in directives {
            self.apply(directive)?;
        }
        self.finish()
    }

    /// Read a TOML definition document and assemble it.
    pub fn parse_str(&mut self, content: &str) -> Result<AssemblySummary> {
        let directives = document::parse_str(content)?;
        self.assemble(directives)
    }

    /// Read a TOML definition file and assemble it.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn parse_path(&mut self, path: &Path) -> Result<AssemblySummary> {
        let directives = document::load(path)?;
        self.assemble(directives)
    }

    /// Apply one directive. On error the run is aborted: everything staged
    /// so far is discarded.
    pub fn apply(&mut self, directive: Directive) -> Result<()> {
        self.run.applied += 1;
        let position = self.run.applied;
        let kind = directive.kind();
        trace!(position, kind, "applying directive");

        self.dispatch(directive).map_err(|err| {
            warn!(position, kind, error = %err, "assembly aborted");
            self.run = Run::default();
            match err {
                ChainError::Configuration { message } => {
                    ChainError::configuration(format!("directive {position} ({kind}): {message}"))
                }
                other => other,
            }
        })
    }

    /// Close the run: bind references and commit staged registrations.
    pub fn finish(&mut self) -> Result<AssemblySummary> {
        let run = std::mem::take(&mut self.run);

        if let Some(frame) = run.frames.last() {
            return Err(ChainError::configuration(format!(
                "chain '{}' is not closed",
                frame.id.as_deref().unwrap_or("<anonymous>")
            )));
        }
        if let Some(catalog) = &run.catalog {
            return Err(ChainError::configuration(format!(
                "catalog '{catalog}' is not closed"
            )));
        }

        self.bind_references(&run)?;
        let summary = self.commit(run)?;

        info!(
            catalogs = summary.catalogs.len(),
            commands = summary.commands,
            references = summary.references,
            "assembly complete"
        );
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Directive handling
    // -----------------------------------------------------------------------

    fn dispatch(&mut self, directive: Directive) -> Result<()> {
        match directive {
            Directive::BeginCatalog { name } => {
                if !self.run.frames.is_empty() {
                    return Err(ChainError::configuration("a catalog cannot begin inside a chain"));
                }
                if let Some(open) = &self.run.catalog {
                    return Err(ChainError::configuration(format!(
                        "catalog '{open}' is still open; catalogs cannot be nested"
                    )));
                }
                let key = self.catalog_key(name.as_deref());
                debug!(catalog = %key, "begin catalog");
                self.run.catalogs_seen.insert(key.clone());
                self.run.catalog = Some(key);
                Ok(())
            }
            Directive::EndCatalog => {
                if !self.run.frames.is_empty() {
                    return Err(ChainError::configuration("catalog ended while a chain is open"));
                }
                self.run
                    .catalog
                    .take()
                    .map(|_| ())
                    .ok_or_else(|| ChainError::configuration("end-catalog without matching begin-catalog"))
            }
            Directive::DefineCommand { id, source, properties } => {
                let command = match source {
                    CommandSource::Implementation(type_ref) => {
                        let ctx = BuildContext { factory: &self.factory };
                        self.registry
                            .instantiate(self.resolve_alias(&type_ref), &ctx, &properties)?
                    }
                    CommandSource::Reference(target) => {
                        if !properties.is_empty() {
                            return Err(ChainError::configuration(format!(
                                "reference to '{target}' cannot carry properties"
                            )));
                        }
                        let reference = Arc::new(CommandRef::new(self.run.scope(), target));
                        self.run.references.push(reference.clone());
                        reference
                    }
                };
                self.place(id, command)
            }
            Directive::BeginChain { id, implementation, properties } => {
                self.run.frames.push(Frame {
                    id,
                    implementation,
                    properties,
                    chain: Chain::new(),
                });
                Ok(())
            }
            Directive::EndChain => {
                let frame = self
                    .run
                    .frames
                    .pop()
                    .ok_or_else(|| ChainError::configuration("end-chain without matching begin-chain"))?;
                let type_ref = frame.implementation.as_deref().unwrap_or(CHAIN_TYPE);
                let command = self.registry.instantiate_chain(
                    self.resolve_alias(type_ref),
                    frame.chain,
                    &frame.properties,
                )?;
                self.place(frame.id, command)
            }
            Directive::SetProperty { name, value } => {
                let frame = self
                    .run
                    .frames
                    .last_mut()
                    .ok_or_else(|| ChainError::configuration(format!("set-property '{name}' outside a chain")))?;
                frame.properties.insert(name, value);
                Ok(())
            }
            Directive::Alias { alias, implementation } => {
                let resolved = self.resolve_alias(&implementation).to_string();
                if !self.registry.contains(&resolved) {
                    return Err(ChainError::configuration(format!(
                        "alias '{alias}' names unknown type '{implementation}'"
                    )));
                }
                debug!(%alias, implementation = %resolved, "alias defined");
                self.run.aliases.insert(alias, resolved);
                Ok(())
            }
        }
    }

    /// Append to the open chain, or stage a top-level registration.
    fn place(&mut self, id: Option<String>, command: Arc<dyn Command>) -> Result<()> {
        if let Some(frame) = self.run.frames.last_mut() {
            if let Some(id) = id {
                trace!(%id, "nested definitions are not registered individually");
            }
            return frame.chain.add_command(command);
        }

        let Some(id) = id else {
            warn!(command = command.describe(), "top-level definition without a name dropped");
            return Ok(());
        };

        let key = self.run.scope().to_string();
        if self.policy == DuplicatePolicy::Reject && self.is_registered(&key, &id) {
            return Err(ChainError::duplicate(key, id));
        }
        trace!(catalog = %key, %id, "staged command");
        self.run.staged.entry(key).or_default().insert(id, command);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Resolution and commit
    // -----------------------------------------------------------------------

    fn catalog_key(&self, name: Option<&str>) -> String {
        if self.factory.is_default(name) {
            String::new()
        } else {
            name.unwrap_or_default().to_string()
        }
    }

    fn resolve_alias<'a>(&'a self, type_ref: &'a str) -> &'a str {
        self.run
            .aliases
            .get(type_ref)
            .map(String::as_str)
            .unwrap_or(type_ref)
    }

    fn is_registered(&self, key: &str, name: &str) -> bool {
        let staged = self
            .run
            .staged
            .get(key)
            .is_some_and(|commands| commands.contains_key(name));
        staged
            || self
                .factory
                .get(Some(key))
                .is_some_and(|catalog| catalog.contains(name))
    }

    fn find(&self, run: &Run, key: &str, name: &str) -> Option<Arc<dyn Command>> {
        run.staged
            .get(key)
            .and_then(|commands| commands.get(name))
            .cloned()
            .or_else(|| self.factory.get(Some(key)).and_then(|catalog| catalog.get(name)))
    }

    fn catalog_known(&self, run: &Run, key: &str) -> bool {
        run.catalogs_seen.contains(key)
            || run.staged.contains_key(key)
            || self.factory.get(Some(key)).is_some()
    }

    /// Resolve `name` as seen from catalog `scope`. A `catalog.name` form is
    /// used only when the prefix is a known catalog.
    fn resolve(&self, run: &Run, scope: &str, name: &str) -> Option<Arc<dyn Command>> {
        if let Some((prefix, rest)) = name.split_once(QUALIFIER) {
            let key = self.catalog_key(Some(prefix));
            if self.catalog_known(run, &key) {
                if let Some(found) = self.find(run, &key, rest) {
                    return Some(found);
                }
            }
        }
        self.find(run, scope, name)
    }

    /// Resolve every reference of the run, reject wiring that reaches a
    /// reference from its own target, then bind. Nothing is bound when any
    /// check fails.
    fn bind_references(&self, run: &Run) -> Result<()> {
        let mut targets: BTreeMap<*const (), Arc<dyn Command>> = BTreeMap::new();
        for reference in &run.references {
            let target = self
                .resolve(run, reference.scope(), reference.target_name())
                .ok_or_else(|| {
                    ChainError::configuration(format!(
                        "unresolved reference '{}' in catalog '{}'",
                        reference.target_name(),
                        reference.scope()
                    ))
                })?;
            targets.insert(Arc::as_ptr(reference).cast::<()>(), target);
        }

        // Commands committed by earlier runs are acyclic, so every cycle
        // passes through a reference of this run.
        for reference in &run.references {
            let address = Arc::as_ptr(reference).cast::<()>();
            if let Some(target) = targets.get(&address) {
                if reaches(target, address, &targets) {
                    return Err(ChainError::configuration(format!(
                        "reference cycle through '{}'",
                        reference.target_name()
                    )));
                }
            }
        }

        for reference in &run.references {
            if let Some(target) = targets.remove(&Arc::as_ptr(reference).cast::<()>()) {
                reference.bind(target);
            }
        }
        Ok(())
    }

    fn commit(&self, run: Run) -> Result<AssemblySummary> {
        let mut catalogs: BTreeSet<String> = run.catalogs_seen;
        let mut commands = 0;

        for key in &catalogs {
            self.factory.catalog(Some(key.as_str()));
        }

        for (key, staged) in run.staged {
            let catalog = self.factory.catalog(Some(key.as_str()));
            for (name, command) in staged {
                match self.policy {
                    DuplicatePolicy::Reject => catalog.register(name, command)?,
                    DuplicatePolicy::Replace => {
                        catalog.replace(name, command);
                    }
                }
                commands += 1;
            }
            catalogs.insert(key);
        }

        Ok(AssemblySummary {
            catalogs: catalogs.into_iter().collect(),
            commands,
            references: run.references.len(),
        })
    }
}

/// Whether `address` is reachable from `start` through command members.
/// References of the current run are followed through `pending`, since they
/// are not bound yet.
fn reaches(
    start: &Arc<dyn Command>,
    address: *const (),
    pending: &BTreeMap<*const (), Arc<dyn Command>>,
) -> bool {
    let mut visited = BTreeSet::new();
    let mut stack = vec![start.clone()];
    while let Some(command) = stack.pop() {
        let current = Arc::as_ptr(&command).cast::<()>();
        if current == address {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        match pending.get(&current) {
            Some(target) => stack.push(target.clone()),
            None => stack.extend(command.members().iter().cloned()),
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use chainworks_core::{Context, Outcome};

    use super::*;
    use crate::testkit;

    fn setup() -> (ComponentRegistry, Arc<CatalogFactory>) {
        (testkit::registry(), Arc::new(CatalogFactory::new()))
    }

    fn delegating(id: &str) -> Directive {
        Directive::command(None, "delegating").with("id", id)
    }

    #[test]
    fn top_level_definitions_are_registered() {
        let (registry, factory) = setup();
        let mut assembler = Assembler::new(&registry, factory.clone());
        let summary = assembler
            .assemble([
                Directive::catalog(Some("foo")),
                Directive::command(Some("One"), "delegating").with("id", "1"),
                Directive::chain(Some("Pipeline")),
                delegating("a"),
                delegating("b"),
                Directive::EndChain,
                Directive::EndCatalog,
            ])
            .unwrap();

        assert_eq!(summary.commands, 2);
        assert_eq!(summary.catalogs, vec!["foo"]);
        let foo = factory.catalog(Some("foo"));
        assert_eq!(foo.names(), vec!["One", "Pipeline"]);

        let mut ctx = Context::new();
        assert_eq!(foo.lookup("Pipeline").unwrap().execute(&mut ctx).unwrap(), Outcome::Continue);
        assert_eq!(ctx.get_str("log"), Some("a/b"));
    }

    #[test]
    fn definitions_outside_a_catalog_go_to_default() {
        let (registry, factory) = setup();
        Assembler::new(&registry, factory.clone())
            .assemble([Directive::command(Some("Plain"), "delegating").with("id", "x")])
            .unwrap();
        assert!(factory.catalog(None).contains("Plain"));
        assert!(factory.catalog_names().is_empty());
    }

    #[test]
    fn nested_members_are_not_registered() {
        let (registry, factory) = setup();
        Assembler::new(&registry, factory.clone())
            .assemble([
                Directive::chain(Some("Outer")),
                Directive::command(Some("Inner"), "delegating").with("id", "1"),
                Directive::chain(Some("Sub")),
                delegating("2"),
                Directive::EndChain,
                Directive::EndChain,
            ])
            .unwrap();
        assert_eq!(factory.catalog(None).names(), vec!["Outer"]);
    }

    #[test]
    fn forward_reference_resolves_at_finish() {
        let (registry, factory) = setup();
        Assembler::new(&registry, factory.clone())
            .assemble([
                Directive::chain(Some("Uses")),
                Directive::reference(None, "Later"),
                delegating("2"),
                Directive::EndChain,
                Directive::command(Some("Later"), "delegating").with("id", "1"),
            ])
            .unwrap();

        let mut ctx = Context::new();
        factory.lookup_command("Uses").unwrap().execute(&mut ctx).unwrap();
        assert_eq!(ctx.get_str("log"), Some("1/2"));
    }

    #[test]
    fn qualified_reference_across_catalogs() {
        let (registry, factory) = setup();
        Assembler::new(&registry, factory.clone())
            .assemble([
                Directive::catalog(Some("foo")),
                Directive::chain(Some("Uses")),
                Directive::reference(None, "shared.Step"),
                Directive::EndChain,
                Directive::EndCatalog,
                Directive::catalog(Some("shared")),
                Directive::command(Some("Step"), "non-delegating").with("id", "s"),
                Directive::EndCatalog,
            ])
            .unwrap();

        let mut ctx = Context::new();
        let outcome = factory.lookup_command("foo.Uses").unwrap().execute(&mut ctx).unwrap();
        assert_eq!(outcome, Outcome::Processed);
        assert_eq!(ctx.get_str("log"), Some("s"));
    }

    #[test]
    fn reference_to_existing_catalog_entry() {
        let (registry, factory) = setup();
        let mut assembler = Assembler::new(&registry, factory.clone());
        assembler
            .assemble([Directive::command(Some("Base"), "delegating").with("id", "base")])
            .unwrap();
        assembler
            .assemble([
                Directive::chain(Some("Later")),
                Directive::reference(None, "Base"),
                Directive::EndChain,
            ])
            .unwrap();

        let mut ctx = Context::new();
        factory.lookup_command("Later").unwrap().execute(&mut ctx).unwrap();
        assert_eq!(ctx.get_str("log"), Some("base"));
        assert_eq!(factory.catalog(None).len(), 2);
    }

    #[test]
    fn undefined_reference_fails_and_rolls_back() {
        let (registry, factory) = setup();
        let err = Assembler::new(&registry, factory.clone())
            .assemble([
                Directive::command(Some("Fine"), "delegating").with("id", "1"),
                Directive::chain(Some("Broken")),
                Directive::reference(None, "Nowhere"),
                Directive::EndChain,
            ])
            .unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("unresolved reference 'Nowhere'"));
        assert!(factory.catalog(None).is_empty());
    }

    #[test]
    fn reference_cycle_is_rejected() {
        let (registry, factory) = setup();
        let err = Assembler::new(&registry, factory.clone())
            .assemble([Directive::reference(Some("A"), "B"), Directive::reference(Some("B"), "A")])
            .unwrap_err();
        assert!(err.to_string().contains("reference cycle"));
    }

    #[test]
    fn references_build_on_earlier_runs() {
        let (registry, factory) = setup();
        let mut assembler = Assembler::new(&registry, factory.clone());
        assembler
            .assemble([
                Directive::command(Some("A"), "delegating").with("id", "a"),
                Directive::reference(Some("R1"), "A"),
                Directive::reference(Some("R2"), "R1"),
                Directive::reference(Some("R3"), "R2"),
            ])
            .unwrap();
        assembler.assemble([Directive::reference(Some("X"), "R3")]).unwrap();

        let mut ctx = Context::new();
        factory.lookup_command("X").unwrap().execute(&mut ctx).unwrap();
        assert_eq!(ctx.get_str("log"), Some("a"));
    }

    #[test]
    fn chain_including_itself_is_rejected() {
        let (registry, factory) = setup();
        let err = Assembler::new(&registry, factory.clone())
            .assemble([
                Directive::chain(Some("Loop")),
                delegating("1"),
                Directive::reference(None, "Loop"),
                Directive::EndChain,
            ])
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("reference cycle through 'Loop'"));
        assert!(factory.catalog(None).is_empty());
    }

    #[test]
    fn indirect_self_inclusion_through_typed_chains_is_rejected() {
        let (registry, factory) = setup();
        let err = Assembler::new(&registry, factory.clone())
            .assemble([
                Directive::BeginChain {
                    id: Some("Outer".into()),
                    implementation: Some("test-chain".into()),
                    properties: Properties::new(),
                },
                Directive::chain(None),
                Directive::reference(None, "Inner"),
                Directive::EndChain,
                Directive::EndChain,
                Directive::chain(Some("Inner")),
                Directive::reference(None, "Outer"),
                Directive::EndChain,
            ])
            .unwrap_err();
        assert!(err.to_string().contains("reference cycle"));
    }

    #[test]
    fn shared_target_without_cycle_is_accepted() {
        let (registry, factory) = setup();
        Assembler::new(&registry, factory.clone())
            .assemble([
                Directive::command(Some("Step"), "delegating").with("id", "s"),
                Directive::chain(Some("Twice")),
                Directive::reference(None, "Step"),
                Directive::reference(None, "Step"),
                Directive::EndChain,
                Directive::chain(Some("Nested")),
                Directive::reference(None, "Twice"),
                Directive::reference(None, "Twice"),
                Directive::EndChain,
            ])
            .unwrap();

        let mut ctx = Context::new();
        factory.lookup_command("Nested").unwrap().execute(&mut ctx).unwrap();
        assert_eq!(ctx.get_str("log"), Some("s/s/s/s"));
    }

    #[test]
    fn unknown_type_aborts_with_position() {
        let (registry, factory) = setup();
        let mut assembler = Assembler::new(&registry, factory.clone());
        assembler.apply(Directive::command(Some("Ok"), "delegating").with("id", "1")).unwrap();
        let err = assembler.apply(Directive::command(Some("Bad"), "mystery")).unwrap_err();

        assert!(err.to_string().contains("directive 2 (define-command)"));
        assert!(err.to_string().contains("unknown type 'mystery'"));
        // The aborted run has nothing left to commit.
        assert_eq!(assembler.finish().unwrap().commands, 0);
        assert!(factory.catalog(None).is_empty());
    }

    #[test]
    fn unknown_property_is_configuration_error() {
        let (registry, factory) = setup();
        let err = Assembler::new(&registry, factory)
            .assemble([Directive::command(Some("X"), "delegating").with("colour", "red")])
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn malformed_nesting_is_rejected() {
        let (registry, factory) = setup();
        let cases: Vec<Vec<Directive>> = vec![
            vec![Directive::EndChain],
            vec![Directive::EndCatalog],
            vec![Directive::catalog(Some("a")), Directive::catalog(Some("b"))],
            vec![Directive::chain(Some("c")), Directive::catalog(Some("a"))],
            vec![Directive::catalog(Some("a")), Directive::chain(Some("c")), Directive::EndCatalog],
            vec![Directive::chain(Some("open"))],
            vec![Directive::catalog(Some("open"))],
            vec![Directive::SetProperty { name: "x".into(), value: "y".into() }],
        ];

        for directives in cases {
            let label = format!("{directives:?}");
            let err = Assembler::new(&registry, factory.clone())
                .assemble(directives)
                .unwrap_err();
            assert!(err.is_configuration(), "expected configuration error for {label}");
        }
        assert!(factory.catalog_names().is_empty());
    }

    #[test]
    fn duplicate_names_follow_policy() {
        let (registry, factory) = setup();
        let twice = || {
            vec![
                Directive::command(Some("Twice"), "delegating").with("id", "1"),
                Directive::command(Some("Twice"), "delegating").with("id", "2"),
            ]
        };

        let err = Assembler::new(&registry, factory.clone())
            .assemble(twice())
            .unwrap_err();
        assert!(matches!(err, ChainError::DuplicateName { .. }));
        assert!(factory.catalog(None).is_empty());

        Assembler::new(&registry, factory.clone())
            .with_policy(DuplicatePolicy::Replace)
            .assemble(twice())
            .unwrap();
        let mut ctx = Context::new();
        factory.lookup_command("Twice").unwrap().execute(&mut ctx).unwrap();
        assert_eq!(ctx.get_str("log"), Some("2"));
    }

    #[test]
    fn duplicate_against_earlier_run_is_rejected() {
        let (registry, factory) = setup();
        let mut assembler = Assembler::new(&registry, factory.clone());
        assembler.assemble([Directive::command(Some("Once"), "delegating").with("id", "1")]).unwrap();
        let err = assembler
            .assemble([Directive::command(Some("Once"), "delegating").with("id", "2")])
            .unwrap_err();
        assert!(matches!(err, ChainError::DuplicateName { .. }));
    }

    #[test]
    fn chain_type_and_set_property_apply_at_end_chain() {
        let (registry, factory) = setup();
        Assembler::new(&registry, factory.clone())
            .assemble([
                Directive::BeginChain {
                    id: Some("Typed".into()),
                    implementation: Some("test-chain".into()),
                    properties: Properties::new(),
                },
                Directive::SetProperty { name: "label".into(), value: "custom".into() },
                delegating("1"),
                Directive::EndChain,
            ])
            .unwrap();

        let typed = factory.lookup_command("Typed").unwrap();
        let chain = typed.downcast_ref::<testkit::TestChain>().unwrap();
        assert_eq!(chain.label, "custom");
        assert_eq!(chain.inner.len(), 1);
    }

    #[test]
    fn aliases_apply_for_the_rest_of_the_run() {
        let (registry, factory) = setup();
        let mut assembler = Assembler::new(&registry, factory.clone());
        assembler
            .assemble([
                Directive::Alias { alias: "pass".into(), implementation: "delegating".into() },
                Directive::Alias { alias: "also-pass".into(), implementation: "pass".into() },
                Directive::command(Some("Aliased"), "also-pass").with("id", "1"),
            ])
            .unwrap();
        assert!(factory.catalog(None).contains("Aliased"));

        // A new run starts without the aliases.
        let err = assembler
            .assemble([Directive::command(Some("Again"), "pass")])
            .unwrap_err();
        assert!(err.to_string().contains("unknown type 'pass'"));

        let err = assembler
            .assemble([Directive::Alias { alias: "x".into(), implementation: "nope".into() }])
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn default_catalog_alias_shares_entries() {
        let registry = testkit::registry();
        let factory = Arc::new(CatalogFactory::with_default_name("main"));
        Assembler::new(&registry, factory.clone())
            .assemble([
                Directive::catalog(Some("main")),
                Directive::command(Some("InMain"), "delegating").with("id", "1"),
                Directive::EndCatalog,
                Directive::chain(Some("Uses")),
                Directive::reference(None, "main.InMain"),
                Directive::EndChain,
            ])
            .unwrap();

        assert!(factory.catalog(None).contains("InMain"));
        assert!(factory.catalog(None).contains("Uses"));
    }

    #[test]
    fn lookup_builtin_resolves_through_factory() {
        let (registry, factory) = setup();
        Assembler::new(&registry, factory.clone())
            .assemble([
                Directive::catalog(Some("foo")),
                Directive::command(Some("Target"), "non-delegating").with("id", "t"),
                Directive::EndCatalog,
                Directive::chain(Some("Dispatch")),
                Directive::command(None, "lookup").with("catalog", "foo").with("name", "Target"),
                delegating("never"),
                Directive::EndChain,
            ])
            .unwrap();

        let mut ctx = Context::new();
        let outcome = factory.lookup_command("Dispatch").unwrap().execute(&mut ctx).unwrap();
        assert_eq!(outcome, Outcome::Processed);
        assert_eq!(ctx.get_str("log"), Some("t"));
    }
}
