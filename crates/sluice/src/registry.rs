//! Explicit registration tables for producers and rules.
//!
//! Built once at process start; configuration resolves names through the
//! tables, so an unknown keyword is a hard error instead of a silent no-op.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::error::{Result, SluiceError};
use crate::producer::{FileInfoProducer, ImageHashProducer, ImageShapeProducer, Producer};
use crate::rules::{
    ChannelRule, DuplicateRule, LimitRule, ModifiedRule, PathListRule, ResolutionRule, Rule,
};

/// Builds a producer from its JSON parameter bag.
pub type ProducerFactory = fn(&JsonValue) -> Result<Box<dyn Producer>>;

/// Builds a rule from its JSON parameter bag.
pub type RuleFactory = fn(&JsonValue) -> Result<Box<dyn Rule>>;

/// Produces a template parameter bag for config generation.
pub type ConfigTemplate = fn() -> JsonValue;

/// Name to factory tables for everything configuration can instantiate.
pub struct Registry {
    producers: IndexMap<&'static str, (ProducerFactory, ConfigTemplate)>,
    rules: IndexMap<&'static str, (RuleFactory, ConfigTemplate)>,
}

impl Registry {
    /// An empty registry, for callers bringing only their own units.
    pub fn empty() -> Self {
        Self {
            producers: IndexMap::new(),
            rules: IndexMap::new(),
        }
    }

    /// The registry of built-in producers and rules.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register_producer(
            FileInfoProducer::NAME,
            FileInfoProducer::from_config,
            FileInfoProducer::default_config,
        );
        registry.register_producer(
            ImageShapeProducer::NAME,
            ImageShapeProducer::from_config,
            ImageShapeProducer::default_config,
        );
        registry.register_producer(
            ImageHashProducer::NAME,
            ImageHashProducer::from_config,
            ImageHashProducer::default_config,
        );

        registry.register_rule(
            ModifiedRule::NAME,
            ModifiedRule::from_config,
            ModifiedRule::default_config,
        );
        registry.register_rule(
            PathListRule::NAME,
            PathListRule::from_config,
            PathListRule::default_config,
        );
        registry.register_rule(
            ResolutionRule::NAME,
            ResolutionRule::from_config,
            ResolutionRule::default_config,
        );
        registry.register_rule(
            ChannelRule::NAME,
            ChannelRule::from_config,
            ChannelRule::default_config,
        );
        registry.register_rule(
            DuplicateRule::NAME,
            DuplicateRule::from_config,
            DuplicateRule::default_config,
        );
        registry.register_rule(
            LimitRule::NAME,
            LimitRule::from_config,
            LimitRule::default_config,
        );
        registry
    }

    pub fn register_producer(
        &mut self,
        name: &'static str,
        factory: ProducerFactory,
        template: ConfigTemplate,
    ) {
        self.producers.insert(name, (factory, template));
    }

    pub fn register_rule(
        &mut self,
        name: &'static str,
        factory: RuleFactory,
        template: ConfigTemplate,
    ) {
        self.rules.insert(name, (factory, template));
    }

    /// Instantiate a producer by configuration keyword.
    pub fn producer_from_config(
        &self,
        name: &str,
        params: &JsonValue,
    ) -> Result<Box<dyn Producer>> {
        let (factory, _) = self
            .producers
            .get(name)
            .ok_or_else(|| SluiceError::UnknownName {
                kind: "producer",
                name: name.to_string(),
            })?;
        factory(params)
    }

    /// Instantiate a rule by configuration keyword.
    pub fn rule_from_config(&self, name: &str, params: &JsonValue) -> Result<Box<dyn Rule>> {
        let (factory, _) = self
            .rules
            .get(name)
            .ok_or_else(|| SluiceError::UnknownName {
                kind: "rule",
                name: name.to_string(),
            })?;
        factory(params)
    }

    pub fn producer_names(&self) -> impl Iterator<Item = &'static str> {
        self.producers.keys().copied()
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> {
        self.rules.keys().copied()
    }

    /// Default parameter bags for every registered producer, keyed by name.
    pub fn producer_templates(&self) -> IndexMap<&'static str, JsonValue> {
        self.producers
            .iter()
            .map(|(name, (_, template))| (*name, template()))
            .collect()
    }

    /// Default parameter bags for every registered rule, keyed by name.
    pub fn rule_templates(&self) -> IndexMap<&'static str, JsonValue> {
        self.rules
            .iter()
            .map(|(name, (_, template))| (*name, template()))
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}
