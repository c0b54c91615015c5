// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Component registry
//!
//! Name-keyed maps over five namespaces, populated once during process
//! startup and immutable afterwards. Lookups return a result-or-error;
//! the error carries up to the first ten alphabetically-sorted available
//! names so typos are actionable.

use crate::component::{Action, Agent, ContextBuilder, Generator};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use wl_core::Namespace;
use wl_workflow::{ComponentLookup, WorkflowDocument};

/// How many candidate names a lookup error lists.
const SUGGESTION_LIMIT: usize = 10;

/// Errors from registry operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{namespace} component '{name}' is already registered")]
    Duplicate { namespace: Namespace, name: String },

    #[error("{namespace} component '{name}' not found{}", format_suggestions(available, *more))]
    NotFound {
        namespace: Namespace,
        name: String,
        /// First ten names, alphabetically.
        available: Vec<String>,
        /// How many more exist beyond `available`.
        more: usize,
    },
}

fn format_suggestions(available: &[String], more: usize) -> String {
    if available.is_empty() {
        return String::new();
    }
    let mut out = format!(" (available: {}", available.join(", "));
    if more > 0 {
        out.push_str(&format!(" and {more} more"));
    }
    out.push(')');
    out
}

/// The component registry.
#[derive(Default, Clone)]
pub struct ComponentRegistry {
    actions: BTreeMap<String, Arc<dyn Action>>,
    agents: BTreeMap<String, Arc<dyn Agent>>,
    generators: BTreeMap<String, Arc<dyn Generator>>,
    context_builders: BTreeMap<String, Arc<dyn ContextBuilder>>,
    workflows: BTreeMap<String, WorkflowDocument>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_action(
        &mut self,
        name: impl Into<String>,
        action: Arc<dyn Action>,
    ) -> Result<(), RegistryError> {
        insert_unique(&mut self.actions, Namespace::Actions, name.into(), action)
    }

    pub fn register_agent(
        &mut self,
        name: impl Into<String>,
        agent: Arc<dyn Agent>,
    ) -> Result<(), RegistryError> {
        insert_unique(&mut self.agents, Namespace::Agents, name.into(), agent)
    }

    pub fn register_generator(
        &mut self,
        name: impl Into<String>,
        generator: Arc<dyn Generator>,
    ) -> Result<(), RegistryError> {
        insert_unique(
            &mut self.generators,
            Namespace::Generators,
            name.into(),
            generator,
        )
    }

    pub fn register_context_builder(
        &mut self,
        name: impl Into<String>,
        builder: Arc<dyn ContextBuilder>,
    ) -> Result<(), RegistryError> {
        insert_unique(
            &mut self.context_builders,
            Namespace::ContextBuilders,
            name.into(),
            builder,
        )
    }

    pub fn register_workflow(&mut self, document: WorkflowDocument) -> Result<(), RegistryError> {
        let name = document.name.clone();
        insert_unique(&mut self.workflows, Namespace::Workflows, name, document)
    }

    /// Replace an existing registration. Test escape hatch; production
    /// registration is one-shot.
    pub fn replace_action(&mut self, name: impl Into<String>, action: Arc<dyn Action>) {
        self.actions.insert(name.into(), action);
    }

    pub fn lookup_action(&self, name: &str) -> Result<Arc<dyn Action>, RegistryError> {
        lookup(&self.actions, Namespace::Actions, name)
    }

    pub fn lookup_agent(&self, name: &str) -> Result<Arc<dyn Agent>, RegistryError> {
        lookup(&self.agents, Namespace::Agents, name)
    }

    pub fn lookup_generator(&self, name: &str) -> Result<Arc<dyn Generator>, RegistryError> {
        lookup(&self.generators, Namespace::Generators, name)
    }

    pub fn lookup_context_builder(
        &self,
        name: &str,
    ) -> Result<Arc<dyn ContextBuilder>, RegistryError> {
        lookup(&self.context_builders, Namespace::ContextBuilders, name)
    }

    pub fn lookup_workflow(&self, name: &str) -> Result<WorkflowDocument, RegistryError> {
        lookup(&self.workflows, Namespace::Workflows, name)
    }

    pub fn has(&self, namespace: Namespace, name: &str) -> bool {
        match namespace {
            Namespace::Actions => self.actions.contains_key(name),
            Namespace::Agents => self.agents.contains_key(name),
            Namespace::Generators => self.generators.contains_key(name),
            Namespace::ContextBuilders => self.context_builders.contains_key(name),
            Namespace::Workflows => self.workflows.contains_key(name),
        }
    }

    pub fn workflow_names(&self) -> Vec<&str> {
        self.workflows.keys().map(String::as_str).collect()
    }
}

impl ComponentLookup for ComponentRegistry {
    fn has_component(&self, namespace: Namespace, name: &str) -> bool {
        self.has(namespace, name)
    }
}

fn insert_unique<V>(
    map: &mut BTreeMap<String, V>,
    namespace: Namespace,
    name: String,
    value: V,
) -> Result<(), RegistryError> {
    if map.contains_key(&name) {
        return Err(RegistryError::Duplicate { namespace, name });
    }
    map.insert(name, value);
    Ok(())
}

fn lookup<V: Clone>(
    map: &BTreeMap<String, V>,
    namespace: Namespace,
    name: &str,
) -> Result<V, RegistryError> {
    match map.get(name) {
        Some(value) => Ok(value.clone()),
        None => {
            let available: Vec<String> =
                map.keys().take(SUGGESTION_LIMIT).cloned().collect();
            let more = map.len().saturating_sub(available.len());
            Err(RegistryError::NotFound {
                namespace,
                name: name.to_string(),
                available,
                more,
            })
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
