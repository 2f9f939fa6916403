// Copyright 2022 SphereEx Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{borrow::Cow, sync::Arc};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use super::{inline, BindingTableRule, DataNode, TableRule};
use crate::{
    config::{KeyGeneratorConfig, PropsConfig, ShardingRuleConfig, ShardingStrategyConfig},
    error::{ConfigError, Error, RouteError},
    keygen::ShardingKeyGenerator,
    readwritesplitting::ReadWriteSplittingRule,
    strategy::{AlgorithmRegistry, ShardingStrategy},
    value::Value,
};

static NONE_STRATEGY: ShardingStrategy = ShardingStrategy::None;

/// How a logic table referenced by a statement is routed.
#[derive(Debug, Clone, Copy)]
pub enum TableResolution<'a> {
    Sharded(&'a TableRule),
    Broadcast,
    Unsharded,
}

#[derive(Debug, Clone)]
struct KeyGenerateRule {
    column: String,
    generator: Arc<dyn ShardingKeyGenerator>,
}

/// The whole rule set. Built once from configuration and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct ShardingRule {
    data_source_names: Vec<String>,
    instances: IndexMap<String, String>,
    default_data_source: Option<String>,
    table_rules: Vec<TableRule>,
    binding_rules: Vec<BindingTableRule>,
    broadcast_tables: IndexSet<String>,
    default_database_strategy: Option<ShardingStrategy>,
    default_table_strategy: Option<ShardingStrategy>,
    key_generators: IndexMap<String, KeyGenerateRule>,
    rw_rules: Vec<ReadWriteSplittingRule>,
    props: PropsConfig,
}

impl ShardingRule {
    pub fn new(config: &ShardingRuleConfig, registry: &AlgorithmRegistry) -> Result<ShardingRule, Error> {
        if config.data_sources.is_empty() {
            return Err(ConfigError::EmptyDataSources.into());
        }

        let mut data_source_names: Vec<String> = vec![];
        let mut instances = IndexMap::new();
        for ds in config.data_sources.iter() {
            if !data_source_names.contains(&ds.name) {
                data_source_names.push(ds.name.clone());
                instances.insert(ds.name.clone(), ds.instance.clone().unwrap_or_else(|| ds.name.clone()));
            }
        }

        let default_data_source = match &config.default_data_source {
            Some(ds) if !data_source_names.contains(ds) => {
                return Err(ConfigError::UnknownDataSource(ds.clone()).into())
            }
            Some(ds) => Some(ds.clone()),
            None if data_source_names.len() == 1 => data_source_names.first().cloned(),
            None => None,
        };

        let algorithms = &config.sharding_algorithms;
        let build_strategy = |strategy: &Option<ShardingStrategyConfig>| -> Result<Option<ShardingStrategy>, Error> {
            strategy.as_ref().map(|s| ShardingStrategy::from_config(s, registry, algorithms)).transpose()
        };

        let default_key_generator = match &config.default_key_generator {
            Some(kg) => Some(key_generate_rule(kg, registry)?),
            None => None,
        };

        let mut table_rules: Vec<TableRule> = vec![];
        let mut key_generators = IndexMap::new();
        for table in config.tables.iter() {
            if table_rules.iter().any(|r| r.logic_table.eq_ignore_ascii_case(&table.logic_table)) {
                return Err(ConfigError::DuplicatedLogicTable(table.logic_table.clone()).into());
            }

            let nodes = match &table.actual_data_nodes {
                Some(expr) => {
                    let mut nodes = vec![];
                    for each in inline::expand(expr)? {
                        let node = DataNode::parse(&each)?;
                        if !data_source_names.contains(&node.data_source_name) {
                            return Err(ConfigError::UnknownDataSource(node.data_source_name).into());
                        }
                        nodes.push(node);
                    }
                    nodes
                }
                None => data_source_names.iter().map(|ds| DataNode::new(ds.as_str(), table.logic_table.as_str())).collect(),
            };

            let key_rule = match &table.key_generator {
                Some(kg) => Some(key_generate_rule(kg, registry)?),
                None => default_key_generator.clone(),
            };
            if let Some(key_rule) = key_rule.as_ref() {
                key_generators.insert(table.logic_table.to_lowercase(), key_rule.clone());
            }

            table_rules.push(TableRule::new(
                &table.logic_table,
                nodes,
                build_strategy(&table.database_strategy)?,
                build_strategy(&table.table_strategy)?,
                key_rule.map(|k| k.column),
            ));
        }

        let mut binding_rules = vec![];
        for group in config.binding_tables.iter() {
            let mut members = vec![];
            for name in group.split(',').map(|n| n.trim()).filter(|n| !n.is_empty()) {
                let rule = table_rules
                    .iter()
                    .find(|r| r.logic_table.eq_ignore_ascii_case(name))
                    .ok_or_else(|| ConfigError::BindingTableNotFound(name.to_string()))?;
                members.push(rule.clone());
            }
            binding_rules.push(BindingTableRule::new(members)?);
        }

        let mut rw_rules = vec![];
        for rw in config.read_write_splitting.iter() {
            if !data_source_names.contains(&rw.name) {
                return Err(ConfigError::InvalidReadWriteSplitting(rw.name.clone()).into());
            }
            rw_rules.push(ReadWriteSplittingRule::from_config(rw)?);
        }

        let rule = ShardingRule {
            data_source_names,
            instances,
            default_data_source,
            table_rules,
            binding_rules,
            broadcast_tables: config.broadcast_tables.iter().map(|t| t.trim().to_lowercase()).collect(),
            default_database_strategy: build_strategy(&config.default_database_strategy)?,
            default_table_strategy: build_strategy(&config.default_table_strategy)?,
            key_generators,
            rw_rules,
            props: config.props.clone(),
        };

        debug!(
            "sharding rule loaded, data sources {:?}, tables {:?}",
            rule.data_source_names,
            rule.table_rules.iter().map(|r| r.logic_table.as_str()).collect::<Vec<_>>()
        );
        Ok(rule)
    }

    pub fn data_source_names(&self) -> &[String] {
        &self.data_source_names
    }

    pub fn instance_of<'a>(&'a self, data_source: &'a str) -> &'a str {
        self.instances.get(data_source).map_or(data_source, |i| i.as_str())
    }

    pub fn default_data_source(&self) -> Option<&str> {
        self.default_data_source.as_deref()
    }

    pub fn table_rules(&self) -> &[TableRule] {
        &self.table_rules
    }

    pub fn binding_rules(&self) -> &[BindingTableRule] {
        &self.binding_rules
    }

    pub fn rw_rules(&self) -> &[ReadWriteSplittingRule] {
        &self.rw_rules
    }

    pub fn sql_show(&self) -> bool {
        self.props.sql_show
    }

    pub fn find_table_rule(&self, logic_table: &str) -> Option<&TableRule> {
        self.table_rules.iter().find(|r| r.logic_table.eq_ignore_ascii_case(logic_table))
    }

    pub fn find_binding_rule(&self, logic_table: &str) -> Option<&BindingTableRule> {
        self.binding_rules.iter().find(|b| b.has_logic_table(logic_table))
    }

    pub fn is_broadcast_table(&self, logic_table: &str) -> bool {
        self.broadcast_tables.contains(&logic_table.to_lowercase())
    }

    pub fn resolve(&self, logic_table: &str) -> TableResolution<'_> {
        match self.find_table_rule(logic_table) {
            Some(rule) => TableResolution::Sharded(rule),
            None if self.is_broadcast_table(logic_table) => TableResolution::Broadcast,
            None => TableResolution::Unsharded,
        }
    }

    /// Table rule of `logic_table`, synthesized for broadcast tables and for tables living in
    /// the default data source.
    pub fn table_rule(&self, logic_table: &str) -> Result<Cow<'_, TableRule>, Error> {
        match self.resolve(logic_table) {
            TableResolution::Sharded(rule) => Ok(Cow::Borrowed(rule)),
            TableResolution::Broadcast => {
                Ok(Cow::Owned(TableRule::from_data_sources(logic_table, self.data_source_names.as_slice())))
            }
            TableResolution::Unsharded => match &self.default_data_source {
                Some(ds) => Ok(Cow::Owned(TableRule::from_data_sources(logic_table, &[ds]))),
                None => Err(RouteError::MissingTableRule(logic_table.to_string()).into()),
            },
        }
    }

    pub fn database_strategy<'a>(&'a self, rule: &'a TableRule) -> &'a ShardingStrategy {
        rule.database_strategy.as_ref().or(self.default_database_strategy.as_ref()).unwrap_or(&NONE_STRATEGY)
    }

    pub fn table_strategy<'a>(&'a self, rule: &'a TableRule) -> &'a ShardingStrategy {
        rule.table_strategy.as_ref().or(self.default_table_strategy.as_ref()).unwrap_or(&NONE_STRATEGY)
    }

    /// Sharded tables among `logic_tables`, in statement order.
    pub fn sharding_logic_tables<'a>(&self, logic_tables: &[&'a str]) -> Vec<&'a str> {
        logic_tables.iter().filter(|t| self.find_table_rule(t).is_some()).copied().collect()
    }

    pub fn is_all_binding_tables(&self, logic_tables: &[&str]) -> bool {
        match logic_tables.first().and_then(|t| self.find_binding_rule(t)) {
            Some(binding) => logic_tables.iter().all(|t| binding.has_logic_table(t)),
            None => false,
        }
    }

    pub fn is_all_broadcast_tables(&self, logic_tables: &[&str]) -> bool {
        !logic_tables.is_empty() && logic_tables.iter().all(|t| self.is_broadcast_table(t))
    }

    /// True when no table is sharded, at least one is not broadcast, and a default data source
    /// exists to hold them.
    pub fn is_all_in_default_data_source(&self, logic_tables: &[&str]) -> bool {
        self.default_data_source.is_some()
            && logic_tables.iter().all(|t| self.find_table_rule(t).is_none())
            && logic_tables.iter().any(|t| !self.is_broadcast_table(t))
    }

    pub fn is_sharding_column(&self, column: &str, logic_table: &str) -> bool {
        match self.find_table_rule(logic_table) {
            Some(rule) => self
                .database_strategy(rule)
                .sharding_columns()
                .into_iter()
                .chain(self.table_strategy(rule).sharding_columns())
                .any(|c| c.eq_ignore_ascii_case(column)),
            None => false,
        }
    }

    pub fn key_generate_column(&self, logic_table: &str) -> Option<&str> {
        self.key_generators.get(&logic_table.to_lowercase()).map(|k| k.column.as_str())
    }

    pub fn generate_key(&self, logic_table: &str) -> Result<Value, Error> {
        match self.key_generators.get(&logic_table.to_lowercase()) {
            Some(rule) => rule.generator.generate_key(logic_table),
            None => Err(ConfigError::KeyGeneratorNotFound(logic_table.to_string()).into()),
        }
    }

    pub fn find_rw_rule(&self, data_source: &str) -> Option<&ReadWriteSplittingRule> {
        self.rw_rules.iter().find(|r| r.name == data_source)
    }
}

fn key_generate_rule(config: &KeyGeneratorConfig, registry: &AlgorithmRegistry) -> Result<KeyGenerateRule, Error> {
    Ok(KeyGenerateRule { column: config.column.clone(), generator: registry.key_generator(config)? })
}
