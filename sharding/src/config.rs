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

use std::{fs::File, io::Read, path::Path};

use indexmap::IndexMap;
use loadbalance::balance::AlgorithmName;
use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ShardingRuleConfig {
    #[serde(default)]
    pub data_sources: Vec<DataSourceConfig>,
    pub default_data_source: Option<String>,
    #[serde(default, rename = "table")]
    pub tables: Vec<TableRuleConfig>,
    /// Each entry is a comma separated group, e.g. `"t_order, t_order_item"`.
    #[serde(default)]
    pub binding_tables: Vec<String>,
    #[serde(default)]
    pub broadcast_tables: Vec<String>,
    pub default_database_strategy: Option<ShardingStrategyConfig>,
    pub default_table_strategy: Option<ShardingStrategyConfig>,
    pub default_key_generator: Option<KeyGeneratorConfig>,
    #[serde(default)]
    pub sharding_algorithms: IndexMap<String, ShardingAlgorithmConfig>,
    #[serde(default)]
    pub read_write_splitting: Vec<ReadWriteSplittingConfig>,
    #[serde(default)]
    pub props: PropsConfig,
}

impl ShardingRuleConfig {
    pub fn from_toml_str(input: &str) -> Result<ShardingRuleConfig, Error> {
        Ok(toml::from_str(input)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ShardingRuleConfig, Error> {
        let mut file = File::open(path)?;
        let mut config_str = String::new();
        file.read_to_string(&mut config_str)?;
        ShardingRuleConfig::from_toml_str(&config_str)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DataSourceConfig {
    pub name: String,
    /// Physical instance identity, data sources sharing it are one instance.
    pub instance: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TableRuleConfig {
    pub logic_table: String,
    pub actual_data_nodes: Option<String>,
    pub database_strategy: Option<ShardingStrategyConfig>,
    pub table_strategy: Option<ShardingStrategyConfig>,
    pub key_generator: Option<KeyGeneratorConfig>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShardingStrategyConfig {
    None,
    Standard {
        sharding_column: String,
        precise_algorithm_name: String,
        range_algorithm_name: Option<String>,
    },
    Complex {
        sharding_columns: String,
        algorithm_name: String,
    },
    Hint {
        algorithm_name: String,
    },
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShardingAlgorithmType {
    Mod,
    HashMod,
    VolumeRange,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ShardingAlgorithmConfig {
    #[serde(rename = "type")]
    pub algorithm_type: ShardingAlgorithmType,
    #[serde(default)]
    pub props: AlgorithmProps,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct AlgorithmProps {
    pub sharding_count: Option<u64>,
    pub range_lower: Option<i64>,
    pub range_upper: Option<i64>,
    pub sharding_volume: Option<i64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct KeyGeneratorConfig {
    pub column: String,
    /// `snowflake`, `increment` or the name of a registered generator.
    #[serde(rename = "type")]
    pub generator_type: String,
    #[serde(default)]
    pub props: KeyGeneratorProps,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct KeyGeneratorProps {
    pub worker_id: Option<u64>,
    pub max_tolerate_time_difference_milliseconds: Option<i64>,
    pub initial_value: Option<i64>,
    pub step: Option<i64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReadWriteSplittingConfig {
    pub name: String,
    pub master_data_source_name: String,
    pub slave_data_source_names: Vec<String>,
    #[serde(default)]
    pub load_balance_algorithm: AlgorithmName,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct PropsConfig {
    #[serde(default)]
    pub sql_show: bool,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;

    const CONFIG: &str = r#"
default_data_source = "ds0"
binding_tables = ["t_order, t_order_item"]
broadcast_tables = ["t_config"]
default_database_strategy = { type = "standard", sharding_column = "user_id", precise_algorithm_name = "ds_mod" }

[[data_sources]]
name = "ds0"
instance = "127.0.0.1:3306"

[[data_sources]]
name = "ds1"

[[table]]
logic_table = "t_order"
actual_data_nodes = "ds${0..1}.t_order${0..1}"
table_strategy = { type = "standard", sharding_column = "order_id", precise_algorithm_name = "t_mod", range_algorithm_name = "t_mod" }
key_generator = { column = "order_id", type = "snowflake", props = { worker_id = 7 } }

[[table]]
logic_table = "t_user"
database_strategy = { type = "none" }
table_strategy = { type = "hint", algorithm_name = "t_mod" }

[sharding_algorithms.ds_mod]
type = "mod"
props = { sharding_count = 2 }

[sharding_algorithms.t_mod]
type = "hash_mod"
props = { sharding_count = 2 }

[[read_write_splitting]]
name = "ds1"
master_data_source_name = "ds1_master"
slave_data_source_names = ["ds1_slave0", "ds1_slave1"]
load_balance_algorithm = "random"

[props]
sql_show = true
"#;

    #[test]
    fn test_parse_config() {
        let config = ShardingRuleConfig::from_toml_str(CONFIG).unwrap();

        assert_eq!(config.data_sources.len(), 2);
        assert_eq!(config.data_sources[0].instance.as_deref(), Some("127.0.0.1:3306"));
        assert_eq!(config.default_data_source.as_deref(), Some("ds0"));
        assert_eq!(config.tables.len(), 2);
        assert_eq!(config.tables[0].key_generator.as_ref().unwrap().props.worker_id, Some(7));
        assert_eq!(config.tables[1].database_strategy, Some(ShardingStrategyConfig::None));
        assert_eq!(
            config.tables[1].table_strategy,
            Some(ShardingStrategyConfig::Hint { algorithm_name: "t_mod".to_string() })
        );
        assert_eq!(config.sharding_algorithms["t_mod"].algorithm_type, ShardingAlgorithmType::HashMod);
        assert_eq!(config.sharding_algorithms["ds_mod"].props.sharding_count, Some(2));
        assert_eq!(config.read_write_splitting[0].load_balance_algorithm, AlgorithmName::Random);
        assert!(config.props.sql_show);
    }

    #[test]
    fn test_parse_config_error() {
        let err = ShardingRuleConfig::from_toml_str("[[table]]\nlogic_table = 1").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Parse(_)));

        let err = ShardingRuleConfig::from_file("/nonexistent/sharding.toml").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Io(_)));
    }
}
