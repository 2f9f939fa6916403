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

use crate::{config::ShardingRuleConfig, rule::ShardingRule, strategy::AlgorithmRegistry};

pub(crate) const ORDER_CONFIG: &str = r#"
default_data_source = "ds0"
binding_tables = ["t_order, t_order_item"]
broadcast_tables = ["t_config"]

[[data_sources]]
name = "ds0"

[[data_sources]]
name = "ds1"

[[table]]
logic_table = "t_order"
actual_data_nodes = "ds${0..1}.t_order${0..1}"
database_strategy = { type = "standard", sharding_column = "order_id", precise_algorithm_name = "mod2", range_algorithm_name = "mod2" }
table_strategy = { type = "standard", sharding_column = "order_id", precise_algorithm_name = "mod2", range_algorithm_name = "mod2" }
key_generator = { column = "order_id", type = "increment" }

[[table]]
logic_table = "t_order_item"
actual_data_nodes = "ds${0..1}.t_order_item${0..1}"
database_strategy = { type = "standard", sharding_column = "order_id", precise_algorithm_name = "mod2" }
table_strategy = { type = "standard", sharding_column = "order_id", precise_algorithm_name = "mod2" }

[[table]]
logic_table = "t_user"
actual_data_nodes = "ds${0..1}.t_user${0..1}"
database_strategy = { type = "standard", sharding_column = "user_id", precise_algorithm_name = "mod2" }
table_strategy = { type = "standard", sharding_column = "user_id", precise_algorithm_name = "mod2" }

[sharding_algorithms.mod2]
type = "mod"
props = { sharding_count = 2 }
"#;

pub(crate) fn rule_of(config: &str) -> ShardingRule {
    let config = ShardingRuleConfig::from_toml_str(config).unwrap();
    ShardingRule::new(&config, &AlgorithmRegistry::new()).unwrap()
}

pub(crate) fn order_rule() -> ShardingRule {
    rule_of(ORDER_CONFIG)
}
