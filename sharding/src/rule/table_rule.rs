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

use indexmap::IndexMap;

use super::DataNode;
use crate::strategy::ShardingStrategy;

/// Physical layout of one logic table.
#[derive(Debug, Clone)]
pub struct TableRule {
    pub logic_table: String,
    pub actual_data_nodes: Vec<DataNode>,
    pub database_strategy: Option<ShardingStrategy>,
    pub table_strategy: Option<ShardingStrategy>,
    pub key_generate_column: Option<String>,
    // data source -> actual tables, both in node order
    datasource_to_tables: IndexMap<String, Vec<String>>,
}

impl TableRule {
    pub fn new(
        logic_table: &str,
        actual_data_nodes: Vec<DataNode>,
        database_strategy: Option<ShardingStrategy>,
        table_strategy: Option<ShardingStrategy>,
        key_generate_column: Option<String>,
    ) -> Self {
        let mut datasource_to_tables: IndexMap<String, Vec<String>> = IndexMap::new();
        for node in actual_data_nodes.iter() {
            datasource_to_tables
                .entry(node.data_source_name.clone())
                .or_insert_with(Vec::new)
                .push(node.table_name.clone());
        }

        TableRule {
            logic_table: logic_table.to_string(),
            actual_data_nodes,
            database_strategy,
            table_strategy,
            key_generate_column,
            datasource_to_tables,
        }
    }

    /// The logic table itself in each of `data_sources`, as for broadcast and unsharded tables.
    pub fn from_data_sources<S: AsRef<str>>(logic_table: &str, data_sources: &[S]) -> Self {
        let nodes = data_sources.iter().map(|ds| DataNode::new(ds.as_ref(), logic_table)).collect();
        TableRule::new(logic_table, nodes, None, None, None)
    }

    pub fn data_source_names(&self) -> Vec<String> {
        self.datasource_to_tables.keys().cloned().collect()
    }

    pub fn actual_table_names(&self, data_source: &str) -> &[String] {
        self.datasource_to_tables.get(data_source).map(|tables| tables.as_slice()).unwrap_or(&[])
    }

    /// Position of `actual_table` among the actual tables of `data_source`.
    pub fn find_actual_table_index(&self, data_source: &str, actual_table: &str) -> Option<usize> {
        self.actual_table_names(data_source).iter().position(|t| t.eq_ignore_ascii_case(actual_table))
    }

    pub fn data_node_index(&self, node: &DataNode) -> Option<usize> {
        self.actual_data_nodes.iter().position(|n| n == node)
    }

    pub fn is_existed(&self, actual_table: &str) -> bool {
        self.actual_data_nodes.iter().any(|n| n.table_name.eq_ignore_ascii_case(actual_table))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rule::inline;

    fn t_order() -> TableRule {
        let nodes = inline::expand("ds${0..1}.t_order${0..1}")
            .unwrap()
            .iter()
            .map(|n| DataNode::parse(n).unwrap())
            .collect();
        TableRule::new("t_order", nodes, None, None, Some("order_id".to_string()))
    }

    #[test]
    fn test_data_source_tables() {
        let rule = t_order();
        assert_eq!(rule.data_source_names(), vec!["ds0", "ds1"]);
        assert_eq!(rule.actual_table_names("ds1"), &["t_order0".to_string(), "t_order1".to_string()]);
        assert!(rule.actual_table_names("ds9").is_empty());
        assert_eq!(rule.find_actual_table_index("ds1", "t_order1"), Some(1));
        assert_eq!(rule.data_node_index(&DataNode::new("ds1", "t_order0")), Some(2));
        assert!(rule.is_existed("T_ORDER0"));
    }

    #[test]
    fn test_from_data_sources() {
        let rule = TableRule::from_data_sources("t_config", &["ds0", "ds1"]);
        assert_eq!(rule.actual_data_nodes, vec![DataNode::new("ds0", "t_config"), DataNode::new("ds1", "t_config")]);
    }
}
