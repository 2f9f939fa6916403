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

mod broadcast;
mod complex;
mod engine;
mod factory;
mod standard;
mod unicast;

pub use engine::RoutingEngine;
pub use factory::RoutingEngineFactory;

use crate::rule::DataNode;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingTable {
    pub logic_table_name: String,
    pub actual_table_name: String,
}

impl RoutingTable {
    pub fn new<L: Into<String>, A: Into<String>>(logic_table_name: L, actual_table_name: A) -> Self {
        RoutingTable { logic_table_name: logic_table_name.into(), actual_table_name: actual_table_name.into() }
    }
}

/// One execution target: a data source and the actual tables the statement touches there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableUnit {
    pub data_source_name: String,
    pub routing_tables: Vec<RoutingTable>,
}

impl TableUnit {
    pub fn new<S: Into<String>>(data_source_name: S) -> Self {
        TableUnit { data_source_name: data_source_name.into(), routing_tables: vec![] }
    }

    pub fn with_tables<S: Into<String>>(data_source_name: S, routing_tables: Vec<RoutingTable>) -> Self {
        TableUnit { data_source_name: data_source_name.into(), routing_tables }
    }

    pub fn actual_table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = vec![];
        for t in self.routing_tables.iter() {
            if !names.contains(&t.actual_table_name.as_str()) {
                names.push(&t.actual_table_name);
            }
        }
        names
    }

    pub fn find_actual_table(&self, logic_table: &str) -> Option<&str> {
        self.routing_tables
            .iter()
            .find(|t| t.logic_table_name.eq_ignore_ascii_case(logic_table))
            .map(|t| t.actual_table_name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingResult {
    pub table_units: Vec<TableUnit>,
    /// Data nodes reached by each condition group of a standard route, in group order. For an
    /// INSERT these are the nodes of each VALUES row.
    pub group_data_nodes: Vec<Vec<DataNode>>,
}

impl RoutingResult {
    pub fn new(table_units: Vec<TableUnit>) -> Self {
        RoutingResult { table_units, group_data_nodes: vec![] }
    }

    pub fn is_single_routing(&self) -> bool {
        self.table_units.len() == 1
    }

    pub fn is_empty(&self) -> bool {
        self.table_units.is_empty()
    }

    pub fn data_source_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = vec![];
        for unit in self.table_units.iter() {
            if !names.contains(&unit.data_source_name.as_str()) {
                names.push(&unit.data_source_name);
            }
        }
        names
    }

    pub fn table_units_of(&self, data_source: &str) -> Vec<&TableUnit> {
        self.table_units.iter().filter(|u| u.data_source_name == data_source).collect()
    }

    /// Flattened `ds.table` pairs of every unit, handy when logging.
    pub fn data_nodes(&self) -> Vec<DataNode> {
        self.table_units
            .iter()
            .flat_map(|u| {
                u.routing_tables.iter().map(move |t| DataNode::new(u.data_source_name.as_str(), t.actual_table_name.as_str()))
            })
            .collect()
    }
}
