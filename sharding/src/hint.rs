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

use crate::value::Value;

/// Sharding values supplied out of band for one session, read by hint strategies.
#[derive(Debug, Clone, Default)]
pub struct HintManager {
    database_values: IndexMap<String, Vec<Value>>,
    table_values: IndexMap<String, Vec<Value>>,
    master_route_only: bool,
}

impl HintManager {
    pub fn new() -> Self {
        HintManager::default()
    }

    pub fn add_database_sharding_value<V: Into<Value>>(&mut self, logic_table: &str, value: V) {
        self.database_values.entry(logic_table.to_lowercase()).or_insert_with(Vec::new).push(value.into());
    }

    pub fn add_table_sharding_value<V: Into<Value>>(&mut self, logic_table: &str, value: V) {
        self.table_values.entry(logic_table.to_lowercase()).or_insert_with(Vec::new).push(value.into());
    }

    pub fn database_sharding_values(&self, logic_table: &str) -> &[Value] {
        self.database_values.get(&logic_table.to_lowercase()).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn table_sharding_values(&self, logic_table: &str) -> &[Value] {
        self.table_values.get(&logic_table.to_lowercase()).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn set_master_route_only(&mut self) {
        self.master_route_only = true;
    }

    pub fn is_master_route_only(&self) -> bool {
        self.master_route_only
    }

    pub fn clear(&mut self) {
        self.database_values.clear();
        self.table_values.clear();
        self.master_route_only = false;
    }
}
