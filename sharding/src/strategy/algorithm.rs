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

use std::fmt::Debug;

use indexmap::IndexMap;

use crate::{condition::ValueRange, error::Error, value::Value};

#[derive(Debug, Clone, PartialEq)]
pub struct PreciseShardingValue {
    pub logic_table: String,
    pub column: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeShardingValue {
    pub logic_table: String,
    pub column: String,
    pub range: ValueRange,
}

/// Input of a complex algorithm. `tuples` is the cartesian product of the list values of
/// `columns`, in column order. Range conditions are passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexShardingValue {
    pub logic_table: String,
    pub columns: Vec<String>,
    pub tuples: Vec<Vec<Value>>,
    pub ranges: IndexMap<String, ValueRange>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HintShardingValue {
    pub logic_table: String,
    pub values: Vec<Value>,
}

pub trait PreciseShardingAlgorithm: Debug + Send + Sync {
    fn do_sharding(&self, available: &[String], value: &PreciseShardingValue) -> Result<String, Error>;
}

pub trait RangeShardingAlgorithm: Debug + Send + Sync {
    fn do_sharding(&self, available: &[String], value: &RangeShardingValue) -> Result<Vec<String>, Error>;
}

pub trait ComplexKeysShardingAlgorithm: Debug + Send + Sync {
    fn do_sharding(&self, available: &[String], value: &ComplexShardingValue) -> Result<Vec<String>, Error>;
}

pub trait HintShardingAlgorithm: Debug + Send + Sync {
    fn do_sharding(&self, available: &[String], value: &HintShardingValue) -> Result<Vec<String>, Error>;
}
