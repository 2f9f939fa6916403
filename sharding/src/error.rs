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

use std::io::Error as IoError;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ErrorKind {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("route error: {0}")]
    Route(#[from] RouteError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("parse config error: {0:?}")]
    Parse(#[from] toml::de::Error),

    #[error("stdio error: {0:?}")]
    Io(#[from] IoError),
}

#[derive(Debug, ThisError)]
#[error("{kind}")]
pub struct Error {
    kind: ErrorKind,
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl_error_from!(ConfigError, RouteError, DataError, toml::de::Error, IoError);

impl Error {
    pub fn new(kind: ErrorKind) -> Error {
        Error { kind }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

/// Rule set is unusable. Raised while loading configuration, never retried.
#[derive(Debug, ThisError, PartialEq)]
pub enum ConfigError {
    #[error("data sources cannot be empty")]
    EmptyDataSources,

    #[error("data source {0:?} is not configured")]
    UnknownDataSource(String),

    #[error("logic table {0:?} is configured more than once")]
    DuplicatedLogicTable(String),

    #[error("binding table {0:?} has no table rule")]
    BindingTableNotFound(String),

    #[error(
        "binding tables {primary:?} and {member:?} differ on data source {data_source:?}: expected {expected} actual tables, found {actual}"
    )]
    AsymmetricBindingTables {
        primary: String,
        member: String,
        data_source: String,
        expected: usize,
        actual: usize,
    },

    #[error("sharding strategy {strategy} does not support {count} sharding columns")]
    UnsupportedShardingColumns { strategy: &'static str, count: usize },

    #[error("sharding algorithm {0:?} is not registered")]
    AlgorithmNotRegistered(String),

    #[error("sharding algorithm {name:?} is missing property {prop:?}")]
    MissingAlgorithmProps { name: String, prop: &'static str },

    #[error("invalid props of sharding algorithm {name:?}: {reason}")]
    InvalidAlgorithmProps { name: String, reason: &'static str },

    #[error("key generator {0:?} is not registered")]
    KeyGeneratorNotRegistered(String),

    #[error("invalid key generator property {0}")]
    InvalidKeyGeneratorProps(String),

    #[error("no key generator for logic table {0:?}")]
    KeyGeneratorNotFound(String),

    #[error("invalid inline expression {0:?}")]
    InvalidInlineExpression(String),

    #[error("invalid read write splitting rule {0:?}")]
    InvalidReadWriteSplitting(String),
}

/// Statement can not be routed. Surfaced to the caller as a failed statement.
#[derive(Debug, ThisError, PartialEq)]
pub enum RouteError {
    #[error("algorithm of {logic_table:?} routed to {target:?} which is not in available targets")]
    InvalidAlgorithmOutput { logic_table: String, target: String },

    #[error("cannot find table rule and default data source with logic table {0:?}")]
    MissingTableRule(String),

    #[error("complex routing requires at least one sharding table")]
    ComplexWithoutTables,

    #[error("no common data source for tables {0:?}")]
    NoCommonDataSource(Vec<String>),

    #[error("range condition on {0:?} but no range algorithm configured")]
    RangeAlgorithmMissing(String),

    #[error("no {level} routed for logic table {logic_table:?}")]
    NoRouteTarget { level: &'static str, logic_table: String },

    #[error("sharding value {value} of {logic_table:?} matches no available target")]
    ShardingValueNotMatched { logic_table: String, value: String },
}

/// Statement data does not fit the rule set.
#[derive(Debug, ThisError, PartialEq)]
pub enum DataError {
    #[error("malformed data node {0:?}, expected `data_source.table`")]
    MalformedDataNode(String),

    #[error("generated key count {actual} does not match insert row count {expected}")]
    GeneratedKeyCountMismatch { expected: usize, actual: usize },

    #[error("insert into {0:?} has no column list to append the generated key column")]
    InsertColumnsMissing(String),

    #[error("parameter index {index} out of range, {len} parameters bound")]
    ParameterIndexOutOfRange { index: usize, len: usize },

    #[error("sharding value {0} is not numeric")]
    NonNumericShardingValue(String),

    #[error("pagination value {0} is not numeric")]
    NonNumericPagination(String),

    #[error("token [{start}, {end}) is outside of sql of length {len}")]
    InvalidTokenPosition { start: usize, end: usize, len: usize },

    #[error("clock moved backwards by {0} ms")]
    ClockMovedBackwards(i64),
}
