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

//! Sharding core: maps a parsed statement over logic tables onto data sources and actual
//! tables, and rewrites the SQL for each of them.

#[macro_use]
mod macros;

pub mod condition;
pub mod config;
pub mod error;
pub mod hint;
pub mod keygen;
pub mod readwritesplitting;
pub mod rewrite;
pub mod route;
pub mod router;
pub mod rule;
pub mod session;
pub mod statement;
pub mod strategy;
pub mod value;

#[cfg(test)]
mod test_util;

pub use error::{Error, ErrorKind};
pub use router::{ShardingRouter, SqlRouteResult};
