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

use std::{fmt, str::FromStr};

use crate::error::{DataError, Error};

const DELIMITER: char = '.';

/// One physical table: `data_source_name.table_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataNode {
    pub data_source_name: String,
    pub table_name: String,
}

impl DataNode {
    pub fn new<D: Into<String>, T: Into<String>>(data_source_name: D, table_name: T) -> Self {
        DataNode { data_source_name: data_source_name.into(), table_name: table_name.into() }
    }

    pub fn parse(input: &str) -> Result<DataNode, Error> {
        let input = input.trim();
        let mut parts = input.split(DELIMITER);

        match (parts.next(), parts.next(), parts.next()) {
            (Some(ds), Some(table), None) if !ds.trim().is_empty() && !table.trim().is_empty() => {
                Ok(DataNode::new(ds.trim(), table.trim()))
            }
            _ => Err(DataError::MalformedDataNode(input.to_string()).into()),
        }
    }
}

impl FromStr for DataNode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataNode::parse(s)
    }
}

impl fmt::Display for DataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.data_source_name, DELIMITER, self.table_name)
    }
}
