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

mod builder;

pub use builder::SqlBuilder;
use tracing::debug;

use crate::{
    error::{DataError, Error},
    keygen::GeneratedKey,
    route::{RoutingResult, TableUnit},
    rule::DataNode,
    statement::{InsertContext, InsertValueExpr, PaginationValue, SqlStatementContext},
    value::Value,
};

/// One statement ready for execution on one data source.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteUnit {
    pub data_source_name: String,
    pub sql: String,
    pub parameters: Vec<Value>,
}

#[derive(Debug)]
enum RewriteToken {
    Table { logic_table: String },
    Text(String),
    InsertValues,
}

#[derive(Debug)]
struct PositionedToken {
    start: usize,
    end: usize,
    token: RewriteToken,
}

pub struct SqlRewriteEngine<'a> {
    statement: &'a SqlStatementContext,
    parameters: &'a [Value],
    generated_key: Option<&'a GeneratedKey>,
}

impl<'a> SqlRewriteEngine<'a> {
    pub fn new(
        statement: &'a SqlStatementContext,
        parameters: &'a [Value],
        generated_key: Option<&'a GeneratedKey>,
    ) -> Self {
        SqlRewriteEngine { statement, parameters, generated_key }
    }

    fn appended_key(&self) -> Option<&'a GeneratedKey> {
        self.generated_key.filter(|k| k.generated)
    }

    fn parameter(&self, index: usize) -> Result<&'a Value, Error> {
        self.parameters
            .get(index)
            .ok_or_else(|| DataError::ParameterIndexOutOfRange { index, len: self.parameters.len() }.into())
    }

    /// Splits the SQL at its rewrite points. Pagination is widened unless the statement is
    /// routed to a single unit.
    pub fn rewrite(&self, is_single_routing: bool) -> Result<SqlBuilder, Error> {
        let sql = self.statement.sql.as_str();
        let mut parameters = self.parameters.to_vec();
        let mut tokens = vec![];

        for t in self.statement.table_tokens.iter() {
            tokens.push(PositionedToken {
                start: t.start,
                end: t.end,
                token: RewriteToken::Table { logic_table: t.table_name.clone() },
            });
        }

        if !is_single_routing {
            self.rewrite_pagination(&mut tokens, &mut parameters)?;
        }

        if let Some(insert) = &self.statement.insert {
            if let (Some(key), Some(columns_end)) = (self.appended_key(), insert.columns_end) {
                tokens.push(PositionedToken {
                    start: columns_end,
                    end: columns_end,
                    token: RewriteToken::Text(format!(", {}", key.column.name)),
                });
            }
            if let (Some(first), Some(last)) = (insert.rows.first(), insert.rows.last()) {
                tokens.push(PositionedToken { start: first.start, end: last.end, token: RewriteToken::InsertValues });
            }
        }

        tokens.sort_by_key(|t| (t.start, t.end));

        let mut builder = SqlBuilder::new(parameters);
        let mut cursor = 0;
        for t in tokens.iter() {
            let invalid = t.start < cursor
                || t.end < t.start
                || !sql.is_char_boundary(t.start)
                || !sql.is_char_boundary(t.end);
            if invalid {
                return Err(DataError::InvalidTokenPosition { start: t.start, end: t.end, len: sql.len() }.into());
            }

            builder.append_literal(&sql[cursor..t.start]);
            match &t.token {
                RewriteToken::Table { logic_table } => builder.append_table(logic_table, &sql[t.start..t.end]),
                RewriteToken::Text(text) => builder.append_literal(text),
                RewriteToken::InsertValues => builder.append_insert_values(),
            }
            cursor = t.end;
        }
        builder.append_literal(&sql[cursor..]);

        Ok(builder)
    }

    fn rewrite_pagination(&self, tokens: &mut Vec<PositionedToken>, parameters: &mut [Value]) -> Result<(), Error> {
        let select = match &self.statement.select {
            Some(select) => select,
            None => return Ok(()),
        };
        let pagination = match &select.pagination {
            Some(pagination) => pagination,
            None => return Ok(()),
        };

        let offset = match &pagination.offset {
            Some(value) => self.pagination_value(value)?,
            None => 0,
        };

        // every shard returns the first offset + row_count rows, the merger skips offset
        match &pagination.offset {
            Some(PaginationValue::Literal { start, end, .. }) => {
                tokens.push(PositionedToken { start: *start, end: *end, token: RewriteToken::Text("0".to_string()) })
            }
            Some(PaginationValue::Parameter { index }) => parameters[*index] = Value::Int(0),
            None => {}
        }

        if let Some(row_count) = &pagination.row_count {
            let fetch_all = (select.has_aggregation || select.has_group_by) && !select.group_by_aligned_with_order_by;
            let rewritten = if fetch_all {
                i32::MAX as i64
            } else {
                offset.saturating_add(self.pagination_value(row_count)?)
            };

            match row_count {
                PaginationValue::Literal { start, end, .. } => tokens.push(PositionedToken {
                    start: *start,
                    end: *end,
                    token: RewriteToken::Text(rewritten.to_string()),
                }),
                PaginationValue::Parameter { index } => {
                    self.parameter(*index)?;
                    parameters[*index] = Value::Int(rewritten);
                }
            }
        }

        Ok(())
    }

    fn pagination_value(&self, value: &PaginationValue) -> Result<i64, Error> {
        match value {
            PaginationValue::Literal { value, .. } => Ok(*value),
            PaginationValue::Parameter { index } => {
                let param = self.parameter(*index)?;
                param.as_i64().ok_or_else(|| DataError::NonNumericPagination(param.to_string()).into())
            }
        }
    }

    /// SQL and parameters of one unit.
    pub fn generate_sql(
        &self,
        builder: &SqlBuilder,
        unit: &TableUnit,
        routing_result: &RoutingResult,
    ) -> Result<RouteUnit, Error> {
        let (sql, parameters) = match &self.statement.insert {
            Some(insert) if builder.has_insert_values() => {
                let rows = self.unit_rows(insert, unit, routing_result);
                let values = self.insert_values(insert, &rows)?;
                (builder.to_sql(Some(unit), &values), self.insert_parameters(builder, insert, &rows)?)
            }
            _ => (builder.to_sql(Some(unit), ""), builder.parameters().to_vec()),
        };

        Ok(RouteUnit { data_source_name: unit.data_source_name.clone(), sql, parameters })
    }

    pub fn rewrite_all(&self, routing_result: &RoutingResult) -> Result<Vec<RouteUnit>, Error> {
        let builder = self.rewrite(routing_result.is_single_routing())?;
        let mut units = Vec::with_capacity(routing_result.table_units.len());
        for unit in routing_result.table_units.iter() {
            let route_unit = self.generate_sql(&builder, unit, routing_result)?;
            debug!("rewrite {} => {}: {}", self.statement.sql, route_unit.data_source_name, route_unit.sql);
            units.push(route_unit);
        }
        Ok(units)
    }

    // Rows of an INSERT that land on `unit`, every row when the routing does not tell.
    fn unit_rows(&self, insert: &InsertContext, unit: &TableUnit, routing_result: &RoutingResult) -> Vec<usize> {
        let all = (0..insert.rows.len()).collect();
        if routing_result.group_data_nodes.len() != insert.rows.len() {
            return all;
        }

        match unit.find_actual_table(&insert.table) {
            Some(actual) => {
                let node = DataNode::new(unit.data_source_name.as_str(), actual);
                (0..insert.rows.len()).filter(|r| routing_result.group_data_nodes[*r].contains(&node)).collect()
            }
            None => all,
        }
    }

    fn key_of_row(&self, row: usize) -> Result<Option<&'a Value>, Error> {
        match self.appended_key() {
            Some(key) => key.values.get(row).map(Some).ok_or_else(|| {
                DataError::GeneratedKeyCountMismatch { expected: row + 1, actual: key.values.len() }.into()
            }),
            None => Ok(None),
        }
    }

    fn insert_values(&self, insert: &InsertContext, rows: &[usize]) -> Result<String, Error> {
        let sql = self.statement.sql.as_str();
        let mut values = Vec::with_capacity(rows.len());

        for r in rows.iter() {
            let row = &insert.rows[*r];
            let text = sql.get(row.start..row.end).ok_or(DataError::InvalidTokenPosition {
                start: row.start,
                end: row.end,
                len: sql.len(),
            })?;

            match (self.key_of_row(*r)?, text.rfind(')')) {
                (Some(key), Some(close)) => {
                    let key = if row.has_parameter() { "?".to_string() } else { key.to_string() };
                    values.push(format!("{}, {}{}", &text[..close], key, &text[close..]));
                }
                _ => values.push(text.to_string()),
            }
        }

        Ok(values.join(", "))
    }

    fn insert_parameters(
        &self,
        builder: &SqlBuilder,
        insert: &InsertContext,
        rows: &[usize],
    ) -> Result<Vec<Value>, Error> {
        let base = builder.parameters();
        let first_row_param = insert.rows.iter().flat_map(|r| r.parameter_indexes()).min();
        let in_rows = |idx: usize| insert.rows.iter().any(|r| r.values.contains(&InsertValueExpr::Parameter(idx)));

        let mut parameters = vec![];
        let mut suffix = vec![];
        for (idx, value) in base.iter().enumerate() {
            if in_rows(idx) {
                continue;
            }
            match first_row_param {
                Some(first) if idx > first => suffix.push(value.clone()),
                _ => parameters.push(value.clone()),
            }
        }

        for r in rows.iter() {
            let row = &insert.rows[*r];
            for idx in row.parameter_indexes() {
                let value = base
                    .get(idx)
                    .ok_or(DataError::ParameterIndexOutOfRange { index: idx, len: base.len() })?;
                parameters.push(value.clone());
            }
            if let Some(key) = self.key_of_row(*r)? {
                if row.has_parameter() {
                    parameters.push(key.clone());
                }
            }
        }

        parameters.extend(suffix);
        Ok(parameters)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        condition::Column,
        route::RoutingTable,
        statement::{InsertRow, Pagination, SelectContext, StatementKind},
    };

    fn order_units() -> RoutingResult {
        RoutingResult::new(vec![
            TableUnit::with_tables("ds0", vec![RoutingTable::new("t_order", "t_order0")]),
            TableUnit::with_tables("ds1", vec![RoutingTable::new("t_order", "t_order1")]),
        ])
    }

    fn literal(sql: &str, text: &str, value: i64) -> PaginationValue {
        let start = sql.rfind(text).unwrap();
        PaginationValue::Literal { value, start, end: start + text.len() }
    }

    #[test]
    fn test_rewrite_table_and_pagination() {
        let sql = "SELECT * FROM `t_order` WHERE user_id = ? LIMIT 2, 3";
        let select = SelectContext {
            pagination: Some(Pagination {
                offset: Some(literal(sql, "2", 2)),
                row_count: Some(literal(sql, "3", 3)),
            }),
            ..Default::default()
        };
        let statement = SqlStatementContext::new(sql, StatementKind::Select)
            .with_table_tokens_of("t_order")
            .with_select(select);
        let params = vec![Value::Int(7)];
        let engine = SqlRewriteEngine::new(&statement, &params, None);

        let units = engine.rewrite_all(&order_units()).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].data_source_name, "ds0");
        assert_eq!(units[0].sql, "SELECT * FROM `t_order0` WHERE user_id = ? LIMIT 0, 5");
        assert_eq!(units[1].sql, "SELECT * FROM `t_order1` WHERE user_id = ? LIMIT 0, 5");
        assert_eq!(units[1].parameters, vec![Value::Int(7)]);

        let single = RoutingResult::new(vec![TableUnit::with_tables(
            "ds1",
            vec![RoutingTable::new("t_order", "t_order1")],
        )]);
        let units = engine.rewrite_all(&single).unwrap();
        assert_eq!(units[0].sql, "SELECT * FROM `t_order1` WHERE user_id = ? LIMIT 2, 3");
    }

    #[test]
    fn test_rewrite_pagination_parameters() {
        let sql = "SELECT user_id, count(*) FROM t_order GROUP BY user_id LIMIT ? OFFSET ?";
        let select = SelectContext {
            pagination: Some(Pagination {
                offset: Some(PaginationValue::Parameter { index: 1 }),
                row_count: Some(PaginationValue::Parameter { index: 0 }),
            }),
            has_aggregation: true,
            has_group_by: true,
            group_by_aligned_with_order_by: false,
        };
        let statement = SqlStatementContext::new(sql, StatementKind::Select)
            .with_table_tokens_of("t_order")
            .with_select(select);
        let params = vec![Value::Int(10), Value::Int(20)];
        let units = SqlRewriteEngine::new(&statement, &params, None).rewrite_all(&order_units()).unwrap();
        assert_eq!(units[0].parameters, vec![Value::Int(i32::MAX as i64), Value::Int(0)]);

        let params = vec![Value::Int(10)];
        let err = SqlRewriteEngine::new(&statement, &params, None).rewrite(false).unwrap_err();
        assert!(matches!(
            err.kind(),
            crate::error::ErrorKind::Data(DataError::ParameterIndexOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_rewrite_insert_with_generated_key() {
        let sql = "INSERT INTO t_order (user_id, status) VALUES (?, ?), (?, ?)";
        let first = sql.find("(?, ?)").unwrap();
        let second = sql.rfind("(?, ?)").unwrap();
        let insert = InsertContext {
            table: "t_order".to_string(),
            columns: vec!["user_id".to_string(), "status".to_string()],
            columns_end: sql.find(") VALUES"),
            rows: vec![
                InsertRow {
                    start: first,
                    end: first + 6,
                    values: vec![InsertValueExpr::Parameter(0), InsertValueExpr::Parameter(1)],
                },
                InsertRow {
                    start: second,
                    end: second + 6,
                    values: vec![InsertValueExpr::Parameter(2), InsertValueExpr::Parameter(3)],
                },
            ],
        };
        let statement = SqlStatementContext::new(sql, StatementKind::Insert)
            .with_table_tokens_of("t_order")
            .with_insert(insert);
        let key = GeneratedKey {
            column: Column::new("order_id", "t_order"),
            values: vec![Value::Int(11), Value::Int(10)],
            generated: true,
        };
        let params = vec![Value::Int(1), Value::from("a"), Value::Int(2), Value::from("b")];

        let mut result = order_units();
        result.group_data_nodes = vec![vec![DataNode::new("ds1", "t_order1")], vec![DataNode::new("ds0", "t_order0")]];

        let units = SqlRewriteEngine::new(&statement, &params, Some(&key)).rewrite_all(&result).unwrap();
        assert_eq!(units[0].sql, "INSERT INTO t_order0 (user_id, status, order_id) VALUES (?, ?, ?)");
        assert_eq!(units[0].parameters, vec![Value::Int(2), Value::from("b"), Value::Int(10)]);
        assert_eq!(units[1].sql, "INSERT INTO t_order1 (user_id, status, order_id) VALUES (?, ?, ?)");
        assert_eq!(units[1].parameters, vec![Value::Int(1), Value::from("a"), Value::Int(11)]);
    }

    #[test]
    fn test_rewrite_literal_insert_keeps_user_key() {
        let sql = "INSERT INTO t_order (order_id, user_id) VALUES (1, 2)";
        let start = sql.find("(1, 2)").unwrap();
        let insert = InsertContext {
            table: "t_order".to_string(),
            columns: vec!["order_id".to_string(), "user_id".to_string()],
            columns_end: sql.find(") VALUES"),
            rows: vec![InsertRow {
                start,
                end: start + 6,
                values: vec![InsertValueExpr::Literal(Value::Int(1)), InsertValueExpr::Literal(Value::Int(2))],
            }],
        };
        let statement = SqlStatementContext::new(sql, StatementKind::Insert)
            .with_table_tokens_of("t_order")
            .with_insert(insert);
        let key =
            GeneratedKey { column: Column::new("order_id", "t_order"), values: vec![Value::Int(1)], generated: false };
        let result = RoutingResult::new(vec![TableUnit::with_tables(
            "ds1",
            vec![RoutingTable::new("t_order", "t_order1")],
        )]);

        let units = SqlRewriteEngine::new(&statement, &[], Some(&key)).rewrite_all(&result).unwrap();
        assert_eq!(units[0].sql, "INSERT INTO t_order1 (order_id, user_id) VALUES (1, 2)");
        assert!(units[0].parameters.is_empty());
    }

    #[test]
    fn test_rewrite_overlapping_tokens() {
        let statement = SqlStatementContext::new("SELECT * FROM t_order", StatementKind::Select)
            .with_table_token("t_order", 14, 21)
            .with_table_token("t_order", 16, 21);
        let err = SqlRewriteEngine::new(&statement, &[], None).rewrite(true).unwrap_err();
        assert!(matches!(err.kind(), crate::error::ErrorKind::Data(DataError::InvalidTokenPosition { .. })));
    }
}
