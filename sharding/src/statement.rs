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

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
    Dcl,
    Tcl,
    Use,
    ShowDatabases,
    ShowTables,
    ShowTableStatus,
    Set,
    ResetParameter,
    Dal,
}

impl StatementKind {
    pub fn is_dql(&self) -> bool {
        matches!(self, StatementKind::Select)
    }

    /// Data modification only, queries are DQL.
    pub fn is_dml(&self) -> bool {
        matches!(self, StatementKind::Insert | StatementKind::Update | StatementKind::Delete)
    }

    pub fn is_dal(&self) -> bool {
        matches!(
            self,
            StatementKind::ShowDatabases
                | StatementKind::ShowTables
                | StatementKind::ShowTableStatus
                | StatementKind::Set
                | StatementKind::ResetParameter
                | StatementKind::Dal
        )
    }
}

/// Byte span `[start, end)` of a logic table identifier in the SQL text, quotes included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableToken {
    pub start: usize,
    pub end: usize,
    pub table_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaginationValue {
    Literal { value: i64, start: usize, end: usize },
    Parameter { index: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pagination {
    pub offset: Option<PaginationValue>,
    pub row_count: Option<PaginationValue>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectContext {
    pub pagination: Option<Pagination>,
    pub has_aggregation: bool,
    pub has_group_by: bool,
    pub group_by_aligned_with_order_by: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertValueExpr {
    Literal(Value),
    Parameter(usize),
}

/// One `( ... )` tuple of a VALUES clause. The span covers both parentheses.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertRow {
    pub start: usize,
    pub end: usize,
    pub values: Vec<InsertValueExpr>,
}

impl InsertRow {
    pub(crate) fn parameter_indexes(&self) -> impl Iterator<Item = usize> + '_ {
        self.values.iter().filter_map(|v| match v {
            InsertValueExpr::Parameter(idx) => Some(*idx),
            InsertValueExpr::Literal(_) => None,
        })
    }

    pub(crate) fn has_parameter(&self) -> bool {
        self.parameter_indexes().next().is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertContext {
    pub table: String,
    pub columns: Vec<String>,
    /// Offset of the `)` closing the column list, `None` when the statement has no column list.
    pub columns_end: Option<usize>,
    pub rows: Vec<InsertRow>,
}

impl InsertContext {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(column))
    }
}

/// What the parser hands over for one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatementContext {
    pub sql: String,
    pub kind: StatementKind,
    pub tables: Vec<String>,
    pub table_tokens: Vec<TableToken>,
    pub select: Option<SelectContext>,
    pub insert: Option<InsertContext>,
}

impl SqlStatementContext {
    pub fn new<S: Into<String>>(sql: S, kind: StatementKind) -> Self {
        SqlStatementContext {
            sql: sql.into(),
            kind,
            tables: vec![],
            table_tokens: vec![],
            select: None,
            insert: None,
        }
    }

    pub fn with_table(mut self, table_name: &str) -> Self {
        if !self.tables.iter().any(|t| t.eq_ignore_ascii_case(table_name)) {
            self.tables.push(table_name.to_string());
        }
        self
    }

    /// Records a table reference together with its position in the SQL text.
    pub fn with_table_token(mut self, table_name: &str, start: usize, end: usize) -> Self {
        self.table_tokens.push(TableToken { start, end, table_name: table_name.to_string() });
        self.with_table(table_name)
    }

    /// Records every occurrence of `table_name` as a token, quoted or not, skipping string
    /// literals. This is a plain text scan for callers that have no parser spans at hand, such
    /// as tests and tools; a parser integration should use [`with_table_token`] instead.
    ///
    /// [`with_table_token`]: Self::with_table_token
    pub fn with_table_tokens_of(self, table_name: &str) -> Self {
        let spans = find_identifier(&self.sql, table_name);
        spans.into_iter().fold(self.with_table(table_name), |ctx, (start, end)| {
            ctx.with_table_token(table_name, start, end)
        })
    }

    pub fn with_select(mut self, select: SelectContext) -> Self {
        self.select = Some(select);
        self
    }

    pub fn with_insert(mut self, insert: InsertContext) -> Self {
        let table = insert.table.clone();
        self.insert = Some(insert);
        self.with_table(&table)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.as_str()).collect()
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

// Byte ranges of single-quoted literals, a doubled or backslash-escaped quote stays inside.
fn string_literals(sql: &str) -> Vec<(usize, usize)> {
    let bytes = sql.as_bytes();
    let mut literals = vec![];
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\'' {
            i += 1;
            continue;
        }
        let start = i;
        i += 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'\'' if bytes.get(i + 1) == Some(&b'\'') => i += 2,
                b'\'' => break,
                _ => i += 1,
            }
        }
        let end = (i + 1).min(bytes.len());
        literals.push((start, end));
        i = end;
    }

    literals
}

fn find_identifier(sql: &str, name: &str) -> Vec<(usize, usize)> {
    let bytes = sql.as_bytes();
    let literals = string_literals(sql);
    let lower = sql.to_ascii_lowercase();
    let needle = name.to_ascii_lowercase();
    let mut spans = vec![];
    let mut from = 0;

    while let Some(pos) = lower[from..].find(&needle) {
        let start = from + pos;
        let end = start + needle.len();
        from = end;

        if literals.iter().any(|(l, r)| start >= *l && start < *r) {
            continue;
        }

        let before = if start == 0 { None } else { Some(bytes[start - 1]) };
        let after = bytes.get(end).copied();
        if before.map_or(false, |b| is_ident_byte(b) || b == b'.') || after.map_or(false, is_ident_byte) {
            continue;
        }

        match (before, after) {
            (Some(b'`'), Some(b'`')) => spans.push((start - 1, end + 1)),
            _ => spans.push((start, end)),
        }
    }

    spans
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_table_tokens_of() {
        let ctx = SqlStatementContext::new(
            "SELECT * FROM `t_order` o JOIN t_order_item i ON o.order_id = i.order_id WHERE t_order.x = 1",
            StatementKind::Select,
        )
        .with_table_tokens_of("t_order");

        assert_eq!(ctx.tables, vec!["t_order".to_string()]);
        assert_eq!(ctx.table_tokens.len(), 2);
        assert_eq!(&ctx.sql[ctx.table_tokens[0].start..ctx.table_tokens[0].end], "`t_order`");
        assert_eq!(&ctx.sql[ctx.table_tokens[1].start..ctx.table_tokens[1].end], "t_order");
    }

    #[test]
    fn test_table_tokens_skip_string_literals() {
        let ctx = SqlStatementContext::new(
            "SELECT * FROM t_order WHERE note = 't_order' OR note = 'it''s t_order' OR x = 'a\\' t_order'",
            StatementKind::Select,
        )
        .with_table_tokens_of("t_order");

        assert_eq!(ctx.table_tokens.len(), 1);
        assert_eq!((ctx.table_tokens[0].start, ctx.table_tokens[0].end), (14, 21));
    }

    #[test]
    fn test_statement_kind() {
        assert!(StatementKind::Select.is_dql());
        assert!(StatementKind::Insert.is_dml());
        assert!(!StatementKind::Select.is_dml());
        assert!(!StatementKind::Ddl.is_dml());
        assert!(StatementKind::ShowTables.is_dal());
        assert!(!StatementKind::Use.is_dal());
    }
}
