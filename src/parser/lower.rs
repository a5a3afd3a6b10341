use sqlparser::ast::{
    BinaryOperator, Expr, FunctionArg, FunctionArgExpr, FunctionArguments, GroupByExpr, JoinOperator, OrderByKind, Query,
    Select, SelectItem, SetExpr, Statement, TableFactor, TableWithJoins, UnaryOperator, Value,
};

use crate::parser::expr::{column_ref, literal_from_value};
use crate::parser::names::{normalize_ident, normalized_function_name, normalized_object_name};
use crate::parser::tree::{
    CompareOp, Literal, LogicalOp, MatchOp, NodeId, NodeKind, StatementTree, TreeBuilder,
};

/// Lower one parsed statement into a [`StatementTree`].
///
/// Queries (including those feeding `INSERT` and `CREATE TABLE ... AS`) are
/// lowered fully; other statements become a single
/// [`NodeKind::Other`] root.
pub fn lower_statement(statement: &Statement) -> StatementTree {
    let mut lowerer = Lowerer {
        builder: TreeBuilder::new(),
    };
    lowerer.statement(statement);
    lowerer.builder.finish()
}

struct Lowerer {
    builder: TreeBuilder,
}

fn join_on_expr(op: &JoinOperator) -> Option<&Expr> {
    use sqlparser::ast::JoinConstraint;
    use sqlparser::ast::JoinOperator::{
        CrossJoin, FullOuter, Inner, Join, Left, LeftOuter, Right, RightOuter,
    };

    let (Join(c) | Inner(c) | Left(c) | LeftOuter(c) | Right(c) | RightOuter(c) | FullOuter(c)
    | CrossJoin(c)) = op
    else {
        return None;
    };
    if let JoinConstraint::On(expr) = c {
        Some(expr)
    } else {
        None
    }
}

fn strip_nested(mut expr: &Expr) -> &Expr {
    while let Expr::Nested(inner) = expr {
        expr = inner;
    }
    expr
}

/// Expressions whose tree form carries its own `negated` flag.
fn has_negated_form(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::InList { .. }
            | Expr::InSubquery { .. }
            | Expr::Between { .. }
            | Expr::Like { .. }
            | Expr::ILike { .. }
            | Expr::SimilarTo { .. }
            | Expr::RLike { .. }
            | Expr::IsNull(_)
            | Expr::IsNotNull(_)
            | Expr::Exists { .. }
    )
}

impl Lowerer {
    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        self.builder.push(kind, parent)
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Query(query) => {
                self.query(query, None);
            }
            Statement::Insert(insert) => {
                let root = self.push(NodeKind::Other, None);
                if let Some(source) = &insert.source {
                    self.query(source, Some(root));
                }
            }
            Statement::CreateTable(create) => {
                let root = self.push(NodeKind::Other, None);
                if let Some(query) = &create.query {
                    self.query(query, Some(root));
                }
            }
            _ => {
                self.push(NodeKind::Other, None);
            }
        }
    }

    fn query(&mut self, query: &Query, parent: Option<NodeId>) -> NodeId {
        let id = self.push(NodeKind::Query, parent);
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                let name = normalize_ident(&cte.alias.name);
                let cte_id = self.push(NodeKind::Cte { name }, Some(id));
                self.query(&cte.query, Some(cte_id));
            }
        }
        self.set_expr(&query.body, id);
        if let Some(order_by) = &query.order_by {
            if let OrderByKind::Expressions(items) = &order_by.kind {
                let order_id = self.push(NodeKind::OrderBy, Some(id));
                for item in items {
                    self.expr(&item.expr, order_id);
                }
            }
        }
        id
    }

    fn set_expr(&mut self, body: &SetExpr, parent: NodeId) {
        match body {
            SetExpr::Select(select) => self.select(select, parent),
            SetExpr::Query(query) => {
                self.query(query, Some(parent));
            }
            SetExpr::SetOperation { left, right, .. } => {
                let id = self.push(NodeKind::SetOperation, Some(parent));
                self.set_expr(left, id);
                self.set_expr(right, id);
            }
            SetExpr::Values(values) => {
                let id = self.push(NodeKind::Other, Some(parent));
                for row in &values.rows {
                    for value in row {
                        self.expr(value, id);
                    }
                }
            }
            _ => {
                self.push(NodeKind::Other, Some(parent));
            }
        }
    }

    fn select(&mut self, select: &Select, parent: NodeId) {
        let id = self.push(NodeKind::Select, Some(parent));

        for item in &select.projection {
            self.select_item(item, id);
        }

        if !select.from.is_empty() {
            let from = self.push(NodeKind::From, Some(id));
            for table in &select.from {
                self.table_with_joins(table, from);
            }
        }

        if let Some(selection) = &select.selection {
            let where_id = self.push(NodeKind::Where, Some(id));
            self.expr(selection, where_id);
        }

        if let GroupByExpr::Expressions(exprs, _) = &select.group_by {
            if !exprs.is_empty() {
                let group_id = self.push(NodeKind::GroupBy, Some(id));
                for expr in exprs {
                    self.expr(expr, group_id);
                }
            }
        }

        if let Some(having) = &select.having {
            let having_id = self.push(NodeKind::Having, Some(id));
            self.expr(having, having_id);
        }
    }

    fn select_item(&mut self, item: &SelectItem, select: NodeId) {
        match item {
            SelectItem::UnnamedExpr(expr) => {
                let id = self.push(NodeKind::Projection { alias: None }, Some(select));
                self.expr(expr, id);
            }
            SelectItem::ExprWithAlias { expr, alias } => {
                let alias = Some(normalize_ident(alias));
                let id = self.push(NodeKind::Projection { alias }, Some(select));
                self.expr(expr, id);
            }
            SelectItem::QualifiedWildcard(..) => {
                let id = self.push(NodeKind::Projection { alias: None }, Some(select));
                self.push(NodeKind::Wildcard { qualified: true }, Some(id));
            }
            SelectItem::Wildcard(_) => {
                let id = self.push(NodeKind::Projection { alias: None }, Some(select));
                self.push(NodeKind::Wildcard { qualified: false }, Some(id));
            }
        }
    }

    fn table_with_joins(&mut self, table: &TableWithJoins, parent: NodeId) {
        self.table_factor(&table.relation, parent);
        for join in &table.joins {
            let join_id = self.push(NodeKind::Join, Some(parent));
            self.table_factor(&join.relation, join_id);
            if let Some(on) = join_on_expr(&join.join_operator) {
                let on_id = self.push(NodeKind::JoinOn, Some(join_id));
                self.expr(on, on_id);
            }
        }
    }

    fn table_factor(&mut self, factor: &TableFactor, parent: NodeId) {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                self.push(
                    NodeKind::Table {
                        name: normalized_object_name(name),
                        alias: alias.as_ref().map(|a| normalize_ident(&a.name)),
                    },
                    Some(parent),
                );
            }
            TableFactor::Derived {
                subquery, alias, ..
            } => {
                let id = self.push(
                    NodeKind::Derived {
                        alias: alias.as_ref().map(|a| normalize_ident(&a.name)),
                    },
                    Some(parent),
                );
                self.query(subquery, Some(id));
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => self.table_with_joins(table_with_joins, parent),
            _ => {
                self.push(NodeKind::Other, Some(parent));
            }
        }
    }

    fn function_arg(&mut self, arg: &FunctionArg, function: NodeId) {
        let arg = match arg {
            FunctionArg::Unnamed(arg)
            | FunctionArg::Named { arg, .. }
            | FunctionArg::ExprNamed { arg, .. } => arg,
        };
        match arg {
            FunctionArgExpr::Expr(expr) => self.expr(expr, function),
            FunctionArgExpr::Wildcard => {
                self.push(NodeKind::Wildcard { qualified: false }, Some(function));
            }
            FunctionArgExpr::QualifiedWildcard(_) => {
                self.push(NodeKind::Wildcard { qualified: true }, Some(function));
            }
        }
    }

    fn expr(&mut self, expr: &Expr, parent: NodeId) {
        self.lower_expr(expr, parent, false);
    }

    /// `negate` is set when lowering the operand of a `NOT` that folds into the
    /// operand's own negated form.
    fn lower_expr(&mut self, expr: &Expr, owner: NodeId, negate: bool) {
        let parent = Some(owner);
        match expr {
            Expr::Identifier(_) | Expr::CompoundIdentifier(_) => {
                if let Some(col) = column_ref(expr) {
                    self.push(NodeKind::Column(col), parent);
                }
            }
            Expr::Value(v) => {
                self.push(NodeKind::Literal(literal_from_value(&v.value)), parent);
            }
            Expr::TypedString { .. } => {
                self.push(NodeKind::Literal(Literal::Other(expr.to_string())), parent);
            }
            Expr::Nested(inner) => self.lower_expr(inner, owner, negate),
            Expr::BinaryOp { left, op, right } => {
                let kind = match op {
                    BinaryOperator::Eq => NodeKind::Comparison(CompareOp::Eq),
                    BinaryOperator::NotEq => NodeKind::Comparison(CompareOp::NotEq),
                    BinaryOperator::Gt => NodeKind::Comparison(CompareOp::Gt),
                    BinaryOperator::GtEq => NodeKind::Comparison(CompareOp::GtEq),
                    BinaryOperator::Lt => NodeKind::Comparison(CompareOp::Lt),
                    BinaryOperator::LtEq => NodeKind::Comparison(CompareOp::LtEq),
                    BinaryOperator::And => NodeKind::Logical(LogicalOp::And),
                    BinaryOperator::Or => NodeKind::Logical(LogicalOp::Or),
                    BinaryOperator::PGRegexMatch | BinaryOperator::PGRegexIMatch => {
                        NodeKind::Pattern {
                            op: MatchOp::Regexp,
                            negated: false,
                        }
                    }
                    BinaryOperator::PGRegexNotMatch | BinaryOperator::PGRegexNotIMatch => {
                        NodeKind::Pattern {
                            op: MatchOp::Regexp,
                            negated: true,
                        }
                    }
                    _ => NodeKind::Arithmetic,
                };
                let id = self.push(kind, parent);
                self.expr(left, id);
                self.expr(right, id);
            }
            Expr::UnaryOp { op, expr: inner } => match op {
                UnaryOperator::Not => {
                    let operand = strip_nested(inner);
                    if has_negated_form(operand) {
                        self.lower_expr(operand, owner, !negate);
                    } else {
                        let id = self.push(NodeKind::Not, parent);
                        self.expr(inner, id);
                    }
                }
                UnaryOperator::Minus => {
                    if let Expr::Value(v) = strip_nested(inner) {
                        if let Value::Number(n, _) = &v.value {
                            self.push(NodeKind::Literal(Literal::Number(format!("-{n}"))), parent);
                            return;
                        }
                    }
                    let id = self.push(NodeKind::Arithmetic, parent);
                    self.expr(inner, id);
                }
                _ => {
                    let id = self.push(NodeKind::Arithmetic, parent);
                    self.expr(inner, id);
                }
            },
            Expr::InList {
                expr: target,
                list,
                negated,
            } => {
                let id = self.push(
                    NodeKind::InList {
                        negated: *negated != negate,
                    },
                    parent,
                );
                self.expr(target, id);
                for item in list {
                    self.expr(item, id);
                }
            }
            Expr::InSubquery {
                expr: target,
                subquery,
                negated,
            } => {
                let id = self.push(
                    NodeKind::InSubquery {
                        negated: *negated != negate,
                    },
                    parent,
                );
                self.expr(target, id);
                self.query(subquery, Some(id));
            }
            Expr::Between {
                expr: target,
                negated,
                low,
                high,
            } => {
                let id = self.push(
                    NodeKind::Between {
                        negated: *negated != negate,
                    },
                    parent,
                );
                self.expr(target, id);
                self.expr(low, id);
                self.expr(high, id);
            }
            Expr::Like {
                negated,
                expr: target,
                pattern,
                ..
            } => self.pattern(MatchOp::Like, *negated != negate, target, pattern, parent),
            Expr::ILike {
                negated,
                expr: target,
                pattern,
                ..
            } => self.pattern(MatchOp::ILike, *negated != negate, target, pattern, parent),
            Expr::SimilarTo {
                negated,
                expr: target,
                pattern,
                ..
            } => self.pattern(MatchOp::SimilarTo, *negated != negate, target, pattern, parent),
            Expr::RLike {
                negated,
                expr: target,
                pattern,
                ..
            } => self.pattern(MatchOp::Regexp, *negated != negate, target, pattern, parent),
            Expr::IsNull(inner) => {
                let id = self.push(NodeKind::IsNull { negated: negate }, parent);
                self.expr(inner, id);
            }
            Expr::IsNotNull(inner) => {
                let id = self.push(NodeKind::IsNull { negated: !negate }, parent);
                self.expr(inner, id);
            }
            Expr::Exists { subquery, negated } => {
                let id = self.push(
                    NodeKind::Exists {
                        negated: *negated != negate,
                    },
                    parent,
                );
                self.query(subquery, Some(id));
            }
            Expr::Subquery(subquery) => {
                let id = self.push(NodeKind::Subquery, parent);
                self.query(subquery, Some(id));
            }
            Expr::Function(func) => {
                let name = normalized_function_name(func);
                let id = self.push(NodeKind::Function { name }, parent);
                match &func.args {
                    FunctionArguments::List(list) => {
                        for arg in &list.args {
                            self.function_arg(arg, id);
                        }
                    }
                    FunctionArguments::Subquery(subquery) => {
                        self.query(subquery, Some(id));
                    }
                    FunctionArguments::None => {}
                }
            }
            Expr::Cast { expr: inner, .. } => {
                let id = self.push(NodeKind::Cast, parent);
                self.expr(inner, id);
            }
            Expr::Extract { expr: inner, .. } => {
                let id = self.push(
                    NodeKind::Function {
                        name: "extract".to_string(),
                    },
                    parent,
                );
                self.expr(inner, id);
            }
            Expr::Substring {
                expr: inner,
                substring_from,
                substring_for,
                ..
            } => {
                let id = self.push(
                    NodeKind::Function {
                        name: "substring".to_string(),
                    },
                    parent,
                );
                self.expr(inner, id);
                for bound in [substring_from, substring_for].into_iter().flatten() {
                    self.expr(bound, id);
                }
            }
            Expr::Interval(interval) => {
                let id = self.push(NodeKind::Interval, parent);
                self.expr(&interval.value, id);
            }
            Expr::Case {
                operand,
                conditions,
                else_result,
                ..
            } => {
                let id = self.push(NodeKind::Case, parent);
                if let Some(operand) = operand {
                    self.expr(operand, id);
                }
                for arm in conditions {
                    let when = self.push(NodeKind::When, Some(id));
                    self.expr(&arm.condition, when);
                    self.expr(&arm.result, when);
                }
                if let Some(else_result) = else_result {
                    self.expr(else_result, id);
                }
            }
            Expr::Tuple(items) => {
                let id = self.push(NodeKind::Tuple, parent);
                for item in items {
                    self.expr(item, id);
                }
            }
            Expr::Collate { expr: inner, .. } => self.lower_expr(inner, owner, negate),
            Expr::AtTimeZone {
                timestamp,
                time_zone,
            } => {
                let id = self.push(NodeKind::Arithmetic, parent);
                self.expr(timestamp, id);
                self.expr(time_zone, id);
            }
            _ => {
                self.push(NodeKind::Other, parent);
            }
        }
    }

    fn pattern(
        &mut self,
        op: MatchOp,
        negated: bool,
        target: &Expr,
        pattern: &Expr,
        parent: Option<NodeId>,
    ) {
        let id = self.push(NodeKind::Pattern { op, negated }, parent);
        self.expr(target, id);
        self.expr(pattern, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::PostgreSqlDialect;
    use sqlparser::parser::Parser;

    fn lower(sql: &str) -> StatementTree {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql).expect("parse SQL");
        lower_statement(&statements[0])
    }

    #[test]
    fn lowers_ctes_joins_and_where() {
        let tree = lower(
            "WITH t AS (SELECT person_id FROM person) \
             SELECT * FROM t JOIN condition_occurrence co ON co.person_id = t.person_id \
             WHERE co.condition_concept_id = 201826",
        );
        assert!(matches!(tree.kind(tree.root()), NodeKind::Query));
        assert_eq!(
            tree.find_all(|k| matches!(k, NodeKind::Cte { name } if name == "t"))
                .count(),
            1
        );
        let tables: Vec<_> = tree.tables().map(|(_, name, alias)| (name, alias)).collect();
        assert_eq!(
            tables,
            vec![
                ("person", None),
                ("t", None),
                ("condition_occurrence", Some("co"))
            ]
        );
        assert_eq!(tree.find_all(|k| matches!(k, NodeKind::JoinOn)).count(), 1);
        assert_eq!(tree.find_all(|k| matches!(k, NodeKind::Where)).count(), 1);
    }

    #[test]
    fn not_folds_into_negatable_forms() {
        let tree = lower(
            "SELECT 1 FROM concept WHERE NOT (concept_name LIKE '%x%') \
             AND invalid_reason IS NOT NULL AND domain_id NOT IN ('Drug')",
        );
        assert_eq!(
            tree.find_all(|k| matches!(
                k,
                NodeKind::Pattern {
                    op: MatchOp::Like,
                    negated: true
                }
            ))
            .count(),
            1
        );
        assert_eq!(
            tree.find_all(|k| matches!(k, NodeKind::IsNull { negated: true }))
                .count(),
            1
        );
        assert_eq!(
            tree.find_all(|k| matches!(k, NodeKind::InList { negated: true }))
                .count(),
            1
        );
        assert_eq!(tree.find_all(|k| matches!(k, NodeKind::Not)).count(), 0);
    }

    #[test]
    fn negative_numbers_fold_into_literals() {
        let tree = lower("SELECT 1 FROM measurement WHERE value_as_number > -5");
        let literals: Vec<&Literal> = tree.ids().filter_map(|id| tree.literal(id)).collect();
        assert_eq!(
            literals,
            vec![&Literal::Number("1".to_string()), &Literal::Number("-5".to_string())]
        );
        assert_eq!(literals[1].as_integer(), Some(-5));
    }

    #[test]
    fn function_wildcard_arguments_are_lowered() {
        let tree = lower("SELECT COUNT(*) FROM concept");
        let count = tree
            .find_all(|k| matches!(k, NodeKind::Function { name } if name == "count"))
            .next()
            .expect("COUNT call");
        let args = tree.children(count);
        assert_eq!(args.len(), 1);
        assert_eq!(tree.kind(args[0]), &NodeKind::Wildcard { qualified: false });
    }

    #[test]
    fn non_query_statements_lower_to_a_single_node() {
        let tree = lower("DROP TABLE person");
        assert_eq!(tree.len(), 1);
        assert!(matches!(tree.kind(tree.root()), NodeKind::Other));
    }
}
