//! 混合整數線性規劃模型（與求解器無關）

use mps_core::ConstraintClass;

/// 欄（決策變數）索引
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(pub usize);

/// 列（約束）索引
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowId(pub usize);

/// 決策變數
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub lower: f64,
    pub upper: f64,
    /// 目標函數係數
    pub cost: f64,
    pub integer: bool,
}

/// 線性約束 `lower ≤ Σ coef × x ≤ upper`
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub class: ConstraintClass,
    pub lower: f64,
    pub upper: f64,
    pub terms: Vec<(ColumnId, f64)>,
}

impl Row {
    /// 代入變數值計算左式
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(col, coef)| values.get(col.0).copied().unwrap_or(0.0) * coef)
            .sum()
    }
}

/// 約束違反
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub row: RowId,
    pub class: ConstraintClass,
    pub activity: f64,
    pub lower: f64,
    pub upper: f64,
}

/// 最小化模型
#[derive(Debug, Clone, Default)]
pub struct MilpModel {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl MilpModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新增連續變數
    pub fn add_column(&mut self, cost: f64, lower: f64, upper: f64) -> ColumnId {
        self.push_column(cost, lower, upper, false)
    }

    /// 新增整數變數
    pub fn add_integer_column(&mut self, cost: f64, lower: f64, upper: f64) -> ColumnId {
        self.push_column(cost, lower, upper, true)
    }

    /// 新增 0/1 變數
    pub fn add_binary_column(&mut self, cost: f64) -> ColumnId {
        self.push_column(cost, 0.0, 1.0, true)
    }

    fn push_column(&mut self, cost: f64, lower: f64, upper: f64, integer: bool) -> ColumnId {
        let id = ColumnId(self.columns.len());
        self.columns.push(Column {
            lower,
            upper,
            cost,
            integer,
        });
        id
    }

    /// 新增約束；沒有任何項的約束直接略過
    pub fn add_row(
        &mut self,
        class: ConstraintClass,
        lower: f64,
        upper: f64,
        terms: Vec<(ColumnId, f64)>,
    ) -> Option<RowId> {
        if terms.is_empty() {
            return None;
        }
        let id = RowId(self.rows.len());
        self.rows.push(Row {
            class,
            lower,
            upper,
            terms,
        });
        Some(id)
    }

    /// 新增 `Σ ≤ upper`
    pub fn add_le(
        &mut self,
        class: ConstraintClass,
        terms: Vec<(ColumnId, f64)>,
        upper: f64,
    ) -> Option<RowId> {
        self.add_row(class, f64::NEG_INFINITY, upper, terms)
    }

    /// 新增 `Σ = rhs`
    pub fn add_eq(
        &mut self,
        class: ConstraintClass,
        terms: Vec<(ColumnId, f64)>,
        rhs: f64,
    ) -> Option<RowId> {
        self.add_row(class, rhs, rhs, terms)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_integer_columns(&self) -> usize {
        self.columns.iter().filter(|c| c.integer).count()
    }

    /// 指定類別的約束數
    pub fn count_class(&self, class: ConstraintClass) -> usize {
        self.rows.iter().filter(|r| r.class == class).count()
    }

    /// 移除指定類別後的模型副本（變數索引不變）
    pub fn without_classes(&self, classes: &[ConstraintClass]) -> MilpModel {
        MilpModel {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| !classes.contains(&r.class))
                .cloned()
                .collect(),
        }
    }

    /// 目標函數值
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.columns
            .iter()
            .zip(values)
            .map(|(col, value)| col.cost * value)
            .sum()
    }

    /// 違反的約束（容許誤差 `tolerance`）
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<Violation> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| {
                let activity = row.activity(values);
                (activity < row.lower - tolerance || activity > row.upper + tolerance).then(|| {
                    Violation {
                        row: RowId(idx),
                        class: row.class,
                        activity,
                        lower: row.lower,
                        upper: row.upper,
                    }
                })
            })
            .collect()
    }

    /// 超出界限或不符整數要求的變數
    pub fn bound_violations(&self, values: &[f64], tolerance: f64) -> Vec<ColumnId> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(idx, col)| {
                let v = values.get(*idx).copied().unwrap_or(f64::NAN);
                !(v >= col.lower - tolerance
                    && v <= col.upper + tolerance
                    && (!col.integer || (v - v.round()).abs() <= tolerance))
            })
            .map(|(idx, _)| ColumnId(idx))
            .collect()
    }

    /// 解是否滿足所有約束與變數界限
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        values.len() == self.columns.len()
            && self.violations(values, tolerance).is_empty()
            && self.bound_violations(values, tolerance).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_row_skipped() {
        let mut model = MilpModel::new();
        assert!(model.add_le(ConstraintClass::LeadTime, Vec::new(), 0.0).is_none());
        assert_eq!(model.num_rows(), 0);
    }

    #[test]
    fn test_feasibility_check() {
        let mut model = MilpModel::new();
        let x = model.add_column(1.0, 0.0, 10.0);
        let y = model.add_integer_column(2.0, 0.0, 5.0);
        model.add_le(ConstraintClass::ResourceCapacity, vec![(x, 1.0), (y, 2.0)], 8.0);
        model.add_eq(ConstraintClass::DemandBalance, vec![(x, 1.0)], 4.0);

        assert!(model.is_feasible(&[4.0, 2.0], 1e-6));
        assert_eq!(model.objective_value(&[4.0, 2.0]), 8.0);

        let violations = model.violations(&[4.0, 3.0], 1e-6);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].class, ConstraintClass::ResourceCapacity);

        // 非整數
        assert!(!model.is_feasible(&[4.0, 1.5], 1e-6));
        assert_eq!(model.bound_violations(&[4.0, 1.5], 1e-6), vec![y]);
        assert!(!model.is_feasible(&[4.0], 1e-6));
    }

    #[test]
    fn test_without_classes() {
        let mut model = MilpModel::new();
        let x = model.add_column(0.0, 0.0, 1.0);
        model.add_le(ConstraintClass::LeadTime, vec![(x, 1.0)], 0.0);
        model.add_le(ConstraintClass::MouldBox, vec![(x, 1.0)], 1.0);

        let relaxed = model.without_classes(&[ConstraintClass::LeadTime]);
        assert_eq!(relaxed.num_rows(), 1);
        assert_eq!(relaxed.count_class(ConstraintClass::LeadTime), 0);
        assert_eq!(relaxed.num_columns(), 1);
    }
}
