//! 決策變數池
//!
//! 以連續陣列存放 (變體, 週) → 九個工序的欄索引，偏移量為
//! `variant × 週數 + (week − 1)`，查詢不需額外配置記憶體。

use mps_core::Stage;

use crate::model::ColumnId;

/// 決策變數池
#[derive(Debug, Clone)]
pub struct VariablePool {
    n_weeks: usize,
    stage_columns: Vec<[Option<ColumnId>; 9]>,
    unmet: Vec<Option<ColumnId>>,
    setup: Vec<Option<ColumnId>>,
}

impl VariablePool {
    /// 創建空的變數池
    pub fn new(n_variants: usize, n_parts: usize, n_weeks: u32) -> Self {
        let n_weeks = n_weeks as usize;
        Self {
            n_weeks,
            stage_columns: vec![[None; 9]; n_variants * n_weeks],
            unmet: vec![None; n_variants],
            setup: vec![None; n_parts * n_weeks],
        }
    }

    fn offset(&self, index: usize, week: u32) -> Option<usize> {
        let week = week as usize;
        if week == 0 || week > self.n_weeks {
            return None;
        }
        Some(index * self.n_weeks + week - 1)
    }

    pub fn set_stage(&mut self, variant: usize, week: u32, stage: Stage, column: ColumnId) {
        if let Some(offset) = self.offset(variant, week) {
            if let Some(slot) = self.stage_columns.get_mut(offset) {
                slot[stage.index()] = Some(column);
            }
        }
    }

    /// 變體在某週某工序的變數（途程略過或需求為零時為 None）
    pub fn stage(&self, variant: usize, week: u32, stage: Stage) -> Option<ColumnId> {
        self.offset(variant, week)
            .and_then(|offset| self.stage_columns.get(offset))
            .and_then(|slot| slot[stage.index()])
    }

    pub fn set_unmet(&mut self, variant: usize, column: ColumnId) {
        if let Some(slot) = self.unmet.get_mut(variant) {
            *slot = Some(column);
        }
    }

    pub fn unmet(&self, variant: usize) -> Option<ColumnId> {
        self.unmet.get(variant).copied().flatten()
    }

    pub fn set_setup(&mut self, part: usize, week: u32, column: ColumnId) {
        if let Some(offset) = self.offset(part, week) {
            if let Some(slot) = self.setup.get_mut(offset) {
                *slot = Some(column);
            }
        }
    }

    /// 零件在某週佔用鑄造線的 0/1 變數
    pub fn setup(&self, part: usize, week: u32) -> Option<ColumnId> {
        self.offset(part, week)
            .and_then(|offset| self.setup.get(offset))
            .copied()
            .flatten()
    }

    /// 累計項：`variants` 在第 1..=`through` 週某工序的變數，各乘上 `coef`
    pub fn cumulative_terms(
        &self,
        variants: &[usize],
        stage: Stage,
        through: u32,
        coef: f64,
    ) -> Vec<(ColumnId, f64)> {
        let mut terms = Vec::new();
        for &variant in variants {
            for week in 1..=through.min(self.n_weeks as u32) {
                if let Some(column) = self.stage(variant, week, stage) {
                    terms.push((column, coef));
                }
            }
        }
        terms
    }

    /// 單週項：`variants` 在第 `week` 週某工序的變數
    pub fn week_terms(
        &self,
        variants: &[usize],
        stage: Stage,
        week: u32,
        coef: f64,
    ) -> Vec<(ColumnId, f64)> {
        variants
            .iter()
            .filter_map(|&variant| self.stage(variant, week, stage).map(|c| (c, coef)))
            .collect()
    }
}
