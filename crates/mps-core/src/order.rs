//! 銷售訂單模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 銷售訂單明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    /// 訂單明細ID
    pub id: Uuid,

    /// 客戶
    pub customer: String,

    /// 零件代碼
    pub part_code: String,

    /// 未交數量
    pub quantity: Decimal,

    /// 承諾交期（未填則使用預設偏移週數）
    pub committed_date: Option<NaiveDate>,
}

impl OrderLine {
    /// 創建新的訂單明細
    pub fn new(part_code: &str, quantity: Decimal, committed_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer: String::new(),
            part_code: part_code.to_string(),
            quantity,
            committed_date: Some(committed_date),
        }
    }

    /// 建構器模式：設置客戶
    pub fn with_customer(mut self, customer: &str) -> Self {
        self.customer = customer.to_string();
        self
    }

    /// 建構器模式：清除承諾交期
    pub fn without_committed_date(mut self) -> Self {
        self.committed_date = None;
        self
    }
}

/// 被排除的訂單（零件不在主檔中）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedOrder {
    /// 零件代碼
    pub part_code: String,

    /// 訂單明細筆數
    pub order_lines: usize,

    /// 總數量
    pub total_quantity: Decimal,

    /// 排除原因
    pub reason: String,
}
