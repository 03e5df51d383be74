//! 鑄造廠主生產排程示例
//!
//! 執行：`RUST_LOG=debug cargo run --example foundry_plan`

use chrono::{Duration, NaiveDate};
use mps::plan::StageProductionRow;
use mps::{
    Checkpoint, MachineRecord, MouldBoxRecord, OrderLine, PartMasterRecord, PlanConfig,
    PlanningEngine, PlanningInput, RoutingStepRecord, Stage, WipSnapshot,
};
use rust_decimal::Decimal;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    println!("=== 鑄造廠主生產排程示例 ===\n");

    let start = NaiveDate::from_ymd_opt(2025, 10, 1).ok_or_else(|| anyhow::anyhow!("起始日無效"))?;
    let config = PlanConfig::new(start)
        .with_overtime_allowance(0.1)
        .with_casting_tons_per_week(60.0)
        .with_solver(60.0, 4);

    // 零件主檔
    let parts = vec![
        PartMasterRecord::new("HSG-100", "L1", 6.0)
            .with_unit_weight(180.0)
            .with_mould_box("1200", 2.0)
            .with_cooling(96.0, 12.0)
            .with_step(Stage::Grinding, RoutingStepRecord::new("GR-01", 8.0, 1.0))
            .with_step(Stage::Mc1, RoutingStepRecord::new("MC-11", 14.0, 1.0))
            .with_step(Stage::Mc2, RoutingStepRecord::new("MC-12", 9.0, 1.0))
            .with_step(Stage::Sp1, RoutingStepRecord::new("SP-01", 4.0, 2.0)),
        PartMasterRecord::new("BRK-220", "L1", 4.5)
            .with_unit_weight(95.0)
            .with_mould_box("1200", 4.0)
            .with_cooling(150.0, 8.0)
            .with_vacuum_minutes(3.0)
            .with_step(Stage::Grinding, RoutingStepRecord::new("GR-01", 5.0, 1.0))
            .with_step(Stage::Mc1, RoutingStepRecord::new("MC-11", 10.0, 1.0)),
        PartMasterRecord::new("CVR-310", "BVC-2", 3.0)
            .with_unit_weight(40.0)
            .with_step(Stage::Sp1, RoutingStepRecord::new("SP-01", 2.0, 1.0)),
    ];

    // 產能
    let machines = vec![
        MachineRecord::new("L1", "Casting", 8.0).with_shifts(2.0),
        MachineRecord::new("KVC-2", "Casting", 8.0),
        MachineRecord::new("GR-01", "Grinding", 8.0).with_units(2),
        MachineRecord::new("MC-11", "Machining", 8.0).with_units(3).with_shifts(2.0),
        MachineRecord::new("MC-12", "Machining", 8.0).with_units(2),
        MachineRecord::new("SP-01", "Painting", 8.0),
    ];
    let mould_boxes = vec![MouldBoxRecord::new("1200", 200.0)];

    // 訂單
    let week = |n: i64| start + Duration::weeks(n - 1);
    let orders = vec![
        OrderLine::new("HSG-100", Decimal::from(300), week(4)).with_customer("ACME"),
        OrderLine::new("HSG-100", Decimal::from(250), week(7)).with_customer("ACME"),
        OrderLine::new("BRK-220", Decimal::from(400), week(5)).with_customer("Northwind"),
        OrderLine::new("CVR-310", Decimal::from(500), week(3)).with_customer("Globex"),
        OrderLine::new("CVR-310", Decimal::from(120), week(6)).without_committed_date(),
        OrderLine::new("OLD-001", Decimal::from(50), week(2)).with_customer("Legacy"),
    ];

    // 在製品
    let wip = vec![
        WipSnapshot::new("HSG-100")
            .with(Checkpoint::FinishedGoods, Decimal::from(40))
            .with(Checkpoint::PostMachining, Decimal::from(60)),
        WipSnapshot::new("CVR-310").with(Checkpoint::PostCasting, Decimal::from(80)),
    ];

    let input = PlanningInput {
        parts,
        orders,
        machines,
        mould_boxes,
        wip,
    };

    let plan = PlanningEngine::new(config).plan(input)?;

    println!("\n求解摘要:");
    println!("{}", serde_json::to_string_pretty(&plan.summary)?);

    println!("\n鑄造排程:");
    for row in plan.stage_table(Stage::Casting) {
        print_row(row);
    }

    println!("\n交貨排程:");
    for row in plan.stage_table(Stage::Delivery) {
        print_row(row);
    }
    for row in &plan.stock_deliveries {
        println!("  - {} 第 {} 週 庫存出貨 {}", row.variant, row.week, row.quantity);
    }

    if !plan.unmet_demand.is_empty() {
        println!("\n未滿足需求:");
        for row in &plan.unmet_demand {
            println!("  - {} 未滿足 {}（淨需求 {}）", row.variant, row.unmet, row.net_demand);
        }
    }

    if !plan.bottlenecks.is_empty() {
        println!("\n瓶頸資源:");
        for row in &plan.bottlenecks {
            println!(
                "  - {} 第 {} 週 {:.1}% ({:?})",
                row.resource, row.week, row.utilization_pct, row.severity
            );
        }
    }

    println!("\n排除訂單: {}", plan.excluded_orders.len());
    println!("警告: {}", plan.warnings.len());
    for warning in &plan.warnings {
        println!("  - [{:?}] {}: {}", warning.severity, warning.subject, warning.message);
    }

    Ok(())
}

fn print_row(row: &StageProductionRow) {
    println!(
        "  - {} 第 {} 週 {} 件（{:.2} 噸）{}",
        row.variant,
        row.week,
        row.quantity,
        row.tonnage,
        row.resource.as_deref().unwrap_or("")
    );
}
