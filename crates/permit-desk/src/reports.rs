//! Dashboard counters and the report screens.

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

use crate::db::{Backend, Database, DbValue, Param, RowSet};
use crate::export::display_value;
use crate::notice::{Notice, Notifier};
use crate::permits::{DepartmentId, RevenueQuery};
use crate::screen::{DashboardStat, TableView};
use crate::views::{lookup, Lookup};

pub const TOP_PERMIT_LIMIT: i64 = 5;

const DASHBOARD: [(&str, &str); 8] = [
    (
        "Active Citizens",
        "SELECT COUNT(*) FROM citizen WHERE status = 'Active'",
    ),
    ("Total Applications", "SELECT COUNT(*) FROM application"),
    (
        "Pending Reviews",
        "SELECT COUNT(*) FROM application WHERE status IN ('Submitted', 'Under Review')",
    ),
    (
        "Active Licenses",
        "SELECT COUNT(*) FROM issued_license WHERE license_status = 'Active'",
    ),
    (
        REVENUE_LABEL,
        "SELECT COALESCE(SUM(payment_amount), 0) FROM application WHERE payment_status = 'Paid'",
    ),
    (
        "Permit Types",
        "SELECT COUNT(*) FROM permit_type WHERE is_active = 'Y'",
    ),
    (
        "Departments",
        "SELECT COUNT(*) FROM department WHERE is_active = 'Y'",
    ),
    ("Audit Records", "SELECT COUNT(*) FROM audit_log"),
];

const REVENUE_LABEL: &str = "Total Revenue (RWF)";

static MISSING: DbValue = DbValue::Null;

const MONTHLY_REVENUE: &str = "SELECT TO_CHAR(submission_date, 'YYYY-MM') AS month, \
     COALESCE(SUM(payment_amount), 0) AS revenue, COUNT(*) AS app_count \
     FROM application \
     WHERE TO_CHAR(submission_date, 'YYYY') = $1 AND payment_status = 'Paid' \
     GROUP BY TO_CHAR(submission_date, 'YYYY-MM') \
     ORDER BY month";

/// Headline counters; a counter whose query fails reads 0.
pub fn dashboard<B: Backend, N: Notifier>(db: &mut Database<B, N>) -> Vec<DashboardStat> {
    DASHBOARD
        .iter()
        .map(|&(label, sql)| {
            let rows = db.run_query(sql, &[]);
            let value = match rows.scalar() {
                Some(value) if label == REVENUE_LABEL => {
                    format_rwf(value.as_decimal().unwrap_or_default())
                }
                Some(value) if !value.is_null() => display_value(value),
                _ => "0".to_string(),
            };
            DashboardStat { label, value }
        })
        .collect()
}

/// Whole-franc amount with thousands separators (`1,250,000`).
pub fn format_rwf(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: Decimal,
    pub applications: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyRevenueReport {
    pub year: i32,
    pub months: Vec<MonthlyRevenue>,
}

impl MonthlyRevenueReport {
    pub fn total_revenue(&self) -> Decimal {
        self.months.iter().map(|month| month.revenue).sum()
    }

    pub fn total_applications(&self) -> i64 {
        self.months.iter().map(|month| month.applications).sum()
    }

    pub fn to_table(&self) -> TableView {
        let rows = self
            .months
            .iter()
            .map(|month| {
                vec![
                    month.month.clone(),
                    format_rwf(month.revenue),
                    month.applications.to_string(),
                ]
            })
            .collect();
        TableView::new(
            format!("Monthly Revenue Report {}", self.year),
            &["Month", "Revenue (RWF)", "Applications"],
            rows,
        )
        .with_footer(format!(
            "Total Revenue: {} RWF | Total Applications: {}",
            format_rwf(self.total_revenue()),
            self.total_applications()
        ))
    }
}

/// Paid revenue per month of `year`; `None` when there is nothing to show.
pub fn monthly_revenue<B: Backend, N: Notifier>(
    db: &mut Database<B, N>,
    year: i32,
) -> Option<MonthlyRevenueReport> {
    let rows = match db.try_query(MONTHLY_REVENUE, &[Param::from(year.to_string())]) {
        Ok(rows) => rows,
        Err(err) => {
            warn!(year, error = %err, "monthly revenue report failed");
            db.notify(Notice::error(
                "Error",
                format!("Failed to load report: {err}"),
            ));
            return None;
        }
    };
    if rows.is_empty() {
        db.notify(Notice::info("Monthly Revenue", "No data found"));
        return None;
    }

    let months = rows
        .rows
        .iter()
        .map(|row| MonthlyRevenue {
            month: row.first().map(display_value).unwrap_or_default(),
            revenue: row
                .get(1)
                .and_then(DbValue::as_decimal)
                .unwrap_or_default(),
            applications: row.get(2).and_then(DbValue::as_i64).unwrap_or_default(),
        })
        .collect();
    Some(MonthlyRevenueReport { year, months })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentScore {
    pub department_id: DepartmentId,
    pub name: String,
    /// `NN.NN%`, `N/A`, or `Error` when the score could not be computed.
    pub score: String,
    pub pending: String,
}

/// Score and pending-review count for every active department.
///
/// A department whose routines fail is listed with `Error` rather than
/// interrupting the report.
pub fn department_performance<B: Backend, N: Notifier>(
    db: &mut Database<B, N>,
) -> Option<Vec<DepartmentScore>> {
    let departments = lookup(db, Lookup::ActiveDepartments);
    if departments.is_empty() {
        db.notify(Notice::info(
            "Department Performance",
            "No active departments found",
        ));
        return None;
    }

    let scores = departments
        .into_iter()
        .map(|department| {
            let department_id = DepartmentId(department.id);
            let (score, pending) = match db.try_department_scores(department_id) {
                Ok((score, pending)) => (format_score(&score), format_count(&pending)),
                Err(err) => {
                    warn!(department = department.id, error = %err, "department score failed");
                    ("Error".to_string(), "N/A".to_string())
                }
            };
            DepartmentScore {
                department_id,
                name: department.name,
                score,
                pending,
            }
        })
        .collect();
    Some(scores)
}

pub fn department_table(scores: &[DepartmentScore]) -> TableView {
    let rows = scores
        .iter()
        .map(|score| {
            vec![
                score.department_id.to_string(),
                score.name.clone(),
                score.score.clone(),
                score.pending.clone(),
            ]
        })
        .collect();
    TableView::new(
        "Department Performance",
        &["ID", "Department", "Performance Score", "Pending Reviews"],
        rows,
    )
}

fn format_score(score: &DbValue) -> String {
    match score.as_decimal() {
        Some(score) if !score.is_zero() => {
            let rounded = score.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
            format!("{rounded:.2}%")
        }
        _ => "N/A".to_string(),
    }
}

fn format_count(count: &DbValue) -> String {
    if count.is_null() {
        "0".to_string()
    } else {
        display_value(count)
    }
}

/// Top permit types by application volume, from the analytics cursor.
pub fn top_permit_types<B: Backend, N: Notifier>(db: &mut Database<B, N>) -> Option<TableView> {
    let rows = db.top_permit_types(TOP_PERMIT_LIMIT)?;
    if rows.is_empty() {
        db.notify(Notice::info("Top Permit Types", "No permit data available"));
        return None;
    }
    Some(top_permit_table(&rows))
}

pub fn top_permit_table(rows: &RowSet) -> TableView {
    let rows = rows
        .rows
        .iter()
        .map(|row| {
            let cell = |index: usize| row.get(index).unwrap_or(&MISSING);
            vec![
                display_value(cell(0)),
                format_count(cell(1)),
                format_count(cell(2)),
                match cell(3).as_decimal() {
                    Some(fee) if !fee.is_zero() => format!("{} RWF", format_rwf(fee)),
                    _ => "N/A".to_string(),
                },
                format_day(cell(4)),
                format_day(cell(5)),
            ]
        })
        .collect();
    TableView::new(
        "Top Permit Types",
        &[
            "Permit Type",
            "Total Applications",
            "Approved",
            "Average Fee",
            "First Application",
            "Last Application",
        ],
        rows,
    )
}

fn format_day(value: &DbValue) -> String {
    match value {
        DbValue::Null => "N/A".to_string(),
        DbValue::Date(date) => date.format("%Y-%m-%d").to_string(),
        DbValue::Timestamp(at) => at.format("%Y-%m-%d").to_string(),
        DbValue::TimestampTz(at) => at.format("%Y-%m-%d").to_string(),
        other => display_value(other).chars().take(10).collect(),
    }
}

/// Revenue for the optional window; the message shown to the user.
pub fn revenue_summary<B: Backend, N: Notifier>(
    db: &mut Database<B, N>,
    query: &RevenueQuery,
) -> Option<String> {
    let revenue = db.calculate_revenue(query)?;
    Some(format!(
        "Total Revenue: {} RWF",
        format_rwf(revenue.as_decimal().unwrap_or_default())
    ))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::testing::ScriptedBackend;
    use crate::db::OutValue;
    use crate::notice::{NoticeLevel, RecordingNotifier};
    use crate::permits::routines;

    type TestDatabase = Database<ScriptedBackend, RecordingNotifier>;

    fn database(backend: &ScriptedBackend) -> (TestDatabase, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        (Database::open(backend.clone(), notifier.clone()), notifier)
    }

    fn single(value: DbValue) -> RowSet {
        RowSet::new(vec!["value".into()], vec![vec![value]])
    }

    #[test]
    fn rwf_amounts_are_grouped_by_thousands() {
        assert_eq!(format_rwf(Decimal::ZERO), "0");
        assert_eq!(format_rwf(Decimal::new(999, 0)), "999");
        assert_eq!(format_rwf(Decimal::new(1_000, 0)), "1,000");
        assert_eq!(format_rwf(Decimal::new(125_000_049, 2)), "1,250,000");
        assert_eq!(format_rwf(Decimal::new(-4_500_000, 0)), "-4,500,000");
    }

    #[test]
    fn dashboard_reads_zero_for_failing_counters() {
        let backend = ScriptedBackend::default();
        backend.on_query("FROM citizen", single(DbValue::Integer(42)));
        backend.on_query(
            "SUM(payment_amount)",
            single(DbValue::Numeric(Decimal::new(3_750_000, 0))),
        );
        backend.fail_query("FROM audit_log", "permission denied for table audit_log");
        let (mut db, notifier) = database(&backend);

        let stats = dashboard(&mut db);

        assert_eq!(stats.len(), 8);
        assert_eq!(stats[0].value, "42");
        assert_eq!(stats[4].label, "Total Revenue (RWF)");
        assert_eq!(stats[4].value, "3,750,000");
        assert_eq!(stats[7].value, "0");
        assert_eq!(notifier.notices().len(), 1);
    }

    #[test]
    fn monthly_report_totals_and_notifies_when_empty() {
        let backend = ScriptedBackend::default();
        backend.on_query(
            "TO_CHAR(submission_date, 'YYYY-MM')",
            RowSet::new(
                vec!["month".into(), "revenue".into(), "app_count".into()],
                vec![
                    vec![
                        DbValue::Text("2024-01".into()),
                        DbValue::Numeric(Decimal::new(150_000, 0)),
                        DbValue::Integer(3),
                    ],
                    vec![
                        DbValue::Text("2024-02".into()),
                        DbValue::Numeric(Decimal::new(1_050_000, 0)),
                        DbValue::Integer(7),
                    ],
                ],
            ),
        );
        let (mut db, _) = database(&backend);

        let report = monthly_revenue(&mut db, 2024).expect("report");
        let table = report.to_table();

        assert_eq!(report.total_revenue(), Decimal::new(1_200_000, 0));
        assert_eq!(report.total_applications(), 10);
        assert_eq!(table.rows[1], vec!["2024-02", "1,050,000", "7"]);
        assert_eq!(
            table.footer.as_deref(),
            Some("Total Revenue: 1,200,000 RWF | Total Applications: 10")
        );

        let empty = ScriptedBackend::default();
        let (mut db, notifier) = database(&empty);
        assert!(monthly_revenue(&mut db, 2019).is_none());
        assert_eq!(notifier.last().expect("notice").message, "No data found");
    }

    #[test]
    fn failing_department_is_marked_in_place() {
        let backend = ScriptedBackend::default();
        backend.on_query(
            "FROM department",
            RowSet::new(
                vec!["department_id".into(), "department_name".into()],
                vec![
                    vec![DbValue::Integer(1), DbValue::Text("Environment".into())],
                    vec![DbValue::Integer(2), DbValue::Text("Health".into())],
                ],
            ),
        );
        backend.on_function(
            routines::DEPARTMENT_PERFORMANCE,
            OutValue::Scalar(DbValue::Numeric(Decimal::new(87_456, 3))),
        );
        backend.fail_function(routines::COUNT_PENDING_REVIEWS, "division by zero");
        let (mut db, notifier) = database(&backend);

        let scores = department_performance(&mut db).expect("departments");

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].score, "Error");
        assert_eq!(scores[0].pending, "N/A");
        assert!(notifier.notices().is_empty());
    }

    #[test]
    fn scores_are_percentages_with_two_decimals() {
        assert_eq!(format_score(&DbValue::Numeric(Decimal::new(87_456, 3))), "87.46%");
        assert_eq!(format_score(&DbValue::Integer(90)), "90.00%");
        assert_eq!(format_score(&DbValue::Null), "N/A");
    }

    #[test]
    fn top_permits_fill_missing_values() {
        let first = NaiveDate::from_ymd_opt(2023, 11, 2).expect("valid date");
        let rows = RowSet::new(
            (0..6).map(|index| format!("c{index}")).collect(),
            vec![
                vec![
                    DbValue::Text("Building Permit".into()),
                    DbValue::Integer(40),
                    DbValue::Integer(31),
                    DbValue::Numeric(Decimal::new(7_500_050, 2)),
                    DbValue::Date(first),
                    DbValue::Null,
                ],
                vec![
                    DbValue::Text("Trading License".into()),
                    DbValue::Null,
                    DbValue::Null,
                    DbValue::Null,
                    DbValue::Null,
                    DbValue::Null,
                ],
            ],
        );

        let table = top_permit_table(&rows);

        assert_eq!(
            table.rows[0],
            vec!["Building Permit", "40", "31", "75,000 RWF", "2023-11-02", "N/A"]
        );
        assert_eq!(
            table.rows[1],
            vec!["Trading License", "0", "0", "N/A", "N/A", "N/A"]
        );
    }

    #[test]
    fn revenue_summary_formats_the_total() {
        let backend = ScriptedBackend::default();
        backend.on_function(
            routines::CALCULATE_REVENUE,
            OutValue::Scalar(DbValue::Numeric(Decimal::new(2_000_000, 0))),
        );
        let (mut db, notifier) = database(&backend);

        let message = revenue_summary(&mut db, &RevenueQuery::default());

        assert_eq!(message.as_deref(), Some("Total Revenue: 2,000,000 RWF"));
        assert!(notifier
            .notices()
            .iter()
            .all(|notice| notice.level != NoticeLevel::Error));
    }
}
