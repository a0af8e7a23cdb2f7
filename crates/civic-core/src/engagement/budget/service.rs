use std::ops::RangeInclusive;

use axum::http::StatusCode;
use sqlx::FromRow;
use tracing::info;

use super::domain::{BudgetQuery, BudgetSummary, DepartmentTotal, LineItem, LineItemId, NewLineItem};
use crate::store::{decode_timestamp, encode_timestamp, new_id, now, Database, StoreError};

const FISCAL_YEARS: RangeInclusive<i32> = 1900..=2200;

/// Ten trillion dollars, in cents.
const MAX_LINE_ITEM_CENTS: i64 = 1_000_000_000_000_000;

#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    #[error("{0}")]
    Invalid(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BudgetError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BudgetError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BudgetError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for BudgetError {
    fn from(value: sqlx::Error) -> Self {
        Self::Store(StoreError::Database(value))
    }
}

#[derive(Debug, FromRow)]
struct LineItemRow {
    id: String,
    fiscal_year: i64,
    department: String,
    description: String,
    amount_cents: i64,
    published_at: String,
}

impl LineItemRow {
    fn into_line_item(self) -> Result<LineItem, StoreError> {
        let fiscal_year = i32::try_from(self.fiscal_year).map_err(|_| {
            StoreError::Corrupt(format!("fiscal year {} out of range", self.fiscal_year))
        })?;
        Ok(LineItem {
            id: LineItemId(self.id),
            fiscal_year,
            department: self.department,
            description: self.description,
            amount_cents: self.amount_cents,
            published_at: decode_timestamp(&self.published_at)?,
        })
    }
}

/// Published budget lines and per-department rollups.
#[derive(Debug, Clone)]
pub struct BudgetService {
    database: Database,
}

impl BudgetService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub async fn publish(&self, request: NewLineItem) -> Result<LineItem, BudgetError> {
        if !FISCAL_YEARS.contains(&request.fiscal_year) {
            return Err(BudgetError::Invalid(
                "fiscal_year must be between 1900 and 2200",
            ));
        }
        let department = request.department.trim();
        if department.is_empty() {
            return Err(BudgetError::Invalid("department must not be empty"));
        }
        let description = request.description.trim();
        if description.is_empty() {
            return Err(BudgetError::Invalid("description must not be empty"));
        }
        if request.amount_cents < 0 {
            return Err(BudgetError::Invalid("amount_cents must not be negative"));
        }
        if request.amount_cents > MAX_LINE_ITEM_CENTS {
            return Err(BudgetError::Invalid(
                "amount_cents must not exceed 1000000000000000",
            ));
        }

        let item = LineItem {
            id: LineItemId(new_id("budget")),
            fiscal_year: request.fiscal_year,
            department: department.to_string(),
            description: description.to_string(),
            amount_cents: request.amount_cents,
            published_at: now(),
        };

        // The year's running total must stay representable so summaries cannot overflow.
        let inserted = sqlx::query(
            "INSERT INTO budget_line_items \
             (id, fiscal_year, department, description, amount_cents, published_at) \
             SELECT ?1, ?2, ?3, ?4, ?5, ?6 \
             WHERE (SELECT COALESCE(SUM(amount_cents), 0) FROM budget_line_items \
                    WHERE fiscal_year = ?2) <= ?7",
        )
        .bind(&item.id.0)
        .bind(item.fiscal_year)
        .bind(&item.department)
        .bind(&item.description)
        .bind(item.amount_cents)
        .bind(encode_timestamp(item.published_at))
        .bind(i64::MAX - item.amount_cents)
        .execute(self.database.pool())
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(BudgetError::Invalid(
                "fiscal year total would exceed the largest representable amount",
            ));
        }

        info!(
            fiscal_year = item.fiscal_year,
            department = %item.department,
            amount_cents = item.amount_cents,
            "budget line published"
        );
        Ok(item)
    }

    pub async fn items(&self, query: &BudgetQuery) -> Result<Vec<LineItem>, BudgetError> {
        let department = query
            .department
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let rows = sqlx::query_as::<_, LineItemRow>(
            "SELECT id, fiscal_year, department, description, amount_cents, published_at \
             FROM budget_line_items \
             WHERE (?1 IS NULL OR fiscal_year = ?1) \
               AND (?2 IS NULL OR department = ?2 COLLATE NOCASE) \
             ORDER BY fiscal_year, department, description, id",
        )
        .bind(query.fiscal_year)
        .bind(department)
        .fetch_all(self.database.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(LineItemRow::into_line_item)
            .collect::<Result<_, _>>()?)
    }

    /// Department totals in alphabetical order; an unknown year sums to zero.
    pub async fn summary(&self, fiscal_year: i32) -> Result<BudgetSummary, BudgetError> {
        let totals: Vec<(String, i64, i64)> = sqlx::query_as(
            "SELECT department, COUNT(*), SUM(amount_cents) FROM budget_line_items \
             WHERE fiscal_year = ? GROUP BY department ORDER BY department",
        )
        .bind(fiscal_year)
        .fetch_all(self.database.pool())
        .await?;

        let departments: Vec<DepartmentTotal> = totals
            .into_iter()
            .map(|(department, line_items, amount_cents)| DepartmentTotal {
                department,
                line_items,
                amount_cents,
            })
            .collect();
        let total_cents = departments
            .iter()
            .try_fold(0_i64, |total, entry| total.checked_add(entry.amount_cents))
            .ok_or_else(|| {
                StoreError::Corrupt(format!("budget total for {fiscal_year} overflows"))
            })?;

        Ok(BudgetSummary {
            fiscal_year,
            departments,
            total_cents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(
        fiscal_year: i32,
        department: &str,
        description: &str,
        amount_cents: i64,
    ) -> NewLineItem {
        NewLineItem {
            fiscal_year,
            department: department.to_string(),
            description: description.to_string(),
            amount_cents,
        }
    }

    async fn seeded() -> BudgetService {
        let service = BudgetService::new(Database::in_memory().await.expect("database"));
        for request in [
            line(2026, "Public Works", "Street resurfacing", 4_200_000_00),
            line(2026, "Parks", "Playground equipment", 350_000_00),
            line(2026, "Public Works", "Snow removal", 1_800_000_00),
            line(2025, "Parks", "Trail maintenance", 120_000_00),
        ] {
            service.publish(request).await.expect("published");
        }
        service
    }

    #[tokio::test]
    async fn publish_validates_inputs() {
        let service = BudgetService::new(Database::in_memory().await.expect("database"));

        let negative = service
            .publish(line(2026, "Parks", "Refund", -1))
            .await
            .expect_err("negative amount");
        assert_eq!(negative.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        assert!(matches!(
            service.publish(line(1850, "Parks", "Statue", 10)).await,
            Err(BudgetError::Invalid(_))
        ));
        assert!(matches!(
            service.publish(line(2026, "  ", "Statue", 10)).await,
            Err(BudgetError::Invalid(_))
        ));

        let zero = service
            .publish(line(2026, " Library ", " Late fee amnesty ", 0))
            .await
            .expect("zero is allowed");
        assert_eq!(zero.department, "Library");
        assert_eq!(zero.description, "Late fee amnesty");
    }

    #[tokio::test]
    async fn items_are_filtered_and_ordered() {
        let service = seeded().await;

        let all = service.items(&BudgetQuery::default()).await.expect("items");
        let order: Vec<_> = all
            .iter()
            .map(|item| (item.fiscal_year, item.description.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (2025, "Trail maintenance"),
                (2026, "Playground equipment"),
                (2026, "Snow removal"),
                (2026, "Street resurfacing"),
            ]
        );

        let works = service
            .items(&BudgetQuery {
                fiscal_year: Some(2026),
                department: Some("public works".to_string()),
            })
            .await
            .expect("items");
        assert_eq!(works.len(), 2);
    }

    #[tokio::test]
    async fn oversized_amounts_are_rejected_before_they_reach_summaries() {
        let service = BudgetService::new(Database::in_memory().await.expect("database"));

        let huge = service
            .publish(line(2026, "A", "Everything", i64::MAX))
            .await
            .expect_err("amount above the cap");
        assert!(matches!(huge, BudgetError::Invalid(_)));

        for department in ["A", "B", "A"] {
            service
                .publish(line(2026, department, "Capital plan", MAX_LINE_ITEM_CENTS))
                .await
                .expect("amount at the cap is allowed");
        }
        let summary = service.summary(2026).await.expect("summary");
        assert_eq!(summary.departments[0].amount_cents, 2 * MAX_LINE_ITEM_CENTS);
        assert_eq!(summary.total_cents, 3 * MAX_LINE_ITEM_CENTS);
    }

    #[tokio::test]
    async fn publish_refuses_to_overflow_the_year_total() {
        let service = BudgetService::new(Database::in_memory().await.expect("database"));
        sqlx::query(
            "INSERT INTO budget_line_items \
             (id, fiscal_year, department, description, amount_cents, published_at) \
             VALUES ('budget-seed', 2026, 'Legacy', 'Imported ledger', ?, ?)",
        )
        .bind(i64::MAX - 10)
        .bind(encode_timestamp(now()))
        .execute(service.database.pool())
        .await
        .expect("seed row");

        let err = service
            .publish(line(2026, "Parks", "Benches", 11))
            .await
            .expect_err("total would overflow");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        service
            .publish(line(2026, "Parks", "Benches", 10))
            .await
            .expect("total fits exactly");
        service
            .publish(line(2027, "Parks", "Benches", 11))
            .await
            .expect("other years are unaffected");
        assert_eq!(service.summary(2026).await.expect("summary").total_cents, i64::MAX);
    }

    #[tokio::test]
    async fn summary_rolls_up_by_department() {
        let service = seeded().await;

        let summary = service.summary(2026).await.expect("summary");
        assert_eq!(summary.departments.len(), 2);
        assert_eq!(summary.departments[0].department, "Parks");
        assert_eq!(summary.departments[1].line_items, 2);
        assert_eq!(summary.departments[1].amount_cents, 6_000_000_00);
        assert_eq!(summary.total_cents, 6_350_000_00);

        let empty = service.summary(2030).await.expect("summary");
        assert!(empty.departments.is_empty());
        assert_eq!(empty.total_cents, 0);
    }
}
