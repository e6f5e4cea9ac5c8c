use crate::caller::Caller;
use crate::error::ServiceError;
use crate::sales::{name_for, SalesService};
use crate::views::CsvExport;
use core_types::{CustomField, OrderScope, ReportingPeriod};
use ranking::report::to_display;
use std::collections::{BTreeSet, HashMap};

const BASE_COLUMNS: [&str; 7] = ["id", "operator", "client_code", "product", "volume", "revenue", "created_at"];

/// `orders-YYYY-MM.csv`
pub fn export_file_name(period: ReportingPeriod) -> String {
    format!("orders-{period}.csv")
}

impl SalesService {
    /// Renders every order of `period` as CSV, one column per custom field after the
    /// fixed ones. Inactive fields get a column only when some exported order has a
    /// value for them.
    pub async fn export_orders(&self, caller: &Caller, period: ReportingPeriod) -> Result<CsvExport, ServiceError> {
        caller.require_admin("export orders")?;

        let orders = self.backend.list_orders(OrderScope::All, Some(period)).await?;
        let names = self.display_names().await?;
        let fields = self.backend.list_custom_fields().await?;
        let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let stored = self.backend.custom_values_for(&order_ids).await?;

        let mut values: HashMap<(i64, i64), String> = HashMap::new();
        let mut fields_with_values = BTreeSet::new();
        for row in stored {
            if let Some(value) = row.value.filter(|v| !v.is_empty()) {
                fields_with_values.insert(row.field_id);
                values.insert((row.order_id, row.field_id), value);
            }
        }
        let columns: Vec<&CustomField> = fields
            .iter()
            .filter(|f| f.is_active || fields_with_values.contains(&f.id))
            .collect();

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter()?)
            .from_writer(Vec::new());

        let header: Vec<&str> = BASE_COLUMNS
            .iter()
            .copied()
            .chain(columns.iter().map(|f| f.name.as_str()))
            .collect();
        writer.write_record(&header)?;

        for order in &orders {
            let mut record = vec![
                order.id.to_string(),
                name_for(&names, order.operator_id),
                order.client_code.clone(),
                order.product.clone(),
                to_display(order.volume).to_string(),
                to_display(order.revenue).to_string(),
                order.created_at.to_rfc3339(),
            ];
            record.extend(
                columns
                    .iter()
                    .map(|f| values.get(&(order.id, f.id)).cloned().unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }

        let content = writer
            .into_inner()
            .map_err(|e| ServiceError::Export(e.into_error().into()))?;
        tracing::info!(%period, rows = orders.len(), "Orders exported.");
        Ok(CsvExport { file_name: export_file_name(period), content, rows: orders.len() })
    }

    fn delimiter(&self) -> Result<u8, ServiceError> {
        self.export
            .delimiter_byte()
            .map_err(|e| ServiceError::Validation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_carries_the_period() {
        let period = ReportingPeriod::new(2024, 3).unwrap();
        assert_eq!(export_file_name(period), "orders-2024-03.csv");
    }
}
