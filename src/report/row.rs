use crate::fingerprint::{timestamp, DetectedItem, FingerprintResult};
use serde::{Deserialize, Serialize};

/// Column headers of the technology sheet, in order
pub const COLUMNS: [&str; 8] = [
    "Category",
    "Subcategory",
    "Live Count",
    "Dead Count",
    "Latest Timestamp",
    "Oldest Timestamp",
    "Latest_Time",
    "Oldest_Time",
];

/// One spreadsheet row, flattened from a detected item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub category: String,
    pub subcategory: String,
    pub live_count: u64,
    pub dead_count: u64,
    /// Latest timestamp as reported
    pub latest_timestamp: String,
    /// Oldest timestamp as reported
    pub oldest_timestamp: String,
    /// Latest timestamp formatted as `YYYY-MM-DD HH:MM:SS`, or empty
    pub latest_time: String,
    /// Oldest timestamp formatted as `YYYY-MM-DD HH:MM:SS`, or empty
    pub oldest_time: String,
}

impl ReportRow {
    /// The subcategory column holds the explicit subcategory when there is
    /// one, otherwise the technology name if it differs from the category.
    pub fn from_item(category: &str, item: &DetectedItem) -> Self {
        let subcategory = match &item.subcategory {
            Some(sub) => sub.clone(),
            None if item.name != category => item.name.clone(),
            None => String::new(),
        };

        Self {
            category: category.to_string(),
            subcategory,
            live_count: item.effective_live_count(),
            dead_count: item.effective_dead_count(),
            latest_timestamp: item
                .last_seen
                .as_ref()
                .map(|t| t.raw.clone())
                .unwrap_or_default(),
            oldest_timestamp: item
                .first_seen
                .as_ref()
                .map(|t| t.raw.clone())
                .unwrap_or_default(),
            latest_time: timestamp::format(item.last_seen.as_ref()),
            oldest_time: timestamp::format(item.first_seen.as_ref()),
        }
    }

    /// Text cells in column order; `None` marks the numeric count columns.
    pub fn text_cells(&self) -> [Option<&str>; 8] {
        [
            Some(&self.category),
            Some(&self.subcategory),
            None,
            None,
            Some(&self.latest_timestamp),
            Some(&self.oldest_timestamp),
            Some(&self.latest_time),
            Some(&self.oldest_time),
        ]
    }
}

/// One row per detected item, in category-then-item order as received.
pub fn rows_from_result(result: &FingerprintResult) -> Vec<ReportRow> {
    result
        .items()
        .map(|(category, item)| ReportRow::from_item(category, item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::parse_document;
    use serde_json::json;

    #[test]
    fn test_example_response_yields_two_live_rows() {
        let result = parse_document(
            "example.com",
            json!({"WordPress": [{"status":"live"}], "Nginx":[{"status":"live"}]}),
        )
        .unwrap();

        let rows = rows_from_result(&result);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category, "WordPress");
        assert_eq!(rows[1].category, "Nginx");
        for row in &rows {
            assert_eq!(row.live_count, 1);
            assert_eq!(row.dead_count, 0);
            assert_eq!(row.subcategory, "");
        }
    }

    #[test]
    fn test_one_row_per_item_in_order() {
        let result = parse_document(
            "example.com",
            json!({
                "Technologies": [
                    {"Name": "WordPress", "Tag": "cms"},
                    {"Name": "Nginx", "Tag": "web-server"},
                    {"Name": "Jetpack", "Tag": "cms", "SubCategory": "Plugin"},
                    {"Name": "Apache", "Tag": "web-server", "status": "dead"}
                ]
            }),
        )
        .unwrap();

        let rows = rows_from_result(&result);
        let cells: Vec<_> = rows
            .iter()
            .map(|r| (r.category.as_str(), r.subcategory.as_str()))
            .collect();

        assert_eq!(
            cells,
            vec![
                ("cms", "WordPress"),
                ("cms", "Plugin"),
                ("web-server", "Nginx"),
                ("web-server", "Apache"),
            ]
        );
        assert_eq!(rows[3].live_count, 0);
        assert_eq!(rows[3].dead_count, 1);
    }

    #[test]
    fn test_timestamps_are_raw_and_formatted() {
        let result = parse_document(
            "example.com",
            json!({"CDN": [{"Name": "Cloudflare", "Latest": "2024-02-03T04:05:06", "Oldest": "garbage"}]}),
        )
        .unwrap();

        let row = &rows_from_result(&result)[0];
        assert_eq!(row.latest_timestamp, "2024-02-03T04:05:06");
        assert_eq!(row.latest_time, "2024-02-03 04:05:06");
        assert_eq!(row.oldest_timestamp, "garbage");
        assert_eq!(row.oldest_time, "");
    }
}
