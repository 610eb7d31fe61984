use serde::{Deserialize, Serialize};

/// Structured documentation object produced by the writer. Field shape
/// mirrors the documentation template: every field is required on the wire,
/// so a model response that omits one fails to parse instead of being
/// silently coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    pub description: String,
    pub table_grain: String,
    pub data_sources: Vec<String>,
    pub databricks_tables: Vec<OutputTable>,
    pub table_metadata: Vec<TableMetadata>,
    pub integrated_rules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputTable {
    pub table_name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    pub table_name: String,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub column_name: String,
    pub data_type: String,
    pub description: String,
    pub sample_values: String,
    pub source_table: String,
    pub source_column: String,
}

impl DocumentDraft {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Semantic checks past what the wire shape enforces. Collects every
    /// violation so a failing step reports the full contract breach at once.
    pub fn validate(&self) -> Result<(), String> {
        let mut issues = Vec::new();

        if self.description.trim().is_empty() {
            issues.push("description must be non-empty".to_string());
        }
        if self.table_grain.trim().is_empty() {
            issues.push("tableGrain must be non-empty".to_string());
        }
        for (idx, source) in self.data_sources.iter().enumerate() {
            if source.trim().is_empty() {
                issues.push(format!("dataSources[{idx}] must be non-empty"));
            }
        }
        for (idx, table) in self.databricks_tables.iter().enumerate() {
            if table.table_name.trim().is_empty() {
                issues.push(format!("databricksTables[{idx}].tableName must be non-empty"));
            }
        }
        for (idx, metadata) in self.table_metadata.iter().enumerate() {
            if metadata.table_name.trim().is_empty() {
                issues.push(format!("tableMetadata[{idx}].tableName must be non-empty"));
                continue;
            }
            if !self
                .databricks_tables
                .iter()
                .any(|table| table.table_name == metadata.table_name)
            {
                issues.push(format!(
                    "tableMetadata[{idx}] references `{}` which is not listed in databricksTables",
                    metadata.table_name
                ));
            }
            if metadata.columns.is_empty() {
                issues.push(format!("tableMetadata[{idx}].columns must not be empty"));
            }
            for (col_idx, column) in metadata.columns.iter().enumerate() {
                if column.column_name.trim().is_empty() {
                    issues.push(format!(
                        "tableMetadata[{idx}].columns[{col_idx}].columnName must be non-empty"
                    ));
                }
                if column.data_type.trim().is_empty() {
                    issues.push(format!(
                        "tableMetadata[{idx}].columns[{col_idx}].dataType must be non-empty"
                    ));
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> DocumentDraft {
        DocumentDraft {
            description: "Aggregates rep visit activity per account".to_string(),
            table_grain: "one row per account_id and visit_month".to_string(),
            data_sources: vec!["raw.crm_visits".to_string(), "raw.accounts".to_string()],
            databricks_tables: vec![OutputTable {
                table_name: "gold.visit_summary".to_string(),
                description: "Monthly visit rollup".to_string(),
            }],
            table_metadata: vec![TableMetadata {
                table_name: "gold.visit_summary".to_string(),
                columns: vec![ColumnSpec {
                    column_name: "account_id".to_string(),
                    data_type: "string".to_string(),
                    description: "CRM account key".to_string(),
                    sample_values: "A-1001".to_string(),
                    source_table: "raw.accounts".to_string(),
                    source_column: "id".to_string(),
                }],
            }],
            integrated_rules: vec!["Visits are deduplicated by (account_id, date)".to_string()],
        }
    }

    #[test]
    fn valid_draft_passes() {
        sample_draft().validate().expect("valid draft");
    }

    #[test]
    fn missing_wire_field_fails_to_parse() {
        let raw = r#"{"description":"x","tableGrain":"y","dataSources":[],"databricksTables":[],"integratedRules":[]}"#;
        assert!(DocumentDraft::from_json_str(raw).is_err());
    }

    #[test]
    fn metadata_for_unlisted_table_is_rejected() {
        let mut draft = sample_draft();
        draft.table_metadata[0].table_name = "gold.other".to_string();
        let err = draft.validate().expect_err("unlisted table");
        assert!(err.contains("gold.other"));
    }

    #[test]
    fn empty_column_fields_are_reported_together() {
        let mut draft = sample_draft();
        draft.table_metadata[0].columns[0].column_name = String::new();
        draft.table_metadata[0].columns[0].data_type = " ".to_string();
        let err = draft.validate().expect_err("bad columns");
        assert!(err.contains("columnName"));
        assert!(err.contains("dataType"));
    }
}
